mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::db::{Database, Stats};
use crate::models::{Attempt, ProblemWithRecord, Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Problems,
    ProblemDetail,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Problems,
            View::Problems => View::Dashboard,
            View::ProblemDetail => View::Problems,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Problems,
            View::Problems => View::Dashboard,
            View::ProblemDetail => View::Problems,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App {
    db: Database,
    pub view: View,
    pub problems: StatefulList<ProblemWithRecord>,
    pub selected_problem: Option<ProblemWithRecord>,
    pub selected_problem_solutions: Vec<Solution>,
    pub selected_problem_attempts: Vec<Attempt>,
    pub stats: Stats,
    pub due_problems: Vec<ProblemWithRecord>,
    pub recent_attempts: Vec<(Attempt, String)>, // attempt + problem title
    pub filter_tag: Option<String>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database) -> Result<Self, Box<dyn std::error::Error>> {
        let stats = db.get_stats()?;
        let problems_data = db.problems_with_records(None)?;
        let due_problems = db.due_problems(5)?;
        let recent_attempts = db.recent_attempts(5)?;

        Ok(Self {
            db,
            view: View::Dashboard,
            problems: StatefulList::with_items(problems_data),
            selected_problem: None,
            selected_problem_solutions: Vec::new(),
            selected_problem_attempts: Vec::new(),
            stats,
            due_problems,
            recent_attempts,
            filter_tag: None,
            filter_input: String::new(),
            filter_mode: false,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.stats = self.db.get_stats()?;
        self.problems = StatefulList::with_items(
            self.db
                .problems_with_records(self.filter_tag.as_deref())?,
        );
        self.due_problems = self.db.due_problems(5)?;
        self.recent_attempts = self.db.recent_attempts(5)?;
        Ok(())
    }

    fn apply_filter(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.filter_input.is_empty() {
            self.filter_tag = None;
        } else {
            self.filter_tag = Some(self.filter_input.clone());
        }
        self.problems = StatefulList::with_items(
            self.db
                .problems_with_records(self.filter_tag.as_deref())?,
        );
        Ok(())
    }

    fn select_problem(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(pwr) = self.problems.selected_item() {
            self.selected_problem = Some(pwr.clone());
            self.selected_problem_solutions = self.db.list_solutions(pwr.problem.id)?;
            self.selected_problem_attempts = self.db.problem_attempts(pwr.problem.id, 10)?;
            self.view = View::ProblemDetail;
        }
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Handle filter mode input (vim-like / search)
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            // Refresh: Ctrl+r
            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            // Search/filter: / (vim search)
            KeyCode::Char('/') if self.view == View::Problems => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            KeyCode::Esc => match self.view {
                View::ProblemDetail => {
                    self.view = View::Problems;
                    self.selected_problem = None;
                }
                View::Problems if self.filter_tag.is_some() => {
                    self.filter_tag = None;
                    self.filter_input.clear();
                    self.apply_filter()?;
                }
                View::Problems => {}
                View::Dashboard => {}
            },

            // Navigation between views: h/l (left/right like vim)
            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::ProblemDetail => {
                    self.view = View::Problems;
                    self.selected_problem = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Problems => self.select_problem()?,
                _ => self.view = self.view.next(),
            },

            // Tab still works for quick view switching
            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            // List navigation: j/k (vim up/down)
            KeyCode::Char('j') | KeyCode::Down => {
                if self.view == View::Problems {
                    self.problems.next();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.view == View::Problems {
                    self.problems.previous();
                }
            }

            // Jump to top/bottom
            KeyCode::Char('g') => {
                if self.view == View::Problems && !self.problems.items.is_empty() {
                    self.problems.selected = Some(0);
                }
            }
            KeyCode::Char('G') => {
                if self.view == View::Problems && !self.problems.items.is_empty() {
                    self.problems.selected = Some(self.problems.items.len() - 1);
                }
            }

            KeyCode::Enter => {
                if self.view == View::Problems {
                    self.select_problem()?;
                }
            }

            _ => {}
        }
        Ok(())
    }
}

pub fn run(db: Database) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(db)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
