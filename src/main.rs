mod db;
mod models;
mod runner;
mod scheduler;
mod store;
mod tui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use db::Database;
use models::{AttemptOutcome, Difficulty, JsonOutput};
use store::SolutionStore;

const DEFAULT_DB_NAME: &str = "devdojo.db";

#[derive(Parser)]
#[command(name = "devdojo")]
#[command(about = "A spaced-repetition coding practice tracker with a built-in code runner")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage problems
    #[command(subcommand)]
    Problem(ProblemCommands),

    /// Manage solutions
    #[command(subcommand)]
    Solution(SolutionCommands),

    /// Manage test cases
    #[command(subcommand)]
    Testcase(TestcaseCommands),

    /// List all tags
    Tags,

    /// Show practice statistics
    Stats,

    /// List problems due for practice
    Due {
        /// Maximum number of problems to list
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Get next problem to practice (stochastic selection)
    Next {
        /// Filter by tag
        #[arg(long, short)]
        tag: Option<String>,
    },

    /// Record a practice attempt for a problem
    Practice {
        /// Problem ID
        id: i64,

        /// Attempt outcome: success/fail
        #[arg(long, short)]
        outcome: String,
    },

    /// Validate a script's syntax without running it
    Check {
        /// Path to the script
        file: PathBuf,
    },

    /// Execute a script and capture its output
    Run {
        /// Path to the script
        file: PathBuf,
    },

    /// Run a test script against a source script
    Test {
        /// Path to the source script
        source: PathBuf,

        /// Path to the test script
        tests: PathBuf,
    },

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum ProblemCommands {
    /// List all problems
    List {
        /// Filter by tag
        #[arg(long, short)]
        tag: Option<String>,

        /// Filter by difficulty: easy/medium/hard
        #[arg(long)]
        difficulty: Option<String>,
    },

    /// Add a new problem
    Add {
        /// Problem title
        title: String,

        /// Problem description
        #[arg(long, short)]
        description: String,

        /// Difficulty: easy/medium/hard
        #[arg(long)]
        difficulty: String,

        /// Source URL (e.g. the original problem page)
        #[arg(long)]
        source_url: Option<String>,

        /// Comma-separated tags
        #[arg(long, short)]
        tags: Option<String>,
    },

    /// Show problem details
    Show {
        /// Problem ID
        id: i64,
    },

    /// Delete a problem
    Delete {
        /// Problem ID
        id: i64,
    },

    /// Update problem tags
    Tag {
        /// Problem ID
        id: i64,

        /// Comma-separated tags (replaces existing)
        #[arg(long, short)]
        tags: String,
    },
}

#[derive(Subcommand)]
enum SolutionCommands {
    /// Add a solution for a problem
    Add {
        /// Problem ID
        problem_id: i64,

        /// Language the solution is written in
        #[arg(long, short)]
        language: String,

        /// Read the solution from a file
        #[arg(long, short, conflicts_with = "code")]
        file: Option<PathBuf>,

        /// Pass the solution inline
        #[arg(long, short)]
        code: Option<String>,
    },

    /// List solutions for a problem
    List {
        /// Problem ID
        problem_id: i64,
    },

    /// Print a solution's code
    Show {
        /// Solution ID
        id: i64,
    },

    /// Delete a solution
    Delete {
        /// Solution ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum TestcaseCommands {
    /// Add a test case to a solution
    Add {
        /// Solution ID
        solution_id: i64,

        /// Input fed to the solution
        #[arg(long, short)]
        input: String,

        /// Output the solution is expected to produce
        #[arg(long, short)]
        expected: String,
    },

    /// List test cases for a solution
    List {
        /// Solution ID
        solution_id: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("DEVDOJO_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devdojo");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn get_store_path() -> PathBuf {
    if let Ok(path) = std::env::var("DEVDOJO_SOLUTIONS") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devdojo")
        .join("solutions")
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Problem(problem_cmd) => run_problem(cli.json, &db, problem_cmd)?,
        Commands::Solution(solution_cmd) => run_solution(cli.json, &db, solution_cmd)?,
        Commands::Testcase(testcase_cmd) => run_testcase(cli.json, &db, testcase_cmd)?,

        Commands::Tags => {
            let tags = db.list_tags()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&tags))?);
            } else if tags.is_empty() {
                println!("No tags found.");
            } else {
                println!("{:<5} {:<30} PROBLEMS", "ID", "TAG");
                println!("{}", "-".repeat(50));
                for tag in tags {
                    println!("{:<5} {:<30} {}", tag.id, tag.name, tag.problem_count);
                }
            }
        }

        Commands::Stats => {
            let stats = db.get_stats()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "total_problems": stats.total_problems,
                        "total_solutions": stats.total_solutions,
                        "total_attempts": stats.total_attempts,
                        "mastered": stats.mastered,
                        "due_now": stats.due_now,
                        "avg_mastery": stats.avg_mastery
                    })))?
                );
            } else {
                println!("=== Practice Statistics ===");
                println!("Total problems: {}", stats.total_problems);
                println!("Total solutions: {}", stats.total_solutions);
                println!("Total attempts: {}", stats.total_attempts);
                println!("Mastered (0.8+): {}", stats.mastered);
                println!("Due for practice: {}", stats.due_now);
                println!("Average mastery: {:.2}", stats.avg_mastery);
            }
        }

        Commands::Due { limit } => {
            let due = db.due_problems(limit)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&due))?);
            } else if due.is_empty() {
                println!("Nothing due for practice.");
            } else {
                println!("{:<5} {:<40} {:<8} MASTERY", "ID", "TITLE", "DIFF");
                println!("{}", "-".repeat(70));
                for pwr in due {
                    let mastery = pwr
                        .record
                        .as_ref()
                        .map(|r| format!("{:.1}", r.mastery_level))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<5} {:<40} {:<8} {}",
                        pwr.problem.id,
                        truncate(&pwr.problem.title, 38),
                        pwr.problem.difficulty.label(),
                        mastery
                    );
                }
            }
        }

        Commands::Next { tag } => {
            if let Some(pwr) = db.next_problem(tag.as_deref())? {
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&pwr))?);
                } else {
                    println!("=== Next Problem to Practice ===");
                    println!();
                    println!("Problem: {} (ID: {})", pwr.problem.title, pwr.problem.id);
                    println!("Difficulty: {}", pwr.problem.difficulty.label());
                    println!(
                        "Tags: {}",
                        if pwr.problem.tags.is_empty() {
                            "-".to_string()
                        } else {
                            pwr.problem.tags.join(", ")
                        }
                    );
                    println!();
                    println!("{}", pwr.problem.description);
                    if let Some(record) = &pwr.record {
                        println!();
                        println!(
                            "Current mastery: {} ({:.1})",
                            record.mastery_label(),
                            record.mastery_level
                        );
                        println!(
                            "Attempts: {} ({:.0}% success rate)",
                            record.times_practiced,
                            record.success_rate()
                        );
                    }
                    println!();
                    println!("After practicing, record the outcome with:");
                    println!(
                        "  devdojo practice {} --outcome <success|fail>",
                        pwr.problem.id
                    );
                }
            } else if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("No problems due for practice.");
            }
        }

        Commands::Practice { id, outcome } => {
            let outcome = AttemptOutcome::from_str(&outcome)
                .ok_or_else(|| format!("Invalid outcome '{}'. Use: success or fail", outcome))?;

            let record = db.record_attempt(id, outcome.is_success())?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&record))?);
            } else {
                println!("Attempt recorded for problem {}.", id);
                println!(
                    "New mastery level: {:.1} ({})",
                    record.mastery_level,
                    record.mastery_label()
                );
                println!("Next review scheduled: {}", record.next_review_date);
            }
        }

        Commands::Check { file } => {
            let source = std::fs::read_to_string(&file)?;
            let result = runner::validate_syntax(&source);
            print_run_result(cli.json, &result)?;
        }

        Commands::Run { file } => {
            let source = std::fs::read_to_string(&file)?;
            let result = runner::execute(&source);
            print_run_result(cli.json, &result)?;
        }

        Commands::Test { source, tests } => {
            let source_text = std::fs::read_to_string(&source)?;
            let test_text = std::fs::read_to_string(&tests)?;
            let result = runner::run_tests(&source_text, &test_text);
            print_run_result(cli.json, &result)?;
        }

        Commands::Tui => {
            tui::run(db)?;
        }
    }

    Ok(())
}

fn run_problem(
    json: bool,
    db: &Database,
    cmd: ProblemCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ProblemCommands::List { tag, difficulty } => {
            let difficulty = match difficulty {
                Some(d) => Some(Difficulty::from_str(&d).ok_or_else(|| {
                    format!("Invalid difficulty '{}'. Use: easy, medium, or hard", d)
                })?),
                None => None,
            };

            let problems = db.list_problems(tag.as_deref(), difficulty)?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&problems))?);
            } else if problems.is_empty() {
                println!("No problems found.");
            } else {
                println!("{:<5} {:<40} {:<8} TAGS", "ID", "TITLE", "DIFF");
                println!("{}", "-".repeat(70));
                for problem in problems {
                    let tags = if problem.tags.is_empty() {
                        String::from("-")
                    } else {
                        problem.tags.join(", ")
                    };
                    println!(
                        "{:<5} {:<40} {:<8} {}",
                        problem.id,
                        truncate(&problem.title, 38),
                        problem.difficulty.label(),
                        tags
                    );
                }
            }
        }

        ProblemCommands::Add {
            title,
            description,
            difficulty,
            source_url,
            tags,
        } => {
            let difficulty = Difficulty::from_str(&difficulty).ok_or_else(|| {
                format!(
                    "Invalid difficulty '{}'. Use: easy, medium, or hard",
                    difficulty
                )
            })?;
            let tag_list: Vec<String> = tags
                .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default();

            let id = db.add_problem(
                &title,
                &description,
                difficulty,
                source_url.as_deref(),
                &tag_list,
            )?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "id": id,
                        "title": title
                    })))?
                );
            } else {
                println!("Added problem '{}' with ID: {}", title, id);
            }
        }

        ProblemCommands::Show { id } => {
            if let Some(problem) = db.get_problem(id)? {
                let record = db.get_practice_record(id)?;
                let solutions = db.list_solutions(id)?;

                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "problem": problem,
                            "record": record,
                            "solutions": solutions
                        })))?
                    );
                } else {
                    println!("Problem: {}", problem.title);
                    println!("ID: {}", problem.id);
                    println!("Difficulty: {}", problem.difficulty.label());
                    if let Some(url) = &problem.source_url {
                        println!("Source: {}", url);
                    }
                    println!(
                        "Tags: {}",
                        if problem.tags.is_empty() {
                            "-".to_string()
                        } else {
                            problem.tags.join(", ")
                        }
                    );
                    println!("Created: {}", problem.created_at);
                    println!();
                    println!("{}", problem.description);

                    if !solutions.is_empty() {
                        println!();
                        println!("--- Solutions ---");
                        for solution in &solutions {
                            println!("#{} ({})", solution.id, solution.language);
                        }
                    }

                    if let Some(r) = record {
                        println!();
                        println!("--- Practice ---");
                        println!("Mastery: {} ({:.1})", r.mastery_label(), r.mastery_level);
                        println!(
                            "Attempts: {} ({:.0}% success rate)",
                            r.times_practiced,
                            r.success_rate()
                        );
                        println!("Last practiced: {}", r.last_practiced);
                        println!("Next review: {}", r.next_review_date);
                    }
                }
            } else if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Problem not found"))?
                );
            } else {
                println!("Problem not found.");
            }
        }

        ProblemCommands::Delete { id } => {
            if db.delete_problem(id)? {
                if json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Problem {} deleted.", id);
                }
            } else if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Problem not found"))?
                );
            } else {
                println!("Problem not found.");
            }
        }

        ProblemCommands::Tag { id, tags } => {
            let tag_list: Vec<String> = tags.split(',').map(|s| s.trim().to_string()).collect();
            db.update_problem_tags(id, &tag_list)?;

            if json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Updated tags for problem {}.", id);
            }
        }
    }

    Ok(())
}

fn run_solution(
    json: bool,
    db: &Database,
    cmd: SolutionCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        SolutionCommands::Add {
            problem_id,
            language,
            file,
            code,
        } => {
            let code = match (file, code) {
                (Some(path), _) => std::fs::read_to_string(path)?,
                (None, Some(code)) => code,
                (None, None) => return Err("Provide the solution via --file or --code".into()),
            };

            if db.get_problem(problem_id)?.is_none() {
                return Err(format!("Problem {} not found", problem_id).into());
            }

            let id = db.add_solution(problem_id, &code, &language)?;
            let store = SolutionStore::open(get_store_path())?;
            let path = store.save(id, &language, &code)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "id": id,
                        "problem_id": problem_id,
                        "file": path.display().to_string()
                    })))?
                );
            } else {
                println!("Added solution {} for problem {}.", id, problem_id);
                println!("Saved to: {}", path.display());
            }
        }

        SolutionCommands::List { problem_id } => {
            let solutions = db.list_solutions(problem_id)?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&solutions))?);
            } else if solutions.is_empty() {
                println!("No solutions found.");
            } else {
                println!("{:<5} {:<12} CREATED", "ID", "LANGUAGE");
                println!("{}", "-".repeat(40));
                for solution in solutions {
                    println!(
                        "{:<5} {:<12} {}",
                        solution.id, solution.language, solution.created_at
                    );
                }
            }
        }

        SolutionCommands::Show { id } => {
            if let Some(solution) = db.get_solution(id)? {
                // Prefer the file mirror; it may have been edited on disk.
                let store = SolutionStore::open(get_store_path())?;
                let code = store
                    .load(solution.id, &solution.language)?
                    .unwrap_or(solution.code);

                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "id": solution.id,
                            "language": solution.language,
                            "code": code
                        })))?
                    );
                } else {
                    println!("{}", code);
                }
            } else if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Solution not found"))?
                );
            } else {
                println!("Solution not found.");
            }
        }

        SolutionCommands::Delete { id } => {
            if let Some(solution) = db.delete_solution(id)? {
                let store = SolutionStore::open(get_store_path())?;
                store.delete(solution.id, &solution.language)?;

                if json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Solution {} deleted.", id);
                }
            } else if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Solution not found"))?
                );
            } else {
                println!("Solution not found.");
            }
        }
    }

    Ok(())
}

fn run_testcase(
    json: bool,
    db: &Database,
    cmd: TestcaseCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TestcaseCommands::Add {
            solution_id,
            input,
            expected,
        } => {
            if db.get_solution(solution_id)?.is_none() {
                return Err(format!("Solution {} not found", solution_id).into());
            }

            let id = db.add_test_case(solution_id, &input, &expected)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "id": id,
                        "solution_id": solution_id
                    })))?
                );
            } else {
                println!("Added test case {} for solution {}.", id, solution_id);
            }
        }

        TestcaseCommands::List { solution_id } => {
            let cases = db.list_test_cases(solution_id)?;
            if json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&cases))?);
            } else if cases.is_empty() {
                println!("No test cases found.");
            } else {
                println!("{:<5} {:<30} EXPECTED", "ID", "INPUT");
                println!("{}", "-".repeat(60));
                for case in cases {
                    println!(
                        "{:<5} {:<30} {}",
                        case.id,
                        truncate(&case.input_data, 28),
                        truncate(&case.expected_output, 20)
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_run_result(json: bool, result: &runner::RunResult) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        // The run result already carries the success/error shape.
        println!("{}", serde_json::to_string(result)?);
        return Ok(());
    }

    if !result.output.is_empty() {
        print!("{}", result.output);
        if !result.output.ends_with('\n') {
            println!();
        }
    }
    if !result.success {
        eprintln!("{}", result.error_message);
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
