use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use std::path::Path;

use crate::models::{
    Attempt, Difficulty, PracticeRecord, Problem, ProblemWithRecord, Solution, Tag, TestCase,
};
use crate::scheduler;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Cascading deletes need this; SQLite leaves it off.
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK(difficulty IN ('easy', 'medium', 'hard')),
                source_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS problem_tags (
                problem_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (problem_id, tag_id),
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS solutions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL,
                code TEXT NOT NULL,
                language TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS test_cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                solution_id INTEGER NOT NULL,
                input_data TEXT NOT NULL,
                expected_output TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (solution_id) REFERENCES solutions(id) ON DELETE CASCADE
            );

            -- One per problem; rows appear on the first practice attempt.
            CREATE TABLE IF NOT EXISTS practice_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL UNIQUE,
                mastery_level REAL NOT NULL DEFAULT 0.0,
                times_practiced INTEGER NOT NULL DEFAULT 0,
                times_succeeded INTEGER NOT NULL DEFAULT 0,
                last_practiced TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS practice_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL,
                success INTEGER NOT NULL,
                practiced_at TEXT NOT NULL,
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_problems_title ON problems(title);
            CREATE INDEX IF NOT EXISTS idx_problem_tags_tag ON problem_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_solutions_problem ON solutions(problem_id);
            CREATE INDEX IF NOT EXISTS idx_test_cases_solution ON test_cases(solution_id);
            CREATE INDEX IF NOT EXISTS idx_records_next_review ON practice_records(next_review_date);
            CREATE INDEX IF NOT EXISTS idx_records_mastery ON practice_records(mastery_level);
            CREATE INDEX IF NOT EXISTS idx_history_problem ON practice_history(problem_id);
            "#,
        )?;

        Ok(())
    }

    // Problem operations
    pub fn add_problem(
        &self,
        title: &str,
        description: &str,
        difficulty: Difficulty,
        source_url: Option<&str>,
        tags: &[String],
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO problems (title, description, difficulty, source_url) VALUES (?1, ?2, ?3, ?4)",
            params![title, description, difficulty.as_str(), source_url],
        )?;
        let problem_id = self.conn.last_insert_rowid();

        for tag in tags {
            let tag_id = self.get_or_create_tag(tag)?;
            self.conn.execute(
                "INSERT OR IGNORE INTO problem_tags (problem_id, tag_id) VALUES (?1, ?2)",
                params![problem_id, tag_id],
            )?;
        }

        Ok(problem_id)
    }

    pub fn get_problem(&self, id: i64) -> Result<Option<Problem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, difficulty, source_url, created_at, updated_at
             FROM problems WHERE id = ?1",
        )?;

        let problem = stmt.query_row(params![id], Self::map_problem_row);

        match problem {
            Ok(mut p) => {
                p.tags = self.get_problem_tags(id)?;
                Ok(Some(p))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_problems(
        &self,
        tag_filter: Option<&str>,
        difficulty_filter: Option<Difficulty>,
    ) -> Result<Vec<Problem>> {
        let mut query = String::from(
            "SELECT DISTINCT p.id, p.title, p.description, p.difficulty, p.source_url,
                    p.created_at, p.updated_at
             FROM problems p",
        );
        let mut conditions: Vec<&str> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(tag) = tag_filter {
            query.push_str(
                " JOIN problem_tags pt ON p.id = pt.problem_id
                  JOIN tags tg ON pt.tag_id = tg.id",
            );
            params_vec.push(Box::new(tag.to_string()));
            conditions.push("tg.name = ?1");
        }
        if let Some(difficulty) = difficulty_filter {
            params_vec.push(Box::new(difficulty.as_str().to_string()));
            conditions.push(if params_vec.len() == 1 {
                "p.difficulty = ?1"
            } else {
                "p.difficulty = ?2"
            });
        }
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY p.id");

        let mut stmt = self.conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), Self::map_problem_row)?;
        let mut problems = rows.collect::<Result<Vec<_>>>()?;

        for problem in &mut problems {
            problem.tags = self.get_problem_tags(problem.id)?;
        }

        Ok(problems)
    }

    pub fn delete_problem(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM problems WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn update_problem_tags(&self, problem_id: i64, tags: &[String]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM problem_tags WHERE problem_id = ?1",
            params![problem_id],
        )?;

        for tag in tags {
            let tag_id = self.get_or_create_tag(tag)?;
            self.conn.execute(
                "INSERT OR IGNORE INTO problem_tags (problem_id, tag_id) VALUES (?1, ?2)",
                params![problem_id, tag_id],
            )?;
        }

        self.conn.execute(
            "UPDATE problems SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), problem_id],
        )?;

        Ok(())
    }

    fn map_problem_row(row: &rusqlite::Row) -> rusqlite::Result<Problem> {
        let difficulty_str: String = row.get(3)?;
        Ok(Problem {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            difficulty: Difficulty::from_str(&difficulty_str).unwrap_or(Difficulty::Medium),
            source_url: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            tags: vec![],
        })
    }

    // Tag operations
    fn get_or_create_tag(&self, name: &str) -> Result<i64> {
        let existing: Result<i64> =
            self.conn
                .query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                    row.get(0)
                });

        match existing {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                self.conn
                    .execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
                Ok(self.conn.last_insert_rowid())
            }
            Err(e) => Err(e),
        }
    }

    fn get_problem_tags(&self, problem_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tg.name
            FROM tags tg
            JOIN problem_tags pt ON tg.id = pt.tag_id
            WHERE pt.problem_id = ?1
            ORDER BY tg.name
            "#,
        )?;

        let rows = stmt.query_map(params![problem_id], |row| row.get(0))?;
        rows.collect()
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tg.id, tg.name, COUNT(pt.problem_id) as problem_count
            FROM tags tg
            LEFT JOIN problem_tags pt ON tg.id = pt.tag_id
            GROUP BY tg.id, tg.name
            ORDER BY tg.name
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                problem_count: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    // Solution operations
    pub fn add_solution(&self, problem_id: i64, code: &str, language: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO solutions (problem_id, code, language) VALUES (?1, ?2, ?3)",
            params![problem_id, code, language],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_solution(&self, id: i64) -> Result<Option<Solution>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, problem_id, code, language, created_at FROM solutions WHERE id = ?1",
        )?;

        let solution = stmt.query_row(params![id], Self::map_solution_row);

        match solution {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_solutions(&self, problem_id: i64) -> Result<Vec<Solution>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, problem_id, code, language, created_at
             FROM solutions WHERE problem_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![problem_id], Self::map_solution_row)?;
        rows.collect()
    }

    // Returns the deleted solution so the caller can clean up its file mirror.
    pub fn delete_solution(&self, id: i64) -> Result<Option<Solution>> {
        let solution = self.get_solution(id)?;
        if solution.is_some() {
            self.conn
                .execute("DELETE FROM solutions WHERE id = ?1", params![id])?;
        }
        Ok(solution)
    }

    fn map_solution_row(row: &rusqlite::Row) -> rusqlite::Result<Solution> {
        Ok(Solution {
            id: row.get(0)?,
            problem_id: row.get(1)?,
            code: row.get(2)?,
            language: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // Test case operations
    pub fn add_test_case(
        &self,
        solution_id: i64,
        input_data: &str,
        expected_output: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO test_cases (solution_id, input_data, expected_output) VALUES (?1, ?2, ?3)",
            params![solution_id, input_data, expected_output],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_test_cases(&self, solution_id: i64) -> Result<Vec<TestCase>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, solution_id, input_data, expected_output, created_at
             FROM test_cases WHERE solution_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![solution_id], |row| {
            Ok(TestCase {
                id: row.get(0)?,
                solution_id: row.get(1)?,
                input_data: row.get(2)?,
                expected_output: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    // Practice operations
    pub fn get_practice_record(&self, problem_id: i64) -> Result<Option<PracticeRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, problem_id, mastery_level, times_practiced, times_succeeded,
                   last_practiced, next_review_date
            FROM practice_records
            WHERE problem_id = ?1
            "#,
        )?;

        let record = stmt.query_row(params![problem_id], Self::map_record_row);

        match record {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Record one practice attempt: create the record on first use (seeded at
    // 0.0), step the mastery level, and schedule the next review.
    pub fn record_attempt(&self, problem_id: i64, success: bool) -> Result<PracticeRecord> {
        // The attempt must belong to a real problem.
        self.get_problem(problem_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        let now = Utc::now();

        self.conn.execute(
            "INSERT INTO practice_history (problem_id, success, practiced_at) VALUES (?1, ?2, ?3)",
            params![problem_id, success, now.to_rfc3339()],
        )?;

        let current_level = self
            .get_practice_record(problem_id)?
            .map(|r| r.mastery_level)
            .unwrap_or(0.0);

        let (new_level, next_review) = scheduler::update_mastery(current_level, success);

        self.conn.execute(
            r#"
            INSERT INTO practice_records
                (problem_id, mastery_level, times_practiced, times_succeeded,
                 last_practiced, next_review_date)
            VALUES (?1, ?2, 1, ?3, ?4, ?5)
            ON CONFLICT(problem_id) DO UPDATE SET
                mastery_level = ?2,
                times_practiced = times_practiced + 1,
                times_succeeded = times_succeeded + ?3,
                last_practiced = ?4,
                next_review_date = ?5
            "#,
            params![
                problem_id,
                new_level,
                success as i32,
                now.to_rfc3339(),
                next_review.to_rfc3339()
            ],
        )?;

        self.get_practice_record(problem_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    // Problems whose next review date has passed, soonest first.
    pub fn due_problems(&self, limit: usize) -> Result<Vec<ProblemWithRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.title, p.description, p.difficulty, p.source_url,
                   p.created_at, p.updated_at,
                   r.id, r.problem_id, r.mastery_level, r.times_practiced,
                   r.times_succeeded, r.last_practiced, r.next_review_date
            FROM problems p
            JOIN practice_records r ON p.id = r.problem_id
            WHERE r.next_review_date <= ?1
            ORDER BY r.next_review_date ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![Utc::now().to_rfc3339(), limit as i64], |row| {
            Ok(ProblemWithRecord {
                problem: Self::map_problem_row(row)?,
                record: Some(Self::map_record_row_at(row, 7)?),
            })
        })?;
        let mut due = rows.collect::<Result<Vec<_>>>()?;

        for pwr in &mut due {
            pwr.problem.tags = self.get_problem_tags(pwr.problem.id)?;
        }

        Ok(due)
    }

    // Every problem with its practice record (if any), for listings.
    pub fn problems_with_records(&self, tag_filter: Option<&str>) -> Result<Vec<ProblemWithRecord>> {
        let problems = self.list_problems(tag_filter, None)?;

        let mut result = Vec::with_capacity(problems.len());
        for problem in problems {
            let record = self.get_practice_record(problem.id)?;
            result.push(ProblemWithRecord { problem, record });
        }

        Ok(result)
    }

    // Stochastic selection of the next problem to practice, weighted toward
    // overdue and low-mastery problems.
    pub fn next_problem(&self, tag_filter: Option<&str>) -> Result<Option<ProblemWithRecord>> {
        let now = Utc::now();
        let due: Vec<ProblemWithRecord> = self
            .due_problems(usize::MAX >> 1)?
            .into_iter()
            .filter(|pwr| match tag_filter {
                Some(tag) => pwr.problem.tags.iter().any(|t| t == tag),
                None => true,
            })
            .collect();

        if due.is_empty() {
            return Ok(None);
        }

        use rand::Rng;
        let mut rng = rand::thread_rng();

        let weights: Vec<f64> = due
            .iter()
            .map(|pwr| {
                let record = match &pwr.record {
                    Some(r) => r,
                    None => return 1.0,
                };
                let overdue_days = DateTime::parse_from_rfc3339(&record.next_review_date)
                    .map(|next| {
                        let diff = now.signed_duration_since(next.with_timezone(&Utc));
                        diff.num_days().max(0) as f64 + 1.0
                    })
                    .unwrap_or(1.0);

                // Lower mastery = higher weight, overdue = higher weight
                let mastery_weight = 2.0 - record.mastery_level;
                overdue_days * mastery_weight
            })
            .collect();

        let total_weight: f64 = weights.iter().sum();
        let mut random_point = rng.gen::<f64>() * total_weight;

        for (i, weight) in weights.iter().enumerate() {
            random_point -= weight;
            if random_point <= 0.0 {
                return Ok(Some(due[i].clone()));
            }
        }

        // Fallback to first
        Ok(due.into_iter().next())
    }

    pub fn problem_attempts(&self, problem_id: i64, limit: usize) -> Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, problem_id, success, practiced_at
            FROM practice_history
            WHERE problem_id = ?1
            ORDER BY practiced_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![problem_id, limit as i64], |row| {
            Ok(Attempt {
                id: row.get(0)?,
                problem_id: row.get(1)?,
                success: row.get::<_, i32>(2)? != 0,
                practiced_at: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn recent_attempts(&self, limit: usize) -> Result<Vec<(Attempt, String)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT h.id, h.problem_id, h.success, h.practiced_at, p.title
            FROM practice_history h
            JOIN problems p ON h.problem_id = p.id
            ORDER BY h.practiced_at DESC, h.id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                Attempt {
                    id: row.get(0)?,
                    problem_id: row.get(1)?,
                    success: row.get::<_, i32>(2)? != 0,
                    practiced_at: row.get(3)?,
                },
                row.get(4)?,
            ))
        })?;
        rows.collect()
    }

    pub fn get_stats(&self) -> Result<Stats> {
        let total_problems: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM problems", [], |row| row.get(0))?;

        let total_solutions: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM solutions", [], |row| row.get(0))?;

        let total_attempts: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM practice_history", [], |row| row.get(0))?;

        let mastered: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM practice_records WHERE mastery_level >= 0.8",
            [],
            |row| row.get(0),
        )?;

        let due_now: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM practice_records WHERE next_review_date <= ?1",
            params![Utc::now().to_rfc3339()],
            |row| row.get(0),
        )?;

        let avg_mastery: f64 = self
            .conn
            .query_row(
                "SELECT COALESCE(AVG(mastery_level), 0) FROM practice_records",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0.0);

        Ok(Stats {
            total_problems,
            total_solutions,
            total_attempts,
            mastered,
            due_now,
            avg_mastery,
        })
    }

    fn map_record_row(row: &rusqlite::Row) -> rusqlite::Result<PracticeRecord> {
        Self::map_record_row_at(row, 0)
    }

    fn map_record_row_at(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<PracticeRecord> {
        Ok(PracticeRecord {
            id: row.get(offset)?,
            problem_id: row.get(offset + 1)?,
            mastery_level: row.get(offset + 2)?,
            times_practiced: row.get(offset + 3)?,
            times_succeeded: row.get(offset + 4)?,
            last_practiced: row.get(offset + 5)?,
            next_review_date: row.get(offset + 6)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub total_problems: i64,
    pub total_solutions: i64,
    pub total_attempts: i64,
    pub mastered: i64,
    pub due_now: i64,
    pub avg_mastery: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn add_sample_problem(db: &Database) -> i64 {
        db.add_problem("Two Sum", "Find two numbers adding to a target", Difficulty::Easy, None, &[])
            .unwrap()
    }

    fn backdate_review(db: &Database, problem_id: i64, days: i64) {
        let past = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        db.conn
            .execute(
                "UPDATE practice_records SET next_review_date = ?1 WHERE problem_id = ?2",
                params![past, problem_id],
            )
            .unwrap();
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in [
                "problems",
                "tags",
                "problem_tags",
                "solutions",
                "test_cases",
                "practice_records",
                "practice_history",
            ] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            add_sample_problem(&db);

            db.init().expect("Re-init should succeed");

            let problems = db.list_problems(None, None).unwrap();
            assert_eq!(problems.len(), 1);
        }
    }

    mod problem_tests {
        use super::*;

        #[test]
        fn add_problem_basic() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            assert!(id > 0);

            let problem = db.get_problem(id).unwrap().unwrap();
            assert_eq!(problem.title, "Two Sum");
            assert_eq!(problem.difficulty, Difficulty::Easy);
            assert!(problem.source_url.is_none());
            assert!(problem.tags.is_empty());
        }

        #[test]
        fn add_problem_with_tags_and_url() {
            let db = setup_db();
            let tags = vec!["arrays".to_string(), "hashmap".to_string()];
            let id = db
                .add_problem(
                    "Two Sum",
                    "desc",
                    Difficulty::Easy,
                    Some("https://leetcode.com/problems/two-sum"),
                    &tags,
                )
                .unwrap();

            let problem = db.get_problem(id).unwrap().unwrap();
            assert_eq!(problem.tags.len(), 2);
            assert!(problem.tags.contains(&"arrays".to_string()));
            assert_eq!(
                problem.source_url.as_deref(),
                Some("https://leetcode.com/problems/two-sum")
            );
        }

        #[test]
        fn duplicate_titles_are_allowed() {
            let db = setup_db();
            add_sample_problem(&db);
            add_sample_problem(&db);
            assert_eq!(db.list_problems(None, None).unwrap().len(), 2);
        }

        #[test]
        fn get_problem_not_found() {
            let db = setup_db();
            assert!(db.get_problem(999).unwrap().is_none());
        }

        #[test]
        fn list_problems_filters_by_tag() {
            let db = setup_db();
            db.add_problem("A", "d", Difficulty::Easy, None, &["graphs".to_string()])
                .unwrap();
            db.add_problem("B", "d", Difficulty::Easy, None, &["arrays".to_string()])
                .unwrap();

            let graphs = db.list_problems(Some("graphs"), None).unwrap();
            assert_eq!(graphs.len(), 1);
            assert_eq!(graphs[0].title, "A");
        }

        #[test]
        fn list_problems_filters_by_difficulty() {
            let db = setup_db();
            db.add_problem("A", "d", Difficulty::Easy, None, &[]).unwrap();
            db.add_problem("B", "d", Difficulty::Hard, None, &[]).unwrap();

            let hard = db.list_problems(None, Some(Difficulty::Hard)).unwrap();
            assert_eq!(hard.len(), 1);
            assert_eq!(hard[0].title, "B");
        }

        #[test]
        fn list_problems_filters_by_tag_and_difficulty() {
            let db = setup_db();
            db.add_problem("A", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();
            db.add_problem("B", "d", Difficulty::Hard, None, &["dp".to_string()])
                .unwrap();
            db.add_problem("C", "d", Difficulty::Hard, None, &[]).unwrap();

            let filtered = db
                .list_problems(Some("dp"), Some(Difficulty::Hard))
                .unwrap();
            assert_eq!(filtered.len(), 1);
            assert_eq!(filtered[0].title, "B");
        }

        #[test]
        fn delete_problem_cascades() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            let solution_id = db.add_solution(id, "code", "rust").unwrap();
            db.add_test_case(solution_id, "1 2", "3").unwrap();
            db.record_attempt(id, true).unwrap();

            assert!(db.delete_problem(id).unwrap());

            assert!(db.get_solution(solution_id).unwrap().is_none());
            assert!(db.get_practice_record(id).unwrap().is_none());
            assert!(db.recent_attempts(10).unwrap().is_empty());
        }

        #[test]
        fn delete_problem_not_found() {
            let db = setup_db();
            assert!(!db.delete_problem(999).unwrap());
        }

        #[test]
        fn update_problem_tags_replaces() {
            let db = setup_db();
            let id = db
                .add_problem("A", "d", Difficulty::Easy, None, &["old".to_string()])
                .unwrap();

            db.update_problem_tags(id, &["new".to_string(), "fresh".to_string()])
                .unwrap();

            let problem = db.get_problem(id).unwrap().unwrap();
            assert_eq!(problem.tags, vec!["fresh".to_string(), "new".to_string()]);
            assert!(problem.updated_at.is_some());
        }
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn list_tags_counts_problems() {
            let db = setup_db();
            db.add_problem("A", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();
            db.add_problem("B", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();

            let tags = db.list_tags().unwrap();
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].name, "dp");
            assert_eq!(tags[0].problem_count, 2);
        }

        #[test]
        fn tags_are_shared_not_duplicated() {
            let db = setup_db();
            db.add_problem("A", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();
            db.add_problem("B", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();

            let count: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 1);
        }
    }

    mod solution_tests {
        use super::*;

        #[test]
        fn add_and_list_solutions() {
            let db = setup_db();
            let problem_id = add_sample_problem(&db);
            db.add_solution(problem_id, "fn a() {}", "rust").unwrap();
            db.add_solution(problem_id, "def a(): pass", "python").unwrap();

            let solutions = db.list_solutions(problem_id).unwrap();
            assert_eq!(solutions.len(), 2);
            assert_eq!(solutions[0].language, "rust");
            assert_eq!(solutions[1].language, "python");
        }

        #[test]
        fn delete_solution_returns_it() {
            let db = setup_db();
            let problem_id = add_sample_problem(&db);
            let id = db.add_solution(problem_id, "code", "rust").unwrap();

            let deleted = db.delete_solution(id).unwrap().unwrap();
            assert_eq!(deleted.language, "rust");
            assert!(db.get_solution(id).unwrap().is_none());
        }

        #[test]
        fn delete_solution_not_found() {
            let db = setup_db();
            assert!(db.delete_solution(999).unwrap().is_none());
        }

        #[test]
        fn test_cases_attach_to_solutions() {
            let db = setup_db();
            let problem_id = add_sample_problem(&db);
            let solution_id = db.add_solution(problem_id, "code", "rust").unwrap();
            db.add_test_case(solution_id, "1 2", "3").unwrap();
            db.add_test_case(solution_id, "4 5", "9").unwrap();

            let cases = db.list_test_cases(solution_id).unwrap();
            assert_eq!(cases.len(), 2);
            assert_eq!(cases[0].input_data, "1 2");
            assert_eq!(cases[1].expected_output, "9");
        }
    }

    mod practice_tests {
        use super::*;

        #[test]
        fn first_successful_attempt_creates_record() {
            let db = setup_db();
            let id = add_sample_problem(&db);

            let record = db.record_attempt(id, true).unwrap();
            assert!((record.mastery_level - 0.1).abs() < EPSILON);
            assert_eq!(record.times_practiced, 1);
            assert_eq!(record.times_succeeded, 1);
        }

        #[test]
        fn first_failed_attempt_stays_at_zero() {
            let db = setup_db();
            let id = add_sample_problem(&db);

            let record = db.record_attempt(id, false).unwrap();
            assert_eq!(record.mastery_level, 0.0);
            assert_eq!(record.times_practiced, 1);
            assert_eq!(record.times_succeeded, 0);
        }

        #[test]
        fn repeated_successes_saturate_at_one() {
            let db = setup_db();
            let id = add_sample_problem(&db);

            let mut record = db.record_attempt(id, true).unwrap();
            for _ in 0..14 {
                record = db.record_attempt(id, true).unwrap();
                assert!(record.mastery_level <= 1.0);
            }
            assert!((record.mastery_level - 1.0).abs() < EPSILON);
            assert_eq!(record.times_practiced, 15);
        }

        #[test]
        fn failures_never_undershoot_zero() {
            let db = setup_db();
            let id = add_sample_problem(&db);

            let mut record = db.record_attempt(id, false).unwrap();
            for _ in 0..5 {
                record = db.record_attempt(id, false).unwrap();
            }
            assert_eq!(record.mastery_level, 0.0);
        }

        #[test]
        fn next_review_is_in_the_future() {
            let db = setup_db();
            let id = add_sample_problem(&db);

            let record = db.record_attempt(id, true).unwrap();
            let next = DateTime::parse_from_rfc3339(&record.next_review_date).unwrap();
            assert!(next.with_timezone(&Utc) > Utc::now());
        }

        #[test]
        fn attempt_on_unknown_problem_is_an_error() {
            let db = setup_db();
            assert!(db.record_attempt(999, true).is_err());
        }

        #[test]
        fn problem_attempts_are_scoped_to_the_problem() {
            let db = setup_db();
            let a = add_sample_problem(&db);
            let b = db.add_problem("B", "d", Difficulty::Easy, None, &[]).unwrap();
            db.record_attempt(a, true).unwrap();
            db.record_attempt(b, false).unwrap();

            let attempts = db.problem_attempts(a, 10).unwrap();
            assert_eq!(attempts.len(), 1);
            assert!(attempts[0].success);
        }

        #[test]
        fn attempts_are_logged_to_history() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            db.record_attempt(id, true).unwrap();
            db.record_attempt(id, false).unwrap();

            let attempts = db.recent_attempts(10).unwrap();
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].0.problem_id, id);
            assert_eq!(attempts[0].1, "Two Sum");
        }
    }

    mod due_tests {
        use super::*;

        #[test]
        fn unpracticed_problems_are_not_due() {
            let db = setup_db();
            add_sample_problem(&db);
            assert!(db.due_problems(10).unwrap().is_empty());
        }

        #[test]
        fn freshly_practiced_problems_are_not_due() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            db.record_attempt(id, false).unwrap();
            assert!(db.due_problems(10).unwrap().is_empty());
        }

        #[test]
        fn overdue_problems_are_returned() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            db.record_attempt(id, true).unwrap();
            backdate_review(&db, id, 2);

            let due = db.due_problems(10).unwrap();
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].problem.id, id);
            assert!(due[0].record.is_some());
        }

        #[test]
        fn due_problems_ordered_soonest_first() {
            let db = setup_db();
            let a = db.add_problem("A", "d", Difficulty::Easy, None, &[]).unwrap();
            let b = db.add_problem("B", "d", Difficulty::Easy, None, &[]).unwrap();
            db.record_attempt(a, true).unwrap();
            db.record_attempt(b, true).unwrap();
            backdate_review(&db, a, 1);
            backdate_review(&db, b, 5);

            let due = db.due_problems(10).unwrap();
            assert_eq!(due.len(), 2);
            assert_eq!(due[0].problem.id, b);
            assert_eq!(due[1].problem.id, a);
        }

        #[test]
        fn next_problem_none_when_nothing_due() {
            let db = setup_db();
            add_sample_problem(&db);
            assert!(db.next_problem(None).unwrap().is_none());
        }

        #[test]
        fn next_problem_returns_the_only_due_problem() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            db.record_attempt(id, false).unwrap();
            backdate_review(&db, id, 3);

            let next = db.next_problem(None).unwrap().unwrap();
            assert_eq!(next.problem.id, id);
        }

        #[test]
        fn next_problem_honors_tag_filter() {
            let db = setup_db();
            let a = db
                .add_problem("A", "d", Difficulty::Easy, None, &["dp".to_string()])
                .unwrap();
            let b = db.add_problem("B", "d", Difficulty::Easy, None, &[]).unwrap();
            db.record_attempt(a, false).unwrap();
            db.record_attempt(b, false).unwrap();
            backdate_review(&db, a, 2);
            backdate_review(&db, b, 2);

            for _ in 0..10 {
                let next = db.next_problem(Some("dp")).unwrap().unwrap();
                assert_eq!(next.problem.id, a);
            }
        }

        #[test]
        fn problems_with_records_includes_unpracticed() {
            let db = setup_db();
            let a = add_sample_problem(&db);
            let b = db.add_problem("B", "d", Difficulty::Hard, None, &[]).unwrap();
            db.record_attempt(a, true).unwrap();

            let all = db.problems_with_records(None).unwrap();
            assert_eq!(all.len(), 2);
            assert!(all.iter().any(|p| p.problem.id == a && p.record.is_some()));
            assert!(all.iter().any(|p| p.problem.id == b && p.record.is_none()));
        }
    }

    mod stats_tests {
        use super::*;

        #[test]
        fn empty_database_stats() {
            let db = setup_db();
            let stats = db.get_stats().unwrap();
            assert_eq!(stats.total_problems, 0);
            assert_eq!(stats.total_attempts, 0);
            assert_eq!(stats.due_now, 0);
            assert_eq!(stats.avg_mastery, 0.0);
        }

        #[test]
        fn stats_track_activity() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            db.add_solution(id, "code", "rust").unwrap();
            db.record_attempt(id, true).unwrap();
            db.record_attempt(id, true).unwrap();

            let stats = db.get_stats().unwrap();
            assert_eq!(stats.total_problems, 1);
            assert_eq!(stats.total_solutions, 1);
            assert_eq!(stats.total_attempts, 2);
            assert!((stats.avg_mastery - 0.2).abs() < EPSILON);
        }

        #[test]
        fn mastered_counts_high_mastery() {
            let db = setup_db();
            let id = add_sample_problem(&db);
            // Nine successes land at ~0.9, comfortably past the 0.8 bar.
            for _ in 0..9 {
                db.record_attempt(id, true).unwrap();
            }

            let stats = db.get_stats().unwrap();
            assert_eq!(stats.mastered, 1);
        }
    }
}
