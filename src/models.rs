use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" | "e" | "1" => Some(Difficulty::Easy),
            "medium" | "m" | "med" | "2" => Some(Difficulty::Medium),
            "hard" | "h" | "3" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

// Outcome of a practice attempt. The scheduler only cares about the boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Success,
    Fail,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Fail => "fail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" | "s" | "yes" | "y" | "pass" | "solved" | "1" => {
                Some(AttemptOutcome::Success)
            }
            "fail" | "f" | "no" | "n" | "failed" | "0" => Some(AttemptOutcome::Fail),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub source_url: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: i64,
    pub problem_id: i64,
    pub code: String,
    pub language: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub solution_id: i64,
    pub input_data: String,
    pub expected_output: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub problem_count: i64,
}

// One per problem, created on the first practice attempt. `mastery_level`
// always stays within [0.0, 1.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub id: i64,
    pub problem_id: i64,
    pub mastery_level: f64,
    pub times_practiced: i32,
    pub times_succeeded: i32,
    pub last_practiced: String,
    pub next_review_date: String,
}

impl PracticeRecord {
    pub fn mastery_label(&self) -> &'static str {
        if self.mastery_level >= 1.0 {
            "Mastered"
        } else if self.mastery_level >= 0.8 {
            "Proficient"
        } else if self.mastery_level >= 0.6 {
            "Comfortable"
        } else if self.mastery_level >= 0.4 {
            "Familiar"
        } else if self.mastery_level >= 0.2 {
            "Learning"
        } else {
            "New"
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.times_practiced == 0 {
            0.0
        } else {
            (self.times_succeeded as f64 / self.times_practiced as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemWithRecord {
    pub problem: Problem,
    pub record: Option<PracticeRecord>,
}

// One row of practice history, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub problem_id: i64,
    pub success: bool,
    pub practiced_at: String,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
