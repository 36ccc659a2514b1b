use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseDivision {
    pub id: u64,
    pub year: u8,
    pub division: String,
}

impl CourseDivision {
    /// Display label such as `3° B`.
    pub fn label(&self) -> String {
        format!("{}° {}", self.year, self.division)
    }
}

/// A subject taught in a specific course-division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubjectAssignment {
    pub id: u64,
    pub course_division_id: u64,
    pub subject_id: u64,
    pub subject_name: String,
}
