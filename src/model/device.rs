use serde::{Deserialize, Serialize};

/// A fingerprint reader installed at an entrance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: u64,
    /// e.g. `ESP32_MAIN_DOOR`
    pub identifier: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
}
