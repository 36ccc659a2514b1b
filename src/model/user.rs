use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub document_id: String,
    pub is_active: bool,
}

/// The user fields reports carry alongside each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Pérez")]
    pub last_name: String,
    #[schema(example = "40123456")]
    pub document_id: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            document_id: user.document_id.clone(),
        }
    }
}
