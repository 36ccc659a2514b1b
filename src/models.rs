use serde::{Deserialize, Serialize};

use crate::model::role::Role;

/// JWT payload issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub roles: Vec<Role>,
    pub exp: usize,
    pub jti: String,

    #[serde(default = "TokenType::access")]
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn access() -> Self {
        TokenType::Access
    }
}
