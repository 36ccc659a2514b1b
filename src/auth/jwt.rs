use jsonwebtoken::{DecodingKey, Validation, decode, errors::Error};

use crate::models::Claims;

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
pub fn generate_token(
    user_id: u64,
    username: &str,
    roles: Vec<crate::model::role::Role>,
    token_type: crate::models::TokenType,
    secret: &str,
    ttl: usize,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        user_id,
        sub: username.to_string(),
        roles,
        exp: now + ttl,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
