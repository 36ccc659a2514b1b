use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::{Permission, Role};

/// Caller identity placed in the request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub roles: Vec<Role>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.roles.iter().any(|r| r.allows(permission))
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.user_id,
                username = %self.username,
                ?permission,
                "Permission denied"
            );
            Err(AppError::Unauthorized(
                "insufficient permissions for this operation".into(),
            ))
        }
    }

    /// Admins see every teacher report; a teacher only their own.
    pub fn require_teacher_report_access(&self, teacher_id: u64) -> Result<(), AppError> {
        self.require(Permission::ViewTeacherReport)?;
        if self.has_role(Role::Admin) || self.user_id == teacher_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "teachers may only view their own report".into(),
            ))
        }
    }
}
