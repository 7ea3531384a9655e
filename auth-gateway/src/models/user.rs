use serde::{Deserialize, Serialize};
use validator::Validate;

/// Local user record mirroring the identity provider
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub cognito_sub: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmSignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendCodeRequest {
    #[validate(email)]
    pub email: String,
}
