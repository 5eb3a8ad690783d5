#[derive(Debug, PartialEq, thiserror::Error)]
pub enum UserError {
    #[error("User not found!")]
    UserNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
}
