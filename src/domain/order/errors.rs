#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("User is not authenticated!")]
    Unauthenticated,
    #[error("User not found!")]
    UserNotFound,
    #[error("Order not found!")]
    OrderNotFound,
    #[error("Order is already paid!")]
    AlreadyPaid,
    #[error("Order is not paid!")]
    NotPaid,
    #[error("Error in PayPal payment!")]
    PaymentNotVerified,
}
