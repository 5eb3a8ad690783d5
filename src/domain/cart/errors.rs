use crate::domain::ProductId;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Cart session not found. Please refresh the page.")]
    NoCartSession,
    #[error("Product {0} not found!")]
    ProductNotFound(ProductId),
    #[error("Not enough stock.")]
    InsufficientStock,
    #[error("Item not found in cart.")]
    ItemNotFound,
}
