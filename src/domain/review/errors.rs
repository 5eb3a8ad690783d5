#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ReviewError {
    #[error("Product not found!")]
    ProductNotFound,
}
