#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Product not found!")]
    ProductNotFound,
}
