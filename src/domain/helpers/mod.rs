pub mod fake;
mod macros;
pub mod money;
pub mod pagination;
