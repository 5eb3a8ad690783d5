pub mod cart;
pub mod catalog;
mod helpers;
mod ids;
pub mod order;
pub mod pricing;
pub mod review;
pub mod seed;
pub mod user;

pub use helpers::{fake, money, pagination};
pub use ids::{CartId, OrderId, ProductId, ReviewId, SessionCartId, UserId, UuidNotCompatible};
