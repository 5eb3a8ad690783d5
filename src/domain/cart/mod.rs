mod add_item;
mod errors;
mod merge_cart;
mod model;
mod my_cart;
mod remove_item;

pub use add_item::{AddItemPayload, add_item, add_item_endpoint};
pub use errors::CartError;
pub use merge_cart::merge_session_cart;
pub use model::{Cart, CartItem, CartOwner, LineChange, load_cart, open_cart, save_cart};
pub use my_cart::{cart_session_endpoint, my_cart, my_cart_endpoint};
pub use remove_item::{remove_item, remove_item_endpoint};
