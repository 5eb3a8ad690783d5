mod action_result;
mod cli;
mod client_error;
mod config;
pub mod session;

pub use action_result::ActionResult;
pub use cli::Cli;
pub use client_error::{ClientError, first_validation_message};
pub use config::{
    AuthSettings, DatabaseSettings, EmailSettings, PayPalSettings, PaymentSettings, Settings,
    StorageSettings, StripeSettings, get_config_settings,
};
pub use session::{AdminUser, AuthUser, CartContext, SessionUser, TokenKeys};
