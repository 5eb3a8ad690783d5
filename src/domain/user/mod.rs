mod admin_users;
mod errors;
mod model;
mod password;
mod profile;
mod sign_in;
mod sign_up;

pub use admin_users::{
    UpdateUserPayload, admin_user_endpoint, admin_users_endpoint, delete_user,
    delete_user_endpoint, list_users, update_user, update_user_endpoint,
};
pub use errors::UserError;
pub use model::{
    PaymentMethod, Role, ShippingAddress, User, find_user, insert_user, normalize_email,
};
pub use password::{hash_password, verify_password};
pub use profile::{
    PaymentMethodPayload, UpdateProfilePayload, profile, profile_endpoint, update_address,
    update_address_endpoint, update_payment_method, update_payment_method_endpoint,
    update_profile, update_profile_endpoint,
};
pub use sign_in::{SignInPayload, SignedIn, sign_in, sign_in_endpoint, sign_out_endpoint};
pub use sign_up::{SignUpPayload, sign_up, sign_up_endpoint};
