use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use validator::ValidationErrors;

use crate::{
    domain::{
        cart::CartError, catalog::CatalogError, order::OrderError, review::ReviewError,
        user::UserError,
    },
    infra::ActionResult,
    providers::ProviderError,
};

/// Every failure an endpoint can report. Converted into a `{success: false, message}`
/// body so the caller can show it as a toast.
#[derive(Debug)]
pub enum ClientError {
    Cart(CartError),
    Catalog(CatalogError),
    Order(OrderError),
    Review(ReviewError),
    User(UserError),
    Provider(ProviderError),
    Validation(String),
    Unauthenticated,
    Forbidden,
    Internal(anyhow::Error),
}

impl ClientError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ClientError::Cart(cart_error) => {
                let status = match cart_error {
                    CartError::NoCartSession => StatusCode::BAD_REQUEST,
                    CartError::ProductNotFound(_) | CartError::ItemNotFound => {
                        StatusCode::NOT_FOUND
                    }
                    CartError::InsufficientStock => StatusCode::CONFLICT,
                };
                (status, cart_error.to_string())
            }
            ClientError::Catalog(catalog_error) => {
                (StatusCode::NOT_FOUND, catalog_error.to_string())
            }
            ClientError::Order(order_error) => {
                let status = match order_error {
                    OrderError::Unauthenticated => StatusCode::UNAUTHORIZED,
                    OrderError::UserNotFound | OrderError::OrderNotFound => StatusCode::NOT_FOUND,
                    OrderError::AlreadyPaid | OrderError::NotPaid => StatusCode::CONFLICT,
                    OrderError::PaymentNotVerified => StatusCode::BAD_GATEWAY,
                };
                (status, order_error.to_string())
            }
            ClientError::Review(review_error) => (StatusCode::NOT_FOUND, review_error.to_string()),
            ClientError::User(user_error) => {
                let status = match user_error {
                    UserError::UserNotFound => StatusCode::NOT_FOUND,
                    UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                };
                (status, user_error.to_string())
            }
            ClientError::Provider(provider_error) => {
                error!("Payment provider call failed: {provider_error}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The payment provider rejected the request. Please try again.".to_owned(),
                )
            }
            ClientError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ClientError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "You need to be signed in to do that.".to_owned(),
            ),
            ClientError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You are not authorized to do that.".to_owned(),
            ),
            ClientError::Internal(err) => match already_exists_message(err) {
                Some(message) => (StatusCode::CONFLICT, message.to_owned()),
                None => {
                    error!("Internal error: {err:#}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Something went wrong. Please ask your system administrator to check the logs."
                            .to_owned(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, ActionResult::failed(message)).into_response()
    }
}

/// Unique violations on known constraints are reported against the offending field.
fn already_exists_message(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Some(match db_err.constraint() {
                Some("users_email_key") => "User with this email already exists",
                Some("products_slug_key") => "Product with this slug already exists",
                _ => "Record already exists",
            })
        }
        _ => None,
    })
}

/// The first message of the alphabetically first invalid field.
pub fn first_validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));
    fields
        .into_iter()
        .find_map(|(field, errors)| {
            errors.first().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("Invalid {field}."),
            })
        })
        .unwrap_or_else(|| "Invalid fields.".to_owned())
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation(first_validation_message(&errors))
    }
}

impl From<CartError> for ClientError {
    fn from(cart_error: CartError) -> Self {
        ClientError::Cart(cart_error)
    }
}

impl From<CatalogError> for ClientError {
    fn from(catalog_error: CatalogError) -> Self {
        ClientError::Catalog(catalog_error)
    }
}

impl From<OrderError> for ClientError {
    fn from(order_error: OrderError) -> Self {
        ClientError::Order(order_error)
    }
}

impl From<ReviewError> for ClientError {
    fn from(review_error: ReviewError) -> Self {
        ClientError::Review(review_error)
    }
}

impl From<UserError> for ClientError {
    fn from(user_error: UserError) -> Self {
        ClientError::User(user_error)
    }
}

impl From<ProviderError> for ClientError {
    fn from(provider_error: ProviderError) -> Self {
        ClientError::Provider(provider_error)
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(value: anyhow::Error) -> Self {
        ClientError::Internal(value)
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(value: sqlx::Error) -> Self {
        ClientError::Internal(anyhow::Error::new(value))
    }
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 3, message = "Name must be at least 3 characters."))]
        name: String,
        #[validate(email(message = "Invalid email address"))]
        email: String,
    }

    #[test]
    fn validation_reports_the_first_field_message() {
        let form = Form {
            name: "ab".to_owned(),
            email: "nope".to_owned(),
        };
        let errors = form.validate().expect_err("Form should be invalid.");

        assert_eq!(first_validation_message(&errors), "Invalid email address");
    }

    #[test]
    fn domain_errors_keep_their_messages() {
        let (status, message) = ClientError::from(OrderError::AlreadyPaid).status_and_message();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Order is already paid!");

        let (status, _) = ClientError::from(CartError::ItemNotFound).status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = anyhow::anyhow!("connection refused on 10.0.0.3:5432");
        let (status, message) = ClientError::from(err).status_and_message();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("10.0.0.3"));
    }
}
