use axum::{
    Json,
    response::{IntoResponse, Response},
};

/// The outcome of every storefront action: a toast message, an optional place to
/// navigate to and an optional payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ActionResult<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_to: None,
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_to: None,
            data: None,
        }
    }
}

impl<T> ActionResult<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_to: None,
            data: Some(data),
        }
    }

    pub fn redirect(success: bool, message: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            redirect_to: Some(to.into()),
            data: None,
        }
    }
}

impl<T: serde::Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
