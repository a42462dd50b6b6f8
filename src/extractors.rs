use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::response::AppError;

const INVALID_BODY: &str = "Invalid request body";

/// `axum::Json<T>` that rejects with an `AppError` JSON body instead of
/// axum's plain-text rejection.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(rejection_to_app_error(rejection)),
        }
    }
}

fn rejection_to_app_error(rejection: JsonRejection) -> AppError {
    let detail = rejection.body_text();
    match rejection {
        JsonRejection::JsonDataError(_) => {
            tracing::warn!(error = %detail, "JSON data deserialization failed");
            AppError::bad_request("INVALID_REQUEST_BODY", &format!("{INVALID_BODY}: {detail}"))
        }
        JsonRejection::JsonSyntaxError(_) => {
            tracing::warn!(error = %detail, "JSON syntax parsing failed");
            AppError::bad_request("INVALID_REQUEST_BODY", INVALID_BODY)
        }
        JsonRejection::MissingJsonContentType(_) => {
            tracing::warn!(error = %detail, "Missing or invalid JSON Content-Type");
            AppError::bad_request("INVALID_REQUEST_BODY", "Expected application/json body")
        }
        other => {
            tracing::warn!(error = %other, "Unexpected JSON body rejection");
            AppError::bad_request("INVALID_REQUEST_BODY", INVALID_BODY)
        }
    }
}
