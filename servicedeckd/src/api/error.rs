use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use shared::types::MessageResponse;
use crate::store::StoreError;

/// Every failure a handler can report, mapped to a status and a `{message}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Name and URL are required.")]
    Validation,

    #[error("Invalid username or password.")]
    Authentication,

    #[error("Unauthorized. Please log in.")]
    Unauthorized,

    #[error("Service not found.")]
    NotFound,

    #[error("Could not read services data.")]
    StorageRead(#[source] StoreError),

    #[error("Could not save services data.")]
    StorageWrite(#[source] StoreError),

    #[error("Something broke!")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation => StatusCode::BAD_REQUEST,
            ApiError::Authentication | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::StorageRead(_) | ApiError::StorageWrite(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation => ApiError::Validation,
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Read { .. } | StoreError::Corrupt { .. } => ApiError::StorageRead(e),
            StoreError::Write { .. } => ApiError::StorageWrite(e),
        }
    }
}

/// Any body the JSON extractor refuses is reported as a missing name or URL.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::Validation
    }
}

/// `Json` extractor whose rejections come back as [`ApiError`] with a `{message}` body
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(ApiJson(value))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::StorageRead(source) | ApiError::StorageWrite(source) => {
                tracing::error!("Storage failure: {}", source);
            }
            ApiError::Internal(source) => {
                tracing::error!("Unhandled error: {:#}", source);
            }
            _ => {}
        }

        (self.status(), Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(ApiError::from(StoreError::Validation).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StoreError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );

        let read = ApiError::from(StoreError::Read {
            path: PathBuf::from("/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(read.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read.to_string(), "Could not read services data.");

        let write = ApiError::from(StoreError::Write {
            path: PathBuf::from("/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert_eq!(write.to_string(), "Could not save services data.");
    }

    #[tokio::test]
    async fn test_body_rejection_is_validation_error() {
        use axum::body::Body;
        use axum::http::{header, Request};
        use shared::types::ServiceInput;

        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":5,"url":"x"}"#))
            .unwrap();
        let err = ApiJson::<ServiceInput>::from_request(request, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation));

        let request = Request::builder().method("POST").body(Body::empty()).unwrap();
        let err = ApiJson::<ServiceInput>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_errors_are_401() {
        assert_eq!(ApiError::Authentication.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
