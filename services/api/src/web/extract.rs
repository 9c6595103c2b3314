//! services/api/src/web/extract.rs
//!
//! Request extractors that report failures with the usual `{error}` body.

use crate::error::HttpError;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

/// A JSON body extractor. A missing, mistyped or unparsable field is a
/// 400 `{error}` response instead of axum's plain-text rejection.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Invalid request body: {}", rejection.body_text());
                warn!("{}", message);
                Err(HttpError::bad_request(message))
            }
        }
    }
}
