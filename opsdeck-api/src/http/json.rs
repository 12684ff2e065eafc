//! JSON body extractor whose rejections render as `AppError`

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use super::AppError;

/// Like [`Json`], but malformed bodies produce the standard error payload
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
