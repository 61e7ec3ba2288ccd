//! HTTP access to the Universal Minting Engine.
//!
//! [`ApiClient`] sends JSON and multipart requests with retries, failures come
//! back as a tagged [`ApiError`], and [`ApiErrorHandler`] turns those into
//! messages with a suggested action.

mod client;
mod error;
mod handler;
mod retry;

pub use client::{ApiClient, UploadProgress};
pub use error::{ApiError, ApiErrorCode, is_retryable_status};
pub use handler::{ApiErrorHandler, ErrorAction, UserFacingError};
pub use retry::RetryPolicy;
