//! HTTP interface for the captioning pipeline.

pub mod handlers;
pub mod models;
pub mod server;

pub use models::{ApiError, ErrorResponse, ProcessVideoRequest};
pub use server::{router, start_http_server, AppState};
