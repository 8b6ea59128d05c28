//! Branching API access: transport abstraction, typed client and errors.

mod client;
mod error;
pub mod http;
mod types;

pub use client::BranchApi;
pub use error::ApiError;
pub use http::{AsyncHttpClient, HttpError, ReqwestClient};
pub use types::ConnectionInfo;
