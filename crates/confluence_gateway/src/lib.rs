pub mod client;
pub mod error;
pub mod multipart;

pub use client::{DurationsResponse, RenderDetails, RenderReport, ServiceClient, UploadResponse};
pub use error::{GatewayError, Result};
