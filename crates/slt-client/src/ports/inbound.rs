//! # Inbound Ports
//!
//! What an operator front-end can ask of the client once it is identified.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ClientError, LowerThird, RequestResponse};

/// Lower-third operations - inbound port.
///
/// Every method fails with `ClientError::NotReady` without touching the
/// socket while the session is not identified.
#[async_trait]
pub trait LowerThirdsApi: Send + Sync {
    /// Raw request of any type.
    async fn request(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError>;

    /// Raw vendor call to the configured vendor.
    async fn call_vendor(
        &self,
        request_type: &str,
        request_data: Value,
    ) -> Result<RequestResponse, ClientError>;

    /// All lower thirds, normalized.
    async fn list_lower_thirds(&self) -> Result<Vec<LowerThird>, ClientError>;

    /// Flip visibility of `id`.
    async fn toggle_visible(&self, id: &str) -> Result<RequestResponse, ClientError>;

    /// Force visibility of `id`.
    async fn set_visible(&self, id: &str, visible: bool) -> Result<RequestResponse, ClientError>;
}
