//! # Vendor Calls
//!
//! Plugin-scoped requests ride inside a generic `CallVendorRequest`:
//!
//! ```json
//! {"requestType": "CallVendorRequest",
//!  "requestData": {"vendorName": "smart-lower-thirds",
//!                  "requestType": "ToggleVisible",
//!                  "requestData": {"id": "lt-1"}}}
//! ```
//!
//! The inner type/data pair means something only to the plugin.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::errors::ClientError;

/// Generic request type that tunnels vendor calls.
pub const CALL_VENDOR_REQUEST: &str = "CallVendorRequest";

/// Vendor name registered by the Smart Lower Thirds plugin.
pub const DEFAULT_VENDOR_NAME: &str = "smart-lower-thirds";

/// One vendor-scoped call, alive only while its envelope is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorCall {
    /// Plugin vendor name
    pub vendor_name: String,
    /// Inner request type
    pub request_type: String,
    /// Inner request data; `{}` when absent
    pub request_data: Value,
}

impl VendorCall {
    /// Build a call. `Null` data becomes an empty object.
    pub fn new(vendor_name: &str, request_type: &str, request_data: Value) -> Self {
        Self {
            vendor_name: vendor_name.to_string(),
            request_type: request_type.to_string(),
            request_data: or_empty_object(request_data),
        }
    }

    /// `requestData` of the outer `CallVendorRequest`.
    pub fn into_request_data(self) -> Result<Value, ClientError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Inner requests understood by the Smart Lower Thirds plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerThirdsRequest {
    /// List every configured lower third.
    List,
    /// Flip visibility of one lower third.
    ToggleVisible {
        /// Lower third id
        id: String,
    },
    /// Force visibility of one lower third.
    SetVisible {
        /// Lower third id
        id: String,
        /// Desired visibility
        visible: bool,
    },
}

impl LowerThirdsRequest {
    /// Inner request type label.
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::List => "ListLowerThirds",
            Self::ToggleVisible { .. } => "ToggleVisible",
            Self::SetVisible { .. } => "SetVisible",
        }
    }

    /// Inner request data.
    pub fn request_data(&self) -> Value {
        match self {
            Self::List => json!({}),
            Self::ToggleVisible { id } => json!({ "id": id }),
            Self::SetVisible { id, visible } => json!({ "id": id, "visible": visible }),
        }
    }

    /// Wrap as a call to `vendor_name`.
    pub fn to_vendor_call(&self, vendor_name: &str) -> VendorCall {
        VendorCall::new(vendor_name, self.request_type(), self.request_data())
    }
}

/// Treat `null` as `{}`.
pub fn or_empty_object(data: Value) -> Value {
    if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    }
}
