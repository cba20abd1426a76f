//! # Wire Messages
//!
//! obs-websocket v5 framing: every message is a JSON object
//! `{"op": <opcode>, "d": <payload>}`. Only the opcodes this client
//! speaks are modelled here.
//!
//! | op | name            | direction |
//! |----|-----------------|-----------|
//! | 0  | Hello           | inbound   |
//! | 1  | Identify        | outbound  |
//! | 2  | Identified      | inbound   |
//! | 6  | Request         | outbound  |
//! | 7  | RequestResponse | inbound   |

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::auth::AuthChallenge;
use super::errors::ClientError;

/// `eventSubscriptions` bitmask value subscribing to nothing.
pub const EVENT_SUBSCRIPTION_NONE: u32 = 0;

/// Protocol opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server greeting.
    Hello = 0,
    /// Client handshake reply.
    Identify = 1,
    /// Server handshake acknowledgement.
    Identified = 2,
    /// Client request.
    Request = 6,
    /// Server response to a request.
    RequestResponse = 7,
}

impl OpCode {
    /// Map a raw opcode to a known one.
    pub fn from_u8(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Hello),
            1 => Some(Self::Identify),
            2 => Some(Self::Identified),
            6 => Some(Self::Request),
            7 => Some(Self::RequestResponse),
            _ => None,
        }
    }

    /// Raw opcode value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Outer `{op, d}` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Raw opcode.
    pub op: u8,
    /// Opcode-specific payload.
    #[serde(default)]
    pub d: Value,
}

impl Envelope {
    /// Wrap a payload under `op`.
    pub fn new<T: Serialize>(op: OpCode, payload: &T) -> Result<Self, ClientError> {
        Ok(Self {
            op: op.as_u8(),
            d: serde_json::to_value(payload)?,
        })
    }

    /// Parse an inbound text frame.
    ///
    /// Returns `None` for anything that is not a JSON object with a numeric
    /// `op`; such traffic is not ours to interpret.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Known opcode, if any.
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    /// Decode the payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_value(self.d.clone())?)
    }

    /// Serialize for the wire.
    pub fn to_text(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// op 0 payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    /// Server's obs-websocket version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_web_socket_version: Option<String>,
    /// Latest RPC version the server speaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_version: Option<u32>,
    /// Present only when the server requires a password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<HelloAuthentication>,
}

/// Authentication block of a Hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAuthentication {
    /// Password salt.
    pub salt: String,
    /// Per-connection challenge.
    pub challenge: String,
}

impl From<HelloAuthentication> for AuthChallenge {
    fn from(auth: HelloAuthentication) -> Self {
        Self {
            salt: auth.salt,
            challenge: auth.challenge,
        }
    }
}

/// op 1 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    /// RPC version the client will speak.
    pub rpc_version: u32,
    /// Event subscription bitmask.
    pub event_subscriptions: u32,
    /// Challenge-response token; omitted when not challenged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
}

/// op 2 payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    /// Version the server settled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiated_rpc_version: Option<u32>,
}

/// op 6 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request type label, e.g. `CallVendorRequest`.
    pub request_type: String,
    /// Client-generated correlation id.
    pub request_id: String,
    /// Request arguments; `{}` when there are none.
    pub request_data: Value,
}

/// `requestStatus` block of a response.
///
/// Decoding never fails on odd values: only a literal `true` result is
/// success, and a non-integer code reads as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    /// `true` on success. Absent, `null` or non-boolean counts as failure.
    #[serde(default, deserialize_with = "strict_true")]
    pub result: bool,
    /// Status code.
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: i64,
    /// Optional failure comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// op 7 payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    /// Echo of the request type.
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_type: String,
    /// Echo of the request id.
    pub request_id: String,
    /// Outcome; a missing or `null` block is treated as failure.
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_status: RequestStatus,
    /// Response body, opaque to the core.
    #[serde(default)]
    pub response_data: Value,
}

impl RequestResponse {
    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        self.request_status.result
    }

    /// Failure response for a body that names a request id but does not
    /// decode. `None` when there is no string `requestId` to settle.
    pub fn undecodable(d: &Value) -> Option<Self> {
        let request_id = d.get("requestId")?.as_str()?.to_string();
        Some(Self {
            request_type: d
                .get("requestType")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            request_id,
            request_status: RequestStatus::default(),
            response_data: Value::Null,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn strict_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)? == Value::Bool(true))
}

fn lenient_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_i64().unwrap_or_default())
}
