//! Request correlator - matches responses to in-flight requests.
//!
//! Flow:
//! 1. Session calls `issue()`; the correlator assigns a request id, arms a
//!    timeout timer and returns the Request envelope to send
//! 2. A RequestResponse with the same id arrives → `complete()`
//! 3. Or the timer fires first and its id comes back on the expiry channel →
//!    `expire()`
//!
//! Every path goes through `take()`, the only removal, so whichever of
//! response, timeout or close sees an entry first settles it and the others
//! find nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::debug;

use crate::domain::{
    or_empty_object, ClientError, Envelope, OpCode, Request, RequestIdGenerator, RequestResponse,
};

/// Result delivered to whoever issued a request.
pub type RequestResult = Result<RequestResponse, ClientError>;

/// Who is waiting for a request.
#[derive(Debug)]
pub enum Completion {
    /// An external caller awaiting the receiver half.
    Caller(oneshot::Sender<RequestResult>),
    /// The session's own automatic listing.
    Listing,
}

/// What settling an entry produced.
#[derive(Debug)]
pub enum Outcome {
    /// No pending entry with that id.
    Unmatched,
    /// Result handed to a caller (or the caller had already gone away).
    Delivered,
    /// Result of the session's own listing, for the session to publish.
    Listing(RequestResult),
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    /// Requests issued
    pub issued: u64,
    /// Responses with a success status
    pub completed: u64,
    /// Responses with a failure status
    pub failed: u64,
    /// Requests that hit their timeout
    pub timed_out: u64,
    /// Requests rejected because the connection closed
    pub rejected: u64,
}

/// One in-flight request.
#[derive(Debug)]
struct PendingRequest {
    request_type: String,
    completion: Completion,
    timer: AbortHandle,
    created_at: Instant,
}

/// Pending-request table for one connection.
#[derive(Debug)]
pub struct RequestCorrelator {
    pending: HashMap<String, PendingRequest>,
    ids: Arc<RequestIdGenerator>,
    timeout: Duration,
    expiry_tx: mpsc::UnboundedSender<String>,
    stats: CorrelatorStats,
}

impl RequestCorrelator {
    /// Create a correlator and the channel its timers report expiries on.
    pub fn new(
        ids: Arc<RequestIdGenerator>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let correlator = Self {
            pending: HashMap::new(),
            ids,
            timeout,
            expiry_tx,
            stats: CorrelatorStats::default(),
        };
        (correlator, expiry_rx)
    }

    /// Register a request and build its envelope.
    ///
    /// Must run inside a Tokio runtime: the timeout timer is a spawned task.
    pub fn issue(
        &mut self,
        request_type: &str,
        request_data: Value,
        completion: Completion,
    ) -> Result<(String, Envelope), ClientError> {
        let mut request_id = self.ids.next_id();
        while self.pending.contains_key(&request_id) {
            request_id = self.ids.next_id();
        }

        let envelope = Envelope::new(
            OpCode::Request,
            &Request {
                request_type: request_type.to_string(),
                request_id: request_id.clone(),
                request_data: or_empty_object(request_data),
            },
        )?;

        let timer = {
            let expiry_tx = self.expiry_tx.clone();
            let request_id = request_id.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let _ = expiry_tx.send(request_id);
            })
            .abort_handle()
        };

        self.pending.insert(
            request_id.clone(),
            PendingRequest {
                request_type: request_type.to_string(),
                completion,
                timer,
                created_at: Instant::now(),
            },
        );
        self.stats.issued += 1;

        debug!(
            request_id = %request_id,
            request_type = request_type,
            "Registered pending request"
        );

        Ok((request_id, envelope))
    }

    /// Settle the request matching `response`.
    pub fn complete(&mut self, response: RequestResponse) -> Outcome {
        let Some(pending) = self.take(&response.request_id) else {
            debug!(
                request_id = %response.request_id,
                "Response for unknown or expired request id"
            );
            return Outcome::Unmatched;
        };

        let result = if response.is_success() {
            self.stats.completed += 1;
            Ok(response)
        } else {
            self.stats.failed += 1;
            Err(ClientError::RequestFailed {
                request_type: pending.request_type.clone(),
                code: response.request_status.code,
                comment: response.request_status.comment,
            })
        };

        debug!(
            request_type = %pending.request_type,
            ok = result.is_ok(),
            response_time_ms = pending.created_at.elapsed().as_millis() as u64,
            "Completed pending request"
        );

        settle(pending.completion, result)
    }

    /// Settle `request_id` as timed out, if it is still pending.
    pub fn expire(&mut self, request_id: &str) -> Outcome {
        let Some(pending) = self.take(request_id) else {
            return Outcome::Unmatched;
        };

        self.stats.timed_out += 1;
        debug!(
            request_id = request_id,
            request_type = %pending.request_type,
            timeout_ms = self.timeout.as_millis() as u64,
            "Pending request timed out"
        );

        let err = ClientError::RequestTimeout {
            request_type: pending.request_type,
            timeout: self.timeout,
        };
        settle(pending.completion, Err(err))
    }

    /// Reject everything still pending because the connection closed.
    ///
    /// Returns the outcomes that need the session's attention (listings).
    pub fn reject_all(&mut self) -> Vec<Outcome> {
        let ids: Vec<String> = self.pending.keys().cloned().collect();
        let mut outcomes = Vec::new();
        let mut rejected = 0u64;

        for request_id in ids {
            if let Some(pending) = self.take(&request_id) {
                rejected += 1;
                let err = ClientError::Disconnected {
                    request_type: pending.request_type,
                };
                if let outcome @ Outcome::Listing(_) = settle(pending.completion, Err(err)) {
                    outcomes.push(outcome);
                }
            }
        }

        self.stats.rejected += rejected;
        if rejected > 0 {
            debug!(rejected = rejected, "Rejected pending requests on close");
        }
        outcomes
    }

    /// Number of in-flight requests.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `request_id` is in flight.
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    /// Remove an entry and disarm its timer.
    fn take(&mut self, request_id: &str) -> Option<PendingRequest> {
        let pending = self.pending.remove(request_id)?;
        pending.timer.abort();
        Some(pending)
    }
}

impl Drop for RequestCorrelator {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.timer.abort();
        }
    }
}

fn settle(completion: Completion, result: RequestResult) -> Outcome {
    match completion {
        Completion::Caller(tx) => {
            if tx.send(result).is_err() {
                debug!("Pending request receiver dropped");
            }
            Outcome::Delivered
        }
        Completion::Listing => Outcome::Listing(result),
    }
}
