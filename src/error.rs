//! Error types of the IO-Link master clients.

use crate::protocol as proto;

/// Why the IO-Link master could not be reached.
#[derive(thiserror::Error, Debug)]
pub enum UnreachableCause {
    /// Connection refused, timeout, DNS failure, broken body transfer.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The reachability probe got an answer other than HTTP 200.
    #[error("reachability probe answered with HTTP status {0}")]
    ProbeRejected(u16),
}

/// Represents all possible errors that can occur while talking to the IO-Link master.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The exchange did not complete.
    #[error("IO-Link master at {url} is unreachable: {cause}")]
    Unreachable {
        url: String,
        #[source]
        cause: UnreachableCause,
    },

    /// The master answered with a non-success HTTP status or an application
    /// code other than 200 and 404.
    #[error("IO-Link master reported code {code} for '{address}': {body}")]
    GatewayError {
        address: String,
        code: i64,
        body: String,
    },

    /// The address does not exist on this firmware (application code 404).
    #[error("IO-Link master has no data point '{address}'")]
    NotFound { address: String, body: String },

    /// The master answered successfully, but not with the expected shape.
    #[error("Unexpected answer for '{address}': {reason} (body: {body:?})")]
    MalformedResponse {
        address: String,
        body: String,
        reason: &'static str,
    },

    /// Wraps `proto::Error`.
    #[error(transparent)]
    ProtocolError(#[from] proto::Error),
}

/// The result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
