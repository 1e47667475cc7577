//! The C-like surface of the underlying client library.
//!
//! Everything below the facade (connection management, the wire protocol,
//! heartbeats, watch delivery threads) lives behind [`RawConnector`] and
//! [`RawClient`]. The contract is deliberately close to the classic C
//! client: operations resolve to a status code from a shared enumeration
//! ([`ZkError`], where `Ok` is 0), composite values (stat records, ACL
//! vectors) cross the boundary as big-endian frames, and data payloads carry
//! a signed length where `-1` marks a null payload.
//!
//! The facade is generic over these traits, so the protocol implementation
//! can be swapped out, including for the in-memory ensemble the test suite
//! runs against.

use crate::types::WatchedEvent;
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use std::fmt;

#[cfg(test)]
pub(crate) mod mock;

/// Status codes shared by every operation on the raw surface.
///
/// Codes between `SystemError` and `APIError` (exclusive) are system errors;
/// codes below `APIError` are API errors. Neither boundary value is ever
/// returned by a server.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(i32)]
pub enum ZkError {
    /// Success.
    Ok = 0,
    /// System and server-side error range marker; never returned itself.
    SystemError = -1,
    /// A runtime inconsistency was found.
    RuntimeInconsistency = -2,
    /// A data inconsistency was found.
    DataInconsistency = -3,
    /// Connection to the server has been lost.
    ConnectionLoss = -4,
    /// Error while marshalling or unmarshalling data.
    MarshallingError = -5,
    /// Operation is unimplemented.
    Unimplemented = -6,
    /// Operation timeout.
    OperationTimeout = -7,
    /// Invalid arguments.
    BadArguments = -8,
    /// The handle is in an invalid state for the requested operation.
    InvalidState = -9,
    /// API error range marker; never returned itself.
    APIError = -100,
    /// Attempted to read a node that does not exist.
    NoNode = -101,
    /// Not authenticated.
    NoAuth = -102,
    /// Version conflict in a conditional operation.
    BadVersion = -103,
    /// Ephemeral nodes may not have children.
    NoChildrenForEphemerals = -108,
    /// Request to create a node that already exists.
    NodeExists = -110,
    /// The node has children.
    NotEmpty = -111,
    /// The session has been expired by the server.
    SessionExpired = -112,
    /// Invalid callback specified.
    InvalidCallback = -113,
    /// Invalid ACL specified.
    InvalidACL = -114,
    /// Client authentication failed.
    AuthFailed = -115,
    /// The handle is being closed.
    Closing = -116,
    /// No server responses to process; not an error.
    Nothing = -117,
    /// Session moved to another server, so operation is ignored.
    SessionMoved = -118,
    /// State-changing request is passed to a read-only server.
    NotReadOnly = -119,
    /// Attempt to create an ephemeral node on a local session.
    EphemeralOnLocalSession = -120,
    /// Attempt to remove a non-existing watcher.
    NoWatcher = -121,
}

impl From<i32> for ZkError {
    fn from(code: i32) -> Self {
        match code {
            0 => ZkError::Ok,
            -1 => ZkError::SystemError,
            -2 => ZkError::RuntimeInconsistency,
            -3 => ZkError::DataInconsistency,
            -4 => ZkError::ConnectionLoss,
            -5 => ZkError::MarshallingError,
            -6 => ZkError::Unimplemented,
            -7 => ZkError::OperationTimeout,
            -8 => ZkError::BadArguments,
            -9 => ZkError::InvalidState,
            -100 => ZkError::APIError,
            -101 => ZkError::NoNode,
            -102 => ZkError::NoAuth,
            -103 => ZkError::BadVersion,
            -108 => ZkError::NoChildrenForEphemerals,
            -110 => ZkError::NodeExists,
            -111 => ZkError::NotEmpty,
            -112 => ZkError::SessionExpired,
            -113 => ZkError::InvalidCallback,
            -114 => ZkError::InvalidACL,
            -115 => ZkError::AuthFailed,
            -116 => ZkError::Closing,
            -117 => ZkError::Nothing,
            -118 => ZkError::SessionMoved,
            -119 => ZkError::NotReadOnly,
            -120 => ZkError::EphemeralOnLocalSession,
            -121 => ZkError::NoWatcher,
            _ => unimplemented!("unknown status code {}", code),
        }
    }
}

impl ZkError {
    /// The human-readable text for this status, equivalent to the C
    /// client's `zerror` lookup.
    pub fn message(self) -> &'static str {
        match self {
            ZkError::Ok => "ok",
            ZkError::SystemError => "system error",
            ZkError::RuntimeInconsistency => "run time inconsistency",
            ZkError::DataInconsistency => "data inconsistency",
            ZkError::ConnectionLoss => "connection loss",
            ZkError::MarshallingError => "marshalling error",
            ZkError::Unimplemented => "unimplemented",
            ZkError::OperationTimeout => "operation timeout",
            ZkError::BadArguments => "bad arguments",
            ZkError::InvalidState => "invalid zhandle state",
            ZkError::APIError => "api error",
            ZkError::NoNode => "no node",
            ZkError::NoAuth => "not authenticated",
            ZkError::BadVersion => "bad version",
            ZkError::NoChildrenForEphemerals => "no children for ephemerals",
            ZkError::NodeExists => "node exists",
            ZkError::NotEmpty => "not empty",
            ZkError::SessionExpired => "session expired",
            ZkError::InvalidCallback => "invalid callback",
            ZkError::InvalidACL => "invalid acl",
            ZkError::AuthFailed => "authentication failed",
            ZkError::Closing => "zookeeper is closing",
            ZkError::Nothing => "(not error) no server responses to process",
            ZkError::SessionMoved => "session moved to another server, so operation is ignored",
            ZkError::NotReadOnly => "state-changing request is passed to read-only server",
            ZkError::EphemeralOnLocalSession => "attempt to create ephemeral node on a local session",
            ZkError::NoWatcher => "the watcher couldn't be found",
        }
    }
}

impl fmt::Display for ZkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Per-call watch registration slot.
///
/// `Custom` carries the delivery end of a one-shot channel; the library must
/// send at most one notification into it and drop it when the session ends.
#[derive(Debug)]
pub enum Watch {
    /// Don't watch anything as part of this call.
    None,
    /// Route any notification to the session's default watcher.
    Global,
    /// Route the notification to this registration alone.
    Custom(oneshot::Sender<WatchedEvent>),
}

/// Session identity, usable to re-attach after a transient disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId {
    /// The server-assigned session ID.
    pub client_id: i64,
    /// The session password.
    pub password: Vec<u8>,
}

/// The result of a watched read.
#[derive(Debug)]
pub struct RawData {
    /// The payload bytes, at most `buffer_len` of them.
    pub bytes: Vec<u8>,
    /// The payload length as reported by the server; `-1` means the znode
    /// carries a null payload (distinct from a zero-length one).
    pub data_length: i32,
    /// The node's stat record, encoded.
    pub stat: Vec<u8>,
}

/// One live session handle of the underlying client library.
///
/// All remote operations resolve once the corresponding synchronous
/// primitive of the library completes; the local queries (`client_id`,
/// `state`, `recv_timeout`, `is_unrecoverable`) never block. `close` tears
/// the session down and must be idempotent.
#[async_trait]
pub trait RawClient: Send + Sync + 'static {
    /// Create a znode. `acl` is an encoded ACL vector. The returned path is
    /// written into a buffer of `realpath_max` bytes, so it is truncated if
    /// the caller sized that too small.
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[u8],
        flags: i32,
        realpath_max: usize,
    ) -> Result<String, ZkError>;

    /// Delete a znode; `version` of -1 skips the version check.
    async fn delete(&self, path: &str, version: i32) -> Result<(), ZkError>;

    /// Replace a znode's payload; returns the fresh stat frame only when
    /// `want_stat` is set.
    async fn set_with_stat(
        &self,
        path: &str,
        data: &[u8],
        version: i32,
        want_stat: bool,
    ) -> Result<Option<Vec<u8>>, ZkError>;

    /// Read a znode's payload into a buffer of `buffer_len` bytes,
    /// optionally arming a watch.
    async fn watched_get(
        &self,
        path: &str,
        watch: Watch,
        buffer_len: i32,
    ) -> Result<RawData, ZkError>;

    /// List a znode's children, optionally arming a child watch.
    async fn watched_get_children(
        &self,
        path: &str,
        watch: Watch,
    ) -> Result<Vec<String>, ZkError>;

    /// Probe a znode, optionally arming a watch. The watch is registered
    /// even when the node does not exist, in which case it fires on
    /// creation.
    async fn watched_exists(&self, path: &str, watch: Watch) -> Result<Vec<u8>, ZkError>;

    /// Fetch a znode's ACL vector and stat record, both encoded.
    async fn get_acl(&self, path: &str) -> Result<(Vec<u8>, Vec<u8>), ZkError>;

    /// Replace a znode's ACL vector; `version` of -1 skips the ACL-version
    /// check.
    async fn set_acl(&self, path: &str, version: i32, acl: &[u8]) -> Result<(), ZkError>;

    /// Register an authentication credential on the session.
    async fn add_auth(&self, scheme: &str, credential: &[u8]) -> Result<(), ZkError>;

    /// The session identity.
    fn client_id(&self) -> ClientId;

    /// The current connection state code (see `SessionState`).
    fn state(&self) -> i32;

    /// The negotiated receive timeout in milliseconds.
    fn recv_timeout(&self) -> i32;

    /// True once the session has reached a terminal state.
    fn is_unrecoverable(&self) -> bool;

    /// Tear down the session. Idempotent; called from the facade's `Drop`.
    fn close(&self);
}

/// Entry point of the underlying client library, mirroring its C-style
/// `init`: a `None` return models the null handle (malformed host list,
/// resource exhaustion).
///
/// Session establishment is asynchronous at the protocol level: `init`
/// resolves as soon as the local handle exists, and handshake completion is
/// reported later through `default_watcher` as a session event.
/// Implementations are expected to honor the process-wide
/// [`ClientConfig`](crate::ClientConfig) when bootstrapping the connection.
#[async_trait]
pub trait RawConnector {
    /// The handle type produced by this connector.
    type Client: RawClient;

    /// Allocate a session against `hosts` (a comma-separated ensemble
    /// member list).
    async fn init(
        &self,
        hosts: &str,
        recv_timeout_ms: i32,
        default_watcher: mpsc::UnboundedSender<WatchedEvent>,
    ) -> Option<Self::Client>;
}
