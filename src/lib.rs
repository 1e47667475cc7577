//! A session-oriented facade over a raw ZooKeeper client interface.
//!
//! This crate models the part of a ZooKeeper client that sits *above* the
//! wire protocol: owning a session, performing znode CRUD and metadata
//! operations, managing per-node ACLs, registering one-shot watches, and
//! reporting a structured error taxonomy. The protocol and transport are
//! expected to be provided by an underlying client library reachable
//! through the [`raw`] traits; the facade is generic over that surface.
//!
//! # Sessions
//!
//! A [`ZooKeeper`] value owns exactly one session. It is built through
//! [`ZooKeeperBuilder::connect`], which validates its arguments locally,
//! asks the connector for a handle, and returns together with a stream of
//! session events. Session establishment is asynchronous at the protocol
//! level: `connect` resolves as soon as the local handle exists, and the
//! completed handshake is announced later on the event stream, so the
//! session may still be [`SessionState::Connecting`] right after
//! construction.
//!
//! There is no way to re-point an existing instance at a different
//! ensemble; build a new instance instead. Dropping the facade tears the
//! session down, releasing any server-side ephemeral state tied to it.
//!
//! # Watches
//!
//! The `_w` variants of the read operations arm a one-shot watch and hand
//! back a [`WatchFuture`]. The future resolves at most once, when the
//! watched condition triggers, and yields `None` if the session goes away
//! first. Watch notifications are delivered on a thread owned by the
//! underlying library, so anything you do in response must tolerate running
//! concurrently with in-flight facade calls.
//!
//! # Errors
//!
//! Every operation reports through [`Error`]. The facade performs no
//! retries and no local recovery: when [`ZooKeeper::is_recoverable`]
//! reports `false`, fail fast and build a new instance. Anything more
//! clever belongs to the layer above.

mod codec;
mod config;
mod error;
pub mod raw;
mod transform;
mod types;

pub use crate::config::{ClientConfig, DebugLevel};
pub use crate::error::Error;
pub use crate::raw::{ClientId, RawClient, RawConnector, RawData, Watch, ZkError};
pub use crate::types::{
    Acl, CreateMode, KeeperState, Permission, SessionState, Stat, WatchFuture, WatchedEvent,
    WatchedEventType,
};

use crate::codec::AclFrame;
use futures::channel::mpsc;
use slog::{debug, o, trace};
use std::io;
use std::time::Duration;

/// Room for the server's 10-digit sequence suffix plus the terminator the
/// C-style buffer contract expects.
const SEQUENCE_SUFFIX_SLACK: usize = 11;

/// Builder for [`ZooKeeper`] instances.
pub struct ZooKeeperBuilder {
    recv_timeout: Duration,
    logger: slog::Logger,
}

impl Default for ZooKeeperBuilder {
    fn default() -> Self {
        ZooKeeperBuilder {
            recv_timeout: Duration::from_millis(10_000),
            logger: slog::Logger::root(slog::Discard, o!()),
        }
    }
}

impl ZooKeeperBuilder {
    /// Set the requested session receive timeout. The server may negotiate
    /// it down during the handshake; [`ZooKeeper::recv_timeout`] reports
    /// the value actually in force.
    pub fn set_timeout(&mut self, t: Duration) {
        self.recv_timeout = t;
    }

    /// Set the logger that operations should record their progress to.
    pub fn set_logger(&mut self, logger: slog::Logger) {
        self.logger = logger;
    }

    /// Establish a session against `hosts` (a comma-separated ensemble
    /// member list) through the given connector.
    ///
    /// Fails with [`Error::InvalidArgument`], before the connector is
    /// touched, if the configured timeout is zero or does not fit the
    /// wire's millisecond field, and with [`Error::Connection`] if the
    /// underlying library cannot allocate a session. The returned stream
    /// carries session events: handshake completion, disconnects, expiry.
    pub async fn connect<C: RawConnector>(
        self,
        connector: &C,
        hosts: &str,
    ) -> Result<(ZooKeeper<C::Client>, mpsc::UnboundedReceiver<WatchedEvent>), Error> {
        let millis = self.recv_timeout.as_millis();
        if millis == 0 {
            return Err(Error::InvalidArgument(
                "receive timeout must be greater than zero",
            ));
        }
        if millis > i32::MAX as u128 {
            return Err(Error::InvalidArgument(
                "receive timeout must fit in an i32 millisecond count",
            ));
        }
        let (tx, rx) = mpsc::unbounded();
        debug!(self.logger, "initiating session";
               "hosts" => hosts, "timeout_ms" => millis as u64);
        match connector.init(hosts, millis as i32, tx).await {
            Some(raw) => Ok((
                ZooKeeper {
                    raw,
                    logger: self.logger,
                },
                rx,
            )),
            None => Err(Error::Connection {
                hosts: hosts.to_string(),
            }),
        }
    }
}

/// One live session against a ZooKeeper-style ensemble.
///
/// The instance exclusively owns its raw handle: it is created by
/// [`ZooKeeperBuilder::connect`] and torn down when the instance is
/// dropped. Operations borrow `&self` and may be issued concurrently; the
/// handle itself is never re-bound during the instance's lifetime, so
/// in-flight operations always reference a live session.
pub struct ZooKeeper<R: RawClient> {
    raw: R,
    logger: slog::Logger,
}

impl<R: RawClient> std::fmt::Debug for ZooKeeper<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZooKeeper").finish_non_exhaustive()
    }
}

impl<R: RawClient> ZooKeeper<R> {
    /// Create a znode at `path` carrying `data`, governed by `acl`.
    ///
    /// For sequential modes the server appends a monotonically increasing
    /// 10-digit suffix, and the returned path is the one to use from then
    /// on; otherwise it echoes `path`. Entries of `acl` missing any of
    /// perms/scheme/id are skipped when marshalled.
    ///
    /// Expected failures: `NodeExists`, `NoNode` (missing parent),
    /// `NoChildrenForEphemerals`, `InvalidACL`.
    pub async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[Acl],
        mode: CreateMode,
    ) -> Result<String, Error> {
        let mut realpath_max = path.len() + 1;
        if mode.is_sequential() {
            realpath_max += SEQUENCE_SUFFIX_SLACK;
        }
        // the frame is owned by this call and freed on every exit path
        let frame = AclFrame::encode(acl)
            .map_err(|e| Error::marshalling("encoding the acl vector", e))?;
        debug!(self.logger, "create";
               "path" => path, "mode" => ?mode, "acl_entries" => frame.entries());
        transform::create(
            self.raw
                .create(path, data, frame.as_bytes(), mode as i32, realpath_max)
                .await,
        )
    }

    /// Delete the znode at `path`. `None` skips the version check and
    /// deletes unconditionally.
    ///
    /// Expected failures: `NoNode`, `BadVersion`, `NotEmpty`.
    pub async fn delete(&self, path: &str, version: Option<i32>) -> Result<(), Error> {
        let version = version.unwrap_or(-1);
        trace!(self.logger, "delete"; "path" => path, "version" => version);
        transform::delete(self.raw.delete(path, version).await)
    }

    /// Replace the payload of the znode at `path`, conditional on
    /// `version` (`None` writes unconditionally).
    ///
    /// Expected failures: `NoNode`, `BadVersion`. On failure the previous
    /// payload is left untouched.
    pub async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<(), Error> {
        let version = version.unwrap_or(-1);
        trace!(self.logger, "set_data"; "path" => path, "version" => version);
        transform::set_data(self.raw.set_with_stat(path, data, version, false).await)
            .map(|_| ())
    }

    /// Like [`set_data`](Self::set_data), but additionally fetches the
    /// fresh metadata the mutation produced. Use the plain variant when the
    /// stat would go unused; it skips the marshalling cost.
    pub async fn set_data_with_stat(
        &self,
        path: &str,
        data: &[u8],
        version: Option<i32>,
    ) -> Result<Stat, Error> {
        let version = version.unwrap_or(-1);
        trace!(self.logger, "set_data"; "path" => path, "version" => version);
        let frame = transform::set_data(self.raw.set_with_stat(path, data, version, true).await)?
            .ok_or_else(|| {
                Error::marshalling(
                    "reading the set_data stat frame",
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "raw client returned no stat frame",
                    ),
                )
            })?;
        codec::decode_stat(&frame)
            .map_err(|e| Error::marshalling("decoding the set_data stat frame", e))
    }

    /// Read the payload and metadata of the znode at `path`.
    ///
    /// A znode can carry a *null* payload (only expressible through the
    /// C-level API): that reads as `None`, distinct from an empty byte
    /// string. A missing node fails with `NoNode`.
    pub async fn get_data(&self, path: &str) -> Result<(Option<Vec<u8>>, Stat), Error> {
        self.read_node(path, Watch::None).await
    }

    /// Like [`get_data`](Self::get_data), arming a one-shot watch that
    /// fires when the node's payload changes or the node is deleted.
    pub async fn get_data_w(
        &self,
        path: &str,
    ) -> Result<(Option<Vec<u8>>, Stat, WatchFuture), Error> {
        let (tx, fut) = WatchFuture::pair();
        let (data, stat) = self.read_node(path, Watch::Custom(tx)).await?;
        Ok((data, stat, fut))
    }

    async fn read_node(
        &self,
        path: &str,
        watch: Watch,
    ) -> Result<(Option<Vec<u8>>, Stat), Error> {
        // probe first: the node's current data length sizes the read buffer
        let probe_frame =
            transform::stat_probe(self.raw.watched_exists(path, Watch::None).await)?;
        let probed = codec::decode_stat(&probe_frame)
            .map_err(|e| Error::marshalling("decoding the probe stat frame", e))?;
        trace!(self.logger, "get_data";
               "path" => path, "buffer_len" => probed.data_length);
        let raw = transform::get_data(
            self.raw
                .watched_get(path, watch, probed.data_length)
                .await,
        )?;
        let stat = codec::decode_stat(&raw.stat)
            .map_err(|e| Error::marshalling("decoding the read stat frame", e))?;
        let data = if raw.data_length == -1 {
            None
        } else {
            Some(raw.bytes)
        };
        Ok((data, stat))
    }

    /// List the names of the children of the znode at `path`, in the
    /// server's order.
    ///
    /// A failed listing is always an `Err`; an empty `Vec` genuinely means
    /// "no children".
    pub async fn get_children(&self, path: &str) -> Result<Vec<String>, Error> {
        trace!(self.logger, "get_children"; "path" => path);
        transform::get_children(self.raw.watched_get_children(path, Watch::None).await)
    }

    /// Like [`get_children`](Self::get_children), arming a one-shot watch
    /// that fires when a child is created or deleted.
    pub async fn get_children_w(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchFuture), Error> {
        let (tx, fut) = WatchFuture::pair();
        let children =
            transform::get_children(self.raw.watched_get_children(path, Watch::Custom(tx)).await)?;
        Ok((children, fut))
    }

    /// Check whether a znode exists at `path`, returning its metadata when
    /// it does. Non-existence is a normal `Ok(None)`, never an error; any
    /// other non-OK status raises.
    pub async fn exists(&self, path: &str) -> Result<Option<Stat>, Error> {
        self.probe(path, Watch::None).await
    }

    /// Like [`exists`](Self::exists), arming a one-shot watch. The watch
    /// is registered even when the node does not exist, in which case it
    /// fires on creation.
    pub async fn exists_w(&self, path: &str) -> Result<(Option<Stat>, WatchFuture), Error> {
        let (tx, fut) = WatchFuture::pair();
        let stat = self.probe(path, Watch::Custom(tx)).await?;
        Ok((stat, fut))
    }

    async fn probe(&self, path: &str, watch: Watch) -> Result<Option<Stat>, Error> {
        trace!(self.logger, "exists"; "path" => path);
        match transform::exists(self.raw.watched_exists(path, watch).await)? {
            Some(frame) => Ok(Some(codec::decode_stat(&frame).map_err(|e| {
                Error::marshalling("decoding the probe stat frame", e)
            })?)),
            None => Ok(None),
        }
    }

    /// Fetch the ACL attached to the znode at `path`, along with the
    /// node's metadata.
    ///
    /// Expected failures: `NoNode`.
    pub async fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat), Error> {
        trace!(self.logger, "get_acl"; "path" => path);
        let (acl_frame, stat_frame) = transform::get_acl(self.raw.get_acl(path).await)?;
        let acl = codec::decode_acl_vector(&acl_frame)
            .map_err(|e| Error::marshalling("decoding the acl vector", e))?;
        let stat = codec::decode_stat(&stat_frame)
            .map_err(|e| Error::marshalling("decoding the acl stat frame", e))?;
        Ok((acl, stat))
    }

    /// Replace the ACL of the znode at `path` wholesale, conditional on
    /// the node's ACL version (`None` replaces unconditionally). Entries
    /// missing any of perms/scheme/id are skipped when marshalled.
    ///
    /// Expected failures: `NoNode`, `BadVersion`, `InvalidACL`.
    pub async fn set_acl(
        &self,
        path: &str,
        version: Option<i32>,
        acl: &[Acl],
    ) -> Result<(), Error> {
        let version = version.unwrap_or(-1);
        // owned by this call; released on success and failure alike
        let frame = AclFrame::encode(acl)
            .map_err(|e| Error::marshalling("encoding the acl vector", e))?;
        debug!(self.logger, "set_acl";
               "path" => path, "version" => version, "acl_entries" => frame.entries());
        transform::set_acl(self.raw.set_acl(path, version, frame.as_bytes()).await)
    }

    /// Register an authentication credential on this session.
    ///
    /// Expected failures: `AuthFailed` (unsupported scheme or malformed
    /// credential).
    pub async fn add_auth(&self, scheme: &str, credential: &[u8]) -> Result<(), Error> {
        debug!(self.logger, "add_auth"; "scheme" => scheme);
        transform::add_auth(self.raw.add_auth(scheme, credential).await)
    }

    /// The current connection state. Never blocks.
    pub fn state(&self) -> SessionState {
        SessionState::from(self.raw.state())
    }

    /// The receive timeout actually negotiated with the server; may be
    /// shorter than the one requested at construction.
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.raw.recv_timeout() as u64)
    }

    /// False once the session has reached a terminal state (expired or
    /// auth failed). Advisory: the facade never retries on its own, but
    /// callers should stop issuing operations and build a new instance.
    pub fn is_recoverable(&self) -> bool {
        !self.raw.is_unrecoverable()
    }

    /// The session identity, usable to re-attach after a transient
    /// disconnect within the session timeout.
    pub fn client_id(&self) -> ClientId {
        self.raw.client_id()
    }
}

impl<R: RawClient> Drop for ZooKeeper<R> {
    fn drop(&mut self) {
        trace!(self.logger, "closing session");
        self.raw.close();
    }
}
