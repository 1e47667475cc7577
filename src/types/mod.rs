mod acl;
pub use self::acl::*;

mod watch;
pub use self::watch::*;

/// Metadata snapshot of a znode, similar to the UNIX `stat` structure.
///
/// A `Stat` is produced by the server and never mutated client-side: every
/// successful mutation of a znode regenerates its counters. The *zxid*
/// fields expose the total order of cluster changes (a smaller zxid happened
/// before a larger one), while the version fields count changes to the data,
/// children, and ACL of this particular node. Wall-clock timestamps are
/// informational only; the service makes no decisions based on them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Stat {
    /// The transaction ID that created the znode.
    pub czxid: i64,
    /// The last transaction that modified the znode.
    pub mzxid: i64,
    /// Milliseconds since epoch when the znode was created.
    pub ctime: i64,
    /// Milliseconds since epoch when the znode was last modified.
    pub mtime: i64,
    /// The number of changes to the data of the znode.
    pub version: i32,
    /// The number of changes to the children of the znode.
    pub cversion: i32,
    /// The number of changes to the ACL of the znode.
    pub aversion: i32,
    /// The session ID of the owner of this znode, if it is an ephemeral entry.
    pub ephemeral_owner: i64,
    /// The length of the data field of the znode.
    pub data_length: i32,
    /// The number of children this znode has.
    pub num_children: i32,
    /// The transaction ID that last modified the children of the znode.
    pub pzxid: i64,
}

/// CreateMode value determines how the znode is created on ZooKeeper.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateMode {
    /// The znode will not be automatically deleted upon client's disconnect.
    Persistent = 0,
    /// The znode will be deleted upon the client's disconnect.
    Ephemeral = 1,
    /// The name of the znode will be appended with a monotonically increasing
    /// number. The actual path name of a sequential node is the given path
    /// plus a suffix *i*, where *i* is the current sequential number of the
    /// node, always a fixed length of 10 digits, 0 padded.
    PersistentSequential = 2,
    /// The znode will be deleted upon the client's disconnect, and its name
    /// will be appended with a monotonically increasing number.
    EphemeralSequential = 3,
    /// Container nodes are special purpose nodes useful for recipes such as
    /// leader election or locks. When the last child of a container is
    /// deleted, the container becomes a candidate for deletion by the server
    /// at some point in the future, so creating children inside one may fail
    /// with `NoNode`.
    Container = 4,
    //
    // 421
    // 000
    // ^----- is it a container?
    //  ^---- is it sequential?
    //   ^--- is it ephemeral?
}

impl CreateMode {
    /// True if the server appends a sequence suffix to the requested path.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }

    /// True if the created znode is tied to the session's lifetime.
    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }
}

/// The connection state of a session, as reported by the underlying client.
///
/// `ExpiredSession` and `AuthFailed` are terminal: a session that reaches
/// either of them cannot recover, and a new instance must be built to talk
/// to the ensemble again.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The handle has been torn down.
    Closed = 0,
    /// The client is looking for an ensemble member to talk to.
    Connecting = 1,
    /// A server has been picked and the session handshake is in flight.
    Associating = 2,
    /// The session is live and operations may be issued.
    Connected = 3,
    /// The ensemble expired the session; server-side ephemeral state is gone.
    ExpiredSession = -112,
    /// The session's credentials were rejected.
    AuthFailed = -113,
}

impl SessionState {
    /// True unless the session has reached a terminal state.
    pub fn is_recoverable(self) -> bool {
        !matches!(
            self,
            SessionState::ExpiredSession | SessionState::AuthFailed
        )
    }
}

impl From<i32> for SessionState {
    fn from(code: i32) -> Self {
        match code {
            0 => SessionState::Closed,
            1 => SessionState::Connecting,
            2 => SessionState::Associating,
            3 => SessionState::Connected,
            -112 => SessionState::ExpiredSession,
            -113 => SessionState::AuthFailed,
            _ => unreachable!("unknown session state {:x}", code),
        }
    }
}
