//! An in-memory ensemble implementing the raw surface, used by the test
//! suites. It keeps a single znode tree per "session", honors version
//! checks, sequence counters, and ephemeral-parent rules, fires one-shot
//! watches, and can simulate connection loss and session expiry.

use super::{ClientId, RawClient, RawConnector, RawData, Watch, ZkError};
use crate::codec::WriteTo;
use crate::types::{KeeperState, SessionState, Stat, WatchedEvent, WatchedEventType};
use async_trait::async_trait;
use byteorder::{BigEndian, ReadBytesExt};
use futures::channel::{mpsc, oneshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const SESSION_ID: i64 = 0x5e55_1042;
const SESSION_PASSWORD: &[u8] = b"mock-password-0123";

/// The mock "server" caps the negotiated timeout below what clients often
/// ask for, so negotiation is observable.
const MAX_NEGOTIABLE_TIMEOUT_MS: i32 = 30_000;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Connected,
    Severed,
    Expired,
    Closed,
}

enum Armed {
    Once(oneshot::Sender<WatchedEvent>),
    Default,
}

struct Node {
    data: Option<Vec<u8>>,
    acl: Vec<u8>,
    ephemeral: bool,
    czxid: i64,
    mzxid: i64,
    ctime: i64,
    mtime: i64,
    version: i32,
    cversion: i32,
    aversion: i32,
    pzxid: i64,
    next_sequence: i32,
}

struct State {
    nodes: BTreeMap<String, Node>,
    zxid: i64,
    clock_ms: i64,
    liveness: Liveness,
    negotiated_timeout: i32,
    data_watches: HashMap<String, Vec<Armed>>,
    exist_watches: HashMap<String, Vec<Armed>>,
    child_watches: HashMap<String, Vec<Armed>>,
    auths: Vec<(String, Vec<u8>)>,
    default_watcher: mpsc::UnboundedSender<WatchedEvent>,
}

impl State {
    fn gate(&self) -> Result<(), ZkError> {
        match self.liveness {
            Liveness::Connected => Ok(()),
            Liveness::Severed => Err(ZkError::ConnectionLoss),
            Liveness::Expired => Err(ZkError::SessionExpired),
            Liveness::Closed => Err(ZkError::InvalidState),
        }
    }

    fn tick(&mut self) -> i64 {
        self.zxid += 1;
        self.clock_ms += 1;
        self.zxid
    }

    fn children_of(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .map(|(p, _)| &p[prefix.len()..])
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .collect()
    }

    fn stat_frame(&self, path: &str) -> Vec<u8> {
        let node = &self.nodes[path];
        let stat = Stat {
            czxid: node.czxid,
            mzxid: node.mzxid,
            ctime: node.ctime,
            mtime: node.mtime,
            version: node.version,
            cversion: node.cversion,
            aversion: node.aversion,
            ephemeral_owner: if node.ephemeral { SESSION_ID } else { 0 },
            data_length: node.data.as_ref().map(|d| d.len() as i32).unwrap_or(0),
            num_children: self.children_of(path).len() as i32,
            pzxid: node.pzxid,
        };
        let mut frame = Vec::new();
        stat.write_to(&mut frame).expect("Vec::write should never fail");
        frame
    }

    fn arm(
        watches: &mut HashMap<String, Vec<Armed>>,
        path: &str,
        watch: Watch,
    ) {
        match watch {
            Watch::None => {}
            Watch::Global => watches.entry(path.to_string()).or_default().push(Armed::Default),
            Watch::Custom(tx) => {
                watches.entry(path.to_string()).or_default().push(Armed::Once(tx))
            }
        }
    }

    fn fire(&mut self, kind: WatchKind, path: &str, event_type: WatchedEventType) {
        let watches = match kind {
            WatchKind::Data => &mut self.data_watches,
            WatchKind::Exist => &mut self.exist_watches,
            WatchKind::Child => &mut self.child_watches,
        };
        let Some(armed) = watches.remove(path) else {
            return;
        };
        let event = WatchedEvent {
            event_type,
            keeper_state: KeeperState::SyncConnected,
            path: path.to_string(),
        };
        for target in armed {
            match target {
                Armed::Once(tx) => {
                    let _ = tx.send(event.clone());
                }
                Armed::Default => {
                    let _ = self.default_watcher.unbounded_send(event.clone());
                }
            }
        }
    }

    fn session_event(&self, keeper_state: KeeperState) {
        let _ = self.default_watcher.unbounded_send(WatchedEvent {
            event_type: WatchedEventType::None,
            keeper_state,
            path: String::new(),
        });
    }
}

#[derive(Clone, Copy)]
enum WatchKind {
    Data,
    Exist,
    Child,
}

fn acl_slots(frame: &[u8]) -> Result<i32, ZkError> {
    let mut reader = frame;
    reader
        .read_i32::<BigEndian>()
        .map_err(|_| ZkError::MarshallingError)
}

fn parent_of(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if path.len() == 1 {
        // the root has no parent
        return None;
    }
    Some(if idx == 0 { "/" } else { &path[..idx] })
}

/// A cloneable handle onto the in-memory ensemble. The facade owns one
/// clone; tests keep another to inject faults and inspect state.
#[derive(Clone)]
pub(crate) struct MockClient {
    shared: Arc<Mutex<State>>,
}

impl MockClient {
    fn new(requested_timeout_ms: i32, default_watcher: mpsc::UnboundedSender<WatchedEvent>) -> MockClient {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                data: Some(Vec::new()),
                acl: {
                    let frame = crate::codec::AclFrame::encode(&[crate::types::Acl::anyone_all()])
                        .expect("Vec::write should never fail");
                    frame.as_bytes().to_vec()
                },
                ephemeral: false,
                czxid: 0,
                mzxid: 0,
                ctime: 1_690_000_000_000,
                mtime: 1_690_000_000_000,
                version: 0,
                cversion: 0,
                aversion: 0,
                pzxid: 0,
                next_sequence: 0,
            },
        );
        let state = State {
            nodes,
            zxid: 0,
            clock_ms: 1_690_000_000_000,
            liveness: Liveness::Connected,
            negotiated_timeout: requested_timeout_ms.min(MAX_NEGOTIABLE_TIMEOUT_MS),
            data_watches: HashMap::new(),
            exist_watches: HashMap::new(),
            child_watches: HashMap::new(),
            auths: Vec::new(),
            default_watcher,
        };
        // handshake "completes" immediately; signal it the way a real
        // library would, through the default watcher
        state.session_event(KeeperState::SyncConnected);
        MockClient {
            shared: Arc::new(Mutex::new(state)),
        }
    }

    /// Simulate losing the connection to the ensemble. Operations fail with
    /// `ConnectionLoss` until the session is expired or the test ends.
    pub(crate) fn sever(&self) {
        let mut s = self.shared.lock().unwrap();
        s.liveness = Liveness::Severed;
        s.session_event(KeeperState::Disconnected);
    }

    /// Simulate server-side session expiry: terminal, unrecoverable.
    pub(crate) fn expire(&self) {
        let mut s = self.shared.lock().unwrap();
        s.liveness = Liveness::Expired;
        s.session_event(KeeperState::Expired);
    }

    /// Force a node to carry a null payload (only the C-level API can
    /// produce one; the facade always writes concrete bytes).
    pub(crate) fn put_null_data(&self, path: &str) {
        let mut s = self.shared.lock().unwrap();
        let node = s.nodes.get_mut(path).expect("put_null_data on a known node");
        node.data = None;
    }

    /// The credentials registered through `add_auth`.
    pub(crate) fn auths(&self) -> Vec<(String, Vec<u8>)> {
        self.shared.lock().unwrap().auths.clone()
    }
}

#[async_trait]
impl RawClient for MockClient {
    async fn create(
        &self,
        path: &str,
        data: &[u8],
        acl: &[u8],
        flags: i32,
        realpath_max: usize,
    ) -> Result<String, ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
            return Err(ZkError::BadArguments);
        }
        if acl_slots(acl)? == 0 {
            return Err(ZkError::InvalidACL);
        }
        let parent = parent_of(path).ok_or(ZkError::NodeExists)?.to_string();
        {
            let parent_node = s.nodes.get(&parent).ok_or(ZkError::NoNode)?;
            if parent_node.ephemeral {
                return Err(ZkError::NoChildrenForEphemerals);
            }
        }
        let actual = if flags & 2 != 0 {
            let parent_node = s.nodes.get_mut(&parent).expect("parent checked above");
            let seq = parent_node.next_sequence;
            parent_node.next_sequence += 1;
            format!("{}{:010}", path, seq)
        } else {
            path.to_string()
        };
        if s.nodes.contains_key(&actual) {
            return Err(ZkError::NodeExists);
        }
        let zxid = s.tick();
        let now = s.clock_ms;
        s.nodes.insert(
            actual.clone(),
            Node {
                data: Some(data.to_vec()),
                acl: acl.to_vec(),
                ephemeral: flags & 1 != 0,
                czxid: zxid,
                mzxid: zxid,
                ctime: now,
                mtime: now,
                version: 0,
                cversion: 0,
                aversion: 0,
                pzxid: zxid,
                next_sequence: 0,
            },
        );
        {
            let parent_node = s.nodes.get_mut(&parent).expect("parent checked above");
            parent_node.cversion += 1;
            parent_node.pzxid = zxid;
        }
        s.fire(WatchKind::Exist, &actual, WatchedEventType::NodeCreated);
        s.fire(WatchKind::Child, &parent, WatchedEventType::NodeChildrenChanged);
        // the C client copies the real path into a caller-sized buffer;
        // model the truncation an undersized buffer would cause
        let mut real = actual;
        real.truncate(realpath_max.saturating_sub(1));
        Ok(real)
    }

    async fn delete(&self, path: &str, version: i32) -> Result<(), ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        {
            let node = s.nodes.get(path).ok_or(ZkError::NoNode)?;
            if version != -1 && version != node.version {
                return Err(ZkError::BadVersion);
            }
        }
        if !s.children_of(path).is_empty() {
            return Err(ZkError::NotEmpty);
        }
        s.nodes.remove(path);
        let zxid = s.tick();
        if let Some(parent) = parent_of(path) {
            let parent = parent.to_string();
            if let Some(parent_node) = s.nodes.get_mut(&parent) {
                parent_node.cversion += 1;
                parent_node.pzxid = zxid;
            }
            s.fire(WatchKind::Data, path, WatchedEventType::NodeDeleted);
            s.fire(WatchKind::Exist, path, WatchedEventType::NodeDeleted);
            s.fire(WatchKind::Child, path, WatchedEventType::NodeDeleted);
            s.fire(WatchKind::Child, &parent, WatchedEventType::NodeChildrenChanged);
        }
        Ok(())
    }

    async fn set_with_stat(
        &self,
        path: &str,
        data: &[u8],
        version: i32,
        want_stat: bool,
    ) -> Result<Option<Vec<u8>>, ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        {
            let node = s.nodes.get(path).ok_or(ZkError::NoNode)?;
            if version != -1 && version != node.version {
                return Err(ZkError::BadVersion);
            }
        }
        let zxid = s.tick();
        let now = s.clock_ms;
        {
            let node = s.nodes.get_mut(path).expect("node checked above");
            node.data = Some(data.to_vec());
            node.version += 1;
            node.mzxid = zxid;
            node.mtime = now;
        }
        s.fire(WatchKind::Data, path, WatchedEventType::NodeDataChanged);
        Ok(if want_stat {
            Some(s.stat_frame(path))
        } else {
            None
        })
    }

    async fn watched_get(
        &self,
        path: &str,
        watch: Watch,
        buffer_len: i32,
    ) -> Result<RawData, ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if !s.nodes.contains_key(path) {
            return Err(ZkError::NoNode);
        }
        State::arm(&mut s.data_watches, path, watch);
        let node = &s.nodes[path];
        let (bytes, data_length) = match &node.data {
            Some(d) => {
                let take = (buffer_len.max(0) as usize).min(d.len());
                (d[..take].to_vec(), d.len() as i32)
            }
            None => (Vec::new(), -1),
        };
        Ok(RawData {
            bytes,
            data_length,
            stat: s.stat_frame(path),
        })
    }

    async fn watched_get_children(
        &self,
        path: &str,
        watch: Watch,
    ) -> Result<Vec<String>, ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if !s.nodes.contains_key(path) {
            return Err(ZkError::NoNode);
        }
        State::arm(&mut s.child_watches, path, watch);
        Ok(s.children_of(path))
    }

    async fn watched_exists(&self, path: &str, watch: Watch) -> Result<Vec<u8>, ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if s.nodes.contains_key(path) {
            State::arm(&mut s.data_watches, path, watch);
            Ok(s.stat_frame(path))
        } else {
            // the watch is still registered: it fires if the node appears
            State::arm(&mut s.exist_watches, path, watch);
            Err(ZkError::NoNode)
        }
    }

    async fn get_acl(&self, path: &str) -> Result<(Vec<u8>, Vec<u8>), ZkError> {
        let s = self.shared.lock().unwrap();
        s.gate()?;
        let node = s.nodes.get(path).ok_or(ZkError::NoNode)?;
        Ok((node.acl.clone(), s.stat_frame(path)))
    }

    async fn set_acl(&self, path: &str, version: i32, acl: &[u8]) -> Result<(), ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if acl_slots(acl)? == 0 {
            return Err(ZkError::InvalidACL);
        }
        let node = s.nodes.get_mut(path).ok_or(ZkError::NoNode)?;
        if version != -1 && version != node.aversion {
            return Err(ZkError::BadVersion);
        }
        node.acl = acl.to_vec();
        node.aversion += 1;
        Ok(())
    }

    async fn add_auth(&self, scheme: &str, credential: &[u8]) -> Result<(), ZkError> {
        let mut s = self.shared.lock().unwrap();
        s.gate()?;
        if !matches!(scheme, "digest" | "ip") || credential.is_empty() {
            return Err(ZkError::AuthFailed);
        }
        s.auths.push((scheme.to_string(), credential.to_vec()));
        Ok(())
    }

    fn client_id(&self) -> ClientId {
        ClientId {
            client_id: SESSION_ID,
            password: SESSION_PASSWORD.to_vec(),
        }
    }

    fn state(&self) -> i32 {
        let s = self.shared.lock().unwrap();
        let state = match s.liveness {
            Liveness::Connected => SessionState::Connected,
            Liveness::Severed => SessionState::Connecting,
            Liveness::Expired => SessionState::ExpiredSession,
            Liveness::Closed => SessionState::Closed,
        };
        state as i32
    }

    fn recv_timeout(&self) -> i32 {
        self.shared.lock().unwrap().negotiated_timeout
    }

    fn is_unrecoverable(&self) -> bool {
        self.shared.lock().unwrap().liveness == Liveness::Expired
    }

    fn close(&self) {
        let mut s = self.shared.lock().unwrap();
        s.liveness = Liveness::Closed;
        // dropping the armed senders resolves their WatchFutures to None
        s.data_watches.clear();
        s.exist_watches.clear();
        s.child_watches.clear();
        s.default_watcher.close_channel();
    }
}

/// Connector producing [`MockClient`] sessions; an empty host list models
/// the C library's null-handle failure.
pub(crate) struct MockConnector;

#[async_trait]
impl RawConnector for MockConnector {
    type Client = MockClient;

    async fn init(
        &self,
        hosts: &str,
        recv_timeout_ms: i32,
        default_watcher: mpsc::UnboundedSender<WatchedEvent>,
    ) -> Option<MockClient> {
        if hosts.is_empty() {
            return None;
        }
        Some(MockClient::new(recv_timeout_ms, default_watcher))
    }
}
