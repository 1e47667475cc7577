//! Process-wide configuration of the underlying client library.
//!
//! Debug verbosity and connection-order policy are not session-scoped in
//! the classic client: they affect every session in the process. Rather
//! than hiding that behind mutable globals, the facade models them as one
//! explicit value installed at startup and read by every connector.

use crate::error::Error;
use once_cell::sync::OnceCell;

static INSTALLED: OnceCell<ClientConfig> = OnceCell::new();

/// Log verbosity of the underlying client library.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugLevel {
    /// Only errors.
    Error = 1,
    /// Errors and warnings.
    Warn = 2,
    /// Normal operational logging.
    Info = 3,
    /// Everything, including protocol traces.
    Debug = 4,
}

/// Process-scoped settings honored by every session.
///
/// Install once, early, before the first session is built:
///
/// ```
/// use zk_session::{ClientConfig, DebugLevel};
///
/// ClientConfig {
///     debug_level: DebugLevel::Warn,
///     deterministic_conn_order: true,
/// }
/// .install()
/// .expect("installed before any session");
/// ```
///
/// A second `install` fails; sessions built before the install observe the
/// defaults. These settings are not per-handle: changing them affects all
/// sessions in the process, which is why they live here and not on the
/// builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Verbosity of the underlying library's own logging.
    pub debug_level: DebugLevel,
    /// When set, the connector walks the host list in the given order
    /// instead of shuffling it. Useful for tests, harmful for load
    /// spreading.
    pub deterministic_conn_order: bool,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            debug_level: DebugLevel::Info,
            deterministic_conn_order: false,
        }
    }
}

impl ClientConfig {
    /// Publish this configuration for the rest of the process lifetime.
    pub fn install(self) -> Result<(), Error> {
        INSTALLED
            .set(self)
            .map_err(|_| Error::InvalidArgument("client configuration is already installed"))
    }

    /// The installed configuration, or the defaults if none was installed.
    pub fn current() -> ClientConfig {
        INSTALLED.get().copied().unwrap_or_default()
    }
}
