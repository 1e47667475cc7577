use crate::raw::ZkError;
use failure::Fail;
use std::io;

/// The single error channel of the facade.
///
/// Operations that fail return no partial results: a failed `create` yields
/// no path, a failed `get_data` yields no bytes. The facade never retries
/// and never recovers locally; every error goes straight to the caller.
#[derive(Debug, Fail)]
pub enum Error {
    /// A caller-supplied value violates a precondition. Raised before any
    /// remote call is attempted.
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(&'static str),

    /// A session could not be established against the given host list.
    #[fail(display = "could not initialize a session to \"{}\"", hosts)]
    Connection {
        /// The ensemble member list the connector was pointed at.
        hosts: String,
    },

    /// The remote service returned a non-OK status for an otherwise
    /// well-formed request. Branch on `code` to tell the interesting cases
    /// (`NoNode`, `NodeExists`, `BadVersion`, `NotEmpty`, `SessionExpired`,
    /// `AuthFailed`, ...) apart.
    #[fail(display = "{} ({:?})", message, code)]
    Protocol {
        /// The status code the server answered with.
        code: ZkError,
        /// The status-to-text lookup result for that code.
        message: &'static str,
    },

    /// Local serialization or deserialization of a payload failed. This is
    /// a codec problem on our side of the wire, not a server-side
    /// rejection, and is deliberately kept distinct from `Protocol`.
    #[fail(display = "marshalling failed while {}: {}", context, cause)]
    Marshalling {
        /// What the codec was doing when it failed.
        context: &'static str,
        /// The underlying I/O error.
        #[fail(cause)]
        cause: io::Error,
    },
}

impl Error {
    pub(crate) fn protocol(code: ZkError) -> Error {
        Error::Protocol {
            code,
            message: code.message(),
        }
    }

    pub(crate) fn marshalling(context: &'static str, cause: io::Error) -> Error {
        Error::Marshalling { context, cause }
    }

    /// The remote status code, if this error carries one.
    pub fn code(&self) -> Option<ZkError> {
        match self {
            Error::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}
