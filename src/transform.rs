//! Per-operation translation of raw status codes into the error taxonomy.
//!
//! Every non-OK status becomes an [`Error`], with two documented
//! exceptions: `exists` treats `NoNode` as a normal negative answer, and a
//! `MarshallingError` status on a read is routed to the `Marshalling` kind
//! (it reports a demarshalling problem, not an inconsistent node).

use crate::error::Error;
use crate::raw::{RawData, ZkError};
use std::io;

/// Expected failures: `NodeExists`, `NoNode` (missing parent),
/// `NoChildrenForEphemerals`, `InvalidACL`.
pub(crate) fn create(res: Result<String, ZkError>) -> Result<String, Error> {
    match res {
        Ok(real_path) => Ok(real_path),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Expected failures: `NoNode`, `BadVersion`, `NotEmpty`.
pub(crate) fn delete(res: Result<(), ZkError>) -> Result<(), Error> {
    match res {
        Ok(()) => Ok(()),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Expected failures: `NoNode`, `BadVersion`.
pub(crate) fn set_data(res: Result<Option<Vec<u8>>, ZkError>) -> Result<Option<Vec<u8>>, Error> {
    match res {
        Ok(stat_frame) => Ok(stat_frame),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Non-existence is a normal answer here, not an error.
pub(crate) fn exists(res: Result<Vec<u8>, ZkError>) -> Result<Option<Vec<u8>>, Error> {
    match res {
        Ok(stat_frame) => Ok(Some(stat_frame)),
        Err(ZkError::NoNode) => Ok(None),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// The existence probe a read starts with; unlike `exists`, a missing node
/// fails the whole read with `NoNode`.
pub(crate) fn stat_probe(res: Result<Vec<u8>, ZkError>) -> Result<Vec<u8>, Error> {
    match res {
        Ok(stat_frame) => Ok(stat_frame),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// A `MarshallingError` status means the payload could not be demarshalled
/// locally; the node itself is not presumed inconsistent.
pub(crate) fn get_data(res: Result<RawData, ZkError>) -> Result<RawData, Error> {
    match res {
        Ok(raw) => Ok(raw),
        Err(ZkError::MarshallingError) => Err(Error::marshalling(
            "demarshalling the read payload",
            io::Error::new(io::ErrorKind::InvalidData, ZkError::MarshallingError.message()),
        )),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// A failed listing surfaces as an error, never as a silently empty list.
pub(crate) fn get_children(res: Result<Vec<String>, ZkError>) -> Result<Vec<String>, Error> {
    match res {
        Ok(children) => Ok(children),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Expected failures: `NoNode`.
pub(crate) fn get_acl(res: Result<(Vec<u8>, Vec<u8>), ZkError>) -> Result<(Vec<u8>, Vec<u8>), Error> {
    match res {
        Ok(frames) => Ok(frames),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Expected failures: `NoNode`, `BadVersion`, `InvalidACL`.
pub(crate) fn set_acl(res: Result<(), ZkError>) -> Result<(), Error> {
    match res {
        Ok(()) => Ok(()),
        Err(code) => Err(Error::protocol(code)),
    }
}

/// Expected failures: `AuthFailed` (unsupported scheme or malformed
/// credential).
pub(crate) fn add_auth(res: Result<(), ZkError>) -> Result<(), Error> {
    match res {
        Ok(()) => Ok(()),
        Err(code) => Err(Error::protocol(code)),
    }
}
