//! Big-endian codecs for the composite values that cross the raw surface:
//! stat records and ACL vectors. Strings and byte buffers are length-framed
//! with an `i32` prefix.

use crate::types::{Acl, Permission, Stat};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

pub(crate) trait WriteTo {
    fn write_to<W: Write>(&self, writer: W) -> io::Result<()>;
}

impl WriteTo for str {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BigEndian>(self.len() as i32)?;
        writer.write_all(self.as_ref())
    }
}

impl WriteTo for Acl {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BigEndian>(self.perms.code())?;
        self.scheme.as_str().write_to(&mut writer)?;
        self.id.as_str().write_to(writer)
    }
}

impl WriteTo for Stat {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i64::<BigEndian>(self.czxid)?;
        writer.write_i64::<BigEndian>(self.mzxid)?;
        writer.write_i64::<BigEndian>(self.ctime)?;
        writer.write_i64::<BigEndian>(self.mtime)?;
        writer.write_i32::<BigEndian>(self.version)?;
        writer.write_i32::<BigEndian>(self.cversion)?;
        writer.write_i32::<BigEndian>(self.aversion)?;
        writer.write_i64::<BigEndian>(self.ephemeral_owner)?;
        writer.write_i32::<BigEndian>(self.data_length)?;
        writer.write_i32::<BigEndian>(self.num_children)?;
        writer.write_i64::<BigEndian>(self.pzxid)
    }
}

pub(crate) trait ReadFrom: Sized {
    fn read_from<R: Read>(read: &mut R) -> io::Result<Self>;
}

impl ReadFrom for Stat {
    fn read_from<R: Read>(read: &mut R) -> io::Result<Stat> {
        Ok(Stat {
            czxid: read.read_i64::<BigEndian>()?,
            mzxid: read.read_i64::<BigEndian>()?,
            ctime: read.read_i64::<BigEndian>()?,
            mtime: read.read_i64::<BigEndian>()?,
            version: read.read_i32::<BigEndian>()?,
            cversion: read.read_i32::<BigEndian>()?,
            aversion: read.read_i32::<BigEndian>()?,
            ephemeral_owner: read.read_i64::<BigEndian>()?,
            data_length: read.read_i32::<BigEndian>()?,
            num_children: read.read_i32::<BigEndian>()?,
            pzxid: read.read_i64::<BigEndian>()?,
        })
    }
}

impl ReadFrom for Acl {
    fn read_from<R: Read>(read: &mut R) -> io::Result<Acl> {
        Ok(Acl {
            perms: Permission::from_code(read.read_u32::<BigEndian>()?),
            scheme: read.read_string()?,
            id: read.read_string()?,
        })
    }
}

trait BufferReader: Read {
    fn read_buffer(&mut self) -> io::Result<Vec<u8>>;
}

impl<R: Read> BufferReader for R {
    fn read_buffer(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_i32::<BigEndian>()?;
        let len = if len < 0 { 0 } else { len as usize };
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

trait StringReader: Read {
    fn read_string(&mut self) -> io::Result<String>;
}

impl<R: Read> StringReader for R {
    fn read_string(&mut self) -> io::Result<String> {
        let raw = self.read_buffer()?;
        String::from_utf8(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// A wire-encoded ACL vector, owned by a single operation call.
///
/// The frame is acquired at the start of the call and, being an owned
/// buffer, is released on every exit path, success or failure. Entries
/// missing any of perms/scheme/id are skipped silently; exactly as many
/// wire slots are written as entries were accepted.
#[derive(Debug)]
pub(crate) struct AclFrame {
    buf: Vec<u8>,
    accepted: usize,
}

impl AclFrame {
    pub(crate) fn encode(entries: &[Acl]) -> io::Result<AclFrame> {
        let mut accepted = 0;
        for entry in entries {
            if entry.is_complete() {
                accepted += 1;
            }
        }
        let mut buf = Vec::with_capacity(4 + entries.len() * 16);
        buf.write_i32::<BigEndian>(accepted as i32)?;
        for entry in entries.iter().filter(|e| e.is_complete()) {
            entry.write_to(&mut buf)?;
        }
        Ok(AclFrame { buf, accepted })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// How many entries made it onto the wire.
    pub(crate) fn entries(&self) -> usize {
        self.accepted
    }
}

pub(crate) fn decode_stat(frame: &[u8]) -> io::Result<Stat> {
    let mut reader = frame;
    Stat::read_from(&mut reader)
}

pub(crate) fn decode_acl_vector(frame: &[u8]) -> io::Result<Vec<Acl>> {
    let mut reader = frame;
    let count = reader.read_i32::<BigEndian>()?;
    let count = if count < 0 { 0 } else { count as usize };
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(Acl::read_from(&mut reader)?);
    }
    Ok(entries)
}
