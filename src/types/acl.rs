use std::fmt;
use std::ops::BitOr;

/// Describes the abilities a scheme/id pair is granted on a znode.
///
/// Permissions combine with `|`:
///
/// ```
/// use zk_session::Permission;
/// let rw = Permission::READ | Permission::WRITE;
/// assert!(rw.can(Permission::READ));
/// assert!(!rw.can(Permission::DELETE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission(u32);

impl Permission {
    /// No permissions at all. An entry carrying this is considered
    /// incomplete and is skipped when marshalled to the wire.
    pub const NONE: Permission = Permission(0b00000);

    /// You can access the data of a node and can list its children.
    pub const READ: Permission = Permission(0b00001);

    /// You can set the data of a node.
    pub const WRITE: Permission = Permission(0b00010);

    /// You can create a child node.
    pub const CREATE: Permission = Permission(0b00100);

    /// You can delete a child node (but not necessarily this one).
    pub const DELETE: Permission = Permission(0b01000);

    /// You can alter permissions on this node.
    pub const ADMIN: Permission = Permission(0b10000);

    /// You can do anything.
    pub const ALL: Permission = Permission(0b11111);

    /// Rebuild a permission set from its wire bitmask.
    pub fn from_code(code: u32) -> Permission {
        Permission(code)
    }

    /// The wire bitmask of this permission set.
    pub fn code(self) -> u32 {
        self.0
    }

    /// Check that all permissions in `p` are included in this set.
    pub fn can(self, p: Permission) -> bool {
        self.0 & p.0 == p.0
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == Permission::ALL {
            return write!(f, "all");
        }
        if *self == Permission::NONE {
            return write!(f, "none");
        }
        let names = [
            (Permission::READ, "read"),
            (Permission::WRITE, "write"),
            (Permission::CREATE, "create"),
            (Permission::DELETE, "delete"),
            (Permission::ADMIN, "admin"),
        ];
        let mut first = true;
        for (p, name) in names {
            if self.can(p) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single access-control entry attached to a znode.
///
/// An ordered sequence of these forms the node's ACL. The list is replaced
/// wholesale by `set_acl`; entries are never patched individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    /// The permissions associated with this entry.
    pub perms: Permission,
    /// The authentication scheme this entry is valid under, e.g. `"world"`
    /// or `"digest"`.
    pub scheme: String,
    /// The scheme-specific identity, e.g. `"anyone"` for `"world"`.
    pub id: String,
}

impl Acl {
    /// Build an entry from its parts.
    pub fn new<S, I>(perms: Permission, scheme: S, id: I) -> Acl
    where
        S: Into<String>,
        I: Into<String>,
    {
        Acl {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// The canonical open entry: anyone may do anything.
    pub fn anyone_all() -> Acl {
        Acl::new(Permission::ALL, "world", "anyone")
    }

    /// The canonical read-only entry: anyone may read.
    pub fn anyone_read() -> Acl {
        Acl::new(Permission::READ, "world", "anyone")
    }

    /// An entry missing any of perms/scheme/id is skipped by the wire
    /// encoder rather than rejected.
    pub(crate) fn is_complete(&self) -> bool {
        self.perms != Permission::NONE && !self.scheme.is_empty() && !self.id.is_empty()
    }
}
