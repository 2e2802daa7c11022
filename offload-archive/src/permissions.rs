//! Nine-flag POSIX permission encoding used in archive headers.
//!
//! The bit assigned to each flag is part of the archive format: changing it
//! breaks every archive already written.

use std::collections::BTreeSet;
use std::fmt;

/// One of the nine `rwxrwxrwx` permission flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    OwnerRead,
    OwnerWrite,
    OwnerExecute,
    GroupRead,
    GroupWrite,
    GroupExecute,
    OthersRead,
    OthersWrite,
    OthersExecute,
}

impl Permission {
    /// All flags, most significant bit first.
    pub const ALL: [Permission; 9] = [
        Permission::OwnerRead,
        Permission::OwnerWrite,
        Permission::OwnerExecute,
        Permission::GroupRead,
        Permission::GroupWrite,
        Permission::GroupExecute,
        Permission::OthersRead,
        Permission::OthersWrite,
        Permission::OthersExecute,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Permission::OwnerRead => 0o400,
            Permission::OwnerWrite => 0o200,
            Permission::OwnerExecute => 0o100,
            Permission::GroupRead => 0o040,
            Permission::GroupWrite => 0o020,
            Permission::GroupExecute => 0o010,
            Permission::OthersRead => 0o004,
            Permission::OthersWrite => 0o002,
            Permission::OthersExecute => 0o001,
        }
    }

    fn symbol(self) -> char {
        match self {
            Permission::OwnerRead | Permission::GroupRead | Permission::OthersRead => 'r',
            Permission::OwnerWrite | Permission::GroupWrite | Permission::OthersWrite => 'w',
            Permission::OwnerExecute | Permission::GroupExecute | Permission::OthersExecute => 'x',
        }
    }
}

/// A set of permission flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Decode: one membership test per bit. Bits above `0o777` are ignored.
    pub fn from_mode(mode: u32) -> Self {
        Permission::ALL
            .into_iter()
            .filter(|p| mode & p.bit() != 0)
            .collect()
    }

    /// Encode: OR of the set flags' bits.
    pub fn to_mode(&self) -> u32 {
        self.0.iter().fold(0, |mode, p| mode | p.bit())
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in Permission::ALL {
            let c = if self.contains(p) { p.symbol() } else { '-' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
