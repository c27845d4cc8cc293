// src/package.rs

//! Candidate package identity shared between the validation gates and the
//! transaction builder.
//!
//! A [`PackageRef`] is supplied by the caller (typically a solver candidate
//! or an installed-package record) and is read-only to this crate.

use std::collections::HashSet;

/// Synthetic repository name for packages given directly on the command line.
pub const CMDLINE_REPO_NAME: &str = "@commandline";

/// Solver-assigned package identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(pub u32);

/// Origin repository of a candidate package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub name: String,
    /// Repository opted out of modular gating to ship hotfix content.
    pub module_hotfixes: bool,
}

impl RepoRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_hotfixes: false,
        }
    }
}

/// Read-only reference to a candidate or installed package.
#[derive(Debug, Clone)]
pub struct PackageRef {
    pub id: PackageId,
    pub name: String,
    /// Full name-epoch:version-release.arch string, used in diagnostics.
    pub nevra: String,
    /// Resolvable origin repository, if any.
    pub repo: Option<RepoRef>,
    pub installed: bool,
    /// Record id in the installed-package database.
    pub db_id: u32,
}

/// Allow-list of package ids permitted to install from modular streams.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    ids: HashSet<PackageId>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PackageId) {
        self.ids.insert(id);
    }

    pub fn has(&self, id: PackageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<PackageId> for PackageSet {
    fn from_iter<I: IntoIterator<Item = PackageId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_set_membership() {
        let mut set = PackageSet::new();
        assert!(set.is_empty());

        set.insert(PackageId(3));
        set.insert(PackageId(9));
        set.insert(PackageId(3));

        assert_eq!(set.len(), 2);
        assert!(set.has(PackageId(3)));
        assert!(set.has(PackageId(9)));
        assert!(!set.has(PackageId(4)));
    }

    #[test]
    fn test_package_set_from_iterator() {
        let set: PackageSet = [PackageId(1), PackageId(2)].into_iter().collect();
        assert!(set.has(PackageId(1)));
        assert!(set.has(PackageId(2)));
        assert_eq!(set.len(), 2);
    }
}
