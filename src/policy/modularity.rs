// src/policy/modularity.rs

//! Modularity gate
//!
//! Fail-safe check refusing to install a modular package unless the
//! enabled module streams actually provide it. Without this, a modular
//! package pulled in outside its stream would shadow stream content and
//! leave the system in a state the module metadata cannot describe.

use crate::engine::PackageHeader;
use crate::error::{Error, Result};
use crate::package::{PackageRef, PackageSet, CMDLINE_REPO_NAME};
use tracing::debug;

/// Decide whether installing `pkg` may proceed given its parsed header.
///
/// Always allowed: packages already installed, packages given on the
/// command line, packages from a repository with module hotfixes enabled,
/// and packages with no resolvable origin repository. Otherwise a header
/// carrying a modularity label is allowed only when `includes` contains
/// the package's id.
pub fn check_modular_install<H: PackageHeader>(
    header: &H,
    pkg: &PackageRef,
    includes: Option<&PackageSet>,
) -> Result<()> {
    if pkg.installed {
        return Ok(());
    }
    match pkg.repo.as_ref() {
        // No resolvable origin repository
        None => return Ok(()),
        Some(repo) => {
            if repo.name == CMDLINE_REPO_NAME || repo.module_hotfixes {
                return Ok(());
            }
        }
    }

    if header.modularity_label().is_none() {
        return Ok(());
    }

    match includes {
        Some(set) if set.has(pkg.id) => {
            debug!("Modular package {} enabled by module streams", pkg.nevra);
            Ok(())
        }
        _ => Err(Error::Internal(format!(
            "No available modular metadata for modular package '{}'; \
             cannot be installed on the system",
            pkg.nevra
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageId, RepoRef};

    struct TestHeader {
        label: Option<&'static str>,
    }

    impl PackageHeader for TestHeader {
        fn modularity_label(&self) -> Option<&str> {
            self.label
        }
    }

    const MODULAR: TestHeader = TestHeader {
        label: Some("nodejs:16:820220101:abcdef12"),
    };
    const PLAIN: TestHeader = TestHeader { label: None };

    fn candidate(repo: Option<RepoRef>, installed: bool) -> PackageRef {
        PackageRef {
            id: PackageId(11),
            name: "nodejs".to_string(),
            nevra: "nodejs-1:16.0.0-1.x86_64".to_string(),
            repo,
            installed,
            db_id: 0,
        }
    }

    fn includes_with_candidate() -> PackageSet {
        [PackageId(11)].into_iter().collect()
    }

    #[test]
    fn test_installed_package_always_allowed() {
        let pkg = candidate(Some(RepoRef::new("appstream")), true);
        assert!(check_modular_install(&MODULAR, &pkg, None).is_ok());
    }

    #[test]
    fn test_commandline_package_always_allowed() {
        let pkg = candidate(Some(RepoRef::new(CMDLINE_REPO_NAME)), false);
        assert!(check_modular_install(&MODULAR, &pkg, None).is_ok());
    }

    #[test]
    fn test_hotfix_repo_always_allowed() {
        let repo = RepoRef {
            name: "hotfixes".to_string(),
            module_hotfixes: true,
        };
        let pkg = candidate(Some(repo), false);
        assert!(check_modular_install(&MODULAR, &pkg, None).is_ok());
    }

    #[test]
    fn test_unresolvable_origin_allowed() {
        let pkg = candidate(None, false);
        assert!(check_modular_install(&MODULAR, &pkg, None).is_ok());
    }

    #[test]
    fn test_unlabeled_package_allowed() {
        let pkg = candidate(Some(RepoRef::new("appstream")), false);
        assert!(check_modular_install(&PLAIN, &pkg, None).is_ok());
    }

    #[test]
    fn test_modular_package_rejected_without_includes() {
        let pkg = candidate(Some(RepoRef::new("appstream")), false);
        let err = check_modular_install(&MODULAR, &pkg, None).unwrap_err();
        match err {
            Error::Internal(msg) => {
                assert!(msg.contains("nodejs-1:16.0.0-1.x86_64"), "got: {}", msg);
                assert!(msg.contains("No available modular metadata"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_modular_package_rejected_when_not_included() {
        let pkg = candidate(Some(RepoRef::new("appstream")), false);
        let includes: PackageSet = [PackageId(99)].into_iter().collect();
        assert!(check_modular_install(&MODULAR, &pkg, Some(&includes)).is_err());
    }

    #[test]
    fn test_modular_package_allowed_when_included() {
        let pkg = candidate(Some(RepoRef::new("appstream")), false);
        let includes = includes_with_candidate();
        assert!(check_modular_install(&MODULAR, &pkg, Some(&includes)).is_ok());
    }
}
