// src/transaction.rs

//! Staging operations binding the validation gates to a transaction engine
//!
//! Every operation follows the same skeleton: acquire a metadata header,
//! run the applicable gates, register the element, and surface an engine
//! refusal verbatim with its numeric status. Headers move into the engine
//! on success and drop on every abort path, so no partial element is ever
//! left registered after a validation failure.

use crate::engine::{DiagnosticSink, TransactionSet};
use crate::error::{Error, Result};
use crate::package::{PackageRef, PackageSet};
use crate::policy::{check_modular_install, TrustPolicy, Verdict};
use std::path::Path;
use tracing::debug;

/// Stage an install or upgrade of the package file at `filename`.
///
/// No solver candidate is available on this path, so only the signature
/// policy runs; the modularity gate needs a [`PackageRef`] and is applied
/// by [`add_gated_install`].
pub fn add_install<T: TransactionSet>(
    ts: &mut T,
    filename: &Path,
    policy: TrustPolicy,
    upgrade: bool,
) -> Result<()> {
    add_install_inner(ts, filename, policy, upgrade, None, None)
}

/// Stage an install or upgrade of a solver candidate, running both the
/// signature policy and the modularity gate before registration.
pub fn add_gated_install<T: TransactionSet>(
    ts: &mut T,
    filename: &Path,
    policy: TrustPolicy,
    upgrade: bool,
    pkg: &PackageRef,
    includes: Option<&PackageSet>,
) -> Result<()> {
    add_install_inner(ts, filename, policy, upgrade, Some(pkg), includes)
}

fn add_install_inner<T: TransactionSet>(
    ts: &mut T,
    filename: &Path,
    policy: TrustPolicy,
    upgrade: bool,
    pkg: Option<&PackageRef>,
    includes: Option<&PackageSet>,
) -> Result<()> {
    let name = filename.display().to_string();

    let (result, header) = ts.read_package_file(filename)?;
    if let Verdict::Rejected(reason) = policy.evaluate(result, &name) {
        return Err(Error::Internal(reason));
    }
    if let Some(pkg) = pkg {
        check_modular_install(&header, pkg, includes)?;
    }

    let rc = ts.add_install_element(header, &name, upgrade);
    if rc != 0 {
        return Err(Error::Internal(format!(
            "failed to add install element: {} [{}]",
            name, rc
        )));
    }

    debug!("Staged install for {}", name);
    Ok(())
}

/// Stage a reinstall of the package file at `filename`.
///
/// Shares the open-and-validate skeleton with the install path but never
/// runs the modularity gate: reinstall is only offered for packages the
/// system already accepted once.
pub fn add_reinstall<T: TransactionSet>(
    ts: &mut T,
    filename: &Path,
    policy: TrustPolicy,
) -> Result<()> {
    let name = filename.display().to_string();

    let (result, header) = ts.read_package_file(filename)?;
    if let Verdict::Rejected(reason) = policy.evaluate(result, &name) {
        return Err(Error::Internal(reason));
    }

    let rc = ts.add_reinstall_element(header, &name);
    if rc != 0 {
        return Err(Error::Internal(format!(
            "failed to add reinstall element: {} [{}]",
            name, rc
        )));
    }

    debug!("Staged reinstall for {}", name);
    Ok(())
}

/// Stage removal of an installed package.
pub fn add_erase<T: TransactionSet>(ts: &mut T, pkg: &PackageRef) -> Result<()> {
    let header = find_installed(ts, pkg)?;

    let rc = ts.add_erase_element(header);
    if rc != 0 {
        return Err(Error::Internal(format!(
            "could not add erase element {} ({})",
            pkg.name, rc
        )));
    }

    debug!("Staged erase for {}", pkg.name);
    Ok(())
}

/// Look up the installed header recorded under `pkg`'s database record id.
///
/// A fresh [`DiagnosticSink`] is scoped to this call, so any low-level
/// corruption message the database emits during the lookup names the root
/// cause instead of being lost. An unavailable database distinguishes
/// itself from a merely missing record: the former needs recovery, the
/// latter the caller may skip.
pub fn find_installed<T: TransactionSet>(ts: &mut T, pkg: &PackageRef) -> Result<T::Header> {
    let mut diag = DiagnosticSink::new();

    let Some(records) = ts.read_db_records(pkg.db_id, &mut diag) else {
        let message = diag
            .into_message()
            .unwrap_or_else(|| "Fatal error, run database recovery".to_string());
        return Err(Error::UnfinishedTransaction(message));
    };

    records
        .into_iter()
        .next()
        .ok_or_else(|| Error::PackageNotFound(pkg.name.clone()))
}

/// Fold the problems recorded by the last transaction evaluation into a
/// single diagnostic.
///
/// Zero problems is success. Otherwise the rendered descriptions are
/// joined with newlines; if every rendering is empty the caller still gets
/// a diagnostic rather than silence.
pub fn check_for_problems<T: TransactionSet>(ts: &mut T) -> Result<()> {
    let problems = ts.problems();
    if problems.is_empty() {
        return Ok(());
    }

    let combined = problems
        .iter()
        .map(|p| p.describe())
        .collect::<Vec<_>>()
        .join("\n");

    if combined.trim().is_empty() {
        return Err(Error::Internal(
            "Error running transaction and no problems were reported!".to_string(),
        ));
    }

    Err(Error::Internal(format!(
        "Error running transaction: {}",
        combined
    )))
}
