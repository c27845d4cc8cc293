// src/engine/mod.rs

//! Seam between the staging layer and the transaction engine
//!
//! [`TransactionSet`] is the boundary this crate validates against:
//! dependency resolution, ordering, and the on-disk commit all live behind
//! it. [`staged::StagedTransaction`] is the default implementation, backed
//! by the `rpm` parser and a SQLite installed-package database.

pub mod staged;

pub use staged::{HeaderData, StagedElement, StagedKind, StagedTransaction};

use crate::error::Result;
use crate::policy::VerifyResult;
use std::path::Path;

/// Parsed package metadata, queryable by the validation gates.
pub trait PackageHeader {
    /// Modularity label marking membership in a modular content stream.
    fn modularity_label(&self) -> Option<&str>;
}

/// One conflict recorded by the engine after transaction evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    message: String,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Human-readable rendering, one line.
    pub fn describe(&self) -> &str {
        &self.message
    }
}

/// Captures low-level diagnostics emitted by the package database during a
/// lookup.
///
/// This replaces a process-wide log callback with an explicit, call-scoped
/// sink: only the lookup that installed it sees its messages, and nothing
/// leaks into unrelated operations.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    captured: Option<String>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error-level message. Internal BDB chatter is dropped,
    /// multiple messages are joined with ": ", and the trailing newline
    /// the database layer appends is stripped.
    pub fn record(&mut self, message: &str) {
        if message.contains("BDB") {
            return;
        }
        let message = message.strip_suffix('\n').unwrap_or(message);
        match &mut self.captured {
            Some(buf) => {
                buf.push_str(": ");
                buf.push_str(message);
            }
            None => self.captured = Some(message.to_string()),
        }
    }

    /// Everything captured so far, or `None` if nothing was.
    pub fn message(&self) -> Option<&str> {
        self.captured.as_deref()
    }

    pub fn into_message(self) -> Option<String> {
        self.captured
    }
}

/// An engine accumulating install/reinstall/erase elements for one
/// transaction.
///
/// Element registration takes the header by value: on acceptance the
/// engine owns it, and on refusal (nonzero status) the engine is expected
/// to have dropped it. Callers serialize access to one transaction set,
/// matching the engine's single-writer model.
pub trait TransactionSet {
    type Header: PackageHeader;

    /// Open and parse one package file, reporting the engine's signature
    /// verification result alongside the header. The file handle does not
    /// outlive this call.
    fn read_package_file(&mut self, path: &Path) -> Result<(VerifyResult, Self::Header)>;

    /// Register an install element keyed by the file name. Returns the
    /// engine status; 0 means accepted.
    fn add_install_element(&mut self, header: Self::Header, key: &str, upgrade: bool) -> i32;

    /// Register a reinstall element keyed by the file name.
    fn add_reinstall_element(&mut self, header: Self::Header, key: &str) -> i32;

    /// Register an erase element for an installed package.
    fn add_erase_element(&mut self, header: Self::Header) -> i32;

    /// Conflicts recorded by the last transaction evaluation.
    fn problems(&mut self) -> Vec<Problem>;

    /// Fetch the installed records stored under one database record id.
    ///
    /// `None` means the database could not be opened for iteration at all;
    /// diagnostics emitted during the attempt land in `diag`. `Some` holds
    /// the matching records, possibly none.
    fn read_db_records(
        &mut self,
        db_id: u32,
        diag: &mut DiagnosticSink,
    ) -> Option<Vec<Self::Header>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_starts_empty() {
        let sink = DiagnosticSink::new();
        assert_eq!(sink.message(), None);
        assert_eq!(sink.into_message(), None);
    }

    #[test]
    fn test_sink_joins_messages() {
        let mut sink = DiagnosticSink::new();
        sink.record("cannot open Packages index\n");
        sink.record("region recovery required");
        assert_eq!(
            sink.message(),
            Some("cannot open Packages index: region recovery required")
        );
    }

    #[test]
    fn test_sink_skips_bdb_noise() {
        let mut sink = DiagnosticSink::new();
        sink.record("BDB0087 DB_RUNRECOVERY\n");
        assert_eq!(sink.message(), None);

        sink.record("db5 error\n");
        sink.record("BDB0061 PANIC");
        assert_eq!(sink.message(), Some("db5 error"));
    }

    #[test]
    fn test_problem_describe() {
        let problem = Problem::new("file /usr/bin/x conflicts between a and b");
        assert_eq!(
            problem.describe(),
            "file /usr/bin/x conflicts between a and b"
        );
    }
}
