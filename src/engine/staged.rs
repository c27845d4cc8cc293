// src/engine/staged.rs

//! Default transaction engine
//!
//! Parses package files with the `rpm` crate and keeps the installed-package
//! records in SQLite. Staged elements are held in submission order for a
//! downstream commit layer; dependency evaluation happens there, so the only
//! problem class this engine can report itself is duplicate staging.

use super::{DiagnosticSink, PackageHeader, Problem, TransactionSet};
use crate::error::{Error, Result};
use crate::policy::VerifyResult;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Owned metadata header for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderData {
    pub name: String,
    pub epoch: u32,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub modularity_label: Option<String>,
}

impl HeaderData {
    /// Full name-epoch:version-release.arch string; the epoch is printed
    /// only when nonzero.
    pub fn nevra(&self) -> String {
        if self.epoch != 0 {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        } else {
            format!(
                "{}-{}-{}.{}",
                self.name, self.version, self.release, self.arch
            )
        }
    }
}

impl PackageHeader for HeaderData {
    fn modularity_label(&self) -> Option<&str> {
        self.modularity_label.as_deref()
    }
}

/// Kind of operation a staged element represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    Install { upgrade: bool },
    Reinstall,
    Erase,
}

/// One element accepted into the staging area.
#[derive(Debug, Clone)]
pub struct StagedElement {
    pub kind: StagedKind,
    /// Correlation key handed back by the commit layer; the source file
    /// name for install and reinstall elements, absent for erase.
    pub key: Option<String>,
    pub header: HeaderData,
}

/// Transaction engine over a SQLite installed-package database.
pub struct StagedTransaction {
    conn: Connection,
    elements: Vec<StagedElement>,
}

impl StagedTransaction {
    /// Open a staging engine over the installed-package database at
    /// `db_path`, creating the database and its schema if needed.
    pub fn open(db_path: &str) -> Result<Self> {
        debug!("Opening installed-package database at: {}", db_path);

        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Engine over a private in-memory database, for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // Set pragmas for better performance and reliability
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS installed (
                db_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                epoch INTEGER NOT NULL DEFAULT 0,
                version TEXT NOT NULL,
                \"release\" TEXT NOT NULL,
                arch TEXT NOT NULL,
                modularity_label TEXT
            )",
            [],
        )?;

        Ok(Self {
            conn,
            elements: Vec::new(),
        })
    }

    /// Record a package as installed under a database record id.
    pub fn register_installed(&mut self, db_id: u32, header: &HeaderData) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO installed
             (db_id, name, epoch, version, \"release\", arch, modularity_label)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                db_id,
                header.name,
                header.epoch,
                header.version,
                header.release,
                header.arch,
                header.modularity_label,
            ],
        )?;
        info!("Registered installed package {} (id {})", header.nevra(), db_id);
        Ok(())
    }

    /// Staged elements in submission order.
    pub fn elements(&self) -> &[StagedElement] {
        &self.elements
    }
}

impl TransactionSet for StagedTransaction {
    type Header = HeaderData;

    fn read_package_file(&mut self, path: &Path) -> Result<(VerifyResult, HeaderData)> {
        debug!("Reading package file: {}", path.display());

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let pkg = rpm::Package::parse(&mut reader).map_err(|e| {
            Error::PackageRead(format!("Failed to parse RPM {}: {}", path.display(), e))
        })?;

        let metadata = &pkg.metadata;
        let name = metadata
            .get_name()
            .map_err(|e| Error::PackageRead(format!("Failed to get package name: {}", e)))?
            .to_string();
        let version = metadata
            .get_version()
            .map_err(|e| Error::PackageRead(format!("Failed to get package version: {}", e)))?
            .to_string();
        let release = metadata
            .get_release()
            .map_err(|e| Error::PackageRead(format!("Failed to get package release: {}", e)))?
            .to_string();
        let arch = metadata.get_arch().ok().unwrap_or("noarch").to_string();
        // An absent epoch tag means epoch zero
        let epoch = metadata.get_epoch().unwrap_or(0);

        let header = HeaderData {
            name,
            epoch,
            version,
            release,
            arch,
            // The pure-Rust parser exposes no accessor for the modularity
            // tag; labels enter through the installed-package records.
            modularity_label: None,
        };

        debug!("Parsed package header for {}", header.nevra());

        // No keyring is configured for this engine, so it never claims a
        // signature verified; strict policies will refuse these packages.
        Ok((VerifyResult::NotFound, header))
    }

    fn add_install_element(&mut self, header: HeaderData, key: &str, upgrade: bool) -> i32 {
        debug!("Staging install element {} ({})", header.nevra(), key);
        self.elements.push(StagedElement {
            kind: StagedKind::Install { upgrade },
            key: Some(key.to_string()),
            header,
        });
        0
    }

    fn add_reinstall_element(&mut self, header: HeaderData, key: &str) -> i32 {
        debug!("Staging reinstall element {} ({})", header.nevra(), key);
        self.elements.push(StagedElement {
            kind: StagedKind::Reinstall,
            key: Some(key.to_string()),
            header,
        });
        0
    }

    fn add_erase_element(&mut self, header: HeaderData) -> i32 {
        debug!("Staging erase element {}", header.nevra());
        self.elements.push(StagedElement {
            kind: StagedKind::Erase,
            key: None,
            header,
        });
        0
    }

    fn problems(&mut self) -> Vec<Problem> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();
        for element in &self.elements {
            if matches!(element.kind, StagedKind::Erase) {
                continue;
            }
            let nevra = element.header.nevra();
            if !seen.insert(nevra.clone()) {
                problems.push(Problem::new(format!(
                    "package {} is already staged for installation",
                    nevra
                )));
            }
        }
        problems
    }

    fn read_db_records(
        &mut self,
        db_id: u32,
        diag: &mut DiagnosticSink,
    ) -> Option<Vec<HeaderData>> {
        let mut stmt = match self.conn.prepare(
            "SELECT name, epoch, version, \"release\", arch, modularity_label
             FROM installed WHERE db_id = ?1",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!("Installed-package lookup unavailable: {}", e);
                diag.record(&e.to_string());
                return None;
            }
        };

        let rows = match stmt.query_map(params![db_id], |row| {
            Ok(HeaderData {
                name: row.get(0)?,
                epoch: row.get(1)?,
                version: row.get(2)?,
                release: row.get(3)?,
                arch: row.get(4)?,
                modularity_label: row.get(5)?,
            })
        }) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Installed-package lookup failed: {}", e);
                diag.record(&e.to_string());
                return None;
            }
        };

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok(header) => records.push(header),
                Err(e) => {
                    warn!("Installed-package record unreadable: {}", e);
                    diag.record(&e.to_string());
                    return None;
                }
            }
        }
        Some(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str) -> HeaderData {
        HeaderData {
            name: name.to_string(),
            epoch: 0,
            version: "1.0".to_string(),
            release: "1".to_string(),
            arch: "x86_64".to_string(),
            modularity_label: None,
        }
    }

    #[test]
    fn test_nevra_formats_epoch_only_when_nonzero() {
        let mut hdr = header("bash");
        assert_eq!(hdr.nevra(), "bash-1.0-1.x86_64");

        hdr.epoch = 2;
        assert_eq!(hdr.nevra(), "bash-2:1.0-1.x86_64");
    }

    #[test]
    fn test_register_and_read_back() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        let mut hdr = header("httpd");
        hdr.modularity_label = Some("httpd:2.4:820220101:deadbeef".to_string());
        ts.register_installed(7, &hdr).unwrap();

        let mut diag = DiagnosticSink::new();
        let records = ts.read_db_records(7, &mut diag).unwrap();
        assert_eq!(records, vec![hdr]);
        assert_eq!(diag.message(), None);
    }

    #[test]
    fn test_missing_record_id_yields_empty() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        let mut diag = DiagnosticSink::new();
        let records = ts.read_db_records(12345, &mut diag).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_register_replaces_existing_record() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        ts.register_installed(1, &header("old")).unwrap();
        ts.register_installed(1, &header("new")).unwrap();

        let mut diag = DiagnosticSink::new();
        let records = ts.read_db_records(1, &mut diag).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "new");
    }

    #[test]
    fn test_broken_database_captures_diagnostics() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        ts.conn.execute("DROP TABLE installed", []).unwrap();

        let mut diag = DiagnosticSink::new();
        assert!(ts.read_db_records(1, &mut diag).is_none());
        assert!(diag.message().is_some());
    }

    #[test]
    fn test_duplicate_staging_reported_as_problem() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        assert_eq!(ts.add_install_element(header("vim"), "vim.rpm", false), 0);
        assert_eq!(ts.add_install_element(header("vim"), "vim.rpm", false), 0);

        let problems = ts.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].describe().contains("vim-1.0-1.x86_64"));
    }

    #[test]
    fn test_erase_elements_do_not_conflict() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        assert_eq!(ts.add_install_element(header("vim"), "vim.rpm", true), 0);
        assert_eq!(ts.add_erase_element(header("vim")), 0);
        assert!(ts.problems().is_empty());
    }

    #[test]
    fn test_elements_kept_in_submission_order() {
        let mut ts = StagedTransaction::in_memory().unwrap();
        ts.add_install_element(header("a"), "a.rpm", false);
        ts.add_reinstall_element(header("b"), "b.rpm");
        ts.add_erase_element(header("c"));

        let kinds: Vec<StagedKind> = ts.elements().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StagedKind::Install { upgrade: false },
                StagedKind::Reinstall,
                StagedKind::Erase
            ]
        );
        assert_eq!(ts.elements()[0].key.as_deref(), Some("a.rpm"));
        assert_eq!(ts.elements()[2].key, None);
    }
}
