//! Append-only record storage.
//!
//! One directory holds a CSV log per (participant, kind) and a shared
//! completion log. Files are created lazily with their header and only ever
//! appended to afterwards.

mod error;
mod kind;
mod locks;
mod row;
mod submission;

pub use error::{StoreError, ValidationError};
pub use kind::{RecordKind, COMPLETION_LOG, SCENARIO_COLUMNS, TRIAL_COLUMNS};
pub use locks::FileLocks;
pub use row::{header_line, render_row, render_value};
pub use submission::Submission;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// What an append did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A row was appended to a CSV log.
    Appended { file: String, created: bool },
    /// The payload was appended to the completion log.
    Logged { file: String },
    /// Unknown `data_type`; nothing was written.
    Ignored { data_type: String },
}

/// File-backed store for experiment records.
#[derive(Debug)]
pub struct RecordStore {
    root: PathBuf,
    canonical_root: PathBuf,
    locks: FileLocks,
}

impl RecordStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        let canonical_root = fs::canonicalize(&root).map_err(|e| StoreError::io(&root, e))?;

        tracing::debug!(root = %canonical_root.display(), "Opened record store");

        Ok(Self {
            root,
            canonical_root,
            locks: FileLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a validated submission.
    pub fn append(&self, submission: &Submission) -> Result<AppendOutcome, StoreError> {
        let Some(kind) = submission.kind() else {
            return Ok(AppendOutcome::Ignored {
                data_type: submission.data_type().to_string(),
            });
        };

        match kind.columns() {
            Some(columns) => {
                let file = kind.file_name(submission.file_safe_participant_id()?);
                let row = render_row(columns, submission.data());
                let created = self.append_csv(&file, columns, &row)?;
                Ok(AppendOutcome::Appended { file, created })
            }
            None => {
                let file = kind.file_name(submission.participant_id());
                let mut line = serde_json::to_string(submission.raw())?;
                line.push('\n');
                self.append_line(&file, &line)?;
                Ok(AppendOutcome::Logged { file })
            }
        }
    }

    /// Append `row` to a CSV log, writing the header first if the file is new
    /// or empty. Returns whether the header was written.
    fn append_csv(&self, file: &str, columns: &[&str], row: &str) -> Result<bool, StoreError> {
        let path = self.root.join(file);
        let slot = self.locks.slot(file);
        let _guard = slot.lock();

        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        let is_new = handle
            .metadata()
            .map_err(|e| StoreError::io(&path, e))?
            .len()
            == 0;

        if is_new {
            handle
                .write_all(header_line(columns).as_bytes())
                .map_err(|e| StoreError::io(&path, e))?;
        }
        handle
            .write_all(row.as_bytes())
            .map_err(|e| StoreError::io(&path, e))?;

        Ok(is_new)
    }

    fn append_line(&self, file: &str, line: &str) -> Result<(), StoreError> {
        let path = self.root.join(file);
        let slot = self.locks.slot(file);
        let _guard = slot.lock();

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut handle| handle.write_all(line.as_bytes()))
            .map_err(|e| StoreError::io(&path, e))
    }

    /// Names of the CSV logs in the storage directory, in directory order.
    pub fn list_files(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".csv") {
                    files.push(name.to_string());
                }
            }
        }
        Ok(files)
    }

    /// Resolve an untrusted file name to a regular file directly inside the
    /// storage directory.
    pub fn resolve_file(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !is_plain_file_name(name) {
            return Err(StoreError::PathTraversal(name.to_string()));
        }

        let candidate = self.root.join(name);
        let resolved = match fs::canonicalize(&candidate) {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StoreError::io(candidate, e)),
        };

        // Symlinks may point anywhere; only direct children of the root count.
        if resolved.parent() != Some(self.canonical_root.as_path()) {
            tracing::warn!(
                name = %name,
                resolved = %resolved.display(),
                "Rejected file outside storage directory"
            );
            return Err(StoreError::PathTraversal(name.to_string()));
        }
        if !resolved.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        Ok(resolved)
    }
}

/// A single normal path component with no separators of either platform.
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn submission(body: Value) -> Submission {
        Submission::from_value(body).unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_trial_creates_file_with_header() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let outcome = store
            .append(&submission(json!({
                "participant_id": "42",
                "data_type": "trial",
                "data": {"age": 5, "main": "true", "response_time": 812}
            })))
            .unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Appended {
                file: "participant_42_dots.csv".to_string(),
                created: true
            }
        );

        let lines = read_lines(&dir.path().join("participant_42_dots.csv"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TRIAL_COLUMNS.join(","));

        let cells: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cells.len(), TRIAL_COLUMNS.len());
        for (column, cell) in TRIAL_COLUMNS.iter().zip(&cells) {
            let expected = match *column {
                "age" => "5",
                "main" => "true",
                "response_time" => "812",
                _ => "",
            };
            assert_eq!(*cell, expected, "column {column}");
        }
    }

    #[test]
    fn test_repeated_appends_keep_single_header() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        for block in 1..=4 {
            let outcome = store
                .append(&submission(json!({
                    "participant_id": "7",
                    "data_type": "scenario",
                    "data": {"participant": "7", "block": block, "scenario_response": "A"}
                })))
                .unwrap();
            assert_eq!(
                outcome,
                AppendOutcome::Appended {
                    file: "participant_7_scenarios.csv".to_string(),
                    created: block == 1
                }
            );
        }

        let lines = read_lines(&dir.path().join("participant_7_scenarios.csv"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "participant,block,block_type,scenario,scenario_response");
        assert_eq!(lines[3], "7,3,,,A");
        assert!(lines[1..].iter().all(|l| l.split(',').count() == 5));
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("participant_9_scenarios.csv"), "").unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        store
            .append(&submission(json!({
                "participant_id": "9",
                "data_type": "scenario",
                "data": {"block": 1}
            })))
            .unwrap();

        let lines = read_lines(&dir.path().join("participant_9_scenarios.csv"));
        assert_eq!(lines[0], SCENARIO_COLUMNS.join(","));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_completion_logs_raw_body() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let body = json!({"participant_id": "42", "data_type": "completion", "data": {}});

        let outcome = store.append(&submission(body.clone())).unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Logged {
                file: COMPLETION_LOG.to_string()
            }
        );

        let lines = read_lines(&dir.path().join(COMPLETION_LOG));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], serde_json::to_string(&body).unwrap());
        assert_eq!(
            lines[0],
            r#"{"participant_id":"42","data_type":"completion","data":{}}"#
        );
    }

    #[test]
    fn test_participant_id_checked_only_for_csv_files() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let err = store
            .append(&submission(json!({
                "participant_id": "sub01@lab",
                "data_type": "trial",
                "data": {"age": 5}
            })))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidParticipantId)
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let body = json!({"participant_id": "P 01", "data_type": "completion", "data": {"done": true}});
        let outcome = store.append(&submission(body.clone())).unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Logged {
                file: COMPLETION_LOG.to_string()
            }
        );
        let lines = read_lines(&dir.path().join(COMPLETION_LOG));
        assert_eq!(lines, vec![serde_json::to_string(&body).unwrap()]);
    }

    #[test]
    fn test_unknown_kind_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();

        let outcome = store
            .append(&submission(json!({
                "participant_id": "42",
                "data_type": "survey",
                "data": {"q1": "yes"}
            })))
            .unwrap();
        assert_eq!(
            outcome,
            AppendOutcome::Ignored {
                data_type: "survey".to_string()
            }
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_list_files_only_csv() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("participant_1_dots.csv"), "a\n").unwrap();
        fs::write(dir.path().join("participant_1_scenarios.csv"), "a\n").unwrap();
        fs::write(dir.path().join(COMPLETION_LOG), "{}\n").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let mut files = store.list_files().unwrap();
        files.sort();
        assert_eq!(
            files,
            vec!["participant_1_dots.csv", "participant_1_scenarios.csv"]
        );
    }

    #[test]
    fn test_resolve_file() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("participant_1_dots.csv"), "a\n").unwrap();

        let path = store.resolve_file("participant_1_dots.csv").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "a\n");

        assert!(matches!(
            store.resolve_file("participant_2_dots.csv"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("data");
        let store = RecordStore::open(&root).unwrap();
        fs::write(outer.path().join("secret.csv"), "secret\n").unwrap();

        for name in ["../secret.csv", "..", ".", "", "a/b.csv", "..\\secret.csv", "/etc/passwd"] {
            assert!(
                matches!(store.resolve_file(name), Err(StoreError::PathTraversal(_))),
                "expected traversal rejection for {name:?}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outer = tempdir().unwrap();
        let root = outer.path().join("data");
        let store = RecordStore::open(&root).unwrap();
        fs::write(outer.path().join("secret.csv"), "secret\n").unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.csv"), root.join("link.csv"))
            .unwrap();

        assert!(matches!(
            store.resolve_file("link.csv"),
            Err(StoreError::PathTraversal(_))
        ));
    }
}
