//! Flat-file record stores
//!
//! Each store is a whole CSV file loaded into memory, mutated, and written
//! back in full. Writes go to a temporary file in the same directory which is
//! then renamed over the target, so a failed save never leaves a truncated
//! file behind. There is no locking: two processes saving the same file race
//! and the last writer wins.

pub mod models;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{LibraryError, Result};

pub use models::{
    INFLUENCE_HEADERS, InfluencePatch, InfluenceRecord, InfluenceStatus, PROMPT_HEADERS,
    PromptPatch, PromptRecord, split_list,
};

/// A row type with a declared column schema and a unique identifier.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Typed partial update applied by [`RecordStore::update_fields`].
    type Patch;
    /// Human label used in error messages ("Prompt", "Influence").
    const KIND: &'static str;
    /// Header row, in the same order as the struct's fields.
    const HEADERS: &'static [&'static str];

    fn id(&self) -> &str;
    fn apply(&mut self, patch: Self::Patch);
}

/// Read every record from `path`, preserving file order.
///
/// Missing header columns, malformed rows and duplicate identifiers are all
/// fatal; nothing is skipped or repaired.
pub fn load_records<R: Record>(path: &Path) -> Result<Vec<R>> {
    let file = File::open(path).map_err(|e| LibraryError::io(path, e))?;
    let mut rdr = csv::Reader::from_reader(file);

    let headers = rdr.headers()?.clone();
    for expected in R::HEADERS {
        if headers.iter().any(|h| h == *expected) {
            continue;
        }
        // Columns bind by exact name, so a padded header would fail per row.
        let message = match headers.iter().find(|h| h.trim() == *expected) {
            Some(padded) => format!(
                "{} column '{}' has surrounding whitespace; expected '{}'",
                path.display(),
                padded,
                expected
            ),
            None => format!("{} is missing required column '{}'", path.display(), expected),
        };
        return Err(LibraryError::Validation { message });
    }

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: R = result?;
        records.push(record);
    }
    ensure_unique(&records)?;

    debug!("Loaded {} {} records from {}", records.len(), R::KIND, path.display());
    Ok(records)
}

/// Replace the file at `path` with `records`.
///
/// An empty slice is refused before anything on disk is touched.
pub fn save_records<R: Record>(path: &Path, records: &[R]) -> Result<()> {
    if records.is_empty() {
        return Err(LibraryError::EmptyWrite { kind: R::KIND });
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| LibraryError::io(&dir, e))?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        wtr.write_record(R::HEADERS)?;
        for record in records {
            wtr.serialize(record)?;
        }
        wtr.flush().map_err(|e| LibraryError::io(path, e))?;
    }
    tmp.flush().map_err(|e| LibraryError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| LibraryError::io(path, e))?;

    // Keep the existing file's permissions rather than the temp file's 0600.
    if let Ok(meta) = std::fs::metadata(path) {
        let _ = std::fs::set_permissions(tmp.path(), meta.permissions());
    }

    tmp.persist(path).map_err(|e| LibraryError::io(path, e.error))?;

    info!("Saved {} {} records to {}", records.len(), R::KIND, path.display());
    Ok(())
}

fn ensure_unique<R: Record>(records: &[R]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            return Err(LibraryError::DuplicateId {
                kind: R::KIND,
                id: record.id().to_string(),
            });
        }
    }
    Ok(())
}

/// In-memory snapshot of one record file.
///
/// `open` and `save` are the only methods that touch the filesystem.
#[derive(Debug, Clone)]
pub struct RecordStore<R: Record> {
    path: PathBuf,
    records: Vec<R>,
}

pub type PromptStore = RecordStore<PromptRecord>;
pub type InfluenceStore = RecordStore<InfluenceRecord>;

impl<R: Record> RecordStore<R> {
    /// Load the whole file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = load_records(&path)?;
        Ok(Self { path, records })
    }

    /// Build a store from records that are not on disk yet.
    pub fn from_records(path: impl Into<PathBuf>, records: Vec<R>) -> Result<Self> {
        ensure_unique(&records)?;
        Ok(Self {
            path: path.into(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Apply `patch` to the record with identifier `id`.
    pub fn update_fields(&mut self, id: &str, patch: R::Patch) -> Result<&R> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| LibraryError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            })?;
        record.apply(patch);
        Ok(record)
    }

    /// Append a record, rejecting identifier collisions.
    pub fn append(&mut self, record: R) -> Result<()> {
        if self.find_by_id(record.id()).is_some() {
            return Err(LibraryError::DuplicateId {
                kind: R::KIND,
                id: record.id().to_string(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Mutable access for bulk edits; identifiers must not be changed.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.records.iter_mut()
    }

    /// Persist the full snapshot, replacing the file.
    pub fn save(&self) -> Result<()> {
        save_records(&self.path, &self.records)
    }
}
