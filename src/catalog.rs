//! Signal catalog loading and normalization.
//!
//! An external store hands over raw [`SignalDocument`]s; this module turns
//! them into the [`SignalRecord`]s the matcher and the zone clustering work
//! on. A single bad document is dropped with a warning instead of failing the
//! whole load, but a load that ends up with no usable records is an error:
//! an empty catalog would be indistinguishable from "no signals near this
//! route".

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SignalMatchError};
use crate::{GeoPoint, SignalRecord};

/// A raw signal document as stored externally.
///
/// Every field is optional so malformed documents can be reported and
/// skipped rather than failing deserialization of the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalDocument {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude")]
    pub lng: Option<f64>,
}

impl SignalDocument {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: Some(id.into()),
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    /// A document without an id; one is derived from its coordinates.
    pub fn anonymous(lat: f64, lng: f64) -> Self {
        Self {
            id: None,
            lat: Some(lat),
            lng: Some(lng),
        }
    }
}

/// Why a document was left out of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCoordinates,
    OutOfRange,
    DuplicateId,
}

/// External store supplying raw signal documents.
pub trait CatalogSource {
    fn fetch(&self) -> Result<Vec<SignalDocument>>;
}

impl<F> CatalogSource for F
where
    F: Fn() -> Result<Vec<SignalDocument>>,
{
    fn fetch(&self) -> Result<Vec<SignalDocument>> {
        self()
    }
}

/// In-memory source, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    documents: Vec<SignalDocument>,
}

impl StaticSource {
    pub fn new(documents: Vec<SignalDocument>) -> Self {
        Self { documents }
    }

    pub fn from_records(records: &[SignalRecord]) -> Self {
        Self::new(
            records
                .iter()
                .map(|r| SignalDocument::new(r.id.clone(), r.location.latitude, r.location.longitude))
                .collect(),
        )
    }
}

impl CatalogSource for StaticSource {
    fn fetch(&self) -> Result<Vec<SignalDocument>> {
        Ok(self.documents.clone())
    }
}

/// Source reading a JSON array of documents from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CatalogSource for JsonFileSource {
    /// Only an unreadable file or a top level that is not an array fails the
    /// fetch. An entry that does not deserialize is logged and handed on
    /// without coordinates, so normalization counts it as rejected.
    fn fetch(&self) -> Result<Vec<SignalDocument>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            SignalMatchError::catalog_unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let entries: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            SignalMatchError::catalog_unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        Ok(entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                SignalDocument::deserialize(entry).unwrap_or_else(|e| {
                    warn!(
                        "Unreadable signal document #{position} in {}: {e}",
                        self.path.display()
                    );
                    SignalDocument {
                        id: entry_id(entry),
                        ..SignalDocument::default()
                    }
                })
            })
            .collect())
    }
}

/// Best-effort id of a raw entry, for log messages.
fn entry_id(entry: &Value) -> Option<String> {
    entry
        .get("_id")
        .or_else(|| entry.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// An immutable snapshot of the known traffic signals.
#[derive(Debug, Clone, Default)]
pub struct SignalCatalog {
    signals: Vec<SignalRecord>,
    rejected: usize,
}

impl SignalCatalog {
    /// Fetch from `source` and normalize.
    ///
    /// Fails with `CatalogUnavailable` when the source fails, returns
    /// nothing, or returns nothing usable.
    pub fn load(source: &dyn CatalogSource) -> Result<Self> {
        let documents = source.fetch()?;
        if documents.is_empty() {
            return Err(SignalMatchError::catalog_unavailable(
                "source returned no documents",
            ));
        }
        let catalog = Self::from_documents(documents);
        if catalog.is_empty() {
            return Err(SignalMatchError::catalog_unavailable(format!(
                "all {} documents were rejected",
                catalog.rejected
            )));
        }
        debug!(
            "Loaded signal catalog: {} signals, {} rejected",
            catalog.len(),
            catalog.rejected
        );
        Ok(catalog)
    }

    /// Normalize documents, dropping the ones that cannot be used.
    pub fn from_documents(documents: Vec<SignalDocument>) -> Self {
        let mut signals = Vec::with_capacity(documents.len());
        let mut seen: HashSet<String> = HashSet::with_capacity(documents.len());
        let mut rejected = 0;

        for (position, doc) in documents.into_iter().enumerate() {
            match normalize_document(doc, &mut seen) {
                Ok(record) => signals.push(record),
                Err((reason, label)) => {
                    warn!("Dropping signal document #{position} ({label}): {reason:?}");
                    rejected += 1;
                }
            }
        }

        Self { signals, rejected }
    }

    /// Wrap already-normalized records. Invalid and duplicate records are dropped.
    pub fn from_records(records: Vec<SignalRecord>) -> Self {
        Self::from_documents(
            records
                .into_iter()
                .map(|r| SignalDocument::new(r.id, r.location.latitude, r.location.longitude))
                .collect(),
        )
    }

    pub fn signals(&self) -> &[SignalRecord] {
        &self.signals
    }

    pub fn into_signals(self) -> Vec<SignalRecord> {
        self.signals
    }

    pub fn get(&self, id: &str) -> Option<&SignalRecord> {
        self.signals.iter().find(|s| s.id == id)
    }

    /// Number of documents dropped during normalization.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

fn normalize_document(
    doc: SignalDocument,
    seen: &mut HashSet<String>,
) -> std::result::Result<SignalRecord, (RejectReason, String)> {
    let label = doc.id.clone().unwrap_or_else(|| "<no id>".to_string());

    let (Some(lat), Some(lng)) = (doc.lat, doc.lng) else {
        return Err((RejectReason::MissingCoordinates, label));
    };

    let location = GeoPoint::new(lat, lng);
    if !location.is_valid() {
        return Err((RejectReason::OutOfRange, label));
    }

    let id = match doc.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => coordinate_id(&location),
    };

    if !seen.insert(id.clone()) {
        return Err((RejectReason::DuplicateId, id));
    }

    Ok(SignalRecord { id, location })
}

/// Stable id for documents that arrive without one.
fn coordinate_id(location: &GeoPoint) -> String {
    format!("{:.6},{:.6}", location.latitude, location.longitude)
}
