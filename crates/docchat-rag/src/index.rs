//! Per-document vector collection with brute-force cosine similarity search.
//!
//! One uploaded PDF maps to one collection. Its chunks are small enough
//! that a linear scan per query is fine, and the whole collection is
//! persisted as a single JSON file.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docchat_core::SourceDocument;

use crate::error::RagError;

/// File name of a persisted collection inside its directory.
pub const COLLECTION_FILE: &str = "collection.json";

/// A single hit returned from a vector search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: Uuid,
    /// Cosine similarity score.
    pub score: f64,
    pub document: SourceDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorEntry {
    id: Uuid,
    embedding: Vec<f32>,
    document: SourceDocument,
}

/// On-disk layout of a collection.
#[derive(Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    created_at: DateTime<Utc>,
    entries: Vec<VectorEntry>,
}

/// In-memory vector collection using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock. Entries keep insertion order, so hits
/// with equal scores come back in the order their chunks were indexed.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    name: String,
    created_at: DateTime<Utc>,
    entries: Arc<RwLock<Vec<VectorEntry>>>,
}

impl VectorIndex {
    /// Create a new empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Insert a chunk and its embedding. Overwrites an existing entry with the same ID.
    pub fn insert(
        &self,
        id: Uuid,
        embedding: Vec<f32>,
        document: SourceDocument,
    ) -> Result<(), RagError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;
        let entry = VectorEntry {
            id,
            embedding,
            document,
        };
        match entries.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Return the `k` chunks most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;

        let mut scored: Vec<SearchHit> = entries
            .iter()
            .map(|entry| SearchHit {
                id: entry.id,
                score: cosine_similarity(query, &entry.embedding),
                document: entry.document.clone(),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the collection to `<dir>/collection.json`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<(), RagError> {
        std::fs::create_dir_all(dir)?;
        let entries = self
            .entries
            .read()
            .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;
        let file = CollectionFile {
            name: self.name.clone(),
            created_at: self.created_at,
            entries: entries.clone(),
        };
        let json = serde_json::to_vec(&file)?;
        std::fs::write(dir.join(COLLECTION_FILE), json)?;
        Ok(())
    }

    /// Load a collection previously written by [`VectorIndex::save`].
    ///
    /// A missing directory or file is reported as `CollectionNotFound`.
    pub fn load(dir: &Path, name: &str) -> Result<Self, RagError> {
        let path = dir.join(COLLECTION_FILE);
        if !path.is_file() {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }
        let bytes = std::fs::read(&path)?;
        let file: CollectionFile = serde_json::from_slice(&bytes)?;
        Ok(Self {
            name: file.name,
            created_at: file.created_at,
            entries: Arc::new(RwLock::new(file.entries)),
        })
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
