//! Nearest-neighbour access to the recipe corpus.
//!
//! The index itself is built by the ingestion service; this module only loads
//! it and answers `{query, top_k}` lookups.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::debug;

use super::embedding_engine::Embedder;

/// Field names the ingestion service uses for the node text.
const TEXT_FIELDS: &[&str] = &["text", "recipe_text"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub text: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>>;
}

/// One stored recipe vector.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredNode {
    #[serde(rename = "__id__")]
    id: String,
    #[serde(flatten)]
    fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    embedding_dim: usize,
    data: Vec<StoredNode>,
    #[serde(with = "base64_floats")]
    matrix: Vec<f32>,
}

mod base64_floats {
    use super::*;
    use bytemuck::cast_slice;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(vec: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        let b64 = general_purpose::STANDARD.encode(cast_slice::<f32, u8>(vec));
        serializer.serialize_str(&b64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)?;
        if bytes.len() % 4 != 0 {
            return Err(serde::de::Error::custom("matrix byte length is not a multiple of 4"));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

/// Cosine-similarity index held in memory. Rows are normalized on load.
pub struct LocalRecipeIndex {
    embedder: Box<dyn Embedder>,
    dimension: usize,
    texts: Vec<String>,
    matrix: Vec<f32>,
}

impl LocalRecipeIndex {
    pub fn new(embedder: Box<dyn Embedder>, entries: Vec<IndexEntry>) -> Result<Self> {
        let dimension = embedder.dimension();
        let mut texts = Vec::with_capacity(entries.len());
        let mut matrix = Vec::with_capacity(entries.len() * dimension);
        for entry in entries {
            if entry.vector.len() != dimension {
                anyhow::bail!(
                    "Embedding dimension mismatch for '{}': expected {}, got {}",
                    entry.id,
                    dimension,
                    entry.vector.len()
                );
            }
            matrix.extend(normalize(&entry.vector));
            texts.push(entry.text);
        }
        Ok(Self {
            embedder,
            dimension,
            texts,
            matrix,
        })
    }

    /// Loads an index file written by the ingestion service.
    pub fn load(path: &Path, embedder: Box<dyn Embedder>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe index at {:?}", path))?;
        let file: IndexFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse recipe index at {:?}", path))?;

        if file.embedding_dim != embedder.dimension() {
            anyhow::bail!(
                "Embedding dimension mismatch: index has {}, embedder produces {}",
                file.embedding_dim,
                embedder.dimension()
            );
        }
        let expected_len = file.data.len() * file.embedding_dim;
        if file.matrix.len() != expected_len {
            anyhow::bail!(
                "Matrix size mismatch: expected {}, got {}",
                expected_len,
                file.matrix.len()
            );
        }

        let entries = file
            .data
            .into_iter()
            .zip(file.matrix.chunks_exact(file.embedding_dim.max(1)))
            .map(|(node, row)| IndexEntry {
                text: node_text(&node.fields),
                id: node.id,
                vector: row.to_vec(),
            })
            .collect();
        Self::new(embedder, entries)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn nearest(&self, query_vector: &[f32], top_k: usize) -> Vec<ScoredNode> {
        if self.is_empty() || top_k == 0 || self.dimension == 0 {
            return Vec::new();
        }
        let query_norm = normalize(query_vector);
        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(idx, row)| (idx, dot(row, &query_norm)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| ScoredNode {
                text: self.texts[idx].clone(),
                score,
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for LocalRecipeIndex {
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>> {
        let query_vector = self
            .embedder
            .embed_one(query)
            .with_context(|| format!("Failed to embed query '{}'", query))?;
        if query_vector.len() != self.dimension {
            anyhow::bail!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                query_vector.len()
            );
        }
        let nodes = self.nearest(&query_vector, top_k);
        debug!(requested = top_k, returned = nodes.len(), "local index query");
        Ok(nodes)
    }
}

type EmbedderFactory = Box<dyn Fn() -> Result<Box<dyn Embedder>> + Send + Sync>;

/// Defers reading the index (and building the embedder) until the first
/// query, so commands that never touch the corpus stay cheap.
pub struct LazyRecipeIndex {
    path: PathBuf,
    make_embedder: EmbedderFactory,
    index: OnceCell<LocalRecipeIndex>,
}

impl LazyRecipeIndex {
    pub fn new<F>(path: impl Into<PathBuf>, make_embedder: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            make_embedder: Box::new(make_embedder),
            index: OnceCell::new(),
        }
    }

    async fn index(&self) -> Result<&LocalRecipeIndex> {
        self.index
            .get_or_try_init(|| async {
                debug!("Loading recipe index from {:?}", self.path);
                let embedder = (self.make_embedder)().context("Failed to initialize the embedding model")?;
                LocalRecipeIndex::load(&self.path, embedder)
            })
            .await
    }
}

#[async_trait]
impl VectorStore for LazyRecipeIndex {
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<ScoredNode>> {
        self.index().await?.query(query, top_k).await
    }
}

fn node_text(fields: &HashMap<String, serde_json::Value>) -> String {
    TEXT_FIELDS
        .iter()
        .find_map(|name| fields.get(*name).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Unit-length copy of `vector`; the zero vector stays zero.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm_sq: f32 = vector.iter().map(|&x| x * x).sum();
    if norm_sq == 0.0 || !norm_sq.is_finite() {
        return vec![0.0; vector.len()];
    }
    let inv_norm = 1.0 / norm_sq.sqrt();
    vector.iter().map(|&x| x * inv_norm).collect()
}
