use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use crate::search::{ScoredNode, VectorStore};

use super::title::extract_title;
use super::types::{CandidateRecipe, RecipeSource};

/// Top-K nearest nodes for the optimized query, unranked beyond the store's
/// own ordering.
pub async fn retrieve_nodes(store: &dyn VectorStore, optimized_query: &str, top_k: usize) -> Result<Vec<ScoredNode>> {
    let nodes = store.query(optimized_query, top_k).await?;
    debug!("Retrieved {} nodes from the vector store.", nodes.len());
    Ok(nodes)
}

/// One candidate per derived title; the first node with a title wins and
/// blank nodes are skipped.
pub fn dedup_candidates(nodes: &[ScoredNode]) -> Vec<CandidateRecipe> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|node| !node.text.trim().is_empty())
        .filter_map(|node| {
            let title = extract_title(&node.text);
            seen.insert(title.clone())
                .then(|| CandidateRecipe::new(title, node.text.clone(), RecipeSource::Corpus))
        })
        .collect()
}
