pub mod embedding_engine;
pub mod vector_store;

pub use embedding_engine::{Embedder, EmbeddingEngine, EMBEDDING_DIMENSION};
pub use vector_store::{IndexEntry, LazyRecipeIndex, LocalRecipeIndex, ScoredNode, VectorStore};
