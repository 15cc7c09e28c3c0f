use anyhow::Result;
use model2vec_rs::model::StaticModel;

const EMBEDDING_MODEL_ID: &str = "minishlab/potion-base-32M";

pub const EMBEDDING_DIMENSION: usize = 512;

/// Turns query text into a vector comparable with the stored recipe vectors.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct EmbeddingEngine {
    model: StaticModel,
}

impl EmbeddingEngine {
    pub fn new() -> Result<Self> {
        let model = StaticModel::from_pretrained(EMBEDDING_MODEL_ID, None, None, None)?;
        Ok(Self { model })
    }
}

impl Embedder for EmbeddingEngine {
    fn dimension(&self) -> usize {
        // model2vec does not expose the width of a loaded model.
        EMBEDDING_DIMENSION
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.model.encode(&[text.to_string()]);
        embeddings.into_iter().next().ok_or_else(|| {
            anyhow::anyhow!("Failed to generate embedding for query: {}", text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Downloads the model from the hub.
    fn test_embedding_engine_embeds_query() -> Result<()> {
        let engine = EmbeddingEngine::new()?;
        let vector = engine.embed_one("high protein vegan dinner")?;
        assert_eq!(vector.len(), engine.dimension());
        Ok(())
    }
}
