/// Local semantic index built on hashed bag-of-words embeddings

use super::SemanticIndex;
use crate::error::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Feature-hashing embedder. Each token longer than two characters lands in
/// one of `embedding_dim` buckets with a hash-derived sign, and the vector is
/// normalized to unit length.
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator {
    embedding_dim: usize,
}

impl EmbeddingGenerator {
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim: embedding_dim.max(1),
        }
    }

    pub fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.embedding_dim];

        for token in tokenize(text) {
            let hash = simple_hash(&token);
            let bucket = (hash % self.embedding_dim as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for e in &mut embedding {
                *e /= norm;
            }
        }

        embedding
    }
}

impl Default for EmbeddingGenerator {
    fn default() -> Self {
        Self::new(384)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_lowercase())
}

fn simple_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot_product / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// In-process index. Contents live only as long as the process; the store
/// re-adds its conversations when the index is attached.
#[derive(Debug, Clone)]
pub struct HashedEmbeddingIndex {
    generator: EmbeddingGenerator,
    min_similarity: f32,
    entries: Vec<(String, Vec<f32>)>,
}

impl HashedEmbeddingIndex {
    pub fn new(min_similarity: f32) -> Self {
        Self {
            generator: EmbeddingGenerator::default(),
            min_similarity,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SemanticIndex for HashedEmbeddingIndex {
    fn add(&mut self, id: &str, text: &str) -> Result<()> {
        let embedding = self.generator.generate(text);
        match self.entries.iter_mut().find(|(existing, _)| existing == id) {
            Some(entry) => entry.1 = embedding,
            None => self.entries.push((id.to_string(), embedding)),
        }
        Ok(())
    }

    fn query(&self, text: &str, top_k: usize) -> Result<Vec<String>> {
        let query_embedding = self.generator.generate(text);

        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .map(|(id, embedding)| (cosine_similarity(&query_embedding, embedding), id.as_str()))
            .filter(|(score, _)| *score >= self.min_similarity && *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored.into_iter().map(|(_, id)| id.to_string()).collect())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        self.entries.retain(|(existing, _)| existing != id);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
