//! Deterministic in-process embedder.
//!
//! Hashes lower-cased word tokens into `dim` signed buckets with blake3 and
//! L2-normalizes the result. Texts sharing words land close together, which
//! is enough for offline demos and tests.

use std::{future::Future, pin::Pin};

use crate::{embed::EmbeddingsProvider, errors::ProviderError};

/// Default dimensionality of stub vectors.
pub const DEFAULT_STUB_DIM: usize = 64;

pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Synchronous embedding, shared by the async trait impl and ingestion.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let h = blake3::hash(token.as_bytes());
            let bytes = h.as_bytes();
            let bucket = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as usize
                % self.dim;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_DIM)
    }
}

impl EmbeddingsProvider for StubEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ProviderError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.embed_sync(text)) })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::DistanceMetric;

    #[test]
    fn deterministic_normalized_and_sized() {
        let e = StubEmbedder::new(32);
        let a = e.embed_sync("Cichy balkon, Gdańsk");
        assert_eq!(a.len(), 32);
        assert_eq!(a, e.embed_sync("cichy BALKON gdańsk"));
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(e.embed_sync("").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_words_are_closer() {
        let e = StubEmbedder::default();
        let q = e.embed_sync("balkon ogród cisza");
        let near = e.embed_sync("mieszkanie z balkon i ogród");
        let far = e.embed_sync("garaż podziemny centrum biurowiec");
        let m = DistanceMetric::Cosine;
        assert!(m.distance(&q, &near) < m.distance(&q, &far));
    }
}
