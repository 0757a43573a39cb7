use std::collections::HashMap;

use crate::images::hash::{PerceptualHash, similarity};
use crate::model::{ImageId, RawImage};

/// Hashes of the images accepted so far in a document pass.
///
/// Owned by the single sequential validation pass; it is the only shared
/// mutable state of the pipeline and is never touched from the per-page
/// parallel phase.
#[derive(Debug, Default)]
pub struct HashRegistry {
    exact: HashMap<String, ImageId>,
    perceptual: Vec<(PerceptualHash, ImageId)>,
}

impl HashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image already accepted with exactly this content hash.
    pub fn find_exact(&self, content_hash: &str) -> Option<ImageId> {
        self.exact.get(content_hash).copied()
    }

    /// First accepted image whose perceptual hash is at least `threshold` similar.
    pub fn find_similar(&self, hash: &PerceptualHash, threshold: f64) -> Option<(ImageId, f64)> {
        self.perceptual.iter().find_map(|(other, id)| {
            let s = similarity(hash, other);
            (s >= threshold).then_some((*id, s))
        })
    }

    pub fn register(&mut self, image: &RawImage) {
        self.exact.entry(image.content_hash.clone()).or_insert(image.id);
        if let Some(hash) = &image.perceptual_hash {
            self.perceptual.push((hash.clone(), image.id));
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
