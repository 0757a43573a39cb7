use tracing::warn;

use crate::config::settings::{MissingBboxPolicy, Settings};
use crate::error::FigureError;
use crate::images::hash::{content_hash, perceptual_hash};
use crate::model::{BBox, EmbeddedImage, ImageId, ImageRecord, RawImage, RejectionReason};

/// Normalizes the parser's embedded images into uniform records.
pub struct ImageCollector<'a> {
    settings: &'a Settings,
}

impl<'a> ImageCollector<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Collect every image of one page, in parser order.
    ///
    /// An image that cannot be normalized becomes a rejected record tagged
    /// with its error kind; the other images are unaffected.
    pub fn collect_page(&self, page: u32, images: Vec<EmbeddedImage>) -> Vec<ImageRecord> {
        images
            .into_iter()
            .enumerate()
            .map(|(seq, image)| {
                let id = ImageId {
                    page,
                    sequence: seq as u32,
                };
                let bbox = image.bbox;
                match self.normalize(id, image) {
                    Ok(raw) => ImageRecord::collected(raw),
                    Err(e) => {
                        warn!(page, sequence = id.sequence, error = %e, "image extraction failed");
                        ImageRecord::failed(id, bbox, RejectionReason::failed(&e))
                    }
                }
            })
            .collect()
    }

    /// Turn one embedded image into a [`RawImage`].
    pub fn normalize(&self, id: ImageId, image: EmbeddedImage) -> crate::error::Result<RawImage> {
        if let Some(reason) = image.read_error {
            return Err(FigureError::image_extraction(reason));
        }
        if image.data.is_empty() {
            return Err(FigureError::image_extraction("empty image byte stream"));
        }

        let bbox = match (image.bbox, self.settings.missing_bbox) {
            (Some(bbox), _) => bbox,
            (None, MissingBboxPolicy::Synthesize) => synthetic_bbox(id.sequence),
            (None, MissingBboxPolicy::Reject) => {
                return Err(FigureError::image_extraction("bounding box absent"));
            }
        };

        let format = normalize_format(image.format_hint.as_deref(), &image.data);
        let content_hash = content_hash(&image.data);
        let perceptual_hash = if self.settings.similarity_threshold < 1.0 {
            perceptual_hash(&image.data)
        } else {
            None
        };

        Ok(RawImage {
            id,
            bbox,
            data: image.data,
            format,
            content_hash,
            perceptual_hash,
        })
    }
}

/// Placeholder rectangle stacked by sequence number, used only under
/// [`MissingBboxPolicy::Synthesize`].
pub fn synthetic_bbox(sequence: u32) -> BBox {
    let top = 100.0 + f64::from(sequence) * 50.0;
    BBox::new(0.0, top, 100.0, top + 50.0)
}

/// Lower-cased extension from the format hint, falling back to sniffing the bytes.
pub fn normalize_format(hint: Option<&str>, data: &[u8]) -> String {
    if let Some(hint) = hint {
        let hint = hint.trim().trim_start_matches('.').to_ascii_lowercase();
        if !hint.is_empty() {
            return hint;
        }
    }

    image::guess_format(data)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("bin")
        .to_string()
}
