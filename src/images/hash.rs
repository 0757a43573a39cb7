// 画像の内容ハッシュ（SHA-256）と知覚ハッシュ（勾配ハッシュ）
//
// 内容ハッシュはバイト列そのものの同一性判定に、知覚ハッシュは再エンコード等で
// バイト列が異なる近似重複の判定に使う。

use image_hasher::{HashAlg, HasherConfig, ImageHash};
use sha2::{Digest, Sha256};

/// 知覚ハッシュの一辺（8x8 = 64bit）
const HASH_SIZE: u32 = 8;

pub type PerceptualHash = ImageHash;

/// 画像バイト列のSHA-256ハッシュを小文字16進文字列で返す。
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 横方向の輝度勾配から64bitの知覚ハッシュを計算する。
///
/// デコードできないバイト列の場合はNone。
pub fn perceptual_hash(data: &[u8]) -> Option<PerceptualHash> {
    let img = image::load_from_memory(data).ok()?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Gradient)
        .hash_size(HASH_SIZE, HASH_SIZE)
        .to_hasher();
    Some(hasher.hash_image(&img))
}

/// 2つの知覚ハッシュの類似度（1.0で完全一致）。ビット長が異なれば0。
pub fn similarity(a: &PerceptualHash, b: &PerceptualHash) -> f64 {
    let bits = a.as_bytes().len() * 8;
    if bits == 0 || a.as_bytes().len() != b.as_bytes().len() {
        return 0.0;
    }
    1.0 - f64::from(a.dist(b)) / bits as f64
}
