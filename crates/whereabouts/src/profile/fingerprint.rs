//! Fingerprint digests.
//!
//! A rendering artifact on its own is large and noisy; what identifies a
//! device is that the same fixed drawing produces the same bytes every time
//! on that device and different bytes elsewhere. Hashing the artifact keeps
//! exactly that property in a short string.

/// Length of the hex digests shown in a profile.
pub const DIGEST_LEN: usize = 16;

/// Digest of raw canvas pixels.
#[must_use]
pub fn canvas_digest(pixels: &[u8]) -> String {
    short_hex(blake3::hash(pixels))
}

/// Digest of rendered audio samples.
///
/// Samples are hashed by their exact bit patterns, so `-0.0` and `0.0`
/// differ, as they would in a rendering comparison.
#[must_use]
pub fn audio_digest(samples: &[f32]) -> String {
    let mut hasher = blake3::Hasher::new();
    for sample in samples {
        hasher.update(&sample.to_le_bytes());
    }
    short_hex(hasher.finalize())
}

/// Digest of an arbitrary serialized value.
#[must_use]
pub fn value_digest(value: &serde_json::Value) -> String {
    short_hex(blake3::hash(value.to_string().as_bytes()))
}

fn short_hex(hash: blake3::Hash) -> String {
    let mut hex = hash.to_hex().to_string();
    hex.truncate(DIGEST_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_digest_is_stable() {
        let pixels = vec![0u8, 128, 255, 17, 42];
        assert_eq!(canvas_digest(&pixels), canvas_digest(&pixels));
        assert_eq!(canvas_digest(&pixels).len(), DIGEST_LEN);
    }

    #[test]
    fn test_canvas_digest_distinguishes_renderings() {
        assert_ne!(canvas_digest(&[1, 2, 3]), canvas_digest(&[1, 2, 4]));
    }

    #[test]
    fn test_audio_digest_uses_bit_patterns() {
        assert_ne!(audio_digest(&[0.0]), audio_digest(&[-0.0]));
        assert_eq!(audio_digest(&[0.25, 0.5]), audio_digest(&[0.25, 0.5]));
    }

    #[test]
    fn test_value_digest() {
        let a = serde_json::json!({"platform": "Linux"});
        let b = serde_json::json!({"platform": "macOS"});
        assert_ne!(value_digest(&a), value_digest(&b));
        assert!(value_digest(&a).chars().all(|c| c.is_ascii_hexdigit()));
    }
}
