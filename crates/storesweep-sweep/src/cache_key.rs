//! Stable identifiers for trained-policy artifacts.
//!
//! A key encodes the algorithm, a schema version and the raw weights:
//!
//! - `<algorithm>_v1_<r1>_<r2>_<r3>` when every raw weight is a non-negative
//!   integer (the common case for step grids such as `{1, 10, 100}`)
//! - `<algorithm>_v1_h<16 hex digits>` otherwise, hashing the exact bit
//!   patterns of the weights so that nearby triples never collide
//!
//! Keys contain only ASCII letters, digits and `_`, so they are safe as file
//! names on every platform.

use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};
use storesweep_env::REWARD_DIM;
use storesweep_training::algorithm::Algorithm;

/// Bumped whenever the key layout or the artifact semantics change.
pub const CACHE_KEY_SCHEMA_VERSION: u32 = 1;

/// Raw weights at or above this value are hashed instead of printed.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0; // 2^53

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn derive(algorithm: Algorithm, raw: [f64; REWARD_DIM]) -> Self {
        let prefix = format!("{}_v{CACHE_KEY_SCHEMA_VERSION}", algorithm.name());
        let key = match integral_components(raw) {
            Some([a, b, c]) => format!("{prefix}_{a}_{b}_{c}"),
            None => format!("{prefix}_h{}", weights_digest(raw)),
        };
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of the artifact for this key: `<cache_dir>/<key>.json`.
    #[must_use]
    pub fn artifact_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}.json", self.0))
    }

    /// Per-key training seed, so that points are independent of sweep order.
    #[must_use]
    pub fn training_seed(&self, base_seed: u64) -> u64 {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut bytes = [0; 8];
        bytes.copy_from_slice(&digest[..8]);
        base_seed ^ u64::from_le_bytes(bytes)
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral_components(raw: [f64; REWARD_DIM]) -> Option<[u64; REWARD_DIM]> {
    raw.iter()
        .all(|w| w.is_finite() && *w >= 0.0 && w.fract() == 0.0 && *w < MAX_EXACT_INTEGER)
        .then(|| raw.map(|w| w as u64))
}

fn weights_digest(raw: [f64; REWARD_DIM]) -> String {
    let mut hasher = Sha256::new();
    for w in raw {
        hasher.update(w.to_bits().to_le_bytes());
    }
    hasher.finalize()[..8]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
