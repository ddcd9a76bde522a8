//! Request key hashing.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request.
///
/// Only method and URL take part; request headers never do.
pub fn compute_key_hash(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
