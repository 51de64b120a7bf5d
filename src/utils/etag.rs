//! Weak entity tags computed from response bytes.

use sha2::{Digest, Sha256};

/// Returns `W/"<sha256 hex>"` for `body`.
///
/// The tag depends only on the bytes: equal bodies always share a tag and any
/// change to the bytes yields a different one.
pub fn weak_etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("W/\"{}\"", hex::encode(digest))
}
