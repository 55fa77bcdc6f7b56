//! Kodo content hash ("etag")
//!
//! Data is split into 4 MiB blocks and each block is SHA-1 hashed. A single
//! block yields `0x16 || sha1(block)`; several blocks yield
//! `0x96 || sha1(sha1(b0) || sha1(b1) || ...)`. The 21 bytes are URL-safe
//! base64 encoded.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use sha1::{Digest, Sha1};

/// Block size used by the hash
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

const SINGLE_BLOCK_PREFIX: u8 = 0x16;
const MULTI_BLOCK_PREFIX: u8 = 0x96;

/// Compute the etag of `data`
pub fn compute(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(21);

    if data.len() <= BLOCK_SIZE {
        out.push(SINGLE_BLOCK_PREFIX);
        out.extend_from_slice(&Sha1::digest(data));
    } else {
        let mut outer = Sha1::new();
        for block in data.chunks(BLOCK_SIZE) {
            outer.update(Sha1::digest(block));
        }
        out.push(MULTI_BLOCK_PREFIX);
        out.extend_from_slice(&outer.finalize());
    }

    URL_SAFE.encode(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        // well-known etag of an empty object
        assert_eq!(compute(b""), "Fto5o-5ea0sNMlW_75VgGJCv2AcJ");
    }

    #[test]
    fn test_single_and_multi_block_prefix() {
        let small = compute(b"hello");
        assert_eq!(URL_SAFE.decode(&small).unwrap()[0], SINGLE_BLOCK_PREFIX);

        let large = vec![7u8; BLOCK_SIZE + 1];
        let raw = URL_SAFE.decode(compute(&large)).unwrap();
        assert_eq!(raw.len(), 21);
        assert_eq!(raw[0], MULTI_BLOCK_PREFIX);
    }

    #[test]
    fn test_exact_block_is_single() {
        let data = vec![1u8; BLOCK_SIZE];
        assert_eq!(URL_SAFE.decode(compute(&data)).unwrap()[0], SINGLE_BLOCK_PREFIX);
    }
}
