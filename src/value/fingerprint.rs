//! Stable, process-independent fingerprints.
//!
//! Digests are SHA-256 over a canonical little-endian encoding, so the same
//! value produces the same fingerprint on every platform and in every process.

use sha2::{Digest, Sha256};
use std::fmt;

/// 256-bit stable fingerprint
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Incremental builder for a [`Fingerprint`]
pub struct StableHasher {
    inner: Sha256,
}

impl StableHasher {
    /// Start a digest in the given domain; different domains never collide
    pub fn new(domain: &str) -> Self {
        let mut hasher = StableHasher {
            inner: Sha256::new(),
        };
        hasher.combine_str(domain);
        hasher
    }

    pub fn combine_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        // Length prefix keeps concatenations unambiguous.
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn combine_str(&mut self, s: &str) -> &mut Self {
        self.combine_bytes(s.as_bytes())
    }

    pub fn combine_u8(&mut self, v: u8) -> &mut Self {
        self.inner.update([v]);
        self
    }

    pub fn combine_u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(v.to_le_bytes());
        self
    }

    pub fn combine_fingerprint(&mut self, fp: &Fingerprint) -> &mut Self {
        self.inner.update(fp.0);
        self
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.inner.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_differ() {
        let mut a = StableHasher::new("a");
        a.combine_u64(1);
        let mut b = StableHasher::new("b");
        b.combine_u64(1);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_length_prefix() {
        let mut a = StableHasher::new("d");
        a.combine_str("ab").combine_str("c");
        let mut b = StableHasher::new("d");
        b.combine_str("a").combine_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_hex_display() {
        let fp = StableHasher::new("x").finish();
        assert_eq!(fp.to_string().len(), 64);
    }
}
