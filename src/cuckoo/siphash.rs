//! SipHash-2-4 edge oracle.
//!
//! Every candidate edge is named by its nonce; the two endpoints are
//! `siphash24(2*nonce)` and `siphash24(2*nonce + 1)` reduced to one side's
//! node index space. The keys come from SHA-256 over the block header, so a
//! verifier with the same header reproduces the exact same graph.

use sha2::{Digest, Sha256};

/// SipHash key pair for edge generation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SipKeys {
    /// First 64-bit key
    pub k0: u64,
    /// Second 64-bit key
    pub k1: u64,
}

impl SipKeys {
    /// Derive keys from a 32-byte header and a solve nonce.
    ///
    /// Hashes `header ‖ little-endian(nonce)` with SHA-256 and takes the
    /// first 16 digest bytes as `(k0, k1)` in little-endian.
    pub fn from_header_nonce(header: &[u8; 32], nonce: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(header);
        hasher.update(nonce.to_le_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Derive keys from raw header bytes alone (the grin variant, used when
    /// the caller has already folded its nonce into the header).
    pub fn from_header(header: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(header);
        Self::from_digest(&hasher.finalize())
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut k0 = [0u8; 8];
        let mut k1 = [0u8; 8];
        k0.copy_from_slice(&digest[0..8]);
        k1.copy_from_slice(&digest[8..16]);
        Self {
            k0: u64::from_le_bytes(k0),
            k1: u64::from_le_bytes(k1),
        }
    }

    /// SipHash-2-4 over a single 64-bit block, as used by Cuckoo Cycle
    pub fn siphash24(&self, input: u64) -> u64 {
        let mut v0 = 0x736f6d6570736575u64 ^ self.k0;
        let mut v1 = 0x646f72616e646f6du64 ^ self.k1;
        let mut v2 = 0x6c7967656e657261u64 ^ self.k0;
        let mut v3 = 0x7465646279746573u64 ^ self.k1;

        v3 ^= input;
        for _ in 0..2 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }
        v0 ^= input;
        v2 ^= 0xff;
        for _ in 0..4 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }

        v0 ^ v1 ^ v2 ^ v3
    }

    /// Endpoint of edge `nonce` on side `uorv` (0 = U, 1 = V)
    pub fn sipnode(&self, node_mask: u32, nonce: u32, uorv: u32) -> u32 {
        (self.siphash24(2 * u64::from(nonce) + u64::from(uorv)) as u32) & node_mask
    }

    /// Both endpoints of edge `nonce`
    pub fn sipedge(&self, node_mask: u32, nonce: u32) -> (u32, u32) {
        (
            self.sipnode(node_mask, nonce, 0),
            self.sipnode(node_mask, nonce, 1),
        )
    }
}

/// Single round of SipHash
#[inline]
fn sipround(v0: &mut u64, v1: &mut u64, v2: &mut u64, v3: &mut u64) {
    *v0 = v0.wrapping_add(*v1);
    *v1 = v1.rotate_left(13);
    *v1 ^= *v0;
    *v0 = v0.rotate_left(32);

    *v2 = v2.wrapping_add(*v3);
    *v3 = v3.rotate_left(16);
    *v3 ^= *v2;

    *v0 = v0.wrapping_add(*v3);
    *v3 = v3.rotate_left(21);
    *v3 ^= *v0;

    *v2 = v2.wrapping_add(*v1);
    *v1 = v1.rotate_left(17);
    *v1 ^= *v2;
    *v2 = v2.rotate_left(32);
}
