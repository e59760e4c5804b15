//! Cuckoo Cycle solver core.
//!
//! The solver searches an implicit bipartite graph for cycles of a fixed
//! length. Edge endpoints are derived with keyed SipHash-2-4, the candidate
//! edge set is reduced by repeated leaf trimming, and the survivors are fed
//! through a union-find style cycle finder built on a sparse cuckoo hash.

pub mod cuckoo_hash;
pub mod finder;
pub mod siphash;
pub mod sets;
pub mod solver;
pub mod trimmer;

pub use cuckoo_hash::{CuckooHash, DirectMap, NodeMap};
pub use siphash::SipKeys;
pub use solver::{solve, CuckooCtx};

use crate::config::Settings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on a single path walk through the cuckoo hash
pub const MAX_PATH_LEN: usize = 8192;
/// Endpoints staged per worker in the direct-map solver
pub const PRESIP: usize = 1024;
/// 2^CLUMP_SHIFT bounds linear-probe drift in the cuckoo hash
pub const CLUMP_SHIFT: u32 = 9;
/// Live-edge percentage of cuckoo capacity above which a solve is abandoned
pub const OVERLOAD_PERCENT: u64 = 90;

/// Errors that can occur during a solve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CuckooError {
    /// Rejected solver parameters
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Too many edges survived trimming for the cuckoo hash to hold
    #[error("overloaded: {live} live edges against {capacity} cuckoo slots")]
    Overloaded {
        /// Live edges remaining after all trim rounds
        live: u64,
        /// Cuckoo hash slot count
        capacity: u64,
    },

    /// A path walk exceeded [`MAX_PATH_LEN`]
    #[error("maximum path length exceeded")]
    PathOverflow,

    /// A pre-existing short cycle was discovered during a path walk
    #[error("illegal {0}-cycle in path graph")]
    IllegalCycle(usize),

    /// A required buffer could not be sized
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// Cuckoo hash probing exceeded its drift bound
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Solver variant, chosen at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverMode {
    /// Edge trimming followed by sparse cuckoo-hash cycle finding
    Trimming,
    /// No trimming; cycle finding over a direct node-indexed array.
    /// Much more memory, viable only for small graphs or one-shot runs.
    Direct,
}

/// A solution: the ascending edge nonces of one proof-length cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Edge nonces forming the cycle, in ascending order
    pub nonces: Vec<u32>,
}

impl Solution {
    /// Create a solution from recovered edge nonces
    pub fn new(nonces: Vec<u32>) -> Self {
        Self { nonces }
    }

    /// Cycle length of this solution
    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    /// True when the solution holds no nonces
    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}

/// Graph geometry and solve parameters.
///
/// `edge_bits` fixes the graph size: `2^edge_bits` nodes per partition side,
/// and by default `easiness = 2^edge_bits` candidate edges (50% of the full
/// node index space). Everything else is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// log2 of nodes per side
    pub edge_bits: u32,
    /// Required cycle length (even)
    pub proof_size: usize,
    /// Trim-pass partitioning bits
    pub part_bits: u32,
    /// Number of candidate edges
    pub easiness: u32,
}

impl Params {
    /// Validate and build parameters with default easiness and no partitioning.
    ///
    /// `edge_bits` is capped at 30 so every node index, including the
    /// `1 + nnodes + v` bias used by the cycle finder, fits in a `u32`.
    pub fn new(edge_bits: u32, proof_size: usize) -> Result<Self, CuckooError> {
        if !(4..=30).contains(&edge_bits) {
            return Err(CuckooError::InvalidParams(format!(
                "edge_bits {} outside supported range 4..=30",
                edge_bits
            )));
        }
        if proof_size < 4 || proof_size % 2 != 0 {
            return Err(CuckooError::InvalidParams(format!(
                "proof_size {} must be even and at least 4",
                proof_size
            )));
        }
        if proof_size >= MAX_PATH_LEN {
            return Err(CuckooError::InvalidParams(format!(
                "proof_size {} exceeds path walk cap {}",
                proof_size, MAX_PATH_LEN
            )));
        }
        Ok(Self {
            edge_bits,
            proof_size,
            part_bits: 0,
            easiness: 1u32 << edge_bits,
        })
    }

    /// Build parameters from solver settings
    pub fn from_settings(settings: &Settings) -> Result<Self, CuckooError> {
        Params::new(settings.edge_bits, settings.proof_size)?
            .with_part_bits(settings.part_bits)
    }

    /// Set trim partitioning bits
    pub fn with_part_bits(mut self, part_bits: u32) -> Result<Self, CuckooError> {
        if part_bits > 6 {
            return Err(CuckooError::InvalidParams(format!(
                "part_bits {} outside supported range 0..=6",
                part_bits
            )));
        }
        self.part_bits = part_bits;
        Ok(self)
    }

    /// Set the candidate edge count
    pub fn with_easiness(mut self, easiness: u32) -> Result<Self, CuckooError> {
        if easiness == 0 || u64::from(easiness) > self.node_count() {
            return Err(CuckooError::InvalidParams(format!(
                "easiness {} outside 1..={}",
                easiness,
                self.node_count()
            )));
        }
        self.easiness = easiness;
        Ok(self)
    }

    /// Nodes per partition side
    pub fn nnodes(&self) -> u32 {
        1u32 << self.edge_bits
    }

    /// Mask reducing a hash to one side's node index space
    pub fn node_mask(&self) -> u32 {
        self.nnodes() - 1
    }

    /// Full node index space across both sides
    pub fn node_count(&self) -> u64 {
        2 * u64::from(self.nnodes())
    }

    /// Number of trim partitions
    pub fn parts(&self) -> u32 {
        1u32 << self.part_bits
    }

    /// Partition selector mask
    pub fn part_mask(&self) -> u32 {
        self.parts() - 1
    }

    /// Directory shift of the cuckoo hash
    pub fn idx_shift(&self) -> u32 {
        self.part_bits + 6
    }

    /// Bit position of the packed value in a cuckoo slot
    pub fn key_shift(&self) -> u32 {
        self.idx_shift() + CLUMP_SHIFT
    }

    /// Mask of the packed key in a cuckoo slot
    pub fn key_mask(&self) -> u64 {
        (1u64 << self.key_shift()) - 1
    }

    /// Cuckoo hash slot count
    pub fn cuckoo_slots(&self) -> u64 {
        let dir = 1u64 << self.idx_shift();
        (1 + self.node_count() + dir - 1) >> self.idx_shift()
    }

    /// Two-bit counters tracked per trim partition
    pub fn once_bits(&self) -> u64 {
        (u64::from(self.nnodes()) + u64::from(self.part_mask())) >> self.part_bits
    }

    /// 32-bit words backing the two-bit node set
    pub fn twice_words(&self) -> u64 {
        (2 * self.once_bits() + 31) / 32
    }

    /// Default trim rounds for this partitioning
    pub fn default_trim_rounds(&self) -> u32 {
        1 + (self.part_bits + 3) * (self.part_bits + 4) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_geometry() {
        let p = Params::new(11, 42).unwrap();
        assert_eq!(p.nnodes(), 2048);
        assert_eq!(p.node_mask(), 2047);
        assert_eq!(p.node_count(), 4096);
        assert_eq!(p.easiness, 2048);
        assert_eq!(p.parts(), 1);
        assert_eq!(p.idx_shift(), 6);
        assert_eq!(p.key_shift(), 15);
        assert_eq!(p.key_mask(), (1 << 15) - 1);
        // ceil((1 + 4096) / 64)
        assert_eq!(p.cuckoo_slots(), 65);
        // 2 * 2048 counters bits / 32
        assert_eq!(p.twice_words(), 128);
        assert_eq!(p.default_trim_rounds(), 7);
    }

    #[test]
    fn params_partitioned_geometry() {
        let p = Params::new(12, 42).unwrap().with_part_bits(1).unwrap();
        assert_eq!(p.parts(), 2);
        assert_eq!(p.idx_shift(), 7);
        assert_eq!(p.once_bits(), 2048);
        assert_eq!(p.default_trim_rounds(), 11);
    }

    #[test]
    fn params_rejects_bad_values() {
        assert!(Params::new(3, 42).is_err());
        assert!(Params::new(31, 42).is_err());
        assert!(Params::new(11, 7).is_err());
        assert!(Params::new(11, 0).is_err());
        assert!(Params::new(11, 42).unwrap().with_easiness(0).is_err());
        assert!(Params::new(11, 42).unwrap().with_easiness(4097).is_err());
        assert!(Params::new(11, 42).unwrap().with_part_bits(7).is_err());
    }

    #[test]
    fn solution_basics() {
        let sol = Solution::new(vec![1, 5, 9]);
        assert_eq!(sol.len(), 3);
        assert!(!sol.is_empty());
    }
}
