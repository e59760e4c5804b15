// src/cuckoo/cuckoo_hash.rs - Sparse node→node map for the cycle finder

//! The path graph built by the cycle finder is a `node → node` mapping.
//! [`CuckooHash`] stores it sparsely: each 64-bit slot packs a value node
//! above [`CLUMP_SHIFT`](crate::cuckoo::CLUMP_SHIFT)-bounded key bits, and
//! lookups linear-probe from the key's directory slot. [`DirectMap`] is the
//! dense alternative used by the no-trimming solver variant: one atomic
//! slot per node index.
//!
//! Both are written concurrently with relaxed compare-and-set. The finder
//! tolerates stale reads: a torn view of the evolving forest only causes
//! redundant exploration, never a bad solution, because every candidate
//! cycle is re-validated edge by edge during recovery.

use super::{CuckooError, Params, CLUMP_SHIFT};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// The node→node mapping seam shared by the solver variants
pub trait NodeMap: Sync {
    /// Follow the stored edge from `u`; 0 means no successor
    fn get(&self, u: u32) -> u32;

    /// Store the directed mapping `u → v`
    fn set(&self, u: u32, v: u32) -> Result<(), CuckooError>;
}

/// Sparse cuckoo hash with key-packed 64-bit slots
pub struct CuckooHash {
    slots: Box<[AtomicU64]>,
    idx_shift: u32,
    key_shift: u32,
    key_mask: u64,
}

impl CuckooHash {
    /// Empty table sized for the given graph geometry
    pub fn new(params: &Params) -> Self {
        Self::with_slots(
            params.cuckoo_slots() as usize,
            params.idx_shift(),
            params.key_shift(),
            params.key_mask(),
        )
    }

    pub(crate) fn with_slots(nslots: usize, idx_shift: u32, key_shift: u32, key_mask: u64) -> Self {
        let slots = (0..nslots).map(|_| AtomicU64::new(0)).collect();
        Self {
            slots,
            idx_shift,
            key_shift,
            key_mask,
        }
    }

    fn home(&self, u: u32) -> usize {
        (u >> self.idx_shift) as usize % self.slots.len()
    }
}

impl NodeMap for CuckooHash {
    fn get(&self, u: u32) -> u32 {
        let mut ui = self.home(u);
        for _ in 0..self.slots.len() {
            let slot = self.slots[ui].load(Ordering::Relaxed);
            if slot == 0 {
                return 0;
            }
            if (u64::from(u) ^ slot) & self.key_mask == 0 {
                return (slot >> self.key_shift) as u32;
            }
            ui = (ui + 1) % self.slots.len();
        }
        0
    }

    fn set(&self, u: u32, v: u32) -> Result<(), CuckooError> {
        let mut ui = self.home(u);
        let packed = (u64::from(v) << self.key_shift) | (u64::from(u) & self.key_mask);
        let mut drift = 0u32;
        loop {
            match self.slots[ui].compare_exchange(0, packed, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Ok(()),
                Err(old) => {
                    if (u64::from(u) ^ old) & self.key_mask == 0 {
                        // same key: last writer wins
                        self.slots[ui].store(packed, Ordering::Relaxed);
                        return Ok(());
                    }
                }
            }
            ui = (ui + 1) % self.slots.len();
            drift += 1;
            if drift > 1 << CLUMP_SHIFT {
                return Err(CuckooError::InvariantViolation(format!(
                    "cuckoo probe drifted past {} slots inserting node {}",
                    1u32 << CLUMP_SHIFT,
                    u
                )));
            }
        }
    }
}

/// Dense node-indexed map for the direct solver variant
pub struct DirectMap {
    nodes: Box<[AtomicU32]>,
}

impl DirectMap {
    /// Zeroed map over the full node index space (plus the 0 sentinel)
    pub fn new(params: &Params) -> Self {
        let len = (params.node_count() + 1) as usize;
        let nodes = (0..len).map(|_| AtomicU32::new(0)).collect();
        Self { nodes }
    }
}

impl NodeMap for DirectMap {
    fn get(&self, u: u32) -> u32 {
        self.nodes[u as usize].load(Ordering::Relaxed)
    }

    fn set(&self, u: u32, v: u32) -> Result<(), CuckooError> {
        self.nodes[u as usize].store(v, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuckoo::Params;

    fn small_params() -> Params {
        Params::new(11, 42).unwrap()
    }

    #[test]
    fn set_then_get_roundtrips() {
        let map = CuckooHash::new(&small_params());
        map.set(100, 2048).unwrap();
        map.set(37, 9).unwrap();
        assert_eq!(map.get(100), 2048);
        assert_eq!(map.get(37), 9);
    }

    #[test]
    fn missing_key_returns_zero() {
        let map = CuckooHash::new(&small_params());
        assert_eq!(map.get(123), 0);
        map.set(123, 45).unwrap();
        assert_eq!(map.get(124), 0);
    }

    #[test]
    fn same_key_overwrites() {
        let map = CuckooHash::new(&small_params());
        map.set(77, 100).unwrap();
        map.set(77, 200).unwrap();
        assert_eq!(map.get(77), 200);
    }

    #[test]
    fn colliding_directory_entries_probe_forward() {
        let p = small_params();
        let map = CuckooHash::new(&p);
        // same directory slot (u >> 6), different keys
        for u in 0..10u32 {
            map.set(u, 1000 + u).unwrap();
        }
        for u in 0..10u32 {
            assert_eq!(map.get(u), 1000 + u);
        }
    }

    #[test]
    fn probe_drift_past_clump_is_fatal() {
        // a deliberately tiny table fills up and the probe bound trips
        let map = CuckooHash::with_slots(8, 6, 15, (1 << 15) - 1);
        let mut err = None;
        for u in 0..16u32 {
            // distinct keys all landing in a full 8-slot table
            if let Err(e) = map.set(u, u + 1) {
                err = Some(e);
                break;
            }
        }
        assert!(matches!(err, Some(CuckooError::InvariantViolation(_))));
    }

    #[test]
    fn direct_map_roundtrips() {
        let map = DirectMap::new(&small_params());
        assert_eq!(map.get(4096), 0);
        map.set(4096, 17).unwrap();
        assert_eq!(map.get(4096), 17);
        map.set(4096, 0).unwrap();
        assert_eq!(map.get(4096), 0);
    }
}
