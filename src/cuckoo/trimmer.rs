// src/cuckoo/trimmer.rs - Leaf-trimming engine over the live edge set

//! Edge trimming.
//!
//! An edge can only belong to a cycle if both endpoints have degree ≥ 2 in
//! the live subgraph. Each trim pass counts endpoint occurrences on one side
//! (and, when partitioned, one slice of the node space) in the two-bit set,
//! then kills every live edge whose endpoint was seen only once. A handful
//! of rounds shrinks the candidate set by orders of magnitude while only
//! ever holding two bits of node state.
//!
//! Workers walk disjoint 32-nonce blocks so live-set writes never share a
//! word; the barrier between the mark and kill passes publishes the counts.

use super::sets::{ShrinkingSet, TwiceSet};
use super::siphash::SipKeys;
use super::Params;
use std::sync::Barrier;

/// Shared state of one trim phase, borrowed by every worker
pub(crate) struct TrimView<'a> {
    pub params: &'a Params,
    pub keys: &'a SipKeys,
    pub alive: &'a ShrinkingSet,
    pub nthreads: usize,
}

/// Walk thread `tid`'s stride of still-live edge nonces in 32-nonce blocks
pub(crate) fn for_each_live_nonce(
    alive: &ShrinkingSet,
    easiness: u32,
    nthreads: usize,
    tid: usize,
    mut f: impl FnMut(u32),
) {
    let stride = nthreads as u32 * 32;
    let mut block = tid as u32 * 32;
    while block < easiness {
        let end = easiness.min(block + 32);
        for nonce in block..end {
            if alive.test(nonce) {
                f(nonce);
            }
        }
        block += stride;
    }
}

/// Fallible variant of [`for_each_live_nonce`] for the cycle finder
pub(crate) fn try_for_each_live_nonce(
    alive: &ShrinkingSet,
    easiness: u32,
    nthreads: usize,
    tid: usize,
    mut f: impl FnMut(u32) -> Result<(), super::CuckooError>,
) -> Result<(), super::CuckooError> {
    let stride = nthreads as u32 * 32;
    let mut block = tid as u32 * 32;
    while block < easiness {
        let end = easiness.min(block + 32);
        for nonce in block..end {
            if alive.test(nonce) {
                f(nonce)?;
            }
        }
        block += stride;
    }
    Ok(())
}

impl TrimView<'_> {
    /// Count this stride's live endpoints on side `uorv` within partition `part`
    pub(crate) fn mark(&self, nonleaf: &TwiceSet, tid: usize, uorv: u32, part: u32) {
        let node_mask = self.params.node_mask();
        let part_mask = self.params.part_mask();
        let part_bits = self.params.part_bits;
        for_each_live_nonce(self.alive, self.params.easiness, self.nthreads, tid, |nonce| {
            let node = self.keys.sipnode(node_mask, nonce, uorv);
            if node & part_mask == part {
                nonleaf.set(node >> part_bits);
            }
        });
    }

    /// Kill this stride's live edges whose side-`uorv` endpoint is a leaf
    pub(crate) fn kill(&self, nonleaf: &TwiceSet, tid: usize, uorv: u32, part: u32) {
        let node_mask = self.params.node_mask();
        let part_mask = self.params.part_mask();
        let part_bits = self.params.part_bits;
        for_each_live_nonce(self.alive, self.params.easiness, self.nthreads, tid, |nonce| {
            let node = self.keys.sipnode(node_mask, nonce, uorv);
            if node & part_mask == part && !nonleaf.test(node >> part_bits) {
                self.alive.kill(nonce, tid);
            }
        });
    }

    /// One full trim round: every partition of the U side, then of the V side
    pub(crate) fn round(&self, nonleaf: &TwiceSet, barrier: &Barrier, tid: usize) {
        for uorv in 0..2 {
            for part in 0..self.params.parts() {
                if tid == 0 {
                    nonleaf.clear();
                }
                barrier.wait();
                self.mark(nonleaf, tid, uorv, part);
                barrier.wait();
                self.kill(nonleaf, tid, uorv, part);
                barrier.wait();
            }
        }
    }

    /// Live edges as a percentage of cuckoo hash capacity
    pub(crate) fn load_percent(&self) -> u64 {
        100 * self.alive.count() / self.params.cuckoo_slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn single_thread_round(params: &Params, keys: &SipKeys, alive: &ShrinkingSet) {
        let view = TrimView {
            params,
            keys,
            alive,
            nthreads: 1,
        };
        let nonleaf = TwiceSet::new(params.twice_words());
        let barrier = Barrier::new(1);
        view.round(&nonleaf, &barrier, 0);
    }

    #[test]
    fn live_count_never_increases() {
        let params = Params::new(10, 6).unwrap();
        let keys = SipKeys::from_header(&[0u8; 32]);
        let alive = ShrinkingSet::new(params.easiness, 1);

        let mut last = alive.count();
        assert_eq!(last, u64::from(params.easiness));
        for _ in 0..5 {
            single_thread_round(&params, &keys, &alive);
            let now = alive.count();
            assert!(now <= last);
            last = now;
        }
    }

    #[test]
    fn final_side_has_no_leaves() {
        // After a round ends with the V-side pass, every surviving edge's
        // V endpoint must be shared with another survivor.
        let params = Params::new(10, 6).unwrap();
        let keys = SipKeys::from_header_nonce(&[0x5au8; 32], 7);
        let alive = ShrinkingSet::new(params.easiness, 1);
        for _ in 0..params.default_trim_rounds() {
            single_thread_round(&params, &keys, &alive);
        }

        let mut v_degree: HashMap<u32, u32> = HashMap::new();
        for nonce in 0..params.easiness {
            if alive.test(nonce) {
                let v = keys.sipnode(params.node_mask(), nonce, 1);
                *v_degree.entry(v).or_insert(0) += 1;
            }
        }
        for nonce in 0..params.easiness {
            if alive.test(nonce) {
                let v = keys.sipnode(params.node_mask(), nonce, 1);
                assert!(v_degree[&v] >= 2, "leaf V-node {} survived trimming", v);
            }
        }
    }

    #[test]
    fn striding_covers_every_nonce_once() {
        let alive = ShrinkingSet::new(1000, 1);
        let mut seen = vec![0u32; 1000];
        for tid in 0..3 {
            for_each_live_nonce(&alive, 1000, 3, tid, |nonce| {
                seen[nonce as usize] += 1;
            });
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn partitioned_round_matches_unpartitioned() {
        let keys = SipKeys::from_header(&[9u8; 32]);
        let plain = Params::new(10, 6).unwrap();
        let split = Params::new(10, 6).unwrap().with_part_bits(1).unwrap();

        let alive_plain = ShrinkingSet::new(plain.easiness, 1);
        let alive_split = ShrinkingSet::new(split.easiness, 1);
        single_thread_round(&plain, &keys, &alive_plain);
        single_thread_round(&split, &keys, &alive_split);

        // partitioning reorders the work but kills the same leaves in round 1
        for nonce in 0..plain.easiness {
            assert_eq!(alive_plain.test(nonce), alive_split.test(nonce));
        }
    }
}
