// src/cuckoo/sets.rs - Shrinking live-edge set and two-bit node degree set

//! The two bitsets driving edge trimming.
//!
//! [`ShrinkingSet`] tracks which candidate edges are still live, one bit per
//! nonce, shrinking monotonically across trim rounds. [`TwiceSet`] holds a
//! saturating two-bit counter per node so a trim pass can tell degree-1
//! nodes (leaves) from nodes seen at least twice.
//!
//! All words are relaxed atomics. Workers operate on disjoint 32-nonce
//! blocks, so live-set words never contend; the barriers between trim
//! phases publish every write before it is read.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Live-edge set: starts all-live, bits flip to dead exactly once
pub struct ShrinkingSet {
    bits: Box<[AtomicU32]>,
    cnt: Box<[AtomicU64]>,
}

impl ShrinkingSet {
    /// All-live set over `size` edge nonces, with per-thread kill counters
    pub fn new(size: u32, nthreads: usize) -> Self {
        let words = (size as usize + 31) / 32;
        let bits = (0..words).map(|_| AtomicU32::new(0)).collect();
        let cnt: Box<[AtomicU64]> = (0..nthreads).map(|_| AtomicU64::new(0)).collect();
        cnt[0].store(u64::from(size), Ordering::Relaxed);
        Self { bits, cnt }
    }

    /// True iff edge `n` is still live
    pub fn test(&self, n: u32) -> bool {
        let word = self.bits[(n / 32) as usize].load(Ordering::Relaxed);
        (word >> (n % 32)) & 1 == 0
    }

    /// Kill edge `n`, charging the kill to `thread`. The caller must have
    /// seen `test(n)` true in the current phase.
    pub fn kill(&self, n: u32, thread: usize) {
        self.bits[(n / 32) as usize].fetch_or(1 << (n % 32), Ordering::Relaxed);
        self.cnt[thread].fetch_sub(1, Ordering::Relaxed);
    }

    /// Live edges remaining. Only meaningful between phases, when no kills
    /// are in flight.
    pub fn count(&self) -> u64 {
        self.cnt
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .fold(0u64, u64::wrapping_add)
    }
}

/// Per-node saturating counter set: 00 unseen, 01 seen once, 1x seen twice
pub struct TwiceSet {
    bits: Box<[AtomicU32]>,
}

impl TwiceSet {
    /// Zeroed set backed by `words` 32-bit words (16 counters per word)
    pub fn new(words: u64) -> Self {
        let bits = (0..words).map(|_| AtomicU32::new(0)).collect();
        Self { bits }
    }

    /// Zero every counter (worker 0, between barriers)
    pub fn clear(&self) {
        for word in self.bits.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Bump node `u`'s counter, saturating at two
    pub fn set(&self, u: u32) {
        let idx = (u / 16) as usize;
        let bit = 1u32 << (2 * (u % 16));
        let old = self.bits[idx].fetch_or(bit, Ordering::Relaxed);
        if old & bit != 0 {
            self.bits[idx].fetch_or(bit << 1, Ordering::Relaxed);
        }
    }

    /// True iff node `u` was seen at least twice since the last clear
    pub fn test(&self, u: u32) -> bool {
        let word = self.bits[(u / 16) as usize].load(Ordering::Relaxed);
        (word >> (2 * (u % 16))) & 2 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinking_set_starts_all_live() {
        let set = ShrinkingSet::new(100, 2);
        assert_eq!(set.count(), 100);
        for n in 0..100 {
            assert!(set.test(n));
        }
    }

    #[test]
    fn kill_flips_bit_and_decrements() {
        let set = ShrinkingSet::new(64, 2);
        set.kill(0, 0);
        set.kill(63, 1);
        assert!(!set.test(0));
        assert!(!set.test(63));
        assert!(set.test(1));
        assert_eq!(set.count(), 62);
    }

    #[test]
    fn twice_set_counts_to_two() {
        let set = TwiceSet::new(4);
        assert!(!set.test(5));
        set.set(5);
        assert!(!set.test(5)); // seen once: still a leaf
        set.set(5);
        assert!(set.test(5));
        set.set(5); // saturates
        assert!(set.test(5));
        // neighbours in the same word are untouched
        assert!(!set.test(4));
        assert!(!set.test(6));
    }

    #[test]
    fn twice_set_clear_resets() {
        let set = TwiceSet::new(4);
        set.set(10);
        set.set(10);
        assert!(set.test(10));
        set.clear();
        assert!(!set.test(10));
    }
}
