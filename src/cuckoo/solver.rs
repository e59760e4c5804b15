// src/cuckoo/solver.rs - Solver context, worker pool and solve entry point

//! One [`CuckooCtx`] runs one solve: a fixed worker pool moves in lockstep
//! through the trim rounds, worker 0 swaps the node-degree memory for the
//! cuckoo hash, and all workers then hunt cycles over the survivors.
//!
//! The context is built fresh per (keys, parameters) pair; nothing is
//! reused across solves, so a long-running host never sees stale trim or
//! forest state.

use super::cuckoo_hash::{CuckooHash, DirectMap};
use super::finder::FinderView;
use super::sets::{ShrinkingSet, TwiceSet};
use super::siphash::SipKeys;
use super::trimmer::TrimView;
use super::{CuckooError, Params, Solution, SolverMode, OVERLOAD_PERCENT};
use crate::config::Settings;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, OnceLock};
use std::thread;

/// Per-variant shared structures, fixed at construction
enum SolverState {
    /// Trim first, then find cycles through the sparse cuckoo hash
    Trimming {
        alive: ShrinkingSet,
        nonleaf: RwLock<Option<TwiceSet>>,
        cuckoo: OnceLock<CuckooHash>,
        overloaded: AtomicBool,
    },
    /// Skip trimming and drive a dense node-indexed map
    Direct { map: DirectMap },
}

/// Context for a single solve
pub struct CuckooCtx {
    params: Params,
    keys: SipKeys,
    nthreads: usize,
    ntrims: u32,
    maxsols: usize,
    sols: Mutex<Vec<Solution>>,
    barrier: Barrier,
    state: SolverState,
}

impl CuckooCtx {
    /// Build a context for one solve.
    ///
    /// `ntrims = None` picks the default round count for the partitioning.
    pub fn new(
        params: Params,
        keys: SipKeys,
        nthreads: usize,
        ntrims: Option<u32>,
        maxsols: usize,
        mode: SolverMode,
    ) -> Result<Self, CuckooError> {
        if nthreads == 0 {
            return Err(CuckooError::InvalidParams("nthreads must be at least 1".into()));
        }
        if maxsols == 0 {
            return Err(CuckooError::InvalidParams("maxsols must be at least 1".into()));
        }

        let state = match mode {
            SolverMode::Trimming => {
                usize::try_from(params.twice_words()).map_err(|_| {
                    CuckooError::AllocationFailure("two-bit node set exceeds address space".into())
                })?;
                usize::try_from(params.cuckoo_slots()).map_err(|_| {
                    CuckooError::AllocationFailure("cuckoo hash exceeds address space".into())
                })?;
                SolverState::Trimming {
                    alive: ShrinkingSet::new(params.easiness, nthreads),
                    nonleaf: RwLock::new(Some(TwiceSet::new(params.twice_words()))),
                    cuckoo: OnceLock::new(),
                    overloaded: AtomicBool::new(false),
                }
            }
            SolverMode::Direct => {
                usize::try_from(params.node_count() + 1).map_err(|_| {
                    CuckooError::AllocationFailure("direct node map exceeds address space".into())
                })?;
                SolverState::Direct {
                    map: DirectMap::new(&params),
                }
            }
        };

        Ok(Self {
            params,
            keys,
            nthreads,
            ntrims: ntrims.unwrap_or_else(|| params.default_trim_rounds()),
            maxsols,
            sols: Mutex::new(Vec::new()),
            barrier: Barrier::new(nthreads),
            state,
        })
    }

    /// Build a context from solver settings
    pub fn from_settings(settings: &Settings, keys: SipKeys) -> Result<Self, CuckooError> {
        let params = Params::from_settings(settings)?;
        Self::new(
            params,
            keys,
            settings.nthreads,
            settings.ntrims,
            settings.maxsols,
            settings.mode,
        )
    }

    /// Graph geometry of this solve
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// SipHash keys of this solve
    pub fn keys(&self) -> &SipKeys {
        &self.keys
    }

    /// Run the solve to completion and return the recorded solutions
    pub fn solve(&self) -> Result<Vec<Solution>, CuckooError> {
        tracing::debug!("solving with k0 {:x} k1 {:x}", self.keys.k0, self.keys.k1);
        let outcome = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.nthreads);
            for tid in 0..self.nthreads {
                handles.push(scope.spawn(move || self.worker(tid)));
            }
            let mut first_err = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                    Err(_) => {
                        if first_err.is_none() {
                            first_err = Some(CuckooError::InvariantViolation(
                                "worker thread panicked".into(),
                            ));
                        }
                    }
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        });
        outcome?;
        Ok(self.sols.lock().clone())
    }

    fn worker(&self, tid: usize) -> Result<(), CuckooError> {
        match &self.state {
            SolverState::Trimming {
                alive,
                nonleaf,
                cuckoo,
                overloaded,
            } => self.trim_and_find(tid, alive, nonleaf, cuckoo, overloaded),
            SolverState::Direct { map } => self.finder_view(None).scan_direct(map, tid),
        }
    }

    fn finder_view<'a>(&'a self, alive: Option<&'a ShrinkingSet>) -> FinderView<'a> {
        FinderView {
            params: &self.params,
            keys: &self.keys,
            alive,
            sols: &self.sols,
            maxsols: self.maxsols,
            nthreads: self.nthreads,
        }
    }

    fn trim_and_find(
        &self,
        tid: usize,
        alive: &ShrinkingSet,
        nonleaf: &RwLock<Option<TwiceSet>>,
        cuckoo: &OnceLock<CuckooHash>,
        overloaded: &AtomicBool,
    ) -> Result<(), CuckooError> {
        let view = TrimView {
            params: &self.params,
            keys: &self.keys,
            alive,
            nthreads: self.nthreads,
        };

        {
            let guard = nonleaf.read();
            let nonleaf = guard.as_ref().ok_or_else(|| {
                CuckooError::InvariantViolation("two-bit node set missing before trimming".into())
            })?;
            for round in 1..=self.ntrims {
                view.round(nonleaf, &self.barrier, tid);
                if tid == 0 {
                    tracing::info!("{} trims: load {}%", round, view.load_percent());
                }
            }
        }

        // every worker has released its read guard once past this barrier
        self.barrier.wait();
        if tid == 0 {
            let load = view.load_percent();
            if load >= OVERLOAD_PERCENT {
                tracing::warn!("overloaded: load {}% after {} trims", load, self.ntrims);
                overloaded.store(true, Ordering::Relaxed);
            } else {
                // free the node-degree memory before the cuckoo hash lands;
                // the two are sized to share the same peak footprint
                *nonleaf.write() = None;
                let _ = cuckoo.set(CuckooHash::new(&self.params));
            }
        }
        self.barrier.wait();

        if overloaded.load(Ordering::Relaxed) {
            return Err(CuckooError::Overloaded {
                live: alive.count(),
                capacity: self.params.cuckoo_slots(),
            });
        }
        let map = cuckoo.get().ok_or_else(|| {
            CuckooError::InvariantViolation("cuckoo hash missing after trimming".into())
        })?;
        self.finder_view(Some(alive)).scan(map, tid)
    }
}

/// Solve for cycles with the given keys and parameters.
///
/// Convenience wrapper building a one-shot [`CuckooCtx`].
pub fn solve(
    keys: SipKeys,
    params: Params,
    nthreads: usize,
    ntrims: Option<u32>,
    maxsols: usize,
    mode: SolverMode,
) -> Result<Vec<Solution>, CuckooError> {
    CuckooCtx::new(params, keys, nthreads, ntrims, maxsols, mode)?.solve()
}
