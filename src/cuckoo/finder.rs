// src/cuckoo/finder.rs - Cycle detection and solution recovery

//! The cycle finder.
//!
//! Surviving edges are inserted into a growing forest stored as `node → node`
//! steps in the cuckoo hash. For each edge `(u0, v0)` the finder walks both
//! endpoints' paths to their roots. Paths meeting at a common root close a
//! cycle; its length is checked against the proof size and, on a hit, the
//! solution's edge nonces are recovered by replaying the live edge set
//! against the cycle's edges. Otherwise the shorter path is reversed onto
//! the longer one, keeping the forest an in-tree per component.

use super::cuckoo_hash::NodeMap;
use super::sets::ShrinkingSet;
use super::siphash::SipKeys;
use super::trimmer::try_for_each_live_nonce;
use super::{CuckooError, Params, Solution, MAX_PATH_LEN, PRESIP};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Shared state of the cycle-finding phase, borrowed by every worker
pub(crate) struct FinderView<'a> {
    pub params: &'a Params,
    pub keys: &'a SipKeys,
    /// Live-edge filter; `None` in the direct (untrimmed) variant
    pub alive: Option<&'a ShrinkingSet>,
    pub sols: &'a Mutex<Vec<Solution>>,
    pub maxsols: usize,
    pub nthreads: usize,
}

/// Walk the forest from `u` to its root, recording nodes in `buf[1..]`.
///
/// Returns the index of the root. A walk past [`MAX_PATH_LEN`] means either
/// a pre-existing short cycle got into the forest (diagnosed by scanning the
/// recorded path for the repeating node) or runaway growth.
pub(crate) fn path<M: NodeMap>(map: &M, mut u: u32, buf: &mut [u32]) -> Result<usize, CuckooError> {
    let mut nu = 0usize;
    while u != 0 {
        nu += 1;
        if nu >= MAX_PATH_LEN {
            let mut i = nu;
            while i > 0 && buf[i - 1] != u {
                i -= 1;
            }
            if i == 0 {
                tracing::error!("maximum path length exceeded");
                return Err(CuckooError::PathOverflow);
            }
            let len = MAX_PATH_LEN - (i - 1);
            tracing::error!("illegal {}-cycle in path graph", len);
            return Err(CuckooError::IllegalCycle(len));
        }
        buf[nu] = u;
        u = map.get(u);
    }
    Ok(nu)
}

impl FinderView<'_> {
    /// Run thread `tid`'s share of cycle finding over the trimmed edge set
    pub(crate) fn scan<M: NodeMap>(&self, map: &M, tid: usize) -> Result<(), CuckooError> {
        let alive = match self.alive {
            Some(alive) => alive,
            None => {
                return Err(CuckooError::InvariantViolation(
                    "trimmed scan without a live edge set".into(),
                ))
            }
        };
        let mut us = vec![0u32; MAX_PATH_LEN];
        let mut vs = vec![0u32; MAX_PATH_LEN];
        let node_mask = self.params.node_mask();
        try_for_each_live_nonce(
            alive,
            self.params.easiness,
            self.nthreads,
            tid,
            |nonce| {
                let (u, v) = self.keys.sipedge(node_mask, nonce);
                self.process_edge(map, tid, nonce, u, v, &mut us, &mut vs)
            },
        )
    }

    /// Direct-variant scan: every nonce is a candidate, endpoints staged
    /// [`PRESIP`] at a time
    pub(crate) fn scan_direct<M: NodeMap>(&self, map: &M, tid: usize) -> Result<(), CuckooError> {
        let mut us = vec![0u32; MAX_PATH_LEN];
        let mut vs = vec![0u32; MAX_PATH_LEN];
        let mut uvpre = vec![0u32; 2 * PRESIP];
        let mut npre = 0usize;
        let node_mask = self.params.node_mask();
        let stride = self.nthreads as u32;

        let mut nonce = tid as u32;
        while nonce < self.params.easiness {
            if npre == 0 {
                let mut n = nonce;
                for slot in 0..PRESIP {
                    uvpre[2 * slot] = self.keys.sipnode(node_mask, n, 0);
                    uvpre[2 * slot + 1] = self.keys.sipnode(node_mask, n, 1);
                    n = n.wrapping_add(stride);
                }
                npre = PRESIP;
            }
            let slot = PRESIP - npre;
            npre -= 1;
            self.process_edge(
                map,
                tid,
                nonce,
                uvpre[2 * slot],
                uvpre[2 * slot + 1],
                &mut us,
                &mut vs,
            )?;
            nonce += stride;
        }
        Ok(())
    }

    /// Insert one edge into the forest, closing and recording cycles
    pub(crate) fn process_edge<M: NodeMap>(
        &self,
        map: &M,
        tid: usize,
        nonce: u32,
        u: u32,
        v: u32,
        us: &mut [u32],
        vs: &mut [u32],
    ) -> Result<(), CuckooError> {
        // bias both endpoints so 0 stays the "no successor" sentinel and the
        // two sides occupy disjoint index ranges
        let u0 = u + 1;
        let v0 = v + 1 + self.params.nnodes();
        let ustep = map.get(u0);
        let vstep = map.get(v0);
        if ustep == v0 || vstep == u0 {
            return Ok(()); // ignore duplicate edges
        }
        us[0] = u0;
        vs[0] = v0;
        let mut nu = path(map, ustep, us)?;
        let mut nv = path(map, vstep, vs)?;

        if us[nu] == vs[nv] {
            // common root: the new edge closes a cycle
            let min = nu.min(nv);
            nu -= min;
            nv -= min;
            while us[nu] != vs[nv] {
                nu += 1;
                nv += 1;
            }
            let len = nu + nv + 1;
            tracing::debug!(
                "{}-cycle found at {}:{}%",
                len,
                tid,
                u64::from(nonce) * 100 / u64::from(self.params.easiness)
            );
            if len == self.params.proof_size {
                self.record(us, nu, vs, nv);
            }
            return Ok(());
        }

        // no cycle: reverse the shorter path onto the longer one
        if nu < nv {
            for i in (0..nu).rev() {
                map.set(us[i + 1], us[i])?;
            }
            map.set(u0, v0)?;
        } else {
            for i in (0..nv).rev() {
                map.set(vs[i + 1], vs[i])?;
            }
            map.set(v0, u0)?;
        }
        Ok(())
    }

    /// Recover a proof-length cycle's edge nonces and store the solution
    fn record(&self, us: &[u32], nu: usize, vs: &[u32], nv: usize) {
        if self.sols.lock().len() >= self.maxsols {
            return;
        }

        // the cycle as (U, V) node pairs: U nodes sit at even path indices,
        // V nodes at odd ones
        let mut cycle: HashSet<(u32, u32)> = HashSet::with_capacity(self.params.proof_size);
        cycle.insert((us[0], vs[0]));
        for i in (0..nu).rev() {
            cycle.insert((us[(i + 1) & !1], us[i | 1]));
        }
        for i in (0..nv).rev() {
            cycle.insert((vs[i | 1], vs[(i + 1) & !1]));
        }

        let node_mask = self.params.node_mask();
        let bias = 1 + self.params.nnodes();
        let mut nonces = Vec::with_capacity(self.params.proof_size);
        for nonce in 0..self.params.easiness {
            if self.alive.map_or(true, |a| a.test(nonce)) {
                let (u, v) = self.keys.sipedge(node_mask, nonce);
                if cycle.remove(&(u + 1, v + bias)) {
                    nonces.push(nonce);
                }
            }
        }

        if nonces.len() == self.params.proof_size {
            let mut sols = self.sols.lock();
            if sols.len() < self.maxsols {
                sols.push(Solution::new(nonces));
            }
        } else {
            tracing::warn!(
                "cycle recovery matched {} of {} edges, dropping candidate",
                nonces.len(),
                self.params.proof_size
            );
        }
    }
}
