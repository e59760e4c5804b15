// src/service/dispatcher.rs - Queue-driven solver service

//! The queue façade around the solver.
//!
//! A host pushes `(header, tag)` requests onto a lock-free input queue and
//! drains `(tag, solution)` results from an output queue; a single
//! dispatcher thread in between derives keys, runs the solver, and forwards
//! every solution. The queues are MPMC and unbounded, with a soft limit the
//! host is expected to respect through [`SolverService::is_queue_under_limit`].

use crate::config::Settings;
use crate::cuckoo::{CuckooCtx, CuckooError, Params, SipKeys};
use crate::service::properties::{PropertyTable, PROP_NUM_THREADS, PROP_NUM_TRIMS};
use crate::service::types::{QueueInput, QueueOutput, ServiceError};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Soft cap on queued solve requests
pub const MAX_QUEUE_SIZE: usize = 1000;

struct ServiceShared {
    input: SegQueue<QueueInput>,
    output: SegQueue<QueueOutput>,
    should_quit: AtomicBool,
    settings: Settings,
    properties: Mutex<PropertyTable>,
}

/// Queue-driven solver service owning its queues, properties, and the
/// dispatcher thread's lifecycle
pub struct SolverService {
    shared: Arc<ServiceShared>,
    dispatcher: Option<JoinHandle<()>>,
}

impl SolverService {
    /// Create a stopped service with default properties for the settings
    pub fn new(settings: Settings) -> Self {
        let mut properties = PropertyTable::new();
        // the table is far below its bound here; adds cannot fail
        let _ = properties.add(
            PROP_NUM_THREADS,
            "Number of worker threads per solve",
            settings.nthreads as u32,
            1,
            64,
        );
        let _ = properties.add(
            PROP_NUM_TRIMS,
            "Number of trim rounds per solve",
            settings.trim_rounds(),
            0,
            256,
        );

        Self {
            shared: Arc::new(ServiceShared {
                input: SegQueue::new(),
                output: SegQueue::new(),
                should_quit: AtomicBool::new(false),
                settings,
                properties: Mutex::new(properties),
            }),
            dispatcher: None,
        }
    }

    /// Spawn the dispatcher thread
    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.dispatcher.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }
        self.shared.should_quit.store(false, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("cuckoo-dispatch".into())
            .spawn(move || dispatch_loop(&shared))
            .map_err(|e| ServiceError::Spawn(e.to_string()))?;
        self.dispatcher = Some(handle);
        Ok(())
    }

    /// Signal the dispatcher to quit and join it; both queues are drained
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        let handle = self.dispatcher.take().ok_or(ServiceError::NotRunning)?;
        self.shared.should_quit.store(true, Ordering::Relaxed);
        if handle.join().is_err() {
            tracing::error!("dispatcher thread panicked during shutdown");
        }
        Ok(())
    }

    /// True while more requests are welcome: strictly below the soft limit
    /// and not shutting down
    pub fn is_queue_under_limit(&self) -> bool {
        !self.shared.should_quit.load(Ordering::Relaxed)
            && self.shared.input.len() < MAX_QUEUE_SIZE
    }

    /// Enqueue a solve request. The 8-byte nonce is an opaque tag echoed
    /// back with each of the request's solutions. Returns false once the
    /// service is quitting.
    pub fn push_input(&self, header: [u8; 32], nonce: [u8; 8]) -> bool {
        if self.shared.should_quit.load(Ordering::Relaxed) {
            return false;
        }
        self.shared.input.push(QueueInput { header, nonce });
        true
    }

    /// Solve requests waiting in the input queue
    pub fn pending_inputs(&self) -> usize {
        self.shared.input.len()
    }

    /// Non-blocking dequeue of one completed solution
    pub fn pop_output(&self) -> Option<QueueOutput> {
        if self.shared.should_quit.load(Ordering::Relaxed) {
            return None;
        }
        self.shared.output.pop()
    }

    /// Out-parameter variant of [`pop_output`](Self::pop_output): copies the
    /// solution nonces into `out` and the tag into `nonce`. Returns false
    /// when no solution is ready or `out` cannot hold one.
    pub fn read_output(&self, out: &mut [u32], nonce: &mut [u8; 8]) -> bool {
        match self.pop_output() {
            Some(item) if item.nonces.len() <= out.len() => {
                out[..item.nonces.len()].copy_from_slice(&item.nonces);
                *nonce = item.nonce;
                true
            }
            Some(item) => {
                tracing::error!(
                    "output buffer holds {} nonces, solution has {}",
                    out.len(),
                    item.nonces.len()
                );
                false
            }
            None => false,
        }
    }

    /// Current value of a named property
    pub fn property(&self, name: &str) -> Option<u32> {
        self.shared.properties.lock().get(name)
    }

    /// Set a named property for subsequent solves
    pub fn set_property(&self, name: &str, value: u32) -> Result<(), ServiceError> {
        self.shared.properties.lock().set(name, value)
    }

    /// Property metadata as JSON
    pub fn properties_as_json(&self) -> serde_json::Result<String> {
        self.shared.properties.lock().as_json()
    }
}

impl Drop for SolverService {
    fn drop(&mut self) {
        if self.dispatcher.is_some() {
            let _ = self.stop();
        }
    }
}

fn dispatch_loop(shared: &ServiceShared) {
    tracing::info!("dispatcher running");
    while !shared.should_quit.load(Ordering::Relaxed) {
        match shared.input.pop() {
            Some(item) => process_request(shared, item),
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
    // leave no stale work behind for a future start()
    while shared.input.pop().is_some() {}
    while shared.output.pop().is_some() {}
    tracing::info!("dispatcher stopped");
}

fn process_request(shared: &ServiceShared, item: QueueInput) {
    let keys = SipKeys::from_header(&item.header);
    let (nthreads, ntrims) = {
        let table = shared.properties.lock();
        (
            table.get(PROP_NUM_THREADS).unwrap_or(1).max(1) as usize,
            table.get(PROP_NUM_TRIMS),
        )
    };

    let solved = Params::from_settings(&shared.settings).and_then(|params| {
        CuckooCtx::new(
            params,
            keys,
            nthreads,
            ntrims,
            shared.settings.maxsols,
            shared.settings.mode,
        )?
        .solve()
    });

    match solved {
        Ok(solutions) => {
            for sol in solutions {
                shared.output.push(QueueOutput {
                    nonce: item.nonce,
                    nonces: sol.nonces,
                });
            }
        }
        Err(CuckooError::Overloaded { live, capacity }) => {
            tracing::info!("request skipped: overloaded ({} live / {} slots)", live, capacity);
        }
        Err(err) => {
            tracing::error!("solve failed: {}", err);
        }
    }
}
