// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Runtime Context
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Process-wide resources built once by the embedding program: the worker
//! thread pool and the deduplicated warning log.

use rayon::ThreadPool;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::warn;
use transport_types::error::{TransportError, TransportResult};

pub struct RuntimeContext {
    pool: ThreadPool,
    warned: Mutex<HashSet<String>>,
}

impl RuntimeContext {
    /// `n_threads == 0` lets rayon pick the thread count.
    pub fn new(n_threads: usize) -> TransportResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("transport-{i}"))
            .build()
            .map_err(|e| TransportError::Config(format!("cannot build thread pool: {e}")))?;
        Ok(RuntimeContext {
            pool,
            warned: Mutex::new(HashSet::new()),
        })
    }

    /// Single worker thread, for reproducible reductions.
    pub fn serial() -> TransportResult<Self> {
        Self::new(1)
    }

    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the worker pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Emit a warning the first time `message` is seen. Returns whether it
    /// was emitted.
    pub fn warn_once(&self, message: &str) -> bool {
        let first = match self.warned.lock() {
            Ok(mut seen) => seen.insert(message.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(message.to_string()),
        };
        if first {
            warn!("{message}");
        }
        first
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("n_threads", &self.n_threads())
            .finish()
    }
}
