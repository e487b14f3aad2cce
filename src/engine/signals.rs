// src/engine/signals.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "reboot requested" signal.
///
/// Any component may raise it; the executor observes it between steps and
/// stops the run early. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct RebootFlag(Arc<AtomicBool>);

impl RebootFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
