//! Cancellation for long scans.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::cordebug::{decode_name, raw::RawCorDebug};

/// A cheap, clonable cancellation flag. Cancelling is one-way; every
/// clone observes it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Cancels the token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A running process the debugger can attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachableProcess {
    /// Process id
    pub pid: u32,
    /// Executable name
    pub name: String,
}

/// Scans for processes with the runtime loaded. The token is checked
/// between processes; a cancelled scan reads as `None`, never as a
/// partial list. Processes whose name or runtime state cannot be
/// queried are skipped — they usually exited mid-scan.
#[must_use]
pub fn attachable_processes(
    raw: &dyn RawCorDebug,
    token: &CancellationToken,
) -> Option<Vec<AttachableProcess>> {
    let mut found = Vec::new();
    for pid in raw.process_ids().unwrap_or_default() {
        if token.is_cancelled() {
            return None;
        }
        if raw.is_managed(pid) != Ok(true) {
            continue;
        }
        let Ok(units) = raw.process_name(pid) else {
            continue;
        };
        found.push(AttachableProcess {
            pid,
            name: decode_name(units),
        });
    }

    if token.is_cancelled() {
        return None;
    }
    Some(found)
}
