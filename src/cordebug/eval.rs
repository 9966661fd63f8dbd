//! Wrapper over a function evaluation.

use std::hash::{Hash, Hasher};

use crate::cordebug::{
    function::CorFunction,
    handle::NativeHandle,
    raw::RawEval,
    value::CorValue,
};

/// A function evaluation bound to one thread. Scheduling a call hijacks
/// the thread while the debuggee runs; the outcome arrives later as an
/// EvalComplete or EvalException callback, after which
/// [`CorEval::result`] holds the produced value.
#[derive(Clone)]
pub struct CorEval {
    pub(crate) raw: NativeHandle<dyn RawEval>,
}

impl CorEval {
    /// Wraps a raw evaluation handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawEval>) -> Self {
        CorEval { raw }
    }

    /// Schedules a call to `function` with `args`. Returns whether the
    /// native call was accepted.
    pub fn call_function(&self, function: &CorFunction, args: &[CorValue]) -> bool {
        let raw_args: Vec<_> = args.iter().map(|arg| arg.raw.clone()).collect();
        self.raw.call_function(&function.raw, &raw_args).is_ok()
    }

    /// Aborts an in-flight evaluation.
    pub fn abort(&self) -> bool {
        self.raw.abort().is_ok()
    }

    /// Result of a completed evaluation, `None` while still running or
    /// for void-returning calls.
    #[must_use]
    pub fn result(&self) -> Option<CorValue> {
        self.raw.result().ok().flatten().map(CorValue::new)
    }
}

impl PartialEq for CorEval {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorEval {}

impl Hash for CorEval {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorEval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorEval").finish()
    }
}
