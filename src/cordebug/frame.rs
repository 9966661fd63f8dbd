//! Wrapper over a stack frame.

use std::hash::{Hash, Hasher};

use crate::{
    cordebug::{function::CorFunction, handle::NativeHandle, raw::RawFrame, value::CorValue},
    metadata::token::Token,
};

/// How an IL offset reported by a frame relates to the actual
/// instruction pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingResult {
    /// The offset maps exactly
    Exact,
    /// The offset is approximate
    Approximate,
    /// The frame is in the prolog, before the first IL instruction
    Prolog,
    /// The frame is in the epilog, after the last IL instruction
    Epilog,
    /// No mapping information is available
    NoInfo,
    /// The code has no IL mapping at all
    Unmapped,
}

impl MappingResult {
    fn from_raw(raw: u32) -> MappingResult {
        // CorDebugMappingResult values
        match raw {
            0x01 => MappingResult::Prolog,
            0x02 => MappingResult::Epilog,
            0x08 => MappingResult::Exact,
            0x10 => MappingResult::Approximate,
            0x20 => MappingResult::Unmapped,
            _ => MappingResult::NoInfo,
        }
    }
}

/// One managed frame on a thread's stack.
#[derive(Clone)]
pub struct CorFrame {
    pub(crate) raw: NativeHandle<dyn RawFrame>,
}

impl CorFrame {
    pub(crate) fn new(raw: NativeHandle<dyn RawFrame>) -> Self {
        CorFrame { raw }
    }

    /// `MethodDef` token of the frame's function.
    #[must_use]
    pub fn function_token(&self) -> Token {
        Token::new(self.raw.function_token().unwrap_or(0))
    }

    /// The frame's function.
    #[must_use]
    pub fn function(&self) -> Option<CorFunction> {
        self.raw.function().ok().map(CorFunction::new)
    }

    /// IL offset of the instruction pointer and how well it maps.
    #[must_use]
    pub fn ip(&self) -> Option<(u32, MappingResult)> {
        let (offset, mapping) = self.raw.ip().ok()?;
        Some((offset, MappingResult::from_raw(mapping)))
    }

    /// Local variables of the frame, slot order.
    #[must_use]
    pub fn locals(&self) -> Vec<CorValue> {
        self.raw
            .locals()
            .map(|handles| handles.into_iter().map(CorValue::new).collect())
            .unwrap_or_default()
    }

    /// Arguments of the frame, signature order, `this` first for
    /// instance methods.
    #[must_use]
    pub fn arguments(&self) -> Vec<CorValue> {
        self.raw
            .arguments()
            .map(|handles| handles.into_iter().map(CorValue::new).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for CorFrame {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorFrame {}

impl Hash for CorFrame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorFrame")
            .field("function_token", &self.function_token())
            .finish()
    }
}
