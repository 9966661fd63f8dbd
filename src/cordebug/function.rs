//! Wrapper over a managed function.

use std::hash::{Hash, Hasher};

use crate::{
    cordebug::{
        breakpoint::CorCodeBreakpoint,
        class::CorClass,
        handle::NativeHandle,
        module::CorModule,
        raw::RawFunction,
    },
    metadata::token::Token,
};

/// A managed function in a module.
#[derive(Clone)]
pub struct CorFunction {
    pub(crate) raw: NativeHandle<dyn RawFunction>,
    token: Token,
}

impl CorFunction {
    pub(crate) fn new(raw: NativeHandle<dyn RawFunction>) -> Self {
        let token = Token::new(raw.token().unwrap_or(0));
        CorFunction { raw, token }
    }

    /// `MethodDef` token of the function.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The declaring module.
    #[must_use]
    pub fn module(&self) -> Option<CorModule> {
        self.raw.module().ok().map(CorModule::new)
    }

    /// The declaring class.
    #[must_use]
    pub fn class(&self) -> Option<CorClass> {
        self.raw.class().ok().map(CorClass::new)
    }

    /// Function name from the declaring module's metadata.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let import = self.module()?.metadata_import()?;
        Some(import.method_props(self.token)?.name)
    }

    /// Plants a breakpoint at an IL offset in this function.
    #[must_use]
    pub fn create_breakpoint(&self, il_offset: u32) -> Option<CorCodeBreakpoint> {
        self.raw
            .create_breakpoint(il_offset)
            .ok()
            .map(CorCodeBreakpoint::new)
    }

    /// Plants a breakpoint at a native offset in the jitted code.
    #[must_use]
    pub fn create_native_breakpoint(&self, offset: u32) -> Option<CorCodeBreakpoint> {
        self.raw
            .create_native_breakpoint(offset)
            .ok()
            .map(CorCodeBreakpoint::new)
    }
}

impl PartialEq for CorFunction {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorFunction {}

impl Hash for CorFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorFunction").field("token", &self.token).finish()
    }
}
