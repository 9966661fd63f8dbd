//! Wrapper over a loaded assembly.

use std::hash::{Hash, Hasher};

use crate::cordebug::{
    appdomain::CorAppDomain,
    decode_name,
    handle::NativeHandle,
    module::CorModule,
    raw::RawAssembly,
};

/// An assembly loaded into the debuggee.
#[derive(Clone)]
pub struct CorAssembly {
    pub(crate) raw: NativeHandle<dyn RawAssembly>,
}

impl CorAssembly {
    /// Wraps a raw assembly handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawAssembly>) -> Self {
        CorAssembly { raw }
    }

    /// Full path of the assembly, empty for in-memory assemblies.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.raw.name().ok().map(decode_name)
    }

    /// Modules of the assembly.
    #[must_use]
    pub fn modules(&self) -> Vec<CorModule> {
        self.raw
            .modules()
            .map(|handles| handles.into_iter().map(CorModule::new).collect())
            .unwrap_or_default()
    }

    /// The domain the assembly is loaded into.
    #[must_use]
    pub fn app_domain(&self) -> Option<CorAppDomain> {
        self.raw.app_domain().ok().map(CorAppDomain::new)
    }

    /// Display name of the assembly (name, version, culture, public key
    /// token), read from the manifest module's metadata.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let manifest = self
            .modules()
            .into_iter()
            .find(CorModule::is_manifest_module)?;
        let import = manifest.metadata_import()?;
        Some(import.assembly_props()?.full_name())
    }
}

impl PartialEq for CorAssembly {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorAssembly {}

impl Hash for CorAssembly {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorAssembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorAssembly").field("name", &self.name()).finish()
    }
}
