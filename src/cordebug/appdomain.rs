//! Wrapper over an application domain.

use std::hash::{Hash, Hasher};

use crate::cordebug::{
    assembly::CorAssembly,
    decode_name,
    handle::NativeHandle,
    raw::RawAppDomain,
};

/// An application domain in the debuggee.
#[derive(Clone)]
pub struct CorAppDomain {
    pub(crate) raw: NativeHandle<dyn RawAppDomain>,
}

impl CorAppDomain {
    /// Wraps a raw application domain handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawAppDomain>) -> Self {
        CorAppDomain { raw }
    }

    /// Runtime id of the domain.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.raw.id().ok()
    }

    /// Domain name. Re-queried every call, a NameChange callback can
    /// rename the domain mid-session.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.raw.name().ok().map(decode_name)
    }

    /// Assemblies loaded into this domain.
    #[must_use]
    pub fn assemblies(&self) -> Vec<CorAssembly> {
        self.raw
            .assemblies()
            .map(|handles| handles.into_iter().map(CorAssembly::new).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for CorAppDomain {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorAppDomain {}

impl Hash for CorAppDomain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorAppDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorAppDomain")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
