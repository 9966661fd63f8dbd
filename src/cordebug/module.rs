//! Wrapper over a loaded module, and the serialized module identity.
//!
//! Modules are the anchor of the whole debugging session: breakpoints
//! are registered against a module identity long before the module
//! loads, and metadata/type/function lookups all start from a module.
//! The identity problem is that dynamic and in-memory modules have no
//! filename, so their metadata scope name plus a per-assembly counter
//! stands in for the path.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    cordebug::{
        assembly::CorAssembly,
        class::CorClass,
        decode_name,
        function::CorFunction,
        handle::NativeHandle,
        raw::RawModule,
    },
    metadata::{
        import::MetadataImport,
        token::{TableId, Token},
    },
};

/// Serialized identity of a module, stable across load/unload.
///
/// Name comparisons ignore ASCII case: module names are paths on the
/// debuggee's filesystem far more often than not.
#[derive(Debug, Clone, Default)]
pub struct DnModuleId {
    /// Display name of the owning assembly, empty when unknown
    pub assembly_full_name: String,
    /// Module path, or metadata name plus ` (id=N)` for modules
    /// without one
    pub module_name: String,
    /// The module is dynamic (types can be added at runtime)
    pub is_dynamic: bool,
    /// The module was loaded from memory, not from a file
    pub is_in_memory: bool,
    /// Match on the module name alone, ignoring the assembly
    pub name_only: bool,
}

impl PartialEq for DnModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.is_dynamic == other.is_dynamic
            && self.is_in_memory == other.is_in_memory
            && self.name_only == other.name_only
            && self.module_name.eq_ignore_ascii_case(&other.module_name)
            && (self.name_only
                || self
                    .assembly_full_name
                    .eq_ignore_ascii_case(&other.assembly_full_name))
    }
}

impl Eq for DnModuleId {}

impl Hash for DnModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_dynamic.hash(state);
        self.is_in_memory.hash(state);
        self.name_only.hash(state);
        // The assembly name stays out of the hash: two name-only ids
        // with different assembly names compare equal, so hashing the
        // assembly would break the Hash/Eq contract.
        for byte in self.module_name.bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

/// A module loaded into the debuggee.
///
/// Name, address, size, token and the dynamic/in-memory flags are read
/// once at construction, matching the native object's own lifetime
/// guarantees; everything else is re-queried per call.
#[derive(Clone)]
pub struct CorModule {
    pub(crate) raw: NativeHandle<dyn RawModule>,
    name: String,
    address: u64,
    size: u32,
    token: Token,
    is_dynamic: bool,
    is_in_memory: bool,
}

impl CorModule {
    /// Wraps a raw module handle, caching the scalars the native object
    /// keeps stable for its lifetime.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawModule>) -> Self {
        let name = raw.name().ok().map(decode_name).unwrap_or_default();
        let address = raw.base_address().unwrap_or(0);
        let size = raw.size().unwrap_or(0);
        let token = Token::new(raw.token().unwrap_or(0));
        let is_dynamic = raw.is_dynamic().unwrap_or(false);
        let is_in_memory = raw.is_in_memory().unwrap_or(false);

        CorModule {
            raw,
            name,
            address,
            size,
            token,
            is_dynamic,
            is_in_memory,
        }
    }

    /// Module path, or the empty string when the name query failed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base address, 0 for dynamic modules.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Mapped size, 0 for dynamic modules.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Module metadata token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Whether types can be added to the module at runtime.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Whether the module was loaded from memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.is_in_memory
    }

    /// The owning assembly.
    #[must_use]
    pub fn assembly(&self) -> Option<CorAssembly> {
        self.raw.assembly().ok().map(CorAssembly::new)
    }

    /// The module's metadata import.
    #[must_use]
    pub fn metadata_import(&self) -> Option<Arc<dyn MetadataImport>> {
        self.raw.metadata_import().ok()
    }

    /// Name of the module as recorded in its own metadata.
    #[must_use]
    pub fn scope_name(&self) -> Option<String> {
        Some(self.metadata_import()?.scope_props()?.name)
    }

    /// Name used in the serialized module identity. Dynamic and
    /// in-memory modules have no filename and their metadata name need
    /// not be unique, so those get an extra id.
    #[must_use]
    pub fn serialized_name(&self, id: u32) -> String {
        if self.is_in_memory || self.is_dynamic {
            let scope = self.scope_name().unwrap_or_default();
            return format!("{scope} (id={id})");
        }
        self.name.clone()
    }

    /// The module's serialized identity.
    #[must_use]
    pub fn module_id(&self, id: u32) -> DnModuleId {
        let assembly_full_name = self
            .assembly()
            .and_then(|assembly| assembly.full_name())
            .unwrap_or_default();

        DnModuleId {
            assembly_full_name,
            module_name: self.serialized_name(id),
            is_dynamic: self.is_dynamic,
            is_in_memory: self.is_in_memory,
            name_only: false,
        }
    }

    /// Whether this is the assembly's manifest module (its metadata has
    /// an Assembly table row).
    #[must_use]
    pub fn is_manifest_module(&self) -> bool {
        match self.metadata_import() {
            Some(import) => import.is_valid_token(Token::from_table_row(TableId::Assembly, 1)),
            None => false,
        }
    }

    /// Resolves a `MethodDef` token to a function.
    #[must_use]
    pub fn function_from_token(&self, token: Token) -> Option<CorFunction> {
        self.raw
            .function_from_token(token.value())
            .ok()
            .map(CorFunction::new)
    }

    /// Resolves a `TypeDef` token to a class.
    #[must_use]
    pub fn class_from_token(&self, token: Token) -> Option<CorClass> {
        self.raw
            .class_from_token(token.value())
            .ok()
            .map(CorClass::new)
    }

    /// Turns LoadClass/UnloadClass callbacks for this module on or off.
    /// Returns whether the native call succeeded.
    pub fn enable_class_load_callbacks(&self, enable: bool) -> bool {
        self.raw.enable_class_load_callbacks(enable).is_ok()
    }

    /// Sets the JIT compiler flags. Only valid from inside a LoadModule
    /// callback; later calls fail natively.
    pub fn set_jit_compiler_flags(&self, flags: u32) -> bool {
        self.raw.set_jit_compiler_flags(flags).is_ok()
    }
}

impl PartialEq for CorModule {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorModule {}

impl Hash for CorModule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Display for CorModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Module] DYN={} MEM={} A={:08X} S={:08X} {}",
            i32::from(self.is_dynamic),
            i32::from(self.is_in_memory),
            self.address,
            self.size,
            self.name
        )
    }
}

impl std::fmt::Debug for CorModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}
