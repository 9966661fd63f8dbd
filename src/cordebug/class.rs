//! Wrapper over an uninstantiated class.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use tracing::warn;

use crate::{
    cordebug::{
        function::CorFunction,
        handle::NativeHandle,
        module::CorModule,
        raw::RawClass,
        types::CorType,
        MAX_BASE_WALK,
    },
    metadata::{
        import::MetadataImport,
        reader,
        signature::ELEMENT_TYPE,
        token::Token,
    },
};

/// A class as the runtime sees it before instantiation: a `TypeDef` in
/// a module. Generic classes become concrete types through
/// [`CorClass::parameterized_type`].
#[derive(Clone)]
pub struct CorClass {
    pub(crate) raw: NativeHandle<dyn RawClass>,
    token: Token,
}

impl CorClass {
    /// Wraps a raw class handle.
    #[must_use]
    pub fn new(raw: NativeHandle<dyn RawClass>) -> Self {
        let token = Token::new(raw.token().unwrap_or(0));
        CorClass { raw, token }
    }

    /// `TypeDef` token, nil when the query failed at construction.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The declaring module.
    #[must_use]
    pub fn module(&self) -> Option<CorModule> {
        self.raw.module().ok().map(CorModule::new)
    }

    /// Instantiates the class into a type. `element_type` must be
    /// `CLASS` or `VALUETYPE`; generic arguments go in `type_args`.
    #[must_use]
    pub fn parameterized_type(&self, element_type: u8, type_args: &[CorType]) -> Option<CorType> {
        let raw_args: Vec<_> = type_args.iter().map(|arg| arg.raw.clone()).collect();
        self.raw
            .parameterized_type(element_type, &raw_args)
            .ok()
            .map(CorType::new)
    }

    /// Whether the class is the top-level type `System.<name>`.
    #[must_use]
    pub fn is_system(&self, name: &str) -> bool {
        let Some((import, token)) = self.metadata() else {
            return false;
        };
        let parts = reader::type_def_full_name(&*import, token);
        parts.len() == 1
            && parts[0]
                .name
                .strip_prefix("System.")
                .is_some_and(|rest| rest == name)
    }

    /// Whether the class is `System.Enum`.
    #[must_use]
    pub fn is_system_enum(&self) -> bool {
        self.is_system("Enum")
    }

    /// Whether the class is `System.ValueType`.
    #[must_use]
    pub fn is_system_value_type(&self) -> bool {
        self.is_system("ValueType")
    }

    /// Whether the class is `System.Object`.
    #[must_use]
    pub fn is_system_object(&self) -> bool {
        self.is_system("Object")
    }

    /// Whether the class is `System.Decimal`.
    #[must_use]
    pub fn is_system_decimal(&self) -> bool {
        self.is_system("Decimal")
    }

    /// Whether the class is `System.DateTime`.
    #[must_use]
    pub fn is_system_date_time(&self) -> bool {
        self.is_system("DateTime")
    }

    /// First function with the given name, searching this class and
    /// then, when `check_base_classes` is set, up the base chain.
    #[must_use]
    pub fn find_function(&self, name: &str, check_base_classes: bool) -> Option<CorFunction> {
        self.find_member(check_base_classes, |class| class.find_own_function(name))
    }

    /// First field with the given name, searching this class and then,
    /// when `check_base_classes` is set, up the base chain.
    #[must_use]
    pub fn find_field(&self, name: &str, check_base_classes: bool) -> Option<reader::FieldInfo> {
        self.find_member(check_base_classes, |class| {
            let (import, token) = class.metadata()?;
            reader::find_field(&*import, token, name)
        })
    }

    /// First validated property with the given name, searching this
    /// class and then, when `check_base_classes` is set, up the base
    /// chain.
    #[must_use]
    pub fn find_property(
        &self,
        name: &str,
        check_base_classes: bool,
    ) -> Option<reader::PropertyInfo> {
        self.find_member(check_base_classes, |class| {
            let (import, token) = class.metadata()?;
            reader::find_property(&*import, token, name)
        })
    }

    /// First event with the given name, searching this class and then,
    /// when `check_base_classes` is set, up the base chain.
    #[must_use]
    pub fn find_event(&self, name: &str, check_base_classes: bool) -> Option<reader::EventInfo> {
        self.find_member(check_base_classes, |class| {
            let (import, token) = class.metadata()?;
            reader::find_event(&*import, token, name)
        })
    }

    /// Runs `find` against this class and, when asked, every class up
    /// the base chain until it produces a member.
    fn find_member<T>(
        &self,
        check_base_classes: bool,
        find: impl Fn(&CorClass) -> Option<T>,
    ) -> Option<T> {
        let mut current = self.clone();
        for _ in 0..MAX_BASE_WALK {
            if let Some(found) = find(&current) {
                return Some(found);
            }
            if !check_base_classes {
                return None;
            }

            let base = current
                .parameterized_type(ELEMENT_TYPE::CLASS, &[])?
                .base()?;
            current = base.class()?;
        }

        warn!(
            "base-class chain of {} exceeded {MAX_BASE_WALK} links, giving up",
            self.token
        );
        None
    }

    fn find_own_function(&self, name: &str) -> Option<CorFunction> {
        let module = self.module()?;
        let import = module.metadata_import()?;
        for token in import.method_tokens(self.token) {
            if import
                .method_props(token)
                .is_some_and(|props| props.name == name)
            {
                return module.function_from_token(token);
            }
        }
        None
    }

    pub(crate) fn metadata(&self) -> Option<(Arc<dyn MetadataImport>, Token)> {
        let module = self.module()?;
        Some((module.metadata_import()?, self.token))
    }
}

impl PartialEq for CorClass {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for CorClass {}

impl Hash for CorClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::fmt::Debug for CorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorClass").field("token", &self.token).finish()
    }
}
