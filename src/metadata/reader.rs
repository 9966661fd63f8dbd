//! Queries and recognizers over a module's metadata.
//!
//! Everything here runs against [`MetadataImport`], so the same
//! algorithms serve the live debuggee and the scripted metadata used in
//! tests. The functions follow one failure policy: a missing row, an
//! unparseable signature or a failed native call reads as "absent", it
//! never becomes an error. A debugger that throws while naming a type
//! would take the whole session down with it.
//!
//! Chain walks (enclosing types, resolution scopes) are bounded. Valid
//! metadata never nests a thousand levels deep, but these walks run
//! against whatever a debuggee maps into memory, and a cycle planted in
//! a hostile image must not hang the callback thread.

use tracing::warn;

use crate::{
    file::parser::Parser,
    metadata::{
        import::{Constant, FieldAttributes, MetadataImport, MethodAttributes},
        signature::{parse_field_sig, parse_method_sig, MethodSig, TypeSig},
        token::{TableId, Token},
    },
};

/// Upper bound on enclosing-type and resolution-scope walks.
const MAX_WALK: usize = 1000;

/// The module's global `<Module>` type, always row 1 of the TypeDef
/// table.
pub const GLOBAL_TYPE: Token = Token::new(0x0200_0001);

const DEBUGGER_BROWSABLE_ATTRIBUTE: &str = "System.Diagnostics.DebuggerBrowsableAttribute";
const COMPILER_GENERATED_ATTRIBUTE: &str =
    "System.Runtime.CompilerServices.CompilerGeneratedAttribute";

/// One segment of a nested type name, outermost first after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAndName {
    /// Token of this segment's type
    pub token: Token,
    /// Namespace-qualified name of this segment
    pub name: String,
}

/// Resolves the full name of a `TypeDef`, walking the enclosing-type
/// chain for nested types. Segments come back outermost first; an
/// unresolvable token yields an empty list.
pub fn type_def_full_name(import: &dyn MetadataImport, token: Token) -> Vec<TokenAndName> {
    let mut parts = Vec::new();
    let mut current = token;
    let mut steps = 0;

    while !current.is_null() {
        steps += 1;
        if steps > MAX_WALK {
            warn!("enclosing-type chain of {token} exceeded {MAX_WALK} links, truncating");
            break;
        }

        let Some(props) = import.type_def_props(current) else {
            break;
        };
        parts.push(TokenAndName {
            token: current,
            name: props.name,
        });

        match import.enclosing_type(current) {
            Some(enclosing) => current = enclosing,
            None => break,
        }
    }

    parts.reverse();
    parts
}

/// Resolves the full name of a `TypeRef`, following resolution scopes
/// that are themselves `TypeRef`s (the encoding for nested types).
pub fn type_ref_full_name(import: &dyn MetadataImport, token: Token) -> Vec<TokenAndName> {
    let mut parts = Vec::new();
    let mut current = token;
    let mut steps = 0;

    loop {
        steps += 1;
        if steps > MAX_WALK {
            warn!("resolution-scope chain of {token} exceeded {MAX_WALK} links, truncating");
            break;
        }

        let Some(props) = import.type_ref_props(current) else {
            break;
        };
        let scope = props.scope;
        parts.push(TokenAndName {
            token: current,
            name: props.name,
        });

        if scope.table_id() == Some(TableId::TypeRef) && !scope.is_null() {
            current = scope;
        } else {
            break;
        }
    }

    parts.reverse();
    parts
}

/// Resolves the full name of a `TypeDef` or `TypeRef`; any other token
/// kind yields an empty list.
pub fn type_full_name(import: &dyn MetadataImport, token: Token) -> Vec<TokenAndName> {
    match token.table_id() {
        Some(TableId::TypeDef) => type_def_full_name(import, token),
        Some(TableId::TypeRef) => type_ref_full_name(import, token),
        _ => Vec::new(),
    }
}

/// Joins name segments into the dotted display form.
#[must_use]
pub fn join_full_name(parts: &[TokenAndName]) -> String {
    let names: Vec<&str> = parts.iter().map(|part| part.name.as_str()).collect();
    names.join(".")
}

/// A field of a type, with its signature already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Field attributes
    pub flags: FieldAttributes,
    /// Declared type
    pub field_type: TypeSig,
    /// Constant value for literal fields
    pub constant: Option<Constant>,
    /// `DebuggerBrowsable` hint, when present and well-formed
    pub browsable_state: Option<DebuggerBrowsableState>,
    /// The field carries `CompilerGeneratedAttribute`
    pub compiler_generated: bool,
}

/// A method of a type, with its signature already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method attributes
    pub flags: MethodAttributes,
    /// Raw implementation attributes
    pub impl_flags: u32,
    /// Decoded signature
    pub signature: MethodSig,
    /// The method carries `CompilerGeneratedAttribute`
    pub compiler_generated: bool,
}

/// A property that survived accessor validation. The getter is always
/// present and well-formed; the setter is kept only when it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property token
    pub token: Token,
    /// Property name
    pub name: String,
    /// Getter method token
    pub getter: Token,
    /// Setter method token, nil when absent or rejected
    pub setter: Token,
    /// Getter signature
    pub get_sig: MethodSig,
    /// Setter signature when the setter was kept
    pub set_sig: Option<MethodSig>,
    /// Method attributes of the getter
    pub get_method_flags: MethodAttributes,
    /// `DebuggerBrowsable` hint on the property, when present
    pub browsable_state: Option<DebuggerBrowsableState>,
}

/// An event of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    /// Event token
    pub token: Token,
    /// Event name
    pub name: String,
    /// Delegate type of the event
    pub event_type: Token,
    /// `add_` accessor token
    pub add: Token,
    /// `remove_` accessor token
    pub remove: Token,
    /// Raise accessor token
    pub fire: Token,
}

/// Fields of a `TypeDef` in table order. A field whose properties
/// cannot be read or whose signature does not parse is left out, the
/// way a row torn by a detaching debuggee should be.
pub fn fields(import: &dyn MetadataImport, type_def: Token) -> Vec<FieldInfo> {
    let mut infos = Vec::new();
    for token in import.field_tokens(type_def) {
        let Some(props) = import.field_props(token) else {
            continue;
        };
        let Ok(field_type) = parse_field_sig(&props.signature) else {
            continue;
        };
        infos.push(FieldInfo {
            token,
            name: props.name,
            flags: props.flags,
            field_type,
            constant: props.constant,
            browsable_state: debugger_browsable_state(import, token),
            compiler_generated: is_compiler_generated(import, token),
        });
    }
    infos
}

/// Methods of a `TypeDef` in table order. Methods with unreadable
/// properties or unparseable signatures are left out.
pub fn methods(import: &dyn MetadataImport, type_def: Token) -> Vec<MethodInfo> {
    let mut infos = Vec::new();
    for token in import.method_tokens(type_def) {
        let Some(props) = import.method_props(token) else {
            continue;
        };
        let Ok(signature) = parse_method_sig(&props.signature) else {
            continue;
        };
        infos.push(MethodInfo {
            token,
            name: props.name,
            flags: props.flags,
            impl_flags: props.impl_flags,
            signature,
            compiler_generated: is_compiler_generated(import, token),
        });
    }
    infos
}

/// Properties of a `TypeDef` in table order, validated.
///
/// A property is kept only if its getter exists and takes no
/// parameters, declares no generic parameters, has no vararg sentinel
/// and returns non-void after stripping pinned and custom modifiers.
/// The setter survives only if it takes exactly the getter's return
/// type (compared after stripping), returns void, matches the getter's
/// `HASTHIS` and declares no generics; otherwise the property becomes
/// getter-only.
pub fn properties(import: &dyn MetadataImport, type_def: Token) -> Vec<PropertyInfo> {
    let mut infos = Vec::new();
    for token in import.property_tokens(type_def) {
        let Some(props) = import.property_props(token) else {
            continue;
        };
        if props.getter.is_null() {
            continue;
        }
        let Some(getter_props) = import.method_props(props.getter) else {
            continue;
        };
        let Ok(get_sig) = parse_method_sig(&getter_props.signature) else {
            continue;
        };
        if !is_valid_getter(&get_sig) {
            continue;
        }

        let set_sig =
            accessor_sig(import, props.setter).filter(|sig| is_matching_setter(sig, &get_sig));
        let setter = if set_sig.is_some() {
            props.setter
        } else {
            Token::new(0)
        };

        infos.push(PropertyInfo {
            token,
            name: props.name,
            getter: props.getter,
            setter,
            get_sig,
            set_sig,
            get_method_flags: getter_props.flags,
            browsable_state: debugger_browsable_state(import, token),
        });
    }
    infos
}

/// Events of a `TypeDef` in table order.
pub fn events(import: &dyn MetadataImport, type_def: Token) -> Vec<EventInfo> {
    let mut infos = Vec::new();
    for token in import.event_tokens(type_def) {
        let Some(props) = import.event_props(token) else {
            continue;
        };
        infos.push(EventInfo {
            token,
            name: props.name,
            event_type: props.event_type,
            add: props.add,
            remove: props.remove,
            fire: props.fire,
        });
    }
    infos
}

fn accessor_sig(import: &dyn MetadataImport, token: Token) -> Option<MethodSig> {
    if token.is_null() {
        return None;
    }
    let props = import.method_props(token)?;
    parse_method_sig(&props.signature).ok()
}

fn is_valid_getter(sig: &MethodSig) -> bool {
    !sig.has_sentinel
        && sig.generic_param_count == 0
        && sig.params.is_empty()
        && !matches!(sig.return_type.strip_pinned_and_modifiers(), TypeSig::Void)
}

fn is_matching_setter(sig: &MethodSig, get_sig: &MethodSig) -> bool {
    !sig.has_sentinel
        && sig.generic_param_count == 0
        && sig.params.len() == 1
        && matches!(sig.return_type.strip_pinned_and_modifiers(), TypeSig::Void)
        && sig.has_this == get_sig.has_this
        && sig.params[0].strip_pinned_and_modifiers()
            == get_sig.return_type.strip_pinned_and_modifiers()
}

/// First field of `type_def` with the given name, in table order.
pub fn find_field(import: &dyn MetadataImport, type_def: Token, name: &str) -> Option<FieldInfo> {
    fields(import, type_def).into_iter().find(|info| info.name == name)
}

/// First method of `type_def` with the given name, in table order.
pub fn find_method(import: &dyn MetadataImport, type_def: Token, name: &str) -> Option<MethodInfo> {
    methods(import, type_def).into_iter().find(|info| info.name == name)
}

/// First validated property of `type_def` with the given name.
pub fn find_property(
    import: &dyn MetadataImport,
    type_def: Token,
    name: &str,
) -> Option<PropertyInfo> {
    properties(import, type_def).into_iter().find(|info| info.name == name)
}

/// First event of `type_def` with the given name, in table order.
pub fn find_event(import: &dyn MetadataImport, type_def: Token, name: &str) -> Option<EventInfo> {
    events(import, type_def).into_iter().find(|info| info.name == name)
}

/// The module's global static constructor: a method named `.cctor` on
/// the `<Module>` type carrying the `RTSpecialName`, `SpecialName` and
/// `Static` attributes.
pub fn global_static_constructor(import: &dyn MetadataImport) -> Option<Token> {
    const REQUIRED: MethodAttributes = MethodAttributes::RT_SPECIAL_NAME
        .union(MethodAttributes::SPECIAL_NAME)
        .union(MethodAttributes::STATIC);

    for token in import.method_tokens(GLOBAL_TYPE) {
        let Some(props) = import.method_props(token) else {
            continue;
        };
        if props.name == ".cctor" && props.flags.contains(REQUIRED) {
            return Some(token);
        }
    }
    None
}

/// Whether a method is a `ToString` override worth calling: virtual,
/// non-static, `HASTHIS` without `EXPLICITTHIS`, no parameters, no
/// generics, and a return type that is `System.String` outright. A
/// modified return type does not count, the caller wants the exact
/// override the runtime dispatches to.
#[must_use]
pub fn is_to_string(method: &MethodInfo) -> bool {
    if method.flags.contains(MethodAttributes::STATIC)
        || !method.flags.contains(MethodAttributes::VIRTUAL)
    {
        return false;
    }
    if method.name != "ToString" {
        return false;
    }

    let sig = &method.signature;
    sig.has_this
        && !sig.explicit_this
        && !sig.generic
        && !sig.has_sentinel
        && sig.generic_param_count == 0
        && sig.params.is_empty()
        && matches!(sig.return_type, TypeSig::String)
}

/// Locates the `hasValue` and `value` fields of `System.Nullable<T>`.
///
/// Returns `Some((has_value, value))` only when the type's full name is
/// ``System.Nullable`1`` and it declares exactly those two instance
/// fields with the runtime's layout: a `bool` flag first, the `T` value
/// second. Anything else is not the nullable the runtime intrinsifies.
pub fn system_nullable_fields(
    import: &dyn MetadataImport,
    type_def: Token,
) -> Option<(Token, Token)> {
    let parts = type_def_full_name(import, type_def);
    // Exactly one segment: a nested type can fake the dotted name but
    // not a top-level one.
    if parts.len() != 1 || parts[0].name != "System.Nullable`1" {
        return None;
    }

    let infos = fields(import, type_def);
    if infos.len() != 2 {
        return None;
    }
    if infos[0].name != "hasValue" || infos[1].name != "value" {
        return None;
    }
    if !matches!(
        infos[0].field_type.strip_pinned_and_modifiers(),
        TypeSig::Boolean
    ) {
        return None;
    }
    if !matches!(
        infos[1].field_type.strip_pinned_and_modifiers(),
        TypeSig::Var(0)
    ) {
        return None;
    }

    Some((infos[0].token, infos[1].token))
}

/// The underlying primitive of an enum `TypeDef`: the declared type of
/// its first non-literal, non-static field after stripping, when that
/// type is primitive.
pub fn enum_underlying_type(import: &dyn MetadataImport, type_def: Token) -> Option<TypeSig> {
    for info in fields(import, type_def) {
        if info
            .flags
            .intersects(FieldAttributes::LITERAL | FieldAttributes::STATIC)
        {
            continue;
        }

        let stripped = info.field_type.strip_pinned_and_modifiers();
        return stripped.is_primitive().then(|| stripped.clone());
    }
    None
}

/// `DebuggerBrowsable` display hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerBrowsableState {
    /// Never show this member
    Never,
    /// Show collapsed
    Collapsed,
    /// Hide the member, show its children in its place
    RootHidden,
}

/// Reads the `DebuggerBrowsableAttribute` state from a member, if the
/// attribute is present and its blob is the fixed 8-byte shape: u16
/// prolog of 1, the i32 state, a u16 named-argument count of 0.
pub fn debugger_browsable_state(
    import: &dyn MetadataImport,
    owner: Token,
) -> Option<DebuggerBrowsableState> {
    let blob = import.custom_attribute_blob(owner, DEBUGGER_BROWSABLE_ATTRIBUTE)?;
    if blob.len() != 8 {
        return None;
    }

    let mut parser = Parser::new(&blob);
    if parser.read_le::<u16>().ok()? != 1 {
        return None;
    }
    let state = parser.read_le::<i32>().ok()?;
    if parser.read_le::<u16>().ok()? != 0 {
        return None;
    }

    match state {
        0 => Some(DebuggerBrowsableState::Never),
        2 => Some(DebuggerBrowsableState::Collapsed),
        3 => Some(DebuggerBrowsableState::RootHidden),
        _ => None,
    }
}

/// Whether the member carries `CompilerGeneratedAttribute`.
pub fn is_compiler_generated(import: &dyn MetadataImport, owner: Token) -> bool {
    import
        .custom_attribute_blob(owner, COMPILER_GENERATED_ATTRIBUTE)
        .is_some()
}
