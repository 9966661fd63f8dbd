use std::collections::HashMap;

use crate::metadata::{
    import::{
        AssemblyProps, EventProps, FieldAttributes, FieldProps, MetadataImport, MethodAttributes,
        MethodProps, ParamProps, PropertyProps, ScopeProps, TypeDefProps, TypeRefProps,
    },
    token::Token,
};

// Scriptable in-memory metadata. Tests fill the maps they care about,
// everything else reads as absent, which is exactly how a failed native
// call surfaces.
#[derive(Default)]
pub struct MockMetadata {
    pub scope: Option<ScopeProps>,
    pub assembly: Option<AssemblyProps>,
    pub type_defs: HashMap<Token, TypeDefProps>,
    pub type_refs: HashMap<Token, TypeRefProps>,
    pub enclosing: HashMap<Token, Token>,
    pub fields: HashMap<Token, Vec<Token>>,
    pub methods: HashMap<Token, Vec<Token>>,
    pub properties: HashMap<Token, Vec<Token>>,
    pub events: HashMap<Token, Vec<Token>>,
    pub params: HashMap<Token, Vec<Token>>,
    pub field_props: HashMap<Token, FieldProps>,
    pub method_props: HashMap<Token, MethodProps>,
    pub property_props: HashMap<Token, PropertyProps>,
    pub event_props: HashMap<Token, EventProps>,
    pub param_props: HashMap<Token, ParamProps>,
    pub generic_counts: HashMap<Token, u32>,
    pub attributes: HashMap<(Token, String), Vec<u8>>,
}

impl MockMetadata {
    pub fn new() -> Self {
        MockMetadata::default()
    }

    pub fn add_type_def(&mut self, token: Token, name: &str, extends: Token) {
        self.type_defs.insert(
            token,
            TypeDefProps {
                name: name.to_string(),
                flags: 0,
                extends,
            },
        );
    }

    pub fn add_type_ref(&mut self, token: Token, name: &str, scope: Token) {
        self.type_refs.insert(
            token,
            TypeRefProps {
                name: name.to_string(),
                scope,
            },
        );
    }

    pub fn add_field(
        &mut self,
        owner: Token,
        token: Token,
        name: &str,
        flags: FieldAttributes,
        signature: &[u8],
    ) {
        self.fields.entry(owner).or_default().push(token);
        self.field_props.insert(
            token,
            FieldProps {
                name: name.to_string(),
                flags,
                signature: signature.to_vec(),
                constant: None,
            },
        );
    }

    pub fn add_method(
        &mut self,
        owner: Token,
        token: Token,
        name: &str,
        flags: MethodAttributes,
        signature: &[u8],
    ) {
        self.methods.entry(owner).or_default().push(token);
        self.method_props.insert(
            token,
            MethodProps {
                name: name.to_string(),
                flags,
                impl_flags: 0,
                signature: signature.to_vec(),
            },
        );
    }

    pub fn add_property(
        &mut self,
        owner: Token,
        token: Token,
        name: &str,
        getter: Token,
        setter: Token,
    ) {
        self.properties.entry(owner).or_default().push(token);
        self.property_props.insert(
            token,
            PropertyProps {
                name: name.to_string(),
                flags: 0,
                getter,
                setter,
            },
        );
    }

    pub fn add_event(&mut self, owner: Token, token: Token, name: &str, event_type: Token) {
        self.events.entry(owner).or_default().push(token);
        self.event_props.insert(
            token,
            EventProps {
                name: name.to_string(),
                flags: 0,
                event_type,
                add: Token::new(0),
                remove: Token::new(0),
                fire: Token::new(0),
            },
        );
    }

    pub fn add_attribute(&mut self, owner: Token, name: &str, blob: &[u8]) {
        self.attributes
            .insert((owner, name.to_string()), blob.to_vec());
    }
}

impl MetadataImport for MockMetadata {
    fn scope_props(&self) -> Option<ScopeProps> {
        self.scope.clone()
    }

    fn is_valid_token(&self, token: Token) -> bool {
        self.type_defs.contains_key(&token)
            || self.type_refs.contains_key(&token)
            || self.field_props.contains_key(&token)
            || self.method_props.contains_key(&token)
            || self.property_props.contains_key(&token)
            || self.event_props.contains_key(&token)
            || self.param_props.contains_key(&token)
    }

    fn type_def_props(&self, token: Token) -> Option<TypeDefProps> {
        self.type_defs.get(&token).cloned()
    }

    fn type_ref_props(&self, token: Token) -> Option<TypeRefProps> {
        self.type_refs.get(&token).cloned()
    }

    fn enclosing_type(&self, nested: Token) -> Option<Token> {
        self.enclosing.get(&nested).copied()
    }

    fn field_tokens(&self, type_def: Token) -> Vec<Token> {
        self.fields.get(&type_def).cloned().unwrap_or_default()
    }

    fn method_tokens(&self, type_def: Token) -> Vec<Token> {
        self.methods.get(&type_def).cloned().unwrap_or_default()
    }

    fn property_tokens(&self, type_def: Token) -> Vec<Token> {
        self.properties.get(&type_def).cloned().unwrap_or_default()
    }

    fn event_tokens(&self, type_def: Token) -> Vec<Token> {
        self.events.get(&type_def).cloned().unwrap_or_default()
    }

    fn param_tokens(&self, method: Token) -> Vec<Token> {
        self.params.get(&method).cloned().unwrap_or_default()
    }

    fn field_props(&self, token: Token) -> Option<FieldProps> {
        self.field_props.get(&token).cloned()
    }

    fn method_props(&self, token: Token) -> Option<MethodProps> {
        self.method_props.get(&token).cloned()
    }

    fn property_props(&self, token: Token) -> Option<PropertyProps> {
        self.property_props.get(&token).cloned()
    }

    fn event_props(&self, token: Token) -> Option<EventProps> {
        self.event_props.get(&token).cloned()
    }

    fn param_props(&self, token: Token) -> Option<ParamProps> {
        self.param_props.get(&token).cloned()
    }

    fn generic_param_count(&self, token: Token) -> u32 {
        self.generic_counts.get(&token).copied().unwrap_or(0)
    }

    fn custom_attribute_blob(&self, owner: Token, attribute_name: &str) -> Option<Vec<u8>> {
        self.attributes
            .get(&(owner, attribute_name.to_string()))
            .cloned()
    }

    fn assembly_props(&self) -> Option<AssemblyProps> {
        self.assembly.clone()
    }
}
