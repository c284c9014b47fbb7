//! Intermediate representation for extracted types and services.
//!
//! Every provider normalizes host declarations to this IR, and every emitter
//! reads it. The serialized form (see [`Schema::to_json`]) is a versioned
//! interchange format that external tooling may consume directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the interchange encoding produced by [`Schema::to_json`].
pub const IR_VERSION: u32 = 1;

/// Identifies a named type. Built-ins use an empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl TypeId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Qualified form used in diagnostics (`namespace.Name`).
    pub fn qualified(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Documentation attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Documentation {
    pub summary: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

impl Documentation {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.body.is_empty() && self.deprecated.is_none()
    }
}

/// Where a declaration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A type descriptor.
///
/// The set is closed: named variants (`Record`, `Alias`, `Enum`) live in
/// [`Schema::types`]; the remaining expression variants only appear inside
/// other descriptors and carry no name, docs or source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeDescriptor {
    Record(RecordType),
    Alias(AliasType),
    Enum(EnumType),
    Primitive(Primitive),
    Array {
        elem: Box<TypeDescriptor>,
        /// 0 = growable, >0 = fixed length.
        #[serde(default)]
        len: u64,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Reference(TypeId),
    /// Present on the wire but possibly `null`.
    Pointer {
        elem: Box<TypeDescriptor>,
    },
    /// Only legal inside a type-parameter constraint.
    Union {
        members: Vec<TypeDescriptor>,
    },
    TypeParameter(TypeParam),
}

/// A struct-like declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordType {
    pub id: TypeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

/// A named alias for a type expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasType {
    pub id: TypeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_params: Vec<TypeParam>,
    pub underlying: Box<TypeDescriptor>,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

/// A closed set of literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    pub id: TypeId,
    pub members: Vec<EnumMember>,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
}

/// Enum values are restricted to exactly these three runtime types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Int(i64),
    Float(f64),
}

impl EnumValue {
    pub fn is_string(&self) -> bool {
        matches!(self, EnumValue::String(_))
    }
}

impl fmt::Display for EnumValue {
    /// Renders the value as a JavaScript literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::String(s) => write!(f, "{}", quote(s)),
            EnumValue::Int(i) => write!(f, "{}", i),
            EnumValue::Float(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    Time,
    Duration,
    Any,
    Empty,
}

impl PrimitiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Uint => "uint",
            PrimitiveKind::Float => "float",
            PrimitiveKind::String => "string",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Duration => "duration",
            PrimitiveKind::Any => "any",
            PrimitiveKind::Empty => "empty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "bool" => PrimitiveKind::Bool,
            "int" => PrimitiveKind::Int,
            "uint" => PrimitiveKind::Uint,
            "float" => PrimitiveKind::Float,
            "string" => PrimitiveKind::String,
            "bytes" => PrimitiveKind::Bytes,
            "time" => PrimitiveKind::Time,
            "duration" => PrimitiveKind::Duration,
            "any" => PrimitiveKind::Any,
            "empty" => PrimitiveKind::Empty,
            _ => return None,
        })
    }

    /// Kinds that may carry the wire-level string encoding.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Bool
                | PrimitiveKind::Int
                | PrimitiveKind::Uint
                | PrimitiveKind::Float
                | PrimitiveKind::String
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int | PrimitiveKind::Uint | PrimitiveKind::Float
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    #[serde(rename = "primitiveKind")]
    pub kind: PrimitiveKind,
    /// Bit width for numeric kinds; 0 means unbounded/platform-sized.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bit_size: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Box<TypeDescriptor>>,
}

/// A record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub wire_name: String,
    /// May be absent from the payload.
    #[serde(default)]
    pub optional: bool,
    /// Scalar carried as a JSON string on the wire.
    #[serde(default)]
    pub string_encoded: bool,
    /// Never serialized.
    #[serde(default)]
    pub skip: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_validation_tag: String,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
}

/// A single callable method of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    /// `Service.Method`
    pub full_name: String,
    pub http_verb: String,
    /// `/Service/Method`
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<TypeDescriptor>,
    pub response: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub doc: Documentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// A validation rule no flavor knows how to translate.
    UnsupportedValidationRule,
    /// A foreign or unknown type was replaced by `any`.
    UnresolvedType,
    /// Enum members cannot be recovered by the selected provider.
    EnumMembersUnavailable,
    /// A constant could not be evaluated to an enum value.
    EnumMemberSkipped,
    /// A host construct (channel, function, ...) with no wire form.
    UnsupportedType,
}

impl WarningCode {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningCode::UnsupportedValidationRule => "unsupported_validation_rule",
            WarningCode::UnresolvedType => "unresolved_type",
            WarningCode::EnumMembersUnavailable => "enum_members_unavailable",
            WarningCode::EnumMemberSkipped => "enum_member_skipped",
            WarningCode::UnsupportedType => "unsupported_type",
        }
    }
}

/// A non-fatal diagnostic from extraction or emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            type_name: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code.as_str())?;
        if let Some(loc) = &self.location {
            write!(f, "{}: ", loc)?;
        }
        f.write_str(&self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("only record, alias and enum descriptors can be added as named types (got {0})")]
    Unnamed(&'static str),
    #[error("unsupported IR version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("invalid IR document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// All named types and services for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub types: Vec<TypeDescriptor>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            version: IR_VERSION,
            types: Vec::new(),
            services: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named type. Duplicates are kept so validation can report them.
    pub fn add_type(&mut self, ty: TypeDescriptor) -> Result<(), SchemaError> {
        if ty.type_id().is_none() {
            return Err(SchemaError::Unnamed(ty.kind_name()));
        }
        self.types.push(ty);
        Ok(())
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn find_type(&self, id: &TypeId) -> Option<&TypeDescriptor> {
        self.types.iter().find(|t| t.type_id() == Some(id))
    }

    pub fn contains_type(&self, id: &TypeId) -> bool {
        self.find_type(id).is_some()
    }

    pub fn find_service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(input)?;
        if schema.version != IR_VERSION {
            return Err(SchemaError::Version {
                found: schema.version,
                expected: IR_VERSION,
            });
        }
        Ok(schema)
    }
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(Primitive { kind, bit_size: 0 })
    }

    pub fn sized(kind: PrimitiveKind, bit_size: u8) -> Self {
        TypeDescriptor::Primitive(Primitive { kind, bit_size })
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn any() -> Self {
        Self::primitive(PrimitiveKind::Any)
    }

    pub fn reference(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeDescriptor::Reference(TypeId::new(namespace, name))
    }

    pub fn array(elem: TypeDescriptor) -> Self {
        TypeDescriptor::Array {
            elem: Box::new(elem),
            len: 0,
        }
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn pointer(elem: TypeDescriptor) -> Self {
        TypeDescriptor::Pointer {
            elem: Box::new(elem),
        }
    }

    /// The pointer-to-empty marker used for endpoints with no response body.
    pub fn null_response() -> Self {
        Self::pointer(Self::primitive(PrimitiveKind::Empty))
    }

    pub fn is_null_response(&self) -> bool {
        matches!(self, TypeDescriptor::Pointer { elem }
            if matches!(elem.as_ref(), TypeDescriptor::Primitive(p) if p.kind == PrimitiveKind::Empty))
    }

    pub fn type_id(&self) -> Option<&TypeId> {
        match self {
            TypeDescriptor::Record(r) => Some(&r.id),
            TypeDescriptor::Alias(a) => Some(&a.id),
            TypeDescriptor::Enum(e) => Some(&e.id),
            _ => None,
        }
    }

    pub fn doc(&self) -> Option<&Documentation> {
        match self {
            TypeDescriptor::Record(r) => Some(&r.doc),
            TypeDescriptor::Alias(a) => Some(&a.doc),
            TypeDescriptor::Enum(e) => Some(&e.doc),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        match self {
            TypeDescriptor::Record(r) => r.source.as_ref(),
            TypeDescriptor::Alias(a) => a.source.as_ref(),
            TypeDescriptor::Enum(e) => e.source.as_ref(),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Record(_) => "record",
            TypeDescriptor::Alias(_) => "alias",
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Primitive(_) => "primitive",
            TypeDescriptor::Array { .. } => "array",
            TypeDescriptor::Map { .. } => "map",
            TypeDescriptor::Reference(_) => "reference",
            TypeDescriptor::Pointer { .. } => "pointer",
            TypeDescriptor::Union { .. } => "union",
            TypeDescriptor::TypeParameter(_) => "typeParameter",
        }
    }

    /// Strip any number of pointer layers.
    pub fn deref(&self) -> &TypeDescriptor {
        let mut ty = self;
        while let TypeDescriptor::Pointer { elem } = ty {
            ty = elem;
        }
        ty
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDescriptor::Pointer { .. })
    }

    /// Growable array or map.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Array { len: 0, .. } | TypeDescriptor::Map { .. }
        )
    }

    /// Scalar primitive, looking through pointer layers.
    pub fn scalar_kind(&self) -> Option<PrimitiveKind> {
        match self.deref() {
            TypeDescriptor::Primitive(p) if p.kind.is_scalar() => Some(p.kind),
            _ => None,
        }
    }

    /// Visit every descriptor reachable from this one, including itself.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeDescriptor)) {
        visit(self);
        match self {
            TypeDescriptor::Record(r) => {
                for p in &r.type_params {
                    p.walk_constraint(visit);
                }
                for f in &r.fields {
                    f.ty.walk(visit);
                }
            }
            TypeDescriptor::Alias(a) => {
                for p in &a.type_params {
                    p.walk_constraint(visit);
                }
                a.underlying.walk(visit);
            }
            TypeDescriptor::Array { elem, .. } | TypeDescriptor::Pointer { elem } => {
                elem.walk(visit)
            }
            TypeDescriptor::Map { key, value } => {
                key.walk(visit);
                value.walk(visit);
            }
            TypeDescriptor::Union { members } => {
                for m in members {
                    m.walk(visit);
                }
            }
            TypeDescriptor::TypeParameter(p) => p.walk_constraint(visit),
            TypeDescriptor::Enum(_)
            | TypeDescriptor::Primitive(_)
            | TypeDescriptor::Reference(_) => {}
        }
    }

    /// Every referenced type id, in traversal order.
    pub fn references(&self) -> Vec<&TypeId> {
        let mut out = Vec::new();
        self.walk(&mut |t| {
            if let TypeDescriptor::Reference(id) = t {
                out.push(id);
            }
        });
        out
    }
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn constrained(name: impl Into<String>, constraint: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            constraint: Some(Box::new(constraint)),
        }
    }

    fn walk_constraint<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeDescriptor)) {
        if let Some(c) = &self.constraint {
            c.walk(visit);
        }
    }
}

impl RecordType {
    pub fn new(id: TypeId, fields: Vec<Field>) -> Self {
        Self {
            id,
            type_params: Vec::new(),
            fields,
            extends: Vec::new(),
            doc: Documentation::default(),
            source: None,
        }
    }
}

impl AliasType {
    pub fn new(id: TypeId, underlying: TypeDescriptor) -> Self {
        Self {
            id,
            type_params: Vec::new(),
            underlying: Box::new(underlying),
            doc: Documentation::default(),
            source: None,
        }
    }
}

impl EnumType {
    pub fn new(id: TypeId, members: Vec<EnumMember>) -> Self {
        Self {
            id,
            members,
            doc: Documentation::default(),
            source: None,
        }
    }
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: EnumValue) -> Self {
        Self {
            name: name.into(),
            value,
            doc: Documentation::default(),
        }
    }
}

impl Field {
    /// A required field whose wire name equals its name.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            ty,
            optional: false,
            string_encoded: false,
            skip: false,
            raw_validation_tag: String::new(),
            doc: Documentation::default(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn string_encoded(mut self) -> Self {
        self.string_encoded = true;
        self
    }

    pub fn validate(mut self, tag: impl Into<String>) -> Self {
        self.raw_validation_tag = tag.into();
        self
    }

    pub fn with_doc(mut self, doc: Documentation) -> Self {
        self.doc = doc;
        self
    }
}

/// Quote a string as a JavaScript string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_schema_programmatically() {
        let mut schema = Schema::new();
        let models = "example.com/app/models";

        schema
            .add_type(TypeDescriptor::Enum(EnumType::new(
                TypeId::new(models, "Status"),
                vec![
                    EnumMember::new("StatusActive", EnumValue::String("active".into())),
                    EnumMember::new("StatusDone", EnumValue::String("done".into())),
                ],
            )))
            .unwrap();
        schema
            .add_type(TypeDescriptor::Record(RecordType::new(
                TypeId::new(models, "User"),
                vec![
                    Field::new("ID", TypeDescriptor::sized(PrimitiveKind::Int, 64)),
                    Field::new("Status", TypeDescriptor::reference(models, "Status")),
                ],
            )))
            .unwrap();

        assert_eq!(schema.types.len(), 2);
        assert!(schema.contains_type(&TypeId::new(models, "User")));
        assert!(!schema.contains_type(&TypeId::new("other", "User")));
    }

    #[test]
    fn expression_variants_are_not_named_types() {
        let mut schema = Schema::new();
        let err = schema.add_type(TypeDescriptor::string()).unwrap_err();
        assert!(matches!(err, SchemaError::Unnamed("primitive")));
    }

    #[test]
    fn interchange_encoding_uses_kind_discriminant() {
        let ty = TypeDescriptor::sized(PrimitiveKind::Int, 32);
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "primitive", "primitiveKind": "int", "bitSize": 32 })
        );

        let reference = TypeDescriptor::reference("example.com/app/models", "User");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "reference", "name": "User", "namespace": "example.com/app/models" })
        );
    }

    #[test]
    fn interchange_rejects_other_versions() {
        let doc = r#"{ "version": 99, "types": [] }"#;
        assert!(matches!(
            Schema::from_json(doc),
            Err(SchemaError::Version { found: 99, .. })
        ));
    }

    #[test]
    fn enum_values_keep_their_runtime_type() {
        let members: Vec<EnumValue> = serde_json::from_str(r#"["a", 3, 1.5]"#).unwrap();
        assert_eq!(
            members,
            vec![
                EnumValue::String("a".into()),
                EnumValue::Int(3),
                EnumValue::Float(1.5)
            ]
        );
    }

    #[test]
    fn null_response_marker() {
        assert!(TypeDescriptor::null_response().is_null_response());
        assert!(!TypeDescriptor::pointer(TypeDescriptor::string()).is_null_response());
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("a\"b\\c\n"), r#""a\"b\\c\n""#);
    }
}
