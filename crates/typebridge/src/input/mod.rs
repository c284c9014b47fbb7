//! Extraction providers.
//!
//! A [`Provider`] turns a set of root types plus a search scope into an IR
//! [`Schema`](crate::ir::Schema). Two strategies exist:
//!
//! - [`GoSourceProvider`] (deep) parses Go declarations and recovers enums,
//!   doc comments and generic parameters.
//! - [`RuntimeProvider`] (shallow) walks an already-instantiated runtime type
//!   catalog; it is fast but cannot see enum members or comments.
//!
//! Both name generic instantiations through [`naming::instance_id`].

#[cfg(feature = "input-go")]
pub mod golang;
pub mod naming;
pub mod runtime;
pub mod tags;

#[cfg(feature = "input-go")]
pub use golang::GoSourceProvider;
pub use naming::{instance_id, synthetic_name};
pub use runtime::{RuntimeProvider, TypeCatalog};

use crate::ir::{PrimitiveKind, Schema, SchemaError, TypeDescriptor, TypeId, Warning, WarningCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cannot resolve {identifier}")]
    Resolution { identifier: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid type reference {input:?}: {message}")]
    TypeRef { input: String, message: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Strategy that extracts a schema from host type definitions.
pub trait Provider {
    /// Short identifier used in logs ("deep", "shallow").
    fn name(&self) -> &'static str;

    /// Build a schema containing every type reachable from `roots`.
    ///
    /// Empty `roots` and `scope` together are a configuration error; a root
    /// or scope entry that cannot be found is a resolution error.
    fn build_schema(&self, roots: &[TypeRef], scope: &[String]) -> Result<Schema, ProviderError>;
}

pub(crate) fn check_inputs(roots: &[TypeRef], scope: &[String]) -> Result<(), ProviderError> {
    if roots.is_empty() && scope.is_empty() {
        return Err(ProviderError::Config(
            "no root types or scope given; nothing to extract".into(),
        ));
    }
    Ok(())
}

/// A host type expression, written in Go reflection syntax
/// (`*example.com/app/models.User`, `map[string][]int`, `Page[pkg.T]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Named {
        namespace: String,
        name: String,
        args: Vec<TypeRef>,
    },
    Pointer(Box<TypeRef>),
    Slice(Box<TypeRef>),
    Array {
        len: u64,
        elem: Box<TypeRef>,
    },
    Map {
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
    Builtin(String),
    /// An unbound type parameter inside a generic declaration.
    Param(String),
}

impl TypeRef {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named {
            namespace: namespace.into(),
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn pointer(inner: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(inner))
    }

    pub fn slice(inner: TypeRef) -> Self {
        TypeRef::Slice(Box::new(inner))
    }

    /// Strip pointer layers.
    pub fn deref(&self) -> &TypeRef {
        let mut r = self;
        while let TypeRef::Pointer(inner) = r {
            r = inner;
        }
        r
    }

    /// Every namespace mentioned anywhere in this expression.
    pub fn collect_namespaces(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeRef::Named {
                namespace, args, ..
            } => {
                if !namespace.is_empty() {
                    out.insert(namespace.clone());
                }
                for a in args {
                    a.collect_namespaces(out);
                }
            }
            TypeRef::Pointer(inner) | TypeRef::Slice(inner) => inner.collect_namespaces(out),
            TypeRef::Array { elem, .. } => elem.collect_namespaces(out),
            TypeRef::Map { key, value } => {
                key.collect_namespaces(out);
                value.collect_namespaces(out);
            }
            TypeRef::Builtin(_) | TypeRef::Param(_) => {}
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named {
                namespace,
                name,
                args,
            } => {
                if !namespace.is_empty() {
                    write!(f, "{}.", namespace)?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("[")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    f.write_str("]")?;
                }
                Ok(())
            }
            TypeRef::Pointer(inner) => write!(f, "*{}", inner),
            TypeRef::Slice(inner) => write!(f, "[]{}", inner),
            TypeRef::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            TypeRef::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeRef::Builtin(name) | TypeRef::Param(name) => f.write_str(name),
        }
    }
}

impl FromStr for TypeRef {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = RefParser {
            input: s,
            pos: 0,
        };
        let r = parser.parse()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(r)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = ProviderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

struct RefParser<'a> {
    input: &'a str,
    pos: usize,
}

impl RefParser<'_> {
    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn error(&self, message: &str) -> ProviderError {
        ProviderError::TypeRef {
            input: self.input.to_string(),
            message: format!("{} at offset {}", message, self.pos),
        }
    }

    fn parse(&mut self) -> Result<TypeRef, ProviderError> {
        self.skip_ws();
        if self.eat("*") {
            return Ok(TypeRef::pointer(self.parse()?));
        }
        if self.eat("[]") {
            return Ok(TypeRef::slice(self.parse()?));
        }
        if self.eat("[") {
            let digits: String = self.rest().chars().take_while(char::is_ascii_digit).collect();
            let len = digits
                .parse()
                .map_err(|_| self.error("expected array length"))?;
            self.pos += digits.len();
            if !self.eat("]") {
                return Err(self.error("expected ']'"));
            }
            return Ok(TypeRef::Array {
                len,
                elem: Box::new(self.parse()?),
            });
        }
        if self.eat("map[") {
            let key = self.parse()?;
            if !self.eat("]") {
                return Err(self.error("expected ']' after map key"));
            }
            let value = self.parse()?;
            return Ok(TypeRef::Map {
                key: Box::new(key),
                value: Box::new(value),
            });
        }
        for literal in ["struct {}", "struct{}", "interface {}", "interface{}"] {
            if self.eat(literal) {
                return Ok(TypeRef::Builtin(literal.replace(' ', "")));
            }
        }

        let ident: String = self
            .rest()
            .chars()
            .take_while(|c| !matches!(c, '[' | ']' | ',' | ' '))
            .collect();
        if ident.is_empty() {
            return Err(self.error("expected a type name"));
        }
        self.pos += ident.len();

        let mut args = Vec::new();
        if self.rest().starts_with('[') {
            self.pos += 1;
            loop {
                args.push(self.parse()?);
                if self.eat(",") {
                    continue;
                }
                if self.eat("]") {
                    break;
                }
                return Err(self.error("expected ',' or ']' in type arguments"));
            }
        }

        match split_qualified(&ident) {
            Some((namespace, name)) => Ok(TypeRef::Named {
                namespace: namespace.to_string(),
                name: name.to_string(),
                args,
            }),
            None if args.is_empty() && builtin(&ident).is_some() => Ok(TypeRef::Builtin(ident)),
            None => Ok(TypeRef::Named {
                namespace: String::new(),
                name: ident,
                args,
            }),
        }
    }
}

/// Split `example.com/app/models.User` into namespace and name.
pub fn split_qualified(ident: &str) -> Option<(&str, &str)> {
    let slash = ident.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = ident[slash..].rfind('.')? + slash;
    Some((&ident[..dot], &ident[dot + 1..]))
}

/// Descriptor for a Go predeclared type.
pub fn builtin(name: &str) -> Option<TypeDescriptor> {
    use PrimitiveKind::*;
    let (kind, bits) = match name {
        "bool" => (Bool, 0),
        "string" => (String, 0),
        "int" => (Int, 0),
        "int8" => (Int, 8),
        "int16" => (Int, 16),
        "int32" | "rune" => (Int, 32),
        "int64" => (Int, 64),
        "uint" | "uintptr" => (Uint, 0),
        "uint8" | "byte" => (Uint, 8),
        "uint16" => (Uint, 16),
        "uint32" => (Uint, 32),
        "uint64" => (Uint, 64),
        "float32" => (Float, 32),
        "float64" => (Float, 64),
        "any" | "interface{}" => (Any, 0),
        "struct{}" => (Empty, 0),
        _ => return None,
    };
    Some(TypeDescriptor::sized(kind, bits))
}

/// Whether a builtin name denotes a single-byte element.
pub fn is_byte(name: &str) -> bool {
    matches!(name, "byte" | "uint8")
}

/// Override table for foreign well-known types (`time.Time` and friends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMappings {
    entries: BTreeMap<String, PrimitiveKind>,
}

impl Default for TypeMappings {
    fn default() -> Self {
        let entries = [
            ("time.Time", PrimitiveKind::Time),
            ("time.Duration", PrimitiveKind::Duration),
            ("encoding/json.RawMessage", PrimitiveKind::Any),
            ("github.com/google/uuid.UUID", PrimitiveKind::String),
            ("net/url.URL", PrimitiveKind::String),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { entries }
    }
}

impl TypeMappings {
    /// Built-in table extended (and overridden) by user entries mapping a
    /// qualified type name to a primitive kind name.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ProviderError> {
        let mut mappings = Self::default();
        for (ty, kind) in overrides {
            let parsed = PrimitiveKind::parse(kind).ok_or_else(|| {
                ProviderError::Config(format!(
                    "type mapping for {} names unknown primitive kind {:?}",
                    ty, kind
                ))
            })?;
            mappings.entries.insert(ty.clone(), parsed);
        }
        Ok(mappings)
    }

    pub fn lookup(&self, namespace: &str, name: &str) -> Option<TypeDescriptor> {
        let kind = *self.entries.get(&format!("{}.{}", namespace, name))?;
        let bits = match kind {
            PrimitiveKind::Duration => 64,
            _ => 0,
        };
        Some(TypeDescriptor::sized(kind, bits))
    }
}

/// `*[]T` and `*map[K]V` collapse to the container; absence is expressed by
/// the field's `optional` flag instead. Returns whether a collapse happened.
pub fn collapse_container_pointer(ty: TypeDescriptor) -> (TypeDescriptor, bool) {
    match ty {
        TypeDescriptor::Pointer { elem } if is_growable(&elem) => (*elem, true),
        other => (other, false),
    }
}

fn is_growable(ty: &TypeDescriptor) -> bool {
    ty.is_container()
        || matches!(ty, TypeDescriptor::Primitive(p) if p.kind == PrimitiveKind::Bytes)
}

/// Build an IR reference for a route-level type expression without consulting
/// any provider. Shares naming with the providers so the identifiers agree.
pub fn reference_for(r: &TypeRef, mappings: &TypeMappings) -> TypeDescriptor {
    match r {
        TypeRef::Named {
            namespace,
            name,
            args,
        } => mappings
            .lookup(namespace, name)
            .unwrap_or_else(|| TypeDescriptor::Reference(instance_id(namespace, name, args))),
        TypeRef::Pointer(inner) => {
            collapse_container_pointer(TypeDescriptor::pointer(reference_for(inner, mappings))).0
        }
        TypeRef::Slice(inner) => match inner.as_ref() {
            TypeRef::Builtin(b) if is_byte(b) => TypeDescriptor::primitive(PrimitiveKind::Bytes),
            _ => TypeDescriptor::array(reference_for(inner, mappings)),
        },
        TypeRef::Array { len, elem } => TypeDescriptor::Array {
            elem: Box::new(reference_for(elem, mappings)),
            len: *len,
        },
        TypeRef::Map { key, value } => {
            TypeDescriptor::map(reference_for(key, mappings), reference_for(value, mappings))
        }
        TypeRef::Builtin(name) => builtin(name).unwrap_or_else(TypeDescriptor::any),
        TypeRef::Param(name) => TypeDescriptor::TypeParameter(crate::ir::TypeParam::new(name)),
    }
}

/// Two different instantiations that synthetic naming maps to one id.
pub(crate) fn name_clash(id: &TypeId, first: &str, second: &str) -> ProviderError {
    ProviderError::Resolution {
        identifier: format!(
            "{} (named both {} and {}; their packages share a last path segment)",
            id.qualified(),
            first,
            second
        ),
    }
}

pub(crate) fn unresolved(id: &TypeId, reason: &str) -> Warning {
    Warning::new(
        WarningCode::UnresolvedType,
        format!("{} {}; emitted as any", id.qualified(), reason),
    )
    .with_type(id.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip_for_reflection_syntax() {
        for input in [
            "*example.com/app/models.User",
            "[]example.com/app/models.User",
            "map[string][]int64",
            "[16]byte",
            "example.com/app/models.Page[example.com/app/models.User]",
            "example.com/app/models.Pair[int,*example.com/app/models.User]",
            "struct{}",
        ] {
            let parsed: TypeRef = input.parse().unwrap();
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn parse_splits_namespace_at_last_dot_after_slash() {
        let parsed: TypeRef = "gopkg.in/yaml.v3.Node".parse().unwrap();
        assert_eq!(parsed, TypeRef::named("gopkg.in/yaml.v3", "Node"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("map[string".parse::<TypeRef>().is_err());
        assert!("Page[int".parse::<TypeRef>().is_err());
        assert!("".parse::<TypeRef>().is_err());
    }

    #[test]
    fn collect_namespaces_unwraps_everything() {
        let r: TypeRef = "*a.com/x.Page[map[string]b.com/y.Item]".parse().unwrap();
        let mut out = BTreeSet::new();
        r.collect_namespaces(&mut out);
        assert_eq!(
            out.into_iter().collect::<Vec<_>>(),
            vec!["a.com/x".to_string(), "b.com/y".to_string()]
        );
    }

    #[test]
    fn reference_for_collapses_pointer_to_slice() {
        let r: TypeRef = "*[]example.com/app/models.User".parse().unwrap();
        let ty = reference_for(&r, &TypeMappings::default());
        assert_eq!(
            ty,
            TypeDescriptor::array(TypeDescriptor::reference("example.com/app/models", "User"))
        );
    }

    #[test]
    fn reference_for_uses_mappings_and_bytes() {
        let mappings = TypeMappings::default();
        let t: TypeRef = "time.Time".parse().unwrap();
        assert_eq!(
            reference_for(&t, &mappings),
            TypeDescriptor::primitive(PrimitiveKind::Time)
        );
        let b: TypeRef = "[]byte".parse().unwrap();
        assert_eq!(
            reference_for(&b, &mappings),
            TypeDescriptor::primitive(PrimitiveKind::Bytes)
        );
    }

    #[test]
    fn mapping_overrides_reject_unknown_kinds() {
        let mut overrides = BTreeMap::new();
        overrides.insert("github.com/shopspring/decimal.Decimal".into(), "money".into());
        assert!(matches!(
            TypeMappings::with_overrides(&overrides),
            Err(ProviderError::Config(_))
        ));
    }

    #[test]
    fn empty_inputs_are_a_config_error() {
        assert!(matches!(check_inputs(&[], &[]), Err(ProviderError::Config(_))));
    }
}
