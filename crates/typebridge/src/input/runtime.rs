//! Shallow extraction from a runtime type catalog.
//!
//! The catalog is what a running host process can report about its own types
//! through reflection: concrete shapes, struct tags, and instantiated generic
//! names. Declarations, comments and constant sets are not visible, so named
//! scalar types become aliases and an `enum_members_unavailable` warning is
//! recorded for each.

use super::{
    Provider, ProviderError, TypeMappings, TypeRef, check_inputs, collapse_container_pointer,
    instance_id, name_clash, synthetic_name, tags::FieldTags, unresolved,
};
use crate::ir::{
    AliasType, Field, PrimitiveKind, RecordType, Schema, TypeDescriptor, TypeId, Warning,
    WarningCode,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

/// Reflected shape of a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuntimeType {
    Bool,
    Int {
        #[serde(default)]
        bits: u8,
    },
    Uint {
        #[serde(default)]
        bits: u8,
    },
    Float {
        #[serde(default)]
        bits: u8,
    },
    String,
    Interface,
    Slice {
        elem: Box<RuntimeType>,
    },
    Array {
        len: u64,
        elem: Box<RuntimeType>,
    },
    Map {
        key: Box<RuntimeType>,
        value: Box<RuntimeType>,
    },
    Pointer {
        elem: Box<RuntimeType>,
    },
    Struct {
        #[serde(default)]
        fields: Vec<RuntimeField>,
    },
    /// Reference to a catalog entry (or a mapped foreign type).
    Named {
        package: String,
        name: String,
    },
    /// Channels, functions, complex numbers.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: RuntimeType,
    #[serde(default)]
    pub tag: String,
    /// Embedded field.
    #[serde(default)]
    pub anonymous: bool,
}

/// A named type as reported by reflection. Instantiated generics carry their
/// full reflected name, e.g. `Page[example.com/app/models.User]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRuntimeType {
    pub package: String,
    pub name: String,
    pub underlying: RuntimeType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCatalog {
    pub types: Vec<NamedRuntimeType>,
}

impl TypeCatalog {
    pub fn from_json(input: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(input).map_err(|e| ProviderError::Parse {
            path: "<catalog>".into(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn get(&self, package: &str, name: &str) -> Option<&NamedRuntimeType> {
        self.types
            .iter()
            .find(|t| t.package == package && t.name == name)
    }
}

/// Identifier for a reflected name; instantiations are named by
/// [`instance_id`] exactly as the deep provider names them.
fn catalog_id(package: &str, name: &str) -> TypeId {
    if !name.contains('[') {
        return TypeId::new(package, name);
    }
    match name.parse::<TypeRef>() {
        Ok(TypeRef::Named { name, args, .. }) => instance_id(package, &name, &args),
        _ => TypeId::new(package, synthetic_name(name)),
    }
}

/// Provider that walks a [`TypeCatalog`].
#[derive(Debug, Clone)]
pub struct RuntimeProvider {
    catalog: TypeCatalog,
    mappings: TypeMappings,
}

impl RuntimeProvider {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            mappings: TypeMappings::default(),
        }
    }

    pub fn with_mappings(mut self, mappings: TypeMappings) -> Self {
        self.mappings = mappings;
        self
    }
}

impl Provider for RuntimeProvider {
    fn name(&self) -> &'static str {
        "shallow"
    }

    fn build_schema(&self, roots: &[TypeRef], scope: &[String]) -> Result<Schema, ProviderError> {
        check_inputs(roots, scope)?;

        let mut walker = Walker {
            catalog: &self.catalog,
            mappings: &self.mappings,
            schema: Schema::new(),
            queued: BTreeSet::new(),
            claimed: BTreeMap::new(),
            queue: VecDeque::new(),
            warned: BTreeSet::new(),
            namespace: String::new(),
        };

        for namespace in scope {
            let mut found = false;
            for t in self.catalog.types.iter().filter(|t| &t.package == namespace) {
                found = true;
                walker.enqueue(&t.package, &t.name)?;
            }
            if !found {
                return Err(ProviderError::Resolution {
                    identifier: namespace.clone(),
                });
            }
        }
        for root in roots {
            walker.require(root)?;
        }

        while let Some((package, name)) = walker.queue.pop_front() {
            walker.emit(&package, &name)?;
        }
        tracing::debug!(
            types = walker.schema.types.len(),
            warnings = walker.schema.warnings.len(),
            "shallow extraction finished"
        );
        Ok(walker.schema)
    }
}

struct Walker<'c> {
    catalog: &'c TypeCatalog,
    mappings: &'c TypeMappings,
    schema: Schema,
    queued: BTreeSet<TypeId>,
    /// Reflected name that first claimed each instantiation id.
    claimed: BTreeMap<TypeId, String>,
    queue: VecDeque<(String, String)>,
    warned: BTreeSet<String>,
    /// Package of the type being emitted; anonymous structs are placed here.
    namespace: String,
}

impl Walker<'_> {
    fn enqueue(&mut self, package: &str, name: &str) -> Result<TypeId, ProviderError> {
        let id = catalog_id(package, name);
        let reflected = format!("{}.{}", package, name);
        match self.claimed.get(&id) {
            Some(first) if *first != reflected => {
                return Err(name_clash(&id, first, &reflected));
            }
            Some(_) => {}
            None => {
                self.claimed.insert(id.clone(), reflected);
            }
        }
        if self.queued.insert(id.clone()) {
            self.queue.push_back((package.to_string(), name.to_string()));
        }
        Ok(id)
    }

    fn warn(&mut self, warning: Warning) {
        if self.warned.insert(warning.to_string()) {
            self.schema.add_warning(warning);
        }
    }

    fn require(&mut self, root: &TypeRef) -> Result<(), ProviderError> {
        match root {
            TypeRef::Named {
                namespace,
                name,
                args,
            } => {
                if self.mappings.lookup(namespace, name).is_some() {
                    return Ok(());
                }
                // reflection reports `Page[pkg.T]` without the package prefix
                let reflected = TypeRef::Named {
                    namespace: String::new(),
                    name: name.clone(),
                    args: args.clone(),
                }
                .to_string();
                if self.catalog.get(namespace, &reflected).is_none() {
                    return Err(ProviderError::Resolution {
                        identifier: root.to_string(),
                    });
                }
                self.enqueue(namespace, &reflected)?;
                Ok(())
            }
            TypeRef::Pointer(inner) | TypeRef::Slice(inner) => self.require(inner),
            TypeRef::Array { elem, .. } => self.require(elem),
            TypeRef::Map { key, value } => {
                self.require(key)?;
                self.require(value)
            }
            TypeRef::Builtin(_) => Ok(()),
            TypeRef::Param(name) => Err(ProviderError::Resolution {
                identifier: format!("{} (shallow extraction needs instantiated types)", name),
            }),
        }
    }

    fn emit(&mut self, package: &str, name: &str) -> Result<(), ProviderError> {
        let entry = self
            .catalog
            .get(package, name)
            .ok_or_else(|| ProviderError::Resolution {
                identifier: format!("{}.{}", package, name),
            })?;
        let id = catalog_id(package, name);
        self.namespace = package.to_string();

        let descriptor = match &entry.underlying {
            RuntimeType::Struct { fields } => {
                let (fields, extends) = self.lower_struct(&id, fields)?;
                let mut record = RecordType::new(id, fields);
                record.extends = extends;
                TypeDescriptor::Record(record)
            }
            other => {
                let underlying = self.lower(other, &id.name)?;
                if matches!(
                    underlying.scalar_kind(),
                    Some(PrimitiveKind::String | PrimitiveKind::Int | PrimitiveKind::Uint | PrimitiveKind::Float)
                ) {
                    self.warn(
                        Warning::new(
                            WarningCode::EnumMembersUnavailable,
                            format!(
                                "{} may be an enum, but runtime extraction cannot see its constants",
                                id.qualified()
                            ),
                        )
                        .with_type(id.name.clone()),
                    );
                }
                TypeDescriptor::Alias(AliasType::new(id, underlying))
            }
        };
        self.schema.add_type(descriptor)?;
        Ok(())
    }

    fn lower_struct(
        &mut self,
        parent: &TypeId,
        fields: &[RuntimeField],
    ) -> Result<(Vec<Field>, Vec<TypeId>), ProviderError> {
        let mut out = Vec::new();
        let mut extends = Vec::new();
        for f in fields {
            let tags = FieldTags::parse(&f.tag);
            if f.anonymous {
                if tags.json.skip {
                    continue;
                }
                if tags.json.name.is_none() && self.is_struct(&f.ty) {
                    if let TypeDescriptor::Reference(target) = self.lower(&f.ty, &f.name)?.deref() {
                        extends.push(target.clone());
                        continue;
                    }
                }
            }
            if !f.name.chars().next().is_some_and(char::is_uppercase) {
                continue;
            }
            let hint = format!("{}_{}", parent.name, f.name);
            let (ty, collapsed) = collapse_container_pointer(self.lower(&f.ty, &hint)?);
            let mut field = Field::new(f.name.clone(), ty);
            if collapsed {
                field = field.optional();
            }
            out.push(tags.apply(field));
        }
        Ok((out, extends))
    }

    fn is_struct(&self, ty: &RuntimeType) -> bool {
        match ty {
            RuntimeType::Pointer { elem } => self.is_struct(elem),
            RuntimeType::Named { package, name } => self
                .catalog
                .get(package, name)
                .is_some_and(|t| matches!(t.underlying, RuntimeType::Struct { .. })),
            _ => false,
        }
    }

    fn lower(&mut self, ty: &RuntimeType, hint: &str) -> Result<TypeDescriptor, ProviderError> {
        Ok(match ty {
            RuntimeType::Bool => TypeDescriptor::primitive(PrimitiveKind::Bool),
            RuntimeType::Int { bits } => TypeDescriptor::sized(PrimitiveKind::Int, *bits),
            RuntimeType::Uint { bits } => TypeDescriptor::sized(PrimitiveKind::Uint, *bits),
            RuntimeType::Float { bits } => TypeDescriptor::sized(PrimitiveKind::Float, *bits),
            RuntimeType::String => TypeDescriptor::string(),
            RuntimeType::Interface => TypeDescriptor::any(),
            RuntimeType::Slice { elem } => match elem.as_ref() {
                RuntimeType::Uint { bits: 8 } => TypeDescriptor::primitive(PrimitiveKind::Bytes),
                other => TypeDescriptor::array(self.lower(other, hint)?),
            },
            RuntimeType::Array { len, elem } => TypeDescriptor::Array {
                elem: Box::new(self.lower(elem, hint)?),
                len: *len,
            },
            RuntimeType::Map { key, value } => {
                TypeDescriptor::map(self.lower(key, hint)?, self.lower(value, hint)?)
            }
            RuntimeType::Pointer { elem } => TypeDescriptor::pointer(self.lower(elem, hint)?),
            RuntimeType::Struct { fields } if fields.is_empty() => {
                TypeDescriptor::primitive(PrimitiveKind::Empty)
            }
            RuntimeType::Struct { fields } => {
                let id = TypeId::new(self.namespace.clone(), synthetic_name(hint));
                if self.queued.insert(id.clone()) {
                    let (fields, extends) = self.lower_struct(&id, fields)?;
                    let mut record = RecordType::new(id.clone(), fields);
                    record.extends = extends;
                    self.schema.add_type(TypeDescriptor::Record(record))?;
                }
                TypeDescriptor::Reference(id)
            }
            RuntimeType::Named { package, name } => {
                if let Some(mapped) = self.mappings.lookup(package, name) {
                    return Ok(mapped);
                }
                if self.catalog.get(package, name).is_none() {
                    let id = catalog_id(package, name);
                    self.warn(unresolved(&id, "is missing from the runtime catalog"));
                    return Ok(TypeDescriptor::any());
                }
                TypeDescriptor::Reference(self.enqueue(package, name)?)
            }
            RuntimeType::Unsupported => {
                self.warn(
                    Warning::new(
                        WarningCode::UnsupportedType,
                        format!("{} has a type with no wire representation; emitted as any", hint),
                    )
                    .with_type(hint),
                );
                TypeDescriptor::any()
            }
        })
    }
}
