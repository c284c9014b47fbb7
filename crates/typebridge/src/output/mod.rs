//! Output emitters.
//!
//! The base emitter ([`typescript`]) writes plain type declarations; flavors
//! (see [`Flavor`](crate::traits::Flavor)) write one extra file each. All of
//! them read a validated [`Schema`] through an [`EmitContext`].

pub mod naming;
pub mod rules;
pub mod typescript;
pub mod validator;

#[cfg(feature = "backend-valibot")]
pub mod valibot;
#[cfg(feature = "backend-zod")]
pub mod zod;

pub use naming::{NamespaceFiles, TypeNamer};
pub use typescript::BaseEmitter;
pub use validator::{Dialect, ValidatorFlavor};

#[cfg(feature = "backend-valibot")]
pub use valibot::{Valibot, ValibotFlavor};
#[cfg(feature = "backend-zod")]
pub use zod::{Zod, ZodFlavor};

use crate::ir::{Documentation, Schema, TypeDescriptor, TypeId, Warning};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by typebridge. DO NOT EDIT.\n";

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error(transparent)]
    Format(#[from] std::fmt::Error),
    #[error("{0} cannot be emitted here")]
    Unsupported(String),
    #[error("reference to unknown type {0}")]
    UnknownType(TypeId),
}

/// How enums are rendered in plain type declarations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnumStyle {
    #[default]
    TaggedUnion,
    NativeEnum,
    FlatConstants,
}

/// Sentinel used for fields that may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionalType {
    /// `name?: T`
    #[default]
    Undefined,
    /// `name?: T | null`
    Null,
}

/// Which doc comments survive into generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentPolicy {
    #[default]
    All,
    TypesOnly,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub enum_style: EnumStyle,
    pub optional_type: OptionalType,
    pub comments: CommentPolicy,
    pub single_file: bool,
    pub namespace_prefix_strip: Vec<String>,
    pub emit_base_types: bool,
    /// Stem of the base file and of every flavor file.
    pub base_name: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            enum_style: EnumStyle::default(),
            optional_type: OptionalType::default(),
            comments: CommentPolicy::default(),
            single_file: true,
            namespace_prefix_strip: Vec::new(),
            emit_base_types: true,
            base_name: "types".into(),
        }
    }
}

/// A produced artifact, relative to the sink root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
}

/// Shared state for one emitter run over a frozen schema.
pub struct EmitContext<'a> {
    pub schema: &'a Schema,
    pub options: &'a EmitOptions,
    pub namer: TypeNamer,
    /// Types already written by the current emitter, in order.
    pub emitted: BTreeSet<TypeId>,
    pub warnings: Vec<Warning>,
}

impl<'a> EmitContext<'a> {
    pub fn new(schema: &'a Schema, options: &'a EmitOptions) -> Self {
        Self {
            schema,
            options,
            namer: TypeNamer::new(schema, &options.namespace_prefix_strip),
            emitted: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Emitted identifier for a type.
    pub fn name(&self, id: &TypeId) -> Result<&str, EmitError> {
        self.namer
            .get(id)
            .ok_or_else(|| EmitError::UnknownType(id.clone()))
    }

    /// Number of type parameters a named type declares.
    pub fn arity(&self, id: &TypeId) -> usize {
        match self.schema.find_type(id) {
            Some(TypeDescriptor::Record(r)) => r.type_params.len(),
            Some(TypeDescriptor::Alias(a)) => a.type_params.len(),
            _ => 0,
        }
    }

    /// Whether a reference must be deferred because its target comes later.
    pub fn is_forward(&self, id: &TypeId) -> bool {
        !self.emitted.contains(id)
    }

    pub fn type_docs(&self) -> bool {
        self.options.comments != CommentPolicy::None
    }

    pub fn member_docs(&self) -> bool {
        self.options.comments == CommentPolicy::All
    }
}

/// Render a JSDoc block at the given indentation, or nothing for empty docs.
pub fn jsdoc(doc: &Documentation, indent: &str) -> String {
    if doc.is_empty() {
        return String::new();
    }
    let mut lines: Vec<String> = Vec::new();
    if !doc.summary.is_empty() {
        lines.push(doc.summary.clone());
    }
    if !doc.body.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(doc.body.lines().map(str::to_string));
    }
    if let Some(dep) = &doc.deprecated {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("@deprecated {}", dep).trim_end().to_string());
    }

    let escape = |l: &str| l.replace("*/", "*\\/");
    if lines.len() == 1 {
        return format!("{}/** {} */\n", indent, escape(&lines[0]));
    }
    let mut out = format!("{}/**\n", indent);
    for line in &lines {
        if line.is_empty() {
            out.push_str(&format!("{} *\n", indent));
        } else {
            out.push_str(&format!("{} * {}\n", indent, escape(line)));
        }
    }
    out.push_str(&format!("{} */\n", indent));
    out
}

/// Quote an object key only when it is not a plain identifier.
pub fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let ident = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if ident {
        name.to_string()
    } else {
        crate::ir::quote(name)
    }
}

/// Named types ordered so that dependencies come first.
///
/// Roots are visited by emitted name, so the result does not depend on the
/// order a provider discovered types in. Cycles are broken at the edge that
/// closes them; emitters reference the later type in such a cycle lazily.
pub fn dependency_order<'s>(schema: &'s Schema, namer: &TypeNamer) -> Vec<&'s TypeDescriptor> {
    let index: BTreeMap<&TypeId, usize> = schema
        .types
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.type_id().map(|id| (id, i)))
        .collect();

    let mut state = vec![Visit::New; schema.types.len()];
    let mut order = Vec::with_capacity(schema.types.len());

    fn visit<'s>(
        i: usize,
        schema: &'s Schema,
        index: &BTreeMap<&TypeId, usize>,
        state: &mut [Visit],
        order: &mut Vec<&'s TypeDescriptor>,
    ) {
        if state[i] != Visit::New {
            return;
        }
        state[i] = Visit::Active;
        let ty = &schema.types[i];
        let mut deps: Vec<&TypeId> = Vec::new();
        if let TypeDescriptor::Record(r) = ty {
            deps.extend(r.extends.iter());
        }
        deps.extend(ty.references());
        for dep in deps {
            if let Some(&j) = index.get(dep) {
                visit(j, schema, index, state, order);
            }
        }
        state[i] = Visit::Done;
        order.push(ty);
    }

    let mut roots: Vec<(&str, &TypeId, usize)> = index
        .iter()
        .map(|(id, &i)| (namer.get(id).unwrap_or(id.name.as_str()), *id, i))
        .collect();
    roots.sort();
    for (_, _, i) in roots {
        visit(i, schema, &index, &mut state, &mut order);
    }
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}
