//! Shared driver for runtime-validation schema flavors.
//!
//! [`ValidatorFlavor`] walks the IR and decides what every schema is made of:
//! intrinsic numeric bounds, string coercion, rule constraints, optional and
//! nullable wrapping, lazy references. A [`Dialect`] only spells the pieces.

use super::rules::{translate_field, Constraint, StringFormat};
use super::{jsdoc, property_key, EmitContext, EmitError, OptionalType};
use crate::ir::{
    EnumValue, Field, PrimitiveKind, RecordType, TypeDescriptor, TypeId, TypeParam,
};
use crate::traits::Flavor;
use std::fmt::Write;

/// A base schema plus the refinements applied to it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub base: String,
    pub steps: Vec<String>,
}

impl Scalar {
    pub fn bare(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            steps: Vec::new(),
        }
    }
}

/// Spelling of schema constructs in one validation library.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;
    fn file_suffix(&self) -> &'static str;
    fn import(&self) -> &'static str;

    /// Unrefined schema for a primitive kind.
    fn primitive(&self, kind: PrimitiveKind) -> String;
    /// Schema accepting a JSON string and producing the scalar.
    fn coerced(&self, kind: PrimitiveKind) -> Scalar;
    fn constraint(&self, c: &Constraint) -> String;
    /// Combine a base with its refinements.
    fn finish(&self, s: Scalar) -> String;
    /// Check the wire string with `wire`, then convert it as `coerced` does.
    fn pipe(&self, wire: &str, coerced: Scalar) -> String;

    /// Literal enum; empty input must yield an uninhabited schema.
    fn literals(&self, values: &[EnumValue]) -> String;
    fn null(&self) -> String;
    fn array(&self, elem: &str) -> String;
    fn map(&self, key: &str, value: &str) -> String;
    fn union(&self, members: &[String]) -> String;
    fn nullable(&self, inner: &str) -> String;
    fn optional(&self, inner: &str) -> String;
    fn lazy(&self, target: &str) -> String;
    /// Object schema from parent schemas and pre-rendered `key: value` lines.
    fn object(&self, parents: &[String], entries: &[String]) -> String;
    /// Schema factory taking one schema argument per type parameter.
    fn generic(&self, params: &[&str], body: &str) -> String;
    /// Call a schema factory with permissive arguments.
    fn instantiate(&self, factory: &str, arity: usize) -> String;
    fn infer(&self, schema: &str) -> String;
}

/// A [`Flavor`] backed by a [`Dialect`].
pub struct ValidatorFlavor<D> {
    dialect: D,
}

impl<D: Dialect> ValidatorFlavor<D> {
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    /// Expression for an unnamed descriptor.
    pub fn expr(&self, ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Result<String, EmitError> {
        let d = &self.dialect;
        Ok(match ty {
            TypeDescriptor::Primitive(_) | TypeDescriptor::Array { .. } => {
                d.finish(self.scalar(ctx, ty)?)
            }
            TypeDescriptor::Map { key, value } => {
                let key = match key.deref() {
                    TypeDescriptor::Reference(id) if is_string_enum(ctx, id) => self.expr(ctx, key)?,
                    _ => d.primitive(PrimitiveKind::String),
                };
                d.map(&key, &self.expr(ctx, value)?)
            }
            TypeDescriptor::Reference(id) => {
                let mut target = schema_name(ctx.name(id)?);
                let arity = ctx.arity(id);
                if arity > 0 {
                    target = d.instantiate(&target, arity);
                }
                if ctx.is_forward(id) {
                    d.lazy(&target)
                } else {
                    target
                }
            }
            TypeDescriptor::Pointer { elem } => {
                if ty.is_null_response() {
                    d.null()
                } else {
                    d.nullable(&self.expr(ctx, elem)?)
                }
            }
            TypeDescriptor::Union { members } => {
                let members = members
                    .iter()
                    .map(|m| self.expr(ctx, m))
                    .collect::<Result<Vec<_>, _>>()?;
                d.union(&members)
            }
            TypeDescriptor::TypeParameter(p) => p.name.clone(),
            named => return Err(EmitError::Unsupported(format!("inline {}", named.kind_name()))),
        })
    }

    /// Primitives and arrays stay open for further refinement.
    fn scalar(&self, ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Result<Scalar, EmitError> {
        let d = &self.dialect;
        Ok(match ty {
            TypeDescriptor::Primitive(p) => Scalar {
                base: d.primitive(p.kind),
                steps: intrinsic(p.kind, p.bit_size)
                    .iter()
                    .map(|c| d.constraint(c))
                    .collect(),
            },
            TypeDescriptor::Array { elem, len } => Scalar {
                base: d.array(&self.expr(ctx, elem)?),
                steps: if *len > 0 {
                    vec![d.constraint(&Constraint::Length(*len))]
                } else {
                    Vec::new()
                },
            },
            other => Scalar::bare(self.expr(ctx, other)?),
        })
    }

    fn coerced(&self, ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Scalar {
        let d = &self.dialect;
        match resolve_primitive(ctx, ty) {
            Some((kind, bits)) if kind.is_scalar() => {
                let mut s = d.coerced(kind);
                s.steps
                    .extend(intrinsic(kind, bits).iter().map(|c| d.constraint(c)));
                s
            }
            _ => Scalar::bare(d.primitive(PrimitiveKind::String)),
        }
    }

    fn field(
        &self,
        ctx: &mut EmitContext<'_>,
        owner: &str,
        field: &Field,
    ) -> Result<String, EmitError> {
        let d = &self.dialect;
        let translation = translate_field(ctx.schema, owner, field, d.name());
        ctx.warnings.extend(translation.warnings);

        let inner = field.ty.deref();
        let nullable = field.ty.is_pointer();
        // a literal set replaces the base schema and every other constraint
        let scalar = match translation.one_of {
            Some(values) if field.string_encoded => {
                let wire: Vec<EnumValue> = values.iter().map(wire_literal).collect();
                let literals = d.literals(&wire);
                match resolve_primitive(ctx, inner) {
                    Some((kind, _)) if kind.is_scalar() && kind != PrimitiveKind::String => {
                        Scalar::bare(d.pipe(&literals, d.coerced(kind)))
                    }
                    _ => Scalar::bare(literals),
                }
            }
            Some(values) => Scalar::bare(d.literals(&values)),
            None => {
                let mut s = if field.string_encoded {
                    self.coerced(ctx, inner)
                } else {
                    self.scalar(ctx, inner)?
                };
                s.steps
                    .extend(translation.constraints.iter().map(|c| d.constraint(c)));
                s
            }
        };

        let mut out = d.finish(scalar);
        if nullable {
            out = d.nullable(&out);
        }
        if field.optional {
            if ctx.options.optional_type == OptionalType::Null && !nullable {
                out = d.nullable(&out);
            }
            out = d.optional(&out);
        }
        Ok(out)
    }

    fn record(&self, ctx: &mut EmitContext<'_>, r: &RecordType) -> Result<String, EmitError> {
        let owner = ctx.name(&r.id)?.to_string();
        let parents = r
            .extends
            .iter()
            .map(|p| ctx.name(p).map(schema_name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::new();
        for field in r.fields.iter().filter(|f| !f.skip) {
            let mut entry = String::new();
            if ctx.member_docs() {
                entry.push_str(&jsdoc(&field.doc, ""));
            }
            if field.string_encoded {
                entry.push_str("// encoded as a JSON string on the wire\n");
            }
            let value = self.field(ctx, &owner, field)?;
            write!(entry, "{}: {}", property_key(&field.wire_name), value)?;
            entries.push(entry);
        }
        Ok(self.dialect.object(&parents, &entries))
    }

    fn declare(
        &self,
        ctx: &EmitContext<'_>,
        id: &TypeId,
        params: &[TypeParam],
        doc: Option<&crate::ir::Documentation>,
        body: String,
    ) -> Result<String, EmitError> {
        let name = ctx.name(id)?;
        let schema = schema_name(name);
        let mut out = String::new();
        if let Some(doc) = doc.filter(|_| ctx.type_docs()) {
            out.push_str(&jsdoc(doc, ""));
        }
        if params.is_empty() {
            writeln!(out, "export const {} = {};", schema, body)?;
            if !ctx.options.emit_base_types {
                writeln!(out, "export type {} = {};", name, self.dialect.infer(&schema))?;
            }
        } else {
            let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            writeln!(out, "export const {} = {};", schema, self.dialect.generic(&names, &body))?;
        }
        Ok(out)
    }
}

impl<D: Dialect> Flavor for ValidatorFlavor<D> {
    fn name(&self) -> &'static str {
        self.dialect.name()
    }

    fn file_suffix(&self) -> &'static str {
        self.dialect.file_suffix()
    }

    fn emits_inferred_types(&self) -> bool {
        true
    }

    fn emit_preamble(&self, _ctx: &EmitContext<'_>) -> Result<String, EmitError> {
        Ok(format!("{}\n", self.dialect.import()))
    }

    fn emit_type(
        &self,
        ctx: &mut EmitContext<'_>,
        ty: &TypeDescriptor,
    ) -> Result<String, EmitError> {
        match ty {
            TypeDescriptor::Record(r) => {
                let body = self.record(ctx, r)?;
                self.declare(ctx, &r.id, &r.type_params, Some(&r.doc), body)
            }
            TypeDescriptor::Alias(a) => {
                let body = self.expr(ctx, &a.underlying)?;
                self.declare(ctx, &a.id, &a.type_params, Some(&a.doc), body)
            }
            TypeDescriptor::Enum(e) => {
                let values: Vec<EnumValue> = e.members.iter().map(|m| m.value.clone()).collect();
                let body = self.dialect.literals(&values);
                self.declare(ctx, &e.id, &[], Some(&e.doc), body)
            }
            other => Err(EmitError::Unsupported(other.kind_name().to_string())),
        }
    }

    /// `endpoints`: request and response schema per `"Service.Method"`.
    fn emit_services(&self, ctx: &mut EmitContext<'_>) -> Result<String, EmitError> {
        let mut out = String::new();
        let endpoints: Vec<_> = ctx
            .schema
            .services
            .iter()
            .flat_map(|s| s.endpoints.iter())
            .collect();
        if endpoints.is_empty() {
            return Ok(out);
        }
        writeln!(out, "export const endpoints = {{")?;
        for ep in endpoints {
            let request = match &ep.request {
                Some(req) => self.expr(ctx, req)?,
                None => "null".to_string(),
            };
            let response = self.expr(ctx, &ep.response)?;
            writeln!(
                out,
                "  {}: {{ request: {}, response: {} }},",
                crate::ir::quote(&ep.full_name),
                request,
                response
            )?;
        }
        writeln!(out, "}} as const;")?;
        Ok(out)
    }
}

pub(crate) fn schema_name(type_name: &str) -> String {
    format!("{}Schema", type_name)
}

/// Bounds implied by a primitive's kind and width.
fn intrinsic(kind: PrimitiveKind, bits: u8) -> Vec<Constraint> {
    match kind {
        PrimitiveKind::Int if (1..=32).contains(&bits) => {
            let half = 1i64 << (bits - 1);
            vec![
                Constraint::Integer,
                Constraint::Min(-half as f64),
                Constraint::Max((half - 1) as f64),
            ]
        }
        PrimitiveKind::Uint if (1..=32).contains(&bits) => vec![
            Constraint::Integer,
            Constraint::NonNegative,
            Constraint::Max(((1i64 << bits) - 1) as f64),
        ],
        PrimitiveKind::Int | PrimitiveKind::Duration => vec![Constraint::Integer],
        PrimitiveKind::Uint => vec![Constraint::Integer, Constraint::NonNegative],
        PrimitiveKind::Time => vec![Constraint::Format(StringFormat::Datetime)],
        PrimitiveKind::Bytes => vec![Constraint::Format(StringFormat::Base64)],
        _ => Vec::new(),
    }
}

/// Primitive kind and width behind a type, through pointers and aliases.
/// A literal as it appears inside a string-encoded JSON value.
fn wire_literal(value: &EnumValue) -> EnumValue {
    match value {
        EnumValue::String(s) => EnumValue::String(s.clone()),
        EnumValue::Int(i) => EnumValue::String(i.to_string()),
        EnumValue::Float(f) => EnumValue::String(f.to_string()),
    }
}

fn resolve_primitive(ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Option<(PrimitiveKind, u8)> {
    let mut current = ty.deref();
    for _ in 0..16 {
        match current {
            TypeDescriptor::Primitive(p) => return Some((p.kind, p.bit_size)),
            TypeDescriptor::Reference(id) => match ctx.schema.find_type(id) {
                Some(TypeDescriptor::Alias(a)) => current = a.underlying.deref(),
                _ => return None,
            },
            _ => return None,
        }
    }
    None
}

fn is_string_enum(ctx: &EmitContext<'_>, id: &TypeId) -> bool {
    matches!(ctx.schema.find_type(id), Some(TypeDescriptor::Enum(e))
        if !e.members.is_empty() && e.members.iter().all(|m| m.value.is_string()))
}

/// Regex literal body with `/` escaped.
pub(crate) fn regex_literal(source: &str) -> String {
    format!("/{}/", source.replace('/', "\\/"))
}

/// Indent every line of a multi-line entry by two spaces.
pub(crate) fn indent_entry(entry: &str) -> String {
    entry
        .lines()
        .map(|l| format!("  {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_bounds_by_width() {
        assert_eq!(
            intrinsic(PrimitiveKind::Int, 8),
            vec![Constraint::Integer, Constraint::Min(-128.0), Constraint::Max(127.0)]
        );
        assert_eq!(
            intrinsic(PrimitiveKind::Uint, 8),
            vec![Constraint::Integer, Constraint::NonNegative, Constraint::Max(255.0)]
        );
        assert_eq!(
            intrinsic(PrimitiveKind::Uint, 32),
            vec![
                Constraint::Integer,
                Constraint::NonNegative,
                Constraint::Max(4294967295.0)
            ]
        );
        assert_eq!(intrinsic(PrimitiveKind::Int, 64), vec![Constraint::Integer]);
        assert_eq!(intrinsic(PrimitiveKind::Int, 0), vec![Constraint::Integer]);
        assert!(intrinsic(PrimitiveKind::Float, 64).is_empty());
    }

    #[test]
    fn regex_slashes_are_escaped() {
        assert_eq!(regex_literal("^a/b$"), "/^a\\/b$/");
    }
}
