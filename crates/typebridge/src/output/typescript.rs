//! Plain TypeScript declarations.

use super::{
    jsdoc, property_key, EmitContext, EmitError, EnumStyle, GeneratedFile, NamespaceFiles,
    OptionalType, HEADER,
};
use crate::ir::{
    quote, AliasType, EnumType, Field, PrimitiveKind, RecordType, Service, TypeDescriptor, TypeId,
    TypeParam,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Base emitter: interfaces, aliases and enums, plus service method tables.
pub struct BaseEmitter;

impl BaseEmitter {
    pub fn emit_type(&self, ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Result<String, EmitError> {
        let mut w = DeclWriter {
            ctx,
            output: String::new(),
        };
        match ty {
            TypeDescriptor::Record(r) => w.record(r)?,
            TypeDescriptor::Alias(a) => w.alias(a)?,
            TypeDescriptor::Enum(e) => w.enumeration(e)?,
            other => return Err(EmitError::Unsupported(other.kind_name().to_string())),
        }
        Ok(w.output)
    }

    /// Service interfaces and the `routes` table; empty without services.
    pub fn emit_services(&self, ctx: &EmitContext<'_>) -> Result<String, EmitError> {
        let mut w = DeclWriter {
            ctx,
            output: String::new(),
        };
        for service in &ctx.schema.services {
            w.service(service)?;
            w.output.push('\n');
        }
        w.routes()?;
        Ok(w.output)
    }

    /// Lay emitted declarations out as files.
    ///
    /// Single-file mode writes `{base}.ts`. Otherwise each namespace gets
    /// `{base}/{stem}.ts` and `{base}.ts` re-exports them all and holds the
    /// services.
    pub fn assemble(
        &self,
        ctx: &EmitContext<'_>,
        chunks: &[(TypeId, String)],
    ) -> Result<Vec<GeneratedFile>, EmitError> {
        let base = &ctx.options.base_name;
        let services = self.emit_services(ctx)?;

        if ctx.options.single_file {
            let mut out = String::from(HEADER);
            for (_, chunk) in chunks {
                out.push('\n');
                out.push_str(chunk);
            }
            if !services.is_empty() {
                out.push('\n');
                out.push_str(&services);
            }
            return Ok(vec![GeneratedFile {
                path: format!("{}.ts", base),
                contents: out,
            }]);
        }

        let files = NamespaceFiles::new(
            chunks.iter().map(|(id, _)| id.namespace.as_str()),
            &ctx.options.namespace_prefix_strip,
        );
        let mut by_namespace: BTreeMap<&str, Vec<(&TypeId, &str)>> = BTreeMap::new();
        for (id, chunk) in chunks {
            by_namespace
                .entry(id.namespace.as_str())
                .or_default()
                .push((id, chunk.as_str()));
        }

        let mut out = Vec::new();
        for (ns, members) in &by_namespace {
            let stem = files.stem(ns).unwrap_or("types");
            let mut referenced = BTreeSet::new();
            for (id, _) in members {
                if let Some(ty) = ctx.schema.find_type(id) {
                    collect_refs(ty, &mut referenced);
                }
            }
            referenced.retain(|r: &TypeId| r.namespace != *ns);

            let mut contents = String::from(HEADER);
            write_imports(ctx, &files, &referenced, "./", &mut contents)?;
            for (_, chunk) in members {
                contents.push('\n');
                contents.push_str(chunk);
            }
            out.push(GeneratedFile {
                path: format!("{}/{}.ts", base, stem),
                contents,
            });
        }

        let mut index = String::from(HEADER);
        index.push('\n');
        let mut stems: Vec<&str> = files.iter().map(|(_, stem)| stem).collect();
        stems.sort();
        for stem in stems {
            writeln!(index, "export * from \"./{}/{}\";", base, stem)?;
        }
        if !services.is_empty() {
            let mut referenced = BTreeSet::new();
            for service in &ctx.schema.services {
                for ep in &service.endpoints {
                    if let Some(req) = &ep.request {
                        collect_refs(req, &mut referenced);
                    }
                    collect_refs(&ep.response, &mut referenced);
                }
            }
            index.push('\n');
            write_imports(ctx, &files, &referenced, &format!("./{}/", base), &mut index)?;
            index.push('\n');
            index.push_str(&services);
        }
        out.push(GeneratedFile {
            path: format!("{}.ts", base),
            contents: index,
        });
        Ok(out)
    }
}

fn collect_refs(ty: &TypeDescriptor, into: &mut BTreeSet<TypeId>) {
    if let TypeDescriptor::Record(r) = ty {
        into.extend(r.extends.iter().cloned());
    }
    into.extend(ty.references().into_iter().cloned());
}

fn write_imports(
    ctx: &EmitContext<'_>,
    files: &NamespaceFiles,
    referenced: &BTreeSet<TypeId>,
    dir: &str,
    out: &mut String,
) -> Result<(), EmitError> {
    let mut by_stem: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for id in referenced {
        let Some(stem) = files.stem(&id.namespace) else {
            continue;
        };
        by_stem.entry(stem).or_default().insert(ctx.name(id)?);
    }
    for (stem, names) in by_stem {
        let names: Vec<&str> = names.into_iter().collect();
        writeln!(out, "import type {{ {} }} from \"{}{}\";", names.join(", "), dir, stem)?;
    }
    Ok(())
}

struct DeclWriter<'c, 'a> {
    ctx: &'c EmitContext<'a>,
    output: String,
}

impl DeclWriter<'_, '_> {
    fn doc(&mut self, doc: &crate::ir::Documentation, indent: &str, member: bool) {
        let enabled = if member {
            self.ctx.member_docs()
        } else {
            self.ctx.type_docs()
        };
        if enabled {
            self.output.push_str(&jsdoc(doc, indent));
        }
    }

    fn record(&mut self, r: &RecordType) -> Result<(), EmitError> {
        self.doc(&r.doc, "", false);
        let name = self.ctx.name(&r.id)?.to_string();
        let params = self.params(&r.type_params)?;
        let parents = r
            .extends
            .iter()
            .map(|p| self.ctx.name(p).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        write!(self.output, "export interface {}{}", name, params)?;
        if !parents.is_empty() {
            write!(self.output, " extends {}", parents.join(", "))?;
        }
        writeln!(self.output, " {{")?;
        for field in r.fields.iter().filter(|f| !f.skip) {
            self.field(field)?;
        }
        writeln!(self.output, "}}")?;
        Ok(())
    }

    fn field(&mut self, field: &Field) -> Result<(), EmitError> {
        self.doc(&field.doc, "  ", true);
        let mut ty = if field.string_encoded {
            if field.ty.is_pointer() {
                "string | null".to_string()
            } else {
                "string".to_string()
            }
        } else {
            type_expr(self.ctx, &field.ty)?
        };
        let key = property_key(&field.wire_name);
        if !field.optional {
            writeln!(self.output, "  {}: {};", key, ty)?;
            return Ok(());
        }
        if self.ctx.options.optional_type == OptionalType::Null && !field.ty.is_pointer() {
            ty.push_str(" | null");
        }
        writeln!(self.output, "  {}?: {};", key, ty)?;
        Ok(())
    }

    fn alias(&mut self, a: &AliasType) -> Result<(), EmitError> {
        self.doc(&a.doc, "", false);
        let name = self.ctx.name(&a.id)?.to_string();
        let params = self.params(&a.type_params)?;
        let underlying = type_expr(self.ctx, &a.underlying)?;
        writeln!(self.output, "export type {}{} = {};", name, params, underlying)?;
        Ok(())
    }

    fn enumeration(&mut self, e: &EnumType) -> Result<(), EmitError> {
        self.doc(&e.doc, "", false);
        let name = self.ctx.name(&e.id)?.to_string();
        match self.ctx.options.enum_style {
            EnumStyle::TaggedUnion => {
                let values: Vec<String> = e.members.iter().map(|m| m.value.to_string()).collect();
                let body = if values.is_empty() {
                    "never".to_string()
                } else {
                    values.join(" | ")
                };
                writeln!(self.output, "export type {} = {};", name, body)?;
            }
            EnumStyle::NativeEnum => {
                writeln!(self.output, "export enum {} {{", name)?;
                for m in &e.members {
                    self.doc(&m.doc, "  ", true);
                    writeln!(self.output, "  {} = {},", member_name(&name, &m.name), m.value)?;
                }
                writeln!(self.output, "}}")?;
            }
            EnumStyle::FlatConstants => {
                for m in &e.members {
                    self.doc(&m.doc, "", true);
                    writeln!(self.output, "export const {} = {};", m.name, m.value)?;
                }
                let body = if e.members.is_empty() {
                    "never".to_string()
                } else {
                    e.members
                        .iter()
                        .map(|m| format!("typeof {}", m.name))
                        .collect::<Vec<_>>()
                        .join(" | ")
                };
                writeln!(self.output, "export type {} = {};", name, body)?;
            }
        }
        Ok(())
    }

    /// `<T = unknown, N extends number = number>`
    fn params(&self, params: &[TypeParam]) -> Result<String, EmitError> {
        if params.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(params.len());
        for p in params {
            match p.constraint.as_deref() {
                Some(c) if !is_unconstrained(c) => {
                    let c = type_expr(self.ctx, c)?;
                    parts.push(format!("{} extends {} = {}", p.name, c, c));
                }
                _ => parts.push(format!("{} = unknown", p.name)),
            }
        }
        Ok(format!("<{}>", parts.join(", ")))
    }

    fn service(&mut self, service: &Service) -> Result<(), EmitError> {
        self.doc(&service.doc, "", false);
        writeln!(self.output, "export interface {}Service {{", service.name)?;
        for ep in &service.endpoints {
            self.doc(&ep.doc, "  ", false);
            let response = type_expr(self.ctx, &ep.response)?;
            let request = match &ep.request {
                Some(req) => format!("request: {}", type_expr(self.ctx, req)?),
                None => String::new(),
            };
            writeln!(self.output, "  {}({}): Promise<{}>;", ep.name, request, response)?;
        }
        writeln!(self.output, "}}")?;
        Ok(())
    }

    fn routes(&mut self) -> Result<(), EmitError> {
        let endpoints: Vec<_> = self
            .ctx
            .schema
            .services
            .iter()
            .flat_map(|s| s.endpoints.iter())
            .collect();
        if endpoints.is_empty() {
            return Ok(());
        }
        writeln!(self.output, "export const routes = {{")?;
        for ep in endpoints {
            writeln!(
                self.output,
                "  {}: {{ verb: {}, path: {} }},",
                quote(&ep.full_name),
                quote(&ep.http_verb),
                quote(&ep.path)
            )?;
        }
        writeln!(self.output, "}} as const;")?;
        Ok(())
    }
}

fn is_unconstrained(c: &TypeDescriptor) -> bool {
    matches!(c, TypeDescriptor::Primitive(p) if p.kind == PrimitiveKind::Any)
}

/// `StatusOpen` in enum `Status` becomes `Open`.
fn member_name(enum_name: &str, member: &str) -> String {
    match member.strip_prefix(enum_name) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) => rest.to_string(),
        _ => member.to_string(),
    }
}

/// TypeScript type expression for an unnamed descriptor.
pub fn type_expr(ctx: &EmitContext<'_>, ty: &TypeDescriptor) -> Result<String, EmitError> {
    Ok(match ty {
        TypeDescriptor::Primitive(p) => match p.kind {
            PrimitiveKind::Bool => "boolean",
            PrimitiveKind::Int
            | PrimitiveKind::Uint
            | PrimitiveKind::Float
            | PrimitiveKind::Duration => "number",
            PrimitiveKind::String | PrimitiveKind::Bytes | PrimitiveKind::Time => "string",
            PrimitiveKind::Any => "unknown",
            PrimitiveKind::Empty => "Record<string, never>",
        }
        .to_string(),
        TypeDescriptor::Array { elem, .. } => {
            let inner = type_expr(ctx, elem)?;
            if inner.contains(' ') {
                format!("({})[]", inner)
            } else {
                format!("{}[]", inner)
            }
        }
        TypeDescriptor::Map { value, .. } => {
            format!("Record<string, {}>", type_expr(ctx, value)?)
        }
        TypeDescriptor::Reference(id) => ctx.name(id)?.to_string(),
        TypeDescriptor::Pointer { elem } => {
            if ty.is_null_response() {
                "null".to_string()
            } else {
                format!("{} | null", type_expr(ctx, elem)?)
            }
        }
        TypeDescriptor::Union { members } => members
            .iter()
            .map(|m| type_expr(ctx, m))
            .collect::<Result<Vec<_>, _>>()?
            .join(" | "),
        TypeDescriptor::TypeParameter(p) => p.name.clone(),
        named => return Err(EmitError::Unsupported(format!("inline {}", named.kind_name()))),
    })
}
