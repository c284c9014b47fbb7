//! Zod schema generation.
//!
//! Fluent-chain dialect: refinements are method calls on the base schema
//! (`z.string().min(1).email()`).

use super::rules::{Constraint, StringFormat};
use super::validator::{indent_entry, regex_literal, Dialect, Scalar, ValidatorFlavor};
use crate::ir::{quote, EnumValue, PrimitiveKind};

/// Zod spelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zod;

pub type ZodFlavor = ValidatorFlavor<Zod>;

impl Dialect for Zod {
    fn name(&self) -> &'static str {
        "zod"
    }

    fn file_suffix(&self) -> &'static str {
        "zod.ts"
    }

    fn import(&self) -> &'static str {
        "import { z } from \"zod\";"
    }

    fn primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Bool => "z.boolean()",
            PrimitiveKind::Int
            | PrimitiveKind::Uint
            | PrimitiveKind::Float
            | PrimitiveKind::Duration => "z.number()",
            PrimitiveKind::String | PrimitiveKind::Bytes | PrimitiveKind::Time => "z.string()",
            PrimitiveKind::Any => "z.unknown()",
            PrimitiveKind::Empty => "z.object({})",
        }
        .to_string()
    }

    fn coerced(&self, kind: PrimitiveKind) -> Scalar {
        match kind {
            PrimitiveKind::Bool => {
                Scalar::bare("z.enum([\"true\", \"false\"]).transform((v) => v === \"true\")")
            }
            k if k.is_numeric() => Scalar::bare("z.coerce.number()"),
            _ => Scalar::bare("z.string()"),
        }
    }

    fn constraint(&self, c: &Constraint) -> String {
        match c {
            Constraint::MinLength(n) => format!(".min({})", n),
            Constraint::MaxLength(n) => format!(".max({})", n),
            Constraint::Length(n) => format!(".length({})", n),
            Constraint::Min(v) => format!(".min({})", v),
            Constraint::Max(v) => format!(".max({})", v),
            Constraint::GreaterThan(v) => format!(".gt({})", v),
            Constraint::LessThan(v) => format!(".lt({})", v),
            Constraint::Integer => ".int()".into(),
            Constraint::NonNegative => ".nonnegative()".into(),
            Constraint::Format(f) => match f {
                StringFormat::Email => ".email()",
                StringFormat::Url => ".url()",
                StringFormat::Uuid => ".uuid()",
                StringFormat::Ip => ".ip()",
                StringFormat::Ipv4 => ".ip({ version: \"v4\" })",
                StringFormat::Ipv6 => ".ip({ version: \"v6\" })",
                StringFormat::Datetime => ".datetime({ offset: true })",
                StringFormat::Base64 => ".base64()",
            }
            .into(),
            Constraint::Pattern(re) => format!(".regex({})", regex_literal(re)),
            Constraint::StartsWith(s) => format!(".startsWith({})", quote(s)),
            Constraint::EndsWith(s) => format!(".endsWith({})", quote(s)),
            Constraint::Contains(s) => format!(".includes({})", quote(s)),
        }
    }

    fn finish(&self, s: Scalar) -> String {
        let mut out = s.base;
        for step in s.steps {
            out.push_str(&step);
        }
        out
    }

    fn pipe(&self, wire: &str, coerced: Scalar) -> String {
        format!("{}.pipe({})", wire, self.finish(coerced))
    }

    fn literals(&self, values: &[EnumValue]) -> String {
        match values {
            [] => "z.never()".into(),
            _ if values.iter().all(EnumValue::is_string) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("z.enum([{}])", items.join(", "))
            }
            [single] => format!("z.literal({})", single),
            _ => {
                let items: Vec<String> = values.iter().map(|v| format!("z.literal({})", v)).collect();
                format!("z.union([{}])", items.join(", "))
            }
        }
    }

    fn null(&self) -> String {
        "z.null()".into()
    }

    fn array(&self, elem: &str) -> String {
        format!("z.array({})", elem)
    }

    fn map(&self, key: &str, value: &str) -> String {
        format!("z.record({}, {})", key, value)
    }

    fn union(&self, members: &[String]) -> String {
        format!("z.union([{}])", members.join(", "))
    }

    fn nullable(&self, inner: &str) -> String {
        format!("{}.nullable()", inner)
    }

    fn optional(&self, inner: &str) -> String {
        format!("{}.optional()", inner)
    }

    fn lazy(&self, target: &str) -> String {
        format!("z.lazy(() => {})", target)
    }

    fn object(&self, parents: &[String], entries: &[String]) -> String {
        let body = if entries.is_empty() {
            "{}".to_string()
        } else {
            let mut body = String::from("{\n");
            for entry in entries {
                body.push_str(&indent_entry(entry));
                body.push_str(",\n");
            }
            body.push('}');
            body
        };
        match parents.split_first() {
            None => format!("z.object({})", body),
            Some((first, rest)) => {
                let mut out = first.clone();
                for p in rest {
                    out.push_str(&format!(".merge({})", p));
                }
                format!("{}.extend({})", out, body)
            }
        }
    }

    fn generic(&self, params: &[&str], body: &str) -> String {
        let bounds: Vec<String> = params
            .iter()
            .map(|p| format!("{} extends z.ZodTypeAny", p))
            .collect();
        let args: Vec<String> = params.iter().map(|p| format!("{}: {}", p, p)).collect();
        format!("<{}>({}) => {}", bounds.join(", "), args.join(", "), body)
    }

    fn instantiate(&self, factory: &str, arity: usize) -> String {
        format!("{}({})", factory, vec!["z.unknown()"; arity].join(", "))
    }

    fn infer(&self, schema: &str) -> String {
        format!("z.infer<typeof {}>", schema)
    }
}

impl ZodFlavor {
    pub fn zod() -> Self {
        ValidatorFlavor::new(Zod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        EnumMember, EnumType, Field, RecordType, Schema, TypeDescriptor, TypeId, TypeParam,
        Warning, WarningCode,
    };
    use crate::output::{dependency_order, EmitContext, EmitOptions};
    use crate::traits::Flavor;

    const NS: &str = "example.com/app/models";

    fn run(schema: &Schema, options: &EmitOptions) -> (String, Vec<Warning>) {
        let flavor = ZodFlavor::zod();
        let mut ctx = EmitContext::new(schema, options);
        let mut out = String::new();
        for ty in dependency_order(schema, &ctx.namer) {
            out.push_str(&flavor.emit_type(&mut ctx, ty).unwrap());
            ctx.emitted.insert(ty.type_id().unwrap().clone());
        }
        (out, ctx.warnings)
    }

    fn record(name: &str, fields: Vec<Field>) -> TypeDescriptor {
        TypeDescriptor::Record(RecordType::new(TypeId::new(NS, name), fields))
    }

    fn single(ty: TypeDescriptor) -> Schema {
        let mut schema = Schema::new();
        schema.add_type(ty).unwrap();
        schema
    }

    #[test]
    fn user_record() {
        let schema = single(record(
            "User",
            vec![
                Field::new("ID", TypeDescriptor::sized(PrimitiveKind::Int, 64)).wire("id"),
                Field::new("Email", TypeDescriptor::string())
                    .wire("email")
                    .validate("required,email"),
                Field::new("Name", TypeDescriptor::string()).wire("name").optional(),
            ],
        ));
        let (out, warnings) = run(&schema, &EmitOptions::default());
        insta::assert_snapshot!(out, @r"
        export const UserSchema = z.object({
          id: z.number().int(),
          email: z.string().min(1).email(),
          name: z.string().optional(),
        });
        ");
        assert!(warnings.is_empty());
    }

    #[test]
    fn optional_wraps_nullable() {
        let schema = single(record(
            "Profile",
            vec![
                Field::new("Bio", TypeDescriptor::pointer(TypeDescriptor::string()))
                    .wire("bio")
                    .optional(),
                Field::new("Age", TypeDescriptor::pointer(TypeDescriptor::sized(PrimitiveKind::Uint, 8)))
                    .wire("age"),
            ],
        ));
        let (out, _) = run(&schema, &EmitOptions::default());
        assert!(out.contains("  bio: z.string().nullable().optional(),\n"));
        assert!(out.contains("  age: z.number().int().nonnegative().max(255).nullable(),\n"));
    }

    #[test]
    fn numeric_bounds_and_coercion() {
        let schema = single(record(
            "Reading",
            vec![
                Field::new("Level", TypeDescriptor::sized(PrimitiveKind::Int, 8)).wire("level"),
                Field::new("Count", TypeDescriptor::sized(PrimitiveKind::Int, 64))
                    .wire("count")
                    .string_encoded(),
                Field::new("Ratio", TypeDescriptor::sized(PrimitiveKind::Float, 64)).wire("ratio"),
            ],
        ));
        let (out, _) = run(&schema, &EmitOptions::default());
        insta::assert_snapshot!(out, @r"
        export const ReadingSchema = z.object({
          level: z.number().int().min(-128).max(127),
          // encoded as a JSON string on the wire
          count: z.coerce.number().int(),
          ratio: z.number(),
        });
        ");
    }

    #[test]
    fn string_encoded_one_of_checks_wire_strings() {
        let schema = single(record(
            "Reading",
            vec![Field::new("Level", TypeDescriptor::sized(PrimitiveKind::Int, 64))
                .wire("level")
                .string_encoded()
                .validate("oneof=1 2 3")],
        ));
        let (out, _) = run(&schema, &EmitOptions::default());
        insta::assert_snapshot!(out, @r#"
        export const ReadingSchema = z.object({
          // encoded as a JSON string on the wire
          level: z.enum(["1", "2", "3"]).pipe(z.coerce.number()),
        });
        "#);
    }

    #[test]
    fn one_of_replaces_the_base_schema() {
        let schema = single(record(
            "Theme",
            vec![Field::new("Mode", TypeDescriptor::string())
                .wire("mode")
                .validate("required,oneof=light dark system")],
        ));
        let (out, _) = run(&schema, &EmitOptions::default());
        assert!(out.contains("  mode: z.enum([\"light\", \"dark\", \"system\"]),\n"));
    }

    #[test]
    fn enums_and_inferred_types() {
        let mut schema = Schema::new();
        schema
            .add_type(TypeDescriptor::Enum(EnumType::new(
                TypeId::new(NS, "Status"),
                vec![
                    EnumMember::new("StatusOpen", EnumValue::String("open".into())),
                    EnumMember::new("StatusDone", EnumValue::String("done".into())),
                ],
            )))
            .unwrap();
        schema
            .add_type(TypeDescriptor::Enum(EnumType::new(
                TypeId::new(NS, "Priority"),
                vec![
                    EnumMember::new("Low", EnumValue::Int(0)),
                    EnumMember::new("High", EnumValue::Int(1)),
                ],
            )))
            .unwrap();
        schema
            .add_type(TypeDescriptor::Enum(EnumType::new(TypeId::new(NS, "Never"), vec![])))
            .unwrap();
        let options = EmitOptions {
            emit_base_types: false,
            ..Default::default()
        };
        let (out, _) = run(&schema, &options);
        insta::assert_snapshot!(out, @r#"
        export const NeverSchema = z.never();
        export type Never = z.infer<typeof NeverSchema>;
        export const PrioritySchema = z.union([z.literal(0), z.literal(1)]);
        export type Priority = z.infer<typeof PrioritySchema>;
        export const StatusSchema = z.enum(["open", "done"]);
        export type Status = z.infer<typeof StatusSchema>;
        "#);
    }

    #[test]
    fn recursive_reference_is_lazy() {
        let schema = single(record(
            "Node",
            vec![Field::new(
                "Children",
                TypeDescriptor::array(TypeDescriptor::reference(NS, "Node")),
            )
            .wire("children")],
        ));
        let (out, _) = run(&schema, &EmitOptions::default());
        assert!(out.contains("  children: z.array(z.lazy(() => NodeSchema)),\n"));
    }

    #[test]
    fn generics_become_factories() {
        let mut schema = Schema::new();
        let mut page = RecordType::new(
            TypeId::new(NS, "Page"),
            vec![Field::new(
                "Items",
                TypeDescriptor::array(TypeDescriptor::TypeParameter(TypeParam::new("T"))),
            )
            .wire("items")],
        );
        page.type_params = vec![TypeParam::new("T")];
        schema.add_type(TypeDescriptor::Record(page)).unwrap();
        schema
            .add_type(record(
                "Feed",
                vec![Field::new("Page", TypeDescriptor::reference(NS, "Page")).wire("page")],
            ))
            .unwrap();
        let (out, _) = run(&schema, &EmitOptions::default());
        assert!(out.contains(
            "export const PageSchema = <T extends z.ZodTypeAny>(T: T) => z.object({\n  items: z.array(T),\n});\n"
        ));
        assert!(out.contains("  page: PageSchema(z.unknown()),\n"));
    }

    #[test]
    fn extends_uses_extend_and_merge() {
        let mut schema = Schema::new();
        schema
            .add_type(record("Base", vec![Field::new("ID", TypeDescriptor::string()).wire("id")]))
            .unwrap();
        schema
            .add_type(record("Audit", vec![Field::new("By", TypeDescriptor::string()).wire("by")]))
            .unwrap();
        let mut doc = RecordType::new(
            TypeId::new(NS, "Doc"),
            vec![Field::new("Title", TypeDescriptor::string()).wire("title")],
        );
        doc.extends = vec![TypeId::new(NS, "Base"), TypeId::new(NS, "Audit")];
        schema.add_type(TypeDescriptor::Record(doc)).unwrap();
        let (out, _) = run(&schema, &EmitOptions::default());
        assert!(out.contains(
            "export const DocSchema = BaseSchema.merge(AuditSchema).extend({\n  title: z.string(),\n});\n"
        ));
    }

    #[test]
    fn unsupported_rule_warns_and_emits_nothing() {
        let schema = single(record(
            "Login",
            vec![Field::new("Token", TypeDescriptor::string())
                .wire("token")
                .validate("jwt")],
        ));
        let (out, warnings) = run(&schema, &EmitOptions::default());
        assert!(out.contains("  token: z.string(),\n"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::UnsupportedValidationRule);
        assert!(warnings[0].message.contains("Login.Token"));
        assert!(warnings[0].message.contains("zod"));
    }
}
