//! Valibot schema generation.
//!
//! Refinements are explicit action objects collected in `v.pipe(...)`.

use super::rules::{Constraint, StringFormat};
use super::validator::{indent_entry, regex_literal, Dialect, Scalar, ValidatorFlavor};
use crate::ir::{quote, EnumValue, PrimitiveKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct Valibot;

pub type ValibotFlavor = ValidatorFlavor<Valibot>;

impl Dialect for Valibot {
    fn name(&self) -> &'static str {
        "valibot"
    }

    fn file_suffix(&self) -> &'static str {
        "valibot.ts"
    }

    fn import(&self) -> &'static str {
        "import * as v from \"valibot\";"
    }

    fn primitive(&self, kind: PrimitiveKind) -> String {
        match kind {
            PrimitiveKind::Bool => "v.boolean()",
            PrimitiveKind::Int
            | PrimitiveKind::Uint
            | PrimitiveKind::Float
            | PrimitiveKind::Duration => "v.number()",
            PrimitiveKind::String | PrimitiveKind::Bytes | PrimitiveKind::Time => "v.string()",
            PrimitiveKind::Any => "v.unknown()",
            PrimitiveKind::Empty => "v.object({})",
        }
        .to_string()
    }

    fn coerced(&self, kind: PrimitiveKind) -> Scalar {
        match kind {
            PrimitiveKind::Bool => Scalar {
                base: "v.picklist([\"true\", \"false\"])".into(),
                steps: vec!["v.transform((s) => s === \"true\")".into()],
            },
            k if k.is_numeric() => Scalar {
                base: "v.string()".into(),
                steps: vec!["v.transform(Number)".into(), "v.number()".into()],
            },
            _ => Scalar::bare("v.string()"),
        }
    }

    fn constraint(&self, c: &Constraint) -> String {
        match c {
            Constraint::MinLength(n) => format!("v.minLength({})", n),
            Constraint::MaxLength(n) => format!("v.maxLength({})", n),
            Constraint::Length(n) => format!("v.length({})", n),
            Constraint::Min(x) => format!("v.minValue({})", x),
            Constraint::Max(x) => format!("v.maxValue({})", x),
            Constraint::GreaterThan(x) => format!("v.gtValue({})", x),
            Constraint::LessThan(x) => format!("v.ltValue({})", x),
            Constraint::Integer => "v.integer()".into(),
            Constraint::NonNegative => "v.minValue(0)".into(),
            Constraint::Format(f) => match f {
                StringFormat::Email => "v.email()",
                StringFormat::Url => "v.url()",
                StringFormat::Uuid => "v.uuid()",
                StringFormat::Ip => "v.ip()",
                StringFormat::Ipv4 => "v.ipv4()",
                StringFormat::Ipv6 => "v.ipv6()",
                StringFormat::Datetime => "v.isoTimestamp()",
                StringFormat::Base64 => "v.base64()",
            }
            .into(),
            Constraint::Pattern(re) => format!("v.regex({})", regex_literal(re)),
            Constraint::StartsWith(s) => format!("v.startsWith({})", quote(s)),
            Constraint::EndsWith(s) => format!("v.endsWith({})", quote(s)),
            Constraint::Contains(s) => format!("v.includes({})", quote(s)),
        }
    }

    fn finish(&self, s: Scalar) -> String {
        if s.steps.is_empty() {
            return s.base;
        }
        format!("v.pipe({}, {})", s.base, s.steps.join(", "))
    }

    fn pipe(&self, wire: &str, coerced: Scalar) -> String {
        self.finish(Scalar {
            base: wire.to_string(),
            steps: coerced.steps,
        })
    }

    fn literals(&self, values: &[EnumValue]) -> String {
        match values {
            [] => "v.never()".into(),
            _ if values.iter().all(EnumValue::is_string) => {
                let items: Vec<String> = values.iter().map(|x| x.to_string()).collect();
                format!("v.picklist([{}])", items.join(", "))
            }
            [single] => format!("v.literal({})", single),
            _ => {
                let items: Vec<String> = values.iter().map(|x| format!("v.literal({})", x)).collect();
                format!("v.union([{}])", items.join(", "))
            }
        }
    }

    fn null(&self) -> String {
        "v.null()".into()
    }

    fn array(&self, elem: &str) -> String {
        format!("v.array({})", elem)
    }

    fn map(&self, key: &str, value: &str) -> String {
        format!("v.record({}, {})", key, value)
    }

    fn union(&self, members: &[String]) -> String {
        format!("v.union([{}])", members.join(", "))
    }

    fn nullable(&self, inner: &str) -> String {
        format!("v.nullable({})", inner)
    }

    fn optional(&self, inner: &str) -> String {
        format!("v.optional({})", inner)
    }

    fn lazy(&self, target: &str) -> String {
        format!("v.lazy(() => {})", target)
    }

    fn object(&self, parents: &[String], entries: &[String]) -> String {
        if parents.is_empty() && entries.is_empty() {
            return "v.object({})".into();
        }
        let mut out = String::from("v.object({\n");
        for p in parents {
            out.push_str(&format!("  ...{}.entries,\n", p));
        }
        for entry in entries {
            out.push_str(&indent_entry(entry));
            out.push_str(",\n");
        }
        out.push_str("})");
        out
    }

    fn generic(&self, params: &[&str], body: &str) -> String {
        let bounds: Vec<String> = params
            .iter()
            .map(|p| format!("{} extends v.GenericSchema", p))
            .collect();
        let args: Vec<String> = params.iter().map(|p| format!("{}: {}", p, p)).collect();
        format!("<{}>({}) => {}", bounds.join(", "), args.join(", "), body)
    }

    fn instantiate(&self, factory: &str, arity: usize) -> String {
        format!("{}({})", factory, vec!["v.unknown()"; arity].join(", "))
    }

    fn infer(&self, schema: &str) -> String {
        format!("v.InferOutput<typeof {}>", schema)
    }
}

impl ValibotFlavor {
    pub fn valibot() -> Self {
        ValidatorFlavor::new(Valibot)
    }
}
