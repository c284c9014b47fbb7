//! Validation-rule translation.
//!
//! A field's raw tag (go-playground/validator syntax) is parsed into an
//! ordered list of [`Rule`]s, and each rule is classified into an
//! [`Outcome`] against the [`Shape`] of the field it annotates. This module
//! decides *what applies*; each [`Dialect`](super::Dialect) decides how a
//! [`Constraint`] is written.

use crate::ir::{EnumValue, Field, PrimitiveKind, Schema, TypeDescriptor, Warning, WarningCode};

/// One comma-separated entry of a validation tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub param: Option<String>,
}

impl Rule {
    /// Display form, as written in the tag.
    pub fn text(&self) -> String {
        match &self.param {
            Some(p) => format!("{}={}", self.name, p),
            None => self.name.clone(),
        }
    }
}

/// Split a tag on `,`, then each entry on the first `=`.
pub fn parse_rules(tag: &str) -> Vec<Rule> {
    tag.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| match r.split_once('=') {
            Some((name, param)) => Rule {
                name: name.trim().to_string(),
                param: Some(param.to_string()),
            },
            None => Rule {
                name: r.to_string(),
                param: None,
            },
        })
        .collect()
}

/// The value-space a rule is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    String,
    Number { integer: bool },
    Bool,
    Array,
    Map,
    /// Records, enums, time values and anything else without rule support.
    Other,
}

impl Shape {
    /// Resolve a field type through pointers and aliases.
    pub fn of(schema: &Schema, ty: &TypeDescriptor) -> Shape {
        let mut current = ty.deref();
        for _ in 0..16 {
            match current {
                TypeDescriptor::Primitive(p) => {
                    return match p.kind {
                        PrimitiveKind::String => Shape::String,
                        PrimitiveKind::Int | PrimitiveKind::Uint => {
                            Shape::Number { integer: true }
                        }
                        PrimitiveKind::Float => Shape::Number { integer: false },
                        PrimitiveKind::Bool => Shape::Bool,
                        _ => Shape::Other,
                    };
                }
                TypeDescriptor::Array { .. } => return Shape::Array,
                TypeDescriptor::Map { .. } => return Shape::Map,
                TypeDescriptor::Reference(id) => match schema.find_type(id) {
                    Some(TypeDescriptor::Alias(a)) => current = a.underlying.deref(),
                    _ => return Shape::Other,
                },
                _ => return Shape::Other,
            }
        }
        Shape::Other
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Number { .. } => "number",
            Shape::Bool => "boolean",
            Shape::Array => "array",
            Shape::Map => "map",
            Shape::Other => "this type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Url,
    Uuid,
    Ip,
    Ipv4,
    Ipv6,
    Datetime,
    Base64,
}

/// A dialect-neutral constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    MinLength(u64),
    MaxLength(u64),
    Length(u64),
    Min(f64),
    Max(f64),
    GreaterThan(f64),
    LessThan(f64),
    Integer,
    NonNegative,
    Format(StringFormat),
    /// JavaScript regular expression source, without delimiters.
    Pattern(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Supported(Vec<Constraint>),
    /// Replace the base schema with a literal enum.
    OneOf(Vec<EnumValue>),
    /// Deliberately not translated; no output, no warning.
    Skipped,
    /// No translation exists; the reason ends up in a warning.
    Unsupported(String),
}

/// Result of translating every rule on one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    pub constraints: Vec<Constraint>,
    pub one_of: Option<Vec<EnumValue>>,
    pub warnings: Vec<Warning>,
}

/// Translate a field's tag. `owner` names the enclosing record (or
/// endpoint) in warnings; `flavor` names the dialect.
pub fn translate_field(schema: &Schema, owner: &str, field: &Field, flavor: &str) -> Translation {
    let mut out = Translation::default();
    if field.raw_validation_tag.is_empty() {
        return out;
    }
    let shape = Shape::of(schema, &field.ty);
    for rule in parse_rules(&field.raw_validation_tag) {
        // Everything after `dive` applies to elements, not the field.
        if rule.name == "dive" {
            break;
        }
        match translate(&rule, shape) {
            Outcome::Supported(cs) => out.constraints.extend(cs),
            Outcome::OneOf(values) => out.one_of = Some(values),
            Outcome::Skipped => {}
            Outcome::Unsupported(reason) => {
                tracing::debug!(owner, field = %field.name, rule = %rule.text(), "unsupported rule");
                out.warnings.push(
                    Warning::new(
                        WarningCode::UnsupportedValidationRule,
                        format!(
                            "{}.{}: validation rule \"{}\" is not supported by {} ({})",
                            owner,
                            field.name,
                            rule.text(),
                            flavor,
                            reason
                        ),
                    )
                    .with_type(owner),
                );
            }
        }
    }
    out
}

const SKIPPED: &[&str] = &[
    "omitempty",
    "omitnil",
    "omitzero",
    "dive",
    "keys",
    "endkeys",
    "isdefault",
    "structonly",
    "nostructlevel",
    "required_if",
    "required_unless",
    "required_with",
    "required_with_all",
    "required_without",
    "required_without_all",
    "excluded_if",
    "excluded_unless",
    "excluded_with",
    "excluded_with_all",
    "excluded_without",
    "excluded_without_all",
    "eqfield",
    "nefield",
    "gtfield",
    "gtefield",
    "ltfield",
    "ltefield",
    "eqcsfield",
    "necsfield",
    "gtcsfield",
    "gtecsfield",
    "ltcsfield",
    "ltecsfield",
    "fieldcontains",
    "fieldexcludes",
];

/// The decision table.
pub fn translate(rule: &Rule, shape: Shape) -> Outcome {
    use Constraint as C;

    let name = rule.name.as_str();
    if SKIPPED.contains(&name) {
        return Outcome::Skipped;
    }
    let param = rule.param.as_deref();

    match name {
        "required" => match shape {
            Shape::String => Outcome::Supported(vec![C::MinLength(1)]),
            _ => Outcome::Supported(Vec::new()),
        },
        "min" | "max" | "len" | "gte" | "lte" | "gt" | "lt" => bound(name, param, shape),
        "oneof" => one_of(param, shape),
        "email" => format(shape, StringFormat::Email),
        "url" | "uri" | "http_url" => format(shape, StringFormat::Url),
        "uuid" | "uuid4" | "uuid_rfc4122" | "uuid4_rfc4122" => format(shape, StringFormat::Uuid),
        "ip" | "ip_addr" => format(shape, StringFormat::Ip),
        "ipv4" | "ip4_addr" => format(shape, StringFormat::Ipv4),
        "ipv6" | "ip6_addr" => format(shape, StringFormat::Ipv6),
        "base64" => format(shape, StringFormat::Base64),
        "datetime" if param == Some("2006-01-02T15:04:05Z07:00") => {
            format(shape, StringFormat::Datetime)
        }
        "alpha" => pattern(shape, "^[a-zA-Z]+$"),
        "alphanum" => pattern(shape, "^[a-zA-Z0-9]+$"),
        "numeric" => pattern(shape, "^[-+]?[0-9]+(?:\\.[0-9]+)?$"),
        "number" => pattern(shape, "^[0-9]+$"),
        "hexadecimal" => pattern(shape, "^(?:0[xX])?[0-9a-fA-F]+$"),
        "hexcolor" => pattern(shape, "^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$"),
        "lowercase" => pattern(shape, "^[^A-Z]*$"),
        "uppercase" => pattern(shape, "^[^a-z]*$"),
        "e164" => pattern(shape, "^\\+[1-9][0-9]{1,14}$"),
        "startswith" | "endswith" | "contains" => substring(name, param, shape),
        _ => Outcome::Unsupported("unknown rule".into()),
    }
}

fn format(shape: Shape, f: StringFormat) -> Outcome {
    match shape {
        Shape::String => Outcome::Supported(vec![Constraint::Format(f)]),
        other => Outcome::Unsupported(format!("not applicable to {}", other.describe())),
    }
}

fn pattern(shape: Shape, re: &str) -> Outcome {
    match shape {
        Shape::String => Outcome::Supported(vec![Constraint::Pattern(re.to_string())]),
        other => Outcome::Unsupported(format!("not applicable to {}", other.describe())),
    }
}

fn substring(name: &str, param: Option<&str>, shape: Shape) -> Outcome {
    let (Shape::String, Some(p)) = (shape, param) else {
        return Outcome::Unsupported("needs a string field and a parameter".into());
    };
    let c = match name {
        "startswith" => Constraint::StartsWith(p.to_string()),
        "endswith" => Constraint::EndsWith(p.to_string()),
        _ => Constraint::Contains(p.to_string()),
    };
    Outcome::Supported(vec![c])
}

fn bound(name: &str, param: Option<&str>, shape: Shape) -> Outcome {
    use Constraint as C;

    let Some(param) = param.filter(|p| !p.is_empty()) else {
        // `gt`/`lt` without a value compare against "now" on time fields.
        return Outcome::Unsupported("missing parameter".into());
    };
    let Ok(value) = param.parse::<f64>() else {
        return Outcome::Unsupported(format!("non-numeric parameter {:?}", param));
    };

    match shape {
        Shape::Number { .. } => Outcome::Supported(match name {
            "min" | "gte" => vec![C::Min(value)],
            "max" | "lte" => vec![C::Max(value)],
            "len" => vec![C::Min(value), C::Max(value)],
            "gt" => vec![C::GreaterThan(value)],
            _ => vec![C::LessThan(value)],
        }),
        Shape::String | Shape::Array => {
            if value < 0.0 || value.fract() != 0.0 {
                return Outcome::Unsupported(format!("invalid length {}", param));
            }
            let n = value as u64;
            Outcome::Supported(match name {
                "min" | "gte" => vec![C::MinLength(n)],
                "max" | "lte" => vec![C::MaxLength(n)],
                "len" => vec![C::Length(n)],
                "gt" => vec![C::MinLength(n + 1)],
                _ if n == 0 => return Outcome::Unsupported("lt=0 is unsatisfiable".into()),
                _ => vec![C::MaxLength(n - 1)],
            })
        }
        other => Outcome::Unsupported(format!("size bounds not applicable to {}", other.describe())),
    }
}

fn one_of(param: Option<&str>, shape: Shape) -> Outcome {
    let Some(param) = param else {
        return Outcome::Unsupported("missing parameter".into());
    };
    let words = split_one_of(param);
    if words.is_empty() {
        return Outcome::Unsupported("empty value list".into());
    }
    match shape {
        Shape::String => Outcome::OneOf(words.into_iter().map(EnumValue::String).collect()),
        Shape::Number { integer } => {
            let mut values = Vec::with_capacity(words.len());
            for w in &words {
                let v = if integer {
                    w.parse::<i64>().ok().map(EnumValue::Int)
                } else {
                    w.parse::<f64>().ok().map(EnumValue::Float)
                };
                match v {
                    Some(v) => values.push(v),
                    None => return Outcome::Unsupported(format!("non-numeric value {:?}", w)),
                }
            }
            Outcome::OneOf(values)
        }
        other => Outcome::Unsupported(format!("not applicable to {}", other.describe())),
    }
}

/// Space-separated values; single quotes group values containing spaces.
fn split_one_of(param: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = param.trim();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('\'') {
            let end = quoted.find('\'').unwrap_or(quoted.len());
            out.push(quoted[..end].to_string());
            rest = quoted.get(end + 1..).unwrap_or("").trim_start();
        } else {
            let end = rest.find(' ').unwrap_or(rest.len());
            out.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }
    out
}
