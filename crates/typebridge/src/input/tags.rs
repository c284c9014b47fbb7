//! Go struct tag parsing.
//!
//! Follows the `reflect.StructTag` conventions: space separated `key:"value"`
//! pairs, values in Go string-literal syntax.

use crate::ir::Field;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag {
    entries: Vec<(String, String)>,
}

impl StructTag {
    /// Parse a raw tag. Surrounding backquotes or double quotes (as written
    /// in source) are stripped first. Malformed trailing input is ignored,
    /// the same way `reflect.StructTag.Lookup` stops at it.
    pub fn parse(raw: &str) -> Self {
        let owned = strip_literal(raw);
        let mut tag = owned.as_str();
        let mut entries = Vec::new();

        loop {
            tag = tag.trim_start_matches(' ');
            if tag.is_empty() {
                break;
            }
            let key_len = tag
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\x7f')
                .unwrap_or(tag.len());
            if key_len == 0 || !tag[key_len..].starts_with(":\"") {
                break;
            }
            let key = &tag[..key_len];
            let rest = &tag[key_len + 2..];

            let Some(end) = closing_quote(rest) else {
                break;
            };
            entries.push((key.to_string(), unescape(&rest[..end])));
            tag = &rest[end + 1..];
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_literal(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('`').and_then(|r| r.strip_suffix('`')) {
        return inner.to_string();
    }
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return unescape(inner);
    }
    raw.to_string()
}

fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parsed `json:"..."` tag value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonTag {
    /// Explicit wire name, if the tag gives one.
    pub name: Option<String>,
    pub omit_empty: bool,
    pub string: bool,
    pub skip: bool,
}

impl JsonTag {
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            return Self {
                skip: true,
                ..Default::default()
            };
        }
        let mut parts = value.split(',');
        let name = parts
            .next()
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let mut tag = Self {
            name,
            ..Default::default()
        };
        for opt in parts {
            match opt.trim() {
                "omitempty" | "omitzero" => tag.omit_empty = true,
                "string" => tag.string = true,
                _ => {}
            }
        }
        tag
    }
}

/// Serialization-relevant facts carried by a field's tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTags {
    pub json: JsonTag,
    /// Validation rule string, from `validate:` with `binding:` as fallback.
    pub validate: String,
}

impl FieldTags {
    pub fn parse(raw: &str) -> Self {
        let tag = StructTag::parse(raw);
        Self {
            json: tag.get("json").map(JsonTag::parse).unwrap_or_default(),
            validate: tag
                .get("validate")
                .or_else(|| tag.get("binding"))
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Apply wire name, optionality, string encoding, skip and validation
    /// rules to a field. `optional` is OR-ed in, so pointer-derived
    /// optionality survives.
    pub fn apply(&self, mut field: Field) -> Field {
        if let Some(name) = &self.json.name {
            field.wire_name = name.clone();
        }
        field.optional |= self.json.omit_empty;
        field.string_encoded = self.json.string;
        field.skip = self.json.skip;
        field.raw_validation_tag = self.validate.clone();
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeDescriptor;

    #[test]
    fn parses_multiple_keys() {
        let tag = StructTag::parse(r#"`json:"email,omitempty" validate:"required,email"`"#);
        assert_eq!(tag.get("json"), Some("email,omitempty"));
        assert_eq!(tag.get("validate"), Some("required,email"));
        assert_eq!(tag.get("xml"), None);
    }

    #[test]
    fn interpreted_literal_is_unescaped() {
        let tag = StructTag::parse(r#""json:\"id\"""#);
        assert_eq!(tag.get("json"), Some("id"));
    }

    #[test]
    fn stops_at_malformed_input() {
        let tag = StructTag::parse(r#"json:"a" broken validate:"required""#);
        assert_eq!(tag.get("json"), Some("a"));
        assert_eq!(tag.get("validate"), None);
    }

    #[test]
    fn json_options() {
        assert!(JsonTag::parse("-").skip);
        // "-," names a field literally "-"
        assert_eq!(JsonTag::parse("-,").name.as_deref(), Some("-"));

        let tag = JsonTag::parse(",omitzero,string");
        assert_eq!(tag.name, None);
        assert!(tag.omit_empty);
        assert!(tag.string);
    }

    #[test]
    fn binding_is_a_fallback_for_validate() {
        let tags = FieldTags::parse(r#"`binding:"required"`"#);
        assert_eq!(tags.validate, "required");
        let tags = FieldTags::parse(r#"`validate:"email" binding:"required"`"#);
        assert_eq!(tags.validate, "email");
    }

    #[test]
    fn apply_sets_field_flags() {
        let tags = FieldTags::parse(r#"`json:"count,string,omitempty" validate:"gte=1"`"#);
        let field = tags.apply(Field::new("Count", TypeDescriptor::string()));
        assert_eq!(field.wire_name, "count");
        assert!(field.optional);
        assert!(field.string_encoded);
        assert_eq!(field.raw_validation_tag, "gte=1");
    }
}
