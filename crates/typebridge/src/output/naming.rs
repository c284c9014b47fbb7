//! Emitted identifiers and per-namespace file stems.

use crate::ir::{Schema, TypeId};
use std::collections::{BTreeMap, BTreeSet};

/// Assigns every named type the identifier it is emitted under.
///
/// Names unique across namespaces are kept as-is. Names shared by several
/// namespaces get the PascalCased namespace remainder (after stripping the
/// first matching prefix) prepended, so `billing.Invoice` and
/// `legacy.Invoice` become `BillingInvoice` and `LegacyInvoice`.
#[derive(Debug, Clone, Default)]
pub struct TypeNamer {
    names: BTreeMap<TypeId, String>,
}

impl TypeNamer {
    pub fn new(schema: &Schema, strip: &[String]) -> Self {
        let mut by_name: BTreeMap<&str, BTreeSet<&TypeId>> = BTreeMap::new();
        for id in schema.types.iter().filter_map(|t| t.type_id()) {
            by_name.entry(id.name.as_str()).or_default().insert(id);
        }

        let mut proposed: Vec<(TypeId, String)> = Vec::new();
        for (name, ids) in &by_name {
            if ids.len() == 1 {
                proposed.extend(ids.iter().map(|id| ((*id).clone(), name.to_string())));
                continue;
            }
            for id in ids {
                let prefix = pascal_case(strip_prefix(&id.namespace, strip));
                proposed.push(((*id).clone(), format!("{}{}", prefix, name)));
            }
        }

        // Unprefixed names claim first so a prefixed name never shadows one.
        proposed.sort_by_key(|(id, emitted)| (emitted != &id.name, emitted.clone(), id.clone()));
        let mut used = BTreeSet::new();
        let mut names = BTreeMap::new();
        for (id, emitted) in proposed {
            let mut candidate = emitted.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{}_{}", emitted, n);
                n += 1;
            }
            used.insert(candidate.clone());
            names.insert(id, candidate);
        }
        Self { names }
    }

    pub fn get(&self, id: &TypeId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

/// File stems for per-namespace output.
#[derive(Debug, Clone, Default)]
pub struct NamespaceFiles {
    stems: BTreeMap<String, String>,
}

impl NamespaceFiles {
    pub fn new<'a>(namespaces: impl IntoIterator<Item = &'a str>, strip: &[String]) -> Self {
        let namespaces: BTreeSet<&str> = namespaces.into_iter().collect();

        let mut last_segments: BTreeMap<String, usize> = BTreeMap::new();
        for ns in &namespaces {
            *last_segments.entry(last_segment(strip_prefix(ns, strip))).or_default() += 1;
        }

        let mut stems = BTreeMap::new();
        for ns in namespaces {
            let remainder = strip_prefix(ns, strip);
            let short = last_segment(remainder);
            let stem = if last_segments.get(&short).copied().unwrap_or(0) > 1 {
                flatten(remainder)
            } else {
                short
            };
            let stem = match stem.as_str() {
                "" => "builtin".to_string(),
                "index" => "index_".to_string(),
                _ => stem,
            };
            stems.insert(ns.to_string(), stem);
        }
        Self { stems }
    }

    pub fn stem(&self, namespace: &str) -> Option<&str> {
        self.stems.get(namespace).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.stems.iter().map(|(ns, stem)| (ns.as_str(), stem.as_str()))
    }
}

fn strip_prefix<'a>(namespace: &'a str, strip: &[String]) -> &'a str {
    strip
        .iter()
        .find_map(|p| namespace.strip_prefix(p.as_str()))
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(namespace)
}

fn last_segment(path: &str) -> String {
    flatten(path.rsplit('/').next().unwrap_or(path))
}

fn flatten(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn pascal_case(path: &str) -> String {
    path.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{RecordType, TypeDescriptor};

    fn schema(ids: &[(&str, &str)]) -> Schema {
        let mut schema = Schema::new();
        for (ns, name) in ids {
            schema
                .add_type(TypeDescriptor::Record(RecordType::new(
                    TypeId::new(*ns, *name),
                    vec![],
                )))
                .unwrap();
        }
        schema
    }

    #[test]
    fn unique_names_are_unchanged() {
        let s = schema(&[("example.com/app/models", "User")]);
        let namer = TypeNamer::new(&s, &[]);
        assert_eq!(
            namer.get(&TypeId::new("example.com/app/models", "User")),
            Some("User")
        );
    }

    #[test]
    fn collisions_are_prefixed_after_stripping() {
        let s = schema(&[
            ("example.com/app/billing", "Invoice"),
            ("example.com/app/legacy", "Invoice"),
        ]);
        let namer = TypeNamer::new(&s, &["example.com/app/".to_string()]);
        assert_eq!(
            namer.get(&TypeId::new("example.com/app/billing", "Invoice")),
            Some("BillingInvoice")
        );
        assert_eq!(
            namer.get(&TypeId::new("example.com/app/legacy", "Invoice")),
            Some("LegacyInvoice")
        );

        let namer = TypeNamer::new(&s, &[]);
        assert_eq!(
            namer.get(&TypeId::new("example.com/app/billing", "Invoice")),
            Some("ExampleComAppBillingInvoice")
        );
    }

    #[test]
    fn prefixed_name_never_shadows_an_existing_one() {
        let s = schema(&[
            ("a/billing", "Invoice"),
            ("a/legacy", "Invoice"),
            ("a/other", "BillingInvoice"),
        ]);
        let namer = TypeNamer::new(&s, &["a/".to_string()]);
        assert_eq!(
            namer.get(&TypeId::new("a/other", "BillingInvoice")),
            Some("BillingInvoice")
        );
        assert_eq!(
            namer.get(&TypeId::new("a/billing", "Invoice")),
            Some("BillingInvoice_2")
        );
    }

    #[test]
    fn namespace_file_stems() {
        let files = NamespaceFiles::new(
            ["example.com/app/models", "example.com/app/v1/api", "example.com/app/v2/api"],
            &["example.com/app".to_string()],
        );
        assert_eq!(files.stem("example.com/app/models"), Some("models"));
        assert_eq!(files.stem("example.com/app/v1/api"), Some("v1_api"));
        assert_eq!(files.stem("example.com/app/v2/api"), Some("v2_api"));
    }
}
