//! Synthetic identifiers for generic instantiations.
//!
//! Both providers must agree on the name of `Page[models.User]`, so naming is a
//! pure function of the instantiation's textual description.

use super::TypeRef;
use crate::ir::TypeId;

/// Derive a valid identifier from a free-form description, such as the
/// `Parent_Field` hint that names an anonymous struct.
///
/// Package qualifiers are dropped (only the text after the last `.` of each
/// qualified token is kept), every separator becomes `_`, and runs of `_`
/// collapse. The result always matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn synthetic_name(description: &str) -> String {
    let mut out = String::with_capacity(description.len());
    let mut token = String::new();

    for c in description.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-') {
            token.push(c);
        } else {
            flush_token(&mut token, &mut out);
            push_separator(&mut out);
        }
    }
    flush_token(&mut token, &mut out);
    finish(&out)
}

fn flush_token(token: &mut String, out: &mut String) {
    if token.is_empty() {
        return;
    }
    let tail = match token.rfind('.') {
        Some(i) => &token[i + 1..],
        None => token.rsplit('/').next().unwrap_or(token),
    };
    push_identifier(tail, out);
    token.clear();
}

/// Append `text`, turning anything outside `[A-Za-z0-9]` into a separator.
fn push_identifier(text: &str, out: &mut String) {
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            push_separator(out);
        }
    }
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

fn finish(out: &str) -> String {
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "_".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Identifier of a (possibly instantiated) named type. Instantiations live in
/// the namespace of their generic declaration.
///
/// Arguments are spelled in prefix order: named types keep the last segment
/// of their package (`billing_User`), and containers get a marker
/// (`Ptr`, `Slice`, `Array4`, `Map`). Every constructor has a fixed arity,
/// so two instantiations only share a name when their packages share a last
/// segment; providers report that case as a resolution error.
pub fn instance_id(namespace: &str, name: &str, args: &[TypeRef]) -> TypeId {
    if args.is_empty() {
        return TypeId::new(namespace, name);
    }
    let mut out = String::new();
    push_identifier(name, &mut out);
    for arg in args {
        push_separator(&mut out);
        describe(arg, &mut out);
    }
    TypeId::new(namespace, finish(&out))
}

fn describe(r: &TypeRef, out: &mut String) {
    match r {
        TypeRef::Named {
            namespace,
            name,
            args,
        } => {
            if let Some(package) = namespace.rsplit('/').next().filter(|p| !p.is_empty()) {
                push_identifier(package, out);
                push_separator(out);
            }
            push_identifier(name, out);
            for arg in args {
                push_separator(out);
                describe(arg, out);
            }
        }
        TypeRef::Pointer(inner) => {
            out.push_str("Ptr_");
            describe(inner, out);
        }
        TypeRef::Slice(inner) => {
            out.push_str("Slice_");
            describe(inner, out);
        }
        TypeRef::Array { len, elem } => {
            out.push_str(&format!("Array{}_", len));
            describe(elem, out);
        }
        TypeRef::Map { key, value } => {
            out.push_str("Map_");
            describe(key, out);
            push_separator(out);
            describe(value, out);
        }
        TypeRef::Builtin(name) | TypeRef::Param(name) => push_identifier(name, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_identifier(s: &str) -> bool {
        let mut chars = s.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn name_of(description: &str) -> String {
        match description.parse::<TypeRef>().unwrap() {
            TypeRef::Named {
                namespace,
                name,
                args,
            } => instance_id(&namespace, &name, &args).name,
            other => panic!("not a named type: {}", other),
        }
    }

    #[test]
    fn strips_package_qualifiers() {
        assert_eq!(
            synthetic_name("Page[example.com/app/models.User]"),
            "Page_User"
        );
        assert_eq!(synthetic_name("User_Address"), "User_Address");
    }

    #[test]
    fn separators_collapse() {
        assert_eq!(
            synthetic_name("Pair[string,*example.com/x.Item]"),
            "Pair_string_Item"
        );
        assert_eq!(synthetic_name("Order__Lines-"), "Order_Lines");
    }

    #[test]
    fn deterministic() {
        let input = "example.com/a.Result[example.com/a.Page[example.com/b.Row],error]";
        assert_eq!(name_of(input), name_of(input));
        assert_eq!(name_of(input), "Result_a_Page_b_Row_error");
    }

    #[test]
    fn always_a_valid_identifier() {
        for input in ["", "[]", "[4]byte", "Größe[int]", "__x__", "a-b.c/d-e.F[G]"] {
            let name = synthetic_name(input);
            assert!(is_identifier(&name), "{:?} -> {:?}", input, name);
        }
        assert_eq!(synthetic_name("[4]byte"), "_4_byte");
        for input in [
            "example.com/m.Box[[4]byte]",
            "example.com/m.Box[gopkg.in/yaml.v3.Node]",
            "example.com/m.Box[map[string]*example.com/my-pkg.Item]",
        ] {
            let name = name_of(input);
            assert!(is_identifier(&name), "{:?} -> {:?}", input, name);
        }
    }

    #[test]
    fn package_of_argument_is_kept() {
        let page = |package: &str| {
            instance_id(
                "example.com/app/api",
                "Page",
                &[TypeRef::named(package, "User")],
            )
        };
        let billing = page("example.com/app/billing");
        let auth = page("example.com/app/auth");
        assert_ne!(billing, auth);
        assert_eq!(billing.name, "Page_billing_User");
        assert_eq!(auth.name, "Page_auth_User");
    }

    #[test]
    fn containers_are_distinguished() {
        let pairs = [
            ("example.com/m.Box[map[string][]int]", "example.com/m.Box[[]map[string]int]"),
            ("example.com/m.Box[*int]", "example.com/m.Box[int]"),
            ("example.com/m.Box[[]int]", "example.com/m.Box[[2]int]"),
            (
                "example.com/m.Pair[example.com/m.Box[int],string]",
                "example.com/m.Pair[int,example.com/m.Box[string]]",
            ),
        ];
        for (a, b) in pairs {
            assert_ne!(name_of(a), name_of(b), "{} vs {}", a, b);
        }
        assert_eq!(
            name_of("example.com/m.Box[map[string][]int]"),
            "Box_Map_string_Slice_int"
        );
        assert_eq!(
            name_of("example.com/m.Box[[]map[string]int]"),
            "Box_Slice_Map_string_int"
        );
    }

    #[test]
    fn instance_id_keeps_declaring_namespace() {
        let id = instance_id(
            "example.com/app/models",
            "Page",
            &[TypeRef::named("example.com/app/other", "User")],
        );
        assert_eq!(id, TypeId::new("example.com/app/models", "Page_other_User"));
        assert_eq!(
            instance_id("example.com/app/models", "User", &[]),
            TypeId::new("example.com/app/models", "User")
        );
    }
}
