//! Go source declaration parser.
//!
//! Reads one `.go` file with tree-sitter and keeps only what extraction needs:
//! imports, type declarations, and constants. Everything is copied out of the
//! syntax tree so packages can be cached independently of their sources.

use crate::input::ProviderError;
use crate::ir::{Documentation, SourceLocation};
use std::collections::BTreeMap;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone)]
pub struct GoFile {
    pub path: String,
    pub package: String,
    /// Local package name to import path.
    pub imports: BTreeMap<String, String>,
    pub types: Vec<GoTypeDecl>,
    pub consts: Vec<GoConst>,
}

#[derive(Debug, Clone)]
pub struct GoTypeDecl {
    pub name: String,
    pub type_params: Vec<GoTypeParam>,
    pub ty: GoType,
    /// `type A = B`
    pub alias: bool,
    pub doc: Documentation,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct GoTypeParam {
    pub name: String,
    pub constraint: GoType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoType {
    Ident(String),
    Qualified {
        package: String,
        name: String,
    },
    Generic {
        base: Box<GoType>,
        args: Vec<GoType>,
    },
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array {
        len: Option<u64>,
        elem: Box<GoType>,
    },
    Map {
        key: Box<GoType>,
        value: Box<GoType>,
    },
    Struct(Vec<GoField>),
    Interface {
        elems: Vec<GoType>,
        has_methods: bool,
    },
    Union(Vec<GoType>),
    /// `~T`
    Tilde(Box<GoType>),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoField {
    /// Empty for embedded fields.
    pub names: Vec<String>,
    pub ty: GoType,
    pub tag: String,
    pub doc: Documentation,
}

impl GoField {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GoConst {
    pub name: String,
    /// Declared (or implicitly repeated) type name.
    pub ty: Option<String>,
    pub value: Option<ConstExpr>,
    /// Position of the spec within its declaration group.
    pub iota: i64,
    pub doc: Documentation,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstExpr {
    Int(i64),
    Float(f64),
    Str(String),
    Iota,
    Ident(String),
    Neg(Box<ConstExpr>),
    Binary {
        op: String,
        left: Box<ConstExpr>,
        right: Box<ConstExpr>,
    },
    Conversion {
        ty: String,
        value: Box<ConstExpr>,
    },
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstExpr {
    /// Evaluate with the given `iota`. Identifiers are looked up in `scope`.
    pub fn eval(&self, iota: i64, scope: &BTreeMap<String, ConstValue>) -> Option<ConstValue> {
        match self {
            ConstExpr::Int(v) => Some(ConstValue::Int(*v)),
            ConstExpr::Float(v) => Some(ConstValue::Float(*v)),
            ConstExpr::Str(s) => Some(ConstValue::Str(s.clone())),
            ConstExpr::Iota => Some(ConstValue::Int(iota)),
            ConstExpr::Ident(name) => scope.get(name).cloned(),
            ConstExpr::Conversion { value, .. } => value.eval(iota, scope),
            ConstExpr::Neg(inner) => match inner.eval(iota, scope)? {
                ConstValue::Int(v) => v.checked_neg().map(ConstValue::Int),
                ConstValue::Float(v) => Some(ConstValue::Float(-v)),
                ConstValue::Str(_) => None,
            },
            ConstExpr::Binary { op, left, right } => {
                let l = left.eval(iota, scope)?;
                let r = right.eval(iota, scope)?;
                binary(op, l, r)
            }
            ConstExpr::Unknown(_) => None,
        }
    }
}

fn binary(op: &str, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    match (l, r) {
        (Int(a), Int(b)) => {
            let v = match op {
                "+" => a.checked_add(b)?,
                "-" => a.checked_sub(b)?,
                "*" => a.checked_mul(b)?,
                "/" => a.checked_div(b)?,
                "%" => a.checked_rem(b)?,
                "<<" => a.checked_shl(u32::try_from(b).ok()?)?,
                ">>" => a.checked_shr(u32::try_from(b).ok()?)?,
                "|" => a | b,
                "&" => a & b,
                "^" => a ^ b,
                _ => return None,
            };
            Some(Int(v))
        }
        (Str(a), Str(b)) if op == "+" => Some(Str(a + &b)),
        (a, b) => {
            let (a, b) = (as_float(a)?, as_float(b)?);
            let v = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                _ => return None,
            };
            Some(Float(v))
        }
    }
}

fn as_float(v: ConstValue) -> Option<f64> {
    match v {
        ConstValue::Int(i) => Some(i as f64),
        ConstValue::Float(f) => Some(f),
        ConstValue::Str(_) => None,
    }
}

/// Parse a Go source file. `path` is used for diagnostics and source locations.
pub fn parse_file(source: &str, path: &str) -> Result<GoFile, ProviderError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_go::language().into())
        .map_err(|e| ProviderError::Parse {
            path: path.to_string(),
            message: format!("tree-sitter init: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| ProviderError::Parse {
        path: path.to_string(),
        message: "parser returned no tree".into(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(ProviderError::Parse {
            path: path.to_string(),
            message: format!("syntax error at {}:{}", at.row + 1, at.column + 1),
        });
    }

    let ctx = ExtractContext { source, path };
    Ok(ctx.extract_file(root))
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.has_error())
        .find_map(first_error)
}

struct ExtractContext<'a> {
    source: &'a str,
    path: &'a str,
}

impl<'a> ExtractContext<'a> {
    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn location(&self, node: Node) -> SourceLocation {
        let pos = node.start_position();
        SourceLocation {
            file: self.path.to_string(),
            line: pos.row as u32 + 1,
            column: pos.column as u32 + 1,
        }
    }

    fn extract_file(&self, root: Node) -> GoFile {
        let mut file = GoFile {
            path: self.path.to_string(),
            package: String::new(),
            imports: BTreeMap::new(),
            types: Vec::new(),
            consts: Vec::new(),
        };

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    if let Some(name) = child.named_child(0) {
                        file.package = self.node_text(name).to_string();
                    }
                }
                "import_declaration" => self.extract_imports(child, &mut file.imports),
                "type_declaration" => {
                    let mut specs = child.walk();
                    for spec in child.named_children(&mut specs) {
                        if matches!(spec.kind(), "type_spec" | "type_alias")
                            && let Some(decl) = self.extract_type_spec(spec, child)
                        {
                            file.types.push(decl);
                        }
                    }
                }
                "const_declaration" => self.extract_consts(child, &mut file.consts),
                _ => {}
            }
        }

        file
    }

    fn extract_imports(&self, node: Node, out: &mut BTreeMap<String, String>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => self.extract_import_spec(child, out),
                "import_spec_list" => {
                    let mut list = child.walk();
                    for spec in child.named_children(&mut list) {
                        if spec.kind() == "import_spec" {
                            self.extract_import_spec(spec, out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_import_spec(&self, spec: Node, out: &mut BTreeMap<String, String>) {
        let Some(path) = spec.child_by_field_name("path") else {
            return;
        };
        let path = self.node_text(path).trim_matches('"').to_string();
        let local = match spec.child_by_field_name("name") {
            Some(name) if name.kind() == "package_identifier" => self.node_text(name).to_string(),
            // dot and blank imports contribute no qualifier
            Some(_) => return,
            None => default_package_name(&path),
        };
        out.insert(local, path);
    }

    fn extract_type_spec(&self, spec: Node, decl: Node) -> Option<GoTypeDecl> {
        let name = self.node_text(spec.child_by_field_name("name")?).to_string();
        let ty = self.parse_type(spec.child_by_field_name("type")?);

        let mut type_params = Vec::new();
        if let Some(list) = spec.child_by_field_name("type_parameters") {
            let mut cursor = list.walk();
            for param in list.named_children(&mut cursor) {
                if !matches!(
                    param.kind(),
                    "type_parameter_declaration" | "parameter_declaration"
                ) {
                    continue;
                }
                let constraint = param
                    .child_by_field_name("type")
                    .map(|t| self.parse_type(t))
                    .unwrap_or_else(|| GoType::Ident("any".into()));
                let mut names = param.walk();
                for n in param.children_by_field_name("name", &mut names) {
                    type_params.push(GoTypeParam {
                        name: self.node_text(n).to_string(),
                        constraint: constraint.clone(),
                    });
                }
            }
        }

        let mut doc = self.doc_before(spec);
        if doc.is_empty() {
            doc = self.doc_before(decl);
        }

        Some(GoTypeDecl {
            name,
            type_params,
            ty,
            alias: spec.kind() == "type_alias",
            doc: parse_doc(&doc),
            location: self.location(spec),
        })
    }

    fn parse_type(&self, node: Node) -> GoType {
        match node.kind() {
            "type_identifier" | "identifier" => GoType::Ident(self.node_text(node).to_string()),
            "qualified_type" => {
                let package = node
                    .child_by_field_name("package")
                    .map(|n| self.node_text(n))
                    .unwrap_or("");
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.node_text(n))
                    .unwrap_or("");
                GoType::Qualified {
                    package: package.to_string(),
                    name: name.to_string(),
                }
            }
            "generic_type" => {
                let base = node
                    .child_by_field_name("type")
                    .map(|t| self.parse_type(t))
                    .unwrap_or_else(|| GoType::Unsupported(self.node_text(node).into()));
                let mut args = Vec::new();
                if let Some(list) = node.child_by_field_name("type_arguments") {
                    let mut cursor = list.walk();
                    for arg in list.named_children(&mut cursor) {
                        args.push(self.parse_type(arg));
                    }
                }
                GoType::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            "pointer_type" => GoType::Pointer(Box::new(self.first_named_type(node))),
            "slice_type" => GoType::Slice(Box::new(self.field_type(node, "element"))),
            "array_type" => {
                let len = node
                    .child_by_field_name("length")
                    .and_then(|l| parse_int(self.node_text(l)))
                    .and_then(|l| u64::try_from(l).ok());
                GoType::Array {
                    len,
                    elem: Box::new(self.field_type(node, "element")),
                }
            }
            "map_type" => GoType::Map {
                key: Box::new(self.field_type(node, "key")),
                value: Box::new(self.field_type(node, "value")),
            },
            "struct_type" => {
                let mut fields = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "field_declaration_list" {
                        fields = self.extract_fields(child);
                    }
                }
                GoType::Struct(fields)
            }
            "interface_type" => {
                let mut elems = Vec::new();
                let mut has_methods = false;
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "method_elem" | "method_spec" => has_methods = true,
                        "comment" => {}
                        _ => elems.push(self.parse_type(child)),
                    }
                }
                GoType::Interface { elems, has_methods }
            }
            "type_elem" | "type_constraint" | "constraint_elem" => {
                let mut terms: Vec<GoType> = {
                    let mut cursor = node.walk();
                    node.named_children(&mut cursor)
                        .filter(|c| c.kind() != "comment")
                        .map(|c| self.parse_type(c))
                        .collect()
                };
                if terms.len() == 1 {
                    terms.remove(0)
                } else {
                    GoType::Union(terms)
                }
            }
            "negated_type" => GoType::Tilde(Box::new(self.first_named_type(node))),
            "constraint_term" => {
                let inner = self.first_named_type(node);
                if self.node_text(node).trim_start().starts_with('~') {
                    GoType::Tilde(Box::new(inner))
                } else {
                    inner
                }
            }
            "parenthesized_type" => self.first_named_type(node),
            _ => GoType::Unsupported(self.node_text(node).to_string()),
        }
    }

    fn first_named_type(&self, node: Node) -> GoType {
        node.named_child(0)
            .map(|c| self.parse_type(c))
            .unwrap_or_else(|| GoType::Unsupported(self.node_text(node).into()))
    }

    fn field_type(&self, node: Node, field: &str) -> GoType {
        node.child_by_field_name(field)
            .map(|c| self.parse_type(c))
            .unwrap_or_else(|| GoType::Unsupported(self.node_text(node).into()))
    }

    fn extract_fields(&self, list: Node) -> Vec<GoField> {
        let mut fields = Vec::new();
        let mut cursor = list.walk();
        for child in list.named_children(&mut cursor) {
            if child.kind() != "field_declaration" {
                continue;
            }
            let Some(ty_node) = child.child_by_field_name("type") else {
                continue;
            };
            let mut ty = self.parse_type(ty_node);

            let mut names_cursor = child.walk();
            let names: Vec<String> = child
                .children_by_field_name("name", &mut names_cursor)
                .map(|n| self.node_text(n).to_string())
                .collect();

            if names.is_empty() {
                // embedded `*T` keeps the star as an anonymous token
                let mut tokens = child.walk();
                let starred = child
                    .children(&mut tokens)
                    .any(|c| !c.is_named() && self.node_text(c) == "*");
                if starred {
                    ty = GoType::Pointer(Box::new(ty));
                }
            }

            let tag = child
                .child_by_field_name("tag")
                .map(|t| self.node_text(t).to_string())
                .unwrap_or_default();

            fields.push(GoField {
                names,
                ty,
                tag,
                doc: parse_doc(&self.doc_before(child)),
            });
        }
        fields
    }

    fn extract_consts(&self, decl: Node, out: &mut Vec<GoConst>) {
        let mut prev_ty: Option<String> = None;
        let mut prev_values: Vec<ConstExpr> = Vec::new();
        let mut iota = 0;

        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            if spec.kind() != "const_spec" {
                continue;
            }

            let mut values: Vec<ConstExpr> = Vec::new();
            if let Some(list) = spec.child_by_field_name("value") {
                let mut vc = list.walk();
                values = list
                    .named_children(&mut vc)
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.parse_expr(c))
                    .collect();
            }
            let declared = spec
                .child_by_field_name("type")
                .map(|t| self.node_text(t).to_string());

            let ty = if values.is_empty() {
                values = prev_values.clone();
                prev_ty.clone()
            } else {
                let ty = declared.or_else(|| match values.first() {
                    Some(ConstExpr::Conversion { ty, .. }) => Some(ty.clone()),
                    _ => None,
                });
                prev_ty = ty.clone();
                prev_values = values.clone();
                ty
            };

            let mut doc = self.doc_before(spec);
            if doc.is_empty() && decl.named_child_count() == 1 {
                doc = self.doc_before(decl);
            }
            let doc = parse_doc(&doc);

            let mut names = spec.walk();
            for (i, name) in spec.children_by_field_name("name", &mut names).enumerate() {
                out.push(GoConst {
                    name: self.node_text(name).to_string(),
                    ty: ty.clone(),
                    value: values.get(i).cloned(),
                    iota,
                    doc: doc.clone(),
                    location: self.location(name),
                });
            }
            iota += 1;
        }
    }

    fn parse_expr(&self, node: Node) -> ConstExpr {
        let text = self.node_text(node);
        match node.kind() {
            "int_literal" => parse_int(text)
                .map(ConstExpr::Int)
                .unwrap_or_else(|| ConstExpr::Unknown(text.into())),
            "float_literal" => text
                .replace('_', "")
                .parse()
                .map(ConstExpr::Float)
                .unwrap_or_else(|_| ConstExpr::Unknown(text.into())),
            "interpreted_string_literal" => ConstExpr::Str(unquote(text)),
            "raw_string_literal" => ConstExpr::Str(text.trim_matches('`').to_string()),
            "rune_literal" => {
                let inner = unquote(text.trim_matches('\''));
                match inner.chars().next() {
                    Some(c) if inner.chars().count() == 1 => ConstExpr::Int(c as i64),
                    _ => ConstExpr::Unknown(text.into()),
                }
            }
            "iota" => ConstExpr::Iota,
            "identifier" if text == "iota" => ConstExpr::Iota,
            "identifier" => ConstExpr::Ident(text.to_string()),
            "parenthesized_expression" => node
                .named_child(0)
                .map(|c| self.parse_expr(c))
                .unwrap_or_else(|| ConstExpr::Unknown(text.into())),
            "unary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.node_text(o))
                    .unwrap_or("");
                let Some(operand) = node.child_by_field_name("operand") else {
                    return ConstExpr::Unknown(text.into());
                };
                match op {
                    "-" => ConstExpr::Neg(Box::new(self.parse_expr(operand))),
                    "+" => self.parse_expr(operand),
                    _ => ConstExpr::Unknown(text.into()),
                }
            }
            "binary_expression" => {
                let (Some(left), Some(op), Some(right)) = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("right"),
                ) else {
                    return ConstExpr::Unknown(text.into());
                };
                ConstExpr::Binary {
                    op: self.node_text(op).to_string(),
                    left: Box::new(self.parse_expr(left)),
                    right: Box::new(self.parse_expr(right)),
                }
            }
            "call_expression" => {
                let func = node.child_by_field_name("function");
                let arg = node
                    .child_by_field_name("arguments")
                    .and_then(|a| a.named_child(0));
                match (func, arg) {
                    (Some(f), Some(a)) if f.kind() == "identifier" => ConstExpr::Conversion {
                        ty: self.node_text(f).to_string(),
                        value: Box::new(self.parse_expr(a)),
                    },
                    _ => ConstExpr::Unknown(text.into()),
                }
            }
            "type_conversion_expression" => {
                match (
                    node.child_by_field_name("type"),
                    node.child_by_field_name("operand"),
                ) {
                    (Some(t), Some(v)) => ConstExpr::Conversion {
                        ty: self.node_text(t).to_string(),
                        value: Box::new(self.parse_expr(v)),
                    },
                    _ => ConstExpr::Unknown(text.into()),
                }
            }
            _ => ConstExpr::Unknown(text.into()),
        }
    }

    /// Lines of the comment block directly above `node`, without markers.
    fn doc_before(&self, node: Node) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut row = node.start_position().row;
        let mut current = node.prev_sibling();
        while let Some(c) = current {
            if c.kind() != "comment" || c.end_position().row + 1 != row {
                break;
            }
            blocks.push(self.node_text(c));
            row = c.start_position().row;
            current = c.prev_sibling();
        }
        blocks.reverse();

        let mut lines = Vec::new();
        for block in blocks {
            if let Some(line) = block.strip_prefix("//") {
                if line.starts_with("go:") || line.starts_with("nolint") {
                    continue;
                }
                lines.push(line.strip_prefix(' ').unwrap_or(line).to_string());
            } else {
                let inner = block.trim_start_matches("/*").trim_end_matches("*/");
                lines.extend(inner.lines().map(|l| l.trim().to_string()));
            }
        }
        lines
    }
}

/// Split comment lines into summary, body, and a `Deprecated:` notice.
pub fn parse_doc(lines: &[String]) -> Documentation {
    let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];
    for line in lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
        } else if let Some(p) = paragraphs.last_mut() {
            p.push(line);
        }
    }
    paragraphs.retain(|p| !p.is_empty());

    let mut doc = Documentation::default();
    let mut body = Vec::new();
    for (i, p) in paragraphs.iter().enumerate() {
        if let Some(rest) = p[0].strip_prefix("Deprecated:") {
            let mut text = vec![rest.trim()];
            text.extend(p[1..].iter().map(|l| l.trim()));
            doc.deprecated = Some(text.join(" ").trim().to_string());
        } else if i == 0 {
            doc.summary = p.iter().map(|l| l.trim()).collect::<Vec<_>>().join(" ");
        } else {
            body.push(p.join("\n"));
        }
    }
    doc.body = body.join("\n\n");
    doc
}

/// Package name Go assumes for an unaliased import path.
pub fn default_package_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    let is_major = |s: &str| {
        s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit())
    };
    if is_major(last)
        && let Some(prev) = segments.next()
    {
        last = prev;
    }
    // gopkg.in/yaml.v3
    let base = match last.rsplit_once('.') {
        Some((head, tail)) if is_major(tail) => head,
        _ => last,
    };
    base.replace('-', "_")
}

fn parse_int(text: &str) -> Option<i64> {
    let t = text.replace('_', "");
    let (digits, radix) = if let Some(h) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        (h.to_string(), 16)
    } else if let Some(b) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        (b.to_string(), 2)
    } else if let Some(o) = t.strip_prefix("0o").or_else(|| t.strip_prefix("0O")) {
        (o.to_string(), 8)
    } else if t.len() > 1 && t.starts_with('0') {
        (t[1..].to_string(), 8)
    } else {
        (t, 10)
    };
    i64::from_str_radix(&digits, radix).ok()
}

fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('"').unwrap_or(text);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> GoFile {
        parse_file(src, "models/user.go").unwrap()
    }

    #[test]
    fn test_struct_fields_and_tags() {
        let file = parse(
            r#"
package models

import (
    "time"
    ext "example.com/other/pkg"
)

// User is a registered account.
//
// Users are created on signup.
type User struct {
    // ID is the primary key.
    ID        int64     `json:"id"`
    Email     string    `json:"email" validate:"required,email"`
    First, Last string
    Created   time.Time `json:"created"`
    Extra     ext.Thing
    Base
    *Audit
}
"#,
        );
        assert_eq!(file.package, "models");
        assert_eq!(file.imports.get("time").map(String::as_str), Some("time"));
        assert_eq!(
            file.imports.get("ext").map(String::as_str),
            Some("example.com/other/pkg")
        );

        let user = &file.types[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.doc.summary, "User is a registered account.");
        assert_eq!(user.doc.body, "Users are created on signup.");
        assert_eq!(user.location.line, 12);

        let GoType::Struct(fields) = &user.ty else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].names, vec!["ID"]);
        assert_eq!(fields[0].doc.summary, "ID is the primary key.");
        assert_eq!(fields[1].tag, r#"`json:"email" validate:"required,email"`"#);
        assert_eq!(fields[2].names, vec!["First", "Last"]);
        assert_eq!(
            fields[3].ty,
            GoType::Qualified {
                package: "time".into(),
                name: "Time".into()
            }
        );
        assert!(fields[5].is_embedded());
        assert_eq!(
            fields[6].ty,
            GoType::Pointer(Box::new(GoType::Ident("Audit".into())))
        );
    }

    #[test]
    fn test_generic_declaration() {
        let file = parse(
            r#"
package models

type Page[T any] struct {
    Items []T `json:"items"`
    Total int `json:"total"`
}

type Number interface {
    ~int | ~float64
}

type Stats[N Number] struct {
    Sum N
}
"#,
        );
        let page = &file.types[0];
        assert_eq!(page.type_params.len(), 1);
        assert_eq!(page.type_params[0].name, "T");
        assert_eq!(page.type_params[0].constraint, GoType::Ident("any".into()));

        let GoType::Interface { elems, has_methods } = &file.types[1].ty else {
            panic!("expected interface");
        };
        assert!(!has_methods);
        assert_eq!(
            elems[0],
            GoType::Union(vec![
                GoType::Tilde(Box::new(GoType::Ident("int".into()))),
                GoType::Tilde(Box::new(GoType::Ident("float64".into()))),
            ])
        );
    }

    #[test]
    fn test_iota_constants() {
        let file = parse(
            r#"
package models

type Level int

const (
    // LevelLow is the default.
    LevelLow Level = iota + 1
    LevelMid
    _
    LevelHigh
)

const Name = "x"
"#,
        );
        let scope = BTreeMap::new();
        let values: Vec<(String, Option<String>, Option<ConstValue>)> = file
            .consts
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    c.ty.clone(),
                    c.value.as_ref().and_then(|v| v.eval(c.iota, &scope)),
                )
            })
            .collect();
        assert_eq!(values[0].1.as_deref(), Some("Level"));
        assert_eq!(values[0].2, Some(ConstValue::Int(1)));
        assert_eq!(values[1].2, Some(ConstValue::Int(2)));
        assert_eq!(values[3].0, "LevelHigh");
        assert_eq!(values[3].2, Some(ConstValue::Int(4)));
        assert_eq!(values[4].1, None);
        assert_eq!(file.consts[0].doc.summary, "LevelLow is the default.");
    }

    #[test]
    fn test_deprecated_paragraph() {
        let doc = parse_doc(&[
            "Legacy is old.".to_string(),
            "".to_string(),
            "Deprecated: use Modern instead.".to_string(),
        ]);
        assert_eq!(doc.summary, "Legacy is old.");
        assert!(doc.body.is_empty());
        assert_eq!(doc.deprecated.as_deref(), Some("use Modern instead."));
    }

    #[test]
    fn test_default_package_name() {
        assert_eq!(default_package_name("example.com/app/models"), "models");
        assert_eq!(default_package_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(default_package_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(default_package_name("github.com/go-chi/chi"), "chi");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = parse_file("package models\ntype X struct {", "bad.go").unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }
}
