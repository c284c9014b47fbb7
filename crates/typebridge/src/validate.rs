//! Structural validation of a [`Schema`].
//!
//! [`Schema::validate`] collects every violation; [`Schema::ensure_valid`]
//! layers the abort-on-first policy on top of it.

use crate::ir::{Schema, TypeDescriptor, TypeId, TypeParam};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    DuplicateType,
    InvalidStringEncoded,
    MissingExtendsReference,
    CircularInheritance,
    MissingTypeReference,
    InvalidFullname,
    InvalidPath,
    DuplicateEndpoint,
    IllegalUnion,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationCode::DuplicateType => "duplicate_type",
            ValidationCode::InvalidStringEncoded => "invalid_string_encoded",
            ValidationCode::MissingExtendsReference => "missing_extends_reference",
            ValidationCode::CircularInheritance => "circular_inheritance",
            ValidationCode::MissingTypeReference => "missing_type_reference",
            ValidationCode::InvalidFullname => "invalid_fullname",
            ValidationCode::InvalidPath => "invalid_path",
            ValidationCode::DuplicateEndpoint => "duplicate_endpoint",
            ValidationCode::IllegalUnion => "illegal_union",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl ValidationError {
    fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            type_name: None,
        }
    }

    fn on(mut self, id: &TypeId) -> Self {
        self.type_name = Some(id.qualified());
        self
    }
}

/// The first violation of a schema plus the complete list.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{first} ({} violation(s) in total)", .all.len())]
pub struct InvalidSchema {
    pub first: ValidationError,
    pub all: Vec<ValidationError>,
}

impl Schema {
    /// Check the schema and return every violation found. Never fails fast.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let names = self.check_duplicates(&mut errors);
        self.check_string_encoding(&mut errors);
        self.check_extends(&names, &mut errors);
        self.check_type_references(&names, &mut errors);
        self.check_services(&names, &mut errors);
        self.check_unions(&mut errors);
        tracing::debug!(
            types = self.types.len(),
            services = self.services.len(),
            errors = errors.len(),
            "validated schema"
        );
        errors
    }

    /// Abort-on-first layer over [`Schema::validate`].
    pub fn ensure_valid(&self) -> Result<(), InvalidSchema> {
        let all = self.validate();
        match all.first() {
            None => Ok(()),
            Some(first) => Err(InvalidSchema {
                first: first.clone(),
                all,
            }),
        }
    }

    fn check_duplicates(&self, errors: &mut Vec<ValidationError>) -> HashSet<TypeId> {
        let mut names = HashSet::new();
        for id in self.types.iter().filter_map(TypeDescriptor::type_id) {
            if !names.insert(id.clone()) {
                errors.push(
                    ValidationError::new(
                        ValidationCode::DuplicateType,
                        format!("type {} is defined more than once", id),
                    )
                    .on(id),
                );
            }
        }
        names
    }

    fn check_string_encoding(&self, errors: &mut Vec<ValidationError>) {
        for ty in &self.types {
            let TypeDescriptor::Record(record) = ty else {
                continue;
            };
            for field in record.fields.iter().filter(|f| f.string_encoded) {
                if !self.is_string_encodable(&field.ty, 0) {
                    errors.push(
                        ValidationError::new(
                            ValidationCode::InvalidStringEncoded,
                            format!(
                                "field {}.{} is string-encoded but has non-scalar type {}",
                                record.id.name,
                                field.name,
                                field.ty.kind_name()
                            ),
                        )
                        .on(&record.id),
                    );
                }
            }
        }
    }

    /// Scalars, through any number of pointers, and named scalars.
    fn is_string_encodable(&self, ty: &TypeDescriptor, depth: usize) -> bool {
        if depth > 8 {
            return false;
        }
        match ty.deref() {
            TypeDescriptor::Primitive(p) => p.kind.is_scalar(),
            TypeDescriptor::Reference(id) => match self.find_type(id) {
                Some(TypeDescriptor::Alias(alias)) => {
                    self.is_string_encodable(&alias.underlying, depth + 1)
                }
                Some(TypeDescriptor::Enum(_)) => true,
                _ => false,
            },
            _ => false,
        }
    }

    fn check_extends(&self, names: &HashSet<TypeId>, errors: &mut Vec<ValidationError>) {
        let mut graph: BTreeMap<&TypeId, Vec<&TypeId>> = BTreeMap::new();
        for ty in &self.types {
            let TypeDescriptor::Record(record) = ty else {
                continue;
            };
            let edges = graph.entry(&record.id).or_default();
            for parent in &record.extends {
                if names.contains(parent) {
                    edges.push(parent);
                } else {
                    errors.push(
                        ValidationError::new(
                            ValidationCode::MissingExtendsReference,
                            format!("{} extends unknown type {}", record.id, parent),
                        )
                        .on(&record.id),
                    );
                }
            }
        }

        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();
        for &node in graph.keys() {
            detect_cycles(node, &graph, &mut visited, &mut stack, errors);
        }
    }

    fn check_type_references(&self, names: &HashSet<TypeId>, errors: &mut Vec<ValidationError>) {
        for ty in &self.types {
            let Some(owner) = ty.type_id() else {
                continue;
            };
            for target in ty.references() {
                if !names.contains(target) {
                    errors.push(
                        ValidationError::new(
                            ValidationCode::MissingTypeReference,
                            format!("{} references unknown type {}", owner, target),
                        )
                        .on(owner),
                    );
                }
            }
        }
    }

    fn check_services(&self, names: &HashSet<TypeId>, errors: &mut Vec<ValidationError>) {
        for service in &self.services {
            let mut seen = HashSet::new();
            for endpoint in &service.endpoints {
                if !seen.insert(endpoint.name.as_str()) {
                    errors.push(ValidationError::new(
                        ValidationCode::DuplicateEndpoint,
                        format!(
                            "endpoint {} is declared more than once in service {}",
                            endpoint.name, service.name
                        ),
                    ));
                }

                let expected = format!("{}.{}", service.name, endpoint.name);
                if endpoint.full_name != expected {
                    errors.push(ValidationError::new(
                        ValidationCode::InvalidFullname,
                        format!(
                            "endpoint full name {:?} should be {:?}",
                            endpoint.full_name, expected
                        ),
                    ));
                }

                let expected = format!("/{}/{}", service.name, endpoint.name);
                if endpoint.path != expected {
                    errors.push(ValidationError::new(
                        ValidationCode::InvalidPath,
                        format!(
                            "endpoint {} has path {:?}, expected {:?}",
                            endpoint.full_name, endpoint.path, expected
                        ),
                    ));
                }

                let bodies = endpoint
                    .request
                    .iter()
                    .map(|r| ("request", r))
                    .chain(std::iter::once(("response", &endpoint.response)));
                for (role, ty) in bodies {
                    for target in ty.references() {
                        if !names.contains(target) {
                            errors.push(ValidationError::new(
                                ValidationCode::MissingTypeReference,
                                format!(
                                    "{} {} references unknown type {}",
                                    endpoint.full_name, role, target
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    fn check_unions(&self, errors: &mut Vec<ValidationError>) {
        for ty in &self.types {
            let Some(owner) = ty.type_id() else {
                continue;
            };
            let mut count = 0;
            count_stray_unions(ty, false, &mut count);
            for _ in 0..count {
                errors.push(
                    ValidationError::new(
                        ValidationCode::IllegalUnion,
                        format!(
                            "{} uses a union outside of a type-parameter constraint",
                            owner
                        ),
                    )
                    .on(owner),
                );
            }
        }
        for endpoint in self.services.iter().flat_map(|s| &s.endpoints) {
            let mut count = 0;
            if let Some(request) = &endpoint.request {
                count_stray_unions(request, false, &mut count);
            }
            count_stray_unions(&endpoint.response, false, &mut count);
            for _ in 0..count {
                errors.push(ValidationError::new(
                    ValidationCode::IllegalUnion,
                    format!(
                        "{} uses a union outside of a type-parameter constraint",
                        endpoint.full_name
                    ),
                ));
            }
        }
    }
}

fn detect_cycles<'a>(
    node: &'a TypeId,
    graph: &BTreeMap<&'a TypeId, Vec<&'a TypeId>>,
    visited: &mut BTreeSet<&'a TypeId>,
    stack: &mut Vec<&'a TypeId>,
    errors: &mut Vec<ValidationError>,
) {
    if visited.contains(node) {
        return;
    }
    visited.insert(node);
    stack.push(node);
    for &next in graph.get(node).into_iter().flatten() {
        if let Some(pos) = stack.iter().position(|n| *n == next) {
            let path: Vec<String> = stack[pos..]
                .iter()
                .chain(std::iter::once(&next))
                .map(|id| id.name.clone())
                .collect();
            errors.push(
                ValidationError::new(
                    ValidationCode::CircularInheritance,
                    format!("circular inheritance: {}", path.join(" -> ")),
                )
                .on(next),
            );
        } else {
            detect_cycles(next, graph, visited, stack, errors);
        }
    }
    stack.pop();
}

fn count_stray_unions(ty: &TypeDescriptor, in_constraint: bool, count: &mut usize) {
    let params = |params: &[TypeParam], count: &mut usize| {
        for c in params.iter().filter_map(|p| p.constraint.as_deref()) {
            count_stray_unions(c, true, count);
        }
    };
    match ty {
        TypeDescriptor::Record(r) => {
            params(&r.type_params, count);
            for f in &r.fields {
                count_stray_unions(&f.ty, in_constraint, count);
            }
        }
        TypeDescriptor::Alias(a) => {
            params(&a.type_params, count);
            count_stray_unions(&a.underlying, in_constraint, count);
        }
        TypeDescriptor::Array { elem, .. } | TypeDescriptor::Pointer { elem } => {
            count_stray_unions(elem, in_constraint, count)
        }
        TypeDescriptor::Map { key, value } => {
            count_stray_unions(key, in_constraint, count);
            count_stray_unions(value, in_constraint, count);
        }
        TypeDescriptor::Union { members } => {
            if !in_constraint {
                *count += 1;
            }
            for m in members {
                count_stray_unions(m, in_constraint, count);
            }
        }
        TypeDescriptor::TypeParameter(p) => {
            if let Some(c) = &p.constraint {
                count_stray_unions(c, true, count);
            }
        }
        TypeDescriptor::Enum(_) | TypeDescriptor::Primitive(_) | TypeDescriptor::Reference(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AliasType, Endpoint, Field, PrimitiveKind, RecordType, Service};

    const NS: &str = "example.com/app/models";

    fn record(name: &str, fields: Vec<Field>) -> TypeDescriptor {
        TypeDescriptor::Record(RecordType::new(TypeId::new(NS, name), fields))
    }

    fn extends(name: &str, parents: &[&str]) -> TypeDescriptor {
        let mut r = RecordType::new(TypeId::new(NS, name), Vec::new());
        r.extends = parents.iter().map(|p| TypeId::new(NS, *p)).collect();
        TypeDescriptor::Record(r)
    }

    fn endpoint(service: &str, name: &str, response: TypeDescriptor) -> Endpoint {
        Endpoint {
            name: name.into(),
            full_name: format!("{}.{}", service, name),
            http_verb: "POST".into(),
            path: format!("/{}/{}", service, name),
            request: None,
            response,
            doc: Default::default(),
        }
    }

    fn codes(errors: &[ValidationError]) -> Vec<ValidationCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn sound_schema_has_no_errors() {
        let mut schema = Schema::new();
        schema
            .add_type(record(
                "User",
                vec![Field::new("Tags", TypeDescriptor::array(TypeDescriptor::string()))],
            ))
            .unwrap();
        schema
            .add_type(record(
                "Team",
                vec![Field::new("Owner", TypeDescriptor::reference(NS, "User"))],
            ))
            .unwrap();
        assert!(schema.validate().is_empty());
        assert!(schema.ensure_valid().is_ok());
    }

    #[test]
    fn duplicate_type_is_reported_once() {
        let mut schema = Schema::new();
        schema.add_type(record("User", vec![])).unwrap();
        schema.add_type(record("User", vec![])).unwrap();
        assert_eq!(codes(&schema.validate()), vec![ValidationCode::DuplicateType]);
    }

    #[test]
    fn same_name_in_other_namespace_is_fine() {
        let mut schema = Schema::new();
        schema.add_type(record("User", vec![])).unwrap();
        schema
            .add_type(TypeDescriptor::Record(RecordType::new(
                TypeId::new("example.com/app/billing", "User"),
                vec![],
            )))
            .unwrap();
        assert!(schema.validate().is_empty());
    }

    #[test]
    fn circular_inheritance() {
        let mut schema = Schema::new();
        schema.add_type(extends("A", &["B"])).unwrap();
        schema.add_type(extends("B", &["A"])).unwrap();
        let errors = schema.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.code == ValidationCode::CircularInheritance)
        );
        let cycle = errors
            .iter()
            .find(|e| e.code == ValidationCode::CircularInheritance)
            .unwrap();
        assert!(cycle.message.contains("A -> B -> A"));
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut schema = Schema::new();
        schema.add_type(extends("A", &["A"])).unwrap();
        assert_eq!(
            codes(&schema.validate()),
            vec![ValidationCode::CircularInheritance]
        );
    }

    #[test]
    fn missing_extends_reference() {
        let mut schema = Schema::new();
        schema.add_type(extends("A", &["Ghost"])).unwrap();
        assert_eq!(
            codes(&schema.validate()),
            vec![ValidationCode::MissingExtendsReference]
        );
    }

    #[test]
    fn string_encoding_only_on_scalars() {
        let mut schema = Schema::new();
        schema.add_type(record("Inner", vec![])).unwrap();
        schema
            .add_type(TypeDescriptor::Alias(AliasType::new(
                TypeId::new(NS, "Count"),
                TypeDescriptor::sized(PrimitiveKind::Int, 64),
            )))
            .unwrap();
        schema
            .add_type(record(
                "Outer",
                vec![
                    Field::new("A", TypeDescriptor::sized(PrimitiveKind::Int, 64)).string_encoded(),
                    Field::new("B", TypeDescriptor::primitive(PrimitiveKind::Uint)).string_encoded(),
                    Field::new("C", TypeDescriptor::sized(PrimitiveKind::Float, 64))
                        .string_encoded(),
                    Field::new("D", TypeDescriptor::primitive(PrimitiveKind::Bool)).string_encoded(),
                    Field::new("E", TypeDescriptor::string()).string_encoded(),
                    Field::new(
                        "F",
                        TypeDescriptor::pointer(TypeDescriptor::sized(PrimitiveKind::Int, 32)),
                    )
                    .string_encoded(),
                    Field::new("G", TypeDescriptor::reference(NS, "Count")).string_encoded(),
                ],
            ))
            .unwrap();
        assert!(schema.validate().is_empty());

        schema
            .add_type(record(
                "Bad",
                vec![
                    Field::new("Nested", TypeDescriptor::reference(NS, "Inner")).string_encoded(),
                    Field::new("List", TypeDescriptor::array(TypeDescriptor::string()))
                        .string_encoded(),
                ],
            ))
            .unwrap();
        assert_eq!(
            codes(&schema.validate()),
            vec![
                ValidationCode::InvalidStringEncoded,
                ValidationCode::InvalidStringEncoded
            ]
        );
    }

    #[test]
    fn nested_missing_references_are_counted_individually() {
        let missing = || TypeDescriptor::reference(NS, "Ghost");
        let mut schema = Schema::new();
        let mut generic = RecordType::new(TypeId::new(NS, "Box"), vec![]);
        generic.type_params = vec![TypeParam::constrained(
            "T",
            TypeDescriptor::Union {
                members: vec![missing(), TypeDescriptor::string()],
            },
        )];
        schema.add_type(TypeDescriptor::Record(generic)).unwrap();
        schema.add_service(Service {
            name: "Things".into(),
            endpoints: vec![
                endpoint("Things", "List", TypeDescriptor::array(missing())),
                endpoint(
                    "Things",
                    "Index",
                    TypeDescriptor::map(TypeDescriptor::string(), missing()),
                ),
                endpoint("Things", "Get", TypeDescriptor::pointer(missing())),
            ],
            doc: Default::default(),
        });
        let errors = schema.validate();
        assert_eq!(
            codes(&errors),
            vec![ValidationCode::MissingTypeReference; 4]
        );
    }

    #[test]
    fn endpoint_naming_conventions() {
        let mut schema = Schema::new();
        let mut wrong = endpoint("Users", "Create", TypeDescriptor::null_response());
        wrong.full_name = "Users.Make".into();
        wrong.path = "/users/create".into();
        schema.add_service(Service {
            name: "Users".into(),
            endpoints: vec![wrong],
            doc: Default::default(),
        });
        assert_eq!(
            codes(&schema.validate()),
            vec![ValidationCode::InvalidFullname, ValidationCode::InvalidPath]
        );
    }

    #[test]
    fn duplicate_endpoints_only_within_a_service() {
        let mut schema = Schema::new();
        for service in ["Users", "Teams"] {
            schema.add_service(Service {
                name: service.into(),
                endpoints: vec![endpoint(service, "List", TypeDescriptor::null_response())],
                doc: Default::default(),
            });
        }
        assert!(schema.validate().is_empty());

        schema.services[0]
            .endpoints
            .push(endpoint("Users", "List", TypeDescriptor::null_response()));
        assert_eq!(
            codes(&schema.validate()),
            vec![ValidationCode::DuplicateEndpoint]
        );
    }

    #[test]
    fn unions_outside_constraints_are_illegal() {
        let mut schema = Schema::new();
        schema
            .add_type(record(
                "Mixed",
                vec![Field::new(
                    "Value",
                    TypeDescriptor::Union {
                        members: vec![TypeDescriptor::string(), TypeDescriptor::any()],
                    },
                )],
            ))
            .unwrap();
        assert_eq!(codes(&schema.validate()), vec![ValidationCode::IllegalUnion]);
    }

    #[test]
    fn ensure_valid_keeps_the_full_list() {
        let mut schema = Schema::new();
        schema.add_type(extends("A", &["Ghost"])).unwrap();
        schema.add_type(extends("A", &[])).unwrap();
        let err = schema.ensure_valid().unwrap_err();
        assert_eq!(err.first.code, ValidationCode::DuplicateType);
        assert_eq!(err.all.len(), 2);
    }
}
