//! End-to-end tests: Go fixture module → schema → generated files.
#![cfg(all(feature = "input-go", feature = "backend-zod", feature = "backend-valibot"))]

use std::path::{Path, PathBuf};
use typebridge::generate::{build_schema, load_routes, provider_from_config};
use typebridge::ir::WarningCode;
use typebridge::{
    Config, FlavorRegistry, FsSink, GenerateError, GoSourceProvider, MemorySink, ProviderKind,
    RouteInfo, RouteMap, TypeRef, ValidationCode,
};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn routes() -> RouteMap {
    load_routes(&fixtures().join("routes.json")).unwrap()
}

fn deep() -> GoSourceProvider {
    GoSourceProvider::new(fixtures().join("app"))
}

fn zod_config() -> Config {
    Config {
        flavors: vec!["zod".into()],
        ..Default::default()
    }
}

#[test]
fn users_service_validates() {
    let schema = build_schema(&routes(), &Config::default(), &deep()).unwrap();

    assert!(schema.validate().is_empty());
    let users = schema.find_service("Users").unwrap();
    assert_eq!(users.endpoints.len(), 2);
    assert_eq!(users.endpoints[0].full_name, "Users.Create");
    assert_eq!(users.endpoints[0].doc.summary, "Register a new account.");
    assert!(users.endpoints[1].request.is_none());
}

#[test]
fn zod_schemas_for_users() {
    let mut sink = MemorySink::new();
    let report = typebridge::generate(
        &routes(),
        &zod_config(),
        &deep(),
        &FlavorRegistry::builtin(),
        &mut sink,
    )
    .unwrap();

    assert!(report.warnings.is_empty());
    let zod = sink.text("types.zod.ts").unwrap();
    assert!(zod.contains("export const RoleSchema = z.enum([\"admin\", \"member\"]);\n"));
    assert!(zod.contains("export const UserSchema = z.object({\n"));
    assert!(zod.contains("  id: z.number().int(),\n"));
    assert!(zod.contains("  email: z.string().min(1).email(),\n"));
    assert!(zod.contains("  name: z.string().optional(),\n"));
    assert!(zod.contains("  role: RoleSchema,\n"));
    assert!(zod.contains("  name: z.string().max(64).optional(),\n"));

    let role = zod.find("export const RoleSchema").unwrap();
    let user = zod.find("export const UserSchema").unwrap();
    assert!(role < user);

    let ts = sink.text("types.ts").unwrap();
    assert!(ts.contains("export interface User {\n"));
    assert!(ts.contains("export interface UsersService {\n"));
    assert!(ts.contains("\"Users.List\": { verb: \"POST\", path: \"/Users/List\" },"));
}

#[test]
fn regeneration_is_byte_identical() {
    let out = tempfile::tempdir().unwrap();
    let config = Config {
        flavors: vec!["zod".into(), "valibot".into()],
        ..Default::default()
    };
    let registry = FlavorRegistry::builtin();

    let mut sink = FsSink::new(out.path());
    let first = typebridge::generate(&routes(), &config, &deep(), &registry, &mut sink).unwrap();
    let before: Vec<String> = first
        .files
        .iter()
        .map(|f| std::fs::read_to_string(out.path().join(&f.path)).unwrap())
        .collect();

    let second = typebridge::generate(&routes(), &config, &deep(), &registry, &mut sink).unwrap();
    let after: Vec<String> = second
        .files
        .iter()
        .map(|f| std::fs::read_to_string(out.path().join(&f.path)).unwrap())
        .collect();

    assert_eq!(first.files, second.files);
    assert_eq!(before, after);
    assert_eq!(before.len(), 3);
}

#[test]
fn per_namespace_files() {
    let mut routes = routes();
    routes.insert(
        "Billing.Get".into(),
        RouteInfo::new("GET", "/Billing/Get").response(TypeRef::pointer(TypeRef::named(
            "example.com/app/billing",
            "Invoice",
        ))),
    );
    let config = Config {
        single_file: false,
        namespace_prefix_strip: vec!["example.com/app/".into()],
        ..Default::default()
    };
    let mut sink = MemorySink::new();
    typebridge::generate(&routes, &config, &deep(), &FlavorRegistry::builtin(), &mut sink)
        .unwrap();

    let paths: Vec<&String> = sink.files().keys().collect();
    assert_eq!(paths, ["types.ts", "types/billing.ts", "types/models.ts"]);
    let billing = sink.text("types/billing.ts").unwrap();
    assert!(billing.contains("import type { User } from \"./models\";\n"));
    let index = sink.text("types.ts").unwrap();
    assert!(index.contains("export * from \"./types/billing\";\n"));
    assert!(index.contains("export interface BillingService {\n"));
}

#[test]
fn invalid_routes_write_nothing() {
    let mut routes = routes();
    routes.insert(
        "Users.Delete".into(),
        RouteInfo::new("POST", "/users/delete"),
    );
    let mut sink = MemorySink::new();
    let err = typebridge::generate(
        &routes,
        &zod_config(),
        &deep(),
        &FlavorRegistry::builtin(),
        &mut sink,
    )
    .unwrap_err();

    let GenerateError::Validation { first, all } = err else {
        panic!("expected validation failure");
    };
    assert_eq!(first.code, ValidationCode::InvalidPath);
    assert_eq!(all.len(), 1);
    assert!(sink.files().is_empty());
}

#[test]
fn unresolvable_root_is_a_provider_error() {
    let mut routes = RouteMap::new();
    routes.insert(
        "Users.Get".into(),
        RouteInfo::new("POST", "/Users/Get")
            .response(TypeRef::named("example.com/app/models", "Missing")),
    );
    let err = build_schema(&routes, &Config::default(), &deep()).unwrap_err();
    assert!(matches!(err, GenerateError::Provider(_)));
}

#[test]
fn shallow_provider_from_config() {
    let config = Config {
        provider: ProviderKind::Shallow,
        catalog: Some("catalog.json".into()),
        flavors: vec!["zod".into()],
        ..Default::default()
    };
    let provider = provider_from_config(&config, &fixtures()).unwrap();
    let mut sink = MemorySink::new();
    let report = typebridge::generate(
        &routes(),
        &config,
        provider.as_ref(),
        &FlavorRegistry::builtin(),
        &mut sink,
    )
    .unwrap();

    // Role's constants are invisible to reflection
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].code, WarningCode::EnumMembersUnavailable);
    let zod = sink.text("types.zod.ts").unwrap();
    assert!(zod.contains("export const RoleSchema = z.string();\n"));
    assert!(zod.contains("  email: z.string().min(1).email(),\n"));
}
