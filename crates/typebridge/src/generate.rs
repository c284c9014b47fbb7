//! Generation orchestrator.
//!
//! Route map → scope inference → provider → services → validation →
//! base and flavor emitters → sink.

use crate::config::{Config, ConfigError, ProviderKind};
use crate::input::{Provider, ProviderError, RuntimeProvider, TypeCatalog, TypeMappings, TypeRef};
use crate::ir::{Documentation, Endpoint, Schema, Service, TypeDescriptor, Warning};
use crate::output::{
    BaseEmitter, EmitContext, EmitError, EmitOptions, GeneratedFile, HEADER, dependency_order,
};
use crate::registry::FlavorRegistry;
use crate::sink::{Sink, SinkError};
use crate::traits::Flavor;
use crate::validate::{InvalidSchema, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load routes from {path}: {message}")]
    Routes { path: PathBuf, message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("schema validation failed: {first} ({} violation(s) in total)", .all.len())]
    Validation {
        first: ValidationError,
        all: Vec<ValidationError>,
    },
    #[error("{flavor} emitter failed on {type_name}: {source}")]
    Emit {
        flavor: String,
        type_name: String,
        #[source]
        source: EmitError,
    },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<InvalidSchema> for GenerateError {
    fn from(e: InvalidSchema) -> Self {
        GenerateError::Validation {
            first: e.first,
            all: e.all,
        }
    }
}

/// One route as reported by the dispatch runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub verb: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<TypeRef>,
    /// Absent means the endpoint answers with `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl RouteInfo {
    pub fn new(verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            path: path.into(),
            request: None,
            response: None,
            doc: None,
        }
    }

    pub fn request(mut self, r: TypeRef) -> Self {
        self.request = Some(r);
        self
    }

    pub fn response(mut self, r: TypeRef) -> Self {
        self.response = Some(r);
        self
    }

    fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.request.iter().chain(self.response.iter())
    }
}

/// `"Service.Method"` → route.
pub type RouteMap = BTreeMap<String, RouteInfo>;

pub fn parse_routes(input: &str) -> Result<RouteMap, serde_json::Error> {
    serde_json::from_str(input)
}

pub fn load_routes(path: &Path) -> Result<RouteMap, GenerateError> {
    let routes_error = |message: String| GenerateError::Routes {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| routes_error(e.to_string()))?;
    parse_routes(&content).map_err(|e| routes_error(e.to_string()))
}

/// Result of a successful run.
#[derive(Debug)]
pub struct GenerateReport {
    pub files: Vec<GeneratedFile>,
    /// Extraction and emission warnings, in that order.
    pub warnings: Vec<Warning>,
    pub schema: Schema,
}

/// Build the provider a configuration asks for. Relative paths resolve
/// against `base_dir`.
pub fn provider_from_config(
    config: &Config,
    base_dir: &Path,
) -> Result<Box<dyn Provider>, GenerateError> {
    let mappings = config.type_mappings()?;
    match config.provider {
        ProviderKind::Deep => deep_provider(base_dir.join(&config.module_root), mappings),
        ProviderKind::Shallow => {
            let catalog = config.catalog.as_ref().ok_or_else(|| {
                ConfigError::Invalid("provider = \"shallow\" needs a catalog path".into())
            })?;
            let catalog = TypeCatalog::load(&base_dir.join(catalog))?;
            Ok(Box::new(RuntimeProvider::new(catalog).with_mappings(mappings)))
        }
    }
}

#[cfg(feature = "input-go")]
fn deep_provider(
    module_root: PathBuf,
    mappings: TypeMappings,
) -> Result<Box<dyn Provider>, GenerateError> {
    Ok(Box::new(
        crate::input::GoSourceProvider::new(module_root).with_mappings(mappings),
    ))
}

#[cfg(not(feature = "input-go"))]
fn deep_provider(
    _module_root: PathBuf,
    _mappings: TypeMappings,
) -> Result<Box<dyn Provider>, GenerateError> {
    Err(ConfigError::Invalid("deep extraction needs the `input-go` feature".into()).into())
}

/// Extract types for the routes and attach the derived services. The
/// result is not validated.
pub fn build_schema(
    routes: &RouteMap,
    config: &Config,
    provider: &dyn Provider,
) -> Result<Schema, GenerateError> {
    let mappings = config.type_mappings()?;
    let grouped = group_routes(routes)?;

    let mut scope = BTreeSet::new();
    let mut roots = BTreeSet::new();
    for info in routes.values() {
        for r in info.types() {
            r.deref().collect_namespaces(&mut scope);
            roots.insert(r.clone());
        }
    }
    scope.extend(config.extra_scope.iter().cloned());
    let scope: Vec<String> = scope.into_iter().collect();
    let roots: Vec<TypeRef> = roots.into_iter().collect();

    tracing::info!(
        provider = provider.name(),
        roots = roots.len(),
        scope = scope.len(),
        "extracting types"
    );
    let mut schema = provider.build_schema(&roots, &scope)?;

    for (service, methods) in grouped {
        let endpoints = methods
            .into_iter()
            .map(|(method, key, info)| endpoint(method, key, info, &mappings))
            .collect();
        schema.add_service(Service {
            name: service.to_string(),
            endpoints,
            doc: Documentation::default(),
        });
    }
    Ok(schema)
}

type Grouped<'r> = BTreeMap<&'r str, Vec<(&'r str, &'r str, &'r RouteInfo)>>;

/// Split keys at the first `.` and group by service. Both levels come out
/// sorted because the route map is.
fn group_routes(routes: &RouteMap) -> Result<Grouped<'_>, ConfigError> {
    let mut grouped: Grouped<'_> = BTreeMap::new();
    for (key, info) in routes {
        let (service, method) = key
            .split_once('.')
            .filter(|(s, m)| !s.is_empty() && !m.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "route key {:?} must have the form Service.Method",
                    key
                ))
            })?;
        grouped
            .entry(service)
            .or_default()
            .push((method, key.as_str(), info));
    }
    Ok(grouped)
}

fn endpoint(method: &str, key: &str, info: &RouteInfo, mappings: &TypeMappings) -> Endpoint {
    Endpoint {
        name: method.to_string(),
        full_name: key.to_string(),
        http_verb: info.verb.clone(),
        path: info.path.clone(),
        request: info.request.as_ref().map(|r| crate::input::reference_for(r, mappings)),
        response: info
            .response
            .as_ref()
            .map(|r| crate::input::reference_for(r, mappings))
            .unwrap_or_else(TypeDescriptor::null_response),
        doc: info
            .doc
            .as_deref()
            .map(Documentation::summary)
            .unwrap_or_default(),
    }
}

/// Run every emitter over a validated schema. Returns the files and the
/// warnings raised while emitting.
pub fn emit(
    schema: &Schema,
    config: &Config,
    registry: &FlavorRegistry,
) -> Result<(Vec<GeneratedFile>, Vec<Warning>), GenerateError> {
    let options = config.emit_options();
    let mut files = Vec::new();
    let mut warnings = Vec::new();

    if options.emit_base_types {
        let (base_files, base_warnings) = emit_base(schema, &options)?;
        files.extend(base_files);
        warnings.extend(base_warnings);
    }

    for name in &config.flavors {
        let flavor = registry
            .create(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown flavor {:?}", name)))?;
        let (file, flavor_warnings) = emit_flavor(schema, &options, flavor.as_ref())?;
        files.push(file);
        warnings.extend(flavor_warnings);
    }
    Ok((files, warnings))
}

fn emit_base(
    schema: &Schema,
    options: &EmitOptions,
) -> Result<(Vec<GeneratedFile>, Vec<Warning>), GenerateError> {
    let base = BaseEmitter;
    let mut ctx = EmitContext::new(schema, options);
    let mut chunks = Vec::new();
    for ty in dependency_order(schema, &ctx.namer) {
        let Some(id) = ty.type_id() else { continue };
        let chunk = base
            .emit_type(&ctx, ty)
            .map_err(|source| emit_error("typescript", id.qualified(), source))?;
        ctx.emitted.insert(id.clone());
        chunks.push((id.clone(), chunk));
    }
    let files = base
        .assemble(&ctx, &chunks)
        .map_err(|source| emit_error("typescript", "services", source))?;
    Ok((files, ctx.warnings))
}

fn emit_flavor(
    schema: &Schema,
    options: &EmitOptions,
    flavor: &dyn Flavor,
) -> Result<(GeneratedFile, Vec<Warning>), GenerateError> {
    let mut ctx = EmitContext::new(schema, options);
    let mut out = String::from(HEADER);
    out.push('\n');
    out.push_str(
        &flavor
            .emit_preamble(&ctx)
            .map_err(|source| emit_error(flavor.name(), "preamble", source))?,
    );
    for ty in dependency_order(schema, &ctx.namer) {
        let Some(id) = ty.type_id() else { continue };
        let chunk = flavor
            .emit_type(&mut ctx, ty)
            .map_err(|source| emit_error(flavor.name(), id.qualified(), source))?;
        ctx.emitted.insert(id.clone());
        out.push('\n');
        out.push_str(&chunk);
    }
    let services = flavor
        .emit_services(&mut ctx)
        .map_err(|source| emit_error(flavor.name(), "services", source))?;
    if !services.is_empty() {
        out.push('\n');
        out.push_str(&services);
    }
    let file = GeneratedFile {
        path: format!("{}.{}", options.base_name, flavor.file_suffix()),
        contents: out,
    };
    Ok((file, ctx.warnings))
}

fn emit_error(flavor: &str, type_name: impl Into<String>, source: EmitError) -> GenerateError {
    GenerateError::Emit {
        flavor: flavor.to_string(),
        type_name: type_name.into(),
        source,
    }
}

/// Full pipeline: extract, validate, emit, write.
///
/// Validation aborts on the first violation; the complete list is kept in
/// [`GenerateError::Validation`].
pub fn generate(
    routes: &RouteMap,
    config: &Config,
    provider: &dyn Provider,
    registry: &FlavorRegistry,
    sink: &mut dyn Sink,
) -> Result<GenerateReport, GenerateError> {
    config.validate(registry)?;
    let schema = build_schema(routes, config, provider)?;
    schema.ensure_valid()?;
    tracing::info!(
        types = schema.types.len(),
        services = schema.services.len(),
        "schema is valid"
    );

    let (files, emit_warnings) = emit(&schema, config, registry)?;
    let mut warnings = schema.warnings.clone();
    warnings.extend(emit_warnings);
    for w in &warnings {
        tracing::warn!(code = w.code.as_str(), "{}", w.message);
    }

    for file in &files {
        sink.write_file(&file.path, file.contents.as_bytes())?;
    }
    tracing::info!(
        files = files.len(),
        warnings = warnings.len(),
        "generation finished"
    );

    Ok(GenerateReport {
        files,
        warnings,
        schema,
    })
}
