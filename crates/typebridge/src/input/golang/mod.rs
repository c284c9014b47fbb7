//! Deep extraction from Go module sources.
//!
//! Packages inside the module are located through `go.mod` and parsed on
//! demand. Types outside the module resolve through [`TypeMappings`] or fall
//! back to `any` with an `unresolved_type` warning.

mod parse;

pub use parse::{GoFile, GoType, parse_doc, parse_file};

use super::{
    Provider, ProviderError, TypeMappings, TypeRef, builtin, check_inputs,
    collapse_container_pointer, instance_id, is_byte, name_clash, synthetic_name, tags::FieldTags, unresolved,
};
use crate::ir::{
    AliasType, EnumMember, EnumType, EnumValue, Field, PrimitiveKind, RecordType, Schema,
    SourceLocation, TypeDescriptor, TypeId, TypeParam, Warning, WarningCode,
};
use parse::{ConstValue, GoConst, GoField, GoTypeDecl};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Provider that reads Go declarations straight from source.
#[derive(Debug, Clone)]
pub struct GoSourceProvider {
    module_root: PathBuf,
    mappings: TypeMappings,
}

impl GoSourceProvider {
    /// `module_root` is the directory holding `go.mod`.
    pub fn new(module_root: impl Into<PathBuf>) -> Self {
        Self {
            module_root: module_root.into(),
            mappings: TypeMappings::default(),
        }
    }

    pub fn with_mappings(mut self, mappings: TypeMappings) -> Self {
        self.mappings = mappings;
        self
    }
}

impl Provider for GoSourceProvider {
    fn name(&self) -> &'static str {
        "deep"
    }

    fn build_schema(&self, roots: &[TypeRef], scope: &[String]) -> Result<Schema, ProviderError> {
        check_inputs(roots, scope)?;
        let module = GoModule::open(&self.module_root)?;
        tracing::debug!(
            module = %module.path,
            roots = roots.len(),
            scope = scope.len(),
            "starting deep extraction"
        );

        let mut builder = Builder::new(module, &self.mappings);
        for namespace in scope {
            builder.add_scope(namespace)?;
        }
        for root in roots {
            builder.require(root)?;
        }
        builder.drain()?;

        tracing::debug!(
            types = builder.schema.types.len(),
            warnings = builder.schema.warnings.len(),
            packages = builder.packages.len(),
            "deep extraction finished"
        );
        Ok(builder.schema)
    }
}

struct GoModule {
    root: PathBuf,
    path: String,
}

impl GoModule {
    fn open(root: &Path) -> Result<Self, ProviderError> {
        let go_mod = root.join("go.mod");
        let text = std::fs::read_to_string(&go_mod).map_err(|source| ProviderError::Io {
            path: go_mod.display().to_string(),
            source,
        })?;
        let path = text
            .lines()
            .find_map(|l| l.trim().strip_prefix("module "))
            .map(|p| p.trim().trim_matches('"').to_string())
            .ok_or_else(|| ProviderError::Parse {
                path: go_mod.display().to_string(),
                message: "missing module directive".into(),
            })?;
        Ok(Self {
            root: root.to_path_buf(),
            path,
        })
    }

    fn dir_for(&self, import_path: &str) -> Option<PathBuf> {
        if import_path == self.path {
            return Some(self.root.clone());
        }
        let rest = import_path.strip_prefix(&self.path)?.strip_prefix('/')?;
        Some(self.root.join(rest))
    }

    /// Parse every non-test `.go` file of a module-local package.
    fn load(&self, import_path: &str) -> Result<Option<GoPackage>, ProviderError> {
        let Some(dir) = self.dir_for(import_path) else {
            return Ok(None);
        };
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProviderError::Io {
                    path: dir.display().to_string(),
                    source,
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension().is_some_and(|ext| ext == "go")
                    && !p.to_string_lossy().ends_with("_test.go")
            })
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Ok(None);
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let source = std::fs::read_to_string(&path).map_err(|source| ProviderError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let rel = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            files.push(parse_file(&source, &rel)?);
        }
        tracing::trace!(package = import_path, files = files.len(), "loaded package");
        Ok(Some(GoPackage::new(import_path, files)))
    }
}

struct GoPackage {
    path: String,
    files: Vec<GoFile>,
    values: BTreeMap<String, ConstValue>,
}

impl GoPackage {
    fn new(path: &str, files: Vec<GoFile>) -> Self {
        let mut pkg = Self {
            path: path.to_string(),
            files,
            values: BTreeMap::new(),
        };
        // second pass picks up constants defined in terms of later ones
        for _ in 0..2 {
            for c in pkg.files.iter().flat_map(|f| &f.consts) {
                if c.name == "_" || pkg.values.contains_key(&c.name) {
                    continue;
                }
                if let Some(v) = c.value.as_ref().and_then(|e| e.eval(c.iota, &pkg.values)) {
                    pkg.values.insert(c.name.clone(), v);
                }
            }
        }
        pkg
    }

    fn find(&self, name: &str) -> Option<(&GoFile, &GoTypeDecl)> {
        self.files
            .iter()
            .find_map(|f| f.types.iter().find(|t| t.name == name).map(|t| (f, t)))
    }

    fn consts_of(&self, ty: &str) -> Vec<&GoConst> {
        self.files
            .iter()
            .flat_map(|f| &f.consts)
            .filter(|c| c.ty.as_deref() == Some(ty))
            .collect()
    }
}

#[derive(Debug, Clone)]
enum Binding {
    /// Declared type parameter, kept symbolic.
    Param,
    /// Bound to a concrete argument.
    Arg(TypeRef),
}

/// Lexical context for lowering a declaration.
struct Scope<'p> {
    pkg: &'p GoPackage,
    file: &'p GoFile,
    bindings: &'p BTreeMap<String, Binding>,
    location: &'p SourceLocation,
}

struct Pending {
    namespace: String,
    name: String,
    args: Vec<TypeRef>,
}

struct Builder<'m> {
    module: GoModule,
    mappings: &'m TypeMappings,
    packages: BTreeMap<String, Option<Rc<GoPackage>>>,
    schema: Schema,
    queued: BTreeSet<TypeId>,
    /// Instantiation that first claimed each generated id.
    claimed: BTreeMap<TypeId, TypeRef>,
    queue: VecDeque<Pending>,
    warned: BTreeSet<String>,
}

impl<'m> Builder<'m> {
    fn new(module: GoModule, mappings: &'m TypeMappings) -> Self {
        Self {
            module,
            mappings,
            packages: BTreeMap::new(),
            schema: Schema::new(),
            queued: BTreeSet::new(),
            claimed: BTreeMap::new(),
            queue: VecDeque::new(),
            warned: BTreeSet::new(),
        }
    }

    fn package(&mut self, path: &str) -> Result<Option<Rc<GoPackage>>, ProviderError> {
        if let Some(cached) = self.packages.get(path) {
            return Ok(cached.clone());
        }
        let loaded = self.module.load(path)?.map(Rc::new);
        self.packages.insert(path.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn warn(&mut self, warning: Warning) {
        if self.warned.insert(warning.to_string()) {
            self.schema.add_warning(warning);
        }
    }

    fn enqueue(
        &mut self,
        namespace: &str,
        name: &str,
        args: &[TypeRef],
    ) -> Result<TypeId, ProviderError> {
        let id = instance_id(namespace, name, args);
        if !args.is_empty() {
            let instance = TypeRef::Named {
                namespace: namespace.to_string(),
                name: name.to_string(),
                args: args.to_vec(),
            };
            match self.claimed.get(&id) {
                Some(first) if *first != instance => {
                    return Err(name_clash(&id, &first.to_string(), &instance.to_string()));
                }
                Some(_) => {}
                None => {
                    self.claimed.insert(id.clone(), instance);
                }
            }
        }
        if self.queued.insert(id.clone()) {
            self.queue.push_back(Pending {
                namespace: namespace.to_string(),
                name: name.to_string(),
                args: args.to_vec(),
            });
        }
        Ok(id)
    }

    /// Queue every exported, non-interface type of a package.
    fn add_scope(&mut self, namespace: &str) -> Result<(), ProviderError> {
        let pkg = self
            .package(namespace)?
            .ok_or_else(|| ProviderError::Resolution {
                identifier: namespace.to_string(),
            })?;
        for decl in pkg.files.iter().flat_map(|f| &f.types) {
            if is_exported(&decl.name) && !matches!(decl.ty, GoType::Interface { .. }) {
                self.enqueue(namespace, &decl.name, &[])?;
            }
        }
        Ok(())
    }

    /// Queue a root type, failing if any named part of it cannot be found.
    fn require(&mut self, root: &TypeRef) -> Result<(), ProviderError> {
        match root {
            TypeRef::Named {
                namespace,
                name,
                args,
            } => {
                if self.mappings.lookup(namespace, name).is_some() {
                    return Ok(());
                }
                let missing = || ProviderError::Resolution {
                    identifier: root.to_string(),
                };
                if namespace.is_empty() {
                    return Err(missing());
                }
                let pkg = self.package(namespace)?.ok_or_else(missing)?;
                pkg.find(name).ok_or_else(missing)?;
                for arg in args {
                    self.require(arg)?;
                }
                self.enqueue(namespace, name, args)?;
                Ok(())
            }
            TypeRef::Pointer(inner) | TypeRef::Slice(inner) => self.require(inner),
            TypeRef::Array { elem, .. } => self.require(elem),
            TypeRef::Map { key, value } => {
                self.require(key)?;
                self.require(value)
            }
            TypeRef::Builtin(name) if builtin(name).is_none() => Err(ProviderError::Resolution {
                identifier: name.clone(),
            }),
            TypeRef::Builtin(_) | TypeRef::Param(_) => Ok(()),
        }
    }

    fn drain(&mut self) -> Result<(), ProviderError> {
        while let Some(pending) = self.queue.pop_front() {
            self.emit(pending)?;
        }
        Ok(())
    }

    fn emit(&mut self, pending: Pending) -> Result<(), ProviderError> {
        let missing = || ProviderError::Resolution {
            identifier: format!("{}.{}", pending.namespace, pending.name),
        };
        let pkg = self.package(&pending.namespace)?.ok_or_else(missing)?;
        let (file, decl) = pkg.find(&pending.name).ok_or_else(missing)?;
        let id = instance_id(&pending.namespace, &pending.name, &pending.args);

        let bindings: BTreeMap<String, Binding> = if pending.args.is_empty() {
            decl.type_params
                .iter()
                .map(|p| (p.name.clone(), Binding::Param))
                .collect()
        } else if pending.args.len() == decl.type_params.len() {
            decl.type_params
                .iter()
                .zip(&pending.args)
                .map(|(p, a)| (p.name.clone(), Binding::Arg(a.clone())))
                .collect()
        } else {
            return Err(ProviderError::Resolution {
                identifier: format!(
                    "{} (expects {} type arguments, got {})",
                    id.qualified(),
                    decl.type_params.len(),
                    pending.args.len()
                ),
            });
        };

        let scope = Scope {
            pkg: &pkg,
            file,
            bindings: &bindings,
            location: &decl.location,
        };

        let mut type_params = Vec::new();
        if pending.args.is_empty() {
            for p in &decl.type_params {
                type_params.push(TypeParam {
                    name: p.name.clone(),
                    constraint: self.lower_constraint(&p.constraint, &scope)?.map(Box::new),
                });
            }
        }

        let descriptor = match &decl.ty {
            GoType::Struct(fields) => {
                let (fields, extends) = self.lower_struct(&id, fields, &scope)?;
                TypeDescriptor::Record(RecordType {
                    id,
                    type_params,
                    fields,
                    extends,
                    doc: decl.doc.clone(),
                    source: Some(decl.location.clone()),
                })
            }
            ty => {
                let recovered = match type_params.is_empty() && !decl.alias {
                    true => self.try_enum(&id, decl, &pkg),
                    false => None,
                };
                match recovered {
                    Some(e) => e,
                    None => {
                        let underlying = self.lower(ty, &scope, &id.name)?;
                        TypeDescriptor::Alias(AliasType {
                            id,
                            type_params,
                            underlying: Box::new(underlying),
                            doc: decl.doc.clone(),
                            source: Some(decl.location.clone()),
                        })
                    }
                }
            }
        };
        self.schema.add_type(descriptor)?;
        Ok(())
    }

    fn lower_struct(
        &mut self,
        parent: &TypeId,
        fields: &[GoField],
        scope: &Scope<'_>,
    ) -> Result<(Vec<Field>, Vec<TypeId>), ProviderError> {
        let mut out = Vec::new();
        let mut extends = Vec::new();

        for f in fields {
            let tags = FieldTags::parse(&f.tag);

            if f.is_embedded() {
                let Some(type_name) = embedded_name(&f.ty) else {
                    continue;
                };
                if tags.json.skip {
                    continue;
                }
                if tags.json.name.is_none() && self.is_struct(&f.ty, scope)? {
                    let hint = format!("{}_{}", parent.name, type_name);
                    if let TypeDescriptor::Reference(target) = self.lower(&f.ty, scope, &hint)?.deref() {
                        extends.push(target.clone());
                        continue;
                    }
                }
                if !is_exported(type_name) {
                    continue;
                }
                let name = type_name.to_string();
                out.push(self.lower_field(parent, &name, f, &tags, scope)?);
                continue;
            }

            for name in &f.names {
                if is_exported(name) {
                    out.push(self.lower_field(parent, name, f, &tags, scope)?);
                }
            }
        }

        Ok((out, extends))
    }

    fn lower_field(
        &mut self,
        parent: &TypeId,
        name: &str,
        f: &GoField,
        tags: &FieldTags,
        scope: &Scope<'_>,
    ) -> Result<Field, ProviderError> {
        let hint = format!("{}_{}", parent.name, name);
        let ty = self.lower(&f.ty, scope, &hint)?;
        let (ty, collapsed) = collapse_container_pointer(ty);
        let mut field = Field::new(name, ty).with_doc(f.doc.clone());
        if collapsed {
            field = field.optional();
        }
        Ok(tags.apply(field))
    }

    fn is_struct(&mut self, ty: &GoType, scope: &Scope<'_>) -> Result<bool, ProviderError> {
        let target = match ty {
            GoType::Pointer(inner) => return self.is_struct(inner, scope),
            GoType::Generic { base, .. } => return self.is_struct(base, scope),
            GoType::Ident(name) => {
                return Ok(scope
                    .pkg
                    .find(name)
                    .is_some_and(|(_, d)| matches!(d.ty, GoType::Struct(_))));
            }
            GoType::Qualified { package, name } => match scope.file.imports.get(package) {
                Some(path) => (path.clone(), name.clone()),
                None => return Ok(false),
            },
            _ => return Ok(false),
        };
        let Some(pkg) = self.package(&target.0)? else {
            return Ok(false);
        };
        Ok(pkg
            .find(&target.1)
            .is_some_and(|(_, d)| matches!(d.ty, GoType::Struct(_))))
    }

    /// Lower a source type expression. `hint` names anonymous structs.
    fn lower(
        &mut self,
        ty: &GoType,
        scope: &Scope<'_>,
        hint: &str,
    ) -> Result<TypeDescriptor, ProviderError> {
        Ok(match ty {
            GoType::Struct(fields) => {
                let id = TypeId::new(&scope.pkg.path, synthetic_name(hint));
                if self.queued.insert(id.clone()) {
                    let (fields, extends) = self.lower_struct(&id, fields, scope)?;
                    let mut record = RecordType::new(id.clone(), fields);
                    record.extends = extends;
                    record.source = Some(scope.location.clone());
                    self.schema.add_type(TypeDescriptor::Record(record))?;
                }
                TypeDescriptor::Reference(id)
            }
            GoType::Pointer(inner) => TypeDescriptor::pointer(self.lower(inner, scope, hint)?),
            GoType::Slice(inner) => match inner.as_ref() {
                GoType::Ident(b) if is_byte(b) && !scope.bindings.contains_key(b) => {
                    TypeDescriptor::primitive(PrimitiveKind::Bytes)
                }
                _ => TypeDescriptor::array(self.lower(inner, scope, hint)?),
            },
            GoType::Array { len, elem } => {
                let elem = self.lower(elem, scope, hint)?;
                match len {
                    Some(len) => TypeDescriptor::Array {
                        elem: Box::new(elem),
                        len: *len,
                    },
                    None => TypeDescriptor::array(elem),
                }
            }
            GoType::Map { key, value } => TypeDescriptor::map(
                self.lower(key, scope, hint)?,
                self.lower(value, scope, hint)?,
            ),
            GoType::Interface { .. } | GoType::Union(_) | GoType::Tilde(_) => TypeDescriptor::any(),
            GoType::Unsupported(text) => {
                self.unsupported(text, hint, scope);
                TypeDescriptor::any()
            }
            GoType::Ident(name) if !scope.bindings.contains_key(name) && scope.pkg.find(name).is_none() => {
                match builtin(name) {
                    Some(b) => b,
                    None => {
                        self.unsupported(name, hint, scope);
                        TypeDescriptor::any()
                    }
                }
            }
            GoType::Ident(_) | GoType::Qualified { .. } | GoType::Generic { .. } => {
                match self.to_type_ref(ty, scope) {
                    Some(r) => self.lower_ref(&r, scope.location)?,
                    None => {
                        let text = format!("{:?}", ty);
                        self.unsupported(&text, hint, scope);
                        TypeDescriptor::any()
                    }
                }
            }
        })
    }

    fn unsupported(&mut self, what: &str, hint: &str, scope: &Scope<'_>) {
        self.warn(
            Warning::new(
                WarningCode::UnsupportedType,
                format!("{} has no wire representation; emitted as any", what),
            )
            .with_type(hint)
            .with_location(Some(scope.location.clone())),
        );
    }

    /// Express a source type as a fully qualified reference, resolving
    /// import aliases and type-parameter bindings.
    fn to_type_ref(&self, ty: &GoType, scope: &Scope<'_>) -> Option<TypeRef> {
        Some(match ty {
            GoType::Ident(name) => match scope.bindings.get(name) {
                Some(Binding::Param) => TypeRef::Param(name.clone()),
                Some(Binding::Arg(r)) => r.clone(),
                None if scope.pkg.find(name).is_some() => TypeRef::named(&scope.pkg.path, name),
                None if builtin(name).is_some() => TypeRef::Builtin(name.clone()),
                None => return None,
            },
            GoType::Qualified { package, name } => {
                TypeRef::named(scope.file.imports.get(package)?, name)
            }
            GoType::Generic { base, args } => match self.to_type_ref(base, scope)? {
                TypeRef::Named {
                    namespace, name, ..
                } => TypeRef::Named {
                    namespace,
                    name,
                    args: args
                        .iter()
                        .map(|a| self.to_type_ref(a, scope))
                        .collect::<Option<Vec<_>>>()?,
                },
                _ => return None,
            },
            GoType::Pointer(inner) => TypeRef::pointer(self.to_type_ref(inner, scope)?),
            GoType::Slice(inner) => TypeRef::slice(self.to_type_ref(inner, scope)?),
            GoType::Array {
                len: Some(len),
                elem,
            } => TypeRef::Array {
                len: *len,
                elem: Box::new(self.to_type_ref(elem, scope)?),
            },
            GoType::Map { key, value } => TypeRef::Map {
                key: Box::new(self.to_type_ref(key, scope)?),
                value: Box::new(self.to_type_ref(value, scope)?),
            },
            GoType::Interface {
                elems,
                has_methods: false,
            } if elems.is_empty() => TypeRef::Builtin("interface{}".into()),
            GoType::Struct(fields) if fields.is_empty() => TypeRef::Builtin("struct{}".into()),
            _ => return None,
        })
    }

    /// Lower a qualified reference, queueing named targets for emission.
    fn lower_ref(
        &mut self,
        r: &TypeRef,
        location: &SourceLocation,
    ) -> Result<TypeDescriptor, ProviderError> {
        Ok(match r {
            TypeRef::Named {
                namespace,
                name,
                args,
            } => {
                if let Some(mapped) = self.mappings.lookup(namespace, name) {
                    return Ok(mapped);
                }
                let id = TypeId::new(namespace, name);
                let pkg = match namespace.is_empty() {
                    true => None,
                    false => self.package(namespace)?,
                };
                let decl = pkg.as_ref().and_then(|p| p.find(name)).map(|(_, d)| d);
                match decl {
                    None => {
                        let reason = if pkg.is_some() {
                            "is not declared in its package"
                        } else {
                            "is outside the module and has no type mapping"
                        };
                        self.warn(unresolved(&id, reason).with_location(Some(location.clone())));
                        TypeDescriptor::any()
                    }
                    Some(d) if matches!(d.ty, GoType::Interface { .. }) => TypeDescriptor::any(),
                    Some(_) if args.iter().any(has_param) => {
                        TypeDescriptor::Reference(self.enqueue(namespace, name, &[])?)
                    }
                    Some(_) => TypeDescriptor::Reference(self.enqueue(namespace, name, args)?),
                }
            }
            TypeRef::Pointer(inner) => TypeDescriptor::pointer(self.lower_ref(inner, location)?),
            TypeRef::Slice(inner) => match inner.as_ref() {
                TypeRef::Builtin(b) if is_byte(b) => TypeDescriptor::primitive(PrimitiveKind::Bytes),
                _ => TypeDescriptor::array(self.lower_ref(inner, location)?),
            },
            TypeRef::Array { len, elem } => TypeDescriptor::Array {
                elem: Box::new(self.lower_ref(elem, location)?),
                len: *len,
            },
            TypeRef::Map { key, value } => TypeDescriptor::map(
                self.lower_ref(key, location)?,
                self.lower_ref(value, location)?,
            ),
            TypeRef::Builtin(name) => builtin(name).unwrap_or_else(TypeDescriptor::any),
            TypeRef::Param(name) => TypeDescriptor::TypeParameter(TypeParam::new(name)),
        })
    }

    /// Lower a type-parameter constraint. `None` means unconstrained.
    fn lower_constraint(
        &mut self,
        ty: &GoType,
        scope: &Scope<'_>,
    ) -> Result<Option<TypeDescriptor>, ProviderError> {
        match ty {
            GoType::Ident(name) if matches!(name.as_str(), "any" | "comparable") => Ok(None),
            GoType::Interface { elems, .. } => {
                let mut terms = Vec::new();
                for e in elems {
                    self.constraint_terms(e, scope, &mut terms)?;
                }
                Ok(union_of(terms))
            }
            GoType::Union(_) | GoType::Tilde(_) => {
                let mut terms = Vec::new();
                self.constraint_terms(ty, scope, &mut terms)?;
                Ok(union_of(terms))
            }
            GoType::Ident(name) => match scope.pkg.find(name) {
                Some((file, decl)) if matches!(decl.ty, GoType::Interface { .. }) => {
                    let nested = Scope {
                        pkg: scope.pkg,
                        file,
                        bindings: &BTreeMap::new(),
                        location: &decl.location,
                    };
                    self.lower_constraint(&decl.ty, &nested)
                }
                _ => Ok(Some(self.lower(ty, scope, name)?)),
            },
            GoType::Qualified { package, name } => {
                let Some(path) = scope.file.imports.get(package).cloned() else {
                    return Ok(None);
                };
                let Some(pkg) = self.package(&path)? else {
                    // cmp.Ordered, constraints.Integer and friends
                    return Ok(None);
                };
                match pkg.find(name) {
                    Some((file, decl)) if matches!(decl.ty, GoType::Interface { .. }) => {
                        let nested = Scope {
                            pkg: &pkg,
                            file,
                            bindings: &BTreeMap::new(),
                            location: &decl.location,
                        };
                        self.lower_constraint(&decl.ty, &nested)
                    }
                    _ => Ok(Some(self.lower(ty, scope, name)?)),
                }
            }
            _ => Ok(Some(self.lower(ty, scope, "constraint")?)),
        }
    }

    fn constraint_terms(
        &mut self,
        ty: &GoType,
        scope: &Scope<'_>,
        out: &mut Vec<TypeDescriptor>,
    ) -> Result<(), ProviderError> {
        match ty {
            GoType::Union(items) => {
                for item in items {
                    self.constraint_terms(item, scope, out)?;
                }
            }
            GoType::Tilde(inner) => out.push(self.lower(inner, scope, "constraint")?),
            other => {
                if let Some(c) = self.lower_constraint(other, scope)? {
                    match c {
                        TypeDescriptor::Union { members } => out.extend(members),
                        single => out.push(single),
                    }
                }
            }
        }
        Ok(())
    }

    /// Recover an enum from constants typed with a scalar named type.
    fn try_enum(&mut self, id: &TypeId, decl: &GoTypeDecl, pkg: &GoPackage) -> Option<TypeDescriptor> {
        let GoType::Ident(base) = &decl.ty else {
            return None;
        };
        let kind = builtin(base)?.scalar_kind()?;
        if !matches!(
            kind,
            PrimitiveKind::String | PrimitiveKind::Int | PrimitiveKind::Uint | PrimitiveKind::Float
        ) {
            return None;
        }
        let consts = pkg.consts_of(&decl.name);
        if consts.is_empty() {
            return None;
        }

        let mut members = Vec::new();
        for c in consts {
            if c.name == "_" {
                continue;
            }
            let value = match (kind, pkg.values.get(&c.name)) {
                (PrimitiveKind::String, Some(ConstValue::Str(s))) => EnumValue::String(s.clone()),
                (PrimitiveKind::Int | PrimitiveKind::Uint, Some(ConstValue::Int(i))) => {
                    EnumValue::Int(*i)
                }
                (PrimitiveKind::Float, Some(ConstValue::Float(f))) => EnumValue::Float(*f),
                (PrimitiveKind::Float, Some(ConstValue::Int(i))) => EnumValue::Float(*i as f64),
                _ => {
                    self.warn(
                        Warning::new(
                            WarningCode::EnumMemberSkipped,
                            format!("constant {} has no evaluable {} value", c.name, kind.as_str()),
                        )
                        .with_type(id.name.clone())
                        .with_location(Some(c.location.clone())),
                    );
                    continue;
                }
            };
            let mut member = EnumMember::new(c.name.clone(), value);
            member.doc = c.doc.clone();
            members.push(member);
        }
        if members.is_empty() {
            return None;
        }

        let mut e = EnumType::new(id.clone(), members);
        e.doc = decl.doc.clone();
        e.source = Some(decl.location.clone());
        Some(TypeDescriptor::Enum(e))
    }
}

fn union_of(mut terms: Vec<TypeDescriptor>) -> Option<TypeDescriptor> {
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(TypeDescriptor::Union { members: terms }),
    }
}

fn has_param(r: &TypeRef) -> bool {
    match r {
        TypeRef::Param(_) => true,
        TypeRef::Named { args, .. } => args.iter().any(has_param),
        TypeRef::Pointer(inner) | TypeRef::Slice(inner) => has_param(inner),
        TypeRef::Array { elem, .. } => has_param(elem),
        TypeRef::Map { key, value } => has_param(key) || has_param(value),
        TypeRef::Builtin(_) => false,
    }
}

fn embedded_name(ty: &GoType) -> Option<&str> {
    match ty {
        GoType::Pointer(inner) => embedded_name(inner),
        GoType::Generic { base, .. } => embedded_name(base),
        GoType::Ident(name) => Some(name),
        GoType::Qualified { name, .. } => Some(name),
        _ => None,
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Documentation;

    const MODELS: &str = "example.com/app/models";

    fn module(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/app\n\ngo 1.22\n").unwrap();
        for (path, source) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, source).unwrap();
        }
        dir
    }

    fn record<'a>(schema: &'a Schema, name: &str) -> &'a RecordType {
        match schema.find_type(&TypeId::new(MODELS, name)) {
            Some(TypeDescriptor::Record(r)) => r,
            other => panic!("expected record {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_enum_recovery_and_docs() {
        let dir = module(&[(
            "models/status.go",
            r#"package models

// Status of an order.
type Status string

const (
    // StatusOpen means not yet shipped.
    StatusOpen Status = "open"
    StatusDone Status = "done"
)

type Priority int

const (
    PriorityLow Priority = iota
    PriorityHigh
)
"#,
        )]);
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&[], &[MODELS.to_string()])
            .unwrap();

        let Some(TypeDescriptor::Enum(status)) = schema.find_type(&TypeId::new(MODELS, "Status"))
        else {
            panic!("expected enum");
        };
        assert_eq!(status.doc, Documentation::summary("Status of an order."));
        assert_eq!(status.members.len(), 2);
        assert_eq!(status.members[0].value, EnumValue::String("open".into()));
        assert_eq!(status.members[0].doc.summary, "StatusOpen means not yet shipped.");

        let Some(TypeDescriptor::Enum(priority)) =
            schema.find_type(&TypeId::new(MODELS, "Priority"))
        else {
            panic!("expected enum");
        };
        assert_eq!(priority.members[1].value, EnumValue::Int(1));
    }

    #[test]
    fn test_struct_lowering() {
        let dir = module(&[(
            "models/user.go",
            r#"package models

import "time"

type Base struct {
    ID int64 `json:"id"`
}

type User struct {
    Base
    Email    string            `json:"email" validate:"required,email"`
    Nick     *string           `json:"nick,omitempty"`
    Tags     *[]string         `json:"tags"`
    Avatar   []byte            `json:"avatar"`
    Hash     [32]byte          `json:"hash"`
    Count    int               `json:"count,string"`
    Created  time.Time         `json:"created"`
    Secret   string            `json:"-"`
    internal string
    Address  struct {
        City string `json:"city"`
    } `json:"address"`
}
"#,
        )]);
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&["example.com/app/models.User".parse().unwrap()], &[])
            .unwrap();

        let user = record(&schema, "User");
        assert_eq!(user.extends, vec![TypeId::new(MODELS, "Base")]);
        let names: Vec<&str> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["Email", "Nick", "Tags", "Avatar", "Hash", "Count", "Created", "Secret", "Address"]
        );

        let field = |n: &str| user.fields.iter().find(|f| f.name == n).unwrap();
        assert_eq!(field("Email").raw_validation_tag, "required,email");
        assert!(field("Nick").optional && field("Nick").ty.is_pointer());
        assert!(field("Tags").optional);
        assert_eq!(field("Tags").ty, TypeDescriptor::array(TypeDescriptor::string()));
        assert_eq!(
            field("Avatar").ty,
            TypeDescriptor::primitive(PrimitiveKind::Bytes)
        );
        assert!(matches!(field("Hash").ty, TypeDescriptor::Array { len: 32, .. }));
        assert!(field("Count").string_encoded);
        assert_eq!(
            field("Created").ty,
            TypeDescriptor::primitive(PrimitiveKind::Time)
        );
        assert!(field("Secret").skip);
        assert_eq!(
            field("Address").ty,
            TypeDescriptor::reference(MODELS, "User_Address")
        );
        assert!(schema.contains_type(&TypeId::new(MODELS, "User_Address")));
        assert!(schema.contains_type(&TypeId::new(MODELS, "Base")));
        assert!(schema.validate().is_empty());
    }

    #[test]
    fn test_generic_instantiation_naming() {
        let dir = module(&[(
            "models/page.go",
            r#"package models

type Page[T any] struct {
    Items []T `json:"items"`
    Total int `json:"total"`
}

type User struct {
    Name string `json:"name"`
}
"#,
        )]);
        let root = "example.com/app/models.Page[example.com/app/models.User]"
            .parse()
            .unwrap();
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&[root], &[])
            .unwrap();

        let page = record(&schema, "Page_models_User");
        assert!(page.type_params.is_empty());
        assert_eq!(
            page.fields[0].ty,
            TypeDescriptor::array(TypeDescriptor::reference(MODELS, "User"))
        );
        assert!(schema.validate().is_empty());
    }

    const PAGE: &str = r#"package models

type Page[T any] struct {
    Items []T `json:"items"`
}
"#;

    #[test]
    fn test_instantiations_over_same_named_arguments() {
        let dir = module(&[
            ("models/page.go", PAGE),
            (
                "billing/user.go",
                "package billing\n\ntype User struct {\n    Total int `json:\"total\"`\n}\n",
            ),
            (
                "auth/user.go",
                "package auth\n\ntype User struct {\n    Login string `json:\"login\"`\n}\n",
            ),
        ]);
        let roots: Vec<TypeRef> = [
            "example.com/app/models.Page[example.com/app/billing.User]",
            "example.com/app/models.Page[example.com/app/auth.User]",
        ]
        .iter()
        .map(|r| r.parse().unwrap())
        .collect();
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&roots, &[])
            .unwrap();

        let billing = record(&schema, "Page_billing_User");
        let auth = record(&schema, "Page_auth_User");
        assert_eq!(
            billing.fields[0].ty,
            TypeDescriptor::array(TypeDescriptor::reference("example.com/app/billing", "User"))
        );
        assert_eq!(
            auth.fields[0].ty,
            TypeDescriptor::array(TypeDescriptor::reference("example.com/app/auth", "User"))
        );
        assert!(schema.validate().is_empty());
    }

    #[test]
    fn test_instantiation_name_clash_is_an_error() {
        let user = "package billing\n\ntype User struct {\n    Total int `json:\"total\"`\n}\n";
        let dir = module(&[
            ("models/page.go", PAGE),
            ("billing/user.go", user),
            ("legacy/billing/user.go", user),
        ]);
        let roots: Vec<TypeRef> = [
            "example.com/app/models.Page[example.com/app/billing.User]",
            "example.com/app/models.Page[example.com/app/legacy/billing.User]",
        ]
        .iter()
        .map(|r| r.parse().unwrap())
        .collect();
        let err = GoSourceProvider::new(dir.path())
            .build_schema(&roots, &[])
            .unwrap_err();
        match err {
            ProviderError::Resolution { identifier } => {
                assert!(identifier.contains("Page_billing_User"), "{}", identifier)
            }
            other => panic!("expected a resolution error, got {:?}", other),
        }
    }

    #[test]
    fn test_uninstantiated_generic_keeps_parameters() {
        let dir = module(&[(
            "models/page.go",
            r#"package models

type Number interface {
    ~int | ~float64
}

type Stats[N Number] struct {
    Sum N `json:"sum"`
}
"#,
        )]);
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&[], &[MODELS.to_string()])
            .unwrap();
        let stats = record(&schema, "Stats");
        assert_eq!(stats.type_params.len(), 1);
        assert!(matches!(
            stats.type_params[0].constraint.as_deref(),
            Some(TypeDescriptor::Union { members }) if members.len() == 2
        ));
        assert!(matches!(stats.fields[0].ty, TypeDescriptor::TypeParameter(_)));
        assert!(!schema.contains_type(&TypeId::new(MODELS, "Number")));
        assert!(schema.validate().is_empty());
    }

    #[test]
    fn test_external_types_warn() {
        let dir = module(&[(
            "models/order.go",
            r#"package models

import "github.com/shopspring/decimal"

type Order struct {
    Total decimal.Decimal `json:"total"`
    Other decimal.Decimal `json:"other"`
}
"#,
        )]);
        let schema = GoSourceProvider::new(dir.path())
            .build_schema(&[], &[MODELS.to_string()])
            .unwrap();
        assert_eq!(schema.warnings.len(), 1);
        assert_eq!(schema.warnings[0].code, WarningCode::UnresolvedType);
        assert_eq!(record(&schema, "Order").fields[0].ty, TypeDescriptor::any());
    }

    #[test]
    fn test_resolution_errors() {
        let dir = module(&[("models/a.go", "package models\n\ntype A struct{}\n")]);
        let provider = GoSourceProvider::new(dir.path());

        let err = provider
            .build_schema(&[], &["example.com/app/missing".to_string()])
            .unwrap_err();
        assert!(
            matches!(err, ProviderError::Resolution { ref identifier } if identifier == "example.com/app/missing")
        );

        let err = provider
            .build_schema(&["example.com/app/models.Nope".parse().unwrap()], &[])
            .unwrap_err();
        assert!(matches!(err, ProviderError::Resolution { .. }));

        let err = provider.build_schema(&[], &[]).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
