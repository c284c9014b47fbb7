//! Traits for output flavors.

use crate::ir::TypeDescriptor;
use crate::output::{EmitContext, EmitError};

/// A pluggable output backend that writes one extra file per run.
///
/// The orchestrator calls [`emit_preamble`](Flavor::emit_preamble) once,
/// [`emit_type`](Flavor::emit_type) for every named type in dependency
/// order (marking each as emitted afterwards), then
/// [`emit_services`](Flavor::emit_services), and writes the concatenation to
/// `{base}.{file_suffix}`.
///
/// # Implementing a flavor
///
/// ```ignore
/// use typebridge::{Flavor, FlavorRegistry};
///
/// struct Arktype;
///
/// impl Flavor for Arktype {
///     fn name(&self) -> &'static str { "arktype" }
///     fn file_suffix(&self) -> &'static str { "arktype.ts" }
///     fn emits_inferred_types(&self) -> bool { true }
///     fn emit_preamble(&self, _: &EmitContext<'_>) -> Result<String, EmitError> { /* ... */ }
///     fn emit_type(&self, ctx: &mut EmitContext<'_>, ty: &TypeDescriptor) -> Result<String, EmitError> { /* ... */ }
/// }
///
/// let mut registry = FlavorRegistry::builtin();
/// registry.register("arktype", || Box::new(Arktype));
/// ```
pub trait Flavor: Send + Sync {
    /// Identifier used in configuration (e.g. "zod").
    fn name(&self) -> &'static str;

    /// Appended to the base name, e.g. "zod.ts" gives `types.zod.ts`.
    fn file_suffix(&self) -> &'static str;

    /// Whether this flavor can export type names on its own, making the
    /// base declarations optional.
    fn emits_inferred_types(&self) -> bool;

    /// Imports and other file-level prelude.
    fn emit_preamble(&self, ctx: &EmitContext<'_>) -> Result<String, EmitError>;

    /// Code for one named type (record, alias or enum).
    fn emit_type(&self, ctx: &mut EmitContext<'_>, ty: &TypeDescriptor)
    -> Result<String, EmitError>;

    /// Code emitted after every type, typically per-endpoint tables.
    fn emit_services(&self, _ctx: &mut EmitContext<'_>) -> Result<String, EmitError> {
        Ok(String::new())
    }
}
