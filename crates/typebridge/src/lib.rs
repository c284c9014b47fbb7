//! Keep a Go backend's wire types and a TypeScript frontend in sync.
//!
//! `typebridge` extracts Go types reachable from a service route map into a
//! language-neutral IR, validates it, and emits TypeScript declarations plus
//! runtime validation schemas (Zod, Valibot).
//!
//! # Architecture
//!
//! ```text
//! Providers              IR                 Emitters
//! ─────────────      ─────────────      ─────────────────────
//! Go sources    ─┐                   ┌─> TypeScript declarations
//!  (deep)        ├─> Schema ─────────┤
//! Type catalog  ─┘   (ir.rs)         ├─> Zod schemas
//!  (shallow)          │              └─> Valibot schemas
//!                 validate.rs              │
//!                                          └─> Sink (disk / memory)
//! ```
//!
//! # Example
//!
//! ```
//! use typebridge::ir::{Field, PrimitiveKind, RecordType, Schema, TypeDescriptor, TypeId};
//!
//! let mut schema = Schema::new();
//! schema
//!     .add_type(TypeDescriptor::Record(RecordType::new(
//!         TypeId::new("example.com/app/models", "User"),
//!         vec![
//!             Field::new("ID", TypeDescriptor::sized(PrimitiveKind::Int, 64)).wire("id"),
//!             Field::new("Email", TypeDescriptor::string())
//!                 .wire("email")
//!                 .validate("required,email"),
//!         ],
//!     )))
//!     .unwrap();
//! assert!(schema.validate().is_empty());
//! ```
//!
//! # Feature Flags
//!
//! - `input-go` - deep extraction from Go sources (tree-sitter)
//! - `backend-zod` - Zod schema generation
//! - `backend-valibot` - Valibot schema generation

pub mod config;
pub mod generate;
pub mod input;
pub mod ir;
pub mod output;
pub mod registry;
pub mod sink;
pub mod traits;
pub mod validate;

pub use config::{Config, ConfigError, ProviderKind};
pub use generate::{GenerateError, GenerateReport, RouteInfo, RouteMap, generate};
pub use input::{Provider, ProviderError, TypeRef};
pub use ir::{Schema, TypeDescriptor, TypeId, Warning};
pub use registry::FlavorRegistry;
pub use sink::{FsSink, MemorySink, Sink, SinkError};
pub use traits::Flavor;
pub use validate::{InvalidSchema, ValidationCode, ValidationError};

#[cfg(feature = "input-go")]
pub use input::GoSourceProvider;
pub use input::RuntimeProvider;

#[cfg(feature = "backend-zod")]
pub use output::ZodFlavor;

#[cfg(feature = "backend-valibot")]
pub use output::ValibotFlavor;
