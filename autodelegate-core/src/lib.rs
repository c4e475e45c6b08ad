//! Generation of forwarding classes for interfaces.
//!
//! A declaration marked for auto-delegation names a set of interfaces. The
//! crate computes every abstract method those interfaces require, resolves
//! overlaps across the inheritance graph, and emits an abstract class that
//! forwards each method to a delegate returned by a single accessor.
//!
//! ```ignore
//! use autodelegate_core::prelude::*;
//!
//! let mut table = SymbolTable::new();
//! let file = parse_declarations(source, "decls.yaml")?;
//! load_into(&mut table, &file, "decls.yaml")?;
//!
//! let mut processor = Processor::new(GeneratorSettings::default());
//! let mut diagnostics = DiagnosticCollector::new();
//! let mut output = MemorySink::new();
//! processor.process_round(&table, &mut diagnostics, &mut output, &CancellationToken::new())?;
//! ```

pub mod accessor;
pub mod cache;
pub mod config;
pub mod declarations;
pub mod diagnostics;
pub mod emitter;
pub mod graph;
pub mod logging;
pub mod prelude;
pub mod processor;
pub mod relations;
pub mod resolver;
pub mod scanner;
pub mod signature;
pub mod symbols;
pub mod types;

pub use accessor::{derive_accessor, AccessorSpec};
pub use cache::{Fingerprint, ResolutionCache};
pub use config::{
    ConfigError, ConfigValue, CovarianceMode, SettingValue, GeneratorConfig, GeneratorSettings,
    ReturnTiebreak,
};
pub use declarations::{load_file, load_into, parse_declarations, DeclarationError, DeclarationFile};
pub use diagnostics::{
    ConflictKind, Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, GenerationError,
    Outcome, Reporter, Severity, TracingSink,
};
pub use emitter::{generated_name, Emitter, EmitterOptions, GeneratedUnit, GENERATED_SUFFIX};
pub use graph::{InterfaceGraph, WalkError};
pub use logging::init_tracing;
pub use processor::{GeneratedSourceSink, MemorySink, PassError, Processor, RoundReport};
pub use relations::TypeRelations;
pub use resolver::{ResolveError, ResolvedMethod, ResolvedMethodSet, Resolver};
pub use scanner::{scan, AnnotatedTarget, GenerationOptions, ScanOutcome};
pub use signature::{MethodKind, MethodSignature, Parameter, SignatureIdentity};
pub use symbols::{DeclKind, MarkerOptions, SourceLocation, SymbolError, SymbolTable, TypeDecl, Visibility};
pub use types::{Primitive, TypeParam, TypeParseError, TypeRef, Wildcard};

pub use tokio_util::sync::CancellationToken;
