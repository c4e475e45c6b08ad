//! Everything a host needs for a generation pass, in one `use`.
//!
//! ```ignore
//! use autodelegate_core::prelude::*;
//! ```

pub use crate::config::{GeneratorConfig, GeneratorSettings};
pub use crate::declarations::{load_file, load_into, parse_declarations};
pub use crate::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, Severity};
pub use crate::emitter::GeneratedUnit;
pub use crate::processor::{GeneratedSourceSink, MemorySink, PassError, Processor, RoundReport};
pub use crate::symbols::{MarkerOptions, SymbolTable, TypeDecl};
pub use crate::types::TypeRef;
pub use crate::CancellationToken;
