//! Error classification and reporting.
//!
//! Every failure during a pass becomes a [`GenerationError`]. The
//! [`Reporter`] turns it into a [`Diagnostic`] for the host's
//! [`DiagnosticSink`] and decides whether the pass may continue: only
//! internal errors abort it, everything else is confined to its target.

use std::fmt;

use serde::Serialize;

use crate::symbols::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    /// Attached to an error, pointing at a related declaration.
    Note,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Note => "note",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UsageError,
    ResolutionConflict,
    UnsupportedConstruct,
    InternalGenerationError,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UsageError => "usage-error",
            DiagnosticKind::ResolutionConflict => "resolution-conflict",
            DiagnosticKind::UnsupportedConstruct => "unsupported-construct",
            DiagnosticKind::InternalGenerationError => "internal-generation-error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What about a method failed to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    ReturnType,
    Exceptions,
    TypeArguments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn note(kind: DiagnosticKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Note,
            kind,
            message: message.into(),
            location,
            target: None,
            notes: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error[{}]: {}", self.kind, self.message)?,
            Severity::Note => write!(f, "note: {}", self.message)?,
        }
        write!(f, "\n  --> {}", self.location)?;
        for note in &self.notes {
            write!(f, "\n  = note: {} ({})", note.message, note.location)?;
        }
        Ok(())
    }
}

// ── GenerationError ─────────────────────────────────────────────────────────

/// A failure attributed to one target (or, for `Internal`, to the pass).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    Usage {
        target: String,
        message: String,
        location: SourceLocation,
    },
    ResolutionConflict {
        target: String,
        conflict: ConflictKind,
        message: String,
        location: SourceLocation,
        /// Declarations involved in the conflict.
        notes: Vec<(String, SourceLocation)>,
    },
    UnsupportedConstruct {
        target: String,
        message: String,
        location: SourceLocation,
    },
    Internal {
        target: String,
        message: String,
        location: SourceLocation,
    },
}

impl GenerationError {
    pub fn usage(target: &str, location: &SourceLocation, message: impl Into<String>) -> Self {
        GenerationError::Usage {
            target: target.to_string(),
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn unsupported(target: &str, location: &SourceLocation, message: impl Into<String>) -> Self {
        GenerationError::UnsupportedConstruct {
            target: target.to_string(),
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn internal(target: &str, location: &SourceLocation, message: impl Into<String>) -> Self {
        GenerationError::Internal {
            target: target.to_string(),
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn conflict(
        target: &str,
        location: &SourceLocation,
        conflict: ConflictKind,
        message: impl Into<String>,
    ) -> Self {
        GenerationError::ResolutionConflict {
            target: target.to_string(),
            conflict,
            message: message.into(),
            location: location.clone(),
            notes: Vec::new(),
        }
    }

    /// Attach a note; ignored for kinds that carry none.
    pub fn with_note(mut self, message: impl Into<String>, at: SourceLocation) -> Self {
        if let GenerationError::ResolutionConflict { notes, .. } = &mut self {
            notes.push((message.into(), at));
        }
        self
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            GenerationError::Usage { .. } => DiagnosticKind::UsageError,
            GenerationError::ResolutionConflict { .. } => DiagnosticKind::ResolutionConflict,
            GenerationError::UnsupportedConstruct { .. } => DiagnosticKind::UnsupportedConstruct,
            GenerationError::Internal { .. } => DiagnosticKind::InternalGenerationError,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            GenerationError::Usage { target, .. }
            | GenerationError::ResolutionConflict { target, .. }
            | GenerationError::UnsupportedConstruct { target, .. }
            | GenerationError::Internal { target, .. } => target,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GenerationError::Usage { message, .. }
            | GenerationError::ResolutionConflict { message, .. }
            | GenerationError::UnsupportedConstruct { message, .. }
            | GenerationError::Internal { message, .. } => message,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            GenerationError::Usage { location, .. }
            | GenerationError::ResolutionConflict { location, .. }
            | GenerationError::UnsupportedConstruct { location, .. }
            | GenerationError::Internal { location, .. } => location,
        }
    }

    /// Internal errors mean the generator itself is in a bad state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GenerationError::Internal { .. })
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let kind = self.kind();
        let notes = match self {
            GenerationError::ResolutionConflict { notes, .. } => notes
                .iter()
                .map(|(message, at)| Diagnostic::note(kind, message.clone(), at.clone()))
                .collect(),
            _ => Vec::new(),
        };
        Diagnostic {
            severity: Severity::Error,
            kind,
            message: self.message().to_string(),
            location: self.location().clone(),
            target: Some(self.target().to_string()),
            notes,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.kind(), self.target(), self.message())
    }
}

impl std::error::Error for GenerationError {}

// ── Sinks ───────────────────────────────────────────────────────────────────

/// Host channel for diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn for_target<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.target.as_deref() == Some(target))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let target = diagnostic.target.as_deref().unwrap_or("-");
        match diagnostic.severity {
            Severity::Error => tracing::error!(
                kind = %diagnostic.kind,
                type_name = %target,
                location = %diagnostic.location,
                "{}",
                diagnostic.message
            ),
            Severity::Note => tracing::info!(
                location = %diagnostic.location,
                "note: {}",
                diagnostic.message
            ),
        }
    }
}

// ── Reporter ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Skip the target, keep going.
    Continue,
    /// Stop the pass.
    Abort,
}

/// Routes errors to a sink and applies the fail-isolation policy.
pub struct Reporter<'s> {
    sink: &'s mut dyn DiagnosticSink,
    errors: usize,
}

impl<'s> Reporter<'s> {
    pub fn new(sink: &'s mut dyn DiagnosticSink) -> Self {
        Self { sink, errors: 0 }
    }

    pub fn report(&mut self, error: &GenerationError) -> Outcome {
        self.errors += 1;
        tracing::debug!(type_name = %error.target(), kind = %error.kind(), "generation failed");
        self.sink.report(error.to_diagnostic());
        if error.is_fatal() {
            Outcome::Abort
        } else {
            Outcome::Continue
        }
    }

    pub fn errors(&self) -> usize {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> SourceLocation {
        SourceLocation::new("decls.yaml", line)
    }

    #[test]
    fn only_internal_errors_abort() {
        let mut sink = DiagnosticCollector::new();
        let mut reporter = Reporter::new(&mut sink);
        let usage = GenerationError::usage("a.Target", &at(1), "nothing to delegate");
        let conflict = GenerationError::conflict("a.Target", &at(1), ConflictKind::ReturnType, "bad");
        let unsupported = GenerationError::unsupported("a.Target", &at(1), "odd");
        let internal = GenerationError::internal("a.Target", &at(1), "broken");
        assert_eq!(reporter.report(&usage), Outcome::Continue);
        assert_eq!(reporter.report(&conflict), Outcome::Continue);
        assert_eq!(reporter.report(&unsupported), Outcome::Continue);
        assert_eq!(reporter.report(&internal), Outcome::Abort);
        assert_eq!(reporter.errors(), 4);
        assert_eq!(sink.error_count(), 4);
    }

    #[test]
    fn conflict_notes_become_note_diagnostics() {
        let error = GenerationError::conflict(
            "a.Target",
            &at(4),
            ConflictKind::ReturnType,
            "`get()` returns java.lang.String in a.A but java.lang.Object in a.B",
        )
        .with_note("declared in a.A", at(10))
        .with_note("declared in a.B", at(20));
        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.kind, DiagnosticKind::ResolutionConflict);
        assert_eq!(diagnostic.notes.len(), 2);
        assert!(diagnostic.notes.iter().all(|n| n.severity == Severity::Note));
        let rendered = diagnostic.to_string();
        assert!(rendered.starts_with("error[resolution-conflict]: `get()`"));
        assert!(rendered.contains("= note: declared in a.B (decls.yaml:20)"));
    }

    #[test]
    fn notes_are_ignored_on_other_kinds() {
        let error = GenerationError::usage("a.T", &at(1), "m").with_note("x", at(2));
        assert!(error.to_diagnostic().notes.is_empty());
    }

    #[test]
    fn diagnostics_serialize_with_kebab_kinds() {
        let diagnostic = GenerationError::unsupported("a.T", &at(3), "wildcard return").to_diagnostic();
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "unsupported-construct");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["location"]["line"], 3);
        assert!(json.get("notes").is_none());
    }
}
