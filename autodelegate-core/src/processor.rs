//! The round processor: discovery then generation over a growing symbol
//! table, with per-target idempotence and all-or-nothing handoff.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::accessor::derive_accessor;
use crate::cache::{Fingerprint, ResolutionCache};
use crate::config::GeneratorSettings;
use crate::diagnostics::{DiagnosticSink, GenerationError, Outcome, Reporter};
use crate::emitter::{generated_name, Emitter, EmitterOptions, GeneratedUnit};
use crate::resolver::{ResolveError, Resolver};
use crate::scanner::{scan, AnnotatedTarget};
use crate::symbols::{SourceLocation, SymbolTable};

// ── Handoff ─────────────────────────────────────────────────────────────────

/// Host channel receiving generated units at the end of a successful round.
pub trait GeneratedSourceSink {
    fn accept(&mut self, unit: &GeneratedUnit) -> std::io::Result<()>;
}

impl<S: GeneratedSourceSink + ?Sized> GeneratedSourceSink for &mut S {
    fn accept(&mut self, unit: &GeneratedUnit) -> std::io::Result<()> {
        (**self).accept(unit)
    }
}

/// Keeps generated units in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    units: Vec<GeneratedUnit>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[GeneratedUnit] {
        &self.units
    }

    pub fn get(&self, qualified_name: &str) -> Option<&GeneratedUnit> {
        self.units.iter().find(|u| u.qualified_name() == qualified_name)
    }

    pub fn into_units(self) -> Vec<GeneratedUnit> {
        self.units
    }
}

impl GeneratedSourceSink for MemorySink {
    fn accept(&mut self, unit: &GeneratedUnit) -> std::io::Result<()> {
        self.units.push(unit.clone());
        Ok(())
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Why a round stopped without handing off its units.
#[derive(Debug)]
pub enum PassError {
    /// An internal generation error; already reported to the sink.
    Internal(GenerationError),
    Cancelled,
    Handoff {
        unit: String,
        source: std::io::Error,
    },
    RoundLimit {
        max: usize,
    },
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassError::Internal(err) => write!(f, "generation pass aborted: {err}"),
            PassError::Cancelled => f.write_str("generation pass cancelled"),
            PassError::Handoff { unit, source } => {
                write!(f, "could not hand off generated unit `{unit}`: {source}")
            }
            PassError::RoundLimit { max } => {
                write!(f, "round limit reached ({max} rounds); set generator.max_rounds to raise it")
            }
        }
    }
}

impl std::error::Error for PassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PassError::Internal(err) => Some(err),
            PassError::Handoff { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Processor ───────────────────────────────────────────────────────────────

/// Summary of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub round: usize,
    /// Qualified names of the units handed off, in target order.
    pub generated: Vec<String>,
    /// Targets that failed in this round.
    pub failed: Vec<String>,
    /// Targets waiting for declarations that are not visible yet.
    pub deferred: Vec<String>,
    /// Targets skipped because an earlier round already settled them.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct Deferral {
    missing: String,
    location: SourceLocation,
}

pub struct Processor {
    settings: GeneratorSettings,
    cache: ResolutionCache,
    rounds: usize,
    /// Target → qualified name of its generated unit.
    completed: BTreeMap<String, String>,
    /// Targets that failed, with the inputs they failed on.
    failed: HashMap<String, Fingerprint>,
    /// Scan failures already reported, by message.
    scan_failures: HashSet<String>,
    deferred: BTreeMap<String, Deferral>,
}

impl Processor {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            settings,
            cache: ResolutionCache::new(),
            rounds: 0,
            completed: BTreeMap::new(),
            failed: HashMap::new(),
            scan_failures: HashSet::new(),
            deferred: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Targets generated so far, with their unit names.
    pub fn completed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.completed.iter().map(|(t, u)| (t.as_str(), u.as_str()))
    }

    pub fn deferred(&self) -> impl Iterator<Item = &str> {
        self.deferred.keys().map(String::as_str)
    }

    /// Run one round over `table`.
    ///
    /// Units reach `output` only when the whole round succeeds. On
    /// cancellation or an internal error nothing is handed off, and the next
    /// call retries every target that has not completed.
    pub fn process_round(
        &mut self,
        table: &SymbolTable,
        diagnostics: &mut dyn DiagnosticSink,
        output: &mut dyn GeneratedSourceSink,
        cancel: &CancellationToken,
    ) -> Result<RoundReport, PassError> {
        if self.rounds >= self.settings.max_rounds {
            return Err(PassError::RoundLimit {
                max: self.settings.max_rounds,
            });
        }
        if cancel.is_cancelled() {
            return Err(PassError::Cancelled);
        }
        self.rounds += 1;
        let round = self.rounds;
        let _span = tracing::info_span!("round", round).entered();

        let mut report = RoundReport {
            round,
            ..RoundReport::default()
        };
        let mut reporter = Reporter::new(diagnostics);

        // Discovery.
        let outcome = scan(table);
        for failure in outcome.failures {
            if self.scan_failures.insert(failure.to_string()) {
                report.failed.push(failure.target().to_string());
                if reporter.report(&failure) == Outcome::Abort {
                    return Err(PassError::Internal(failure));
                }
            }
        }

        // Generation.
        let resolver = Resolver::new(table, &self.settings).with_cancellation(cancel.clone());
        let emitter = Emitter::new(table, EmitterOptions::from(&self.settings));
        let claims = claim_names(&outcome.targets);
        let mut pending: Vec<GeneratedUnit> = Vec::new();

        for target in &outcome.targets {
            if cancel.is_cancelled() {
                tracing::info!(type_name = %target.name, "round cancelled");
                return Err(PassError::Cancelled);
            }
            if self.completed.contains_key(&target.name) {
                report.skipped += 1;
                continue;
            }
            let fingerprint = Fingerprint::of(target);
            match self.failed.get(&target.name) {
                Some(previous) if *previous == fingerprint => {
                    report.skipped += 1;
                    continue;
                }
                // Its inputs changed since it failed.
                Some(_) => self.cache.invalidate(&target.name),
                None => {}
            }

            match self.generate(target, fingerprint, table, &claims, &resolver, &emitter) {
                Ok(Some(unit)) => {
                    self.failed.remove(&target.name);
                    self.deferred.remove(&target.name);
                    pending.push(unit);
                }
                Ok(None) => report.deferred.push(target.name.clone()),
                Err(GenerateFailure::Cancelled) => return Err(PassError::Cancelled),
                Err(GenerateFailure::Error(err)) => {
                    self.deferred.remove(&target.name);
                    report.failed.push(target.name.clone());
                    if reporter.report(&err) == Outcome::Abort {
                        return Err(PassError::Internal(err));
                    }
                    self.failed.insert(target.name.clone(), fingerprint);
                }
            }
        }

        // Handoff.
        for unit in pending {
            let name = unit.qualified_name();
            output.accept(&unit).map_err(|source| PassError::Handoff {
                unit: name.clone(),
                source,
            })?;
            report.generated.push(name.clone());
            self.completed.insert(unit.origin.clone(), name);
        }

        tracing::info!(
            round,
            generated = report.generated.len(),
            failed = report.failed.len(),
            deferred = report.deferred.len(),
            cache_hits = self.cache.hits(),
            "round finished"
        );
        Ok(report)
    }

    /// Report every target still waiting for a declaration. Returns how many
    /// were reported.
    pub fn finish(&mut self, diagnostics: &mut dyn DiagnosticSink) -> usize {
        let mut reporter = Reporter::new(diagnostics);
        for (target, deferral) in std::mem::take(&mut self.deferred) {
            let err = GenerationError::usage(
                &target,
                &deferral.location,
                format!(
                    "interface `{}` is never declared; `{target}` cannot be generated",
                    deferral.missing
                ),
            );
            reporter.report(&err);
        }
        reporter.errors()
    }

    fn generate(
        &mut self,
        target: &AnnotatedTarget,
        fingerprint: Fingerprint,
        table: &SymbolTable,
        claims: &HashMap<String, Vec<&str>>,
        resolver: &Resolver<'_>,
        emitter: &Emitter<'_>,
    ) -> Result<Option<GeneratedUnit>, GenerateFailure> {
        let usage = |message: String| GenerationError::usage(&target.name, &target.location, message);
        let unit_name = qualified_generated_name(target);

        if let Some(claimants) = claims.get(&unit_name) {
            if claimants.len() > 1 {
                let others: Vec<String> = claimants
                    .iter()
                    .filter(|c| **c != target.name)
                    .map(|c| format!("`{c}`"))
                    .collect();
                return Err(usage(format!(
                    "generated class `{unit_name}` would also be produced for {}",
                    others.join(", ")
                ))
                .into());
            }
        }
        if let Some(existing) = table.get(&unit_name) {
            if existing.generated_for.as_deref() != Some(target.name.as_str()) {
                return Err(usage(format!(
                    "generated class `{unit_name}` collides with an existing declaration at {}",
                    existing.location
                ))
                .into());
            }
        }

        let set = match self.cache.get(&target.name, fingerprint) {
            Some(set) => set.clone(),
            None => match resolver.resolve(target) {
                Ok(set) => {
                    self.cache.insert(&target.name, fingerprint, set.clone());
                    set
                }
                Err(ResolveError::Deferred { missing }) => {
                    tracing::debug!(type_name = %target.name, %missing, "deferred");
                    self.deferred.insert(
                        target.name.clone(),
                        Deferral {
                            missing,
                            location: target.location.clone(),
                        },
                    );
                    return Ok(None);
                }
                Err(ResolveError::Cancelled) => return Err(GenerateFailure::Cancelled),
                Err(ResolveError::Failed(err)) => return Err(err.into()),
            },
        };

        let accessor = derive_accessor(target, &set, &resolver.relations())?;
        let unit = emitter.emit(target, &set, &accessor)?;
        Ok(Some(unit))
    }
}

enum GenerateFailure {
    Error(GenerationError),
    Cancelled,
}

impl From<GenerationError> for GenerateFailure {
    fn from(err: GenerationError) -> Self {
        GenerateFailure::Error(err)
    }
}

fn qualified_generated_name(target: &AnnotatedTarget) -> String {
    let class = generated_name(&target.simple_name);
    if target.package.is_empty() {
        class
    } else {
        format!("{}.{class}", target.package)
    }
}

/// Generated name → every target of the pass that would produce it.
fn claim_names(targets: &[AnnotatedTarget]) -> HashMap<String, Vec<&str>> {
    let mut claims: HashMap<String, Vec<&str>> = HashMap::new();
    for target in targets {
        claims
            .entry(qualified_generated_name(target))
            .or_default()
            .push(target.name.as_str());
    }
    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticCollector, DiagnosticKind};
    use crate::signature::MethodSignature;
    use crate::symbols::{MarkerOptions, TypeDecl};
    use crate::types::TypeRef;

    fn reader_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("io.Reader").with_method(MethodSignature::new("read", TypeRef::Void)));
        table.upsert(
            TypeDecl::class("io.Buffered")
                .implementing(TypeRef::declared("io.Reader"))
                .marked(MarkerOptions::default()),
        );
        table
    }

    #[test]
    fn completed_targets_are_not_regenerated() {
        let table = reader_table();
        let mut processor = Processor::new(GeneratorSettings::default());
        let mut diagnostics = DiagnosticCollector::new();
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let first = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert_eq!(first.generated, ["io.Buffered_AutoDelegate"]);
        let second = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert!(second.generated.is_empty());
        assert_eq!(second.skipped, 1);
        assert_eq!(sink.units().len(), 1);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn failures_are_reported_once() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("f.A").with_method(MethodSignature::new("get", TypeRef::declared("java.lang.String"))));
        table.upsert(TypeDecl::interface("f.B").with_method(MethodSignature::new("get", TypeRef::object())));
        table.upsert(
            TypeDecl::class("f.Both")
                .implementing(TypeRef::declared("f.A"))
                .implementing(TypeRef::declared("f.B"))
                .marked(MarkerOptions::default()),
        );
        let mut processor = Processor::new(GeneratorSettings::default());
        let mut diagnostics = DiagnosticCollector::new();
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        }
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.diagnostics()[0].kind, DiagnosticKind::ResolutionConflict);
        assert!(sink.units().is_empty());
    }

    #[test]
    fn failed_targets_are_retried_once_their_marker_changes() {
        let mut table = reader_table();
        table.upsert(
            TypeDecl::class("io.Buffered")
                .implementing(TypeRef::declared("io.Reader"))
                .marked(MarkerOptions {
                    accessor: "read".into(),
                    ..MarkerOptions::default()
                }),
        );
        let mut processor = Processor::new(GeneratorSettings::default());
        let mut diagnostics = DiagnosticCollector::new();
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let first = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert_eq!(first.failed, ["io.Buffered"]);
        assert_eq!(processor.cache().len(), 1);
        let again = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert_eq!(again.skipped, 1);

        table.upsert(
            TypeDecl::class("io.Buffered")
                .implementing(TypeRef::declared("io.Reader"))
                .marked(MarkerOptions {
                    accessor: "source".into(),
                    ..MarkerOptions::default()
                }),
        );
        let fixed = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert_eq!(fixed.generated, ["io.Buffered_AutoDelegate"]);
        assert_eq!(processor.cache().len(), 1);
        assert_eq!(diagnostics.error_count(), 1);
        assert!(sink.units()[0].source.contains("protected abstract Reader source();"));
    }

    #[test]
    fn existing_declarations_block_the_generated_name() {
        let mut table = reader_table();
        table.upsert(TypeDecl::class("io.Buffered_AutoDelegate"));
        let mut processor = Processor::new(GeneratorSettings::default());
        let mut diagnostics = DiagnosticCollector::new();
        let mut sink = MemorySink::new();
        processor
            .process_round(&table, &mut diagnostics, &mut sink, &CancellationToken::new())
            .unwrap();
        let errors = diagnostics.diagnostics();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("collides with an existing declaration"));
    }

    #[test]
    fn round_limit_is_enforced() {
        let table = reader_table();
        let settings = GeneratorSettings {
            max_rounds: 1,
            ..GeneratorSettings::default()
        };
        let mut processor = Processor::new(settings);
        let mut diagnostics = DiagnosticCollector::new();
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();
        processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert!(matches!(
            processor.process_round(&table, &mut diagnostics, &mut sink, &cancel),
            Err(PassError::RoundLimit { max: 1 })
        ));
    }

    struct FailingSink;

    impl GeneratedSourceSink for FailingSink {
        fn accept(&mut self, _unit: &GeneratedUnit) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn handoff_failures_leave_the_target_pending() {
        let table = reader_table();
        let mut processor = Processor::new(GeneratorSettings::default());
        let mut diagnostics = DiagnosticCollector::new();
        let cancel = CancellationToken::new();
        let err = processor
            .process_round(&table, &mut diagnostics, &mut FailingSink, &cancel)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not hand off generated unit `io.Buffered_AutoDelegate`: disk full"
        );
        assert_eq!(processor.completed().count(), 0);

        let mut sink = MemorySink::new();
        let report = processor.process_round(&table, &mut diagnostics, &mut sink, &cancel).unwrap();
        assert_eq!(report.generated.len(), 1);
        assert_eq!(processor.cache().hits(), 1);
    }
}
