use std::path::PathBuf;

use autodelegate_core::declarations::{load_file, load_into};
use autodelegate_core::{
    CancellationToken, Diagnostic, DiagnosticCollector, GeneratedSourceSink, GeneratedUnit,
    GeneratorSettings, PassError, Processor, RoundReport, SymbolTable,
};

/// What a pass produced.
#[derive(Debug, Default)]
pub struct PassSummary {
    pub diagnostics: Vec<Diagnostic>,
    pub units: Vec<GeneratedUnit>,
    pub rounds: Vec<RoundReport>,
    /// Set when an internal error stopped the pass early.
    pub aborted: Option<String>,
}

impl PassSummary {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// `Err` when anything was reported as an error.
    pub fn into_result(self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(reason) = self.aborted {
            return Err(reason.into());
        }
        match self.error_count() {
            0 => Ok(()),
            1 => Err("1 error reported".into()),
            n => Err(format!("{n} errors reported").into()),
        }
    }
}

/// Forwards units to the real sink and remembers them.
struct Recorder<'a> {
    inner: &'a mut dyn GeneratedSourceSink,
    units: Vec<GeneratedUnit>,
}

impl GeneratedSourceSink for Recorder<'_> {
    fn accept(&mut self, unit: &GeneratedUnit) -> std::io::Result<()> {
        self.inner.accept(unit)?;
        self.units.push(unit.clone());
        Ok(())
    }
}

/// Load each input in turn and run one round after each. Units generated
/// in a round are added to the symbol table before the next one.
pub fn run_pass(
    inputs: &[PathBuf],
    settings: &GeneratorSettings,
    output: &mut dyn GeneratedSourceSink,
) -> Result<PassSummary, Box<dyn std::error::Error>> {
    let mut table = SymbolTable::new();
    let mut processor = Processor::new(settings.clone());
    let mut diagnostics = DiagnosticCollector::new();
    let mut recorder = Recorder {
        inner: output,
        units: Vec::new(),
    };
    let cancel = CancellationToken::new();
    let mut summary = PassSummary::default();

    for input in inputs {
        let file = load_file(input)?;
        let added = load_into(&mut table, &file, &input.display().to_string())?;
        tracing::debug!(input = %input.display(), types = added.len(), "input loaded");

        let before = recorder.units.len();
        match processor.process_round(&table, &mut diagnostics, &mut recorder, &cancel) {
            Ok(report) => summary.rounds.push(report),
            Err(PassError::Internal(err)) => {
                summary.aborted = Some(format!("generation aborted: {}", err.message()));
                break;
            }
            Err(other) => return Err(other.into()),
        }
        for unit in &recorder.units[before..] {
            table.upsert(unit.as_declaration());
        }
    }
    if summary.aborted.is_none() {
        processor.finish(&mut diagnostics);
    }

    summary.diagnostics = diagnostics.into_vec();
    summary.units = recorder.units;
    Ok(summary)
}
