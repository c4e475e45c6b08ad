use std::path::PathBuf;

use autodelegate_core::{GeneratorSettings, MemorySink};

use super::{output, pass, Format};

/// Run a full pass over `inputs` and report, without writing any file.
pub fn run(
    inputs: &[PathBuf],
    format: Format,
    settings: &GeneratorSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = MemorySink::new();
    let summary = pass::run_pass(inputs, settings, &mut sink)?;
    output::print_summary(&summary, format);
    summary.into_result()
}
