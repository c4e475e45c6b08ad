use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;

use autodelegate_core::{GeneratedSourceSink, GeneratedUnit, GeneratorSettings};

use super::{output, pass, Format};

/// Writes each unit to `<root>/<package dirs>/<Name>.java`.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl GeneratedSourceSink for DirectorySink {
    fn accept(&mut self, unit: &GeneratedUnit) -> io::Result<()> {
        let path = self.root.join(unit.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Readers of the output directory never see a half-written file.
        let tmp = path.with_extension("java.tmp");
        fs::write(&tmp, &unit.source)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), "unit written");
        self.written.push(path);
        Ok(())
    }
}

/// Run a pass over `inputs`, writing generated units beneath `out`.
pub fn run(
    inputs: &[PathBuf],
    out: &Path,
    format: Format,
    settings: &GeneratorSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = DirectorySink::new(out);
    let summary = pass::run_pass(inputs, settings, &mut sink)?;
    output::print_summary(&summary, format);
    if format == Format::Text && !sink.written().is_empty() {
        println!("  {} {} files under {}", "wrote".dimmed(), sink.written().len(), out.display());
    }
    summary.into_result()
}
