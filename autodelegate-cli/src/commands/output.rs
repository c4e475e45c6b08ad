use colored::Colorize;
use serde_json::json;

use autodelegate_core::{Diagnostic, Severity};

use super::pass::PassSummary;
use super::Format;

/// A diagnostic as coloured, compiler-style text.
pub fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut out = match diagnostic.severity {
        Severity::Error => format!(
            "{}: {}",
            format!("error[{}]", diagnostic.kind).red().bold(),
            diagnostic.message.bold()
        ),
        Severity::Note => format!("{}: {}", "note".cyan().bold(), diagnostic.message),
    };
    out.push_str(&format!("\n  {} {}", "-->".blue(), diagnostic.location));
    for note in &diagnostic.notes {
        out.push_str(&format!(
            "\n  {} {} ({})",
            "= note:".cyan(),
            note.message,
            note.location
        ));
    }
    out
}

pub fn summary_json(summary: &PassSummary) -> serde_json::Value {
    json!({
        "generated": summary
            .units
            .iter()
            .map(|unit| json!({
                "class": unit.qualified_name(),
                "target": unit.origin,
                "path": unit.relative_path(),
                "methods": unit.methods.len(),
            }))
            .collect::<Vec<_>>(),
        "rounds": summary.rounds.len(),
        "errors": summary.error_count(),
        "aborted": summary.aborted,
        "diagnostics": summary.diagnostics,
    })
}

pub fn print_summary(summary: &PassSummary, format: Format) {
    match format {
        Format::Json => match serde_json::to_string_pretty(&summary_json(summary)) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("{}", format!("Error: {err}").red()),
        },
        Format::Text => {
            for diagnostic in &summary.diagnostics {
                eprintln!("{}", render_diagnostic(diagnostic));
                eprintln!();
            }
            for unit in &summary.units {
                println!(
                    "  {} {} ({} methods)",
                    "generated".green(),
                    unit.qualified_name(),
                    unit.methods.len()
                );
            }
            let errors = summary.error_count();
            let status = format!(
                "{} generated, {} error{} in {} round{}",
                summary.units.len(),
                errors,
                if errors == 1 { "" } else { "s" },
                summary.rounds.len(),
                if summary.rounds.len() == 1 { "" } else { "s" },
            );
            if errors == 0 {
                println!("{}", status.green().bold());
            } else {
                println!("{}", status.red().bold());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodelegate_core::{ConflictKind, DiagnosticKind, GenerationError, SourceLocation};

    #[test]
    fn text_rendering_lists_notes() {
        colored::control::set_override(false);
        let diagnostic =
            GenerationError::conflict("a.B", &SourceLocation::new("b.yaml", 4), ConflictKind::ReturnType, "bad")
                .with_note("declared here", SourceLocation::new("a.yaml", 1))
                .to_diagnostic();
        assert_eq!(diagnostic.kind, DiagnosticKind::ResolutionConflict);
        assert_eq!(
            render_diagnostic(&diagnostic),
            "error[resolution-conflict]: bad\n  --> b.yaml:4\n  = note: declared here (a.yaml:1)"
        );
    }

    #[test]
    fn json_summary_counts_errors() {
        let summary = PassSummary {
            diagnostics: vec![GenerationError::usage("a.B", &SourceLocation::new("b.yaml", 4), "bad").to_diagnostic()],
            ..PassSummary::default()
        };
        let value = summary_json(&summary);
        assert_eq!(value["errors"], 1);
        assert_eq!(value["diagnostics"][0]["message"], "bad");
        assert!(value["aborted"].is_null());
    }
}
