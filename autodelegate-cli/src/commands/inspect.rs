use std::fmt::Write as _;
use std::path::PathBuf;

use colored::Colorize;

use autodelegate_core::declarations::{load_file, load_into};
use autodelegate_core::{
    derive_accessor, generated_name, scan, GeneratorSettings, ResolveError, Resolver, SymbolTable,
};

/// Print what would be generated for each target, or only for `target`
/// (qualified or package-relative name).
pub fn run(
    inputs: &[PathBuf],
    target: Option<&str>,
    settings: &GeneratorSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", render(inputs, target, settings)?);
    Ok(())
}

pub fn render(
    inputs: &[PathBuf],
    target: Option<&str>,
    settings: &GeneratorSettings,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut table = SymbolTable::new();
    for input in inputs {
        let file = load_file(input)?;
        load_into(&mut table, &file, &input.display().to_string())?;
    }

    let outcome = scan(&table);
    let selected: Vec<_> = outcome
        .targets
        .iter()
        .filter(|t| target.map_or(true, |name| t.name == name || t.simple_name == name))
        .collect();
    let rejected: Vec<_> = outcome
        .failures
        .iter()
        .filter(|f| target.map_or(true, |name| f.target() == name))
        .collect();
    if let Some(name) = target {
        if selected.is_empty() && rejected.is_empty() {
            return Err(format!("no marked declaration named `{name}`").into());
        }
    }

    let resolver = Resolver::new(&table, settings);
    let mut out = String::new();
    for t in selected {
        writeln!(
            out,
            "{} {} {}",
            t.name.bold(),
            "->".dimmed(),
            generated_name(&t.simple_name)
        )?;
        let set = match resolver.resolve(t) {
            Ok(set) => set,
            Err(ResolveError::Deferred { missing }) => {
                writeln!(out, "  {} `{missing}` is not declared", "waiting:".yellow())?;
                continue;
            }
            Err(err) => {
                writeln!(out, "  {} {err}", "error:".red())?;
                continue;
            }
        };
        for method in set.iter() {
            write!(out, "  {}  {}", method.signature, format!("from {}", method.origin).dimmed())?;
            let others: Vec<&str> = method
                .also_declared_by
                .iter()
                .map(String::as_str)
                .filter(|o| *o != method.origin)
                .collect();
            if !others.is_empty() {
                write!(out, " {}", format!("(also {})", others.join(", ")).dimmed())?;
            }
            writeln!(out)?;
        }
        match derive_accessor(t, &set, &resolver.relations()) {
            Ok(accessor) => writeln!(
                out,
                "  accessor: {} {}(){}",
                accessor.return_type,
                accessor.name,
                if accessor.inferred { " (inferred)" } else { "" }
            )?,
            Err(err) => writeln!(out, "  {} {}", "error:".red(), err.message())?,
        }
    }
    for failure in rejected {
        writeln!(out, "{} {}", failure.target().bold(), "rejected".red())?;
        writeln!(out, "  {}", failure.message())?;
    }
    Ok(out)
}
