//! Command implementations for the `autodelegate` CLI.
//!
//! Each of `check`, `generate` and `inspect` corresponds to a top-level
//! command; `pass` and `output` are shared by them.

/// Full pass without writing: `autodelegate check`.
pub mod check;

/// Generation into a directory: `autodelegate generate`.
///
/// Units are written beneath `--out` using their package path, each one
/// through a temporary file renamed into place.
pub mod generate;

/// Resolution report: `autodelegate inspect`.
pub mod inspect;

/// Diagnostic and summary rendering, as coloured text or JSON.
pub mod output;

/// Round-per-input driver shared by `check` and `generate`.
pub mod pass;

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}
