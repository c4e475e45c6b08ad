//! # autodelegate-cli
//!
//! Command-line front end for `autodelegate-core`.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `autodelegate generate <INPUT>... --out <DIR>` | Generate forwarding classes beneath `DIR` |
//! | `autodelegate check <INPUT>...` | Run a full pass without writing anything |
//! | `autodelegate inspect <INPUT>...` | Show each target's resolved methods and accessor |
//!
//! Every input is a YAML or JSON declaration file. `generate` and `check`
//! treat each input as one round: the file's declarations are added to the
//! symbol table, then every marked declaration seen so far is processed.

pub mod commands;
