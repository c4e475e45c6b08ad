//! Per-target memo of resolved method sets, so later rounds do not repeat
//! work for targets whose inputs did not change.

use std::collections::HashMap;
use std::fmt;

use crate::resolver::ResolvedMethodSet;
use crate::scanner::AnnotatedTarget;

/// BLAKE3 digest of what a target's resolution depends on: its type
/// parameters, interface list and generation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(target: &AnnotatedTarget) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"autodelegate-target-v1:");
        hasher.update(target.name.as_bytes());
        for param in &target.type_params {
            hasher.update(b"\0param:");
            hasher.update(param.to_string().as_bytes());
        }
        for interface in &target.interfaces {
            hasher.update(b"\0interface:");
            hasher.update(interface.to_string().as_bytes());
        }
        let options = &target.options;
        hasher.update(&[
            options.force_override_defaults as u8,
            options.include_root_methods as u8,
        ]);
        if let Some(delegate) = &options.delegate_type {
            hasher.update(b"\0delegate:");
            hasher.update(delegate.to_string().as_bytes());
        }
        hasher.update(b"\0accessor:");
        hasher.update(options.accessor.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, (Fingerprint, ResolvedMethodSet)>,
    hits: u64,
    misses: u64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached set for `target`, if it was resolved with the same
    /// fingerprint.
    pub fn get(&mut self, target: &str, fingerprint: Fingerprint) -> Option<&ResolvedMethodSet> {
        match self.entries.get(target) {
            Some((cached, set)) if *cached == fingerprint => {
                self.hits += 1;
                Some(set)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, target: &str, fingerprint: Fingerprint, set: ResolvedMethodSet) {
        self.entries.insert(target.to_string(), (fingerprint, set));
    }

    pub fn invalidate(&mut self, target: &str) {
        self.entries.remove(target);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
