//! Method-set resolution: from a target's interface list to the deduplicated,
//! conflict-checked set of methods the generated class must forward.

use std::collections::BTreeMap;
use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::config::{CovarianceMode, GeneratorSettings, ReturnTiebreak};
use crate::diagnostics::{ConflictKind, GenerationError};
use crate::graph::{InterfaceGraph, Visit, WalkError};
use crate::relations::TypeRelations;
use crate::scanner::AnnotatedTarget;
use crate::signature::{MethodKind, MethodSignature, SignatureIdentity};
use crate::symbols::{SourceLocation, SymbolTable};
use crate::types::{TypeRef, TypeScope, OBJECT};

/// The method chosen for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethod {
    pub identity: SignatureIdentity,
    /// Signature in the target's scope (interface type arguments bound).
    pub signature: MethodSignature,
    /// Interface whose declaration was chosen.
    pub origin: String,
    /// That interface as referenced from the target, arguments bound.
    pub origin_type: TypeRef,
    pub origin_location: SourceLocation,
    /// Other interfaces in the closure declaring the same identity.
    pub also_declared_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethodSet {
    pub target: String,
    pub methods: BTreeMap<SignatureIdentity, ResolvedMethod>,
    /// The target's interface list.
    pub interfaces: Vec<TypeRef>,
    /// Every interface reached, in breadth-first order.
    pub visited: Vec<TypeRef>,
}

impl ResolvedMethodSet {
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Methods in canonical identity order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedMethod> {
        self.methods.values()
    }

    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResolvedMethod> + 'a {
        self.methods.values().filter(move |m| m.identity.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Failed(GenerationError),
    /// An interface in the closure is not declared yet; retry next round.
    Deferred { missing: String },
    Cancelled,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Failed(err) => write!(f, "{err}"),
            ResolveError::Deferred { missing } => {
                write!(f, "waiting for a declaration of `{missing}`")
            }
            ResolveError::Cancelled => f.write_str("resolution cancelled"),
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<GenerationError> for ResolveError {
    fn from(err: GenerationError) -> Self {
        ResolveError::Failed(err)
    }
}

/// A method as found on one interface of the closure.
struct Occurrence<'t> {
    signature: MethodSignature,
    visit: usize,
    position: usize,
    owner: &'t str,
    location: &'t SourceLocation,
}

pub struct Resolver<'t> {
    graph: InterfaceGraph<'t>,
    relations: TypeRelations<'t>,
    tiebreak: ReturnTiebreak,
    covariance: CovarianceMode,
    cancel: CancellationToken,
}

impl<'t> Resolver<'t> {
    pub fn new(table: &'t SymbolTable, settings: &GeneratorSettings) -> Self {
        Self {
            graph: InterfaceGraph::build(table),
            relations: TypeRelations::new(table),
            tiebreak: settings.return_tiebreak,
            covariance: settings.covariance,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn graph(&self) -> &InterfaceGraph<'t> {
        &self.graph
    }

    pub fn relations(&self) -> TypeRelations<'t> {
        self.relations
    }

    pub fn resolve(&self, target: &AnnotatedTarget) -> Result<ResolvedMethodSet, ResolveError> {
        let visits = self
            .graph
            .walk(&target.interfaces, &self.cancel)
            .map_err(|err| walk_failure(target, err))?;
        if let Some(delegate) = &target.options.delegate_type {
            self.await_delegate_type(delegate)?;
        }

        let mut buckets: BTreeMap<SignatureIdentity, Vec<Occurrence<'t>>> = BTreeMap::new();
        for (index, visit) in visits.iter().enumerate() {
            for (position, method) in visit.decl.methods.iter().enumerate() {
                if !method.kind.is_inherited() {
                    continue;
                }
                let signature = method.substitute(&visit.subst);
                let identity = signature.identity(&target.type_params);
                if !target.options.include_root_methods && is_root_method(&identity) {
                    continue;
                }
                buckets.entry(identity).or_default().push(Occurrence {
                    signature,
                    visit: index,
                    position,
                    owner: visit.decl.name.as_str(),
                    location: &visit.decl.location,
                });
            }
        }

        let mut methods = BTreeMap::new();
        for (identity, occurrences) in buckets {
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            if let Some(method) = self.resolve_identity(target, &visits, &identity, occurrences)? {
                methods.insert(identity, method);
            }
        }

        tracing::debug!(
            type_name = %target.name,
            interfaces = visits.len(),
            methods = methods.len(),
            "resolved method set"
        );
        Ok(ResolvedMethodSet {
            target: target.name.clone(),
            methods,
            interfaces: target.interfaces.clone(),
            visited: visits.into_iter().map(|v| v.ty).collect(),
        })
    }

    /// The delegate type and its superinterfaces must be declared before the
    /// accessor can be checked against them. Any other problem with it is
    /// left to accessor derivation.
    fn await_delegate_type(&self, delegate: &TypeRef) -> Result<(), ResolveError> {
        match self.graph.walk(std::slice::from_ref(delegate), &self.cancel) {
            Err(WalkError::Unknown { name }) => Err(ResolveError::Deferred { missing: name }),
            Err(WalkError::Cancelled) => Err(ResolveError::Cancelled),
            _ => Ok(()),
        }
    }

    fn resolve_identity(
        &self,
        target: &AnnotatedTarget,
        visits: &[Visit<'t>],
        identity: &SignatureIdentity,
        occurrences: Vec<Occurrence<'t>>,
    ) -> Result<Option<ResolvedMethod>, GenerationError> {
        let also_declared_by = {
            let mut owners: Vec<String> = Vec::new();
            for occ in &occurrences {
                if !owners.iter().any(|o| o == occ.owner) {
                    owners.push(occ.owner.to_string());
                }
            }
            owners
        };

        // Most specific declarations win; the rest must be validly overridden.
        let (overridden, survivors) = self.split_overridden(occurrences);
        for old in &overridden {
            for new in survivors
                .iter()
                .filter(|s| self.graph.is_subinterface(s.owner, old.owner))
            {
                self.check_override(target, identity, new, old)?;
            }
        }

        let (abstracts, defaults): (Vec<_>, Vec<_>) = survivors
            .into_iter()
            .partition(|occ| occ.signature.kind == MethodKind::Abstract);
        let candidates = if !abstracts.is_empty() {
            abstracts
        } else if target.options.force_override_defaults {
            defaults
        } else {
            tracing::trace!(type_name = %target.name, method = %identity, "default method not forwarded");
            return Ok(None);
        };

        let candidates = self.align_type_params(target, identity, candidates)?;
        let chosen = self.choose(target, identity, &candidates)?;

        let visit = &visits[chosen.visit];
        Ok(Some(ResolvedMethod {
            identity: identity.clone(),
            signature: chosen.signature.clone(),
            origin: chosen.owner.to_string(),
            origin_type: visit.ty.clone(),
            origin_location: chosen.location.clone(),
            also_declared_by: also_declared_by
                .into_iter()
                .filter(|owner| owner != chosen.owner)
                .collect(),
        }))
    }

    /// Separate occurrences whose owner is a superinterface of another
    /// occurrence's owner.
    fn split_overridden(
        &self,
        all: Vec<Occurrence<'t>>,
    ) -> (Vec<Occurrence<'t>>, Vec<Occurrence<'t>>) {
        let owners: Vec<&str> = all.iter().map(|occ| occ.owner).collect();
        let mut overridden = Vec::new();
        let mut survivors = Vec::new();
        for occ in all {
            let shadowed = owners
                .iter()
                .any(|other| *other != occ.owner && self.graph.is_subinterface(other, occ.owner));
            if shadowed {
                overridden.push(occ);
            } else {
                survivors.push(occ);
            }
        }
        survivors.sort_by_key(|occ| (occ.visit, occ.position));
        (overridden, survivors)
    }

    fn check_override(
        &self,
        target: &AnnotatedTarget,
        identity: &SignatureIdentity,
        new: &Occurrence<'t>,
        old: &Occurrence<'t>,
    ) -> Result<(), GenerationError> {
        let names: Vec<String> = new.signature.type_params.iter().map(|p| p.name.clone()).collect();
        let old_sig = old.signature.rename_type_params(&names);
        let scope = TypeScope::of(&target.type_params).with(&new.signature.type_params);

        if !self.return_fits(&new.signature.return_type, &old_sig.return_type, &scope, CovarianceMode::Java) {
            return Err(conflict(
                target,
                ConflictKind::ReturnType,
                format!(
                    "`{identity}` in `{}` returns `{}`, which cannot override `{}` from `{}`",
                    new.owner, new.signature.return_type, old_sig.return_type, old.owner
                ),
                &[new, old],
            ));
        }
        if !self.relations.covers(&old_sig.throws, &new.signature.throws, &scope) {
            return Err(conflict(
                target,
                ConflictKind::Exceptions,
                format!(
                    "`{identity}` in `{}` throws exceptions not allowed by `{}`",
                    new.owner, old.owner
                ),
                &[new, old],
            ));
        }
        Ok(())
    }

    /// Rename every candidate's method type parameters to the first
    /// candidate's, positionally.
    fn align_type_params(
        &self,
        target: &AnnotatedTarget,
        identity: &SignatureIdentity,
        mut candidates: Vec<Occurrence<'t>>,
    ) -> Result<Vec<Occurrence<'t>>, GenerationError> {
        let Some(first) = candidates.first() else {
            return Ok(candidates);
        };
        let names: Vec<String> = first.signature.type_params.iter().map(|p| p.name.clone()).collect();
        if let Some(odd) = candidates.iter().find(|c| c.signature.type_params.len() != names.len()) {
            let message = format!(
                "`{identity}` declares {} type parameter(s) in `{}` but {} in `{}`",
                names.len(),
                first.owner,
                odd.signature.type_params.len(),
                odd.owner
            );
            return Err(conflict(target, ConflictKind::TypeArguments, message, &[first, odd]));
        }
        for candidate in candidates.iter_mut().skip(1) {
            candidate.signature = candidate.signature.rename_type_params(&names);
        }
        Ok(candidates)
    }

    fn choose<'c>(
        &self,
        target: &AnnotatedTarget,
        identity: &SignatureIdentity,
        candidates: &'c [Occurrence<'t>],
    ) -> Result<&'c Occurrence<'t>, GenerationError> {
        let class_scope = TypeScope::of(&target.type_params);
        let fits_returns: Vec<&Occurrence<'t>> = candidates
            .iter()
            .filter(|c| {
                let scope = class_scope.with(&c.signature.type_params);
                candidates.iter().all(|d| {
                    self.return_fits(&c.signature.return_type, &d.signature.return_type, &scope, self.covariance)
                })
            })
            .collect();
        if fits_returns.is_empty() {
            let listed = candidates
                .iter()
                .map(|c| format!("`{}` in `{}`", c.signature.return_type, c.owner))
                .collect::<Vec<_>>()
                .join(", ");
            let involved: Vec<&Occurrence<'t>> = candidates.iter().collect();
            return Err(conflict(
                target,
                ConflictKind::ReturnType,
                format!("`{identity}` has incompatible return types: {listed}"),
                &involved,
            ));
        }

        let fits_throws: Vec<&Occurrence<'t>> = fits_returns
            .into_iter()
            .filter(|c| {
                let scope = class_scope.with(&c.signature.type_params);
                candidates
                    .iter()
                    .all(|d| self.relations.covers(&d.signature.throws, &c.signature.throws, &scope))
            })
            .collect();
        if fits_throws.is_empty() {
            let involved: Vec<&Occurrence<'t>> = candidates.iter().collect();
            return Err(conflict(
                target,
                ConflictKind::Exceptions,
                format!("`{identity}` has incompatible checked exceptions across its declarations"),
                &involved,
            ));
        }

        let chosen = match self.tiebreak {
            ReturnTiebreak::FirstDeclared => fits_throws.into_iter().min_by_key(|c| (c.visit, c.position)),
            ReturnTiebreak::Narrowest => fits_throws.into_iter().min_by_key(|c| {
                let scope = class_scope.with(&c.signature.type_params);
                (
                    self.relations.checked(&c.signature.throws, &scope).len(),
                    c.visit,
                    c.position,
                )
            }),
        };
        chosen.ok_or_else(|| {
            GenerationError::internal(
                &target.name,
                &target.location,
                format!("no candidate left for `{identity}` after filtering"),
            )
        })
    }

    /// Whether a method returning `narrower` satisfies one returning `wider`.
    fn return_fits(
        &self,
        narrower: &TypeRef,
        wider: &TypeRef,
        scope: &TypeScope<'_>,
        mode: CovarianceMode,
    ) -> bool {
        if narrower == wider {
            return true;
        }
        if !narrower.is_reference() || !wider.is_reference() {
            return false;
        }
        match mode {
            CovarianceMode::OverrideOnly => false,
            CovarianceMode::Java => self.relations.is_subtype(narrower, wider, scope),
        }
    }
}

fn conflict(
    target: &AnnotatedTarget,
    kind: ConflictKind,
    message: String,
    involved: &[&Occurrence<'_>],
) -> GenerationError {
    involved.iter().fold(
        GenerationError::conflict(&target.name, &target.location, kind, message),
        |err, occ| err.with_note(format!("`{}` declares `{}`", occ.owner, occ.signature), occ.location.clone()),
    )
}

fn walk_failure(target: &AnnotatedTarget, err: WalkError) -> ResolveError {
    let usage = |message: String| ResolveError::Failed(GenerationError::usage(&target.name, &target.location, message));
    match err {
        WalkError::Unknown { name } => ResolveError::Deferred { missing: name },
        WalkError::Cancelled => ResolveError::Cancelled,
        WalkError::InconsistentArguments { .. } => ResolveError::Failed(GenerationError::conflict(
            &target.name,
            &target.location,
            ConflictKind::TypeArguments,
            err.to_string(),
        )),
        WalkError::NotAnInterface { ref name, .. } => usage(format!(
            "cannot delegate `{name}`: {err}; only interfaces can be delegated"
        )),
        other => usage(other.to_string()),
    }
}

/// `equals(Object)`, `hashCode()` and `toString()`.
fn is_root_method(identity: &SignatureIdentity) -> bool {
    match identity.name.as_str() {
        "equals" => identity.params.len() == 1 && identity.params[0] == OBJECT,
        "hashCode" | "toString" => identity.params.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use crate::symbols::{MarkerOptions, TypeDecl};
    use crate::types::{Primitive, TypeParam};

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(name)
    }

    fn resolve_in(table: &SymbolTable, settings: &GeneratorSettings) -> Result<ResolvedMethodSet, ResolveError> {
        let outcome = scan(table);
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        Resolver::new(table, settings).resolve(&outcome.targets[0])
    }

    fn resolve(table: &SymbolTable) -> Result<ResolvedMethodSet, ResolveError> {
        resolve_in(table, &GeneratorSettings::default())
    }

    fn target(interfaces: &[&str]) -> TypeDecl {
        interfaces
            .iter()
            .fold(TypeDecl::class("x.Impl"), |decl, name| decl.implementing(ty(name)))
            .marked(MarkerOptions::default())
    }

    #[test]
    fn subinterface_default_shadows_abstract() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.Base").with_method(MethodSignature::new("size", TypeRef::Primitive(Primitive::Int))));
        table.upsert(
            TypeDecl::interface("x.Sized")
                .implementing(ty("x.Base"))
                .with_method(
                    MethodSignature::new("size", TypeRef::Primitive(Primitive::Int)).with_kind(MethodKind::Default),
                ),
        );
        table.upsert(target(&["x.Sized"]));
        assert!(resolve(&table).unwrap().is_empty());
    }

    #[test]
    fn narrower_override_is_kept() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.Source").with_method(MethodSignature::new("get", TypeRef::object())));
        table.upsert(
            TypeDecl::interface("x.Strings")
                .implementing(ty("x.Source"))
                .with_method(MethodSignature::new("get", ty("java.lang.String"))),
        );
        table.upsert(target(&["x.Strings"]));
        let set = resolve(&table).unwrap();
        let get = set.named("get").next().unwrap();
        assert_eq!(get.signature.return_type, ty("java.lang.String"));
        assert_eq!(get.origin, "x.Strings");
        assert_eq!(get.also_declared_by, ["x.Source"]);
    }

    #[test]
    fn widening_override_is_a_conflict() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.Source").with_method(MethodSignature::new("get", ty("java.lang.String"))));
        table.upsert(
            TypeDecl::interface("x.Objects")
                .implementing(ty("x.Source"))
                .with_method(MethodSignature::new("get", TypeRef::object())),
        );
        table.upsert(target(&["x.Objects"]));
        match resolve(&table).unwrap_err() {
            ResolveError::Failed(GenerationError::ResolutionConflict { conflict, notes, .. }) => {
                assert_eq!(conflict, ConflictKind::ReturnType);
                assert_eq!(notes.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn java_covariance_accepts_a_narrower_sibling() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.A").with_method(MethodSignature::new("get", ty("java.lang.String"))));
        table.upsert(TypeDecl::interface("x.B").with_method(MethodSignature::new("get", TypeRef::object())));
        table.upsert(target(&["x.A", "x.B"]));

        assert!(matches!(resolve(&table), Err(ResolveError::Failed(_))));

        let settings = GeneratorSettings {
            covariance: CovarianceMode::Java,
            ..GeneratorSettings::default()
        };
        let set = resolve_in(&table, &settings).unwrap();
        assert_eq!(set.named("get").next().unwrap().signature.return_type, ty("java.lang.String"));
    }

    #[test]
    fn tiebreak_prefers_fewest_checked_exceptions() {
        let mut table = SymbolTable::new();
        let io = ty("java.io.IOException");
        table.upsert(
            TypeDecl::interface("x.A").with_method(
                MethodSignature::new("close", TypeRef::Void)
                    .with_throws(ty("java.lang.Exception")),
            ),
        );
        table.upsert(
            TypeDecl::interface("x.B").with_method(MethodSignature::new("close", TypeRef::Void).with_throws(io)),
        );
        table.upsert(
            TypeDecl::interface("x.C").with_method(MethodSignature::new("close", TypeRef::Void)),
        );
        table.upsert(target(&["x.A", "x.B", "x.C"]));
        let set = resolve(&table).unwrap();
        let close = set.named("close").next().unwrap();
        assert_eq!(close.origin, "x.C");
        assert!(close.signature.throws.is_empty());
    }

    #[test]
    fn disjoint_checked_exceptions_conflict() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.A").with_method(
            MethodSignature::new("run", TypeRef::Void).with_throws(ty("java.io.IOException")),
        ));
        table.upsert(TypeDecl::interface("x.B").with_method(
            MethodSignature::new("run", TypeRef::Void).with_throws(ty("java.lang.InterruptedException")),
        ));
        table.upsert(target(&["x.A", "x.B"]));
        assert!(matches!(
            resolve(&table).unwrap_err(),
            ResolveError::Failed(GenerationError::ResolutionConflict {
                conflict: ConflictKind::Exceptions,
                ..
            })
        ));
    }

    #[test]
    fn unchecked_exceptions_never_conflict() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.A").with_method(
            MethodSignature::new("run", TypeRef::Void).with_throws(ty("java.lang.IllegalStateException")),
        ));
        table.upsert(TypeDecl::interface("x.B").with_method(MethodSignature::new("run", TypeRef::Void)));
        table.upsert(target(&["x.A", "x.B"]));
        let set = resolve(&table).unwrap();
        assert_eq!(set.named("run").next().unwrap().origin, "x.A");
    }

    #[test]
    fn root_methods_are_opt_in() {
        let mut table = SymbolTable::new();
        table.upsert(
            TypeDecl::interface("x.Named")
                .with_method(MethodSignature::new("toString", ty("java.lang.String")))
                .with_method(MethodSignature::new("name", ty("java.lang.String"))),
        );
        table.upsert(target(&["x.Named"]));
        let names: Vec<_> = resolve(&table).unwrap().iter().map(|m| m.identity.name.clone()).collect();
        assert_eq!(names, ["name"]);

        table.upsert(TypeDecl::class("x.Impl").implementing(ty("x.Named")).marked(MarkerOptions {
            include_root_methods: true,
            ..MarkerOptions::default()
        }));
        let names: Vec<_> = resolve(&table).unwrap().iter().map(|m| m.identity.name.clone()).collect();
        assert_eq!(names, ["name", "toString"]);
    }

    #[test]
    fn generic_candidates_align_positionally() {
        let mut table = SymbolTable::new();
        let to_array = |var: &str| {
            MethodSignature::new("toArray", TypeRef::array(TypeRef::var(var)))
                .with_type_param(TypeParam::new(var))
                .with_param("a", TypeRef::array(TypeRef::var(var)))
        };
        table.upsert(TypeDecl::interface("x.A").with_method(to_array("T")));
        table.upsert(TypeDecl::interface("x.B").with_method(to_array("U")));
        table.upsert(target(&["x.A", "x.B"]));
        let set = resolve(&table).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().signature.to_string(), "<T> T[] toArray(T[] a)");
    }

    #[test]
    fn missing_interface_defers() {
        let mut table = SymbolTable::new();
        table.upsert(target(&["x.Later"]));
        assert_eq!(
            resolve(&table).unwrap_err(),
            ResolveError::Deferred {
                missing: "x.Later".into()
            }
        );
    }

    #[test]
    fn missing_delegate_type_defers() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.A").with_method(MethodSignature::new("a", TypeRef::Void)));
        table.upsert(TypeDecl::class("x.Impl").implementing(ty("x.A")).marked(MarkerOptions {
            delegate_type: Some(ty("x.Both")),
            ..MarkerOptions::default()
        }));
        assert_eq!(
            resolve(&table).unwrap_err(),
            ResolveError::Deferred {
                missing: "x.Both".into()
            }
        );

        table.upsert(TypeDecl::interface("x.Both").implementing(ty("x.A")).implementing(ty("x.Later")));
        assert_eq!(
            resolve(&table).unwrap_err(),
            ResolveError::Deferred {
                missing: "x.Later".into()
            }
        );
    }

    #[test]
    fn class_in_the_list_is_a_usage_error() {
        let mut table = SymbolTable::new();
        table.upsert(target(&["java.lang.String"]));
        match resolve(&table).unwrap_err() {
            ResolveError::Failed(err) => {
                assert_eq!(err.kind(), crate::diagnostics::DiagnosticKind::UsageError);
                assert!(err.message().contains("only interfaces can be delegated"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cancelled_token_stops_resolution() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.A").with_method(MethodSignature::new("a", TypeRef::Void)));
        table.upsert(target(&["x.A"]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let targets = scan(&table).targets;
        let resolver = Resolver::new(&table, &GeneratorSettings::default()).with_cancellation(cancel);
        assert_eq!(resolver.resolve(&targets[0]).unwrap_err(), ResolveError::Cancelled);
    }
}
