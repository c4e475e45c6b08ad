//! The single abstract accessor through which every call is forwarded.

use crate::diagnostics::GenerationError;
use crate::relations::TypeRelations;
use crate::resolver::ResolvedMethodSet;
use crate::scanner::AnnotatedTarget;
use crate::types::{TypeRef, TypeScope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorSpec {
    pub name: String,
    /// The delegate type.
    pub return_type: TypeRef,
    /// `false` when the marker named the delegate type explicitly.
    pub inferred: bool,
}

/// Decide the accessor's name and return type for `target`.
pub fn derive_accessor(
    target: &AnnotatedTarget,
    set: &ResolvedMethodSet,
    relations: &TypeRelations<'_>,
) -> Result<AccessorSpec, GenerationError> {
    let usage = |message: String| GenerationError::usage(&target.name, &target.location, message);
    let name = target.options.accessor.clone();

    // Default methods are inherited too, even when they are not forwarded.
    let inherited = set
        .visited
        .iter()
        .filter_map(|ty| relations.table().get(ty.declared_name()?))
        .flat_map(|decl| decl.methods.iter().map(move |m| (decl, m)))
        .find(|(_, m)| m.kind.is_inherited() && m.name == name && m.params.is_empty());
    if let Some((owner, _)) = inherited {
        return Err(usage(format!(
            "accessor `{name}()` collides with the method of the same name inherited from `{}`; choose another accessor name",
            owner.name
        )));
    }

    let scope = TypeScope::of(&target.type_params);
    let mut required: Vec<&TypeRef> = Vec::new();
    for method in set.iter() {
        if !required.contains(&&method.origin_type) {
            required.push(&method.origin_type);
        }
    }
    if required.is_empty() {
        required = target.interfaces.iter().collect();
    }

    if let Some(declared) = &target.options.delegate_type {
        let must_satisfy = target.interfaces.iter().chain(required.iter().copied());
        for needed in must_satisfy {
            if !relations.is_subtype(declared, needed, &scope) {
                return Err(usage(format!(
                    "delegate type `{declared}` is not assignable to `{needed}`"
                )));
            }
        }
        return Ok(AccessorSpec {
            name,
            return_type: declared.clone(),
            inferred: false,
        });
    }

    let mut candidates: Vec<&TypeRef> = Vec::new();
    for ty in target.interfaces.iter().chain(set.visited.iter()) {
        if !candidates.contains(&ty) {
            candidates.push(ty);
        }
    }
    let qualifying: Vec<&TypeRef> = candidates
        .into_iter()
        .filter(|c| required.iter().all(|r| relations.is_subtype(c, r, &scope)))
        .collect();
    let narrowest: Vec<&TypeRef> = qualifying
        .iter()
        .copied()
        .filter(|c| {
            !qualifying
                .iter()
                .any(|other| other != c && relations.is_subtype(other, c, &scope))
        })
        .collect();

    match narrowest.as_slice() {
        [only] => {
            tracing::trace!(type_name = %target.name, delegate = %only, "inferred delegate type");
            Ok(AccessorSpec {
                name,
                return_type: (*only).clone(),
                inferred: true,
            })
        }
        [] => Err(usage(format!(
            "no single interface covers every delegated method (needs {}); set `delegate_type` on the marker",
            required
                .iter()
                .map(|r| format!("`{r}`"))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        several => Err(usage(format!(
            "delegate type is ambiguous between {}; set `delegate_type` on the marker",
            several
                .iter()
                .map(|r| format!("`{r}`"))
                .collect::<Vec<_>>()
                .join(" and ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorSettings;
    use crate::resolver::Resolver;
    use crate::scanner::scan;
    use crate::signature::{MethodKind, MethodSignature};
    use crate::symbols::{MarkerOptions, SymbolTable, TypeDecl};

    fn ty(name: &str) -> TypeRef {
        TypeRef::declared(name)
    }

    fn table_with(target: TypeDecl) -> SymbolTable {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.Reader").with_method(MethodSignature::new("read", TypeRef::Void)));
        table.upsert(TypeDecl::interface("x.Writer").with_method(MethodSignature::new("write", TypeRef::Void)));
        table.upsert(
            TypeDecl::interface("x.Channel")
                .implementing(ty("x.Reader"))
                .implementing(ty("x.Writer")),
        );
        table.upsert(target);
        table
    }

    fn derive(table: &SymbolTable) -> Result<AccessorSpec, GenerationError> {
        let target = scan(table).targets.remove(0);
        let resolver = Resolver::new(table, &GeneratorSettings::default());
        let set = resolver.resolve(&target).unwrap();
        derive_accessor(&target, &set, &resolver.relations())
    }

    #[test]
    fn infers_the_listed_interface() {
        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Reader"))
                .marked(MarkerOptions::default()),
        );
        let spec = derive(&table).unwrap();
        assert_eq!(spec.return_type, ty("x.Reader"));
        assert_eq!(spec.name, "delegate");
        assert!(spec.inferred);
    }

    #[test]
    fn infers_a_combining_interface() {
        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Channel"))
                .marked(MarkerOptions::default()),
        );
        assert_eq!(derive(&table).unwrap().return_type, ty("x.Channel"));
    }

    #[test]
    fn unrelated_interfaces_need_an_explicit_type() {
        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Reader"))
                .implementing(ty("x.Writer"))
                .marked(MarkerOptions::default()),
        );
        let err = derive(&table).unwrap_err();
        assert!(err.message().contains("set `delegate_type`"));

        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Reader"))
                .implementing(ty("x.Writer"))
                .marked(MarkerOptions {
                    delegate_type: Some(ty("x.Channel")),
                    ..MarkerOptions::default()
                }),
        );
        let spec = derive(&table).unwrap();
        assert_eq!(spec.return_type, ty("x.Channel"));
        assert!(!spec.inferred);
    }

    #[test]
    fn declared_type_must_cover_the_interfaces() {
        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Channel"))
                .marked(MarkerOptions {
                    delegate_type: Some(ty("x.Reader")),
                    ..MarkerOptions::default()
                }),
        );
        let err = derive(&table).unwrap_err();
        assert_eq!(err.message(), "delegate type `x.Reader` is not assignable to `x.Channel`");
    }

    #[test]
    fn accessor_name_must_not_shadow_a_method() {
        let table = table_with(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Reader"))
                .marked(MarkerOptions {
                    accessor: "read".into(),
                    ..MarkerOptions::default()
                }),
        );
        assert!(derive(&table).unwrap_err().message().contains("collides"));
    }

    #[test]
    fn accessor_name_must_not_shadow_a_default_method() {
        let mut table = SymbolTable::new();
        table.upsert(
            TypeDecl::interface("x.Reader")
                .with_method(MethodSignature::new("read", TypeRef::Void))
                .with_method(MethodSignature::new("delegate", ty("x.Reader")).with_kind(MethodKind::Default)),
        );
        table.upsert(
            TypeDecl::class("x.Impl")
                .implementing(ty("x.Reader"))
                .marked(MarkerOptions::default()),
        );
        let err = derive(&table).unwrap_err();
        assert_eq!(err.kind(), crate::diagnostics::DiagnosticKind::UsageError);
        assert_eq!(
            err.message(),
            "accessor `delegate()` collides with the method of the same name inherited from `x.Reader`; choose another accessor name"
        );
    }
}
