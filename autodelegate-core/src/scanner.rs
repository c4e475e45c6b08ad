//! Discovery: find marked declarations and the interfaces they delegate.

use std::collections::HashSet;

use crate::diagnostics::GenerationError;
use crate::emitter::java;
use crate::symbols::{DeclKind, MarkerOptions, SourceLocation, SymbolTable, TypeDecl, Visibility};
use crate::types::{TypeParam, TypeRef};

/// Options controlling what gets generated for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub force_override_defaults: bool,
    pub include_root_methods: bool,
    pub delegate_type: Option<TypeRef>,
    pub accessor: String,
}

impl From<&MarkerOptions> for GenerationOptions {
    fn from(marker: &MarkerOptions) -> Self {
        Self {
            force_override_defaults: marker.force_override_defaults,
            include_root_methods: marker.include_root_methods,
            delegate_type: marker.delegate_type.clone(),
            accessor: marker.accessor.clone(),
        }
    }
}

/// A marked declaration, ready for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedTarget {
    pub name: String,
    pub package: String,
    /// Name relative to the package (`Outer.Inner` for nested types).
    pub simple_name: String,
    pub kind: DeclKind,
    pub visibility: Visibility,
    pub type_params: Vec<TypeParam>,
    pub interfaces: Vec<TypeRef>,
    pub options: GenerationOptions,
    pub location: SourceLocation,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub targets: Vec<AnnotatedTarget>,
    pub failures: Vec<GenerationError>,
}

/// Collect every marked declaration of `table`, sorted by qualified name.
pub fn scan(table: &SymbolTable) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for decl in table.marked() {
        match inspect(decl) {
            Ok(target) => outcome.targets.push(target),
            Err(err) => outcome.failures.push(err),
        }
    }
    tracing::debug!(
        targets = outcome.targets.len(),
        failures = outcome.failures.len(),
        "scan finished"
    );
    outcome
}

fn inspect(decl: &TypeDecl) -> Result<AnnotatedTarget, GenerationError> {
    let fail = |message: String| GenerationError::usage(&decl.name, &decl.location, message);
    let Some(marker) = decl.marker.as_ref() else {
        return Err(fail("declaration is not marked for auto-delegation".into()));
    };

    match decl.kind {
        DeclKind::Class | DeclKind::AbstractClass | DeclKind::Interface => {}
        other => {
            return Err(fail(format!(
                "auto-delegation cannot be applied to {} `{}`; it needs a class or an interface",
                match other {
                    DeclKind::Enum => "an enum",
                    DeclKind::Record => "a record",
                    _ => "an annotation type",
                },
                decl.name
            )))
        }
    }

    let explicit = !marker.interfaces.is_empty();
    let interfaces = if explicit {
        marker.interfaces.clone()
    } else {
        decl.interfaces.clone()
    };
    if interfaces.is_empty() {
        return Err(fail(format!(
            "nothing to delegate: `{}` lists no interfaces and implements none",
            decl.name
        )));
    }

    let mut seen = HashSet::new();
    for ty in &interfaces {
        let name = ty.declared_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(fail(format!("`{ty}` cannot be a delegation interface")));
        }
        if !seen.insert(name.clone()) {
            return Err(fail(format!("interface `{name}` is listed more than once")));
        }
    }

    if !java::is_identifier(&marker.accessor) {
        return Err(fail(format!(
            "`{}` is not a valid accessor name",
            marker.accessor
        )));
    }
    if java::is_object_method(&marker.accessor) {
        return Err(fail(format!(
            "accessor `{}()` would redeclare the `java.lang.Object` method of the same name",
            marker.accessor
        )));
    }

    Ok(AnnotatedTarget {
        name: decl.name.clone(),
        package: decl.package.clone(),
        simple_name: decl.simple_name().to_string(),
        kind: decl.kind,
        visibility: decl.visibility,
        type_params: decl.type_params.clone(),
        interfaces,
        options: GenerationOptions::from(marker),
        location: decl.location.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn marked(decl: TypeDecl) -> TypeDecl {
        decl.marked(MarkerOptions::default())
    }

    #[test]
    fn derives_direct_interfaces_only() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("x.Base"));
        table.upsert(TypeDecl::interface("x.Reader").implementing(TypeRef::declared("x.Base")));
        table.upsert(marked(
            TypeDecl::class("x.Service").implementing(TypeRef::declared("x.Reader")),
        ));
        let outcome = scan(&table);
        assert!(outcome.failures.is_empty());
        let target = &outcome.targets[0];
        assert_eq!(target.interfaces, vec![TypeRef::declared("x.Reader")]);
        assert_eq!(target.simple_name, "Service");
    }

    #[test]
    fn explicit_list_wins() {
        let mut table = SymbolTable::new();
        let options = MarkerOptions {
            interfaces: vec![TypeRef::declared("x.Writer")],
            ..MarkerOptions::default()
        };
        table.upsert(
            TypeDecl::class("x.Service")
                .implementing(TypeRef::declared("x.Reader"))
                .marked(options),
        );
        let target = &scan(&table).targets[0];
        assert_eq!(target.interfaces, vec![TypeRef::declared("x.Writer")]);
    }

    #[test]
    fn rejected_declarations_do_not_stop_the_scan() {
        let mut table = SymbolTable::new();
        table.upsert(marked(TypeDecl::new(DeclKind::Enum, "x.Color")));
        table.upsert(marked(TypeDecl::class("x.Empty")));
        table.upsert(marked(
            TypeDecl::class("x.Twice")
                .implementing(TypeRef::declared("x.A"))
                .implementing(TypeRef::declared("x.A")),
        ));
        table.upsert(
            TypeDecl::class("x.BadAccessor")
                .implementing(TypeRef::declared("x.A"))
                .marked(MarkerOptions {
                    accessor: "class".into(),
                    ..MarkerOptions::default()
                }),
        );
        table.upsert(marked(TypeDecl::class("x.Fine").implementing(TypeRef::declared("x.A"))));

        let outcome = scan(&table);
        assert_eq!(outcome.targets.len(), 1);
        assert_eq!(outcome.targets[0].name, "x.Fine");
        assert_eq!(outcome.failures.len(), 4);
        assert!(outcome
            .failures
            .iter()
            .all(|f| f.kind() == DiagnosticKind::UsageError));
        let messages: Vec<_> = outcome.failures.iter().map(|f| f.message().to_string()).collect();
        assert!(messages[0].contains("not a valid accessor name"));
        assert!(messages[1].contains("an enum"));
        assert!(messages[2].starts_with("nothing to delegate"));
        assert!(messages[3].contains("listed more than once"));
    }

    #[test]
    fn accessor_may_not_reuse_an_object_method_name() {
        for accessor in ["toString", "hashCode", "getClass"] {
            let mut table = SymbolTable::new();
            table.upsert(
                TypeDecl::class("x.Impl")
                    .implementing(TypeRef::declared("x.Reader"))
                    .marked(MarkerOptions {
                        accessor: accessor.into(),
                        ..MarkerOptions::default()
                    }),
            );
            let outcome = scan(&table);
            assert!(outcome.targets.is_empty());
            let failure = &outcome.failures[0];
            assert_eq!(failure.kind(), DiagnosticKind::UsageError);
            assert_eq!(
                failure.message(),
                format!("accessor `{accessor}()` would redeclare the `java.lang.Object` method of the same name")
            );
        }
    }
}
