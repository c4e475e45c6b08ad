//! Subtyping over the symbol table.

use crate::symbols::SymbolTable;
use crate::types::{Substitution, TypeRef, TypeScope, Wildcard};

const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
const ERROR: &str = "java.lang.Error";

/// Recursion limit for pathological hierarchies and F-bounds.
const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy)]
pub struct TypeRelations<'t> {
    table: &'t SymbolTable,
}

impl<'t> TypeRelations<'t> {
    pub fn new(table: &'t SymbolTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t SymbolTable {
        self.table
    }

    /// `sub <: sup`, with type variables resolved through `scope`.
    ///
    /// Undeclared types are only related to themselves and to `Object`.
    pub fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef, scope: &TypeScope<'_>) -> bool {
        self.subtype(sub, sup, scope, 0)
    }

    fn subtype(&self, sub: &TypeRef, sup: &TypeRef, scope: &TypeScope<'_>, depth: usize) -> bool {
        if sub == sup {
            return true;
        }
        if depth > MAX_DEPTH {
            return false;
        }
        if sup.is_object() {
            return sub.is_reference() && !sub.is_wildcard();
        }
        match (sub, sup) {
            (TypeRef::Void | TypeRef::Primitive(_), _) | (_, TypeRef::Void | TypeRef::Primitive(_)) => {
                false
            }
            (TypeRef::Var(name), _) => match scope.lookup(name) {
                Some(param) => param
                    .bounds
                    .iter()
                    .any(|bound| self.subtype(bound, sup, scope, depth + 1)),
                None => false,
            },
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                if a.is_reference() && b.is_reference() {
                    self.subtype(a, b, scope, depth + 1)
                } else {
                    a == b
                }
            }
            (TypeRef::Array(_), TypeRef::Declared { name, args }) => {
                args.is_empty() && matches!(name.as_str(), "java.lang.Cloneable" | "java.io.Serializable")
            }
            (TypeRef::Wildcard(Wildcard::Extends(bound)), _) => self.subtype(bound, sup, scope, depth + 1),
            (TypeRef::Declared { .. }, TypeRef::Declared { name, args }) => {
                match self.supertype_named(sub, name, depth) {
                    Some(found) => {
                        let found_args = match &found {
                            TypeRef::Declared { args, .. } => args.as_slice(),
                            _ => &[],
                        };
                        args.is_empty()
                            || (found_args.len() == args.len()
                                && found_args
                                    .iter()
                                    .zip(args)
                                    .all(|(have, want)| self.contains(want, have, scope, depth + 1)))
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Find `name` among the (reflexive, transitive) supertypes of `ty`,
    /// with `ty`'s arguments substituted along the way.
    fn supertype_named(&self, ty: &TypeRef, name: &str, depth: usize) -> Option<TypeRef> {
        let TypeRef::Declared { name: own, args } = ty else {
            return None;
        };
        if own == name {
            return Some(ty.clone());
        }
        if depth > MAX_DEPTH {
            return None;
        }
        let decl = self.table.get(own)?;
        let raw = args.len() != decl.type_params.len();
        let subst: Substitution = decl
            .type_params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect();
        decl.direct_supertypes()
            .iter()
            .map(|sup| match sup {
                // Supertypes of a raw type are raw as well.
                TypeRef::Declared { name, .. } if raw => TypeRef::declared(name.clone()),
                other => other.substitute(&subst),
            })
            .find_map(|sup| self.supertype_named(&sup, name, depth + 1))
    }

    /// Type-argument containment: does `outer` contain `inner`?
    fn contains(&self, outer: &TypeRef, inner: &TypeRef, scope: &TypeScope<'_>, depth: usize) -> bool {
        match outer {
            TypeRef::Wildcard(Wildcard::Unbounded) => true,
            TypeRef::Wildcard(Wildcard::Extends(bound)) => match inner {
                TypeRef::Wildcard(Wildcard::Extends(inner)) => self.subtype(inner, bound, scope, depth),
                TypeRef::Wildcard(Wildcard::Unbounded) => bound.is_object(),
                TypeRef::Wildcard(Wildcard::Super(_)) => bound.is_object(),
                plain => self.subtype(plain, bound, scope, depth),
            },
            TypeRef::Wildcard(Wildcard::Super(bound)) => match inner {
                TypeRef::Wildcard(Wildcard::Super(inner)) => self.subtype(bound, inner, scope, depth),
                TypeRef::Wildcard(_) => false,
                plain => self.subtype(bound, plain, scope, depth),
            },
            plain => plain == inner,
        }
    }

    /// Subtypes of `RuntimeException` and `Error` need not be declared.
    pub fn is_unchecked(&self, ty: &TypeRef, scope: &TypeScope<'_>) -> bool {
        self.is_subtype(ty, &TypeRef::declared(RUNTIME_EXCEPTION), scope)
            || self.is_subtype(ty, &TypeRef::declared(ERROR), scope)
    }

    /// The checked members of a `throws` clause, in declaration order.
    pub fn checked<'a>(&self, throws: &'a [TypeRef], scope: &TypeScope<'_>) -> Vec<&'a TypeRef> {
        throws.iter().filter(|ty| !self.is_unchecked(ty, scope)).collect()
    }

    /// Every checked exception in `thrown` is a subtype of something in
    /// `allowed`.
    pub fn covers(&self, allowed: &[TypeRef], thrown: &[TypeRef], scope: &TypeScope<'_>) -> bool {
        self.checked(thrown, scope).into_iter().all(|ty| {
            allowed
                .iter()
                .any(|permitted| self.is_subtype(ty, permitted, scope))
        })
    }
}
