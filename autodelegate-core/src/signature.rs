//! Method signatures and the identity used to deduplicate them across
//! supertypes.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Substitution, TypeParam, TypeRef, TypeScope};

/// How an interface member is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    #[default]
    Abstract,
    /// Has a body in the declaring interface.
    Default,
    Static,
    Private,
}

impl MethodKind {
    /// Static and private interface methods are not inherited by implementors.
    pub fn is_inherited(self) -> bool {
        matches!(self, MethodKind::Abstract | MethodKind::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
}

/// A method as declared by an interface (or, after resolution, as chosen for
/// a generated unit).
///
/// When `varargs` is set the last parameter's type is the array type, as in
/// `Object... args` being `Object[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Parameter>,
    pub return_type: TypeRef,
    pub throws: Vec<TypeRef>,
    pub varargs: bool,
    pub kind: MethodKind,
}

impl MethodSignature {
    /// An abstract method with no parameters.
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            throws: Vec::new(),
            varargs: false,
            kind: MethodKind::Abstract,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            ty,
        });
        self
    }

    /// Append a variadic parameter; `element` is the type before the `...`.
    pub fn with_vararg(mut self, name: impl Into<String>, element: TypeRef) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            ty: TypeRef::array(element),
        });
        self.varargs = true;
        self
    }

    pub fn with_throws(mut self, ty: TypeRef) -> Self {
        self.throws.push(ty);
        self
    }

    pub fn with_type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    /// Deduplication key: name plus erased parameter types, erased in the
    /// scope of `class_params` and this method's own type parameters.
    pub fn identity(&self, class_params: &[TypeParam]) -> SignatureIdentity {
        let scope = TypeScope::of(class_params).with(&self.type_params);
        SignatureIdentity {
            name: self.name.clone(),
            params: self
                .params
                .iter()
                .map(|p| p.ty.erasure(&scope).to_string())
                .collect(),
        }
    }

    /// Type variables mentioned by the signature that it does not declare.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for param in &self.type_params {
            param.bounds.iter().for_each(|b| b.collect_vars(&mut vars));
        }
        self.params.iter().for_each(|p| p.ty.collect_vars(&mut vars));
        self.return_type.collect_vars(&mut vars);
        self.throws.iter().for_each(|t| t.collect_vars(&mut vars));
        for param in &self.type_params {
            vars.remove(&param.name);
        }
        vars
    }

    /// Apply class-level bindings.
    ///
    /// The method's own type parameters shadow `subst`, and any of them whose
    /// name would capture a variable introduced by `subst` is renamed first.
    pub fn substitute(&self, subst: &Substitution) -> Self {
        if subst.is_empty() {
            return self.clone();
        }
        let own: BTreeSet<&str> = self.type_params.iter().map(|p| p.name.as_str()).collect();
        let mut combined: Substitution = subst
            .iter()
            .filter(|(name, _)| !own.contains(name.as_str()))
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();

        let mut introduced = BTreeSet::new();
        combined.values().for_each(|ty| ty.collect_vars(&mut introduced));
        let mut taken = introduced.clone();
        taken.extend(own.iter().map(|name| name.to_string()));

        let mut names = Vec::with_capacity(self.type_params.len());
        for param in &self.type_params {
            if introduced.contains(&param.name) {
                let fresh = fresh_name(&param.name, &taken);
                taken.insert(fresh.clone());
                combined.insert(param.name.clone(), TypeRef::var(fresh.clone()));
                names.push(fresh);
            } else {
                names.push(param.name.clone());
            }
        }

        self.rebuild(names, &combined)
    }

    /// Rename this method's type parameters positionally to `names`.
    ///
    /// Returns an unchanged copy when the arity differs or a new name would
    /// capture a free variable of the signature.
    pub fn rename_type_params(&self, names: &[String]) -> Self {
        if names.len() != self.type_params.len() {
            return self.clone();
        }
        let free = self.free_vars();
        if names.iter().any(|name| free.contains(name)) {
            return self.clone();
        }
        let renames: Substitution = self
            .type_params
            .iter()
            .zip(names)
            .map(|(param, name)| (param.name.clone(), TypeRef::var(name.clone())))
            .collect();
        self.rebuild(names.to_vec(), &renames)
    }

    fn rebuild(&self, names: Vec<String>, subst: &Substitution) -> Self {
        Self {
            name: self.name.clone(),
            type_params: self
                .type_params
                .iter()
                .zip(names)
                .map(|(param, name)| TypeParam {
                    name,
                    bounds: param.bounds.iter().map(|b| b.substitute(subst)).collect(),
                })
                .collect(),
            params: self
                .params
                .iter()
                .map(|p| Parameter {
                    name: p.name.clone(),
                    ty: p.ty.substitute(subst),
                })
                .collect(),
            return_type: self.return_type.substitute(subst),
            throws: self.throws.iter().map(|t| t.substitute(subst)).collect(),
            varargs: self.varargs,
            kind: self.kind,
        }
    }
}

fn fresh_name(base: &str, taken: &BTreeSet<String>) -> String {
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            f.write_str("<")?;
            for (i, param) in self.type_params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{param}")?;
            }
            f.write_str("> ")?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match (&param.ty, self.varargs && i == last) {
                (TypeRef::Array(element), true) => write!(f, "{element}... {}", param.name)?,
                (ty, _) => write!(f, "{ty} {}", param.name)?,
            }
        }
        f.write_str(")")?;
        for (i, thrown) in self.throws.iter().enumerate() {
            f.write_str(if i == 0 { " throws " } else { ", " })?;
            write!(f, "{thrown}")?;
        }
        Ok(())
    }
}

// ── SignatureIdentity ───────────────────────────────────────────────────────

/// `(name, erased parameter types)`; the key under which occurrences from
/// different supertypes are merged. Ordering is the canonical emission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureIdentity {
    pub name: String,
    pub params: Vec<String>,
}

impl fmt::Display for SignatureIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> TypeRef {
        TypeRef::declared("java.lang.String")
    }

    #[test]
    fn identity_erases_generics() {
        let class_params = vec![TypeParam::new("E")];
        let add_all = MethodSignature::new("addAll", TypeRef::Primitive(crate::types::Primitive::Boolean))
            .with_param(
                "c",
                TypeRef::generic("java.util.Collection", vec![TypeRef::var("E")]),
            );
        assert_eq!(
            add_all.identity(&class_params).to_string(),
            "addAll(java.util.Collection)"
        );
    }

    #[test]
    fn varargs_and_array_share_identity() {
        let a = MethodSignature::new("log", TypeRef::Void).with_vararg("args", TypeRef::object());
        let b = MethodSignature::new("log", TypeRef::Void)
            .with_param("values", TypeRef::array(TypeRef::object()));
        assert_eq!(a.identity(&[]), b.identity(&[]));
        assert_eq!(a.to_string(), "void log(java.lang.Object... args)");
    }

    #[test]
    fn substitution_is_shadowed_by_method_params() {
        let method = MethodSignature::new("map", TypeRef::var("T"))
            .with_type_param(TypeParam::new("T"))
            .with_param("value", TypeRef::var("E"));
        let subst = Substitution::from([
            ("E".to_string(), string()),
            ("T".to_string(), TypeRef::declared("java.lang.Integer")),
        ]);
        let out = method.substitute(&subst);
        assert_eq!(out.return_type, TypeRef::var("T"));
        assert_eq!(out.params[0].ty, string());
    }

    #[test]
    fn substitution_avoids_capture() {
        // interface Box<E> { <T> T convert(E value); } referenced as Box<T>
        let method = MethodSignature::new("convert", TypeRef::var("T"))
            .with_type_param(TypeParam::new("T"))
            .with_param("value", TypeRef::var("E"));
        let subst = Substitution::from([("E".to_string(), TypeRef::var("T"))]);
        let out = method.substitute(&subst);
        assert_eq!(out.type_params[0].name, "T1");
        assert_eq!(out.return_type, TypeRef::var("T1"));
        assert_eq!(out.params[0].ty, TypeRef::var("T"));
    }

    #[test]
    fn rename_type_params_positionally() {
        let method = MethodSignature::new("toArray", TypeRef::array(TypeRef::var("A")))
            .with_type_param(TypeParam::new("A"))
            .with_param("a", TypeRef::array(TypeRef::var("A")));
        let renamed = method.rename_type_params(&["T".to_string()]);
        assert_eq!(renamed.to_string(), "<T> T[] toArray(T[] a)");
    }

    #[test]
    fn rename_refuses_to_capture() {
        let method = MethodSignature::new("pick", TypeRef::var("A"))
            .with_type_param(TypeParam::new("A"))
            .with_param("other", TypeRef::var("T"));
        let renamed = method.rename_type_params(&["T".to_string()]);
        assert_eq!(renamed, method);
    }
}
