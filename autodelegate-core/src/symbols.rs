//! The in-memory symbol table: every type declaration visible to a pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signature::MethodSignature;
use crate::types::{TypeParam, TypeRef, OBJECT};

/// Accessor name used when a marker does not set one.
pub const DEFAULT_ACCESSOR: &str = "delegate";

/// Simple names that resolve to `java.lang` without an import.
pub const JAVA_LANG: &[&str] = &[
    "AutoCloseable",
    "Boolean",
    "Byte",
    "CharSequence",
    "Character",
    "Class",
    "CloneNotSupportedException",
    "Cloneable",
    "Comparable",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "IllegalArgumentException",
    "IllegalStateException",
    "IndexOutOfBoundsException",
    "Integer",
    "InterruptedException",
    "Iterable",
    "Long",
    "NullPointerException",
    "Number",
    "Object",
    "Runnable",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

pub fn is_java_lang(simple: &str) -> bool {
    JAVA_LANG.contains(&simple)
}

// ── SourceLocation ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: 0,
        }
    }

    pub fn builtin() -> Self {
        Self::new("<builtin>", 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file)?;
        if self.line > 0 {
            write!(f, ":{}", self.line)?;
            if self.column > 0 {
                write!(f, ":{}", self.column)?;
            }
        }
        Ok(())
    }
}

// ── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    Interface,
    Class,
    AbstractClass,
    Enum,
    Record,
    Annotation,
}

impl DeclKind {
    pub fn is_interface(self) -> bool {
        self == DeclKind::Interface
    }

    pub fn label(self) -> &'static str {
        match self {
            DeclKind::Interface => "interface",
            DeclKind::Class => "class",
            DeclKind::AbstractClass => "abstract class",
            DeclKind::Enum => "enum",
            DeclKind::Record => "record",
            DeclKind::Annotation => "annotation type",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Package,
}

/// Options attached to a declaration by the auto-delegation marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOptions {
    /// Explicit delegation interfaces; empty means "derive from the
    /// declaration's direct superinterfaces".
    pub interfaces: Vec<TypeRef>,
    pub force_override_defaults: bool,
    pub include_root_methods: bool,
    pub delegate_type: Option<TypeRef>,
    pub accessor: String,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            force_override_defaults: false,
            include_root_methods: false,
            delegate_type: None,
            accessor: DEFAULT_ACCESSOR.to_string(),
        }
    }
}

/// A type declaration. `name` is fully qualified; for nested types the part
/// after `package` contains dots (`Outer.Inner`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub package: String,
    pub kind: DeclKind,
    pub visibility: Visibility,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeRef>,
    /// Superinterfaces (`extends` of an interface, `implements` of a class).
    pub interfaces: Vec<TypeRef>,
    pub methods: Vec<MethodSignature>,
    pub marker: Option<MarkerOptions>,
    pub location: SourceLocation,
    /// Set on declarations produced by the generator: the target they were
    /// generated for.
    pub generated_for: Option<String>,
}

impl TypeDecl {
    /// A declaration whose package is everything before the last dot.
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let package = name.rsplit_once('.').map(|(p, _)| p.to_string()).unwrap_or_default();
        Self {
            name,
            package,
            kind,
            visibility: Visibility::Public,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            marker: None,
            location: SourceLocation::default(),
            generated_for: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(DeclKind::Interface, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(DeclKind::Class, name)
    }

    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn extending(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implementing(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    pub fn marked(mut self, options: MarkerOptions) -> Self {
        self.marker = Some(options);
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Name relative to the package: `Outer.Inner` for a nested type.
    pub fn simple_name(&self) -> &str {
        if self.package.is_empty() {
            return &self.name;
        }
        self.name
            .strip_prefix(&self.package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.name)
    }

    /// All direct supertypes: the superclass (or `Object` for classes), then
    /// the superinterfaces.
    pub fn direct_supertypes(&self) -> Vec<TypeRef> {
        let mut out = Vec::with_capacity(self.interfaces.len() + 1);
        match &self.superclass {
            Some(superclass) => out.push(superclass.clone()),
            None if self.name != OBJECT => out.push(TypeRef::object()),
            None => {}
        }
        out.extend(self.interfaces.iter().cloned());
        out
    }
}

// ── SymbolTable ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    Duplicate {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::Duplicate {
                name,
                first,
                second,
            } => write!(
                f,
                "type `{name}` is declared twice ({first} and {second})"
            ),
        }
    }
}

impl std::error::Error for SymbolError {}

/// Declarations keyed by qualified name. Iteration is in name order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    types: BTreeMap<String, TypeDecl>,
}

impl SymbolTable {
    /// An empty table, without even `java.lang.Object`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table preloaded with the platform types the generator reasons about:
    /// the root type, the exception hierarchy and a few common interfaces.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for decl in builtins() {
            table.types.insert(decl.name.clone(), decl);
        }
        table
    }

    pub fn insert(&mut self, decl: TypeDecl) -> Result<(), SymbolError> {
        if let Some(existing) = self.types.get(&decl.name) {
            return Err(SymbolError::Duplicate {
                name: decl.name.clone(),
                first: existing.location.clone(),
                second: decl.location.clone(),
            });
        }
        self.types.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Insert or replace; used when generated declarations are fed back.
    pub fn upsert(&mut self, decl: TypeDecl) {
        self.types.insert(decl.name.clone(), decl);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.get(name).is_some_and(|decl| decl.kind.is_interface())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    /// Declarations carrying the auto-delegation marker, in name order.
    pub fn marked(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values().filter(|decl| decl.marker.is_some())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn builtin(kind: DeclKind, name: &str) -> TypeDecl {
    TypeDecl::new(kind, name).at(SourceLocation::builtin())
}

fn builtins() -> Vec<TypeDecl> {
    use crate::signature::MethodSignature as M;
    use crate::types::Primitive;

    let class = |name: &str, superclass: &str| {
        builtin(DeclKind::Class, name).extending(TypeRef::declared(superclass))
    };
    let comparable_of = |name: &str| TypeRef::generic("java.lang.Comparable", vec![TypeRef::declared(name)]);

    vec![
        builtin(DeclKind::Class, OBJECT),
        builtin(DeclKind::Interface, "java.lang.CharSequence")
            .with_method(M::new("length", TypeRef::Primitive(Primitive::Int))),
        builtin(DeclKind::Interface, "java.lang.Comparable")
            .with_type_param(TypeParam::new("T"))
            .with_method(
                M::new("compareTo", TypeRef::Primitive(Primitive::Int)).with_param("o", TypeRef::var("T")),
            ),
        builtin(DeclKind::Interface, "java.lang.Runnable").with_method(M::new("run", TypeRef::Void)),
        builtin(DeclKind::Interface, "java.lang.AutoCloseable").with_method(
            M::new("close", TypeRef::Void).with_throws(TypeRef::declared("java.lang.Exception")),
        ),
        builtin(DeclKind::Interface, "java.io.Closeable")
            .implementing(TypeRef::declared("java.lang.AutoCloseable"))
            .with_method(
                M::new("close", TypeRef::Void).with_throws(TypeRef::declared("java.io.IOException")),
            ),
        class("java.lang.String", OBJECT)
            .implementing(TypeRef::declared("java.lang.CharSequence"))
            .implementing(comparable_of("java.lang.String")),
        class("java.lang.Number", OBJECT),
        class("java.lang.Integer", "java.lang.Number").implementing(comparable_of("java.lang.Integer")),
        class("java.lang.Long", "java.lang.Number").implementing(comparable_of("java.lang.Long")),
        class("java.lang.Throwable", OBJECT),
        class("java.lang.Exception", "java.lang.Throwable"),
        class("java.lang.Error", "java.lang.Throwable"),
        class("java.lang.RuntimeException", "java.lang.Exception"),
        class("java.lang.InterruptedException", "java.lang.Exception"),
        class("java.lang.CloneNotSupportedException", "java.lang.Exception"),
        class("java.lang.IllegalArgumentException", "java.lang.RuntimeException"),
        class("java.lang.IllegalStateException", "java.lang.RuntimeException"),
        class("java.lang.UnsupportedOperationException", "java.lang.RuntimeException"),
        class("java.lang.NullPointerException", "java.lang.RuntimeException"),
        class("java.io.IOException", "java.lang.Exception"),
        class("java.io.FileNotFoundException", "java.io.IOException"),
        class("java.io.UncheckedIOException", "java.lang.RuntimeException"),
    ]
}
