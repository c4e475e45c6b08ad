//! Declaration files: the YAML (or JSON) description of the types visible to
//! a pass, and their conversion into [`TypeDecl`]s.
//!
//! Type expressions in a file use Java spelling and may use simple names.
//! Names are qualified in two passes: first every type the file declares is
//! registered, then each reference is resolved against type variables,
//! imports, the package, and `java.lang`.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::signature::{MethodKind, MethodSignature};
use crate::symbols::{
    is_java_lang, DeclKind, MarkerOptions, SourceLocation, SymbolError, SymbolTable, TypeDecl,
    Visibility, DEFAULT_ACCESSOR,
};
use crate::types::{TypeParam, TypeParseError, TypeRef, Wildcard};

// ── File model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

/// One compilation unit: a package, its imports and the types it declares.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    #[serde(default)]
    pub package: String,
    /// Source path reported in diagnostics; defaults to the declaration file.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeSpec {
    /// Package-relative; nested types use `Outer.Inner`.
    pub name: String,
    pub kind: DeclKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub auto_delegate: Option<MarkerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default = "void")]
    pub returns: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub throws: Vec<String>,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub type_params: Vec<String>,
}

fn void() -> String {
    "void".to_string()
}

/// `"Type name"` or `{ name, type }`. A type ending in `...` is variadic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Text(String),
    Named {
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
}

impl ParamSpec {
    /// Split into (type text, name). The name is empty when omitted.
    fn parts(&self) -> (String, String) {
        match self {
            ParamSpec::Named { name, ty } => (ty.trim().to_string(), name.trim().to_string()),
            ParamSpec::Text(text) => {
                let text = text.trim();
                match text.rsplit_once(char::is_whitespace) {
                    Some((ty, name)) if is_plain_identifier(name) && !ty.trim_end().ends_with(',') => {
                        (ty.trim().to_string(), name.to_string())
                    }
                    _ => (text.to_string(), String::new()),
                }
            }
        }
    }
}

fn is_plain_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// The `auto_delegate` marker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerSpec {
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub force_override_defaults: bool,
    #[serde(default)]
    pub include_root_methods: bool,
    #[serde(default)]
    pub delegate_type: Option<String>,
    #[serde(default)]
    pub accessor: Option<String>,
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum DeclarationError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        file: String,
        source: serde_yaml::Error,
    },
    Type {
        location: SourceLocation,
        source: TypeParseError,
    },
    Invalid {
        location: SourceLocation,
        message: String,
    },
    Symbol(SymbolError),
}

impl fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationError::Io { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            DeclarationError::Parse { file, source } => {
                write!(f, "{file}: malformed declaration file: {source}")
            }
            DeclarationError::Type { location, source } => write!(f, "{location}: {source}"),
            DeclarationError::Invalid { location, message } => write!(f, "{location}: {message}"),
            DeclarationError::Symbol(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DeclarationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeclarationError::Io { source, .. } => Some(source),
            DeclarationError::Parse { source, .. } => Some(source),
            DeclarationError::Type { source, .. } => Some(source),
            DeclarationError::Invalid { .. } => None,
            DeclarationError::Symbol(err) => Some(err),
        }
    }
}

impl From<SymbolError> for DeclarationError {
    fn from(err: SymbolError) -> Self {
        DeclarationError::Symbol(err)
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Parse a declaration file. `file` is only used in error messages.
pub fn parse_declarations(source: &str, file: &str) -> Result<DeclarationFile, DeclarationError> {
    serde_yaml::from_str(source).map_err(|source| DeclarationError::Parse {
        file: file.to_string(),
        source,
    })
}

pub fn load_file(path: &Path) -> Result<DeclarationFile, DeclarationError> {
    let source = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_declarations(&source, &path.display().to_string())
}

/// Resolve every type in `file` and add it to `table`.
///
/// Either every declaration is added or none is. Platform types preloaded
/// by [`SymbolTable::new`] may be redeclared; any other duplicate is an
/// error. Returns the qualified names added, in file order.
pub fn load_into(
    table: &mut SymbolTable,
    file: &DeclarationFile,
    source_name: &str,
) -> Result<Vec<String>, DeclarationError> {
    let mut declared = HashSet::new();
    for unit in &file.units {
        for spec in &unit.types {
            declared.insert(qualify_in(&unit.package, &spec.name));
        }
    }

    let mut decls = Vec::new();
    for unit in &file.units {
        let resolver = NameResolver {
            table: &*table,
            declared: &declared,
            package: &unit.package,
            imports: &unit.imports,
        };
        let path = unit.path.as_deref().unwrap_or(source_name);
        for spec in &unit.types {
            decls.push(resolver.type_decl(spec, path)?);
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for decl in &decls {
        let duplicate_in_file = !seen.insert(decl.name.as_str());
        let existing = table
            .get(&decl.name)
            .filter(|existing| existing.location != SourceLocation::builtin());
        if let Some(first) = existing {
            return Err(SymbolError::Duplicate {
                name: decl.name.clone(),
                first: first.location.clone(),
                second: decl.location.clone(),
            }
            .into());
        }
        if duplicate_in_file {
            let first = decls
                .iter()
                .find(|d| d.name == decl.name)
                .map(|d| d.location.clone())
                .unwrap_or_default();
            return Err(SymbolError::Duplicate {
                name: decl.name.clone(),
                first,
                second: decl.location.clone(),
            }
            .into());
        }
    }

    let names: Vec<String> = decls.iter().map(|d| d.name.clone()).collect();
    for decl in decls {
        table.upsert(decl);
    }
    tracing::debug!(file = %source_name, types = names.len(), "loaded declarations");
    Ok(names)
}

fn qualify_in(package: &str, relative: &str) -> String {
    if package.is_empty() {
        relative.to_string()
    } else {
        format!("{package}.{relative}")
    }
}

// ── Name resolution ─────────────────────────────────────────────────────────

struct NameResolver<'a> {
    table: &'a SymbolTable,
    /// Qualified names declared by the file being loaded.
    declared: &'a HashSet<String>,
    package: &'a str,
    imports: &'a [String],
}

impl NameResolver<'_> {
    fn known(&self, qualified: &str) -> bool {
        self.declared.contains(qualified) || self.table.contains(qualified)
    }

    /// Qualify a name as written in the file.
    fn qualify(&self, written: &str) -> String {
        let (head, rest) = match written.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (written, None),
        };
        let with_rest = |base: &str| match rest {
            Some(rest) => format!("{base}.{rest}"),
            None => base.to_string(),
        };

        // `java.util.List`: already qualified.
        if rest.is_some() && head.chars().next().is_some_and(|c| c.is_lowercase()) {
            return written.to_string();
        }
        for import in self.imports.iter().filter(|i| !i.ends_with(".*")) {
            if import.rsplit('.').next() == Some(head) {
                return with_rest(import);
            }
        }
        for import in self.imports {
            if let Some(package) = import.strip_suffix(".*") {
                let candidate = format!("{package}.{written}");
                if self.known(&candidate) {
                    return candidate;
                }
            }
        }
        let local = qualify_in(self.package, written);
        if self.known(&local) {
            return local;
        }
        if rest.is_none() && (is_java_lang(head) || self.table.contains(&format!("java.lang.{head}"))) {
            return format!("java.lang.{head}");
        }
        local
    }

    /// Replace parsed names with qualified names or type variables.
    fn resolve(&self, ty: TypeRef, vars: &HashSet<&str>) -> TypeRef {
        match ty {
            TypeRef::Declared { name, args } if args.is_empty() && vars.contains(name.as_str()) => {
                TypeRef::Var(name)
            }
            TypeRef::Declared { name, args } => TypeRef::Declared {
                name: self.qualify(&name),
                args: args.into_iter().map(|arg| self.resolve(arg, vars)).collect(),
            },
            TypeRef::Array(element) => TypeRef::array(self.resolve(*element, vars)),
            TypeRef::Wildcard(Wildcard::Extends(bound)) => {
                TypeRef::Wildcard(Wildcard::Extends(Box::new(self.resolve(*bound, vars))))
            }
            TypeRef::Wildcard(Wildcard::Super(bound)) => {
                TypeRef::Wildcard(Wildcard::Super(Box::new(self.resolve(*bound, vars))))
            }
            other => other,
        }
    }

    fn parse_type(
        &self,
        text: &str,
        vars: &HashSet<&str>,
        location: &SourceLocation,
    ) -> Result<TypeRef, DeclarationError> {
        let parsed = TypeRef::parse(text).map_err(|source| DeclarationError::Type {
            location: location.clone(),
            source,
        })?;
        Ok(self.resolve(parsed, vars))
    }

    fn type_params(
        &self,
        texts: &[String],
        outer: &HashSet<&str>,
        location: &SourceLocation,
    ) -> Result<Vec<TypeParam>, DeclarationError> {
        let parsed = texts
            .iter()
            .map(|text| {
                TypeParam::parse(text).map_err(|source| DeclarationError::Type {
                    location: location.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        // Bounds may mention any parameter of the same list.
        let mut vars = outer.clone();
        vars.extend(parsed.iter().map(|p| p.name.as_str()));
        Ok(parsed
            .iter()
            .map(|param| TypeParam {
                name: param.name.clone(),
                bounds: param.bounds.iter().map(|b| self.resolve(b.clone(), &vars)).collect(),
            })
            .collect())
    }

    fn type_decl(&self, spec: &TypeSpec, path: &str) -> Result<TypeDecl, DeclarationError> {
        let location = SourceLocation::new(path, spec.line);
        let invalid = |message: String| DeclarationError::Invalid {
            location: location.clone(),
            message,
        };
        if spec.name.is_empty() || !spec.name.split('.').all(is_plain_identifier) {
            return Err(invalid(format!("`{}` is not a valid type name", spec.name)));
        }

        let type_params = self.type_params(&spec.type_params, &HashSet::new(), &location)?;
        let vars: HashSet<&str> = type_params.iter().map(|p| p.name.as_str()).collect();
        let supertypes = |texts: &[String]| {
            texts
                .iter()
                .map(|text| self.parse_type(text, &vars, &location))
                .collect::<Result<Vec<_>, _>>()
        };

        let mut decl = TypeDecl::new(spec.kind, qualify_in(self.package, &spec.name))
            .in_package(self.package)
            .at(location.clone());
        decl.visibility = spec.visibility;
        if spec.kind.is_interface() {
            if !spec.implements.is_empty() {
                return Err(invalid(format!(
                    "interface `{}` cannot implement; list superinterfaces under `extends`",
                    spec.name
                )));
            }
            decl.interfaces = supertypes(&spec.extends)?;
        } else {
            let mut extends = supertypes(&spec.extends)?;
            if extends.len() > 1 {
                return Err(invalid(format!(
                    "{} `{}` can extend at most one class",
                    spec.kind.label(),
                    spec.name
                )));
            }
            decl.superclass = extends.pop();
            decl.interfaces = supertypes(&spec.implements)?;
        }

        for method in &spec.methods {
            decl.methods.push(self.method(method, &vars, &location)?);
        }
        if let Some(marker) = &spec.auto_delegate {
            decl.marker = Some(MarkerOptions {
                interfaces: supertypes(&marker.interfaces)?,
                force_override_defaults: marker.force_override_defaults,
                include_root_methods: marker.include_root_methods,
                delegate_type: marker
                    .delegate_type
                    .as_deref()
                    .map(|text| self.parse_type(text, &vars, &location))
                    .transpose()?,
                accessor: marker.accessor.clone().unwrap_or_else(|| DEFAULT_ACCESSOR.to_string()),
            });
        }
        decl.type_params = type_params;
        Ok(decl)
    }

    fn method(
        &self,
        spec: &MethodSpec,
        outer: &HashSet<&str>,
        location: &SourceLocation,
    ) -> Result<MethodSignature, DeclarationError> {
        let type_params = self.type_params(&spec.type_params, outer, location)?;
        let mut vars = outer.clone();
        vars.extend(type_params.iter().map(|p| p.name.as_str()));

        let mut method = MethodSignature::new(
            spec.name.clone(),
            self.parse_type(&spec.returns, &vars, location)?,
        )
        .with_kind(spec.kind);
        let last = spec.params.len().saturating_sub(1);
        for (i, param) in spec.params.iter().enumerate() {
            let (ty, name) = param.parts();
            match ty.strip_suffix("...") {
                Some(element) if i == last => {
                    let element = self.parse_type(element, &vars, location)?;
                    method = method.with_vararg(name, element);
                }
                Some(_) => {
                    return Err(DeclarationError::Invalid {
                        location: location.clone(),
                        message: format!(
                            "method `{}`: only the last parameter may be variadic",
                            spec.name
                        ),
                    })
                }
                None => {
                    method = method.with_param(name, self.parse_type(&ty, &vars, location)?);
                }
            }
        }
        for thrown in &spec.throws {
            method = method.with_throws(self.parse_type(thrown, &vars, location)?);
        }
        method.type_params = type_params;
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"
units:
  - package: com.example
    path: src/com/example/Store.java
    imports: [java.util.List, "java.util.concurrent.*"]
    types:
      - name: Store
        kind: interface
        type_params: ["K", "V extends Comparable<V>"]
        line: 3
        methods:
          - name: get
            returns: V
            params: ["K key"]
            throws: [java.io.IOException]
          - name: all
            returns: List<V>
          - name: putAll
            params: ["Map<K, V> entries", { name: rest, type: "V..." }]
          - name: describe
            returns: String
            kind: default
      - name: Cache
        kind: class
        implements: [Store<String, Integer>]
        line: 20
        auto_delegate: { accessor: backing }
"#;

    fn load(source: &str) -> Result<SymbolTable, DeclarationError> {
        let mut table = SymbolTable::new();
        let file = parse_declarations(source, "store.yaml")?;
        load_into(&mut table, &file, "store.yaml")?;
        Ok(table)
    }

    #[test]
    fn resolves_names_and_variables() {
        let table = load(STORE).unwrap();
        let store = table.get("com.example.Store").unwrap();
        assert!(store.kind.is_interface());
        assert_eq!(store.location.to_string(), "src/com/example/Store.java:3");
        assert_eq!(store.type_params[1].to_string(), "V extends java.lang.Comparable<V>");

        let get = &store.methods[0];
        assert_eq!(get.return_type, TypeRef::var("V"));
        assert_eq!(get.params[0].name, "key");
        assert_eq!(get.throws, [TypeRef::declared("java.io.IOException")]);

        assert_eq!(
            store.methods[1].return_type,
            TypeRef::generic("java.util.List", vec![TypeRef::var("V")])
        );

        let put_all = &store.methods[2];
        assert!(put_all.varargs);
        // `Map` is not imported and not known, so it falls back to the package.
        assert_eq!(put_all.params[0].ty.declared_name(), Some("com.example.Map"));
        assert_eq!(put_all.params[1].ty, TypeRef::array(TypeRef::var("V")));
        assert_eq!(store.methods[3].kind, MethodKind::Default);
    }

    #[test]
    fn markers_and_same_file_references() {
        let table = load(STORE).unwrap();
        let cache = table.get("com.example.Cache").unwrap();
        let marker = cache.marker.as_ref().unwrap();
        assert_eq!(marker.accessor, "backing");
        assert!(marker.interfaces.is_empty());
        assert_eq!(
            cache.interfaces,
            [TypeRef::generic(
                "com.example.Store",
                vec![TypeRef::declared("java.lang.String"), TypeRef::declared("java.lang.Integer")],
            )]
        );
    }

    #[test]
    fn wildcard_imports_only_match_known_types() {
        let source = r#"
units:
  - package: app
    imports: ["lib.*"]
    types:
      - name: Uses
        kind: interface
        methods:
          - { name: a, returns: Thing }
          - { name: b, returns: Other }
  - package: lib
    types:
      - { name: Thing, kind: interface }
"#;
        let table = load(source).unwrap();
        let uses = table.get("app.Uses").unwrap();
        assert_eq!(uses.methods[0].return_type.declared_name(), Some("lib.Thing"));
        assert_eq!(uses.methods[1].return_type.declared_name(), Some("app.Other"));
    }

    #[test]
    fn json_is_accepted() {
        let source = r#"{"units": [{"package": "j", "types": [{"name": "Run", "kind": "interface",
            "methods": [{"name": "run"}]}]}]}"#;
        let table = load(source).unwrap();
        assert_eq!(table.get("j.Run").unwrap().methods[0].return_type, TypeRef::Void);
    }

    #[test]
    fn varargs_must_be_last() {
        let source = r#"
units:
  - types:
      - name: Bad
        kind: interface
        methods:
          - { name: f, params: ["int... xs", "int y"] }
"#;
        let err = load(source).unwrap_err();
        assert!(err.to_string().contains("only the last parameter may be variadic"));
    }

    #[test]
    fn duplicates_are_rejected_atomically() {
        let mut table = SymbolTable::new();
        let first = parse_declarations("units: [{package: p, types: [{name: A, kind: interface}]}]", "a.yaml").unwrap();
        load_into(&mut table, &first, "a.yaml").unwrap();
        let second = parse_declarations(
            "units: [{package: p, types: [{name: B, kind: interface}, {name: A, kind: interface}]}]",
            "b.yaml",
        )
        .unwrap();
        let err = load_into(&mut table, &second, "b.yaml").unwrap_err();
        assert!(matches!(err, DeclarationError::Symbol(SymbolError::Duplicate { ref name, .. }) if name == "p.A"));
        assert!(!table.contains("p.B"));
    }

    #[test]
    fn platform_types_may_be_redeclared() {
        let source = "units: [{package: java.lang, types: [{name: Runnable, kind: interface, methods: [{name: run}]}]}]";
        let table = load(source).unwrap();
        assert_eq!(table.get("java.lang.Runnable").unwrap().location.file, "store.yaml");
    }

    #[test]
    fn unknown_fields_and_bad_types_are_reported() {
        assert!(matches!(
            parse_declarations("units: [{package: p, typez: []}]", "x.yaml").unwrap_err(),
            DeclarationError::Parse { .. }
        ));
        let err = load("units: [{types: [{name: I, kind: interface, methods: [{name: f, returns: 'List<'}]}]}]")
            .unwrap_err();
        assert!(matches!(err, DeclarationError::Type { .. }));
    }

    #[test]
    fn classes_extend_at_most_once() {
        let err = load("units: [{types: [{name: C, kind: class, extends: [A, B]}]}]").unwrap_err();
        assert_eq!(err.to_string(), "store.yaml: class `C` can extend at most one class");
    }
}
