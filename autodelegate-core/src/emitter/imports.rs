use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::symbols::SymbolTable;
use crate::types::{TypeParam, TypeRef, Wildcard};

const JAVA_LANG: &str = "java.lang";

/// Decides, for one compilation unit, how each referenced type is spelled
/// and which import lines are needed.
///
/// `java.lang` and same-package types are written by their simple name.
/// Other types are imported when their simple name is unambiguous within
/// the unit, and written fully qualified otherwise.
#[derive(Debug)]
pub struct ImportSet {
    /// Qualified name to the spelling used in the unit.
    spellings: BTreeMap<String, String>,
    imports: BTreeSet<String>,
}

/// Where a qualified name splits into package and package-relative name.
fn split<'a>(qualified: &'a str, table: &SymbolTable) -> (&'a str, &'a str) {
    if let Some(decl) = table.get(qualified) {
        if let Some(relative) = qualified
            .strip_prefix(decl.package.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        {
            return (&qualified[..decl.package.len()], relative);
        }
        if decl.package.is_empty() {
            return ("", qualified);
        }
    }
    // Undeclared: the package is the run of lowercase leading segments.
    let mut offset = 0;
    for segment in qualified.split('.') {
        if segment.chars().next().is_some_and(|c| c.is_uppercase()) {
            break;
        }
        offset += segment.len() + 1;
    }
    if offset == 0 {
        return ("", qualified);
    }
    if offset > qualified.len() {
        // No uppercase segment at all; treat the last one as the type.
        return match qualified.rsplit_once('.') {
            Some((package, simple)) => (package, simple),
            None => ("", qualified),
        };
    }
    (&qualified[..offset - 1], &qualified[offset..])
}

impl ImportSet {
    /// `used` holds every qualified type name the unit mentions; `reserved`
    /// holds simple names already taken inside the unit (type variables and
    /// the generated class itself).
    pub fn build(
        package: &str,
        used: &BTreeSet<String>,
        reserved: &HashSet<String>,
        table: &SymbolTable,
    ) -> Self {
        struct Entry<'a> {
            qualified: &'a str,
            package: &'a str,
            relative: &'a str,
            top: &'a str,
        }

        let entries: Vec<Entry> = used
            .iter()
            .map(|qualified| {
                let qualified = qualified.as_str();
                let (pkg, relative) = split(qualified, table);
                let top = relative.split('.').next().unwrap_or(relative);
                Entry {
                    qualified,
                    package: pkg,
                    relative,
                    top,
                }
            })
            .collect();

        // Distinct top-level types per simple name.
        let mut claims: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for entry in &entries {
            let top_qualified = if entry.package.is_empty() {
                entry.top.to_string()
            } else {
                format!("{}.{}", entry.package, entry.top)
            };
            claims.entry(entry.top).or_default().insert(top_qualified);
        }

        let mut spellings = BTreeMap::new();
        let mut imports = BTreeSet::new();
        for entry in &entries {
            let ambiguous = claims.get(entry.top).is_some_and(|owners| owners.len() > 1)
                || reserved.contains(entry.top);
            let same_package = entry.package == package;
            let shadowed_by_package = !same_package
                && !package.is_empty()
                && table.contains(&format!("{package}.{}", entry.top));

            let spelling = if ambiguous {
                entry.qualified.to_string()
            } else if same_package {
                entry.relative.to_string()
            } else if entry.package == JAVA_LANG {
                if shadowed_by_package {
                    entry.qualified.to_string()
                } else {
                    entry.relative.to_string()
                }
            } else if entry.package.is_empty() {
                // Types in the unnamed package cannot be imported.
                entry.qualified.to_string()
            } else {
                imports.insert(format!("{}.{}", entry.package, entry.top));
                entry.relative.to_string()
            };
            spellings.insert(entry.qualified.to_string(), spelling);
        }

        Self { spellings, imports }
    }

    /// Spelling for a qualified name; unknown names are returned unchanged.
    pub fn name<'a>(&'a self, qualified: &'a str) -> &'a str {
        self.spellings.get(qualified).map(String::as_str).unwrap_or(qualified)
    }

    /// Render a type using the unit's spellings.
    pub fn render(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Declared { name, args } => {
                let mut out = self.name(name).to_string();
                if !args.is_empty() {
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&self.render(arg));
                    }
                    out.push('>');
                }
                out
            }
            TypeRef::Array(element) => format!("{}[]", self.render(element)),
            TypeRef::Wildcard(Wildcard::Extends(bound)) => format!("? extends {}", self.render(bound)),
            TypeRef::Wildcard(Wildcard::Super(bound)) => format!("? super {}", self.render(bound)),
            other => other.to_string(),
        }
    }

    pub fn render_param(&self, param: &TypeParam) -> String {
        let mut out = param.name.clone();
        for (i, bound) in param.bounds.iter().enumerate() {
            out.push_str(if i == 0 { " extends " } else { " & " });
            out.push_str(&self.render(bound));
        }
        out
    }

    /// Import lines, sorted.
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::TypeDecl;

    fn used(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn lang_and_same_package_need_no_import() {
        let table = SymbolTable::new();
        let set = ImportSet::build(
            "com.example",
            &used(&["java.lang.String", "com.example.Store", "java.util.List"]),
            &HashSet::new(),
            &table,
        );
        assert_eq!(set.name("java.lang.String"), "String");
        assert_eq!(set.name("com.example.Store"), "Store");
        assert_eq!(set.name("java.util.List"), "List");
        assert_eq!(set.imports().collect::<Vec<_>>(), ["java.util.List"]);
    }

    #[test]
    fn clashing_simple_names_stay_qualified() {
        let table = SymbolTable::new();
        let set = ImportSet::build(
            "com.example",
            &used(&["java.util.List", "java.awt.List", "java.util.Map"]),
            &HashSet::new(),
            &table,
        );
        assert_eq!(set.name("java.util.List"), "java.util.List");
        assert_eq!(set.name("java.awt.List"), "java.awt.List");
        assert_eq!(set.imports().collect::<Vec<_>>(), ["java.util.Map"]);
    }

    #[test]
    fn type_variables_reserve_simple_names() {
        let table = SymbolTable::new();
        let reserved: HashSet<String> = ["T".to_string()].into();
        let set = ImportSet::build("a", &used(&["b.T"]), &reserved, &table);
        assert_eq!(set.name("b.T"), "b.T");
    }

    #[test]
    fn nested_types_import_their_outer_type() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::interface("com.lib.Outer.Inner").in_package("com.lib"));
        let set = ImportSet::build("com.example", &used(&["com.lib.Outer.Inner"]), &HashSet::new(), &table);
        assert_eq!(set.name("com.lib.Outer.Inner"), "Outer.Inner");
        assert_eq!(set.imports().collect::<Vec<_>>(), ["com.lib.Outer"]);
    }

    #[test]
    fn package_type_shadows_java_lang() {
        let mut table = SymbolTable::new();
        table.upsert(TypeDecl::class("com.example.Error"));
        let set = ImportSet::build("com.example", &used(&["java.lang.Error"]), &HashSet::new(), &table);
        assert_eq!(set.name("java.lang.Error"), "java.lang.Error");
    }

    #[test]
    fn render_uses_spellings() {
        let table = SymbolTable::new();
        let set = ImportSet::build(
            "a",
            &used(&["java.util.Map", "java.lang.String", "java.util.List"]),
            &HashSet::new(),
            &table,
        );
        let ty = TypeRef::generic(
            "java.util.Map",
            vec![
                TypeRef::declared("java.lang.String"),
                TypeRef::generic(
                    "java.util.List",
                    vec![TypeRef::Wildcard(Wildcard::Extends(Box::new(TypeRef::var("V"))))],
                ),
            ],
        );
        assert_eq!(set.render(&ty), "Map<String, List<? extends V>>");
    }
}
