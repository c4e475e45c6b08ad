//! Code emission: a resolved method set plus an accessor become one
//! generated compilation unit.
//!
//! Rendering happens entirely in memory. The unit is only returned once the
//! text passed a structural check, so hosts never see a partial unit.

mod imports;
pub mod java;

use std::collections::{BTreeSet, HashSet};

pub use imports::ImportSet;

use crate::accessor::AccessorSpec;
use crate::config::GeneratorSettings;
use crate::diagnostics::GenerationError;
use crate::resolver::ResolvedMethodSet;
use crate::scanner::AnnotatedTarget;
use crate::signature::{MethodKind, MethodSignature, Parameter, SignatureIdentity};
use crate::symbols::{DeclKind, SourceLocation, SymbolTable, TypeDecl, Visibility};
use crate::types::{TypeParam, TypeRef, TypeScope};

/// Appended to the target's name to form the generated class name.
pub const GENERATED_SUFFIX: &str = "_AutoDelegate";

const GENERATED_ANNOTATION: &str = "javax.annotation.processing.Generated";
const GENERATOR_NAME: &str = "autodelegate";

/// `Store` → `Store_AutoDelegate`, `Outer.Inner` → `Outer_Inner_AutoDelegate`.
pub fn generated_name(simple_name: &str) -> String {
    format!("{}{GENERATED_SUFFIX}", simple_name.replace('.', "_"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingMethod {
    pub identity: SignatureIdentity,
    /// As emitted, with parameter names normalised.
    pub signature: MethodSignature,
    pub origin: String,
}

/// One generated compilation unit. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub package: String,
    pub class_name: String,
    pub type_params: Vec<TypeParam>,
    pub interfaces: Vec<TypeRef>,
    pub accessor: AccessorSpec,
    pub methods: Vec<ForwardingMethod>,
    pub source: String,
    /// Qualified name of the target this unit was generated for.
    pub origin: String,
    pub visibility: Visibility,
    pub location: SourceLocation,
}

impl GeneratedUnit {
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.package, self.class_name)
        }
    }

    /// `<package dirs>/<ClassName>.java`.
    pub fn relative_path(&self) -> String {
        if self.package.is_empty() {
            format!("{}.java", self.class_name)
        } else {
            format!("{}/{}.java", self.package.replace('.', "/"), self.class_name)
        }
    }

    /// The generated class as a declaration, so later rounds can see it.
    pub fn as_declaration(&self) -> TypeDecl {
        let accessor = MethodSignature::new(self.accessor.name.clone(), self.accessor.return_type.clone());
        let mut decl = TypeDecl::new(DeclKind::AbstractClass, self.qualified_name())
            .in_package(self.package.clone())
            .at(SourceLocation::new(self.relative_path(), 0));
        decl.visibility = self.visibility;
        decl.type_params = self.type_params.clone();
        decl.interfaces = self.interfaces.clone();
        decl.methods = std::iter::once(accessor)
            .chain(self.methods.iter().map(|m| m.signature.clone().with_kind(MethodKind::Default)))
            .collect();
        decl.generated_for = Some(self.origin.clone());
        decl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitterOptions {
    /// Spaces per indentation level.
    pub indent: usize,
    /// Whether to annotate the class with `@Generated`.
    pub generated_annotation: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            generated_annotation: true,
        }
    }
}

impl From<&GeneratorSettings> for EmitterOptions {
    fn from(settings: &GeneratorSettings) -> Self {
        Self {
            indent: settings.indent,
            generated_annotation: settings.generated_annotation,
        }
    }
}

pub struct Emitter<'t> {
    table: &'t SymbolTable,
    options: EmitterOptions,
}

impl<'t> Emitter<'t> {
    pub fn new(table: &'t SymbolTable, options: EmitterOptions) -> Self {
        Self { table, options }
    }

    pub fn emit(
        &self,
        target: &AnnotatedTarget,
        set: &ResolvedMethodSet,
        accessor: &AccessorSpec,
    ) -> Result<GeneratedUnit, GenerationError> {
        let class_name = generated_name(&target.simple_name);
        let unsupported =
            |message: String| GenerationError::unsupported(&target.name, &target.location, message);

        let class_scope = TypeScope::of(&target.type_params);
        check_vars_in_scope(&accessor.return_type, &class_scope)
            .map_err(|var| unsupported(format!("delegate type mentions type variable `{var}`, which is not in scope")))?;

        let mut methods = Vec::with_capacity(set.len());
        for resolved in set.iter() {
            let signature = validate(&resolved.signature, &class_scope).map_err(|why| {
                unsupported(format!(
                    "cannot forward `{}` from `{}`: {why}",
                    resolved.identity, resolved.origin
                ))
            })?;
            methods.push(ForwardingMethod {
                identity: resolved.identity.clone(),
                signature,
                origin: resolved.origin.clone(),
            });
        }

        let imports = self.imports_for(target, &class_name, accessor, &methods);
        let source = self.render(target, &class_name, accessor, &methods, &imports);
        java::balanced_delimiters(&source).map_err(|why| {
            GenerationError::internal(
                &target.name,
                &target.location,
                format!("generated source for `{class_name}` is malformed: {why}"),
            )
        })?;

        tracing::debug!(
            type_name = %target.name,
            class = %class_name,
            methods = methods.len(),
            "emitted unit"
        );
        Ok(GeneratedUnit {
            package: target.package.clone(),
            class_name,
            type_params: target.type_params.clone(),
            interfaces: target.interfaces.clone(),
            accessor: accessor.clone(),
            methods,
            source,
            origin: target.name.clone(),
            visibility: target.visibility,
            location: target.location.clone(),
        })
    }

    fn imports_for(
        &self,
        target: &AnnotatedTarget,
        class_name: &str,
        accessor: &AccessorSpec,
        methods: &[ForwardingMethod],
    ) -> ImportSet {
        let mut used = BTreeSet::new();
        let mut note = |ty: &TypeRef| ty.visit_declared(&mut |name: &str| {
            used.insert(name.to_string());
        });
        target.type_params.iter().flat_map(|p| &p.bounds).for_each(&mut note);
        target.interfaces.iter().for_each(&mut note);
        note(&accessor.return_type);
        for method in methods {
            let sig = &method.signature;
            sig.type_params.iter().flat_map(|p| &p.bounds).for_each(&mut note);
            sig.params.iter().for_each(|p| note(&p.ty));
            note(&sig.return_type);
            sig.throws.iter().for_each(&mut note);
        }
        if self.options.generated_annotation {
            used.insert(GENERATED_ANNOTATION.to_string());
        }

        let mut reserved: HashSet<String> = target.type_params.iter().map(|p| p.name.clone()).collect();
        reserved.extend(
            methods
                .iter()
                .flat_map(|m| m.signature.type_params.iter().map(|p| p.name.clone())),
        );
        reserved.insert(class_name.to_string());
        ImportSet::build(&target.package, &used, &reserved, self.table)
    }

    fn render(
        &self,
        target: &AnnotatedTarget,
        class_name: &str,
        accessor: &AccessorSpec,
        methods: &[ForwardingMethod],
        imports: &ImportSet,
    ) -> String {
        let mut out = SourceWriter::new(self.options.indent);
        out.line(0, &format!("// Generated by {GENERATOR_NAME} from {}. Do not edit.", target.name));
        if !target.package.is_empty() {
            out.line(0, &format!("package {};", target.package));
            out.blank();
        }
        let mut any_import = false;
        for import in imports.imports() {
            out.line(0, &format!("import {import};"));
            any_import = true;
        }
        if any_import {
            out.blank();
        }

        if self.options.generated_annotation {
            out.line(
                0,
                &format!("@{}(\"{GENERATOR_NAME}\")", imports.name(GENERATED_ANNOTATION)),
            );
        }
        let mut header = String::new();
        if target.visibility == Visibility::Public {
            header.push_str("public ");
        }
        header.push_str("abstract class ");
        header.push_str(class_name);
        header.push_str(&type_params(&target.type_params, imports));
        let implemented: Vec<String> = target.interfaces.iter().map(|ty| imports.render(ty)).collect();
        if !implemented.is_empty() {
            header.push_str(" implements ");
            header.push_str(&implemented.join(", "));
        }
        header.push_str(" {");
        out.line(0, &header);

        out.line(
            1,
            &format!(
                "protected abstract {} {}();",
                imports.render(&accessor.return_type),
                accessor.name
            ),
        );

        for method in methods {
            out.blank();
            self.render_method(&mut out, &accessor.name, &method.signature, imports);
        }
        out.line(0, "}");
        out.finish()
    }

    fn render_method(
        &self,
        out: &mut SourceWriter,
        accessor: &str,
        sig: &MethodSignature,
        imports: &ImportSet,
    ) {
        let last = sig.params.len().saturating_sub(1);
        let params: Vec<String> = sig
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| match (&p.ty, sig.varargs && i == last) {
                (TypeRef::Array(element), true) => format!("{}... {}", imports.render(element), p.name),
                (ty, _) => format!("{} {}", imports.render(ty), p.name),
            })
            .collect();
        let mut decl = String::from("public ");
        let generics = type_params(&sig.type_params, imports);
        if !generics.is_empty() {
            decl.push_str(&generics);
            decl.push(' ');
        }
        decl.push_str(&format!(
            "{} {}({})",
            imports.render(&sig.return_type),
            sig.name,
            params.join(", ")
        ));
        if !sig.throws.is_empty() {
            let thrown: Vec<String> = sig.throws.iter().map(|t| imports.render(t)).collect();
            decl.push_str(" throws ");
            decl.push_str(&thrown.join(", "));
        }
        decl.push_str(" {");

        let args: Vec<&str> = sig.params.iter().map(|p| p.name.as_str()).collect();
        let call = format!("{accessor}().{}({});", sig.name, args.join(", "));

        out.line(1, "@Override");
        out.line(1, &decl);
        if sig.return_type.is_void() {
            out.line(2, &call);
        } else {
            out.line(2, &format!("return {call}"));
        }
        out.line(1, "}");
    }
}

/// `<K, V extends Comparable<V>>`, or empty.
fn type_params(params: &[TypeParam], imports: &ImportSet) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params.iter().map(|p| imports.render_param(p)).collect();
    format!("<{}>", rendered.join(", "))
}

/// Reject shapes that cannot be forwarded faithfully, and normalise
/// parameter names.
fn validate(sig: &MethodSignature, class_scope: &TypeScope<'_>) -> Result<MethodSignature, String> {
    if !java::is_identifier(&sig.name) {
        return Err(format!("`{}` is not a valid method name", sig.name));
    }
    if sig.varargs && !matches!(sig.params.last(), Some(Parameter { ty: TypeRef::Array(_), .. })) {
        return Err("varargs method whose last parameter is not an array".into());
    }
    if sig.return_type.is_wildcard() {
        return Err("wildcard return type".into());
    }
    for param in &sig.params {
        if param.ty.is_void() {
            return Err(format!("parameter `{}` has type void", param.name));
        }
        if param.ty.is_wildcard() {
            return Err(format!("parameter `{}` has a wildcard type", param.name));
        }
    }
    let scope = class_scope.with(&sig.type_params);
    let mentioned = sig
        .type_params
        .iter()
        .flat_map(|p| &p.bounds)
        .chain(sig.params.iter().map(|p| &p.ty))
        .chain(std::iter::once(&sig.return_type))
        .chain(&sig.throws);
    for ty in mentioned {
        check_vars_in_scope(ty, &scope)
            .map_err(|var| format!("type variable `{var}` is not in scope of the generated class"))?;
    }

    let mut normalised = sig.clone();
    let mut taken: HashSet<String> = HashSet::new();
    for (i, param) in normalised.params.iter_mut().enumerate() {
        let usable = java::is_identifier(&param.name) && !taken.contains(&param.name);
        if !usable {
            let mut candidate = format!("arg{i}");
            let mut bump = 0;
            while taken.contains(&candidate) || sig.params.iter().any(|p| p.name == candidate) {
                bump += 1;
                candidate = format!("arg{i}_{bump}");
            }
            param.name = candidate;
        }
        taken.insert(param.name.clone());
    }
    Ok(normalised)
}

fn check_vars_in_scope(ty: &TypeRef, scope: &TypeScope<'_>) -> Result<(), String> {
    let mut vars = BTreeSet::new();
    ty.collect_vars(&mut vars);
    match vars.into_iter().find(|var| !scope.contains(var)) {
        Some(var) => Err(var),
        None => Ok(()),
    }
}

/// Line-oriented buffer with fixed-width indentation.
struct SourceWriter {
    indent: usize,
    buf: String,
}

impl SourceWriter {
    fn new(indent: usize) -> Self {
        Self {
            indent,
            buf: String::new(),
        }
    }

    fn line(&mut self, level: usize, text: &str) {
        for _ in 0..level * self.indent {
            self.buf.push(' ');
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn finish(self) -> String {
        self.buf
    }
}
