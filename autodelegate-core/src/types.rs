//! Type model shared by every stage: type references, generic parameters,
//! substitution, erasure and the textual type syntax used by declaration
//! files.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Qualified name of the universal root type.
pub const OBJECT: &str = "java.lang.Object";

/// Guards erasure against cyclic bounds such as `T extends U, U extends T`.
const MAX_BOUND_DEPTH: usize = 32;

// ── Primitive ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "boolean" => Some(Primitive::Boolean),
            "byte" => Some(Primitive::Byte),
            "short" => Some(Primitive::Short),
            "char" => Some(Primitive::Char),
            "int" => Some(Primitive::Int),
            "long" => Some(Primitive::Long),
            "float" => Some(Primitive::Float),
            "double" => Some(Primitive::Double),
            _ => None,
        }
    }
}

// ── TypeRef ─────────────────────────────────────────────────────────────────

/// Bound of a wildcard type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Wildcard {
    /// `?`
    Unbounded,
    /// `? extends T`
    Extends(Box<TypeRef>),
    /// `? super T`
    Super(Box<TypeRef>),
}

/// A reference to a type as it appears in a signature.
///
/// Declared names are fully qualified once a declaration file has been
/// loaded (`java.util.List`, `com.example.Outer.Inner`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    Primitive(Primitive),
    Declared { name: String, args: Vec<TypeRef> },
    Var(String),
    Array(Box<TypeRef>),
    Wildcard(Wildcard),
}

/// Type-variable bindings, keyed by variable name.
pub type Substitution = HashMap<String, TypeRef>;

impl TypeRef {
    pub fn declared(name: impl Into<String>) -> Self {
        TypeRef::Declared {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Declared {
            name: name.into(),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var(name.into())
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn object() -> Self {
        TypeRef::declared(OBJECT)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    /// Whether values of this type are object references.
    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeRef::Void | TypeRef::Primitive(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeRef::Declared { name, args } if name == OBJECT && args.is_empty())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypeRef::Wildcard(_))
    }

    /// The qualified name of a declared type, `None` for anything else.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            TypeRef::Declared { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Replace type variables according to `subst`.
    pub fn substitute(&self, subst: &Substitution) -> TypeRef {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Var(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Declared { name, args } => TypeRef::Declared {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(subst)).collect(),
            },
            TypeRef::Array(element) => TypeRef::array(element.substitute(subst)),
            TypeRef::Wildcard(Wildcard::Extends(bound)) => {
                TypeRef::Wildcard(Wildcard::Extends(Box::new(bound.substitute(subst))))
            }
            TypeRef::Wildcard(Wildcard::Super(bound)) => {
                TypeRef::Wildcard(Wildcard::Super(Box::new(bound.substitute(subst))))
            }
            other => other.clone(),
        }
    }

    /// Erase generics: declared types lose their arguments, type variables
    /// become the erasure of their first bound (or `Object`).
    pub fn erasure(&self, scope: &TypeScope<'_>) -> TypeRef {
        self.erase_with(scope, 0)
    }

    fn erase_with(&self, scope: &TypeScope<'_>, depth: usize) -> TypeRef {
        match self {
            TypeRef::Declared { name, .. } => TypeRef::declared(name.clone()),
            TypeRef::Var(name) => {
                if depth > MAX_BOUND_DEPTH {
                    return TypeRef::object();
                }
                match scope.lookup(name).and_then(|param| param.bounds.first()) {
                    Some(bound) => bound.erase_with(scope, depth + 1),
                    None => TypeRef::object(),
                }
            }
            TypeRef::Array(element) => TypeRef::array(element.erase_with(scope, depth)),
            TypeRef::Wildcard(Wildcard::Extends(bound)) => bound.erase_with(scope, depth),
            TypeRef::Wildcard(_) => TypeRef::object(),
            other => other.clone(),
        }
    }

    /// Collect the names of every type variable mentioned.
    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeRef::Var(name) => {
                out.insert(name.clone());
            }
            TypeRef::Declared { args, .. } => args.iter().for_each(|arg| arg.collect_vars(out)),
            TypeRef::Array(element) => element.collect_vars(out),
            TypeRef::Wildcard(Wildcard::Extends(bound) | Wildcard::Super(bound)) => {
                bound.collect_vars(out)
            }
            _ => {}
        }
    }

    /// Visit every declared type name, outermost first.
    pub fn visit_declared(&self, f: &mut impl FnMut(&str)) {
        match self {
            TypeRef::Declared { name, args } => {
                f(name);
                args.iter().for_each(|arg| arg.visit_declared(f));
            }
            TypeRef::Array(element) => element.visit_declared(f),
            TypeRef::Wildcard(Wildcard::Extends(bound) | Wildcard::Super(bound)) => {
                bound.visit_declared(f)
            }
            _ => {}
        }
    }

    /// Parse the Java-like type syntax used in declaration files:
    /// `int`, `void`, `java.util.Map<K, java.util.List<? extends V>>`, `byte[]`.
    ///
    /// Every name is returned as [`TypeRef::Declared`]; deciding which names
    /// are type variables is left to the caller, who knows the scope.
    pub fn parse(input: &str) -> Result<TypeRef, TypeParseError> {
        let mut parser = Parser::new(input);
        let ty = parser.parse_type()?;
        parser.finish()?;
        Ok(ty)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(p) => f.write_str(p.keyword()),
            TypeRef::Declared { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Var(name) => f.write_str(name),
            TypeRef::Array(element) => write!(f, "{element}[]"),
            TypeRef::Wildcard(Wildcard::Unbounded) => f.write_str("?"),
            TypeRef::Wildcard(Wildcard::Extends(bound)) => write!(f, "? extends {bound}"),
            TypeRef::Wildcard(Wildcard::Super(bound)) => write!(f, "? super {bound}"),
        }
    }
}

// ── TypeParam ───────────────────────────────────────────────────────────────

/// A generic type parameter declaration: `T` or `T extends A & B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    pub fn bounded(name: impl Into<String>, bounds: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }

    pub fn substitute(&self, subst: &Substitution) -> Self {
        Self {
            name: self.name.clone(),
            bounds: self.bounds.iter().map(|b| b.substitute(subst)).collect(),
        }
    }

    /// Parse `T`, `T extends Comparable<T>` or `T extends A & B`.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = Parser::new(input);
        let name = parser.ident()?;
        let mut bounds = Vec::new();
        if parser.keyword("extends") {
            loop {
                bounds.push(parser.parse_type()?);
                if !parser.eat('&') {
                    break;
                }
            }
        }
        parser.finish()?;
        Ok(Self { name, bounds })
    }
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, bound) in self.bounds.iter().enumerate() {
            f.write_str(if i == 0 { " extends " } else { " & " })?;
            write!(f, "{bound}")?;
        }
        Ok(())
    }
}

// ── TypeScope ───────────────────────────────────────────────────────────────

/// Stack of generic parameter lists in scope, innermost last.
///
/// A method's own type parameters shadow the enclosing class's.
#[derive(Debug, Clone, Default)]
pub struct TypeScope<'a> {
    frames: Vec<&'a [TypeParam]>,
}

impl<'a> TypeScope<'a> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn of(params: &'a [TypeParam]) -> Self {
        Self {
            frames: vec![params],
        }
    }

    /// A new scope with `params` pushed as the innermost frame.
    pub fn with(&self, params: &'a [TypeParam]) -> Self {
        let mut frames = self.frames.clone();
        frames.push(params);
        Self { frames }
    }

    pub fn lookup(&self, name: &str) -> Option<&'a TypeParam> {
        self.frames
            .iter()
            .rev()
            .copied()
            .find_map(|frame: &'a [TypeParam]| frame.iter().find(|param| param.name == name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

// ── Parsing ─────────────────────────────────────────────────────────────────

/// A type expression in a declaration file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParseError {
    pub input: String,
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid type `{}`: {} (at offset {})",
            self.input, self.message, self.offset
        )
    }
}

impl std::error::Error for TypeParseError {}

struct Parser<'s> {
    input: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(input: &'s str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{expected}`")))
        }
    }

    fn ident(&mut self) -> Result<String, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        match self.chars.get(self.pos) {
            Some(c) if is_ident_start(*c) => self.pos += 1,
            _ => return Err(self.error("expected an identifier")),
        }
        while self.chars.get(self.pos).is_some_and(|c| is_ident_part(*c)) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Consume `word` if it is the next identifier.
    fn keyword(&mut self, word: &str) -> bool {
        let saved = self.pos;
        match self.ident() {
            Ok(found) if found == word => true,
            _ => {
                self.pos = saved;
                false
            }
        }
    }

    fn qualified_name(&mut self) -> Result<String, TypeParseError> {
        let mut name = self.ident()?;
        while self.peek() == Some('.') {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeParseError> {
        if self.peek() == Some('?') {
            return Err(self.error("wildcards are only allowed as type arguments"));
        }
        let name = self.qualified_name()?;
        let mut ty = if name == "void" {
            TypeRef::Void
        } else if let Some(primitive) = Primitive::from_keyword(&name) {
            TypeRef::Primitive(primitive)
        } else {
            let mut args = Vec::new();
            if self.eat('<') {
                loop {
                    args.push(self.parse_arg()?);
                    if self.eat(',') {
                        continue;
                    }
                    self.expect('>')?;
                    break;
                }
            }
            TypeRef::Declared { name, args }
        };
        while self.eat('[') {
            self.expect(']')?;
            if ty.is_void() {
                return Err(self.error("`void` cannot be an array element"));
            }
            ty = TypeRef::array(ty);
        }
        Ok(ty)
    }

    fn parse_arg(&mut self) -> Result<TypeRef, TypeParseError> {
        if !self.eat('?') {
            let arg = self.parse_type()?;
            if !arg.is_reference() {
                return Err(self.error("type arguments must be reference types"));
            }
            return Ok(arg);
        }
        let wildcard = if self.keyword("extends") {
            Wildcard::Extends(Box::new(self.parse_type()?))
        } else if self.keyword("super") {
            Wildcard::Super(Box::new(self.parse_type()?))
        } else {
            Wildcard::Unbounded
        };
        Ok(TypeRef::Wildcard(wildcard))
    }

    fn finish(&mut self) -> Result<(), TypeParseError> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
