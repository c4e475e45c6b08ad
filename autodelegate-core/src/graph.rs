//! Interface inheritance as an explicit arena graph.
//!
//! Nodes are interface declarations keyed by qualified name; edges point from
//! an interface to its direct superinterfaces. Cycles are found once, up
//! front, with a Kahn sort so that walks never have to guard against them.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::symbols::{DeclKind, SymbolTable, TypeDecl};
use crate::types::{Substitution, TypeRef, TypeScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<'t> {
    decl: &'t TypeDecl,
    /// Direct superinterfaces that are declared interfaces.
    supers: Vec<NodeId>,
}

/// One interface reached during a walk, with the bindings in force there.
#[derive(Debug, Clone)]
pub struct Visit<'t> {
    pub node: NodeId,
    pub decl: &'t TypeDecl,
    /// The interface as seen from the walk's roots, arguments bound.
    pub ty: TypeRef,
    /// The interface's own type parameters mapped to `ty`'s arguments.
    pub subst: Substitution,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// A referenced type has no declaration (yet).
    Unknown { name: String },
    NotAnInterface { name: String, kind: DeclKind },
    /// The same interface was reached with two different argument lists.
    InconsistentArguments {
        name: String,
        first: TypeRef,
        second: TypeRef,
    },
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    Cyclic { name: String, cycle: Vec<String> },
    Cancelled,
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkError::Unknown { name } => write!(f, "type `{name}` is not declared"),
            WalkError::NotAnInterface { name, kind } => {
                write!(f, "`{name}` is {} {}, not an interface", article(kind.label()), kind.label())
            }
            WalkError::InconsistentArguments {
                name,
                first,
                second,
            } => write!(
                f,
                "interface `{name}` is inherited both as `{first}` and as `{second}`"
            ),
            WalkError::Arity {
                name,
                expected,
                found,
            } => write!(
                f,
                "interface `{name}` takes {expected} type argument(s) but {found} were given"
            ),
            WalkError::Cyclic { name, cycle } => write!(
                f,
                "interface `{name}` has cyclic inheritance: {}",
                cycle.join(" -> ")
            ),
            WalkError::Cancelled => f.write_str("walk cancelled"),
        }
    }
}

impl std::error::Error for WalkError {}

fn article(word: &str) -> &'static str {
    match word.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

pub struct InterfaceGraph<'t> {
    table: &'t SymbolTable,
    nodes: Vec<Node<'t>>,
    index: HashMap<&'t str, NodeId>,
    /// Nodes that lie on, or inherit from, an inheritance cycle.
    cyclic: BTreeSet<NodeId>,
}

impl<'t> InterfaceGraph<'t> {
    pub fn build(table: &'t SymbolTable) -> Self {
        let decls: Vec<&TypeDecl> = table.iter().filter(|d| d.kind.is_interface()).collect();
        let index: HashMap<&str, NodeId> = decls
            .iter()
            .enumerate()
            .map(|(i, &decl)| (decl.name.as_str(), NodeId(i)))
            .collect();
        let nodes: Vec<Node> = decls
            .iter()
            .map(|&decl| Node {
                decl,
                supers: decl
                    .interfaces
                    .iter()
                    .filter_map(|ty| ty.declared_name().and_then(|name| index.get(name)).copied())
                    .collect(),
            })
            .collect();
        let cyclic = find_cyclic(&nodes);
        Self {
            table,
            nodes,
            index,
            cyclic,
        }
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn decl(&self, id: NodeId) -> &'t TypeDecl {
        self.nodes[id.0].decl
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every interface `id` inherits from, transitively, excluding itself.
    pub fn ancestors(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].supers.clone();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.nodes[next.0].supers.iter().copied());
            }
        }
        seen.remove(&id);
        seen
    }

    /// Whether `sup` is a proper superinterface of `sub`.
    pub fn is_subinterface(&self, sub: &str, sup: &str) -> bool {
        match (self.node(sub), self.node(sup)) {
            (Some(sub), Some(sup)) if sub != sup => self.ancestors(sub).contains(&sup),
            _ => false,
        }
    }

    /// Breadth-first walk from `roots` through every superinterface.
    ///
    /// Each interface is visited once; reaching it again with different type
    /// arguments is an error. Raw references bind each parameter to the
    /// erasure of its first bound.
    pub fn walk(
        &self,
        roots: &[TypeRef],
        cancel: &CancellationToken,
    ) -> Result<Vec<Visit<'t>>, WalkError> {
        let mut queue: VecDeque<(TypeRef, usize)> =
            roots.iter().map(|ty| (ty.clone(), 0)).collect();
        let mut seen: HashMap<NodeId, TypeRef> = HashMap::new();
        let mut visits = Vec::new();

        while let Some((ty, depth)) = queue.pop_front() {
            if cancel.is_cancelled() {
                return Err(WalkError::Cancelled);
            }
            let (id, args) = self.lookup(&ty)?;
            if let Some(first) = seen.get(&id) {
                if *first != ty {
                    return Err(WalkError::InconsistentArguments {
                        name: self.decl(id).name.clone(),
                        first: first.clone(),
                        second: ty,
                    });
                }
                continue;
            }
            if self.cyclic.contains(&id) {
                return Err(WalkError::Cyclic {
                    name: self.decl(id).name.clone(),
                    cycle: self.cycle_through(id),
                });
            }

            let decl = self.decl(id);
            let subst = bind(decl, args)?;
            for sup in &decl.interfaces {
                queue.push_back((sup.substitute(&subst), depth + 1));
            }
            seen.insert(id, ty.clone());
            visits.push(Visit {
                node: id,
                decl,
                ty,
                subst,
                depth,
            });
        }
        tracing::trace!(roots = roots.len(), visited = visits.len(), "interface walk finished");
        Ok(visits)
    }

    fn lookup<'a>(&self, ty: &'a TypeRef) -> Result<(NodeId, &'a [TypeRef]), WalkError> {
        let (name, args) = match ty {
            TypeRef::Declared { name, args } => (name, args.as_slice()),
            other => {
                return Err(WalkError::Unknown {
                    name: other.to_string(),
                })
            }
        };
        if let Some(id) = self.node(name) {
            return Ok((id, args));
        }
        match self.table.get(name) {
            Some(decl) => Err(WalkError::NotAnInterface {
                name: name.clone(),
                kind: decl.kind,
            }),
            None => Err(WalkError::Unknown { name: name.clone() }),
        }
    }

    /// One concrete cycle reachable from `id`, for the error message.
    fn cycle_through(&self, id: NodeId) -> Vec<String> {
        let mut path = vec![id];
        let mut current = id;
        loop {
            let Some(next) = self.nodes[current.0]
                .supers
                .iter()
                .copied()
                .find(|s| self.cyclic.contains(s))
            else {
                break;
            };
            if let Some(start) = path.iter().position(|p| *p == next) {
                path.push(next);
                path.drain(..start);
                break;
            }
            path.push(next);
            current = next;
        }
        path.into_iter().map(|n| self.decl(n).name.clone()).collect()
    }
}

fn bind(decl: &TypeDecl, args: &[TypeRef]) -> Result<Substitution, WalkError> {
    if args.is_empty() {
        let scope = TypeScope::of(&decl.type_params);
        return Ok(decl
            .type_params
            .iter()
            .map(|param| (param.name.clone(), TypeRef::var(param.name.clone()).erasure(&scope)))
            .collect());
    }
    if args.len() != decl.type_params.len() {
        return Err(WalkError::Arity {
            name: decl.name.clone(),
            expected: decl.type_params.len(),
            found: args.len(),
        });
    }
    Ok(decl
        .type_params
        .iter()
        .zip(args)
        .map(|(param, arg)| (param.name.clone(), arg.clone()))
        .collect())
}

/// Kahn sort over the "extends" edges; whatever cannot be ordered sits on or
/// above a cycle.
fn find_cyclic(nodes: &[Node<'_>]) -> BTreeSet<NodeId> {
    let mut out_degree: Vec<usize> = nodes.iter().map(|n| n.supers.len()).collect();
    let mut subs: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for sup in &node.supers {
            subs[sup.0].push(i);
        }
    }

    let mut queue: Vec<usize> = (0..nodes.len()).filter(|&i| out_degree[i] == 0).collect();
    let mut ordered = 0;
    while let Some(idx) = queue.pop() {
        ordered += 1;
        for &sub in &subs[idx] {
            out_degree[sub] -= 1;
            if out_degree[sub] == 0 {
                queue.push(sub);
            }
        }
    }

    if ordered == nodes.len() {
        return BTreeSet::new();
    }
    (0..nodes.len())
        .filter(|&i| out_degree[i] > 0)
        .map(NodeId)
        .collect()
}
