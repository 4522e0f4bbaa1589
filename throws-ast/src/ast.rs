//! Expression and statement arena.
//!
//! Nodes are produced by the host parser and are read-only to the checker.
//! Identity is the arena index; a node's `(file, offset, length, kind)`
//! tuple is unique by construction, which is what makes `NodeId` a valid
//! memo key.

use crate::element::ElementId;
use crate::span::Span;
use crate::symbol::Symbol;
use crate::types::TypeId;
use serde::{Deserialize, Serialize};

/// Opaque handle to an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Symbol),
}

/// An argument at a call site, linked to the parameter it flows into when
/// the host resolver knows it.
#[derive(Debug, Clone)]
pub struct Argument {
    pub expr: NodeId,
    pub param: Option<ElementId>,
}

/// A `catch` clause. `exception_type: None` catches everything.
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub exception_type: Option<TypeId>,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(LiteralValue),
    This,
    SuperRef,
    /// `e is T`; the tested type never throws.
    IsTest { inner: NodeId },
    TypeLiteral { ty: TypeId },
    Parenthesized { inner: NodeId },
    NamedArgument { name: Symbol, inner: NodeId },
    /// Resolved reference to a variable, function, getter, …
    Identifier { element: Option<ElementId> },
    PropertyAccess { target: Option<NodeId>, element: Option<ElementId> },
    ConstructorReference { element: Option<ElementId> },
    /// Function or method call; the callee expression evaluates to the
    /// invoked value.
    Invocation { callee: NodeId, args: Vec<Argument> },
    Index { target: NodeId, index: NodeId, operator: Option<ElementId> },
    InstanceCreation { constructor: Option<ElementId>, args: Vec<Argument> },
    BinaryOp { left: NodeId, right: NodeId, operator: Option<ElementId> },
    Await { inner: NodeId },
    /// `target = value`; `target` is the setter or variable written to.
    Assignment { target: Option<ElementId>, value: NodeId },
    Conditional { condition: NodeId, then_branch: NodeId, else_branch: NodeId },
    SwitchExpression { scrutinee: NodeId, arms: Vec<NodeId> },
    /// Closure literal; the element is a local executable with its own body.
    FunctionExpression { element: ElementId },
    Cast { inner: NodeId, ty: TypeId },
    /// Postfix `!`.
    NullAssert { inner: NodeId },
    Throw { inner: NodeId, thrown_type: TypeId },
    Rethrow,
    IfNull { left: NodeId, right: NodeId },
    /// Destructuring assignment; may throw `StateError` on refutation.
    PatternAssignment { value: NodeId },
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block { statements: Vec<NodeId> },
    Expression { expr: NodeId },
    If { condition: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    Try { body: NodeId, catches: Vec<CatchClause>, finally: Option<NodeId> },
    Return { expr: Option<NodeId> },
    /// Declaration statement for a local variable element.
    VariableDeclaration { element: ElementId },
    While { condition: NodeId, body: NodeId },
    For { init: Option<NodeId>, condition: Option<NodeId>, update: Option<NodeId>, body: NodeId },
    Switch { scrutinee: NodeId, cases: Vec<NodeId> },
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Expr(ExprKind),
    Stmt(StmtKind),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
}

/// Arena of AST nodes. Allocation wires parent links from the node's
/// children, so the tree must be built bottom-up.
#[derive(Debug, Default)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let children = children_of(&kind);
        self.nodes.push(Node { span, kind, parent: None });
        for child in children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn expr_kind(&self, id: NodeId) -> Option<&ExprKind> {
        match &self.node(id).kind {
            NodeKind::Expr(kind) => Some(kind),
            NodeKind::Stmt(_) => None,
        }
    }

    pub fn stmt_kind(&self, id: NodeId) -> Option<&StmtKind> {
        match &self.node(id).kind {
            NodeKind::Stmt(kind) => Some(kind),
            NodeKind::Expr(_) => None,
        }
    }

    pub fn is_expression(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Expr(_))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        children_of(&self.node(id).kind)
    }
}

fn children_of(kind: &NodeKind) -> Vec<NodeId> {
    match kind {
        NodeKind::Expr(expr) => match expr {
            ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::SuperRef
            | ExprKind::TypeLiteral { .. }
            | ExprKind::Identifier { .. }
            | ExprKind::ConstructorReference { .. }
            | ExprKind::FunctionExpression { .. }
            | ExprKind::Rethrow => Vec::new(),
            ExprKind::IsTest { inner }
            | ExprKind::Parenthesized { inner }
            | ExprKind::NamedArgument { inner, .. }
            | ExprKind::Await { inner }
            | ExprKind::Cast { inner, .. }
            | ExprKind::NullAssert { inner }
            | ExprKind::Throw { inner, .. } => vec![*inner],
            ExprKind::PropertyAccess { target, .. } => target.iter().copied().collect(),
            ExprKind::Invocation { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args.iter().map(|a| a.expr));
                out
            }
            ExprKind::Index { target, index, .. } => vec![*target, *index],
            ExprKind::InstanceCreation { args, .. } => args.iter().map(|a| a.expr).collect(),
            ExprKind::BinaryOp { left, right, .. } => vec![*left, *right],
            ExprKind::Assignment { value, .. } => vec![*value],
            ExprKind::Conditional { condition, then_branch, else_branch } => {
                vec![*condition, *then_branch, *else_branch]
            }
            ExprKind::SwitchExpression { scrutinee, arms } => {
                let mut out = vec![*scrutinee];
                out.extend(arms.iter().copied());
                out
            }
            ExprKind::IfNull { left, right } => vec![*left, *right],
            ExprKind::PatternAssignment { value } => vec![*value],
        },
        NodeKind::Stmt(stmt) => match stmt {
            StmtKind::Block { statements } => statements.clone(),
            StmtKind::Expression { expr } => vec![*expr],
            StmtKind::If { condition, then_branch, else_branch } => {
                let mut out = vec![*condition, *then_branch];
                out.extend(else_branch.iter().copied());
                out
            }
            StmtKind::Try { body, catches, finally } => {
                let mut out = vec![*body];
                out.extend(catches.iter().map(|c| c.body));
                out.extend(finally.iter().copied());
                out
            }
            StmtKind::Return { expr } => expr.iter().copied().collect(),
            StmtKind::VariableDeclaration { .. } => Vec::new(),
            StmtKind::While { condition, body } => vec![*condition, *body],
            StmtKind::For { init, condition, update, body } => {
                let mut out: Vec<NodeId> = Vec::new();
                out.extend(init.iter().copied());
                out.extend(condition.iter().copied());
                out.extend(update.iter().copied());
                out.push(*body);
                out
            }
            StmtKind::Switch { scrutinee, cases } => {
                let mut out = vec![*scrutinee];
                out.extend(cases.iter().copied());
                out
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{FileId, Span};

    fn span(start: u32) -> Span {
        Span::new(FileId::new(0), start, 1)
    }

    #[test]
    fn alloc_wires_parent_links() {
        let mut arena = AstArena::new();
        let lit = arena.alloc(NodeKind::Expr(ExprKind::Literal(LiteralValue::Int(1))), span(0));
        let paren = arena.alloc(NodeKind::Expr(ExprKind::Parenthesized { inner: lit }), span(0));

        assert_eq!(arena.parent(lit), Some(paren));
        assert_eq!(arena.parent(paren), None);
        assert_eq!(arena.children(paren), vec![lit]);
    }

    #[test]
    fn try_children_include_catch_bodies() {
        let mut arena = AstArena::new();
        let body = arena.alloc(NodeKind::Stmt(StmtKind::Block { statements: vec![] }), span(0));
        let handler = arena.alloc(NodeKind::Stmt(StmtKind::Block { statements: vec![] }), span(1));
        let try_stmt = arena.alloc(
            NodeKind::Stmt(StmtKind::Try {
                body,
                catches: vec![CatchClause { exception_type: None, body: handler }],
                finally: None,
            }),
            span(0),
        );

        assert_eq!(arena.children(try_stmt), vec![body, handler]);
        assert_eq!(arena.parent(handler), Some(try_stmt));
    }
}
