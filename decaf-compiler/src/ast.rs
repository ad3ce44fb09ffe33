//! Abstract syntax tree shared by every compiler phase.
//!
//! Nodes live in an arena (`Ast`) and refer to each other through opaque
//! [`NodeId`] handles. The single upward edge per node — the parent
//! back-reference used for tree ascent — is also a handle, so there are no
//! owning cycles. Phase-specific annotations are explicit typed fields:
//! analysis writes `inferred_type` once, later phases read it.

use std::fmt;

/// Opaque handle into the AST arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Decaf value types. `Str` only occurs on string literals (print arguments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Void,
    Str,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::Int => "int",
            Type::Bool => "bool",
            Type::Void => "void",
            Type::Str => "str",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        };
        write!(f, "{s}")
    }
}

/// A function parameter: name and declared type.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
}

/// Tagged union over every node shape in the language.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Program {
        variables: Vec<NodeId>,
        functions: Vec<NodeId>,
    },
    VarDecl {
        name: String,
        ty: Type,
        is_array: bool,
        array_length: usize,
    },
    FuncDecl {
        name: String,
        return_type: Type,
        params: Vec<Param>,
        body: NodeId,
    },
    Block {
        variables: Vec<NodeId>,
        statements: Vec<NodeId>,
    },
    Conditional {
        condition: NodeId,
        if_block: NodeId,
        else_block: Option<NodeId>,
    },
    WhileLoop {
        condition: NodeId,
        body: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
    Assignment {
        location: NodeId,
        value: NodeId,
    },
    Location {
        name: String,
        index: Option<NodeId>,
    },
    FuncCall {
        name: String,
        args: Vec<NodeId>,
    },
    BinaryOp {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOp,
        operand: NodeId,
    },
    Literal(Literal),
}

impl NodeKind {
    /// Child handles in traversal (evaluation) order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Program {
                variables,
                functions,
            } => variables.iter().chain(functions).copied().collect(),
            NodeKind::VarDecl { .. } | NodeKind::Break | NodeKind::Continue => Vec::new(),
            NodeKind::FuncDecl { body, .. } => vec![*body],
            NodeKind::Block {
                variables,
                statements,
            } => variables.iter().chain(statements).copied().collect(),
            NodeKind::Conditional {
                condition,
                if_block,
                else_block,
            } => {
                let mut out = vec![*condition, *if_block];
                out.extend(else_block);
                out
            }
            NodeKind::WhileLoop { condition, body } => vec![*condition, *body],
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::Assignment { location, value } => vec![*location, *value],
            NodeKind::Location { index, .. } => index.iter().copied().collect(),
            NodeKind::FuncCall { args, .. } => args.clone(),
            NodeKind::BinaryOp { left, right, .. } => vec![*left, *right],
            NodeKind::UnaryOp { operand, .. } => vec![*operand],
            NodeKind::Literal(_) => Vec::new(),
        }
    }
}

/// One arena slot: node shape, source line, upward edge, and the
/// analysis-phase annotation.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
    pub parent: Option<NodeId>,
    pub inferred_type: Option<Type>,
}

/// The AST arena. The root (a `Program` node) is created last by the parser.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, wiring every child's parent back-reference to it.
    pub fn add(&mut self, kind: NodeKind, line: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in kind.children() {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            line,
            parent: None,
            inferred_type: None,
        });
        id
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// The `Program` node. Panics only if called on an empty arena, which
    /// cannot happen after a successful parse.
    pub fn root(&self) -> NodeId {
        self.root.expect("AST has no root")
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.nodes[id.0].line
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ascend the parent chain to the nearest enclosing `FuncDecl`, if any.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ascend(id, |kind| matches!(kind, NodeKind::FuncDecl { .. }))
    }

    /// Ascend the parent chain to the nearest enclosing `WhileLoop`,
    /// stopping at the function/program boundary.
    pub fn enclosing_loop(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id.0].parent;
        while let Some(pid) = current {
            match &self.nodes[pid.0].kind {
                NodeKind::WhileLoop { .. } => return Some(pid),
                NodeKind::FuncDecl { .. } | NodeKind::Program { .. } => return None,
                _ => current = self.nodes[pid.0].parent,
            }
        }
        None
    }

    fn ascend(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = self.nodes[id.0].parent;
        while let Some(pid) = current {
            if pred(&self.nodes[pid.0].kind) {
                return Some(pid);
            }
            current = self.nodes[pid.0].parent;
        }
        None
    }
}
