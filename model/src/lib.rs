mod error;
pub mod target;

use std::borrow::Cow;
use std::fmt;

pub use error::{CompileError, CompileResult, ErrorKind};

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum TokenKind {
    IntLiteral,
    CharLiteral,
    StrLiteral,
    Identifier,
    Semicolon,
    OpenParenthesis,
    CloseParenthesis,
    OpenBrace,
    CloseBrace,
    Comma,
    // Operators
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,      // =
    EqualEqual, // ==
    BangEqual,  // !=
    Bang,
    Ampersand,
    Pipe,
    Tilde,
    Caret,
    AndAnd,
    OrOr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AndEqual,
    OrEqual,
    XorEqual,
    // Keywords
    Int,
    Char,
    Void,
    If,
    Else,
    While,
    Continue,
    Break,
    Return,
    Eof,
}

impl TokenKind {
    pub fn is_type_keyword(self) -> bool {
        matches!(self, TokenKind::Int | TokenKind::Char | TokenKind::Void)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw bytes of an identifier, literal or string payload.
    pub text: Option<Vec<u8>>,
    /// Stream offset just past the token.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, text: None, offset }
    }

    pub fn with_text(kind: TokenKind, text: impl Into<Vec<u8>>, offset: usize) -> Self {
        Self { kind, text: Some(text.into()), offset }
    }

    pub fn bytes(&self) -> &[u8] {
        self.text.as_deref().unwrap_or(&[])
    }

    /// Token text for names and messages. Bytes that are not UTF-8 are replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StmtKind {
    Decl(String),
    Expr,
    Empty,
    Block,
    If,
    While,
    Continue,
    Break,
    Return,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ExprKind {
    Ident(String),
    IntLiteral(i32),
    CharLiteral(u8),
    StringLiteral(Vec<u8>),
    Deref,
    AddressOf,
    Increment,
    Decrement,
    Not,
    BitNot,
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    Greater,
    Equal,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Assign,
    Call,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TypeKind {
    Int,
    Char,
    Void,
    Pointer,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum NodeKind {
    Function(String),
    Argument(String),
    Stmt(StmtKind),
    Expr(ExprKind),
    Type(TypeKind),
}

/// A syntax tree node. The meaning of `children` depends on `kind`:
///
/// * `Function`: `[return type, Argument*, body Block?]`
/// * `Argument`: `[type]`
/// * `Decl`: `[type, initializer?]`
/// * `If`: `[condition, then Block, else Block?]`
/// * `While`: `[condition, body Block]`
/// * `Call`: `[callee, args*]`
/// * unary/binary expressions: their operands in source order
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub offset: usize,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>, offset: usize) -> Self {
        Self { kind, children, offset }
    }

    pub fn leaf(kind: NodeKind, offset: usize) -> Self {
        Self::new(kind, Vec::new(), offset)
    }

    pub fn stmt(kind: StmtKind, children: Vec<Node>, offset: usize) -> Self {
        Self::new(NodeKind::Stmt(kind), children, offset)
    }

    pub fn expr(kind: ExprKind, children: Vec<Node>, offset: usize) -> Self {
        Self::new(NodeKind::Expr(kind), children, offset)
    }

    pub fn block(statements: Vec<Node>, offset: usize) -> Self {
        Self::stmt(StmtKind::Block, statements, offset)
    }

    pub fn is_block(&self) -> bool {
        self.kind == NodeKind::Stmt(StmtKind::Block)
    }

    pub fn stmt_kind(&self) -> Option<&StmtKind> {
        match &self.kind {
            NodeKind::Stmt(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn expr_kind(&self) -> Option<&ExprKind> {
        match &self.kind {
            NodeKind::Expr(kind) => Some(kind),
            _ => None,
        }
    }

    /// Splits a `Function` node into (return type, arguments, body).
    pub fn function_parts(&self) -> Option<FunctionParts<'_>> {
        let NodeKind::Function(name) = &self.kind else {
            return None;
        };
        let (return_type, rest) = self.children.split_first()?;
        let (arguments, body) = match rest.last() {
            Some(last) if last.is_block() => (&rest[..rest.len() - 1], Some(last)),
            _ => (rest, None),
        };
        Some(FunctionParts { name, return_type, arguments, body })
    }

    /// Name carried by an `Argument` node.
    pub fn argument_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Argument(name) => Some(name),
            _ => None,
        }
    }
}

/// Renders the tree as an S-expression without offsets, e.g.
/// `(Function main (Int) (Block (Return (IntLiteral 1))))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        match &self.kind {
            NodeKind::Function(name) => write!(f, "Function {}", name)?,
            NodeKind::Argument(name) => write!(f, "Argument {}", name)?,
            NodeKind::Stmt(StmtKind::Decl(name)) => write!(f, "Decl {}", name)?,
            NodeKind::Stmt(kind) => write!(f, "{:?}", kind)?,
            NodeKind::Expr(ExprKind::Ident(name)) => write!(f, "Ident {}", name)?,
            NodeKind::Expr(ExprKind::IntLiteral(value)) => write!(f, "IntLiteral {}", value)?,
            NodeKind::Expr(ExprKind::CharLiteral(value)) => write!(f, "CharLiteral {}", value)?,
            NodeKind::Expr(ExprKind::StringLiteral(bytes)) => {
                write!(f, "StringLiteral {:?}", String::from_utf8_lossy(bytes))?
            }
            NodeKind::Expr(kind) => write!(f, "{:?}", kind)?,
            NodeKind::Type(kind) => write!(f, "{:?}", kind)?,
        }
        for child in &self.children {
            write!(f, " {}", child)?;
        }
        f.write_str(")")
    }
}

pub struct FunctionParts<'a> {
    pub name: &'a str,
    pub return_type: &'a Node,
    pub arguments: &'a [Node],
    pub body: Option<&'a Node>,
}

/// Concrete type tags. Pointers deeper than one level collapse into `PtrPtr`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TypeTag {
    Int,
    Char,
    Void,
    PtrInt,
    PtrChar,
    PtrVoid,
    PtrPtr,
}

impl TypeTag {
    /// Resolve a `Type` node into its tag.
    pub fn from_node(node: &Node) -> Option<TypeTag> {
        match node.kind {
            NodeKind::Type(TypeKind::Int) => Some(TypeTag::Int),
            NodeKind::Type(TypeKind::Char) => Some(TypeTag::Char),
            NodeKind::Type(TypeKind::Void) => Some(TypeTag::Void),
            NodeKind::Type(TypeKind::Pointer) => {
                let pointee = TypeTag::from_node(node.children.first()?)?;
                Some(pointee.pointer_to())
            }
            _ => None,
        }
    }

    pub fn pointer_to(self) -> TypeTag {
        match self {
            TypeTag::Int => TypeTag::PtrInt,
            TypeTag::Char => TypeTag::PtrChar,
            TypeTag::Void => TypeTag::PtrVoid,
            _ => TypeTag::PtrPtr,
        }
    }

    /// Pointee of a pointer tag; `PtrPtr` only knows it points at some pointer.
    pub fn pointee(self) -> Option<TypeTag> {
        match self {
            TypeTag::PtrInt => Some(TypeTag::Int),
            TypeTag::PtrChar => Some(TypeTag::Char),
            TypeTag::PtrVoid => Some(TypeTag::Void),
            TypeTag::PtrPtr => Some(TypeTag::PtrVoid),
            _ => None,
        }
    }

    pub fn is_pointer(self) -> bool {
        self.pointee().is_some()
    }

    /// Storage size in bytes.
    pub fn size(self) -> u32 {
        match self {
            TypeTag::Char => 1,
            TypeTag::Void => 0,
            _ => 4,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Code,
    Data,
    Stack,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Location {
    pub segment: Segment,
    pub offset: i32,
}

impl Location {
    pub fn new(segment: Segment, offset: i32) -> Self {
        Self { segment, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(kind: TypeKind, children: Vec<Node>) -> Node {
        Node::new(NodeKind::Type(kind), children, 0)
    }

    #[test]
    fn type_tags_from_nodes() {
        let int_ptr = ty(TypeKind::Pointer, vec![ty(TypeKind::Int, vec![])]);
        assert_eq!(TypeTag::from_node(&int_ptr), Some(TypeTag::PtrInt));

        let char_ptr_ptr = ty(
            TypeKind::Pointer,
            vec![ty(TypeKind::Pointer, vec![ty(TypeKind::Char, vec![])])],
        );
        assert_eq!(TypeTag::from_node(&char_ptr_ptr), Some(TypeTag::PtrPtr));
    }

    #[test]
    fn type_sizes() {
        assert_eq!(TypeTag::Int.size(), 4);
        assert_eq!(TypeTag::Char.size(), 1);
        assert_eq!(TypeTag::Void.size(), 0);
        assert_eq!(TypeTag::PtrChar.size(), 4);
        assert_eq!(TypeTag::PtrPtr.pointee(), Some(TypeTag::PtrVoid));
        assert_eq!(TypeTag::Int.pointee(), None);
    }

    #[test]
    fn display_renders_s_expression() {
        let ret = Node::stmt(
            StmtKind::Return,
            vec![Node::expr(ExprKind::IntLiteral(1), vec![], 20)],
            21,
        );
        let func = Node::new(
            NodeKind::Function("main".to_string()),
            vec![ty(TypeKind::Int, vec![]), Node::block(vec![ret], 10)],
            8,
        );
        assert_eq!(func.to_string(), "(Function main (Int) (Block (Return (IntLiteral 1))))");
    }

    #[test]
    fn function_parts_split_body_from_arguments() {
        let func = Node::new(
            NodeKind::Function("f".to_string()),
            vec![
                ty(TypeKind::Int, vec![]),
                Node::new(NodeKind::Argument("a".to_string()), vec![ty(TypeKind::Int, vec![])], 0),
                Node::block(vec![], 0),
            ],
            0,
        );
        let parts = func.function_parts().unwrap();
        assert_eq!(parts.name, "f");
        assert_eq!(parts.arguments.len(), 1);
        assert!(parts.body.is_some());

        let proto = Node::new(
            NodeKind::Function("g".to_string()),
            vec![ty(TypeKind::Void, vec![])],
            0,
        );
        let parts = proto.function_parts().unwrap();
        assert!(parts.arguments.is_empty());
        assert!(parts.body.is_none());
    }
}
