use model::{CompileResult, Node, NodeKind, TokenKind, TypeKind};
use crate::parser::Parser;

/// Type parsing functionality
pub(crate) trait TypeParser {
    fn parse_type(&mut self) -> CompileResult<Node>;
}

impl<'a> TypeParser for Parser<'a> {
    /// `('int' | 'char' | 'void') '*'*`, built inside out so the base type is
    /// the innermost node.
    fn parse_type(&mut self) -> CompileResult<Node> {
        let token = self.advance()?;
        let base = match token.kind {
            TokenKind::Int => TypeKind::Int,
            TokenKind::Char => TypeKind::Char,
            TokenKind::Void => TypeKind::Void,
            _ => return Err(self.unexpected(&token, "type specifier")),
        };
        let mut ty = Node::leaf(NodeKind::Type(base), token.offset);
        while let Some(star) = self.match_token(TokenKind::Star)? {
            ty = Node::new(NodeKind::Type(TypeKind::Pointer), vec![ty], star.offset);
        }
        Ok(ty)
    }
}
