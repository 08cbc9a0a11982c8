use model::{CompileResult, Node, StmtKind, Token, TokenKind};
use crate::expressions::ExpressionParser;
use crate::parser::Parser;
use crate::types::TypeParser;

/// Statement parsing functionality
pub(crate) trait StatementParser {
    fn parse_stmt(&mut self) -> CompileResult<Node>;
    fn parse_block(&mut self) -> CompileResult<Node>;
}

impl<'a> StatementParser for Parser<'a> {
    fn parse_block(&mut self) -> CompileResult<Node> {
        let open = self.expect(TokenKind::OpenBrace, "'{'")?;
        self.parse_block_rest(open)
    }

    fn parse_stmt(&mut self) -> CompileResult<Node> {
        self.nested(Self::parse_statement)
    }
}

impl<'a> Parser<'a> {
    fn parse_statement(&mut self) -> CompileResult<Node> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Semicolon => Ok(Node::stmt(StmtKind::Empty, vec![], token.offset)),
            TokenKind::OpenBrace => self.parse_block_rest(token),
            kind if kind.is_type_keyword() => {
                self.push_back(token)?;
                let ty = self.parse_type()?;
                let name = self.expect(TokenKind::Identifier, "identifier")?;
                self.parse_decl_rest(ty, name)
            }
            TokenKind::If => self.parse_if_stmt(token),
            TokenKind::While => self.parse_while_stmt(token),
            TokenKind::Return => self.parse_return_stmt(token),
            TokenKind::Break => {
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Node::stmt(StmtKind::Break, vec![], token.offset))
            }
            TokenKind::Continue => {
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Node::stmt(StmtKind::Continue, vec![], token.offset))
            }
            _ => {
                self.push_back(token)?;
                let expr = self.parse_expr()?;
                let semi = self.expect(TokenKind::Semicolon, "';'")?;
                Ok(Node::stmt(StmtKind::Expr, vec![expr], semi.offset))
            }
        }
    }

    /// Statements up to the closing brace; the opening brace is already consumed.
    fn parse_block_rest(&mut self, open: Token) -> CompileResult<Node> {
        let mut statements = Vec::new();
        loop {
            let token = self.advance()?;
            match token.kind {
                TokenKind::CloseBrace => break,
                TokenKind::Eof => return Err(self.unexpected(&token, "'}'")),
                _ => {
                    self.push_back(token)?;
                    statements.push(self.parse_stmt()?);
                }
            }
        }
        Ok(Node::block(statements, open.offset))
    }

    /// Branch and loop bodies always become blocks so the resolver can give
    /// each one its own scope.
    fn parse_body(&mut self) -> CompileResult<Node> {
        let stmt = self.parse_stmt()?;
        if stmt.is_block() {
            Ok(stmt)
        } else {
            let offset = stmt.offset;
            Ok(Node::block(vec![stmt], offset))
        }
    }

    fn parse_condition(&mut self) -> CompileResult<Node> {
        self.expect(TokenKind::OpenParenthesis, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::CloseParenthesis, "')'")?;
        Ok(cond)
    }

    fn parse_if_stmt(&mut self, keyword: Token) -> CompileResult<Node> {
        let cond = self.parse_condition()?;
        let then_branch = self.parse_body()?;
        let mut children = vec![cond, then_branch];
        if self.match_token(TokenKind::Else)?.is_some() {
            children.push(self.parse_body()?);
        }
        Ok(Node::stmt(StmtKind::If, children, keyword.offset))
    }

    fn parse_while_stmt(&mut self, keyword: Token) -> CompileResult<Node> {
        let cond = self.parse_condition()?;
        let body = self.parse_body()?;
        Ok(Node::stmt(StmtKind::While, vec![cond, body], keyword.offset))
    }

    fn parse_return_stmt(&mut self, keyword: Token) -> CompileResult<Node> {
        if self.match_token(TokenKind::Semicolon)?.is_some() {
            return Ok(Node::stmt(StmtKind::Return, vec![], keyword.offset));
        }
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Node::stmt(StmtKind::Return, vec![value], keyword.offset))
    }
}
