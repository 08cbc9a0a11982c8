use lexer::Lexer;
use log::{debug, trace};
use model::{CompileError, CompileResult, ErrorKind, Node, NodeKind, StmtKind, Token, TokenKind};
use crate::expressions::ExpressionParser;
use crate::statements::StatementParser;
use crate::types::TypeParser;

/// Deepest statement or expression nesting accepted. Every later stage walks
/// the tree recursively, so the limit also bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 1024;

/// Core parser struct. Tokens are pulled from the lexer on demand, so the
/// only lookahead available is the lexer's single pushback slot.
pub(crate) struct Parser<'a> {
    pub(crate) lexer: Lexer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Parser { lexer, depth: 0 }
    }

    /// Parse the entire program into a root block of declarations and functions.
    pub fn parse_program(&mut self) -> CompileResult<Node> {
        let mut items = Vec::new();
        while !self.is_at_end()? {
            items.push(self.parse_top_level()?);
        }
        debug!("parsed {} top-level items", items.len());
        Ok(Node::block(items, 0))
    }

    fn parse_top_level(&mut self) -> CompileResult<Node> {
        let ty = self.parse_type()?;
        let name = self.expect(TokenKind::Identifier, "identifier")?;
        if self.match_token(TokenKind::OpenParenthesis)?.is_some() {
            self.parse_function(ty, name)
        } else {
            self.parse_decl_rest(ty, name)
        }
    }

    /// Finish a declaration whose type and name are already consumed.
    pub(crate) fn parse_decl_rest(&mut self, ty: Node, name: Token) -> CompileResult<Node> {
        let mut children = vec![ty];
        if self.match_token(TokenKind::Equal)?.is_some() {
            children.push(self.parse_expr()?);
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        let ident = name.text().to_string();
        trace!("declaration {}", ident);
        Ok(Node::stmt(StmtKind::Decl(ident), children, name.offset))
    }

    fn parse_function(&mut self, return_type: Node, name: Token) -> CompileResult<Node> {
        let mut children = vec![return_type];
        children.extend(self.parse_function_params()?);

        let next = self.advance()?;
        match next.kind {
            TokenKind::OpenBrace => {
                self.push_back(next)?;
                children.push(self.parse_block()?);
            }
            TokenKind::Semicolon => {}
            _ => return Err(self.unexpected(&next, "function body or ';'")),
        }

        let ident = name.text().to_string();
        trace!("function {} with {} children", ident, children.len());
        Ok(Node::new(NodeKind::Function(ident), children, name.offset))
    }

    fn parse_function_params(&mut self) -> CompileResult<Vec<Node>> {
        let mut params = Vec::new();
        if self.match_token(TokenKind::CloseParenthesis)?.is_some() {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect(TokenKind::Identifier, "parameter name")?;
            params.push(Node::new(
                NodeKind::Argument(name.text().to_string()),
                vec![ty],
                name.offset,
            ));
            let sep = self.advance()?;
            match sep.kind {
                TokenKind::Comma => continue,
                TokenKind::CloseParenthesis => return Ok(params),
                _ => return Err(self.unexpected(&sep, "',' or ')'")),
            }
        }
    }

    /// Run one level of recursive descent, failing once the nesting limit
    /// is reached.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::new(
                ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH),
                self.lexer.position(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // Token helpers

    pub(crate) fn is_at_end(&mut self) -> CompileResult<bool> {
        self.check(TokenKind::Eof)
    }

    pub(crate) fn peek(&mut self) -> CompileResult<Token> {
        self.lexer.peek()
    }

    pub(crate) fn advance(&mut self) -> CompileResult<Token> {
        self.lexer.next_token()
    }

    pub(crate) fn push_back(&mut self, token: Token) -> CompileResult<()> {
        self.lexer.push_back(token)
    }

    pub(crate) fn check(&mut self, kind: TokenKind) -> CompileResult<bool> {
        Ok(self.peek()?.kind == kind)
    }

    /// Consume the next token if it has the given kind.
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> CompileResult<Option<Token>> {
        let token = self.advance()?;
        if token.kind == kind {
            Ok(Some(token))
        } else {
            self.push_back(token)?;
            Ok(None)
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> CompileResult<Token> {
        let token = self.advance()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(self.unexpected(&token, expected))
        }
    }

    pub(crate) fn unexpected(&self, found: &Token, expected: &str) -> CompileError {
        CompileError::new(
            ErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: describe(found),
            },
            found.offset,
        )
    }
}

fn describe(token: &Token) -> String {
    match &token.text {
        Some(_) => format!("{:?} '{}'", token.kind, token.text()),
        None if token.kind == TokenKind::Eof => "end of input".to_string(),
        None => format!("{:?}", token.kind),
    }
}
