use lexer::parse_int_literal;
use model::{CompileError, CompileResult, ErrorKind, ExprKind, Node, Token, TokenKind};
use crate::parser::Parser;

/// Expression parsing functionality.
///
/// There are no precedence levels: a primary followed by a binary operator
/// takes the whole remaining expression as its right operand, so every
/// operator chain associates to the right.
pub(crate) trait ExpressionParser {
    fn parse_expr(&mut self) -> CompileResult<Node>;
}

/// How a binary operator token maps onto tree nodes.
enum BinaryForm {
    Plain(ExprKind),
    /// `<=`, `>=` and `!=` become the logical negation of the opposite test.
    Negated(ExprKind),
    /// `x op= y` becomes `x = x op y`.
    Compound(ExprKind),
    Assign,
}

fn binary_form(kind: TokenKind) -> Option<BinaryForm> {
    use BinaryForm::*;
    let form = match kind {
        TokenKind::Plus => Plain(ExprKind::Add),
        TokenKind::Minus => Plain(ExprKind::Subtract),
        TokenKind::Star => Plain(ExprKind::Multiply),
        TokenKind::Slash => Plain(ExprKind::Divide),
        TokenKind::Percent => Plain(ExprKind::Modulo),
        TokenKind::Less => Plain(ExprKind::Less),
        TokenKind::Greater => Plain(ExprKind::Greater),
        TokenKind::EqualEqual => Plain(ExprKind::Equal),
        TokenKind::AndAnd => Plain(ExprKind::LogicalAnd),
        TokenKind::OrOr => Plain(ExprKind::LogicalOr),
        TokenKind::Ampersand => Plain(ExprKind::BitAnd),
        TokenKind::Pipe => Plain(ExprKind::BitOr),
        TokenKind::Caret => Plain(ExprKind::BitXor),
        TokenKind::LessEqual => Negated(ExprKind::Greater),
        TokenKind::GreaterEqual => Negated(ExprKind::Less),
        TokenKind::BangEqual => Negated(ExprKind::Equal),
        TokenKind::Equal => Assign,
        TokenKind::PlusEqual => Compound(ExprKind::Add),
        TokenKind::MinusEqual => Compound(ExprKind::Subtract),
        TokenKind::StarEqual => Compound(ExprKind::Multiply),
        TokenKind::SlashEqual => Compound(ExprKind::Divide),
        TokenKind::PercentEqual => Compound(ExprKind::Modulo),
        TokenKind::AndEqual => Compound(ExprKind::BitAnd),
        TokenKind::OrEqual => Compound(ExprKind::BitOr),
        TokenKind::XorEqual => Compound(ExprKind::BitXor),
        _ => return None,
    };
    Some(form)
}

fn unary_kind(kind: TokenKind) -> Option<ExprKind> {
    match kind {
        TokenKind::Star => Some(ExprKind::Deref),
        TokenKind::Ampersand => Some(ExprKind::AddressOf),
        TokenKind::Bang => Some(ExprKind::Not),
        TokenKind::Tilde => Some(ExprKind::BitNot),
        TokenKind::Minus => Some(ExprKind::Negate),
        TokenKind::PlusPlus => Some(ExprKind::Increment),
        TokenKind::MinusMinus => Some(ExprKind::Decrement),
        _ => None,
    }
}

/// Only an identifier, or a dereference of something that is itself an
/// lvalue, can be assigned to.
fn is_lvalue(node: &Node) -> bool {
    match node.expr_kind() {
        Some(ExprKind::Ident(_)) => true,
        Some(ExprKind::Deref) => node.children.first().is_some_and(is_lvalue),
        _ => false,
    }
}

fn require_lvalue(node: &Node, op: &Token) -> CompileResult<()> {
    if is_lvalue(node) {
        Ok(())
    } else {
        Err(CompileError::new(ErrorKind::InvalidLvalue, op.offset))
    }
}

impl<'a> ExpressionParser for Parser<'a> {
    fn parse_expr(&mut self) -> CompileResult<Node> {
        self.nested(Self::parse_binary)
    }
}

impl<'a> Parser<'a> {
    fn parse_binary(&mut self) -> CompileResult<Node> {
        let lhs = self.parse_primary()?;
        let op = self.advance()?;
        let Some(form) = binary_form(op.kind) else {
            self.push_back(op)?;
            return Ok(lhs);
        };

        let node = match form {
            BinaryForm::Plain(kind) => {
                let rhs = self.parse_expr()?;
                Node::expr(kind, vec![lhs, rhs], op.offset)
            }
            BinaryForm::Negated(kind) => {
                let rhs = self.parse_expr()?;
                let test = Node::expr(kind, vec![lhs, rhs], op.offset);
                Node::expr(ExprKind::Not, vec![test], op.offset)
            }
            BinaryForm::Assign => {
                require_lvalue(&lhs, &op)?;
                let rhs = self.parse_expr()?;
                Node::expr(ExprKind::Assign, vec![lhs, rhs], op.offset)
            }
            BinaryForm::Compound(kind) => {
                require_lvalue(&lhs, &op)?;
                let rhs = self.parse_expr()?;
                let value = Node::expr(kind, vec![lhs.clone(), rhs], op.offset);
                Node::expr(ExprKind::Assign, vec![lhs, value], op.offset)
            }
        };
        Ok(node)
    }

    fn parse_primary(&mut self) -> CompileResult<Node> {
        let token = self.advance()?;
        if let Some(kind) = unary_kind(token.kind) {
            let operand = self.nested(Self::parse_primary)?;
            if matches!(
                kind,
                ExprKind::Increment | ExprKind::Decrement | ExprKind::AddressOf
            ) {
                require_lvalue(&operand, &token)?;
            }
            return Ok(Node::expr(kind, vec![operand], token.offset));
        }

        match token.kind {
            TokenKind::OpenParenthesis => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::CloseParenthesis, "')'")?;
                Ok(inner)
            }
            TokenKind::IntLiteral => {
                let value = parse_int_literal(&token.text()).map_err(|msg| {
                    CompileError::new(ErrorKind::MalformedExpression(msg), token.offset)
                })?;
                Ok(Node::expr(ExprKind::IntLiteral(value), vec![], token.offset))
            }
            TokenKind::CharLiteral => {
                let value = token.bytes().first().copied().unwrap_or(0);
                Ok(Node::expr(ExprKind::CharLiteral(value), vec![], token.offset))
            }
            TokenKind::StrLiteral => {
                let bytes = token.bytes().to_vec();
                Ok(Node::expr(ExprKind::StringLiteral(bytes), vec![], token.offset))
            }
            TokenKind::Identifier => self.parse_identifier(token),
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    fn parse_identifier(&mut self, name: Token) -> CompileResult<Node> {
        let ident = Node::expr(ExprKind::Ident(name.text().to_string()), vec![], name.offset);
        if self.match_token(TokenKind::OpenParenthesis)?.is_none() {
            return Ok(ident);
        }

        let mut children = vec![ident];
        if self.match_token(TokenKind::CloseParenthesis)?.is_none() {
            loop {
                children.push(self.parse_expr()?);
                let sep = self.advance()?;
                match sep.kind {
                    TokenKind::Comma => continue,
                    TokenKind::CloseParenthesis => break,
                    _ => return Err(self.unexpected(&sep, "',' or ')'")),
                }
            }
        }
        Ok(Node::expr(ExprKind::Call, children, name.offset))
    }
}
