use model::{CompileError, CompileResult, ErrorKind, Token, TokenKind};
use crate::keywords::keyword_or_identifier;
use crate::literals::escape_char;

/// Byte-level scanner producing one token per call.
pub struct StateMachineLexer<'a> {
    input: &'a [u8],
    pos: usize,
    max_token_len: usize,
    buf: Vec<u8>,
}

impl<'a> StateMachineLexer<'a> {
    pub fn new(input: &'a [u8], max_token_len: usize) -> Self {
        Self {
            input,
            pos: 0,
            max_token_len,
            buf: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        self.skip_trivia()?;
        self.buf.clear();

        let Some(ch) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, self.pos));
        };

        let kind = match ch {
            b';' => TokenKind::Semicolon,
            b'(' => TokenKind::OpenParenthesis,
            b')' => TokenKind::CloseParenthesis,
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b',' => TokenKind::Comma,
            b'~' => TokenKind::Tilde,
            b'<' => self.either(b'=', TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.either(b'=', TokenKind::GreaterEqual, TokenKind::Greater),
            b'=' => self.either(b'=', TokenKind::EqualEqual, TokenKind::Equal),
            b'!' => self.either(b'=', TokenKind::BangEqual, TokenKind::Bang),
            b'^' => self.either(b'=', TokenKind::XorEqual, TokenKind::Caret),
            b'*' => self.either(b'=', TokenKind::StarEqual, TokenKind::Star),
            b'/' => self.either(b'=', TokenKind::SlashEqual, TokenKind::Slash),
            b'%' => self.either(b'=', TokenKind::PercentEqual, TokenKind::Percent),
            b'&' => {
                if self.eat(b'&') {
                    TokenKind::AndAnd
                } else {
                    self.either(b'=', TokenKind::AndEqual, TokenKind::Ampersand)
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    TokenKind::OrOr
                } else {
                    self.either(b'=', TokenKind::OrEqual, TokenKind::Pipe)
                }
            }
            b'+' => {
                if self.eat(b'+') {
                    TokenKind::PlusPlus
                } else {
                    self.either(b'=', TokenKind::PlusEqual, TokenKind::Plus)
                }
            }
            b'-' => {
                if self.eat(b'-') {
                    TokenKind::MinusMinus
                } else {
                    self.either(b'=', TokenKind::MinusEqual, TokenKind::Minus)
                }
            }
            b'\'' => return self.lex_char(),
            b'"' => return self.lex_string(),
            b'0'..=b'9' => return self.lex_number(ch),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => return self.lex_identifier(ch),
            other => {
                return Err(self.malformed(format!("unexpected character '{}'", char::from(other))));
            }
        };

        Ok(Token::new(kind, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// One byte of lookahead: `matched` if the next byte is `next`, otherwise
    /// the byte is left in place and `single` is produced.
    fn either(&mut self, next: u8, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.eat(next) { matched } else { single }
    }

    fn malformed(&self, message: String) -> CompileError {
        CompileError::new(ErrorKind::MalformedToken(message), self.pos)
    }

    fn push_text(&mut self, ch: u8) -> CompileResult<()> {
        if self.buf.len() >= self.max_token_len {
            return Err(CompileError::new(ErrorKind::TokenTooLong(self.max_token_len), self.pos));
        }
        self.buf.push(ch);
        Ok(())
    }

    fn take_text(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    fn skip_trivia(&mut self) -> CompileResult<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c') => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.bump() {
                        if ch == b'\n' {
                            break;
                        }
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            Some(b'*') if self.peek() == Some(b'/') => {
                                self.pos += 1;
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.malformed("unterminated comment".to_string())),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_char(&mut self) -> CompileResult<Token> {
        let value = match self.bump() {
            None => return Err(self.malformed("unterminated character literal".to_string())),
            Some(b'\'') => return Err(self.malformed("empty character literal".to_string())),
            Some(b'\\') => match self.bump() {
                Some(escaped) => escape_char(escaped),
                None => return Err(self.malformed("unterminated character literal".to_string())),
            },
            Some(ch) => ch,
        };
        if self.bump() != Some(b'\'') {
            return Err(self.malformed("character literal must hold exactly one character".to_string()));
        }
        Ok(Token::with_text(TokenKind::CharLiteral, vec![value], self.pos))
    }

    fn lex_string(&mut self) -> CompileResult<Token> {
        loop {
            match self.bump() {
                None => return Err(self.malformed("unterminated string literal".to_string())),
                Some(b'\n' | b'\r') => {
                    return Err(self.malformed("newline in string literal".to_string()));
                }
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    None => return Err(self.malformed("unterminated string literal".to_string())),
                    Some(b'\n' | b'\r') => {
                        return Err(self.malformed("newline in string literal".to_string()));
                    }
                    Some(escaped) => self.push_text(escape_char(escaped))?,
                },
                Some(ch) => self.push_text(ch)?,
            }
        }
        let text = self.take_text();
        Ok(Token::with_text(TokenKind::StrLiteral, text, self.pos))
    }

    fn lex_number(&mut self, first: u8) -> CompileResult<Token> {
        self.push_text(first)?;
        while let Some(ch @ b'0'..=b'9') = self.peek() {
            self.pos += 1;
            self.push_text(ch)?;
        }
        let text = self.take_text();
        Ok(Token::with_text(TokenKind::IntLiteral, text, self.pos))
    }

    fn lex_identifier(&mut self, first: u8) -> CompileResult<Token> {
        self.push_text(first)?;
        while let Some(ch @ (b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')) = self.peek() {
            self.pos += 1;
            self.push_text(ch)?;
        }
        let text = self.take_text();
        match keyword_or_identifier(&text) {
            TokenKind::Identifier => Ok(Token::with_text(TokenKind::Identifier, text, self.pos)),
            keyword => Ok(Token::new(keyword, self.pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = StateMachineLexer::new(input.as_bytes(), 512);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().expect("should tokenize");
            if tok.kind == TokenKind::Eof {
                return out;
            }
            out.push(tok.kind);
        }
    }

    #[test]
    fn test_state_machine_basic() {
        assert_eq!(
            kinds("int x;"),
            vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Semicolon]
        );
    }

    #[test]
    fn test_offsets_point_past_token() {
        let mut lexer = StateMachineLexer::new(b"  abc <= 7", 512);
        assert_eq!(lexer.next_token().unwrap().offset, 5);
        assert_eq!(lexer.next_token().unwrap().offset, 8);
        assert_eq!(lexer.next_token().unwrap().offset, 10);
        assert_eq!(lexer.next_token().unwrap(), Token::new(TokenKind::Eof, 10));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("int /* c */ x; // tail\n;"),
            vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Semicolon, TokenKind::Semicolon]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let mut lexer = StateMachineLexer::new(b"/* open", 512);
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MalformedToken(_)));
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn test_slash_then_equal() {
        assert_eq!(kinds("a /= b / c"), vec![
            TokenKind::Identifier, TokenKind::SlashEqual, TokenKind::Identifier,
            TokenKind::Slash, TokenKind::Identifier,
        ]);
    }
}
