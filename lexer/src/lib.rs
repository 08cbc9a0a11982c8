mod keywords;
mod literals;
mod state_machine;

use log::trace;
use model::{CompileError, CompileResult, ErrorKind, Token, TokenKind};
use state_machine::StateMachineLexer;

pub use literals::{escape_char, parse_int_literal};

/// Longest identifier or literal accepted unless configured otherwise.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 512;

#[derive(Debug, Clone, Copy)]
pub struct LexerOptions {
    pub max_token_len: usize,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self { max_token_len: DEFAULT_MAX_TOKEN_LEN }
    }
}

/// Pull-driven token stream with a single token of pushback.
pub struct Lexer<'a> {
    scanner: StateMachineLexer<'a>,
    pushback: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8], options: LexerOptions) -> Self {
        Self {
            scanner: StateMachineLexer::new(input, options.max_token_len),
            pushback: None,
        }
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        if let Some(token) = self.pushback.take() {
            return Ok(token);
        }
        let token = self.scanner.next_token()?;
        trace!("token {:?} at {}", token.kind, token.offset);
        Ok(token)
    }

    /// Return a token to the stream. Only one token can be held at a time.
    pub fn push_back(&mut self, token: Token) -> CompileResult<()> {
        if self.pushback.is_some() {
            return Err(CompileError::new(ErrorKind::PushbackOverflow, self.position()));
        }
        self.pushback = Some(token);
        Ok(())
    }

    /// Look at the next token without consuming it. Uses the pushback slot.
    pub fn peek(&mut self) -> CompileResult<Token> {
        let token = self.next_token()?;
        self.push_back(token.clone())?;
        Ok(token)
    }

    /// Current byte offset of the underlying input.
    pub fn position(&self) -> usize {
        self.scanner.position()
    }
}

/// Lex a whole input into a token list, not including the end-of-input token.
pub fn lex(input: &str) -> CompileResult<Vec<Token>> {
    lex_with(input.as_bytes(), LexerOptions::default())
}

pub fn lex_with(input: &[u8], options: LexerOptions) -> CompileResult<Vec<Token>> {
    let mut lexer = Lexer::new(input, options);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        if token.kind == TokenKind::Eof {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}
