use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Every condition that stops a compilation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("Token exceeds the maximum length of {0} bytes")]
    TokenTooLong(usize),
    #[error("Token pushback buffer already holds a token")]
    PushbackOverflow,
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Nesting exceeds the maximum depth of {0} levels")]
    NestingTooDeep(usize),
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),
    #[error("Invalid lvalue in assignment")]
    InvalidLvalue,
    #[error("Duplicate symbol: {0}")]
    DuplicateSymbol(String),
    #[error("Symbol table full: more than {0} symbols in one scope")]
    ScopeFull(usize),
    #[error("Variable declared void: {0}")]
    VoidVariable(String),
    #[error("Undefined symbol: {0}")]
    UndefinedSymbol(String),
    #[error("Not a function: {0}")]
    NotAFunction(String),
    #[error("Function {name} expects {expected} arguments, got {found}")]
    ArgumentCount { name: String, expected: usize, found: usize },
    #[error("Function declared but never defined: {0}")]
    UndefinedFunction(String),
    #[error("Invalid dereference of a non-pointer value")]
    InvalidDereference,
    #[error("Invalid initializer for {0}")]
    InvalidInitializer(String),
    #[error("'break' statement not within a loop")]
    BreakOutsideLoop,
    #[error("'continue' statement not within a loop")]
    ContinueOutsideLoop,
    #[error("Image too large: {0} bytes")]
    ImageTooLarge(usize),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Internal compiler error: {0}")]
    Internal(String),
}

/// A fatal diagnostic anchored at a stream byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}\nAt position {offset} of input")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl CompileError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::new(ErrorKind::Io(err.to_string()), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset() {
        let err = CompileError::new(ErrorKind::InvalidLvalue, 17);
        assert_eq!(err.to_string(), "Invalid lvalue in assignment\nAt position 17 of input");
    }

    #[test]
    fn display_unexpected_token() {
        let err = CompileError::new(
            ErrorKind::UnexpectedToken { expected: "';'".to_string(), found: "'}'".to_string() },
            3,
        );
        assert!(err.to_string().starts_with("Unexpected token: expected ';', found '}'"));
    }
}
