use model::TokenKind;

/// Classify a complete identifier run. Keywords match exactly, never by prefix.
pub fn keyword_or_identifier(text: &[u8]) -> TokenKind {
    match text {
        b"int" => TokenKind::Int,
        b"char" => TokenKind::Char,
        b"void" => TokenKind::Void,
        b"if" => TokenKind::If,
        b"else" => TokenKind::Else,
        b"while" => TokenKind::While,
        b"continue" => TokenKind::Continue,
        b"break" => TokenKind::Break,
        b"return" => TokenKind::Return,
        _ => TokenKind::Identifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_exactly() {
        assert_eq!(keyword_or_identifier(b"int"), TokenKind::Int);
        assert_eq!(keyword_or_identifier(b"while"), TokenKind::While);
        assert_eq!(keyword_or_identifier(b"integer"), TokenKind::Identifier);
        assert_eq!(keyword_or_identifier(b"in"), TokenKind::Identifier);
        assert_eq!(keyword_or_identifier(b"returns"), TokenKind::Identifier);
        assert_eq!(keyword_or_identifier(b"_if"), TokenKind::Identifier);
    }
}
