/// Translate the character following a backslash. Only `\n` and `\t` are
/// escapes; anything else stands for itself.
pub fn escape_char(c: u8) -> u8 {
    match c {
        b'n' => b'\n',
        b't' => b'\t',
        other => other,
    }
}

/// Parse the text of an integer literal token into a 32-bit value.
///
/// Literals up to `u32::MAX` are accepted and wrap into the signed range, the
/// way a 4-byte immediate would hold them.
pub fn parse_int_literal(text: &str) -> Result<i32, String> {
    text.parse::<u32>()
        .map(|v| v as i32)
        .map_err(|_| format!("integer literal out of range: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_newline_and_tab() {
        assert_eq!(escape_char(b'n'), b'\n');
        assert_eq!(escape_char(b't'), b'\t');
    }

    #[test]
    fn other_escapes_pass_through() {
        assert_eq!(escape_char(b'"'), b'"');
        assert_eq!(escape_char(b'\\'), b'\\');
        assert_eq!(escape_char(b'r'), b'r');
        assert_eq!(escape_char(b'0'), b'0');
    }

    #[test]
    fn int_literal_values() {
        assert_eq!(parse_int_literal("0").unwrap(), 0);
        assert_eq!(parse_int_literal("42").unwrap(), 42);
        assert_eq!(parse_int_literal("4294967295").unwrap(), -1);
    }

    #[test]
    fn int_literal_overflow() {
        assert!(parse_int_literal("4294967296").is_err());
    }
}
