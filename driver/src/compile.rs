use std::fs;
use std::path::PathBuf;

use lexer::{Lexer, LexerOptions};
use log::info;
use model::{CompileResult, TokenKind};

/// Where the pipeline stops and what it prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Resolve,
    Image,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub lexer: LexerOptions,
    pub stage: Stage,
    pub output: PathBuf,
}

/// Run the pipeline on one source buffer. Text for the stage dumps and the
/// missing entry warning is written to `out`.
pub fn compile(source: &[u8], options: &CompileOptions, out: &mut String) -> CompileResult<()> {
    if options.stage == Stage::Lex {
        return dump_tokens(source, options.lexer, out);
    }

    let program = parser::parse(source, options.lexer)?;
    if options.stage == Stage::Parse {
        out.push_str(&format!("{}\n", program));
        return Ok(());
    }

    let mut tree = semantic::resolve(&program)?;
    if options.stage == Stage::Resolve {
        out.push_str(&tree.to_string());
        return Ok(());
    }

    let generated = codegen::generate(&program, &tree)?;
    tree.bind_code_offsets(&generated.functions);
    let image = image::build_image(&generated.data, &generated.code, &tree)?;
    if !image.entry_found {
        out.push_str(&format!(
            "Warning: no {} function, using default entry point {:#x}\n",
            model::target::ENTRY_SYMBOL,
            image.entry
        ));
    }

    write_executable(&options.output, &image.bytes)?;
    info!("wrote {} ({} bytes)", options.output.display(), image.bytes.len());
    Ok(())
}

fn dump_tokens(source: &[u8], options: LexerOptions, out: &mut String) -> CompileResult<()> {
    let mut lexer = Lexer::new(source, options);
    loop {
        let token = lexer.next_token()?;
        match (&token.kind, &token.text) {
            (TokenKind::Eof, _) => return Ok(()),
            (_, Some(_)) => out.push_str(&format!("token: {}\n", token.text())),
            (kind, None) => out.push_str(&format!("token type: {:?}\n", kind)),
        }
    }
}

fn write_executable(path: &PathBuf, bytes: &[u8]) -> CompileResult<()> {
    fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(stage: Stage, output: PathBuf) -> CompileOptions {
        CompileOptions { lexer: LexerOptions::default(), stage, output }
    }

    #[test]
    fn token_dump_lines() {
        let mut out = String::new();
        compile(b"int x = 5;", &options(Stage::Lex, PathBuf::new()), &mut out).unwrap();
        assert_eq!(
            out,
            "token type: Int\ntoken: x\ntoken type: Equal\ntoken: 5\ntoken type: Semicolon\n"
        );
    }

    #[test]
    fn parse_dump_is_s_expression() {
        let mut out = String::new();
        let src = b"int main() { return 1; }";
        compile(src, &options(Stage::Parse, PathBuf::new()), &mut out).unwrap();
        assert_eq!(out, "(Block (Function main (Int) (Block (Return (IntLiteral 1)))))\n");
    }

    #[test]
    fn resolve_dump_lists_symbols() {
        let mut out = String::new();
        let src = b"int g; int f(int a) { int x; return a; }";
        compile(src, &options(Stage::Resolve, PathBuf::new()), &mut out).unwrap();
        assert!(out.starts_with("scope global"));
        assert!(out.contains("a: Int @ stack+8"));
        assert!(out.contains("x: Int @ stack-4"));
    }

    #[test]
    fn errors_leave_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        let mut out = String::new();
        let err = compile(b"int _start() { return y; }", &options(Stage::Image, path.clone()), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("At position"));
        assert!(!path.exists());
    }
}
