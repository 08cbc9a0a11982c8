// Parser module: pulls tokens from the lexer and builds the syntax tree
//
// Module organization:
// - parser.rs: Core Parser struct, token helpers and top-level items (globals, functions)
// - types.rs: Type parsing (int, char, void and pointers to them)
// - expressions.rs: Flat right-associative expression parsing
// - statements.rs: Statement parsing (blocks, if, while, return, etc.)

mod parser;
mod types;
mod expressions;
mod statements;

use lexer::{Lexer, LexerOptions};
use model::{CompileResult, Node};
use parser::Parser;

pub use parser::MAX_NESTING_DEPTH;

/// Parse a source buffer into the program root.
///
/// # Returns
/// * `Ok(Node)` - a `Block` whose children are the top-level `Decl` and `Function` nodes
/// * `Err(CompileError)` - the first lexical or syntax error, with its stream offset
pub fn parse(input: &[u8], options: LexerOptions) -> CompileResult<Node> {
    let mut parser = Parser::new(Lexer::new(input, options));
    parser.parse_program()
}

pub fn parse_source(src: &str) -> CompileResult<Node> {
    parse(src.as_bytes(), LexerOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ErrorKind, ExprKind, NodeKind, StmtKind};

    fn function_body(src: &str) -> Node {
        let program = parse_source(src).unwrap();
        let func = program.children.last().unwrap();
        func.function_parts().unwrap().body.unwrap().clone()
    }

    /// Parse `src` as the only statement of a function and render the expression.
    fn expr(src: &str) -> String {
        let body = function_body(&format!("int f() {{ {}; }}", src));
        assert_eq!(body.children[0].stmt_kind(), Some(&StmtKind::Expr));
        body.children[0].children[0].to_string()
    }

    fn err_kind(src: &str) -> (ErrorKind, usize) {
        let err = parse_source(src).unwrap_err();
        (err.kind, err.offset)
    }

    #[test]
    fn parse_simple_main() {
        let program = parse_source("int main(){ return 1; }").unwrap();
        assert_eq!(
            program.to_string(),
            "(Block (Function main (Int) (Block (Return (IntLiteral 1)))))"
        );
    }

    #[test]
    fn parse_empty_program() {
        let program = parse_source("  ").unwrap();
        assert!(program.is_block());
        assert!(program.children.is_empty());
    }

    #[test]
    fn parse_globals() {
        let program = parse_source("int g = 5; char *s; int **pp;").unwrap();
        assert_eq!(
            program.to_string(),
            "(Block (Decl g (Int) (IntLiteral 5)) (Decl s (Pointer (Char))) \
             (Decl pp (Pointer (Pointer (Int)))))"
        );
    }

    #[test]
    fn parse_function_params() {
        let program = parse_source("int add(int a, char *b) { return a; }").unwrap();
        let parts = program.children[0].function_parts().unwrap();
        assert_eq!(parts.name, "add");
        let names: Vec<&str> = parts.arguments.iter().filter_map(|a| a.argument_name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parts.arguments[1].children[0].to_string(), "(Pointer (Char))");
    }

    #[test]
    fn parse_forward_declaration_then_definition() {
        let program = parse_source("int f(int a); int f(int a) { return a; }").unwrap();
        assert_eq!(program.children.len(), 2);
        assert!(program.children[0].function_parts().unwrap().body.is_none());
        assert!(program.children[1].function_parts().unwrap().body.is_some());
    }

    // ─── Expression tests ───────────────────────────────────────
    #[test]
    fn operators_associate_to_the_right() {
        assert_eq!(
            expr("a - b - c"),
            "(Subtract (Ident a) (Subtract (Ident b) (Ident c)))"
        );
        assert_eq!(
            expr("1 * 2 + 3"),
            "(Multiply (IntLiteral 1) (Add (IntLiteral 2) (IntLiteral 3)))"
        );
        assert_eq!(
            expr("a && b | c == d"),
            "(LogicalAnd (Ident a) (BitOr (Ident b) (Equal (Ident c) (Ident d))))"
        );
    }

    /// How each binary operator is expected to appear in the tree.
    #[derive(Clone, Copy)]
    enum Shape {
        Plain(&'static str),
        Negated(&'static str),
        Assign,
        Compound(&'static str),
    }

    const OPERATORS: &[(&str, Shape)] = &[
        ("+", Shape::Plain("Add")),
        ("-", Shape::Plain("Subtract")),
        ("*", Shape::Plain("Multiply")),
        ("/", Shape::Plain("Divide")),
        ("%", Shape::Plain("Modulo")),
        ("<", Shape::Plain("Less")),
        (">", Shape::Plain("Greater")),
        ("==", Shape::Plain("Equal")),
        ("&&", Shape::Plain("LogicalAnd")),
        ("||", Shape::Plain("LogicalOr")),
        ("&", Shape::Plain("BitAnd")),
        ("|", Shape::Plain("BitOr")),
        ("^", Shape::Plain("BitXor")),
        ("<=", Shape::Negated("Greater")),
        (">=", Shape::Negated("Less")),
        ("!=", Shape::Negated("Equal")),
        ("=", Shape::Assign),
        ("+=", Shape::Compound("Add")),
        ("-=", Shape::Compound("Subtract")),
        ("*=", Shape::Compound("Multiply")),
        ("/=", Shape::Compound("Divide")),
        ("%=", Shape::Compound("Modulo")),
        ("&=", Shape::Compound("BitAnd")),
        ("|=", Shape::Compound("BitOr")),
        ("^=", Shape::Compound("BitXor")),
    ];

    fn render(shape: Shape, lhs: &str, rhs: &str) -> String {
        match shape {
            Shape::Plain(name) => format!("({} {} {})", name, lhs, rhs),
            Shape::Negated(name) => format!("(Not ({} {} {}))", name, lhs, rhs),
            Shape::Assign => format!("(Assign {} {})", lhs, rhs),
            Shape::Compound(name) => format!("(Assign {} ({} {} {}))", lhs, name, lhs, rhs),
        }
    }

    #[test]
    fn every_operator_pair_nests_to_the_right() {
        for &(first, first_shape) in OPERATORS {
            for &(second, second_shape) in OPERATORS {
                let inner = render(second_shape, "(Ident b)", "(Ident c)");
                let expected = render(first_shape, "(Ident a)", &inner);
                assert_eq!(
                    expr(&format!("a {} b {} c", first, second)),
                    expected,
                    "a {} b {} c",
                    first,
                    second
                );
            }
        }
    }

    #[test]
    fn operator_chains_nest_to_the_right() {
        let ops = ["-", "<=", "*=", "|", "!=", "=", "%", "^="];
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let mut src = names[0].to_string();
        for (op, name) in ops.iter().zip(&names[1..]) {
            src.push_str(&format!(" {} {}", op, name));
        }
        let mut expected = format!("(Ident {})", names[ops.len()]);
        for i in (0..ops.len()).rev() {
            let shape = OPERATORS.iter().find(|(text, _)| *text == ops[i]).unwrap().1;
            expected = render(shape, &format!("(Ident {})", names[i]), &expected);
        }
        assert_eq!(expr(&src), expected);
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(
            expr("(a - b) - c"),
            "(Subtract (Subtract (Ident a) (Ident b)) (Ident c))"
        );
    }

    #[test]
    fn compound_assignment_matches_expanded_form() {
        for op in ["+", "-", "*", "/", "%", "&", "|", "^"] {
            assert_eq!(expr(&format!("x {}= 1", op)), expr(&format!("x = x {} 1", op)));
        }
        assert_eq!(
            expr("*p += 2"),
            "(Assign (Deref (Ident p)) (Add (Deref (Ident p)) (IntLiteral 2)))"
        );
    }

    #[test]
    fn negated_comparisons_are_rewritten() {
        assert_eq!(expr("a <= b"), "(Not (Greater (Ident a) (Ident b)))");
        assert_eq!(expr("a >= b"), "(Not (Less (Ident a) (Ident b)))");
        assert_eq!(expr("a != b"), "(Not (Equal (Ident a) (Ident b)))");
    }

    #[test]
    fn unary_operators_bind_to_a_primary() {
        assert_eq!(expr("*p = 1"), "(Assign (Deref (Ident p)) (IntLiteral 1))");
        assert_eq!(expr("-x + 1"), "(Add (Negate (Ident x)) (IntLiteral 1))");
        assert_eq!(expr("!~a"), "(Not (BitNot (Ident a)))");
        assert_eq!(expr("&x"), "(AddressOf (Ident x))");
        assert_eq!(expr("++i"), "(Increment (Ident i))");
        assert_eq!(expr("--*p"), "(Decrement (Deref (Ident p)))");
    }

    #[test]
    fn literals() {
        assert_eq!(expr("'A'"), "(CharLiteral 65)");
        assert_eq!(expr("'\\n'"), "(CharLiteral 10)");
        assert_eq!(expr("\"hi\\n\""), "(StringLiteral \"hi\\n\")");
        assert_eq!(expr("4294967295"), "(IntLiteral -1)");
    }

    #[test]
    fn literals_keep_non_utf8_bytes() {
        let src = b"int f() { g(\"\xe9t\xe9\", '\xff'); }";
        let program = parse(src, LexerOptions::default()).unwrap();
        let body = program.children[0].function_parts().unwrap().body.unwrap();
        let call = &body.children[0].children[0];
        assert_eq!(
            call.children[1].expr_kind(),
            Some(&ExprKind::StringLiteral(vec![0xE9, b't', 0xE9]))
        );
        assert_eq!(call.children[2].expr_kind(), Some(&ExprKind::CharLiteral(0xFF)));
    }

    #[test]
    fn calls_with_arguments() {
        assert_eq!(expr("f()"), "(Call (Ident f))");
        assert_eq!(
            expr("f(1, x, g(y))"),
            "(Call (Ident f) (IntLiteral 1) (Ident x) (Call (Ident g) (Ident y)))"
        );
    }

    // ─── Statement tests ────────────────────────────────────────
    #[test]
    fn branch_bodies_are_wrapped_in_blocks() {
        let body = function_body("int f() { if (x) y = 1; else ; while (x) break; }");
        assert_eq!(
            body.children[0].to_string(),
            "(If (Ident x) (Block (Expr (Assign (Ident y) (IntLiteral 1)))) (Block (Empty)))"
        );
        assert_eq!(body.children[1].to_string(), "(While (Ident x) (Block (Break)))");
    }

    #[test]
    fn explicit_blocks_are_not_rewrapped() {
        let body = function_body("int f() { if (x) { continue; } }");
        assert_eq!(body.children[0].to_string(), "(If (Ident x) (Block (Continue)))");
    }

    #[test]
    fn local_declarations_and_returns() {
        let body = function_body("void f() { int x = 3; { char c; } return; }");
        assert_eq!(
            body.to_string(),
            "(Block (Decl x (Int) (IntLiteral 3)) (Block (Decl c (Char))) (Return))"
        );
    }

    // ─── Error tests ────────────────────────────────────────────
    #[test]
    fn invalid_lvalue_reports_operator_offset() {
        assert_eq!(err_kind("int f(){ 1 = 2; }"), (ErrorKind::InvalidLvalue, 12));
        assert_eq!(err_kind("int f(){ (a + b) += 2; }").0, ErrorKind::InvalidLvalue);
        assert_eq!(err_kind("int f(){ ++3; }").0, ErrorKind::InvalidLvalue);
    }

    #[test]
    fn bad_function_body() {
        let (kind, offset) = err_kind("int f() return 1;");
        assert!(matches!(kind, ErrorKind::UnexpectedToken { .. }));
        assert_eq!(offset, 14);
    }

    #[test]
    fn missing_semicolon_and_brace() {
        assert!(matches!(err_kind("int x").0, ErrorKind::UnexpectedToken { .. }));
        match err_kind("int f() { return 1;").0 {
            ErrorKind::UnexpectedToken { expected, found } => {
                assert_eq!(expected, "'}'");
                assert_eq!(found, "end of input");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn missing_type_at_top_level() {
        let (kind, offset) = err_kind("x = 1;");
        assert!(matches!(kind, ErrorKind::UnexpectedToken { .. }));
        assert_eq!(offset, 1);
    }

    #[test]
    fn lexer_errors_propagate() {
        assert!(matches!(err_kind("int f() { return $; }").0, ErrorKind::MalformedToken(_)));
    }

    #[test]
    fn function_node_offset_is_the_name() {
        let program = parse_source("int main() {}").unwrap();
        assert_eq!(program.children[0].kind, NodeKind::Function("main".to_string()));
        assert_eq!(program.children[0].offset, 8);
    }

    // ─── Nesting limit ──────────────────────────────────────────
    /// Parse on a thread with room for the deepest accepted nesting.
    fn parse_deep(src: String) -> CompileResult<Node> {
        std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(move || parse_source(&src))
            .unwrap()
            .join()
            .unwrap()
    }

    fn nesting_error(src: String) -> ErrorKind {
        parse_deep(src).unwrap_err().kind
    }

    #[test]
    fn long_operator_chain_is_rejected() {
        let src = format!("int f() {{ return {}1; }}", "1+".repeat(50_000));
        assert_eq!(nesting_error(src), ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
    }

    #[test]
    fn chain_below_the_limit_is_accepted() {
        let src = format!("int f() {{ return {}1; }}", "1+".repeat(MAX_NESTING_DEPTH - 10));
        assert!(parse_deep(src).is_ok());
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let depth = 100_000;
        let src = format!("int f() {{ return {}1{}; }}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(nesting_error(src), ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
    }

    #[test]
    fn deep_unary_and_blocks_are_rejected() {
        let unary = format!("int f() {{ return {}1; }}", "- ".repeat(5_000));
        assert_eq!(nesting_error(unary), ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
        let blocks = format!("int f() {{ {}{} }}", "{".repeat(5_000), "}".repeat(5_000));
        assert_eq!(nesting_error(blocks), ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
        let ifs = format!("int f() {{ {}return 1; }}", "if (1) ".repeat(5_000));
        assert_eq!(nesting_error(ifs), ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
    }
}
