// tests/parser_tests.rs

use lox_lang::ast::{Expr, ExprId, Statement};
use lox_lang::lexer::Lexer;
use lox_lang::output::{TreePrinter, to_sexpr};
use lox_lang::parser::{MAX_ARGUMENTS, ParseError, Parser};
use lox_lang::precedence::OperatorTable;
use lox_lang::{StaticError, parse_expression, parse_program};
use pretty_assertions::assert_eq;

fn sexpr(source: &str) -> String {
    let expr = parse_expression(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
    to_sexpr(&expr)
}

fn program(source: &str) -> String {
    let statements = parse_program(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
    TreePrinter::new(false).print_program(&statements)
}

fn parse_errors(source: &str) -> Vec<ParseError> {
    let errors = parse_program(source).expect_err("expected parse errors");
    errors
        .into_iter()
        .map(|err| match err {
            StaticError::Parse(err) => err,
            other => panic!("expected a parse error, got {other:?}"),
        })
        .collect()
}

// ============================================================================
// Precedence and Associativity
// ============================================================================

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(sexpr("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(sexpr("1 * 2 + 3"), "(+ (* 1 2) 3)");
}

#[test]
fn test_left_associative_subtraction() {
    assert_eq!(sexpr("2 - 3 - 4"), "(- (- 2 3) 4)");
    assert_eq!(sexpr("8 / 4 / 2"), "(/ (/ 8 4) 2)");
}

#[test]
fn test_right_associative_assignment() {
    assert_eq!(sexpr("a = b = 1"), "(= a (= b 1))");
}

#[test]
fn test_comparison_and_equality_levels() {
    assert_eq!(sexpr("a < b == c > d"), "(== (< a b) (> c d))");
    assert_eq!(sexpr("a != b >= c"), "(!= a (>= b c))");
}

#[test]
fn test_logical_levels() {
    assert_eq!(sexpr("a or b and c"), "(or a (and b c))");
    assert_eq!(sexpr("a and b == c"), "(and a (== b c))");
}

#[test]
fn test_prefix_operators() {
    assert_eq!(sexpr("-a * b"), "(* (- a) b)");
    assert_eq!(sexpr("!a == b"), "(== (! a) b)");
    assert_eq!(sexpr("--a"), "(- (- a))");
}

#[test]
fn test_grouping_overrides_precedence() {
    assert_eq!(sexpr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
}

#[test]
fn test_comma_is_weakest() {
    assert_eq!(sexpr("1, 2, 3"), "(, (, 1 2) 3)");
    assert_eq!(sexpr("a = 1, b = 2"), "(, (= a 1) (= b 2))");
}

// ============================================================================
// Ternary
// ============================================================================

#[test]
fn test_ternary() {
    assert_eq!(sexpr("a ? b : c"), "(?: a b c)");
}

#[test]
fn test_ternary_is_right_associative() {
    assert_eq!(sexpr("a ? b : c ? d : e"), "(?: a b (?: c d e))");
}

#[test]
fn test_ternary_middle_is_a_full_expression() {
    assert_eq!(sexpr("a ? b, c : d"), "(?: a (, b c) d)");
}

#[test]
fn test_ternary_binds_looser_than_or() {
    assert_eq!(sexpr("a or b ? c : d"), "(?: (or a b) c d)");
    assert_eq!(sexpr("x = a ? b : c"), "(= x (?: a b c))");
}

#[test]
fn test_ternary_requires_colon() {
    let errors = parse_errors("print a ? b;");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "Expect ':' in ternary expression.");
}

// ============================================================================
// Postfix: Calls and Indexing
// ============================================================================

#[test]
fn test_call_arguments_are_not_comma_expressions() {
    assert_eq!(sexpr("f(a, b)"), "(call f a b)");
    assert_eq!(sexpr("f((a, b))"), "(call f (group (, a b)))");
    assert_eq!(sexpr("f()"), "(call f)");
}

#[test]
fn test_chained_calls_and_indexing() {
    assert_eq!(sexpr("f(1)(2)"), "(call (call f 1) 2)");
    assert_eq!(sexpr("a[1][2]"), "(index (index a 1) 2)");
    assert_eq!(sexpr("split(s, \",\")[0]"), "(index (call split s \",\") 0)");
}

#[test]
fn test_postfix_binds_tighter_than_prefix() {
    assert_eq!(sexpr("-a[0]"), "(- (index a 0))");
    assert_eq!(sexpr("!f()"), "(! (call f))");
}

#[test]
fn test_argument_ceiling() {
    let args = vec!["1"; MAX_ARGUMENTS + 1].join(", ");
    let errors = parse_errors(&format!("f({args});"));
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ParseError::TooManyArguments { .. }));
}

#[test]
fn test_argument_ceiling_allows_the_maximum() {
    let args = vec!["1"; MAX_ARGUMENTS].join(", ");
    assert!(parse_program(&format!("f({args});")).is_ok());
}

// ============================================================================
// Strings and Templates
// ============================================================================

#[test]
fn test_plain_string_is_a_literal() {
    let expr = parse_expression("\"hello\"").unwrap();
    assert!(matches!(expr, Expr::Literal(_)));
    assert_eq!(to_sexpr(&expr), "\"hello\"");
}

#[test]
fn test_template_parts() {
    assert_eq!(
        sexpr("\"sum: ${1 + 2}\""),
        "(template \"sum: \" (${} (+ 1 2)) \"\")"
    );
}

#[test]
fn test_nested_template() {
    assert_eq!(
        sexpr(r#""a${ "b${1}" }c""#),
        "(template \"a\" (${} (template \"b\" (${} 1) \"\")) \"c\")"
    );
}

#[test]
fn test_template_operand_of_binary() {
    assert_eq!(
        sexpr("\"${x}\" + \"y\""),
        "(+ (template \"\" (${} x) \"\") \"y\")"
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_var_declarations() {
    assert_eq!(program("var a; var b = 1;"), "(var a)\n(var b 1)");
}

#[test]
fn test_if_else() {
    assert_eq!(
        program("if (a) print 1; else print 2;"),
        "(if a (print 1) (print 2))"
    );
    assert_eq!(program("if (a) b();"), "(if a (expr (call b)))");
}

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    assert_eq!(
        program("if (a) if (b) print 1; else print 2;"),
        "(if a (if b (print 1) (print 2)))"
    );
}

#[test]
fn test_while_and_loop_control() {
    assert_eq!(
        program("while (x) { continue; break; }"),
        "(while x (block continue break))"
    );
}

#[test]
fn test_for_desugars_to_while_with_increment() {
    assert_eq!(
        program("for (var i = 0; i < 3; i = i + 1) print i;"),
        "(block (var i 0) (while (< i 3) (print i) (= i (+ i 1))))"
    );
}

#[test]
fn test_for_with_empty_clauses() {
    assert_eq!(program("for (;;) break;"), "(while true break)");
    assert_eq!(
        program("for (i = 0; ; ) print i;"),
        "(block (expr (= i 0)) (while true (print i)))"
    );
}

#[test]
fn test_function_declaration() {
    assert_eq!(
        program("fun add(a, b) { return a + b; }"),
        "(fun add (params a b) (return (+ a b)))"
    );
    assert_eq!(program("fun noop() { return; }"), "(fun noop params return)");
}

#[test]
fn test_empty_function_declaration() {
    let statements = parse_program("fun f() {}").unwrap();
    let Statement::Function(decl) = &statements[0] else {
        panic!("expected a function declaration");
    };
    assert_eq!(decl.name.lexeme, "f");
    assert!(decl.params.is_empty());
    assert!(decl.body.is_empty());
}

// ============================================================================
// Node Identity
// ============================================================================

#[test]
fn test_expression_ids_continue_from_first_id() {
    let table = OperatorTable::standard();
    let tokens = Lexer::new("a = b;").scan_tokens().tokens;
    let mut parser = Parser::new(tokens, &table).with_first_id(ExprId(10));
    let statements = parser.parse().unwrap();

    let Statement::Expression(Expr::Assign { id, value, .. }) = &statements[0] else {
        panic!("expected an assignment");
    };
    let Expr::Variable { id: value_id, .. } = value.as_ref() else {
        panic!("expected a variable");
    };
    assert_eq!(*value_id, ExprId(11));
    assert_eq!(*id, ExprId(12));
    assert_eq!(parser.next_id(), ExprId(13));
}

// ============================================================================
// Errors and Recovery
// ============================================================================

#[test]
fn test_invalid_assignment_target() {
    let errors = parse_errors("1 = 2;");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ParseError::InvalidAssignmentTarget { .. }));

    let errors = parse_errors("(a) = 2;");
    assert!(matches!(errors[0], ParseError::InvalidAssignmentTarget { .. }));
}

#[test]
fn test_missing_semicolon() {
    let errors = parse_errors("print 1");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "Expect ';' after value.");
}

#[test]
fn test_recovery_reports_independent_errors() {
    let errors = parse_errors("print ; var = 1; print 2; print (3;");
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ParseError::UnexpectedToken { .. }));
    assert_eq!(errors[1].to_string(), "Expect variable name.");
    assert_eq!(errors[2].to_string(), "Expect ')' after expression.");
    assert_eq!(errors[1].location().column, 13);
}

#[test]
fn test_recovery_inside_block() {
    let errors = parse_errors("{ var x = ; print x; } print 1 +;");
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_reserved_keywords_are_rejected() {
    let errors = parse_errors("class Point {}");
    assert!(matches!(errors[0], ParseError::Unsupported { .. }));
    assert_eq!(errors[0].to_string(), "Classes are not supported.");

    let errors = parse_errors("print this;");
    assert!(matches!(errors[0], ParseError::Unsupported { .. }));
}

#[test]
fn test_parse_expression_rejects_trailing_tokens() {
    let errors = parse_expression("1 2").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        StaticError::Parse(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_unterminated_block() {
    let errors = parse_errors("{ print 1;");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "Expect '}' at end of block.");
}
