// tests/language_semantics.rs

use lox_lang::ast::TokenKind;
use lox_lang::lexer::Lexer;
use lox_lang::{RunOutcome, run};
use pretty_assertions::assert_eq;

fn print_value(expr: &str) -> String {
    let outcome = run(&format!("print {expr};"));
    assert!(
        !outcome.had_compile_error && !outcome.had_runtime_error,
        "{expr}: {:?}",
        outcome.diagnostics
    );
    outcome.outputs.join("\n")
}

fn messages(outcome: &RunOutcome) -> Vec<String> {
    outcome.diagnostics.iter().map(|d| d.message.clone()).collect()
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_multiplication_before_addition() {
    assert_eq!(print_value("1 + 2 * 3"), "7");
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(print_value("2 - 3 - 4"), "-5");
    assert_eq!(print_value("16 / 4 / 2"), "2");
}

#[test]
fn test_unary_binds_tightest() {
    assert_eq!(print_value("-2 * 3"), "-6");
    assert_eq!(print_value("!true == false"), "true");
}

// ============================================================================
// Ternary
// ============================================================================

#[test]
fn test_ternary_selects_branch() {
    assert_eq!(print_value("true ? 1 : 2"), "1");
    assert_eq!(print_value("false ? 1 : 2"), "2");
}

#[test]
fn test_ternary_evaluates_only_the_chosen_branch() {
    let outcome = run("print true ? \"ok\" : -nil;");
    assert_eq!(outcome.outputs, vec!["ok"]);
    assert!(!outcome.had_runtime_error);
}

#[test]
fn test_nested_ternary() {
    assert_eq!(print_value("false ? 1 : true ? 2 : 3"), "2");
}

// ============================================================================
// Self-Reference in Initializers
// ============================================================================

#[test]
fn test_self_reference_rejected_at_top_level() {
    let outcome = run("print \"before\"; var x = x;");
    assert!(outcome.had_compile_error);
    assert!(outcome.outputs.is_empty());
    assert_eq!(
        messages(&outcome),
        vec!["Can't read local variable in its own initializer."]
    );
}

#[test]
fn test_self_reference_rejected_despite_outer_binding() {
    let outcome = run("var x = 1; { var x = x; print x; }");
    assert!(outcome.had_compile_error);
    assert!(outcome.outputs.is_empty());
}

#[test]
fn test_outer_binding_usable_under_another_name() {
    assert_eq!(
        run("var x = 1; { var y = x + 1; print y; }").outputs,
        vec!["2"]
    );
}

// ============================================================================
// Closures
// ============================================================================

#[test]
fn test_counter_closure_shares_mutable_state() {
    let source = r#"
        fun makeCounter() {
            var n = 0;
            fun inc() { n = n + 1; return n; }
            return inc;
        }
        var c = makeCounter();
        c();
        print c();
        makeCounter();
        print c();
    "#;
    assert_eq!(run(source).outputs, vec!["2", "3"]);
}

#[test]
fn test_closure_sees_definition_scope_not_caller_scope() {
    let source = r#"
        var label = "global";
        fun show() { print label; }
        fun caller() { var label = "caller"; show(); }
        caller();
    "#;
    assert_eq!(run(source).outputs, vec!["global"]);
}

#[test]
fn test_closure_binding_is_fixed_at_resolution() {
    let source = r#"
        var a = "global";
        {
            fun showA() { print a; }
            showA();
            var a = "block";
            showA();
        }
    "#;
    assert_eq!(run(source).outputs, vec!["global", "global"]);
}

// ============================================================================
// String Interpolation
// ============================================================================

#[test]
fn test_interpolation_evaluates_embedded_expression() {
    assert_eq!(print_value("\"sum: ${1+2}\""), "sum: 3");
}

#[test]
fn test_nested_interpolation() {
    assert_eq!(print_value(r#""a${ "b${1}" }c""#), "ab1c");
}

#[test]
fn test_interpolation_reads_variables() {
    let outcome = run(r#"var who = "world"; var n = 2; print "hello ${who} x${n * 2}";"#);
    assert_eq!(outcome.outputs, vec!["hello world x4"]);
}

#[test]
fn test_escaped_interpolation_is_literal() {
    assert_eq!(print_value(r#""cost: $\{x}""#), "cost: ${x}");
}

// ============================================================================
// Native Type Checks
// ============================================================================

#[test]
fn test_floor_rejects_string_argument() {
    let outcome = run("floor(\"x\");");
    assert!(outcome.had_runtime_error);
    let message = &outcome.diagnostics[0].message;
    assert!(message.contains("Parameter 1"), "{message}");
    assert!(message.contains("number"), "{message}");
    assert_eq!(
        message,
        "Parameter 1 of 'floor' expected number but got string."
    );
}

// ============================================================================
// Logical Operators
// ============================================================================

#[test]
fn test_or_with_zero_on_the_right_yields_false() {
    assert_eq!(print_value("nil or 0"), "false");
}

#[test]
fn test_or_returns_truthy_left_operand() {
    assert_eq!(print_value("1 or 2"), "1");
    assert_eq!(print_value("0 or 2"), "0");
    assert_eq!(print_value("\"a\" or nil"), "a");
}

#[test]
fn test_or_coerces_falsy_right_operand() {
    assert_eq!(print_value("nil or \"x\""), "x");
    assert_eq!(print_value("false or nil"), "false");
    assert_eq!(print_value("nil or false"), "false");
}

#[test]
fn test_and_mirrors_or() {
    assert_eq!(print_value("nil and 1"), "false");
    assert_eq!(print_value("1 and 2"), "2");
    assert_eq!(print_value("1 and nil"), "false");
    assert_eq!(print_value("1 and 0"), "false");
}

#[test]
fn test_logical_operators_short_circuit() {
    let source = r#"
        var hit = false;
        fun mark() { hit = true; return true; }
        print true or mark();
        print false and mark();
        print hit;
    "#;
    assert_eq!(run(source).outputs, vec!["true", "false", "false"]);
}

#[test]
fn test_zero_is_truthy_in_conditions() {
    assert_eq!(print_value("0 ? \"yes\" : \"no\""), "yes");
    assert_eq!(print_value("!0"), "false");
}

// ============================================================================
// Lexer Round Trip
// ============================================================================

#[test]
fn test_lexemes_recover_significant_characters() {
    let source = "fun add(a, b) {\n  return a + b * (2 - 1);\n}\nprint add(1, 2) >= 3 and !false;";
    let scan = Lexer::new(source).scan_tokens();
    assert!(scan.errors.is_empty());

    let joined: String = scan
        .tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.lexeme.as_str())
        .collect();
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    assert_eq!(strip(&joined), strip(source));
}
