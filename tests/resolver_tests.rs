// tests/resolver_tests.rs

use std::collections::HashMap;

use lox_lang::ast::{Expr, ExprId, Statement};
use lox_lang::parse_program;
use lox_lang::resolver::{Resolution, ResolveError, Resolved, Resolver, ScopeFrame};
use pretty_assertions::assert_eq;

fn resolve(source: &str) -> Result<Resolved, Vec<ResolveError>> {
    let program = parse_program(source).expect("source should parse");
    Resolver::new().resolve(&program)
}

/// Collects `name -> id` for every variable read, in source order.
fn variable_ids(statements: &[Statement]) -> Vec<(String, ExprId)> {
    fn walk_expr(expr: &Expr, out: &mut Vec<(String, ExprId)>) {
        match expr {
            Expr::Variable { id, name } => out.push((name.lexeme.clone(), *id)),
            Expr::Assign { value, .. } => walk_expr(value, out),
            Expr::Unary { right, .. } => walk_expr(right, out),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                walk_expr(left, out);
                walk_expr(right, out);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                walk_expr(callee, out);
                arguments.iter().for_each(|arg| walk_expr(arg, out));
            }
            Expr::Grouping(inner) | Expr::TemplateLiteral(inner) => walk_expr(inner, out),
            _ => {}
        }
    }

    fn walk_stmt(stmt: &Statement, out: &mut Vec<(String, ExprId)>) {
        match stmt {
            Statement::Expression(expr) | Statement::Print(expr) => walk_expr(expr, out),
            Statement::Var {
                initializer: Some(expr),
                ..
            } => walk_expr(expr, out),
            Statement::Block(statements) => statements.iter().for_each(|s| walk_stmt(s, out)),
            Statement::Function(decl) => decl.body.iter().for_each(|s| walk_stmt(s, out)),
            Statement::Return {
                value: Some(expr), ..
            } => walk_expr(expr, out),
            _ => {}
        }
    }

    let mut out = Vec::new();
    statements.iter().for_each(|s| walk_stmt(s, &mut out));
    out
}

fn resolutions_by_name(source: &str) -> Vec<(String, Option<Resolution>)> {
    let program = parse_program(source).expect("source should parse");
    let resolved = Resolver::new().resolve(&program).expect("source should resolve");
    let table: HashMap<ExprId, Resolution> = resolved.resolutions;
    variable_ids(&program)
        .into_iter()
        .map(|(name, id)| (name, table.get(&id).copied()))
        .collect()
}

fn at(distance: usize, slot: usize) -> Option<Resolution> {
    Some(Resolution { distance, slot })
}

// ============================================================================
// Slot Assignment
// ============================================================================

#[test]
fn test_globals_get_sequential_slots() {
    assert_eq!(
        resolutions_by_name("var a = 1; var b = 2; print b; print a;"),
        vec![("b".to_string(), at(0, 1)), ("a".to_string(), at(0, 0))]
    );
}

#[test]
fn test_block_scope_distance() {
    assert_eq!(
        resolutions_by_name("var a = 1; { var b = 2; { print a; print b; } }"),
        vec![("a".to_string(), at(2, 0)), ("b".to_string(), at(1, 0))]
    );
}

#[test]
fn test_shadowing_uses_innermost() {
    assert_eq!(
        resolutions_by_name("var a = 1; { var a = 2; print a; } print a;"),
        vec![("a".to_string(), at(0, 0)), ("a".to_string(), at(0, 0))]
    );
}

#[test]
fn test_redeclaration_gets_a_fresh_slot() {
    assert_eq!(
        resolutions_by_name("var a = 1; var a = 2; print a;"),
        vec![("a".to_string(), at(0, 1))]
    );
}

#[test]
fn test_parameters_are_leading_slots() {
    assert_eq!(
        resolutions_by_name("fun f(x, y) { var z = 3; print y; print z; }"),
        vec![("y".to_string(), at(0, 1)), ("z".to_string(), at(0, 2))]
    );
}

#[test]
fn test_function_name_visible_in_own_body() {
    assert_eq!(
        resolutions_by_name("fun fact(n) { return fact(n); }"),
        vec![("fact".to_string(), at(1, 0)), ("n".to_string(), at(0, 0))]
    );
}

#[test]
fn test_closure_reaches_enclosing_function_scope() {
    let source = "fun outer() { var n = 0; fun inner() { return n; } return inner; }";
    assert_eq!(
        resolutions_by_name(source),
        vec![("n".to_string(), at(1, 0)), ("inner".to_string(), at(0, 1))]
    );
}

#[test]
fn test_unknown_names_stay_unresolved() {
    assert_eq!(
        resolutions_by_name("print clock(); print later;"),
        vec![("clock".to_string(), None), ("later".to_string(), None)]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_self_reference_at_top_level() {
    let errors = resolve("var x = x;").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Can't read local variable in its own initializer."
    );
}

#[test]
fn test_self_reference_in_block_despite_outer_binding() {
    let errors = resolve("var x = 1; { var x = x + 1; }").unwrap_err();
    assert!(matches!(
        &errors[0],
        ResolveError::SelfReference { name, .. } if name == "x"
    ));
}

#[test]
fn test_self_reference_reported_at_the_use() {
    let errors = resolve("{\n  var value = 1 + value;\n}").unwrap_err();
    let location = errors[0].location();
    assert_eq!((location.line, location.column), (2, 19));
}

#[test]
fn test_return_outside_function() {
    let errors = resolve("return 1;").unwrap_err();
    assert!(matches!(errors[0], ResolveError::TopLevelReturn { .. }));
    assert!(resolve("fun f() { if (true) return 1; }").is_ok());
}

#[test]
fn test_all_errors_are_collected() {
    let errors = resolve("var a = a; return; { var b = b; }").unwrap_err();
    assert_eq!(errors.len(), 3);
}

// ============================================================================
// Persistent Top-Level Scope
// ============================================================================

#[test]
fn test_globals_carry_over_between_programs() {
    let first = resolve("var a = 1; fun f() {}").unwrap();
    assert_eq!(first.globals.len(), 2);
    assert_eq!(first.globals.slot_of("f"), Some(1));

    let program = parse_program("print a; var c = 3;").unwrap();
    let second = Resolver::with_globals(first.globals).resolve(&program).unwrap();
    assert_eq!(second.globals.len(), 3);
    assert_eq!(second.globals.slot_of("c"), Some(2));
    assert_eq!(second.resolutions.values().copied().collect::<Vec<_>>(), vec![
        Resolution {
            distance: 0,
            slot: 0
        }
    ]);
}

#[test]
fn test_empty_frame() {
    let frame = ScopeFrame::default();
    assert!(frame.is_empty());
    assert_eq!(frame.slot_of("x"), None);
}
