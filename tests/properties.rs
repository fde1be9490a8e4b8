//! Whole-crate property tests for the invariants, round-trip laws, and
//! concrete scenarios not already exercised by a single module's inline
//! tests.

use tclc::differentiator::differentiate_case;
use tclc::ir::{Expr, ExprKind, StmtKind};
use tclc::lexer::{lex, Token};
use tclc::parser::parse_kernel_source;
use tclc::printer::print_kernel;
use tclc::types::Type;

fn float_kernel(name: &str, ins: &[&str], outs: &[&str], source: &str) -> tclc::ir::Kernel {
    parse_kernel_source(
        name,
        Type::float_scalar(32),
        ins.iter().map(|s| (*s).to_string()).collect(),
        outs.iter().map(|s| (*s).to_string()).collect(),
        source,
    )
    .unwrap()
}

fn every_dom(kernel: &tclc::ir::Kernel, f: &mut dyn FnMut(&Expr)) {
    fn walk_stmt(s: &tclc::ir::Stmt, f: &mut dyn FnMut(&Expr)) {
        match s.kind() {
            StmtKind::LoopNest { indices, bodies } => {
                for idx in indices {
                    if let ExprKind::Index { dom, .. } = idx.kind() {
                        f(dom);
                    }
                }
                for b in bodies {
                    walk_stmt(b, f);
                }
            }
            StmtKind::IfThenElse { t, f: f_, .. } => {
                walk_stmt(t, f);
                walk_stmt(f_, f);
            }
            StmtKind::If { t, .. } => walk_stmt(t, f),
            StmtKind::Move { .. } => {}
        }
    }
    for s in &kernel.stmts {
        walk_stmt(s, f);
    }
}

/// Invariant 2 (spec.md §8): every `Dom` has `begin == 0` and `extent > 0`.
#[test]
fn every_dom_begins_at_zero_with_a_positive_extent() {
    let kernel = float_kernel(
        "matmul",
        &["B", "C"],
        &["A"],
        "A<16,32>[i,j] = B<16,32>[i,k] * C<32,32>[k,j];",
    );
    let mut checked = 0;
    every_dom(&kernel, &mut |dom| {
        if let ExprKind::Dom { begin, extent } = dom.kind() {
            assert_eq!(begin.int_value(), Some(0));
            assert!(extent.int_value().unwrap() > 0);
            checked += 1;
        } else {
            panic!("expected a Dom node");
        }
    });
    assert!(checked > 0, "no Dom nodes were visited");
}

/// Invariant 4 (spec.md §8): printing the same Kernel twice is
/// byte-identical.
#[test]
fn printer_is_deterministic() {
    let kernel = float_kernel(
        "ew",
        &["A", "B"],
        &["C"],
        "C<4,16>[i,j] = A<4,16>[i,j] * B<4,16>[i,j] + 1.0;",
    );
    assert_eq!(print_kernel(&kernel), print_kernel(&kernel));
}

/// Scenario 6 (spec.md §8): no constant folding — `+ 0` survives into
/// the printed output literally.
#[test]
fn constant_fold_irrelevance_is_not_performed() {
    let kernel = float_kernel("konst", &["A"], &["C"], "C<4>[i] = A<4>[i] + 0;");
    let code = print_kernel(&kernel);
    assert!(code.contains("C[i] = A[i] + 0;"));
}

/// Round-trip law (spec.md §8): lexing then re-joining each token's own
/// text reproduces the input modulo whitespace.
#[test]
fn lex_then_rejoin_reproduces_input_modulo_whitespace() {
    let source = "C<4,16>[i,j] = A<4,16>[i,j] * B<4,16>[i,j] + 1.0;";
    let tokens = lex(source).unwrap();
    let rejoined: String = tokens.iter().fold(String::new(), |mut acc, t| {
        match t {
            Token::Id(s) | Token::Sym(s) => acc.push_str(s),
            Token::Int(v) => acc.push_str(&v.to_string()),
            Token::Float(v) => {
                let s = v.to_string();
                acc.push_str(&s);
                if !s.contains('.') {
                    acc.push_str(".0");
                }
            }
        }
        acc
    });
    let normalized: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(rejoined, normalized);
}

/// Scenario 1 (spec.md §8): elementwise product with an additive
/// constant, end to end through the differentiator and driver Case shape.
#[test]
fn scenario_1_elementwise_product_end_to_end() {
    let gradient = differentiate_case(
        "C<4,16>[i,j] = A<4,16>[i,j] * B<4,16>[i,j] + 1.0;",
        "C",
        &["A".to_string()],
    )
    .unwrap();
    assert_eq!(gradient.kernel.trim(), "dA<4,16>[i,j] = dC<4,16>[i,j] * B<4,16>[i,j];");
}

/// Scenario 2 (spec.md §8): matmul differentiated against both operands.
#[test]
fn scenario_2_matmul_end_to_end() {
    let gradient = differentiate_case(
        "A<16,32>[i,j] = B<16,32>[i,k] * C<32,32>[k,j];",
        "A",
        &["B".to_string(), "C".to_string()],
    )
    .unwrap();
    assert!(gradient.kernel.contains("dB<16,32>[i,k] = dA<16,32>[i,j] * C<32,32>[k,j];"));
    assert!(gradient.kernel.contains("dC<32,32>[k,j] = dA<16,32>[i,j] * B<16,32>[i,k];"));
}

/// Scenario 3 (spec.md §8): transpose swap.
#[test]
fn scenario_3_transpose_end_to_end() {
    let gradient = differentiate_case(
        "B<16,32>[i,j] = A<32,16>[j,i];",
        "B",
        &["A".to_string()],
    )
    .unwrap();
    assert_eq!(gradient.kernel.trim(), "dA<32,16>[j,i] = dB<16,32>[i,j];");
}

/// Scenario 4 (spec.md §8): the differentiated kernel parses into a
/// three-level, guard-free `LoopNest`.
#[test]
fn scenario_4_differentiated_kernel_parses_with_no_guard() {
    let kernel = float_kernel(
        "matmul_grad",
        &["dA", "C"],
        &["dB"],
        "dB<16,32>[i,k] = dA<16,32>[i,j] * C<32,32>[k,j];",
    );
    match kernel.stmts[0].kind() {
        StmtKind::LoopNest { indices, bodies } => {
            assert_eq!(indices.len(), 3);
            match bodies[0].kind() {
                StmtKind::Move { .. } => {}
                other => panic!("expected a bare Move, got {other:?}"),
            }
        }
        other => panic!("expected LoopNest, got {other:?}"),
    }
}
