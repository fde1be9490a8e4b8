//! # Printer
//!
//! Walks a [`Kernel`](crate::ir::Kernel) and emits a C-compatible
//! function body: one parameter per distinct input/output `Var`, one
//! nested `for` per `LoopNest` index, and a guarded assignment or
//! accumulation per `Move`. This is a read-only [`Visitor`]-shaped
//! traversal but, unlike [`crate::visitor`], it builds a `String`
//! rather than another tree, so it is written directly as a set of
//! `render_*` functions rather than through the `Visitor` trait.

use crate::ir::{BinaryOp, CompareOp, Expr, ExprKind, Kernel, Stmt, StmtKind, UnaryOp};
use crate::types::{Type, TypeCode};
use std::fmt::Write as _;

pub fn print_kernel(kernel: &Kernel) -> String {
    let mut out = String::new();
    let _ = write!(out, "void {}(", kernel.name);
    out.push_str(&render_params(kernel));
    out.push_str(") {\n");
    for stmt in &kernel.stmts {
        render_stmt(stmt, 1, &mut out);
    }
    out.push_str("}\n");
    out
}

/// `inputs ++ outputs`, deduplicated by `Var` name, first appearance
/// wins — spec.md §4.5.
fn render_params(kernel: &Kernel) -> String {
    let mut seen = Vec::new();
    let mut params = Vec::new();
    for var in kernel.inputs.iter().chain(kernel.outputs.iter()) {
        let ExprKind::Var { name, shape, .. } = var.kind() else {
            continue;
        };
        if seen.contains(name) {
            continue;
        }
        seen.push(name.clone());
        params.push(render_param(var.ty(), name, shape));
    }
    params.join(", ")
}

fn render_param(ty: Type, name: &str, shape: &[usize]) -> String {
    let ctype = c_type_name(ty);
    if shape == [1] {
        format!("{ctype} &{name}")
    } else {
        let brackets = shape.iter().fold(String::new(), |mut acc, d| {
            let _ = write!(acc, "[{d}]");
            acc
        });
        format!("{ctype} (&{name}){brackets}")
    }
}

fn c_type_name(ty: Type) -> &'static str {
    match (ty.code, ty.bits) {
        (TypeCode::Float, 64) => "double",
        (TypeCode::Float, _) => "float",
        (TypeCode::Int, 64) => "long",
        (TypeCode::Int, 1) => "bool",
        (TypeCode::Int, _) => "int",
        (TypeCode::UInt, 64) => "unsigned long",
        (TypeCode::UInt, _) => "unsigned int",
    }
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn render_stmt(stmt: &Stmt, level: usize, out: &mut String) {
    match stmt.kind() {
        StmtKind::LoopNest { indices, bodies } => render_loop_nest(indices, bodies, level, out),
        StmtKind::IfThenElse { cond, t, f } => {
            indent(level, out);
            let _ = writeln!(out, "if ({}) {{", render_expr(cond));
            render_stmt(t, level + 1, out);
            indent(level, out);
            out.push_str("} else {\n");
            render_stmt(f, level + 1, out);
            indent(level, out);
            out.push_str("}\n");
        }
        StmtKind::If { cond, t } => {
            indent(level, out);
            let _ = writeln!(out, "if ({}) {{", render_expr(cond));
            render_stmt(t, level + 1, out);
            indent(level, out);
            out.push_str("}\n");
        }
        StmtKind::Move { dst, src, .. } => {
            indent(level, out);
            let op = if is_accumulation(dst, src) { "+=" } else { "=" };
            let _ = writeln!(out, "{} {op} {};", render_expr(dst), render_expr(src));
        }
    }
}

fn render_loop_nest(indices: &[Expr], bodies: &[Stmt], level: usize, out: &mut String) {
    for (depth, index) in indices.iter().enumerate() {
        let ExprKind::Index { name, dom, .. } = index.kind() else {
            continue;
        };
        let ExprKind::Dom { begin, extent } = dom.kind() else {
            continue;
        };
        indent(level + depth, out);
        let _ = writeln!(
            out,
            "for (int {name} = {b}; {name} < {b}+{e}; ++{name}){{",
            b = render_expr(begin),
            e = render_expr(extent),
        );
    }
    for body in bodies {
        render_stmt(body, level + indices.len(), out);
    }
    for depth in (0..indices.len()).rev() {
        indent(level + depth, out);
        out.push_str("}\n");
    }
}

/// A `Move` is an accumulation (`+=`) when `dst`'s own `Var` name also
/// occurs as a free read somewhere in `src` — spec.md §4.5.
fn is_accumulation(dst: &Expr, src: &Expr) -> bool {
    match dst.kind() {
        ExprKind::Var { name, .. } => contains_var_named(src, name),
        _ => false,
    }
}

fn contains_var_named(expr: &Expr, name: &str) -> bool {
    match expr.kind() {
        ExprKind::Var { name: n, args, .. } => {
            n == name || args.iter().any(|a| contains_var_named(a, name))
        }
        ExprKind::Unary { a, .. } => contains_var_named(a, name),
        ExprKind::Binary { a, b, .. } => contains_var_named(a, name) || contains_var_named(b, name),
        ExprKind::Compare { a, b, .. } => contains_var_named(a, name) || contains_var_named(b, name),
        ExprKind::Select { cond, t, f } => {
            contains_var_named(cond, name) || contains_var_named(t, name) || contains_var_named(f, name)
        }
        ExprKind::Call { args, .. } => args.iter().any(|a| contains_var_named(a, name)),
        ExprKind::Cast { val, .. } => contains_var_named(val, name),
        ExprKind::Ramp { base, .. } => contains_var_named(base, name),
        ExprKind::IntImm(_)
        | ExprKind::UIntImm(_)
        | ExprKind::FloatImm(_)
        | ExprKind::StringImm(_)
        | ExprKind::Dom { .. }
        | ExprKind::Index { .. } => false,
    }
}

fn render_expr(expr: &Expr) -> String {
    match expr.kind() {
        ExprKind::IntImm(v) => v.to_string(),
        ExprKind::UIntImm(v) => v.to_string(),
        ExprKind::FloatImm(v) => render_float(*v),
        ExprKind::StringImm(s) => format!("{s:?}"),
        ExprKind::Unary { op, a } => format!("{}{}", unary_op_str(*op), render_expr(a)),
        ExprKind::Binary { op, a, b, bracketed } => {
            let s = format!("{} {} {}", render_expr(a), binary_op_str(*op), render_expr(b));
            if *bracketed {
                format!("({s})")
            } else {
                s
            }
        }
        ExprKind::Compare { op, a, b } => {
            format!("{} {} {}", render_expr(a), compare_op_str(*op), render_expr(b))
        }
        ExprKind::Select { cond, t, f } => {
            format!("({} ? {} : {})", render_expr(cond), render_expr(t), render_expr(f))
        }
        ExprKind::Call { args, name, .. } => {
            let rendered: Vec<String> = args.iter().map(render_expr).collect();
            format!("{name}({})", rendered.join(", "))
        }
        ExprKind::Cast { new_type, val } => format!("({})({})", c_type_name(*new_type), render_expr(val)),
        // Vectorization is not implemented (spec.md §1 Non-goals); a
        // Ramp only ever carries its base expression through printing.
        ExprKind::Ramp { base, .. } => render_expr(base),
        ExprKind::Var { name, args, shape } => {
            if shape == &[1] {
                name.clone()
            } else {
                let brackets = args.iter().fold(String::new(), |mut acc, a| {
                    let _ = write!(acc, "[{}]", render_expr(a));
                    acc
                });
                format!("{name}{brackets}")
            }
        }
        ExprKind::Dom { begin, .. } => render_expr(begin),
        ExprKind::Index { name, .. } => name.clone(),
    }
}

/// Render with enough digits to round-trip; Rust's `f64` `Display`
/// already produces the shortest string that parses back to the exact
/// value, so this only has to guarantee a valid C floating literal
/// (append `.0` when the shortest form has no `.`/`e`).
fn render_float(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("nan") {
        s
    } else {
        format!("{s}.0")
    }
}

fn unary_op_str(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "!",
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn compare_op_str(op: CompareOp) -> &'static str {
    match op {
        CompareOp::LT => "<",
        CompareOp::LE => "<=",
        CompareOp::EQ => "==",
        CompareOp::NE => "!=",
        CompareOp::GE => ">=",
        CompareOp::GT => ">",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_kernel_source;

    #[test]
    fn elementwise_product_prints_signature_and_assignment() {
        let kernel = parse_kernel_source(
            "ew",
            Type::float_scalar(32),
            vec!["A".into(), "B".into()],
            vec!["C".into()],
            "C<4,16>[i,j] = A<4,16>[i,j] * B<4,16>[i,j] + 1.0;",
        )
        .unwrap();
        let code = print_kernel(&kernel);
        assert!(code.starts_with("void ew(float (&A)[4][16], float (&B)[4][16], float (&C)[4][16]) {"));
        assert!(code.contains("for (int i = 0; i < 0+4; ++i){"));
        assert!(code.contains("for (int j = 0; j < 0+16; ++j){"));
        assert!(code.contains("C[i][j] = A[i][j] * B[i][j] + 1.0;"));
    }

    #[test]
    fn affine_access_is_guarded_with_no_else() {
        let kernel = parse_kernel_source(
            "shift",
            Type::float_scalar(32),
            vec!["B".into()],
            vec!["A".into()],
            "A<16,32>[i+1,j] = B<16,32>[i,j];",
        )
        .unwrap();
        let code = print_kernel(&kernel);
        assert!(code.contains("if (i + 1 < 16)"));
        assert!(!code.contains("else"));
    }

    #[test]
    fn reduction_output_uses_plus_equals() {
        let kernel = parse_kernel_source(
            "reduce",
            Type::float_scalar(32),
            vec!["X".into()],
            vec!["S".into()],
            "S<4>[i] = S<4>[i] + X<4,8>[i,j];",
        )
        .unwrap();
        let code = print_kernel(&kernel);
        assert!(code.contains("S[i] += S[i] + X[i][j];"));
    }

    #[test]
    fn non_reduction_output_uses_plain_assignment() {
        let kernel = parse_kernel_source(
            "transpose",
            Type::float_scalar(32),
            vec!["A".into()],
            vec!["B".into()],
            "B<16,32>[i,j] = A<32,16>[j,i];",
        )
        .unwrap();
        let code = print_kernel(&kernel);
        assert!(code.contains("B[i][j] = A[j][i];"));
        assert!(!code.contains("+="));
    }

    #[test]
    fn float_immediate_always_has_a_decimal_point() {
        let kernel = parse_kernel_source(
            "konst",
            Type::float_scalar(32),
            vec![],
            vec!["C".into()],
            "C<4>[i] = 2.0;",
        )
        .unwrap();
        let code = print_kernel(&kernel);
        assert!(code.contains("C[i] = 2.0;"));
    }
}
