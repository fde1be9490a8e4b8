//! # Visitor / Mutator framework
//!
//! Two polymorphic capabilities over the IR (spec.md §4.1, §9): a
//! `Visitor` does read-only pre-order traversal; a `Mutator` does
//! post-order traversal with rebuild, reconstructing a node only when
//! one of its children actually changed and otherwise returning the
//! original `Rc` clone — mutation preserves `Type` and, on a no-op
//! pass, preserves tree identity too (spec.md §8 invariant 3).
//!
//! In a language with sum types and pattern matching there is no
//! double-dispatch to wire up: both traits are plain functions that
//! match on the node's variant, matching the guidance in spec.md §9.

use crate::ir::{Expr, ExprKind, Kernel, Stmt, StmtKind};

/// Read-only pre-order traversal. Override only the hooks you care
/// about; the defaults recurse into every child field in declaration
/// order.
pub trait Visitor {
    fn visit_expr(&mut self, e: &Expr) {
        walk_expr(self, e);
    }

    fn visit_stmt(&mut self, s: &Stmt) {
        walk_stmt(self, s);
    }

    fn visit_kernel(&mut self, k: &Kernel) {
        walk_kernel(self, k);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, e: &Expr) {
    match e.kind() {
        ExprKind::IntImm(_)
        | ExprKind::UIntImm(_)
        | ExprKind::FloatImm(_)
        | ExprKind::StringImm(_) => {}
        ExprKind::Unary { a, .. } => v.visit_expr(a),
        ExprKind::Binary { a, b, .. } => {
            v.visit_expr(a);
            v.visit_expr(b);
        }
        ExprKind::Compare { a, b, .. } => {
            v.visit_expr(a);
            v.visit_expr(b);
        }
        ExprKind::Select { cond, t, f } => {
            v.visit_expr(cond);
            v.visit_expr(t);
            v.visit_expr(f);
        }
        ExprKind::Call { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Cast { val, .. } => v.visit_expr(val),
        ExprKind::Ramp { base, .. } => v.visit_expr(base),
        ExprKind::Var { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        ExprKind::Dom { begin, extent } => {
            v.visit_expr(begin);
            v.visit_expr(extent);
        }
        ExprKind::Index { dom, .. } => v.visit_expr(dom),
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, s: &Stmt) {
    match s.kind() {
        StmtKind::LoopNest { indices, bodies } => {
            for i in indices {
                v.visit_expr(i);
            }
            for b in bodies {
                v.visit_stmt(b);
            }
        }
        StmtKind::IfThenElse { cond, t, f } => {
            v.visit_expr(cond);
            v.visit_stmt(t);
            v.visit_stmt(f);
        }
        StmtKind::If { cond, t } => {
            v.visit_expr(cond);
            v.visit_stmt(t);
        }
        StmtKind::Move { dst, src, .. } => {
            v.visit_expr(dst);
            v.visit_expr(src);
        }
    }
}

pub fn walk_kernel<V: Visitor + ?Sized>(v: &mut V, k: &Kernel) {
    for i in &k.inputs {
        v.visit_expr(i);
    }
    for o in &k.outputs {
        v.visit_expr(o);
    }
    for s in &k.stmts {
        v.visit_stmt(s);
    }
}

/// Structural mutation with sharing preservation. Override only the
/// hooks you care about; the defaults rebuild children bottom-up and
/// only allocate a new node when a child's `Rc` identity actually
/// changed.
pub trait Mutator {
    fn mutate_expr(&mut self, e: &Expr) -> Expr {
        default_mutate_expr(self, e)
    }

    fn mutate_stmt(&mut self, s: &Stmt) -> Stmt {
        default_mutate_stmt(self, s)
    }

    fn mutate_kernel(&mut self, k: &Kernel) -> Kernel {
        default_mutate_kernel(self, k)
    }
}

pub fn default_mutate_expr<M: Mutator + ?Sized>(m: &mut M, e: &Expr) -> Expr {
    let ty = e.ty();
    match e.kind() {
        ExprKind::IntImm(_)
        | ExprKind::UIntImm(_)
        | ExprKind::FloatImm(_)
        | ExprKind::StringImm(_) => e.clone(),
        ExprKind::Unary { op, a } => {
            let a2 = m.mutate_expr(a);
            if Expr::ptr_eq(a, &a2) {
                e.clone()
            } else {
                Expr::unary(ty, *op, a2)
            }
        }
        ExprKind::Binary { op, a, b, bracketed } => {
            let a2 = m.mutate_expr(a);
            let b2 = m.mutate_expr(b);
            if Expr::ptr_eq(a, &a2) && Expr::ptr_eq(b, &b2) {
                e.clone()
            } else {
                Expr::binary(ty, *op, a2, b2, *bracketed)
            }
        }
        ExprKind::Compare { op, a, b } => {
            let a2 = m.mutate_expr(a);
            let b2 = m.mutate_expr(b);
            if Expr::ptr_eq(a, &a2) && Expr::ptr_eq(b, &b2) {
                e.clone()
            } else {
                Expr::compare(ty, *op, a2, b2)
            }
        }
        ExprKind::Select { cond, t, f } => {
            let c2 = m.mutate_expr(cond);
            let t2 = m.mutate_expr(t);
            let f2 = m.mutate_expr(f);
            if Expr::ptr_eq(cond, &c2) && Expr::ptr_eq(t, &t2) && Expr::ptr_eq(f, &f2) {
                e.clone()
            } else {
                Expr::select(ty, c2, t2, f2)
            }
        }
        ExprKind::Call { args, name, kind } => {
            let args2: Vec<Expr> = args.iter().map(|a| m.mutate_expr(a)).collect();
            let changed = args.iter().zip(args2.iter()).any(|(a, a2)| !Expr::ptr_eq(a, a2));
            if !changed {
                e.clone()
            } else {
                Expr::call(ty, args2, name.clone(), *kind)
            }
        }
        ExprKind::Cast { new_type, val } => {
            let v2 = m.mutate_expr(val);
            if Expr::ptr_eq(val, &v2) {
                e.clone()
            } else {
                Expr::cast(ty, *new_type, v2)
            }
        }
        ExprKind::Ramp { base, stride, lanes } => {
            let b2 = m.mutate_expr(base);
            if Expr::ptr_eq(base, &b2) {
                e.clone()
            } else {
                Expr::ramp(ty, b2, *stride, *lanes)
            }
        }
        ExprKind::Var { name, args, shape } => {
            let args2: Vec<Expr> = args.iter().map(|a| m.mutate_expr(a)).collect();
            let changed = args.iter().zip(args2.iter()).any(|(a, a2)| !Expr::ptr_eq(a, a2));
            if !changed {
                e.clone()
            } else {
                Expr::var(ty, name.clone(), args2, shape.clone())
            }
        }
        ExprKind::Dom { begin, extent } => {
            let b2 = m.mutate_expr(begin);
            let e2 = m.mutate_expr(extent);
            if Expr::ptr_eq(begin, &b2) && Expr::ptr_eq(extent, &e2) {
                e.clone()
            } else {
                Expr::dom(ty, b2, e2)
            }
        }
        ExprKind::Index { name, dom, kind } => {
            let d2 = m.mutate_expr(dom);
            if Expr::ptr_eq(dom, &d2) {
                e.clone()
            } else {
                Expr::index(ty, name.clone(), d2, *kind)
            }
        }
    }
}

pub fn default_mutate_stmt<M: Mutator + ?Sized>(m: &mut M, s: &Stmt) -> Stmt {
    match s.kind() {
        StmtKind::LoopNest { indices, bodies } => {
            let indices2: Vec<Expr> = indices.iter().map(|i| m.mutate_expr(i)).collect();
            let bodies2: Vec<Stmt> = bodies.iter().map(|b| m.mutate_stmt(b)).collect();
            let unchanged = indices.iter().zip(indices2.iter()).all(|(a, b)| Expr::ptr_eq(a, b))
                && bodies.iter().zip(bodies2.iter()).all(|(a, b)| Stmt::ptr_eq(a, b));
            if unchanged {
                s.clone()
            } else {
                Stmt::loop_nest(indices2, bodies2)
            }
        }
        StmtKind::IfThenElse { cond, t, f } => {
            let c2 = m.mutate_expr(cond);
            let t2 = m.mutate_stmt(t);
            let f2 = m.mutate_stmt(f);
            if Expr::ptr_eq(cond, &c2) && Stmt::ptr_eq(t, &t2) && Stmt::ptr_eq(f, &f2) {
                s.clone()
            } else {
                Stmt::if_then_else(c2, t2, f2)
            }
        }
        StmtKind::If { cond, t } => {
            let c2 = m.mutate_expr(cond);
            let t2 = m.mutate_stmt(t);
            if Expr::ptr_eq(cond, &c2) && Stmt::ptr_eq(t, &t2) {
                s.clone()
            } else {
                Stmt::if_(c2, t2)
            }
        }
        StmtKind::Move { dst, src, kind } => {
            let d2 = m.mutate_expr(dst);
            let s2 = m.mutate_expr(src);
            if Expr::ptr_eq(dst, &d2) && Expr::ptr_eq(src, &s2) {
                s.clone()
            } else {
                Stmt::move_(d2, s2, *kind)
            }
        }
    }
}

pub fn default_mutate_kernel<M: Mutator + ?Sized>(m: &mut M, k: &Kernel) -> Kernel {
    Kernel {
        name: k.name.clone(),
        inputs: k.inputs.iter().map(|i| m.mutate_expr(i)).collect(),
        outputs: k.outputs.iter().map(|o| m.mutate_expr(o)).collect(),
        stmts: k.stmts.iter().map(|s| m.mutate_stmt(s)).collect(),
        target: k.target,
    }
}

/// The identity mutator: overrides nothing. Used by spec.md §8
/// invariant 3 — applying it to any `Kernel` must yield a tree
/// structurally equal to the original (and, in this implementation,
/// one that shares every node by `Rc` identity too).
pub struct IdentityMutator;

impl Mutator for IdentityMutator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IndexKind, Target};
    use crate::types::Type;

    fn sample_kernel() -> Kernel {
        let ft = Type::float_scalar(32);
        let it = Type::int_scalar(32);
        let dom_i = Expr::dom(it, Expr::int_imm(it, 0), Expr::int_imm(it, 4));
        let i = Expr::index(it, "i", dom_i, IndexKind::Spatial);
        let a = Expr::var(ft, "A", vec![i.clone()], vec![4]);
        let b = Expr::var(ft, "B", vec![i.clone()], vec![4]);
        let sum = Expr::binary(ft, crate::ir::BinaryOp::Add, a.clone(), b.clone(), false);
        let mv = Stmt::move_(a.clone(), sum, crate::ir::MoveKind::MemToMem);
        let loop_nest = Stmt::loop_nest(vec![i], vec![mv]);
        Kernel::new("K", vec![a, b], vec![], vec![loop_nest], Target::CPU)
    }

    #[test]
    fn identity_mutator_preserves_structure_and_sharing() {
        let k = sample_kernel();
        let mut m = IdentityMutator;
        let k2 = m.mutate_kernel(&k);
        assert_eq!(k, k2);
        for (s1, s2) in k.stmts.iter().zip(k2.stmts.iter()) {
            assert!(Stmt::ptr_eq(s1, s2));
        }
    }

    #[test]
    fn visitor_counts_every_expr_node() {
        struct Counter(usize);
        impl Visitor for Counter {
            fn visit_expr(&mut self, e: &Expr) {
                self.0 += 1;
                walk_expr(self, e);
            }
        }
        // (1 + 2) * 3 -> Binary(Add, IntImm, IntImm) nested in Binary(Mul, _, IntImm):
        // 5 Expr nodes total (two leaves, the inner Binary, the outer
        // Binary's right leaf, and the outer Binary itself).
        let it = Type::int_scalar(32);
        let one = Expr::int_imm(it, 1);
        let two = Expr::int_imm(it, 2);
        let three = Expr::int_imm(it, 3);
        let sum = Expr::binary(it, crate::ir::BinaryOp::Add, one, two, true);
        let prod = Expr::binary(it, crate::ir::BinaryOp::Mul, sum, three, false);
        let mut c = Counter(0);
        c.visit_expr(&prod);
        assert_eq!(c.0, 5);
    }
}
