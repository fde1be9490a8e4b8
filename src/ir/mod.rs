//! # IR
//!
//! The algebraic tree the parser builds and the printer consumes: a
//! rooted, reference-shared DAG of immutable nodes split into three
//! disjoint universes — [`Expr`], [`Stmt`], and the single-variant
//! group [`Kernel`]. Every node carries a discriminator tag (the enum
//! variant itself, per §9's "replace class-hierarchy dispatch with a
//! tagged algebraic type" note); every `Expr` additionally carries its
//! result [`Type`].
//!
//! Nodes are built once (by [`crate::parser`] or
//! [`crate::differentiator`]), traversed by [`crate::visitor`]
//! implementations, optionally replaced by mutators, and finally
//! handed to [`crate::printer`]. There is no in-place mutation —
//! `Expr`/`Stmt` are cheap `Rc` handles, so passing one around never
//! copies the subtree.

use crate::types::Type;
use std::rc::Rc;

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    LT,
    LE,
    EQ,
    NE,
    GE,
    GT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Pure,
    SideEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Spatial,
    Reduce,
    Thread,
    Block,
    Vectorized,
    Unrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    DeviceToHost,
    HostToDevice,
    MemToMem,
    LocalToLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    CPU,
    GPU,
}

// ============================================================================
// Expr
// ============================================================================

/// A reference-shared, immutable Expr node. Cloning an `Expr` clones
/// the `Rc`, not the subtree.
#[derive(Debug, Clone)]
pub struct Expr(pub(crate) Rc<ExprData>);

#[derive(Debug)]
pub struct ExprData {
    pub ty: Type,
    pub kind: ExprKind,
}

#[derive(Debug)]
pub enum ExprKind {
    IntImm(i64),
    UIntImm(u64),
    FloatImm(f64),
    StringImm(String),
    Unary {
        op: UnaryOp,
        a: Expr,
    },
    Binary {
        op: BinaryOp,
        a: Expr,
        b: Expr,
        bracketed: bool,
    },
    Compare {
        op: CompareOp,
        a: Expr,
        b: Expr,
    },
    Select {
        cond: Expr,
        t: Expr,
        f: Expr,
    },
    Call {
        args: Vec<Expr>,
        name: String,
        kind: CallKind,
    },
    Cast {
        new_type: Type,
        val: Expr,
    },
    Ramp {
        base: Expr,
        stride: u16,
        lanes: u16,
    },
    Var {
        name: String,
        args: Vec<Expr>,
        shape: Vec<usize>,
    },
    Dom {
        begin: Expr,
        extent: Expr,
    },
    Index {
        name: String,
        dom: Expr,
        kind: IndexKind,
    },
}

impl PartialEq for Expr {
    /// Structural equality, not `Rc` identity — two independently
    /// constructed trees with the same shape compare equal (needed for
    /// the mutator-identity round-trip law in spec.md §8).
    fn eq(&self, other: &Self) -> bool {
        self.ty() == other.ty() && self.kind() == other.kind()
    }
}

impl PartialEq for ExprKind {
    fn eq(&self, other: &Self) -> bool {
        use ExprKind::*;
        match (self, other) {
            (IntImm(a), IntImm(b)) => a == b,
            (UIntImm(a), UIntImm(b)) => a == b,
            (FloatImm(a), FloatImm(b)) => a == b,
            (StringImm(a), StringImm(b)) => a == b,
            (Unary { op: o1, a: a1 }, Unary { op: o2, a: a2 }) => o1 == o2 && a1 == a2,
            (
                Binary { op: o1, a: a1, b: b1, bracketed: k1 },
                Binary { op: o2, a: a2, b: b2, bracketed: k2 },
            ) => o1 == o2 && a1 == a2 && b1 == b2 && k1 == k2,
            (Compare { op: o1, a: a1, b: b1 }, Compare { op: o2, a: a2, b: b2 }) => {
                o1 == o2 && a1 == a2 && b1 == b2
            }
            (Select { cond: c1, t: t1, f: f1 }, Select { cond: c2, t: t2, f: f2 }) => {
                c1 == c2 && t1 == t2 && f1 == f2
            }
            (
                Call { args: a1, name: n1, kind: k1 },
                Call { args: a2, name: n2, kind: k2 },
            ) => n1 == n2 && k1 == k2 && a1 == a2,
            (Cast { new_type: t1, val: v1 }, Cast { new_type: t2, val: v2 }) => {
                t1 == t2 && v1 == v2
            }
            (
                Ramp { base: b1, stride: s1, lanes: l1 },
                Ramp { base: b2, stride: s2, lanes: l2 },
            ) => b1 == b2 && s1 == s2 && l1 == l2,
            (
                Var { name: n1, args: a1, shape: s1 },
                Var { name: n2, args: a2, shape: s2 },
            ) => n1 == n2 && a1 == a2 && s1 == s2,
            (Dom { begin: b1, extent: e1 }, Dom { begin: b2, extent: e2 }) => {
                b1 == b2 && e1 == e2
            }
            (
                Index { name: n1, dom: d1, kind: k1 },
                Index { name: n2, dom: d2, kind: k2 },
            ) => n1 == n2 && d1 == d2 && k1 == k2,
            _ => false,
        }
    }
}

impl Expr {
    pub fn ty(&self) -> Type {
        self.0.ty
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    fn new(ty: Type, kind: ExprKind) -> Expr {
        Expr(Rc::new(ExprData { ty, kind }))
    }

    pub fn int_imm(ty: Type, v: i64) -> Expr {
        Expr::new(ty, ExprKind::IntImm(v))
    }

    pub fn uint_imm(ty: Type, v: u64) -> Expr {
        Expr::new(ty, ExprKind::UIntImm(v))
    }

    pub fn float_imm(ty: Type, v: f64) -> Expr {
        Expr::new(ty, ExprKind::FloatImm(v))
    }

    pub fn string_imm(ty: Type, v: impl Into<String>) -> Expr {
        Expr::new(ty, ExprKind::StringImm(v.into()))
    }

    pub fn unary(ty: Type, op: UnaryOp, a: Expr) -> Expr {
        Expr::new(ty, ExprKind::Unary { op, a })
    }

    pub fn binary(ty: Type, op: BinaryOp, a: Expr, b: Expr, bracketed: bool) -> Expr {
        Expr::new(ty, ExprKind::Binary { op, a, b, bracketed })
    }

    pub fn compare(ty: Type, op: CompareOp, a: Expr, b: Expr) -> Expr {
        Expr::new(ty, ExprKind::Compare { op, a, b })
    }

    pub fn select(ty: Type, cond: Expr, t: Expr, f: Expr) -> Expr {
        Expr::new(ty, ExprKind::Select { cond, t, f })
    }

    pub fn call(ty: Type, args: Vec<Expr>, name: impl Into<String>, kind: CallKind) -> Expr {
        Expr::new(ty, ExprKind::Call { args, name: name.into(), kind })
    }

    pub fn cast(ty: Type, new_type: Type, val: Expr) -> Expr {
        Expr::new(ty, ExprKind::Cast { new_type, val })
    }

    pub fn ramp(ty: Type, base: Expr, stride: u16, lanes: u16) -> Expr {
        Expr::new(ty, ExprKind::Ramp { base, stride, lanes })
    }

    pub fn var(ty: Type, name: impl Into<String>, args: Vec<Expr>, shape: Vec<usize>) -> Expr {
        let name = name.into();
        debug_assert!(
            shape.len() == args.len() || (shape == [1] && args.is_empty()),
            "Var {name}: shape/args length mismatch"
        );
        Expr::new(ty, ExprKind::Var { name, args, shape })
    }

    pub fn dom(ty: Type, begin: Expr, extent: Expr) -> Expr {
        debug_assert!(matches!(begin.kind(), ExprKind::IntImm(_)));
        debug_assert!(matches!(extent.kind(), ExprKind::IntImm(_)));
        Expr::new(ty, ExprKind::Dom { begin, extent })
    }

    pub fn index(ty: Type, name: impl Into<String>, dom: Expr, kind: IndexKind) -> Expr {
        Expr::new(ty, ExprKind::Index { name: name.into(), dom, kind })
    }

    /// The name this `Var`/`Index` refers to, if it is one.
    pub fn name(&self) -> Option<&str> {
        match self.kind() {
            ExprKind::Var { name, .. } | ExprKind::Index { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The `IntImm` value this node carries, if it is one. Used to read
    /// `Dom::begin`/`Dom::extent`, which are always `IntImm` (§3.3).
    pub fn int_value(&self) -> Option<i64> {
        match self.kind() {
            ExprKind::IntImm(v) => Some(*v),
            _ => None,
        }
    }
}

// ============================================================================
// Stmt
// ============================================================================

#[derive(Debug, Clone)]
pub struct Stmt(pub(crate) Rc<StmtKind>);

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    LoopNest { indices: Vec<Expr>, bodies: Vec<Stmt> },
    IfThenElse { cond: Expr, t: Stmt, f: Stmt },
    If { cond: Expr, t: Stmt },
    Move { dst: Expr, src: Expr, kind: MoveKind },
}

impl PartialEq for Stmt {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl Stmt {
    pub fn kind(&self) -> &StmtKind {
        &self.0
    }

    pub fn ptr_eq(a: &Stmt, b: &Stmt) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn loop_nest(indices: Vec<Expr>, bodies: Vec<Stmt>) -> Stmt {
        Stmt(Rc::new(StmtKind::LoopNest { indices, bodies }))
    }

    pub fn if_then_else(cond: Expr, t: Stmt, f: Stmt) -> Stmt {
        Stmt(Rc::new(StmtKind::IfThenElse { cond, t, f }))
    }

    pub fn if_(cond: Expr, t: Stmt) -> Stmt {
        Stmt(Rc::new(StmtKind::If { cond, t }))
    }

    pub fn move_(dst: Expr, src: Expr, kind: MoveKind) -> Stmt {
        Stmt(Rc::new(StmtKind::Move { dst, src, kind }))
    }
}

// ============================================================================
// Group (the single Kernel variant)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    pub name: String,
    pub inputs: Vec<Expr>,
    pub outputs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub target: Target,
}

impl Kernel {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Expr>,
        outputs: Vec<Expr>,
        stmts: Vec<Stmt>,
        target: Target,
    ) -> Kernel {
        Kernel { name: name.into(), inputs, outputs, stmts, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn idx(name: &str, extent: i64) -> Expr {
        let it = Type::int_scalar(32);
        let dom = Expr::dom(it, Expr::int_imm(it, 0), Expr::int_imm(it, extent));
        Expr::index(it, name, dom, IndexKind::Spatial)
    }

    #[test]
    fn structural_equality_ignores_rc_identity() {
        let a = idx("i", 16);
        let b = idx("i", 16);
        assert!(!Expr::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn var_shape_matches_args_len() {
        let ft = Type::float_scalar(32);
        let i = idx("i", 4);
        let j = idx("j", 16);
        let v = Expr::var(ft, "A", vec![i, j], vec![4, 16]);
        match v.kind() {
            ExprKind::Var { shape, args, .. } => assert_eq!(shape.len(), args.len()),
            _ => panic!("expected Var"),
        }
    }

    #[test]
    fn scalar_var_has_shape_one_and_no_args() {
        let ft = Type::float_scalar(32);
        let v = Expr::var(ft, "s", vec![], vec![1]);
        match v.kind() {
            ExprKind::Var { shape, args, .. } => {
                assert_eq!(shape, &[1]);
                assert!(args.is_empty());
            }
            _ => panic!("expected Var"),
        }
    }
}
