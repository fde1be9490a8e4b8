//! # Parser
//!
//! Recursive-descent, single-token-lookahead parser over the grammar
//! in spec.md §4.2. Builds the IR directly (no separate parse tree) and,
//! per statement, accumulates the index set and the affine-access guard
//! operands the printer's bounds checks are built from.
//!
//! Grammar (EBNF-like, reproduced from spec.md for the reader mapping
//! productions to functions below):
//!
//! ```text
//! P     -> S P1
//! P1    -> S P1 | e
//! S     -> LHS '=' RHS ';'
//! LHS   -> TRef
//! RHS   -> TERM RHS1
//! RHS1  -> '+' TERM RHS1 | '-' TERM RHS1 | e
//! TERM  -> FACTOR TERM1
//! TERM1 -> ('*'|'/'|'//'|'%') FACTOR TERM1 | e
//! FACTOR-> '(' RHS ')' | Const | TRef
//! TRef  -> Id '<' CList '>' SRef
//! CList -> Int (',' Int)*
//! SRef  -> '[' AList ']' | e
//! AList -> IdExpr (',' IdExpr)*
//! IdExpr-> ITERM IdExpr1
//! ITERM -> IFACTOR ITERM1
//! IFACTOR-> '(' IdExpr ')' | Id | Int
//! Const -> Int | Float
//! ```

use crate::error::{CompileError, Result};
use crate::ir::{BinaryOp, CompareOp, Expr, ExprKind, IndexKind, Kernel, MoveKind, Stmt, Target};
use crate::lexer::Token;
use crate::types::Type;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    name: String,
    data_type: Type,
    index_type: Type,
    declared_inputs: Vec<String>,
    declared_outputs: Vec<String>,
    inputs: Vec<(String, Expr)>,
    outputs: Vec<(String, Expr)>,
    cur_index_expr: Vec<Expr>,
    cur_var_alist: Vec<Expr>,
    cur_var_clist: Vec<i64>,
}

impl Parser {
    pub fn new(
        name: impl Into<String>,
        data_type: Type,
        declared_inputs: Vec<String>,
        declared_outputs: Vec<String>,
        tokens: Vec<Token>,
    ) -> Self {
        Parser {
            tokens,
            pos: 0,
            name: name.into(),
            data_type,
            index_type: Type::int_scalar(32),
            declared_inputs,
            declared_outputs,
            inputs: Vec::new(),
            outputs: Vec::new(),
            cur_index_expr: Vec::new(),
            cur_var_alist: Vec::new(),
            cur_var_clist: Vec::new(),
        }
    }

    /// `P -> S P1`: parse every statement in the token stream and
    /// assemble the Kernel, with inputs/outputs in JSON declaration
    /// order, first-wins deduplicated.
    pub fn parse_kernel(&mut self) -> Result<Kernel> {
        let mut stmts = Vec::new();
        while self.pos < self.tokens.len() {
            self.cur_index_expr.clear();
            self.cur_var_alist.clear();
            self.cur_var_clist.clear();
            stmts.push(self.parse_statement()?);
        }
        let inputs = self
            .declared_inputs
            .iter()
            .filter_map(|n| self.inputs.iter().find(|(nm, _)| nm == n).map(|(_, e)| e.clone()))
            .collect();
        let outputs = self
            .declared_outputs
            .iter()
            .filter_map(|n| self.outputs.iter().find(|(nm, _)| nm == n).map(|(_, e)| e.clone()))
            .collect();
        Ok(Kernel::new(self.name.clone(), inputs, outputs, stmts, Target::CPU))
    }

    // -- token cursor -------------------------------------------------

    fn peek(&self) -> Result<&Token> {
        self.tokens.get(self.pos).ok_or_else(|| CompileError::Parse {
            pos: self.pos,
            message: "unexpected end of input".to_string(),
        })
    }

    fn peek_sym(&self) -> Option<&str> {
        self.tokens.get(self.pos).and_then(Token::as_sym)
    }

    fn advance(&mut self) -> Result<Token> {
        let t = self.peek()?.clone();
        self.pos += 1;
        Ok(t)
    }

    fn expect_sym(&mut self, s: &str) -> Result<()> {
        if self.peek_sym() == Some(s) {
            self.pos += 1;
            Ok(())
        } else {
            let found = self.peek().map(|t| format!("{t:?}")).unwrap_or_else(|_| "eof".into());
            Err(CompileError::Parse {
                pos: self.pos,
                message: format!("expected '{s}', found {found}"),
            })
        }
    }

    // -- grammar --------------------------------------------------------

    /// `S -> LHS '=' RHS ';'`, lowered into `If(guard, Move(lhs, rhs))`
    /// wrapped in a `LoopNest` over this statement's indices (spec.md
    /// §4.2 "Statement lowering").
    fn parse_statement(&mut self) -> Result<Stmt> {
        let lhs = self.parse_tref()?;
        self.expect_sym("=")?;
        let rhs = self.parse_rhs(false)?;
        self.expect_sym(";")?;
        let main = Stmt::move_(lhs, rhs, MoveKind::MemToMem);
        let guarded = self.build_if_stmt(main);
        Ok(Stmt::loop_nest(self.cur_index_expr.clone(), vec![guarded]))
    }

    /// The left-folded conjunction of `Compare(LT, a_k, c_k)` over every
    /// non-identity affine access collected while parsing this
    /// statement; elided entirely when there is none.
    fn build_if_stmt(&self, stmt: Stmt) -> Stmt {
        if self.cur_var_alist.is_empty() {
            return stmt;
        }
        let bound = |i: usize| Expr::int_imm(self.index_type, self.cur_var_clist[i]);
        let mut cond = Expr::compare(self.data_type, CompareOp::LT, self.cur_var_alist[0].clone(), bound(0));
        for i in 1..self.cur_var_alist.len() {
            let c = Expr::compare(self.data_type, CompareOp::LT, self.cur_var_alist[i].clone(), bound(i));
            cond = Expr::binary(self.data_type, BinaryOp::And, cond, c, false);
        }
        Stmt::if_(cond, stmt)
    }

    fn parse_rhs(&mut self, bracketed: bool) -> Result<Expr> {
        let mut expr = self.parse_term(bracketed)?;
        loop {
            match self.peek_sym() {
                Some("+") => {
                    self.pos += 1;
                    let rhs = self.parse_term(bracketed)?;
                    expr = Expr::binary(self.data_type, BinaryOp::Add, expr, rhs, bracketed);
                }
                Some("-") => {
                    self.pos += 1;
                    let rhs = self.parse_term(bracketed)?;
                    expr = Expr::binary(self.data_type, BinaryOp::Sub, expr, rhs, bracketed);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_term(&mut self, bracketed: bool) -> Result<Expr> {
        let mut expr = self.parse_factor()?;
        loop {
            match self.peek_sym() {
                Some("*") => {
                    self.pos += 1;
                    let rhs = self.parse_factor()?;
                    expr = Expr::binary(self.data_type, BinaryOp::Mul, expr, rhs, bracketed);
                }
                Some("%") => {
                    self.pos += 1;
                    let rhs = self.parse_factor()?;
                    expr = Expr::binary(self.data_type, BinaryOp::Mod, expr, rhs, bracketed);
                }
                // `//` floor-division lowers to `Div` like plain `/` — a
                // known-lossy fidelity point for negative operands,
                // kept intentionally (spec.md §9 Open Questions).
                Some("/") | Some("//") => {
                    self.pos += 1;
                    let rhs = self.parse_factor()?;
                    expr = Expr::binary(self.data_type, BinaryOp::Div, expr, rhs, bracketed);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        match self.peek()? {
            Token::Sym(s) if s == "(" => {
                self.pos += 1;
                let e = self.parse_rhs(true)?;
                self.expect_sym(")")?;
                Ok(e)
            }
            Token::Int(_) | Token::Float(_) => self.parse_const(),
            _ => self.parse_tref(),
        }
    }

    fn parse_const(&mut self) -> Result<Expr> {
        match self.advance()? {
            Token::Int(v) => Ok(Expr::int_imm(self.data_type, v)),
            Token::Float(v) => Ok(Expr::float_imm(self.data_type, v)),
            other => Err(CompileError::Parse {
                pos: self.pos - 1,
                message: format!("expected a numeric constant, found {other:?}"),
            }),
        }
    }

    /// `TRef -> Id '<' CList '>' SRef`. Registers the resulting `Var`
    /// in `inputs`/`outputs` if its name is declared, and records each
    /// non-identity (`Binary`) index access as a guard operand.
    fn parse_tref(&mut self) -> Result<Expr> {
        let var_name = match self.advance()? {
            Token::Id(s) => s,
            other => {
                return Err(CompileError::Parse {
                    pos: self.pos - 1,
                    message: format!("expected an identifier, found {other:?}"),
                })
            }
        };
        self.expect_sym("<")?;
        let clist = self.parse_clist()?;
        self.expect_sym(">")?;
        let shape: Vec<usize> = clist.iter().map(|&v| v as usize).collect();
        let alist = self.parse_sref(&shape)?;

        for (i, a) in alist.iter().enumerate() {
            if matches!(a.kind(), ExprKind::Binary { .. }) {
                self.cur_var_alist.push(a.clone());
                self.cur_var_clist.push(clist[i]);
            }
        }

        let var = Expr::var(self.data_type, var_name.clone(), alist, shape);
        self.register_var(&var_name, &var);
        Ok(var)
    }

    fn register_var(&mut self, name: &str, var: &Expr) {
        if self.declared_inputs.iter().any(|n| n == name) && !self.inputs.iter().any(|(n, _)| n == name) {
            self.inputs.push((name.to_string(), var.clone()));
        }
        if self.declared_outputs.iter().any(|n| n == name) && !self.outputs.iter().any(|(n, _)| n == name) {
            self.outputs.push((name.to_string(), var.clone()));
        }
    }

    /// `CList -> Int (',' Int)*`. A non-`Int` token here is fatal: the
    /// language only allows compile-time-constant shapes.
    fn parse_clist(&mut self) -> Result<Vec<i64>> {
        let mut out = vec![self.expect_int()?];
        while self.peek_sym() == Some(",") {
            self.pos += 1;
            out.push(self.expect_int()?);
        }
        Ok(out)
    }

    fn expect_int(&mut self) -> Result<i64> {
        match self.advance()? {
            Token::Int(v) => Ok(v),
            other => Err(CompileError::Parse {
                pos: self.pos - 1,
                message: format!("non-constant shape dimension: {other:?}"),
            }),
        }
    }

    fn parse_sref(&mut self, shape: &[usize]) -> Result<Vec<Expr>> {
        if self.peek_sym() == Some("[") {
            self.pos += 1;
            let alist = self.parse_alist(shape)?;
            self.expect_sym("]")?;
            Ok(alist)
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_alist(&mut self, shape: &[usize]) -> Result<Vec<Expr>> {
        let mut k = 0usize;
        let mut out = vec![self.parse_idexpr(dim(shape, k)?)?];
        while self.peek_sym() == Some(",") {
            self.pos += 1;
            k += 1;
            out.push(self.parse_idexpr(dim(shape, k)?)?);
        }
        Ok(out)
    }

    fn parse_idexpr(&mut self, dom_extent: usize) -> Result<Expr> {
        let mut expr = self.parse_iterm(dom_extent, false)?;
        loop {
            match self.peek_sym() {
                Some("+") => {
                    self.pos += 1;
                    let rhs = self.parse_iterm(dom_extent, false)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Add, expr, rhs, false);
                }
                Some("-") => {
                    self.pos += 1;
                    let rhs = self.parse_iterm(dom_extent, false)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Sub, expr, rhs, false);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_iterm(&mut self, dom_extent: usize, bracketed: bool) -> Result<Expr> {
        let mut expr = self.parse_ifactor(dom_extent)?;
        loop {
            match self.peek_sym() {
                Some("*") => {
                    self.pos += 1;
                    let rhs = self.parse_ifactor(dom_extent)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Mul, expr, rhs, bracketed);
                }
                Some("%") => {
                    self.pos += 1;
                    let rhs = self.parse_ifactor(dom_extent)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Mod, expr, rhs, bracketed);
                }
                Some("/") | Some("//") => {
                    self.pos += 1;
                    let rhs = self.parse_ifactor(dom_extent)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Div, expr, rhs, bracketed);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `IFACTOR -> '(' IdExpr ')' | Id | Int`. An `Id` here resolves to
    /// an `Index` reference (`Dom` begin 0, this dimension's extent)
    /// and is folded into this statement's index set via
    /// [`Self::insert_index`].
    fn parse_ifactor(&mut self, dom_extent: usize) -> Result<Expr> {
        match self.peek()? {
            Token::Sym(s) if s == "(" => {
                self.pos += 1;
                let e = self.parse_idexpr_bracketed(dom_extent)?;
                self.expect_sym(")")?;
                Ok(e)
            }
            Token::Id(_) => {
                let name = match self.advance()? {
                    Token::Id(s) => s,
                    _ => unreachable!(),
                };
                let dom = Expr::dom(
                    self.index_type,
                    Expr::int_imm(self.index_type, 0),
                    Expr::int_imm(self.index_type, dom_extent as i64),
                );
                let idx = Expr::index(self.index_type, name, dom, IndexKind::Spatial);
                self.insert_index(idx.clone());
                Ok(idx)
            }
            Token::Int(_) => {
                let v = match self.advance()? {
                    Token::Int(v) => v,
                    _ => unreachable!(),
                };
                Ok(Expr::int_imm(self.index_type, v))
            }
            other => Err(CompileError::Parse {
                pos: self.pos,
                message: format!("expected '(', an identifier, or an integer, found {other:?}"),
            }),
        }
    }

    /// Entry point used by `IFACTOR`'s `'(' IdExpr ')'` alternative:
    /// the nested `IdExpr` is parsed with its own index registration
    /// bypassed (already folded in by the enclosing call) but the
    /// arithmetic itself still needs a fresh left-fold.
    fn parse_idexpr_bracketed(&mut self, dom_extent: usize) -> Result<Expr> {
        let mut expr = self.parse_iterm(dom_extent, true)?;
        loop {
            match self.peek_sym() {
                Some("+") => {
                    self.pos += 1;
                    let rhs = self.parse_iterm(dom_extent, true)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Add, expr, rhs, true);
                }
                Some("-") => {
                    self.pos += 1;
                    let rhs = self.parse_iterm(dom_extent, true)?;
                    expr = Expr::binary(self.index_type, BinaryOp::Sub, expr, rhs, true);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Dedupe by index name, keeping the smallest extent seen across
    /// the statement (spec.md §3.3: "the least-restrictive loop that
    /// satisfies all uses").
    fn insert_index(&mut self, expr: Expr) {
        let name = match expr.name() {
            Some(n) => n.to_string(),
            None => return,
        };
        if let Some(slot) = self.cur_index_expr.iter_mut().find(|e| e.name() == Some(name.as_str())) {
            if extent_of(&expr) < extent_of(slot) {
                *slot = expr;
            }
        } else {
            self.cur_index_expr.push(expr);
        }
    }
}

fn dim(shape: &[usize], k: usize) -> Result<usize> {
    shape.get(k).copied().ok_or_else(|| CompileError::Parse {
        pos: 0,
        message: format!("access has more index dimensions than the declared shape ({k} >= {})", shape.len()),
    })
}

fn extent_of(index: &Expr) -> i64 {
    match index.kind() {
        ExprKind::Index { dom, .. } => match dom.kind() {
            ExprKind::Dom { extent, .. } => extent.int_value().unwrap_or(i64::MAX),
            _ => i64::MAX,
        },
        _ => i64::MAX,
    }
}

/// Tokenize and parse one kernel in a single call — the entry point the
/// driver and tests use.
pub fn parse_kernel_source(
    name: &str,
    data_type: Type,
    ins: Vec<String>,
    outs: Vec<String>,
    source: &str,
) -> Result<Kernel> {
    let tokens = crate::lexer::lex(source)?;
    let mut parser = Parser::new(name, data_type, ins, outs, tokens);
    parser.parse_kernel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtKind;

    fn parse(src: &str, ins: &[&str], outs: &[&str]) -> Kernel {
        parse_kernel_source(
            "k",
            Type::float_scalar(32),
            ins.iter().map(ToString::to_string).collect(),
            outs.iter().map(ToString::to_string).collect(),
            src,
        )
        .unwrap()
    }

    #[test]
    fn simple_elementwise_has_no_guard() {
        // scenario 4 (spec.md §8): three Index nodes, no guard.
        let k = parse(
            "dB<16,32>[i,k] = dA<16,32>[i,j] * C<32,32>[k,j];",
            &["dA", "C"],
            &["dB"],
        );
        assert_eq!(k.stmts.len(), 1);
        match k.stmts[0].kind() {
            StmtKind::LoopNest { indices, bodies } => {
                assert_eq!(indices.len(), 3);
                let names: Vec<&str> = indices.iter().filter_map(Expr::name).collect();
                assert!(names.contains(&"i"));
                assert!(names.contains(&"j"));
                assert!(names.contains(&"k"));
                match bodies[0].kind() {
                    StmtKind::Move { .. } => {}
                    other => panic!("expected a bare Move, got {other:?}"),
                }
            }
            other => panic!("expected LoopNest, got {other:?}"),
        }
    }

    #[test]
    fn affine_access_gets_a_guard() {
        // scenario 5 (spec.md §8): `if (i+1 < 16)`.
        let k = parse("A<16,32>[i+1,j] = B<16,32>[i,j];", &["B"], &["A"]);
        match k.stmts[0].kind() {
            StmtKind::LoopNest { bodies, .. } => match bodies[0].kind() {
                StmtKind::If { cond, t } => {
                    match cond.kind() {
                        ExprKind::Compare { op, b, .. } => {
                            assert_eq!(*op, CompareOp::LT);
                            assert_eq!(b.int_value(), Some(16));
                        }
                        other => panic!("expected Compare, got {other:?}"),
                    }
                    match t.kind() {
                        StmtKind::Move { .. } => {}
                        other => panic!("expected Move under guard, got {other:?}"),
                    }
                }
                other => panic!("expected If guard, got {other:?}"),
            },
            other => panic!("expected LoopNest, got {other:?}"),
        }
    }

    #[test]
    fn index_name_collision_keeps_smallest_extent() {
        let k = parse("B<4,6>[i,j] = A<4>[i];", &["A"], &["B"]);
        match k.stmts[0].kind() {
            StmtKind::LoopNest { indices, .. } => {
                assert_eq!(indices.len(), 2);
            }
            other => panic!("expected LoopNest, got {other:?}"),
        }
    }

    #[test]
    fn inputs_and_outputs_preserve_declaration_order_and_dedupe() {
        let k = parse(
            "C<4,4>[i,j] = A<4,4>[i,j] + A<4,4>[i,j];",
            &["A"],
            &["C"],
        );
        assert_eq!(k.inputs.len(), 1);
        assert_eq!(k.inputs[0].name(), Some("A"));
        assert_eq!(k.outputs.len(), 1);
        assert_eq!(k.outputs[0].name(), Some("C"));
    }

    #[test]
    fn floor_div_lowers_to_div() {
        let k = parse("C<4>[i] = A<4>[i] // B<4>[i];", &["A", "B"], &["C"]);
        match k.stmts[0].kind() {
            StmtKind::LoopNest { bodies, .. } => match bodies[0].kind() {
                StmtKind::Move { src, .. } => match src.kind() {
                    ExprKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::Div),
                    other => panic!("expected Binary, got {other:?}"),
                },
                other => panic!("expected Move, got {other:?}"),
            },
            other => panic!("expected LoopNest, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_is_a_fatal_parse_error() {
        let err = parse_kernel_source(
            "k",
            Type::float_scalar(32),
            vec![],
            vec![],
            "A<4>[i] = ;",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
