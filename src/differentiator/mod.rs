//! # Differentiator
//!
//! Symbolic differentiation over a separate, minimal string-AST — not
//! the typed IR. Three levels (spec.md §4.4): a statement is a sum of
//! products, a product is a product of atoms, an atom is either a
//! numeric literal or a `Name<shape>[indices]` reference. Splitting is
//! plain character splitting on `=`/`+`/`*`, matching this codebase's
//! other surface-syntax parsers (e.g. [`crate::parser`]'s sibling
//! driver-facing string helpers) rather than a tokenizing pass — the
//! grammar here is linear, with no nested parentheses to track.

use crate::error::{CompileError, Result};
use std::collections::BTreeSet;

/// One atom as it appeared in the source: either a bare numeric
/// literal or `Name<shape>[idx]`, kept as its literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Atom {
    full: String,
}

impl Atom {
    fn parse(text: &str) -> Atom {
        Atom { full: text.trim().to_string() }
    }

    fn is_number(&self) -> bool {
        !self.full.contains('<')
    }

    /// The name preceding `<shape>`, or the whole text for a numeric
    /// literal (never matches a real variable name).
    fn name(&self) -> &str {
        match self.full.find('<') {
            Some(p) => self.full[..p].trim(),
            None => self.full.trim(),
        }
    }
}

/// The parsed `E1` level: an LHS atom plus a sum of `E2` product terms.
struct ForwardStatement {
    lhs: Atom,
    terms: Vec<Vec<Atom>>,
}

fn parse_forward(source: &str) -> Result<ForwardStatement> {
    let trimmed = source.trim().trim_end_matches(';').trim();
    let mut halves = trimmed.splitn(2, '=');
    let lhs_str = halves.next().filter(|s| !s.trim().is_empty());
    let rhs_str = halves.next();
    let (lhs_str, rhs_str) = match (lhs_str, rhs_str) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(CompileError::Differentiate(format!(
                "forward statement has no top-level '=': {source:?}"
            )))
        }
    };
    let lhs = Atom::parse(lhs_str);
    let terms = rhs_str
        .split('+')
        .map(|term| term.split('*').map(Atom::parse).collect())
        .collect();
    Ok(ForwardStatement { lhs, terms })
}

/// One target's derivative: the re-stringified `dTARGET = ...;`
/// statement plus the free variables (its `ins`) it reads, already
/// `d`-prefixed where the atom itself was differentiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivative {
    pub kernel: String,
    pub ins: BTreeSet<String>,
}

/// True when differentiating `stmt` against `lhs_name`/`target` is
/// ambiguous per spec.md §7 ("LHS = target, multiple identical
/// atoms"): either the output being differentiated is itself the
/// target (a factor named `lhs_name` can no longer be told apart from
/// one named `target` — they're the same name), or some term holds two
/// syntactically identical atoms that both match `lhs_name`/`target`,
/// so there is no single factor the swap could apply to.
fn is_ambiguous(stmt: &ForwardStatement, lhs_name: &str, target: &str) -> bool {
    if lhs_name == target {
        return true;
    }
    stmt.terms.iter().any(|term| {
        let mut seen = BTreeSet::new();
        term.iter()
            .filter(|a| !a.is_number() && (a.name() == lhs_name || a.name() == target))
            .any(|a| !seen.insert(a.full.clone()))
    })
}

/// Differentiate `forward_kernel` (the `lhs_name`'s forward statement)
/// with respect to `target`.
///
/// For each RHS term, product-rule differentiation considers each
/// factor in turn: a factor named `lhs_name` or `target` survives
/// (marked `d`), contributing one variant of the term; any other
/// factor's derivative is zero and the whole variant is dropped. The
/// differentiated factor is re-indexed by the transpose swap (spec.md
/// §4.4 "Index swap": a `lhs_name`-named factor swaps in the target's
/// full reference string and vice versa) and rendered first in its
/// term, with the remaining factors following in their original
/// relative order. The statement's own LHS atom is handled the same
/// way outside the term loop: its derivative, after the swap, becomes
/// literally the new statement's LHS (`d` + the target's full
/// reference string) and is excluded from the free-variable set, same
/// as the reference implementation's `collectIns` skipping the
/// flattened sum's first entry.
///
/// When the differentiation is ambiguous (spec.md §7), no product-rule
/// expansion is attempted: the result is the degenerate `0` right-hand
/// side, with an empty `ins` set, rather than an aborted run.
pub fn differentiate(forward_kernel: &str, lhs_name: &str, target: &str) -> Result<Derivative> {
    let stmt = parse_forward(forward_kernel)?;

    let lhs_full = stmt.lhs.full.clone();
    let target_full = stmt
        .terms
        .iter()
        .flatten()
        .find(|a| !a.is_number() && a.name() == target)
        .map(|a| a.full.clone())
        .ok_or_else(|| {
            CompileError::Differentiate(format!(
                "differentiation target '{target}' does not appear in: {forward_kernel:?}"
            ))
        })?;

    let new_lhs = format!("d{target_full}");

    if is_ambiguous(&stmt, lhs_name, target) {
        return Ok(Derivative { kernel: format!("{new_lhs} = 0;"), ins: BTreeSet::new() });
    }

    let mut ins = BTreeSet::new();
    let mut rendered_terms = Vec::new();

    for term in &stmt.terms {
        for (k, atom_k) in term.iter().enumerate() {
            if atom_k.is_number() {
                continue;
            }
            let swapped_full = if atom_k.name() == lhs_name {
                target_full.clone()
            } else if atom_k.name() == target {
                lhs_full.clone()
            } else {
                continue; // d(atom_k) == 0 for this target: prune the variant
            };
            ins.insert(format!("d{}", Atom::parse(&swapped_full).name()));

            let mut pieces = vec![format!("d{swapped_full}")];
            for (j, other) in term.iter().enumerate() {
                if j == k {
                    continue;
                }
                pieces.push(other.full.clone());
                if !other.is_number() {
                    ins.insert(other.name().to_string());
                }
            }
            rendered_terms.push(pieces.join(" * "));
        }
    }

    // No term contained a factor matching `lhs_name`/`target`: the
    // derivative is zero, same degenerate-`0` rendering as the
    // ambiguous case above, just reached by a different route.
    let rhs = if rendered_terms.is_empty() {
        "0".to_string()
    } else {
        rendered_terms.join(" + ")
    };

    Ok(Derivative { kernel: format!("{new_lhs} = {rhs};"), ins })
}

/// One JSON case's worth of gradient output: every target in
/// `grad_to`, concatenated into a single kernel string and a single
/// `ins` set, with `outs` in target order — matching the reference
/// driver's one-output-file-per-case behavior (spec.md §6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradientCase {
    pub ins: Vec<String>,
    pub outs: Vec<String>,
    pub kernel: String,
}

pub fn differentiate_case(
    forward_kernel: &str,
    lhs_name: &str,
    targets: &[String],
) -> Result<GradientCase> {
    let mut ins = BTreeSet::new();
    let mut outs = Vec::with_capacity(targets.len());
    let mut kernel = String::new();
    for target in targets {
        let d = differentiate(forward_kernel, lhs_name, target)?;
        ins.extend(d.ins);
        outs.push(format!("d{target}"));
        kernel.push_str(&d.kernel);
    }
    Ok(GradientCase { ins: ins.into_iter().collect(), outs, kernel })
}
