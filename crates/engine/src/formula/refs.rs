//! Reference extraction from a formula AST.

use rustc_hash::FxHashSet;

use crate::position::Position;

use super::parser::Expr;

/// Collect every cell position named by the expression, deduplicated and
/// sorted in position order.
pub fn referenced_cells(expr: &Expr) -> Vec<Position> {
    let mut refs = FxHashSet::default();
    collect_refs(expr, &mut refs);
    let mut refs: Vec<Position> = refs.into_iter().collect();
    refs.sort_unstable();
    refs
}

fn collect_refs(expr: &Expr, refs: &mut FxHashSet<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::CellRef(pos) => {
            refs.insert(*pos);
        }
        Expr::UnaryOp { operand, .. } => collect_refs(operand, refs),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, refs);
            collect_refs(right, refs);
        }
    }
}
