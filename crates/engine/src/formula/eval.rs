// Formula evaluator - walks the AST against a cell lookup.

use crate::cell::{CellValue, ErrorKind};
use crate::position::Position;

use super::parser::{Expr, Op, UnaryOp};

/// Read-through seam between the evaluator and the sheet.
///
/// The sheet implements this; evaluation never owns or mutates cells, it
/// only asks for the value at a position.
pub trait CellLookup {
    fn cell_value(&self, pos: Position) -> CellValue;
}

/// Evaluate an expression to a number, or the first error encountered.
///
/// Cell references coerce through the looked-up value: numbers pass
/// through, text must parse as a whole number (`Value` otherwise), and
/// error values propagate unchanged. Any non-finite intermediate result
/// becomes `Div0`.
pub(crate) fn eval(expr: &Expr, lookup: &dyn CellLookup) -> Result<f64, ErrorKind> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(pos) => {
            if !pos.is_valid() {
                return Err(ErrorKind::Ref);
            }
            coerce(lookup.cell_value(*pos))
        }
        Expr::UnaryOp { op, operand } => {
            let value = eval(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Neg => -value,
            })
        }
        Expr::BinaryOp { op, left, right } => {
            let lhs = eval(left, lookup)?;
            let rhs = eval(right, lookup)?;
            let value = match op {
                Op::Add => lhs + rhs,
                Op::Sub => lhs - rhs,
                Op::Mul => lhs * rhs,
                Op::Div => lhs / rhs,
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ErrorKind::Div0)
            }
        }
    }
}

fn coerce(value: CellValue) -> Result<f64, ErrorKind> {
    match value {
        CellValue::Number(n) => Ok(n),
        CellValue::Text(s) => s.parse::<f64>().map_err(|_| ErrorKind::Value),
        CellValue::Error(kind) => Err(kind),
    }
}
