//! Parsed arithmetic formulas.
//!
//! A [`Formula`] owns its AST and the sorted set of cell positions the
//! expression names. Evaluation goes through the [`eval::CellLookup`]
//! seam, so the formula itself never holds a reference into the sheet.

pub mod eval;
pub mod parser;
pub mod refs;

use std::fmt::Write as _;

use thiserror::Error;

use crate::cell::{CellValue, ErrorKind};
use crate::position::Position;

use self::eval::CellLookup;
use self::parser::{Expr, Op, UnaryOp};

/// Formula text that failed to parse (or named an out-of-bounds cell).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FormulaParseError {
    pub message: String,
}

/// A parsed arithmetic expression over literals, operators, parentheses,
/// and cell references.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
    refs: Vec<Position>,
}

impl Formula {
    /// Parse expression text (without the leading `=`).
    pub fn parse(expression: &str) -> Result<Formula, FormulaParseError> {
        let expr = parser::parse(expression)
            .map_err(|message| FormulaParseError { message })?;
        let refs = refs::referenced_cells(&expr);
        Ok(Formula { expr, refs })
    }

    /// Evaluate against a cell lookup. Returns `Number` or `Error`.
    pub fn evaluate(&self, lookup: &dyn CellLookup) -> CellValue {
        match eval::eval(&self.expr, lookup) {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            Ok(_) => CellValue::Error(ErrorKind::Div0),
            Err(kind) => CellValue::Error(kind),
        }
    }

    /// Canonical text with minimal parentheses.
    pub fn expression(&self) -> String {
        let mut out = String::new();
        write_expr(&mut out, &self.expr);
        out
    }

    /// Positions named by the expression, sorted and deduplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.refs
    }
}

// Precedence levels for printing: atoms bind tightest, unary next,
// multiplicative, then additive.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(_) | Expr::CellRef(_) => 4,
        Expr::UnaryOp { .. } => 3,
        Expr::BinaryOp { op: Op::Mul | Op::Div, .. } => 2,
        Expr::BinaryOp { op: Op::Add | Op::Sub, .. } => 1,
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Expr::CellRef(pos) => {
            let _ = write!(out, "{}", pos);
        }
        Expr::UnaryOp { op, operand } => {
            out.push(match op {
                UnaryOp::Plus => '+',
                UnaryOp::Neg => '-',
            });
            write_child(out, operand, precedence(operand) < 3);
        }
        Expr::BinaryOp { op, left, right } => {
            let prec = match op {
                Op::Mul | Op::Div => 2,
                Op::Add | Op::Sub => 1,
            };
            write_child(out, left, precedence(left) < prec);
            out.push(match op {
                Op::Add => '+',
                Op::Sub => '-',
                Op::Mul => '*',
                Op::Div => '/',
            });
            // Equal precedence on the right needs parentheses to keep the
            // left-associative reading (1-(2-3) must not print as 1-2-3).
            write_child(out, right, precedence(right) <= prec);
        }
    }
}

fn write_child(out: &mut String, child: &Expr, parens: bool) {
    if parens {
        out.push('(');
        write_expr(out, child);
        out.push(')');
    } else {
        write_expr(out, child);
    }
}
