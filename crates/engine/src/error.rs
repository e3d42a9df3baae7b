//! Mutation-tier errors.
//!
//! A failed mutation leaves the sheet untouched and surfaces one of the
//! variants below. Evaluation-tier errors never appear here: they are
//! values ([`crate::cell::CellValue::Error`]) that live inside cells and
//! propagate through downstream formulas.

use std::fmt;

use thiserror::Error;

use crate::formula::FormulaParseError;
use crate::position::Position;

/// The reference chain a rejected mutation would have closed into a loop.
///
/// The first and last entries are the position being written; the entries
/// between them follow the existing reference edges that lead back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTrace {
    cells: Vec<Position>,
}

impl CycleTrace {
    pub fn new(cells: Vec<Position>) -> Self {
        Self { cells }
    }

    /// Cells along the rejected cycle, in reference order.
    pub fn cells(&self) -> &[Position] {
        &self.cells
    }
}

impl fmt::Display for CycleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<String> = self.cells.iter().map(|p| p.to_string()).collect();
        write!(f, "circular reference: {}", chain.join(" → "))
    }
}

/// Error returned by a rejected sheet mutation or an invalid read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SheetError {
    /// The position lies outside the sheet bounds.
    #[error("invalid position ({}, {})", .0.row, .0.col)]
    InvalidPosition(Position),

    /// The text was a formula (`=`-prefixed) that did not parse.
    #[error("formula rejected: {0}")]
    Formula(#[from] FormulaParseError),

    /// Installing the cell would close a reference cycle.
    #[error("{0}")]
    Circular(CycleTrace),
}
