//! Cell contents and values.
//!
//! A cell stores one of three contents: nothing, verbatim text, or a
//! parsed formula. Formula cells memoize their last evaluated value; the
//! sheet resets that memo whenever anything upstream changes.

use std::cell::RefCell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::formula::eval::CellLookup;
use crate::formula::{Formula, FormulaParseError};
use crate::position::Position;

/// First character marking formula input.
pub const FORMULA_SIGN: char = '=';
/// Leading character that keeps text literal (stripped from the value).
pub const ESCAPE_SIGN: char = '\'';

/// Evaluation-time error, surfaced as a cell value and propagated through
/// downstream formulas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A formula names a position outside the sheet bounds.
    Ref,
    /// Non-numeric text used in arithmetic.
    Value,
    /// Division by zero, or any non-finite result.
    Div0,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Ref => "#REF!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Div0 => "#DIV/0!",
        })
    }
}

/// The observable value of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(ErrorKind),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(kind) => write!(f, "{}", kind),
        }
    }
}

/// Stored form of a cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CellContent {
    Empty,
    Text(String),
    #[serde(skip)]
    Formula(Formula),
}

impl Default for CellContent {
    fn default() -> Self {
        CellContent::Empty
    }
}

/// One grid entry.
///
/// The evaluation memo lives behind a `RefCell` so reads through shared
/// references can fill it; only the owning sheet clears it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cell {
    content: CellContent,
    #[serde(skip)]
    cache: RefCell<Option<CellValue>>,
}

impl Cell {
    /// Classify raw input into a cell.
    ///
    /// Empty text is an empty cell; `=`-prefixed text of length > 1 parses
    /// as a formula; everything else (including a lone `=`) is text.
    pub fn parse(text: &str) -> Result<Cell, FormulaParseError> {
        let content = if text.is_empty() {
            CellContent::Empty
        } else if let Some(body) = text.strip_prefix(FORMULA_SIGN) {
            if body.is_empty() {
                CellContent::Text(text.to_string())
            } else {
                CellContent::Formula(Formula::parse(body)?)
            }
        } else {
            CellContent::Text(text.to_string())
        };
        Ok(Cell {
            content,
            cache: RefCell::new(None),
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// Source text: `""` for empty, the verbatim string for text (escape
    /// retained), `=` plus the canonical expression for formulas.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(formula) => {
                format!("{}{}", FORMULA_SIGN, formula.expression())
            }
        }
    }

    /// Observable value. Formula cells answer from the memo when it is
    /// filled and evaluate (then fill it) otherwise.
    pub fn value(&self, lookup: &dyn CellLookup) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Number(0.0),
            CellContent::Text(s) => {
                let stripped = s.strip_prefix(ESCAPE_SIGN).unwrap_or(s);
                CellValue::Text(stripped.to_string())
            }
            CellContent::Formula(formula) => {
                if let Some(cached) = self.cache.borrow().clone() {
                    return cached;
                }
                let value = formula.evaluate(lookup);
                *self.cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// Positions this cell's formula reads; empty for non-formula cells.
    pub fn referenced_cells(&self) -> &[Position] {
        match &self.content {
            CellContent::Formula(formula) => formula.referenced_cells(),
            _ => &[],
        }
    }

    /// True while the formula memo is filled. Non-formula cells never
    /// cache.
    pub fn has_cached_value(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub(crate) fn invalidate_cache(&self) {
        self.cache.borrow_mut().take();
    }
}
