//! The sheet: owner of all cells and of the dependency graph.
//!
//! All mutation goes through [`Sheet::set_cell`] and
//! [`Sheet::clear_cell`]; both either commit fully (cell installed,
//! edges swapped, downstream memos cleared) or leave the sheet exactly
//! as it was. Reads are pure and cells are only handed out by shared
//! reference.

use std::collections::VecDeque;
use std::io::{self, Write};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, CellValue, ErrorKind};
use crate::dep_graph::DepGraph;
use crate::error::{CycleTrace, SheetError};
use crate::formula::eval::CellLookup;
use crate::position::{Position, Size};

#[derive(Clone, Debug, Default)]
pub struct Sheet {
    cells: FxHashMap<Position, Cell>,
    deps: DepGraph,
}

impl CellLookup for Sheet {
    /// Read-through used by formula evaluation. Positions a formula can
    /// legally name are always in bounds, so the `Ref` arm only fires
    /// for lookups arriving from outside the engine.
    fn cell_value(&self, pos: Position) -> CellValue {
        if !pos.is_valid() {
            return CellValue::Error(ErrorKind::Ref);
        }
        match self.cells.get(&pos) {
            Some(cell) => cell.value(self),
            None => CellValue::Number(0.0),
        }
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell at `pos` from raw input text.
    ///
    /// The pipeline: validate the position, short-circuit when the text
    /// is unchanged, parse a candidate cell, probe the candidate's
    /// references for a cycle, invalidate downstream memos, then install
    /// the candidate and swap its reference edges in. A parse failure or
    /// cycle rejection happens before any state is touched.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if let Some(existing) = self.cells.get(&pos) {
            if existing.text() == text {
                return Ok(());
            }
        }

        let candidate = Cell::parse(text)?;

        if let Some(path) = self.deps.probe_cycle(pos, candidate.referenced_cells()) {
            return Err(SheetError::Circular(CycleTrace::new(path)));
        }

        self.invalidate_dependents(pos);

        let new_refs: FxHashSet<Position> =
            candidate.referenced_cells().iter().copied().collect();
        debug!("set {} = {:?} ({} refs)", pos, text, new_refs.len());
        self.deps.replace_edges(pos, new_refs);
        self.cells.insert(pos, candidate);
        Ok(())
    }

    /// Remove the cell at `pos` entirely.
    ///
    /// Cells that reference `pos` keep their edges; on their next read
    /// the absent position evaluates as an empty cell (zero).
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if !self.cells.contains_key(&pos) {
            return Ok(());
        }

        self.invalidate_dependents(pos);
        self.cells.remove(&pos);
        self.deps.clear_cell(pos);
        debug!("clear {}", pos);
        Ok(())
    }

    /// The stored cell at `pos`, if any. Cells are read-only from the
    /// outside; mutation goes through `set_cell`/`clear_cell`.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// Observable value at `pos`; absent cells read as empty (zero).
    pub fn value(&self, pos: Position) -> Result<CellValue, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cell_value(pos))
    }

    /// Source text at `pos`; absent cells read as `""`.
    pub fn text(&self, pos: Position) -> Result<String, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos).map(Cell::text).unwrap_or_default())
    }

    /// The dependency graph (read-only; useful for inspection and tests).
    pub fn dep_graph(&self) -> &DepGraph {
        &self.deps
    }

    /// Smallest rectangle, anchored at (0, 0), enclosing every cell
    /// whose text is non-empty. Explicitly stored empty cells do not
    /// count.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if cell.is_empty() {
                continue;
            }
            size.rows = size.rows.max(pos.row + 1);
            size.cols = size.cols.max(pos.col + 1);
        }
        size
    }

    /// Render evaluated values: rows top to bottom, cells tab-separated,
    /// one `\n` per row. Numbers use the default `f64` formatting, text
    /// renders verbatim (escape stripped), errors as their codes, and
    /// absent or empty cells as nothing.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    if !cell.is_empty() {
                        write!(out, "{}", cell.value(self))?;
                    }
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Render source text in the same layout as `print_values`.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", cell.text())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Clear the memo of every cell that transitively reads `pos`.
    ///
    /// BFS over the reverse edges; each downstream cell is visited once.
    fn invalidate_dependents(&self, pos: Position) {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut queue: VecDeque<Position> = self.deps.dependents(pos).collect();
        let mut cleared = 0usize;

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(cell) = self.cells.get(&current) {
                cell.invalidate_cache();
                cleared += 1;
            }
            queue.extend(self.deps.dependents(current));
        }

        if cleared > 0 {
            trace!("invalidated {} dependent memos of {}", cleared, pos);
        }
    }
}
