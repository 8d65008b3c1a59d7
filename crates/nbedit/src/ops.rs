//! Mutating operations.
//!
//! Every function checks all of its preconditions before it touches the
//! notebook, so an `Err` always leaves the notebook exactly as it was passed in.

use std::ops::Range;

use nbformat::source::split_lines;
use nbformat::v4::{Cell, CellMetadata, CellType, Metadata, Notebook, Output};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EditError, Result};

/// A cell to be created by [`insert_cells`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewCell {
    #[serde(rename = "type", alias = "cell_type")]
    pub cell_type: CellType,
    #[serde(default)]
    pub source: String,
}

impl NewCell {
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            cell_type,
            source: source.into(),
        }
    }
}

pub(crate) fn check_index(notebook: &Notebook, index: usize) -> Result<()> {
    if index >= notebook.cells.len() {
        return Err(EditError::IndexOutOfBounds {
            index: index as i64,
            len: notebook.cells.len(),
        });
    }
    Ok(())
}

/// Position a cell inserted "after `anchor`" ends up at. `-1` (or anything
/// lower) means the front; anchors past the end append.
fn anchor_position(notebook: &Notebook, anchor: i64) -> usize {
    let len = notebook.cells.len() as i64;
    anchor.saturating_add(1).clamp(0, len) as usize
}

/// Insert a new cell immediately after `anchor`. Returns its index.
pub fn insert_cell(
    notebook: &mut Notebook,
    anchor: i64,
    cell_type: CellType,
    source: impl Into<String>,
) -> usize {
    let position = anchor_position(notebook, anchor);
    let cell = notebook.adopt(Cell::new(cell_type, source));
    notebook.cells.insert(position, cell);
    debug!(position, %cell_type, "inserted cell");
    position
}

/// Insert `cells` in order as one contiguous block after `anchor`.
pub fn insert_cells(notebook: &mut Notebook, anchor: i64, cells: Vec<NewCell>) -> Range<usize> {
    let position = anchor_position(notebook, anchor);
    let new_cells: Vec<Cell> = cells
        .into_iter()
        .map(|new| notebook.adopt(Cell::new(new.cell_type, new.source)))
        .collect();
    let inserted = position..position + new_cells.len();
    notebook.cells.splice(position..position, new_cells);
    debug!(start = inserted.start, count = inserted.len(), "inserted cells");
    inserted
}

/// Overwrite a cell's source, leaving type, metadata, and outputs alone.
pub fn replace_source(notebook: &mut Notebook, index: usize, source: impl Into<String>) -> Result<()> {
    check_index(notebook, index)?;
    notebook.cells[index].set_source(source);
    debug!(index, "replaced cell source");
    Ok(())
}

/// Remove and return the cell at `index`.
pub fn delete_cell(notebook: &mut Notebook, index: usize) -> Result<Cell> {
    check_index(notebook, index)?;
    let removed = notebook.cells.remove(index);
    debug!(index, cell_type = %removed.cell_type(), "deleted cell");
    Ok(removed)
}

/// Change a cell's type in place. Returns the previous type.
pub fn change_cell_type(notebook: &mut Notebook, index: usize, cell_type: CellType) -> Result<CellType> {
    check_index(notebook, index)?;
    let cell = notebook.cells.remove(index);
    let previous = cell.cell_type();
    notebook.cells.insert(index, cell.retype(cell_type));
    debug!(index, from = %previous, to = %cell_type, "changed cell type");
    Ok(previous)
}

/// Insert `count` independent copies of a cell right after it. Copies of code
/// cells start with no outputs and no execution count.
pub fn duplicate_cell(notebook: &mut Notebook, index: usize, count: usize) -> Result<Range<usize>> {
    check_index(notebook, index)?;
    if count == 0 {
        return Err(EditError::InvalidCount(0));
    }

    let copies: Vec<Cell> = (0..count)
        .map(|_| notebook.adopt(notebook.cells[index].fresh_copy()))
        .collect();
    let start = index + 1;
    notebook.cells.splice(start..start, copies);
    debug!(index, count, "duplicated cell");
    Ok(start..start + count)
}

/// Remove the cell at `from`, then insert it at `to` in the shortened list.
pub fn move_cell(notebook: &mut Notebook, from: usize, to: usize) -> Result<()> {
    check_index(notebook, from)?;
    check_index(notebook, to)?;
    let cell = notebook.cells.remove(from);
    notebook.cells.insert(to, cell);
    debug!(from, to, "moved cell");
    Ok(())
}

/// Split a cell so that lines `[line, end)` move into a new cell of the same
/// type placed right after it. Returns the new cell's index.
pub fn split_cell(notebook: &mut Notebook, index: usize, line: usize) -> Result<usize> {
    check_index(notebook, index)?;

    let cell = &notebook.cells[index];
    let lines = split_lines(cell.source());
    if line >= lines.len() {
        return Err(EditError::LineOutOfBounds {
            index,
            line: line as i64,
            line_count: lines.len(),
        });
    }
    let head = lines[..line].join("\n");
    let tail = lines[line..].join("\n");
    let cell_type = cell.cell_type();

    let new_cell = notebook.adopt(Cell::new(cell_type, tail));
    notebook.cells[index].set_source(head);
    notebook.cells.insert(index + 1, new_cell);
    debug!(index, line, "split cell");
    Ok(index + 1)
}

/// Append the next cell's source to this one (joined by `\n`) and drop the
/// next cell. The merged cell keeps this cell's type, metadata, and state.
pub fn merge_cells(notebook: &mut Notebook, index: usize) -> Result<()> {
    check_index(notebook, index)?;
    if index + 1 >= notebook.cells.len() {
        return Err(EditError::NoNextCell {
            index: index as i64,
        });
    }

    let next = notebook.cells.remove(index + 1);
    let cell = &mut notebook.cells[index];
    let merged = format!("{}\n{}", cell.source(), next.source());
    cell.set_source(merged);
    debug!(index, "merged cell with next");
    Ok(())
}

/// Shallow-merge `partial` into a cell's metadata.
pub fn edit_cell_metadata(notebook: &mut Notebook, index: usize, partial: CellMetadata) -> Result<()> {
    check_index(notebook, index)?;
    let metadata = notebook.cells[index].metadata_mut();
    let keys = partial.len();
    metadata.extend(partial);
    debug!(index, keys, "edited cell metadata");
    Ok(())
}

/// Replace a code cell's outputs wholesale.
pub fn set_outputs(notebook: &mut Notebook, index: usize, new_outputs: Vec<Output>) -> Result<()> {
    check_index(notebook, index)?;
    match &mut notebook.cells[index] {
        Cell::Code { outputs, .. } => {
            debug!(index, count = new_outputs.len(), "replaced outputs");
            *outputs = new_outputs;
            Ok(())
        }
        other => Err(EditError::NotACodeCell {
            index,
            cell_type: other.cell_type(),
        }),
    }
}

/// Clear one cell's outputs and execution count. Non-code cells are left as
/// they are; the return value says whether the cell was code.
pub fn clear_outputs(notebook: &mut Notebook, index: usize) -> Result<bool> {
    check_index(notebook, index)?;
    let cleared = notebook.cells[index].clear_outputs();
    debug!(index, cleared, "cleared outputs");
    Ok(cleared)
}

/// Clear every code cell. Returns how many code cells there were.
pub fn clear_all_outputs(notebook: &mut Notebook) -> usize {
    let cleared = notebook
        .cells
        .iter_mut()
        .map(Cell::clear_outputs)
        .filter(|was_code| *was_code)
        .count();
    debug!(cleared, "cleared all outputs");
    cleared
}

/// Shallow-merge `partial` into the document metadata.
pub fn edit_notebook_metadata(notebook: &mut Notebook, partial: Metadata) {
    let keys = partial.len();
    notebook.metadata.extend(partial);
    debug!(keys, "edited notebook metadata");
}
