//! Read-only projections of a notebook.

use std::fmt;

use nbformat::source::{line_count, split_lines};
use nbformat::v4::{Cell, CellMetadata, CellType, Notebook, Output};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::ops::check_index;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#{1,6}\s+(.+?)(?:\s+#+)?\s*$").expect("valid heading regex"));

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:async\s+def|def|class)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid definition regex")
});

pub fn read_cell(notebook: &Notebook, index: usize) -> Result<&str> {
    check_index(notebook, index)?;
    Ok(notebook.cells[index].source())
}

pub fn read_cell_metadata(notebook: &Notebook, index: usize) -> Result<&CellMetadata> {
    check_index(notebook, index)?;
    Ok(notebook.cells[index].metadata())
}

/// Outputs of the cell at `index`; empty for non-code cells.
pub fn read_cell_outputs(notebook: &Notebook, index: usize) -> Result<&[Output]> {
    check_index(notebook, index)?;
    Ok(notebook.cells[index].outputs())
}

pub fn cell_count(notebook: &Notebook) -> usize {
    notebook.cells.len()
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub index: usize,
    pub cell_type: CellType,
    pub title: Option<String>,
    pub line_count: usize,
}

impl fmt::Display for OutlineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.cell_type)?;
        if let Some(title) = &self.title {
            write!(f, ": {}", title)?;
        }
        write!(f, " ({} lines)", self.line_count)
    }
}

/// One entry per cell, with a best-effort title taken from the first markdown
/// heading or the first `def`/`class` line.
pub fn outline(notebook: &Notebook) -> Vec<OutlineEntry> {
    notebook
        .cells
        .iter()
        .enumerate()
        .map(|(index, cell)| OutlineEntry {
            index,
            cell_type: cell.cell_type(),
            title: cell_title(cell),
            line_count: line_count(cell.source()),
        })
        .collect()
}

fn cell_title(cell: &Cell) -> Option<String> {
    let pattern = match cell.cell_type() {
        CellType::Markdown => &*HEADING,
        CellType::Code => &*DEFINITION,
        CellType::Raw => return None,
    };
    cell.source()
        .lines()
        .find_map(|line| pattern.captures(line))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// 1-based.
    pub line: usize,
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub index: usize,
    pub cell_type: CellType,
    pub matches: Vec<LineMatch>,
}

/// Plain substring search over every cell's source. A cell is reported when
/// its whole source contains `query`; each line that itself contains `query`
/// is listed with its trimmed text.
pub fn search(notebook: &Notebook, query: &str, case_sensitive: bool) -> Vec<SearchHit> {
    let fold = |text: &str| {
        if case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    };
    let needle = fold(query);

    let hits: Vec<SearchHit> = notebook
        .cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| fold(cell.source()).contains(&needle))
        .map(|(index, cell)| SearchHit {
            index,
            cell_type: cell.cell_type(),
            matches: split_lines(cell.source())
                .into_iter()
                .enumerate()
                .filter(|(_, line)| fold(line).contains(&needle))
                .map(|(i, line)| LineMatch {
                    line: i + 1,
                    text: line.trim().to_string(),
                })
                .collect(),
        })
        .collect();

    tracing::trace!(query, case_sensitive, hits = hits.len(), "searched notebook");
    hits
}
