use std::fmt;

use nbformat::v4::{CellType, Notebook};
use serde::Serialize;
use serde_json::Value;

/// Placeholder for kernel or language identifiers the metadata does not carry.
pub const UNKNOWN: &str = "unknown";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NotebookInfo {
    pub cell_count: usize,
    pub code_cells: usize,
    pub markdown_cells: usize,
    pub raw_cells: usize,
    pub nbformat: i32,
    pub nbformat_minor: i32,
    pub kernel: String,
    pub language: String,
}

pub fn info(notebook: &Notebook) -> NotebookInfo {
    let count = |cell_type: CellType| {
        notebook
            .cells
            .iter()
            .filter(|cell| cell.cell_type() == cell_type)
            .count()
    };

    let field = |section: &str, key: &str| {
        notebook
            .metadata
            .get(section)
            .and_then(|value| value.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let kernel = field("kernelspec", "name").unwrap_or_else(|| UNKNOWN.to_string());
    let language = field("language_info", "name")
        .or_else(|| field("kernelspec", "language"))
        .unwrap_or_else(|| UNKNOWN.to_string());

    NotebookInfo {
        cell_count: notebook.cells.len(),
        code_cells: count(CellType::Code),
        markdown_cells: count(CellType::Markdown),
        raw_cells: count(CellType::Raw),
        nbformat: notebook.nbformat,
        nbformat_minor: notebook.nbformat_minor,
        kernel,
        language,
    }
}

impl fmt::Display for NotebookInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cells: {}", self.cell_count)?;
        writeln!(f, "  code: {}", self.code_cells)?;
        writeln!(f, "  markdown: {}", self.markdown_cells)?;
        writeln!(f, "  raw: {}", self.raw_cells)?;
        writeln!(f, "Format: {}.{}", self.nbformat, self.nbformat_minor)?;
        writeln!(f, "Kernel: {}", self.kernel)?;
        write!(f, "Language: {}", self.language)
    }
}
