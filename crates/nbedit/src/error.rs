use nbformat::v4::CellType;
use thiserror::Error;

/// Why an operation was refused. The notebook is never modified when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Cell index {index} out of bounds (notebook has {len} cells)")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Cannot merge cell {index}: no next cell")]
    NoNextCell { index: i64 },

    #[error("Line number {line} out of bounds (cell {index} has {line_count} lines)")]
    LineOutOfBounds {
        index: usize,
        line: i64,
        line_count: usize,
    },

    #[error("Cell {index} is not a code cell (it is {cell_type})")]
    NotACodeCell { index: usize, cell_type: CellType },

    #[error("Duplicate count must be at least 1, got {0}")]
    InvalidCount(i64),
}

/// Coarse classification callers can map onto their own error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    IndexOutOfBounds,
    InvalidCellType,
    InvalidArgument,
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::IndexOutOfBounds { .. }
            | EditError::NoNextCell { .. }
            | EditError::LineOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            EditError::NotACodeCell { .. } => ErrorKind::InvalidCellType,
            EditError::InvalidCount(_) => ErrorKind::InvalidArgument,
        }
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
