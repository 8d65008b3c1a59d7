use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source::{deserialize_source, serialize_source};
use crate::validate::SchemaViolation;

/// Per-cell metadata. Kept as an open mapping so unknown keys round-trip.
pub type CellMetadata = serde_json::Map<String, Value>;

/// Document-level metadata (`kernelspec`, `language_info`, and anything else).
pub type Metadata = serde_json::Map<String, Value>;

/// An output record. The engine stores and replaces outputs wholesale and
/// never looks inside them.
pub type Output = Value;

/// Minor version used for documents created from scratch.
pub const DEFAULT_MINOR: i32 = 4;

/// First minor version whose cells carry an `id`.
pub const CELL_ID_MINOR: i32 = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notebook {
    pub metadata: Metadata,
    pub nbformat: i32,
    pub nbformat_minor: i32,
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// An empty v4.4 notebook with the given kernel and language descriptors.
    pub fn new(kernelspec: KernelSpec, language_info: LanguageInfo) -> Self {
        let mut metadata = Metadata::new();
        // Both structs serialize to JSON objects.
        if let Ok(value) = serde_json::to_value(kernelspec) {
            metadata.insert("kernelspec".into(), value);
        }
        if let Ok(value) = serde_json::to_value(language_info) {
            metadata.insert("language_info".into(), value);
        }

        Notebook {
            metadata,
            nbformat: 4,
            nbformat_minor: DEFAULT_MINOR,
            cells: Vec::new(),
        }
    }

    pub fn format_version(&self) -> (i32, i32) {
        (self.nbformat, self.nbformat_minor)
    }

    /// Whether cells in this document must carry an `id`.
    pub fn requires_cell_ids(&self) -> bool {
        self.nbformat_minor >= CELL_ID_MINOR
    }

    /// The `kernelspec` entry, if it is present and well formed.
    pub fn kernelspec(&self) -> Option<KernelSpec> {
        self.metadata
            .get("kernelspec")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The `language_info` entry, if it is present and well formed.
    pub fn language_info(&self) -> Option<LanguageInfo> {
        self.metadata
            .get("language_info")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Give `cell` a fresh id when this document requires one, or strip it
    /// when the document predates cell ids.
    pub fn adopt(&self, mut cell: Cell) -> Cell {
        if self.requires_cell_ids() {
            cell.set_id(Some(CellId::random()));
        } else {
            cell.set_id(None);
        }
        cell
    }

    /// Structural check of this document as it would be persisted.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let value = serde_json::to_value(self)
            .map_err(|e| SchemaViolation::Unserializable(e.to_string()))?;
        crate::validate::validate(&value)
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Notebook::new(KernelSpec::default(), LanguageInfo::default())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KernelSpec {
    pub display_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl Default for KernelSpec {
    fn default() -> Self {
        KernelSpec {
            display_name: "Python 3".to_string(),
            name: "python3".to_string(),
            language: Some("python".to_string()),
            additional: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LanguageInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl Default for LanguageInfo {
    fn default() -> Self {
        LanguageInfo {
            name: "python".to_string(),
            version: None,
            additional: HashMap::new(),
        }
    }
}

/// A cell id: 1 to 64 characters drawn from `[A-Za-z0-9_-]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CellId(String);

impl CellId {
    pub fn random() -> Self {
        uuid::Uuid::new_v4().into()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CellId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if value.is_empty() || value.len() > 64 || !valid_chars {
            return Err(format!("invalid cell id: {value:?}"));
        }
        Ok(CellId(value))
    }
}

impl From<CellId> for String {
    fn from(id: CellId) -> Self {
        id.0
    }
}

impl From<uuid::Uuid> for CellId {
    fn from(uuid: uuid::Uuid) -> Self {
        CellId(uuid.to_string())
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

impl CellType {
    pub const ALL: [CellType; 3] = [CellType::Code, CellType::Markdown, CellType::Raw];

    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(CellType::Code),
            "markdown" => Ok(CellType::Markdown),
            "raw" => Ok(CellType::Raw),
            other => Err(format!("unknown cell type {other:?} (expected code, markdown, or raw)")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cell_type")]
pub enum Cell {
    #[serde(rename = "code")]
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CellId>,
        #[serde(default)]
        metadata: CellMetadata,
        execution_count: Option<i32>,
        #[serde(
            deserialize_with = "deserialize_source",
            serialize_with = "serialize_source"
        )]
        source: String,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    #[serde(rename = "markdown")]
    Markdown {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CellId>,
        #[serde(default)]
        metadata: CellMetadata,
        #[serde(
            deserialize_with = "deserialize_source",
            serialize_with = "serialize_source"
        )]
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachments: Option<Value>,
    },
    #[serde(rename = "raw")]
    Raw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CellId>,
        #[serde(default)]
        metadata: CellMetadata,
        #[serde(
            deserialize_with = "deserialize_source",
            serialize_with = "serialize_source"
        )]
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachments: Option<Value>,
    },
}

impl Cell {
    /// Build a cell with empty metadata and no id. Code cells start with no
    /// execution count and no outputs.
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        let source = source.into();
        match cell_type {
            CellType::Code => Cell::Code {
                id: None,
                metadata: CellMetadata::new(),
                execution_count: None,
                source,
                outputs: Vec::new(),
            },
            CellType::Markdown => Cell::Markdown {
                id: None,
                metadata: CellMetadata::new(),
                source,
                attachments: None,
            },
            CellType::Raw => Cell::Raw {
                id: None,
                metadata: CellMetadata::new(),
                source,
                attachments: None,
            },
        }
    }

    /// Convert to `cell_type`, keeping id, metadata, and source.
    ///
    /// Becoming a code cell always starts from a clean execution state, even
    /// when the cell was already code; prior outputs are never restored.
    /// Leaving code drops execution count and outputs. Attachments survive
    /// between markdown and raw only.
    pub fn retype(self, cell_type: CellType) -> Cell {
        let (id, metadata, source, attachments) = match self {
            Cell::Code {
                id,
                metadata,
                source,
                ..
            } => (id, metadata, source, None),
            Cell::Markdown {
                id,
                metadata,
                source,
                attachments,
            }
            | Cell::Raw {
                id,
                metadata,
                source,
                attachments,
            } => (id, metadata, source, attachments),
        };

        match cell_type {
            CellType::Code => Cell::Code {
                id,
                metadata,
                execution_count: None,
                source,
                outputs: Vec::new(),
            },
            CellType::Markdown => Cell::Markdown {
                id,
                metadata,
                source,
                attachments,
            },
            CellType::Raw => Cell::Raw {
                id,
                metadata,
                source,
                attachments,
            },
        }
    }

    /// A deep copy with execution state reset and no id.
    pub fn fresh_copy(&self) -> Cell {
        let mut copy = self.clone();
        copy.set_id(None);
        copy.clear_outputs();
        copy
    }

    pub fn cell_type(&self) -> CellType {
        match self {
            Cell::Code { .. } => CellType::Code,
            Cell::Markdown { .. } => CellType::Markdown,
            Cell::Raw { .. } => CellType::Raw,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Cell::Code { .. })
    }

    pub fn id(&self) -> Option<&CellId> {
        match self {
            Cell::Code { id, .. } | Cell::Markdown { id, .. } | Cell::Raw { id, .. } => id.as_ref(),
        }
    }

    pub fn set_id(&mut self, new_id: Option<CellId>) {
        match self {
            Cell::Code { id, .. } | Cell::Markdown { id, .. } | Cell::Raw { id, .. } => {
                *id = new_id
            }
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Cell::Code { source, .. }
            | Cell::Markdown { source, .. }
            | Cell::Raw { source, .. } => source,
        }
    }

    pub fn set_source(&mut self, new_source: impl Into<String>) {
        match self {
            Cell::Code { source, .. }
            | Cell::Markdown { source, .. }
            | Cell::Raw { source, .. } => *source = new_source.into(),
        }
    }

    pub fn metadata(&self) -> &CellMetadata {
        match self {
            Cell::Code { metadata, .. }
            | Cell::Markdown { metadata, .. }
            | Cell::Raw { metadata, .. } => metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut CellMetadata {
        match self {
            Cell::Code { metadata, .. }
            | Cell::Markdown { metadata, .. }
            | Cell::Raw { metadata, .. } => metadata,
        }
    }

    /// Outputs of a code cell; empty for every other type.
    pub fn outputs(&self) -> &[Output] {
        match self {
            Cell::Code { outputs, .. } => outputs,
            _ => &[],
        }
    }

    /// `Some(count)` for code cells (the count itself may be `None`).
    pub fn execution_count(&self) -> Option<Option<i32>> {
        match self {
            Cell::Code {
                execution_count, ..
            } => Some(*execution_count),
            _ => None,
        }
    }

    /// Reset a code cell to no outputs and no execution count. Returns whether
    /// the cell was a code cell.
    pub fn clear_outputs(&mut self) -> bool {
        match self {
            Cell::Code {
                execution_count,
                outputs,
                ..
            } => {
                *execution_count = None;
                outputs.clear();
                true
            }
            _ => false,
        }
    }
}

/// Ids that appear on more than one cell, in first-repeat order.
pub fn duplicate_ids(cells: &[Cell]) -> Vec<CellId> {
    let mut seen = HashSet::new();
    cells
        .iter()
        .filter_map(Cell::id)
        .filter(|id| !seen.insert(*id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executed_code_cell() -> Cell {
        Cell::Code {
            id: Some(CellId::try_from("abc-123".to_string()).unwrap()),
            metadata: json!({ "tags": ["setup"] }).as_object().unwrap().clone(),
            execution_count: Some(7),
            source: "print('hi')".into(),
            outputs: vec![json!({ "output_type": "stream", "name": "stdout", "text": "hi\n" })],
        }
    }

    #[test]
    fn test_new_code_cell_has_clean_execution_state() {
        let cell = Cell::new(CellType::Code, "x = 1");
        assert_eq!(cell.cell_type(), CellType::Code);
        assert_eq!(cell.execution_count(), Some(None));
        assert!(cell.outputs().is_empty());
        assert!(cell.metadata().is_empty());
        assert!(cell.id().is_none());
    }

    #[test]
    fn test_new_markdown_cell_has_no_execution_state() {
        let cell = Cell::new(CellType::Markdown, "# Title");
        assert_eq!(cell.execution_count(), None);
        assert_eq!(cell.source(), "# Title");

        let value = serde_json::to_value(&cell).unwrap();
        assert!(value.get("outputs").is_none());
        assert!(value.get("execution_count").is_none());
    }

    #[test]
    fn test_retype_out_of_code_drops_outputs() {
        let markdown = executed_code_cell().retype(CellType::Markdown);
        assert_eq!(markdown.cell_type(), CellType::Markdown);
        assert_eq!(markdown.source(), "print('hi')");
        assert_eq!(markdown.id().map(CellId::as_str), Some("abc-123"));
        assert!(markdown.metadata().contains_key("tags"));
        assert!(markdown.outputs().is_empty());
    }

    #[test]
    fn test_retype_into_code_never_restores_outputs() {
        let round_trip = executed_code_cell()
            .retype(CellType::Raw)
            .retype(CellType::Code);
        assert_eq!(round_trip.execution_count(), Some(None));
        assert!(round_trip.outputs().is_empty());

        let code_to_code = executed_code_cell().retype(CellType::Code);
        assert_eq!(code_to_code.execution_count(), Some(None));
        assert!(code_to_code.outputs().is_empty());
    }

    #[test]
    fn test_fresh_copy_resets_state_and_id() {
        let original = executed_code_cell();
        let copy = original.fresh_copy();
        assert_eq!(copy.source(), original.source());
        assert_eq!(copy.metadata(), original.metadata());
        assert!(copy.id().is_none());
        assert_eq!(copy.execution_count(), Some(None));
        assert!(copy.outputs().is_empty());
        // The original is untouched
        assert_eq!(original.outputs().len(), 1);
    }

    #[test]
    fn test_clear_outputs_only_affects_code() {
        let mut code = executed_code_cell();
        assert!(code.clear_outputs());
        assert!(code.outputs().is_empty());

        let mut raw = Cell::new(CellType::Raw, "raw");
        assert!(!raw.clear_outputs());
    }

    #[test]
    fn test_cell_id_validation() {
        assert!(CellId::try_from("a".repeat(64)).is_ok());
        assert!(CellId::try_from("a".repeat(65)).is_err());
        assert!(CellId::try_from(String::new()).is_err());
        assert!(CellId::try_from("has space".to_string()).is_err());
        assert!(CellId::try_from(CellId::random().to_string()).is_ok());
    }

    #[test]
    fn test_cell_deserializes_from_either_source_shape() {
        let cell: Cell = serde_json::from_value(json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": ["a = 1\n", "b = 2"]
        }))
        .unwrap();
        assert_eq!(cell.source(), "a = 1\nb = 2");

        let value = serde_json::to_value(&cell).unwrap();
        assert_eq!(value["source"], json!(["a = 1\n", "b = 2"]));
        assert_eq!(value["execution_count"], json!(null));
    }

    #[test]
    fn test_markdown_attachments_round_trip() {
        let raw = json!({
            "attachments": { "image.png": { "image/png": "iVBOR" } },
            "cell_type": "markdown",
            "metadata": {},
            "source": ["![img](attachment:image.png)"]
        });
        let cell: Cell = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&cell).unwrap(), raw);
    }

    #[test]
    fn test_new_notebook_defaults() {
        let notebook = Notebook::default();
        assert_eq!(notebook.format_version(), (4, 4));
        assert!(notebook.cells.is_empty());
        assert_eq!(notebook.kernelspec().unwrap().name, "python3");
        assert_eq!(notebook.language_info().unwrap().name, "python");
        assert!(!notebook.requires_cell_ids());
    }

    #[test]
    fn test_adopt_assigns_ids_only_when_required() {
        let mut notebook = Notebook::default();
        let cell = notebook.adopt(Cell::new(CellType::Code, ""));
        assert!(cell.id().is_none());

        notebook.nbformat_minor = 5;
        let cell = notebook.adopt(Cell::new(CellType::Code, ""));
        assert!(cell.id().is_some());
    }

    #[test]
    fn test_duplicate_ids() {
        let id = CellId::try_from("same".to_string()).unwrap();
        let mut a = Cell::new(CellType::Code, "");
        let mut b = Cell::new(CellType::Raw, "");
        a.set_id(Some(id.clone()));
        b.set_id(Some(id.clone()));
        assert_eq!(duplicate_ids(&[a.clone(), b]), vec![id]);
        assert!(duplicate_ids(&[a]).is_empty());
    }
}
