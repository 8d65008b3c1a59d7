#[cfg(test)]
mod test {
    use nbformat::v4::{Cell, CellType};
    use nbformat::{
        parse_notebook, serialize_notebook, serialize_notebook_with, validate, NotebookError,
        SchemaViolation, SourceStyle,
    };
    use serde_json::Value;
    use std::fs;
    use std::path::Path;

    fn read_notebook(path: &str) -> String {
        fs::read_to_string(Path::new(path)).expect("Failed to read notebook file")
    }

    #[test]
    fn test_parse_v4_4_notebook() {
        let notebook_json = read_notebook("tests/notebooks/analysis4.4.ipynb");
        let notebook = parse_notebook(&notebook_json).expect("Failed to parse notebook");

        assert_eq!(notebook.format_version(), (4, 4));
        assert_eq!(notebook.cells.len(), 5);
        assert!(!notebook.requires_cell_ids());

        let kernelspec = notebook.kernelspec().expect("kernelspec");
        assert_eq!(kernelspec.name, "python3");
        let language_info = notebook.language_info().expect("language_info");
        assert_eq!(language_info.name, "python");
        assert_eq!(language_info.version.as_deref(), Some("3.11.4"));

        // Sources arrive as one joined string regardless of fragmenting
        let first = &notebook.cells[0];
        assert_eq!(first.cell_type(), CellType::Markdown);
        assert_eq!(first.source(), "# Sales analysis\n\nQuarterly figures, cleaned.");

        if let Cell::Code {
            execution_count,
            outputs,
            source,
            ..
        } = &notebook.cells[2]
        {
            assert_eq!(*execution_count, Some(2));
            assert_eq!(outputs.len(), 2);
            assert_eq!(outputs[0]["output_type"], "stream");
            assert_eq!(source, "print(growth(4, 5))\n1.25");
        } else {
            panic!("Expected code cell");
        }

        if let Cell::Markdown { attachments, .. } = &notebook.cells[3] {
            assert!(attachments.as_ref().is_some_and(Value::is_object));
        } else {
            panic!("Expected markdown cell");
        }

        assert_eq!(notebook.cells[4].cell_type(), CellType::Raw);
        assert_eq!(notebook.cells[4].metadata()["format"], "text/x-rst");
    }

    #[test]
    fn test_parse_v4_5_notebook_keeps_ids() {
        let notebook_json = read_notebook("tests/notebooks/ids4.5.ipynb");
        let notebook = parse_notebook(&notebook_json).expect("Failed to parse notebook");

        assert!(notebook.requires_cell_ids());
        let ids: Vec<&str> = notebook
            .cells
            .iter()
            .filter_map(|cell| cell.id().map(|id| id.as_str()))
            .collect();
        assert_eq!(ids, vec!["2fcdfa53", "38f37a24"]);
        assert_eq!(notebook.cells[1].execution_count(), Some(None));
    }

    #[test]
    fn test_open_all_notebooks_in_dir() {
        let dir = Path::new("tests/notebooks");
        for entry in fs::read_dir(dir).expect("Failed to read directory") {
            let entry = entry.expect("Failed to read entry");
            let path = entry.path();
            let path_str = path.to_str().expect("Failed to convert path to string");
            if !path_str.ends_with(".ipynb") {
                continue;
            }

            let notebook_json = read_notebook(path_str);
            let notebook = parse_notebook(&notebook_json);
            println!("Parsing notebook: {}", path_str);

            if path_str.contains("invalid_cell_id") || path_str.contains("missing_source") {
                assert!(
                    matches!(notebook, Err(NotebookError::JsonError(_))),
                    "Expected JsonError for invalid data in {}",
                    path_str
                );
            } else if path_str.contains("test3") {
                assert!(
                    matches!(notebook, Err(NotebookError::UnsupportedVersion(3, 0))),
                    "Expected UnsupportedVersion for {}",
                    path_str
                );
            } else {
                assert!(notebook.is_ok(), "Failed to parse notebook: {}", path_str);
            }
        }
    }

    #[test]
    fn test_validator_reports_structural_problems() {
        let missing: Value =
            serde_json::from_str(&read_notebook("tests/notebooks/missing_source.ipynb")).unwrap();
        assert_eq!(validate::validate(&missing), Err(SchemaViolation::MissingSource(0)));

        let legacy: Value =
            serde_json::from_str(&read_notebook("tests/notebooks/test3.ipynb")).unwrap();
        assert_eq!(
            validate::validate(&legacy),
            Err(SchemaViolation::MissingKey("cells"))
        );

        for path in ["tests/notebooks/analysis4.4.ipynb", "tests/notebooks/ids4.5.ipynb"] {
            let value: Value = serde_json::from_str(&read_notebook(path)).unwrap();
            assert_eq!(validate::validate(&value), Ok(()), "{} should validate", path);
        }
    }

    #[test]
    fn test_serialize_deserialize() {
        for path in ["tests/notebooks/analysis4.4.ipynb", "tests/notebooks/ids4.5.ipynb"] {
            let notebook_json = read_notebook(path);
            let notebook = parse_notebook(&notebook_json).expect("Failed to parse notebook");

            let serialized = serialize_notebook(&notebook).expect("Failed to serialize notebook");

            let original_value: Value =
                serde_json::from_str(&notebook_json).expect("Failed to parse original JSON");
            let serialized_value: Value =
                serde_json::from_str(&serialized).expect("Failed to parse serialized JSON");
            assert_eq!(original_value, serialized_value, "Structure mismatch for {}", path);

            // Exact text, down to indentation and the trailing newline
            assert_eq!(notebook_json, serialized);
        }
    }

    #[test]
    fn test_joined_sources_parse_back_identically() {
        let notebook_json = read_notebook("tests/notebooks/analysis4.4.ipynb");
        let notebook = parse_notebook(&notebook_json).unwrap();

        let joined = serialize_notebook_with(&notebook, SourceStyle::Joined).unwrap();
        let reparsed = parse_notebook(&joined).unwrap();
        assert_eq!(reparsed, notebook);
    }
}
