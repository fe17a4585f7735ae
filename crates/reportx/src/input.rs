use std::path::Path;

use structure::{PhysicalPage, StructureConfig, StructuredDocument};

use crate::prelude::*;

/// On-disk input: the fragments of every physical page.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InputDocument {
    pub pages: Vec<PhysicalPage>,
}

/// Load the default configuration, overlaid with `path` when given.
pub fn load_config(path: Option<&Path>, retry_relaxed: bool) -> Result<StructureConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| f!("Failed to read config file {}", path.display()))?;
            StructureConfig::from_toml_str(&raw)
                .map_err(|e| eyre!("{}: {}", path.display(), e))?
        }
        None => StructureConfig::default(),
    };
    if retry_relaxed {
        config.boundary.retry_relaxed = true;
    }
    Ok(config)
}

pub fn load_document(path: &Path) -> Result<InputDocument> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("Failed to read input document {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidInput {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Load and structure one input document.
pub fn structure_file(path: &Path, config: &StructureConfig) -> Result<StructuredDocument> {
    let input = load_document(path)?;
    log::debug!("{}: {} physical pages", path.display(), input.pages.len());
    structure::structure_document(&input.pages, config)
        .map_err(|e| eyre!("{}: {}", path.display(), e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// A one-page document with a letter heading over two body lines.
    pub(crate) const LETTER_DOC: &str = r#"{
        "pages": [
            {
                "page_index": 0,
                "width": 600.0,
                "fragments": [
                    {"text": "Letter to Stakeholders", "bbox": [50.0, 60.0, 300.0, 74.0], "font_size": 14.0},
                    {"text": "Dear shareholders, this was a year of growth", "bbox": [50.0, 100.0, 400.0, 110.0], "font_size": 10.0},
                    {"text": "and our board thanks every employee for it", "bbox": [50.0, 114.0, 400.0, 124.0], "font_size": 10.0},
                    {"text": "missing geometry"}
                ]
            }
        ]
    }"#;

    fn write_temp(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_document() {
        let file = write_temp(LETTER_DOC, ".json");
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].fragments.len(), 4);
        assert!(doc.pages[0].fragments[3].bbox.is_none());
    }

    #[test]
    fn test_load_document_rejects_bad_json() {
        let file = write_temp("{\"pages\": 3}", ".json");
        let err = load_document(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_structure_file_finds_letter() {
        let file = write_temp(LETTER_DOC, ".json");
        let doc = structure_file(file.path(), &StructureConfig::default()).unwrap();
        let letter = doc.section(structure::SectionType::Letter).unwrap();
        assert_eq!(letter.start_page, 1);
        assert_eq!(doc.unplaced.len(), 1);
    }

    #[test]
    fn test_load_config_overrides() {
        let file = write_temp("[boundary]\nacceptance_floor = 0.6\n", ".toml");
        let config = load_config(Some(file.path()), true).unwrap();
        assert_eq!(config.boundary.acceptance_floor, 0.6);
        assert!(config.boundary.retry_relaxed);
        assert_eq!(
            config.reading_order.column_gutter,
            StructureConfig::default().reading_order.column_gutter
        );
    }

    #[test]
    fn test_load_config_defaults_and_errors() {
        let config = load_config(None, false).unwrap();
        assert!(!config.boundary.retry_relaxed);

        let invalid = write_temp("[boundary]\nacceptance_floor = 2.0\n", ".toml");
        assert!(load_config(Some(invalid.path()), false).is_err());

        assert!(load_config(Some(Path::new("/nonexistent/reportx.toml")), false).is_err());
    }
}
