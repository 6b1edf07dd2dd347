//! Document parsing collaborators.

use std::path::Path;

use crate::error::ParseError;
use crate::models::ParsedDocument;

/// Extensions read as plain UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst", "csv", "log", "text"];

/// Turns a source file into plain text.
pub trait DocumentParser: Send + Sync {
    fn supports(&self, path: &Path) -> bool;

    fn parse(&self, path: &Path) -> Result<ParsedDocument, ParseError>;
}

/// Reads UTF-8 text files as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    fn parse(&self, path: &Path) -> Result<ParsedDocument, ParseError> {
        if !self.supports(path) {
            return Err(ParseError::Unsupported(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes)
            .map_err(|_| ParseError::Unsupported(format!("{} is not UTF-8", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(ParsedDocument { content, file_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_text_extensions() {
        let parser = PlainTextParser;
        assert!(parser.supports(Path::new("notes.txt")));
        assert!(parser.supports(Path::new("README.MD")));
        assert!(!parser.supports(Path::new("manual.pdf")));
        assert!(!parser.supports(Path::new("Makefile")));
    }

    #[test]
    fn test_parse_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field-guide.txt");
        std::fs::write(&path, "Boil water for one minute.").unwrap();

        let document = PlainTextParser.parse(&path).unwrap();
        assert_eq!(document.file_name, "field-guide.txt");
        assert_eq!(document.content, "Boil water for one minute.");
    }

    #[test]
    fn test_parse_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            PlainTextParser.parse(&path),
            Err(ParseError::Unsupported(_))
        ));
        assert!(matches!(
            PlainTextParser.parse(&dir.path().join("image.png")),
            Err(ParseError::Unsupported(_))
        ));
    }
}
