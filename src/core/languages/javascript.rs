use std::path::Path;
use tree_sitter::{Parser, Tree};

use crate::error::{ReadorderError, Result};
use super::LanguageParser;

/// JavaScript parser using Tree-sitter (JSX included)
pub struct JavaScriptParser {
    parser: Parser,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let javascript_language = tree_sitter_javascript::language();
        parser.set_language(&javascript_language)
            .map_err(|e| ReadorderError::Parser(format!("Failed to set JavaScript language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for JavaScriptParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Tree> {
        self.parser.parse(content, None)
            .ok_or_else(|| ReadorderError::Parser(format!(
                "Failed to parse JavaScript code in {}",
                file_path.display()
            )))
    }

    fn file_extensions(&self) -> &[&str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn language_name(&self) -> &str {
        "javascript"
    }
}
