//! Language-specific parsers for the languages readorder can reorder
//!
//! Each language gets its own module with a consistent interface for turning
//! source code into a tree-sitter syntax tree.

mod javascript;
mod typescript;

pub use javascript::JavaScriptParser;
pub use typescript::TypeScriptParser;

use std::path::Path;
use tree_sitter::Tree;

use crate::error::Result;

/// Trait that all language parsers must implement
pub trait LanguageParser {
    /// Parse source code into a syntax tree
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Tree>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}
