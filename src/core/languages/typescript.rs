use std::path::Path;
use tree_sitter::{Parser, Tree};

use crate::error::{ReadorderError, Result};
use super::LanguageParser;

/// TypeScript parser using Tree-sitter
///
/// `.tsx` files need the TSX grammar; plain TypeScript rejects JSX.
pub struct TypeScriptParser {
    typescript: Parser,
    tsx: Parser,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self> {
        let mut typescript = Parser::new();
        typescript.set_language(&tree_sitter_typescript::language_typescript())
            .map_err(|e| ReadorderError::Parser(format!("Failed to set TypeScript language: {}", e)))?;

        let mut tsx = Parser::new();
        tsx.set_language(&tree_sitter_typescript::language_tsx())
            .map_err(|e| ReadorderError::Parser(format!("Failed to set TSX language: {}", e)))?;

        Ok(Self { typescript, tsx })
    }
}

impl LanguageParser for TypeScriptParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Tree> {
        let is_tsx = file_path.extension().and_then(|ext| ext.to_str()) == Some("tsx");
        let parser = if is_tsx { &mut self.tsx } else { &mut self.typescript };

        parser.parse(content, None)
            .ok_or_else(|| ReadorderError::Parser(format!(
                "Failed to parse TypeScript code in {}",
                file_path.display()
            )))
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "mts", "cts"]
    }

    fn language_name(&self) -> &str {
        "typescript"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_grammar_by_extension() {
        let mut parser = TypeScriptParser::new().unwrap();

        let ts = parser
            .parse("function id<T>(value: T): T { return value; }\n", Path::new("id.ts"))
            .unwrap();
        assert!(!ts.root_node().has_error());

        let tsx = parser
            .parse("const View = (): JSX.Element => <span />;\n", Path::new("view.tsx"))
            .unwrap();
        assert!(!tsx.root_node().has_error());
    }
}
