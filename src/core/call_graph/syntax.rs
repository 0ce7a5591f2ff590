// src/core/call_graph/syntax.rs
//! Classification of tree-sitter node kinds used by extraction and call
//! resolution. The JavaScript and TypeScript grammars share these names.

use serde::{Deserialize, Serialize};

/// Lexical scope whose direct children can be reordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Top level of a file
    Program,
    /// Statement block of a function body
    Block,
    /// Body of a class
    ClassBody,
}

/// Role of a direct child of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    FunctionDeclaration,
    VariableDeclaration,
    Export,
    Method,
    /// TypeScript overload signature, moved together with its implementation
    Signature,
    Decorator,
    Comment,
    Other,
}

impl StatementKind {
    pub fn classify(kind: &str) -> Self {
        match kind {
            "function_declaration" | "generator_function_declaration" => Self::FunctionDeclaration,
            "lexical_declaration" | "variable_declaration" => Self::VariableDeclaration,
            "export_statement" => Self::Export,
            "method_definition" => Self::Method,
            "function_signature" | "method_signature" => Self::Signature,
            "decorator" => Self::Decorator,
            "comment" => Self::Comment,
            _ => Self::Other,
        }
    }
}

/// Role of a node met while searching a body for calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// Starts a nested function scope; calls inside belong to it
    FunctionBoundary,
    Call,
    Other,
}

impl ExpressionKind {
    pub fn classify(kind: &str) -> Self {
        match kind {
            "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition" => Self::FunctionBoundary,
            "call_expression" => Self::Call,
            _ => Self::Other,
        }
    }
}

/// Whether a variable initializer is a function value
pub fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Whether a method or member name is a plain (non-computed) identifier
pub fn is_plain_member_name(kind: &str) -> bool {
    matches!(kind, "property_identifier" | "private_property_identifier")
}
