// src/core/call_graph/resolver.rs
use std::collections::HashSet;
use tree_sitter::Node;

use super::syntax::{is_plain_member_name, ExpressionKind, ScopeKind};

/// Finds the sibling units a unit body calls directly
///
/// Calls made inside nested functions belong to those functions and are not
/// attributed to the unit being searched.
pub struct CallEdgeResolver<'a> {
    source: &'a str,
    siblings: HashSet<String>,
    scope_kind: ScopeKind,
    class_name: Option<String>,
}

impl<'a> CallEdgeResolver<'a> {
    pub fn new(source: &'a str, siblings: HashSet<String>, scope_kind: ScopeKind) -> Self {
        Self {
            source,
            siblings,
            scope_kind,
            class_name: None,
        }
    }

    pub fn with_class_name(mut self, class_name: Option<String>) -> Self {
        self.class_name = class_name;
        self
    }

    /// Sibling names invoked in `body`, in order of first appearance
    pub fn resolve(&self, body: Node) -> Vec<String> {
        let mut calls: Vec<String> = Vec::new();
        let mut stack = vec![body];

        while let Some(node) = stack.pop() {
            match ExpressionKind::classify(node.kind()) {
                ExpressionKind::FunctionBoundary => continue,
                ExpressionKind::Call => {
                    if let Some(callee) = self.callee_name(node) {
                        if self.siblings.contains(callee) && !calls.iter().any(|c| c == callee) {
                            calls.push(callee.to_string());
                        }
                    }
                }
                ExpressionKind::Other => {}
            }

            // Reverse so the stack pops children in source order
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        calls
    }

    /// Name of the invoked sibling, if the callee has a shape this scope resolves
    fn callee_name(&self, call: Node) -> Option<&'a str> {
        let function = call.child_by_field_name("function")?;

        match self.scope_kind {
            ScopeKind::Program | ScopeKind::Block => {
                (function.kind() == "identifier").then(|| self.node_text(function))
            }
            ScopeKind::ClassBody => {
                if function.kind() != "member_expression" {
                    return None;
                }
                let object = function.child_by_field_name("object")?;
                let property = function.child_by_field_name("property")?;
                if !is_plain_member_name(property.kind()) {
                    return None;
                }

                let on_class = match object.kind() {
                    "this" => true,
                    "identifier" => self.class_name.as_deref() == Some(self.node_text(object)),
                    _ => false,
                };
                on_class.then(|| self.node_text(property))
            }
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        &self.source[node.byte_range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{Parser, Tree};

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::language())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn siblings(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    /// Calls made by the first top-level function of `source`
    fn calls_of_first_function(source: &str, names: &[&str]) -> Vec<String> {
        let tree = parse(source);
        let function = tree.root_node().named_child(0).unwrap();
        let body = function.child_by_field_name("body").unwrap();
        CallEdgeResolver::new(source, siblings(names), ScopeKind::Program).resolve(body)
    }

    #[test]
    fn test_direct_calls_in_discovery_order() {
        let source = "function main() { if (ready()) { b(); } a(b()); console.log(c); }";
        let calls = calls_of_first_function(source, &["a", "b", "ready", "main"]);
        assert_eq!(calls, vec!["ready", "b", "a"]);
    }

    #[test]
    fn test_unknown_and_member_calls_are_ignored() {
        let source = "function main() { api.get('/data'); fetch(); helper(); }";
        let calls = calls_of_first_function(source, &["get", "helper"]);
        assert_eq!(calls, vec!["helper"]);
    }

    #[test]
    fn test_nested_function_boundaries_stop_the_search() {
        let source = r#"
function main() {
  items.map((item) => transform(item));
  const later = function () { cleanup(); };
  function inner() { other(); }
  return finish();
}
"#;
        let calls = calls_of_first_function(source, &["transform", "cleanup", "other", "finish"]);
        assert_eq!(calls, vec!["finish"]);
    }

    #[test]
    fn test_self_call_is_recorded() {
        let source = "function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }";
        assert_eq!(calls_of_first_function(source, &["fact"]), vec!["fact"]);
    }

    #[test]
    fn test_new_expression_is_not_a_call() {
        let source = "function make() { return new Thing(); }";
        assert!(calls_of_first_function(source, &["Thing"]).is_empty());
    }

    #[test]
    fn test_class_member_calls() {
        let source = r#"
class Widget {
  render() {
    this.layout();
    Widget.measure();
    other.paint();
    paint();
  }
}
"#;
        let tree = parse(source);
        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let method = body.named_child(0).unwrap();
        let method_body = method.child_by_field_name("body").unwrap();

        let resolver = CallEdgeResolver::new(
            source,
            siblings(&["layout", "measure", "paint"]),
            ScopeKind::ClassBody,
        )
        .with_class_name(Some("Widget".to_string()));

        assert_eq!(resolver.resolve(method_body), vec!["layout", "measure"]);
    }
}
