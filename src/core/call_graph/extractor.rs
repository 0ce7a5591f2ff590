// src/core/call_graph/extractor.rs
use tree_sitter::Node;

use super::syntax::{is_function_value, is_plain_member_name, ScopeKind, StatementKind};
use super::unit::{ByteRange, CallableUnit, UnitKind};

/// A lexical scope whose direct children may be reordered
#[derive(Debug, Clone)]
pub struct Scope<'tree> {
    pub kind: ScopeKind,
    pub node: Node<'tree>,
    /// Name of the enclosing class, used to resolve `ClassName.method()` calls
    pub class_name: Option<String>,
}

impl<'tree> Scope<'tree> {
    pub fn new(kind: ScopeKind, node: Node<'tree>) -> Self {
        Self {
            kind,
            node,
            class_name: None,
        }
    }

    pub fn with_class_name(mut self, class_name: Option<String>) -> Self {
        self.class_name = class_name;
        self
    }

    pub fn span(&self) -> ByteRange {
        self.node.byte_range().into()
    }
}

/// A unit together with the body nodes its calls are searched in
///
/// Most units have one body; a getter and setter pair has two.
#[derive(Debug, Clone)]
pub struct ExtractedUnit<'tree> {
    pub unit: CallableUnit,
    pub bodies: Vec<Node<'tree>>,
}

/// Scans the direct children of a scope for named callable units
pub struct CallableUnitExtractor<'a> {
    source: &'a str,
}

impl<'a> CallableUnitExtractor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Extract units in source order, with ranges and leading comments set
    pub fn extract<'tree>(&self, scope: &Scope<'tree>) -> Vec<ExtractedUnit<'tree>> {
        let mut cursor = scope.node.walk();
        let children: Vec<Node<'tree>> = scope.node.children(&mut cursor).collect();
        let mut units: Vec<ExtractedUnit<'tree>> = Vec::new();
        // Child position of the last unit, and whether it may take an accessor partner
        let mut last: Option<(usize, bool)> = None;

        for (position, child) in children.iter().enumerate() {
            let Some((mut unit, body)) = self.unit_from_statement(*child, scope.kind) else {
                continue;
            };
            let accessor = unit.kind == UnitKind::Method && is_accessor(*child);

            // `get x()` and `set x(v)` side by side move as one unit
            if accessor {
                if let (Some((last_position, true)), Some(previous)) = (last, units.last_mut()) {
                    let adjacent = children[last_position + 1..position].iter().all(|between| {
                        StatementKind::classify(between.kind()) == StatementKind::Comment
                            || between.kind() == ";"
                    });
                    if adjacent && previous.unit.name == unit.name {
                        previous.unit.range.end = unit.range.end;
                        previous.bodies.extend(body);
                        last = Some((position, false));
                        continue;
                    }
                }
            }

            let first = self.prefix_start(&children, position, &unit.name);
            unit.range.start = children[first].start_byte();
            unit.leading_comments = self.leading_comments(&children, first);
            units.push(ExtractedUnit {
                unit,
                bodies: body.into_iter().collect(),
            });
            last = Some((position, accessor));
        }

        units
    }

    /// Recognise a callable unit in one statement of the scope
    fn unit_from_statement<'tree>(
        &self,
        node: Node<'tree>,
        scope_kind: ScopeKind,
    ) -> Option<(CallableUnit, Option<Node<'tree>>)> {
        let in_class = scope_kind == ScopeKind::ClassBody;

        match StatementKind::classify(node.kind()) {
            StatementKind::FunctionDeclaration if !in_class => {
                let name = self.node_text(node.child_by_field_name("name")?);
                Some((
                    CallableUnit::new(name, UnitKind::Declaration, node.byte_range().into()),
                    node.child_by_field_name("body"),
                ))
            }
            StatementKind::VariableDeclaration if !in_class => self.function_binding(node),
            StatementKind::Export if !in_class => {
                let (mut unit, body) = self.exported_unit(node, scope_kind)?;
                // The `export` keyword moves with the definition
                unit.range = ByteRange::new(node.start_byte(), self.statement_end(node));
                Some((unit, body))
            }
            StatementKind::Method if in_class => {
                let name_node = node.child_by_field_name("name")?;
                if !is_plain_member_name(name_node.kind()) {
                    return None;
                }
                Some((
                    CallableUnit::new(
                        self.node_text(name_node),
                        UnitKind::Method,
                        node.byte_range().into(),
                    ),
                    node.child_by_field_name("body"),
                ))
            }
            _ => None,
        }
    }

    /// `export function f() {}`, `export const f = () => {}` and
    /// `export default function f() {}`
    fn exported_unit<'tree>(
        &self,
        node: Node<'tree>,
        scope_kind: ScopeKind,
    ) -> Option<(CallableUnit, Option<Node<'tree>>)> {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            return self.unit_from_statement(declaration, scope_kind);
        }

        // A named default-exported function expression still binds its name
        let value = node.child_by_field_name("value")?;
        if !is_function_value(value.kind()) {
            return None;
        }
        let name = self.node_text(value.child_by_field_name("name")?);
        Some((
            CallableUnit::new(name, UnitKind::Declaration, node.byte_range().into()),
            value.child_by_field_name("body"),
        ))
    }

    /// `const f = () => {}` with exactly one declarator bound to a function
    fn function_binding<'tree>(&self, node: Node<'tree>) -> Option<(CallableUnit, Option<Node<'tree>>)> {
        let mut cursor = node.walk();
        let declarators: Vec<Node<'tree>> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();

        // Several declarators cannot be moved as one definition
        if declarators.len() != 1 {
            return None;
        }
        let declarator = declarators[0];

        let name_node = declarator.child_by_field_name("name")?;
        if name_node.kind() != "identifier" {
            return None;
        }
        let value = declarator.child_by_field_name("value")?;
        if !is_function_value(value.kind()) {
            return None;
        }

        Some((
            CallableUnit::new(
                self.node_text(name_node),
                UnitKind::Expression,
                ByteRange::new(node.start_byte(), self.statement_end(node)),
            ),
            value.child_by_field_name("body"),
        ))
    }

    /// End of a statement, leaving out a `;` that sits alone on a later line
    ///
    /// Code written without semicolons guards lines starting with `(` or `[`
    /// by a leading `;`. The grammar gives that `;` to the statement above,
    /// but it belongs to the line below and must not move away from it.
    fn statement_end(&self, node: Node) -> usize {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            if declaration.end_byte() == node.end_byte() {
                return self.statement_end(declaration);
            }
        }

        let count = node.child_count();
        if count >= 2 {
            if let (Some(last), Some(before)) = (node.child(count - 1), node.child(count - 2)) {
                if last.kind() == ";" && last.start_position().row > before.end_position().row {
                    return before.end_byte();
                }
            }
        }

        node.end_byte()
    }

    /// Index of the first sibling that belongs to the unit at `position`:
    /// decorators and same-name overload signatures directly above it
    fn prefix_start(&self, children: &[Node], position: usize, name: &str) -> usize {
        let mut first = position;
        let mut cursor = position;

        while cursor > 0 {
            let previous = children[cursor - 1];
            match StatementKind::classify(previous.kind()) {
                StatementKind::Decorator => {
                    cursor -= 1;
                    first = cursor;
                }
                StatementKind::Signature | StatementKind::Export
                    if self.signature_name(previous).as_deref() == Some(name) =>
                {
                    cursor -= 1;
                    first = cursor;
                }
                // Comments and stray `;` inside the prefix are kept with it
                StatementKind::Comment => cursor -= 1,
                _ if previous.kind() == ";" => cursor -= 1,
                _ => break,
            }
        }

        first
    }

    /// Name declared by an overload signature, looking through `export`
    fn signature_name(&self, node: Node) -> Option<String> {
        match StatementKind::classify(node.kind()) {
            StatementKind::Signature => node
                .child_by_field_name("name")
                .map(|name| self.node_text(name)),
            StatementKind::Export => node
                .child_by_field_name("declaration")
                .filter(|declaration| StatementKind::classify(declaration.kind()) == StatementKind::Signature)
                .and_then(|declaration| self.signature_name(declaration)),
            _ => None,
        }
    }

    /// Comments directly above `children[first]`
    ///
    /// The run stops at a blank line, at code, and at a comment that trails
    /// code on its own line.
    fn leading_comments(&self, children: &[Node], first: usize) -> Vec<ByteRange> {
        let mut comments = Vec::new();
        let mut next_start = children[first].start_byte();
        let mut position = first;

        while position > 0 {
            let candidate = children[position - 1];
            if StatementKind::classify(candidate.kind()) != StatementKind::Comment {
                break;
            }
            if !self.is_adjacent(candidate.end_byte(), next_start) {
                break;
            }
            if position >= 2 {
                let before = children[position - 2];
                let trails_code = StatementKind::classify(before.kind()) != StatementKind::Comment
                    && before.end_position().row == candidate.start_position().row;
                if trails_code {
                    break;
                }
            }

            comments.push(candidate.byte_range().into());
            next_start = candidate.start_byte();
            position -= 1;
        }

        comments.reverse();
        comments
    }

    /// Only whitespace with at most one line break between `end` and `start`
    fn is_adjacent(&self, end: usize, start: usize) -> bool {
        match self.source.get(end..start) {
            Some(gap) => gap.chars().all(char::is_whitespace) && gap.matches('\n').count() <= 1,
            None => false,
        }
    }

    fn node_text(&self, node: Node) -> String {
        self.source[node.byte_range()].to_string()
    }
}

/// Whether a method definition is a `get` or `set` accessor
fn is_accessor(method: Node) -> bool {
    let mut cursor = method.walk();
    let accessor = method
        .children(&mut cursor)
        .any(|child| matches!(child.kind(), "get" | "set"));
    accessor
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

    fn extract(source: &str) -> Vec<CallableUnit> {
        let tree = parse(source);
        let scope = Scope::new(ScopeKind::Program, tree.root_node());
        CallableUnitExtractor::new(source)
            .extract(&scope)
            .into_iter()
            .map(|extracted| extracted.unit)
            .collect()
    }

    fn names(units: &[CallableUnit]) -> Vec<&str> {
        units.iter().map(|unit| unit.name.as_str()).collect()
    }

    #[test]
    fn test_extracts_declarations_and_bindings() {
        let source = r#"
function a() {}
const b = () => {};
let c = function () {};
var d = function* () {};
const notAFunction = 42;
export function e() {}
export const f = async () => {};
"#;
        let units = extract(source);
        assert_eq!(names(&units), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(units[0].kind, UnitKind::Declaration);
        assert_eq!(units[1].kind, UnitKind::Expression);
    }

    #[test]
    fn test_ranges_cover_whole_statement() {
        let source = "const b = () => {\n  return 1;\n};\nexport function e() {}\n";
        let units = extract(source);

        assert_eq!(&source[units[0].range.start..units[0].range.end], "const b = () => {\n  return 1;\n};");
        assert_eq!(&source[units[1].range.start..units[1].range.end], "export function e() {}");
    }

    #[test]
    fn test_nested_functions_are_not_siblings() {
        let source = r#"
function outer() {
  function inner() {
    return 'inner';
  }
  return inner();
}

function another() {
  return 'another';
}
"#;
        assert_eq!(names(&extract(source)), vec!["outer", "another"]);
    }

    #[test]
    fn test_multi_declarator_statements_are_skipped() {
        let source = "const a = () => 1, b = () => 2;\nfunction c() {}\n";
        assert_eq!(names(&extract(source)), vec!["c"]);
    }

    #[test]
    fn test_adjacent_comment_is_attached() {
        let source = "// about a\n/* more */\nfunction a() {}\n";
        let units = extract(source);

        assert_eq!(units[0].leading_comments.len(), 2);
        assert_eq!(units[0].full_start(), 0);
    }

    #[test]
    fn test_blank_line_detaches_comment() {
        let source = "// file header\n\nfunction a() {}\n";
        let units = extract(source);

        assert!(units[0].leading_comments.is_empty());
        assert_eq!(units[0].full_start(), source.find("function").unwrap());
    }

    #[test]
    fn test_blank_line_inside_comment_run_stops_it() {
        let source = "// detached\n\n// attached\nfunction a() {}\n";
        let units = extract(source);

        assert_eq!(units[0].leading_comments.len(), 1);
        assert_eq!(units[0].full_start(), source.find("// attached").unwrap());
    }

    #[test]
    fn test_trailing_comment_is_not_attached() {
        let source = "function a() {} // trailing\nfunction b() {}\n";
        let units = extract(source);

        assert!(units[1].leading_comments.is_empty());
    }

    #[test]
    fn test_leading_semicolon_stays_with_the_next_line() {
        let source = "const b = () => 1\nconst a = () => b()\n;(init)()\nexport const c = () => 2\n;[1].map(c)\n";
        let units = extract(source);

        assert_eq!(names(&units), vec!["b", "a", "c"]);
        assert_eq!(&source[units[1].range.start..units[1].range.end], "const a = () => b()");
        assert_eq!(&source[units[2].range.start..units[2].range.end], "export const c = () => 2");
    }

    #[test]
    fn test_same_line_semicolon_is_kept() {
        let source = "const a = () => 1;\n";
        let units = extract(source);

        assert_eq!(&source[units[0].range.start..units[0].range.end], "const a = () => 1;");
    }

    fn extract_class<'t>(source: &str, tree: &'t Tree) -> Vec<ExtractedUnit<'t>> {
        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let scope = Scope::new(ScopeKind::ClassBody, body);
        CallableUnitExtractor::new(source).extract(&scope)
    }

    #[test]
    fn test_accessor_pair_is_one_unit() {
        let source = "class K {\n  helper() {}\n  get value() { return this.helper(); }\n  // store it\n  set value(v) { this.save(v); }\n  get other() {}\n}\n";
        let tree = parse(source);
        let extracted = extract_class(source, &tree);
        let units: Vec<&CallableUnit> = extracted.iter().map(|extracted| &extracted.unit).collect();

        assert_eq!(
            units.iter().map(|unit| unit.name.as_str()).collect::<Vec<_>>(),
            vec!["helper", "value", "other"]
        );
        assert_eq!(
            &source[units[1].range.start..units[1].range.end],
            "get value() { return this.helper(); }\n  // store it\n  set value(v) { this.save(v); }"
        );
        assert_eq!(extracted[1].bodies.len(), 2);
        assert_eq!(extracted[2].bodies.len(), 1);
    }

    #[test]
    fn test_method_named_get_is_not_an_accessor() {
        let source = "class K {\n  get() {}\n  set() {}\n}\n";
        let tree = parse(source);
        let extracted = extract_class(source, &tree);

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].unit.name, "get");
        assert_eq!(extracted[1].unit.name, "set");
    }

    #[test]
    fn test_class_methods() {
        let source = r#"
class Widget {
  constructor() {
    this.render();
  }
  render() {}
  static create() {}
  ['computed']() {}
}
"#;
        let tree = parse(source);
        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let scope = Scope::new(ScopeKind::ClassBody, body);

        let units: Vec<CallableUnit> = CallableUnitExtractor::new(source)
            .extract(&scope)
            .into_iter()
            .map(|extracted| extracted.unit)
            .collect();
        assert_eq!(names(&units), vec!["constructor", "render", "create"]);
        assert!(units.iter().all(|unit| unit.kind == UnitKind::Method));
    }
}
