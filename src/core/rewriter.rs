// src/core/rewriter.rs
use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ReadorderError, Result};
use super::call_graph::{ByteRange, CallableUnit, UnitKind};

/// Characters that continue an expression across a line break when the
/// statement before them has no `;`
const CONTINUATION_STARTS: [char; 6] = ['(', '[', '`', '+', '-', '/'];

/// Replacement of one byte range of a source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splice {
    pub range: ByteRange,
    pub replacement: String,
}

impl Splice {
    /// Apply the splice to the text it was planned against
    pub fn apply(&self, text: &str) -> String {
        let mut result = String::with_capacity(
            text.len() - self.range.len() + self.replacement.len(),
        );
        result.push_str(&text[..self.range.start]);
        result.push_str(&self.replacement);
        result.push_str(&text[self.range.end..]);
        result
    }
}

/// Result of rendering one scope in a new order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutcome {
    pub changed: bool,
    pub new_text: Option<String>,
}

impl RenderOutcome {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            new_text: None,
        }
    }
}

/// Render `original` with `units` rearranged into `ordered`
///
/// Returns `changed: false` when the order already matches the source, and
/// also when the units' ranges cannot be trusted; it never produces a
/// partial splice.
pub fn render(original: &str, units: &[CallableUnit], ordered: &[String]) -> RenderOutcome {
    SourceRewriter::new(original).render(units, ordered)
}

/// Rearranges unit spans, with their leading comments, inside a source text
pub struct SourceRewriter<'a> {
    original: &'a str,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(original: &'a str) -> Self {
        Self { original }
    }

    pub fn render(&self, units: &[CallableUnit], ordered: &[String]) -> RenderOutcome {
        match self.plan(units, ordered) {
            Ok(Some(splice)) => RenderOutcome {
                changed: true,
                new_text: Some(splice.apply(self.original)),
            },
            Ok(None) => RenderOutcome::unchanged(),
            Err(e) => {
                warn!("Leaving source untouched: {}", e);
                RenderOutcome::unchanged()
            }
        }
    }

    /// Compute the splice that puts the units in `ordered`, if any is needed
    pub fn plan(&self, units: &[CallableUnit], ordered: &[String]) -> Result<Option<Splice>> {
        if units.is_empty() {
            return Ok(None);
        }

        for unit in units {
            self.validate_unit(unit)?;
        }

        let mut source_order: Vec<usize> = (0..units.len()).collect();
        source_order.sort_by_key(|&position| units[position].full_start());

        for pair in source_order.windows(2) {
            let (first, second) = (&units[pair[0]], &units[pair[1]]);
            if first.range.end > second.full_start() {
                return Err(ReadorderError::OverlappingUnits {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }

        let computed = self.order_positions(units, ordered)?;
        if computed == source_order {
            return Ok(None);
        }

        let block = ByteRange::new(
            units[source_order[0]].full_start(),
            units[source_order[source_order.len() - 1]].range.end,
        );

        let gaps: Vec<&str> = source_order
            .windows(2)
            .map(|pair| &self.original[units[pair[0]].range.end..units[pair[1]].full_start()])
            .collect();

        // Units separated by whitespace only are joined by a blank line. When
        // other content sits between them it stays in place and the unit
        // slots around it are refilled.
        let interleaved = gaps.iter().any(|gap| !gap.trim().is_empty());
        if interleaved {
            debug!("Scope has interleaved content; reordering unit slots only");
        }
        let separator = self.separator(block.start);

        let mut replacement = String::with_capacity(block.len() + separator.len() * units.len());
        // (unit position, end of its text in `replacement`)
        let mut placed: Vec<(usize, usize)> = Vec::with_capacity(computed.len());
        for (slot, &position) in computed.iter().enumerate() {
            if slot > 0 {
                replacement.push_str(if interleaved { gaps[slot - 1] } else { separator.as_str() });
            }
            replacement.push_str(self.unit_text(&units[position]));
            placed.push((position, replacement.len()));
        }

        if replacement == self.original[block.start..block.end] {
            return Ok(None);
        }

        for (position, end) in placed {
            let unit = &units[position];
            if is_terminated(unit, self.unit_text(unit)) {
                continue;
            }
            let next = next_significant(&replacement[end..])
                .or_else(|| next_significant(&self.original[block.end..]));
            if next.map_or(false, |c| CONTINUATION_STARTS.contains(&c)) {
                return Err(ReadorderError::UnterminatedUnit {
                    name: unit.name.clone(),
                });
            }
        }

        Ok(Some(Splice {
            range: block,
            replacement,
        }))
    }

    /// Full text of a unit, leading comments through the end of its definition
    fn unit_text(&self, unit: &CallableUnit) -> &'a str {
        &self.original[unit.full_start()..unit.range.end]
    }

    /// A blank line in the line ending the block already uses, then the
    /// indentation of the block's first line
    fn separator(&self, block_start: usize) -> String {
        let newline = if self.uses_crlf(block_start) { "\r\n" } else { "\n" };
        format!("{}{}{}", newline, newline, self.indentation_at(block_start))
    }

    /// Whether the first line break from `offset` on (or in the file) is CRLF
    fn uses_crlf(&self, offset: usize) -> bool {
        let bytes = self.original.as_bytes();
        self.original[offset..]
            .find('\n')
            .map(|index| offset + index)
            .or_else(|| self.original.find('\n'))
            .map_or(false, |newline| newline > 0 && bytes[newline - 1] == b'\r')
    }

    /// Whitespace between the start of the line and `offset`, if only
    /// whitespace precedes it on that line
    fn indentation_at(&self, offset: usize) -> &'a str {
        let line_start = self.original[..offset].rfind('\n').map_or(0, |newline| newline + 1);
        let prefix = &self.original[line_start..offset];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            prefix
        } else {
            ""
        }
    }

    fn validate_unit(&self, unit: &CallableUnit) -> Result<()> {
        self.validate_range(&unit.name, unit.range)?;

        let mut floor = 0;
        for comment in &unit.leading_comments {
            self.validate_range(&unit.name, *comment)?;
            if comment.start < floor || comment.end > unit.range.start {
                return Err(ReadorderError::InvalidRange {
                    name: unit.name.clone(),
                    start: comment.start,
                    end: comment.end,
                    len: self.original.len(),
                });
            }
            floor = comment.end;
        }

        Ok(())
    }

    fn validate_range(&self, name: &str, range: ByteRange) -> Result<()> {
        let valid = range.start <= range.end
            && range.end <= self.original.len()
            && self.original.is_char_boundary(range.start)
            && self.original.is_char_boundary(range.end);

        if valid {
            Ok(())
        } else {
            Err(ReadorderError::InvalidRange {
                name: name.to_string(),
                start: range.start,
                end: range.end,
                len: self.original.len(),
            })
        }
    }

    /// Positions of `ordered` names within `units`; must be a permutation
    fn order_positions(&self, units: &[CallableUnit], ordered: &[String]) -> Result<Vec<usize>> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (position, unit) in units.iter().enumerate() {
            if positions.insert(unit.name.as_str(), position).is_some() {
                return Err(ReadorderError::OrderMismatch(format!(
                    "unit `{}` appears more than once",
                    unit.name
                )));
            }
        }

        if ordered.len() != units.len() {
            return Err(ReadorderError::OrderMismatch(format!(
                "{} names for {} units",
                ordered.len(),
                units.len()
            )));
        }

        let mut seen = vec![false; units.len()];
        let mut computed = Vec::with_capacity(ordered.len());
        for name in ordered {
            let position = *positions.get(name.as_str()).ok_or_else(|| {
                ReadorderError::OrderMismatch(format!("unknown unit `{}`", name))
            })?;
            if seen[position] {
                return Err(ReadorderError::OrderMismatch(format!(
                    "unit `{}` is listed twice",
                    name
                )));
            }
            seen[position] = true;
            computed.push(position);
        }

        Ok(computed)
    }
}

/// Whether a unit's text cannot run into whatever follows it
///
/// Declarations and methods end with their closing brace; a binding such as
/// `const f = function () {}` only ends at a `;`.
fn is_terminated(unit: &CallableUnit, text: &str) -> bool {
    let text = text.trim_end();
    text.ends_with(';') || (unit.kind != UnitKind::Expression && text.ends_with('}'))
}

/// First character of `text` outside whitespace and comments
fn next_significant(text: &str) -> Option<char> {
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if let Some(line) = rest.strip_prefix("//") {
            rest = &line[line.find('\n')?..];
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = &block[block.find("*/")? + 2..];
        } else {
            return rest.chars().next();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::call_graph::UnitKind;

    /// Unit spanning the first occurrence of `text` in `source`
    fn unit_at(source: &str, name: &str, text: &str) -> CallableUnit {
        let start = source.find(text).unwrap();
        CallableUnit::new(name, UnitKind::Declaration, ByteRange::new(start, start + text.len()))
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_reorders_contiguous_units() {
        let source = "import x from 'x';\n\nfunction b() {}\nfunction a() { b(); }\n";
        let units = vec![
            unit_at(source, "b", "function b() {}"),
            unit_at(source, "a", "function a() { b(); }"),
        ];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert!(outcome.changed);
        assert_eq!(
            outcome.new_text.unwrap(),
            "import x from 'x';\n\nfunction a() { b(); }\n\nfunction b() {}\n"
        );
    }

    #[test]
    fn test_source_order_is_unchanged() {
        let source = "function a() { b(); }\nfunction b() {}\n";
        let units = vec![
            unit_at(source, "a", "function a() { b(); }"),
            unit_at(source, "b", "function b() {}"),
        ];

        assert_eq!(render(source, &units, &order(&["a", "b"])), RenderOutcome::unchanged());
    }

    #[test]
    fn test_attached_comments_move_with_unit() {
        let source = "// header\n\nfunction b() {}\n\n// calls b\nfunction a() { b(); }\n";
        let mut a = unit_at(source, "a", "function a() { b(); }");
        let comment = source.find("// calls b").unwrap();
        a.leading_comments.push(ByteRange::new(comment, comment + "// calls b".len()));
        let units = vec![unit_at(source, "b", "function b() {}"), a];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "// header\n\n// calls b\nfunction a() { b(); }\n\nfunction b() {}\n"
        );
    }

    #[test]
    fn test_interleaved_statements_stay_in_place() {
        let source = "function b() {}\nconst limit = 3;\nfunction a() { b(); }\n";
        let units = vec![
            unit_at(source, "b", "function b() {}"),
            unit_at(source, "a", "function a() { b(); }"),
        ];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "function a() { b(); }\nconst limit = 3;\nfunction b() {}\n"
        );
    }

    #[test]
    fn test_out_of_bounds_range_aborts() {
        let source = "function b() {}\nfunction a() {}\n";
        let mut broken = unit_at(source, "a", "function a() {}");
        broken.range.end = source.len() + 10;
        let units = vec![unit_at(source, "b", "function b() {}"), broken];

        assert_eq!(render(source, &units, &order(&["a", "b"])), RenderOutcome::unchanged());
    }

    #[test]
    fn test_overlapping_units_abort() {
        let source = "function b() { function a() {} }\n";
        let units = vec![
            unit_at(source, "b", "function b() { function a() {} }"),
            unit_at(source, "a", "function a() {}"),
        ];

        let rewriter = SourceRewriter::new(source);
        assert!(matches!(
            rewriter.plan(&units, &order(&["a", "b"])),
            Err(ReadorderError::OverlappingUnits { .. })
        ));
        assert!(!rewriter.render(&units, &order(&["a", "b"])).changed);
    }

    #[test]
    fn test_order_must_be_a_permutation() {
        let source = "function b() {}\nfunction a() {}\n";
        let units = vec![
            unit_at(source, "b", "function b() {}"),
            unit_at(source, "a", "function a() {}"),
        ];

        assert!(!render(source, &units, &order(&["a"])).changed);
        assert!(!render(source, &units, &order(&["a", "a"])).changed);
        assert!(!render(source, &units, &order(&["a", "c"])).changed);
    }

    #[test]
    fn test_comment_after_unit_start_is_rejected() {
        let source = "function b() {}\nfunction a() {} // late\n";
        let mut a = unit_at(source, "a", "function a() {}");
        let comment = source.find("// late").unwrap();
        a.leading_comments.push(ByteRange::new(comment, comment + "// late".len()));
        let units = vec![unit_at(source, "b", "function b() {}"), a];

        assert!(!render(source, &units, &order(&["a", "b"])).changed);
    }

    #[test]
    fn test_joined_units_keep_block_indentation() {
        let source = "class W {\n    b() {}\n    a() { this.b(); }\n}\n";
        let units = vec![
            unit_at(source, "b", "b() {}"),
            unit_at(source, "a", "a() { this.b(); }"),
        ];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "class W {\n    a() { this.b(); }\n\n    b() {}\n}\n"
        );
    }

    fn binding_at(source: &str, name: &str, text: &str) -> CallableUnit {
        let mut unit = unit_at(source, name, text);
        unit.kind = UnitKind::Expression;
        unit
    }

    #[test]
    fn test_unterminated_unit_before_parenthesis_aborts() {
        let source = "function helper() {}\n(init)()\nconst main = () => helper()\n";
        let units = vec![
            unit_at(source, "helper", "function helper() {}"),
            binding_at(source, "main", "const main = () => helper()"),
        ];

        let rewriter = SourceRewriter::new(source);
        assert!(matches!(
            rewriter.plan(&units, &order(&["main", "helper"])),
            Err(ReadorderError::UnterminatedUnit { .. })
        ));
        assert!(!rewriter.render(&units, &order(&["main", "helper"])).changed);
    }

    #[test]
    fn test_unterminated_unit_before_trailing_bracket_aborts() {
        let source = "const b = () => 1\nconst a = () => b()\n[1, 2].forEach(log)\n";
        let units = vec![
            binding_at(source, "b", "const b = () => 1"),
            binding_at(source, "a", "const a = () => b()"),
        ];

        assert!(!render(source, &units, &order(&["a", "b"])).changed);
    }

    #[test]
    fn test_guarded_line_and_comments_are_not_continuations() {
        let source = "function helper() {}\n// setup\n;(init)()\nconst main = () => helper()\n";
        let units = vec![
            unit_at(source, "helper", "function helper() {}"),
            binding_at(source, "main", "const main = () => helper()"),
        ];

        let outcome = render(source, &units, &order(&["main", "helper"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "const main = () => helper()\n// setup\n;(init)()\nfunction helper() {}\n"
        );
    }

    #[test]
    fn test_crlf_files_keep_crlf() {
        let source = "function b() {}\r\n\r\n// c\r\nfunction a() { b(); }\r\n";
        let mut a = unit_at(source, "a", "function a() { b(); }");
        let comment = source.find("// c").unwrap();
        a.leading_comments.push(ByteRange::new(comment, comment + "// c".len()));
        let units = vec![unit_at(source, "b", "function b() {}"), a];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "// c\r\nfunction a() { b(); }\r\n\r\nfunction b() {}\r\n"
        );
    }

    #[test]
    fn test_next_significant_skips_comments() {
        assert_eq!(next_significant("  // note\n  /* more */ (x)"), Some('('));
        assert_eq!(next_significant("\n// only a comment"), None);
        assert_eq!(next_significant(""), None);
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        let source = "function b() { return 'héllo'; }\nfunction a() { return '世界'; }\n";
        let units = vec![
            unit_at(source, "b", "function b() { return 'héllo'; }"),
            unit_at(source, "a", "function a() { return '世界'; }"),
        ];

        let outcome = render(source, &units, &order(&["a", "b"]));
        assert_eq!(
            outcome.new_text.unwrap(),
            "function a() { return '世界'; }\n\nfunction b() { return 'héllo'; }\n"
        );
    }
}
