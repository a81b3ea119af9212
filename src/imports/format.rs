//! Import block canonicalization
//!
//! Inside each parenthesized import block, spec lines are indented with one
//! tab, each run of adjacent spec lines is sorted by path, and exact
//! duplicates are dropped. Blank lines and comment lines end a run and stay
//! in place. Blocks with any other layout are left as they are.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::imports::literal::unquote;
use crate::imports::rewrite::parse_go;

struct SpecLine {
    path: String,
    name: String,
    text: String,
}

/// Canonicalizes every import block in `source`
pub fn sort_imports(source: &str) -> Result<String, String> {
    let tree = parse_go(source)?;
    let root = tree.root_node();

    let mut edits = Vec::new();
    let mut cursor = root.walk();
    for declaration in root.children(&mut cursor) {
        if declaration.kind() != "import_declaration" {
            continue;
        }
        let mut declaration_cursor = declaration.walk();
        for list in declaration.children(&mut declaration_cursor) {
            if list.kind() == "import_spec_list"
                && let Some(edit) = canonical_block(source, list)
            {
                edits.push(edit);
            }
        }
    }

    let mut output = source.to_string();
    for (range, text) in edits.into_iter().rev() {
        output.replace_range(range, &text);
    }
    Ok(output)
}

/// Returns the replacement for the lines between `(` and `)`, or `None`
/// if the block is already canonical or has a layout this doesn't handle
fn canonical_block(source: &str, list: tree_sitter::Node) -> Option<(Range<usize>, String)> {
    let mut cursor = list.walk();
    let children: Vec<_> = list.children(&mut cursor).collect();
    let open = children.first().filter(|n| n.kind() == "(")?;
    let close = children.last().filter(|n| n.kind() == ")")?;

    // `(` must end its line and `)` must start its line
    let body_start = open.end_byte() + source[open.end_byte()..].find('\n')? + 1;
    let body_end = source[..close.start_byte()].rfind('\n')? + 1;
    if body_end <= body_start
        || !source[open.end_byte()..body_start].trim().is_empty()
        || !source[body_end..close.start_byte()].trim().is_empty()
    {
        return None;
    }

    let mut specs: HashMap<usize, Vec<tree_sitter::Node>> = HashMap::new();
    for &spec in &children {
        if spec.kind() != "import_spec" {
            continue;
        }
        let row = spec.start_position().row;
        if spec.end_position().row != row {
            return None;
        }
        specs.entry(row).or_default().push(spec);
    }

    let body = &source[body_start..body_end];
    let first_row = open.start_position().row + 1;
    let mut lines = Vec::new();
    let mut run = Vec::new();
    let mut line_start = body_start;

    for (index, raw) in body.split_inclusive('\n').enumerate() {
        let line_end = line_start + raw.trim_end_matches(['\n', '\r']).len();
        let trimmed = source[line_start..line_end].trim();

        match specs.get(&(first_row + index)).map(Vec::as_slice) {
            None if trimmed.is_empty() => {
                flush(&mut run, &mut lines);
                lines.push(String::new());
            }
            None if trimmed.starts_with("//") => {
                flush(&mut run, &mut lines);
                lines.push(format!("\t{trimmed}"));
            }
            Some([spec]) => {
                let before = &source[line_start..spec.start_byte()];
                let after = source[spec.end_byte()..line_end].trim();
                if !before.trim().is_empty()
                    || !(after.is_empty() || after.starts_with("//"))
                {
                    return None;
                }
                run.push(spec_line(source, *spec, trimmed));
            }
            _ => return None,
        }
        line_start += raw.len();
    }
    flush(&mut run, &mut lines);

    // Keep the line ending the block already uses
    let newline = if source[..body_start].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };
    let mut canonical = lines.join(newline);
    canonical.push_str(newline);
    (canonical != body).then_some((body_start..body_end, canonical))
}

fn spec_line(source: &str, spec: tree_sitter::Node, text: &str) -> SpecLine {
    let path = spec
        .child_by_field_name("path")
        .map(|node| &source[node.byte_range()])
        .unwrap_or_default();
    let name = spec
        .child_by_field_name("name")
        .map(|node| &source[node.byte_range()])
        .unwrap_or_default();
    SpecLine {
        path: unquote(path).unwrap_or_else(|| path.to_string()),
        name: name.to_string(),
        text: text.to_string(),
    }
}

fn flush(run: &mut Vec<SpecLine>, lines: &mut Vec<String>) {
    run.sort_by(|a, b| (&a.path, &a.name).cmp(&(&b.path, &b.name)));
    let mut seen = HashSet::new();
    for spec in run.drain(..) {
        if seen.insert(spec.text.clone()) {
            lines.push(format!("\t{}", spec.text));
        }
    }
}
