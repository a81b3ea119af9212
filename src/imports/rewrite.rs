//! Import path rewriting
//!
//! Every import spec and every `// import "path"` comment in a Go source
//! tree is passed to a replace function. Files whose imports change are
//! written back atomically with their import blocks canonicalized.

use std::fmt;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::atomic::replace_file;
use crate::imports::format::sort_imports;
use crate::imports::literal::{quote, unquote};

/// Prefix of a comment that declares a canonical import path
const IMPORT_COMMENT: &str = "// import \"";

/// Location of an import in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: PathBuf,
    /// Byte offset, starting at 0
    pub offset: usize,
    /// Line number, starting at 1
    pub line: usize,
    /// Byte column, starting at 1
    pub column: usize,
}

impl Position {
    fn of(filename: &Path, node: tree_sitter::Node) -> Self {
        let point = node.start_position();
        Self {
            filename: filename.to_path_buf(),
            offset: node.start_byte(),
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename.display(), self.line, self.column)
    }
}

/// What to do with one import occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Replace the import path
    Replace(String),
    /// Leave this occurrence untouched
    Skip,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{position}: invalid import path literal {literal}")]
    InvalidLiteral { position: Position, literal: String },

    #[error("{0}")]
    Replace(String),
}

/// Parses Go source, keeping comments and byte positions
pub(crate) fn parse_go(source: &str) -> Result<tree_sitter::Tree, String> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_go::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set Go language for tree-sitter: {}", e);
        e.to_string()
    })?;
    parser
        .parse(source, None)
        .ok_or_else(|| "tree-sitter returned no tree".to_string())
}

/// Rewrites imports in every Go file under `dir`.
///
/// Vendor, hidden and `_`-prefixed directories are skipped, as are nested
/// modules. The first error aborts the walk; files already rewritten stay
/// rewritten.
pub fn rewrite<F>(dir: &Path, mut replace: F) -> Result<(), ImportError>
where
    F: FnMut(&Position, &str) -> Result<Rewrite, ImportError>,
{
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_walkable);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("import rewrite: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "go") {
            rewrite_file(path, &mut replace)?;
        }
    }
    Ok(())
}

fn is_walkable(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if name == "vendor" || name.starts_with('.') || name.starts_with('_') {
        debug!("Skipping directory {}", entry.path().display());
        return false;
    }
    match std::fs::symlink_metadata(entry.path().join("go.mod")) {
        Ok(_) => {
            debug!("Skipping nested module {}", entry.path().display());
            false
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("import rewrite: {}: {}", entry.path().display(), e);
            false
        }
    }
}

/// Rewrites imports in one file. Returns whether the file changed.
pub fn rewrite_file<F>(path: &Path, replace: &mut F) -> Result<bool, ImportError>
where
    F: FnMut(&Position, &str) -> Result<Rewrite, ImportError>,
{
    let io_error = |source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let source = std::fs::read_to_string(path).map_err(io_error)?;

    let Some(output) = rewrite_source(path, &source, replace)? else {
        return Ok(false);
    };

    replace_file(path, output.as_bytes()).map_err(io_error)?;
    info!("Rewrote {}", path.display());
    Ok(true)
}

/// Rewrites imports in Go source text.
///
/// Returns `None` when nothing was replaced or the source has no package
/// clause.
pub fn rewrite_source<F>(
    filename: &Path,
    source: &str,
    replace: &mut F,
) -> Result<Option<String>, ImportError>
where
    F: FnMut(&Position, &str) -> Result<Rewrite, ImportError>,
{
    let parse_error = |message: String| ImportError::Parse {
        path: filename.to_path_buf(),
        message,
    };
    let tree = parse_go(source).map_err(parse_error)?;
    let root = tree.root_node();

    let mut cursor = root.walk();
    if !root
        .children(&mut cursor)
        .any(|child| child.kind() == "package_clause")
    {
        debug!("Skipping {}: no package clause", filename.display());
        return Ok(None);
    }
    if root.has_error() {
        return Err(parse_error(syntax_error_message(root)));
    }

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();

    for spec in import_specs(root) {
        let Some(path_node) = spec.child_by_field_name("path") else {
            continue;
        };
        let literal = &source[path_node.byte_range()];
        let position = Position::of(filename, spec);
        let Some(import_path) = unquote(literal) else {
            return Err(ImportError::InvalidLiteral {
                position,
                literal: literal.to_string(),
            });
        };
        if let Rewrite::Replace(new_path) = replace(&position, &import_path)? {
            edits.push((path_node.byte_range(), quote(&new_path)));
        }
    }

    let mut comments = Vec::new();
    collect_comments(root, &mut comments);
    for comment in comments {
        let text = &source[comment.byte_range()];
        if !text.starts_with(IMPORT_COMMENT) {
            continue;
        }
        let literal = text["// import".len()..].trim();
        let position = Position::of(filename, comment);
        let Some(import_path) = unquote(literal) else {
            return Err(ImportError::InvalidLiteral {
                position,
                literal: literal.to_string(),
            });
        };
        if let Rewrite::Replace(new_path) = replace(&position, &import_path)? {
            edits.push((comment.byte_range(), format!("// import {}", quote(&new_path))));
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }

    edits.sort_by_key(|(range, _)| range.start);
    let mut output = source.to_string();
    for (range, text) in edits.into_iter().rev() {
        output.replace_range(range, &text);
    }

    sort_imports(&output).map(Some).map_err(parse_error)
}

/// Import specs in source order
pub(crate) fn import_specs(root: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut specs = Vec::new();
    let mut cursor = root.walk();
    for declaration in root.children(&mut cursor) {
        if declaration.kind() != "import_declaration" {
            continue;
        }
        let mut declaration_cursor = declaration.walk();
        for child in declaration.children(&mut declaration_cursor) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => {
                    let mut list_cursor = child.walk();
                    specs.extend(
                        child
                            .children(&mut list_cursor)
                            .filter(|spec| spec.kind() == "import_spec"),
                    );
                }
                _ => {}
            }
        }
    }
    specs
}

fn collect_comments<'tree>(
    node: tree_sitter::Node<'tree>,
    comments: &mut Vec<tree_sitter::Node<'tree>>,
) {
    if node.kind() == "comment" {
        comments.push(node);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_comments(child, comments);
    }
}

fn syntax_error_message(node: tree_sitter::Node) -> String {
    fn first_error(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|child| child.has_error())
            .find_map(first_error)
    }

    match first_error(node) {
        Some(error) => {
            let point = error.start_position();
            format!("syntax error at {}:{}", point.row + 1, point.column + 1)
        }
        None => "syntax error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn replace_prefix(
        from: &'static str,
        to: &'static str,
    ) -> impl Fn(&Position, &str) -> Result<Rewrite, ImportError> {
        move |_, path| match path.strip_prefix(from) {
            Some(rest) => Ok(Rewrite::Replace(format!("{to}{rest}"))),
            None => Ok(Rewrite::Skip),
        }
    }

    fn rewrite_str(source: &str) -> Option<String> {
        let mut replace = replace_prefix("github.com/go-redis/redis", "github.com/go-redis/redis/v8");
        rewrite_source(Path::new("main.go"), source, &mut replace).unwrap()
    }

    #[test]
    fn rewrite_source_replaces_import_canonically() {
        let source = r#"package main

import (
    "github.com/go-redis/redis"
    "fmt"
)

func main() { fmt.Println(redis.Nil) }
"#;
        assert_eq!(
            rewrite_str(source).unwrap(),
            r#"package main

import (
	"fmt"
	"github.com/go-redis/redis/v8"
)

func main() { fmt.Println(redis.Nil) }
"#
        );
    }

    #[test]
    fn rewrite_source_keeps_crlf_line_endings() {
        let source = "package p\r\n\r\nimport (\r\n\t\"os\"\r\n\t\"github.com/go-redis/redis\"\r\n)\r\n\r\nvar _ = os.Args\r\n";
        assert_eq!(
            rewrite_str(source).unwrap(),
            "package p\r\n\r\nimport (\r\n\t\"github.com/go-redis/redis/v8\"\r\n\t\"os\"\r\n)\r\n\r\nvar _ = os.Args\r\n"
        );
    }

    #[test]
    fn rewrite_source_keeps_import_names() {
        let source = r#"package main

import redis "github.com/go-redis/redis/internal/proto"
"#;
        assert_eq!(
            rewrite_str(source).unwrap(),
            r#"package main

import redis "github.com/go-redis/redis/v8/internal/proto"
"#
        );
    }

    #[test]
    fn rewrite_source_returns_none_when_nothing_matches() {
        let source = "package main\n\nimport \"fmt\"\n";
        assert_eq!(rewrite_str(source), None);
    }

    #[test]
    fn rewrite_source_rewrites_import_comments() {
        let source = "package redis // import \"github.com/go-redis/redis\"\n";
        assert_eq!(
            rewrite_str(source).unwrap(),
            "package redis // import \"github.com/go-redis/redis/v8\"\n"
        );
    }

    #[test]
    fn rewrite_source_skips_files_without_package_clause() {
        assert_eq!(rewrite_str(""), None);
        assert_eq!(rewrite_str("// just a comment\n"), None);
    }

    #[test]
    fn rewrite_source_reports_syntax_errors() {
        let mut replace = replace_prefix("x", "y");
        let result = rewrite_source(
            Path::new("broken.go"),
            "package main\n\nimport (\n\t\"fmt\"\n\nfunc main() {\n",
            &mut replace,
        );
        assert!(matches!(result, Err(ImportError::Parse { .. })));
    }

    #[test]
    fn rewrite_source_passes_positions() {
        let source = "package main\n\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n";
        let mut seen = Vec::new();
        let mut replace = |pos: &Position, path: &str| {
            seen.push((pos.to_string(), pos.offset, path.to_string()));
            Ok(Rewrite::Skip)
        };

        let result = rewrite_source(Path::new("a.go"), source, &mut replace).unwrap();

        assert_eq!(result, None);
        assert_eq!(
            seen,
            vec![
                ("a.go:4:2".to_string(), 24, "fmt".to_string()),
                ("a.go:5:2".to_string(), 31, "os".to_string()),
            ]
        );
    }

    #[test]
    fn rewrite_source_propagates_replace_errors() {
        let source = "package main\n\nimport \"fmt\"\n";
        let mut replace =
            |_: &Position, _: &str| Err(ImportError::Replace("refused".to_string()));

        let result = rewrite_source(Path::new("a.go"), source, &mut replace);

        assert!(matches!(result, Err(ImportError::Replace(message)) if message == "refused"));
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn rewrite_walks_tree_and_skips_excluded_directories() {
        let dir = TempDir::new().unwrap();
        let import = "package p\n\nimport \"github.com/go-redis/redis\"\n";
        write(dir.path(), "main.go", import);
        write(dir.path(), "pkg/lib.go", import);
        write(dir.path(), "vendor/v.go", import);
        write(dir.path(), ".hidden/h.go", import);
        write(dir.path(), "_scratch/s.go", import);
        write(dir.path(), "nested/go.mod", "module example.com/nested\n");
        write(dir.path(), "nested/n.go", import);
        write(dir.path(), "notes.txt", "github.com/go-redis/redis");

        let mut visited = Vec::new();
        rewrite(dir.path(), |pos, path| {
            visited.push(pos.filename.clone());
            replace_prefix("github.com/go-redis/redis", "github.com/go-redis/redis/v8")(pos, path)
        })
        .unwrap();

        assert_eq!(
            visited,
            vec![dir.path().join("main.go"), dir.path().join("pkg/lib.go")]
        );
        let rewritten = "package p\n\nimport \"github.com/go-redis/redis/v8\"\n";
        assert_eq!(fs::read_to_string(dir.path().join("main.go")).unwrap(), rewritten);
        assert_eq!(fs::read_to_string(dir.path().join("pkg/lib.go")).unwrap(), rewritten);
        assert_eq!(fs::read_to_string(dir.path().join("vendor/v.go")).unwrap(), import);
        assert_eq!(fs::read_to_string(dir.path().join("nested/n.go")).unwrap(), import);
    }

    #[test]
    fn rewrite_leaves_unmatched_files_untouched() {
        let dir = TempDir::new().unwrap();
        let source = "package main\n\nimport (\n    \"os\"\n    \"fmt\"\n)\n";
        write(dir.path(), "main.go", source);
        let before = fs::metadata(dir.path().join("main.go")).unwrap().modified().unwrap();

        rewrite(dir.path(), |_, _| Ok(Rewrite::Skip)).unwrap();

        let path = dir.path().join("main.go");
        assert_eq!(fs::read_to_string(&path).unwrap(), source);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn rewrite_stops_at_first_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.go", "package p\n\nimport \"example.com/a\"\n");
        write(dir.path(), "b.go", "package p\n\nimport \"example.com/b\"\n");

        let result = rewrite(dir.path(), |_, path| {
            if path == "example.com/b" {
                Err(ImportError::Replace("stop".to_string()))
            } else {
                Ok(Rewrite::Replace("example.com/a/v2".to_string()))
            }
        });

        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("a.go")).unwrap(),
            "package p\n\nimport \"example.com/a/v2\"\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("b.go")).unwrap(),
            "package p\n\nimport \"example.com/b\"\n"
        );
    }

    #[test]
    fn position_displays_file_line_column() {
        let position = Position {
            filename: PathBuf::from("pkg/main.go"),
            offset: 30,
            line: 4,
            column: 2,
        };
        assert_eq!(position.to_string(), "pkg/main.go:4:2");
    }
}
