//! go.mod parser
//!
//! Extracts the `module` directive, direct and indirect `require` entries
//! and `retract` directives. Other directives are skipped.
//!
//! Format examples:
//! - Single: `require golang.org/x/text v0.14.0`
//! - Block:
//!   ```text
//!   require (
//!       golang.org/x/text v0.14.0
//!       golang.org/x/net v0.20.0 // indirect
//!   )
//!   ```
//! - Retractions: `retract v1.0.0` or `retract [v1.0.0, v1.9.9]`

use regex::Regex;

use crate::parser::error::ParseError;
use crate::version::module::{Retractions, VersionRange};
use crate::version::semver::is_valid;

/// One `require` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub path: String,
    pub version: String,
    pub indirect: bool,
}

/// The directives of a go.mod file this crate cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModFile {
    pub module: Option<String>,
    pub requires: Vec<Requirement>,
    pub retracts: Retractions,
}

impl ModFile {
    /// Requirements not marked `// indirect`
    pub fn direct_requires(&self) -> impl Iterator<Item = &Requirement> {
        self.requires.iter().filter(|r| !r.indirect)
    }
}

/// Parser for go.mod files
pub struct GoModParser {
    /// Regex for a single-line directive: `verb args...`
    directive_re: Regex,
    /// Regex for block start: `verb (`
    block_start_re: Regex,
    /// Regex for require spec: `module/path v1.2.3`
    require_spec_re: Regex,
    /// Regex for retract range: `[v1.0.0, v1.9.9]`
    retract_range_re: Regex,
}

impl GoModParser {
    pub fn new() -> Self {
        Self {
            directive_re: Regex::new(r"^([a-z]+)\s+(.+)$").unwrap(),
            block_start_re: Regex::new(r"^([a-z]+)\s*\(\s*$").unwrap(),
            require_spec_re: Regex::new(r"^(\S+)\s+(\S+)$").unwrap(),
            retract_range_re: Regex::new(r"^\[\s*([^,\s]+)\s*,\s*([^\]\s]+)\s*\]$").unwrap(),
        }
    }

    /// Parse raw bytes, as served by a module proxy
    pub fn parse_bytes(&self, data: &[u8]) -> Result<ModFile, ParseError> {
        let content =
            std::str::from_utf8(data).map_err(|e| ParseError::ParseFailed(e.to_string()))?;
        self.parse(content)
    }

    pub fn parse(&self, content: &str) -> Result<ModFile, ParseError> {
        let mut mod_file = ModFile::default();
        let mut retracts = Vec::new();
        let mut block: Option<(String, usize)> = None;

        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let (code, comment) = split_comment(raw);
            let code = code.trim();

            // Skip empty lines and comments
            if code.is_empty() {
                continue;
            }

            if let Some((verb, _)) = &block {
                if code == ")" {
                    block = None;
                } else {
                    self.directive(verb, code, comment, line, &mut mod_file, &mut retracts)?;
                }
                continue;
            }

            if let Some(caps) = self.block_start_re.captures(code) {
                block = Some((caps[1].to_string(), line));
                continue;
            }

            let caps = self
                .directive_re
                .captures(code)
                .ok_or_else(|| ParseError::InvalidSyntax {
                    line,
                    message: format!("unknown directive: {code}"),
                })?;
            self.directive(&caps[1], &caps[2], comment, line, &mut mod_file, &mut retracts)?;
        }

        if let Some((verb, line)) = block {
            return Err(ParseError::InvalidSyntax {
                line,
                message: format!("unterminated {verb} block"),
            });
        }

        mod_file.retracts = Retractions::new(retracts);
        Ok(mod_file)
    }

    fn directive(
        &self,
        verb: &str,
        args: &str,
        comment: Option<&str>,
        line: usize,
        mod_file: &mut ModFile,
        retracts: &mut Vec<VersionRange>,
    ) -> Result<(), ParseError> {
        let args = args.trim();
        match verb {
            "module" => {
                mod_file.module = Some(unquote(args).to_string());
            }
            "require" => {
                let caps =
                    self.require_spec_re
                        .captures(args)
                        .ok_or_else(|| ParseError::InvalidSyntax {
                            line,
                            message: "usage: require module/path v1.2.3".to_string(),
                        })?;
                mod_file.requires.push(Requirement {
                    path: unquote(&caps[1]).to_string(),
                    version: unquote(&caps[2]).to_string(),
                    indirect: comment.is_some_and(is_indirect),
                });
            }
            "retract" => {
                retracts.push(self.retraction(args, line)?);
            }
            // go, toolchain, replace, exclude, tool, godebug
            _ => {}
        }
        Ok(())
    }

    fn retraction(&self, args: &str, line: usize) -> Result<VersionRange, ParseError> {
        let range = match self.retract_range_re.captures(args) {
            Some(caps) => VersionRange::new(unquote(&caps[1]), unquote(&caps[2])),
            None => VersionRange::single(unquote(args)),
        };
        for version in [&range.low, &range.high] {
            if !is_valid(version) {
                return Err(ParseError::InvalidSyntax {
                    line,
                    message: format!("invalid retracted version: {version}"),
                });
            }
        }
        Ok(range)
    }
}

impl Default for GoModParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the path in the `module` directive, leaving the rest of the file intact
pub fn replace_module_path(content: &str, new_path: &str) -> Result<String, ParseError> {
    let re = Regex::new(r#"(?m)^\s*module\s+"?([^"\s]+)"#)
        .map_err(|e| ParseError::ParseFailed(e.to_string()))?;
    let path = re
        .captures(content)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| ParseError::ParseFailed("missing module directive".to_string()))?;

    Ok(format!(
        "{}{}{}",
        &content[..path.start()],
        new_path,
        &content[path.end()..]
    ))
}

fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find("//") {
        Some(pos) => (&line[..pos], Some(line[pos + 2..].trim())),
        None => (line, None),
    }
}

fn is_indirect(comment: &str) -> bool {
    comment == "indirect" || comment.starts_with("indirect;")
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_module_path() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.module.as_deref(), Some("example.com/myapp"));
    }

    #[test]
    fn parse_unquotes_module_path() {
        let parser = GoModParser::new();
        let result = parser.parse("module \"example.com/quoted\"\n").unwrap();
        assert_eq!(result.module.as_deref(), Some("example.com/quoted"));
    }

    #[test]
    fn parse_extracts_single_require() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

require golang.org/x/text v0.14.0
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(
            result.requires,
            vec![Requirement {
                path: "golang.org/x/text".to_string(),
                version: "v0.14.0".to_string(),
                indirect: false,
            }]
        );
    }

    #[test]
    fn parse_extracts_require_block() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

require (
	golang.org/x/text v0.14.0
	golang.org/x/net v0.20.0
)
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.requires.len(), 2);
        assert_eq!(result.requires[0].path, "golang.org/x/text");
        assert_eq!(result.requires[0].version, "v0.14.0");
        assert_eq!(result.requires[1].path, "golang.org/x/net");
        assert_eq!(result.requires[1].version, "v0.20.0");
    }

    #[test]
    fn parse_flags_indirect_dependencies() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

require (
	golang.org/x/text v0.14.0 // indirect
	golang.org/x/net v0.20.0
)
"#;
        let result = parser.parse(content).unwrap();
        assert!(result.requires[0].indirect);
        assert!(!result.requires[1].indirect);

        let direct: Vec<_> = result.direct_requires().map(|r| r.path.as_str()).collect();
        assert_eq!(direct, vec!["golang.org/x/net"]);
    }

    #[test]
    fn parse_handles_incompatible_and_pseudo_versions() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

require github.com/some/repo v2.0.0+incompatible
require github.com/other/repo v0.0.0-20210101000000-abcdef123456
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.requires[0].version, "v2.0.0+incompatible");
        assert_eq!(
            result.requires[1].version,
            "v0.0.0-20210101000000-abcdef123456"
        );
    }

    #[test]
    fn parse_returns_empty_for_no_requires() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21
"#;
        let result = parser.parse(content).unwrap();
        assert!(result.requires.is_empty());
        assert!(result.retracts.is_empty());
    }

    #[test]
    fn parse_skips_replace_and_exclude_directives() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

go 1.21

require golang.org/x/text v0.14.0

replace golang.org/x/text v0.14.0 => ./local/text

replace (
	golang.org/x/net => ../fork/net
	example.com/old => example.com/new v1.0.0
)

exclude (
	golang.org/x/crypto v1.4.5
)
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(result.requires.len(), 1);
        assert_eq!(result.requires[0].path, "golang.org/x/text");
    }

    #[test]
    fn parse_extracts_retract_directives() {
        let parser = GoModParser::new();
        let content = r#"module example.com/myapp

require golang.org/x/text v0.14.0

// Published by accident.
retract v1.0.0

retract (
	v1.0.1 // contains a data race
	[v1.1.0, v1.9.9]
)
"#;
        let result = parser.parse(content).unwrap();
        assert_eq!(
            result.retracts.ranges(),
            &[
                VersionRange::single("v1.0.0"),
                VersionRange::single("v1.0.1"),
                VersionRange::new("v1.1.0", "v1.9.9"),
            ]
        );
        assert!(result.retracts.includes("v1.5.0"));
        assert!(!result.retracts.includes("v2.0.0"));
    }

    #[test]
    fn parse_rejects_invalid_retracted_version() {
        let parser = GoModParser::new();
        let result = parser.parse("module m\n\nretract 1.0.0\n");
        assert!(matches!(
            result,
            Err(ParseError::InvalidSyntax { line: 3, .. })
        ));
    }

    #[test]
    fn parse_rejects_unterminated_block() {
        let parser = GoModParser::new();
        let result = parser.parse("module m\n\nrequire (\n\tgolang.org/x/text v0.14.0\n");
        assert!(matches!(
            result,
            Err(ParseError::InvalidSyntax { line: 3, .. })
        ));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let parser = GoModParser::new();
        assert!(matches!(
            parser.parse_bytes(&[0xff, 0xfe]),
            Err(ParseError::ParseFailed(_))
        ));
    }

    #[test]
    fn replace_module_path_rewrites_only_the_module_directive() {
        let content = r#"// Copyright notice
module github.com/go-redis/redis

go 1.21

require github.com/go-redis/redis/v7 v7.0.0
"#;
        let result = replace_module_path(content, "github.com/go-redis/redis/v8").unwrap();
        assert_eq!(
            result,
            r#"// Copyright notice
module github.com/go-redis/redis/v8

go 1.21

require github.com/go-redis/redis/v7 v7.0.0
"#
        );
    }

    #[test]
    fn replace_module_path_keeps_quotes() {
        let result = replace_module_path("module \"example.com/m\"\n", "example.com/m/v2").unwrap();
        assert_eq!(result, "module \"example.com/m/v2\"\n");
    }

    #[test]
    fn replace_module_path_fails_without_module_directive() {
        assert!(matches!(
            replace_module_path("go 1.21\n", "example.com/m"),
            Err(ParseError::ParseFailed(_))
        ));
    }
}
