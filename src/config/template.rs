//! Argument templates for agent command lines.
//!
//! Each argument of an agent's command may reference a placeholder that is
//! only known once its workspace exists:
//!
//! - `{workspace}` - Absolute path of the agent's isolated worktree
//! - `{log_file}` - Absolute path of the agent's combined output log
//!
//! `{{` and `}}` render as literal braces. Templates are parsed when the
//! configuration is loaded, so an unknown placeholder is a configuration
//! error rather than a launch-time surprise.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error returned when an argument template cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' at position {position}")]
    UnknownPlaceholder { name: String, position: usize },

    #[error("unmatched '{{' at position {position}")]
    UnmatchedBrace { position: usize },

    #[error("empty placeholder '{{}}' at position {position}")]
    EmptyPlaceholder { position: usize },
}

/// Values a placeholder can expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Workspace,
    LogFile,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "workspace" => Some(Placeholder::Workspace),
            "log_file" => Some(Placeholder::LogFile),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Placeholder::Workspace => "workspace",
            Placeholder::LogFile => "log_file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// Concrete values substituted into an [`ArgTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct ArgVars<'a> {
    pub workspace: &'a Path,
    pub log_file: &'a Path,
}

/// A single command-line argument with zero or more placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl ArgTemplate {
    /// Parse a template, rejecting unknown or malformed placeholders.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                        }
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder { position: pos });
                    }
                    let slot = Placeholder::parse(name).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.to_string(),
                            position: pos,
                        }
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                    }
                    literal.push('}');
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// A template with no placeholders; braces in `text` are kept literally.
    #[cfg(test)]
    pub fn literal(text: &str) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(text.to_string())]
        };
        Self {
            source: text.replace('{', "{{").replace('}', "}}"),
            segments,
        }
    }

    /// Expand placeholders with concrete paths.
    pub fn render(&self, vars: ArgVars<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(Placeholder::Workspace) => {
                    out.push_str(&vars.workspace.to_string_lossy())
                }
                Segment::Slot(Placeholder::LogFile) => {
                    out.push_str(&vars.log_file.to_string_lossy())
                }
            }
        }
        out
    }

    /// Placeholders referenced by this template, in order of appearance.
    #[cfg(test)]
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    /// The template as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for ArgTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<Placeholder> for ArgTemplate {
    fn from(p: Placeholder) -> Self {
        Self {
            source: format!("{{{}}}", p.name()),
            segments: vec![Segment::Slot(p)],
        }
    }
}

impl Serialize for ArgTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for ArgTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ArgTemplate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn render(source: &str) -> String {
        let workspace = PathBuf::from("/work/verify-codex-1");
        let log_file = PathBuf::from("/logs/codex.log");
        ArgTemplate::parse(source).unwrap().render(ArgVars {
            workspace: &workspace,
            log_file: &log_file,
        })
    }

    #[test]
    fn test_plain_argument_is_unchanged() {
        assert_eq!(render("--json"), "--json");
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_placeholders_are_substituted() {
        assert_eq!(render("{workspace}"), "/work/verify-codex-1");
        assert_eq!(render("--dir={workspace}"), "--dir=/work/verify-codex-1");
        assert_eq!(render("{ log_file }"), "/logs/codex.log");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render("{{literal}}"), "{literal}");
        assert_eq!(render("a } b"), "a } b");
    }

    #[test]
    fn test_unknown_placeholder_is_rejected() {
        let err = ArgTemplate::parse("--model={model}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                name: "model".to_string(),
                position: 8
            }
        );
        assert_eq!(err.to_string(), "unknown placeholder '{model}' at position 8");
    }

    #[test]
    fn test_malformed_templates() {
        assert_eq!(
            ArgTemplate::parse("{workspace").unwrap_err(),
            TemplateError::UnmatchedBrace { position: 0 }
        );
        assert_eq!(
            ArgTemplate::parse("x{}").unwrap_err(),
            TemplateError::EmptyPlaceholder { position: 1 }
        );
    }

    #[test]
    fn test_placeholders_listed_in_order() {
        let t = ArgTemplate::parse("{log_file}:{workspace}").unwrap();
        let found: Vec<_> = t.placeholders().collect();
        assert_eq!(found, vec![Placeholder::LogFile, Placeholder::Workspace]);
        assert_eq!(t.as_str(), "{log_file}:{workspace}");
    }

    #[test]
    fn test_literal_round_trips_through_parse() {
        let lit = ArgTemplate::literal("{not a slot}");
        assert_eq!(lit.as_str(), "{{not a slot}}");
        assert_eq!(ArgTemplate::parse(lit.as_str()).unwrap(), lit);
        assert_eq!(ArgTemplate::from(Placeholder::Workspace).as_str(), "{workspace}");
    }

    #[test]
    fn test_deserialize_rejects_bad_template() {
        let ok: ArgTemplate = serde_yaml::from_str("\"--dir={workspace}\"").unwrap();
        assert_eq!(ok.to_string(), "--dir={workspace}");

        let bad: Result<ArgTemplate, _> = serde_yaml::from_str("\"{nope}\"");
        assert!(bad.is_err());
    }
}
