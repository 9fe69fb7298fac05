//! Text processing applied to resolved source text before synthesis.
//!
//! A [`TextProcessing`] is the persisted, ordered list of rules. Compiling
//! it yields a [`TextProcessor`] plus a list of [`RuleIssue`]s for rules that
//! could not be compiled (an invalid regex, an empty pattern). Broken rules
//! are skipped; the rest of the chain still runs.

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in transformations that need no configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinRule {
    /// Remove HTML tags and decode common entities.
    StripHtml,
    /// Remove `(...)`, `[...]` and `{...}` segments.
    StripBrackets,
    /// Collapse whitespace runs to one space and trim.
    NormalizeWhitespace,
    /// Escape characters that are special in SSML.
    SsmlEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceKind {
    #[default]
    Simple,
    Regex,
}

/// One step of the processing chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextRule {
    Builtin {
        rule: BuiltinRule,
    },
    Replace {
        #[serde(default)]
        kind: ReplaceKind,
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        ignore_case: bool,
    },
}

impl TextRule {
    pub fn builtin(rule: BuiltinRule) -> Self {
        Self::Builtin { rule }
    }

    /// A literal, case-sensitive replacement.
    pub fn simple(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::Replace {
            kind: ReplaceKind::Simple,
            pattern: pattern.into(),
            replacement: replacement.into(),
            ignore_case: false,
        }
    }

    /// A regex replacement; `replacement` may use `$1`-style captures.
    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self::Replace {
            kind: ReplaceKind::Regex,
            pattern: pattern.into(),
            replacement: replacement.into(),
            ignore_case: false,
        }
    }
}

impl fmt::Display for TextRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin { rule } => write!(f, "{rule:?}"),
            Self::Replace {
                kind,
                pattern,
                replacement,
                ..
            } => write!(f, "{kind:?} '{pattern}' -> '{replacement}'"),
        }
    }
}

/// A rule that was skipped because it could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleIssue {
    /// Position of the rule in the chain.
    pub index: usize,
    pub message: String,
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}: {}", self.index + 1, self.message)
    }
}

/// The ordered rule chain of a batch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProcessing {
    #[serde(default)]
    pub rules: Vec<TextRule>,
}

impl TextProcessing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: TextRule) {
        self.rules.push(rule);
    }

    pub fn remove_rule(&mut self, index: usize) -> Option<TextRule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    pub fn move_up(&mut self, index: usize) {
        if index == 0 || index >= self.rules.len() {
            return;
        }
        self.rules.swap(index - 1, index);
    }

    pub fn move_down(&mut self, index: usize) {
        if index >= self.rules.len().saturating_sub(1) {
            return;
        }
        self.rules.swap(index, index + 1);
    }

    /// Compiles every rule, collecting issues for those that fail.
    pub fn compile(&self) -> (TextProcessor, Vec<RuleIssue>) {
        let mut steps = Vec::with_capacity(self.rules.len());
        let mut issues = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            match Step::compile(rule) {
                Ok(step) => steps.push(step),
                Err(message) => {
                    tracing::warn!(rule = index, %message, "skipping text processing rule");
                    issues.push(RuleIssue { index, message });
                }
            }
        }

        (TextProcessor { steps }, issues)
    }

    /// Compiles and applies the chain in one go.
    pub fn apply(&self, text: &str) -> String {
        self.compile().0.apply(text)
    }
}

/// A compiled rule chain.
#[derive(Debug, Clone, Default)]
pub struct TextProcessor {
    steps: Vec<Step>,
}

impl TextProcessor {
    /// Runs every step in order, each on the previous step's output.
    pub fn apply(&self, text: &str) -> String {
        self.steps
            .iter()
            .fold(text.to_string(), |acc, step| step.apply(&acc))
    }
}

#[derive(Debug, Clone)]
enum Step {
    StripHtml,
    StripBrackets(Regex),
    NormalizeWhitespace(Regex),
    SsmlEscape,
    Literal { pattern: String, replacement: String },
    Pattern { regex: Regex, replacement: String, expand: bool },
}

impl Step {
    fn compile(rule: &TextRule) -> Result<Self, String> {
        match rule {
            TextRule::Builtin { rule } => Ok(match rule {
                BuiltinRule::StripHtml => Self::StripHtml,
                BuiltinRule::StripBrackets => Self::StripBrackets(
                    Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").map_err(|e| e.to_string())?,
                ),
                BuiltinRule::NormalizeWhitespace => {
                    Self::NormalizeWhitespace(Regex::new(r"\s+").map_err(|e| e.to_string())?)
                }
                BuiltinRule::SsmlEscape => Self::SsmlEscape,
            }),
            TextRule::Replace {
                kind,
                pattern,
                replacement,
                ignore_case,
            } => {
                if pattern.is_empty() {
                    return Err("pattern is empty".to_string());
                }
                match (kind, ignore_case) {
                    (ReplaceKind::Simple, false) => Ok(Self::Literal {
                        pattern: pattern.clone(),
                        replacement: replacement.clone(),
                    }),
                    (ReplaceKind::Simple, true) => Ok(Self::Pattern {
                        regex: build_regex(&regex::escape(pattern), true)?,
                        replacement: replacement.clone(),
                        expand: false,
                    }),
                    (ReplaceKind::Regex, ignore_case) => Ok(Self::Pattern {
                        regex: build_regex(pattern, *ignore_case)?,
                        replacement: replacement.clone(),
                        expand: true,
                    }),
                }
            }
        }
    }

    fn apply(&self, text: &str) -> String {
        match self {
            Self::StripHtml => strip_html(text),
            Self::StripBrackets(re) => re.replace_all(text, "").into_owned(),
            Self::NormalizeWhitespace(re) => re.replace_all(text, " ").trim().to_string(),
            Self::SsmlEscape => ssml_escape(text),
            Self::Literal {
                pattern,
                replacement,
            } => text.replace(pattern.as_str(), replacement),
            Self::Pattern {
                regex,
                replacement,
                expand: true,
            } => regex.replace_all(text, replacement.as_str()).into_owned(),
            Self::Pattern {
                regex,
                replacement,
                expand: false,
            } => regex
                .replace_all(text, NoExpand(replacement.as_str()))
                .into_owned(),
        }
    }
}

fn build_regex(pattern: &str, ignore_case: bool) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| format!("invalid regex '{pattern}': {e}"))
}

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // last, so "&amp;lt;" decodes to "&lt;" rather than "<"
    ("&amp;", "&"),
];

/// Removes HTML tags and decodes the common entities. `<br>` and `<div>`
/// boundaries become spaces so words on separate lines stay separate.
pub fn strip_html(text: &str) -> String {
    decode_entities(replace_tags(text, ' '))
}

/// The first non-blank line of `text`, with HTML removed. `<br>`, `<div>`
/// and `<p>` tags count as line breaks.
pub fn first_line(text: &str) -> String {
    decode_entities(replace_tags(text, '\n'))
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Drops every tag, writing `boundary` in place of line-breaking ones.
fn replace_tags(text: &str, boundary: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('>') else {
            // A lone '<' is text, not a tag.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let tag = rest[start + 1..start + len].trim_start_matches('/').to_ascii_lowercase();
        if tag.starts_with("br") || tag.starts_with("div") || tag.starts_with("p ") || tag == "p" {
            out.push(boundary);
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_entities(text: String) -> String {
    HTML_ENTITIES
        .iter()
        .fold(text, |acc, (entity, plain)| acc.replace(entity, plain))
}

/// Escapes `& < > " '` for embedding in SSML.
pub fn ssml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
