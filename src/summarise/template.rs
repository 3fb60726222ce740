//! Prompt templates with `{name}` placeholders.
//!
//! `{{` and `}}` render as literal braces. Substituted values are inserted
//! verbatim and never re-parsed, so model output containing braces can be
//! embedded safely.

use std::collections::HashMap;

use thiserror::Error;

/// Errors raised while parsing or rendering templates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unclosed '{{' at byte {0}")]
    Unclosed(usize),

    #[error("Unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    #[error("Invalid template variable '{0}'")]
    InvalidVariable(String),

    #[error("Missing value for template variable '{0}'")]
    MissingVariable(String),

    #[error("Template '{0}' does not reference {{content}}")]
    MissingContentVariable(String),

    #[error("Failed to read template {path}: {message}")]
    Read { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed(pos));
                    }
                    let name = name.trim().to_string();
                    if !is_identifier(&name) {
                        return Err(TemplateError::InvalidVariable(name));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name));
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Variable(name) = segment {
                if !seen.contains(&name.as_str()) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Whether the template references `name`.
    pub fn uses(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Variable(v) if v == name))
    }

    /// Substitute every variable from `vars`.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = vars
                        .get(name.as_str())
                        .ok_or_else(|| TemplateError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Render a template whose only variable is `{content}`.
    pub fn render_content(&self, content: &str) -> Result<String, TemplateError> {
        self.render(&HashMap::from([("content", content)]))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
