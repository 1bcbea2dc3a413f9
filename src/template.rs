//! Placeholder scanning for parameterized patterns.
//!
//! A pattern such as `/project/{name}/edit` is split into literal runs and
//! placeholders. `\` escapes the next character, so `\{` is a literal brace.

use rustc_hash::FxHashSet;

use crate::error::RegistrationError;

const ESCAPE: char = '\\';

/// A placeholder as written in the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Parameter {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    /// Index into [`Template::parameters`].
    Parameter(usize),
}

/// A scanned pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Template {
    pub segments: Vec<Segment>,
    pub parameters: Vec<Parameter>,
}

impl Template {
    /// Split `pattern` into segments, validating placeholder syntax.
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        let malformed = |message: &str, offset: usize| RegistrationError::MalformedPattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
            offset,
        };

        let mut segments = Vec::new();
        let mut parameters: Vec<Parameter> = Vec::new();
        let mut seen = FxHashSet::default();
        let mut literal = String::new();
        let mut chars = pattern.char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some((_, escaped)) => literal.push(escaped),
                    None => return Err(malformed("dangling escape", offset)),
                },
                '}' => return Err(malformed("unmatched '}'", offset)),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((inner, '{')) => {
                                return Err(malformed("'{' inside placeholder", inner))
                            }
                            Some((_, c)) => name.push(c),
                            None => return Err(malformed("unclosed placeholder", offset)),
                        }
                    }
                    if name.is_empty() {
                        return Err(malformed("empty placeholder name", offset));
                    }
                    if !seen.insert(name.clone()) {
                        return Err(RegistrationError::DuplicateParameter { name, offset });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Parameter(parameters.len()));
                    parameters.push(Parameter { name });
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            segments,
            parameters,
        })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
}
