//! Regex parsing into the node tree consumed by the pattern compiler.
//!
//! Supports:
//! - `.` matches any character
//! - `[...]` character classes with ranges
//! - `[^...]` negated character classes
//! - `|` alternation
//! - `(...)` grouping
//! - `?` optional quantifier
//! - `+` one-or-more quantifier
//! - `*` zero-or-more quantifier
//! - `{n}`, `{n,}`, `{n,m}` range quantifiers
//! - `\d \w \s \D \W \S \n \r \t` and escaped metacharacters
//!
//! Matching is always anchored at both ends, so `^` and `$` are rejected.

use thiserror::Error;

/// Largest number accepted inside a `{n,m}` quantifier before the limits check.
pub const QUANTIFIER_CEILING: u32 = 65_535;

const ESCAPE: char = '\\';

/// A node of a parsed regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A single literal character.
    Char(char),
    /// Any character in the inclusive range.
    CharRange(char, char),
    /// Negation of the child.
    Complement(Box<Node>),
    /// Any single character.
    Dot,
    /// The child or nothing.
    Optional(Box<Node>),
    /// The child repeated `min..=max` times; `max: None` is unbounded.
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
    },
    /// Any one of the alternatives.
    Or(Vec<Node>),
    /// The children in sequence.
    Concat(Vec<Node>),
    /// Matches only the empty string.
    Empty,
}

impl Node {
    /// Short name of the node kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Char(_) => "character",
            Node::CharRange(..) => "character range",
            Node::Complement(_) => "complement",
            Node::Dot => "dot",
            Node::Optional(_) => "optional",
            Node::Repeat { .. } => "repeat",
            Node::Or(_) => "alternation",
            Node::Concat(_) => "sequence",
            Node::Empty => "empty",
        }
    }
}

/// Error type for regex parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct RegexError {
    pub message: String,
    pub offset: usize,
}

impl RegexError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Parser state.
struct RegexParse<'a> {
    src: &'a str,
    index: usize,
    last_index: usize,
    depth: usize,
}

impl<'a> RegexParse<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            index: 0,
            last_index: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.index..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.last_index = self.index;
        self.index += c.len_utf8();
        Some(c)
    }

    fn require(&mut self, wanted: char) -> Result<(), RegexError> {
        match self.next_char() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(RegexError::new(
                format!("expected '{}', got '{}'", wanted, c),
                self.last_index,
            )),
            None => Err(RegexError::new(
                format!("expected '{}', got end of string", wanted),
                self.index,
            )),
        }
    }

    fn bypass_optional(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.next_char();
            true
        } else {
            false
        }
    }
}

/// Parse a regex string into a node tree.
pub fn parse_regex(re: &str) -> Result<Node, RegexError> {
    let mut parse = RegexParse::new(re);
    // at depth 0 a stray ')' is reported by read_atom, so this consumes everything
    read_branches(&mut parse)
}

/// Read branches separated by `|`.
fn read_branches(parse: &mut RegexParse<'_>) -> Result<Node, RegexError> {
    let mut branches = vec![read_branch(parse)?];
    while parse.bypass_optional('|') {
        branches.push(read_branch(parse)?);
    }
    Ok(if branches.len() == 1 {
        branches.swap_remove(0)
    } else {
        Node::Or(branches)
    })
}

/// Read a single branch (sequence of pieces).
fn read_branch(parse: &mut RegexParse<'_>) -> Result<Node, RegexError> {
    let mut pieces = Vec::new();
    while let Some(c) = parse.peek() {
        if c == '|' || (c == ')' && parse.depth > 0) {
            break;
        }
        pieces.push(read_piece(parse)?);
    }
    Ok(match pieces.len() {
        0 => Node::Empty,
        1 => pieces.swap_remove(0),
        _ => Node::Concat(pieces),
    })
}

/// Read a piece (atom with optional quantifier).
fn read_piece(parse: &mut RegexParse<'_>) -> Result<Node, RegexError> {
    let atom = read_atom(parse)?;
    let piece = read_quantifier(parse, atom)?;
    if let Some(c @ ('?' | '*' | '+' | '{')) = parse.peek() {
        return Err(RegexError::new(
            format!("invalid character '{}' (stacked quantifier)", c),
            parse.index,
        ));
    }
    Ok(piece)
}

/// Read an atom.
fn read_atom(parse: &mut RegexParse<'_>) -> Result<Node, RegexError> {
    let offset = parse.index;
    let Some(c) = parse.next_char() else {
        return Err(RegexError::new("end of string", offset));
    };

    match c {
        '.' => Ok(Node::Dot),
        '(' => {
            parse.depth += 1;
            let inner = read_branches(parse)?;
            parse.require(')').map_err(|_| RegexError::new("unclosed '('", offset))?;
            parse.depth -= 1;
            Ok(inner)
        }
        ')' => Err(RegexError::new("unbalanced ')'", offset)),
        '[' => read_char_class_expr(parse, offset),
        ']' | '}' => Err(RegexError::new(format!("invalid '{}'", c), offset)),
        '^' | '$' => Err(RegexError::new(
            format!("anchor '{}' is not supported, matches are always anchored", c),
            offset,
        )),
        '?' | '+' | '*' | '{' => Err(RegexError::new(
            format!("invalid character '{}' (quantifier without atom)", c),
            offset,
        )),
        ESCAPE => read_escape(parse, offset, false),
        c => Ok(Node::Char(c)),
    }
}

/// Read the character after `\`.
fn read_escape(parse: &mut RegexParse<'_>, offset: usize, in_class: bool) -> Result<Node, RegexError> {
    let Some(next) = parse.next_char() else {
        return Err(RegexError::new(
            format!("'{}' at end of regular expression", ESCAPE),
            offset,
        ));
    };
    if let Some(escaped) = check_single_char_escape(next) {
        return Ok(Node::Char(escaped));
    }
    if let Some(class) = check_multi_char_escape(next) {
        return Ok(class);
    }
    let place = if in_class { " in character class" } else { "" };
    Err(RegexError::new(
        format!("invalid character '{}' after '{}'{}", next, ESCAPE, place),
        parse.last_index,
    ))
}

/// Check for single-char escape sequences.
fn check_single_char_escape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '(' | ')' | '*' | '+' | '-' | '.' | '?' | '[' | ']' | '^' | '$' | '{' | '|' | '}'
        | '/' | ESCAPE => Some(c),
        _ => None,
    }
}

/// Check for multi-char escape sequences that expand to character classes.
fn check_multi_char_escape(c: char) -> Option<Node> {
    let class = match c.to_ascii_lowercase() {
        'd' => Node::CharRange('0', '9'),
        'w' => Node::Or(vec![
            Node::CharRange('a', 'z'),
            Node::CharRange('A', 'Z'),
            Node::CharRange('0', '9'),
            Node::Char('_'),
        ]),
        's' => Node::Or(vec![
            Node::Char(' '),
            Node::Char('\t'),
            Node::Char('\n'),
            Node::Char('\r'),
        ]),
        _ => return None,
    };
    if c.is_ascii_uppercase() {
        Some(Node::Complement(Box::new(class)))
    } else {
        Some(class)
    }
}

/// Read a character class expression `[...]`, the opening bracket already consumed.
fn read_char_class_expr(parse: &mut RegexParse<'_>, offset: usize) -> Result<Node, RegexError> {
    let unclosed = || RegexError::new("unclosed character class", offset);

    let is_negated = parse.bypass_optional('^');
    let mut items = Vec::new();
    let mut first = true;

    loop {
        let item_offset = parse.index;
        let c = parse.next_char().ok_or_else(unclosed)?;
        match c {
            ']' if !first => break,
            // leading or trailing '-' is literal
            '-' if first || parse.peek() == Some(']') => items.push(Node::Char('-')),
            '[' => {
                return Err(RegexError::new(
                    "invalid '[' in character class",
                    item_offset,
                ))
            }
            _ => {
                let lo = if c == ESCAPE {
                    match read_escape(parse, item_offset, true)? {
                        Node::Char(lo) => lo,
                        // multi-char escapes can't participate in ranges
                        class => {
                            items.push(class);
                            first = false;
                            continue;
                        }
                    }
                } else {
                    c
                };
                items.push(read_range_end(parse, lo, offset)?);
            }
        }
        first = false;
    }

    let class = match items.len() {
        1 => items.swap_remove(0),
        _ => Node::Or(items),
    };
    Ok(if is_negated {
        Node::Complement(Box::new(class))
    } else {
        class
    })
}

/// Having read `lo`, read an optional `-hi`.
fn read_range_end(parse: &mut RegexParse<'_>, lo: char, class_offset: usize) -> Result<Node, RegexError> {
    let mut ahead = parse.src[parse.index..].chars();
    if ahead.next() != Some('-') || matches!(ahead.next(), Some(']') | None) {
        return Ok(Node::Char(lo));
    }
    parse.next_char();

    let range_offset = parse.index;
    let hi = match parse.next_char() {
        Some(ESCAPE) => match read_escape(parse, range_offset, true)? {
            Node::Char(hi) => hi,
            _ => {
                return Err(RegexError::new(
                    "multi-character escape cannot end a range",
                    range_offset,
                ))
            }
        },
        Some(hi) => hi,
        None => return Err(RegexError::new("unclosed character class", class_offset)),
    };

    if lo > hi {
        return Err(RegexError::new(
            format!("invalid range {}-{}", lo, hi),
            range_offset,
        ));
    }
    Ok(if lo == hi {
        Node::Char(lo)
    } else {
        Node::CharRange(lo, hi)
    })
}

/// Read a quantifier (`?`, `*`, `+`, `{m,n}`) and wrap the atom in it.
fn read_quantifier(parse: &mut RegexParse<'_>, atom: Node) -> Result<Node, RegexError> {
    let node = Box::new(atom);
    Ok(match parse.peek() {
        Some('?') => {
            parse.next_char();
            Node::Optional(node)
        }
        Some('*') => {
            parse.next_char();
            Node::Repeat {
                node,
                min: 0,
                max: None,
            }
        }
        Some('+') => {
            parse.next_char();
            Node::Repeat {
                node,
                min: 1,
                max: None,
            }
        }
        Some('{') => {
            parse.next_char();
            let (min, max) = read_range_quantifier(parse)?;
            Node::Repeat { node, min, max }
        }
        _ => *node,
    })
}

/// Read a range quantifier body `m}`, `m,}` or `m,n}`.
fn read_range_quantifier(parse: &mut RegexParse<'_>) -> Result<(u32, Option<u32>), RegexError> {
    let min = read_bound(parse)?.ok_or_else(|| {
        RegexError::new("invalid range quantifier, expecting digits", parse.index)
    })?;

    let offset = parse.index;
    match parse.next_char() {
        Some('}') => return Ok((min, Some(min))),
        Some(',') => {}
        Some(c) => {
            return Err(RegexError::new(
                format!("unexpected character '{}' in quantifier", c),
                offset,
            ))
        }
        None => {
            return Err(RegexError::new(
                "unexpected end of string in quantifier",
                offset,
            ))
        }
    }

    let max = read_bound(parse)?;
    parse
        .require('}')
        .map_err(|e| RegexError::new(format!("{} in quantifier", e.message), e.offset))?;
    if let Some(max) = max {
        if max < min {
            return Err(RegexError::new(
                "invalid range quantifier, top must be greater than bottom",
                parse.last_index,
            ));
        }
    }
    Ok((min, max))
}

/// Read a decimal bound, `None` when no digits are present.
fn read_bound(parse: &mut RegexParse<'_>) -> Result<Option<u32>, RegexError> {
    let offset = parse.index;
    let mut digits = String::new();
    while let Some(c) = parse.peek().filter(char::is_ascii_digit) {
        digits.push(c);
        parse.next_char();
    }
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<u32>() {
        Ok(n) if n <= QUANTIFIER_CEILING => Ok(Some(n)),
        _ => Err(RegexError::new("quantifier bound too large", offset)),
    }
}
