//! Flat list text codec.
//!
//! Elements are separated by whitespace. Reading accepts bare words and
//! double-quoted elements (both with backslash substitution) and braced
//! elements (nested braces, taken verbatim). Writing picks the lightest form
//! that reads back to the same element.

use crate::error::{Error, Result};

/// Splits list text into its elements.
pub fn split(input: &str) -> Result<Vec<String>> {
    let mut parser = Parser::new(input);
    let mut elements = Vec::new();
    while parser.skip_ws() {
        elements.push(parser.parse_element()?);
    }
    Ok(elements)
}

/// Joins elements into list text.
pub fn join<I>(elements: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = String::new();
    for element in elements {
        push_element(&mut out, element.as_ref());
    }
    out
}

/// Appends one element, preceded by a separator unless `out` is empty.
pub fn push_element(out: &mut String, element: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    match quoting(element) {
        Quoting::Bare => out.push_str(element),
        Quoting::Braces => {
            out.push('{');
            out.push_str(element);
            out.push('}');
        }
        Quoting::Escape => escape_into(out, element),
    }
}

// =============================================================================
// Writing
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Quoting {
    Bare,
    Braces,
    Escape,
}

#[inline]
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}

#[inline]
fn is_special(c: char) -> bool {
    is_space(c) || matches!(c, '{' | '}' | '[' | ']' | '$' | ';' | '\\' | '"')
}

fn quoting(element: &str) -> Quoting {
    let plain = !element.is_empty() && !element.starts_with('#') && !element.chars().any(is_special);
    if plain {
        return Quoting::Bare;
    }
    // A trailing backslash inside braces would escape the closing brace.
    if braces_balance(element) && !element.ends_with('\\') {
        Quoting::Braces
    } else {
        Quoting::Escape
    }
}

/// Braces nest properly, counting escaped braces as literal.
fn braces_balance(element: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = element.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn escape_into(out: &mut String, element: &str) {
    for c in element.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0B' => out.push_str("\\v"),
            '\x0C' => out.push_str("\\f"),
            c if is_special(c) || c == '#' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Skips separators; false at end of input.
    fn skip_ws(&mut self) -> bool {
        while let Some(c) = self.current() {
            if !is_space(c) {
                return true;
            }
            self.bump();
        }
        false
    }

    fn parse_element(&mut self) -> Result<String> {
        match self.current() {
            Some('{') => self.parse_braced(),
            Some('"') => self.parse_quoted(),
            _ => Ok(self.parse_bare()),
        }
    }

    fn parse_braced(&mut self) -> Result<String> {
        self.bump();
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            let Some(c) = self.current() else {
                return Err(self.error("unmatched open brace in list"));
            };
            match c {
                '\\' => {
                    self.bump();
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let element = self.input[start..self.pos].to_string();
                        self.bump();
                        self.expect_separator("list element in braces")?;
                        return Ok(element);
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_quoted(&mut self) -> Result<String> {
        self.bump();
        let mut s = String::new();
        loop {
            let Some(c) = self.current() else {
                return Err(self.error("unmatched open quote in list"));
            };
            self.bump();
            match c {
                '"' => {
                    self.expect_separator("list element in quotes")?;
                    return Ok(s);
                }
                '\\' => self.backslash(&mut s),
                c => s.push(c),
            }
        }
    }

    fn parse_bare(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.current() {
            if is_space(c) {
                break;
            }
            self.bump();
            if c == '\\' {
                self.backslash(&mut s);
            } else {
                s.push(c);
            }
        }
        s
    }

    /// Substitutes the escape following a consumed backslash.
    fn backslash(&mut self, s: &mut String) {
        let Some(esc) = self.current() else {
            s.push('\\');
            return;
        };
        self.bump();
        match esc {
            'n' => s.push('\n'),
            't' => s.push('\t'),
            'r' => s.push('\r'),
            'v' => s.push('\x0B'),
            'f' => s.push('\x0C'),
            'a' => s.push('\x07'),
            'b' => s.push('\x08'),
            'x' => self.push_hex(s, 2, 'x'),
            'u' => self.push_hex(s, 4, 'u'),
            'U' => self.push_hex(s, 8, 'U'),
            '\n' => {
                // Line continuation collapses to one space.
                while matches!(self.current(), Some(' ' | '\t')) {
                    self.bump();
                }
                s.push(' ');
            }
            other => s.push(other),
        }
    }

    fn push_hex(&mut self, s: &mut String, max_digits: usize, marker: char) {
        let start = self.pos;
        let mut code = 0u32;
        for _ in 0..max_digits {
            match self.current().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    self.bump();
                }
                None => break,
            }
        }
        if self.pos == start {
            s.push(marker);
            return;
        }
        s.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    fn expect_separator(&self, what: &str) -> Result<()> {
        match self.current() {
            None => Ok(()),
            Some(c) if is_space(c) => Ok(()),
            Some(c) => Err(self.error(&format!("{what} followed by \"{c}\" instead of space"))),
        }
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::conversion(format!("{message} (at byte {})", self.pos))
    }
}
