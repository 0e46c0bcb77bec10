//! Source position indexing for JSON documents
//!
//! Parses raw JSON text into a [`serde_json::Value`] and, alongside it, a
//! [`PointerMap`] from every JSON Pointer in the document to the line and
//! column where its key and value start. Diagnostics use the map to point
//! at the offending spot in the source text.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// A 1-based line/column location in source text. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// Where a JSON node appears in the source.
///
/// `key` is only present for object members; array items and the root
/// have a value position alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub key: Option<Position>,
    pub value: Position,
}

/// Mapping from JSON Pointer (RFC 6901) to source location.
#[derive(Debug, Clone, Default)]
pub struct PointerMap {
    pointers: HashMap<String, SourceLocation>,
}

impl PointerMap {
    /// Look up the location of a pointer such as `/tree/elements/0/id`.
    pub fn get(&self, pointer: &str) -> Option<&SourceLocation> {
        self.pointers.get(pointer)
    }

    /// Position to report for a pointer, preferring the key over the value.
    pub fn position_of(&self, pointer: &str) -> Option<Position> {
        self.get(pointer)
            .map(|location| location.key.unwrap_or(location.value))
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

/// The text was not syntactically valid JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("error reading or parsing the JSON file: {details}")]
pub struct ParseError {
    pub details: String,
}

/// Parsed data together with its position index.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub data: Value,
    pub pointers: PointerMap,
}

/// Parse `text` into data plus a pointer map.
pub fn parse_with_positions(text: &str) -> Result<ParsedDocument, ParseError> {
    let data: Value = serde_json::from_str(text).map_err(|e| ParseError {
        details: e.to_string(),
    })?;

    // serde_json accepted the text, so the scanner can assume well-formed input.
    let mut scanner = Scanner::new(text);
    scanner.scan_value(String::new(), None);

    Ok(ParsedDocument {
        data,
        pointers: PointerMap {
            pointers: scanner.pointers,
        },
    })
}

/// Escape a member name for use as a JSON Pointer token.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

struct Scanner<'a> {
    text: &'a str,
    offset: usize,
    position: Position,
    pointers: HashMap<String, SourceLocation>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            position: Position::start(),
            pointers: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.offset..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.bump();
        }
    }

    fn scan_value(&mut self, pointer: String, key: Option<Position>) {
        self.skip_whitespace();
        let value = self.position;
        match self.peek() {
            Some('{') => self.scan_object(&pointer),
            Some('[') => self.scan_array(&pointer),
            Some('"') => {
                self.scan_string();
            }
            Some(_) => self.scan_literal(),
            None => return,
        }
        self.pointers.insert(pointer, SourceLocation { key, value });
    }

    fn scan_object(&mut self, pointer: &str) {
        self.bump();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return;
        }
        loop {
            self.skip_whitespace();
            let key_position = self.position;
            let name = self.scan_string();
            self.skip_whitespace();
            self.bump(); // ':'
            let member = format!("{}/{}", pointer, escape_pointer_token(&name));
            self.scan_value(member, Some(key_position));
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                _ => break,
            }
        }
    }

    fn scan_array(&mut self, pointer: &str) {
        self.bump();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return;
        }
        let mut index = 0usize;
        loop {
            self.scan_value(format!("{}/{}", pointer, index), None);
            index += 1;
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                _ => break,
            }
        }
    }

    /// Consume a string literal and return its decoded contents.
    fn scan_string(&mut self) -> String {
        let mut out = String::new();
        self.bump(); // opening quote
        while let Some(c) = self.bump() {
            match c {
                '"' => break,
                '\\' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('u') => self.scan_unicode_escape(&mut out),
                    Some(other) => out.push(other),
                    None => break,
                },
                other => out.push(other),
            }
        }
        out
    }

    fn scan_unicode_escape(&mut self, out: &mut String) {
        let mut units = vec![self.scan_hex4()];
        // A high surrogate is followed by `\uXXXX` holding the low half.
        if (0xD800..0xDC00).contains(&units[0]) && self.text[self.offset..].starts_with("\\u") {
            self.bump();
            self.bump();
            units.push(self.scan_hex4());
        }
        out.extend(
            char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
        );
    }

    fn scan_hex4(&mut self) -> u16 {
        let mut unit = 0u16;
        for _ in 0..4 {
            let digit = self.bump().and_then(|c| c.to_digit(16)).unwrap_or(0);
            unit = unit.wrapping_mul(16).wrapping_add(digit as u16);
        }
        unit
    }

    fn scan_literal(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | ' ' | '\t' | '\n' | '\r') {
                break;
            }
            self.bump();
        }
    }
}
