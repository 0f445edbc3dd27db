// crates/contract-gate-core/src/extract/scan.rs
// ============================================================================
// Module: Contract Gate Lexical Scanner
// Description: Comment blanking, string spans, bracket matching, and blocks.
// Purpose: Give every adapter a structurally validated view of a source unit.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Scanning turns raw bytes into a [`ScannedUnit`]: the original text, a
//! `code` copy of identical length with comments replaced by spaces (newlines
//! kept, string contents kept), every string literal span, and a map of
//! matched brackets. Offsets are shared between `raw` and `code`, so an
//! adapter can search `code` and report lines from either.
//!
//! A unit whose brackets do not balance is rejected with
//! [`ExtractionError::Unbalanced`]; the pipeline isolates it as degraded
//! coverage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::ops::Range;

use crate::core::source::Language;
use crate::core::source::SourceLocation;
use crate::core::source::SourceUnit;
use crate::interfaces::ExtractionError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// String literal span within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSpan {
    /// Offset of the prefix (Python `f`/`r`) or opening quote.
    pub start: usize,
    /// Offset one past the closing quote.
    pub end: usize,
    /// Content range (between the quotes).
    pub content: (usize, usize),
    /// True for template literals and f-strings with interpolation.
    pub interpolated: bool,
}

/// Lexically scanned source unit.
#[derive(Debug, Clone)]
pub struct ScannedUnit {
    /// Slash-normalized path.
    pub path: String,
    /// Unit language.
    pub language: Language,
    /// True for test units.
    pub is_test: bool,
    /// Original text.
    pub raw: String,
    /// Text with comments blanked.
    pub code: String,
    /// Byte offset of each line start.
    line_starts: Vec<usize>,
    /// Open bracket offset to close bracket offset.
    pairs: HashMap<usize, usize>,
    /// Close bracket offset to open bracket offset.
    open_of: HashMap<usize, usize>,
    /// Brace pairs sorted by open offset.
    braces: Vec<(usize, usize)>,
    /// String spans sorted by start offset.
    strings: Vec<StringSpan>,
}

/// Keywords after which a `/` starts a regex literal.
const REGEX_PRECEDING_WORDS: &[&str] =
    &["return", "typeof", "case", "in", "of", "delete", "void", "throw", "new", "else", "do"];

/// Block headers that never introduce a function body.
const NON_FUNCTION_HEADERS: &[&str] = &[
    "if",
    "for",
    "while",
    "switch",
    "catch",
    "else",
    "do",
    "try",
    "finally",
    "with",
    "synchronized",
    "class",
    "interface",
    "enum",
    "record",
    "struct",
    "type",
    "select",
    "return",
    "const",
    "let",
    "var",
    "package",
    "import",
];

// ============================================================================
// SECTION: Scanning
// ============================================================================

/// Decodes and scans a source unit.
///
/// # Errors
///
/// Returns [`ExtractionError`] when the unit exceeds `max_bytes`, is not
/// UTF-8, or its comments, strings, or brackets do not terminate cleanly.
pub fn scan_unit(
    unit: &SourceUnit,
    is_test: bool,
    max_bytes: usize,
) -> Result<ScannedUnit, ExtractionError> {
    if unit.bytes.len() > max_bytes {
        return Err(ExtractionError::TooLarge {
            size: unit.bytes.len(),
            limit: max_bytes,
        });
    }
    let raw = std::str::from_utf8(&unit.bytes)
        .map_err(|err| ExtractionError::NotUtf8(err.to_string()))?
        .to_string();
    scan_text(&unit.path, unit.language, is_test, raw)
}

/// Scans already-decoded text.
///
/// # Errors
///
/// Returns [`ExtractionError`] when comments, strings, or brackets do not
/// terminate cleanly.
pub fn scan_text(
    path: &str,
    language: Language,
    is_test: bool,
    raw: String,
) -> Result<ScannedUnit, ExtractionError> {
    let line_starts = line_starts(&raw);
    let mut lexer = Lexer {
        bytes: raw.as_bytes(),
        out: raw.as_bytes().to_vec(),
        language,
        line_starts: &line_starts,
        stack: Vec::new(),
        pairs: HashMap::new(),
        strings: Vec::new(),
    };
    lexer.run()?;
    let Lexer {
        out,
        pairs,
        strings,
        ..
    } = lexer;
    let code = String::from_utf8(out).map_err(|err| ExtractionError::Failed(err.to_string()))?;
    let open_of = pairs.iter().map(|(open, close)| (*close, *open)).collect();
    let mut braces: Vec<(usize, usize)> = pairs
        .iter()
        .filter(|(open, _)| raw.as_bytes().get(**open) == Some(&b'{'))
        .map(|(open, close)| (*open, *close))
        .collect();
    braces.sort_unstable();
    Ok(ScannedUnit {
        path: path.to_string(),
        language,
        is_test,
        raw,
        code,
        line_starts,
        pairs,
        open_of,
        braces,
        strings,
    })
}

/// Computes line start offsets.
fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.bytes().enumerate().filter(|(_, byte)| *byte == b'\n').map(|(index, _)| index + 1))
        .collect()
}

/// Converts an offset into a 1-based line using precomputed starts.
fn line_for(starts: &[usize], offset: usize) -> u32 {
    u32::try_from(starts.partition_point(|start| *start <= offset)).unwrap_or(u32::MAX)
}

/// Single-pass lexer state.
struct Lexer<'a> {
    /// Raw bytes.
    bytes: &'a [u8],
    /// Output bytes with comments blanked.
    out: Vec<u8>,
    /// Unit language.
    language: Language,
    /// Line starts for error reporting.
    line_starts: &'a [usize],
    /// Open bracket stack.
    stack: Vec<(u8, usize)>,
    /// Matched bracket pairs.
    pairs: HashMap<usize, usize>,
    /// String spans.
    strings: Vec<StringSpan>,
}

impl Lexer<'_> {
    /// Runs the lexer to completion.
    fn run(&mut self) -> Result<(), ExtractionError> {
        let mut pos = 0;
        while pos < self.bytes.len() {
            pos = self.step(pos)?;
        }
        if let Some((byte, offset)) = self.stack.last() {
            return Err(ExtractionError::Unbalanced {
                line: line_for(self.line_starts, *offset),
                detail: format!("unclosed `{}`", char::from(*byte)),
            });
        }
        Ok(())
    }

    /// Consumes one token starting at `pos` and returns the next position.
    fn step(&mut self, pos: usize) -> Result<usize, ExtractionError> {
        let byte = self.bytes[pos];
        let next = self.bytes.get(pos + 1).copied();
        let python = self.language == Language::Python;
        if python && byte == b'#' {
            return Ok(self.blank_until_newline(pos));
        }
        if !python && byte == b'/' && next == Some(b'/') {
            return Ok(self.blank_until_newline(pos));
        }
        if !python && byte == b'/' && next == Some(b'*') {
            return self.blank_block_comment(pos);
        }
        if byte == b'/' && self.language == Language::TypeScript && self.regex_allowed(pos) {
            if let Some(end) = self.regex_end(pos) {
                self.strings.push(StringSpan {
                    start: pos,
                    end,
                    content: (pos + 1, end.saturating_sub(1)),
                    interpolated: true,
                });
                return Ok(end);
            }
            return Ok(pos + 1);
        }
        match byte {
            b'"' | b'\'' => self.string(pos, byte),
            b'`' if self.language == Language::TypeScript => self.template(pos),
            b'`' if self.language == Language::Go => self.raw_string(pos),
            b'(' | b'[' | b'{' => {
                self.stack.push((byte, pos));
                Ok(pos + 1)
            }
            b')' | b']' | b'}' => {
                self.close(pos, byte)?;
                Ok(pos + 1)
            }
            _ => Ok(pos + 1),
        }
    }

    /// Records a closing bracket.
    fn close(&mut self, pos: usize, byte: u8) -> Result<(), ExtractionError> {
        let expected = match byte {
            b')' => b'(',
            b']' => b'[',
            _ => b'{',
        };
        match self.stack.pop() {
            Some((open, offset)) if open == expected => {
                self.pairs.insert(offset, pos);
                Ok(())
            }
            Some((open, _)) => Err(ExtractionError::Unbalanced {
                line: line_for(self.line_starts, pos),
                detail: format!(
                    "`{}` closes `{}`",
                    char::from(byte),
                    char::from(open)
                ),
            }),
            None => Err(ExtractionError::Unbalanced {
                line: line_for(self.line_starts, pos),
                detail: format!("unexpected `{}`", char::from(byte)),
            }),
        }
    }

    /// Blanks a line comment.
    fn blank_until_newline(&mut self, pos: usize) -> usize {
        let mut index = pos;
        while index < self.bytes.len() && self.bytes[index] != b'\n' {
            self.out[index] = b' ';
            index += 1;
        }
        index
    }

    /// Blanks a block comment.
    fn blank_block_comment(&mut self, pos: usize) -> Result<usize, ExtractionError> {
        let Some(relative) = find_bytes(&self.bytes[pos + 2 ..], b"*/") else {
            return Err(ExtractionError::Unterminated {
                construct: "block comment".to_string(),
                line: line_for(self.line_starts, pos),
            });
        };
        let end = pos + 2 + relative + 2;
        for index in pos .. end {
            if self.bytes[index] != b'\n' {
                self.out[index] = b' ';
            }
        }
        Ok(end)
    }

    /// Consumes a quoted string (single-line, or triple-quoted where supported).
    fn string(&mut self, pos: usize, quote: u8) -> Result<usize, ExtractionError> {
        let triple = [quote, quote, quote];
        let supports_triple = match self.language {
            Language::Python => true,
            Language::Java => quote == b'"',
            _ => false,
        };
        let prefix_start = self.string_prefix_start(pos);
        let interpolated = self.language == Language::Python
            && self.bytes[prefix_start .. pos].iter().any(|byte| byte.eq_ignore_ascii_case(&b'f'));
        if supports_triple && self.bytes[pos ..].starts_with(&triple) {
            let mut index = pos + 3;
            while index < self.bytes.len() {
                if self.bytes[index] == b'\\' {
                    index += 2;
                    continue;
                }
                if self.bytes[index ..].starts_with(&triple) {
                    let end = index + 3;
                    self.strings.push(StringSpan {
                        start: prefix_start,
                        end,
                        content: (pos + 3, index),
                        interpolated,
                    });
                    return Ok(end);
                }
                index += 1;
            }
            return Err(ExtractionError::Unterminated {
                construct: "string".to_string(),
                line: line_for(self.line_starts, pos),
            });
        }
        let mut index = pos + 1;
        while index < self.bytes.len() {
            match self.bytes[index] {
                b'\\' => index += 2,
                b'\n' => break,
                byte if byte == quote => {
                    self.strings.push(StringSpan {
                        start: prefix_start,
                        end: index + 1,
                        content: (pos + 1, index),
                        interpolated,
                    });
                    return Ok(index + 1);
                }
                _ => index += 1,
            }
        }
        let end = index.min(self.bytes.len());
        self.strings.push(StringSpan {
            start: prefix_start,
            end,
            content: (pos + 1, end),
            interpolated,
        });
        Ok(end)
    }

    /// Returns the start of a Python string prefix (`f`, `rb`, ...) before `pos`.
    fn string_prefix_start(&self, pos: usize) -> usize {
        if self.language != Language::Python {
            return pos;
        }
        let mut start = pos;
        while start > 0
            && pos - start < 2
            && matches!(self.bytes[start - 1].to_ascii_lowercase(), b'f' | b'r' | b'b' | b'u')
        {
            start -= 1;
        }
        if start > 0 && is_ident_byte(self.bytes[start - 1]) { pos } else { start }
    }

    /// Consumes a Go raw string.
    fn raw_string(&mut self, pos: usize) -> Result<usize, ExtractionError> {
        let Some(relative) = self.bytes[pos + 1 ..].iter().position(|byte| *byte == b'`') else {
            return Err(ExtractionError::Unterminated {
                construct: "raw string".to_string(),
                line: line_for(self.line_starts, pos),
            });
        };
        let end = pos + 1 + relative + 1;
        self.strings.push(StringSpan {
            start: pos,
            end,
            content: (pos + 1, end - 1),
            interpolated: false,
        });
        Ok(end)
    }

    /// Consumes a TypeScript template literal, including nested expressions.
    fn template(&mut self, pos: usize) -> Result<usize, ExtractionError> {
        let (end, interpolated) = template_end(self.bytes, pos).ok_or_else(|| {
            ExtractionError::Unterminated {
                construct: "template literal".to_string(),
                line: line_for(self.line_starts, pos),
            }
        })?;
        self.strings.push(StringSpan {
            start: pos,
            end,
            content: (pos + 1, end - 1),
            interpolated,
        });
        Ok(end)
    }

    /// Returns true when a `/` at `pos` starts a regex literal.
    fn regex_allowed(&self, pos: usize) -> bool {
        let mut index = pos;
        while index > 0 {
            index -= 1;
            let byte = self.out[index];
            if byte.is_ascii_whitespace() {
                continue;
            }
            if is_ident_byte(byte) {
                let mut start = index;
                while start > 0 && is_ident_byte(self.out[start - 1]) {
                    start -= 1;
                }
                let word = std::str::from_utf8(&self.out[start ..= index]).unwrap_or("");
                return REGEX_PRECEDING_WORDS.contains(&word);
            }
            return b"(,=:[!&|?{};+-*%<>~^".contains(&byte);
        }
        true
    }

    /// Returns the end of a regex literal starting at `pos`, if it closes on this line.
    fn regex_end(&self, pos: usize) -> Option<usize> {
        let mut index = pos + 1;
        let mut in_class = false;
        while index < self.bytes.len() {
            match self.bytes[index] {
                b'\\' => index += 2,
                b'\n' => return None,
                b'[' => {
                    in_class = true;
                    index += 1;
                }
                b']' => {
                    in_class = false;
                    index += 1;
                }
                b'/' if !in_class => {
                    let mut end = index + 1;
                    while end < self.bytes.len() && self.bytes[end].is_ascii_alphabetic() {
                        end += 1;
                    }
                    return Some(end);
                }
                _ => index += 1,
            }
        }
        None
    }
}

/// Returns the end of a template literal and whether it interpolates.
fn template_end(bytes: &[u8], pos: usize) -> Option<(usize, bool)> {
    let mut index = pos + 1;
    let mut interpolated = false;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'`' => return Some((index + 1, interpolated)),
            b'$' if bytes.get(index + 1) == Some(&b'{') => {
                interpolated = true;
                index += 2;
                let mut depth = 1usize;
                while index < bytes.len() && depth > 0 {
                    match bytes[index] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        b'`' => {
                            let (end, _) = template_end(bytes, index)?;
                            index = end;
                            continue;
                        }
                        quote @ (b'"' | b'\'') => {
                            index += 1;
                            while index < bytes.len() && bytes[index] != quote {
                                if bytes[index] == b'\\' {
                                    index += 1;
                                }
                                index += 1;
                            }
                        }
                        _ => {}
                    }
                    index += 1;
                }
            }
            _ => index += 1,
        }
    }
    None
}

/// Finds a byte subsequence.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Returns true for identifier bytes across supported languages.
#[must_use]
pub const fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl ScannedUnit {
    /// Returns the 1-based line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> u32 {
        line_for(&self.line_starts, offset)
    }

    /// Returns the source location of `offset`.
    #[must_use]
    pub fn location(&self, offset: usize) -> SourceLocation {
        SourceLocation::new(self.path.clone(), self.line_of(offset))
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        u32::try_from(self.line_starts.len()).unwrap_or(u32::MAX)
    }

    /// Returns the byte range of a 1-based line, excluding the newline.
    #[must_use]
    pub fn line_range(&self, line: u32) -> Range<usize> {
        let index = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
        let start = self.line_starts.get(index).copied().unwrap_or(self.code.len());
        let end = self
            .line_starts
            .get(index + 1)
            .map_or(self.code.len(), |next| next.saturating_sub(1));
        start .. end.max(start)
    }

    /// Returns the raw text of a 1-based line.
    #[must_use]
    pub fn raw_line(&self, line: u32) -> &str {
        self.raw.get(self.line_range(line)).unwrap_or("")
    }

    /// Returns the comment-blanked text of a 1-based line.
    #[must_use]
    pub fn code_line(&self, line: u32) -> &str {
        self.code.get(self.line_range(line)).unwrap_or("")
    }

    /// Returns comment-blanked text for a range (empty when out of bounds).
    #[must_use]
    pub fn text(&self, range: Range<usize>) -> &str {
        self.code.get(range).unwrap_or("")
    }

    /// Returns the matching close offset for an open bracket.
    #[must_use]
    pub fn closing(&self, open: usize) -> Option<usize> {
        self.pairs.get(&open).copied()
    }

    /// Returns the matching open offset for a close bracket.
    #[must_use]
    pub fn opening(&self, close: usize) -> Option<usize> {
        self.open_of.get(&close).copied()
    }

    /// Returns true when `offset` lies inside a parenthesized or bracketed group.
    #[must_use]
    pub fn inside_group(&self, offset: usize) -> bool {
        let bytes = self.code.as_bytes();
        self.pairs.iter().any(|(open, close)| {
            *open < offset && offset < *close && matches!(bytes.get(*open), Some(b'(' | b'['))
        })
    }

    /// Returns the next non-whitespace offset at or after `from`.
    #[must_use]
    pub fn next_non_ws(&self, from: usize) -> Option<usize> {
        self.code
            .as_bytes()
            .get(from ..)?
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .map(|relative| from + relative)
    }

    /// Returns the byte at `offset`.
    #[must_use]
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.code.as_bytes().get(offset).copied()
    }

    /// Returns the string span containing `offset`.
    #[must_use]
    pub fn string_containing(&self, offset: usize) -> Option<&StringSpan> {
        let index = self.strings.partition_point(|span| span.start <= offset);
        index.checked_sub(1).and_then(|index| self.strings.get(index)).filter(|span| offset < span.end)
    }

    /// Returns true when `offset` lies inside a string literal.
    #[must_use]
    pub fn in_string(&self, offset: usize) -> bool {
        self.string_containing(offset).is_some()
    }

    /// Returns every string span within a range.
    #[must_use]
    pub fn strings_in(&self, range: Range<usize>) -> Vec<StringSpan> {
        let first = self.strings.partition_point(|span| span.start < range.start);
        self.strings[first ..]
            .iter()
            .take_while(|span| span.end <= range.end)
            .copied()
            .collect()
    }

    /// Returns the content of a string span.
    #[must_use]
    pub fn span_content(&self, span: &StringSpan) -> &str {
        self.raw.get(span.content.0 .. span.content.1).unwrap_or("")
    }

    /// Returns the trimmed subrange of a range.
    #[must_use]
    pub fn trim(&self, range: Range<usize>) -> Range<usize> {
        let text = self.text(range.clone());
        let leading = text.len() - text.trim_start().len();
        let trailing = text.len() - text.trim_end().len();
        let start = range.start + leading;
        start .. range.end.saturating_sub(trailing).max(start)
    }

    /// Returns the span that exactly covers a (trimmed) range.
    #[must_use]
    pub fn exact_string(&self, range: Range<usize>) -> Option<StringSpan> {
        let range = self.trim(range);
        self.string_containing(range.start)
            .filter(|span| span.start == range.start && span.end == range.end)
            .copied()
    }

    /// Returns the literal content when a range is exactly one plain string.
    #[must_use]
    pub fn literal(&self, range: Range<usize>) -> Option<String> {
        self.exact_string(range)
            .filter(|span| !span.interpolated)
            .map(|span| self.span_content(&span).to_string())
    }

    /// Splits a range at top-level separators, skipping strings and brackets.
    #[must_use]
    pub fn split_top_level(&self, range: Range<usize>, separator: u8) -> Vec<Range<usize>> {
        let bytes = self.code.as_bytes();
        let mut parts = Vec::new();
        let mut start = range.start;
        let mut index = range.start;
        while index < range.end.min(bytes.len()) {
            if let Some(span) = self.string_containing(index)
                && span.start == index
            {
                index = span.end;
                continue;
            }
            if let Some(close) = self.closing(index) {
                index = close + 1;
                continue;
            }
            if bytes[index] == separator {
                parts.push(start .. index);
                start = index + 1;
            }
            index += 1;
        }
        parts.push(start .. range.end);
        parts
            .into_iter()
            .map(|part| self.trim(part))
            .filter(|part| !part.is_empty())
            .collect()
    }

    /// Returns the first top-level occurrence of `separator` within a range.
    #[must_use]
    pub fn find_top_level(&self, range: Range<usize>, separator: u8) -> Option<usize> {
        let bytes = self.code.as_bytes();
        let mut index = range.start;
        while index < range.end.min(bytes.len()) {
            if let Some(span) = self.string_containing(index)
                && span.start == index
            {
                index = span.end;
                continue;
            }
            if let Some(close) = self.closing(index) {
                index = close + 1;
                continue;
            }
            if bytes[index] == separator {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    /// Returns the argument ranges of a call whose `(` is at `open`.
    #[must_use]
    pub fn call_args(&self, open: usize) -> Vec<Range<usize>> {
        self.closing(open).map_or_else(Vec::new, |close| self.split_top_level(open + 1 .. close, b','))
    }

    /// Returns the offset where the statement containing `from` ends.
    #[must_use]
    pub fn statement_end(&self, from: usize) -> usize {
        let bytes = self.code.as_bytes();
        let mut index = from;
        while index < bytes.len() {
            if let Some(span) = self.string_containing(index)
                && span.start == index
            {
                index = span.end;
                continue;
            }
            if let Some(close) = self.closing(index) {
                index = close + 1;
                continue;
            }
            match bytes[index] {
                b';' | b'\n' | b'}' | b')' | b']' => return index,
                _ => index += 1,
            }
        }
        bytes.len()
    }

    /// Returns the offset where the statement containing `offset` starts.
    #[must_use]
    pub fn statement_start(&self, offset: usize) -> usize {
        let bytes = self.code.as_bytes();
        let mut index = offset.min(bytes.len());
        while index > 0 {
            let previous = index - 1;
            if let Some(span) = self.string_containing(previous) {
                index = span.start;
                continue;
            }
            match bytes[previous] {
                b')' | b']' => {
                    if let Some(open) = self.open_of.get(&previous) {
                        index = *open;
                        continue;
                    }
                    return index;
                }
                b';' | b'\n' | b'{' | b'}' | b'(' | b'[' | b',' => return index,
                _ => index = previous,
            }
        }
        0
    }

    /// Returns brace pairs enclosing `offset`, innermost first.
    #[must_use]
    pub fn enclosing_braces(&self, offset: usize) -> Vec<(usize, usize)> {
        let mut found: Vec<(usize, usize)> = self
            .braces
            .iter()
            .take_while(|(open, _)| *open < offset)
            .filter(|(_, close)| offset < *close)
            .copied()
            .collect();
        found.reverse();
        found
    }

    /// Returns the header text preceding an opening brace.
    ///
    /// The header runs back to the previous `;`, brace, or line break,
    /// skipping over bracketed groups so multi-line parameter lists stay
    /// intact.
    #[must_use]
    pub fn block_header(&self, open: usize) -> &str {
        let bytes = self.code.as_bytes();
        let mut index = open;
        while index > 0 {
            let previous = index - 1;
            if let Some(span) = self.string_containing(previous) {
                index = span.start;
                continue;
            }
            match bytes[previous] {
                b')' | b']' => match self.open_of.get(&previous) {
                    Some(start) => index = *start,
                    None => break,
                },
                b';' | b'{' | b'}' | b'\n' => break,
                _ => index = previous,
            }
        }
        self.text(index .. open).trim()
    }

    /// Returns true when a brace-block header introduces a function body.
    #[must_use]
    pub fn is_function_header(&self, header: &str) -> bool {
        let first_word: String =
            header.chars().take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_').collect();
        if self.language == Language::Go {
            return header.starts_with("func") || header.contains("func(");
        }
        if header.ends_with("=>") || header.ends_with("->") || header.contains("function") {
            return true;
        }
        if NON_FUNCTION_HEADERS.contains(&first_word.as_str()) {
            return false;
        }
        let trimmed = header.trim_end();
        trimmed.ends_with(')')
            || (trimmed.contains(')')
                && (trimmed.rsplit(')').next().is_some_and(|tail| {
                    let tail = tail.trim_start();
                    tail.starts_with(':') || tail.starts_with("throws")
                })))
    }

    /// Returns the body range of the innermost function containing `offset`,
    /// or the whole unit when there is none.
    #[must_use]
    pub fn function_scope(&self, offset: usize) -> Range<usize> {
        if self.language == Language::Python {
            return self.python_function_scope(offset);
        }
        for (open, close) in self.enclosing_braces(offset) {
            if self.is_function_header(self.block_header(open)) {
                return open + 1 .. close;
            }
        }
        0 .. self.code.len()
    }

    // ------------------------------------------------------------------------
    // Python indentation blocks
    // ------------------------------------------------------------------------

    /// Returns the indentation width of a 1-based line.
    #[must_use]
    pub fn indent_of(&self, line: u32) -> usize {
        let text = self.code_line(line);
        text.len() - text.trim_start().len()
    }

    /// Returns the indented block following a header whose colon is at `colon`.
    ///
    /// Inline bodies (`if x: return`) yield the rest of the line.
    #[must_use]
    pub fn python_block(&self, header_start: usize, colon: usize) -> Range<usize> {
        let base = self.indent_of(self.line_of(header_start));
        let colon_line = self.line_of(colon);
        let line_end = self.line_range(colon_line).end;
        if !self.text(colon + 1 .. line_end).trim().is_empty() {
            return colon + 1 .. line_end;
        }
        let mut end = line_end;
        for line in colon_line + 1 ..= self.line_count() {
            if self.code_line(line).trim().is_empty() {
                continue;
            }
            if self.indent_of(line) <= base {
                break;
            }
            end = self.line_range(line).end;
        }
        colon + 1 .. end
    }

    /// Returns the offset of the colon ending a Python header starting at `start`.
    #[must_use]
    pub fn python_header_colon(&self, start: usize) -> Option<usize> {
        let bytes = self.code.as_bytes();
        let mut index = start;
        while index < bytes.len() {
            if let Some(span) = self.string_containing(index)
                && span.start == index
            {
                index = span.end;
                continue;
            }
            if let Some(close) = self.closing(index) {
                index = close + 1;
                continue;
            }
            match bytes[index] {
                b':' => return Some(index),
                b'\n' => return None,
                _ => index += 1,
            }
        }
        None
    }

    /// Returns the lines of enclosing Python block headers, innermost first.
    #[must_use]
    pub fn python_enclosing_headers(&self, offset: usize) -> Vec<u32> {
        let line = self.line_of(offset);
        let mut current = self.indent_of(line);
        let mut headers = Vec::new();
        let mut candidate = line;
        while candidate > 1 && current > 0 {
            candidate -= 1;
            let text = self.code_line(candidate);
            if text.trim().is_empty() {
                continue;
            }
            let indent = self.indent_of(candidate);
            if indent < current && text.trim_end().ends_with(':') {
                headers.push(candidate);
                current = indent;
            }
        }
        headers
    }

    /// Returns the body of the innermost enclosing `def`, or the whole unit.
    fn python_function_scope(&self, offset: usize) -> Range<usize> {
        for line in self.python_enclosing_headers(offset) {
            let text = self.code_line(line).trim_start();
            if text.starts_with("def ") || text.starts_with("async def ") {
                let start = self.line_range(line).start;
                if let Some(colon) = self.python_header_colon(start) {
                    return self.python_block(start, colon);
                }
            }
        }
        0 .. self.code.len()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::*;

    fn scan(language: Language, text: &str) -> ScannedUnit {
        scan_text("unit", language, false, text.to_string()).unwrap()
    }

    #[test]
    fn comments_are_blanked_but_strings_survive() {
        let unit = scan(Language::TypeScript, "const a = '//x'; // note\n/* block\n */ let b = 1;");
        assert!(unit.code.contains("'//x'"));
        assert!(!unit.code.contains("note"));
        assert!(!unit.code.contains("block"));
        assert_eq!(unit.code.len(), unit.raw.len());
        assert_eq!(unit.line_of(unit.code.find("let").unwrap()), 3);
    }

    #[test]
    fn unbalanced_brackets_are_rejected() {
        let err = scan_text("bad.ts", Language::TypeScript, false, "function f() {\n  g(;\n}".to_string())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unbalanced { .. }));
    }

    #[test]
    fn template_literals_and_regexes_do_not_confuse_brackets() {
        let unit = scan(
            Language::TypeScript,
            "const u = `${base}/items/${id}`;\nconst ok = /^[a-z(]+$/.test(name);\n",
        );
        let span = unit.string_containing(unit.code.find('`').unwrap()).unwrap();
        assert!(span.interpolated);
    }

    #[test]
    fn python_blocks_follow_indentation() {
        let text = "def f(x):\n    if x:\n        return 1\n    return 2\nprint(f(1))\n";
        let unit = scan(Language::Python, text);
        let scope = unit.function_scope(text.find("return 1").unwrap());
        assert!(unit.text(scope.clone()).contains("return 2"));
        assert!(!unit.text(scope).contains("print"));
        let headers = unit.python_enclosing_headers(text.find("return 1").unwrap());
        assert_eq!(headers, vec![2, 1]);
    }

    #[test]
    fn function_scope_skips_control_flow_blocks() {
        let text = "async function load() {\n  if (ok) {\n    call();\n  }\n}\n";
        let unit = scan(Language::TypeScript, text);
        let scope = unit.function_scope(text.find("call").unwrap());
        assert!(unit.text(scope).contains("if (ok)"));
    }

    #[test]
    fn top_level_split_respects_nesting() {
        let text = "f(a, g(b, c), 'x,y')";
        let unit = scan(Language::TypeScript, text);
        let parts = unit.split_top_level(2 .. text.len() - 1, b',');
        assert_eq!(parts.len(), 3);
        assert_eq!(unit.text(parts[2].clone()), "'x,y'");
    }
}
