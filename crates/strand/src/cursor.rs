//! Position-tracking cursor over normalized script text
//!
//! Every part of the engine reads source through a [`Script`]. The cursor
//! knows about string literals and bracket nesting, so callers can extract
//! a balanced group, skip an untaken block, or find the end of a statement
//! without a syntax tree.

use std::sync::Arc;

use crate::error::{Imbalance, Result, ScriptError};
use crate::normalizer::{is_ident_char, normalize, Normalized};

/// Keywords whose statements carry a `(header)` followed by a body.
const HEADED_KEYWORDS: &[&str] = &["if", "elif", "while", "for", "switch", "lock"];

/// Keywords whose statements end at the close of their first `{ }` block.
const DECLARATION_KEYWORDS: &[&str] = &["function", "cfunction", "class", "namespace", "enum"];

/// A cursor over canonical script text.
///
/// Clones are cheap: the text, line map and file name are shared.
#[derive(Debug, Clone)]
pub struct Script {
    chars: Arc<[char]>,
    lines: Arc<[usize]>,
    filename: Arc<str>,
    pos: usize,
    base_line: usize,
}

impl Script {
    /// Create a cursor over already-normalized text.
    pub fn new(normalized: Normalized, filename: &str) -> Self {
        Self {
            chars: normalized.text.chars().collect(),
            lines: normalized.lines.into(),
            filename: filename.into(),
            pos: 0,
            base_line: 1,
        }
    }

    /// Normalize `source` and open a cursor at its start.
    pub fn from_source(source: &str, filename: &str) -> Result<Self> {
        Ok(Self::new(normalize(source, filename)?, filename))
    }

    /// Derive a cursor over `text` that shares this cursor's file context.
    ///
    /// `text` must already be canonical (it is normally a slice produced by
    /// [`Script::read_balanced`] or [`Script::read_until`]). Diagnostics from
    /// the child report the parent's current line.
    pub fn child(&self, text: &str) -> Script {
        Script {
            chars: text.chars().collect(),
            lines: Arc::from(Vec::new()),
            filename: self.filename.clone(),
            pos: 0,
            base_line: self.current_line(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Position
    // ═══════════════════════════════════════════════════════════════════

    /// Name of the file this text came from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Current char offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset (clamped to the end).
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.chars.len());
    }

    /// Total length in chars.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Check if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Check if the cursor is past the last char.
    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Source line of the current position.
    pub fn current_line(&self) -> usize {
        if self.lines.is_empty() {
            return self.base_line;
        }
        let idx = self.pos.min(self.lines.len() - 1);
        self.lines[idx]
    }

    // ═══════════════════════════════════════════════════════════════════
    // Character Navigation
    // ═══════════════════════════════════════════════════════════════════

    /// The char under the cursor.
    pub fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// The char `offset` positions ahead.
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Move forward one char.
    pub fn advance(&mut self) {
        self.advance_by(1);
    }

    /// Move forward `n` chars.
    pub fn advance_by(&mut self, n: usize) {
        self.set_pos(self.pos + n);
    }

    /// Skip the separator spaces the normalizer preserved.
    pub fn skip_spaces(&mut self) {
        while self.current() == Some(' ') {
            self.pos += 1;
        }
    }

    /// Check if the text at the cursor starts with `s`.
    pub fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Consume `s` if the text at the cursor starts with it.
    pub fn consume(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.advance_by(s.chars().count());
            true
        } else {
            false
        }
    }

    /// Consume `c` or fail with a syntax error.
    pub fn expect(&mut self, c: char) -> Result<()> {
        self.skip_spaces();
        if self.current() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error(format!(
                "expected '{}', found {}",
                c,
                self.describe_current()
            )))
        }
    }

    /// Text between two offsets.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Everything from the cursor to the end.
    pub fn rest(&self) -> String {
        self.slice(self.pos, self.chars.len())
    }

    /// Read an identifier-like token (letters, digits, `_`).
    pub fn read_token(&mut self) -> String {
        self.skip_spaces();
        let start = self.pos;
        while self.current().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&self) -> String {
        let mut probe = self.clone();
        probe.read_token()
    }

    /// Build a syntax error at the current line.
    pub fn syntax_error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(message, self.current_line())
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(c) => format!("'{}'", c),
            None => "end of script".to_string(),
        }
    }

    fn imbalance(&self) -> ScriptError {
        ScriptError::SyntaxImbalance {
            what: Imbalance::Brackets,
            file: self.filename.to_string(),
            line: self.current_line(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Balanced Scanning
    // ═══════════════════════════════════════════════════════════════════

    /// Walk from `from`, skipping string literals and tracking bracket depth,
    /// until `stop(i, c, depth)` holds. The depth passed is the nesting level
    /// *before* `c` is applied.
    fn scan(&self, from: usize, mut stop: impl FnMut(usize, char, i32) -> bool) -> Option<usize> {
        let mut depth = 0;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &c) in self.chars.iter().enumerate().skip(from) {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            if stop(i, c, depth) {
                return Some(i);
            }
            match c {
                '"' => in_string = true,
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
        }
        None
    }

    /// Offset of the first char from `delimiters` outside string literals.
    pub fn find_first_of(&self, delimiters: &[char]) -> Option<usize> {
        self.scan(self.pos, |_, c, _| delimiters.contains(&c))
    }

    /// Read the contents of the group opened by `open` under the cursor.
    ///
    /// The cursor ends just past the matching `close`. The returned text
    /// excludes both delimiters.
    pub fn read_balanced(&mut self, open: char, close: char) -> Result<String> {
        self.skip_spaces();
        if self.current() != Some(open) {
            return Err(self.syntax_error(format!(
                "expected '{}', found {}",
                open,
                self.describe_current()
            )));
        }
        let start = self.pos + 1;
        let end = self
            .scan(start, |_, c, depth| depth == 0 && c == close)
            .ok_or_else(|| self.imbalance())?;
        self.pos = end + 1;
        Ok(self.slice(start, end))
    }

    /// Read up to (not including) the first of `stops` at nesting depth 0.
    ///
    /// A closing bracket at depth 0 also ends the read, so an argument
    /// scan never runs past the end of its call.
    pub fn read_until(&mut self, stops: &[char]) -> String {
        let start = self.pos;
        let end = self
            .scan(start, |_, c, depth| {
                depth == 0 && (stops.contains(&c) || matches!(c, ')' | ']' | '}'))
            })
            .unwrap_or(self.chars.len());
        self.pos = end;
        self.slice(start, end)
    }

    /// Advance past an operand that is not evaluated, stopping in front of
    /// any of `operators` at depth 0 or at the end of the enclosing
    /// expression.
    pub fn skip_operand(&mut self, operators: &[&str]) {
        let chars = Arc::clone(&self.chars);
        let at = |i: usize, op: &str| {
            op.chars()
                .enumerate()
                .all(|(k, c)| chars.get(i + k) == Some(&c))
        };
        let end = self
            .scan(self.pos, |i, c, depth| {
                depth == 0
                    && (matches!(c, ';' | ',' | ':' | ')' | ']' | '}')
                        || operators.iter().any(|op| at(i, op)))
            })
            .unwrap_or(self.chars.len());
        self.pos = end;
    }

    /// Advance past the `{ ... }` block under the cursor without running it.
    pub fn skip_block(&mut self) -> Result<()> {
        self.read_balanced('{', '}').map(|_| ())
    }

    /// From inside a block, advance past the `}` that closes it.
    ///
    /// In a child cursor whose text is a block body, this moves to the end.
    pub fn skip_to_block_end(&mut self) {
        match self.scan(self.pos, |_, c, depth| depth == 0 && c == '}') {
            Some(end) => self.pos = end + 1,
            None => self.pos = self.chars.len(),
        }
    }

    /// Advance past the next `;` of the current statement, stopping in
    /// front of a block-closing `}`.
    pub fn goto_next_statement(&mut self) {
        match self.scan(self.pos, |_, c, depth| depth == 0 && (c == ';' || c == '}')) {
            Some(end) if self.chars[end] == ';' => self.pos = end + 1,
            Some(end) => self.pos = end,
            None => self.pos = self.chars.len(),
        }
    }

    /// Skip one complete statement, including any block bodies and
    /// trailing `elif`/`else`/`catch`/`while` clauses it owns.
    pub fn skip_statement(&mut self) -> Result<()> {
        self.skip_spaces();
        match self.current() {
            None => return Ok(()),
            Some('{') => return self.skip_block(),
            Some(';') => {
                self.advance();
                return Ok(());
            }
            _ => {}
        }

        let start = self.pos;
        let token = self.read_token();
        match token.as_str() {
            t if HEADED_KEYWORDS.contains(&t) => {
                self.skip_spaces();
                if self.current() == Some('(') {
                    self.read_balanced('(', ')')?;
                }
                self.skip_statement()?;
                if t == "if" || t == "elif" {
                    self.skip_else_chain()?;
                }
                Ok(())
            }
            "else" => self.skip_statement(),
            "try" => {
                self.skip_statement()?;
                if self.peek_token() == "catch" {
                    self.read_token();
                    self.read_balanced('(', ')')?;
                    self.skip_statement()?;
                }
                Ok(())
            }
            "do" => {
                self.skip_statement()?;
                if self.peek_token() == "while" {
                    self.read_token();
                    self.read_balanced('(', ')')?;
                }
                self.skip_spaces();
                self.consume(";");
                Ok(())
            }
            t if DECLARATION_KEYWORDS.contains(&t) => {
                let open = self.find_first_of(&['{']).ok_or_else(|| self.imbalance())?;
                self.pos = open;
                self.skip_block()
            }
            _ => {
                self.pos = start;
                self.goto_next_statement();
                Ok(())
            }
        }
    }

    /// Skip any `elif (...) body`, `else if (...) body` or `else body`
    /// clauses following an `if` statement.
    pub fn skip_else_chain(&mut self) -> Result<()> {
        loop {
            match self.peek_token().as_str() {
                "elif" => {
                    self.read_token();
                    self.read_balanced('(', ')')?;
                    self.skip_statement()?;
                }
                "else" => {
                    self.read_token();
                    if self.peek_token() == "if" {
                        self.read_token();
                        self.read_balanced('(', ')')?;
                        self.skip_statement()?;
                    } else {
                        self.skip_statement()?;
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}

/// Split canonical `text` on `separator` at nesting depth 0.
///
/// Empty input yields no parts; surrounding spaces are trimmed.
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let normalized = Normalized {
        text: text.to_string(),
        lines: Vec::new(),
    };
    let mut script = Script::new(normalized, "");
    let mut parts = Vec::new();
    loop {
        let part = script.read_until(&[separator]);
        parts.push(part.trim().to_string());
        if script.current() == Some(separator) {
            script.advance();
        } else {
            break;
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(src: &str) -> Script {
        Script::from_source(src, "test.strand").unwrap()
    }

    #[test]
    fn test_navigation() {
        let mut s = script("ab;");
        assert_eq!(s.current(), Some('a'));
        assert_eq!(s.peek(1), Some('b'));
        s.advance();
        assert_eq!(s.current(), Some('b'));
        s.advance_by(10);
        assert!(s.at_end());
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_read_token() {
        let mut s = script("return x;");
        assert_eq!(s.read_token(), "return");
        assert_eq!(s.read_token(), "x");
        assert_eq!(s.current(), Some(';'));
    }

    #[test]
    fn test_read_balanced_is_nesting_and_quote_aware() {
        let mut s = script("f(a, (b), \")\") + 1;");
        s.read_token();
        let inner = s.read_balanced('(', ')').unwrap();
        assert_eq!(inner, "a,(b),\")\"");
        assert_eq!(s.current(), Some('+'));
    }

    #[test]
    fn test_read_balanced_requires_opener() {
        let mut s = script("x;");
        assert!(s.read_balanced('(', ')').is_err());
    }

    #[test]
    fn test_read_until_stops_at_depth_zero() {
        let mut s = script("g(1, 2), h;");
        assert_eq!(s.read_until(&[',']), "g(1,2)");
        assert_eq!(s.current(), Some(','));
    }

    #[test]
    fn test_read_until_stops_at_enclosing_closer() {
        let mut s = script("(a + b)");
        s.advance();
        assert_eq!(s.read_until(&[',']), "a+b");
        assert_eq!(s.current(), Some(')'));
    }

    #[test]
    fn test_skip_operand() {
        let mut s = script("f(a||b)&&c||d;");
        s.skip_operand(&["&&", "||"]);
        assert_eq!(s.rest(), "&&c||d;");
        s.advance_by(2);
        s.skip_operand(&["||"]);
        assert_eq!(s.rest(), "||d;");
    }

    #[test]
    fn test_skip_block() {
        let mut s = script("{ x = \"}\"; { y = 2; } } z;");
        s.skip_block().unwrap();
        assert_eq!(s.rest(), "z;");
    }

    #[test]
    fn test_skip_to_block_end() {
        let mut s = script("{ a; b; { c; } d; } e;");
        s.advance();
        s.goto_next_statement();
        s.skip_to_block_end();
        assert_eq!(s.rest(), "e;");
    }

    #[test]
    fn test_goto_next_statement_stops_before_brace() {
        let mut s = script("{a=1}");
        s.advance();
        s.goto_next_statement();
        assert_eq!(s.current(), Some('}'));
    }

    #[test]
    fn test_skip_statement_if_else_chain() {
        let mut s = script("if (a) { x; } elif (b) y; else { z; } after;");
        s.skip_statement().unwrap();
        assert_eq!(s.rest(), "after;");
    }

    #[test]
    fn test_skip_statement_try_catch() {
        let mut s = script("try { a; } catch (e) { b; } after;");
        s.skip_statement().unwrap();
        assert_eq!(s.rest(), "after;");
    }

    #[test]
    fn test_skip_statement_function() {
        let mut s = script("function f(a) { return a; } after;");
        s.skip_statement().unwrap();
        assert_eq!(s.rest(), "after;");
    }

    #[test]
    fn test_find_first_of_ignores_strings() {
        let s = script("\";\" ; x");
        assert_eq!(s.find_first_of(&[';']), Some(3));
    }

    #[test]
    fn test_child_shares_file_and_line() {
        let mut s = script("a;\nb;\nf(1);");
        s.set_pos(4);
        let child = s.child("1+2");
        assert_eq!(child.filename(), "test.strand");
        assert_eq!(child.current_line(), 3);
        assert_eq!(child.rest(), "1+2");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("i=0;i<f(1,2);i++", ';'),
            vec!["i=0", "i<f(1,2)", "i++"]
        );
        assert_eq!(split_top_level("a, b=[1,2]", ','), vec!["a", "b=[1,2]"]);
        assert!(split_top_level("", ',').is_empty());
    }
}
