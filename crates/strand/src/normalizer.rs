//! Lexical normalization of raw script source
//!
//! One pass over the source that:
//!
//! - removes `//` and `/* */` comments
//! - rewrites both quote styles to `"`, escaping embedded double quotes
//! - collapses whitespace, keeping one space only where two tokens would
//!   otherwise fuse or where a keyword needs a separator
//! - checks bracket and quote balance
//!
//! ```text
//! Source → [normalize] → canonical text + char→line map → Script cursor
//! ```
//!
//! Newlines carry no meaning after this point; statements are delimited by
//! `;`, `{` and `}`.

use crate::error::{Imbalance, Result, ScriptError};

/// Keywords that keep a following space so their operand stays separate.
const SPACED_KEYWORDS: &[&str] = &[
    "return", "throw", "case", "new", "function", "cfunction", "class", "namespace", "var",
    "enum", "else", "in", "of", "include",
];

/// Canonical script text plus the source line of every character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The canonical statement stream
    pub text: String,

    /// `lines[i]` is the 1-based source line of the `i`-th char of `text`
    pub lines: Vec<usize>,
}

impl Normalized {
    fn push(&mut self, c: char, line: usize) {
        self.text.push(c);
        self.lines.push(line);
    }
}

/// Check if a character can be part of an identifier or number.
pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Normalize `source`, naming `filename` in any imbalance error.
///
/// # Errors
///
/// Returns `SyntaxImbalance` for an unterminated string, an unmatched
/// closing bracket, or an opening bracket that is never closed.
pub fn normalize(source: &str, filename: &str) -> Result<Normalized> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Normalized {
        text: String::with_capacity(source.len()),
        lines: Vec::with_capacity(source.len()),
    };
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut pending_space = false;
    let mut i = 0;

    let imbalance = |what: Imbalance, line: usize| ScriptError::SyntaxImbalance {
        what,
        file: filename.to_string(),
        line,
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            line += 1;
            pending_space = true;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }
        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            pending_space = true;
            continue;
        }
        if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            i += 2;
            pending_space = true;
            continue;
        }

        if pending_space && needs_space(&out.text, c) {
            out.push(' ', line);
        }
        pending_space = false;

        if c == '"' || c == '\'' {
            i = copy_string(&chars, i, &mut line, &mut out)
                .ok_or_else(|| imbalance(Imbalance::Quotes, line))?;
            continue;
        }

        match c {
            '(' | '[' | '{' => open.push((c, line)),
            ')' | ']' | '}' => match open.pop() {
                Some((opener, _)) if closer_of(opener) == c => {}
                _ => return Err(imbalance(Imbalance::Brackets, line)),
            },
            _ => {}
        }

        out.push(c, line);
        i += 1;
    }

    if let Some((_, opened_at)) = open.last() {
        return Err(imbalance(Imbalance::Brackets, *opened_at));
    }

    Ok(out)
}

/// The closing partner of an opening bracket.
pub fn closer_of(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        other => other,
    }
}

/// Copy a quoted literal starting at `start`, rewriting it to use `"`.
///
/// Returns the index just past the closing quote, or `None` when the
/// literal is unterminated (`line` then points at the opening line).
fn copy_string(chars: &[char], start: usize, line: &mut usize, out: &mut Normalized) -> Option<usize> {
    let quote = chars[start];
    let opened_at = *line;
    let mut current = *line;
    out.push('"', current);

    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            let escaped = *chars.get(i + 1)?;
            if escaped == '\'' && quote == '\'' {
                out.push('\'', current);
            } else {
                out.push('\\', current);
                out.push(escaped, current);
            }
            if escaped == '\n' {
                current += 1;
            }
            i += 2;
            continue;
        }
        if c == quote {
            out.push('"', current);
            *line = current;
            return Some(i + 1);
        }
        if c == '"' {
            out.push('\\', current);
        }
        if c == '\n' {
            current += 1;
        }
        out.push(c, current);
        i += 1;
    }

    *line = opened_at;
    None
}

/// Decide whether collapsed whitespace before `next` must survive as one space.
fn needs_space(emitted: &str, next: char) -> bool {
    let Some(prev) = emitted.chars().next_back() else {
        return false;
    };

    if is_ident_char(prev) && is_ident_char(next) {
        return true;
    }
    // `a - -b` must not become `a--b`
    if matches!(prev, '+' | '-') && matches!(next, '+' | '-') {
        return true;
    }
    if next == ';' || !is_ident_char(prev) {
        return false;
    }

    let word: String = emitted
        .chars()
        .rev()
        .take_while(|c| is_ident_char(*c))
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let before_word = emitted[..emitted.len() - word.len()].chars().next_back();
    let standalone = before_word.map_or(true, |c| !is_ident_char(c) && c != '.');

    standalone && SPACED_KEYWORDS.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(src: &str) -> String {
        normalize(src, "test.strand").unwrap().text
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(text("x   =  1 ;\n\n y = x + 2;"), "x=1;y=x+2;");
    }

    #[test]
    fn test_keeps_separator_between_words() {
        assert_eq!(text("function   f ( a ) { return a ; }"), "function f(a){return a;}");
        assert_eq!(text("x = new  Point(1, 2);"), "x=new Point(1,2);");
    }

    #[test]
    fn test_keyword_keeps_space_before_operand() {
        assert_eq!(text("return -1;"), "return -1;");
        assert_eq!(text("throw \"bad\";"), "throw \"bad\";");
        assert_eq!(text("return ;"), "return;");
    }

    #[test]
    fn test_does_not_fuse_signs() {
        assert_eq!(text("a = b - -c;"), "a=b- -c;");
    }

    #[test]
    fn test_strips_comments() {
        let src = "x = 1; // trailing\n/* block\n comment */ y = 2;";
        assert_eq!(text(src), "x=1;y=2;");
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        assert_eq!(text("s = \"a // b /* c */\";"), "s=\"a // b /* c */\";");
    }

    #[test]
    fn test_unifies_quotes() {
        assert_eq!(text("s = 'it\\'s';"), "s=\"it's\";");
        assert_eq!(text("s = 'say \"hi\"';"), "s=\"say \\\"hi\\\"\";");
        assert_eq!(text("s = \"a\\\"b\";"), "s=\"a\\\"b\";");
    }

    #[test]
    fn test_line_map() {
        let n = normalize("a = 1;\nb = 2;\n\nc = 3;", "t").unwrap();
        assert_eq!(n.text, "a=1;b=2;c=3;");
        assert_eq!(n.lines.len(), n.text.chars().count());
        assert_eq!(n.lines[0], 1);
        assert_eq!(n.lines[4], 2);
        assert_eq!(n.lines[8], 4);
    }

    #[test]
    fn test_unclosed_bracket_reports_opening_line() {
        let err = normalize("x = 1;\nif (x {\n}\n", "main.strand").unwrap_err();
        match err {
            ScriptError::SyntaxImbalance { what, file, line } => {
                assert_eq!(what, Imbalance::Brackets);
                assert_eq!(file, "main.strand");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stray_closer() {
        let err = normalize("x = 1;\n}\n", "t").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SyntaxImbalance {
                what: Imbalance::Brackets,
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_unterminated_string() {
        let err = normalize("a = 1;\ns = \"open;\n", "t").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::SyntaxImbalance {
                what: Imbalance::Quotes,
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        assert_eq!(text("s = \"(]\";"), "s=\"(]\";");
    }
}
