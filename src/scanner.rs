//! Lexical scanner for directive calls.
//!
//! The scanner walks the text once, left to right. At every position it tries,
//! in order, a string literal, a comment and a directive call; the first one
//! that matches is yielded and the cursor jumps past it. Directive-looking text
//! inside a string or comment is therefore never seen as a directive.

use crate::error::Result;
use regex::Regex;
use std::ops::Range;

/// The two directive forms understood by the expander
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `__inline("...")`
    Inline,
    /// `__uri("...")`
    Uri,
}

impl DirectiveKind {
    /// The directive name as written in source.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inline => "__inline",
            Self::Uri => "__uri",
        }
    }
}

/// One directive call found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMatch<'a> {
    /// Which directive was called
    pub kind: DirectiveKind,
    /// The argument exactly as written, quotes included
    pub literal: &'a str,
    /// The quote character surrounding the argument
    pub quote: char,
    /// Byte range of the whole call, from the directive name to the closing parenthesis
    pub span: Range<usize>,
}

impl<'a> DirectiveMatch<'a> {
    /// The argument with its surrounding quotes removed. Escapes are kept as written.
    #[must_use]
    pub fn value(&self) -> &'a str {
        &self.literal[1..self.literal.len() - 1]
    }
}

/// A span the scanner consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// A quoted string literal
    String(Range<usize>),
    /// A line or block comment
    Comment(Range<usize>),
    /// A directive call
    Directive(DirectiveMatch<'a>),
}

impl Token<'_> {
    /// Byte range covered by this token.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        match self {
            Self::String(span) | Self::Comment(span) => span.clone(),
            Self::Directive(directive) => directive.span.clone(),
        }
    }
}

/// Compiled scanner, reusable across any number of texts
#[derive(Debug, Clone)]
pub struct Scanner {
    head: Regex,
}

impl Scanner {
    /// Builds a scanner.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Regex` if the directive pattern fails to compile.
    pub fn new() -> Result<Self> {
        let head = Regex::new(r"^(__inline|__uri)\s*\(\s*")?;
        Ok(Self { head })
    }

    /// Lazily scans `text`, yielding strings, comments and directive calls in order.
    #[must_use]
    pub fn tokens<'s, 'a>(&'s self, text: &'a str) -> Tokens<'s, 'a> {
        Tokens {
            scanner: self,
            text,
            pos: 0,
        }
    }

    /// Collects only the directive calls of `text`.
    #[must_use]
    pub fn directives<'a>(&self, text: &'a str) -> Vec<DirectiveMatch<'a>> {
        self.tokens(text)
            .filter_map(|token| match token {
                Token::Directive(directive) => Some(directive),
                _ => None,
            })
            .collect()
    }

    fn directive_at<'a>(&self, text: &'a str, start: usize) -> Option<DirectiveMatch<'a>> {
        let caps = self.head.captures(&text[start..])?;
        let kind = match caps.get(1)?.as_str() {
            "__inline" => DirectiveKind::Inline,
            _ => DirectiveKind::Uri,
        };

        let literal_start = start + caps.get(0)?.end();
        let bytes = text.as_bytes();
        let quote = *bytes.get(literal_start)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let literal_end = string_end(bytes, literal_start)?;

        let rest = &text[literal_end..];
        let trimmed = rest.trim_start();
        if !trimmed.starts_with(')') {
            return None;
        }
        let close = literal_end + (rest.len() - trimmed.len());

        Some(DirectiveMatch {
            kind,
            literal: &text[literal_start..literal_end],
            quote: char::from(quote),
            span: start..close + 1,
        })
    }
}

/// Iterator returned by [`Scanner::tokens`]
#[derive(Debug)]
pub struct Tokens<'s, 'a> {
    scanner: &'s Scanner,
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tokens<'_, 'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();

        // Every byte that can open a token is ASCII, so stepping one byte at a
        // time never lands a slice inside a multi-byte character.
        while self.pos < bytes.len() {
            let start = self.pos;
            let token = match bytes[start] {
                b'"' | b'\'' => string_end(bytes, start).map(|end| Token::String(start..end)),
                b'/' => match bytes.get(start + 1) {
                    Some(b'/') => Some(Token::Comment(start..line_comment_end(bytes, start))),
                    Some(b'*') => Some(Token::Comment(start..block_comment_end(self.text, start))),
                    _ => None,
                },
                b'_' if at_word_boundary(bytes, start) => self
                    .scanner
                    .directive_at(self.text, start)
                    .map(Token::Directive),
                _ => None,
            };

            match token {
                Some(token) => {
                    self.pos = token.span().end;
                    tracing::trace!(span = ?token.span(), "scanned token");
                    return Some(token);
                }
                None => self.pos += 1,
            }
        }

        None
    }
}

fn is_line_terminator(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | 0x0c)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn at_word_boundary(bytes: &[u8], pos: usize) -> bool {
    pos == 0 || !is_word_byte(bytes[pos - 1])
}

/// End (exclusive) of the string literal opened at `start`, or `None` when the
/// literal is not closed before a line terminator or the end of input.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    loop {
        match *bytes.get(i)? {
            b'\\' => {
                if i + 1 >= bytes.len() {
                    return None;
                }
                i += 2;
            }
            b if b == quote => return Some(i + 1),
            b if is_line_terminator(b) => return None,
            _ => i += 1,
        }
    }
}

fn line_comment_end(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .iter()
        .position(|&b| is_line_terminator(b))
        .map_or(bytes.len(), |offset| start + 2 + offset)
}

/// An unclosed block comment runs to the end of input.
fn block_comment_end(text: &str, start: usize) -> usize {
    text[start + 2..]
        .find("*/")
        .map_or(text.len(), |offset| start + 2 + offset + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Token<'_>> {
        let scanner = Scanner::new().unwrap();
        scanner.tokens(text).collect()
    }

    fn spans(text: &str) -> Vec<&str> {
        scan(text).iter().map(|t| &text[t.span()]).collect()
    }

    #[test]
    fn test_plain_text_yields_nothing() {
        assert!(scan("").is_empty());
        assert!(scan("var a = 1 + 2;\nfoo(bar);").is_empty());
    }

    #[test]
    fn test_string_literals() {
        let text = r#"var a = "x", b = 'y';"#;
        assert_eq!(spans(text), vec![r#""x""#, "'y'"]);
        assert!(matches!(scan(text)[0], Token::String(_)));
    }

    #[test]
    fn test_string_escapes() {
        let text = r#"s = "a\"b" + 'c\'d' + "e\\";"#;
        assert_eq!(spans(text), vec![r#""a\"b""#, r"'c\'d'", r#""e\\""#]);
    }

    #[test]
    fn test_escaped_newline_continues_string() {
        let text = "s = \"one\\\ntwo\";";
        assert_eq!(spans(text), vec!["\"one\\\ntwo\""]);
    }

    #[test]
    fn test_unterminated_string_is_plain_text() {
        // The stray quote is skipped and the following string still scans.
        let text = "a = \"open\nb = 'ok';";
        assert_eq!(spans(text), vec!["'ok'"]);
    }

    #[test]
    fn test_line_comment() {
        let text = "a; // note __inline('x.js')\nb;";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0], Token::Comment(_)));
        assert_eq!(&text[tokens[0].span()], "// note __inline('x.js')");
    }

    #[test]
    fn test_block_comment() {
        let text = "a; /* __uri('x.png') */ b;";
        assert_eq!(spans(text), vec!["/* __uri('x.png') */"]);
        assert_eq!(spans("/**/x"), vec!["/**/"]);
    }

    #[test]
    fn test_unclosed_block_comment_runs_to_end() {
        let text = "a; /* never closed __inline('x.js')";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span(), 3..text.len());
    }

    #[test]
    fn test_division_is_not_a_comment() {
        assert!(scan("a = b / c;").is_empty());
    }

    #[test]
    fn test_directive_call() {
        let text = r#"var s = __inline("a.js");"#;
        let tokens = scan(text);
        assert_eq!(tokens.len(), 1);
        let Token::Directive(directive) = &tokens[0] else {
            panic!("expected a directive, got {:?}", tokens[0]);
        };
        assert_eq!(directive.kind, DirectiveKind::Inline);
        assert_eq!(directive.literal, r#""a.js""#);
        assert_eq!(directive.value(), "a.js");
        assert_eq!(directive.quote, '"');
        assert_eq!(&text[directive.span.clone()], r#"__inline("a.js")"#);
    }

    #[test]
    fn test_directive_whitespace() {
        let text = "url = __uri  (  'img/a.png'\n )";
        let scanner = Scanner::new().unwrap();
        let directives = scanner.directives(text);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].kind, DirectiveKind::Uri);
        assert_eq!(directives[0].quote, '\'');
        assert_eq!(directives[0].span.end, text.len());
    }

    #[test]
    fn test_directive_escaped_quote_in_argument() {
        let scanner = Scanner::new().unwrap();
        let directives = scanner.directives(r#"__uri("a\"b.png")"#);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].value(), r#"a\"b.png"#);
    }

    #[test]
    fn test_directive_requires_word_boundary() {
        let scanner = Scanner::new().unwrap();
        assert!(scanner.directives(r#"foo__inline("a.js")"#).is_empty());
        assert!(scanner.directives(r#"$__uri("a.png")"#).len() == 1);
    }

    #[test]
    fn test_malformed_directives_are_ignored() {
        let scanner = Scanner::new().unwrap();
        assert!(scanner.directives("__inline(a.js)").is_empty());
        assert!(scanner.directives(r#"__inline("a.js", 1)"#).is_empty());
        assert!(scanner.directives(r#"__inline("a.js""#).is_empty());
        assert!(scanner.directives(r#"__inlined("a.js")"#).is_empty());
        // The argument of a malformed call is still scanned as a string.
        assert_eq!(spans(r#"__inline("a.js", 1)"#), vec![r#""a.js""#]);
    }

    #[test]
    fn test_directives_inside_strings_and_comments() {
        let scanner = Scanner::new().unwrap();
        let text = r#"
            var a = "__inline('x.js')";
            // __inline("y.js")
            /* __uri("z.png") */
            var b = __uri("real.png");
        "#;
        let directives = scanner.directives(text);
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].value(), "real.png");
    }

    #[test]
    fn test_multibyte_text() {
        let text = "/* ünïcödé */ s = 'café'; __uri('ñ.png')";
        assert_eq!(
            spans(text),
            vec!["/* ünïcödé */", "'café'", "__uri('ñ.png')"]
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DirectiveKind::Inline.name(), "__inline");
        assert_eq!(DirectiveKind::Uri.name(), "__uri");
    }
}
