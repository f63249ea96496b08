//! Hand-written lexer.
//!
//! `/` is context-sensitive in JS: division where an operand just ended, a
//! regex literal where an operand is expected. Only the parser knows which,
//! so the lexer emits `Slash`/`SlashAssign` and exposes
//! [`Lexer::relex_regex`] for the parser to re-scan from the slash when it
//! sits in operand position.

use std::rc::Rc;

use num_bigint::BigInt;
use unveil_ast::StringInterner;

use crate::error::ParseError;
use crate::token::{Keyword, Punct, Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    interner: &'a StringInterner,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, interner: &'a StringInterner) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
            interner,
        }
    }

    fn column_at(&self, offset: usize) -> u32 {
        (offset - self.line_start) as u32 + 1
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column_at(self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(byte)
    }

    /// Skip whitespace and comments, reporting whether a line terminator
    /// was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | 0x0b | 0x0c) => {
                    self.pos += 1;
                }
                Some(b'\n') => {
                    newline = true;
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    let mut closed = false;
                    while let Some(byte) = self.bump() {
                        if byte == b'\n' {
                            newline = true;
                        }
                        if byte == b'*' && self.peek() == Some(b'/') {
                            self.pos += 1;
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(self.error_here("unterminated block comment"));
                    }
                }
                // Non-ASCII whitespace is rare enough to ignore here; real
                // identifiers pick it up below and fail loudly.
                _ => return Ok(newline),
            }
        }
    }

    /// Lex the next token.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let line = self.line;
        let column = self.column_at(start);
        let token = |kind| Token {
            kind,
            start,
            line,
            column,
            newline_before,
        };

        let Some(byte) = self.peek() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match byte {
            b'0'..=b'9' => self.lex_number()?,
            b'"' | b'\'' => self.lex_string(byte)?,
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.lex_number()?,
            b if b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80 => {
                self.lex_identifier()?
            }
            _ => self.lex_punct()?,
        };
        Ok(token(kind))
    }

    /// Re-lex a regex literal starting at the byte offset of a previously
    /// returned `/` token. The parser calls this when the slash sits where
    /// an operand must begin.
    pub fn relex_regex(&mut self, start: usize) -> Result<Token, ParseError> {
        self.pos = start;
        let line = self.line;
        let column = self.column_at(start);
        debug_assert_eq!(self.peek(), Some(b'/'));
        self.pos += 1;

        let body_start = self.pos;
        let mut in_class = false;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error_here("unterminated regex literal"));
            };
            match byte {
                b'\n' => return Err(self.error_here("unterminated regex literal")),
                b'\\' => {
                    self.pos += 1;
                    if self.peek().is_none() {
                        return Err(self.error_here("unterminated regex literal"));
                    }
                    self.pos += 1;
                }
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => break,
                _ => {
                    self.pos += 1;
                }
            }
        }
        let pattern: Rc<str> = self.source[body_start..self.pos].into();
        self.pos += 1;

        let flags_start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let flags: Rc<str> = self.source[flags_start..self.pos].into();
        Ok(Token {
            kind: TokenKind::Regex { pattern, flags },
            start,
            line,
            column,
            newline_before: false,
        })
    }

    fn lex_identifier(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80 {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        if let Some(keyword) = Keyword::from_str(text) {
            return Ok(TokenKind::Keyword(keyword));
        }
        Ok(TokenKind::Identifier(self.interner.intern(text)))
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'0') {
            match self.peek_at(1) {
                Some(b'x' | b'X') => return self.lex_radix(16),
                Some(b'o' | b'O') => return self.lex_radix(8),
                Some(b'b' | b'B') => return self.lex_radix(2),
                _ => {}
            }
        }
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' => {
                    self.pos += 1;
                }
                b'.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.pos += 1;
                }
                b'e' | b'E' if !seen_exp => {
                    seen_exp = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                b'n' if !seen_dot && !seen_exp => {
                    let digits = &self.source[start..self.pos];
                    self.pos += 1;
                    let value = BigInt::parse_bytes(digits.as_bytes(), 10)
                        .ok_or_else(|| self.error_here("malformed bigint literal"))?;
                    return Ok(TokenKind::BigInt(Box::new(value)));
                }
                _ => break,
            }
        }
        let text = &self.source[start..self.pos];
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error_here("malformed number literal"))?;
        Ok(TokenKind::Number(value))
    }

    fn lex_radix(&mut self, radix: u32) -> Result<TokenKind, ParseError> {
        self.pos += 2;
        let digits_start = self.pos;
        while let Some(byte) = self.peek() {
            if (byte as char).is_digit(radix) || byte == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let digits: String = self.source[digits_start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if digits.is_empty() {
            return Err(self.error_here("missing digits in number literal"));
        }
        if self.peek() == Some(b'n') {
            self.pos += 1;
            let value = BigInt::parse_bytes(digits.as_bytes(), radix)
                .ok_or_else(|| self.error_here("malformed bigint literal"))?;
            return Ok(TokenKind::BigInt(Box::new(value)));
        }
        let mut value = 0.0f64;
        for c in digits.chars() {
            let digit = c
                .to_digit(radix)
                .ok_or_else(|| self.error_here("malformed number literal"))?;
            value = value * f64::from(radix) + f64::from(digit);
        }
        Ok(TokenKind::Number(value))
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, ParseError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.error_here("unterminated string literal"));
            };
            match byte {
                b if b == quote => {
                    self.pos += 1;
                    break;
                }
                b'\n' => return Err(self.error_here("unterminated string literal")),
                b'\\' => {
                    self.pos += 1;
                    self.lex_escape(&mut value)?;
                }
                _ => {
                    let ch_start = self.pos;
                    let ch = self.source[ch_start..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.error_here("invalid utf-8 in string"))?;
                    self.pos += ch.len_utf8();
                    value.push(ch);
                }
            }
        }
        Ok(TokenKind::String(value.into()))
    }

    fn lex_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let Some(byte) = self.peek() else {
            return Err(self.error_here("unterminated escape sequence"));
        };
        match byte {
            b'n' => {
                out.push('\n');
                self.pos += 1;
            }
            b't' => {
                out.push('\t');
                self.pos += 1;
            }
            b'r' => {
                out.push('\r');
                self.pos += 1;
            }
            b'b' => {
                out.push('\u{8}');
                self.pos += 1;
            }
            b'f' => {
                out.push('\u{c}');
                self.pos += 1;
            }
            b'v' => {
                out.push('\u{b}');
                self.pos += 1;
            }
            b'0' if !matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                out.push('\0');
                self.pos += 1;
            }
            b'x' => {
                self.pos += 1;
                let code = self.lex_hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            b'u' => {
                self.pos += 1;
                if self.peek() == Some(b'{') {
                    self.pos += 1;
                    let mut code = 0u32;
                    let mut digits = 0;
                    while let Some(byte) = self.peek() {
                        if byte == b'}' {
                            break;
                        }
                        let digit = (byte as char)
                            .to_digit(16)
                            .ok_or_else(|| self.error_here("invalid unicode escape"))?;
                        code = code.saturating_mul(16).saturating_add(digit);
                        digits += 1;
                        self.pos += 1;
                    }
                    if digits == 0 || self.peek() != Some(b'}') {
                        return Err(self.error_here("invalid unicode escape"));
                    }
                    self.pos += 1;
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                } else {
                    let code = self.lex_hex_digits(4)?;
                    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                }
            }
            b'\n' => {
                // Line continuation contributes nothing.
                self.bump();
            }
            b'\r' => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.bump();
                }
            }
            _ => {
                let ch_start = self.pos;
                let ch = self.source[ch_start..]
                    .chars()
                    .next()
                    .ok_or_else(|| self.error_here("invalid utf-8 in string"))?;
                self.pos += ch.len_utf8();
                out.push(ch);
            }
        }
        Ok(())
    }

    fn lex_hex_digits(&mut self, count: usize) -> Result<u32, ParseError> {
        let mut code = 0u32;
        for _ in 0..count {
            let Some(byte) = self.peek() else {
                return Err(self.error_here("invalid hex escape"));
            };
            let digit = (byte as char)
                .to_digit(16)
                .ok_or_else(|| self.error_here("invalid hex escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(code)
    }

    fn lex_punct(&mut self) -> Result<TokenKind, ParseError> {
        use Punct::*;
        let rest = &self.bytes[self.pos..];
        let table: &[(&[u8], Punct)] = &[
            (b">>>=", UShrAssign),
            (b"...", Ellipsis),
            (b"===", EqEqEq),
            (b"!==", NotEqEq),
            (b"**=", StarStarAssign),
            (b"<<=", ShlAssign),
            (b">>=", ShrAssign),
            (b">>>", UShr),
            (b"==", EqEq),
            (b"!=", NotEq),
            (b"<=", LtEq),
            (b">=", GtEq),
            (b"&&", AmpAmp),
            (b"||", PipePipe),
            (b"??", QuestionQuestion),
            (b"?.", QuestionDot),
            (b"++", PlusPlus),
            (b"--", MinusMinus),
            (b"+=", PlusAssign),
            (b"-=", MinusAssign),
            (b"*=", StarAssign),
            (b"/=", SlashAssign),
            (b"%=", PercentAssign),
            (b"&=", AmpAssign),
            (b"|=", PipeAssign),
            (b"^=", CaretAssign),
            (b"**", StarStar),
            (b"<<", Shl),
            (b">>", Shr),
            (b"|>", PipeGt),
            (b"=>", Arrow),
            (b"(", LParen),
            (b")", RParen),
            (b"{", LBrace),
            (b"}", RBrace),
            (b"[", LBracket),
            (b"]", RBracket),
            (b";", Semicolon),
            (b",", Comma),
            (b".", Dot),
            (b":", Colon),
            (b"?", Question),
            (b"+", Plus),
            (b"-", Minus),
            (b"*", Star),
            (b"/", Slash),
            (b"%", Percent),
            (b"=", Assign),
            (b"<", Lt),
            (b">", Gt),
            (b"&", Amp),
            (b"|", Pipe),
            (b"^", Caret),
            (b"~", Tilde),
            (b"!", Bang),
        ];
        for (text, punct) in table {
            if rest.starts_with(text) {
                self.pos += text.len();
                return Ok(TokenKind::Punct(*punct));
            }
        }
        Err(self.error_here(format!(
            "unexpected character '{}'",
            self.source[self.pos..].chars().next().unwrap_or('\u{fffd}')
        )))
    }
}

/// Slash assignment also needs a punct entry; exposed for the parser's
/// regex-position check.
pub fn is_slash_like(punct: Punct) -> bool {
    matches!(punct, Punct::Slash | Punct::SlashAssign)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<TokenKind> {
        let interner = StringInterner::new();
        let mut lexer = Lexer::new(source, &interner);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn numbers() {
        let tokens = lex_all("0 1.5 .5 1e3 0x1F 0b101 0o17 12n");
        assert_eq!(tokens[0], TokenKind::Number(0.0));
        assert_eq!(tokens[1], TokenKind::Number(1.5));
        assert_eq!(tokens[2], TokenKind::Number(0.5));
        assert_eq!(tokens[3], TokenKind::Number(1000.0));
        assert_eq!(tokens[4], TokenKind::Number(31.0));
        assert_eq!(tokens[5], TokenKind::Number(5.0));
        assert_eq!(tokens[6], TokenKind::Number(15.0));
        assert_eq!(tokens[7], TokenKind::BigInt(Box::new(BigInt::from(12))));
    }

    #[test]
    fn strings_and_escapes() {
        let tokens = lex_all(r#"'a\x41B\u{43}\n' "q\"q""#);
        assert_eq!(tokens[0], TokenKind::String("aABC\n".into()));
        assert_eq!(tokens[1], TokenKind::String("q\"q".into()));
    }

    #[test]
    fn comments_and_newline_flags() {
        let interner = StringInterner::new();
        let mut lexer = Lexer::new("a // c\nb /* x\ny */ c", &interner);
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        let c = lexer.next_token().unwrap();
        assert!(!a.newline_before);
        assert!(b.newline_before);
        assert!(c.newline_before);
    }

    #[test]
    fn punctuators_longest_match() {
        let tokens = lex_all(">>> >>>= ** ?. ?? |>");
        assert_eq!(tokens[0], TokenKind::Punct(Punct::UShr));
        assert_eq!(tokens[1], TokenKind::Punct(Punct::UShrAssign));
        assert_eq!(tokens[2], TokenKind::Punct(Punct::StarStar));
        assert_eq!(tokens[3], TokenKind::Punct(Punct::QuestionDot));
        assert_eq!(tokens[4], TokenKind::Punct(Punct::QuestionQuestion));
        assert_eq!(tokens[5], TokenKind::Punct(Punct::PipeGt));
    }

    #[test]
    fn regex_relex() {
        let interner = StringInterner::new();
        let mut lexer = Lexer::new("/a[/]b/gi", &interner);
        let slash = lexer.next_token().unwrap();
        assert_eq!(slash.kind, TokenKind::Punct(Punct::Slash));
        let regex = lexer.relex_regex(slash.start).unwrap();
        match regex.kind {
            TokenKind::Regex { pattern, flags } => {
                assert_eq!(&*pattern, "a[/]b");
                assert_eq!(&*flags, "gi");
            }
            other => panic!("expected regex, got {other:?}"),
        }
    }

    #[test]
    fn keywords_vs_identifiers() {
        let tokens = lex_all("var varx _0x1 $$");
        assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Var));
        assert!(matches!(tokens[1], TokenKind::Identifier(_)));
        assert!(matches!(tokens[2], TokenKind::Identifier(_)));
        assert!(matches!(tokens[3], TokenKind::Identifier(_)));
    }
}
