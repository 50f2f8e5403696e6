//! CEL tokenizer built on logos.
//!
//! Integer tokens keep their source digits so the builder can fold a
//! leading minus into the literal before range checking; everything else
//! is decoded here.

use std::str::CharIndices;

use logos::Logos;

use crate::error::LexError;

/// Byte range into the source text.
pub type Span = std::ops::Range<usize>;

pub type SpannedToken = (Token, Span);

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\x0C]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Decimal or `0x` hex digits, without sign.
    #[regex(r"[0-9]+", |lex| lex.slice().to_owned(), priority = 2)]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice().to_owned(), priority = 3)]
    Int(String),

    /// Digits of an unsigned literal with the `u` suffix removed.
    #[regex(r"[0-9]+[uU]", strip_suffix, priority = 4)]
    #[regex(r"0[xX][0-9a-fA-F]+[uU]", strip_suffix, priority = 5)]
    UInt(String),

    #[regex(r"[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?", lex_double, priority = 5)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_double, priority = 3)]
    Double(f64),

    #[regex(r#"[rR]?("|'|"""|''')"#, lex_string)]
    String(String),

    #[regex(r#"([bB][rR]?|[rR][bB])("|'|"""|''')"#, lex_bytes)]
    Bytes(Vec<u8>),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,

    /// Words the language sets aside; they lex but never name anything.
    #[token("as", |lex| lex.slice().to_owned())]
    #[token("break", |lex| lex.slice().to_owned())]
    #[token("const", |lex| lex.slice().to_owned())]
    #[token("continue", |lex| lex.slice().to_owned())]
    #[token("else", |lex| lex.slice().to_owned())]
    #[token("for", |lex| lex.slice().to_owned())]
    #[token("function", |lex| lex.slice().to_owned())]
    #[token("if", |lex| lex.slice().to_owned())]
    #[token("import", |lex| lex.slice().to_owned())]
    #[token("let", |lex| lex.slice().to_owned())]
    #[token("loop", |lex| lex.slice().to_owned())]
    #[token("package", |lex| lex.slice().to_owned())]
    #[token("namespace", |lex| lex.slice().to_owned())]
    #[token("return", |lex| lex.slice().to_owned())]
    #[token("var", |lex| lex.slice().to_owned())]
    #[token("void", |lex| lex.slice().to_owned())]
    #[token("while", |lex| lex.slice().to_owned())]
    Reserved(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned(), priority = 1)]
    Ident(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl Token {
    /// The source text of operator and delimiter tokens.
    pub fn lexeme(&self) -> Option<&'static str> {
        let text = match self {
            Token::In => "in",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Not => "!",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Dot => ".",
            Token::Comma => ",",
            _ => return None,
        };
        Some(text)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(text) = self.lexeme() {
            return write!(f, "'{text}'");
        }
        match self {
            Token::Int(digits) => write!(f, "{digits}"),
            Token::UInt(digits) => write!(f, "{digits}u"),
            Token::Double(d) => write!(f, "{d}"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Reserved(word) | Token::Ident(word) => write!(f, "{word}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

fn strip_suffix(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[..s.len() - 1].to_owned()
}

fn lex_double(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

/// How a quoted literal is delimited and decoded.
#[derive(Debug, Clone, Copy)]
struct Quote {
    delim: &'static str,
    raw: bool,
    bytes: bool,
}

impl Quote {
    /// Reads the prefix matched by the token regex, e.g. `rb'''`.
    fn from_prefix(prefix: &str, bytes: bool) -> Self {
        let raw = prefix.contains(['r', 'R']);
        let delim = match prefix.trim_start_matches(|c: char| c.is_ascii_alphabetic()) {
            "\"\"\"" => "\"\"\"",
            "'''" => "'''",
            "\"" => "\"",
            _ => "'",
        };
        Self { delim, raw, bytes }
    }

    fn multiline(&self) -> bool {
        self.delim.len() == 3
    }
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let quote = Quote::from_prefix(lex.slice(), false);
    String::from_utf8(scan_quoted(lex, quote)?).ok()
}

fn lex_bytes(lex: &mut logos::Lexer<Token>) -> Option<Vec<u8>> {
    let quote = Quote::from_prefix(lex.slice(), true);
    scan_quoted(lex, quote)
}

/// Consumes the literal body up to the closing delimiter. Returns `None`
/// for unterminated literals, bad escapes and newlines in single-line
/// literals.
fn scan_quoted(lex: &mut logos::Lexer<Token>, quote: Quote) -> Option<Vec<u8>> {
    let rest = lex.remainder();
    let mut out = Vec::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        if rest[i..].starts_with(quote.delim) {
            lex.bump(i + quote.delim.len());
            return Some(out);
        }
        match c {
            '\n' | '\r' if !quote.multiline() => return None,
            '\\' if !quote.raw => decode_escape(&mut chars, quote.bytes, &mut out)?,
            _ => push_char(&mut out, c),
        }
    }

    None
}

fn decode_escape(
    chars: &mut CharIndices<'_>,
    bytes: bool,
    out: &mut Vec<u8>,
) -> Option<()> {
    let (_, c) = chars.next()?;
    let simple = match c {
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0C'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0B'),
        '\\' | '\'' | '"' | '`' | '?' => Some(c),
        _ => None,
    };
    if let Some(ch) = simple {
        push_char(out, ch);
        return Some(());
    }

    match c {
        'x' | 'X' => push_code(out, read_digits(chars, 2, 16)?, bytes),
        'u' if !bytes => push_code(out, read_digits(chars, 4, 16)?, false),
        'U' if !bytes => push_code(out, read_digits(chars, 8, 16)?, false),
        '0'..='3' => {
            let high = c.to_digit(8)?;
            push_code(out, high * 64 + read_digits(chars, 2, 8)?, bytes)
        }
        _ => None,
    }
}

fn read_digits(chars: &mut CharIndices<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0;
    for _ in 0..count {
        let (_, c) = chars.next()?;
        value = value * radix + c.to_digit(radix)?;
    }
    Some(value)
}

/// `\x` and octal escapes are raw bytes in bytes literals and code points
/// in strings.
fn push_code(out: &mut Vec<u8>, code: u32, bytes: bool) -> Option<()> {
    if bytes {
        out.push(u8::try_from(code).ok()?);
    } else {
        push_char(out, char::from_u32(code)?);
    }
    Some(())
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Tokenizes `input`, stopping at the first unrecognized character.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let text = &input[span.clone()];
                let message = if text.ends_with(['"', '\'']) {
                    format!("invalid string literal starting with {text}")
                } else {
                    format!("token recognition error at: '{text}'")
                };
                return Err(LexError { message, span });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input)
            .unwrap()
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    fn string(s: &str) -> Token {
        Token::String(s.to_string())
    }

    #[test]
    fn integers_keep_their_digits() {
        assert_eq!(kinds("123"), vec![Token::Int("123".into())]);
        assert_eq!(kinds("0x1F"), vec![Token::Int("0x1F".into())]);
        assert_eq!(kinds("9223372036854775808"), vec![Token::Int("9223372036854775808".into())]);
    }

    #[test]
    fn unsigned_suffix_is_stripped() {
        assert_eq!(kinds("123u"), vec![Token::UInt("123".into())]);
        assert_eq!(kinds("0xFFU"), vec![Token::UInt("0xFF".into())]);
    }

    #[test]
    fn doubles() {
        assert_eq!(kinds("1.5"), vec![Token::Double(1.5)]);
        assert_eq!(kinds(".5"), vec![Token::Double(0.5)]);
        assert_eq!(kinds("1e3"), vec![Token::Double(1000.0)]);
        assert_eq!(kinds("2.5E-1"), vec![Token::Double(0.25)]);
    }

    #[test]
    fn minus_is_a_separate_token() {
        assert_eq!(kinds("-1"), vec![Token::Minus, Token::Int("1".into())]);
    }

    #[test]
    fn quoted_strings() {
        assert_eq!(kinds(r#""abc""#), vec![string("abc")]);
        assert_eq!(kinds("'abc'"), vec![string("abc")]);
        assert_eq!(kinds(r#""""#), vec![string("")]);
        assert_eq!(kinds(r#"'a"b'"#), vec![string("a\"b")]);
    }

    #[test]
    fn escapes_are_decoded() {
        assert_eq!(kinds(r#""a\tb\n""#), vec![string("a\tb\n")]);
        assert_eq!(kinds(r#""\x41\101é\U0001F600""#), vec![string("AAé😀")]);
        assert_eq!(kinds(r#""\"\'\\\?\`""#), vec![string("\"'\\?`")]);
    }

    #[test]
    fn raw_strings_keep_backslashes() {
        assert_eq!(kinds(r#"r"a\nb""#), vec![string(r"a\nb")]);
        assert_eq!(kinds(r"R'\d+'"), vec![string(r"\d+")]);
    }

    #[test]
    fn triple_quoted_strings_span_lines() {
        assert_eq!(kinds("'''a\n'b'\n'''"), vec![string("a\n'b'\n")]);
        assert_eq!(kinds("\"\"\"x\\ty\"\"\""), vec![string("x\ty")]);
    }

    #[test]
    fn bytes_literals() {
        assert_eq!(kinds("b'abc'"), vec![Token::Bytes(b"abc".to_vec())]);
        assert_eq!(kinds(r#"b"\xff\000""#), vec![Token::Bytes(vec![0xff, 0])]);
        assert_eq!(kinds(r#"rb"\x""#), vec![Token::Bytes(br"\x".to_vec())]);
        assert_eq!(kinds("b'ÿ'"), vec![Token::Bytes("ÿ".as_bytes().to_vec())]);
    }

    #[test]
    fn unicode_escape_in_bytes_is_rejected() {
        assert!(lex(r#"b"\u0041""#).is_err());
    }

    #[test]
    fn bad_strings_are_errors() {
        assert!(lex(r#""abc"#).is_err());
        assert!(lex("'a\nb'").is_err());
        assert!(lex(r#""\q""#).is_err());
    }

    #[test]
    fn keywords_and_reserved_words() {
        assert_eq!(
            kinds("true false null in"),
            vec![Token::True, Token::False, Token::Null, Token::In]
        );
        assert_eq!(kinds("while"), vec![Token::Reserved("while".into())]);
        assert_eq!(kinds("package"), vec![Token::Reserved("package".into())]);
        assert_eq!(kinds("iffy"), vec![Token::Ident("iffy".into())]);
    }

    #[test]
    fn optional_forms_are_two_tokens() {
        assert_eq!(
            kinds("a.?b"),
            vec![
                Token::Ident("a".into()),
                Token::Dot,
                Token::Question,
                Token::Ident("b".into())
            ]
        );
        assert_eq!(
            kinds("a[?0]"),
            vec![
                Token::Ident("a".into()),
                Token::LBracket,
                Token::Question,
                Token::Int("0".into()),
                Token::RBracket
            ]
        );
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_eq!(
            kinds("a // trailing\n\t&& b"),
            vec![Token::Ident("a".into()), Token::And, Token::Ident("b".into())]
        );
    }

    #[test]
    fn unknown_character_reports_span() {
        let err = lex("a # b").unwrap_err();
        assert_eq!(err.span, 2..3);
        assert!(err.message.contains('#'));
    }
}
