//! smallc-lexer: analyse lexicale du sous-ensemble C de smallc
//!
//! Faits saillants :
//! - `Lexer` + `LexerOptions` : commentaires `//` et `/* */`, identifiants (31 octets max),
//!   33 mots-clés triés (recherche dichotomique), nombres entiers/flottants, chaînes
//!   copiées telles quelles, caractères `'a'`
//! - les `\n` deviennent des jetons `Eol` ; les autres blancs sont ignorés
//! - ponctuation complète du C (`<<=`, `^=`, `++`…) même si la grammaire n'en utilise qu'une partie
//! - chaque jeton porte un `Span` avec ligne/colonne de départ
//!
//! Exemple éclair :
//! ```
//! use smallc_lexer::{scan, TokenKind};
//!
//! let toks = scan("int x = 3;").unwrap();
//! assert_eq!(toks[1].value, TokenKind::Ident("x".into()));
//! assert_eq!(toks.last().unwrap().value, TokenKind::Eof);
//! ```

#![deny(missing_docs)]

mod token;

pub use token::{Keyword, Token, TokenKind, KEYWORDS};

use smallc_core::{Pos, Span, Spanned};

/* ─────────────────────────── Options ─────────────────────────── */

/// Options du lexer.
#[derive(Debug, Clone, Copy)]
pub struct LexerOptions {
    /// Longueur maximale d'un identifiant, en octets.
    pub max_ident_len: usize,
}

impl Default for LexerOptions {
    fn default() -> Self { Self { max_ident_len: 31 } }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d’erreur lexicale.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    /// Caractère hors de l'alphabet du langage.
    #[error("bad character {0:?}")]
    BadChar(char),
    /// Commentaire bloc non terminé.
    #[error("unterminated comment")]
    UnterminatedComment,
    /// Chaîne non terminée.
    #[error("missing terminating \" character")]
    UnterminatedString,
    /// Caractère non terminé.
    #[error("missing terminating ' character")]
    UnterminatedChar,
    /// `''`
    #[error("empty character")]
    EmptyChar,
    /// `'ab'`
    #[error("multi-character character")]
    MultiChar,
    /// Identifiant trop long.
    #[error("identifier over {0} chars long")]
    IdentTooLong(usize),
    /// Nombre collé à une lettre (`12ab`).
    #[error("invalid suffix on numeric literal")]
    InvalidSuffix,
    /// Entier hors de l'intervalle 32 bits.
    #[error("integer literal out of range")]
    IntOverflow,
}

/// Erreur lexicale avec localisation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {span}")]
pub struct LexError {
    /// Localisation.
    pub span: Span,
    /// Genre d’erreur.
    pub kind: LexErrorKind,
}

/* ─────────────────────────── Lexer ─────────────────────────── */

/// Analyseur lexical (itératif).
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Position courante en bytes.
    off: usize,
    /// Ligne courante (1-based).
    line: u32,
    /// Offset du début de la ligne courante.
    line_start: usize,
    opts: LexerOptions,
}

impl<'a> Lexer<'a> {
    /// Crée un lexer avec options par défaut.
    pub fn new(src: &'a str) -> Self { Self::with_options(src, LexerOptions::default()) }

    /// Crée un lexer avec `LexerOptions`.
    pub const fn with_options(src: &'a str, opts: LexerOptions) -> Self {
        Self { src, bytes: src.as_bytes(), off: 0, line: 1, line_start: 0, opts }
    }

    /// Prochain jeton. Une fois la fin atteinte, renvoie `Eof` indéfiniment.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_blanks_and_comments()?;
        let (start, line, col) = self.mark();
        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, start, line, col));
        };

        let kind = match c {
            b'\n' => {
                self.bump();
                TokenKind::Eol
            }
            c if is_ident_start(c) => self.lex_ident(start, line, col)?,
            b'0'..=b'9' | b'.' => self.lex_number(start, line, col)?,
            b'"' => self.lex_string(start, line, col)?,
            b'\'' => self.lex_char(start, line, col)?,
            _ => self.lex_punct(start, line, col)?,
        };
        Ok(self.token(kind, start, line, col))
    }

    /// Tokenise toute la source (ajoute `Eof` final).
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            let t = self.next_token()?;
            log::trace!("token {} at {}", t.value, t.span);
            let is_eof = t.value == TokenKind::Eof;
            out.push(t);
            if is_eof { break; }
        }
        Ok(out)
    }

    /* ────────── Primitives internes ────────── */

    /// Fin de source ; un octet NUL compte aussi comme fin.
    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied().filter(|b| *b != 0) }
    #[inline] fn peek_at(&self, n: usize) -> Option<u8> { self.bytes.get(self.off + n).copied().filter(|b| *b != 0) }
    #[inline] fn eat(&mut self, b: u8) -> bool { if self.peek() == Some(b) { self.bump(); true } else { false } }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.off += 1;
        if b == b'\n' {
            self.line += 1;
            self.line_start = self.off;
        }
        Some(b)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn mark(&self) -> (usize, u32, u32) {
        (self.off, self.line, (self.off - self.line_start) as u32 + 1)
    }

    fn skip_blanks_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while let Some(b) = self.peek() {
                if (b != b'\n' && b.is_ascii_whitespace()) || b == 0x0b { self.bump(); } else { break; }
            }
            match (self.peek(), self.peek_at(1)) {
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' { break; }
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let (start, line, col) = self.mark();
                    self.off += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some(b'*'), Some(b'/')) => { self.off += 2; break; }
                            (Some(_), _) => { self.bump(); }
                            (None, _) => return Err(self.err(LexErrorKind::UnterminatedComment, start, line, col)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_ident(&mut self, start: usize, line: u32, col: u32) -> Result<TokenKind, LexError> {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let s = &self.src[start..self.off];
        if s.len() > self.opts.max_ident_len {
            return Err(self.err(LexErrorKind::IdentTooLong(self.opts.max_ident_len), start, line, col));
        }
        Ok(Keyword::lookup(s).map_or_else(|| TokenKind::Ident(s.to_owned()), TokenKind::Kw))
    }

    fn lex_number(&mut self, start: usize, line: u32, col: u32) -> Result<TokenKind, LexError> {
        let mut int: i32 = 0;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            int = int
                .checked_mul(10)
                .and_then(|v| v.checked_add(i32::from(d - b'0')))
                .ok_or_else(|| self.err(LexErrorKind::IntOverflow, start, line, col))?;
            self.bump();
        }

        let mut kind = TokenKind::Int(int);
        if self.peek() == Some(b'.') {
            self.bump();
            // Partie entière nulle suivie d'une lettre (`a.b`, `0.x`) : ponctuation.
            if int == 0 && self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
                return Ok(TokenKind::Period);
            }
            let mut frac = 0.0f64;
            let mut place = 0.1f64;
            while let Some(d @ b'0'..=b'9') = self.peek() {
                frac += f64::from(d - b'0') * place;
                place /= 10.0;
                self.bump();
            }
            #[allow(clippy::cast_possible_truncation)]
            let v = (f64::from(int) + frac) as f32;
            kind = TokenKind::Real(v);
        }

        match self.peek() {
            Some(b) if b.is_ascii_alphanumeric() || !b.is_ascii() => {
                Err(self.err(LexErrorKind::InvalidSuffix, start, line, col))
            }
            _ => Ok(kind),
        }
    }

    fn lex_string(&mut self, start: usize, line: u32, col: u32) -> Result<TokenKind, LexError> {
        self.bump(); // '"'
        let content = self.off;
        loop {
            match self.peek() {
                Some(b'"') => break,
                Some(_) => { self.bump(); }
                None => return Err(self.err(LexErrorKind::UnterminatedString, start, line, col)),
            }
        }
        let s = self.src[content..self.off].to_owned();
        self.bump(); // '"'
        Ok(TokenKind::Str(s))
    }

    fn lex_char(&mut self, start: usize, line: u32, col: u32) -> Result<TokenKind, LexError> {
        self.bump(); // '\''
        let c = match self.bump() {
            Some(b'\'') => return Err(self.err(LexErrorKind::EmptyChar, start, line, col)),
            Some(c) => c,
            None => return Err(self.err(LexErrorKind::UnterminatedChar, start, line, col)),
        };
        if self.eat(b'\'') {
            return Ok(TokenKind::Char(c));
        }
        // Cherche le `'` fermant pour distinguer 'ab' d'un littéral jamais fermé.
        while let Some(b) = self.bump() {
            if b == b'\'' {
                return Err(self.err(LexErrorKind::MultiChar, start, line, col));
            }
        }
        Err(self.err(LexErrorKind::UnterminatedChar, start, line, col))
    }

    fn lex_punct(&mut self, start: usize, line: u32, col: u32) -> Result<TokenKind, LexError> {
        use TokenKind::*;
        let Some(c) = self.bump() else {
            return Ok(Eof);
        };
        Ok(match c {
            b'(' => LParen,
            b')' => RParen,
            b'[' => LBracket,
            b']' => RBracket,
            b'{' => LBrace,
            b'}' => RBrace,
            b',' => Comma,
            b':' => Colon,
            b';' => Semi,
            b'?' => Question,
            b'~' => Tilde,
            b'/' => if self.eat(b'=') { SlashAssign } else { Slash },
            b'*' => if self.eat(b'=') { StarAssign } else { Star },
            b'%' => if self.eat(b'=') { PercentAssign } else { Percent },
            b'^' => if self.eat(b'=') { CaretAssign } else { Caret },
            b'=' => if self.eat(b'=') { EqEq } else { Assign },
            b'!' => if self.eat(b'=') { Ne } else { Not },
            b'+' => if self.eat(b'+') { Inc } else if self.eat(b'=') { PlusAssign } else { Plus },
            b'-' => if self.eat(b'-') { Dec } else if self.eat(b'=') { MinusAssign } else { Minus },
            b'&' => if self.eat(b'&') { AndAnd } else if self.eat(b'=') { AmpAssign } else { Amp },
            b'|' => if self.eat(b'|') { OrOr } else if self.eat(b'=') { PipeAssign } else { Pipe },
            b'<' => {
                if self.eat(b'<') {
                    if self.eat(b'=') { ShlAssign } else { Shl }
                } else if self.eat(b'=') { Le } else { Lt }
            }
            b'>' => {
                if self.eat(b'>') {
                    if self.eat(b'=') { ShrAssign } else { Shr }
                } else if self.eat(b'=') { Ge } else { Gt }
            }
            _ => {
                let bad = self.src[start..].chars().next().unwrap_or(char::from(c));
                return Err(self.err(LexErrorKind::BadChar(bad), start, line, col));
            }
        })
    }

    /* ────────── Spans / erreurs ────────── */

    #[allow(clippy::cast_possible_truncation)]
    fn span_from(&self, start: usize, line: u32, col: u32) -> Span {
        Span::new(Pos(start as u32), Pos(self.off as u32), line, col)
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        Spanned::new(kind, self.span_from(start, line, col))
    }

    fn err(&self, kind: LexErrorKind, start: usize, line: u32, col: u32) -> LexError {
        LexError { span: self.span_from(start, line, col), kind }
    }
}

/// Tokenise `src` avec les options par défaut.
pub fn scan(src: &str) -> Result<Vec<Token>, LexError> { Lexer::new(src).tokenize() }

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(b: u8) -> bool { b == b'_' || b.is_ascii_alphabetic() }

#[inline]
const fn is_ident_continue(b: u8) -> bool { b == b'_' || b.is_ascii_alphanumeric() }

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        scan(src).unwrap().into_iter().map(|t| t.value).collect()
    }

    fn err_kind(src: &str) -> LexErrorKind {
        scan(src).unwrap_err().kind
    }

    #[test]
    fn idents_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("int float char void print switch case _x x1"),
            vec![
                Kw(Keyword::Int),
                Kw(Keyword::Float),
                Kw(Keyword::Char),
                Kw(Keyword::Void),
                Kw(Keyword::Print),
                Kw(Keyword::Switch),
                Kw(Keyword::Case),
                Ident("_x".into()),
                Ident("x1".into()),
                Eof,
            ]
        );
    }

    #[test]
    fn newlines_are_tokens() {
        use TokenKind::*;
        assert_eq!(kinds("a\n\tb\n"), vec![Ident("a".into()), Eol, Ident("b".into()), Eol, Eof]);
    }

    #[test]
    fn numbers_and_floats() {
        use TokenKind::*;
        let v = kinds("0 123 2.5 .5 3. 0.00001");
        assert_eq!(v[0], Int(0));
        assert_eq!(v[1], Int(123));
        assert_eq!(v[2], Real(2.5));
        assert_eq!(v[3], Real(0.5));
        assert_eq!(v[4], Real(3.0));
        if let Real(f) = v[5] { assert!((f - 0.00001).abs() < 1e-9) } else { panic!("{:?}", v[5]) }
    }

    #[test]
    fn lone_period() {
        use TokenKind::*;
        assert_eq!(kinds("a.b"), vec![Ident("a".into()), Period, Ident("b".into()), Eof]);
        assert_eq!(kinds(".x"), vec![Period, Ident("x".into()), Eof]);
        assert_eq!(kinds("0.x"), vec![Period, Ident("x".into()), Eof]);
        assert_eq!(kinds("00.y"), vec![Period, Ident("y".into()), Eof]);
    }

    #[test]
    fn dot_without_letter_is_a_real() {
        use TokenKind::*;
        assert_eq!(kinds("x = .;"), vec![Ident("x".into()), Assign, Real(0.0), Semi, Eof]);
        assert_eq!(kinds("x = .5;"), vec![Ident("x".into()), Assign, Real(0.5), Semi, Eof]);
        assert_eq!(kinds("0.)"), vec![Real(0.0), RParen, Eof]);
        assert_eq!(err_kind("7.x"), LexErrorKind::InvalidSuffix);
    }

    #[test]
    fn number_followed_by_punctuation() {
        use TokenKind::*;
        assert_eq!(kinds("3;4)"), vec![Int(3), Semi, Int(4), RParen, Eof]);
    }

    #[test]
    fn strings_and_chars() {
        use TokenKind::*;
        assert_eq!(kinds(r#""a\nb" 'z'"#), vec![Str(r"a\nb".into()), Char(b'z'), Eof]);
    }

    #[test]
    fn comments_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("/* a\n b */ + // line\n1"), vec![Plus, Eol, Int(1), Eof]);
    }

    #[test]
    fn ops_punct() {
        use TokenKind::*;
        assert_eq!(
            kinds("++ -- += -= *= /= %= == != <= >= << >> <<= >>= && || & | ^ ~ &= |= ^= ! ? . : , ; ( ) [ ] { } < > = + - * / %"),
            vec![
                Inc, Dec, PlusAssign, MinusAssign, StarAssign, SlashAssign, PercentAssign, EqEq, Ne,
                Le, Ge, Shl, Shr, ShlAssign, ShrAssign, AndAnd, OrOr, Amp, Pipe, Caret, Tilde,
                AmpAssign, PipeAssign, CaretAssign, Not, Question, Period, Colon, Comma, Semi,
                LParen, RParen, LBracket, RBracket, LBrace, RBrace, Lt, Gt, Assign, Plus, Minus,
                Star, Slash, Percent, Eof,
            ]
        );
    }

    #[test]
    fn positions_are_line_and_column() {
        let toks = scan("int x;\n  y = 1;").unwrap();
        let y = toks.iter().find(|t| t.value == TokenKind::Ident("y".into())).unwrap();
        assert_eq!((y.span.line, y.span.col), (2, 3));
        assert_eq!((toks[0].span.line, toks[0].span.col), (1, 1));
    }

    #[test]
    fn eof_is_sticky() {
        let mut lx = Lexer::new("x");
        assert_eq!(lx.next_token().unwrap().value, TokenKind::Ident("x".into()));
        for _ in 0..3 {
            assert_eq!(lx.next_token().unwrap().value, TokenKind::Eof);
        }
    }

    #[test]
    fn nul_byte_ends_input() {
        assert_eq!(kinds("a\0 b"), vec![TokenKind::Ident("a".into()), TokenKind::Eof]);
    }

    #[test]
    fn lexical_errors() {
        assert_eq!(err_kind("''"), LexErrorKind::EmptyChar);
        assert_eq!(err_kind("'ab'"), LexErrorKind::MultiChar);
        assert_eq!(err_kind("'a"), LexErrorKind::UnterminatedChar);
        assert_eq!(err_kind("\"abc"), LexErrorKind::UnterminatedString);
        assert_eq!(err_kind("/* never"), LexErrorKind::UnterminatedComment);
        assert_eq!(err_kind("12ab"), LexErrorKind::InvalidSuffix);
        assert_eq!(err_kind("1.5f"), LexErrorKind::InvalidSuffix);
        assert_eq!(err_kind("x @"), LexErrorKind::BadChar('@'));
        assert_eq!(err_kind("99999999999"), LexErrorKind::IntOverflow);
        assert_eq!(err_kind(&"a".repeat(32)), LexErrorKind::IdentTooLong(31));
        assert!(scan(&"a".repeat(31)).is_ok());
    }

    #[test]
    fn error_message_has_location() {
        let e = scan("int x;\nx = `;").unwrap_err();
        assert_eq!(e.to_string(), "bad character '`' at line 2, column 5");
    }

    proptest! {
        #[test]
        fn int_literal_roundtrip(n in 0i32..=i32::MAX, sep in prop::sample::select(vec![" ", ";", ")", "\n", ",", ""])) {
            let toks = scan(&format!("{n}{sep}")).unwrap();
            prop_assert_eq!(&toks[0].value, &TokenKind::Int(n));
        }

        #[test]
        fn alphabetic_suffix_rejected(n in 0u32..1_000_000, suffix in "[a-zA-Z][a-zA-Z0-9]{0,3}") {
            let e = scan(&format!("{n}{suffix}")).unwrap_err();
            prop_assert_eq!(e.kind, LexErrorKind::InvalidSuffix);
        }
    }
}
