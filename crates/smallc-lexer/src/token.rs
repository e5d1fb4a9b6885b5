//! Tokens : mots-clés, littéraux, ponctuation.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use smallc_core::Spanned;

/* ─────────────────────────── Mots-clés ─────────────────────────── */

/// Mots-clés reconnus (ceux du C plus `print`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[allow(missing_docs)]
pub enum Keyword {
    Auto, Break, Case, Char, Const, Continue, Default, Do, Double, Else, Enum,
    Extern, Float, For, Goto, If, Int, Long, Print, Register, Return, Short,
    Signed, Sizeof, Static, Struct, Switch, Typedef, Union, Unsigned, Void,
    Volatile, While,
}

/// Table triée (ordre lexicographique) pour la recherche dichotomique.
pub const KEYWORDS: [(&str, Keyword); 33] = [
    ("auto", Keyword::Auto),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("char", Keyword::Char),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("do", Keyword::Do),
    ("double", Keyword::Double),
    ("else", Keyword::Else),
    ("enum", Keyword::Enum),
    ("extern", Keyword::Extern),
    ("float", Keyword::Float),
    ("for", Keyword::For),
    ("goto", Keyword::Goto),
    ("if", Keyword::If),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("print", Keyword::Print),
    ("register", Keyword::Register),
    ("return", Keyword::Return),
    ("short", Keyword::Short),
    ("signed", Keyword::Signed),
    ("sizeof", Keyword::Sizeof),
    ("static", Keyword::Static),
    ("struct", Keyword::Struct),
    ("switch", Keyword::Switch),
    ("typedef", Keyword::Typedef),
    ("union", Keyword::Union),
    ("unsigned", Keyword::Unsigned),
    ("void", Keyword::Void),
    ("volatile", Keyword::Volatile),
    ("while", Keyword::While),
];

impl Keyword {
    /// Recherche dichotomique dans [`KEYWORDS`].
    pub fn lookup(s: &str) -> Option<Self> {
        KEYWORDS.binary_search_by(|(k, _)| (*k).cmp(s)).ok().map(|i| KEYWORDS[i].1)
    }

    /// Texte source du mot-clé.
    pub fn as_str(self) -> &'static str {
        KEYWORDS.iter().find(|(_, k)| *k == self).map_or("?", |(s, _)| s)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Genre de jeton lexical (avec sa charge utile).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenKind {
    /// Mot-clé.
    Kw(Keyword),
    /// Identifiant (31 octets max par défaut).
    Ident(String),
    /// Littéral entier.
    Int(i32),
    /// Littéral flottant.
    Real(f32),
    /// Littéral chaîne (copié tel quel, sans échappements).
    Str(String),
    /// Littéral caractère (un octet).
    Char(u8),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `.`
    Period,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semi,
    /// `?`
    Question,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `++`
    Inc,
    /// `--`
    Dec,
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `%=`
    PercentAssign,
    /// `==`
    EqEq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `!`
    Not,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `~`
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<<=`
    ShlAssign,
    /// `>>=`
    ShrAssign,
    /// `&=`
    AmpAssign,
    /// `|=`
    PipeAssign,
    /// `^=`
    CaretAssign,
    /// Fin de ligne (les `\n` sont des jetons).
    Eol,
    /// Fin de fichier.
    Eof,
}

impl TokenKind {
    /// Symbole d'un jeton de ponctuation, `None` pour les autres.
    pub const fn punct(&self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Period => ".",
            Comma => ",",
            Colon => ":",
            Semi => ";",
            Question => "?",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Inc => "++",
            Dec => "--",
            Assign => "=",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            EqEq => "==",
            Ne => "!=",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            Not => "!",
            AndAnd => "&&",
            OrOr => "||",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Shl => "<<",
            Shr => ">>",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AmpAssign => "&=",
            PipeAssign => "|=",
            CaretAssign => "^=",
            _ => return None,
        })
    }

    /// Vrai pour `int`, `float` et `char`.
    pub const fn is_type_keyword(&self) -> bool {
        matches!(self, Self::Kw(Keyword::Int | Keyword::Float | Keyword::Char))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kw(k) => write!(f, "(Keyword) {k}"),
            Self::Ident(s) => write!(f, "(Identifier) {s}"),
            Self::Int(i) => write!(f, "(Integer) {i}"),
            Self::Real(x) => write!(f, "(Real) {x:.6}"),
            Self::Str(s) => write!(f, "(String) \"{s}\""),
            Self::Char(c) => write!(f, "(Character) '{}'", char::from(*c)),
            Self::Eol => f.write_str("End of line"),
            Self::Eof => f.write_str("End of file"),
            other => f.write_str(other.punct().unwrap_or("?")),
        }
    }
}

/// Jeton avec span.
pub type Token = Spanned<TokenKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyword_table_is_sorted() {
        assert!(KEYWORDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn lookup_every_keyword() {
        for (s, k) in KEYWORDS {
            assert_eq!(Keyword::lookup(s), Some(k));
            assert_eq!(k.as_str(), s);
        }
        assert_eq!(Keyword::lookup("main"), None);
        assert_eq!(Keyword::lookup("Int"), None);
    }

    #[test]
    fn display_matches_trace_format() {
        assert_eq!(TokenKind::Kw(Keyword::While).to_string(), "(Keyword) while");
        assert_eq!(TokenKind::Ident("x".into()).to_string(), "(Identifier) x");
        assert_eq!(TokenKind::Int(42).to_string(), "(Integer) 42");
        assert_eq!(TokenKind::Real(1.5).to_string(), "(Real) 1.500000");
        assert_eq!(TokenKind::Str("hi".into()).to_string(), "(String) \"hi\"");
        assert_eq!(TokenKind::Char(b'a').to_string(), "(Character) 'a'");
        assert_eq!(TokenKind::ShlAssign.to_string(), "<<=");
        assert_eq!(TokenKind::Eol.to_string(), "End of line");
    }
}
