//! Erreurs de compilation (fatales : la première arrête tout).

use core::fmt;

use smallc_core::{CoreError, Span};
use smallc_lexer::{LexError, LexErrorKind};

use crate::symtab::ValueType;

/// Genre d'erreur de compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Erreur lexicale remontée telle quelle.
    #[error(transparent)]
    Lex(#[from] LexErrorKind),
    /// Jeton inattendu.
    #[error("unexpected token {found}, expected {expected}")]
    UnexpectedToken {
        /// Jeton rencontré (forme trace).
        found: String,
        /// Ce qui était attendu.
        expected: &'static str,
    },
    /// Identifiant non déclaré.
    #[error("'{0}' undeclared")]
    Undeclared(String),
    /// Redéclaration dans la même portée.
    #[error("'{name}' already declared at line {line}")]
    Redeclared {
        /// Nom fautif.
        name: String,
        /// Ligne de la première déclaration.
        line: u32,
    },
    /// Combinaison de types refusée par un opérateur.
    #[error("type mismatch: {lhs} {op} {rhs}")]
    TypeMismatch {
        /// Symbole de l'opérateur.
        op: &'static str,
        /// Type de gauche.
        lhs: ValueType,
        /// Type de droite.
        rhs: ValueType,
    },
    /// Indexation d'un nom qui n'est pas un tableau.
    #[error("'{0}' is not an array")]
    NotAnArray(String),
    /// Indice non entier.
    #[error("array subscript is not an integer (found {0})")]
    IndexNotInteger(ValueType),
    /// Tableau ou procédure utilisé comme valeur.
    #[error("invalid use of '{0}' as a value")]
    InvalidObject(String),
    /// Affectation d'un tableau entier.
    #[error("assignment to array '{0}'")]
    AssignToArray(String),
    /// Affectation d'une procédure.
    #[error("assignment to procedure '{0}'")]
    AssignToProcedure(String),
    /// Appel d'un nom qui n'est pas une procédure.
    #[error("'{0}' is not a procedure")]
    NotAProcedure(String),
    /// Taille de tableau absente.
    #[error("array size missing in declaration of '{0}'")]
    MissingArraySize(String),
    /// Taille de tableau non entière ou non positive.
    #[error("size of array '{0}' must be an integer constant greater than 0")]
    InvalidArraySize(String),
    /// Segment de données trop grand.
    #[error("data segment too large")]
    DataTooLarge,
    /// `int ;`
    #[error("declaration does not declare anything")]
    EmptyDeclaration,
    /// Tableau initialisé sans accolades.
    #[error("invalid initializer for array '{0}'")]
    InvalidArrayInitializer(String),
    /// Valeurs d'initialisation en trop (seulement avec `deny_warnings`).
    #[error("excess elements in initializer of '{0}'")]
    ExcessInitializer(String),
    /// Trop d'arguments.
    #[error("too many arguments to procedure '{name}' (expected {expected})")]
    TooManyArguments {
        /// Procédure appelée.
        name: String,
        /// Nombre de paramètres.
        expected: usize,
    },
    /// Pas assez d'arguments.
    #[error("too few arguments to procedure '{name}' (expected {expected}, found {found})")]
    TooFewArguments {
        /// Procédure appelée.
        name: String,
        /// Nombre de paramètres.
        expected: usize,
        /// Nombre d'arguments fournis.
        found: usize,
    },
    /// `case` hors d'un `switch`.
    #[error("'case' label not within a switch statement")]
    CaseOutsideSwitch,
    /// `default` hors d'un `switch`.
    #[error("'default' label not within a switch statement")]
    DefaultOutsideSwitch,
    /// Valeur de `switch` non entière.
    #[error("switch quantity not an integer (found {0})")]
    SwitchNotInteger(ValueType),
    /// Étiquette de `case` non entière.
    #[error("case label not an integer (found {0})")]
    CaseNotInteger(ValueType),
    /// Point d'entrée absent.
    #[error("undefined reference to '{0}'")]
    NoEntryPoint(String),
    /// Pile de portées pleine.
    #[error("Too many symbol tables on the symbol table stack (max: {0})")]
    ScopeOverflow(usize),
    /// Trou hors du tampon (bug interne d'émission).
    #[error("code generation: {0}")]
    Codegen(#[from] CoreError),
}

/// Erreur de compilation localisée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Genre.
    pub kind: ErrorKind,
    /// Localisation, si connue.
    pub span: Option<Span>,
}

impl CompileError {
    /// Construit une erreur localisée.
    pub const fn new(kind: ErrorKind, span: Option<Span>) -> Self { Self { kind, span } }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(sp) => write!(f, "{} at {sp}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { Some(&self.kind) }
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self { Self::new(ErrorKind::Lex(e.kind), Some(e.span)) }
}

impl From<CoreError> for CompileError {
    fn from(e: CoreError) -> Self { Self::new(ErrorKind::Codegen(e), None) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smallc_core::Pos;

    #[test]
    fn display_with_and_without_span() {
        let sp = Span::new(Pos(0), Pos(1), 3, 7);
        let e = CompileError::new(ErrorKind::Undeclared("y".into()), Some(sp));
        assert_eq!(e.to_string(), "'y' undeclared at line 3, column 7");
        let e = CompileError::new(ErrorKind::NoEntryPoint("main".into()), None);
        assert_eq!(e.to_string(), "undefined reference to 'main'");
    }

    #[test]
    fn lex_error_keeps_location() {
        let lex = smallc_lexer::scan("''").unwrap_err();
        let e = CompileError::from(lex);
        assert_eq!(e.kind, ErrorKind::Lex(LexErrorKind::EmptyChar));
        assert_eq!(e.to_string(), "empty character at line 1, column 1");
    }
}
