//! smallc-core: primitives partagées entre compilateur et VM
//!
//! Fournit :
//! - `Pos`, `Span`, `Spanned<T>` (offsets + ligne/colonne de départ)
//! - le jeu d'opcodes `Op` et la largeur fixe des opérandes
//! - `CodeBuf` : tampon d'émission append-only avec trous (`Hole`) à back-patcher
//! - `Program` : code émis + taille du segment de données
//! - décodage (`Instr`, `Decoder`) et désassemblage textuel
//! - Erreurs `CoreError` + alias `CoreResult<T>`
//!
//! Features :
//! - `serde` (par défaut) : derive (dé)sérialisation sur les structures utiles

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (opcodes, tampon de code, désassembleur).
pub mod bytecode;

pub use bytecode::code::{CodeBuf, Hole, Program};
pub use bytecode::disasm::{decode_at, disassemble, Decoder, Instr};
pub use bytecode::op::{Op, OperandKind, CALL_SEQUENCE_LEN, ENTRY_CALL_LEN, OPERAND_WIDTH};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Spans / Positions ─────────────────────────── */

/// Position (offset byte) depuis le début de la source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pos(pub u32);

impl Pos {
    /// Position nulle.
    pub const ZERO: Self = Self(0);
    /// Addition saturée.
    #[must_use]
    pub const fn saturating_add(self, v: u32) -> Self { Self(self.0.saturating_add(v)) }
}

/// Plage (demi-ouverte) `[start, end)` dans la source, avec la ligne/colonne
/// (1-based) de son premier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Début inclus.
    pub start: Pos,
    /// Fin exclue.
    pub end: Pos,
    /// Ligne du début.
    pub line: u32,
    /// Colonne du début.
    pub col: u32,
}

impl Span {
    /// Crée un span.
    pub const fn new(start: Pos, end: Pos, line: u32, col: u32) -> Self { Self { start, end, line, col } }
    /// Longueur en bytes.
    pub const fn len(&self) -> u32 { self.end.0.saturating_sub(self.start.0) }
    /// Vrai si le span est vide.
    pub const fn is_empty(&self) -> bool { self.start.0 >= self.end.0 }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

/// Wrapper utilitaire « valeur + span ».
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spanned<T> {
    /// La valeur.
    pub value: T,
    /// La localisation.
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Construit un `Spanned<T>`.
    pub const fn new(value: T, span: Span) -> Self { Self { value, span } }
    /// Applique une fonction à la valeur et conserve le span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> { Spanned { value: f(self.value), span: self.span } }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs du core (décodage du bytecode).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Octet qui ne correspond à aucun opcode.
    #[error("unknown opcode 0x{byte:02x} at {pc}")]
    UnknownOpcode {
        /// Offset de l'octet fautif.
        pc: u32,
        /// Valeur lue.
        byte: u8,
    },
    /// Opérande coupée par la fin du code.
    #[error("truncated operand for `{op}` at {pc}")]
    TruncatedOperand {
        /// Offset de l'opcode.
        pc: u32,
        /// Mnémonique de l'opcode.
        op: &'static str,
    },
    /// Offset hors du tampon de code.
    #[error("code offset {0} out of range")]
    OutOfRange(u32),
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn span_display_and_len() {
        let sp = Span::new(Pos(4), Pos(9), 2, 3);
        assert_eq!(sp.len(), 5);
        assert!(!sp.is_empty());
        assert_eq!(sp.to_string(), "line 2, column 3");
    }

    #[test]
    fn spanned_map_keeps_span() {
        let sp = Span::new(Pos(0), Pos(1), 1, 1);
        let s = Spanned::new(2, sp).map(|v| v * 10);
        assert_eq!(s.value, 20);
        assert_eq!(s.span, sp);
    }

    #[test]
    fn core_error_messages() {
        assert_eq!(CoreError::UnknownOpcode { pc: 7, byte: 0xfe }.to_string(), "unknown opcode 0xfe at 7");
        assert_eq!(
            CoreError::TruncatedOperand { pc: 3, op: "pushi" }.to_string(),
            "truncated operand for `pushi` at 3"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn span_serde_roundtrip() {
        let sp = Span::new(Pos(1), Pos(2), 3, 4);
        let json = serde_json::to_string(&sp).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sp);
    }
}
