//! Opcodes de la machine à pile.
//!
//! Chaque opcode tient sur un octet ; ceux qui portent une opérande sont
//! suivis d'exactement [`OPERAND_WIDTH`] octets big-endian.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largeur en octets de toute opérande.
pub const OPERAND_WIDTH: u32 = 4;

/// Longueur d'une instruction à opérande.
const WIDE_INSTR_LEN: u32 = 1 + OPERAND_WIDTH;

/// Octets émis par un appel de procédure : `pushi ret`, `reverse n`, `call addr`.
///
/// L'adresse de retour empilée par l'appelant vaut `start + CALL_SEQUENCE_LEN` ;
/// elle doit rester exacte si l'encodage de l'une des trois instructions change.
pub const CALL_SEQUENCE_LEN: u32 = 3 * WIDE_INSTR_LEN;

/// Octets de l'appel d'entrée synthétisé : `pushi ret`, `call main`.
pub const ENTRY_CALL_LEN: u32 = 2 * WIDE_INSTR_LEN;

/// Sens de l'opérande qui suit un opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OperandKind {
    /// Pas d'opérande.
    None,
    /// Adresse d'octet du segment de données.
    Data,
    /// Littéral entier.
    Int,
    /// Bits IEEE-754 bruts d'un littéral `f32`.
    Float,
    /// Nombre d'éléments.
    Count,
    /// Décalage de saut relatif, compté depuis la fin de l'opérande.
    Offset,
    /// Adresse de code absolue.
    Code,
}

macro_rules! ops {
    ($( $(#[$doc:meta])* $name:ident = $mn:literal : $kind:ident ),+ $(,)?) => {
        /// Opcode sur un octet.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[repr(u8)]
        pub enum Op {
            $( $(#[$doc])* $name, )+
        }

        impl Op {
            /// Tous les opcodes, indexés par leur valeur en octet.
            pub const ALL: &'static [Op] = &[ $( Op::$name, )+ ];

            /// Mnémonique des traces et du désassembleur.
            pub const fn mnemonic(self) -> &'static str {
                match self { $( Op::$name => $mn, )+ }
            }

            /// Genre de l'opérande qui suit l'opcode.
            pub const fn operand(self) -> OperandKind {
                match self { $( Op::$name => OperandKind::$kind, )+ }
            }
        }
    };
}

ops! {
    /// Empile l'entier rangé à une adresse de données.
    Push = "push": Data,
    /// Empile le flottant rangé à une adresse de données.
    FPush = "fpush": Data,
    /// Empile un littéral entier.
    PushI = "pushi": Int,
    /// Empile un littéral flottant.
    FPushI = "fpushi": Float,
    /// Dépile un entier vers une adresse de données.
    Pop = "pop": Data,
    /// Dépile un flottant vers une adresse de données.
    FPop = "fpop": Data,
    /// Opposé d'un entier.
    Neg = "neg": None,
    /// Opposé d'un flottant.
    FNeg = "fneg": None,
    /// Duplique le sommet.
    Dup = "dup": None,
    /// Échange les deux éléments du sommet.
    Exch = "exch": None,
    /// Jette le sommet.
    Remove = "remove": None,
    /// Inverse l'ordre des `n` éléments du sommet.
    Reverse = "reverse": Count,
    /// Addition entière.
    Add = "add": None,
    /// Addition flottante.
    FAdd = "fadd": None,
    /// Soustraction entière.
    Sub = "sub": None,
    /// Soustraction flottante.
    FSub = "fsub": None,
    /// Multiplication entière.
    Mul = "mul": None,
    /// Multiplication flottante.
    FMul = "fmul": None,
    /// Division entière.
    Div = "div": None,
    /// Division flottante.
    FDiv = "fdiv": None,
    /// Reste entier.
    Mod = "mod": None,
    /// Et logique.
    And = "and": None,
    /// Ou logique.
    Or = "or": None,
    /// Égalité.
    Eq = "eq": None,
    /// Différence.
    Neq = "neq": None,
    /// Inférieur strict.
    Less = "less": None,
    /// Inférieur ou égal.
    Leq = "leq": None,
    /// Supérieur strict.
    Greater = "greater": None,
    /// Supérieur ou égal.
    Geq = "geq": None,
    /// Entier vers flottant.
    ConvToFloat = "conv_to_float": None,
    /// Flottant vers entier (troncature).
    ConvToInt = "conv_to_int": None,
    /// Saut relatif inconditionnel.
    Jmp = "jmp": Offset,
    /// Dépile, saute si nul.
    JFalse = "jfalse": Offset,
    /// Dépile, saute si non nul.
    JTrue = "jtrue": Offset,
    /// Saute à une adresse de code absolue.
    Call = "call": Code,
    /// Dépile une adresse de code et y saute.
    Return = "return": None,
    /// Dépile un entier puis une adresse, range l'entier.
    Put = "put": None,
    /// Dépile un flottant puis une adresse, range le flottant.
    FPut = "fput": None,
    /// Dépile une adresse, empile l'entier qui s'y trouve.
    Get = "get": None,
    /// Dépile une adresse, empile le flottant qui s'y trouve.
    FGet = "fget": None,
    /// Affiche un entier.
    PrintInt = "printint": None,
    /// Affiche un flottant (`%f`).
    PrintFloat = "printfloat": None,
    /// Affiche un caractère.
    PrintChar = "printchar": None,
    /// Affiche un saut de ligne.
    PrintLn = "println": None,
    /// Arrête la machine.
    Halt = "halt": None,
}

impl Op {
    /// Décode un octet d'opcode.
    pub fn from_byte(b: u8) -> Option<Self> { Self::ALL.get(usize::from(b)).copied() }

    /// Valeur en octet de l'opcode.
    pub const fn byte(self) -> u8 { self as u8 }

    /// Largeur de l'opérande (0 ou [`OPERAND_WIDTH`]).
    pub const fn operand_width(self) -> u32 {
        match self.operand() {
            OperandKind::None => 0,
            _ => OPERAND_WIDTH,
        }
    }

    /// Longueur totale de l'instruction, opcode compris.
    pub const fn instr_len(self) -> u32 { 1 + self.operand_width() }

    /// Vrai pour les trois sauts relatifs.
    pub const fn is_jump(self) -> bool { matches!(self.operand(), OperandKind::Offset) }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bytes_roundtrip_through_table() {
        for (i, op) in Op::ALL.iter().enumerate() {
            assert_eq!(usize::from(op.byte()), i);
            assert_eq!(Op::from_byte(op.byte()), Some(*op));
        }
        assert_eq!(Op::ALL.len(), 45);
        assert_eq!(Op::from_byte(45), None);
    }

    #[test]
    fn operand_widths() {
        for op in [Op::Push, Op::FPush, Op::PushI, Op::FPushI, Op::Pop, Op::FPop, Op::Reverse, Op::Jmp, Op::JFalse, Op::JTrue, Op::Call] {
            assert_eq!(op.instr_len(), 5, "{op}");
        }
        for op in [Op::Add, Op::Return, Op::Put, Op::Get, Op::Halt, Op::PrintLn, Op::Dup] {
            assert_eq!(op.instr_len(), 1, "{op}");
        }
    }

    #[test]
    fn call_sequence_lengths_match_encoding() {
        assert_eq!(CALL_SEQUENCE_LEN, Op::PushI.instr_len() + Op::Reverse.instr_len() + Op::Call.instr_len());
        assert_eq!(ENTRY_CALL_LEN, Op::PushI.instr_len() + Op::Call.instr_len());
        assert_eq!(CALL_SEQUENCE_LEN, 15);
        assert_eq!(ENTRY_CALL_LEN, 10);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Op::ConvToFloat.to_string(), "conv_to_float");
        assert_eq!(Op::PrintLn.mnemonic(), "println");
        assert!(Op::JTrue.is_jump());
        assert!(!Op::Call.is_jump());
    }
}
