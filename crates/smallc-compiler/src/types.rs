//! Règles de combinaison des types pour les opérateurs binaires, et conversions
//! d'affectation.
//!
//! La pile contient `lhs` puis `rhs` (au sommet) ; promouvoir `lhs` demande
//! `exch, conv_to_float, exch`, promouvoir `rhs` un simple `conv_to_float`.

use smallc_core::Op;
use smallc_lexer::TokenKind;

use crate::emit::Emitter;
use crate::error::ErrorKind;
use crate::symtab::ValueType;

/// Opérateur binaire du langage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl BinOp {
    /// Opérateur désigné par un jeton.
    pub const fn from_token(tok: &TokenKind) -> Option<Self> {
        Some(match tok {
            TokenKind::OrOr => Self::Or,
            TokenKind::AndAnd => Self::And,
            TokenKind::EqEq => Self::Eq,
            TokenKind::Ne => Self::Ne,
            TokenKind::Lt => Self::Lt,
            TokenKind::Le => Self::Le,
            TokenKind::Gt => Self::Gt,
            TokenKind::Ge => Self::Ge,
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Sub,
            TokenKind::Star => Self::Mul,
            TokenKind::Slash => Self::Div,
            TokenKind::Percent => Self::Mod,
            _ => return None,
        })
    }

    /// Précédence (plus grand = plus liant).
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Mod => 6,
        }
    }

    /// Symbole source.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }

    /// Vrai pour `+ - * /` (le résultat suit la promotion).
    pub const fn is_arithmetic(self) -> bool { matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div) }

    /// Opcode à émettre une fois les opérandes promus.
    pub const fn opcode(self, real: bool) -> Op {
        match (self, real) {
            (Self::Add, false) => Op::Add,
            (Self::Add, true) => Op::FAdd,
            (Self::Sub, false) => Op::Sub,
            (Self::Sub, true) => Op::FSub,
            (Self::Mul, false) => Op::Mul,
            (Self::Mul, true) => Op::FMul,
            (Self::Div, false) => Op::Div,
            (Self::Div, true) => Op::FDiv,
            (Self::Mod, _) => Op::Mod,
            (Self::Or, _) => Op::Or,
            (Self::And, _) => Op::And,
            (Self::Eq, _) => Op::Eq,
            (Self::Ne, _) => Op::Neq,
            (Self::Lt, _) => Op::Less,
            (Self::Le, _) => Op::Leq,
            (Self::Gt, _) => Op::Greater,
            (Self::Ge, _) => Op::Geq,
        }
    }
}

/// Émet les conversions puis l'opération `op`, et renvoie le type du résultat.
pub fn combine(code: &mut Emitter, op: BinOp, lhs: ValueType, rhs: ValueType) -> Result<ValueType, ErrorKind> {
    use ValueType::{Int, Real};

    if op == BinOp::Mod {
        if lhs == Int && rhs == Int {
            code.op(Op::Mod);
            return Ok(Int);
        }
        return Err(ErrorKind::TypeMismatch { op: op.symbol(), lhs, rhs });
    }

    // `lhs`/`rhs` réels après promotion ?
    let real = match (lhs.is_integral(), rhs.is_integral()) {
        (true, true) => false,
        (true, false) => {
            code.op(Op::Exch);
            code.op(Op::ConvToFloat);
            code.op(Op::Exch);
            true
        }
        (false, true) => {
            code.op(Op::ConvToFloat);
            true
        }
        (false, false) => true,
    };

    code.op(op.opcode(real));
    Ok(if real && op.is_arithmetic() { Real } else { Int })
}

/// Conversion d'une valeur de type `found` vers une destination `target`.
pub fn convert(code: &mut Emitter, target: ValueType, found: ValueType) {
    match (target.is_integral(), found.is_integral()) {
        (true, false) => code.op(Op::ConvToInt),
        (false, true) => code.op(Op::ConvToFloat),
        _ => {}
    }
}

/// Opcodes de lecture/écriture d'une variable selon son type.
pub const fn load_store(ty: ValueType) -> (Op, Op) {
    if ty.is_integral() { (Op::Push, Op::Pop) } else { (Op::FPush, Op::FPop) }
}

/// Opcodes d'accès indirect (tableaux) selon le type d'élément.
pub const fn get_put(ty: ValueType) -> (Op, Op) {
    if ty.is_integral() { (Op::Get, Op::Put) } else { (Op::FGet, Op::FPut) }
}
