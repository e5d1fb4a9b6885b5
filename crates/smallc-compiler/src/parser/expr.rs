//! Expressions : précédence par escalade, puis unaires et primaires.

use smallc_core::Op;
use smallc_lexer::TokenKind;

use super::{PResult, Parser};
use crate::error::ErrorKind;
use crate::symtab::{SymKind, ValueType};
use crate::types::{combine, get_put, load_store, BinOp};

impl Parser<'_> {
    /// Expression complète ; renvoie le type du résultat laissé sur la pile.
    pub(super) fn expression(&mut self) -> PResult<ValueType> { self.binary(1) }

    /// Opérateurs de précédence ≥ `min_prec`, associatifs à gauche.
    fn binary(&mut self, min_prec: u8) -> PResult<ValueType> {
        let mut lhs = self.unary()?;
        while let Some(op) = BinOp::from_token(self.peek()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            let span = self.bump().span;
            let rhs = self.binary(prec + 1)?;
            lhs = combine(&mut self.code, op, lhs, rhs).map_err(|k| Self::error(k, span))?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<ValueType> {
        match *self.peek() {
            TokenKind::Plus => {
                self.bump();
                self.unary()
            }
            TokenKind::Minus => {
                self.bump();
                let ty = self.unary()?;
                self.code.op(if ty.is_integral() { Op::Neg } else { Op::FNeg });
                Ok(ty)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> PResult<ValueType> {
        match self.peek() {
            TokenKind::LParen => {
                self.bump();
                let ty = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(ty)
            }
            TokenKind::Int(n) => {
                let n = *n;
                self.bump();
                self.code.op_i32(Op::PushI, n);
                Ok(ValueType::Int)
            }
            TokenKind::Real(x) => {
                let x = *x;
                self.bump();
                self.code.op_f32(Op::FPushI, x);
                Ok(ValueType::Real)
            }
            TokenKind::Char(c) => {
                let c = *c;
                self.bump();
                self.code.op_i32(Op::PushI, i32::from(c));
                Ok(ValueType::Char)
            }
            TokenKind::Ident(_) => self.variable(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Lecture d'une variable ou d'un élément de tableau.
    fn variable(&mut self) -> PResult<ValueType> {
        let (name, span) = self.expect_ident()?;
        let sym = self
            .syms
            .lookup(&name)
            .cloned()
            .ok_or_else(|| Self::error(ErrorKind::Undeclared(name.clone()), span))?;
        match sym.kind {
            SymKind::Scalar(ty) => {
                if self.check(&TokenKind::LBracket) {
                    return Err(Self::error(ErrorKind::NotAnArray(name), self.span()));
                }
                self.code.op_addr(load_store(ty).0, sym.addr);
                Ok(ty)
            }
            SymKind::Array { elem, .. } => {
                if !self.check(&TokenKind::LBracket) {
                    return Err(Self::error(ErrorKind::InvalidObject(name), span));
                }
                self.element_address(&sym)?;
                self.code.op(get_put(elem).0);
                Ok(elem)
            }
            SymKind::Procedure { .. } => Err(Self::error(ErrorKind::InvalidObject(name), span)),
        }
    }
}
