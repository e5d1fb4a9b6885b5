//! Déclarations de variables, initialiseurs et définitions de procédures.

use smallc_core::{Op, Span};
use smallc_lexer::TokenKind;

use super::{PResult, Parser};
use crate::error::ErrorKind;
use crate::symtab::{Symbol, SymKind, ValueType, SCALAR_SIZE};
use crate::types::{convert, load_store};

/// Déclarateur analysé : nom + éventuelle dimension.
struct Declarator {
    name: String,
    span: Span,
    len: Option<u32>,
}

impl Parser<'_> {
    /// `type init-declarator {, init-declarator} ;`
    pub(super) fn declaration(&mut self) -> PResult<()> {
        let ty_tok = self.bump();
        let ty = ValueType::from_token(&ty_tok.value).ok_or_else(|| self.unexpected("a type"))?;
        if self.check(&TokenKind::Semi) {
            return Err(Self::error(ErrorKind::EmptyDeclaration, ty_tok.span));
        }
        loop {
            self.init_declarator(ty)?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(())
    }

    /// `ID`, `ID [ size ]` ou `( declarator )`.
    fn declarator(&mut self) -> PResult<Declarator> {
        if self.eat(&TokenKind::LParen) {
            let d = self.declarator()?;
            self.expect(&TokenKind::RParen, "')'")?;
            return Ok(d);
        }
        let (name, span) = self.expect_ident()?;
        if !self.eat(&TokenKind::LBracket) {
            return Ok(Declarator { name, span, len: None });
        }
        let len = match *self.peek() {
            TokenKind::RBracket => return Err(Self::error(ErrorKind::MissingArraySize(name), span)),
            TokenKind::Int(n) => n,
            TokenKind::Char(c) => i32::from(c),
            _ => return Err(Self::error(ErrorKind::InvalidArraySize(name), self.span())),
        };
        let len = u32::try_from(len)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Self::error(ErrorKind::InvalidArraySize(name.clone()), self.span()))?;
        self.bump();
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Declarator { name, span, len: Some(len) })
    }

    /// Alloue, déclare, puis compile l'éventuel initialiseur.
    fn init_declarator(&mut self, ty: ValueType) -> PResult<()> {
        let d = self.declarator()?;
        let sym = match d.len {
            None => {
                let addr = self.alloc(SCALAR_SIZE, d.span)?;
                Symbol::scalar(d.name, ty, addr, d.span.line)
            }
            Some(len) => {
                let size = len
                    .checked_mul(SCALAR_SIZE)
                    .ok_or_else(|| Self::error(ErrorKind::DataTooLarge, d.span))?;
                let addr = self.alloc(size, d.span)?;
                Symbol::array(d.name, ty, len, size, addr, d.span.line)
            }
        };
        let sym = self.syms.install(sym).map_err(|k| Self::error(k, d.span))?.clone();
        log::trace!("declared {} {:?} @ {}", sym.name, sym.kind, sym.addr);
        if self.eat(&TokenKind::Assign) {
            self.initializer(&sym, ty)?;
        }
        Ok(())
    }

    /// `= expr` ou `= { expr, ... }`. Les valeurs sont empilées puis dépilées
    /// de la dernière vers la première.
    fn initializer(&mut self, sym: &Symbol, ty: ValueType) -> PResult<()> {
        let (_, store) = load_store(ty);
        if !self.check(&TokenKind::LBrace) {
            if matches!(sym.kind, SymKind::Array { .. }) {
                return Err(Self::error(ErrorKind::InvalidArrayInitializer(sym.name.clone()), self.span()));
            }
            let found = self.expression()?;
            convert(&mut self.code, ty, found);
            self.code.op_addr(store, sym.addr);
            return Ok(());
        }

        self.bump();
        let capacity = sym.elem_count();
        let mut count = 0u32;
        loop {
            let span = self.span();
            let found = self.expression()?;
            convert(&mut self.code, ty, found);
            if count < capacity {
                count += 1;
            } else {
                self.warn(ErrorKind::ExcessInitializer(sym.name.clone()), span)?;
                self.code.op(Op::Remove);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        for i in (0..count).rev() {
            self.code.op_addr(store, sym.addr + i * SCALAR_SIZE);
        }
        Ok(())
    }

    /// `void name ( type p, ... ) { ... }`
    ///
    /// Le corps est sauté à l'exécution linéaire ; les paramètres arrivent sur la
    /// pile (premier au sommet) et sont dépilés dans l'ordre de déclaration.
    pub(super) fn procedure(&mut self) -> PResult<()> {
        self.bump(); // void
        let (name, span) = self.expect_ident()?;
        let skip = self.code.hole(Op::Jmp);
        let entry = self.code.here();

        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let ty = ValueType::from_token(self.peek()).ok_or_else(|| self.unexpected("a parameter type"))?;
                self.bump();
                let (pname, pspan) = self.expect_ident()?;
                params.push((pname, pspan, ty));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;

        let types = params.iter().map(|(_, _, ty)| *ty).collect();
        self.syms
            .install(Symbol::procedure(name.clone(), types, entry, span.line))
            .map_err(|k| Self::error(k, span))?;
        log::debug!("procedure {name} @ {entry:04}");

        self.push_scope(span)?;
        for (pname, pspan, ty) in params {
            let addr = self.alloc(SCALAR_SIZE, pspan)?;
            self.syms
                .install(Symbol::scalar(pname, ty, addr, pspan.line))
                .map_err(|k| Self::error(k, pspan))?;
            self.code.op_addr(load_store(ty).1, addr);
        }
        self.expect(&TokenKind::LBrace, "'{'")?;
        self.block_items()?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        self.syms.pop_scope();

        self.code.op(Op::Return);
        self.code.patch_here(skip)?;
        Ok(())
    }
}
