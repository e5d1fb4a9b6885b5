//! Instructions : blocs, `if`, `while`, `do`, `switch`, `print`, affectations, appels.

use smallc_core::{Op, Span, CALL_SEQUENCE_LEN};
use smallc_lexer::{Keyword, TokenKind};

use super::{PResult, Parser};
use crate::error::ErrorKind;
use crate::symtab::{Symbol, SymKind, ValueType, SCALAR_SIZE};
use crate::types::{convert, get_put, load_store};

impl Parser<'_> {
    /// Déclarations et instructions mêlées, jusqu'à `}`.
    pub(super) fn block_items(&mut self) -> PResult<()> {
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            if self.peek().is_type_keyword() {
                self.declaration()?;
            } else {
                self.statement()?;
            }
        }
        Ok(())
    }

    fn statement(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::LBrace => self.compound(),
            TokenKind::Kw(Keyword::If) => self.if_stmt(),
            TokenKind::Kw(Keyword::While) => self.while_stmt(),
            TokenKind::Kw(Keyword::Do) => self.do_stmt(),
            TokenKind::Kw(Keyword::Switch) => self.switch_stmt(),
            TokenKind::Kw(Keyword::Return) => {
                self.bump();
                self.expect(&TokenKind::Semi, "';'")?;
                self.code.op(Op::Return);
                Ok(())
            }
            TokenKind::Kw(Keyword::Print) => self.print_stmt(),
            TokenKind::Kw(Keyword::Case) | TokenKind::Kw(Keyword::Default) => self.labeled(),
            TokenKind::Semi => {
                self.bump();
                Ok(())
            }
            TokenKind::Ident(_) => self.ident_stmt(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// `{ ... }` dans une nouvelle portée.
    fn compound(&mut self) -> PResult<()> {
        let open = self.expect(&TokenKind::LBrace, "'{'")?;
        self.push_scope(open)?;
        self.block_items()?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        self.syms.pop_scope();
        Ok(())
    }

    fn condition(&mut self) -> PResult<()> {
        self.expect(&TokenKind::LParen, "'('")?;
        self.expression()?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(())
    }

    fn if_stmt(&mut self) -> PResult<()> {
        self.bump();
        self.condition()?;
        let to_else = self.code.hole(Op::JFalse);
        self.statement()?;
        if self.eat(&TokenKind::Kw(Keyword::Else)) {
            let to_end = self.code.hole(Op::Jmp);
            self.code.patch_here(to_else)?;
            self.statement()?;
            self.code.patch_here(to_end)?;
        } else {
            self.code.patch_here(to_else)?;
        }
        Ok(())
    }

    fn while_stmt(&mut self) -> PResult<()> {
        self.bump();
        let head = self.code.here();
        self.condition()?;
        let exit = self.code.hole(Op::JFalse);
        self.statement()?;
        self.code.jump_back(Op::Jmp, head);
        self.code.patch_here(exit)?;
        Ok(())
    }

    fn do_stmt(&mut self) -> PResult<()> {
        self.bump();
        let head = self.code.here();
        self.statement()?;
        self.expect(&TokenKind::Kw(Keyword::While), "'while'")?;
        self.condition()?;
        self.expect(&TokenKind::Semi, "';'")?;
        self.code.jump_back(Op::JTrue, head);
        Ok(())
    }

    /// `switch ( expr ) { case/default ... }`
    ///
    /// Pile pendant le corps : `[fin, valeur]`. Une branche qui s'exécute se
    /// termine par `remove; return`, ce qui saute à l'adresse de fin ; sans
    /// branche choisie, les deux `remove` finaux nettoient.
    fn switch_stmt(&mut self) -> PResult<()> {
        self.bump();
        self.expect(&TokenKind::LParen, "'('")?;
        let span = self.span();
        let ty = self.expression()?;
        if !ty.is_integral() {
            return Err(Self::error(ErrorKind::SwitchNotInteger(ty), span));
        }
        self.expect(&TokenKind::RParen, "')'")?;
        let end = self.code.hole(Op::PushI);
        self.code.op(Op::Exch);

        let open = self.expect(&TokenKind::LBrace, "'{'")?;
        self.push_scope(open)?;
        self.switch_depth += 1;
        loop {
            match self.peek() {
                TokenKind::Kw(Keyword::Case) => {
                    self.bump();
                    self.case_arm()?;
                }
                TokenKind::Kw(Keyword::Default) => {
                    self.bump();
                    self.default_arm()?;
                }
                _ => break,
            }
        }
        self.switch_depth -= 1;
        self.expect(&TokenKind::RBrace, "'}'")?;
        self.syms.pop_scope();

        self.code.op(Op::Remove);
        self.code.op(Op::Remove);
        let here = self.code.here();
        self.code.patch_abs(end, here)?;
        Ok(())
    }

    /// `case expr : instruction` (le mot-clé est déjà consommé).
    fn case_arm(&mut self) -> PResult<()> {
        self.code.op(Op::Dup);
        let span = self.span();
        let ty = self.expression()?;
        if !ty.is_integral() {
            return Err(Self::error(ErrorKind::CaseNotInteger(ty), span));
        }
        self.expect(&TokenKind::Colon, "':'")?;
        self.code.op(Op::Eq);
        let next = self.code.hole(Op::JFalse);
        self.statement()?;
        self.exit_switch();
        self.code.patch_here(next)?;
        Ok(())
    }

    /// `default : instruction`
    fn default_arm(&mut self) -> PResult<()> {
        self.expect(&TokenKind::Colon, "':'")?;
        self.statement()?;
        self.exit_switch();
        Ok(())
    }

    /// Fin de branche : retire la valeur testée, saute à la fin du `switch`.
    fn exit_switch(&mut self) {
        self.code.op(Op::Remove);
        self.code.op(Op::Return);
    }

    /// `case`/`default` rencontré comme instruction d'une branche.
    fn labeled(&mut self) -> PResult<()> {
        let t = self.bump();
        let is_case = t.value == TokenKind::Kw(Keyword::Case);
        if self.switch_depth == 0 {
            let kind = if is_case { ErrorKind::CaseOutsideSwitch } else { ErrorKind::DefaultOutsideSwitch };
            return Err(Self::error(kind, t.span));
        }
        if is_case { self.case_arm() } else { self.default_arm() }
    }

    /// `print "texte" ;` ou `print expr ;`
    fn print_stmt(&mut self) -> PResult<()> {
        self.bump();
        if let TokenKind::Str(s) = self.peek() {
            let bytes = s.clone().into_bytes();
            self.bump();
            for b in bytes.iter().rev() {
                self.code.op_i32(Op::PushI, i32::from(*b));
            }
            for _ in &bytes {
                self.code.op(Op::PrintChar);
            }
        } else {
            let ty = self.expression()?;
            self.code.op(match ty {
                ValueType::Int => Op::PrintInt,
                ValueType::Real => Op::PrintFloat,
                ValueType::Char => Op::PrintChar,
            });
        }
        self.code.op(Op::PrintLn);
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(())
    }

    /// Instruction commençant par un identifiant : appel ou liste d'affectations.
    fn ident_stmt(&mut self) -> PResult<()> {
        let TokenKind::Ident(name) = self.peek() else {
            return Err(self.unexpected("an identifier"));
        };
        let span = self.span();
        let sym = self
            .syms
            .lookup(name)
            .cloned()
            .ok_or_else(|| Self::error(ErrorKind::Undeclared(name.clone()), span))?;
        if matches!(sym.kind, SymKind::Procedure { .. }) {
            self.call(&sym)?;
        } else {
            loop {
                self.assignment()?;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(())
    }

    /// `id = expr` ou `id [ expr ] = expr`
    fn assignment(&mut self) -> PResult<()> {
        let (name, span) = self.expect_ident()?;
        let sym = self
            .syms
            .lookup(&name)
            .cloned()
            .ok_or_else(|| Self::error(ErrorKind::Undeclared(name.clone()), span))?;
        match sym.kind {
            SymKind::Procedure { .. } => Err(Self::error(ErrorKind::AssignToProcedure(name), span)),
            SymKind::Array { elem, .. } => {
                if !self.check(&TokenKind::LBracket) {
                    return Err(Self::error(ErrorKind::AssignToArray(name), span));
                }
                self.element_address(&sym)?;
                self.expect(&TokenKind::Assign, "'='")?;
                let found = self.expression()?;
                convert(&mut self.code, elem, found);
                self.code.op(get_put(elem).1);
                Ok(())
            }
            SymKind::Scalar(ty) => {
                if self.check(&TokenKind::LBracket) {
                    return Err(Self::error(ErrorKind::NotAnArray(name), self.span()));
                }
                self.expect(&TokenKind::Assign, "'='")?;
                let found = self.expression()?;
                convert(&mut self.code, ty, found);
                self.code.op_addr(load_store(ty).1, sym.addr);
                Ok(())
            }
        }
    }

    /// `[ index ]` → adresse absolue de l'élément sur la pile.
    pub(super) fn element_address(&mut self, sym: &Symbol) -> PResult<()> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let span = self.span();
        let ty = self.expression()?;
        if !ty.is_integral() {
            return Err(Self::error(ErrorKind::IndexNotInteger(ty), span));
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        self.code.op_addr(Op::PushI, SCALAR_SIZE);
        self.code.op(Op::Mul);
        self.code.op_addr(Op::PushI, sym.addr);
        self.code.op(Op::Add);
        Ok(())
    }

    /// `name ( args )` : arguments convertis, adresse de retour, `reverse`, `call`.
    fn call(&mut self, sym: &Symbol) -> PResult<()> {
        let SymKind::Procedure { params } = &sym.kind else {
            return Err(Self::error(ErrorKind::NotAProcedure(sym.name.clone()), self.span()));
        };
        let (_, span) = self.expect_ident()?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut count = 0usize;
        if !self.check(&TokenKind::RParen) {
            loop {
                let arg_span = self.span();
                let found = self.expression()?;
                let Some(target) = params.get(count) else {
                    return Err(Self::error(
                        ErrorKind::TooManyArguments { name: sym.name.clone(), expected: params.len() },
                        arg_span,
                    ));
                };
                convert(&mut self.code, *target, found);
                count += 1;
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        if count < params.len() {
            return Err(Self::error(
                ErrorKind::TooFewArguments { name: sym.name.clone(), expected: params.len(), found: count },
                span,
            ));
        }
        self.emit_call(sym.addr, count, span)
    }

    /// Séquence d'appel de longueur fixe [`CALL_SEQUENCE_LEN`].
    fn emit_call(&mut self, entry: u32, argc: usize, span: Span) -> PResult<()> {
        let items = i32::try_from(argc + 1).map_err(|_| Self::error(ErrorKind::DataTooLarge, span))?;
        let ret = self.code.here() + CALL_SEQUENCE_LEN;
        self.code.op_addr(Op::PushI, ret);
        self.code.op_i32(Op::Reverse, items);
        self.code.op_addr(Op::Call, entry);
        Ok(())
    }
}
