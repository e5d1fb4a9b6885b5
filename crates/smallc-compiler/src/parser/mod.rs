//! Analyse descendante récursive qui émet le code au fil de l'eau.
//!
//! Pas d'AST : chaque fonction de grammaire consomme ses jetons, interroge la
//! table des symboles et écrit directement dans l'`Emitter`.

mod decl;
mod expr;
mod stmt;

use smallc_core::{Op, Program, Span, Spanned, ENTRY_CALL_LEN};
use smallc_lexer::{Token, TokenKind};

use crate::emit::Emitter;
use crate::error::{CompileError, ErrorKind};
use crate::symtab::{ScopeStack, SymKind};
use crate::{CompilerOptions, Diagnostic};

/// Résultat interne du parseur.
pub type PResult<T> = Result<T, CompileError>;

/// État d'une compilation (curseur, code, données, portées).
pub struct Parser<'o> {
    toks: Vec<Token>,
    pos: usize,
    code: Emitter,
    /// Curseur d'allocation du segment de données.
    dp: u32,
    syms: ScopeStack,
    /// Nombre de corps de `switch` ouverts.
    switch_depth: u32,
    opts: &'o CompilerOptions,
    diags: Vec<Diagnostic>,
}

impl<'o> Parser<'o> {
    /// Prépare un parseur ; un `Eof` final est ajouté si absent.
    pub fn new(mut toks: Vec<Token>, opts: &'o CompilerOptions) -> Self {
        if toks.last().map_or(true, |t| t.value != TokenKind::Eof) {
            let span = toks.last().map(|t| t.span).unwrap_or_default();
            toks.push(Spanned::new(TokenKind::Eof, span));
        }
        let mut p = Self {
            toks,
            pos: 0,
            code: Emitter::default(),
            dp: 0,
            syms: ScopeStack::new(opts.max_scope_depth),
            switch_depth: 0,
            opts,
            diags: Vec::new(),
        };
        p.skip_eol();
        p
    }

    /// Compile le fichier entier : déclarations, appel de l'entrée, `halt`.
    pub fn run(&mut self) -> PResult<Program> {
        while !self.check(&TokenKind::Eof) {
            if self.peek().is_type_keyword() {
                self.declaration()?;
            } else if self.check(&TokenKind::Kw(smallc_lexer::Keyword::Void)) {
                self.procedure()?;
            } else {
                return Err(self.unexpected("a declaration or a procedure definition"));
            }
        }
        self.entry_call()?;
        self.code.op(Op::Halt);
        let code = std::mem::take(&mut self.code);
        Ok(code.finish(self.dp))
    }

    /// Diagnostics non fatals accumulés.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> { std::mem::take(&mut self.diags) }

    /// `pushi ret; call main` après toutes les déclarations.
    fn entry_call(&mut self) -> PResult<()> {
        let name = self.opts.entry_point.as_str();
        let sym = self
            .syms
            .lookup(name)
            .ok_or_else(|| CompileError::new(ErrorKind::NoEntryPoint(name.to_owned()), None))?;
        let SymKind::Procedure { params } = &sym.kind else {
            return Err(CompileError::new(ErrorKind::NotAProcedure(name.to_owned()), None));
        };
        if !params.is_empty() {
            return Err(CompileError::new(
                ErrorKind::TooFewArguments { name: name.to_owned(), expected: params.len(), found: 0 },
                None,
            ));
        }
        let entry = sym.addr;
        let ret = self.code.here() + ENTRY_CALL_LEN;
        self.code.op_addr(Op::PushI, ret);
        self.code.op_addr(Op::Call, entry);
        Ok(())
    }

    /* ────────── Curseur ────────── */

    fn skip_eol(&mut self) {
        while self.toks[self.pos].value == TokenKind::Eol && self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> &TokenKind { &self.toks[self.pos].value }

    fn span(&self) -> Span { self.toks[self.pos].span }

    fn check(&self, k: &TokenKind) -> bool { self.peek() == k }

    /// Avance d'un jeton significatif (les fins de ligne sont sautées).
    fn bump(&mut self) -> Token {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        self.skip_eol();
        t
    }

    fn eat(&mut self, k: &TokenKind) -> bool {
        if self.check(k) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, k: &TokenKind, what: &'static str) -> PResult<Span> {
        if self.check(k) { Ok(self.bump().span) } else { Err(self.unexpected(what)) }
    }

    fn expect_ident(&mut self) -> PResult<(String, Span)> {
        let TokenKind::Ident(name) = self.peek() else {
            return Err(self.unexpected("an identifier"));
        };
        let name = name.clone();
        Ok((name, self.bump().span))
    }

    /* ────────── Erreurs / diagnostics ────────── */

    fn unexpected(&self, expected: &'static str) -> CompileError {
        let found = self.peek().to_string();
        CompileError::new(ErrorKind::UnexpectedToken { found, expected }, Some(self.span()))
    }

    fn error(kind: ErrorKind, span: Span) -> CompileError { CompileError::new(kind, Some(span)) }

    /// Alerte non fatale (ou fatale avec `deny_warnings`).
    fn warn(&mut self, kind: ErrorKind, span: Span) -> PResult<()> {
        if self.opts.deny_warnings {
            return Err(Self::error(kind, span));
        }
        let d = Diagnostic::warn(kind.to_string(), Some(span));
        log::warn!("{} at {span}", d.message);
        self.diags.push(d);
        Ok(())
    }

    /// Réserve `size` octets dans le segment de données.
    fn alloc(&mut self, size: u32, span: Span) -> PResult<u32> {
        let addr = self.dp;
        self.dp = addr
            .checked_add(size)
            .filter(|end| i32::try_from(*end).is_ok())
            .ok_or_else(|| Self::error(ErrorKind::DataTooLarge, span))?;
        Ok(addr)
    }

    fn push_scope(&mut self, span: Span) -> PResult<()> {
        self.syms.push_scope().map_err(|k| Self::error(k, span))
    }
}
