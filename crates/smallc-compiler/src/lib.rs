//! smallc-compiler: compilation en une passe du sous-ensemble C vers le bytecode smallc
//!
//! - Entrée : texte source (ou jetons déjà produits par `smallc-lexer`)
//! - Sortie : `smallc_core::Program` (code + taille du segment de données)
//! - Pas d'AST : l'analyse descendante émet le code directement, avec back-patch des sauts
//! - Table des symboles à portées imbriquées (masquage, redéclaration interdite)
//! - Coercions int/char ↔ float aux opérateurs binaires, affectations et appels
//! - Diagnostics : la première erreur est fatale ; les alertes sont collectées
//!
//! API principale :
//! ```
//! use smallc_compiler::{Compiler, CompilerOptions};
//!
//! let mut c = Compiler::new(CompilerOptions::default());
//! let prog = c.compile("void main() { print 1 + 2.5; }").unwrap();
//! assert!(!prog.code.is_empty());
//! ```

#![deny(missing_docs)]

mod emit;
mod error;
mod parser;
mod symtab;
mod types;

pub use error::{CompileError, ErrorKind};
pub use symtab::{Scope, ScopeStack, SymKind, Symbol, ValueType, SCALAR_SIZE};
pub use types::BinOp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use smallc_core::{Program, Span};
use smallc_lexer::{Lexer, LexerOptions, Token};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options du compilateur
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Profondeur maximale de la pile de portées (globale comprise)
    pub max_scope_depth: usize,
    /// Alertes → erreurs
    pub deny_warnings: bool,
    /// Procédure appelée après les déclarations globales
    pub entry_point: String,
    /// Options du scanner
    pub lexer: LexerOptions,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_scope_depth: 100,
            deny_warnings: false,
            entry_point: "main".to_owned(),
            lexer: LexerOptions::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
/* Diagnostics */
// ─────────────────────────────────────────────────────────────────────────────

/// Gravité d’un diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    /// Alerte
    Warning,
    /// Erreur bloquante
    Error,
}

/// Un diagnostic (message, gravité, span optionnel)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Gravité
    pub severity: Severity,
    /// Message humain
    pub message: String,
    /// Localisation
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Construit une erreur
    pub fn error(msg: impl Into<String>, span: Option<Span>) -> Self {
        Self { severity: Severity::Error, message: msg.into(), span }
    }
    /// Construit un warning
    pub fn warn(msg: impl Into<String>, span: Option<Span>) -> Self {
        Self { severity: Severity::Warning, message: msg.into(), span }
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self { Self::error(e.kind.to_string(), e.span) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Façade
// ─────────────────────────────────────────────────────────────────────────────

/// Compilateur (réutilisable ; les diagnostics s'accumulent entre appels).
#[derive(Debug, Default)]
pub struct Compiler {
    opts: CompilerOptions,
    diags: Vec<Diagnostic>,
}

impl Compiler {
    /// Nouveau compilateur.
    pub fn new(opts: CompilerOptions) -> Self { Self { opts, diags: Vec::new() } }

    /// Options courantes.
    pub const fn options(&self) -> &CompilerOptions { &self.opts }

    /// Scanne puis compile une source.
    pub fn compile(&mut self, src: &str) -> Result<Program, CompileError> {
        let toks = Lexer::with_options(src, self.opts.lexer).tokenize()?;
        self.compile_tokens(toks)
    }

    /// Compile une suite de jetons (fins de ligne comprises).
    pub fn compile_tokens(&mut self, toks: Vec<Token>) -> Result<Program, CompileError> {
        let mut p = parser::Parser::new(toks, &self.opts);
        let res = p.run();
        self.diags.append(&mut p.take_diagnostics());
        match &res {
            Ok(prog) => log::info!("compiled: {} bytes of code, {} bytes of data", prog.code.len(), prog.data_size),
            Err(e) => log::debug!("compilation failed: {e}"),
        }
        res
    }

    /// Diagnostics non fatals collectés.
    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diags }

    /// Vide et rend les diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> { std::mem::take(&mut self.diags) }
}

/// Compile avec les options par défaut.
pub fn compile(src: &str) -> Result<Program, CompileError> { Compiler::default().compile(src) }
