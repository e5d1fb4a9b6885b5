//! Table des symboles : une table par portée, empilées (la plus interne en dernier).
//!
//! - recherche de l'intérieur vers l'extérieur, premier trouvé gagne (masquage)
//! - redéclaration interdite dans une même portée
//! - profondeur bornée (`max_depth`, 100 par défaut)

use core::fmt;

use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use smallc_lexer::{Keyword, TokenKind};

use crate::error::ErrorKind;

/// Taille en octets d'un scalaire (int, float, char).
pub const SCALAR_SIZE: u32 = 4;

/* ─────────────────────────── Types ─────────────────────────── */

/// Type d'une valeur (scalaire ou élément de tableau).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    /// `int`
    Int,
    /// `float`
    Real,
    /// `char` (même représentation que `int`)
    Char,
}

impl ValueType {
    /// `int` ou `char`.
    pub const fn is_integral(self) -> bool { matches!(self, Self::Int | Self::Char) }

    /// Type désigné par un mot-clé de déclaration.
    pub const fn from_token(tok: &TokenKind) -> Option<Self> {
        match tok {
            TokenKind::Kw(Keyword::Int) => Some(Self::Int),
            TokenKind::Kw(Keyword::Float) => Some(Self::Real),
            TokenKind::Kw(Keyword::Char) => Some(Self::Char),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Real => "float",
            Self::Char => "char",
        })
    }
}

/// Nature d'un symbole.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SymKind {
    /// Variable scalaire.
    Scalar(ValueType),
    /// Tableau de `len` éléments.
    Array {
        /// Type des éléments.
        elem: ValueType,
        /// Nombre d'éléments (≥ 1).
        len: u32,
    },
    /// Procédure (toujours `void`).
    Procedure {
        /// Types des paramètres, dans l'ordre.
        params: Vec<ValueType>,
    },
}

/// Entrée de la table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol {
    /// Nom.
    pub name: String,
    /// Nature.
    pub kind: SymKind,
    /// Taille en octets dans le segment de données (0 pour une procédure).
    pub size: u32,
    /// Adresse : octet du segment de données, ou point d'entrée dans le code.
    pub addr: u32,
    /// Ligne de déclaration.
    pub line: u32,
}

impl Symbol {
    /// Variable scalaire.
    pub fn scalar(name: impl Into<String>, ty: ValueType, addr: u32, line: u32) -> Self {
        Self { name: name.into(), kind: SymKind::Scalar(ty), size: SCALAR_SIZE, addr, line }
    }

    /// Tableau ; `size` = `len * SCALAR_SIZE`, calculé par l'appelant.
    pub fn array(name: impl Into<String>, elem: ValueType, len: u32, size: u32, addr: u32, line: u32) -> Self {
        Self { name: name.into(), kind: SymKind::Array { elem, len }, size, addr, line }
    }

    /// Procédure d'entrée `entry`.
    pub fn procedure(name: impl Into<String>, params: Vec<ValueType>, entry: u32, line: u32) -> Self {
        Self { name: name.into(), kind: SymKind::Procedure { params }, size: 0, addr: entry, line }
    }

    /// Nombre d'éléments (1 pour un scalaire).
    pub const fn elem_count(&self) -> u32 {
        match self.kind {
            SymKind::Array { len, .. } => len,
            _ => 1,
        }
    }
}

/* ─────────────────────────── Pile de portées ─────────────────────────── */

/// Une portée : noms dans l'ordre de déclaration.
pub type Scope = IndexMap<String, Symbol>;

/// Pile de tables de symboles.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    max_depth: usize,
}

impl ScopeStack {
    /// Pile contenant la seule portée globale.
    pub fn new(max_depth: usize) -> Self { Self { scopes: vec![Scope::new()], max_depth } }

    /// Nombre de portées ouvertes (globale comprise).
    pub fn depth(&self) -> usize { self.scopes.len() }

    /// Ouvre une portée.
    pub fn push_scope(&mut self) -> Result<(), ErrorKind> {
        if self.scopes.len() >= self.max_depth {
            return Err(ErrorKind::ScopeOverflow(self.max_depth));
        }
        self.scopes.push(Scope::new());
        Ok(())
    }

    /// Ferme la portée la plus interne et rend ses symboles.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        let s = self.scopes.pop();
        if let Some(s) = &s {
            log::trace!("scope closed ({} symbols)", s.len());
        }
        s
    }

    /// Déclare un symbole dans la portée courante.
    pub fn install(&mut self, sym: Symbol) -> Result<&Symbol, ErrorKind> {
        let scope = self.scopes.last_mut().ok_or(ErrorKind::ScopeOverflow(self.max_depth))?;
        if let Some(prev) = scope.get(&sym.name) {
            return Err(ErrorKind::Redeclared { name: sym.name, line: prev.line });
        }
        let (idx, _) = scope.insert_full(sym.name.clone(), sym);
        Ok(&scope[idx])
    }

    /// Recherche dans la seule portée courante.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> { self.scopes.last()?.get(name) }

    /// Recherche de la portée la plus interne vers la globale.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shadowing_resolves_innermost() {
        let mut st = ScopeStack::new(100);
        st.install(Symbol::scalar("j", ValueType::Int, 0, 1)).unwrap();
        st.push_scope().unwrap();
        st.install(Symbol::scalar("j", ValueType::Real, 4, 2)).unwrap();
        assert_eq!(st.lookup("j").unwrap().addr, 4);
        st.pop_scope();
        assert_eq!(st.lookup("j").unwrap().addr, 0);
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut st = ScopeStack::new(100);
        st.install(Symbol::scalar("x", ValueType::Int, 0, 3)).unwrap();
        let err = st.install(Symbol::scalar("x", ValueType::Char, 4, 5)).unwrap_err();
        assert_eq!(err, ErrorKind::Redeclared { name: "x".into(), line: 3 });
    }

    #[test]
    fn lookup_local_ignores_outer() {
        let mut st = ScopeStack::new(100);
        st.install(Symbol::scalar("g", ValueType::Int, 0, 1)).unwrap();
        st.push_scope().unwrap();
        assert!(st.lookup_local("g").is_none());
        assert!(st.lookup("g").is_some());
        assert!(st.lookup("nope").is_none());
    }

    #[test]
    fn popped_scope_returns_its_symbols_in_order() {
        let mut st = ScopeStack::new(100);
        st.push_scope().unwrap();
        st.install(Symbol::scalar("b", ValueType::Int, 0, 1)).unwrap();
        st.install(Symbol::scalar("a", ValueType::Int, 4, 1)).unwrap();
        let names: Vec<_> = st.pop_scope().unwrap().into_keys().collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn depth_is_bounded() {
        let mut st = ScopeStack::new(3);
        st.push_scope().unwrap();
        st.push_scope().unwrap();
        assert_eq!(st.depth(), 3);
        assert_eq!(st.push_scope(), Err(ErrorKind::ScopeOverflow(3)));
    }

    #[test]
    fn symbol_len() {
        assert_eq!(Symbol::array("a", ValueType::Int, 5, 20, 0, 1).elem_count(), 5);
        assert_eq!(Symbol::scalar("s", ValueType::Int, 0, 1).elem_count(), 1);
        assert_eq!(Symbol::procedure("p", vec![], 0, 1).elem_count(), 1);
    }
}
