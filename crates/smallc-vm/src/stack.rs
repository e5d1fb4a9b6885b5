//! Pile d'opérandes bornée.

use crate::{RuntimeError, Value};

/// Capacité par défaut.
pub const DEFAULT_CAPACITY: usize = 400;

/// Pile de valeurs ; dépasser la capacité ou dépiler à vide est fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    items: Vec<Value>,
    capacity: usize,
}

impl Default for Stack {
    fn default() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }
}

impl Stack {
    /// Pile vide de capacité `capacity`.
    pub fn with_capacity(capacity: usize) -> Self { Self { items: Vec::with_capacity(capacity.min(4096)), capacity } }

    /// Empile.
    pub fn push(&mut self, v: Value) -> Result<(), RuntimeError> {
        if self.items.len() >= self.capacity {
            return Err(RuntimeError::StackOverflow(self.capacity));
        }
        self.items.push(v);
        Ok(())
    }

    /// Dépile.
    pub fn pop(&mut self) -> Result<Value, RuntimeError> { self.items.pop().ok_or(RuntimeError::StackUnderflow) }

    /// Sommet.
    pub fn top(&self) -> Result<Value, RuntimeError> { self.items.last().copied().ok_or(RuntimeError::StackUnderflow) }

    /// Échange les deux valeurs du sommet.
    pub fn exch(&mut self) -> Result<(), RuntimeError> {
        let n = self.items.len();
        if n < 2 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.items.swap(n - 1, n - 2);
        Ok(())
    }

    /// Inverse l'ordre des `n` valeurs du sommet.
    pub fn reverse_top(&mut self, n: usize) -> Result<(), RuntimeError> {
        let len = self.items.len();
        if n > len {
            return Err(RuntimeError::StackUnderflow);
        }
        self.items[len - n..].reverse();
        Ok(())
    }

    /// Profondeur.
    pub fn len(&self) -> usize { self.items.len() }

    /// Vide ?
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Capacité.
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Contenu, du fond vers le sommet.
    pub fn as_slice(&self) -> &[Value] { &self.items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn overflow_and_underflow() {
        let mut s = Stack::with_capacity(2);
        s.push(Value::Int(1)).unwrap();
        s.push(Value::Int(2)).unwrap();
        assert_eq!(s.push(Value::Int(3)), Err(RuntimeError::StackOverflow(2)));
        assert_eq!(s.pop(), Ok(Value::Int(2)));
        assert_eq!(s.pop(), Ok(Value::Int(1)));
        assert_eq!(s.pop(), Err(RuntimeError::StackUnderflow));
        assert_eq!(s.top(), Err(RuntimeError::StackUnderflow));
    }

    #[test]
    fn exch_swaps_top_two() {
        let mut s = Stack::default();
        s.push(Value::Int(1)).unwrap();
        assert_eq!(s.exch(), Err(RuntimeError::StackUnderflow));
        s.push(Value::Real(2.0)).unwrap();
        s.exch().unwrap();
        assert_eq!(s.as_slice(), &[Value::Real(2.0), Value::Int(1)]);
    }

    #[test]
    fn reverse_only_touches_the_top() {
        let mut s = Stack::default();
        for i in 0..5 {
            s.push(Value::Int(i)).unwrap();
        }
        s.reverse_top(3).unwrap();
        let got: Vec<_> = s.as_slice().iter().map(ToString::to_string).collect();
        assert_eq!(got, vec!["0", "1", "4", "3", "2"]);
        assert_eq!(s.reverse_top(6), Err(RuntimeError::StackUnderflow));
        s.reverse_top(0).unwrap();
        assert_eq!(s.len(), 5);
    }

    proptest! {
        #[test]
        fn reverse_twice_is_identity(xs in proptest::collection::vec(any::<i32>(), 0..50), k in 0usize..50) {
            let mut s = Stack::default();
            for x in &xs {
                s.push(Value::Int(*x)).unwrap();
            }
            let n = k.min(xs.len());
            let before = s.clone();
            s.reverse_top(n).unwrap();
            s.reverse_top(n).unwrap();
            prop_assert_eq!(s, before);
        }
    }
}
