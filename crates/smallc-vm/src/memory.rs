//! Segment de données : octets plats, cellules de 4 octets big-endian.

use byteorder::{BigEndian, ByteOrder};

use crate::RuntimeError;

/// Mémoire des variables, initialisée à zéro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    bytes: Vec<u8>,
}

impl DataSegment {
    /// Segment de `size` octets.
    pub fn new(size: u32) -> Self { Self { bytes: vec![0; size as usize] } }

    /// Taille en octets.
    pub fn len(&self) -> usize { self.bytes.len() }

    /// Segment vide ?
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    /// Octets bruts.
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    fn cell(&self, addr: i32) -> Result<core::ops::Range<usize>, RuntimeError> {
        usize::try_from(addr)
            .ok()
            .and_then(|a| Some(a..a.checked_add(4)?))
            .filter(|r| r.end <= self.bytes.len())
            .ok_or(RuntimeError::DataOutOfBounds(addr))
    }

    /// Lit un entier à `addr`.
    pub fn read_i32(&self, addr: i32) -> Result<i32, RuntimeError> {
        Ok(BigEndian::read_i32(&self.bytes[self.cell(addr)?]))
    }

    /// Lit un flottant à `addr`.
    pub fn read_f32(&self, addr: i32) -> Result<f32, RuntimeError> {
        Ok(BigEndian::read_f32(&self.bytes[self.cell(addr)?]))
    }

    /// Écrit un entier à `addr`.
    pub fn write_i32(&mut self, addr: i32, v: i32) -> Result<(), RuntimeError> {
        let r = self.cell(addr)?;
        BigEndian::write_i32(&mut self.bytes[r], v);
        Ok(())
    }

    /// Écrit un flottant à `addr`.
    pub fn write_f32(&mut self, addr: i32, v: f32) -> Result<(), RuntimeError> {
        let r = self.cell(addr)?;
        BigEndian::write_f32(&mut self.bytes[r], v);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zeroed_and_addressable() {
        let mut d = DataSegment::new(8);
        assert_eq!(d.read_i32(4), Ok(0));
        d.write_i32(4, -2).unwrap();
        assert_eq!(d.as_bytes(), &[0, 0, 0, 0, 0xff, 0xff, 0xff, 0xfe]);
        d.write_f32(0, 1.5).unwrap();
        assert_eq!(d.read_f32(0), Ok(1.5));
    }

    #[test]
    fn bounds() {
        let mut d = DataSegment::new(8);
        assert_eq!(d.read_i32(5), Err(RuntimeError::DataOutOfBounds(5)));
        assert_eq!(d.write_i32(-4, 1), Err(RuntimeError::DataOutOfBounds(-4)));
        assert_eq!(DataSegment::new(0).read_f32(0), Err(RuntimeError::DataOutOfBounds(0)));
    }
}
