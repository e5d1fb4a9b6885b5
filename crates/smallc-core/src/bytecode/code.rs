//! Tampon d'émission append-only et programme final.
//!
//! Un `Hole` désigne un opcode émis avec une opérande provisoire nulle ;
//! on la réécrit plus tard (`patch_*`) quand la cible est connue.

use byteorder::{BigEndian, ByteOrder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytecode::op::{Op, OPERAND_WIDTH};
use crate::{CoreError, CoreResult};

/* ─────────────────────────── Hole ─────────────────────────── */

/// Instruction à opérande provisoire, en attente de back-patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a hole must be patched"]
pub struct Hole {
    at: u32,
}

impl Hole {
    /// Offset de l'opcode.
    pub const fn at(self) -> u32 { self.at }
    /// Offset de l'opérande.
    pub const fn operand_at(self) -> u32 { self.at + 1 }
    /// Offset juste après l'opérande (origine des sauts relatifs).
    pub const fn end(self) -> u32 { self.at + 1 + OPERAND_WIDTH }
}

/* ─────────────────────────── CodeBuf ─────────────────────────── */

/// Tampon de code en cours d'émission.
#[derive(Debug, Clone, Default)]
pub struct CodeBuf {
    buf: Vec<u8>,
}

impl CodeBuf {
    /// Tampon vide.
    pub fn new() -> Self { Self::default() }

    /// Position d'émission courante.
    #[allow(clippy::cast_possible_truncation)]
    pub fn here(&self) -> u32 { self.buf.len() as u32 }

    /// Émet un opcode sans opérande.
    pub fn op(&mut self, op: Op) { self.buf.push(op.byte()); }

    /// Émet un opcode suivi d'une opérande entière.
    pub fn op_i32(&mut self, op: Op, v: i32) {
        self.buf.push(op.byte());
        self.i32(v);
    }

    /// Émet un opcode suivi des bits bruts d'un `f32`.
    pub fn op_f32(&mut self, op: Op, v: f32) {
        self.buf.push(op.byte());
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    /// Émet un opcode avec une opérande nulle à corriger plus tard.
    pub fn hole(&mut self, op: Op) -> Hole {
        let at = self.here();
        self.op_i32(op, 0);
        Hole { at }
    }

    /// Émet un saut en arrière vers `target` (déjà connu).
    pub fn jump_back(&mut self, op: Op, target: u32) {
        let end = self.here() + 1 + OPERAND_WIDTH;
        self.op_i32(op, relative(end, target));
    }

    /// Corrige un saut pour qu'il atterrisse à la position courante.
    pub fn patch_here(&mut self, hole: Hole) -> CoreResult<()> {
        let off = relative(hole.end(), self.here());
        self.patch(hole, off)
    }

    /// Corrige un trou avec une adresse absolue.
    pub fn patch_abs(&mut self, hole: Hole, addr: u32) -> CoreResult<()> {
        let v = i32::try_from(addr).map_err(|_| CoreError::OutOfRange(addr))?;
        self.patch(hole, v)
    }

    fn patch(&mut self, hole: Hole, v: i32) -> CoreResult<()> {
        let at = hole.operand_at() as usize;
        let slot = self
            .buf
            .get_mut(at..at + OPERAND_WIDTH as usize)
            .ok_or(CoreError::OutOfRange(hole.operand_at()))?;
        BigEndian::write_i32(slot, v);
        Ok(())
    }

    /// Lit l'opérande 4 octets à `at`.
    pub fn read_i32(&self, at: u32) -> CoreResult<i32> { read_operand(&self.buf, at) }

    /// Vue en lecture.
    pub fn as_slice(&self) -> &[u8] { &self.buf }

    /// Taille actuelle.
    pub fn len(&self) -> usize { self.buf.len() }

    /// Vrai si rien n'a été émis.
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }

    /// Gèle le tampon en programme exécutable.
    pub fn finish(self, data_size: u32) -> Program { Program { code: self.buf, data_size } }

    fn i32(&mut self, v: i32) { self.buf.extend_from_slice(&v.to_be_bytes()); }
}

/// Offset relatif de `from` (fin d'opérande) vers `to`.
#[allow(clippy::cast_possible_wrap)]
pub const fn relative(from: u32, to: u32) -> i32 { (to as i32).wrapping_sub(from as i32) }

/// Lit une opérande big-endian dans un tampon de code.
pub fn read_operand(code: &[u8], at: u32) -> CoreResult<i32> {
    let at_us = at as usize;
    code.get(at_us..at_us + OPERAND_WIDTH as usize)
        .map(BigEndian::read_i32)
        .ok_or(CoreError::OutOfRange(at))
}

/* ─────────────────────────── Program ─────────────────────────── */

/// Programme compilé : code + taille requise du segment de données.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Program {
    /// Code octet (opcodes + opérandes big-endian).
    pub code: Vec<u8>,
    /// Taille du segment de données en octets.
    pub data_size: u32,
}

impl Program {
    /// Construit un programme.
    pub fn new(code: Vec<u8>, data_size: u32) -> Self { Self { code, data_size } }

    /// Itérateur de décodage sur les instructions.
    pub fn instructions(&self) -> crate::bytecode::disasm::Decoder<'_> {
        crate::bytecode::disasm::Decoder::new(&self.code)
    }
}
