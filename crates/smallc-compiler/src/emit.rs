//! Émetteur : `CodeBuf` + trace de chaque instruction générée.

use smallc_core::{decode_at, CodeBuf, Hole, Op, Program};

use crate::error::CompileError;

/// Tampon de code du compilateur ; chaque instruction est tracée au niveau `debug`.
#[derive(Debug, Default)]
pub struct Emitter {
    buf: CodeBuf,
}

impl Emitter {
    /// Position d'émission courante.
    pub fn here(&self) -> u32 { self.buf.here() }

    /// Opcode seul.
    pub fn op(&mut self, op: Op) {
        let pc = self.here();
        self.buf.op(op);
        self.trace(pc);
    }

    /// Opcode + entier.
    pub fn op_i32(&mut self, op: Op, v: i32) {
        let pc = self.here();
        self.buf.op_i32(op, v);
        self.trace(pc);
    }

    /// Opcode + opérande non signée (adresse de données ou de code, taille).
    #[allow(clippy::cast_possible_wrap)]
    pub fn op_addr(&mut self, op: Op, addr: u32) { self.op_i32(op, addr as i32); }

    /// `fpushi` d'un littéral flottant.
    pub fn op_f32(&mut self, op: Op, v: f32) {
        let pc = self.here();
        self.buf.op_f32(op, v);
        self.trace(pc);
    }

    /// Opcode à opérande provisoire.
    pub fn hole(&mut self, op: Op) -> Hole {
        let h = self.buf.hole(op);
        self.trace(h.at());
        h
    }

    /// Saut en arrière vers une position connue.
    pub fn jump_back(&mut self, op: Op, target: u32) {
        let pc = self.here();
        self.buf.jump_back(op, target);
        self.trace(pc);
    }

    /// Fait pointer un saut sur la position courante.
    pub fn patch_here(&mut self, hole: Hole) -> Result<(), CompileError> {
        self.buf.patch_here(hole)?;
        self.trace_patch(hole);
        Ok(())
    }

    /// Écrit une adresse absolue dans un trou.
    pub fn patch_abs(&mut self, hole: Hole, addr: u32) -> Result<(), CompileError> {
        self.buf.patch_abs(hole, addr)?;
        self.trace_patch(hole);
        Ok(())
    }

    /// Code émis jusqu'ici.
    pub fn as_slice(&self) -> &[u8] { self.buf.as_slice() }

    /// Programme final.
    pub fn finish(self, data_size: u32) -> Program { self.buf.finish(data_size) }

    fn trace(&self, pc: u32) {
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(i) = decode_at(self.buf.as_slice(), pc) {
                log::debug!("{pc:04} | {i}");
            }
        }
    }

    fn trace_patch(&self, hole: Hole) {
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(i) = decode_at(self.buf.as_slice(), hole.at()) {
                log::debug!("{:04} | {i}    ;; patched", hole.at());
            }
        }
    }
}
