//! Décodage des instructions et désassemblage textuel (trace de la CLI).

use core::fmt::{self, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytecode::code::{read_operand, Program};
use crate::bytecode::op::{Op, OperandKind};
use crate::{CoreError, CoreResult};

/// Instruction décodée.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Instr {
    /// Offset de l'opcode.
    pub pc: u32,
    /// L'opcode.
    pub op: Op,
    /// Opérande brute, si l'opcode en porte une.
    pub operand: Option<i32>,
}

impl Instr {
    /// Offset de l'instruction suivante.
    pub const fn next_pc(&self) -> u32 { self.pc + self.op.instr_len() }

    /// Destination absolue d'un saut relatif.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn jump_target(&self) -> Option<u32> {
        match (self.op.operand(), self.operand) {
            (OperandKind::Offset, Some(off)) => Some((self.next_pc() as i32).wrapping_add(off) as u32),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    #[allow(clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(v) = self.operand else { return f.write_str(self.op.mnemonic()) };
        match self.op.operand() {
            OperandKind::Float => write!(f, "{} {:.6}", self.op, f32::from_bits(v as u32)),
            OperandKind::Offset => match self.jump_target() {
                Some(t) => write!(f, "{} {v:+} (-> {t:04})", self.op),
                None => write!(f, "{} {v:+}", self.op),
            },
            OperandKind::Code => write!(f, "{} {v:04}", self.op),
            _ => write!(f, "{} {v}", self.op),
        }
    }
}

/// Décode l'instruction qui commence à `pc`.
pub fn decode_at(code: &[u8], pc: u32) -> CoreResult<Instr> {
    let byte = *code.get(pc as usize).ok_or(CoreError::OutOfRange(pc))?;
    let op = Op::from_byte(byte).ok_or(CoreError::UnknownOpcode { pc, byte })?;
    let operand = match op.operand() {
        OperandKind::None => None,
        _ => Some(
            read_operand(code, pc + 1)
                .map_err(|_| CoreError::TruncatedOperand { pc, op: op.mnemonic() })?,
        ),
    };
    Ok(Instr { pc, op, operand })
}

/// Décodeur linéaire d'un tampon de code ; s'arrête après la première erreur.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    code: &'a [u8],
    pc: u32,
    failed: bool,
}

impl<'a> Decoder<'a> {
    /// Décodeur partant de l'offset 0.
    pub const fn new(code: &'a [u8]) -> Self { Self { code, pc: 0, failed: false } }
}

impl Iterator for Decoder<'_> {
    type Item = CoreResult<Instr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc as usize >= self.code.len() {
            return None;
        }
        match decode_at(self.code, self.pc) {
            Ok(i) => {
                self.pc = i.next_pc();
                Some(Ok(i))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Listing lisible, une instruction par ligne.
pub fn disassemble(program: &Program) -> CoreResult<String> {
    let mut out = String::new();
    let _ = writeln!(out, ";; code: {} bytes, data: {} bytes", program.code.len(), program.data_size);
    for instr in program.instructions() {
        let instr = instr?;
        let _ = writeln!(out, "{:04} | {instr}", instr.pc);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::code::CodeBuf;
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_decodes_operands() {
        let mut c = CodeBuf::new();
        c.op_i32(Op::PushI, 7);
        c.op_f32(Op::FPushI, 1.5);
        let h = c.hole(Op::JFalse);
        c.op(Op::PrintInt);
        c.patch_here(h).unwrap();
        c.op_i32(Op::Call, 0);
        c.op(Op::Halt);
        let text = disassemble(&c.finish(4)).unwrap();
        assert_eq!(
            text,
            ";; code: 22 bytes, data: 4 bytes\n\
             0000 | pushi 7\n\
             0005 | fpushi 1.500000\n\
             0010 | jfalse +1 (-> 0016)\n\
             0015 | printint\n\
             0016 | call 0000\n\
             0021 | halt\n"
        );
    }

    #[test]
    fn unknown_opcode_stops_decoder() {
        let code = [Op::Dup.byte(), 0xff, Op::Dup.byte()];
        let items: Vec<_> = Decoder::new(&code).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(CoreError::UnknownOpcode { pc: 1, byte: 0xff }));
    }

    #[test]
    fn truncated_operand() {
        let code = [Op::PushI.byte(), 0, 0];
        assert_eq!(decode_at(&code, 0), Err(CoreError::TruncatedOperand { pc: 0, op: "pushi" }));
    }

    #[test]
    fn backward_jump_target() {
        let i = Instr { pc: 10, op: Op::Jmp, operand: Some(-15) };
        assert_eq!(i.jump_target(), Some(0));
        assert_eq!(i.to_string(), "jmp -15 (-> 0000)");
    }
}
