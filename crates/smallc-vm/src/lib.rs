//! smallc-vm: exécution du bytecode smallc
//!
//! - `Vm`        : boucle fetch/decode/execute sur un `Program`
//! - `Stack`     : pile d'opérandes bornée (400 par défaut)
//! - `DataSegment` : mémoire plate des variables, dimensionnée à la compilation
//! - `Value`     : `Int` / `Real`, les `char` partagent la représentation entière
//!
//! Conventions :
//! - opérandes 4 octets big-endian, sauts relatifs à la fin de l'opérande ;
//! - `call` ne pousse rien : l'appelant a déjà empilé l'adresse de retour,
//!   que `return` dépile ;
//! - toute faute (pile, division par zéro, adresse hors segment) arrête la VM.
//!
//! La sortie des `print` va dans un `Write` fourni (stdout, `Vec<u8>` en tests).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

mod memory;
mod stack;
mod value;

use std::io::{self, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use smallc_core::{decode_at, CoreError, Instr, Op, Program};

pub use memory::DataSegment;
pub use stack::{Stack, DEFAULT_CAPACITY};
pub use value::Value;

/* ------------------------------ Erreurs ------------------------------ */

/// Fautes d'exécution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Pile pleine.
    #[error("Runtime stack is past its capacity ({0})")]
    StackOverflow(usize),
    /// Pile vide.
    #[error("pop() failed (stack is empty)")]
    StackUnderflow,
    /// Division ou modulo par zéro.
    #[error("division by zero")]
    DivisionByZero,
    /// Octet de code invalide.
    #[error(transparent)]
    Decode(#[from] CoreError),
    /// Accès hors du segment de données.
    #[error("data address {0} out of bounds")]
    DataOutOfBounds(i32),
    /// Adresse de code hors du programme.
    #[error("code address {0} out of bounds")]
    CodeOutOfBounds(i64),
    /// Tag inattendu.
    #[error("type mismatch: expected {expected}, found {} {found}", .found.kind())]
    TypeMismatch {
        /// Tag attendu.
        expected: &'static str,
        /// Valeur trouvée.
        found: Value,
    },
    /// Budget d'instructions épuisé.
    #[error("step limit of {0} instructions reached")]
    StepLimit(u64),
    /// Écriture de la sortie.
    #[error("output: {0}")]
    Io(io::ErrorKind),
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self { Self::Io(e.kind()) }
}

/// Faute localisée sur l'instruction fautive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} (pc {pc:04})")]
pub struct VmError {
    /// Offset de l'instruction.
    pub pc: u32,
    /// Nature.
    #[source]
    pub kind: RuntimeError,
}

/// Résultat d'une instruction.
pub type RResult<T> = Result<T, RuntimeError>;

/* ------------------------------ Options ------------------------------ */

/// Réglages de la VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VmOptions {
    /// Capacité de la pile d'opérandes.
    pub stack_capacity: usize,
    /// Nombre maximal d'instructions (aucun par défaut).
    pub max_steps: Option<u64>,
}

impl Default for VmOptions {
    fn default() -> Self { Self { stack_capacity: DEFAULT_CAPACITY, max_steps: None } }
}

/* -------------------------------- VM -------------------------------- */

/// Machine à pile exécutant un `Program`.
pub struct Vm<'p, W: Write> {
    code: &'p [u8],
    pc: u32,
    stack: Stack,
    data: DataSegment,
    out: W,
    opts: VmOptions,
    steps: u64,
    halted: bool,
}

impl<'p, W: Write> Vm<'p, W> {
    /// VM prête à exécuter `program` depuis l'offset 0.
    pub fn new(program: &'p Program, out: W, opts: VmOptions) -> Self {
        Self {
            code: &program.code,
            pc: 0,
            stack: Stack::with_capacity(opts.stack_capacity),
            data: DataSegment::new(program.data_size),
            out,
            opts,
            steps: 0,
            halted: false,
        }
    }

    /// Exécute jusqu'à `halt`.
    pub fn run(&mut self) -> Result<(), VmError> {
        log::debug!("vm: {} bytes of code, {} bytes of data", self.code.len(), self.data.len());
        while !self.halted {
            let pc = self.pc;
            self.step().map_err(|kind| VmError { pc, kind })?;
        }
        self.out.flush().map_err(|e| VmError { pc: self.pc, kind: e.into() })?;
        log::info!("vm: halted after {} instructions", self.steps);
        Ok(())
    }

    /// Exécute une instruction.
    pub fn step(&mut self) -> RResult<()> {
        if self.halted {
            return Ok(());
        }
        if let Some(limit) = self.opts.max_steps {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimit(limit));
            }
        }
        if self.pc as usize >= self.code.len() {
            return Err(RuntimeError::CodeOutOfBounds(i64::from(self.pc)));
        }
        let instr = decode_at(self.code, self.pc)?;
        log::trace!("{:04} | {instr} ; depth {}", instr.pc, self.stack.len());
        self.pc = instr.next_pc();
        self.steps += 1;
        self.exec(instr)
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn exec(&mut self, instr: Instr) -> RResult<()> {
        let arg = instr.operand.unwrap_or(0);
        match instr.op {
            /* ── Pile / mémoire ── */
            Op::Push => {
                let v = self.data.read_i32(arg)?;
                self.stack.push(Value::Int(v))?;
            }
            Op::FPush => {
                let v = self.data.read_f32(arg)?;
                self.stack.push(Value::Real(v))?;
            }
            Op::PushI => self.stack.push(Value::Int(arg))?,
            Op::FPushI => self.stack.push(Value::Real(f32::from_bits(arg as u32)))?,
            Op::Pop => {
                let v = self.pop_int()?;
                self.data.write_i32(arg, v)?;
            }
            Op::FPop => {
                let v = self.pop_real()?;
                self.data.write_f32(arg, v)?;
            }
            Op::Dup => {
                let v = self.stack.top()?;
                self.stack.push(v)?;
            }
            Op::Exch => self.stack.exch()?,
            Op::Remove => {
                self.stack.pop()?;
            }
            Op::Reverse => {
                let n = usize::try_from(arg).map_err(|_| RuntimeError::StackUnderflow)?;
                self.stack.reverse_top(n)?;
            }
            Op::Put => {
                let v = self.pop_int()?;
                let addr = self.pop_int()?;
                self.data.write_i32(addr, v)?;
            }
            Op::FPut => {
                let v = self.pop_real()?;
                let addr = self.pop_int()?;
                self.data.write_f32(addr, v)?;
            }
            Op::Get => {
                let addr = self.pop_int()?;
                let v = self.data.read_i32(addr)?;
                self.stack.push(Value::Int(v))?;
            }
            Op::FGet => {
                let addr = self.pop_int()?;
                let v = self.data.read_f32(addr)?;
                self.stack.push(Value::Real(v))?;
            }

            /* ── Arithmétique ── */
            Op::Neg => {
                let v = self.pop_int()?;
                self.stack.push(Value::Int(v.wrapping_neg()))?;
            }
            Op::FNeg => {
                let v = self.pop_real()?;
                self.stack.push(Value::Real(-v))?;
            }
            Op::Add => self.int_op(|a, b| Ok(a.wrapping_add(b)))?,
            Op::Sub => self.int_op(|a, b| Ok(a.wrapping_sub(b)))?,
            Op::Mul => self.int_op(|a, b| Ok(a.wrapping_mul(b)))?,
            Op::Div => self.int_op(|a, b| if b == 0 { Err(RuntimeError::DivisionByZero) } else { Ok(a.wrapping_div(b)) })?,
            Op::Mod => self.int_op(|a, b| if b == 0 { Err(RuntimeError::DivisionByZero) } else { Ok(a.wrapping_rem(b)) })?,
            Op::FAdd => self.real_op(|a, b| Ok(a + b))?,
            Op::FSub => self.real_op(|a, b| Ok(a - b))?,
            Op::FMul => self.real_op(|a, b| Ok(a * b))?,
            Op::FDiv => self.real_op(|a, b| if b == 0.0 { Err(RuntimeError::DivisionByZero) } else { Ok(a / b) })?,
            Op::ConvToFloat => {
                let v = self.pop_int()?;
                self.stack.push(Value::Real(v as f32))?;
            }
            Op::ConvToInt => {
                let v = self.pop_real()?;
                self.stack.push(Value::Int(v as i32))?;
            }

            /* ── Logique / comparaisons ── */
            Op::And => self.logic_op(|a, b| a && b)?,
            Op::Or => self.logic_op(|a, b| a || b)?,
            Op::Eq => self.cmp_op(core::cmp::Ordering::is_eq)?,
            Op::Neq => self.cmp_op(core::cmp::Ordering::is_ne)?,
            Op::Less => self.cmp_op(core::cmp::Ordering::is_lt)?,
            Op::Leq => self.cmp_op(core::cmp::Ordering::is_le)?,
            Op::Greater => self.cmp_op(core::cmp::Ordering::is_gt)?,
            Op::Geq => self.cmp_op(core::cmp::Ordering::is_ge)?,

            /* ── Contrôle ── */
            Op::Jmp => self.jump(arg)?,
            Op::JFalse => {
                if !self.stack.pop()?.truthy() {
                    self.jump(arg)?;
                }
            }
            Op::JTrue => {
                if self.stack.pop()?.truthy() {
                    self.jump(arg)?;
                }
            }
            Op::Call => self.goto(i64::from(arg))?,
            Op::Return => {
                let ret = self.pop_int()?;
                self.goto(i64::from(ret))?;
            }
            Op::Halt => self.halted = true,

            /* ── Sortie ── */
            Op::PrintInt => {
                let v = self.pop_int()?;
                write!(self.out, "{v}")?;
            }
            Op::PrintFloat => {
                let v = self.pop_real()?;
                write!(self.out, "{v:.6}")?;
            }
            Op::PrintChar => {
                let v = self.pop_int()?;
                self.out.write_all(&[v as u8])?;
            }
            Op::PrintLn => self.out.write_all(b"\n")?,
        }
        Ok(())
    }

    /* ────────── Utilitaires ────────── */

    fn pop_int(&mut self) -> RResult<i32> { i32::try_from(self.stack.pop()?) }

    fn pop_real(&mut self) -> RResult<f32> { f32::try_from(self.stack.pop()?) }

    /// Dépile droite puis gauche.
    fn int_op(&mut self, f: impl FnOnce(i32, i32) -> RResult<i32>) -> RResult<()> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.stack.push(Value::Int(f(a, b)?))
    }

    fn real_op(&mut self, f: impl FnOnce(f32, f32) -> RResult<f32>) -> RResult<()> {
        let b = self.pop_real()?;
        let a = self.pop_real()?;
        self.stack.push(Value::Real(f(a, b)?))
    }

    fn logic_op(&mut self, f: impl FnOnce(bool, bool) -> bool) -> RResult<()> {
        let b = self.stack.pop()?.truthy();
        let a = self.stack.pop()?.truthy();
        self.stack.push(Value::from(f(a, b)))
    }

    /// NaN ⇒ faux pour toute comparaison sauf `!=`.
    fn cmp_op(&mut self, f: impl Fn(core::cmp::Ordering) -> bool) -> RResult<()> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        let r = a.compare(b).map_or_else(|| f(core::cmp::Ordering::Less) && f(core::cmp::Ordering::Greater), &f);
        self.stack.push(Value::from(r))
    }

    /// Saut relatif à la fin de l'opérande (déjà atteinte par `pc`).
    fn jump(&mut self, offset: i32) -> RResult<()> { self.goto(i64::from(self.pc) + i64::from(offset)) }

    fn goto(&mut self, target: i64) -> RResult<()> {
        match u32::try_from(target) {
            Ok(t) if (t as usize) < self.code.len() => {
                self.pc = t;
                Ok(())
            }
            _ => Err(RuntimeError::CodeOutOfBounds(target)),
        }
    }

    /* ────────── Introspection ────────── */

    /// Pointeur d'instruction.
    pub const fn pc(&self) -> u32 { self.pc }

    /// Pile d'opérandes.
    pub const fn stack(&self) -> &Stack { &self.stack }

    /// Segment de données.
    pub const fn data(&self) -> &DataSegment { &self.data }

    /// Instructions exécutées.
    pub const fn steps(&self) -> u64 { self.steps }

    /// `halt` atteint ?
    pub const fn halted(&self) -> bool { self.halted }

    /// Rend la sortie.
    pub fn into_output(self) -> W { self.out }
}

/// Exécute `program` avec les options par défaut et rend la sortie produite.
pub fn run_to_string(program: &Program) -> Result<String, VmError> {
    let mut vm = Vm::new(program, Vec::new(), VmOptions::default());
    vm.run()?;
    Ok(String::from_utf8_lossy(&vm.into_output()).into_owned())
}

#[cfg(test)]
mod tests;
