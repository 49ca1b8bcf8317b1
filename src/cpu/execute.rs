//! CPU execution engine for the LMC.
//!
//! Implements the fetch-decode-execute cycle, the bounds-checked memory
//! primitives the instructions are built from, and extension gating.

use std::fmt;
use std::marker::PhantomData;
use crate::asm::assembler;
use crate::config::Config;
use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, CodeOrData, Extension, Instruction, IoOp, Opcode};
use crate::cpu::memory::MemoryError;
use crate::cpu::word::{Architecture, Decimal, Word};
use crate::io::{IoError, IoPort};
use crate::LmcError;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT instruction).
    Halted,
}

/// Which kind of memory access went out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
    Jump,
    InstructionPointer,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Access::Read => "attempt to read",
            Access::Write => "attempt to write",
            Access::Jump => "program branched",
            Access::InstructionPointer => "instruction pointer went",
        };
        f.write_str(what)
    }
}

/// A Little Man Computer.
///
/// `P` is the I/O port the machine reads and prints through, `A` the
/// memory layout and word encoding.
pub struct Machine<P: IoPort, A: Architecture = Decimal> {
    /// CPU registers.
    regs: Registers,
    /// Main memory.
    mem: Memory,
    /// Memory as loaded, for [`reset`](Self::reset).
    initial: Memory,
    config: Config,
    /// Current execution state.
    state: CpuState,
    /// Instruction count.
    cycles: u64,
    /// Last decoded instruction (for debugging).
    last_instr: Option<Instruction>,
    port: P,
    arch: PhantomData<A>,
}

/// Machine state at one point in time, for dumps and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub architecture: &'static str,
    pub state: CpuState,
    pub cycles: u64,
    pub registers: Registers,
    pub last_instruction: Option<Instruction>,
    pub memory: Vec<Word>,
}

impl<P: IoPort> Machine<P> {
    /// Create a decimal machine from an initial memory image.
    pub fn new(image: &[Word], config: Config, port: P) -> Result<Self, MemoryError> {
        Self::load(image, config, port)
    }

    /// Assemble `source` and load it into a decimal machine.
    pub fn from_source(source: &str, config: Config, port: P) -> Result<Self, LmcError> {
        Self::load_source(source, config, port)
    }

    /// Load a list of instructions and data words into a decimal machine.
    pub fn from_items(items: &[CodeOrData], config: Config, port: P) -> Result<Self, MemoryError> {
        Self::load_items(items, config, port)
    }
}

impl<P: IoPort, A: Architecture> Machine<P, A> {
    /// Create a machine from an initial memory image.
    ///
    /// The image is zero-padded to the memory size; an image longer than
    /// the memory is rejected here rather than at run time.
    pub fn load(image: &[Word], config: Config, port: P) -> Result<Self, MemoryError> {
        let mem = Memory::with_image(image, A::MEMORY_SIZE)?;
        Ok(Self {
            regs: Registers::new(),
            initial: mem.clone(),
            mem,
            config,
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            port,
            arch: PhantomData,
        })
    }

    /// Assemble `source` with `config` and load the result.
    pub fn load_source(source: &str, config: Config, port: P) -> Result<Self, LmcError> {
        let program = assembler::assemble::<A>(source, &config)?;
        Ok(Self::load(&program.image, config, port)?)
    }

    /// Encode `items` in order and load them.
    pub fn load_items(items: &[CodeOrData], config: Config, port: P) -> Result<Self, MemoryError> {
        let image: Vec<Word> = items.iter().map(|item| item.encode::<A>()).collect();
        Self::load(&image, config, port)
    }

    /// Reset registers, counters and memory to the state right after loading.
    ///
    /// The I/O port is kept as it is, including its character-line state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem = self.initial.clone();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. A step either completes
    /// or, on error, leaves registers, memory and counters as they were.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let saved_regs = self.regs.clone();
        let saved_cycles = self.cycles;
        let saved_instr = self.last_instr;

        match self.cycle() {
            Ok(instr) => Ok(instr),
            Err(e) => {
                self.regs = saved_regs;
                self.cycles = saved_cycles;
                self.last_instr = saved_instr;
                Err(e)
            }
        }
    }

    fn cycle(&mut self) -> Result<Instruction, CpuError> {
        // Fetch
        let ip = self.normalize_addr(self.regs.ip as i64, Access::InstructionPointer)?;
        let raw = self.mem.read(ip);
        self.regs.cir = Some(raw);
        self.regs.jump(ip);
        self.regs.advance_ip();
        self.cycles += 1;

        // Decode
        let instr = decode::decode::<A>(raw);
        self.last_instr = Some(instr);

        // Execute
        self.execute(instr)?;

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            // ==================== Control ====================

            Instruction::Hlt(_) => self.halt(),

            // ==================== Arithmetic ====================

            Instruction::Add(addr) => {
                let operand = self.get(addr.into())?;
                self.set_acc(self.regs.acc.wrapping_add(operand));
            }

            Instruction::Sub(addr) => {
                let operand = self.get(addr.into())?;
                self.set_acc(self.regs.acc.wrapping_sub(operand));
            }

            // ==================== Data Transfer ====================

            Instruction::Sta(addr) => {
                self.set(addr.into(), self.regs.acc)?;
            }

            Instruction::Lda(addr) => {
                let value = self.get(addr.into())?;
                self.set_acc(value);
            }

            // ==================== Branches ====================

            Instruction::Bra(addr) => {
                self.jmp(addr.into())?;
            }

            Instruction::Brz(addr) => {
                if self.regs.acc == 0 {
                    self.jmp(addr.into())?;
                }
            }

            Instruction::Brp(addr) => {
                // Zero counts as positive on the LMC
                if self.regs.acc >= 0 {
                    self.jmp(addr.into())?;
                }
            }

            // ==================== I/O ====================

            Instruction::Io(op) => self.execute_io(op)?,

            Instruction::Invalid { opcode, operand } => {
                return Err(CpuError::InvalidOpcode { opcode, operand });
            }
        }

        Ok(())
    }

    fn execute_io(&mut self, op: IoOp) -> Result<(), CpuError> {
        match op {
            IoOp::Input => {
                let range = self.config.wrap_values.then_some(A::MIN_VALUE..=A::MAX_VALUE);
                let value = self.port.read_num(range)?;
                self.set_acc(value);
            }

            IoOp::Output => {
                self.port.write_num(self.regs.acc)?;
            }

            IoOp::OutputChar => {
                self.expect_extension(Extension::OutputChar)?;
                self.port.write_char(self.regs.acc)?;
            }

            IoOp::Invalid(operand) => {
                return Err(CpuError::InvalidOperand { opcode: Opcode::IO, operand });
            }
        }

        Ok(())
    }

    // ==================== Primitives used by instructions ====================

    /// Read memory at `addr`.
    pub fn get(&self, addr: i64) -> Result<Word, CpuError> {
        let index = self.normalize_addr(addr, Access::Read)?;
        Ok(self.mem.read(index))
    }

    /// Write `value` (normalized) to memory at `addr`.
    pub fn set(&mut self, addr: i64, value: Word) -> Result<(), CpuError> {
        let index = self.normalize_addr(addr, Access::Write)?;
        let value = self.normalize_value(value);
        self.mem.write(index, value);
        Ok(())
    }

    /// The accumulator.
    pub fn acc(&self) -> Word {
        self.regs.acc
    }

    /// Write the accumulator, normalizing the value like [`set`](Self::set).
    pub fn set_acc(&mut self, value: Word) {
        self.regs.acc = self.normalize_value(value);
    }

    /// Continue execution at `addr`.
    pub fn jmp(&mut self, addr: i64) -> Result<(), CpuError> {
        let index = self.normalize_addr(addr, Access::Jump)?;
        self.regs.jump(index);
        Ok(())
    }

    /// Stop the machine.
    pub fn halt(&mut self) {
        self.state = CpuState::Halted;
    }

    /// Map `addr` to a memory index.
    ///
    /// In-bounds addresses pass through. Others wrap modulo the memory size
    /// when `wrap_memory` is set and fail with an `access`-specific error
    /// when it is not.
    pub fn normalize_addr(&self, addr: i64, access: Access) -> Result<usize, CpuError> {
        let size = self.mem.len();
        if let Ok(index) = usize::try_from(addr) {
            if index < size {
                return Ok(index);
            }
        }

        if self.config.wrap_memory {
            // rem_euclid of a positive size lies in 0..size
            return Ok(addr.rem_euclid(size as i64) as usize);
        }

        Err(CpuError::OutOfBounds { access, addr, size })
    }

    /// Bring `value` into the value range if `wrap_values` is set.
    pub fn normalize_value(&self, value: Word) -> Word {
        if self.config.wrap_values {
            A::wrap_value(value)
        } else {
            value
        }
    }

    /// Check whether an extension is enabled.
    pub fn is_extension_enabled(&self, ext: Extension) -> bool {
        match ext {
            Extension::OutputChar => self.config.extensions,
        }
    }

    /// Fail unless `ext` is enabled.
    pub fn expect_extension(&self, ext: Extension) -> Result<(), CpuError> {
        if self.is_extension_enabled(ext) {
            Ok(())
        } else {
            Err(CpuError::ExtensionDisabled(ext))
        }
    }

    // ==================== Inspection ====================

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    /// Instructions executed since loading or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            architecture: A::NAME,
            state: self.state,
            cycles: self.cycles,
            registers: self.regs.clone(),
            last_instruction: self.last_instr,
            memory: self.mem.cells().to_vec(),
        }
    }
}

impl<P: IoPort, A: Architecture> fmt::Debug for Machine<P, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("architecture", &A::NAME)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{access} outside of memory (address {addr}, memory size {size}) (hint: enable `wrap_memory` to wrap addresses)")]
    OutOfBounds { access: Access, addr: i64, size: usize },

    #[error("invalid instruction: opcode {opcode} does not exist (operand {operand})")]
    InvalidOpcode { opcode: i64, operand: u32 },

    #[error("invalid operand {operand} for opcode {opcode} (INP/OUT/OTC)")]
    InvalidOperand { opcode: i64, operand: u32 },

    #[error("{0} is not enabled (hint: set `{flag}` to enable it)", flag = .0.flag())]
    ExtensionDisabled(Extension),

    #[error("i/o error: {0}")]
    Io(#[from] IoError),
}
