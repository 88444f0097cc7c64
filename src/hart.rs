//! The fetch-decode-execute loop.
//!
//! A single hart, one privilege level, the whole address space is
//! main memory. Unlike the draft this is built from, a failed fetch,
//! decode or memory access produces a `Fault` the caller can inspect
//! rather than an `assert` that kills the process.

use thiserror::Error;

use crate::decode::{decode, BranchOp, Decoded, DecodeError, LoadOp, RegImmOp, RegRegOp, ShiftImmOp, StoreOp};
use crate::memory::{Memory, MemoryFault};
use crate::registers::RegisterFile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Fault {
    #[error("memory fault: {0}")]
    Memory(#[from] MemoryFault),
    #[error("decode fault: {0}")]
    Decode(#[from] DecodeError),
}

pub struct Hart {
    pub pc: u64,
    pub registers: RegisterFile,
}

impl Hart {
    pub fn new(pc: u64) -> Self {
        Hart {
            pc,
            registers: RegisterFile::new(),
        }
    }

    /// Run a single fetch-decode-execute cycle against `mem`.
    pub fn step(&mut self, mem: &mut Memory) -> Result<(), Fault> {
        let raw = mem.read_word(self.pc)?;
        let decoded = decode(raw)?;
        self.execute(decoded, mem)?;
        Ok(())
    }

    /// Run until the first fault, returning it. There is no normal
    /// termination condition for a freestanding RV64I program.
    pub fn run(&mut self, mem: &mut Memory) -> Fault {
        loop {
            if let Err(fault) = self.step(mem) {
                return fault;
            }
        }
    }

    fn execute(&mut self, decoded: Decoded, mem: &mut Memory) -> Result<(), Fault> {
        let mut next_pc = self.pc.wrapping_add(4);

        match decoded {
            Decoded::Lui { rd, imm } => {
                self.registers.write(rd, imm as u64);
            }
            Decoded::Jal { rd, offset } => {
                self.registers.write(rd, next_pc);
                next_pc = self.pc.wrapping_add(offset as u64);
            }
            Decoded::Jalr { rd, rs1, offset } => {
                let target = self.registers.read(rs1).wrapping_add(offset as u64) & !1u64;
                self.registers.write(rd, next_pc);
                next_pc = target;
            }
            Decoded::Branch { op, rs1, rs2, offset } => {
                let a = self.registers.read(rs1);
                let b = self.registers.read(rs2);
                let taken = match op {
                    BranchOp::Beq => a == b,
                    BranchOp::Bne => a != b,
                    BranchOp::Blt => (a as i64) < (b as i64),
                    BranchOp::Bge => (a as i64) >= (b as i64),
                    BranchOp::Bltu => a < b,
                    BranchOp::Bgeu => a >= b,
                };
                if taken {
                    next_pc = self.pc.wrapping_add(offset as u64);
                }
            }
            Decoded::Load { op, rd, rs1, offset } => {
                let addr = self.registers.read(rs1).wrapping_add(offset as u64);
                let value = match op {
                    LoadOp::Lb => mem.read_byte(addr)? as i8 as i64 as u64,
                    LoadOp::Lh => mem.read_halfword(addr)? as i16 as i64 as u64,
                    LoadOp::Lw => mem.read_word(addr)? as i32 as i64 as u64,
                    LoadOp::Ld => mem.read_doubleword(addr)?,
                    LoadOp::Lbu => mem.read_byte(addr)? as u64,
                    LoadOp::Lhu => mem.read_halfword(addr)? as u64,
                };
                self.registers.write(rd, value);
            }
            Decoded::Store { op, rs1, rs2, offset } => {
                let addr = self.registers.read(rs1).wrapping_add(offset as u64);
                let value = self.registers.read(rs2);
                match op {
                    StoreOp::Sb => mem.write_byte(addr, value as u8)?,
                    StoreOp::Sh => mem.write_halfword(addr, value as u16)?,
                    StoreOp::Sw => mem.write_word(addr, value as u32)?,
                    StoreOp::Sd => mem.write_doubleword(addr, value)?,
                }
            }
            Decoded::RegImm { op, rd, rs1, imm } => {
                let a = self.registers.read(rs1);
                let value = match op {
                    RegImmOp::Addi => a.wrapping_add(imm as u64),
                    RegImmOp::Slti => ((a as i64) < imm) as u64,
                    RegImmOp::Sltiu => (a < imm as u64) as u64,
                    RegImmOp::Andi => a & imm as u64,
                    RegImmOp::Ori => a | imm as u64,
                    RegImmOp::Xori => a ^ imm as u64,
                };
                self.registers.write(rd, value);
            }
            Decoded::ShiftImm { op, rd, rs1, shamt } => {
                let a = self.registers.read(rs1);
                let value = match op {
                    ShiftImmOp::Slli => a << shamt,
                    ShiftImmOp::Srli => a >> shamt,
                    ShiftImmOp::Srai => ((a as i64) >> shamt) as u64,
                };
                self.registers.write(rd, value);
            }
            Decoded::RegImmWord { op, rd, rs1, imm } => {
                let a = self.registers.read(rs1) as i32;
                let value = match op {
                    RegImmOp::Addi => a.wrapping_add(imm as i32),
                    _ => unreachable!("only ADDIW reaches OP_IMM_32 without a shift"),
                };
                self.registers.write(rd, value as i64 as u64);
            }
            Decoded::ShiftImmWord { op, rd, rs1, shamt } => {
                let a = self.registers.read(rs1) as u32;
                let value = match op {
                    ShiftImmOp::Slli => (a << shamt) as i32,
                    ShiftImmOp::Srli => (a >> shamt) as i32,
                    ShiftImmOp::Srai => (a as i32) >> shamt,
                };
                self.registers.write(rd, value as i64 as u64);
            }
            Decoded::RegReg { op, rd, rs1, rs2 } => {
                let a = self.registers.read(rs1);
                let b = self.registers.read(rs2);
                let value = match op {
                    RegRegOp::Add => a.wrapping_add(b),
                    RegRegOp::Sub => a.wrapping_sub(b),
                    RegRegOp::Sltu => (a < b) as u64,
                    RegRegOp::Slt => ((a as i64) < (b as i64)) as u64,
                    RegRegOp::And => a & b,
                    RegRegOp::Or => a | b,
                    RegRegOp::Xor => a ^ b,
                    RegRegOp::Sll => a << (b & 0x3F),
                    RegRegOp::Srl => a >> (b & 0x3F),
                    RegRegOp::Sra => ((a as i64) >> (b & 0x3F)) as u64,
                };
                self.registers.write(rd, value);
            }
            Decoded::RegRegWord { op, rd, rs1, rs2 } => {
                let a = self.registers.read(rs1) as u32;
                let b = self.registers.read(rs2) as u32;
                let shamt = b & 0x1F;
                let value: i32 = match op {
                    RegRegOp::Add => a.wrapping_add(b) as i32,
                    RegRegOp::Sub => a.wrapping_sub(b) as i32,
                    RegRegOp::Sll => (a << shamt) as i32,
                    RegRegOp::Srl => (a >> shamt) as i32,
                    RegRegOp::Sra => (a as i32) >> shamt,
                    _ => unreachable!("only ADD/SUB/SLL/SRL/SRA reach OP_32"),
                };
                self.registers.write(rd, value as i64 as u64);
            }
        }

        self.pc = next_pc;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_itype(opcode: u32, funct3: u32, rd: u8, rs1: u8, imm12: u32) -> u32 {
        ((imm12 & 0xFFF) << 20) | ((rs1 as u32) << 15) | (funct3 << 12) | ((rd as u32) << 7) | opcode
    }

    fn load_instr(mem: &mut Memory, pc: u64, instr: u32) {
        mem.write_word(pc, instr).unwrap();
    }

    #[test]
    fn addi_wraps_on_overflow() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        hart.registers.write(1, u64::MAX);
        load_instr(&mut mem, 0, encode_itype(crate::opcodes::OP_IMM, crate::opcodes::FUNCT3_ADDI, 2, 1, 1));
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(2), 0);
        assert_eq!(hart.pc, 4);
    }

    #[test]
    fn srai_is_arithmetic() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        hart.registers.write(1, (-8i64) as u64);
        let shamt = 1u32;
        let imm12 = (crate::opcodes::FUNCT7_SUB_SRA << 5) | shamt;
        load_instr(&mut mem, 0, encode_itype(crate::opcodes::OP_IMM, crate::opcodes::FUNCT3_SRLI_SRAI, 2, 1, imm12));
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(2) as i64, -4);
    }

    #[test]
    fn jal_links_and_jumps() {
        let mut mem = Memory::new(1024);
        let mut hart = Hart::new(100);
        // jal x1, 16
        let imm10_1 = 8u32; // 16 >> 1
        let instr = (imm10_1 << 21) | (1u32 << 7) | crate::opcodes::OP_JAL;
        load_instr(&mut mem, 100, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(1), 104);
        assert_eq!(hart.pc, 116);
    }

    #[test]
    fn branch_not_taken_falls_through() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        hart.registers.write(1, 1);
        hart.registers.write(2, 2);
        // beq x1, x2, 100 (not taken since 1 != 2)
        let imm12 = 0u32;
        let imm11 = 0u32;
        let imm10_5 = 0b11_0010u32; // placeholder, irrelevant since branch not taken
        let imm4_1 = 0u32;
        let instr = (imm12 << 31) | (imm10_5 << 25) | (imm4_1 << 8) | (imm11 << 7)
            | (2u32 << 20) | (1u32 << 15) | (crate::opcodes::FUNCT3_BEQ << 12) | crate::opcodes::OP_BRANCH;
        load_instr(&mut mem, 0, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.pc, 4);
    }

    #[test]
    fn taken_signed_branch_uses_sign_extended_offset() {
        let mut mem = Memory::new(1024);
        let mut hart = Hart::new(512);
        hart.registers.write(1, 5);
        hart.registers.write(2, 5);
        // beq x1, x2, -8
        let imm12 = 1u32;
        let imm11 = 1u32;
        let imm10_5 = 0x3Fu32;
        let imm4_1 = 0xEu32;
        let instr = (imm12 << 31) | (imm10_5 << 25) | (imm4_1 << 8) | (imm11 << 7)
            | (2u32 << 20) | (1u32 << 15) | (crate::opcodes::FUNCT3_BEQ << 12) | crate::opcodes::OP_BRANCH;
        load_instr(&mut mem, 512, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.pc, 504);
    }

    #[test]
    fn taken_signed_bge_uses_sign_extended_offset() {
        // bge x1, x2, 0x40: imm10_5 = 2, all other immediate fields zero
        let instr = (2u32 << 25)
            | (2u32 << 20)
            | (1u32 << 15)
            | (crate::opcodes::FUNCT3_BGE << 12)
            | crate::opcodes::OP_BRANCH;

        // -1 >= 0 is false: branch not taken, pc falls through to pc + 4
        let mut mem = Memory::new(0x2000);
        let mut hart = Hart::new(0x1000);
        hart.registers.write(1, u64::MAX);
        hart.registers.write(2, 0);
        load_instr(&mut mem, 0x1000, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.pc, 0x1004);

        // 1 >= 0 is true: branch taken to pc + 0x40
        let mut mem = Memory::new(0x2000);
        let mut hart = Hart::new(0x1000);
        hart.registers.write(1, 1);
        hart.registers.write(2, 0);
        load_instr(&mut mem, 0x1000, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.pc, 0x1040);
    }

    #[test]
    fn uart_store_produces_output() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        hart.registers.write(1, crate::memory::UART_BASE);
        hart.registers.write(2, b'!' as u64);
        // sb x2, 0(x1)
        let instr = (0u32 << 25) | (2u32 << 20) | (1u32 << 15) | (crate::opcodes::FUNCT3_SB << 12) | (0u32 << 7) | crate::opcodes::OP_STORE;
        load_instr(&mut mem, 0, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(mem.drain_uart(), vec![b'!']);
    }

    #[test]
    fn load_store_round_trip() {
        let mut mem = Memory::new(1024);
        let mut hart = Hart::new(0);
        hart.registers.write(1, 100); // base address
        hart.registers.write(2, 0xABCD_EF01);
        // sw x2, 0(x1)
        let sw = (0u32 << 25) | (2u32 << 20) | (1u32 << 15) | (crate::opcodes::FUNCT3_SW << 12) | (0u32 << 7) | crate::opcodes::OP_STORE;
        load_instr(&mut mem, 0, sw);
        hart.step(&mut mem).unwrap();
        // lw x3, 0(x1)
        let lw = encode_itype(crate::opcodes::OP_LOAD, crate::opcodes::FUNCT3_LW, 3, 1, 0);
        load_instr(&mut mem, 4, lw);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(3) as u32, 0xABCD_EF01);
    }

    #[test]
    fn doubleword_load_store_round_trip() {
        let mut mem = Memory::new(1024);
        let mut hart = Hart::new(0);
        hart.registers.write(1, 100); // base address
        hart.registers.write(2, 0xDEAD_BEEF_CAFE_BABE);
        // sd x2, 0(x1)
        let sd = (0u32 << 25)
            | (2u32 << 20)
            | (1u32 << 15)
            | (crate::opcodes::FUNCT3_SD << 12)
            | (0u32 << 7)
            | crate::opcodes::OP_STORE;
        load_instr(&mut mem, 0, sd);
        hart.step(&mut mem).unwrap();
        // ld x3, 0(x1)
        let ld = encode_itype(crate::opcodes::OP_LOAD, crate::opcodes::FUNCT3_LD, 3, 1, 0);
        load_instr(&mut mem, 4, ld);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(3), 0xDEAD_BEEF_CAFE_BABE);
    }

    #[test]
    fn x0_writes_are_discarded() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        let instr = encode_itype(crate::opcodes::OP_IMM, crate::opcodes::FUNCT3_ADDI, 0, 0, 5);
        load_instr(&mut mem, 0, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(0), 0);
    }

    #[test]
    fn addiw_sign_extends_32_bit_result() {
        let mut mem = Memory::new(64);
        let mut hart = Hart::new(0);
        hart.registers.write(1, 0x7FFF_FFFF);
        let instr = encode_itype(crate::opcodes::OP_IMM_32, crate::opcodes::FUNCT3_ADDI, 2, 1, 1);
        load_instr(&mut mem, 0, instr);
        hart.step(&mut mem).unwrap();
        assert_eq!(hart.registers.read(2) as i64, -2147483648);
    }

    #[test]
    fn run_stops_at_first_fault() {
        let mut mem = Memory::new(16);
        let mut hart = Hart::new(100); // out of bounds fetch
        let fault = hart.run(&mut mem);
        assert!(matches!(fault, Fault::Memory(_)));
    }
}
