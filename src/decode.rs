//! Pure instruction decoding.
//!
//! Replaces the macro-pasted field-extraction blocks of the earlier
//! drafts with a single tagged `Decoded` value produced once per
//! step (see spec.md section 9): every execute arm consumes named
//! fields instead of re-deriving them from the raw instruction word.

use thiserror::Error;

use crate::fields::{
    funct3, funct7, imm_btype, imm_itype, imm_jtype, imm_stype, imm_utype, opcode, rd, rs1, rs2,
};
use crate::opcodes::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("illegal instruction 0x{0:08x}")]
    Illegal(u32),
}

/// Shift-amount width distinguishes the full-width (RV64) shifts from
/// the word (*W) family, which mask their shift amount to 5 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftWidth {
    Full,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegImmOp {
    Addi,
    Slti,
    Sltiu,
    Andi,
    Ori,
    Xori,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftImmOp {
    Slli,
    Srli,
    Srai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegRegOp {
    Add,
    Sub,
    Sltu,
    And,
    Or,
    Xor,
    Slt,
    Sll,
    Srl,
    Sra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Sb,
    Sh,
    Sw,
    Sd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
}

/// A fully decoded instruction: opcode class plus its fields, with the
/// immediate already sign-extended to i64 per spec.md section 4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    RegImm {
        op: RegImmOp,
        rd: u8,
        rs1: u8,
        imm: i64,
    },
    /// SLLI/SRLI/SRAI, full 64-bit register width (6-bit shift amount).
    ShiftImm {
        op: ShiftImmOp,
        rd: u8,
        rs1: u8,
        shamt: u32,
    },
    /// ADDIW/SLLIW/SRLIW/SRAIW: sign-extend the 32-bit result to 64 bits.
    RegImmWord {
        op: RegImmOp,
        rd: u8,
        rs1: u8,
        imm: i64,
    },
    ShiftImmWord {
        op: ShiftImmOp,
        rd: u8,
        rs1: u8,
        shamt: u32,
    },
    RegReg {
        op: RegRegOp,
        rd: u8,
        rs1: u8,
        rs2: u8,
    },
    /// ADDW/SUBW/SLLW/SRLW/SRAW: operate on the low 32 bits, sign-extend.
    RegRegWord {
        op: RegRegOp,
        rd: u8,
        rs1: u8,
        rs2: u8,
    },
    Lui {
        rd: u8,
        imm: i64,
    },
    Jal {
        rd: u8,
        offset: i64,
    },
    Jalr {
        rd: u8,
        rs1: u8,
        offset: i64,
    },
    Branch {
        op: BranchOp,
        rs1: u8,
        rs2: u8,
        offset: i64,
    },
    Load {
        op: LoadOp,
        rd: u8,
        rs1: u8,
        offset: i64,
    },
    Store {
        op: StoreOp,
        rs1: u8,
        rs2: u8,
        offset: i64,
    },
}

/// Decode a 32-bit instruction word. Pure and total: every input
/// either maps to a `Decoded` value or to `DecodeError::Illegal`.
pub fn decode(instr: u32) -> Result<Decoded, DecodeError> {
    let op = opcode(instr);
    let f3 = funct3(instr);
    let f7 = funct7(instr);
    let rd = rd(instr);
    let rs1 = rs1(instr);
    let rs2 = rs2(instr);

    match op {
        OP_LUI => Ok(Decoded::Lui {
            rd,
            imm: imm_utype(instr),
        }),
        OP_JAL => Ok(Decoded::Jal {
            rd,
            offset: imm_jtype(instr),
        }),
        OP_JALR if f3 == FUNCT3_JALR => Ok(Decoded::Jalr {
            rd,
            rs1,
            offset: imm_itype(instr),
        }),
        OP_BRANCH => {
            let op = match f3 {
                FUNCT3_BEQ => BranchOp::Beq,
                FUNCT3_BNE => BranchOp::Bne,
                FUNCT3_BLT => BranchOp::Blt,
                FUNCT3_BGE => BranchOp::Bge,
                FUNCT3_BLTU => BranchOp::Bltu,
                FUNCT3_BGEU => BranchOp::Bgeu,
                _ => return Err(DecodeError::Illegal(instr)),
            };
            Ok(Decoded::Branch {
                op,
                rs1,
                rs2,
                offset: imm_btype(instr),
            })
        }
        OP_LOAD => {
            let op = match f3 {
                FUNCT3_LB => LoadOp::Lb,
                FUNCT3_LH => LoadOp::Lh,
                FUNCT3_LW => LoadOp::Lw,
                FUNCT3_LD => LoadOp::Ld,
                FUNCT3_LBU => LoadOp::Lbu,
                FUNCT3_LHU => LoadOp::Lhu,
                _ => return Err(DecodeError::Illegal(instr)),
            };
            Ok(Decoded::Load {
                op,
                rd,
                rs1,
                offset: imm_itype(instr),
            })
        }
        OP_STORE => {
            let op = match f3 {
                FUNCT3_SB => StoreOp::Sb,
                FUNCT3_SH => StoreOp::Sh,
                FUNCT3_SW => StoreOp::Sw,
                FUNCT3_SD => StoreOp::Sd,
                _ => return Err(DecodeError::Illegal(instr)),
            };
            Ok(Decoded::Store {
                op,
                rs1,
                rs2,
                offset: imm_stype(instr),
            })
        }
        OP_IMM => decode_op_imm(instr, f3, f7, rd, rs1),
        OP_IMM_32 => decode_op_imm_32(instr, f3, f7, rd, rs1),
        OP => decode_op(instr, f3, f7, rd, rs1, rs2),
        OP_32 => decode_op_32(instr, f3, f7, rd, rs1, rs2),
        _ => Err(DecodeError::Illegal(instr)),
    }
}

fn decode_op_imm(
    instr: u32,
    f3: u32,
    f7: u32,
    rd: u8,
    rs1: u8,
) -> Result<Decoded, DecodeError> {
    let imm = imm_itype(instr);
    // RV64's SLLI/SRLI/SRAI shift amount is 6 bits (inst[25:20]), so
    // bit 25 — f7's low bit — is part of the shamt, not the
    // logical/arithmetic discriminator. Only inst[31:26] decides
    // that, so drop f7's low bit before comparing.
    let shift_kind = f7 >> 1;
    match f3 {
        FUNCT3_ADDI => Ok(Decoded::RegImm {
            op: RegImmOp::Addi,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_SLTI => Ok(Decoded::RegImm {
            op: RegImmOp::Slti,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_SLTIU => Ok(Decoded::RegImm {
            op: RegImmOp::Sltiu,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_XORI => Ok(Decoded::RegImm {
            op: RegImmOp::Xori,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_ORI => Ok(Decoded::RegImm {
            op: RegImmOp::Ori,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_ANDI => Ok(Decoded::RegImm {
            op: RegImmOp::Andi,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_SLLI if shift_kind == FUNCT7_ZERO >> 1 => Ok(Decoded::ShiftImm {
            op: ShiftImmOp::Slli,
            rd,
            rs1,
            shamt: shamt_full(instr),
        }),
        FUNCT3_SRLI_SRAI if shift_kind == FUNCT7_ZERO >> 1 => Ok(Decoded::ShiftImm {
            op: ShiftImmOp::Srli,
            rd,
            rs1,
            shamt: shamt_full(instr),
        }),
        FUNCT3_SRLI_SRAI if shift_kind == FUNCT7_SUB_SRA >> 1 => Ok(Decoded::ShiftImm {
            op: ShiftImmOp::Srai,
            rd,
            rs1,
            shamt: shamt_full(instr),
        }),
        _ => Err(DecodeError::Illegal(instr)),
    }
}

fn decode_op_imm_32(
    instr: u32,
    f3: u32,
    f7: u32,
    rd: u8,
    rs1: u8,
) -> Result<Decoded, DecodeError> {
    let imm = imm_itype(instr);
    match f3 {
        FUNCT3_ADDI => Ok(Decoded::RegImmWord {
            op: RegImmOp::Addi,
            rd,
            rs1,
            imm,
        }),
        FUNCT3_SLLI if f7 == FUNCT7_ZERO => Ok(Decoded::ShiftImmWord {
            op: ShiftImmOp::Slli,
            rd,
            rs1,
            shamt: shamt_word(instr),
        }),
        FUNCT3_SRLI_SRAI if f7 == FUNCT7_ZERO => Ok(Decoded::ShiftImmWord {
            op: ShiftImmOp::Srli,
            rd,
            rs1,
            shamt: shamt_word(instr),
        }),
        FUNCT3_SRLI_SRAI if f7 == FUNCT7_SUB_SRA => Ok(Decoded::ShiftImmWord {
            op: ShiftImmOp::Srai,
            rd,
            rs1,
            shamt: shamt_word(instr),
        }),
        _ => Err(DecodeError::Illegal(instr)),
    }
}

fn decode_op(
    instr: u32,
    f3: u32,
    f7: u32,
    rd: u8,
    rs1: u8,
    rs2: u8,
) -> Result<Decoded, DecodeError> {
    let op = match (f3, f7) {
        (FUNCT3_ADD_SUB, FUNCT7_ZERO) => RegRegOp::Add,
        (FUNCT3_ADD_SUB, FUNCT7_SUB_SRA) => RegRegOp::Sub,
        (FUNCT3_SLT, FUNCT7_ZERO) => RegRegOp::Slt,
        (FUNCT3_SLTU, FUNCT7_ZERO) => RegRegOp::Sltu,
        (FUNCT3_AND, FUNCT7_ZERO) => RegRegOp::And,
        (FUNCT3_OR, FUNCT7_ZERO) => RegRegOp::Or,
        (FUNCT3_XOR, FUNCT7_ZERO) => RegRegOp::Xor,
        (FUNCT3_SLL, FUNCT7_ZERO) => RegRegOp::Sll,
        (FUNCT3_SRL_SRA, FUNCT7_ZERO) => RegRegOp::Srl,
        (FUNCT3_SRL_SRA, FUNCT7_SUB_SRA) => RegRegOp::Sra,
        _ => return Err(DecodeError::Illegal(instr)),
    };
    Ok(Decoded::RegReg { op, rd, rs1, rs2 })
}

fn decode_op_32(
    instr: u32,
    f3: u32,
    f7: u32,
    rd: u8,
    rs1: u8,
    rs2: u8,
) -> Result<Decoded, DecodeError> {
    let op = match (f3, f7) {
        (FUNCT3_ADD_SUB, FUNCT7_ZERO) => RegRegOp::Add,
        (FUNCT3_ADD_SUB, FUNCT7_SUB_SRA) => RegRegOp::Sub,
        (FUNCT3_SLL, FUNCT7_ZERO) => RegRegOp::Sll,
        (FUNCT3_SRL_SRA, FUNCT7_ZERO) => RegRegOp::Srl,
        (FUNCT3_SRL_SRA, FUNCT7_SUB_SRA) => RegRegOp::Sra,
        _ => return Err(DecodeError::Illegal(instr)),
    };
    Ok(Decoded::RegRegWord { op, rd, rs1, rs2 })
}

/// RV64 full-width shift amount: 6 bits (inst[25:20]).
fn shamt_full(instr: u32) -> u32 {
    crate::fields::extract(instr, 20, 6) as u32
}

/// RV64 word-variant shift amount: 5 bits (inst[24:20]).
fn shamt_word(instr: u32) -> u32 {
    crate::fields::extract(instr, 20, 5) as u32
}
