//! Opcode, funct3 and funct7 constants for the RV64I integer subset.
//!
//! Values match the RISC-V unprivileged specification encodings.

pub const OP_LOAD: u32 = 0b000_0011;
pub const OP_IMM: u32 = 0b001_0011;
pub const OP_IMM_32: u32 = 0b001_1011;
pub const OP_STORE: u32 = 0b010_0011;
pub const OP: u32 = 0b011_0011;
pub const OP_32: u32 = 0b011_1011;
pub const OP_LUI: u32 = 0b011_0111;
pub const OP_BRANCH: u32 = 0b110_0011;
pub const OP_JALR: u32 = 0b110_0111;
pub const OP_JAL: u32 = 0b110_1111;

// Loads (OP_LOAD)
pub const FUNCT3_LB: u32 = 0b000;
pub const FUNCT3_LH: u32 = 0b001;
pub const FUNCT3_LW: u32 = 0b010;
pub const FUNCT3_LD: u32 = 0b011;
pub const FUNCT3_LBU: u32 = 0b100;
pub const FUNCT3_LHU: u32 = 0b101;

// Stores (OP_STORE)
pub const FUNCT3_SB: u32 = 0b000;
pub const FUNCT3_SH: u32 = 0b001;
pub const FUNCT3_SW: u32 = 0b010;
pub const FUNCT3_SD: u32 = 0b011;

// Branches (OP_BRANCH)
pub const FUNCT3_BEQ: u32 = 0b000;
pub const FUNCT3_BNE: u32 = 0b001;
pub const FUNCT3_BLT: u32 = 0b100;
pub const FUNCT3_BGE: u32 = 0b101;
pub const FUNCT3_BLTU: u32 = 0b110;
pub const FUNCT3_BGEU: u32 = 0b111;

// Register-immediate (OP_IMM)
pub const FUNCT3_ADDI: u32 = 0b000;
pub const FUNCT3_SLLI: u32 = 0b001;
pub const FUNCT3_SLTI: u32 = 0b010;
pub const FUNCT3_SLTIU: u32 = 0b011;
pub const FUNCT3_XORI: u32 = 0b100;
pub const FUNCT3_SRLI_SRAI: u32 = 0b101;
pub const FUNCT3_ORI: u32 = 0b110;
pub const FUNCT3_ANDI: u32 = 0b111;

// Register-register (OP)
pub const FUNCT3_ADD_SUB: u32 = 0b000;
pub const FUNCT3_SLL: u32 = 0b001;
pub const FUNCT3_SLT: u32 = 0b010;
pub const FUNCT3_SLTU: u32 = 0b011;
pub const FUNCT3_XOR: u32 = 0b100;
pub const FUNCT3_SRL_SRA: u32 = 0b101;
pub const FUNCT3_OR: u32 = 0b110;
pub const FUNCT3_AND: u32 = 0b111;

pub const FUNCT7_ZERO: u32 = 0b000_0000;
pub const FUNCT7_SUB_SRA: u32 = 0b010_0000;

// JALR (OP_JALR) has a single valid funct3
pub const FUNCT3_JALR: u32 = 0b000;
