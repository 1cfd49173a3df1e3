use super::*;

/// The eight hashing primitives a program can string together. Numeric tags
/// are wire-stable: they are the bytecode opcode words emitted by the
/// assembler and read back by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOp {
    Add,
    Xor,
    Sha2Single,
    Sha2Loop,
    MemGen,
    MemAdd,
    MemXor,
    ReadMem,
}

impl HashOp {
    pub const fn tag(self) -> u32 {
        match self {
            HashOp::Add => 0,
            HashOp::Xor => 1,
            HashOp::Sha2Single => 2,
            HashOp::Sha2Loop => 3,
            HashOp::MemGen => 4,
            HashOp::MemAdd => 5,
            HashOp::MemXor => 6,
            HashOp::ReadMem => 7,
        }
    }

    pub fn from_tag(tag: u32) -> Option<HashOp> {
        Some(match tag {
            0 => HashOp::Add,
            1 => HashOp::Xor,
            2 => HashOp::Sha2Single,
            3 => HashOp::Sha2Loop,
            4 => HashOp::MemGen,
            5 => HashOp::MemAdd,
            6 => HashOp::MemXor,
            7 => HashOp::ReadMem,
            _ => return None,
        })
    }

    /// Maps a MEMGEN inner-op mnemonic to its tag. Anything not recognized
    /// still needs a tag word emitted (the bytecode shape is fixed at two
    /// words), so unrecognized tokens get `u32::MAX` rather than being
    /// dropped the way a top-level unknown mnemonic is.
    pub fn inner_tag_from_mnemonic(mnemonic: &str) -> u32 {
        match mnemonic {
            "ADD" => HashOp::Add.tag(),
            "XOR" => HashOp::Xor.tag(),
            "SHA2" => HashOp::Sha2Single.tag(),
            _ => u32::MAX,
        }
    }
}

/// The two header regions `READMEM` can select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemRegion {
    Merkle,
    HashPrev,
}

impl MemRegion {
    pub const fn tag(self) -> u32 {
        match self {
            MemRegion::Merkle => 0,
            MemRegion::HashPrev => 1,
        }
    }

    pub fn from_tag(tag: u32) -> Option<MemRegion> {
        Some(match tag {
            0 => MemRegion::Merkle,
            1 => MemRegion::HashPrev,
            _ => return None,
        })
    }

    pub fn from_token(token: &str) -> Option<MemRegion> {
        match token {
            "MERKLE" => Some(MemRegion::Merkle),
            "HASHPREV" => Some(MemRegion::HashPrev),
            _ => None,
        }
    }
}
