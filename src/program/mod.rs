use crate::*;

mod interpreter;
mod mempool;
mod opcode;
mod parser;

pub use {
    interpreter::{execute, meets_target},
    mempool::Mempool,
    opcode::{HashOp, MemRegion},
    parser::assemble,
};
