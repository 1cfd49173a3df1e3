use super::*;

struct Reader<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(words: &'a [u32]) -> Self {
        Self { words, pos: 0 }
    }

    /// Returns `None` once the stream is exhausted; never advances past it.
    fn pop(&mut self) -> Option<u32> {
        let word = self.words.get(self.pos).copied();
        if word.is_some() {
            self.pos += 1;
        }
        word
    }

    /// Missing operand words read as zero rather than erroring, matching
    /// the spec's "unknown opcodes are a no-op" forward-compatibility rule
    /// extended to a truncated operand list.
    fn pop_word(&mut self) -> u32 {
        self.pop().unwrap_or(0)
    }

    fn pop_words8(&mut self) -> [u32; 8] {
        let mut out = [0u32; 8];
        for word in &mut out {
            *word = self.pop_word();
        }
        out
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use bitcoin::hashes::{Hash, sha256};
    sha256::Hash::hash(data).to_byte_array()
}

fn bytes_to_words(bytes: &[u8; 32]) -> [u32; 8] {
    let mut words = [0u32; 8];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    words
}

fn words_to_bytes(words: &[u32; 8]) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}

/// Evaluates a compiled program over a header, returning the final 32-byte
/// digest. Pure with respect to `pool`'s prior contents beyond the size a
/// `MEMGEN` in this program requires.
pub fn execute(
    header: &[u8; 80],
    bytecode: &[u32],
    prev_block_hash: &[u8; 32],
    merkle_root: &[u8; 32],
    pool: &mut Mempool,
) -> [u8; 32] {
    let mut state = bytes_to_words(&sha256(header));
    let mut reader = Reader::new(bytecode);
    let mut mem_size = 0usize;

    while let Some(tag) = reader.pop() {
        let Some(op) = HashOp::from_tag(tag) else {
            break;
        };

        match op {
            HashOp::Add => {
                let operand = reader.pop_words8();
                for (lane, addend) in state.iter_mut().zip(&operand) {
                    *lane = lane.wrapping_add(*addend);
                }
            }
            HashOp::Xor => {
                let operand = reader.pop_words8();
                for (lane, mask) in state.iter_mut().zip(&operand) {
                    *lane ^= mask;
                }
            }
            HashOp::Sha2Single => {
                state = bytes_to_words(&sha256(&words_to_bytes(&state)));
            }
            HashOp::Sha2Loop => {
                let count = reader.pop_word();
                for _ in 0..count {
                    state = bytes_to_words(&sha256(&words_to_bytes(&state)));
                }
            }
            HashOp::MemGen => {
                let inner_tag = reader.pop_word();
                let size = reader.pop_word() as usize;
                pool.resize(size);
                if inner_tag == HashOp::Sha2Single.tag() {
                    for index in 0..size {
                        state = bytes_to_words(&sha256(&words_to_bytes(&state)));
                        pool.set_cell(index, state);
                    }
                }
                mem_size = size;
            }
            HashOp::MemAdd => {
                let operand = reader.pop_words8();
                if mem_size != 0 {
                    pool.apply_add(&operand);
                }
            }
            HashOp::MemXor => {
                let operand = reader.pop_words8();
                if mem_size != 0 {
                    pool.apply_xor(&operand);
                }
            }
            HashOp::ReadMem => {
                let region_tag = reader.pop_word();
                if mem_size == 0 {
                    continue;
                }
                let region_bytes = match MemRegion::from_tag(region_tag) {
                    Some(MemRegion::Merkle) => merkle_root,
                    Some(MemRegion::HashPrev) => prev_block_hash,
                    None => continue,
                };
                let index =
                    u32::from_le_bytes(region_bytes[0..4].try_into().unwrap()) as usize % mem_size;
                state = pool.cell(index);
            }
        }
    }

    words_to_bytes(&state)
}

/// Takes the first 8 bytes of a digest as a big-endian integer and compares
/// against the share target.
pub fn meets_target(digest: &[u8; 32], share_target: u64) -> bool {
    u64::from_be_bytes(digest[0..8].try_into().unwrap()) <= share_target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_header() -> [u8; 80] {
        [0u8; 80]
    }

    #[test]
    fn empty_program_one_sha() {
        let header = zero_header();
        let mut pool = Mempool::new();
        let digest = execute(&header, &assemble("SHA2"), &[0; 32], &[0; 32], &mut pool);
        let expected = sha256(&sha256(&header));
        assert_eq!(digest, expected);
    }

    #[test]
    fn add_zero_then_sha2_is_identity() {
        let header = zero_header();
        let program = format!(
            "ADD {}$SHA2",
            "0".repeat(64)
        );
        let mut pool = Mempool::new();
        let digest = execute(&header, &assemble(&program), &[0; 32], &[0; 32], &mut pool);
        assert_eq!(digest, sha256(&sha256(&header)));
    }

    #[test]
    fn xor_twice_with_same_mask_is_identity() {
        let header = zero_header();
        let mask = "f".repeat(64);
        let program = format!("XOR {mask}$XOR {mask}$SHA2");
        let mut pool = Mempool::new();
        let digest = execute(&header, &assemble(&program), &[0; 32], &[0; 32], &mut pool);
        assert_eq!(digest, sha256(&sha256(&header)));
    }

    #[test]
    fn memgen_readmem_merkle_selects_generated_cell() {
        let header = zero_header();
        let merkle_root = [7u8; 32];
        let mut pool = Mempool::new();
        let digest = execute(
            &header,
            &assemble("MEMGEN SHA2 1$READMEM MERKLE"),
            &[0; 32],
            &merkle_root,
            &mut pool,
        );
        let expected = sha256(&sha256(&header));
        assert_eq!(digest, expected);
    }

    #[test]
    fn memgen_size_one_always_selects_cell_zero() {
        let header = zero_header();
        let mut pool = Mempool::new();
        // merkle_root's first LE word mod 1 is always 0 regardless of contents.
        for merkle_root in [[0u8; 32], [0xffu8; 32], {
            let mut m = [0u8; 32];
            m[0] = 42;
            m
        }] {
            let digest = execute(
                &header,
                &assemble("MEMGEN SHA2 1$READMEM MERKLE"),
                &[0; 32],
                &merkle_root,
                &mut pool,
            );
            assert_eq!(digest, sha256(&sha256(&header)));
        }
    }

    #[test]
    fn sha2_loop_one_matches_bare_sha2() {
        let header = zero_header();
        let mut pool_a = Mempool::new();
        let mut pool_b = Mempool::new();
        let a = execute(&header, &assemble("SHA2"), &[0; 32], &[0; 32], &mut pool_a);
        let b = execute(
            &header,
            &assemble("SHA2 1"),
            &[0; 32],
            &[0; 32],
            &mut pool_b,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn execute_is_pure_regardless_of_prior_pool_contents() {
        let header = zero_header();
        let program = assemble("MEMGEN SHA2 2$READMEM MERKLE");

        let mut fresh_pool = Mempool::new();
        let fresh = execute(&header, &program, &[0; 32], &[3; 32], &mut fresh_pool);

        let mut dirty_pool = Mempool::new();
        dirty_pool.resize(64);
        dirty_pool.set_cell(0, [0xabab_abab; 8]);
        let dirty = execute(&header, &program, &[0; 32], &[3; 32], &mut dirty_pool);

        assert_eq!(fresh, dirty);
    }

    #[test]
    fn unknown_opcode_halts_without_panicking() {
        let mut pool = Mempool::new();
        let bytecode = vec![99u32, 1, 2, 3];
        let digest = execute(&zero_header(), &bytecode, &[0; 32], &[0; 32], &mut pool);
        assert_eq!(digest, sha256(&zero_header()));
    }

    #[test]
    fn memadd_memxor_noop_before_memgen() {
        let header = zero_header();
        let mut pool = Mempool::new();
        let digest = execute(
            &header,
            &assemble(&format!("MEMADD {}$SHA2", "1".repeat(64))),
            &[0; 32],
            &[0; 32],
            &mut pool,
        );
        assert_eq!(digest, sha256(&sha256(&header)));
    }

    #[test]
    fn meets_target_boundaries() {
        let digest = [0u8; 32];
        assert!(meets_target(&digest, 0));
        let mut max_digest = [0xffu8; 32];
        max_digest[0..8].copy_from_slice(&u64::MAX.to_be_bytes());
        assert!(meets_target(&max_digest, u64::MAX));
        assert!(!meets_target(&max_digest, u64::MAX - 1));
    }

    #[test]
    fn two_identical_executions_are_byte_identical() {
        let header = zero_header();
        let program = assemble("MEMGEN SHA2 4$MEMADD 00$READMEM HASHPREV$SHA2 2");
        let mut pool_a = Mempool::new();
        let mut pool_b = Mempool::new();
        let a = execute(&header, &program, &[5; 32], &[9; 32], &mut pool_a);
        let b = execute(&header, &program, &[5; 32], &[9; 32], &mut pool_b);
        assert_eq!(a, b);
    }
}
