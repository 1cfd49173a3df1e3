use super::*;

/// Compiles `$`-delimited program text into a flat word stream.
///
/// Pure: no I/O, no allocation beyond the returned buffer. A line whose
/// mnemonic isn't recognized is skipped entirely rather than erroring, per
/// the wire format's forward-compatibility contract.
pub fn assemble(program: &str) -> Vec<u32> {
    let mut words = Vec::new();

    for line in program.split('$') {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let Some(&mnemonic) = tokens.first() else {
            continue;
        };

        match mnemonic {
            "ADD" => {
                let Some(operand) = tokens.get(1).and_then(|hex| hex_to_words(hex)) else {
                    continue;
                };
                words.push(HashOp::Add.tag());
                words.extend_from_slice(&operand);
            }
            "XOR" => {
                let Some(operand) = tokens.get(1).and_then(|hex| hex_to_words(hex)) else {
                    continue;
                };
                words.push(HashOp::Xor.tag());
                words.extend_from_slice(&operand);
            }
            "MEMADD" => {
                let Some(operand) = tokens.get(1).and_then(|hex| hex_to_words(hex)) else {
                    continue;
                };
                words.push(HashOp::MemAdd.tag());
                words.extend_from_slice(&operand);
            }
            "MEMXOR" => {
                let Some(operand) = tokens.get(1).and_then(|hex| hex_to_words(hex)) else {
                    continue;
                };
                words.push(HashOp::MemXor.tag());
                words.extend_from_slice(&operand);
            }
            "SHA2" => match tokens.get(1) {
                None => words.push(HashOp::Sha2Single.tag()),
                Some(count) => match count.parse::<u32>() {
                    Ok(count) => {
                        words.push(HashOp::Sha2Loop.tag());
                        words.push(count);
                    }
                    Err(_) => continue,
                },
            },
            "MEMGEN" => {
                let (Some(inner), Some(size)) = (tokens.get(1), tokens.get(2)) else {
                    continue;
                };
                let Ok(size) = size.parse::<u32>() else {
                    continue;
                };
                words.push(HashOp::MemGen.tag());
                words.push(HashOp::inner_tag_from_mnemonic(inner));
                words.push(size);
            }
            "READMEM" => {
                let Some(region) = tokens.get(1).and_then(|token| MemRegion::from_token(token))
                else {
                    continue;
                };
                words.push(HashOp::ReadMem.tag());
                words.push(region.tag());
            }
            _ => continue,
        }
    }

    words
}

/// Decodes a 64-character hex operand into 8 little-endian 32-bit words.
fn hex_to_words(text: &str) -> Option<[u32; 8]> {
    if text.len() != 64 {
        return None;
    }

    let bytes = hex::decode(text).ok()?;
    let mut words = [0u32; 8];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    Some(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_HASH: &str =
        "0000000000000000000000000000000000000000000000000000000000000000";
    const ONE_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    #[test]
    fn assembles_empty_program() {
        assert_eq!(assemble(""), Vec::<u32>::new());
    }

    #[test]
    fn assembles_bare_sha2() {
        assert_eq!(assemble("SHA2"), vec![HashOp::Sha2Single.tag()]);
    }

    #[test]
    fn assembles_looped_sha2() {
        assert_eq!(assemble("SHA2 3"), vec![HashOp::Sha2Loop.tag(), 3]);
    }

    #[test]
    fn assembles_add_then_sha2() {
        let program = format!("ADD {ZERO_HASH}$SHA2");
        let mut expected = vec![HashOp::Add.tag()];
        expected.extend_from_slice(&[0u32; 8]);
        expected.push(HashOp::Sha2Single.tag());
        assert_eq!(assemble(&program), expected);
    }

    #[test]
    fn assembles_memgen_readmem() {
        let program = "MEMGEN SHA2 1$READMEM MERKLE";
        assert_eq!(
            assemble(program),
            vec![
                HashOp::MemGen.tag(),
                HashOp::Sha2Single.tag(),
                1,
                HashOp::ReadMem.tag(),
                MemRegion::Merkle.tag(),
            ]
        );
    }

    #[test]
    fn memgen_unrecognized_inner_op_still_emits_tag_word() {
        let program = "MEMGEN BOGUS 4";
        assert_eq!(
            assemble(program),
            vec![HashOp::MemGen.tag(), u32::MAX, 4]
        );
    }

    #[test]
    fn unknown_mnemonic_is_skipped() {
        assert_eq!(assemble("FROBNICATE 1 2 3$SHA2"), vec![HashOp::Sha2Single.tag()]);
    }

    #[test]
    fn malformed_hex_operand_is_skipped() {
        assert_eq!(assemble("ADD deadbeef$SHA2"), vec![HashOp::Sha2Single.tag()]);
    }

    #[test]
    fn is_deterministic() {
        let program = format!("ADD {ONE_HASH}$MEMGEN SHA2 4$READMEM HASHPREV$SHA2 2");
        assert_eq!(assemble(&program), assemble(&program));
    }

    #[test]
    fn operand_order_is_not_commuted() {
        let add_then_xor = assemble(&format!("ADD {ZERO_HASH}$XOR {ONE_HASH}"));
        let xor_then_add = assemble(&format!("XOR {ONE_HASH}$ADD {ZERO_HASH}"));
        assert_eq!(
            add_then_xor,
            vec![HashOp::Add.tag(), 0, 0, 0, 0, 0, 0, 0, 0, HashOp::Xor.tag(), 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            xor_then_add,
            vec![HashOp::Xor.tag(), 0, 0, 0, 0, 0, 0, 0, 0, HashOp::Add.tag(), 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_ne!(add_then_xor, xor_then_add);
    }
}
