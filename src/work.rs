use super::*;

/// The immutable-per-job bundle a worker clones out of the shared-work slot.
///
/// Mirrors `dyn_miner.cpp`'s `work_t`: a block header prefix plus the
/// compiled program needed to hash it. `num` is this job's generation,
/// copied in at publish time so a worker that cloned the record can compare
/// it against `SharedWork::num()` without re-locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Work {
    pub job_id: String,
    pub hex_ntime: String,
    pub prev_block_hash: [u8; 32],
    /// Header-order merkle root (bytes 36..68 of `native_data`).
    pub merkle_root: [u8; 32],
    /// The same root with all 32 bytes reversed end-to-end, used only by
    /// `READMEM MERKLE` indexing. Preserved exactly per spec §9: this is
    /// not a bug fix target.
    pub merkle_root_reversed: [u8; 32],
    pub native_data: [u8; 80],
    pub bytecode: Vec<u32>,
    pub program_text: String,
    pub share_target: u64,
    pub num: u64,
}

fn decode_hex_into(field: &'static str, text: &str, out: &mut [u8]) {
    match hex::decode(text) {
        Ok(bytes) if bytes.len() == out.len() => out.copy_from_slice(&bytes),
        Ok(bytes) => {
            warn!(
                "{field} has wrong length ({} bytes, expected {}); leaving it zeroed",
                bytes.len(),
                out.len()
            );
        }
        Err(error) => {
            warn!("{field} is not valid hex ({error}); leaving it zeroed");
        }
    }
}

fn reverse_bytes(bytes: [u8; 32]) -> [u8; 32] {
    let mut out = bytes;
    out.reverse();
    out
}

/// Builds a `Work` record from a `mining.notify` payload and the
/// currently-known share target. `previous` is the last `(program_text,
/// bytecode)` pair seen, if any; when `notify.program` is unchanged the
/// prior bytecode is reused instead of reparsing (spec §4.1).
pub fn set_job(notify: &Notify, share_target: u64, previous: Option<&(String, Vec<u32>)>) -> Work {
    let mut prev_block_hash = [0u8; 32];
    decode_hex_into("prev_hash", &notify.prev_hash, &mut prev_block_hash);

    let mut coinbase = Vec::new();
    match (hex::decode(&notify.coinb1), hex::decode(&notify.coinb2)) {
        (Ok(coinb1), Ok(coinb2)) => {
            coinbase.extend_from_slice(&coinb1);
            coinbase.extend_from_slice(&coinb2);
        }
        _ => warn!("coinb1/coinb2 are not valid hex; coinbase treated as empty"),
    }

    let merkle_root = {
        use bitcoin::hashes::{Hash, sha256};
        sha256::Hash::hash(&sha256::Hash::hash(&coinbase).to_byte_array()).to_byte_array()
    };
    let merkle_root_reversed = reverse_bytes(merkle_root);

    let mut ntime_be = [0u8; 4];
    let ntime_ok = notify.ntime.len() == 8 && hex::decode_to_slice(&notify.ntime, &mut ntime_be).is_ok();
    if !ntime_ok {
        warn!("ntime '{}' is not a 4-byte hex value; header ntime left zero", notify.ntime);
    }
    let mut ntime_le = ntime_be;
    ntime_le.reverse();

    let mut nbits_be = [0u8; 4];
    let nbits_ok = notify.nbits.len() == 8 && hex::decode_to_slice(&notify.nbits, &mut nbits_be).is_ok();
    if !nbits_ok {
        warn!("nbits '{}' is not a 4-byte hex value; header nbits left zero", notify.nbits);
    }
    let mut nbits_reversed = nbits_be;
    nbits_reversed.reverse();

    let mut native_data = [0u8; 80];
    native_data[0..4].copy_from_slice(&0x0000_0040u32.to_le_bytes());
    native_data[4..36].copy_from_slice(&prev_block_hash);
    native_data[36..68].copy_from_slice(&merkle_root);
    if ntime_ok {
        native_data[68..72].copy_from_slice(&ntime_le);
    }
    if nbits_ok {
        native_data[72..76].copy_from_slice(&nbits_reversed);
    }
    // native_data[76..80] (nonce) is written per-attempt by the worker.

    let (program_text, bytecode) = match previous {
        Some((text, bytecode)) if text == &notify.program => (text.clone(), bytecode.clone()),
        _ => (notify.program.clone(), program::assemble(&notify.program)),
    };

    Work {
        job_id: notify.job_id.clone(),
        hex_ntime: notify.ntime.clone(),
        prev_block_hash,
        merkle_root,
        merkle_root_reversed,
        native_data,
        bytecode,
        program_text,
        share_target,
        num: 0,
    }
}
