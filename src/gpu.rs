use super::*;

/// Contract an OpenCL (or other) device backend must satisfy: byte-identical
/// digests to `program::execute` for any `(header, bytecode)` pair (spec
/// §4.10). The controller polls one instance per configured device in a loop
/// structurally identical to a CPU worker's, just batched per kernel launch.
pub trait GpuBackend: Send {
    /// Reloads device-side program state. Called once at startup and again
    /// whenever the job's bytecode changes; a no-op otherwise.
    fn load_program(&mut self, bytecode: &[u32]) -> Result<(), MinerError>;

    /// Runs one kernel invocation over `compute_units` candidate nonces
    /// starting at `base_nonce`, returning the nonces (if any) whose digest
    /// met `share_target`. `prev_block_hash` and `merkle_root` are the same
    /// two `READMEM` source buffers `program::execute` takes (the latter
    /// already reversed per `work::set_job`).
    fn scan(
        &mut self,
        header: &[u8; 80],
        prev_block_hash: &[u8; 32],
        merkle_root: &[u8; 32],
        base_nonce: u32,
        share_target: u64,
    ) -> Result<Vec<u32>, MinerError>;
}

/// Runs one GPU device's polling loop. Mirrors `run_cpu_worker`'s shape:
/// park until a job exists, then batch-scan nonces until the generation
/// moves. Each iteration advances `base_nonce` by `compute_units` so two
/// iterations never re-scan the same range.
pub fn run_gpu_worker(
    mut backend: impl GpuBackend,
    compute_units: u32,
    shared_work: Arc<SharedWork>,
    queue: Arc<ShareQueue>,
    stats: Arc<Stats>,
) {
    let mut loaded_program: Option<Vec<u32>> = None;

    loop {
        while shared_work.num() == 0 {
            thread::sleep(Duration::from_secs(1));
        }

        let work = shared_work.clone_work();

        if loaded_program.as_deref() != Some(work.bytecode.as_slice()) {
            if let Err(error) = backend.load_program(&work.bytecode) {
                error!("GPU: failed to load program: {error}");
                thread::sleep(Duration::from_secs(1));
                continue;
            }
            loaded_program = Some(work.bytecode.clone());
        }

        let mut base_nonce: u32 = 0;
        let mut header = work.native_data;

        while shared_work.num() == work.num {
            header[76..80].copy_from_slice(&base_nonce.to_le_bytes());

            match backend.scan(
                &header,
                &work.prev_block_hash,
                &work.merkle_root_reversed,
                base_nonce,
                work.share_target,
            ) {
                Ok(hits) => {
                    stats
                        .nonce_count
                        .fetch_add(compute_units as u64, Ordering::Relaxed);
                    for nonce in hits {
                        queue.push(Share {
                            job_num: work.num,
                            job_id: work.job_id.clone(),
                            hex_ntime: work.hex_ntime.clone(),
                            nonce: nonce.to_le_bytes(),
                        });
                    }
                }
                Err(error) => {
                    error!("GPU: scan failed: {error}");
                    thread::sleep(Duration::from_secs(1));
                    break;
                }
            }

            base_nonce = base_nonce.wrapping_add(compute_units);
        }
    }
}

#[cfg(feature = "opencl")]
pub mod opencl {
    use super::*;
    use ocl::{Buffer, Kernel, MemFlags, Platform, ProQue};

    /// An inline SHA-256 plus an opcode walk identical to
    /// `program::interpreter::execute`, run independently per work-item with
    /// `nonce = base_nonce + gid`. Each lane owns `mem_cells_per_lane` cells
    /// of its own scratch row in `mempool`, indexed by `gid *
    /// mem_cells_per_lane`, so lanes never trample each other's `MEMGEN`
    /// state.
    const KERNEL_SOURCE: &str = r#"
        #define OP_ADD 0
        #define OP_XOR 1
        #define OP_SHA2_SINGLE 2
        #define OP_SHA2_LOOP 3
        #define OP_MEMGEN 4
        #define OP_MEMADD 5
        #define OP_MEMXOR 6
        #define OP_READMEM 7
        #define REGION_MERKLE 0
        #define REGION_HASHPREV 1

        constant uint K[64] = {
            0x428a2f98,0x71374491,0xb5c0fbcf,0xe9b5dba5,0x3956c25b,0x59f111f1,0x923f82a4,0xab1c5ed5,
            0xd807aa98,0x12835b01,0x243185be,0x550c7dc3,0x72be5d74,0x80deb1fe,0x9bdc06a7,0xc19bf174,
            0xe49b69c1,0xefbe4786,0x0fc19dc6,0x240ca1cc,0x2de92c6f,0x4a7484aa,0x5cb0a9dc,0x76f988da,
            0x983e5152,0xa831c66d,0xb00327c8,0xbf597fc7,0xc6e00bf3,0xd5a79147,0x06ca6351,0x14292967,
            0x27b70a85,0x2e1b2138,0x4d2c6dfc,0x53380d13,0x650a7354,0x766a0abb,0x81c2c92e,0x92722c85,
            0xa2bfe8a1,0xa81a664b,0xc24b8b70,0xc76c51a3,0xd192e819,0xd6990624,0xf40e3585,0x106aa070,
            0x19a4c116,0x1e376c08,0x2748774c,0x34b0bcb5,0x391c0cb3,0x4ed8aa4a,0x5b9cca4f,0x682e6ff3,
            0x748f82ee,0x78a5636f,0x84c87814,0x8cc70208,0x90befffa,0xa4506ceb,0xbef9a3f7,0xc67178f2,
        };

        uint rotr(uint x, uint n) {
            return (x >> n) | (x << (32 - n));
        }

        void sha256_transform(uint *state, const uchar *block) {
            uint w[64];
            for (int i = 0; i < 16; i++) {
                w[i] = ((uint) block[i * 4] << 24) | ((uint) block[i * 4 + 1] << 16) |
                       ((uint) block[i * 4 + 2] << 8) | (uint) block[i * 4 + 3];
            }
            for (int i = 16; i < 64; i++) {
                uint s0 = rotr(w[i - 15], 7) ^ rotr(w[i - 15], 18) ^ (w[i - 15] >> 3);
                uint s1 = rotr(w[i - 2], 17) ^ rotr(w[i - 2], 19) ^ (w[i - 2] >> 10);
                w[i] = w[i - 16] + s0 + w[i - 7] + s1;
            }

            uint a = state[0], b = state[1], c = state[2], d = state[3];
            uint e = state[4], f = state[5], g = state[6], h = state[7];

            for (int i = 0; i < 64; i++) {
                uint s1 = rotr(e, 6) ^ rotr(e, 11) ^ rotr(e, 25);
                uint ch = (e & f) ^ (~e & g);
                uint temp1 = h + s1 + ch + K[i] + w[i];
                uint s0 = rotr(a, 2) ^ rotr(a, 13) ^ rotr(a, 22);
                uint maj = (a & b) ^ (a & c) ^ (b & c);
                uint temp2 = s0 + maj;
                h = g; g = f; f = e; e = d + temp1;
                d = c; c = b; b = a; a = temp1 + temp2;
            }

            state[0] += a; state[1] += b; state[2] += c; state[3] += d;
            state[4] += e; state[5] += f; state[6] += g; state[7] += h;
        }

        /// `len` must be small enough that padding fits in two 64-byte
        /// blocks (true for both call sites: 80-byte headers, 32-byte
        /// digests).
        void sha256_bytes(const uchar *data, uint len, uchar *out) {
            uint state[8] = {
                0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
                0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
            };

            uint full_blocks = len / 64;
            for (uint i = 0; i < full_blocks; i++) {
                sha256_transform(state, data + i * 64);
            }

            uchar buf[128];
            uint rem = len - full_blocks * 64;
            for (uint i = 0; i < rem; i++) {
                buf[i] = data[full_blocks * 64 + i];
            }
            buf[rem] = 0x80;
            ulong bit_len = (ulong) len * 8;

            if (rem + 1 <= 56) {
                for (uint i = rem + 1; i < 56; i++) {
                    buf[i] = 0;
                }
                for (int i = 0; i < 8; i++) {
                    buf[56 + i] = (uchar) (bit_len >> (56 - i * 8));
                }
                sha256_transform(state, buf);
            } else {
                for (uint i = rem + 1; i < 64; i++) {
                    buf[i] = 0;
                }
                sha256_transform(state, buf);
                uchar buf2[64];
                for (int i = 0; i < 56; i++) {
                    buf2[i] = 0;
                }
                for (int i = 0; i < 8; i++) {
                    buf2[56 + i] = (uchar) (bit_len >> (56 - i * 8));
                }
                sha256_transform(state, buf2);
            }

            for (int i = 0; i < 8; i++) {
                out[i * 4] = (uchar) (state[i] >> 24);
                out[i * 4 + 1] = (uchar) (state[i] >> 16);
                out[i * 4 + 2] = (uchar) (state[i] >> 8);
                out[i * 4 + 3] = (uchar) state[i];
            }
        }

        void bytes_to_words(const uchar *bytes, uint *words) {
            for (int i = 0; i < 8; i++) {
                words[i] = (uint) bytes[i * 4] | ((uint) bytes[i * 4 + 1] << 8) |
                           ((uint) bytes[i * 4 + 2] << 16) | ((uint) bytes[i * 4 + 3] << 24);
            }
        }

        void words_to_bytes(const uint *words, uchar *bytes) {
            for (int i = 0; i < 8; i++) {
                bytes[i * 4] = (uchar) words[i];
                bytes[i * 4 + 1] = (uchar) (words[i] >> 8);
                bytes[i * 4 + 2] = (uchar) (words[i] >> 16);
                bytes[i * 4 + 3] = (uchar) (words[i] >> 24);
            }
        }

        __kernel void mine(
            __global const uchar *header,
            uint base_nonce,
            __global const uint *bytecode,
            uint bytecode_len,
            __global const uchar *prev_block_hash,
            __global const uchar *merkle_root,
            __global uint *mempool,
            uint mem_cells_per_lane,
            ulong share_target,
            __global uchar *results
        ) {
            uint gid = get_global_id(0);

            uchar local_header[80];
            for (int i = 0; i < 80; i++) {
                local_header[i] = header[i];
            }
            uint nonce = base_nonce + gid;
            local_header[76] = (uchar) nonce;
            local_header[77] = (uchar) (nonce >> 8);
            local_header[78] = (uchar) (nonce >> 16);
            local_header[79] = (uchar) (nonce >> 24);

            uchar digest[32];
            sha256_bytes(local_header, 80, digest);
            uint state[8];
            bytes_to_words(digest, state);

            __global uint *pool = mempool + (size_t) gid * mem_cells_per_lane * 8;
            uint mem_size = 0;
            uint pool_len = 0;

            uint pos = 0;
            while (pos < bytecode_len) {
                uint tag = bytecode[pos++];

                if (tag == OP_ADD || tag == OP_XOR) {
                    uint operand[8];
                    for (int i = 0; i < 8; i++) {
                        operand[i] = pos < bytecode_len ? bytecode[pos++] : 0;
                    }
                    if (tag == OP_ADD) {
                        for (int i = 0; i < 8; i++) {
                            state[i] += operand[i];
                        }
                    } else {
                        for (int i = 0; i < 8; i++) {
                            state[i] ^= operand[i];
                        }
                    }
                } else if (tag == OP_SHA2_SINGLE) {
                    uchar bytes[32];
                    words_to_bytes(state, bytes);
                    sha256_bytes(bytes, 32, digest);
                    bytes_to_words(digest, state);
                } else if (tag == OP_SHA2_LOOP) {
                    uint count = pos < bytecode_len ? bytecode[pos++] : 0;
                    for (uint i = 0; i < count; i++) {
                        uchar bytes[32];
                        words_to_bytes(state, bytes);
                        sha256_bytes(bytes, 32, digest);
                        bytes_to_words(digest, state);
                    }
                } else if (tag == OP_MEMGEN) {
                    uint inner_tag = pos < bytecode_len ? bytecode[pos++] : 0;
                    uint size = pos < bytecode_len ? bytecode[pos++] : 0;
                    if (size > pool_len) {
                        pool_len = size;
                    }
                    if (inner_tag == OP_SHA2_SINGLE) {
                        for (uint index = 0; index < size; index++) {
                            uchar bytes[32];
                            words_to_bytes(state, bytes);
                            sha256_bytes(bytes, 32, digest);
                            bytes_to_words(digest, state);
                            for (int lane = 0; lane < 8; lane++) {
                                pool[index * 8 + lane] = state[lane];
                            }
                        }
                    }
                    mem_size = size;
                } else if (tag == OP_MEMADD || tag == OP_MEMXOR) {
                    uint operand[8];
                    for (int i = 0; i < 8; i++) {
                        operand[i] = pos < bytecode_len ? bytecode[pos++] : 0;
                    }
                    if (mem_size != 0) {
                        for (uint cell = 0; cell < pool_len; cell++) {
                            for (int lane = 0; lane < 8; lane++) {
                                if (tag == OP_MEMADD) {
                                    pool[cell * 8 + lane] += operand[lane];
                                } else {
                                    pool[cell * 8 + lane] ^= operand[lane];
                                }
                            }
                        }
                    }
                } else if (tag == OP_READMEM) {
                    uint region_tag = pos < bytecode_len ? bytecode[pos++] : 0;
                    if (mem_size == 0) {
                        continue;
                    }
                    __global const uchar *region;
                    if (region_tag == REGION_MERKLE) {
                        region = merkle_root;
                    } else if (region_tag == REGION_HASHPREV) {
                        region = prev_block_hash;
                    } else {
                        continue;
                    }
                    uint index = (((uint) region[0]) | ((uint) region[1] << 8) |
                                  ((uint) region[2] << 16) | ((uint) region[3] << 24)) %
                                 mem_size;
                    for (int lane = 0; lane < 8; lane++) {
                        state[lane] = pool[index * 8 + lane];
                    }
                } else {
                    break;
                }
            }

            uchar final_bytes[32];
            words_to_bytes(state, final_bytes);
            ulong top = ((ulong) final_bytes[0] << 56) | ((ulong) final_bytes[1] << 48) |
                        ((ulong) final_bytes[2] << 40) | ((ulong) final_bytes[3] << 32) |
                        ((ulong) final_bytes[4] << 24) | ((ulong) final_bytes[5] << 16) |
                        ((ulong) final_bytes[6] << 8) | (ulong) final_bytes[7];
            results[gid] = top <= share_target ? 1 : 0;
        }
    "#;

    /// Scans `bytecode` the same way `execute` walks it, tracking only the
    /// running-max `MEMGEN` size so the per-lane scratch buffer can be sized
    /// before any kernel launch.
    fn required_mempool_cells(bytecode: &[u32]) -> u32 {
        let mut pos = 0usize;
        let mut max_cells = 0u32;

        let mut pop = |pos: &mut usize| -> u32 {
            let word = bytecode.get(*pos).copied().unwrap_or(0);
            if *pos < bytecode.len() {
                *pos += 1;
            }
            word
        };

        while pos < bytecode.len() {
            let tag = bytecode[pos];
            pos += 1;
            let Some(op) = program::HashOp::from_tag(tag) else {
                break;
            };
            match op {
                program::HashOp::Add | program::HashOp::Xor | program::HashOp::MemAdd | program::HashOp::MemXor => {
                    for _ in 0..8 {
                        pop(&mut pos);
                    }
                }
                program::HashOp::Sha2Single => {}
                program::HashOp::Sha2Loop => {
                    pop(&mut pos);
                }
                program::HashOp::MemGen => {
                    pop(&mut pos);
                    let size = pop(&mut pos);
                    max_cells = max_cells.max(size);
                }
                program::HashOp::ReadMem => {
                    pop(&mut pos);
                }
            }
        }

        max_cells
    }

    pub struct OclBackend {
        pro_que: ProQue,
        platform_id: usize,
        compute_units: u32,
        local_work_size: usize,
        program_buffer: Option<Buffer<u32>>,
        mempool_buffer: Option<Buffer<u32>>,
        mem_cells_per_lane: u32,
    }

    impl OclBackend {
        pub fn new(platform_id: usize, compute_units: u32, local_work_size: usize) -> Result<Self, MinerError> {
            let platforms = Platform::list();
            if platforms.is_empty() {
                return Err(MinerError::GpuNoPlatforms);
            }
            let platform = *platforms
                .get(platform_id)
                .ok_or_else(|| MinerError::GpuPlatform {
                    platform_id,
                    cause: anyhow!("only {} platform(s) available", platforms.len()),
                })?;

            let pro_que = ProQue::builder()
                .platform(platform)
                .src(KERNEL_SOURCE)
                .dims(compute_units as usize)
                .build()
                .map_err(|error| MinerError::GpuPlatform {
                    platform_id,
                    cause: anyhow!(error),
                })?;

            Ok(Self {
                pro_que,
                platform_id,
                compute_units,
                local_work_size,
                program_buffer: None,
                mempool_buffer: None,
                mem_cells_per_lane: 1,
            })
        }
    }

    impl GpuBackend for OclBackend {
        fn load_program(&mut self, bytecode: &[u32]) -> Result<(), MinerError> {
            let platform_id = self.platform_id;

            let buffer = self
                .pro_que
                .buffer_builder::<u32>()
                .len(bytecode.len().max(1))
                .flags(MemFlags::new().read_only())
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;
            if !bytecode.is_empty() {
                buffer
                    .write(bytecode)
                    .enq()
                    .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;
            }
            self.program_buffer = Some(buffer);

            self.mem_cells_per_lane = required_mempool_cells(bytecode).max(1);
            let mempool_len = self.compute_units as usize * self.mem_cells_per_lane as usize * 8;
            let mempool_buffer = self
                .pro_que
                .buffer_builder::<u32>()
                .len(mempool_len)
                .flags(MemFlags::new().read_write())
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;
            self.mempool_buffer = Some(mempool_buffer);

            Ok(())
        }

        fn scan(
            &mut self,
            header: &[u8; 80],
            prev_block_hash: &[u8; 32],
            merkle_root: &[u8; 32],
            base_nonce: u32,
            share_target: u64,
        ) -> Result<Vec<u32>, MinerError> {
            let platform_id = self.platform_id;

            let header_buffer = self
                .pro_que
                .buffer_builder::<u8>()
                .len(80)
                .copy_host_slice(header)
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            let prev_block_hash_buffer = self
                .pro_que
                .buffer_builder::<u8>()
                .len(32)
                .copy_host_slice(prev_block_hash)
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            let merkle_root_buffer = self
                .pro_que
                .buffer_builder::<u8>()
                .len(32)
                .copy_host_slice(merkle_root)
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            let results = self
                .pro_que
                .buffer_builder::<u8>()
                .len(self.compute_units as usize)
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            let bytecode_buffer = self
                .program_buffer
                .as_ref()
                .ok_or(MinerError::GpuPlatform { platform_id, cause: anyhow!("program not loaded") })?;
            let mempool_buffer = self
                .mempool_buffer
                .as_ref()
                .ok_or(MinerError::GpuPlatform { platform_id, cause: anyhow!("program not loaded") })?;

            let kernel = Kernel::builder()
                .program(&self.pro_que.program())
                .name("mine")
                .queue(self.pro_que.queue().clone())
                .global_work_size(self.compute_units as usize)
                .local_work_size(self.local_work_size)
                .arg(&header_buffer)
                .arg(base_nonce)
                .arg(bytecode_buffer)
                .arg(bytecode_buffer.len() as u32)
                .arg(&prev_block_hash_buffer)
                .arg(&merkle_root_buffer)
                .arg(mempool_buffer)
                .arg(self.mem_cells_per_lane)
                .arg(share_target)
                .arg(&results)
                .build()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            unsafe {
                kernel
                    .enq()
                    .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;
            }

            let mut host_results = vec![0u8; self.compute_units as usize];
            results
                .read(&mut host_results)
                .enq()
                .map_err(|error| MinerError::GpuPlatform { platform_id, cause: anyhow!(error) })?;

            Ok(host_results
                .iter()
                .enumerate()
                .filter(|(_, &hit)| hit != 0)
                .map(|(index, _)| base_nonce.wrapping_add(index as u32))
                .collect())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn required_mempool_cells_tracks_the_largest_memgen() {
            let program = format!("MEMGEN SHA2 4$MEMADD {}$MEMGEN ADD 9$READMEM MERKLE", "0".repeat(64));
            assert_eq!(required_mempool_cells(&program::assemble(&program)), 9);
        }

        #[test]
        fn required_mempool_cells_is_zero_without_memgen() {
            let bytecode = program::assemble("SHA2");
            assert_eq!(required_mempool_cells(&bytecode), 0);
        }
    }
}
