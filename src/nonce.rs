use super::*;

/// Seeds one worker's starting nonce so that distinct workers explore
/// disjoint-with-high-probability regions of the 32-bit nonce space.
///
/// The source seeds from `rand() * time()` and reseeds on every call; this
/// is explicitly not required to be behaviorally equivalent (spec §9). A
/// `rand::rng()` draw per worker, mixed once with the worker index, gives
/// the same "distinct with overwhelming probability" property from a real
/// entropy source instead.
pub fn seed(worker_index: usize) -> u32 {
    let draw: u32 = rand::rng().random();
    draw.wrapping_add((worker_index as u32 + 1).wrapping_mul(0x9e37_79b9))
}
