use {super::*, primitive_types::U256};

/// Maps a pool-assigned difficulty to the 64-bit target prefix this protocol's
/// share test compares a digest's leading 8 bytes against.
///
/// Adapted from the scaled-integer-division technique stratum pools use to
/// convert a difficulty float into a 256-bit target without losing precision
/// to plain floating point division, narrowed here to the 64-bit space this
/// protocol's digest prefix lives in. Difficulty below 1 clamps to 1: there
/// is no "easier than the base target" share.
fn share_to_target(difficulty: f64) -> u64 {
    let difficulty = if difficulty.is_finite() && difficulty >= 1.0 {
        difficulty
    } else {
        1.0
    };

    const SCALE: u64 = 1_000_000_000;

    let numerator = U256::from(u64::MAX).saturating_mul(U256::from(SCALE));
    let denominator = (difficulty * SCALE as f64).round() as u64;

    let target = if denominator == 0 {
        U256::from(u64::MAX)
    } else {
        numerator / U256::from(denominator)
    };

    target.min(U256::from(u64::MAX)).as_u64()
}

/// The share target a worker compares its digest prefix against for a given
/// pool difficulty. The base 64-bit target is widened by a fixed 65536
/// factor to match this protocol's share-space convention, then clamped.
pub fn share_target(difficulty: f64) -> u64 {
    let base = share_to_target(difficulty) as u128;
    base.saturating_mul(65536).min(u64::MAX as u128) as u64
}
