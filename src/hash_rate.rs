use super::*;

/// A hashes-per-second figure, formatted/parsed with the SI suffixes the
/// rest of this codebase uses for large counters (spec §4.6, ambient
/// addition: the periodic stats reporter needs something to print).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct HashRate(pub f64);

impl HashRate {
    pub const ZERO: Self = Self(0.0);

    /// Hashrate implied by `nonces` attempts over `elapsed` wall-clock time.
    pub fn from_nonces(nonces: u64, elapsed: Duration) -> Self {
        if elapsed.is_zero() {
            Self::ZERO
        } else {
            Self(nonces as f64 / elapsed.as_secs_f64())
        }
    }
}

impl Display for HashRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        si::format_si(self.0, "H/s", f)
    }
}

impl FromStr for HashRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(si::parse_si(s, &["H/s", "h/s", "H", "h"])?))
    }
}
