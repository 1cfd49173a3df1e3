use super::*;

/// A `mining.set_difficulty` push: `params[0]` is the new share difficulty
/// as a float (spec §4.7/§6), converted to a target via `difficulty::share_target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetDifficulty(pub f64);

impl SetDifficulty {
    pub fn difficulty(self) -> f64 {
        self.0
    }
}

impl Serialize for SetDifficulty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1))?;
        seq.serialize_element(&self.0)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SetDifficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (diff,): (f64,) = Deserialize::deserialize(deserializer)?;
        Ok(SetDifficulty(diff))
    }
}
