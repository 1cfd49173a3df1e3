use super::*;

/// A `mining.submit` request. This protocol's extranonce2 slot is always
/// sent empty (spec §4.7/§6); the miner has no extranonce of its own to
/// contribute there.
#[derive(Debug, Clone, PartialEq)]
pub struct Submit {
    pub username: String,
    pub job_id: String,
    pub hex_ntime: String,
    pub hex_nonce: String,
}

impl Serialize for Submit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.username)?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element("")?;
        seq.serialize_element(&self.hex_ntime)?;
        seq.serialize_element(&self.hex_nonce)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Submit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (username, job_id, _extranonce2, hex_ntime, hex_nonce): (String, String, String, String, String) =
            Deserialize::deserialize(deserializer)?;

        Ok(Submit {
            username,
            job_id,
            hex_ntime,
            hex_nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_serializes_with_empty_extranonce2_slot() {
        let submit = Submit {
            username: "alice.worker1".into(),
            job_id: "bf".into(),
            hex_ntime: "504e86ed".into(),
            hex_nonce: "b2957c02".into(),
        };
        let v = serde_json::to_value(&submit).unwrap();
        assert_eq!(v, json!(["alice.worker1", "bf", "", "504e86ed", "b2957c02"]));
    }

    #[test]
    fn submit_roundtrip() {
        let submit = Submit {
            username: "alice".into(),
            job_id: "1".into(),
            hex_ntime: "00000000".into(),
            hex_nonce: "00000001".into(),
        };
        let ser = serde_json::to_string(&submit).unwrap();
        let back: Submit = serde_json::from_str(&ser).unwrap();
        assert_eq!(back, submit);
    }
}
