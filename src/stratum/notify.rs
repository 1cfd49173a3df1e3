use super::*;

/// A `mining.notify` payload: job parameters for a new block template (spec
/// §4.4/§6). `merkle_branch` and `unused` are carried through for wire
/// fidelity but not consulted by `work::set_job` — `merkle_branch` is
/// accepted but unused per spec §4.4.
#[derive(Debug, Clone, PartialEq)]
pub struct Notify {
    pub job_id: String,
    pub prev_hash: String,
    pub coinb1: String,
    pub coinb2: String,
    pub merkle_branch: Vec<String>,
    pub unused: Value,
    pub nbits: String,
    pub ntime: String,
    pub program: String,
}

impl Serialize for Notify {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(9))?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.prev_hash)?;
        seq.serialize_element(&self.coinb1)?;
        seq.serialize_element(&self.coinb2)?;
        seq.serialize_element(&self.merkle_branch)?;
        seq.serialize_element(&self.unused)?;
        seq.serialize_element(&self.nbits)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.program)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Notify {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (job_id, prev_hash, coinb1, coinb2, merkle_branch, unused, nbits, ntime, program) =
            <(String, String, String, String, Vec<String>, Value, String, String, String)>::deserialize(
                deserializer,
            )?;

        Ok(Notify {
            job_id,
            prev_hash,
            coinb1,
            coinb2,
            merkle_branch,
            unused,
            nbits,
            ntime,
            program,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notify {
        Notify {
            job_id: "bf".into(),
            prev_hash: "00".repeat(32),
            coinb1: "01000000".into(),
            coinb2: "ffffffff".into(),
            merkle_branch: Vec::new(),
            unused: json!(null),
            nbits: "1d00ffff".into(),
            ntime: "504e86b9".into(),
            program: "SHA2".into(),
        }
    }

    #[test]
    fn roundtrips_through_the_nine_element_array_shape() {
        let notify = sample();
        let value = serde_json::to_value(&notify).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().unwrap().len(), 9);

        let back: Notify = serde_json::from_value(value).unwrap();
        assert_eq!(back, notify);
    }

    #[test]
    fn parses_from_a_literal_wire_array() {
        let wire = r#"["bf","00","c1","c2",["a","b"],null,"1d00ffff","504e86b9","ADD 00"]"#;
        let notify: Notify = serde_json::from_str(wire).unwrap();
        assert_eq!(notify.job_id, "bf");
        assert_eq!(notify.merkle_branch, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(notify.program, "ADD 00");
    }
}
