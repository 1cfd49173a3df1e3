use super::*;

/// A `mining.authorize` request. This client always sends both fields
/// (spec §4.7/§6): the pool is never asked to infer a default password.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorize {
    pub username: String,
    pub password: String,
}

impl Serialize for Authorize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.username)?;
        seq.serialize_element(&self.password)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Authorize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (username, password): (String, String) = Deserialize::deserialize(deserializer)?;
        Ok(Authorize { username, password })
    }
}
