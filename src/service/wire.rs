/// Present/absent wrapper used by the backend for every optional field.
///
/// Absent travels as `[]` and present as `[value]`. Use with
/// `#[serde(with = "wire::opt", default)]`.
pub mod opt {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => [inner].serialize(serializer),
            None => {
                let empty: [&T; 0] = [];
                empty.serialize(serializer)
            }
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let mut items: Vec<T> = Vec::deserialize(deserializer)?;
        match items.len() {
            0 | 1 => Ok(items.pop()),
            n => Err(D::Error::invalid_length(n, &"zero or one element")),
        }
    }
}
