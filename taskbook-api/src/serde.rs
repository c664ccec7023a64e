use serde::{Deserialize, Deserializer};

/// Distinguishes an omitted field from an explicit null when paired with
/// `#[serde(default)]` on an `Option<Option<T>>` field.
pub fn nested_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}
