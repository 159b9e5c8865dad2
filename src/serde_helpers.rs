use indexmap::IndexMap;
use serde::{ser::SerializeMap as _, Deserialize as _};
use smol_str::SmolStr;

pub(crate) fn kerning_to_list<S>(
    map: &IndexMap<(SmolStr, SmolStr), i32>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut ser_map = serializer.serialize_map(Some(map.len()))?;
    for ((left, right), value) in map {
        let key = format!("{}:{}", left, right);
        ser_map.serialize_entry(&key, value)?;
    }
    ser_map.end()
}

pub(crate) fn kerning_from_list<'de, D>(
    deserializer: D,
) -> Result<IndexMap<(SmolStr, SmolStr), i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw_map: IndexMap<String, i32> = IndexMap::deserialize(deserializer)?;
    let mut map = IndexMap::new();
    for (key, value) in raw_map {
        let parts: Vec<&str> = key.splitn(2, ':').collect();
        if parts.len() != 2 {
            return Err(serde::de::Error::custom(format!(
                "Invalid kerning key format: {}",
                key
            )));
        }
        map.insert((SmolStr::new(parts[0]), SmolStr::new(parts[1])), value);
    }
    Ok(map)
}
