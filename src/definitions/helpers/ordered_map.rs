use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{collections::BTreeSet, fmt, marker::PhantomData};

/// A CBOR map that keeps its entries in encoded order and rejects duplicate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V>(Vec<(K, V)>);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duplicate map key")]
    DuplicateKey,
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// First key that appears more than once, in O(n log n).
fn first_duplicate<K: Ord, V>(entries: &[(K, V)]) -> Option<&K> {
    let mut seen = BTreeSet::new();
    entries
        .iter()
        .map(|(k, _)| k)
        .find(|k| !seen.insert(*k))
}

impl<K: Ord, V> TryFrom<Vec<(K, V)>> for OrderedMap<K, V> {
    type Error = Error;

    fn try_from(entries: Vec<(K, V)>) -> Result<Self, Error> {
        match first_duplicate(&entries) {
            Some(_) => Err(Error::DuplicateKey),
            None => Ok(Self(entries)),
        }
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Debug,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

struct OrderedMapVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for OrderedMapVisitor<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Debug,
    V: Deserialize<'de>,
{
    type Value = OrderedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with unique keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        // Length prefixes come from the peer, cap the preallocation.
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(64));
        while let Some(entry) = access.next_entry::<K, V>()? {
            entries.push(entry);
        }
        if let Some(k) = first_duplicate(&entries) {
            return Err(de::Error::custom(format!("duplicate map key: {k:?}")));
        }
        Ok(OrderedMap(entries))
    }
}

#[cfg(test)]
mod test {
    use ciborium::Value;

    use super::OrderedMap;
    use crate::cbor;

    #[test]
    fn keeps_encoded_order() {
        let value = Value::Map(vec![
            (Value::Text("z".into()), Value::Bool(true)),
            (Value::Text("a".into()), Value::Bool(false)),
        ]);
        let bytes = cbor::to_vec(&value).unwrap();
        let map: OrderedMap<String, bool> = cbor::from_slice(&bytes).unwrap();
        let keys: Vec<&String> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(cbor::to_vec(&map).unwrap(), bytes);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let value = Value::Map(vec![
            (Value::Text("a".into()), Value::Bool(true)),
            (Value::Text("a".into()), Value::Bool(false)),
        ]);
        let bytes = cbor::to_vec(&value).unwrap();
        assert!(cbor::from_slice::<OrderedMap<String, bool>>(&bytes).is_err());
    }

    #[test]
    fn large_maps_are_checked_for_duplicates() {
        let entries = |count: usize| -> Vec<(Value, Value)> {
            (0..count)
                .map(|i| (Value::Text(format!("element_{i}")), Value::Bool(i % 2 == 0)))
                .collect()
        };

        let unique = cbor::to_vec(&Value::Map(entries(40_000))).unwrap();
        let map: OrderedMap<String, bool> = cbor::from_slice(&unique).unwrap();
        assert_eq!(map.len(), 40_000);
        assert_eq!(map.iter().last().map(|(k, _)| k.as_str()), Some("element_39999"));

        let mut duplicated = entries(40_000);
        duplicated.push((Value::Text("element_0".into()), Value::Bool(true)));
        let duplicated = cbor::to_vec(&Value::Map(duplicated)).unwrap();
        assert!(cbor::from_slice::<OrderedMap<String, bool>>(&duplicated).is_err());
    }

    #[test]
    fn construction_rejects_duplicates() {
        assert!(OrderedMap::try_from(vec![("a", 1), ("b", 2)]).is_ok());
        assert!(OrderedMap::try_from(vec![("a", 1), ("b", 2), ("a", 3)]).is_err());
    }
}
