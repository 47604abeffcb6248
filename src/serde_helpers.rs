// src/serde_helpers.rs

use serde::{de, Deserialize, Deserializer, Serializer};

/// Optional byte strings travel as hex on the wire.
pub mod option_hex {
    use super::*;

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => {
                let s = s.strip_prefix("0x").unwrap_or(&s);
                hex::decode(s).map(Some).map_err(de::Error::custom)
            }
        }
    }
}

// Ledger uints can exceed what some JSON producers emit as numbers, so
// both `123` and `"123"` are accepted.
struct UintVisitor<T>(std::marker::PhantomData<T>);

impl<'de, T> de::Visitor<'de> for UintVisitor<T>
where
    T: TryFrom<u128> + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    type Value = T;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an unsigned integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        self.visit_u128(u128::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<T, E> {
        T::try_from(v).map_err(|_| E::custom(format!("integer {} out of range", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(format!("negative integer {}", v)))?;
        self.visit_u64(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        v.trim().parse::<T>().map_err(E::custom)
    }
}

fn deserialize_uint<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u128> + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    deserializer.deserialize_any(UintVisitor(std::marker::PhantomData))
}

pub mod uint64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserialize_uint(deserializer)
    }
}

pub mod uint128 {
    use super::*;

    // Serialized as a decimal string so JSON consumers without 128-bit
    // integers keep full precision.
    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserialize_uint(deserializer)
    }
}

pub mod option_uint64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapped(#[serde(with = "super::uint64")] u64);

        let raw: Option<Wrapped> = Option::deserialize(deserializer)?;
        Ok(raw.map(|Wrapped(v)| v))
    }
}

pub fn option_duration_secs<S>(value: &Option<std::time::Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(d) => serializer.serialize_some(&d.as_secs()),
        None => serializer.serialize_none(),
    }
}
