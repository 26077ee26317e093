//! Serde helpers for the loosely typed catalog API.
//!
//! The same endpoint is served by SQLite and PostgreSQL backends, so ids may
//! be strings or integers, prices may be numbers or numeric strings, and
//! flags may be booleans, `0/1` or `"true"/"false"`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Str(String),
    Int(i64),
    Float(f64),
}

impl IdRepr {
    fn into_id(self) -> Option<String> {
        match self {
            IdRepr::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
            }
            IdRepr::Int(n) => Some(n.to_string()),
            IdRepr::Float(f) if f.fract() == 0.0 => Some((f as i64).to_string()),
            IdRepr::Float(f) => Some(f.to_string()),
        }
    }
}

/// Deserialize a required id, normalizing integers to strings.
pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IdRepr::deserialize(deserializer)?
        .into_id()
        .ok_or_else(|| serde::de::Error::custom("id must not be empty"))
}

/// Deserialize an optional id; `null`, `""` and absent all become `None`.
pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<IdRepr>::deserialize(deserializer)?.and_then(IdRepr::into_id))
}

/// Deserialize a list of ids, dropping empty entries.
pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Vec<IdRepr>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().filter_map(IdRepr::into_id).collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Num(f64),
    Str(String),
}

/// Deserialize an optional decimal that may arrive as a string.
pub fn opt_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberRepr::Num(n)) => Ok(Some(n)),
        Some(NumberRepr::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberRepr::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal: {s}"))),
    }
}

/// Deserialize an optional count that may arrive as a string.
pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(opt_decimal(deserializer)?.map(|n| n as i64))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Deserialize a flag; anything unrecognised or absent is `false`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<FlagRepr>::deserialize(deserializer)? {
        Some(FlagRepr::Bool(b)) => b,
        Some(FlagRepr::Int(n)) => n != 0,
        Some(FlagRepr::Str(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => false,
    })
}

/// Deserialize an optional string, mapping blank strings to `None`.
pub fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::id")]
        id: String,
        #[serde(default, deserialize_with = "super::opt_id")]
        parent: Option<String>,
        #[serde(default, deserialize_with = "super::opt_decimal")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "super::flag")]
        trending: bool,
        #[serde(default, deserialize_with = "super::ids")]
        members: Vec<String>,
    }

    #[test]
    fn test_integer_ids_become_strings() {
        let row: Row = serde_json::from_str(r#"{"id": 7, "parent": 3, "members": [1, "2", ""]}"#).unwrap();
        assert_eq!(row.id, "7");
        assert_eq!(row.parent.as_deref(), Some("3"));
        assert_eq!(row.members, vec!["1", "2"]);
    }

    #[test]
    fn test_blank_parent_is_none() {
        let row: Row = serde_json::from_str(r#"{"id": "a", "parent": ""}"#).unwrap();
        assert!(row.parent.is_none());

        let row: Row = serde_json::from_str(r#"{"id": "a", "parent": null}"#).unwrap();
        assert!(row.parent.is_none());
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"id": " "}"#).is_err());
    }

    #[test]
    fn test_price_from_string_or_number() {
        let row: Row = serde_json::from_str(r#"{"id": 1, "price": "19.99"}"#).unwrap();
        assert_eq!(row.price, Some(19.99));

        let row: Row = serde_json::from_str(r#"{"id": 1, "price": 5}"#).unwrap();
        assert_eq!(row.price, Some(5.0));

        assert!(serde_json::from_str::<Row>(r#"{"id": 1, "price": "abc"}"#).is_err());
    }

    #[test]
    fn test_flag_variants() {
        for (json, expected) in [
            (r#"{"id": 1, "trending": true}"#, true),
            (r#"{"id": 1, "trending": 1}"#, true),
            (r#"{"id": 1, "trending": 0}"#, false),
            (r#"{"id": 1, "trending": "true"}"#, true),
            (r#"{"id": 1, "trending": null}"#, false),
            (r#"{"id": 1}"#, false),
        ] {
            let row: Row = serde_json::from_str(json).unwrap();
            assert_eq!(row.trending, expected, "{json}");
        }
    }
}
