/*
 *  sources/deutils.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Lenient deserializers for LMS JSON, which mixes strings and numbers freely
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn default_false() -> bool { false }
pub fn default_true() -> bool { true }

pub fn deserialize_bool_from_anything<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    let s = v.to_string().trim_matches('"').trim().to_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "y" | "t" => Ok(true),
        "0" | "false" | "no" | "n" | "f" | "null" | "" => Ok(false),
        _ => Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&s),
            &"expected boolean representation",
        )),
    }
}

pub fn deserialize_numeric_i16<'de, D>(deserializer: D) -> Result<i16, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    let n = v
        .as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| D::Error::custom("non-integer"))?
        .try_into()
        .map_err(|_| D::Error::custom("overflow"))?;
    Ok(n)
}

/// Seconds as number or numeric string, absent or garbage maps to `None`.
pub fn deserialize_opt_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))))
}

/// Strings that LMS sometimes sends as bare numbers (`coverid`, `id`).
pub fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default = "default_false", deserialize_with = "deserialize_bool_from_anything")]
        flag: bool,
        #[serde(default, deserialize_with = "deserialize_opt_seconds")]
        secs: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_opt_string")]
        label: Option<String>,
    }

    #[test]
    fn test_mixed_representations() {
        let p: Probe = serde_json::from_str(r#"{"flag":"1","secs":"12.5","label":42}"#).unwrap();
        assert!(p.flag);
        assert_eq!(p.secs, Some(12.5));
        assert_eq!(p.label.as_deref(), Some("42"));

        let p: Probe = serde_json::from_str(r#"{"flag":0,"secs":3}"#).unwrap();
        assert!(!p.flag);
        assert_eq!(p.secs, Some(3.0));
        assert_eq!(p.label, None);
    }

    #[test]
    fn test_missing_fields_default() {
        let p: Probe = serde_json::from_str("{}").unwrap();
        assert!(!p.flag);
        assert_eq!(p.secs, None);
    }
}
