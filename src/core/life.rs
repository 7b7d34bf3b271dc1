// src/core/life.rs

//! Cache-life profiles: validation, name resolution, and folding into the
//! ambient per-operation stale/revalidate/expire trackers.
//!
//! The trackers themselves are owned by the caller's request-scoped state;
//! this module only validates a declared profile and merges it in, keeping
//! the most restrictive window across multiple declarations.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::core::errors::CacheError;

/// A named or literal stale/revalidate/expire configuration, in seconds.
///
/// `f64::INFINITY` models an unbounded window; config files spell it
/// `"unbounded"`. A boolean is rejected outright at deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct CacheLifeProfile {
    #[serde(default, deserialize_with = "deserialize_window")]
    pub stale: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_window")]
    pub revalidate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_window")]
    pub expire: Option<f64>,
}

fn deserialize_window<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Keyword(String),
        Sentinel(bool),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Seconds(seconds)) => Ok(Some(seconds)),
        Some(Raw::Keyword(word)) if word == "unbounded" => Ok(Some(f64::INFINITY)),
        Some(Raw::Keyword(word)) => Err(serde::de::Error::custom(format!(
            "invalid cache life window '{word}'; expected a number of seconds or \"unbounded\""
        ))),
        Some(Raw::Sentinel(_)) => Err(serde::de::Error::custom(
            "a boolean is not a valid cache life window; use \"unbounded\" instead",
        )),
    }
}

/// Checks a profile's numeric constraints.
///
/// Every present field must be a non-negative, non-NaN number of seconds
/// (`+inf` meaning unbounded is allowed), and a bounded `expire` must not be
/// shorter than `revalidate`.
pub fn validate_profile(name: &str, profile: &CacheLifeProfile) -> Result<(), CacheError> {
    for (field, window) in [
        ("stale", profile.stale),
        ("revalidate", profile.revalidate),
        ("expire", profile.expire),
    ] {
        if let Some(seconds) = window
            && (seconds.is_nan() || seconds < 0.0)
        {
            return Err(CacheError::InvalidCacheLife(format!(
                "profile '{name}': '{field}' must be a non-negative number of seconds"
            )));
        }
    }

    if let (Some(revalidate), Some(expire)) = (profile.revalidate, profile.expire)
        && revalidate > expire
    {
        return Err(CacheError::InvalidCacheLife(format!(
            "profile '{name}': 'expire' ({expire}) must not be shorter than 'revalidate' ({revalidate})"
        )));
    }

    Ok(())
}

/// The ambient per-operation trackers for the most restrictive explicit
/// windows declared so far. Owned by the caller; this module only folds
/// profiles into it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperationLife {
    pub stale: Option<f64>,
    pub revalidate: Option<f64>,
    pub expire: Option<f64>,
}

/// Merges a validated profile into the trackers, field-wise by minimum:
/// the shortest window declared within one operation wins.
pub fn apply_profile(profile: &CacheLifeProfile, life: &mut OperationLife) {
    fold_min(&mut life.stale, profile.stale);
    fold_min(&mut life.revalidate, profile.revalidate);
    fold_min(&mut life.expire, profile.expire);
}

fn fold_min(current: &mut Option<f64>, incoming: Option<f64>) {
    if let Some(window) = incoming
        && current.is_none_or(|existing| existing > window)
    {
        *current = Some(window);
    }
}

/// Resolves a profile name against the configured table.
///
/// An unresolved name is a configuration error; when trimming whitespace
/// would have matched, the error says so.
pub fn resolve_profile<'a>(
    name: &str,
    profiles: &'a IndexMap<String, CacheLifeProfile>,
) -> Result<&'a CacheLifeProfile, CacheError> {
    if let Some(profile) = profiles.get(name) {
        return Ok(profile);
    }

    let trimmed = name.trim();
    let hint = if trimmed != name && profiles.contains_key(trimmed) {
        format!("; did you mean \"{trimmed}\"?")
    } else {
        String::new()
    };

    Err(CacheError::UnknownCacheLifeProfile(format!(
        "\"{name}\"{hint}"
    )))
}
