use serde::Deserialize;
use std::collections::HashSet;

use crate::error::{BalancerError, BalancerResult};
use crate::models::{AuditorProfile, AuditorRole};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    role: AuditorRole,
    #[serde(default)]
    specializations: Vec<String>,
    #[serde(default, alias = "daily_capacity")]
    daily_capacity: Option<u32>,
    #[serde(default, alias = "current_load")]
    current_load: u32,
    #[serde(default, alias = "mean_handling_minutes")]
    mean_handling_minutes: Option<f64>,
    #[serde(default, alias = "deduction_rate")]
    deduction_rate: Option<f64>,
    #[serde(default = "active_by_default")]
    active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterDocument {
    List(Vec<RosterEntry>),
    Wrapped { auditors: Vec<RosterEntry> },
}

/// Parse a roster document: either a bare array of auditors or an object
/// with an `auditors` array. Members without a capacity get
/// `default_capacity`.
///
/// # Errors
///
/// Invalid JSON, an unknown role, an empty or duplicate id, or a current load
/// above the member's capacity.
pub fn parse_roster(bytes: &[u8], default_capacity: u32) -> BalancerResult<Vec<AuditorProfile>> {
    let document: RosterDocument = serde_json::from_slice(bytes)
        .map_err(|e| BalancerError::InvalidRoster(e.to_string()))?;
    let entries = match document {
        RosterDocument::List(entries) | RosterDocument::Wrapped { auditors: entries } => entries,
    };

    let mut seen = HashSet::new();
    let mut roster = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry.id.trim().to_string();
        if id.is_empty() {
            return Err(BalancerError::InvalidRoster(
                "auditor with empty id".to_string(),
            ));
        }
        if !seen.insert(id.clone()) {
            return Err(BalancerError::InvalidRoster(format!("duplicate auditor {id}")));
        }
        let daily_capacity = entry.daily_capacity.unwrap_or(default_capacity);
        if entry.current_load > daily_capacity {
            return Err(BalancerError::InvalidRoster(format!(
                "auditor {id} has load {} above capacity {daily_capacity}",
                entry.current_load
            )));
        }
        roster.push(AuditorProfile {
            id,
            name: entry.name,
            role: entry.role,
            specializations: entry.specializations,
            daily_capacity,
            current_load: entry.current_load,
            version: 0,
            mean_handling_minutes: entry.mean_handling_minutes,
            deduction_rate: entry.deduction_rate,
            active: entry.active,
        });
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_wrapped_rosters() {
        let bare = br#"[{"id": "aud-1", "role": "medical", "dailyCapacity": 12}]"#;
        let wrapped = br#"{"auditors": [{"id": "aud-2", "role": "administrativo"}]}"#;

        let bare = parse_roster(bare, 40).unwrap();
        let wrapped = parse_roster(wrapped, 40).unwrap();

        assert_eq!(bare[0].daily_capacity, 12);
        assert!(bare[0].active);
        assert_eq!(wrapped[0].role, AuditorRole::Administrative);
        assert_eq!(wrapped[0].daily_capacity, 40);
    }

    #[test]
    fn test_reject_duplicates_and_overload() {
        let duplicate = br#"[{"id": "a", "role": "medical"}, {"id": "a", "role": "medical"}]"#;
        let overloaded = br#"[{"id": "a", "role": "medical", "dailyCapacity": 2, "currentLoad": 3}]"#;

        assert!(parse_roster(duplicate, 10).is_err());
        assert!(parse_roster(overloaded, 10).is_err());
        assert!(parse_roster(b"{}", 10).is_err());
    }
}
