//! Upsert-with-rotation policy for the daily threat intel set
//!
//! Creating `TF-<YYYYMMDD>` can hit two conflicts. A name collision means an
//! earlier run today already registered the set, so it is repointed in place.
//! Hitting the detector's set limit evicts the oldest `TF-` set by renaming it
//! to today's name. Sets without the `TF-` prefix are never touched and at
//! most one set is mutated per call.

use crate::intel::{IntelError, ThreatIntelService};
use crate::models::ThreatIntelSet;
use crate::models::naming::{SET_NAME_PREFIX, parse_set_date};

/// How the set ended up pointing at the new location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { id: String },
    Updated { id: String },
    Rotated { id: String, evicted: String },
}

impl UpsertOutcome {
    pub fn set_id(&self) -> &str {
        match self {
            UpsertOutcome::Created { id }
            | UpsertOutcome::Updated { id }
            | UpsertOutcome::Rotated { id, .. } => id,
        }
    }
}

/// Ensure an active set named `name` points at `location`
pub async fn upsert_threat_intel_set(
    service: &dyn ThreatIntelService,
    detector_id: &str,
    name: &str,
    location: &str,
) -> Result<UpsertOutcome, IntelError> {
    match service
        .create_threat_intel_set(detector_id, name, location)
        .await
    {
        Ok(id) => {
            tracing::info!(set_id = %id, name = name, "Created threat intel set");
            Ok(UpsertOutcome::Created { id })
        }
        Err(conflict @ IntelError::NameExists(_)) => {
            tracing::info!(name = name, "Threat intel set already exists, updating it");
            update_existing(service, detector_id, name, location, conflict).await
        }
        Err(conflict @ IntelError::LimitExceeded(_)) => {
            tracing::warn!(name = name, "Threat intel set limit reached, rotating the oldest");
            rotate_oldest(service, detector_id, name, location, conflict).await
        }
        Err(e) => Err(e),
    }
}

async fn update_existing(
    service: &dyn ThreatIntelService,
    detector_id: &str,
    name: &str,
    location: &str,
    conflict: IntelError,
) -> Result<UpsertOutcome, IntelError> {
    for id in service.list_threat_intel_sets(detector_id).await? {
        let set = service.get_threat_intel_set(detector_id, &id).await?;
        if set.name == name {
            service
                .update_threat_intel_set(detector_id, &id, name, location)
                .await?;
            tracing::info!(
                set_id = %id,
                name = name,
                previous_location = ?set.location,
                "Updated threat intel set"
            );
            return Ok(UpsertOutcome::Updated { id });
        }
    }

    tracing::error!(name = name, "Name conflict reported but no set carries that name");
    Err(conflict)
}

async fn rotate_oldest(
    service: &dyn ThreatIntelService,
    detector_id: &str,
    name: &str,
    location: &str,
    conflict: IntelError,
) -> Result<UpsertOutcome, IntelError> {
    let mut sets = vec![];
    for id in service.list_threat_intel_sets(detector_id).await? {
        sets.push(service.get_threat_intel_set(detector_id, &id).await?);
    }

    let Some(oldest) = oldest_managed_set(&sets) else {
        tracing::error!(total = sets.len(), "Set limit reached and no TF- set is eligible for rotation");
        return Err(conflict);
    };

    service
        .update_threat_intel_set(detector_id, &oldest.id, name, location)
        .await?;

    tracing::info!(
        set_id = %oldest.id,
        evicted = %oldest.name,
        evicted_status = ?oldest.status,
        name = name,
        "Rotated oldest threat intel set"
    );

    Ok(UpsertOutcome::Rotated {
        id: oldest.id.clone(),
        evicted: oldest.name.clone(),
    })
}

/// Earliest dated `TF-` set; equal dates fall back to the smallest id
pub fn oldest_managed_set(sets: &[ThreatIntelSet]) -> Option<&ThreatIntelSet> {
    sets.iter()
        .filter_map(|set| match parse_set_date(&set.name) {
            Some(date) => Some((date, set)),
            None => {
                if set.name.starts_with(SET_NAME_PREFIX) {
                    tracing::warn!(name = %set.name, "Skipping TF- set with unparseable date");
                }
                None
            }
        })
        .min_by(|(a_date, a), (b_date, b)| a_date.cmp(b_date).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, set)| set)
}
