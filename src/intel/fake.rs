//! In-memory monitoring service used by the handler and policy tests
//!
//! A stateful fake rather than a mockall mock: the rotation policy depends on
//! GuardDuty's name uniqueness and set limit, which per-call expectations
//! cannot model.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::intel::{IntelError, ThreatIntelService};
use crate::models::ThreatIntelSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDetectors,
    Create { name: String },
    List,
    Get { id: String },
    Update { id: String, name: String, location: String },
}

struct State {
    sets: Vec<ThreatIntelSet>,
    calls: Vec<Call>,
    next_id: usize,
}

/// Enforces unique names and a maximum set count the way GuardDuty does
pub struct FakeGuardDuty {
    detectors: Vec<String>,
    limit: usize,
    create_error: Option<IntelError>,
    state: Mutex<State>,
}

impl FakeGuardDuty {
    pub fn new(limit: usize) -> Self {
        Self {
            detectors: vec!["detector-1".to_string()],
            limit,
            create_error: None,
            state: Mutex::new(State {
                sets: vec![],
                calls: vec![],
                next_id: 0,
            }),
        }
    }

    pub fn without_detector() -> Self {
        Self {
            detectors: vec![],
            ..Self::new(6)
        }
    }

    pub fn with_detectors(mut self, detectors: &[&str]) -> Self {
        self.detectors = detectors.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Seed an existing set
    pub fn with_set(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().sets.push(ThreatIntelSet {
            id: id.to_string(),
            name: name.to_string(),
            location: Some(format!("https://s3.amazonaws.com/old/{}.csv", name)),
            status: Some("ACTIVE".to_string()),
        });
        self
    }

    /// Make every create fail with `error` regardless of state
    pub fn failing_create(mut self, error: IntelError) -> Self {
        self.create_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn sets(&self) -> Vec<ThreatIntelSet> {
        self.state.lock().unwrap().sets.clone()
    }

    pub fn set(&self, id: &str) -> Option<ThreatIntelSet> {
        self.sets().into_iter().find(|s| s.id == id)
    }

    pub fn updates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }
}

#[async_trait]
impl ThreatIntelService for FakeGuardDuty {
    async fn list_detectors(&self) -> Result<Vec<String>, IntelError> {
        self.state.lock().unwrap().calls.push(Call::ListDetectors);
        Ok(self.detectors.clone())
    }

    async fn create_threat_intel_set(
        &self,
        _detector_id: &str,
        name: &str,
        location: &str,
    ) -> Result<String, IntelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create { name: name.to_string() });

        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }
        if state.sets.iter().any(|s| s.name == name) {
            return Err(IntelError::NameExists(
                "The request is rejected because the name already exists.".to_string(),
            ));
        }
        if state.sets.len() >= self.limit {
            return Err(IntelError::LimitExceeded(
                "The request is rejected because the current AWS account limits have been exceeded."
                    .to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("created-{}", state.next_id);
        state.sets.push(ThreatIntelSet {
            id: id.clone(),
            name: name.to_string(),
            location: Some(location.to_string()),
            status: Some("ACTIVE".to_string()),
        });
        Ok(id)
    }

    async fn list_threat_intel_sets(&self, _detector_id: &str) -> Result<Vec<String>, IntelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        Ok(state.sets.iter().map(|s| s.id.clone()).collect())
    }

    async fn get_threat_intel_set(
        &self,
        _detector_id: &str,
        set_id: &str,
    ) -> Result<ThreatIntelSet, IntelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get { id: set_id.to_string() });
        state
            .sets
            .iter()
            .find(|s| s.id == set_id)
            .cloned()
            .ok_or_else(|| IntelError::Service {
                operation: "GetThreatIntelSet",
                message: format!("{} not found", set_id),
            })
    }

    async fn update_threat_intel_set(
        &self,
        _detector_id: &str,
        set_id: &str,
        name: &str,
        location: &str,
    ) -> Result<(), IntelError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            id: set_id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
        });
        let set = state
            .sets
            .iter_mut()
            .find(|s| s.id == set_id)
            .ok_or_else(|| IntelError::Service {
                operation: "UpdateThreatIntelSet",
                message: format!("{} not found", set_id),
            })?;
        set.name = name.to_string();
        set.location = Some(location.to_string());
        set.status = Some("ACTIVE".to_string());
        Ok(())
    }
}
