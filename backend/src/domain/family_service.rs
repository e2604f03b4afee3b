//! # Family Service
//!
//! Caregiver roster and the invite-code join flow. Approving a join
//! request promotes it into an editor caregiver and removes the request;
//! denying it just removes the request.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use shared::{AccessLevel, Caregiver, CaregiverStatus, JoinRequest, JoinRequestStatus};
use uuid::Uuid;

use super::now_ms;
use crate::state::StateCache;
use crate::storage::traits::{CaregiverStorage, JoinRequestStorage};
use crate::sync::ChangeSignal;

#[derive(Debug, Clone)]
pub struct AddCaregiverCommand {
    pub name: String,
    pub email: String,
    pub role: String,
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone)]
pub struct SubmitJoinRequestCommand {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub invite_code: String,
}

pub struct FamilyService {
    caregiver_store: Arc<dyn CaregiverStorage>,
    join_request_store: Arc<dyn JoinRequestStorage>,
    state: StateCache,
    changes: ChangeSignal,
}

impl FamilyService {
    pub fn new(
        caregiver_store: Arc<dyn CaregiverStorage>,
        join_request_store: Arc<dyn JoinRequestStorage>,
        state: StateCache,
        changes: ChangeSignal,
    ) -> Self {
        Self { caregiver_store, join_request_store, state, changes }
    }

    pub fn list_caregivers(&self) -> Vec<Caregiver> {
        self.state.read().expect("state cache poisoned").caregivers.clone()
    }

    pub fn list_join_requests(&self) -> Vec<JoinRequest> {
        self.state.read().expect("state cache poisoned").join_requests.clone()
    }

    pub fn add_caregiver(&self, command: AddCaregiverCommand) -> Result<Caregiver> {
        if command.name.trim().is_empty() {
            anyhow::bail!("Caregiver name cannot be empty");
        }
        let now = now_ms();
        let caregiver = Caregiver {
            id: Uuid::new_v4().to_string(),
            name: command.name.trim().to_string(),
            email: command.email,
            role: command.role,
            photo_url: String::new(),
            access_level: command.access_level,
            status: CaregiverStatus::Approved,
            joined_at: now,
            updated_at: now,
        };

        self.caregiver_store.store_caregiver(&caregiver)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.caregivers.push(caregiver.clone());
        }
        self.changes.notify();
        info!("Added caregiver {} ({:?})", caregiver.name, caregiver.access_level);
        Ok(caregiver)
    }

    pub fn update_caregiver(&self, mut caregiver: Caregiver) -> Result<Caregiver> {
        caregiver.updated_at = now_ms();
        self.caregiver_store.update_caregiver(&caregiver)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            if let Some(existing) = state.caregivers.iter_mut().find(|c| c.id == caregiver.id) {
                *existing = caregiver.clone();
            }
        }
        self.changes.notify();
        Ok(caregiver)
    }

    pub fn remove_caregiver(&self, caregiver_id: &str) -> Result<bool> {
        let removed = self.caregiver_store.delete_caregiver(caregiver_id)?;
        if removed {
            let mut state = self.state.write().expect("state cache poisoned");
            state.caregivers.retain(|c| c.id != caregiver_id);
            drop(state);
            self.changes.notify();
        }
        Ok(removed)
    }

    /// Record a pending request to join the family via invite code.
    pub fn submit_join_request(&self, command: SubmitJoinRequestCommand) -> Result<JoinRequest> {
        if command.invite_code.trim().is_empty() {
            anyhow::bail!("Invite code cannot be empty");
        }
        let request = JoinRequest {
            id: Uuid::new_v4().to_string(),
            user_id: command.user_id,
            user_name: command.user_name,
            user_email: command.user_email,
            invite_code: command.invite_code,
            status: JoinRequestStatus::Pending,
            timestamp: now_ms(),
        };

        self.join_request_store.store_join_request(&request)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.join_requests.push(request.clone());
        }
        self.changes.notify();
        info!("Join request submitted by {}", request.user_name);
        Ok(request)
    }

    /// Approve a pending request: the requester becomes an editor
    /// caregiver and the request itself is removed.
    pub fn approve_join_request(&self, request_id: &str) -> Result<Caregiver> {
        let request = self
            .find_request(request_id)
            .ok_or_else(|| anyhow::anyhow!("Join request not found: {}", request_id))?;

        let now = now_ms();
        let caregiver = Caregiver {
            id: request.user_id.clone(),
            name: request.user_name.clone(),
            email: request.user_email.clone(),
            role: "Caregiver".to_string(),
            photo_url: String::new(),
            access_level: AccessLevel::Editor,
            status: CaregiverStatus::Approved,
            joined_at: now,
            updated_at: now,
        };

        self.caregiver_store.store_caregiver(&caregiver)?;
        self.join_request_store.delete_join_request(request_id)?;
        {
            let mut state = self.state.write().expect("state cache poisoned");
            state.caregivers.push(caregiver.clone());
            state.join_requests.retain(|r| r.id != request_id);
        }
        self.changes.notify();
        info!("Approved join request from {}", caregiver.name);
        Ok(caregiver)
    }

    pub fn deny_join_request(&self, request_id: &str) -> Result<bool> {
        let removed = self.join_request_store.delete_join_request(request_id)?;
        if removed {
            let mut state = self.state.write().expect("state cache poisoned");
            state.join_requests.retain(|r| r.id != request_id);
            drop(state);
            self.changes.notify();
            info!("Denied join request {}", request_id);
        }
        Ok(removed)
    }

    fn find_request(&self, request_id: &str) -> Option<JoinRequest> {
        let state = self.state.read().expect("state cache poisoned");
        state.join_requests.iter().find(|r| r.id == request_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::new_state_cache;
    use crate::storage::json::test_utils::TestEnvironment;
    use crate::storage::json::{CaregiverRepository, JoinRequestRepository};

    struct Fixture {
        service: FamilyService,
        state: StateCache,
        _env: TestEnvironment,
    }

    fn fixture() -> Fixture {
        let env = TestEnvironment::new().unwrap();
        let state = new_state_cache();
        let service = FamilyService::new(
            Arc::new(CaregiverRepository::new(env.connection.clone())),
            Arc::new(JoinRequestRepository::new(env.connection.clone())),
            state.clone(),
            ChangeSignal::disconnected(),
        );
        Fixture { service, state, _env: env }
    }

    fn join_command(code: &str) -> SubmitJoinRequestCommand {
        SubmitJoinRequestCommand {
            user_id: "u1".to_string(),
            user_name: "Grandma".to_string(),
            user_email: "grandma@example.com".to_string(),
            invite_code: code.to_string(),
        }
    }

    #[test]
    fn caregiver_roster_crud() {
        let fx = fixture();
        let caregiver = fx
            .service
            .add_caregiver(AddCaregiverCommand {
                name: " Dad ".to_string(),
                email: "dad@example.com".to_string(),
                role: "Father".to_string(),
                access_level: AccessLevel::Owner,
            })
            .unwrap();
        assert_eq!(caregiver.name, "Dad");
        assert_eq!(caregiver.status, CaregiverStatus::Approved);

        let mut edited = caregiver.clone();
        edited.access_level = AccessLevel::Viewer;
        let updated = fx.service.update_caregiver(edited).unwrap();
        assert!(updated.updated_at >= caregiver.updated_at);
        assert_eq!(fx.state.read().unwrap().caregivers[0].access_level, AccessLevel::Viewer);

        assert!(fx.service.remove_caregiver(&caregiver.id).unwrap());
        assert!(fx.service.list_caregivers().is_empty());
    }

    #[test]
    fn empty_names_and_codes_are_rejected() {
        let fx = fixture();
        assert!(fx
            .service
            .add_caregiver(AddCaregiverCommand {
                name: "  ".to_string(),
                email: String::new(),
                role: String::new(),
                access_level: AccessLevel::Editor,
            })
            .is_err());
        assert!(fx.service.submit_join_request(join_command("  ")).is_err());
    }

    #[test]
    fn approving_a_request_promotes_it_to_an_editor_caregiver() {
        let fx = fixture();
        let request = fx.service.submit_join_request(join_command("FAM-123")).unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);

        let caregiver = fx.service.approve_join_request(&request.id).unwrap();
        assert_eq!(caregiver.id, "u1", "caregiver id follows the requesting user");
        assert_eq!(caregiver.access_level, AccessLevel::Editor);

        let state = fx.state.read().unwrap();
        assert!(state.join_requests.is_empty());
        assert_eq!(state.caregivers.len(), 1);
        drop(state);
        assert!(fx.service.join_request_store.list_join_requests().unwrap().is_empty());
    }

    #[test]
    fn denying_a_request_just_removes_it() {
        let fx = fixture();
        let request = fx.service.submit_join_request(join_command("FAM-123")).unwrap();

        assert!(fx.service.deny_join_request(&request.id).unwrap());
        assert!(!fx.service.deny_join_request(&request.id).unwrap());
        assert!(fx.service.list_join_requests().is_empty());
        assert!(fx.service.list_caregivers().is_empty());
    }
}
