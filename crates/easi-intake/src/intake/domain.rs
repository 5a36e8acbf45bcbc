use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for system intakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemIntakeId(pub Uuid);

impl SystemIntakeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a path segment after trimming whitespace. Any textual UUID form is accepted
    /// (hyphenated, simple, braced, or `urn:uuid:`).
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for SystemIntakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SystemIntakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a governance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemIntakeStatus {
    #[serde(rename = "INTAKE_DRAFT")]
    Draft,
    #[serde(rename = "INTAKE_SUBMITTED")]
    Submitted,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "ARCHIVED")]
    Archived,
}

impl SystemIntakeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SystemIntakeStatus::Draft => "INTAKE_DRAFT",
            SystemIntakeStatus::Submitted => "INTAKE_SUBMITTED",
            SystemIntakeStatus::Approved => "APPROVED",
            SystemIntakeStatus::Rejected => "REJECTED",
            SystemIntakeStatus::Archived => "ARCHIVED",
        }
    }

    /// Inverse of [`label`](Self::label). Unknown labels yield `None`.
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "INTAKE_DRAFT" => Some(SystemIntakeStatus::Draft),
            "INTAKE_SUBMITTED" => Some(SystemIntakeStatus::Submitted),
            "APPROVED" => Some(SystemIntakeStatus::Approved),
            "REJECTED" => Some(SystemIntakeStatus::Rejected),
            "ARCHIVED" => Some(SystemIntakeStatus::Archived),
            _ => None,
        }
    }

    /// Permitted edges of the intake state machine. Self-loops are not transitions.
    pub const fn can_transition_to(self, next: SystemIntakeStatus) -> bool {
        use SystemIntakeStatus::*;

        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Draft, Archived)
                | (Submitted, Archived)
                | (Approved, Archived)
                | (Rejected, Archived)
        )
    }
}

impl fmt::Display for SystemIntakeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a status change is not an edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move intake from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SystemIntakeStatus,
    pub to: SystemIntakeStatus,
}

/// Descriptive request fields carried through create and update untouched by the lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_owner_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_need: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_status: Option<String>,
}

impl IntakeDetails {
    /// Overlays every field the patch sets.
    pub fn merge(&mut self, patch: &IntakeDetails) {
        fn overlay(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        overlay(&mut self.component, &patch.component);
        overlay(&mut self.business_owner, &patch.business_owner);
        overlay(
            &mut self.business_owner_component,
            &patch.business_owner_component,
        );
        overlay(&mut self.project_name, &patch.project_name);
        overlay(&mut self.business_need, &patch.business_need);
        overlay(&mut self.solution, &patch.solution);
        overlay(&mut self.process_status, &patch.process_status);
    }
}

/// The governance request record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIntake {
    pub id: SystemIntakeId,
    pub eua_user_id: String,
    pub requester: String,
    pub status: SystemIntakeStatus,
    #[serde(flatten)]
    pub details: IntakeDetails,
    pub alfabet_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub decision_next_steps: Option<String>,
    pub grt_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl SystemIntake {
    /// Builds a fresh draft owned by `eua_user_id`.
    pub fn draft(
        eua_user_id: impl Into<String>,
        requester: impl Into<String>,
        details: IntakeDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SystemIntakeId::new(),
            eua_user_id: eua_user_id.into(),
            requester: requester.into(),
            status: SystemIntakeStatus::Draft,
            details,
            alfabet_id: None,
            rejection_reason: None,
            decision_next_steps: None,
            grt_feedback: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            decided_at: None,
            archived_at: None,
        }
    }

    /// Moves to `next`, stamping the matching timestamp.
    pub fn transition_to(
        &mut self,
        next: SystemIntakeStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match next {
            SystemIntakeStatus::Submitted => self.submitted_at = Some(now),
            SystemIntakeStatus::Approved | SystemIntakeStatus::Rejected => {
                self.decided_at = Some(now)
            }
            SystemIntakeStatus::Archived => self.archived_at = Some(now),
            SystemIntakeStatus::Draft => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Applies the rejection decision and moves the intake to `REJECTED`.
    pub fn apply_rejection(
        &mut self,
        rejection: &Rejection,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.transition_to(SystemIntakeStatus::Rejected, now)?;
        self.rejection_reason = Some(rejection.reason.clone());
        self.decision_next_steps = Some(rejection.next_steps.clone());
        self.grt_feedback = Some(rejection.feedback.clone());
        Ok(())
    }

    /// Copies the editable fields of an update onto this record.
    pub fn apply_edits(&mut self, update: &SystemIntakeUpdate, now: DateTime<Utc>) {
        if let Some(requester) = &update.requester {
            self.requester = requester.trim().to_string();
        }
        self.details.merge(&update.details);
        self.updated_at = now;
    }
}

/// Create payload. The owner is never read from the body.
///
/// `status` stays a raw label so an unknown value is reported by validation rather than
/// rejected as an unreadable body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSystemIntake {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub requester: String,
    #[serde(flatten)]
    pub details: IntakeDetails,
}

/// Update payload: the full or partial entity, keyed by its embedded id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIntakeUpdate {
    pub id: SystemIntakeId,
    #[serde(default)]
    pub status: Option<SystemIntakeStatus>,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub alfabet_id: Option<String>,
    #[serde(flatten)]
    pub details: IntakeDetails,
}

impl SystemIntakeUpdate {
    pub fn new(id: SystemIntakeId) -> Self {
        Self {
            id,
            status: None,
            requester: None,
            alfabet_id: None,
            details: IntakeDetails::default(),
        }
    }

    pub fn with_status(mut self, status: SystemIntakeStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Reject payload as received; every field is checked by the validation engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionRequest {
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejection_next_steps: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// A validated rejection decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    pub next_steps: String,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Submit,
    Approve,
    Reject,
    Archive,
}

/// Audited event attached to an intake transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub intake_id: SystemIntakeId,
    pub action_type: ActionType,
    pub actor_eua_user_id: Option<String>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Action {
    pub fn new(
        intake_id: SystemIntakeId,
        action_type: ActionType,
        actor: Option<&Principal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            intake_id,
            action_type,
            actor_eua_user_id: actor.map(|principal| principal.eua_id.clone()),
            feedback: None,
            created_at: now,
        }
    }
}

/// Authenticated caller, attached to the request by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub eua_id: String,
    pub job_code_easi: bool,
}

impl Principal {
    pub fn new(eua_id: impl Into<String>) -> Self {
        Self {
            eua_id: eua_id.into(),
            job_code_easi: true,
        }
    }
}

/// Summary row from the system-of-record's system inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemShort {
    pub id: String,
    pub acronym: String,
    pub name: String,
}
