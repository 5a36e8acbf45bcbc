use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Action, Rejection, SystemIntake, SystemIntakeId, SystemIntakeStatus, SystemShort,
};
use super::errors::DestinationType;

/// Storage abstraction so the lifecycle service can be exercised in isolation.
///
/// Writes that change status take the status the caller last observed; implementations must
/// refuse the write with [`RepositoryError::Conflict`] when the stored status differs. That
/// compare-and-set is the only guard against two concurrent submissions of the same intake.
pub trait IntakeRepository: Send + Sync {
    fn create(&self, intake: SystemIntake) -> Result<SystemIntake, RepositoryError>;
    fn fetch(&self, id: &SystemIntakeId) -> Result<Option<SystemIntake>, RepositoryError>;
    fn list_by_eua_id(&self, eua_id: &str) -> Result<Vec<SystemIntake>, RepositoryError>;
    /// Replaces the stored record and appends `action`, if any, in one write.
    fn update(
        &self,
        intake: SystemIntake,
        expected: SystemIntakeStatus,
        action: Option<Action>,
    ) -> Result<SystemIntake, RepositoryError>;
    /// Records the rejection action and moves the intake to `REJECTED` in one write.
    fn reject(
        &self,
        id: &SystemIntakeId,
        rejection: &Rejection,
        action: Action,
    ) -> Result<SystemIntake, RepositoryError>;
    fn actions(&self, id: &SystemIntakeId) -> Result<Vec<Action>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read (stored status {stored})")]
    Conflict { stored: SystemIntakeStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Client for the system of record that must accept a submission before it is official.
pub trait SubmissionClient: Send + Sync {
    /// Hands the intake over and returns the external reference (Alfabet id) it was filed under.
    fn submit(&self, intake: &SystemIntake) -> Result<String, SubmissionError>;
    fn fetch_systems(&self) -> Result<Vec<SystemShort>, SubmissionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("system of record rejected the request: {0}")]
    Rejected(String),
    #[error("system of record unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail today).
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    /// A literal mailbox such as the governance review team inbox.
    Address { address: String },
    /// An EUA account; delivery resolves the mailbox.
    EuaUser { eua_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub destination_type: DestinationType,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub intake_id: SystemIntakeId,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Injectable time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
