//! System intake lifecycle: domain model, error taxonomy, validation, collaborator contracts,
//! the lifecycle service, and its HTTP router.

pub mod domain;
pub mod errors;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Action, ActionType, IntakeDetails, InvalidTransition, NewSystemIntake, Principal, Rejection,
    RejectionRequest, SystemIntake, SystemIntakeId, SystemIntakeStatus, SystemIntakeUpdate,
    SystemShort,
};
pub use errors::{DestinationType, ErrorKind, ErrorResponse, ExternalOperation, IntakeError};
pub use memory::InMemoryIntakeRepository;
pub use repository::{
    Clock, IntakeRepository, Notification, Notifier, NotifyError, Recipient, RepositoryError,
    SubmissionClient, SubmissionError, SystemClock,
};
pub use router::intake_router;
pub use service::SystemIntakeService;
pub use validation::{FieldViolation, Violations};
