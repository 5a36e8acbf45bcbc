use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::IntakeConfig;

use super::domain::{
    Action, ActionType, NewSystemIntake, Principal, RejectionRequest, SystemIntake,
    SystemIntakeId, SystemIntakeStatus, SystemIntakeUpdate, SystemShort,
};
use super::errors::{
    parse_intake_id, DestinationType, ExternalOperation, IntakeError, SYSTEM_INTAKE,
};
use super::repository::{
    Clock, IntakeRepository, Notification, Notifier, Recipient, RepositoryError, SubmissionClient,
    SubmissionError, SystemClock,
};
use super::validation::{self, Violations};

/// Lifecycle controller for system intakes.
///
/// Holds only shared, read-only handles to its collaborators; every call is an independent unit
/// of work. Validation and existence checks run before any external side effect, the system of
/// record decides whether a submission commits, and notification failures never undo a commit.
pub struct SystemIntakeService<R, S, N> {
    repository: Arc<R>,
    cedar: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: IntakeConfig,
}

impl<R, S, N> SystemIntakeService<R, S, N>
where
    R: IntakeRepository + 'static,
    S: SubmissionClient + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, cedar: Arc<S>, notifier: Arc<N>, config: IntakeConfig) -> Self {
        Self {
            repository,
            cedar,
            notifier,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a draft owned by the calling principal.
    pub fn create(
        &self,
        principal: Option<&Principal>,
        candidate: NewSystemIntake,
    ) -> Result<SystemIntake, IntakeError> {
        let principal = principal.ok_or(IntakeError::MissingPrincipal)?;
        validation::validate_create(&candidate)
            .map_err(|violations| IntakeError::validation("", violations))?;

        let intake = SystemIntake::draft(
            principal.eua_id.clone(),
            candidate.requester.trim(),
            candidate.details,
            self.clock.now(),
        );
        let stored = self
            .repository
            .create(intake)
            .map_err(IntakeError::unclassified)?;

        info!(intake_id = %stored.id, eua_id = %stored.eua_user_id, "system intake created");
        Ok(stored)
    }

    /// Fetch an intake by its path identifier.
    pub fn fetch(&self, raw_id: &str) -> Result<SystemIntake, IntakeError> {
        let id = parse_intake_id(raw_id)?;
        self.load(&id)
    }

    /// Intakes owned by the caller, newest first. Archived records are left out.
    pub fn list_for(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Vec<SystemIntake>, IntakeError> {
        let principal = principal.ok_or(IntakeError::MissingPrincipal)?;
        let intakes = self
            .repository
            .list_by_eua_id(&principal.eua_id)
            .map_err(IntakeError::unclassified)?;

        Ok(intakes
            .into_iter()
            .filter(|intake| intake.status != SystemIntakeStatus::Archived)
            .collect())
    }

    /// Audit trail of an intake.
    pub fn actions(&self, raw_id: &str) -> Result<Vec<Action>, IntakeError> {
        let id = parse_intake_id(raw_id)?;
        self.load(&id)?;
        self.repository
            .actions(&id)
            .map_err(IntakeError::unclassified)
    }

    /// Edit, submit, or approve an intake.
    pub fn update(&self, update: SystemIntakeUpdate) -> Result<SystemIntake, IntakeError> {
        let current = self.load(&update.id)?;
        let observed = current.status;
        let target = validation::validate_update(&current, &update)
            .map_err(|violations| IntakeError::validation(update.id, violations))?;

        let now = self.clock.now();
        let mut next = current;
        next.apply_edits(&update, now);

        match (observed, target) {
            (SystemIntakeStatus::Draft, SystemIntakeStatus::Submitted) => {
                self.submit(next, observed)
            }
            (SystemIntakeStatus::Submitted, SystemIntakeStatus::Approved) => {
                next.transition_to(target, now)
                    .map_err(|err| IntakeError::invalid_transition(&next.id, err))?;
                let action = Action::new(next.id, ActionType::Approve, None, now);
                let stored = self.persist(next, observed, Some(action))?;
                info!(intake_id = %stored.id, "system intake approved");
                Ok(stored)
            }
            _ => {
                let stored = self.persist(next, observed, None)?;
                debug!(intake_id = %stored.id, "system intake draft saved");
                Ok(stored)
            }
        }
    }

    fn submit(
        &self,
        mut intake: SystemIntake,
        observed: SystemIntakeStatus,
    ) -> Result<SystemIntake, IntakeError> {
        let alfabet_id = self.cedar.submit(&intake).map_err(|err| {
            self.external_error(&intake.id, ExternalOperation::Submit, err)
        })?;

        let now = self.clock.now();
        intake.alfabet_id = Some(alfabet_id);
        intake
            .transition_to(SystemIntakeStatus::Submitted, now)
            .map_err(|err| IntakeError::invalid_transition(&intake.id, err))?;

        let action = Action::new(intake.id, ActionType::Submit, None, now);
        let stored = self.persist(intake, observed, Some(action))?;
        info!(
            intake_id = %stored.id,
            alfabet_id = stored.alfabet_id.as_deref().unwrap_or_default(),
            "system intake submitted"
        );

        self.notify(Notification {
            destination_type: DestinationType::Email,
            recipient: Recipient::Address {
                address: self.config.grt_email.clone(),
            },
            subject: format!("New intake request: {}", display_name(&stored)),
            body: format!(
                "{} submitted a system intake. Review it at {}/governance-review-team/{}/intake-request",
                stored.requester,
                self.config.client_url,
                stored.id
            ),
            intake_id: stored.id,
        })?;

        Ok(stored)
    }

    /// Record a rejection decision.
    ///
    /// Existence is not checked up front: the repository write is the unit that fails, and any
    /// failure other than a stale status is reported as an internal fault.
    pub fn reject(
        &self,
        principal: Option<&Principal>,
        raw_id: &str,
        request: RejectionRequest,
    ) -> Result<SystemIntake, IntakeError> {
        let id = parse_intake_id(raw_id)?;
        let rejection = validation::validate_rejection(&request)
            .map_err(|violations| IntakeError::validation(id, violations))?;

        let mut action = Action::new(id, ActionType::Reject, principal, self.clock.now());
        action.feedback = Some(rejection.feedback.clone());

        let rejected = self
            .repository
            .reject(&id, &rejection, action)
            .map_err(|err| match err {
                RepositoryError::Conflict { stored } => IntakeError::validation(
                    id,
                    Violations::single("status", format!("{stored} intakes cannot be rejected")),
                ),
                other => IntakeError::unclassified(format!("reject {id}: {other}")),
            })?;
        info!(intake_id = %rejected.id, "system intake rejected");

        self.notify(Notification {
            destination_type: DestinationType::Email,
            recipient: Recipient::EuaUser {
                eua_id: rejected.eua_user_id.clone(),
            },
            subject: format!(
                "Your intake request has been rejected: {}",
                display_name(&rejected)
            ),
            body: format!(
                "Reason: {}\n\nNext steps: {}\n\nFeedback: {}",
                rejection.reason, rejection.next_steps, rejection.feedback
            ),
            intake_id: rejected.id,
        })?;

        Ok(rejected)
    }

    /// Archive an intake. Archival is a status change; nothing is removed.
    pub fn archive(&self, raw_id: &str) -> Result<SystemIntake, IntakeError> {
        let id = parse_intake_id(raw_id)?;
        let mut intake = self.load(&id)?;
        let observed = intake.status;
        validation::validate_transition(observed, SystemIntakeStatus::Archived)
            .map_err(|violations| IntakeError::validation(id, violations))?;

        let now = self.clock.now();
        intake
            .transition_to(SystemIntakeStatus::Archived, now)
            .map_err(|err| IntakeError::invalid_transition(&id, err))?;
        let action = Action::new(id, ActionType::Archive, None, now);
        let stored = self.persist(intake, observed, Some(action))?;

        info!(intake_id = %stored.id, previous = %observed, "system intake archived");
        Ok(stored)
    }

    /// System inventory as known to the system of record.
    pub fn list_systems(&self) -> Result<Vec<SystemShort>, IntakeError> {
        self.cedar
            .fetch_systems()
            .map_err(|err| IntakeError::ExternalApi {
                model: "SystemShort",
                model_id: String::new(),
                operation: ExternalOperation::Fetch,
                system: self.config.cedar_source.clone(),
                cause: err.to_string(),
            })
    }

    fn load(&self, id: &SystemIntakeId) -> Result<SystemIntake, IntakeError> {
        self.repository
            .fetch(id)
            .map_err(IntakeError::unclassified)?
            .ok_or_else(|| IntakeError::not_found(id))
    }

    fn persist(
        &self,
        intake: SystemIntake,
        observed: SystemIntakeStatus,
        action: Option<Action>,
    ) -> Result<SystemIntake, IntakeError> {
        let id = intake.id;
        self.repository
            .update(intake, observed, action)
            .map_err(|err| match err {
                RepositoryError::Conflict { stored } => {
                    warn!(intake_id = %id, %observed, %stored, "stale intake write refused");
                    IntakeError::validation(
                        id,
                        Violations::single(
                            "status",
                            format!("intake moved from {observed} to {stored} during the request"),
                        ),
                    )
                }
                RepositoryError::NotFound => IntakeError::not_found(&id),
                other => IntakeError::unclassified(other),
            })
    }

    fn notify(&self, notification: Notification) -> Result<(), IntakeError> {
        let destination_type = notification.destination_type;
        let intake_id = notification.intake_id;
        self.notifier.send(notification).map_err(|err| {
            warn!(%intake_id, error = %err, "notification failed after commit");
            IntakeError::Notification {
                destination_type,
                cause: err.to_string(),
            }
        })
    }

    fn external_error(
        &self,
        id: &SystemIntakeId,
        operation: ExternalOperation,
        err: SubmissionError,
    ) -> IntakeError {
        IntakeError::ExternalApi {
            model: SYSTEM_INTAKE,
            model_id: id.to_string(),
            operation,
            system: self.config.cedar_source.clone(),
            cause: err.to_string(),
        }
    }
}

fn display_name(intake: &SystemIntake) -> &str {
    intake
        .details
        .project_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(intake.requester.as_str())
}
