use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::IntakeConfig;
use crate::intake::domain::{
    Action, ActionType, IntakeDetails, NewSystemIntake, Principal, Rejection, SystemIntake, SystemIntakeId,
    SystemIntakeStatus, SystemShort,
};
use crate::intake::memory::InMemoryIntakeRepository;
use crate::intake::repository::{
    Clock, IntakeRepository, Notification, Notifier, NotifyError, RepositoryError,
    SubmissionClient, SubmissionError,
};
use crate::intake::{intake_router, SystemIntakeService};

pub(super) type TestService =
    SystemIntakeService<InMemoryIntakeRepository, StubCedar, MemoryNotifier>;

pub(super) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 1, 14, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) fn principal() -> Principal {
    Principal::new("FAKE")
}

pub(super) fn new_intake() -> NewSystemIntake {
    NewSystemIntake {
        status: Some("INTAKE_DRAFT".to_string()),
        requester: "Test Requester".to_string(),
        details: IntakeDetails {
            component: Some("OIT".to_string()),
            project_name: Some("Medicare Data Lake".to_string()),
            business_need: Some("Consolidate claims reporting".to_string()),
            ..IntakeDetails::default()
        },
    }
}

pub(super) fn intake_config() -> IntakeConfig {
    IntakeConfig {
        grt_email: "grt@cms.example".to_string(),
        client_url: "https://easi.cms.example".to_string(),
        cedar_source: "CEDAR".to_string(),
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryIntakeRepository>,
    Arc<StubCedar>,
    Arc<MemoryNotifier>,
) {
    build_service_with(StubCedar::accepting(), MemoryNotifier::default())
}

pub(super) fn build_service_with(
    cedar: StubCedar,
    notifier: MemoryNotifier,
) -> (
    TestService,
    Arc<InMemoryIntakeRepository>,
    Arc<StubCedar>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(InMemoryIntakeRepository::default());
    let cedar = Arc::new(cedar);
    let notifier = Arc::new(notifier);
    let service = SystemIntakeService::new(
        repository.clone(),
        cedar.clone(),
        notifier.clone(),
        intake_config(),
    )
    .with_clock(Arc::new(FixedClock(fixed_time())));
    (service, repository, cedar, notifier)
}

/// Creates a draft owned by [`principal`].
pub(super) fn seed_draft(service: &TestService) -> SystemIntake {
    service
        .create(Some(&principal()), new_intake())
        .expect("draft is created")
}

/// Places a record directly in the repository, bypassing the lifecycle.
pub(super) fn seed_with_status(
    repository: &InMemoryIntakeRepository,
    status: SystemIntakeStatus,
) -> SystemIntake {
    let mut intake = SystemIntake::draft(
        "FAKE",
        "Test Requester",
        IntakeDetails::default(),
        fixed_time(),
    );
    intake.status = status;
    if status != SystemIntakeStatus::Draft {
        intake.alfabet_id = Some("123-345-19".to_string());
    }
    repository.create(intake).expect("seed intake")
}

pub(super) struct StubCedar {
    fail_with: Option<String>,
    submissions: AtomicUsize,
}

impl StubCedar {
    pub(super) fn accepting() -> Self {
        Self {
            fail_with: None,
            submissions: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            submissions: AtomicUsize::new(0),
        }
    }

    pub(super) fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl SubmissionClient for StubCedar {
    fn submit(&self, _intake: &SystemIntake) -> Result<String, SubmissionError> {
        let count = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.fail_with {
            Some(reason) => Err(SubmissionError::Unavailable(reason.clone())),
            None => Ok(format!("000-000-{count}")),
        }
    }

    fn fetch_systems(&self) -> Result<Vec<SystemShort>, SubmissionError> {
        match &self.fail_with {
            Some(reason) => Err(SubmissionError::Unavailable(reason.clone())),
            None => Ok(vec![SystemShort {
                id: "{11AB1A00-1234-5678-ABC1-1A001B00CC0A}".to_string(),
                acronym: "MDL".to_string(),
                name: "Medicare Data Lake".to_string(),
            }]),
        }
    }
}

/// Submission client that lets a competing request commit the Draft to Submitted write while
/// the caller is still waiting on the system of record.
pub(super) struct RacingCedar {
    repository: Arc<InMemoryIntakeRepository>,
}

pub(super) const WINNING_ALFABET_ID: &str = "999-999-99";

impl RacingCedar {
    pub(super) fn new(repository: Arc<InMemoryIntakeRepository>) -> Self {
        Self { repository }
    }
}

impl SubmissionClient for RacingCedar {
    fn submit(&self, intake: &SystemIntake) -> Result<String, SubmissionError> {
        let mut winner = intake.clone();
        winner.alfabet_id = Some(WINNING_ALFABET_ID.to_string());
        winner
            .transition_to(SystemIntakeStatus::Submitted, fixed_time())
            .map_err(|err| SubmissionError::Unavailable(err.to_string()))?;
        let action = Action::new(winner.id, ActionType::Submit, None, fixed_time());
        self.repository
            .update(winner, SystemIntakeStatus::Draft, Some(action))
            .map_err(|err| SubmissionError::Unavailable(err.to_string()))?;

        Ok("000-000-2".to_string())
    }

    fn fetch_systems(&self) -> Result<Vec<SystemShort>, SubmissionError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    fail: bool,
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("smtp relay refused".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl IntakeRepository for UnavailableRepository {
    fn create(&self, _intake: SystemIntake) -> Result<SystemIntake, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SystemIntakeId) -> Result<Option<SystemIntake>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_eua_id(&self, _eua_id: &str) -> Result<Vec<SystemIntake>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _intake: SystemIntake,
        _expected: SystemIntakeStatus,
        _action: Option<Action>,
    ) -> Result<SystemIntake, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn reject(
        &self,
        _id: &SystemIntakeId,
        _rejection: &Rejection,
        _action: Action,
    ) -> Result<SystemIntake, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn actions(&self, _id: &SystemIntakeId) -> Result<Vec<Action>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    intake_router(Arc::new(service))
}
