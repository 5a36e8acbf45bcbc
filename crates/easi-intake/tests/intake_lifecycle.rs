//! End-to-end scenarios for the system intake lifecycle, driven through the public router so the
//! error taxonomy, state machine, and collaborator side effects are checked together.

mod common {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use axum::Router;
    use serde_json::Value;

    use easi_intake::config::IntakeConfig;
    use easi_intake::intake::{
        intake_router, InMemoryIntakeRepository, Notification, Notifier, NotifyError, Principal,
        SubmissionClient, SubmissionError, SystemIntake, SystemIntakeService, SystemShort,
    };

    #[derive(Default)]
    pub struct CountingCedar {
        calls: AtomicUsize,
    }

    impl CountingCedar {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SubmissionClient for CountingCedar {
        fn submit(&self, _intake: &SystemIntake) -> Result<String, SubmissionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("555-555-{call}"))
        }

        fn fetch_systems(&self) -> Result<Vec<SystemShort>, SubmissionError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    pub struct Outbox {
        sent: Mutex<Vec<Notification>>,
    }

    impl Outbox {
        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().expect("outbox poisoned").clone()
        }
    }

    impl Notifier for Outbox {
        fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            self.sent.lock().expect("outbox poisoned").push(notification);
            Ok(())
        }
    }

    pub struct Harness {
        pub router: Router,
        pub repository: Arc<InMemoryIntakeRepository>,
        pub cedar: Arc<CountingCedar>,
        pub outbox: Arc<Outbox>,
    }

    pub fn harness() -> Harness {
        let repository = Arc::new(InMemoryIntakeRepository::default());
        let cedar = Arc::new(CountingCedar::default());
        let outbox = Arc::new(Outbox::default());
        let service = SystemIntakeService::new(
            repository.clone(),
            cedar.clone(),
            outbox.clone(),
            IntakeConfig {
                grt_email: "grt@cms.example".to_string(),
                client_url: "https://easi.cms.example".to_string(),
                cedar_source: "CEDAR".to_string(),
            },
        );

        Harness {
            router: intake_router(Arc::new(service)),
            repository,
            cedar,
            outbox,
        }
    }

    pub fn request(method: &str, uri: &str, body: Option<Value>, eua_id: &str) -> Request<Body> {
        let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .extension(Principal::new(eua_id))
            .body(body)
            .expect("request builds")
    }

    pub async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("json body")
    }
}

use axum::http::StatusCode;
use common::*;
use easi_intake::intake::{ActionType, IntakeRepository, SystemIntakeId, SystemIntakeStatus};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn draft_is_submitted_rejected_and_archived() {
    let harness = harness();

    let created = harness
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/system_intake",
            Some(json!({
                "status": "INTAKE_DRAFT",
                "requester": "Jane Requester",
                "project_name": "Claims Modernization",
            })),
            "ABCD",
        ))
        .await
        .expect("create executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json(created).await;
    let id = created["id"].as_str().expect("id").to_string();

    let submitted = harness
        .router
        .clone()
        .oneshot(request(
            "PUT",
            "/api/v1/system_intake",
            Some(json!({ "id": id, "status": "INTAKE_SUBMITTED" })),
            "ABCD",
        ))
        .await
        .expect("submit executes");
    assert_eq!(submitted.status(), StatusCode::OK);
    assert_eq!(json(submitted).await["alfabet_id"], json!("555-555-1"));
    assert_eq!(harness.cedar.calls(), 1);

    let rejected = harness
        .router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/system_intake/{id}/reject"),
            Some(json!({
                "rejectionReason": "Duplicate of an existing system",
                "rejectionNextSteps": "Coordinate with the existing owner",
                "feedback": "Reach out to the GRT",
            })),
            "GRT1",
        ))
        .await
        .expect("reject executes");
    assert_eq!(rejected.status(), StatusCode::CREATED);
    assert_eq!(json(rejected).await["status"], json!("REJECTED"));

    let archived = harness
        .router
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/system_intake/{id}"),
            None,
            "ABCD",
        ))
        .await
        .expect("archive executes");
    assert_eq!(archived.status(), StatusCode::OK);

    let listed = harness
        .router
        .clone()
        .oneshot(request("GET", "/api/v1/system_intakes", None, "ABCD"))
        .await
        .expect("list executes");
    assert_eq!(json(listed).await, json!([]));

    let intake_id = SystemIntakeId::parse(&id).expect("uuid id");
    let trail: Vec<ActionType> = harness
        .repository
        .actions(&intake_id)
        .expect("actions")
        .into_iter()
        .map(|action| action.action_type)
        .collect();
    assert_eq!(
        trail,
        vec![ActionType::Submit, ActionType::Reject, ActionType::Archive]
    );

    let stored = harness
        .repository
        .fetch(&intake_id)
        .expect("fetch")
        .expect("record retained");
    assert_eq!(stored.status, SystemIntakeStatus::Archived);
    assert_eq!(stored.eua_user_id, "ABCD");

    let recipients: Vec<_> = harness
        .outbox
        .sent()
        .into_iter()
        .map(|notification| notification.subject)
        .collect();
    assert_eq!(recipients.len(), 2);
    assert!(recipients[0].contains("Claims Modernization"));
}

#[tokio::test]
async fn archived_intakes_are_terminal() {
    let harness = harness();

    let created = harness
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/system_intake",
            Some(json!({ "status": "INTAKE_DRAFT", "requester": "Jane Requester" })),
            "ABCD",
        ))
        .await
        .expect("create executes");
    let id = json(created).await["id"]
        .as_str()
        .expect("id")
        .to_string();

    let uri = format!("/api/v1/system_intake/{id}");
    let first = harness
        .router
        .clone()
        .oneshot(request("DELETE", &uri, None, "ABCD"))
        .await
        .expect("archive executes");
    assert_eq!(first.status(), StatusCode::OK);

    let second = harness
        .router
        .clone()
        .oneshot(request("DELETE", &uri, None, "ABCD"))
        .await
        .expect("archive executes");
    assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let submit = harness
        .router
        .clone()
        .oneshot(request(
            "PUT",
            "/api/v1/system_intake",
            Some(json!({ "id": id, "status": "INTAKE_SUBMITTED" })),
            "ABCD",
        ))
        .await
        .expect("submit executes");
    assert_eq!(submit.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json(submit).await,
        json!({ "message": "Entity unprocessable" })
    );
    assert_eq!(harness.cedar.calls(), 0);
    assert!(harness.outbox.sent().is_empty());
}
