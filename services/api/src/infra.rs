use easi_intake::intake::{
    Notification, Notifier, NotifyError, Recipient, SubmissionClient, SubmissionError,
    SystemIntake, SystemShort,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the CEDAR system of record: hands out sequential Alfabet ids and serves a fixed
/// system inventory.
#[derive(Default)]
pub(crate) struct StubCedarClient {
    sequence: AtomicU64,
}

impl SubmissionClient for StubCedarClient {
    fn submit(&self, intake: &SystemIntake) -> Result<String, SubmissionError> {
        if intake.requester.trim().is_empty() {
            return Err(SubmissionError::Rejected(
                "requester is required by the system of record".to_string(),
            ));
        }

        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let alfabet_id = format!(
            "{:03}-{:03}-{:02}",
            next / 100_000,
            (next / 100) % 1000,
            next % 100
        );
        info!(intake_id = %intake.id, %alfabet_id, "intake filed with system of record");
        Ok(alfabet_id)
    }

    fn fetch_systems(&self) -> Result<Vec<SystemShort>, SubmissionError> {
        Ok(vec![
            SystemShort {
                id: "{11AB1A00-1234-5678-ABC1-1A001B00CC0A}".to_string(),
                acronym: "MDL".to_string(),
                name: "Medicare Data Lake".to_string(),
            },
            SystemShort {
                id: "{11AB1A00-1234-5678-ABC1-1A001B00CC1B}".to_string(),
                acronym: "EASi".to_string(),
                name: "Easy Access to System Information".to_string(),
            },
        ])
    }
}

/// Notifier that writes each message to the log and keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for LoggingNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let recipient = match &notification.recipient {
            Recipient::Address { address } => address.clone(),
            Recipient::EuaUser { eua_id } => format!("eua:{eua_id}"),
        };
        info!(
            intake_id = %notification.intake_id,
            destination = %notification.destination_type,
            %recipient,
            subject = %notification.subject,
            "notification dispatched"
        );

        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
