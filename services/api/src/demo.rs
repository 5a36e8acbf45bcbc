use crate::infra::{LoggingNotifier, StubCedarClient};
use chrono::Utc;
use clap::Args;
use easi_intake::config::IntakeConfig;
use easi_intake::error::AppError;
use easi_intake::intake::{
    IntakeDetails, IntakeError, InMemoryIntakeRepository, NewSystemIntake, Principal,
    RejectionRequest, SystemIntake, SystemIntakeService, SystemIntakeStatus, SystemIntakeUpdate,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// EUA id of the requester that owns the demo intake.
    #[arg(long, default_value = "ABCD")]
    pub(crate) requester_eua: String,
    /// Project name recorded on the intake.
    #[arg(long, default_value = "Medicare Data Lake")]
    pub(crate) project_name: String,
    /// Stop after submission instead of rejecting and archiving.
    #[arg(long)]
    pub(crate) skip_decision: bool,
}

type DemoService = SystemIntakeService<InMemoryIntakeRepository, StubCedarClient, LoggingNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        requester_eua,
        project_name,
        skip_decision,
    } = args;

    let notifier = Arc::new(LoggingNotifier::default());
    let service: DemoService = SystemIntakeService::new(
        Arc::new(InMemoryIntakeRepository::default()),
        Arc::new(StubCedarClient::default()),
        notifier.clone(),
        IntakeConfig::default(),
    );
    let requester = Principal::new(requester_eua);
    let reviewer = Principal::new("GRT1");

    println!("System intake demo ({})", Utc::now().format("%Y-%m-%d %H:%M UTC"));

    let candidate = NewSystemIntake {
        status: Some("INTAKE_DRAFT".to_string()),
        requester: "Demo Requester".to_string(),
        details: IntakeDetails {
            component: Some("OIT".to_string()),
            project_name: Some(project_name),
            business_need: Some("Consolidate claims reporting".to_string()),
            ..IntakeDetails::default()
        },
    };
    let Some(draft) = report("create", service.create(Some(&requester), candidate)) else {
        return Ok(());
    };
    let id = draft.id.to_string();

    let submit = SystemIntakeUpdate::new(draft.id).with_status(SystemIntakeStatus::Submitted);
    if report("submit", service.update(submit.clone())).is_none() {
        return Ok(());
    }
    report("submit again", service.update(submit));

    if !skip_decision {
        let rejection = RejectionRequest {
            rejection_reason: Some("Duplicates an existing system".to_string()),
            rejection_next_steps: Some("Coordinate with the existing business owner".to_string()),
            feedback: Some("Reach out to the GRT before resubmitting".to_string()),
        };
        report("reject", service.reject(Some(&reviewer), &id, rejection));
        report("archive", service.archive(&id));
    }

    print_trail(&service, &id);

    let sent = notifier.sent();
    if sent.is_empty() {
        println!("Notifications: none dispatched");
    } else {
        println!("Notifications:");
        for notification in sent {
            println!(
                "  - [{}] {}",
                notification.destination_type, notification.subject
            );
        }
    }

    Ok(())
}

fn report(step: &str, outcome: Result<SystemIntake, IntakeError>) -> Option<SystemIntake> {
    match outcome {
        Ok(intake) => {
            println!(
                "- {step}: {} ({}){}",
                intake.id,
                intake.status,
                intake
                    .alfabet_id
                    .as_deref()
                    .map(|alfabet| format!(" alfabet {alfabet}"))
                    .unwrap_or_default()
            );
            Some(intake)
        }
        Err(err) => {
            println!(
                "- {step}: {} {} ({err})",
                err.status().as_u16(),
                err.message()
            );
            None
        }
    }
}

fn print_trail(service: &DemoService, id: &str) {
    match service.actions(id) {
        Ok(actions) if actions.is_empty() => println!("Audit trail: empty"),
        Ok(actions) => {
            println!("Audit trail:");
            for action in actions {
                println!(
                    "  - {:?} by {} at {}",
                    action.action_type,
                    action.actor_eua_user_id.as_deref().unwrap_or("system"),
                    action.created_at.to_rfc3339()
                );
            }
        }
        Err(err) => println!("Audit trail unavailable: {}", err.message()),
    }
}
