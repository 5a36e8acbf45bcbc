use std::fmt;

use serde::Serialize;

use super::domain::{
    NewSystemIntake, Rejection, RejectionRequest, SystemIntake, SystemIntakeStatus,
    SystemIntakeUpdate,
};

/// A single failed precondition, tied to the payload field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Violations gathered by one validation pass. Returned only when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut violations = Self::default();
        violations.push(field, message);
        violations
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|violation| violation.field).collect()
    }

    fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |value| value.trim().is_empty())
}

/// Checks a create payload: new intakes always start as drafts and name their requester.
pub fn validate_create(candidate: &NewSystemIntake) -> Result<(), Violations> {
    let mut violations = Violations::default();

    match candidate.status.as_deref().map(str::trim) {
        None | Some("") => violations.push("status", "is required"),
        Some(raw) => match SystemIntakeStatus::from_label(raw) {
            Some(SystemIntakeStatus::Draft) => {}
            Some(other) => violations.push(
                "status",
                format!("new intakes must start as INTAKE_DRAFT, not {other}"),
            ),
            None => violations.push("status", format!("'{raw}' is not a known intake status")),
        },
    }

    if is_blank(Some(candidate.requester.as_str())) {
        violations.push("requester", "is required");
    }

    violations.into_result()
}

/// Checks an update against the stored record. Returns the status the record will end in.
pub fn validate_update(
    current: &SystemIntake,
    update: &SystemIntakeUpdate,
) -> Result<SystemIntakeStatus, Violations> {
    let mut violations = Violations::default();
    let target = update.status.unwrap_or(current.status);

    if let Some(requester) = &update.requester {
        if requester.trim().is_empty() {
            violations.push("requester", "cannot be blank");
        }
    }

    match (current.status, target) {
        (SystemIntakeStatus::Draft, SystemIntakeStatus::Draft) => {}
        (SystemIntakeStatus::Draft, SystemIntakeStatus::Submitted) => {
            if current.alfabet_id.is_some() {
                violations.push("status", "intake has already been submitted");
            } else if update.alfabet_id.is_some() {
                violations.push(
                    "alfabet_id",
                    "is assigned by the system of record and cannot be supplied",
                );
            }
        }
        (SystemIntakeStatus::Submitted, SystemIntakeStatus::Submitted) => {
            violations.push("status", "intake has already been submitted")
        }
        (SystemIntakeStatus::Submitted, SystemIntakeStatus::Approved) => {}
        (from, to) if from == to => {
            violations.push("status", format!("{from} intakes cannot be edited"))
        }
        (_, SystemIntakeStatus::Rejected) => {
            violations.push("status", "rejections must be recorded through the reject action")
        }
        (_, SystemIntakeStatus::Archived) => {
            violations.push("status", "intakes are archived through the archive action")
        }
        (from, to) => violations.push("status", format!("cannot move intake from {from} to {to}")),
    }

    violations.into_result().map(|()| target)
}

/// Checks a status change against the state machine.
pub fn validate_transition(
    from: SystemIntakeStatus,
    to: SystemIntakeStatus,
) -> Result<(), Violations> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Violations::single(
            "status",
            format!("cannot move intake from {from} to {to}"),
        ))
    }
}

/// All three decision fields are required for a rejection.
pub fn validate_rejection(request: &RejectionRequest) -> Result<Rejection, Violations> {
    let mut violations = Violations::default();
    let fields = [
        ("rejectionReason", request.rejection_reason.as_deref()),
        ("rejectionNextSteps", request.rejection_next_steps.as_deref()),
        ("feedback", request.feedback.as_deref()),
    ];
    for (field, value) in fields {
        if is_blank(value) {
            violations.push(field, "is required");
        }
    }

    violations.into_result()?;

    let text = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();
    Ok(Rejection {
        reason: text(&request.rejection_reason),
        next_steps: text(&request.rejection_next_steps),
        feedback: text(&request.feedback),
    })
}
