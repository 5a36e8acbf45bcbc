use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Action, Rejection, SystemIntake, SystemIntakeId, SystemIntakeStatus};
use super::repository::{IntakeRepository, RepositoryError};

#[derive(Default)]
struct Tables {
    intakes: HashMap<SystemIntakeId, SystemIntake>,
    actions: Vec<Action>,
}

/// Process-local repository. Every write happens under one lock, which gives the
/// compare-and-set semantics [`IntakeRepository`] asks for.
#[derive(Default, Clone)]
pub struct InMemoryIntakeRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryIntakeRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|tables| tables.intakes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_expected(
    stored: &SystemIntake,
    expected: SystemIntakeStatus,
) -> Result<(), RepositoryError> {
    if stored.status == expected {
        Ok(())
    } else {
        Err(RepositoryError::Conflict {
            stored: stored.status,
        })
    }
}

impl IntakeRepository for InMemoryIntakeRepository {
    fn create(&self, intake: SystemIntake) -> Result<SystemIntake, RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables.intakes.get(&intake.id) {
            return Err(RepositoryError::Conflict {
                stored: existing.status,
            });
        }
        tables.intakes.insert(intake.id, intake.clone());
        Ok(intake)
    }

    fn fetch(&self, id: &SystemIntakeId) -> Result<Option<SystemIntake>, RepositoryError> {
        Ok(self.lock()?.intakes.get(id).cloned())
    }

    fn list_by_eua_id(&self, eua_id: &str) -> Result<Vec<SystemIntake>, RepositoryError> {
        let tables = self.lock()?;
        let mut owned: Vec<SystemIntake> = tables
            .intakes
            .values()
            .filter(|intake| intake.eua_user_id == eua_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(owned)
    }

    fn update(
        &self,
        intake: SystemIntake,
        expected: SystemIntakeStatus,
        action: Option<Action>,
    ) -> Result<SystemIntake, RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .intakes
            .get(&intake.id)
            .ok_or(RepositoryError::NotFound)?;
        check_expected(stored, expected)?;

        tables.intakes.insert(intake.id, intake.clone());
        if let Some(action) = action {
            tables.actions.push(action);
        }
        Ok(intake)
    }

    fn reject(
        &self,
        id: &SystemIntakeId,
        rejection: &Rejection,
        action: Action,
    ) -> Result<SystemIntake, RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables.intakes.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let observed = stored.status;
        stored
            .apply_rejection(rejection, action.created_at)
            .map_err(|_| RepositoryError::Conflict { stored: observed })?;

        let rejected = stored.clone();
        tables.actions.push(action);
        Ok(rejected)
    }

    fn actions(&self, id: &SystemIntakeId) -> Result<Vec<Action>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .actions
            .iter()
            .filter(|action| action.intake_id == *id)
            .cloned()
            .collect())
    }
}
