use super::{DisplayAction, NotificationRecord, TickOutcome};

/// Reminders currently on screen.
///
/// Dismissing a record only hides it; the notifier state is untouched, so
/// the same task comes back on its next turn in the rotation.
#[derive(Debug, Default, Clone)]
pub struct DisplayQueue {
    records: Vec<NotificationRecord>,
}

impl DisplayQueue {
    pub fn apply(&mut self, outcome: &TickOutcome) {
        match outcome.display {
            DisplayAction::Keep => {}
            DisplayAction::Replace => self.records = outcome.emissions.clone(),
            DisplayAction::Clear => self.records.clear(),
        }
    }

    pub fn dismiss(&mut self, id: &str) -> Option<NotificationRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
