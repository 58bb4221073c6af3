use crate::error::AppError;
use crate::notifier::{NotificationRecord, Severity};
use crate::notify::{Notifier, activation_argument, launch_show};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, record: &NotificationRecord) -> Result<(), AppError> {
        let action = activation_argument(&record.task_id);
        let urgency = match record.severity {
            Severity::Danger => Urgency::Critical,
            Severity::Warning => Urgency::Normal,
        };

        let handle = Notification::new()
            .appname("taskpulse")
            .summary(&record.title)
            .body(&record.message)
            .urgency(urgency)
            .action(&action, "Open")
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        let task_id = record.task_id.clone();
        std::thread::spawn(move || {
            handle.wait_for_action(|selected| {
                if selected == action || selected == "default" {
                    let _ = launch_show(&task_id);
                }
            });
        });

        Ok(())
    }
}
