use crate::error::AppError;
use crate::notifier::NotificationRecord;
use crate::notify::{Notifier, activation_argument, launch_show, parse_activation_argument};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, record: &NotificationRecord) -> Result<(), AppError> {
        let task_id = record.task_id.clone();
        let action = activation_argument(&record.task_id);

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&record.title)
            .text1(&record.message)
            .add_button("Open", &action)
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or_else(|| task_id.clone());
                let _ = launch_show(&target);
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
