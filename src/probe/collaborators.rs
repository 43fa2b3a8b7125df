//! Seams to the host: the thermal model that consumes tau estimates and the
//! notification channel used for probe progress.

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::models::ProbeResult;

/// Receives every accepted probe result exactly once.
pub trait ThermalModel {
    fn update_tau(&mut self, result: &ProbeResult, is_cooling: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

pub trait Notifier {
    fn create(
        &mut self,
        title: &str,
        message: &str,
        notification_id: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError>;

    fn dismiss(&mut self, notification_id: &str) -> Result<(), NotifyError>;
}

impl<T: ThermalModel + ?Sized> ThermalModel for Box<T> {
    fn update_tau(&mut self, result: &ProbeResult, is_cooling: bool) {
        (**self).update_tau(result, is_cooling)
    }
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn create(
        &mut self,
        title: &str,
        message: &str,
        notification_id: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        (**self).create(title, message, notification_id, actions)
    }

    fn dismiss(&mut self, notification_id: &str) -> Result<(), NotifyError> {
        (**self).dismiss(notification_id)
    }
}
