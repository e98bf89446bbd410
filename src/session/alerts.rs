//! Banner alerts shown below the message form

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Error,
    Warning,
    Info,
}

/// An alert; its id is its message, so the same alert is never shown twice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>, level: AlertLevel) -> Self {
        let message = message.into();
        Self {
            id: message.clone(),
            level,
            message,
        }
    }
}

/// Ordered list of active alerts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alerts {
    alerts: Vec<Alert>,
}

impl Alerts {
    /// Add an alert unless one with the same id is already shown.
    ///
    /// Returns true if the alert was added.
    pub fn add(&mut self, message: impl Into<String>, level: AlertLevel) -> bool {
        let alert = Alert::new(message, level);
        if self.contains(&alert.id) {
            return false;
        }
        self.alerts.push(alert);
        true
    }

    /// Remove the alert with `id`; returns true if one was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    /// Add or remove an alert depending on `active`
    pub fn toggle(&mut self, message: &str, level: AlertLevel, active: bool) {
        if active {
            self.add(message, level);
        } else {
            self.remove(message);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.alerts.iter().any(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| a.level == AlertLevel::Error)
    }
}
