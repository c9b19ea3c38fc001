//! Notification dispatch: translates domain events (balance changed, new
//! transaction) into per-user notification rows and optional email delivery,
//! honoring per-user, per-channel preferences.

pub mod alerts;
pub mod mailer;
pub mod preferences;
pub mod service;

pub use alerts::{AlertService, CreateAlertParams};
pub use mailer::{Mailer, NoopMailer, OutgoingEmail, ResendMailer};
pub use service::{NewNotification, NotificationService};
