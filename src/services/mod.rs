pub mod mailer;
pub mod notifications;
pub mod registration;

pub use mailer::{Mailer, SmtpMailer};
pub use notifications::{NotificationService, NotificationStore};
pub use registration::{RegistrationService, RegistrationStore};
