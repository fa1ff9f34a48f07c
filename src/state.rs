use std::sync::Arc;

use sqlx::PgPool;

use crate::services::mailer::SmtpMailer;
use crate::services::notifications::NotificationService;
use crate::services::registration::RegistrationService;
use crate::store::PgStore;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub mailer: SmtpMailer,
}

impl AppState {
    pub fn new(db: PgPool, mailer: SmtpMailer) -> Arc<Self> {
        Arc::new(Self { db, mailer })
    }

    pub fn registrations(&self) -> RegistrationService<PgStore, SmtpMailer> {
        RegistrationService::new(PgStore::new(self.db.clone()), self.mailer.clone())
    }

    pub fn notifications(&self) -> NotificationService<PgStore, SmtpMailer> {
        NotificationService::new(PgStore::new(self.db.clone()), self.mailer.clone())
    }
}
