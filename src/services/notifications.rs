use std::future::Future;

use tracing::warn;
use uuid::Uuid;

use crate::services::mailer::Mailer;
use crate::utils::error::AppError;

/// Persistence needed to emit a notification.
pub trait NotificationStore: Send + Sync {
    fn add_notification(
        &self,
        user_id: Uuid,
        message: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn user_email(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}

/// Persists per-user messages and mirrors them to email when the user has
/// an address on file. The stored row is the source of truth: only a
/// failure to insert it is surfaced, email delivery is best-effort.
#[derive(Clone)]
pub struct NotificationService<S, M> {
    store: S,
    mailer: M,
}

impl<S, M> NotificationService<S, M>
where
    S: NotificationStore,
    M: Mailer,
{
    pub fn new(store: S, mailer: M) -> Self {
        Self { store, mailer }
    }

    pub async fn notify(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
        self.store.add_notification(user_id, message).await?;

        match self.store.user_email(user_id).await {
            Ok(Some(email)) if !email.is_empty() => {
                if let Err(e) = self
                    .mailer
                    .send(&email, "Nouvelle Notification", message)
                    .await
                {
                    warn!(user_id = %user_id, error = %e, "notification email not delivered");
                }
            }
            Ok(_) => {
                warn!(user_id = %user_id, "no email address on file, notification stored only");
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "email lookup failed, notification stored only");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeStore {
        inner: Arc<FakeStoreInner>,
    }

    #[derive(Default)]
    struct FakeStoreInner {
        emails: Mutex<HashMap<Uuid, String>>,
        notifications: Mutex<Vec<(Uuid, String)>>,
        fail_insert: Mutex<bool>,
    }

    impl FakeStore {
        fn with_email(self, user_id: Uuid, email: &str) -> Self {
            self.inner
                .emails
                .lock()
                .unwrap()
                .insert(user_id, email.to_string());
            self
        }

        fn failing_insert(self) -> Self {
            *self.inner.fail_insert.lock().unwrap() = true;
            self
        }

        fn stored(&self) -> Vec<(Uuid, String)> {
            self.inner.notifications.lock().unwrap().clone()
        }
    }

    impl NotificationStore for FakeStore {
        async fn add_notification(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
            if *self.inner.fail_insert.lock().unwrap() {
                return Err(AppError::DatabaseError(sqlx::Error::PoolClosed));
            }
            self.inner
                .notifications
                .lock()
                .unwrap()
                .push((user_id, message.to_string()));
            Ok(())
        }

        async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
            Ok(self.inner.emails.lock().unwrap().get(&user_id).cloned())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingMailer {
        sent: Arc<Mutex<Vec<(String, String, String)>>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::EmailError("relay down".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn notify_persists_and_mirrors_to_email() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default().with_email(user_id, "lea@example.com");
        let mailer = RecordingMailer::default();
        let service = NotificationService::new(store.clone(), mailer.clone());

        service.notify(user_id, "Bienvenue !").await.unwrap();

        assert_eq!(store.stored().len(), 1);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "lea@example.com");
        assert_eq!(sent[0].1, "Nouvelle Notification");
        assert_eq!(sent[0].2, "Bienvenue !");
    }

    #[tokio::test]
    async fn notify_without_address_still_persists() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default();
        let mailer = RecordingMailer::default();
        let service = NotificationService::new(store.clone(), mailer.clone());

        service.notify(user_id, "Bienvenue !").await.unwrap();

        assert_eq!(store.stored().len(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn notify_survives_mailer_outage() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default().with_email(user_id, "lea@example.com");
        let service = NotificationService::new(store.clone(), RecordingMailer::failing());

        service.notify(user_id, "Bienvenue !").await.unwrap();

        assert_eq!(store.stored().len(), 1);
    }

    #[tokio::test]
    async fn notify_surfaces_insert_failure() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_email(user_id, "lea@example.com")
            .failing_insert();
        let mailer = RecordingMailer::default();
        let service = NotificationService::new(store, mailer.clone());

        let result = service.notify(user_id, "Bienvenue !").await;

        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert!(mailer.sent().is_empty());
    }
}
