use std::future::Future;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Event, Participation};
use crate::services::mailer::Mailer;
use crate::utils::error::AppError;

/// Persistence needed by the register/cancel workflow.
///
/// `record_registration` must write the participation row and the
/// inscription audit row atomically, and return `None` when another
/// active registration for the same pair already exists (the storage
/// uniqueness constraint is the authoritative duplicate signal).
pub trait RegistrationStore: Send + Sync {
    fn is_registered(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn find_event(
        &self,
        event_id: Uuid,
    ) -> impl Future<Output = Result<Option<Event>, AppError>> + Send;

    fn user_email(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    fn record_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> impl Future<Output = Result<Option<Participation>, AppError>> + Send;

    fn cancel_registrations(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn add_notification(
        &self,
        user_id: Uuid,
        message: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Register/cancel business logic for event participation.
///
/// Every precondition (duplicate, event existence, contact address) is
/// checked before the first write, so a rejected request leaves no partial
/// state. Once the state transition has committed, delivery problems are
/// logged and never turned into a workflow failure.
#[derive(Clone)]
pub struct RegistrationService<S, M> {
    store: S,
    mailer: M,
}

impl<S, M> RegistrationService<S, M>
where
    S: RegistrationStore,
    M: Mailer,
{
    pub fn new(store: S, mailer: M) -> Self {
        Self { store, mailer }
    }

    pub async fn register(&self, user_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
        if self.store.is_registered(user_id, event_id).await? {
            return Err(AppError::AlreadyRegistered);
        }

        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(AppError::EventNotFound)?;

        let email = self
            .store
            .user_email(user_id)
            .await?
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingContactInfo)?;

        // A concurrent registration can still slip past the pre-check;
        // the uniqueness constraint turns it into the same error.
        let participation = self
            .store
            .record_registration(user_id, event_id)
            .await?
            .ok_or(AppError::AlreadyRegistered)?;
        debug!(participation_id = %participation.id, user_id = %user_id, event_id = %event_id, "registration recorded");

        let message = registration_message(&event);
        self.store.add_notification(user_id, &message).await?;

        if let Err(e) = self
            .mailer
            .send(&email, "Inscription confirmée", &message)
            .await
        {
            warn!(user_id = %user_id, event_id = %event_id, error = %e, "confirmation email not delivered");
        }

        Ok(())
    }

    pub async fn cancel(&self, user_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(AppError::EventNotFound)?;

        let email = self
            .store
            .user_email(user_id)
            .await?
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingContactInfo)?;

        // Unconditional flip: cancelling twice, or without a prior
        // registration, is a no-op rather than an error.
        let cancelled = self.store.cancel_registrations(user_id, event_id).await?;
        debug!(user_id = %user_id, event_id = %event_id, rows = cancelled, "registration cancelled");

        let message = cancellation_message(&event);
        self.store.add_notification(user_id, &message).await?;

        if let Err(e) = self
            .mailer
            .send(&email, "Annulation d'inscription", &message)
            .await
        {
            warn!(user_id = %user_id, event_id = %event_id, error = %e, "cancellation email not delivered");
        }

        Ok(())
    }
}

fn registration_message(event: &Event) -> String {
    format!(
        "Vous êtes inscrit à l'événement : {} ({}) - {}. Description: {}",
        event.title,
        event.date.format("%d/%m/%Y %H:%M"),
        event.location,
        event.description.as_deref().unwrap_or("")
    )
}

fn cancellation_message(event: &Event) -> String {
    format!(
        "Vous avez annulé votre inscription à l'événement : {} ({}) - {}. Description: {}",
        event.title,
        event.date.format("%d/%m/%Y %H:%M"),
        event.location,
        event.description.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::participation::{STATUS_CANCELLED, STATUS_REGISTERED};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeStore {
        inner: Arc<FakeStoreInner>,
    }

    #[derive(Default)]
    struct FakeStoreInner {
        events: Mutex<Vec<Event>>,
        emails: Mutex<HashMap<Uuid, String>>,
        participations: Mutex<Vec<Participation>>,
        inscriptions: Mutex<Vec<(Uuid, Uuid)>>,
        notifications: Mutex<Vec<(Uuid, String)>>,
        // simulates another request winning the insert race
        steal_race: Mutex<bool>,
    }

    impl FakeStore {
        fn with_event(self, event: Event) -> Self {
            self.inner.events.lock().unwrap().push(event);
            self
        }

        fn with_email(self, user_id: Uuid, email: &str) -> Self {
            self.inner
                .emails
                .lock()
                .unwrap()
                .insert(user_id, email.to_string());
            self
        }

        fn racing(self) -> Self {
            *self.inner.steal_race.lock().unwrap() = true;
            self
        }

        fn participations(&self) -> Vec<Participation> {
            self.inner.participations.lock().unwrap().clone()
        }

        fn inscriptions(&self) -> Vec<(Uuid, Uuid)> {
            self.inner.inscriptions.lock().unwrap().clone()
        }

        fn notifications(&self) -> Vec<(Uuid, String)> {
            self.inner.notifications.lock().unwrap().clone()
        }
    }

    impl RegistrationStore for FakeStore {
        async fn is_registered(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
            Ok(self.inner.participations.lock().unwrap().iter().any(|p| {
                p.user_id == user_id && p.event_id == event_id && p.status == STATUS_REGISTERED
            }))
        }

        async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError> {
            Ok(self
                .inner
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == event_id)
                .cloned())
        }

        async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
            Ok(self.inner.emails.lock().unwrap().get(&user_id).cloned())
        }

        async fn record_registration(
            &self,
            user_id: Uuid,
            event_id: Uuid,
        ) -> Result<Option<Participation>, AppError> {
            if *self.inner.steal_race.lock().unwrap() {
                return Ok(None);
            }
            let mut participations = self.inner.participations.lock().unwrap();
            let active = participations.iter().any(|p| {
                p.user_id == user_id && p.event_id == event_id && p.status == STATUS_REGISTERED
            });
            if active {
                return Ok(None);
            }
            let row = Participation {
                id: Uuid::new_v4(),
                user_id,
                event_id,
                status: STATUS_REGISTERED.to_string(),
                created_at: Utc::now(),
            };
            participations.push(row.clone());
            self.inner
                .inscriptions
                .lock()
                .unwrap()
                .push((user_id, event_id));
            Ok(Some(row))
        }

        async fn cancel_registrations(
            &self,
            user_id: Uuid,
            event_id: Uuid,
        ) -> Result<u64, AppError> {
            let mut count = 0;
            for p in self.inner.participations.lock().unwrap().iter_mut() {
                if p.user_id == user_id && p.event_id == event_id {
                    p.status = STATUS_CANCELLED.to_string();
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn add_notification(&self, user_id: Uuid, message: &str) -> Result<(), AppError> {
            self.inner
                .notifications
                .lock()
                .unwrap()
                .push((user_id, message.to_string()));
            Ok(())
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

    fn hall_a_concert() -> Event {
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Concert de printemps".to_string(),
            description: Some("Orchestre du campus".to_string()),
            date: Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap(),
            location: "Hall A".to_string(),
            image_url: None,
            category: "musique".to_string(),
            created_at: Utc::now(),
        }
    }

    fn service(
        store: &FakeStore,
        mailer: &RecordingMailer,
    ) -> RegistrationService<FakeStore, RecordingMailer> {
        RegistrationService::new(store.clone(), mailer.clone())
    }

    #[tokio::test]
    async fn register_writes_once_and_sends_confirmation() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();

        service(&store, &mailer)
            .register(user_id, event_id)
            .await
            .unwrap();

        let participations = store.participations();
        assert_eq!(participations.len(), 1);
        assert_eq!(participations[0].status, STATUS_REGISTERED);
        assert_eq!(store.inscriptions().len(), 1);
        assert_eq!(store.notifications().len(), 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "u1@example.com");
        assert_eq!(sent[0].1, "Inscription confirmée");
        assert!(sent[0].2.contains("Concert de printemps"));
        assert!(sent[0].2.contains("01/03/2025 18:00"));
        assert!(sent[0].2.contains("Hall A"));
    }

    #[tokio::test]
    async fn second_register_is_rejected_without_new_rows() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();
        let service = service(&store, &mailer);

        service.register(user_id, event_id).await.unwrap();
        let result = service.register(user_id, event_id).await;

        assert!(matches!(result, Err(AppError::AlreadyRegistered)));
        assert_eq!(store.participations().len(), 1);
        assert_eq!(store.inscriptions().len(), 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn register_unknown_event_writes_nothing() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default().with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();

        let result = service(&store, &mailer)
            .register(user_id, Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(AppError::EventNotFound)));
        assert!(store.participations().is_empty());
        assert!(store.inscriptions().is_empty());
        assert!(store.notifications().is_empty());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn register_without_address_writes_nothing() {
        let event = hall_a_concert();
        let event_id = event.id;
        let store = FakeStore::default().with_event(event);
        let mailer = RecordingMailer::default();

        let result = service(&store, &mailer)
            .register(Uuid::new_v4(), event_id)
            .await;

        assert!(matches!(result, Err(AppError::MissingContactInfo)));
        assert!(store.participations().is_empty());
        assert!(store.inscriptions().is_empty());
    }

    #[tokio::test]
    async fn lost_insert_race_reads_as_already_registered() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com")
            .racing();
        let mailer = RecordingMailer::default();

        let result = service(&store, &mailer).register(user_id, event_id).await;

        assert!(matches!(result, Err(AppError::AlreadyRegistered)));
        assert!(store.notifications().is_empty());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn register_survives_mailer_outage() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");

        service(&store, &RecordingMailer::failing())
            .register(user_id, event_id)
            .await
            .unwrap();

        assert_eq!(store.participations().len(), 1);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn cancel_flips_status_and_keeps_audit_row() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();
        let service = service(&store, &mailer);

        service.register(user_id, event_id).await.unwrap();
        service.cancel(user_id, event_id).await.unwrap();

        let participations = store.participations();
        assert_eq!(participations.len(), 1);
        assert_eq!(participations[0].status, STATUS_CANCELLED);
        // the audit log is untouched by cancellation
        assert_eq!(store.inscriptions().len(), 1);
        assert_eq!(store.notifications().len(), 2);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1, "Annulation d'inscription");
        assert!(sent[1].2.contains("annulé"));
    }

    #[tokio::test]
    async fn cancel_unknown_event_is_rejected() {
        let user_id = Uuid::new_v4();
        let store = FakeStore::default().with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();

        let result = service(&store, &mailer).cancel(user_id, Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::EventNotFound)));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();
        let service = service(&store, &mailer);

        service.register(user_id, event_id).await.unwrap();
        service.cancel(user_id, event_id).await.unwrap();
        service.cancel(user_id, event_id).await.unwrap();

        assert_eq!(store.participations().len(), 1);
        assert_eq!(store.participations()[0].status, STATUS_CANCELLED);
    }

    #[tokio::test]
    async fn reregistration_after_cancel_accumulates_history() {
        let event = hall_a_concert();
        let event_id = event.id;
        let user_id = Uuid::new_v4();
        let store = FakeStore::default()
            .with_event(event)
            .with_email(user_id, "u1@example.com");
        let mailer = RecordingMailer::default();
        let service = service(&store, &mailer);

        service.register(user_id, event_id).await.unwrap();
        service.cancel(user_id, event_id).await.unwrap();
        service.register(user_id, event_id).await.unwrap();

        let participations = store.participations();
        assert_eq!(participations.len(), 2);
        assert_eq!(
            participations
                .iter()
                .filter(|p| p.status == STATUS_REGISTERED)
                .count(),
            1
        );
        assert_eq!(store.inscriptions().len(), 2);
    }
}
