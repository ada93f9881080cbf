//! Collaborator fakes and fixtures shared by the core's unit tests.

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use convo_db::Database;
use convo_types::{Event, User, UserPartial};

use crate::clients::{MailClient, Notification, NotificationClient, SearchClient};
use crate::context::Services;
use crate::digest::DigestItem;

/// One `send_digest` call as seen by [`RecordingMail`].
#[derive(Debug, Clone)]
pub struct SentDigest {
    pub to: Option<Uuid>,
    pub item_parents: Vec<Uuid>,
    pub item_sizes: Vec<usize>,
    pub upcoming: Vec<Uuid>,
}

#[derive(Default)]
pub struct RecordingMail {
    pub sent: Mutex<Vec<SentDigest>>,
}

impl MailClient for RecordingMail {
    fn send_digest<'a>(
        &'a self,
        items: &'a [DigestItem],
        upcoming: &'a [Event],
        user: &'a User,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(SentDigest {
                to: user.id,
                item_parents: items.iter().map(|i| i.parent_id).collect(),
                item_sizes: items.iter().map(|i| i.messages.len()).collect(),
                upcoming: upcoming.iter().map(|e| e.id).collect(),
            });
            Ok(())
        })
    }
}

pub struct FailingMail;

impl MailClient for FailingMail {
    fn send_digest<'a>(
        &'a self,
        _items: &'a [DigestItem],
        _upcoming: &'a [Event],
        _user: &'a User,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Err(anyhow!("smtp unavailable")) })
    }
}

/// Records every call. Deletes always fail so best-effort paths get exercised.
#[derive(Default)]
pub struct RecordingSearch {
    pub updated: Mutex<Vec<Uuid>>,
    pub deleted: Mutex<Vec<Uuid>>,
}

impl SearchClient for RecordingSearch {
    fn update<'a>(&'a self, user: &'a UserPartial) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.updated.lock().unwrap().push(user.id);
            Ok(())
        })
    }

    fn delete(&self, user_id: Uuid) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.deleted.lock().unwrap().push(user_id);
            Err(anyhow!("index offline"))
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    pub sent: Mutex<Vec<Notification>>,
}

impl NotificationClient for RecordingNotifications {
    fn generate_token(&self, user_id: Uuid) -> String {
        format!("rt-{user_id}")
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        })
    }
}

pub struct Harness {
    pub services: Services,
    pub mail: Arc<RecordingMail>,
    pub search: Arc<RecordingSearch>,
    pub notifications: Arc<RecordingNotifications>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mail(None)
    }

    pub fn with_failing_mail() -> Self {
        Self::with_mail(Some(Arc::new(FailingMail)))
    }

    fn with_mail(mail: Option<Arc<dyn MailClient>>) -> Self {
        let recording = Arc::new(RecordingMail::default());
        let search = Arc::new(RecordingSearch::default());
        let notifications = Arc::new(RecordingNotifications::default());
        let services = Services {
            db: Arc::new(Database::open_in_memory().unwrap()),
            mail: mail.unwrap_or_else(|| recording.clone() as Arc<dyn MailClient>),
            search: search.clone(),
            notifications: notifications.clone(),
        };
        Self {
            services,
            mail: recording,
            search,
            notifications,
        }
    }

    pub fn db(&self) -> &Database {
        &self.services.db
    }

    /// A registered, verified user saved to the store.
    pub fn user(&self, first: &str) -> User {
        let mut user = User::new_incomplete(&format!("{}@example.com", first.to_lowercase()));
        user.first_name = first.to_string();
        user.password_digest = "digest".into();
        user.verified = true;
        self.db().put_user(&mut user).unwrap();
        user
    }
}

pub fn id(user: &User) -> Uuid {
    user.id.unwrap()
}
