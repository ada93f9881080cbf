use uuid::Uuid;

use convo_db::{Database, UnitOfWork};
use convo_types::{Event, Readable, Thread};

/// Threads and events as seen by the message and read-marking operations.
pub(crate) trait Container: Readable + Send + 'static {
    const KIND: &'static str;

    /// Threads never allow their first message to be deleted.
    const HEAD_IS_PROTECTED: bool;

    fn title(&self) -> &str;
    fn owner_id(&self) -> Uuid;
    fn member_ids(&self) -> &[Uuid];

    fn load(uow: &UnitOfWork<'_>, id: Uuid) -> anyhow::Result<Option<Self>>
    where
        Self: Sized;
    fn save(&self, uow: &UnitOfWork<'_>) -> anyhow::Result<()>;

    /// Read outside any transaction.
    fn find(db: &Database, id: Uuid) -> anyhow::Result<Option<Self>>
    where
        Self: Sized;

    fn message_posted(&mut self) {}
    fn message_deleted(&mut self) {}

    fn can_access(&self, user_id: Uuid) -> bool {
        self.owner_id() == user_id || self.member_ids().contains(&user_id)
    }

    /// Owner plus members, without duplicates.
    fn participant_ids(&self) -> Vec<Uuid> {
        let mut ids = self.member_ids().to_vec();
        if !ids.contains(&self.owner_id()) {
            ids.push(self.owner_id());
        }
        ids
    }
}

impl Container for Thread {
    const KIND: &'static str = "thread";
    const HEAD_IS_PROTECTED: bool = true;

    fn title(&self) -> &str {
        &self.subject
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn member_ids(&self) -> &[Uuid] {
        &self.user_ids
    }

    fn load(uow: &UnitOfWork<'_>, id: Uuid) -> anyhow::Result<Option<Self>> {
        uow.get_thread(id)
    }

    fn save(&self, uow: &UnitOfWork<'_>) -> anyhow::Result<()> {
        uow.put_thread(self)
    }

    fn find(db: &Database, id: Uuid) -> anyhow::Result<Option<Self>> {
        db.get_thread(id)
    }

    fn message_posted(&mut self) {
        self.response_count += 1;
    }

    fn message_deleted(&mut self) {
        self.response_count = (self.response_count - 1).max(0);
    }
}

impl Container for Event {
    const KIND: &'static str = "event";
    const HEAD_IS_PROTECTED: bool = false;

    fn title(&self) -> &str {
        &self.name
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn member_ids(&self) -> &[Uuid] {
        &self.user_ids
    }

    fn load(uow: &UnitOfWork<'_>, id: Uuid) -> anyhow::Result<Option<Self>> {
        uow.get_event(id)
    }

    fn save(&self, uow: &UnitOfWork<'_>) -> anyhow::Result<()> {
        uow.put_event(self)
    }

    fn find(db: &Database, id: Uuid) -> anyhow::Result<Option<Self>> {
        db.get_event(id)
    }
}
