use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::read::{Read, Readable};

pub const MAX_CONTACTS: usize = 50;
pub const MAX_THREAD_MEMBERS: usize = 11;

/// Rule violations raised by entity methods. The API layer reports these
/// as 400s with the message as body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("You already have this contact")]
    DuplicateContact,
    #[error("You cannot add yourself as a contact")]
    SelfContact,
    #[error("You can have a maximum of {MAX_CONTACTS} contacts")]
    TooManyContacts,
    #[error("You don't have this contact")]
    UnknownContact,
    #[error("You cannot remove your primary email")]
    RemovePrimaryEmail,
    #[error("You cannot make an unverified email primary")]
    UnverifiedPrimaryEmail,
    #[error("Convos have a maximum of {MAX_THREAD_MEMBERS} members")]
    TooManyMembers,
    #[error("User has not been saved yet")]
    IncompleteUser,
}

// -- Users --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// `None` until the user is first written to the store.
    pub id: Option<Uuid>,
    pub email: String,
    pub emails: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub avatar: String,
    pub token: String,
    pub realtime_token: String,
    #[serde(skip)]
    pub password_digest: String,
    #[serde(skip)]
    pub oauth_google_id: String,
    #[serde(skip)]
    pub oauth_facebook_id: String,
    pub is_password_set: bool,
    pub is_google_linked: bool,
    pub is_facebook_linked: bool,
    pub verified: bool,
    #[serde(skip)]
    pub contact_ids: Vec<Uuid>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A placeholder for someone referenced by email before they sign up.
    pub fn new_incomplete(email: &str) -> Self {
        let email = email.to_lowercase();
        let first_name = email.split('@').next().unwrap_or_default().to_string();

        Self {
            email,
            first_name,
            token: random_token(),
            created_at: Utc::now(),
            ..Self::default()
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_registered(&self) -> bool {
        (self.is_google_linked || self.is_facebook_linked || self.is_password_set) && self.verified
    }

    /// Recompute every field that is derived from stored state. Runs after
    /// each load and before each save.
    pub fn derive_properties(&mut self) {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        if !self.first_name.is_empty() && !self.last_name.is_empty() {
            self.first_name = title_case(&self.first_name);
            self.last_name = title_case(&self.last_name);
        }

        self.derive_account_state();
    }

    /// The part of [`User::derive_properties`] that leaves names as they
    /// are: full name, sign-in flags and email verification.
    pub fn derive_account_state(&mut self) {
        self.full_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();

        self.is_password_set = !self.password_digest.is_empty();
        self.is_google_linked = !self.oauth_google_id.is_empty();
        self.is_facebook_linked = !self.oauth_facebook_id.is_empty();

        // Older rows only carried a single verified flag.
        if self.verified && !self.has_email(&self.email) {
            let email = self.email.clone();
            self.add_email(&email);
        }

        if !self.verified && !self.has_email(&self.email) && !self.emails.is_empty() {
            self.email = self.emails[0].clone();
        }

        self.verified = self.has_email(&self.email);
    }

    // -- Emails --

    /// True when `email` is one of the user's verified addresses.
    pub fn has_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.emails.iter().any(|e| *e == email)
    }

    /// Record a verified address. Unverified addresses must never be added.
    pub fn add_email(&mut self, email: &str) {
        if self.has_email(email) {
            return;
        }
        self.emails.push(email.to_lowercase());
    }

    pub fn remove_email(&mut self, email: &str) -> Result<(), ValidationError> {
        let email = email.to_lowercase();
        if !self.has_email(&email) {
            return Ok(());
        }
        if self.email == email {
            return Err(ValidationError::RemovePrimaryEmail);
        }
        self.emails.retain(|e| *e != email);
        Ok(())
    }

    pub fn make_email_primary(&mut self, email: &str) -> Result<(), ValidationError> {
        if !self.has_email(email) {
            return Err(ValidationError::UnverifiedPrimaryEmail);
        }
        self.email = email.to_lowercase();
        self.verified = true;
        Ok(())
    }

    // -- Contacts --

    pub fn has_contact(&self, contact_id: Uuid) -> bool {
        self.contact_ids.contains(&contact_id)
    }

    pub fn add_contact(&mut self, contact: &User) -> Result<(), ValidationError> {
        let contact_id = contact.id.ok_or(ValidationError::IncompleteUser)?;
        if self.has_contact(contact_id) {
            return Err(ValidationError::DuplicateContact);
        }
        if self.id == Some(contact_id) {
            return Err(ValidationError::SelfContact);
        }
        if self.contact_ids.len() >= MAX_CONTACTS {
            return Err(ValidationError::TooManyContacts);
        }
        self.contact_ids.push(contact_id);
        Ok(())
    }

    pub fn remove_contact(&mut self, contact_id: Uuid) -> Result<(), ValidationError> {
        if !self.has_contact(contact_id) {
            return Err(ValidationError::UnknownContact);
        }
        self.contact_ids.retain(|&k| k != contact_id);
        Ok(())
    }
}

/// Public projection of a user embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartial {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub avatar: String,
}

impl From<&User> for UserPartial {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.unwrap_or_default(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            full_name: u.full_name.clone(),
            avatar: u.avatar.clone(),
        }
    }
}

/// Map the markers on `r` to the users who left them, in marker order.
/// Markers from users missing in `users` are skipped.
pub fn map_reads_to_user_partials<R: Readable + ?Sized>(r: &R, users: &[User]) -> Vec<UserPartial> {
    r.reads()
        .iter()
        .filter_map(|read| users.iter().find(|u| u.id == Some(read.user_id)))
        .map(UserPartial::from)
        .collect()
}

// -- Threads --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub user_ids: Vec<Uuid>,
    pub subject: String,
    #[serde(skip)]
    pub reads: Vec<Read>,
    pub response_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(subject: &str, owner: &User, members: &[User]) -> Result<Self, ValidationError> {
        if members.len() > MAX_THREAD_MEMBERS {
            return Err(ValidationError::TooManyMembers);
        }

        let owner_id = owner.id.ok_or(ValidationError::IncompleteUser)?;
        let (user_ids, participants) = collect_members(owner, owner_id, members)?;

        let subject = if subject.is_empty() {
            default_subject(owner, &participants)
        } else {
            subject.to_string()
        };

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            user_ids,
            subject,
            reads: Vec::new(),
            response_count: 0,
            created_at: Utc::now(),
        })
    }

    pub fn owner_is(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn has_user(&self, user_id: Uuid) -> bool {
        self.user_ids.contains(&user_id)
    }
}

impl Readable for Thread {
    fn reads(&self) -> &[Read] {
        &self.reads
    }

    fn reads_mut(&mut self) -> &mut Vec<Read> {
        &mut self.reads
    }
}

// -- Events --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub user_ids: Vec<Uuid>,
    pub rsvp_ids: Vec<Uuid>,
    pub name: String,
    pub address: String,
    pub starts_at: DateTime<Utc>,
    #[serde(skip)]
    pub reads: Vec<Read>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        name: &str,
        address: &str,
        starts_at: DateTime<Utc>,
        owner: &User,
        members: &[User],
    ) -> Result<Self, ValidationError> {
        let owner_id = owner.id.ok_or(ValidationError::IncompleteUser)?;
        let (user_ids, _) = collect_members(owner, owner_id, members)?;

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            user_ids,
            rsvp_ids: Vec::new(),
            name: name.to_string(),
            address: address.to_string(),
            starts_at,
            reads: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.starts_at > now
    }

    pub fn owner_is(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn has_user(&self, user_id: Uuid) -> bool {
        self.user_ids.contains(&user_id)
    }

    pub fn has_rsvp(&self, user_id: Uuid) -> bool {
        self.rsvp_ids.contains(&user_id)
    }
}

impl Readable for Event {
    fn reads(&self) -> &[Read] {
        &self.reads
    }

    fn reads_mut(&mut self) -> &mut Vec<Read> {
        &mut self.reads
    }
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Uuid,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub reads: Vec<Read>,
    pub photo_keys: Vec<String>,
}

impl Message {
    pub fn new(user_id: Uuid, parent_id: Uuid, body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            parent_id,
            body: body.to_string(),
            timestamp: Utc::now(),
            reads: Vec::new(),
            photo_keys: Vec::new(),
        }
    }

    pub fn owner_is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn has_photo(&self) -> bool {
        !self.photo_keys.is_empty()
    }

    /// Drop `key` from the message's photos. Removing an absent key is not
    /// an error, so retries after a partial failure are safe.
    pub fn delete_photo(&mut self, key: &str) -> bool {
        let before = self.photo_keys.len();
        self.photo_keys.retain(|k| k != key);
        self.photo_keys.len() != before
    }
}

impl Readable for Message {
    fn reads(&self) -> &[Read] {
        &self.reads
    }

    fn reads_mut(&mut self) -> &mut Vec<Read> {
        &mut self.reads
    }
}

// -- Helpers --

/// De-duplicated member ids with the owner appended when absent, plus the
/// matching user list used for subject generation.
fn collect_members<'a>(
    owner: &'a User,
    owner_id: Uuid,
    members: &'a [User],
) -> Result<(Vec<Uuid>, Vec<&'a User>), ValidationError> {
    let mut user_ids = Vec::with_capacity(members.len() + 1);
    let mut participants = Vec::with_capacity(members.len() + 1);

    for member in members {
        let id = member.id.ok_or(ValidationError::IncompleteUser)?;
        if user_ids.contains(&id) {
            continue;
        }
        user_ids.push(id);
        participants.push(member);
    }

    if !user_ids.contains(&owner_id) {
        user_ids.push(owner_id);
        participants.push(owner);
    }

    Ok((user_ids, participants))
}

fn default_subject(owner: &User, participants: &[&User]) -> String {
    if participants.len() == 1 {
        return format!("{}'s Private Convo", owner.first_name);
    }

    let names: Vec<&str> = participants.iter().map(|u| u.first_name.as_str()).collect();
    let (last, rest) = names.split_last().unwrap_or((&"", &[]));
    format!("{} and {}", rest.join(", "), last)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
