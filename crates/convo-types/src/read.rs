//! Per-user read markers shared by threads, events and messages.
//!
//! Markers are mutated in memory only. Whoever owns the entity is
//! responsible for persisting it afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single "user has seen this" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Read {
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl Read {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            timestamp: Utc::now(),
        }
    }
}

/// Anything that carries a list of read markers.
pub trait Readable {
    fn reads(&self) -> &[Read];
    fn reads_mut(&mut self) -> &mut Vec<Read>;
}

/// True iff `user_id` has a marker on `r`.
pub fn is_read<R: Readable + ?Sized>(r: &R, user_id: Uuid) -> bool {
    r.reads().iter().any(|read| read.user_id == user_id)
}

/// Append a marker for `user_id` unless one already exists.
pub fn mark_as_read<R: Readable + ?Sized>(r: &mut R, user_id: Uuid) {
    if is_read(r, user_id) {
        return;
    }
    r.reads_mut().push(Read::new(user_id));
}

pub fn clear_reads<R: Readable + ?Sized>(r: &mut R) {
    r.reads_mut().clear();
}

/// Rewrite markers held by `old` so they belong to `new`, keeping only the
/// first marker per user.
pub fn swap_read_users(reads: &[Read], old: Uuid, new: Uuid) -> Vec<Read> {
    let mut seen = Vec::with_capacity(reads.len());
    let mut clean = Vec::with_capacity(reads.len());

    for read in reads {
        let user_id = if read.user_id == old { new } else { read.user_id };
        if seen.contains(&user_id) {
            continue;
        }
        seen.push(user_id);
        clean.push(Read {
            user_id,
            timestamp: read.timestamp,
        });
    }

    clean
}
