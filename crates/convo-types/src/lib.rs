pub mod api;
pub mod keys;
pub mod models;
pub mod read;

pub use models::{Event, Message, Thread, User, UserPartial};
pub use read::{Read, Readable};
