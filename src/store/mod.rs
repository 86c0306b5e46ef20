//! Persistence through an opaque key-value store.
//!
//! The core only needs `get`/`put`/`delete` by string key. Records are
//! encoded with bincode; typed accessors keep the key scheme in one place:
//!
//! | Key | Record |
//! |---|---|
//! | `user:<id>` | [`UserRecord`] |
//! | `session:<id>` | archived [`GameSession`] |

pub mod memory;
pub mod records;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::{GameSession, SessionId, StoreError, UserId};

pub use memory::MemoryStore;
pub use records::UserRecord;

/// Byte-level key-value store.
pub trait KvStore: Send + Sync {
    /// Value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing what was there.
    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

fn user_key(id: &UserId) -> String {
    format!("user:{id}")
}

fn session_key(id: &SessionId) -> String {
    format!("session:{id}")
}

/// Decode the record under `key`.
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StoreError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    bincode::deserialize(&bytes).map(Some).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Encode and store a record under `key`.
pub fn save<T: Serialize>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.put(key, bytes)
}

/// A user's record, or a fresh one for a first-time player.
pub fn load_user(store: &dyn KvStore, id: &UserId) -> Result<UserRecord, StoreError> {
    Ok(load(store, &user_key(id))?.unwrap_or_else(|| UserRecord::new(id.clone())))
}

/// Persist a user's record.
pub fn save_user(store: &dyn KvStore, record: &UserRecord) -> Result<(), StoreError> {
    save(store, &user_key(&record.user_id), record)
}

/// Archive a finished session.
pub fn archive_session(store: &dyn KvStore, session: &GameSession) -> Result<(), StoreError> {
    save(store, &session_key(&session.id), session)
}

/// Read back an archived session.
pub fn load_archived_session(store: &dyn KvStore, id: &SessionId) -> Result<GameSession, StoreError> {
    let key = session_key(id);
    load(store, &key)?.ok_or(StoreError::NotFound { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_is_fresh() {
        let store = MemoryStore::new();
        let user = load_user(&store, &UserId::new("newbie")).unwrap();
        assert_eq!(user, UserRecord::new(UserId::new("newbie")));
    }

    #[test]
    fn test_user_persisted() {
        let store = MemoryStore::new();
        let mut user = UserRecord::new(UserId::new("u1"));
        user.rating = 1620;
        user.inventory.items.push("kaya_board".to_string());
        save_user(&store, &user).unwrap();

        assert_eq!(load_user(&store, &UserId::new("u1")).unwrap(), user);
        assert!(store.get("user:u1").unwrap().is_some());
    }

    #[test]
    fn test_corrupt_record_is_codec_error() {
        let store = MemoryStore::new();
        store.put("user:bad", vec![1, 2]).unwrap();
        let err = load_user(&store, &UserId::new("bad")).unwrap_err();
        assert_eq!(err.code(), "STORE_CODEC");
    }

    #[test]
    fn test_missing_archive() {
        let store = MemoryStore::new();
        let err = load_archived_session(&store, &SessionId::new("gone")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { key } if key == "session:gone"));
    }
}
