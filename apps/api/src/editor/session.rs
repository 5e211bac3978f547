//! Editing sessions. Each session owns one auto-save driver plus the
//! addressable location (the shareable resume identifier) the driver keeps
//! in sync after the first save assigns one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::config::Config;
use crate::draft::autosave::{AutoSaveHandle, LocationSink, SaveDraft, SaveError};
use crate::draft::model::SavePayload;
use crate::resumes::store::save_resume;

/// Registry of open editing sessions, keyed by session id.
pub type SessionRegistry = Arc<RwLock<HashMap<Uuid, EditorSession>>>;

pub struct EditorSession {
    pub handle: AutoSaveHandle,
    location_rx: watch::Receiver<Option<Uuid>>,
}

impl EditorSession {
    pub fn new(handle: AutoSaveHandle, location_rx: watch::Receiver<Option<Uuid>>) -> Self {
        Self {
            handle,
            location_rx,
        }
    }

    /// The shareable resume identifier, once a save has assigned one.
    pub fn location_resume_id(&self) -> Option<Uuid> {
        *self.location_rx.borrow()
    }
}

/// The session's addressable location: a watch channel clients can read to
/// keep their URL in sync without a full navigation.
pub struct SharedLocation(watch::Sender<Option<Uuid>>);

impl SharedLocation {
    /// Returns the sink plus the receiver the session keeps.
    pub fn channel(initial: Option<Uuid>) -> (Arc<Self>, watch::Receiver<Option<Uuid>>) {
        let (tx, rx) = watch::channel(initial);
        (Arc::new(Self(tx)), rx)
    }
}

impl LocationSink for SharedLocation {
    fn resume_id(&self) -> Option<Uuid> {
        *self.0.borrow()
    }

    fn set_resume_id(&self, id: Uuid) {
        // Receivers may be gone when the session is closing.
        let _ = self.0.send(Some(id));
    }
}

/// The production save capability: persists through the resume store.
pub struct DbSaver {
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    config: Config,
    user_id: String,
}

impl DbSaver {
    pub fn new(pool: PgPool, s3: aws_sdk_s3::Client, config: Config, user_id: String) -> Self {
        Self {
            pool,
            s3,
            config,
            user_id,
        }
    }
}

#[async_trait]
impl SaveDraft for DbSaver {
    async fn save(
        &self,
        payload: SavePayload,
        resume_id: Option<Uuid>,
    ) -> Result<Uuid, SaveError> {
        save_resume(
            &self.pool,
            &self.s3,
            &self.config,
            &self.user_id,
            resume_id,
            payload,
        )
        .await
        .map_err(|e| SaveError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_location_reports_latest_id() {
        let (location, rx) = SharedLocation::channel(None);
        assert!(location.resume_id().is_none());

        let id = Uuid::new_v4();
        location.set_resume_id(id);
        assert_eq!(location.resume_id(), Some(id));
        assert_eq!(*rx.borrow(), Some(id));
    }
}
