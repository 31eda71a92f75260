//! Meeting repository.
//!
//! Visibility is creator or attendee; other accounts never receive a meeting
//! from `list_mine`.

use super::{parse_all, to_fields, union_by_id, Entity, RepoError, RepoResult};
use crate::model::meeting::{Meeting, MeetingPatch, NewMeeting};
use crate::model::DocumentId;
use crate::session::Session;
use crate::store::{unique_id, Collection, Filter, RemoteStore};
use log::{debug, info, warn};
use serde_json::json;
use std::sync::Arc;

impl Entity for Meeting {
    const COLLECTION: Collection = Collection::Meetings;
    const ID_FIELD: Option<&'static str> = Some("meetingId");

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }
}

#[derive(Clone)]
pub struct MeetingRepository {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl MeetingRepository {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    pub async fn list_mine(&self) -> RepoResult<Vec<Meeting>> {
        let user = self.session.require_user().await?;
        let account = json!(user.account_id);
        let created = self
            .store
            .list_documents(
                Collection::Meetings,
                &[Filter::equal("Creator", account.clone())],
            )
            .await?;
        let attending = self
            .store
            .list_documents(Collection::Meetings, &[Filter::contains("Attendees", account)])
            .await?;
        let meetings = union_by_id(parse_all::<Meeting>(created)?, parse_all(attending)?);
        debug!(
            "event=meeting_list module=repo.meeting status=ok count={}",
            meetings.len()
        );
        Ok(meetings)
    }

    pub async fn create(&self, input: NewMeeting) -> RepoResult<Meeting> {
        let user = self.session.require_user().await?;
        let meeting = input.into_meeting(unique_id(), user.account_id.clone())?;
        let document = self
            .store
            .create_document(Collection::Meetings, &meeting.id, meeting.to_fields()?)
            .await?;
        info!("event=meeting_create module=repo.meeting status=ok");
        Meeting::from_document(document)
    }

    /// Creator-only partial edit.
    pub async fn update(&self, id: &str, patch: MeetingPatch) -> RepoResult<Meeting> {
        let user = self.session.require_user().await?;
        let patch = patch.validated()?;
        let stored =
            Meeting::from_document(self.store.get_document(Collection::Meetings, id).await?)?;
        if stored.creator != user.account_id {
            warn!("event=meeting_update module=repo.meeting status=rejected reason=not_creator");
            return Err(RepoError::NotCreator { id: id.to_string() });
        }
        if patch.is_empty() {
            return Ok(stored);
        }
        let document = self
            .store
            .update_document(Collection::Meetings, id, to_fields(&patch)?)
            .await?;
        Meeting::from_document(document)
    }

    pub async fn delete(&self, id: &str) -> RepoResult<()> {
        self.session.require_user().await?;
        self.store.delete_document(Collection::Meetings, id).await?;
        info!("event=meeting_delete module=repo.meeting status=ok");
        Ok(())
    }
}
