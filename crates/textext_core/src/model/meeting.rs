//! Meeting domain model.

use super::{
    dedup_ids, normalize_due_date, null_as_default, participant_set, require_text, AccountId,
    DocumentId, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Meeting document as stored in the meetings collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", deserialize_with = "null_as_default", default)]
    pub description: String,
    #[serde(rename = "DueDate", default)]
    pub due_date: Option<String>,
    #[serde(rename = "Creator")]
    pub creator: AccountId,
    #[serde(rename = "Attendees", deserialize_with = "participant_set", default)]
    pub attendees: Vec<AccountId>,
}

impl Meeting {
    /// Returns whether `account_id` may see this meeting.
    pub fn is_visible_to(&self, account_id: &str) -> bool {
        self.creator == account_id || self.attendees.iter().any(|id| id == account_id)
    }
}

/// Input for scheduling a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeeting {
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub attendees: Vec<AccountId>,
}

impl NewMeeting {
    pub fn into_meeting(
        self,
        id: DocumentId,
        creator: AccountId,
    ) -> Result<Meeting, ValidationError> {
        Ok(Meeting {
            id,
            title: require_text("title", &self.title)?,
            description: self.description.trim().to_string(),
            due_date: normalize_due_date(self.due_date.as_deref())?,
            creator,
            attendees: dedup_ids(&self.attendees),
        })
    }
}

/// Partial edit of a meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeetingPatch {
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "DueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "Attendees", skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<AccountId>>,
}

impl MeetingPatch {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let title = match &self.title {
            Some(value) => Some(require_text("title", value)?),
            None => None,
        };
        let due_date = match &self.due_date {
            Some(value) => normalize_due_date(Some(value))?,
            None => None,
        };
        Ok(Self {
            title,
            description: self.description.as_ref().map(|value| value.trim().to_string()),
            due_date,
            attendees: self.attendees.as_ref().map(|ids| dedup_ids(ids)),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{MeetingPatch, NewMeeting};

    #[test]
    fn attendees_are_deduplicated_on_create() {
        let meeting = NewMeeting {
            title: "Study group".to_string(),
            description: String::new(),
            due_date: Some("2025-01-20T15:00:00.000Z".to_string()),
            attendees: vec!["u2".into(), "u3".into(), "u2".into()],
        }
        .into_meeting("m1".into(), "u1".into())
        .unwrap();

        assert_eq!(meeting.attendees, vec!["u2", "u3"]);
        assert!(meeting.is_visible_to("u1"));
        assert!(meeting.is_visible_to("u3"));
        assert!(!meeting.is_visible_to("u4"));
    }

    #[test]
    fn blank_title_patch_is_rejected() {
        let patch = MeetingPatch {
            title: Some("  ".to_string()),
            ..MeetingPatch::default()
        };
        assert!(patch.validated().is_err());
    }
}
