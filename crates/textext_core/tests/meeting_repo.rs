mod common;

use common::{account_id, file_store, signed_in};
use std::collections::HashSet;
use textext_core::{MeetingPatch, NewMeeting, RepoError};

fn meeting(title: &str, attendees: Vec<String>) -> NewMeeting {
    NewMeeting {
        title: title.to_string(),
        description: "weekly".to_string(),
        due_date: Some("2025-01-20T15:00:00.000Z".to_string()),
        attendees,
    }
}

#[tokio::test]
async fn visibility_is_creator_or_attendee_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let ada = signed_in(file_store(&path), "ada").await;
    let grace = signed_in(file_store(&path), "grace").await;
    let linus = signed_in(file_store(&path), "linus").await;

    let created = ada
        .meetings
        .create(meeting("Review", vec![account_id(&grace).await]))
        .await
        .unwrap();

    let for_creator = ada.meetings.list_mine().await.unwrap();
    let for_attendee = grace.meetings.list_mine().await.unwrap();
    let for_outsider = linus.meetings.list_mine().await.unwrap();

    assert_eq!(for_creator.len(), 1);
    assert_eq!(for_attendee.len(), 1);
    assert_eq!(for_attendee[0].id, created.id);
    assert!(for_outsider.is_empty());
}

#[tokio::test]
async fn concurrent_lists_return_union_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let ada = signed_in(file_store(&path), "ada").await;
    let grace = signed_in(file_store(&path), "grace").await;
    let me = account_id(&ada).await;

    // A: created by ada and listing ada as attendee too.
    let a = ada
        .meetings
        .create(meeting("A", vec![me.clone()]))
        .await
        .unwrap();
    // B: created by grace with ada attending.
    let b = grace
        .meetings
        .create(meeting("B", vec![me]))
        .await
        .unwrap();

    let (first, second) = tokio::join!(ada.meetings.list_mine(), ada.meetings.list_mine());
    let expected: HashSet<_> = [a.id.clone(), b.id.clone()].into_iter().collect();
    for listed in [first.unwrap(), second.unwrap()] {
        assert_eq!(listed.len(), 2);
        let ids: HashSet<_> = listed.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
    }
}

#[tokio::test]
async fn update_patches_only_given_fields_and_delete_hides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let ada = signed_in(file_store(&path), "ada").await;

    let created = ada.meetings.create(meeting("Review", vec![])).await.unwrap();
    let updated = ada
        .meetings
        .update(
            &created.id,
            MeetingPatch {
                description: Some("moved online".to_string()),
                ..MeetingPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Review");
    assert_eq!(updated.description, "moved online");

    ada.meetings.delete(&created.id).await.unwrap();
    assert!(ada.meetings.list_mine().await.unwrap().is_empty());
}

#[tokio::test]
async fn attendees_cannot_edit_a_meeting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.sqlite3");
    let ada = signed_in(file_store(&path), "ada").await;
    let grace = signed_in(file_store(&path), "grace").await;

    let created = ada
        .meetings
        .create(meeting("Review", vec![account_id(&grace).await]))
        .await
        .unwrap();
    let err = grace
        .meetings
        .update(
            &created.id,
            MeetingPatch {
                title: Some("Cancelled".to_string()),
                ..MeetingPatch::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err, RepoError::NotCreator { id: created.id.clone() });
    assert_eq!(grace.meetings.list_mine().await.unwrap()[0].title, "Review");
}
