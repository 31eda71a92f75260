//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose auth, task and meeting screen flows to Dart via FRB.
//! - Expose module study material (notes, summaries, quizzes), the profile
//!   and username search as one-shot calls.
//! - Flatten core types into plain envelopes the UI can render directly.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Screen functions always return the full current screen view.
//! - Store selection happens once per process in `configure`.

use log::info;
use std::sync::{Arc, OnceLock};
use textext_core::config::ENV_DB_PATH;
use textext_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    FileHandle, HttpStore, LocalMutation, Meeting, NewMeeting, NewTask, Note, Quiz, RemoteStore,
    RepoError, Repositories, ScreenError, ScreenItem, ScreenSnapshot, ScreenSync, SqliteStore,
    StoreConfig, Summary, Task, Trigger, User,
};

static APP: OnceLock<App> = OnceLock::new();

struct App {
    repos: Repositories,
    tasks: ScreenSync<Task>,
    meetings: ScreenSync<Meeting>,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
/// Repeating the same `level + log_dir` is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Selects the backing store from the environment.
///
/// `TEXTEXT_DB_PATH` selects the local SQLite store; otherwise the hosted
/// backend is configured from `TEXTEXT_*` variables. Returns an empty string
/// on success. Later calls keep the first configuration.
#[flutter_rust_bridge::frb(sync)]
pub fn configure() -> String {
    if APP.get().is_some() {
        return String::new();
    }
    match build_store() {
        Ok(store) => {
            let _ = APP.set(App {
                repos: Repositories::new(store),
                tasks: ScreenSync::new("tasks"),
                meetings: ScreenSync::new("meetings"),
            });
            info!("event=ffi_configure module=ffi status=ok");
            String::new()
        }
        Err(message) => message,
    }
}

fn build_store() -> Result<Arc<dyn RemoteStore>, String> {
    if let Some(path) = std::env::var(ENV_DB_PATH)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
    {
        let store = SqliteStore::open(path.trim())
            .map_err(|err| format!("local store open failed: {err}"))?;
        return Ok(Arc::new(store));
    }
    let config = StoreConfig::from_env().map_err(|err| format!("configuration invalid: {err}"))?;
    let store = HttpStore::new(config).map_err(|err| err.to_string())?;
    Ok(Arc::new(store))
}

fn app() -> Result<&'static App, ActionResponse> {
    APP.get()
        .ok_or_else(|| ActionResponse::failure("not_configured", "call configure() first"))
}

/// Screen trigger as sent by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTrigger {
    Mount,
    PullToRefresh,
    FocusRegained,
    Retry,
}

impl From<ScreenTrigger> for Trigger {
    fn from(value: ScreenTrigger) -> Self {
        match value {
            ScreenTrigger::Mount => Self::Mount,
            ScreenTrigger::PullToRefresh => Self::PullToRefresh,
            ScreenTrigger::FocusRegained => Self::FocusRegained,
            ScreenTrigger::Retry => Self::Retry,
        }
    }
}

/// Result envelope for one-shot actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created document id, when the action creates one.
    pub id: Option<String>,
    /// `redirect_to_login | retryable | inline | not_configured`, on failure.
    pub error_kind: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            error_kind: None,
            message: message.into(),
        }
    }

    fn failure(kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            error_kind: Some(kind.to_string()),
            message: message.into(),
        }
    }

    fn from_error(err: impl Into<ScreenError>) -> Self {
        let err = err.into();
        Self::failure(err.kind.as_str(), err.message)
    }
}

/// Task row as rendered by the tasks screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub description: String,
    /// 1 (low) to 3 (high).
    pub priority: i64,
    pub due_date: Option<String>,
    pub completed: bool,
    pub category: String,
    /// Last local change not yet accepted by the backend.
    pub unconfirmed: bool,
}

/// Meeting row as rendered by the meetings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub attendee_count: u32,
    pub unconfirmed: bool,
}

/// Phase and error state shared by every screen view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenStatus {
    /// `idle | loading | refreshing | ready | error`.
    pub phase: String,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    /// Last failed mutation message.
    pub notice: Option<String>,
}

impl ScreenStatus {
    fn unavailable(response: ActionResponse) -> Self {
        Self {
            phase: "error".to_string(),
            error_kind: response.error_kind,
            error_message: Some(response.message),
            notice: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScreenView {
    pub status: ScreenStatus,
    pub items: Vec<TaskItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingScreenView {
    pub status: ScreenStatus,
    pub items: Vec<MeetingItem>,
}

impl From<ActionResponse> for TaskScreenView {
    fn from(value: ActionResponse) -> Self {
        Self {
            status: ScreenStatus::unavailable(value),
            items: Vec::new(),
        }
    }
}

impl From<ActionResponse> for MeetingScreenView {
    fn from(value: ActionResponse) -> Self {
        Self {
            status: ScreenStatus::unavailable(value),
            items: Vec::new(),
        }
    }
}

fn split_snapshot<S, T>(
    snapshot: ScreenSnapshot<S>,
    to_item: impl Fn(S, bool) -> T,
) -> (ScreenStatus, Vec<T>)
where
    S: ScreenItem,
{
    let unconfirmed = snapshot.unconfirmed;
    let items = snapshot
        .items
        .into_iter()
        .map(|item| {
            let pending = unconfirmed.contains_key(item.item_id());
            to_item(item, pending)
        })
        .collect();
    let status = ScreenStatus {
        phase: snapshot.phase.as_str().to_string(),
        error_kind: snapshot.error.as_ref().map(|err| err.kind.as_str().to_string()),
        error_message: snapshot.error.map(|err| err.message),
        notice: snapshot.notice.map(|err| err.message),
    };
    (status, items)
}

fn task_view(screen: &ScreenSync<Task>) -> TaskScreenView {
    let (status, items) = split_snapshot(screen.snapshot(), task_item);
    TaskScreenView { status, items }
}

fn meeting_view(screen: &ScreenSync<Meeting>) -> MeetingScreenView {
    let (status, items) = split_snapshot(screen.snapshot(), meeting_item);
    MeetingScreenView { status, items }
}

fn task_item(task: Task, unconfirmed: bool) -> TaskItem {
    TaskItem {
        priority: i64::from(task.priority),
        completed: task.is_completed(),
        id: task.id,
        title: task.title,
        description: task.description,
        due_date: task.due_date,
        category: task.category,
        unconfirmed,
    }
}

fn meeting_item(meeting: Meeting, unconfirmed: bool) -> MeetingItem {
    MeetingItem {
        attendee_count: u32::try_from(meeting.attendees.len()).unwrap_or(u32::MAX),
        id: meeting.id,
        title: meeting.title,
        description: meeting.description,
        due_date: meeting.due_date,
        unconfirmed,
    }
}

pub async fn sign_in(email: String, password: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.repos.session.sign_in(&email, &password).await {
        Ok(Some(user)) => ActionResponse::success("Signed in.", Some(user.account_id.clone())),
        Ok(None) => ActionResponse::failure("inline", "No profile exists for this account."),
        Err(err) => ActionResponse::from_error(err),
    }
}

pub async fn register(email: String, password: String, username: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.repos.session.register(&email, &password, &username).await {
        Ok(user) => ActionResponse::success("Account created.", Some(user.account_id.clone())),
        Err(err) => ActionResponse::from_error(err),
    }
}

/// Signs out and resets every screen.
pub async fn sign_out() -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    app.tasks.unmount();
    app.meetings.unmount();
    match app.repos.session.sign_out().await {
        Ok(()) => ActionResponse::success("Signed out.", None),
        Err(err) => ActionResponse::from_error(err),
    }
}

pub async fn tasks_screen(trigger: ScreenTrigger) -> TaskScreenView {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response.into(),
    };
    let tasks = app.repos.tasks.clone();
    app.tasks
        .load(trigger.into(), || async move { tasks.list_mine().await })
        .await;
    task_view(&app.tasks)
}

/// Marks a task completed immediately, then confirms remotely.
pub async fn tasks_complete(id: String) -> TaskScreenView {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response.into(),
    };
    let tasks = app.repos.tasks.clone();
    let remote_id = id.clone();
    app.tasks
        .mutate(
            &id,
            LocalMutation::edit(|task: &mut Task| task.mark_completed()),
            || async move { tasks.complete(&remote_id).await },
        )
        .await;
    task_view(&app.tasks)
}

pub async fn tasks_delete(id: String) -> TaskScreenView {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response.into(),
    };
    let tasks = app.repos.tasks.clone();
    let remote_id = id.clone();
    app.tasks
        .mutate(&id, LocalMutation::Remove, || async move {
            tasks.delete(&remote_id).await
        })
        .await;
    task_view(&app.tasks)
}

pub async fn tasks_create(
    title: String,
    description: String,
    priority: i64,
    due_date: Option<String>,
    assignees: Vec<String>,
    category: String,
) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    let input = NewTask {
        title,
        description,
        priority,
        due_date,
        assignees,
        category,
    };
    match app.repos.tasks.create(input).await {
        Ok(task) => ActionResponse::success("Task created.", Some(task.id)),
        Err(err) => ActionResponse::from_error(err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn tasks_unmount() {
    if let Some(app) = APP.get() {
        app.tasks.unmount();
    }
}

pub async fn meetings_screen(trigger: ScreenTrigger) -> MeetingScreenView {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response.into(),
    };
    let meetings = app.repos.meetings.clone();
    app.meetings
        .load(trigger.into(), || async move { meetings.list_mine().await })
        .await;
    meeting_view(&app.meetings)
}

pub async fn meetings_delete(id: String) -> MeetingScreenView {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response.into(),
    };
    let meetings = app.repos.meetings.clone();
    let remote_id = id.clone();
    app.meetings
        .mutate(&id, LocalMutation::Remove, || async move {
            meetings.delete(&remote_id).await
        })
        .await;
    meeting_view(&app.meetings)
}

pub async fn meetings_create(
    title: String,
    description: String,
    due_date: Option<String>,
    attendees: Vec<String>,
) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    let input = NewMeeting {
        title,
        description,
        due_date,
        attendees,
    };
    match app.repos.meetings.create(input).await {
        Ok(meeting) => ActionResponse::success("Meeting scheduled.", Some(meeting.id)),
        Err(err) => ActionResponse::from_error(err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn meetings_unmount() {
    if let Some(app) = APP.get() {
        app.meetings.unmount();
    }
}

/// Module names of the signed-in user.
pub async fn modules_list() -> Result<Vec<String>, String> {
    let app = app().map_err(|response| response.message)?;
    app.repos
        .modules
        .list_mine()
        .await
        .map_err(user_message)
}

/// Adds a module; rejects blank and duplicate names.
pub async fn modules_add(name: String) -> Result<Vec<String>, String> {
    let app = app().map_err(|response| response.message)?;
    app.repos
        .modules
        .add(&name)
        .await
        .map_err(user_message)
}

/// Signed-in user's profile card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub username: String,
    pub email: String,
}

/// Username search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub account_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub size_bytes: u64,
    /// `uploaded | processing | processed | failed`.
    pub status: String,
    /// RFC 3339 upload time.
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub id: String,
    pub note_id: String,
    pub text: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestionItem {
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub id: String,
    pub note_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestionItem>,
    pub generated_at: String,
}

impl From<User> for UserItem {
    fn from(value: User) -> Self {
        Self {
            account_id: value.account_id,
            username: value.username,
        }
    }
}

impl From<Note> for NoteItem {
    fn from(value: Note) -> Self {
        Self {
            status: value.status.as_str().to_string(),
            uploaded_at: value.uploaded_at.to_rfc3339(),
            id: value.id,
            title: value.title,
            description: value.description,
            file_name: value.file_name,
            size_bytes: value.size_bytes,
        }
    }
}

impl From<Summary> for SummaryItem {
    fn from(value: Summary) -> Self {
        Self {
            generated_at: value.generated_at.to_rfc3339(),
            id: value.id,
            note_id: value.note_id,
            text: value.text,
        }
    }
}

impl From<Quiz> for QuizItem {
    fn from(value: Quiz) -> Self {
        Self {
            generated_at: value.generated_at.to_rfc3339(),
            id: value.id,
            note_id: value.note_id,
            title: value.title,
            questions: value
                .questions
                .into_iter()
                .map(|question| QuizQuestionItem {
                    answer_index: u32::try_from(question.answer_index).unwrap_or(u32::MAX),
                    prompt: question.prompt,
                    choices: question.choices,
                })
                .collect(),
        }
    }
}

fn user_message(err: RepoError) -> String {
    ScreenError::from(err).message
}

fn deleted(result: Result<(), RepoError>, message: &str) -> ActionResponse {
    match result {
        Ok(()) => ActionResponse::success(message, None),
        Err(err) => ActionResponse::from_error(err),
    }
}

pub async fn profile() -> Result<ProfileView, String> {
    let app = app().map_err(|response| response.message)?;
    let profile = app.repos.users.profile().await.map_err(user_message)?;
    Ok(ProfileView {
        username: profile.username,
        email: profile.email,
    })
}

/// Users whose username contains `query`, for assignee and attendee pickers.
pub async fn users_search(query: String) -> Result<Vec<UserItem>, String> {
    let app = app().map_err(|response| response.message)?;
    let users = app
        .repos
        .users
        .search_by_username(&query)
        .await
        .map_err(user_message)?;
    Ok(users.into_iter().map(UserItem::from).collect())
}

pub async fn notes_list(module_id: String) -> Result<Vec<NoteItem>, String> {
    let app = app().map_err(|response| response.message)?;
    let notes = app
        .repos
        .notes
        .list_by_module(&module_id)
        .await
        .map_err(user_message)?;
    Ok(notes.into_iter().map(NoteItem::from).collect())
}

/// Records a picked file as a note. Files over 10 MiB are rejected before
/// anything is sent.
pub async fn notes_upload(
    module_id: String,
    title: String,
    description: String,
    file_name: String,
    file_uri: String,
    size_bytes: u64,
) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    let file = FileHandle {
        name: file_name,
        uri: file_uri,
        size_bytes,
    };
    match app
        .repos
        .notes
        .upload(&module_id, &title, &description, &file)
        .await
    {
        Ok(note) => ActionResponse::success("Note uploaded.", Some(note.id)),
        Err(err) => ActionResponse::from_error(err),
    }
}

pub async fn notes_delete(id: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    deleted(app.repos.notes.delete(&id).await, "Note deleted.")
}

pub async fn summaries_list(module_id: String) -> Result<Vec<SummaryItem>, String> {
    let app = app().map_err(|response| response.message)?;
    let summaries = app
        .repos
        .summaries
        .list_by_module(&module_id)
        .await
        .map_err(user_message)?;
    Ok(summaries.into_iter().map(SummaryItem::from).collect())
}

pub async fn summaries_delete(id: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    deleted(app.repos.summaries.delete(&id).await, "Summary deleted.")
}

pub async fn quizzes_list(module_id: String) -> Result<Vec<QuizItem>, String> {
    let app = app().map_err(|response| response.message)?;
    let quizzes = app
        .repos
        .quizzes
        .list_by_module(&module_id)
        .await
        .map_err(user_message)?;
    Ok(quizzes.into_iter().map(QuizItem::from).collect())
}

pub async fn quizzes_delete(id: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    deleted(app.repos.quizzes.delete(&id).await, "Quiz deleted.")
}

#[cfg(test)]
mod tests {
    use super::{
        configure, core_version, init_logging, meetings_create, meetings_screen, modules_add,
        notes_delete, notes_list, notes_upload, ping, profile, quizzes_list, register,
        summaries_list, tasks_complete, tasks_create, tasks_screen, users_search, ScreenTrigger,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[tokio::test]
    async fn local_store_flow_covers_tasks_and_meetings() {
        let dir = std::env::temp_dir().join(format!("textext-ffi-{}", unique_suffix()));
        std::env::set_var(
            textext_core::config::ENV_DB_PATH,
            dir.join("store.sqlite3").to_str().unwrap(),
        );
        assert_eq!(configure(), "");

        let registered = register(
            format!("ffi-{}@example.com", unique_suffix()),
            "long enough password".to_string(),
            "ffi".to_string(),
        )
        .await;
        assert!(registered.ok, "{}", registered.message);

        let created = tasks_create(
            "Essay".to_string(),
            "Draft outline".to_string(),
            2,
            Some("2025-03-01".to_string()),
            vec![],
            "English".to_string(),
        )
        .await;
        assert!(created.ok, "{}", created.message);
        let task_id = created.id.unwrap();

        let screen = tasks_screen(ScreenTrigger::Mount).await;
        assert_eq!(screen.status.phase, "ready");
        assert!(screen.items.iter().any(|item| item.id == task_id));

        let screen = tasks_complete(task_id.clone()).await;
        let item = screen.items.iter().find(|item| item.id == task_id).unwrap();
        assert!(item.completed);
        assert!(!item.unconfirmed);

        let meeting = meetings_create("Review".to_string(), String::new(), None, vec![]).await;
        assert!(meeting.ok, "{}", meeting.message);
        let screen = meetings_screen(ScreenTrigger::Mount).await;
        assert_eq!(screen.items.len(), 1);

        let me = profile().await.unwrap();
        assert_eq!(me.username, "ffi");
        assert!(users_search("ff".to_string())
            .await
            .unwrap()
            .iter()
            .any(|user| user.username == "ffi"));

        modules_add("Biology".to_string()).await.unwrap();
        let too_large = notes_upload(
            "Biology".to_string(),
            "Cells".to_string(),
            String::new(),
            "cells.pdf".to_string(),
            "content://cells.pdf".to_string(),
            10 * 1024 * 1024 + 1,
        )
        .await;
        assert!(!too_large.ok);
        assert_eq!(too_large.error_kind.as_deref(), Some("inline"));

        let uploaded = notes_upload(
            "Biology".to_string(),
            String::new(),
            String::new(),
            "cells.pdf".to_string(),
            "content://cells.pdf".to_string(),
            2048,
        )
        .await;
        assert!(uploaded.ok, "{}", uploaded.message);
        let notes = notes_list("Biology".to_string()).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "cells.pdf");
        assert_eq!(notes[0].status, "uploaded");
        assert!(summaries_list("Biology".to_string()).await.unwrap().is_empty());
        assert!(quizzes_list("Biology".to_string()).await.unwrap().is_empty());

        assert!(notes_delete(uploaded.id.unwrap()).await.ok);
        assert!(notes_list("Biology".to_string()).await.unwrap().is_empty());
    }

    fn unique_suffix() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos()
    }
}
