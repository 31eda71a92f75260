//! Per-screen collection state.
//!
//! # Responsibility
//! - Run fetches according to the phase table and keep the last good
//!   collection for display.
//! - Apply optimistic edits and removals before the remote call resolves.
//!
//! # Invariants
//! - At most one fetch per screen is in flight.
//! - A successful fetch replaces the collection wholesale and clears
//!   `unconfirmed` and `notice`.
//! - Results arriving after `unmount` change nothing.
//! - A failed mutation is never rolled back; the item is marked unconfirmed
//!   until the next successful fetch.
//! - The state lock is never held across an await.

use super::error::ScreenError;
use super::phase::{next_phase, Phase, Trigger};
use super::reminder::{NotificationScheduler, Reminder, ScreenItem};
use crate::repo::{RepoError, RepoResult};
use crate::store::StoreError;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Local change applied before the remote write.
pub enum LocalMutation<T> {
    Edit(Box<dyn FnOnce(&mut T) + Send>),
    Remove,
}

impl<T> LocalMutation<T> {
    pub fn edit(apply: impl FnOnce(&mut T) + Send + 'static) -> Self {
        Self::Edit(Box::new(apply))
    }

    fn is_remove(&self) -> bool {
        matches!(self, Self::Remove)
    }
}

/// Result of `ScreenSync::load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Trigger not accepted in the current phase; no fetch was started.
    Ignored,
    /// Screen unmounted while fetching; result dropped.
    Discarded,
    Ready { count: usize },
    Failed(ScreenError),
}

/// Result of `ScreenSync::mutate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed,
    /// Remote write failed; local change kept and flagged.
    Unconfirmed(ScreenError),
    /// Screen unmounted before the remote call resolved.
    Discarded,
}

/// Point-in-time copy of a screen's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSnapshot<T> {
    pub phase: Phase,
    pub items: Vec<T>,
    /// Last fetch failure; cleared by the next successful fetch.
    pub error: Option<ScreenError>,
    /// Last failed mutation.
    pub notice: Option<ScreenError>,
    /// Items whose last local change the remote has not accepted.
    pub unconfirmed: BTreeMap<String, ScreenError>,
}

struct ScreenState<T> {
    phase: Phase,
    items: Vec<T>,
    error: Option<ScreenError>,
    notice: Option<ScreenError>,
    unconfirmed: BTreeMap<String, ScreenError>,
    reminded: HashSet<String>,
    mounted: bool,
    /// Bumped on unmount; in-flight work compares against it.
    epoch: u64,
}

impl<T> ScreenState<T> {
    fn fresh(epoch: u64) -> Self {
        Self {
            phase: Phase::Idle,
            items: Vec::new(),
            error: None,
            notice: None,
            unconfirmed: BTreeMap::new(),
            reminded: HashSet::new(),
            mounted: false,
            epoch,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.mounted && self.epoch == epoch
    }
}

/// Synchronized collection behind one screen. Clones share state.
pub struct ScreenSync<T> {
    screen: &'static str,
    state: Arc<Mutex<ScreenState<T>>>,
    scheduler: Option<Arc<dyn NotificationScheduler>>,
}

impl<T> Clone for ScreenSync<T> {
    fn clone(&self) -> Self {
        Self {
            screen: self.screen,
            state: Arc::clone(&self.state),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: ScreenItem> ScreenSync<T> {
    pub fn new(screen: &'static str) -> Self {
        Self {
            screen,
            state: Arc::new(Mutex::new(ScreenState::fresh(0))),
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn NotificationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn snapshot(&self) -> ScreenSnapshot<T> {
        let state = self.lock();
        ScreenSnapshot {
            phase: state.phase,
            items: state.items.clone(),
            error: state.error.clone(),
            notice: state.notice.clone(),
            unconfirmed: state.unconfirmed.clone(),
        }
    }

    /// Runs `fetch` when `trigger` is accepted in the current phase.
    ///
    /// `fetch` is not called for ignored triggers.
    pub async fn load<F, Fut>(&self, trigger: Trigger, fetch: F) -> LoadOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RepoResult<Vec<T>>>,
    {
        let epoch = {
            let mut state = self.lock();
            let Some(next) = next_phase(state.phase, trigger) else {
                debug!(
                    "event=screen_trigger module=sync screen={} status=ignored phase={} trigger={}",
                    self.screen,
                    state.phase.as_str(),
                    trigger.as_str()
                );
                return LoadOutcome::Ignored;
            };
            if trigger == Trigger::Mount {
                state.mounted = true;
            }
            state.phase = next;
            state.epoch
        };

        let result = fetch().await;

        let (outcome, reminders) = {
            let mut state = self.lock();
            if !state.is_current(epoch) {
                debug!(
                    "event=screen_fetch module=sync screen={} status=discarded",
                    self.screen
                );
                return LoadOutcome::Discarded;
            }
            match result {
                Ok(items) => {
                    let reminders = due_reminders(&mut state.reminded, &items);
                    let count = items.len();
                    state.items = items;
                    state.phase = Phase::Ready;
                    state.error = None;
                    state.notice = None;
                    state.unconfirmed.clear();
                    (LoadOutcome::Ready { count }, reminders)
                }
                Err(err) => {
                    let screen_err = ScreenError::from(&err);
                    state.phase = Phase::Error;
                    state.error = Some(screen_err.clone());
                    (LoadOutcome::Failed(screen_err), Vec::new())
                }
            }
        };

        match &outcome {
            LoadOutcome::Ready { count } => info!(
                "event=screen_fetch module=sync screen={} status=ok trigger={} count={count}",
                self.screen,
                trigger.as_str()
            ),
            LoadOutcome::Failed(err) => warn!(
                "event=screen_fetch module=sync screen={} status=error trigger={} error_kind={}",
                self.screen,
                trigger.as_str(),
                err.kind.as_str()
            ),
            LoadOutcome::Ignored | LoadOutcome::Discarded => {}
        }
        self.schedule(&reminders);
        outcome
    }

    /// Applies `local` to item `id` now, then awaits `remote`.
    pub async fn mutate<F, Fut, R>(
        &self,
        id: &str,
        local: LocalMutation<T>,
        remote: F,
    ) -> MutationOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RepoResult<R>>,
    {
        let is_remove = local.is_remove();
        let epoch = {
            let mut state = self.lock();
            match local {
                LocalMutation::Edit(apply) => {
                    if let Some(item) = state.items.iter_mut().find(|item| item.item_id() == id) {
                        apply(item);
                    }
                }
                LocalMutation::Remove => state.items.retain(|item| item.item_id() != id),
            }
            state.epoch
        };

        let result = match remote().await {
            Ok(_) => Ok(()),
            Err(RepoError::Store(StoreError::RemoteValidation { .. })) if is_remove => {
                debug!(
                    "event=screen_mutate module=sync screen={} status=ok note=already_removed",
                    self.screen
                );
                Ok(())
            }
            Err(err) => Err(ScreenError::from(&err)),
        };

        let mut state = self.lock();
        if !state.is_current(epoch) {
            return MutationOutcome::Discarded;
        }
        match result {
            Ok(()) => {
                state.unconfirmed.remove(id);
                MutationOutcome::Confirmed
            }
            Err(screen_err) => {
                warn!(
                    "event=screen_mutate module=sync screen={} status=error error_kind={}",
                    self.screen,
                    screen_err.kind.as_str()
                );
                state.unconfirmed.insert(id.to_string(), screen_err.clone());
                state.notice = Some(screen_err.clone());
                MutationOutcome::Unconfirmed(screen_err)
            }
        }
    }

    /// Ends the screen lifetime. In-flight results are dropped.
    pub fn unmount(&self) {
        let mut state = self.lock();
        let epoch = state.epoch.wrapping_add(1);
        *state = ScreenState::fresh(epoch);
        debug!("event=screen_unmount module=sync screen={} status=ok", self.screen);
    }

    fn lock(&self) -> MutexGuard<'_, ScreenState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(&self, reminders: &[Reminder]) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        for reminder in reminders {
            if let Err(err) = scheduler.schedule(reminder) {
                warn!(
                    "event=reminder_schedule module=sync screen={} status=error error={err}",
                    self.screen
                );
            }
        }
    }
}

fn due_reminders<T: ScreenItem>(reminded: &mut HashSet<String>, items: &[T]) -> Vec<Reminder> {
    let now = Utc::now();
    items
        .iter()
        .filter_map(|item| item.reminder(now))
        .filter(|reminder| reminded.insert(reminder.item_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{LoadOutcome, LocalMutation, MutationOutcome, ScreenSync};
    use crate::repo::{RepoError, RepoResult};
    use crate::store::StoreError;
    use crate::sync::error::ErrorKind;
    use crate::sync::phase::{Phase, Trigger};
    use crate::sync::reminder::ScreenItem;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        done: bool,
    }

    impl ScreenItem for Item {
        fn item_id(&self) -> &str {
            &self.id
        }

        fn reminder_title(&self) -> &str {
            "item"
        }
    }

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| Item {
                id: id.to_string(),
                done: false,
            })
            .collect()
    }

    async fn ok(ids: &[&str]) -> RepoResult<Vec<Item>> {
        Ok(items(ids))
    }

    async fn network_err<T>() -> RepoResult<T> {
        Err(RepoError::Store(StoreError::Network("offline".into())))
    }

    #[tokio::test]
    async fn mount_loads_and_ready_replaces_wholesale() {
        let screen = ScreenSync::<Item>::new("tasks");
        assert_eq!(
            screen.load(Trigger::Mount, || ok(&["a", "b"])).await,
            LoadOutcome::Ready { count: 2 }
        );
        assert_eq!(
            screen.load(Trigger::PullToRefresh, || ok(&["c"])).await,
            LoadOutcome::Ready { count: 1 }
        );
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.items, items(&["c"]));
    }

    #[tokio::test]
    async fn ignored_trigger_never_calls_fetch() {
        let screen = ScreenSync::<Item>::new("tasks");
        let mut called = false;
        let outcome = screen
            .load(Trigger::Retry, || {
                called = true;
                ok(&[])
            })
            .await;
        assert_eq!(outcome, LoadOutcome::Ignored);
        assert!(!called);
        assert_eq!(screen.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_items() {
        let screen = ScreenSync::<Item>::new("tasks");
        screen.load(Trigger::Mount, || ok(&["a"])).await;
        let outcome = screen
            .load(Trigger::FocusRegained, network_err::<Vec<Item>>)
            .await;
        assert!(matches!(outcome, LoadOutcome::Failed(err) if err.kind == ErrorKind::Retryable));

        let snapshot = screen.snapshot();
        assert_eq!(snapshot.phase, Phase::Error);
        assert_eq!(snapshot.items, items(&["a"]));

        screen.load(Trigger::Retry, || ok(&["a", "b"])).await;
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn failed_edit_is_kept_and_flagged_until_refetch() {
        let screen = ScreenSync::<Item>::new("tasks");
        screen.load(Trigger::Mount, || ok(&["a"])).await;

        let outcome = screen
            .mutate("a", LocalMutation::edit(|item: &mut Item| item.done = true), network_err::<()>)
            .await;
        assert!(matches!(outcome, MutationOutcome::Unconfirmed(_)));

        let snapshot = screen.snapshot();
        assert!(snapshot.items[0].done);
        assert!(snapshot.unconfirmed.contains_key("a"));
        assert!(snapshot.notice.is_some());

        screen.load(Trigger::PullToRefresh, || ok(&["a"])).await;
        let snapshot = screen.snapshot();
        assert!(!snapshot.items[0].done);
        assert!(snapshot.unconfirmed.is_empty());
        assert!(snapshot.notice.is_none());
    }

    #[tokio::test]
    async fn remove_of_missing_document_counts_as_done() {
        let screen = ScreenSync::<Item>::new("tasks");
        screen.load(Trigger::Mount, || ok(&["a", "b"])).await;
        let outcome = screen
            .mutate("a", LocalMutation::Remove, || async {
                Err::<(), _>(RepoError::Store(StoreError::not_found(
                    crate::store::Collection::Tasks,
                    "a",
                )))
            })
            .await;
        assert_eq!(outcome, MutationOutcome::Confirmed);
        assert_eq!(screen.snapshot().items, items(&["b"]));
    }

    #[tokio::test]
    async fn unmounted_screen_discards_late_results() {
        let screen = ScreenSync::<Item>::new("tasks");
        let handle = screen.clone();
        let outcome = screen
            .load(Trigger::Mount, || async move {
                handle.unmount();
                ok(&["a"]).await
            })
            .await;
        assert_eq!(outcome, LoadOutcome::Discarded);
        let snapshot = screen.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(snapshot.items.is_empty());
    }
}
