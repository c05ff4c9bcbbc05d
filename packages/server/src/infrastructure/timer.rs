//! Per-lobby question countdowns.
//!
//! At most one countdown runs per lobby, tagged with the question index it was
//! scheduled for. The expiring task removes its own entry before running the
//! expiry action, so cancelling from inside that action never aborts it.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::AbortHandle};

use crate::domain::LobbyKey;

struct ScheduledCountdown {
    question_index: usize,
    abort: AbortHandle,
}

/// Cancellable countdowns keyed by `(lobby, question index)`
#[derive(Clone, Default)]
pub struct QuestionTimers {
    countdowns: Arc<Mutex<HashMap<LobbyKey, ScheduledCountdown>>>,
}

impl QuestionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_expire` after `duration`, replacing the lobby's current countdown
    pub async fn schedule<F>(
        &self,
        lobby_key: LobbyKey,
        question_index: usize,
        duration: Duration,
        on_expire: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut countdowns = self.countdowns.lock().await;
        let timers = self.clone();
        let task_key = lobby_key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if timers.take(&task_key, question_index).await {
                on_expire.await;
            }
        });
        let previous = countdowns.insert(
            lobby_key.clone(),
            ScheduledCountdown {
                question_index,
                abort: handle.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.abort.abort();
        }
        tracing::debug!(
            "Scheduled countdown for question {} in lobby '{}' ({:?})",
            question_index,
            lobby_key,
            duration
        );
    }

    /// Cancel the countdown of `question_index`, if it is still pending
    pub async fn cancel(&self, lobby_key: &LobbyKey, question_index: usize) -> bool {
        let mut countdowns = self.countdowns.lock().await;
        match countdowns.get(lobby_key) {
            Some(countdown) if countdown.question_index == question_index => {
                if let Some(countdown) = countdowns.remove(lobby_key) {
                    countdown.abort.abort();
                }
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever countdown the lobby has
    pub async fn cancel_all(&self, lobby_key: &LobbyKey) {
        let mut countdowns = self.countdowns.lock().await;
        if let Some(countdown) = countdowns.remove(lobby_key) {
            countdown.abort.abort();
        }
    }

    pub async fn is_scheduled(&self, lobby_key: &LobbyKey, question_index: usize) -> bool {
        let countdowns = self.countdowns.lock().await;
        countdowns
            .get(lobby_key)
            .is_some_and(|c| c.question_index == question_index)
    }

    /// Remove the entry without aborting; `false` if it was replaced or cancelled
    async fn take(&self, lobby_key: &LobbyKey, question_index: usize) -> bool {
        let mut countdowns = self.countdowns.lock().await;
        match countdowns.get(lobby_key) {
            Some(countdown) if countdown.question_index == question_index => {
                countdowns.remove(lobby_key);
                true
            }
            _ => false,
        }
    }
}
