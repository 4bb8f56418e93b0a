//! Credit-gated submission state machine.
//!
//! Each device gets a fixed number of free generations. A submission with
//! credits left goes to the relay; one without is redirected to the
//! subscription page. A credit is spent only when an image comes back.
//!
//! State lives behind a mutex that is never held across an await, so the
//! controller can be shared between an input loop and a renderer.

use crate::config::StudioSettings;
use crate::error::{ClientError, DownloadError, StoreError};
use crate::models::{ControllerSnapshot, GenerationResult, Phase, SubmitOutcome};
use crate::services::{CreditStore, ImageDownloader, Navigator, RelayClient};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub initial_credits: i64,
    pub subscription_url: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            initial_credits: 3,
            subscription_url: "/subscription".to_string(),
        }
    }
}

impl From<&StudioSettings> for ControllerOptions {
    fn from(settings: &StudioSettings) -> Self {
        Self {
            initial_credits: settings.credits.initial,
            subscription_url: settings.subscription_url.clone(),
        }
    }
}

struct ControllerState {
    prompt: String,
    image_url: Option<String>,
    credits: i64,
    /// Set while a generation is in flight.
    in_flight: Option<InFlight>,
    next_submission: u64,
}

struct InFlight {
    id: u64,
    cancel: CancellationToken,
}

pub struct SubmissionController {
    store: Arc<dyn CreditStore>,
    relay: Arc<dyn RelayClient>,
    navigator: Arc<dyn Navigator>,
    subscription_url: String,
    state: Mutex<ControllerState>,
}

/// Clears the in-flight marker when a submission ends, including when its
/// future is dropped mid-await.
struct InFlightGuard<'a> {
    controller: &'a SubmissionController,
    id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.in_flight.as_ref().is_some_and(|f| f.id == self.id) {
            state.in_flight = None;
        }
    }
}

impl SubmissionController {
    /// Load the device's credits, granting `initial_credits` to a device
    /// with nothing stored.
    pub fn new(
        store: Arc<dyn CreditStore>,
        relay: Arc<dyn RelayClient>,
        navigator: Arc<dyn Navigator>,
        options: ControllerOptions,
    ) -> Result<Self, StoreError> {
        let credits = load_credits(store.as_ref(), options.initial_credits)?;

        Ok(Self {
            store,
            relay,
            navigator,
            subscription_url: options.subscription_url,
            state: Mutex::new(ControllerState {
                prompt: String::new(),
                image_url: None,
                credits,
                in_flight: None,
                next_submission: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.lock();
        ControllerSnapshot {
            prompt: state.prompt.clone(),
            image_url: state.image_url.clone(),
            phase: if state.in_flight.is_some() {
                Phase::Generating
            } else {
                Phase::Idle
            },
            credits: state.credits,
        }
    }

    pub fn credits(&self) -> i64 {
        self.lock().credits
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.snapshot().can_submit()
    }

    /// Replace the prompt text. Refused while generating.
    pub fn set_prompt(&self, prompt: impl Into<String>) -> bool {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            return false;
        }
        state.prompt = prompt.into();
        true
    }

    /// Submit the current prompt.
    pub async fn submit(&self) -> SubmitOutcome {
        self.submit_with_cancel(CancellationToken::new()).await
    }

    /// Submit the current prompt; cancelling `cancel` abandons the round trip
    /// the same way [`abandon`](Self::abandon) does.
    pub async fn submit_with_cancel(&self, cancel: CancellationToken) -> SubmitOutcome {
        let (prompt, token, id) = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                return SubmitOutcome::Busy;
            }
            if state.prompt.trim().is_empty() {
                return SubmitOutcome::IgnoredBlankPrompt;
            }
            if state.credits <= 0 {
                drop(state);
                tracing::info!(destination = %self.subscription_url, "Out of free credits");
                self.navigator.navigate(&self.subscription_url);
                return SubmitOutcome::Redirected {
                    destination: self.subscription_url.clone(),
                };
            }

            let token = cancel.child_token();
            let id = state.next_submission;
            state.next_submission += 1;
            state.in_flight = Some(InFlight {
                id,
                cancel: token.clone(),
            });
            (state.prompt.clone(), token, id)
        };
        let _guard = InFlightGuard {
            controller: self,
            id,
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled),
            result = self.relay.generate(&prompt) => result,
        };

        match result {
            Ok(generated) => match self.complete(&generated) {
                Ok(()) => SubmitOutcome::Generated(generated),
                Err(error) => SubmitOutcome::GeneratedUnsaved {
                    result: generated,
                    error,
                },
            },
            Err(err) => {
                tracing::warn!(error = %err, "Generation failed, credits unchanged");
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Show the image and spend exactly one credit. The in-memory count is
    /// spent even when persisting it fails.
    fn complete(&self, generated: &GenerationResult) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.in_flight = None;
        state.image_url = Some(generated.image_url.clone());
        state.credits = (state.credits - 1).max(0);
        tracing::info!(credits = state.credits, "Image generated");

        self.store.write(state.credits).map_err(|e| {
            tracing::error!(error = %e, credits = state.credits, "Failed to persist credits");
            e
        })
    }

    /// Abandon the in-flight generation, if any. No credit is spent.
    pub fn abandon(&self) -> bool {
        match self.lock().in_flight.as_ref() {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the displayed image. Refused while generating.
    pub fn clear_image(&self) -> bool {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            return false;
        }
        state.image_url.take().is_some()
    }

    /// Save the displayed image to `dest` (a file, or a directory to hold
    /// the default file name).
    pub async fn download(
        &self,
        downloader: &ImageDownloader,
        dest: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let image_url = {
            let state = self.lock();
            match (&state.image_url, &state.in_flight) {
                (Some(url), None) => url.clone(),
                _ => return Err(DownloadError::NoImage),
            }
        };

        downloader.download(&image_url, dest).await
    }
}

fn load_credits(store: &dyn CreditStore, initial: i64) -> Result<i64, StoreError> {
    match store.read() {
        Ok(Some(credits)) if credits < 0 => {
            tracing::warn!(credits, "Stored credits are negative, treating as zero");
            Ok(0)
        }
        Ok(Some(credits)) => Ok(credits),
        Ok(None) => {
            store.write(initial)?;
            Ok(initial)
        }
        Err(StoreError::Corrupt(reason)) => {
            tracing::warn!(%reason, initial, "Resetting unreadable credit value");
            store.write(initial)?;
            Ok(initial)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LogNavigator, MemoryCreditStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    enum Reply {
        Image,
        Fail,
        ImageThenFail,
        Hang,
    }

    struct FakeRelay {
        reply: Reply,
        calls: AtomicUsize,
        started: Notify,
        release: Option<Arc<Notify>>,
    }

    impl FakeRelay {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                started: Notify::new(),
                release: None,
            }
        }

        fn gated(release: Arc<Notify>) -> Self {
            Self {
                release: Some(release),
                ..Self::new(Reply::Image)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelayClient for FakeRelay {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.started.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match self.reply {
                Reply::Image => Ok(GenerationResult {
                    image_url: format!("https://img.test/{}/{}.png", n, prompt.len()),
                }),
                Reply::ImageThenFail if n == 1 => Ok(GenerationResult {
                    image_url: "https://img.test/first.png".to_string(),
                }),
                Reply::Fail | Reply::ImageThenFail => Err(ClientError::Relay {
                    status: 503,
                    code: "provider_unavailable".into(),
                    message: "down".into(),
                }),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    /// Memory store whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryCreditStore,
        fail_writes: AtomicBool,
    }

    impl CreditStore for FlakyStore {
        fn read(&self) -> Result<Option<i64>, StoreError> {
            self.inner.read()
        }

        fn write(&self, credits: i64) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.write(credits)
        }
    }

    struct Harness {
        controller: Arc<SubmissionController>,
        store: Arc<MemoryCreditStore>,
        relay: Arc<FakeRelay>,
        navigator: Arc<LogNavigator>,
    }

    fn harness(store: MemoryCreditStore, relay: FakeRelay) -> Harness {
        let store = Arc::new(store);
        let relay = Arc::new(relay);
        let navigator = Arc::new(LogNavigator::new());
        let controller = SubmissionController::new(
            store.clone(),
            relay.clone(),
            navigator.clone(),
            ControllerOptions::default(),
        )
        .unwrap();
        Harness {
            controller: Arc::new(controller),
            store,
            relay,
            navigator,
        }
    }

    #[test]
    fn fresh_device_gets_three_credits_persisted() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        assert_eq!(h.controller.credits(), 3);
        assert_eq!(h.store.read().unwrap(), Some(3));
    }

    #[test]
    fn loading_is_idempotent() {
        let store = Arc::new(MemoryCreditStore::with_credits(2));
        let relay: Arc<dyn RelayClient> = Arc::new(FakeRelay::new(Reply::Image));
        let navigator: Arc<dyn Navigator> = Arc::new(LogNavigator::new());

        for _ in 0..2 {
            let controller = SubmissionController::new(
                store.clone(),
                relay.clone(),
                navigator.clone(),
                ControllerOptions::default(),
            )
            .unwrap();
            assert_eq!(controller.credits(), 2);
        }
        assert_eq!(store.read().unwrap(), Some(2));
    }

    #[test]
    fn negative_stored_credits_read_as_zero() {
        let h = harness(MemoryCreditStore::with_credits(-4), FakeRelay::new(Reply::Image));
        assert_eq!(h.controller.credits(), 0);
    }

    #[test]
    fn unreadable_stored_credits_are_reset() {
        let h = harness(MemoryCreditStore::with_raw("NaN"), FakeRelay::new(Reply::Image));
        assert_eq!(h.controller.credits(), 3);
        assert_eq!(h.store.read().unwrap(), Some(3));
    }

    #[test]
    fn fractional_stored_credits_keep_the_integer_part() {
        let h = harness(MemoryCreditStore::with_raw("1.9"), FakeRelay::new(Reply::Image));
        assert_eq!(h.controller.credits(), 1);
    }

    #[tokio::test]
    async fn unsaved_credit_is_reported_and_still_spent() {
        let store = Arc::new(FlakyStore::default());
        let controller = SubmissionController::new(
            store.clone(),
            Arc::new(FakeRelay::new(Reply::Image)),
            Arc::new(LogNavigator::new()),
            ControllerOptions::default(),
        )
        .unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);
        controller.set_prompt("a fox");

        let outcome = controller.submit().await;

        match outcome {
            SubmitOutcome::GeneratedUnsaved { ref result, ref error } => {
                assert_eq!(outcome.image_url(), Some(result.image_url.as_str()));
                assert!(matches!(error, StoreError::Io(_)));
            }
            other => panic!("expected an unsaved generation, got {:?}", other),
        }
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.credits, 2);
        assert!(snapshot.image_url.is_some());
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(store.read().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn success_spends_exactly_one_credit() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        h.controller.set_prompt("a red fox in snow");

        let outcome = h.controller.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Generated(_)));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.credits, 2);
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.prompt, "a red fox in snow");
        assert_eq!(snapshot.image_url.as_deref(), outcome.image_url());
        assert_eq!(h.store.read().unwrap(), Some(2));
    }

    #[tokio::test]
    async fn out_of_credits_redirects_without_calling_relay() {
        let h = harness(MemoryCreditStore::with_credits(0), FakeRelay::new(Reply::Image));
        h.controller.set_prompt("anything");

        let outcome = h.controller.submit().await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Redirected { ref destination } if destination == "/subscription"
        ));
        assert_eq!(h.relay.calls(), 0);
        assert_eq!(h.navigator.visited(), vec!["/subscription".to_string()]);
        assert_eq!(h.store.read().unwrap(), Some(0));
    }

    #[tokio::test]
    async fn blank_prompt_is_ignored() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        h.controller.set_prompt("   \t");

        assert!(matches!(
            h.controller.submit().await,
            SubmitOutcome::IgnoredBlankPrompt
        ));
        assert_eq!(h.relay.calls(), 0);
        assert_eq!(h.controller.credits(), 3);
    }

    #[tokio::test]
    async fn failure_leaves_credits_and_image_alone() {
        let h = harness(MemoryCreditStore::with_credits(1), FakeRelay::new(Reply::Fail));
        h.controller.set_prompt("a fox");

        let outcome = h.controller.submit().await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(ClientError::Relay { status: 503, .. })
        ));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.credits, 1);
        assert_eq!(snapshot.image_url, None);
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(h.store.read().unwrap(), Some(1));
    }

    #[tokio::test]
    async fn failure_after_success_keeps_previous_image() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::ImageThenFail));
        h.controller.set_prompt("a fox");

        assert!(matches!(
            h.controller.submit().await,
            SubmitOutcome::Generated(_)
        ));
        let outcome = h.controller.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        let snapshot = h.controller.snapshot();
        assert_eq!(
            snapshot.image_url.as_deref(),
            Some("https://img.test/first.png")
        );
        assert_eq!(snapshot.credits, 2);
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(h.store.read().unwrap(), Some(2));
        assert_eq!(h.relay.calls(), 2);
    }

    #[tokio::test]
    async fn four_submissions_use_three_credits_then_redirect() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        h.controller.set_prompt("a fox");

        for expected in [2, 1, 0] {
            assert!(matches!(
                h.controller.submit().await,
                SubmitOutcome::Generated(_)
            ));
            assert_eq!(h.controller.credits(), expected);
        }
        assert!(matches!(
            h.controller.submit().await,
            SubmitOutcome::Redirected { .. }
        ));
        assert_eq!(h.relay.calls(), 3);
    }

    #[tokio::test]
    async fn second_submit_while_generating_is_busy() {
        let release = Arc::new(Notify::new());
        let h = harness(MemoryCreditStore::new(), FakeRelay::gated(release.clone()));
        h.controller.set_prompt("a fox");

        let controller = h.controller.clone();
        let first = tokio::spawn(async move { controller.submit().await });
        h.relay.started.notified().await;

        assert!(h.controller.is_loading());
        assert!(!h.controller.can_submit());
        assert!(!h.controller.set_prompt("something else"));
        assert!(!h.controller.clear_image());
        assert!(matches!(h.controller.submit().await, SubmitOutcome::Busy));

        release.notify_one();
        assert!(matches!(first.await.unwrap(), SubmitOutcome::Generated(_)));
        assert_eq!(h.relay.calls(), 1);
        assert_eq!(h.controller.credits(), 2);
    }

    #[tokio::test]
    async fn abandon_returns_to_idle_without_spending() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Hang));
        h.controller.set_prompt("a fox");

        let controller = h.controller.clone();
        let pending = tokio::spawn(async move { controller.submit().await });
        h.relay.started.notified().await;

        assert!(h.controller.abandon());
        let outcome = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(ClientError::Cancelled)
        ));
        assert!(!h.controller.is_loading());
        assert_eq!(h.controller.credits(), 3);
        assert!(!h.controller.abandon());
    }

    #[tokio::test]
    async fn caller_token_cancels_submission() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Hang));
        h.controller.set_prompt("a fox");
        let cancel = CancellationToken::new();

        let controller = h.controller.clone();
        let token = cancel.clone();
        let pending = tokio::spawn(async move { controller.submit_with_cancel(token).await });
        h.relay.started.notified().await;
        cancel.cancel();

        assert!(matches!(
            pending.await.unwrap(),
            SubmitOutcome::Failed(ClientError::Cancelled)
        ));
        assert_eq!(h.controller.credits(), 3);
    }

    #[tokio::test]
    async fn dropped_submission_clears_generating_state() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Hang));
        h.controller.set_prompt("a fox");

        let result =
            tokio::time::timeout(Duration::from_millis(20), h.controller.submit()).await;

        assert!(result.is_err());
        assert!(!h.controller.is_loading());
        assert_eq!(h.controller.credits(), 3);
    }

    #[tokio::test]
    async fn delete_clears_only_the_image() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        h.controller.set_prompt("a fox");
        h.controller.submit().await;

        assert!(h.controller.clear_image());
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.image_url, None);
        assert_eq!(snapshot.credits, 2);
        assert_eq!(snapshot.prompt, "a fox");
        assert!(!h.controller.clear_image());
    }

    #[tokio::test]
    async fn download_without_image_fails() {
        let h = harness(MemoryCreditStore::new(), FakeRelay::new(Reply::Image));
        let downloader = ImageDownloader::new("ai-image.jpg").unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = h
            .controller
            .download(&downloader, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoImage));
    }
}
