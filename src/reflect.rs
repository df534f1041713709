//! Cooldown-gated reflection on idle sessions.
//!
//! When the host reports a session going idle, the extractor agent is
//! prompted to mine the transcript for learnings worth keeping in the
//! project's knowledge files. At most one extraction runs per cooldown
//! window, regardless of how many sessions go idle inside it.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::client::SessionPrompter;
use crate::event::{SESSION_IDLE, ServerEvent};

/// Minimum interval between extraction runs
pub const COOLDOWN_MS: i64 = 2 * 60 * 1000; // 2 minutes

/// Agent that receives the reflection prompt. Its definition lives at
/// ~/.config/opencode/agents/memory-extractor.md and is synced by
/// external tooling, not by this process.
pub const REFLECT_AGENT: &str = "memory-extractor";

/// Instruction sent to the extractor agent on every run
pub const REFLECT_PROMPT: &str = "Analyze this session for actionable learnings. \
    Extract corrections, conventions, patterns, and gotchas. \
    Score confidence per learning. \
    High confidence (>=0.8): auto-apply to the target knowledge file. \
    Medium confidence (0.5-0.79): append to pending-learnings.md. \
    Low confidence (<0.5): discard. \
    Be fast, concise, and conservative.";

/// Cooldown-gated handler for `session.idle` events.
///
/// Each instance owns its last-run timestamp; independent instances
/// track independent windows.
pub struct IdleReflectionTrigger {
    prompter: Arc<dyn SessionPrompter>,
    cooldown_ms: i64,
    last_run_ms: AtomicI64,
}

impl IdleReflectionTrigger {
    pub fn new(prompter: Arc<dyn SessionPrompter>) -> Self {
        Self::with_cooldown(prompter, COOLDOWN_MS)
    }

    /// Trigger with a custom cooldown window
    pub fn with_cooldown(prompter: Arc<dyn SessionPrompter>, cooldown_ms: i64) -> Self {
        Self {
            prompter,
            cooldown_ms,
            last_run_ms: AtomicI64::new(0),
        }
    }

    /// Handle one event from the host's stream.
    ///
    /// Never fails and never panics: extraction is best-effort, so
    /// outbound errors are discarded here rather than propagated.
    pub async fn handle(&self, event: &ServerEvent) {
        self.handle_at(event, Utc::now().timestamp_millis()).await;
    }

    /// Clock-injected variant of [`IdleReflectionTrigger::handle`];
    /// `now_ms` is milliseconds since the Unix epoch.
    pub async fn handle_at(&self, event: &ServerEvent, now_ms: i64) {
        if event.kind != SESSION_IDLE {
            return;
        }

        if now_ms - self.last_run_ms.load(Ordering::Acquire) < self.cooldown_ms {
            return;
        }
        // Written before the await below: a second idle event arriving
        // while an extraction is in flight must see the window as taken.
        // This also precedes the session id check, so an idle event
        // without a session id still consumes the window.
        self.last_run_ms.store(now_ms, Ordering::Release);

        let Some(session_id) = event
            .properties
            .session_id
            .as_deref()
            .filter(|s| !s.is_empty())
        else {
            return;
        };

        // Extraction is best-effort: an unreachable host or rejected
        // prompt ends here, not in the host's workflow.
        let _ = self
            .prompter
            .prompt_session(session_id, REFLECT_AGENT, REFLECT_PROMPT)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReflectError, Result};
    use crate::event::EventProperties;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPrompter {
        calls: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl RecordingPrompter {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionPrompter for RecordingPrompter {
        async fn prompt_session(&self, session_id: &str, agent: &str, text: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((session_id.into(), agent.into(), text.into()));
            if self.fail {
                return Err(ReflectError::Config("simulated failure".into()));
            }
            Ok(())
        }
    }

    fn trigger_with(prompter: Arc<RecordingPrompter>) -> IdleReflectionTrigger {
        IdleReflectionTrigger::new(prompter)
    }

    fn idle_event(session_id: Option<&str>) -> ServerEvent {
        ServerEvent {
            kind: SESSION_IDLE.to_string(),
            properties: EventProperties {
                session_id: session_id.map(str::to_string),
            },
        }
    }

    fn other_event(kind: &str) -> ServerEvent {
        ServerEvent {
            kind: kind.to_string(),
            properties: EventProperties::default(),
        }
    }

    #[tokio::test]
    async fn non_idle_events_are_ignored() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&other_event("session.updated"), 1000).await;
        trigger.handle_at(&other_event("message.part.updated"), 2000).await;

        assert!(prompter.calls().is_empty());
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn idle_event_prompts_the_extractor() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("abc")), 1000).await;

        let calls = prompter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "abc");
        assert_eq!(calls[0].1, REFLECT_AGENT);
        assert_eq!(calls[0].2, REFLECT_PROMPT);
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 1000);
    }

    #[tokio::test]
    async fn second_idle_within_cooldown_is_skipped() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("abc")), 1000).await;
        trigger.handle_at(&idle_event(Some("abc")), 50_000).await;

        assert_eq!(prompter.calls().len(), 1);
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 1000);
    }

    #[tokio::test]
    async fn cooldown_reopens_after_window() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("abc")), 1000).await;
        trigger.handle_at(&idle_event(Some("abc")), 50_000).await;
        trigger.handle_at(&idle_event(Some("abc")), 130_000).await;

        assert_eq!(prompter.calls().len(), 2);
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 130_000);
    }

    #[tokio::test]
    async fn boundary_exactly_at_cooldown_runs() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("abc")), 1000).await;
        trigger
            .handle_at(&idle_event(Some("abc")), 1000 + COOLDOWN_MS)
            .await;

        assert_eq!(prompter.calls().len(), 2);
    }

    #[tokio::test]
    async fn missing_session_id_still_consumes_cooldown() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(None), 1000).await;
        assert!(prompter.calls().is_empty());
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 1000);

        // The consumed window suppresses the next legitimate attempt.
        trigger.handle_at(&idle_event(Some("abc")), 50_000).await;
        assert!(prompter.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_session_id_is_treated_as_missing() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("")), 1000).await;

        assert!(prompter.calls().is_empty());
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 1000);
    }

    #[tokio::test]
    async fn prompt_failure_is_swallowed() {
        let prompter = Arc::new(RecordingPrompter::failing());
        let trigger = trigger_with(prompter.clone());

        trigger.handle_at(&idle_event(Some("abc")), 1000).await;

        // The call was attempted, the error went nowhere, and the
        // timestamp stays claimed.
        assert_eq!(prompter.calls().len(), 1);
        assert_eq!(trigger.last_run_ms.load(Ordering::Acquire), 1000);
    }

    #[tokio::test]
    async fn custom_cooldown_is_honored() {
        let prompter = Arc::new(RecordingPrompter::default());
        let trigger = IdleReflectionTrigger::with_cooldown(prompter.clone(), 10);

        trigger.handle_at(&idle_event(Some("abc")), 100).await;
        trigger.handle_at(&idle_event(Some("abc")), 105).await;
        trigger.handle_at(&idle_event(Some("abc")), 110).await;

        assert_eq!(prompter.calls().len(), 2);
    }

    #[tokio::test]
    async fn independent_triggers_hold_independent_state() {
        let prompter = Arc::new(RecordingPrompter::default());
        let a = trigger_with(prompter.clone());
        let b = trigger_with(prompter.clone());

        a.handle_at(&idle_event(Some("abc")), 1000).await;
        b.handle_at(&idle_event(Some("def")), 1000).await;

        assert_eq!(prompter.calls().len(), 2);
    }
}
