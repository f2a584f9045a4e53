//! Best-effort activity notifications.

use crate::models::Actor;

/// Receives a human-readable line after each successful desk mutation.
pub trait ActivitySink: Send + Sync {
    fn record(&self, actor: &Actor, text: &str) -> anyhow::Result<()>;
}

/// Emits activity entries as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActivitySink;

impl ActivitySink for LogActivitySink {
    fn record(&self, actor: &Actor, text: &str) -> anyhow::Result<()> {
        tracing::info!(
            target: "clinic_desk::activity",
            user = %actor.name,
            user_uid = %actor.uid,
            "{}",
            text
        );
        Ok(())
    }
}

/// Deliver an activity entry. A failing sink is logged and otherwise ignored.
pub fn notify_activity(sink: &dyn ActivitySink, actor: &Actor, text: &str) {
    if let Err(e) = sink.record(actor, text) {
        tracing::warn!(error = ?e, activity = %text, "Failed to record activity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenSink {
        calls: AtomicUsize,
    }

    impl ActivitySink for BrokenSink {
        fn record(&self, _actor: &Actor, _text: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("activity store offline")
        }
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let sink = BrokenSink {
            calls: AtomicUsize::new(0),
        };
        notify_activity(&sink, &Actor::new("u-1", "Reception"), "Token #1 completed");
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_log_sink_accepts() {
        let result = LogActivitySink.record(&Actor::new("u-1", "Reception"), "hello");
        assert!(result.is_ok());
    }
}
