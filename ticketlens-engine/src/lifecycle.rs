//! Ticket lifecycle state machine.
//!
//! Tracks the order-entry UI through closed -> open -> changed -> closed by
//! content-hashing document snapshots, re-parsing on the transitions that
//! matter and emitting typed events for consumers to subscribe to. One
//! logical instance exists per page; the host guarantees a single ticket is
//! open at a time.

use crate::config::{EngineConfig, ParseContext, Settings};
use crate::detect::{detect_ticket, find_ticket, DetectError, TicketSource};
use crate::orchestrator::{parse_with_recovery, TicketData};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Lifecycle notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketEvent {
    /// A ticket appeared and was parsed
    Opened(TicketData),
    /// The open ticket's content changed and was re-parsed
    Changed(TicketData),
    /// The ticket disappeared; any previous data is stale
    Closed,
}

/// Where the ticket currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Closed,
    Open { content_hash: u64 },
}

/// The state machine. Owns the settings and config for the session and
/// lends them to every parse it triggers.
pub struct TicketLifecycle<S: TicketSource> {
    source: S,
    settings: Settings,
    config: EngineConfig,
    state: TicketState,
    current: Option<TicketData>,
    events: mpsc::UnboundedSender<TicketEvent>,
}

impl<S: TicketSource> TicketLifecycle<S> {
    /// Create the lifecycle and the event stream its consumers subscribe to.
    pub fn new(
        source: S,
        settings: Settings,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TicketEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                source,
                settings,
                config,
                state: TicketState::Closed,
                current: None,
                events,
            },
            receiver,
        )
    }

    pub fn state(&self) -> TicketState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, TicketState::Open { .. })
    }

    /// The live ticket record, if one is open.
    pub fn current(&self) -> Option<&TicketData> {
        self.current.as_ref()
    }

    /// Content hash of the ticket as it stands right now, if present.
    async fn observe(&self) -> Option<u64> {
        let document = self.source.document().await?;
        find_ticket(&document, &self.config.detection).map(|ticket| ticket.content_hash())
    }

    /// Process one change notification from the host's mutation layer.
    ///
    /// Re-parses are serialized by construction: this takes `&mut self`, so
    /// a new notification cannot be processed while a previous parse is
    /// still pending.
    pub async fn poll(&mut self) {
        match (self.state, self.observe().await) {
            (TicketState::Closed, Some(_)) => self.open().await,
            (TicketState::Open { .. }, None) => self.close(),
            (TicketState::Open { content_hash }, Some(observed)) if observed != content_hash => {
                self.content_changed().await
            }
            _ => {}
        }
    }

    /// Wait for the ticket to appear, with bounded retries and backoff.
    ///
    /// Exhausting the retries is reported once and is non-fatal; the rest of
    /// the page integration keeps working without a ticket context.
    pub async fn wait_for_open(&mut self) -> Result<(), DetectError> {
        if self.is_open() {
            return Ok(());
        }
        match detect_ticket(&self.source, &self.config.retry, &self.config.detection).await {
            Ok(_) => {
                self.poll().await;
                Ok(())
            }
            Err(err) => {
                warn!(%err, "order ticket never appeared; continuing without one");
                Err(err)
            }
        }
    }

    async fn open(&mut self) {
        let ctx = ParseContext::new(&self.settings, &self.config);
        let data = parse_with_recovery(&self.source, &ctx).await;

        // The parse may have outlived the ticket; a stale result must be
        // discarded, not applied
        let Some(content_hash) = self.observe().await else {
            debug!("ticket closed while its opening parse was in flight; result discarded");
            return;
        };

        self.state = TicketState::Open { content_hash };
        self.current = Some(data.clone());
        info!(can_proceed = data.summary.can_proceed, "ticket opened");
        let _ = self.events.send(TicketEvent::Opened(data));
    }

    fn close(&mut self) {
        self.state = TicketState::Closed;
        self.current = None;
        info!("ticket closed");
        let _ = self.events.send(TicketEvent::Closed);
    }

    async fn content_changed(&mut self) {
        // Coalesce rapid consecutive mutations into one re-parse
        sleep(self.config.debounce_window).await;

        let Some(settled) = self.observe().await else {
            self.close();
            return;
        };
        if self.state == (TicketState::Open { content_hash: settled }) {
            debug!("ticket content settled back unchanged; skipping re-parse");
            return;
        }

        let ctx = ParseContext::new(&self.settings, &self.config);
        let data = parse_with_recovery(&self.source, &ctx).await;

        let Some(content_hash) = self.observe().await else {
            self.close();
            return;
        };

        self.state = TicketState::Open { content_hash };
        self.current = Some(data.clone());
        debug!("ticket content changed; re-parsed");
        let _ = self.events.send(TicketEvent::Changed(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TicketNode;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Test source backed by a shared, swappable ticket subtree.
    #[derive(Clone, Default)]
    struct SharedSource {
        ticket: Arc<Mutex<Option<TicketNode>>>,
    }

    impl SharedSource {
        fn set(&self, ticket: Option<TicketNode>) {
            *self.ticket.lock().unwrap() = ticket;
        }
    }

    #[async_trait]
    impl TicketSource for SharedSource {
        async fn document(&self) -> Option<TicketNode> {
            let ticket = self.ticket.lock().unwrap().clone();
            Some(TicketNode::new("body").with_children(ticket))
        }
    }

    fn ticket(price: &str) -> TicketNode {
        TicketNode::new("div").with_attr("role", "dialog").with_children([
            TicketNode::new("button")
                .with_text("Yes")
                .with_attr("aria-pressed", "true"),
            TicketNode::new("button").with_text("No"),
            TicketNode::new("div").with_text("Limit price").with_children([
                TicketNode::new("input").with_value(price),
            ]),
            TicketNode::new("div").with_text("Contracts").with_children([
                TicketNode::new("input").with_value("10"),
            ]),
            TicketNode::new("span").with_text("Fee per contract: $0.03"),
        ])
    }

    fn lifecycle(
        source: SharedSource,
    ) -> (
        TicketLifecycle<SharedSource>,
        mpsc::UnboundedReceiver<TicketEvent>,
    ) {
        TicketLifecycle::new(source, Settings::default(), EngineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_change_close_sequence() {
        let source = SharedSource::default();
        let (mut machine, mut events) = lifecycle(source.clone());
        assert_eq!(machine.state(), TicketState::Closed);

        // Nothing on the page yet: no transition
        machine.poll().await;
        assert!(!machine.is_open());

        // Ticket appears
        source.set(Some(ticket("0.40")));
        machine.poll().await;
        assert!(machine.is_open());
        let opened = events.try_recv().unwrap();
        match opened {
            TicketEvent::Opened(data) => {
                assert!(data.summary.can_proceed);
                assert_eq!(machine.current().unwrap().summary, data.summary);
            }
            other => panic!("expected Opened, got {other:?}"),
        }

        // Content changes
        source.set(Some(ticket("0.55")));
        machine.poll().await;
        match events.try_recv().unwrap() {
            TicketEvent::Changed(data) => {
                assert_eq!(data.price.as_ref().unwrap().value.to_string(), "0.55");
            }
            other => panic!("expected Changed, got {other:?}"),
        }

        // Ticket disappears
        source.set(None);
        machine.poll().await;
        assert_eq!(machine.state(), TicketState::Closed);
        assert!(machine.current().is_none());
        assert_eq!(events.try_recv().unwrap(), TicketEvent::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_content_is_ignored() {
        let source = SharedSource::default();
        source.set(Some(ticket("0.40")));
        let (mut machine, mut events) = lifecycle(source.clone());

        machine.poll().await;
        let _ = events.try_recv();

        // Same content: the self-transition must not fire
        machine.poll().await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_that_settles_back_is_coalesced() {
        let source = SharedSource::default();
        source.set(Some(ticket("0.40")));
        let (mut machine, mut events) = lifecycle(source.clone());
        machine.poll().await;
        let _ = events.try_recv();

        // Flip to a new value, then back within the debounce window
        source.set(Some(ticket("0.41")));
        let revert = {
            let source = source.clone();
            async move {
                sleep(Duration::from_millis(50)).await;
                source.set(Some(ticket("0.40")));
            }
        };
        tokio::join!(machine.poll(), revert);

        // The transient value never surfaced
        assert!(events.try_recv().is_err());
        assert_eq!(
            machine.current().unwrap().price.as_ref().unwrap().value.to_string(),
            "0.40"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_reparse_discards_result() {
        let source = SharedSource::default();
        source.set(Some(ticket("0.40")));
        let (mut machine, mut events) = lifecycle(source.clone());
        machine.poll().await;
        let _ = events.try_recv();

        // Content changes, then the ticket vanishes inside the debounce
        source.set(Some(ticket("0.60")));
        let vanish = {
            let source = source.clone();
            async move {
                sleep(Duration::from_millis(50)).await;
                source.set(None);
            }
        };
        tokio::join!(machine.poll(), vanish);

        assert_eq!(machine.state(), TicketState::Closed);
        assert_eq!(events.try_recv().unwrap(), TicketEvent::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_open_survives_detection_failure() {
        let source = SharedSource::default();
        let (mut machine, mut events) = lifecycle(source.clone());

        let err = machine.wait_for_open().await.unwrap_err();
        assert!(matches!(err, DetectError::RetriesExhausted { .. }));
        assert_eq!(machine.state(), TicketState::Closed);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_open_picks_up_late_render() {
        let source = SharedSource::default();
        let (mut machine, mut events) = lifecycle(source.clone());

        let appear = {
            let source = source.clone();
            async move {
                sleep(Duration::from_millis(300)).await;
                source.set(Some(ticket("0.40")));
            }
        };
        let (result, ()) = tokio::join!(machine.wait_for_open(), appear);
        assert!(result.is_ok());
        assert!(machine.is_open());
        assert!(matches!(events.try_recv(), Ok(TicketEvent::Opened(_))));
    }
}
