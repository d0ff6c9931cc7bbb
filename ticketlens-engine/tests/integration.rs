//! Integration tests for the full ticket pipeline.
//!
//! Exercises detection, parsing, recovery, lifecycle, and display together
//! over synthetic document snapshots. No live pages; timing-sensitive tests
//! run on tokio's paused clock.

use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use ticketlens_engine::{
    detect_for_ticket, parse_with_recovery, render, DisplayState, EngineConfig, ParseContext,
    RecoveryStep, Settings, Side, TicketEvent, TicketLifecycle, TicketNode, TicketSource,
};
use ticketlens_pricing::FeeSource;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn side_toggles(selected_yes: bool) -> [TicketNode; 2] {
    [
        TicketNode::new("button")
            .with_text("Yes")
            .with_attr("aria-pressed", if selected_yes { "true" } else { "false" }),
        TicketNode::new("button")
            .with_text("No")
            .with_attr("aria-pressed", if selected_yes { "false" } else { "true" }),
    ]
}

fn price_field(value: &str) -> TicketNode {
    TicketNode::new("div")
        .with_text("Limit price")
        .with_children([TicketNode::new("input")
            .with_attr("type", "number")
            .with_value(value)])
}

fn quantity_field(value: &str) -> TicketNode {
    TicketNode::new("div")
        .with_text("Contracts")
        .with_children([TicketNode::new("input")
            .with_attr("type", "number")
            .with_value(value)])
}

fn full_ticket() -> TicketNode {
    let [yes, no] = side_toggles(true);
    TicketNode::new("div").with_attr("role", "dialog").with_children([
        yes,
        no,
        price_field("0.40"),
        quantity_field("10"),
        TicketNode::new("span").with_text("Fee per contract: $0.03"),
    ])
}

fn document(children: impl IntoIterator<Item = TicketNode>) -> TicketNode {
    TicketNode::new("body").with_children(children)
}

/// Source backed by a swappable document.
#[derive(Clone, Default)]
struct PageSource {
    doc: Arc<Mutex<Option<TicketNode>>>,
}

impl PageSource {
    fn with(doc: TicketNode) -> Self {
        Self {
            doc: Arc::new(Mutex::new(Some(doc))),
        }
    }

    fn set(&self, doc: Option<TicketNode>) {
        *self.doc.lock().unwrap() = doc;
    }
}

#[async_trait]
impl TicketSource for PageSource {
    async fn document(&self) -> Option<TicketNode> {
        self.doc.lock().unwrap().clone()
    }
}

/// Source whose document changes after a number of snapshots, simulating
/// asynchronous UI population.
struct PopulatingSource {
    early: TicketNode,
    late: TicketNode,
    snapshots_before_ready: u32,
    taken: AtomicU32,
}

#[async_trait]
impl TicketSource for PopulatingSource {
    async fn document(&self) -> Option<TicketNode> {
        let taken = self.taken.fetch_add(1, Ordering::SeqCst);
        if taken < self.snapshots_before_ready {
            Some(self.early.clone())
        } else {
            Some(self.late.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Test 1: Happy path through detection, parse, and display
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_full_pipeline_produces_after_fee_display() {
    let settings = Settings::default();
    let config = EngineConfig::default();
    let source = PageSource::with(document([
        TicketNode::new("nav").with_text("markets"),
        full_ticket(),
    ]));

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(data.is_valid);
    assert!(data.summary.can_proceed);
    assert_eq!(data.side.as_ref().unwrap().value, Side::Yes);
    assert_eq!(data.price.as_ref().unwrap().value, dec!(0.40));
    assert_eq!(data.quantity.as_ref().unwrap().value, 10);
    assert!(data.recovery.is_empty());

    match render(&data, &settings, &config) {
        DisplayState::Ready(value) => {
            // risk 0.43, profit 0.57: +133
            assert_eq!(value.text, "+133");
            assert!(!value.estimated);
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test 2: Delayed retry picks up late-populating fields
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_recovery_delayed_retry() {
    let settings = Settings::default();
    let config = EngineConfig::default();

    // Price input present but empty at first, populated later
    let [yes, no] = side_toggles(true);
    let early_ticket = TicketNode::new("div").with_attr("role", "dialog").with_children([
        yes,
        no,
        price_field(""),
        quantity_field("10"),
    ]);
    let source = PopulatingSource {
        early: document([early_ticket]),
        late: document([full_ticket()]),
        snapshots_before_ready: 1,
        taken: AtomicU32::new(0),
    };

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(data.summary.can_proceed);
    assert_eq!(data.price.as_ref().unwrap().value, dec!(0.40));
    assert!(data.recovery.contains(&RecoveryStep::DelayedRetry));
}

// ---------------------------------------------------------------------------
// Test 3: Ancestor search when detection latches onto a fragment
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_recovery_ancestor_search() {
    let settings = Settings::default();
    let config = EngineConfig::default();

    // The dialog fragment only holds the toggles and quantity; the price
    // field sits one level up in the surrounding panel
    let [yes, no] = side_toggles(true);
    let fragment = TicketNode::new("div")
        .with_attr("role", "dialog")
        .with_children([yes, no, quantity_field("10")]);
    let panel = TicketNode::new("section").with_children([price_field("0.40"), fragment]);
    let source = PageSource::with(document([panel]));

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(data.summary.can_proceed);
    assert_eq!(data.price.as_ref().unwrap().value, dec!(0.40));
    assert!(data
        .recovery
        .iter()
        .any(|step| matches!(step, RecoveryStep::AncestorSearch { .. })));
}

// ---------------------------------------------------------------------------
// Test 4: Document scan when the ancestors never widen far enough
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_recovery_document_scan() {
    let settings = Settings::default();
    let config = EngineConfig::default();

    // A decoy dialog nested too deep for the ancestor ladder to escape,
    // with the real (role-less) ticket elsewhere in the document
    let decoy = TicketNode::new("div")
        .with_attr("role", "dialog")
        .with_children([
            TicketNode::new("button").with_text("Yes").checked(),
            TicketNode::new("input").with_value("watchlist"),
        ]);
    let buried = TicketNode::new("div").with_children([TicketNode::new("div").with_children([
        TicketNode::new("div").with_children([TicketNode::new("div").with_children([decoy])]),
    ])]);

    let mut real = full_ticket();
    real.attributes.clear();
    let source = PageSource::with(document([buried, real]));

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(data.summary.can_proceed);
    assert_eq!(data.price.as_ref().unwrap().value, dec!(0.40));
    assert!(data.recovery.contains(&RecoveryStep::DocumentScan));
}

// ---------------------------------------------------------------------------
// Test 5: Quantity defaulting and fee estimation at the end of the ladder
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_recovery_defaults_quantity_and_estimates_fee() {
    let settings = Settings::default();
    let config = EngineConfig::default();

    // Side and price only; no quantity anywhere, no fee text
    let [yes, no] = side_toggles(false);
    let ticket = TicketNode::new("div")
        .with_attr("role", "dialog")
        .with_children([yes, no, price_field("0.50")]);
    let source = PageSource::with(document([ticket]));

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(data.summary.can_proceed);
    assert_eq!(data.side.as_ref().unwrap().value, Side::No);
    assert_eq!(data.quantity.as_ref().unwrap().value, 1);
    assert!(data.recovery.contains(&RecoveryStep::DefaultQuantity));
    assert!(data.recovery.contains(&RecoveryStep::EstimatedFee));

    // Taker at 0.50 for one contract: 0.0175 -> 0.02 rounded up
    let fee = data.fee.as_ref().unwrap();
    assert_eq!(fee.value.source, FeeSource::Estimated);
    assert_eq!(fee.value.total_fee, Some(dec!(0.02)));

    // The fallback detector flags it and the display carries the marker
    let report = detect_for_ticket(&data, &config.fallback).unwrap();
    assert!(report.is_using_fallback);
    assert_eq!(report.confidence, dec!(0.95));

    match render(&data, &settings, &config) {
        DisplayState::Ready(value) => assert!(value.estimated),
        other => panic!("expected Ready, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test 6: A ticket with no side control never becomes usable
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_sideless_ticket_stays_unusable() {
    let settings = Settings::default();
    let config = EngineConfig::default();

    let ticket = TicketNode::new("div")
        .with_attr("role", "dialog")
        .with_children([
            // A yes/no word in plain text keeps detection finding the
            // container, but nothing is a selectable side control
            TicketNode::new("span").with_text("Will it settle yes?"),
            price_field("0.40"),
            quantity_field("10"),
        ]);
    let source = PageSource::with(document([ticket]));

    let ctx = ParseContext::new(&settings, &config);
    let data = parse_with_recovery(&source, &ctx).await;

    assert!(!data.is_valid);
    assert!(!data.summary.can_proceed);
    assert!(data.price.is_some());
    assert!(data.quantity.is_some());
    assert!(data.errors.iter().any(|e| e.contains("side")));
    assert_eq!(render(&data, &settings, &config), DisplayState::Unavailable);
}

// ---------------------------------------------------------------------------
// Test 7: Lifecycle drives parse and display end to end
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_lifecycle_end_to_end() {
    let settings = Settings::default();
    let config = EngineConfig::default();
    let source = PageSource::default();
    let (mut machine, mut events) =
        TicketLifecycle::new(source.clone(), settings, config.clone());

    // Page renders the ticket
    source.set(Some(document([full_ticket()])));
    machine.poll().await;
    let opened = match events.try_recv().unwrap() {
        TicketEvent::Opened(data) => data,
        other => panic!("expected Opened, got {other:?}"),
    };
    assert!(opened.summary.can_proceed);

    // User flips to NO at a new price
    let [yes, no] = side_toggles(false);
    let changed_ticket = TicketNode::new("div").with_attr("role", "dialog").with_children([
        yes,
        no,
        price_field("0.60"),
        quantity_field("10"),
        TicketNode::new("span").with_text("Fee per contract: $0.03"),
    ]);
    source.set(Some(document([changed_ticket])));
    machine.poll().await;
    let changed = match events.try_recv().unwrap() {
        TicketEvent::Changed(data) => data,
        other => panic!("expected Changed, got {other:?}"),
    };
    assert_eq!(changed.side.as_ref().unwrap().value, Side::No);
    // risk 0.63, profit 0.37: -round(100 * 0.63 / 0.37) = -170
    match render(&changed, &Settings::default(), &config) {
        DisplayState::Ready(value) => assert_eq!(value.text, "-170"),
        other => panic!("expected Ready, got {other:?}"),
    }

    // Ticket closes; derived data is discarded
    source.set(Some(document([])));
    machine.poll().await;
    assert_eq!(events.try_recv().unwrap(), TicketEvent::Closed);
    assert!(machine.current().is_none());
}

// ---------------------------------------------------------------------------
// Test 8: Detection failure is reported once and is non-fatal
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_detection_failure_is_nonfatal() {
    let settings = Settings::default();
    let config = EngineConfig::default();
    let source = PageSource::with(document([TicketNode::new("div").with_text("no ticket here")]));
    let (mut machine, mut events) = TicketLifecycle::new(source.clone(), settings, config);

    assert!(machine.wait_for_open().await.is_err());
    assert!(!machine.is_open());
    assert!(events.try_recv().is_err());

    // The page later renders the ticket and everything proceeds normally
    source.set(Some(document([full_ticket()])));
    machine.poll().await;
    assert!(machine.is_open());
    assert!(matches!(events.try_recv(), Ok(TicketEvent::Opened(_))));
}
