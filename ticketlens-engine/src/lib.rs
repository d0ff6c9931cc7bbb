//! Ticket Parsing and Lifecycle Engine for the Ticketlens Order Assistant
//!
//! This crate is the core of a page augmentation tool for a prediction
//! market's order-entry UI: it parses the order ticket out of host-page
//! snapshots, tracks the ticket's lifecycle, and produces the derived-odds
//! records a rendering layer displays. The DOM integration itself lives
//! outside this crate; the engine only ever sees owned [`TicketNode`] trees
//! and never assumes specific class names.
//!
//! # Architecture
//!
//! Snapshots come in through a [`TicketSource`]; typed results go out as
//! value records. Nothing in the engine holds global state: settings and
//! config are owned by the caller and lent into each entry point.
//!
//! # Key Components
//!
//! - [`TicketLifecycle`]: closed/open state machine emitting
//!   [`TicketEvent`]s as the ticket appears, changes, and closes
//! - [`parse_ticket`] / [`parse_with_recovery`]: field parsers plus the
//!   recovery ladder, producing [`TicketData`] records
//! - [`find_ticket`] / [`detect_ticket`]: layered container detection with
//!   bounded retries for asynchronously rendered pages
//! - [`detect_fallback_fee_usage`]: labels estimated fees for transparency
//! - [`render`]: maps a ticket and the user's [`Settings`] to what the
//!   display layer shows
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketlens_engine::{
//!     EngineConfig, Settings, TicketEvent, TicketLifecycle,
//! };
//!
//! let (mut lifecycle, mut events) =
//!     TicketLifecycle::new(source, Settings::default(), EngineConfig::default());
//!
//! // Driven by the host's mutation notifications
//! lifecycle.poll().await;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TicketEvent::Opened(data) | TicketEvent::Changed(data) => {
//!             let state = ticketlens_engine::render(&data, &settings, &config);
//!             // hand `state` to the rendering layer
//!         }
//!         TicketEvent::Closed => { /* clear derived displays */ }
//!     }
//! }
//! ```

pub mod config;
pub mod detect;
pub mod display;
pub mod fallback;
pub mod lifecycle;
pub mod orchestrator;
pub mod parse;
pub mod retry;
pub mod tree;

// Re-exports for convenience
pub use config::{DisplayMode, EngineConfig, ParseContext, ParseHeuristics, Settings};
pub use detect::{detect_ticket, find_ticket, DetectError, DetectionConfig, TicketSource};
pub use display::{render, AfterFeeView, DisplayState, RenderedValue};
pub use fallback::{
    detect_fallback_fee_usage, detect_for_ticket, FallbackContext, FallbackHeuristics,
    FallbackReport,
};
pub use lifecycle::{TicketEvent, TicketLifecycle, TicketState};
pub use orchestrator::{
    parse_ticket, parse_with_recovery, RecoveryStep, TicketData, ValidationSummary,
};
pub use parse::side::Side;
pub use parse::ParsedField;
pub use retry::{retry, RetryError, RetryPolicy};
pub use tree::{LabeledInput, TicketNode};
