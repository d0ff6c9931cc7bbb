//! Parse a synthetic order ticket and print the derived odds.
//!
//! Builds the kind of document snapshot the DOM layer would hand the
//! engine, runs the lifecycle against it, and renders the result under each
//! display mode.
//!
//! Run with: cargo run --example parse_ticket

use async_trait::async_trait;
use ticketlens_engine::{
    render, DisplayMode, DisplayState, EngineConfig, Settings, TicketEvent, TicketLifecycle,
    TicketNode, TicketSource,
};

/// A frozen page snapshot standing in for the live DOM layer.
struct StaticPage {
    document: TicketNode,
}

#[async_trait]
impl TicketSource for StaticPage {
    async fn document(&self) -> Option<TicketNode> {
        Some(self.document.clone())
    }
}

fn sample_document() -> TicketNode {
    TicketNode::new("body").with_children([
        TicketNode::new("nav").with_text("Markets"),
        TicketNode::new("div").with_attr("role", "dialog").with_children([
            TicketNode::new("button")
                .with_text("Yes")
                .with_attr("aria-pressed", "true"),
            TicketNode::new("button")
                .with_text("No")
                .with_attr("aria-pressed", "false"),
            TicketNode::new("div").with_text("Limit price").with_children([
                TicketNode::new("input")
                    .with_attr("type", "number")
                    .with_value("0.40"),
            ]),
            TicketNode::new("div").with_text("Contracts").with_children([
                TicketNode::new("input")
                    .with_attr("type", "number")
                    .with_value("10"),
            ]),
            TicketNode::new("span").with_text("Fee per contract: $0.03"),
        ]),
    ])
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::default();
    let source = StaticPage {
        document: sample_document(),
    };
    let (mut lifecycle, mut events) =
        TicketLifecycle::new(source, Settings::default(), config.clone());

    lifecycle.poll().await;

    let Some(TicketEvent::Opened(data)) = events.recv().await else {
        println!("no ticket found");
        return;
    };

    println!(
        "parsed ticket: side={} price={} quantity={}",
        data.side.as_ref().unwrap().value,
        data.price.as_ref().unwrap().value,
        data.quantity.as_ref().unwrap().value,
    );
    for warning in &data.warnings {
        println!("warning: {warning}");
    }

    for mode in [
        DisplayMode::Percent,
        DisplayMode::RawAmerican,
        DisplayMode::AfterFeeAmerican,
    ] {
        let settings = Settings {
            display_mode: mode,
            ..Settings::default()
        };
        match render(&data, &settings, &config) {
            DisplayState::Ready(value) => {
                let marker = if value.estimated { " (estimated)" } else { "" };
                println!("{mode:?}: {}{marker}", value.text);
            }
            DisplayState::Unavailable => println!("{mode:?}: unavailable"),
        }
    }
}
