//! Event-driven progress reporting for debates
//!
//! The orchestrator never talks to connected clients directly. It hands
//! events to a [`Notifier`](crate::debate::Notifier); the one shipped here
//! publishes them onto an [`EventBus`] that channel subscribers listen to.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Orchestrator │────▶│  Dispatcher  │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (submit)    │     │   (queue)    │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use debate_coordination::events::{EventBus, EventBusExt, EventFilter};
//!
//! let bus = EventBus::new().shared();
//! let mut general = bus.subscribe_filtered(EventFilter::new().channel("general"));
//!
//! while let Ok(event) = general.recv().await {
//!     println!("{}: {}", event.session_id(), event.event_type());
//! }
//! ```

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{EventBus, EventBusExt, EventFilter, FilteredReceiver, SharedEventBus};
pub use types::{DebateEvent, StatusChanged, TurnCreated};
