//! Chat interface for illustra
//!
//! This crate adapts chat traffic to the intake core:
//! - **Events** (`events`) - inbound commands, free text and button presses
//! - **Commands** (`commands`) - `/request`, `/status`, admin commands
//! - **Actions** (`actions`) - button tokens for intake choices and admin cards
//! - **Messages** (`messages`) - message templates with inline keyboards
//! - **Outbound** (`outbound`) - send / edit / answer seam and the notifier built on it
//! - **Runner** (`runner`) - polling loop with reconnection logic
//!
//! # Architecture
//!
//! ```text
//! UpdateSource → PollingRunner → EventDispatcher → IntakeBot → AccessLedger / IntakeService
//!                                                      ↓
//!                                     ChatOutbound ← MessageTemplate
//! ```

pub mod actions;
pub mod bot;
pub mod commands;
pub mod events;
pub mod messages;
pub mod outbound;
pub mod runner;

pub use bot::{bot_dispatcher, IntakeBot};
pub use events::{ChatEnvelope, ChatEvent, ChatUser, EventContext, EventDispatcher};
pub use messages::{Button, MessageBuilder, MessageTemplate};
pub use outbound::{ChatNotifier, ChatOutbound, MessageRef, NoopOutbound, RecordingOutbound};
pub use runner::{NoopUpdateSource, PollingRunner, ReconnectPolicy, TransportError, UpdateSource};
