//! Bus - broker-agnostic publish/subscribe endpoint
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Bus                               │
//! │  publish() ──► transport ──✗──► retry queue                 │
//! │  subscribe() ◄── transport: drop own messages, drain queue, │
//! │                             then call handler               │
//! │  reconnect / timer / manual ──► drain queue                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drains run oldest first and stop at the first failed redelivery. Only
//! one drain runs per bus at a time; triggers that fire while a drain is in
//! flight return immediately.

mod bus;
mod options;
mod schedule;

pub use bus::Bus;
pub use options::BusOptions;
