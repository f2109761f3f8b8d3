//! # kds-core
//!
//! Core abstractions for the KDS kitchen order notification service.
//!
//! This crate provides the foundational types and traits used across all KDS
//! components:
//!
//! - **Orders**: The order record, line items, and the kitchen status cycle
//! - **Tickets**: The display projection consumed by kitchen dashboards
//! - **Events**: The closed union of notification events pushed to dashboards
//! - **Store Traits**: Abstract order/account stores with in-memory reference
//!   implementations
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `kds-core` is the **only** crate allowed to define shared primitives. The
//! server (`kds-api`) and the dashboard client (`kds-cli`) both consume the
//! same event union, so adding an event kind is a compile-time-checked
//! decision on every consuming side.
//!
//! ## Example
//!
//! ```rust
//! use kds_core::order::KitchenStatus;
//!
//! // The manual-advance cycle wraps back to Pending.
//! assert_eq!(KitchenStatus::Done.advanced(), KitchenStatus::Pending);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod observability;
pub mod order;
pub mod store;
pub mod ticket;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::event::KitchenEvent;
    pub use crate::order::{KitchenStatus, Order, OrderItem};
    pub use crate::store::{AccountDirectory, MemoryAccountDirectory, MemoryOrderStore, OrderStore};
    pub use crate::ticket::{Ticket, TicketItem};
}
