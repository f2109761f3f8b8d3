//! Dashboard reconciliation state.
//!
//! [`DashboardState`] owns the canonical local ticket list and keeps it
//! eventually accurate despite an unreliable streaming transport: the list is
//! rebuilt from the authoritative fetch on mount and on every (re)connect,
//! and patched incrementally by events in between. The displayed list is
//! always a pure projection recomputed from the canonical list — never
//! separate mutable state.

use std::collections::HashSet;

use kds_core::event::KitchenEvent;
use kds_core::order::KitchenStatus;
use kds_core::ticket::{parse_time_placed, Ticket};

/// How long a completed ticket stays visible before leaving the active view.
pub const FADE_WINDOW_MS: u64 = 1000;

/// Connection state of the streaming transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Connection {
    /// No transport yet (initial state).
    #[default]
    Disconnected,
    /// Transport open and delivering events.
    Connected,
    /// Transport lost; a reconnect attempt is scheduled.
    Reconnecting {
        /// The attempt about to run (1-based).
        attempt: u32,
    },
    /// Reconnect budget exhausted; a restart is required.
    Failed,
}

/// Canonical local order state for one dashboard session.
#[derive(Debug, Default)]
pub struct DashboardState {
    tickets: Vec<Ticket>,
    /// Orders inside their fade window: already `Done`, still displayed.
    fading: HashSet<String>,
    /// Current transport state.
    pub connection: Connection,
    /// User-facing connection error, if any.
    pub connection_error: Option<String>,
}

impl DashboardState {
    /// Creates an empty dashboard state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the canonical list with an authoritative fetch result.
    pub fn load(&mut self, tickets: Vec<Ticket>) {
        self.tickets = tickets;
        // Authoritative reloads restart fade accounting: completed orders in
        // the fetched window leave the active view immediately.
        self.fading.clear();
    }

    /// Applies one streamed event.
    ///
    /// Returns the order id whose fade timer must be scheduled, when the
    /// event completed an order. Unknown order ids are silently dropped —
    /// a later full refresh reconciles them.
    pub fn apply(&mut self, event: KitchenEvent) -> Option<String> {
        match event {
            KitchenEvent::Connected { .. } | KitchenEvent::Heartbeat { .. } => None,
            KitchenEvent::NewOrder { order } => {
                // Newest-first by insertion; the active projection re-sorts
                // by placed-time anyway for robustness.
                self.tickets.insert(0, order);
                None
            }
            KitchenEvent::StatusUpdate {
                order_id, status, ..
            } => {
                let ticket = self.tickets.iter_mut().find(|t| t.order_id == order_id)?;
                ticket.status = status;
                if status == KitchenStatus::Done {
                    self.fading.insert(order_id.clone());
                    Some(order_id)
                } else {
                    None
                }
            }
        }
    }

    /// Optimistically cycles an order's status, returning the new status to
    /// persist.
    ///
    /// Returns `None` when the order is unknown. On persistence failure the
    /// caller rolls the optimistic change back by reloading the
    /// authoritative list, not by undoing in place.
    pub fn advance_status(&mut self, order_id: &str) -> Option<KitchenStatus> {
        let ticket = self.tickets.iter_mut().find(|t| t.order_id == order_id)?;
        let next = ticket.status.advanced();
        ticket.status = next;
        if next == KitchenStatus::Done {
            self.fading.insert(order_id.to_string());
        }
        Some(next)
    }

    /// Ends an order's fade window; it leaves the active view on the next
    /// render.
    pub fn mark_faded(&mut self, order_id: &str) {
        self.fading.remove(order_id);
    }

    /// Marks the transport connected and clears any displayed error.
    pub fn set_connected(&mut self) {
        self.connection = Connection::Connected;
        self.connection_error = None;
    }

    /// Marks the transport lost with a reconnect attempt scheduled.
    pub fn set_reconnecting(&mut self, attempt: u32) {
        self.connection = Connection::Reconnecting { attempt };
        self.connection_error = Some("Connection lost. Trying to reconnect...".to_string());
    }

    /// Marks the transport permanently failed.
    pub fn set_failed(&mut self) {
        self.connection = Connection::Failed;
        self.connection_error = Some(
            "Failed to reconnect after multiple attempts. Please restart the dashboard."
                .to_string(),
        );
    }

    /// The active-order projection: every ticket that is not `Done`, plus
    /// completed tickets still inside their fade window, sorted by parsed
    /// placed-time descending (unparseable times sort last).
    #[must_use]
    pub fn active_orders(&self) -> Vec<&Ticket> {
        let mut active: Vec<&Ticket> = self
            .tickets
            .iter()
            .filter(|t| t.status != KitchenStatus::Done || self.fading.contains(&t.order_id))
            .collect();
        active.sort_by(|a, b| {
            parse_time_placed(&b.time_placed).cmp(&parse_time_placed(&a.time_placed))
        });
        active
    }

    /// Returns the number of active orders with the given status.
    #[must_use]
    pub fn count_with_status(&self, status: KitchenStatus) -> usize {
        self.active_orders()
            .iter()
            .filter(|t| t.status == status)
            .count()
    }

    /// Returns the full canonical list (including faded orders).
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kds_core::ticket::TicketItem;

    fn ticket(order_id: &str, status: KitchenStatus, time_placed: &str) -> Ticket {
        Ticket {
            order_number: 1,
            order_id: order_id.to_string(),
            table_number: 5,
            time_placed: time_placed.to_string(),
            items: vec![TicketItem {
                name: "Coffee".to_string(),
                quantity: 1,
            }],
            status,
            customer_name: None,
            customer_phone: None,
            total: 12.5,
        }
    }

    #[test]
    fn status_update_patches_matching_order_in_place() {
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::Pending, "10:00 AM")]);

        let fade = state.apply(KitchenEvent::status_update(
            "o1",
            KitchenStatus::InProgress,
        ));
        assert!(fade.is_none());

        let active = state.active_orders();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].order_id, "o1");
        assert_eq!(active[0].status, KitchenStatus::InProgress);
    }

    #[test]
    fn done_order_stays_visible_until_fade_expires() {
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::InProgress, "10:00 AM")]);

        let fade = state.apply(KitchenEvent::status_update("o1", KitchenStatus::Done));
        assert_eq!(fade.as_deref(), Some("o1"));

        // Inside the fade window the completed state is still shown.
        assert_eq!(state.active_orders().len(), 1);
        assert_eq!(state.active_orders()[0].status, KitchenStatus::Done);

        state.mark_faded("o1");
        assert!(state.active_orders().is_empty());
        assert_eq!(state.tickets().len(), 1);
    }

    #[test]
    fn new_order_is_prepended() {
        // A pushed order lands at the front even before any fetch completes.
        let mut state = DashboardState::new();
        assert!(state.apply(KitchenEvent::new_order(ticket(
            "o2",
            KitchenStatus::Pending,
            "10:05 AM"
        )))
        .is_none());

        assert_eq!(state.tickets()[0].order_id, "o2");
        assert_eq!(state.active_orders()[0].order_id, "o2");
    }

    #[test]
    fn status_update_for_unknown_order_is_dropped() {
        // No phantom entry is created for an order we never saw.
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::Pending, "10:00 AM")]);

        let fade = state.apply(KitchenEvent::status_update("ghost", KitchenStatus::Done));
        assert!(fade.is_none());
        assert_eq!(state.tickets().len(), 1);
        assert_eq!(state.tickets()[0].status, KitchenStatus::Pending);
    }

    #[test]
    fn advance_cycles_and_wraps() {
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::Done, "10:00 AM")]);

        assert_eq!(state.advance_status("o1"), Some(KitchenStatus::Pending));
        assert_eq!(state.advance_status("o1"), Some(KitchenStatus::InProgress));
        assert_eq!(state.advance_status("o1"), Some(KitchenStatus::Done));
        assert_eq!(state.advance_status("missing"), None);
    }

    #[test]
    fn advance_to_done_enters_fade_window() {
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::InProgress, "10:00 AM")]);

        assert_eq!(state.advance_status("o1"), Some(KitchenStatus::Done));
        assert_eq!(state.active_orders().len(), 1);
        state.mark_faded("o1");
        assert!(state.active_orders().is_empty());
    }

    #[test]
    fn active_orders_sort_by_placed_time_descending() {
        let mut state = DashboardState::new();
        state.load(vec![
            ticket("early", KitchenStatus::Pending, "9:00 AM"),
            ticket("late", KitchenStatus::Pending, "2:30 PM"),
            ticket("mid", KitchenStatus::Pending, "11:45 AM"),
            ticket("odd", KitchenStatus::Pending, "sometime"),
        ]);

        let ids: Vec<&str> = state
            .active_orders()
            .iter()
            .map(|t| t.order_id.as_str())
            .collect();
        assert_eq!(ids, vec!["late", "mid", "early", "odd"]);
    }

    #[test]
    fn reload_clears_fade_accounting() {
        let mut state = DashboardState::new();
        state.load(vec![ticket("o1", KitchenStatus::InProgress, "10:00 AM")]);
        state.apply(KitchenEvent::status_update("o1", KitchenStatus::Done));
        assert_eq!(state.active_orders().len(), 1);

        // An authoritative reload carrying the Done order drops it from the
        // active view immediately.
        state.load(vec![ticket("o1", KitchenStatus::Done, "10:00 AM")]);
        assert!(state.active_orders().is_empty());
    }

    #[test]
    fn connection_transitions_update_error_banner() {
        let mut state = DashboardState::new();
        assert_eq!(state.connection, Connection::Disconnected);

        state.set_reconnecting(2);
        assert_eq!(state.connection, Connection::Reconnecting { attempt: 2 });
        assert!(state.connection_error.is_some());

        state.set_connected();
        assert_eq!(state.connection, Connection::Connected);
        assert!(state.connection_error.is_none());

        state.set_failed();
        assert_eq!(state.connection, Connection::Failed);
        assert!(state
            .connection_error
            .as_deref()
            .is_some_and(|msg| msg.contains("restart")));
    }
}
