//! Local copy of the order ledger as the admin console sees it.
//!
//! Every fetch replaces the whole board ("last response wins"); status
//! changes are written optimistically and then overwritten by the server's
//! record.

use chrono::{DateTime, Utc};
use pva_market_core::{Order, OrderId, OrderStatus, Price, sort_newest_first};

/// Per-status order counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub shipped: usize,
    pub completed: usize,
}

impl StatusCounts {
    #[must_use]
    pub const fn get(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Processing => self.processing,
            OrderStatus::Shipped => self.shipped,
            OrderStatus::Completed => self.completed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBoard {
    orders: Vec<Order>,
    synced_at: Option<DateTime<Utc>>,
}

impl OrderBoard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            orders: Vec::new(),
            synced_at: None,
        }
    }

    /// Orders, newest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// When a full fetch was last applied.
    #[must_use]
    pub const fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Overwrite the board with a complete fetch result.
    pub fn replace_all(&mut self, mut orders: Vec<Order>) {
        sort_newest_first(&mut orders);
        self.orders = orders;
        self.synced_at = Some(Utc::now());
    }

    /// Rewrite one order's status locally. Returns `false` if the order is
    /// not on the board.
    pub fn set_status(&mut self, id: &OrderId, status: OrderStatus) -> bool {
        match self.orders.iter_mut().find(|order| &order.id == id) {
            Some(order) => {
                order.status = status;
                true
            }
            None => false,
        }
    }

    /// Replace the local record with the server's copy.
    pub fn reconcile(&mut self, order: Order) {
        if let Some(existing) = self.orders.iter_mut().find(|o| o.id == order.id) {
            *existing = order;
        } else {
            self.orders.push(order);
            sort_newest_first(&mut self.orders);
        }
    }

    pub fn clear(&mut self) {
        self.orders.clear();
        self.synced_at = None;
    }

    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for order in &self.orders {
            match order.status {
                OrderStatus::Pending => counts.pending += 1,
                OrderStatus::Processing => counts.processing += 1,
                OrderStatus::Shipped => counts.shipped += 1,
                OrderStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    /// Sum of totals over completed orders.
    #[must_use]
    pub fn revenue(&self) -> Price {
        self.orders
            .iter()
            .filter(|order| order.status == OrderStatus::Completed)
            .map(|order| order.total)
            .sum()
    }
}
