//! Order records and the priority index key.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type OrderId = u64;

/// Simulation time, in the same unit as creation, delivery and ETA values.
pub type Time = i64;

/// One customer order as stored in the order index.
///
/// `priority` is fixed at creation. Everything else the engine changes by
/// cloning the record, editing the clone and writing it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub creation_time: Time,
    pub order_value: u64,
    pub delivery_time: Time,
    priority: f64,
    /// `None` until the first ETA computation for this order has run.
    pub eta: Option<Time>,
    pub out_for_delivery: bool,
}

impl OrderRecord {
    pub fn new(
        order_id: OrderId,
        creation_time: Time,
        order_value: u64,
        delivery_time: Time,
        priority: f64,
    ) -> Self {
        Self {
            order_id,
            creation_time,
            order_value,
            delivery_time,
            priority,
            eta: None,
            out_for_delivery: false,
        }
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn priority_key(&self) -> PriorityKey {
        PriorityKey::new(self.priority, self.order_id)
    }

    /// Time the driver is back after handing this order over. `None` without
    /// an ETA or when the sum overflows.
    pub fn return_time(&self) -> Option<Time> {
        self.eta.and_then(|eta| eta.checked_add(self.delivery_time))
    }

    pub fn is_pending(&self) -> bool {
        !self.out_for_delivery
    }
}

/// Renders `[id,creation_time,order_value,delivery_time,eta]`.
impl fmt::Display for OrderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{},{},",
            self.order_id, self.creation_time, self.order_value, self.delivery_time
        )?;
        match self.eta {
            Some(eta) => write!(f, "{eta}]"),
            None => f.write_str("unscheduled]"),
        }
    }
}

/// Key of the priority index: higher priority sorts later, so a descending
/// walk yields dispatch order. Equal priorities fall back to the order id,
/// with the smaller id dispatched first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorityKey {
    pub priority: f64,
    pub order_id: OrderId,
}

impl PriorityKey {
    pub fn new(priority: f64, order_id: OrderId) -> Self {
        Self { priority, order_id }
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PriorityKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityKey {}
