//! Events emitted by the dispatch engine, in the order they happen.
//!
//! `Display` renders the exact output line for each event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::order::{OrderId, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaUpdate {
    pub order_id: OrderId,
    pub eta: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchEvent {
    Created { order_id: OrderId, eta: Time },
    /// Every order whose ETA moved during one operation, in dispatch order.
    EtasUpdated { updates: Vec<EtaUpdate> },
    Delivered { order_id: OrderId, at: Time },
    Canceled { order_id: OrderId },
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEvent::Created { order_id, eta } => {
                write!(f, "Order {order_id} has been created - ETA: {eta}")
            }
            DispatchEvent::EtasUpdated { updates } => {
                f.write_str("Updated ETAs: [")?;
                for (idx, update) in updates.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", update.order_id, update.eta)?;
                }
                f.write_str("]")
            }
            DispatchEvent::Delivered { order_id, at } => {
                write!(f, "Order {order_id} has been delivered at time {at}")
            }
            DispatchEvent::Canceled { order_id } => write!(f, "Order {order_id} has been canceled"),
        }
    }
}
