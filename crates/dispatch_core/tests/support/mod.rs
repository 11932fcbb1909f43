#![allow(dead_code)]

pub mod workload;

use dispatch_core::{DispatchEngine, OrderRecord};

/// Every order still held by the engine, in dispatch order.
pub fn present_records(engine: &DispatchEngine) -> Vec<OrderRecord> {
    engine
        .priority_order()
        .into_iter()
        .map(|order_id| engine.query_single(order_id).expect("indexed order is present"))
        .collect()
}
