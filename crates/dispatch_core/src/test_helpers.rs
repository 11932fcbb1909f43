//! Shared fixtures for tests and benchmarks.

use crate::engine::DispatchEngine;
use crate::order::{OrderId, Time};
use crate::runner::run_script;

/// A short run that exercises creation, delivery, ETA shifts, cancellation,
/// rank and the final drain.
pub const SAMPLE_SCRIPT: &[&str] = &[
    "createOrder(101, 2, 300, 4)",
    "createOrder(102, 3, 600, 3)",
    "print(101)",
    "createOrder(103, 7, 200, 2)",
    "createOrder(104, 8, 500, 3)",
    "cancelOrder(102, 9)",
    "createOrder(105, 10, 300, 4)",
    "getRankOfOrder(105)",
    "Quit()",
];

/// Expected output of [`SAMPLE_SCRIPT`].
pub const SAMPLE_OUTPUT: &[&str] = &[
    "Order 101 has been created - ETA: 6",
    "Order 102 has been created - ETA: 13",
    "[101,2,300,4,6]",
    "Order 103 has been created - ETA: 18",
    "Order 101 has been delivered at time 6",
    "Order 104 has been created - ETA: 19",
    "Updated ETAs: [103:24]",
    "Order 102 has been canceled",
    "Updated ETAs: [104:13,103:18]",
    "Order 105 has been created - ETA: 24",
    "Order 105 will be delivered after 2 orders.",
    "Order 104 has been delivered at time 13",
    "Order 103 has been delivered at time 18",
    "Order 105 has been delivered at time 24",
];

/// Run `script` on a fresh engine and return its output lines.
///
/// # Panics
///
/// Panics if the script contains an invalid command.
pub fn run_lines(script: &[&str]) -> Vec<String> {
    let mut engine = DispatchEngine::new();
    run_script(&mut engine, script.iter().copied())
        .expect("script should only contain valid commands")
        .lines
}

/// Build an engine by creating orders `(order_id, creation_time, order_value, delivery_time)`
/// in sequence.
///
/// # Panics
///
/// Panics if an order id repeats.
pub fn engine_with_orders(orders: &[(OrderId, Time, u64, Time)]) -> DispatchEngine {
    let mut engine = DispatchEngine::new();
    for &(order_id, creation_time, order_value, delivery_time) in orders {
        engine
            .create_order(order_id, creation_time, order_value, delivery_time)
            .expect("order ids should be unique");
    }
    engine
}
