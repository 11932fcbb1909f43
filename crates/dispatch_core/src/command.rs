//! Textual commands (`createOrder(1, 2, 300, 4)`) and the output lines each
//! one produces against an engine.

use std::str::FromStr;

use crate::engine::DispatchEngine;
use crate::error::{DispatchError, Result};
use crate::event::DispatchEvent;
use crate::order::{OrderId, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CreateOrder {
        order_id: OrderId,
        creation_time: Time,
        order_value: u64,
        delivery_time: Time,
    },
    CancelOrder {
        order_id: OrderId,
        current_time: Time,
    },
    UpdateTime {
        order_id: OrderId,
        current_time: Time,
        new_delivery_time: Time,
    },
    PrintOrder {
        order_id: OrderId,
    },
    PrintRange {
        from: Time,
        to: Time,
    },
    GetRankOfOrder {
        order_id: OrderId,
    },
    /// Report every remaining order as delivered and end the run.
    Quit,
}

impl FromStr for Command {
    type Err = DispatchError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let invalid = || DispatchError::InvalidCommand(line.to_string());

        let (name, args_text) = match line.split_once('(') {
            Some((name, rest)) => (name.trim(), rest.strip_suffix(')').ok_or_else(invalid)?),
            None => (line, ""),
        };
        let args: Vec<&str> = if args_text.trim().is_empty() {
            Vec::new()
        } else {
            args_text.split(',').map(str::trim).collect()
        };

        let command = match (name, args.as_slice()) {
            ("createOrder", [order_id, creation_time, order_value, delivery_time]) => {
                Command::CreateOrder {
                    order_id: parse_arg(order_id, line)?,
                    creation_time: parse_arg(creation_time, line)?,
                    order_value: parse_arg(order_value, line)?,
                    delivery_time: parse_arg(delivery_time, line)?,
                }
            }
            ("cancelOrder", [order_id, current_time]) => Command::CancelOrder {
                order_id: parse_arg(order_id, line)?,
                current_time: parse_arg(current_time, line)?,
            },
            ("updateTime", [order_id, current_time, new_delivery_time]) => Command::UpdateTime {
                order_id: parse_arg(order_id, line)?,
                current_time: parse_arg(current_time, line)?,
                new_delivery_time: parse_arg(new_delivery_time, line)?,
            },
            ("print", [order_id]) => Command::PrintOrder {
                order_id: parse_arg(order_id, line)?,
            },
            ("print", [from, to]) => Command::PrintRange {
                from: parse_arg(from, line)?,
                to: parse_arg(to, line)?,
            },
            ("getRankOfOrder", [order_id]) => Command::GetRankOfOrder {
                order_id: parse_arg(order_id, line)?,
            },
            ("Quit", []) => Command::Quit,
            _ => return Err(invalid()),
        };
        Ok(command)
    }
}

fn parse_arg<T: FromStr>(text: &str, line: &str) -> Result<T> {
    text.parse()
        .map_err(|_| DispatchError::InvalidCommand(line.to_string()))
}

impl Command {
    /// Run the command and render its output lines.
    ///
    /// Missing or in-flight orders become user-facing messages; only errors
    /// outside those two kinds are returned.
    pub fn apply(&self, engine: &mut DispatchEngine) -> Result<Vec<String>> {
        match *self {
            Command::CreateOrder {
                order_id,
                creation_time,
                order_value,
                delivery_time,
            } => match engine.create_order(order_id, creation_time, order_value, delivery_time) {
                Ok(events) => Ok(render(events)),
                Err(DispatchError::DuplicateOrder(id)) => {
                    Ok(vec![format!("Order {id} already exists")])
                }
                Err(error) => Err(error),
            },
            Command::CancelOrder {
                order_id,
                current_time,
            } => match engine.cancel_order(order_id, current_time) {
                Ok(events) => Ok(render(events)),
                Err(DispatchError::NotFound(id)) => Ok(vec![format!(
                    "Cannot cancel. Order {id} has already been delivered."
                )]),
                Err(DispatchError::InDelivery(id)) => {
                    Ok(vec![format!("Order {id} is out for delivery")])
                }
                Err(error) => Err(error),
            },
            Command::UpdateTime {
                order_id,
                current_time,
                new_delivery_time,
            } => match engine.update_delivery_time(order_id, current_time, new_delivery_time) {
                Ok(events) => Ok(render(events)),
                Err(DispatchError::NotFound(id)) => {
                    Ok(vec![format!("Order {id} has already been delivered")])
                }
                Err(DispatchError::InDelivery(id)) => {
                    Ok(vec![format!("Order {id} is out for delivery")])
                }
                Err(error) => Err(error),
            },
            Command::PrintOrder { order_id } => match engine.query_single(order_id) {
                Ok(record) => Ok(vec![record.to_string()]),
                Err(DispatchError::NotFound(id)) => Ok(vec![format!("Order {id} not found")]),
                Err(error) => Err(error),
            },
            Command::PrintRange { from, to } => {
                let ids = engine.query_range(from, to);
                if ids.is_empty() {
                    return Ok(vec!["There are no orders in that time period".to_string()]);
                }
                let joined: Vec<String> = ids.iter().map(ToString::to_string).collect();
                Ok(vec![format!("[{}]", joined.join(","))])
            }
            Command::GetRankOfOrder { order_id } => Ok(engine
                .rank(order_id)
                .map(|ahead| format!("Order {order_id} will be delivered after {ahead} orders."))
                .into_iter()
                .collect()),
            Command::Quit => Ok(render(engine.drain())),
        }
    }
}

fn render(events: Vec<DispatchEvent>) -> Vec<String> {
    events.iter().map(ToString::to_string).collect()
}
