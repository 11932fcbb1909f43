//! Single-driver delivery dispatch simulation.
//!
//! [`DispatchEngine`] consumes order commands one at a time and keeps ETAs,
//! deliveries and the driver's hand-offs consistent after each of them. It is
//! built on [`OrderedMap`], an AVL tree used both as the order index and as
//! the priority index.

pub mod command;
pub mod engine;
pub mod error;
pub mod event;
pub mod order;
pub mod ordered_map;
pub mod params;
pub mod runner;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use command::Command;
pub use engine::DispatchEngine;
pub use error::{DispatchError, Result};
pub use event::{DispatchEvent, EtaUpdate};
pub use order::{OrderId, OrderRecord, PriorityKey, Time};
pub use ordered_map::OrderedMap;
pub use params::DispatchParams;
pub use runner::{run_script, ScriptOutput};
