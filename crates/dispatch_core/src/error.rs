use thiserror::Error;

use crate::order::OrderId;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Error, Debug)]
pub enum DispatchError {
    /// The order is not in the order index: delivered, canceled or never created.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The order is on the road and can no longer be changed.
    #[error("order {0} is out for delivery")]
    InDelivery(OrderId),

    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    /// An ETA or return time for the order does not fit in `Time`.
    #[error("scheduling order {0} overflows the time range")]
    TimeOverflow(OrderId),

    /// Unrecognized command text. Aborts a scripted run.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid dispatch parameters: {0}")]
    Config(#[from] serde_json::Error),
}
