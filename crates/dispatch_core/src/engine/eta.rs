//! ETA bookkeeping: full reschedule, forward cascade, due deliveries and the
//! hand-off of the next order to the driver.

use tracing::{debug, trace};

use super::DispatchEngine;
use crate::error::{DispatchError, Result};
use crate::event::{DispatchEvent, EtaUpdate};
use crate::order::{OrderId, PriorityKey, Time};

impl DispatchEngine {
    /// Recompute the ETA of every pending order in dispatch order, chaining
    /// each one behind the previous order's return (the first one behind the
    /// driver's return).
    ///
    /// With a trigger, its ETA is reported as a creation. Other orders whose
    /// ETA moved are reported together, trigger excluded. Nothing is written
    /// if any ETA in the chain overflows.
    pub(super) fn reschedule(&mut self, trigger: Option<OrderId>) -> Result<Vec<DispatchEvent>> {
        let mut previous: Vec<(OrderId, Option<Time>)> = Vec::new();
        let mut planned: Vec<(OrderId, Time)> = Vec::new();
        let mut ready = self.driver_return_time;
        for record in self.records_by_priority().filter(|record| record.is_pending()) {
            let order_id = record.order_id;
            let eta = later(record.creation_time.max(ready), record.delivery_time, order_id)?;
            ready = later(eta, record.delivery_time, order_id)?;
            previous.push((order_id, record.eta));
            planned.push((order_id, eta));
        }

        for (order_id, eta) in planned {
            let Some(mut record) = self.orders.lookup(&order_id).cloned() else {
                continue;
            };
            trace!(order_id, eta, "eta recomputed");
            record.eta = Some(eta);
            self.orders.update(&order_id, record);
        }

        let mut events = Vec::new();
        if let Some(order_id) = trigger {
            if let Some(eta) = self.eta_of(order_id) {
                events.push(DispatchEvent::Created { order_id, eta });
            }
        }

        let updates: Vec<EtaUpdate> = previous
            .iter()
            .filter(|(order_id, _)| Some(*order_id) != trigger)
            .filter_map(|(order_id, old)| self.changed_eta(*order_id, *old))
            .collect();
        if !updates.is_empty() {
            events.push(DispatchEvent::EtasUpdated { updates });
        }
        Ok(events)
    }

    /// Apply a new delivery time to `order_id` and push the change through
    /// the pending orders behind it in dispatch order. Orders ahead of it keep
    /// their ETAs; orders behind it are chained without regard to creation
    /// time. The order on the road is never touched.
    ///
    /// Returns every ETA that changed, the target's included. Nothing is
    /// written if any ETA in the chain overflows.
    pub(super) fn cascade_delivery_time(
        &mut self,
        order_id: OrderId,
        new_delivery_time: Time,
    ) -> Result<Vec<EtaUpdate>> {
        let pending: Vec<(OrderId, Option<Time>, Time)> = self
            .records_by_priority()
            .filter(|record| record.is_pending())
            .map(|record| (record.order_id, record.eta, record.delivery_time))
            .collect();
        let Some(start) = pending.iter().position(|(id, ..)| *id == order_id) else {
            return Ok(Vec::new());
        };

        let mut planned: Vec<(OrderId, Option<Time>)> = Vec::new();
        let mut prior_return: Option<Time> = None;
        for &(id, eta, delivery_time) in &pending[start..] {
            let (eta, delivery_time) = if id == order_id {
                let shift = new_delivery_time
                    .checked_sub(delivery_time)
                    .ok_or(DispatchError::TimeOverflow(id))?;
                let eta = eta.map(|eta| later(eta, shift, id)).transpose()?;
                (eta, new_delivery_time)
            } else {
                let eta = prior_return
                    .map(|ready| later(ready, delivery_time, id))
                    .transpose()?;
                (eta, delivery_time)
            };
            prior_return = eta.map(|eta| later(eta, delivery_time, id)).transpose()?;
            planned.push((id, eta));
        }

        for (id, eta) in planned {
            let Some(mut record) = self.orders.lookup(&id).cloned() else {
                continue;
            };
            if id == order_id {
                record.delivery_time = new_delivery_time;
            }
            record.eta = eta;
            trace!(order_id = id, eta = ?eta, "eta cascaded");
            self.orders.update(&id, record);
        }

        Ok(pending
            .iter()
            .filter_map(|(id, old, _)| self.changed_eta(*id, *old))
            .collect())
    }

    /// Deliver, in dispatch order, every order whose ETA is strictly before
    /// the current time.
    pub(super) fn deliver_due_orders(&mut self) -> Vec<DispatchEvent> {
        let now = self.current_time;
        let due: Vec<(OrderId, PriorityKey, Time)> = self
            .records_by_priority()
            .filter_map(|record| {
                record
                    .eta
                    .filter(|eta| *eta < now)
                    .map(|eta| (record.order_id, record.priority_key(), eta))
            })
            .collect();

        due.into_iter()
            .map(|(order_id, key, at)| {
                self.remove_record(order_id, &key);
                debug!(order_id, at, now, "order delivered");
                DispatchEvent::Delivered { order_id, at }
            })
            .collect()
    }

    /// Send the highest-priority pending order out with the driver.
    pub(super) fn dispatch_next(&mut self) {
        let Some(mut record) = self
            .records_by_priority()
            .find(|record| record.is_pending())
            .cloned()
        else {
            return;
        };
        let (Some(eta), Some(driver_return_time)) = (record.eta, record.return_time()) else {
            return;
        };

        let order_id = record.order_id;
        record.out_for_delivery = true;
        self.driver_return_time = driver_return_time;
        self.last_order_eta = eta;
        self.orders.update(&order_id, record);
        debug!(
            order_id,
            eta,
            driver_return_time = self.driver_return_time,
            "order out for delivery"
        );
    }

    fn eta_of(&self, order_id: OrderId) -> Option<Time> {
        self.orders.lookup(&order_id).and_then(|record| record.eta)
    }

    fn changed_eta(&self, order_id: OrderId, old: Option<Time>) -> Option<EtaUpdate> {
        let eta = self.eta_of(order_id)?;
        (Some(eta) != old).then_some(EtaUpdate { order_id, eta })
    }
}

/// `time + delay`, or `TimeOverflow` for `order_id` when it leaves the
/// representable range.
pub(super) fn later(time: Time, delay: Time, order_id: OrderId) -> Result<Time> {
    time.checked_add(delay)
        .ok_or(DispatchError::TimeOverflow(order_id))
}
