//! Single-driver dispatch engine.
//!
//! Two ordered maps are kept in lockstep: `orders` (order id -> record) and
//! `by_priority` (priority key -> order id). An order exists in both or in
//! neither. Every public operation runs to completion, including ETA
//! recomputation and delivery checks, before it returns.
//!
//! Only the very first order skips the queue: it goes out for delivery the
//! moment it is created. Afterwards the driver takes the highest-priority
//! pending order whenever a new order arrives after the driver's return time.

mod eta;

use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::event::DispatchEvent;
use crate::order::{OrderId, OrderRecord, PriorityKey, Time};
use crate::ordered_map::OrderedMap;
use crate::params::DispatchParams;

#[derive(Debug, Clone)]
pub struct DispatchEngine {
    params: DispatchParams,
    orders: OrderedMap<OrderId, OrderRecord>,
    by_priority: OrderedMap<PriorityKey, OrderId>,
    current_time: Time,
    driver_return_time: Time,
    has_dispatched: bool,
    last_order_eta: Time,
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchEngine {
    pub fn new() -> Self {
        Self::with_params(DispatchParams::default())
    }

    pub fn with_params(params: DispatchParams) -> Self {
        Self {
            params,
            orders: OrderedMap::new(),
            by_priority: OrderedMap::new(),
            current_time: 0,
            driver_return_time: 0,
            has_dispatched: false,
            last_order_eta: 0,
        }
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    /// Creation time of the most recent order.
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn driver_return_time(&self) -> Time {
        self.driver_return_time
    }

    /// ETA of the order most recently handed to the driver.
    pub fn last_order_eta(&self) -> Time {
        self.last_order_eta
    }

    pub fn has_dispatched(&self) -> bool {
        self.has_dispatched
    }

    pub fn order_count(&self) -> usize {
        self.orders.count()
    }

    /// Orders waiting for the driver (excludes the one on the road).
    pub fn pending_count(&self) -> usize {
        self.orders.ascending().filter(|(_, r)| r.is_pending()).count()
    }

    /// Id of the order currently carried by the driver.
    pub fn out_for_delivery(&self) -> Option<OrderId> {
        self.orders
            .ascending()
            .find(|(_, record)| record.out_for_delivery)
            .map(|(order_id, _)| *order_id)
    }

    /// All orders in dispatch order (highest priority first).
    pub fn priority_order(&self) -> Vec<OrderId> {
        self.by_priority.descending().map(|(_, id)| *id).collect()
    }

    /// Registers a new order and advances the clock to `creation_time`.
    ///
    /// Emits the new order's ETA, then any ETA shifts of other pending
    /// orders, then deliveries that became due at the new time. An order
    /// whose ETA would overflow is rejected with `TimeOverflow` and leaves
    /// the engine unchanged.
    pub fn create_order(
        &mut self,
        order_id: OrderId,
        creation_time: Time,
        order_value: u64,
        delivery_time: Time,
    ) -> Result<Vec<DispatchEvent>> {
        if self.orders.contains_key(&order_id) {
            return Err(DispatchError::DuplicateOrder(order_id));
        }

        let priority = self.params.priority(order_value, creation_time);
        let mut record =
            OrderRecord::new(order_id, creation_time, order_value, delivery_time, priority);

        if !self.has_dispatched {
            let eta = eta::later(creation_time, delivery_time, order_id)?;
            let driver_return_time = eta::later(eta, delivery_time, order_id)?;
            record.eta = Some(eta);
            record.out_for_delivery = true;
            self.current_time = creation_time;
            self.has_dispatched = true;
            self.driver_return_time = driver_return_time;
            self.last_order_eta = eta;
            self.insert_record(record);
            debug!(
                order_id,
                eta,
                driver_return_time,
                "first order dispatched on creation"
            );
            return Ok(vec![DispatchEvent::Created { order_id, eta }]);
        }

        let key = record.priority_key();
        self.insert_record(record);
        let mut events = match self.reschedule(Some(order_id)) {
            Ok(events) => events,
            Err(error) => {
                self.remove_record(order_id, &key);
                return Err(error);
            }
        };
        self.current_time = creation_time;
        debug!(order_id, priority, now = creation_time, "order queued");

        events.extend(self.deliver_due_orders());
        if self.current_time > self.driver_return_time {
            self.dispatch_next();
        }
        Ok(events)
    }

    /// Drops a pending order and recomputes the ETAs of the rest.
    ///
    /// `current_time` is informational; cancellation does not move the clock.
    pub fn cancel_order(
        &mut self,
        order_id: OrderId,
        current_time: Time,
    ) -> Result<Vec<DispatchEvent>> {
        let key = self.mutable_record(order_id)?.priority_key();
        self.remove_record(order_id, &key);
        debug!(order_id, at = current_time, "order canceled");

        let mut events = vec![DispatchEvent::Canceled { order_id }];
        events.extend(self.reschedule(None)?);
        Ok(events)
    }

    /// Changes a pending order's delivery time and shifts the orders queued
    /// behind it. Emits at most one aggregated ETA update.
    pub fn update_delivery_time(
        &mut self,
        order_id: OrderId,
        current_time: Time,
        new_delivery_time: Time,
    ) -> Result<Vec<DispatchEvent>> {
        self.mutable_record(order_id)?;
        debug!(order_id, new_delivery_time, at = current_time, "delivery time changed");

        let updates = self.cascade_delivery_time(order_id, new_delivery_time)?;
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![DispatchEvent::EtasUpdated { updates }])
    }

    pub fn query_single(&self, order_id: OrderId) -> Result<OrderRecord> {
        self.orders
            .lookup(&order_id)
            .cloned()
            .ok_or(DispatchError::NotFound(order_id))
    }

    /// Ids of orders whose ETA falls in `[from, to]`, in dispatch order.
    pub fn query_range(&self, from: Time, to: Time) -> Vec<OrderId> {
        self.records_by_priority()
            .filter(|record| record.eta.is_some_and(|eta| from <= eta && eta <= to))
            .map(|record| record.order_id)
            .collect()
    }

    /// Number of orders ahead of `order_id` in dispatch order.
    pub fn rank(&self, order_id: OrderId) -> Option<usize> {
        self.by_priority
            .descending()
            .position(|(_, id)| *id == order_id)
    }

    /// Reports every remaining order as delivered at its current ETA without
    /// touching engine state.
    pub fn drain(&self) -> Vec<DispatchEvent> {
        self.records_by_priority()
            .filter_map(|record| {
                record.eta.map(|at| DispatchEvent::Delivered {
                    order_id: record.order_id,
                    at,
                })
            })
            .collect()
    }

    fn mutable_record(&self, order_id: OrderId) -> Result<&OrderRecord> {
        let record = self
            .orders
            .lookup(&order_id)
            .ok_or(DispatchError::NotFound(order_id))?;
        if record.out_for_delivery {
            return Err(DispatchError::InDelivery(order_id));
        }
        Ok(record)
    }

    fn records_by_priority(&self) -> impl Iterator<Item = &OrderRecord> + '_ {
        self.by_priority
            .descending()
            .filter_map(move |(_, id)| self.orders.lookup(id))
    }

    fn insert_record(&mut self, record: OrderRecord) {
        self.by_priority.insert(record.priority_key(), record.order_id);
        self.orders.insert(record.order_id, record);
    }

    fn remove_record(&mut self, order_id: OrderId, key: &PriorityKey) {
        self.by_priority.delete(key);
        self.orders.delete(&order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EtaUpdate;

    fn created(order_id: OrderId, eta: Time) -> DispatchEvent {
        DispatchEvent::Created { order_id, eta }
    }

    fn delivered(order_id: OrderId, at: Time) -> DispatchEvent {
        DispatchEvent::Delivered { order_id, at }
    }

    fn updated(pairs: &[(OrderId, Time)]) -> DispatchEvent {
        DispatchEvent::EtasUpdated {
            updates: pairs
                .iter()
                .map(|&(order_id, eta)| EtaUpdate { order_id, eta })
                .collect(),
        }
    }

    fn engine_with_two_orders() -> DispatchEngine {
        let mut engine = DispatchEngine::new();
        engine.create_order(101, 2, 300, 4).expect("create 101");
        engine.create_order(102, 3, 600, 3).expect("create 102");
        engine
    }

    #[test]
    fn first_order_is_dispatched_on_creation() {
        let mut engine = DispatchEngine::new();

        let events = engine.create_order(101, 2, 300, 4).expect("create");

        assert_eq!(events, vec![created(101, 6)]);
        assert_eq!(engine.driver_return_time(), 10);
        assert_eq!(engine.last_order_eta(), 6);
        assert_eq!(engine.out_for_delivery(), Some(101));
        let record = engine.query_single(101).expect("present");
        assert_eq!(record.eta, Some(6));
        assert!(record.out_for_delivery);
    }

    #[test]
    fn second_order_waits_for_driver_return() {
        let mut engine = DispatchEngine::new();
        engine.create_order(101, 2, 300, 4).expect("create 101");

        let events = engine.create_order(102, 3, 600, 3).expect("create 102");

        assert_eq!(events, vec![created(102, 13)]);
        let record = engine.query_single(102).expect("present");
        assert_eq!(record.priority(), 1.5);
        assert!(!record.out_for_delivery);
        assert_eq!(engine.out_for_delivery(), Some(101));
        assert_eq!(engine.driver_return_time(), 10);
        assert_eq!(engine.current_time(), 3);
    }

    #[test]
    fn new_higher_priority_order_shifts_later_etas() {
        let mut engine = engine_with_two_orders();
        engine.create_order(103, 7, 200, 2).expect("create 103");

        let events = engine.create_order(104, 8, 500, 3).expect("create 104");

        assert_eq!(events, vec![created(104, 19), updated(&[(103, 24)])]);
    }

    #[test]
    fn due_orders_are_delivered_after_reschedule() {
        let mut engine = engine_with_two_orders();

        let events = engine.create_order(103, 7, 200, 2).expect("create 103");

        assert_eq!(events, vec![created(103, 18), delivered(101, 6)]);
        assert_eq!(engine.order_count(), 2);
        assert!(engine.query_single(101).is_err());
    }

    #[test]
    fn delivery_requires_eta_strictly_before_now() {
        let mut engine = DispatchEngine::new();
        engine.create_order(1, 0, 50, 5).expect("create 1");

        let events = engine.create_order(2, 5, 50, 1).expect("create 2");
        assert_eq!(events, vec![created(2, 11)]);
        assert!(engine.query_single(1).is_ok());

        let events = engine.create_order(3, 6, 50, 1).expect("create 3");
        assert_eq!(events, vec![created(3, 13), delivered(1, 5)]);
    }

    #[test]
    fn cancel_out_for_delivery_order_is_rejected() {
        let mut engine = engine_with_two_orders();

        let error = engine.cancel_order(101, 4).expect_err("on the road");

        assert!(matches!(error, DispatchError::InDelivery(101)));
        assert_eq!(engine.order_count(), 2);
        assert_eq!(engine.priority_order(), vec![102, 101]);
    }

    #[test]
    fn cancel_missing_order_is_not_found() {
        let mut engine = engine_with_two_orders();
        let error = engine.cancel_order(999, 4).expect_err("missing");
        assert!(matches!(error, DispatchError::NotFound(999)));
    }

    #[test]
    fn cancel_reschedules_remaining_orders() {
        let mut engine = engine_with_two_orders();
        engine.create_order(103, 7, 200, 2).expect("create 103");
        engine.create_order(104, 8, 500, 3).expect("create 104");

        let events = engine.cancel_order(102, 9).expect("cancel");

        assert_eq!(
            events,
            vec![
                DispatchEvent::Canceled { order_id: 102 },
                updated(&[(104, 13), (103, 18)]),
            ]
        );
        assert_eq!(engine.current_time(), 8);
    }

    #[test]
    fn dispatch_hands_highest_priority_pending_order_to_driver() {
        let mut engine = DispatchEngine::new();
        engine.create_order(1001, 1, 200, 3).expect("create");
        engine.create_order(1002, 3, 250, 6).expect("create");

        let events = engine.create_order(1003, 8, 100, 3).expect("create");

        assert_eq!(events, vec![created(1003, 22), delivered(1001, 4)]);
        assert_eq!(engine.out_for_delivery(), Some(1002));
        assert_eq!(engine.driver_return_time(), 19);
        assert_eq!(engine.last_order_eta(), 13);
    }

    #[test]
    fn update_cascades_forward_only() {
        let mut engine = DispatchEngine::new();
        engine.create_order(1001, 1, 200, 3).expect("create");
        engine.create_order(1002, 3, 250, 6).expect("create");
        engine.create_order(1003, 8, 100, 3).expect("create");
        engine.create_order(1004, 13, 100, 5).expect("create");

        let events = engine.update_delivery_time(1003, 15, 1).expect("update");

        assert_eq!(events, vec![updated(&[(1003, 20), (1004, 26)])]);
        assert_eq!(engine.query_single(1002).expect("present").eta, Some(13));
        assert_eq!(engine.query_single(1003).expect("present").delivery_time, 1);
    }

    #[test]
    fn update_without_eta_change_emits_nothing() {
        let mut engine = engine_with_two_orders();
        engine.create_order(103, 7, 200, 2).expect("create 103");

        let events = engine.update_delivery_time(103, 8, 2).expect("update");

        assert!(events.is_empty());
        assert_eq!(engine.query_single(103).expect("present").eta, Some(18));
    }

    #[test]
    fn update_out_for_delivery_order_is_rejected() {
        let mut engine = engine_with_two_orders();
        let error = engine.update_delivery_time(101, 4, 9).expect_err("on the road");
        assert!(matches!(error, DispatchError::InDelivery(101)));
        assert_eq!(engine.query_single(101).expect("present").delivery_time, 4);
    }

    #[test]
    fn priority_survives_reschedule_and_cascade() {
        let mut engine = engine_with_two_orders();
        engine.create_order(103, 7, 200, 2).expect("create 103");
        let before = engine.query_single(103).expect("present").priority();

        engine.update_delivery_time(103, 8, 10).expect("update");
        engine.cancel_order(102, 8).expect("cancel");

        assert_eq!(engine.query_single(103).expect("present").priority(), before);
    }

    #[test]
    fn duplicate_create_is_rejected_without_side_effects() {
        let mut engine = engine_with_two_orders();
        let error = engine.create_order(102, 50, 10, 1).expect_err("duplicate");
        assert!(matches!(error, DispatchError::DuplicateOrder(102)));
        assert_eq!(engine.current_time(), 3);
        assert_eq!(engine.order_count(), 2);
    }

    #[test]
    fn overflowing_first_order_is_rejected() {
        let mut engine = DispatchEngine::new();

        let error = engine.create_order(1, Time::MAX, 1, 1).expect_err("overflow");

        assert!(matches!(error, DispatchError::TimeOverflow(1)));
        assert_eq!(engine.order_count(), 0);
        assert!(!engine.has_dispatched());
        assert_eq!(engine.current_time(), 0);
        assert_eq!(engine.create_order(1, 2, 300, 4).expect("retry"), vec![created(1, 6)]);
    }

    #[test]
    fn overflowing_queued_order_is_rolled_back() {
        let mut engine = engine_with_two_orders();

        let error = engine
            .create_order(103, Time::MAX - 1, 100, 5)
            .expect_err("overflow");

        assert!(matches!(error, DispatchError::TimeOverflow(103)));
        assert_eq!(engine.order_count(), 2);
        assert_eq!(engine.priority_order(), vec![102, 101]);
        assert_eq!(engine.current_time(), 3);
        assert_eq!(engine.query_single(102).expect("present").eta, Some(13));
    }

    #[test]
    fn overflowing_delivery_time_update_changes_nothing() {
        let mut engine = engine_with_two_orders();

        let error = engine
            .update_delivery_time(102, 4, Time::MAX)
            .expect_err("overflow");

        assert!(matches!(error, DispatchError::TimeOverflow(102)));
        let record = engine.query_single(102).expect("present");
        assert_eq!(record.delivery_time, 3);
        assert_eq!(record.eta, Some(13));
    }

    #[test]
    fn equal_priorities_do_not_collapse() {
        let mut engine = engine_with_two_orders();
        engine.create_order(201, 4, 100, 1).expect("create");
        engine.create_order(200, 4, 100, 1).expect("create");

        assert_eq!(engine.order_count(), 4);
        let order = engine.priority_order();
        let first = order.iter().position(|id| *id == 200);
        let second = order.iter().position(|id| *id == 201);
        assert!(first < second);
    }

    #[test]
    fn range_and_rank_follow_dispatch_order() {
        let engine = engine_with_two_orders();

        assert_eq!(engine.query_range(0, 20), vec![102, 101]);
        assert_eq!(engine.query_range(7, 12), Vec::<OrderId>::new());
        assert_eq!(engine.rank(102), Some(0));
        assert_eq!(engine.rank(101), Some(1));
        assert_eq!(engine.rank(555), None);
    }

    #[test]
    fn drain_is_repeatable() {
        let engine = engine_with_two_orders();

        let first = engine.drain();
        let second = engine.drain();

        assert_eq!(first, vec![delivered(102, 13), delivered(101, 6)]);
        assert_eq!(first, second);
        assert_eq!(engine.order_count(), 2);
    }
}
