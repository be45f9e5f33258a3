//! OrderManager - checkout and status transitions
//!
//! # Transition flow
//!
//! ```text
//! transition(order_id, requested, actor, command_id?)
//!     ├─ 1. Begin write transaction (serialized by redb)
//!     ├─ 2. Load order, authorize actor (own seller or admin)
//!     ├─ 3. Idempotency check (command_id, bound to this order) →
//!     │      replay returns stored order
//!     ├─ 4. Validate transition against the CURRENT status
//!     ├─ 5. Persist new status + updated_at
//!     ├─ 6. Persist one buyer notification (same transaction)
//!     ├─ 7. Mark command processed
//!     └─ 8. Commit
//! ```
//!
//! Because validation and the write share one transaction, two racing
//! transitions are applied in storage order and the loser is re-checked
//! against the winner's committed status, not a stale precondition.

use crate::common::{AppError, AppResult};
use crate::notifications::NotificationDispatcher;
use crate::pricing;
use crate::storage::{MarketStorage, StorageError};
use chrono::Utc;
use shared::{
    CheckoutRequest, Order, OrderLine, OrderStatus, ShippingSettings, UserRef, UserType,
};

/// Order lifecycle service
#[derive(Debug, Clone)]
pub struct OrderManager {
    storage: MarketStorage,
    dispatcher: NotificationDispatcher,
}

impl OrderManager {
    pub fn new(storage: MarketStorage, dispatcher: NotificationDispatcher) -> Self {
        Self {
            storage,
            dispatcher,
        }
    }

    /// Shipping settings currently in force (shared configuration)
    fn current_settings(&self) -> AppResult<ShippingSettings> {
        Ok(self
            .storage
            .get_shipping_settings()?
            .unwrap_or_default())
    }

    /// Create an order from a checkout submission
    ///
    /// Prices the cart with the settings in force right now, persists
    /// the order as `pending` and returns it. Emits **no** notification:
    /// notifications fire only on subsequent transitions. An empty cart
    /// or zero quantity is rejected before anything is written, so the
    /// UI can bounce the buyer back to the cart view.
    pub fn checkout(&self, buyer_id: &str, request: CheckoutRequest) -> AppResult<Order> {
        let settings = self.current_settings()?;
        let totals = pricing::compute_totals(&request.lines, &request.delivery, &settings)?;

        let now = Utc::now();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            buyer_id: buyer_id.to_string(),
            seller_id: request.seller_id,
            lines: request
                .lines
                .iter()
                .map(|l| OrderLine {
                    product_id: l.product_id.clone(),
                    name: l.name.clone(),
                    unit_price: l.effective_unit_price(),
                    quantity: l.quantity,
                })
                .collect(),
            delivery: request.delivery,
            subtotal: totals.subtotal,
            shipping_cost: totals.shipping_cost,
            total_amount: totals.total,
            status: OrderStatus::Pending,
            payment_method: request.payment_method,
            ordered_date: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            total = order.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// Move an order to a new status
    ///
    /// Only the order's own seller or an admin may transition; a buyer
    /// never does, even for an otherwise legal pair. Success persists
    /// the new status and one buyer notification atomically.
    pub fn transition(
        &self,
        order_id: &str,
        requested: OrderStatus,
        actor: &UserRef,
        command_id: Option<&str>,
    ) -> AppResult<Order> {
        let txn = self.storage.begin_write()?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

        self.authorize_transition(&order, actor)?;

        // Replayed token: acknowledge with the stored order, mutate and
        // notify nothing. A token replays only against the order it was
        // recorded for; authorization above runs on every attempt.
        if let Some(cid) = command_id
            && let Some(payload) = self.storage.get_processed_command(&txn, cid)?
        {
            if payload != order.id.as_bytes() {
                return Err(AppError::validation(format!(
                    "Command {cid} was recorded against a different order"
                )));
            }
            tracing::info!(order_id, command_id = cid, "Transition replay acknowledged");
            return Ok(order);
        }

        if !order.status.can_transition_to(requested) {
            return Err(AppError::illegal_transition(format!(
                "Cannot move order {} from {} to {}",
                order.id, order.status, requested
            )));
        }

        order.status = requested;
        order.updated_at = Utc::now();
        self.storage.put_order(&txn, &order)?;

        // The buyer learns about every transition via their badge.
        let buyer = UserRef::new(order.buyer_id.clone(), UserType::Buyer);
        self.dispatcher.notify(
            &txn,
            &buyer,
            "Mise à jour de votre commande",
            format!("Votre commande est maintenant : {}", requested.label_fr()),
            Some(format!("/orders/{}", order.id)),
        )?;

        if let Some(cid) = command_id {
            self.storage
                .mark_command_processed(&txn, cid, order.id.as_bytes())?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            actor = %actor.storage_key(),
            "Order transitioned"
        );
        Ok(order)
    }

    /// Fetch one order, scoped to the caller
    ///
    /// A buyer sees only their own orders, a seller only theirs; a
    /// foreign order answers exactly like a missing one.
    pub fn get(&self, order_id: &str, actor: &UserRef) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

        let visible = match actor.user_type {
            UserType::Buyer => order.buyer_id == actor.user_id,
            UserType::Seller => order.seller_id == actor.user_id,
            UserType::Admin | UserType::SuperAdmin => true,
        };
        if !visible {
            return Err(AppError::not_found(format!("Order {order_id} not found")));
        }
        Ok(order)
    }

    /// Role-scoped listing, newest first
    ///
    /// Buyers may only ask for their own `buyer_id`, sellers for their
    /// own `seller_id`; admins may filter freely.
    pub fn list(
        &self,
        actor: &UserRef,
        buyer_id: Option<&str>,
        seller_id: Option<&str>,
    ) -> AppResult<Vec<Order>> {
        let (buyer_filter, seller_filter) = match actor.user_type {
            UserType::Buyer => {
                if buyer_id.is_some_and(|id| id != actor.user_id) {
                    return Err(AppError::permission_denied(
                        "Buyers may only list their own orders",
                    ));
                }
                (Some(actor.user_id.as_str()), None)
            }
            UserType::Seller => {
                if seller_id.is_some_and(|id| id != actor.user_id) {
                    return Err(AppError::permission_denied(
                        "Sellers may only list their own orders",
                    ));
                }
                (None, Some(actor.user_id.as_str()))
            }
            UserType::Admin | UserType::SuperAdmin => (buyer_id, seller_id),
        };

        let mut orders: Vec<Order> = self
            .storage
            .list_orders()?
            .into_iter()
            .filter(|o| buyer_filter.is_none_or(|id| o.buyer_id == id))
            .filter(|o| seller_filter.is_none_or(|id| o.seller_id == id))
            .collect();

        orders.sort_by(|a, b| b.ordered_date.cmp(&a.ordered_date).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    /// Transition authority: the order's own seller, or any admin.
    fn authorize_transition(&self, order: &Order, actor: &UserRef) -> AppResult<()> {
        match actor.user_type {
            UserType::Admin | UserType::SuperAdmin => Ok(()),
            UserType::Seller if order.seller_id == actor.user_id => Ok(()),
            // A foreign seller learns nothing about the order's existence.
            UserType::Seller => Err(AppError::not_found(format!(
                "Order {} not found",
                order.id
            ))),
            // Buyer-initiated cancellation is a support contact, never a
            // direct state mutation.
            UserType::Buyer => Err(AppError::permission_denied(
                "Buyers cannot change order status",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::ReadTracker;
    use shared::{CartLine, DeliverySelection};

    fn setup() -> (MarketStorage, OrderManager, ReadTracker) {
        let storage = MarketStorage::open_in_memory().unwrap();
        let dispatcher = NotificationDispatcher::new(storage.clone());
        let manager = OrderManager::new(storage.clone(), dispatcher);
        let tracker = ReadTracker::new(storage.clone());
        (storage, manager, tracker)
    }

    fn cart() -> Vec<CartLine> {
        vec![CartLine {
            product_id: "p-1".to_string(),
            name: "Tissu pagne".to_string(),
            unit_price: 10_000,
            promo_price: None,
            quantity: 2,
        }]
    }

    fn checkout_request() -> CheckoutRequest {
        CheckoutRequest {
            seller_id: "s-1".to_string(),
            lines: cart(),
            delivery: DeliverySelection::Home {
                address: "12 Rue des Manguiers".to_string(),
                city: "Douala".to_string(),
                region: "Littoral".to_string(),
            },
            payment_method: Some("mtnMoney".to_string()),
        }
    }

    fn buyer() -> UserRef {
        UserRef::new("b-1", UserType::Buyer)
    }

    fn seller() -> UserRef {
        UserRef::new("s-1", UserType::Seller)
    }

    fn admin() -> UserRef {
        UserRef::new("a-1", UserType::Admin)
    }

    #[test]
    fn checkout_creates_pending_order_without_notification() {
        let (_storage, manager, tracker) = setup();

        let order = manager.checkout("b-1", checkout_request()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, 20_000);
        assert_eq!(order.shipping_cost, 2_500);
        assert_eq!(order.total_amount, 22_500);
        assert_eq!(order.ordered_date, order.updated_at);

        // Creation is silent; only transitions notify.
        assert_eq!(tracker.unread_count(&buyer()).unwrap(), 0);
    }

    #[test]
    fn checkout_rejects_empty_cart() {
        let (_storage, manager, _tracker) = setup();
        let mut request = checkout_request();
        request.lines.clear();

        let err = manager.checkout("b-1", request).unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));
    }

    #[test]
    fn seller_transition_notifies_buyer_in_french() {
        let (_storage, manager, tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        let updated = manager
            .transition(&order.id, OrderStatus::Processing, &seller(), None)
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Processing);
        assert!(updated.updated_at >= order.updated_at);

        let notifications = tracker.list(&buyer()).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].body,
            "Votre commande est maintenant : En traitement"
        );
        assert_eq!(
            notifications[0].link.as_deref(),
            Some(format!("/orders/{}", order.id).as_str())
        );
    }

    #[test]
    fn scenario_c_illegal_jump_leaves_status_intact() {
        // pending → processing succeeds with one notification; then a
        // direct jump to delivered fails and status stays processing.
        let (_storage, manager, tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        manager
            .transition(&order.id, OrderStatus::Processing, &seller(), None)
            .unwrap();
        assert_eq!(tracker.unread_count(&buyer()).unwrap(), 1);

        let err = manager
            .transition(&order.id, OrderStatus::Delivered, &admin(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition(_)));

        let current = manager.get(&order.id, &admin()).unwrap();
        assert_eq!(current.status, OrderStatus::Processing);
        // The failed attempt emitted nothing.
        assert_eq!(tracker.unread_count(&buyer()).unwrap(), 1);
    }

    #[test]
    fn buyer_can_never_transition() {
        let (_storage, manager, _tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        // Legal pair, wrong role.
        let err = manager
            .transition(&order.id, OrderStatus::Processing, &buyer(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let current = manager.get(&order.id, &buyer()).unwrap();
        assert_eq!(current.status, OrderStatus::Pending);
    }

    #[test]
    fn foreign_seller_sees_not_found() {
        let (_storage, manager, _tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        let other_seller = UserRef::new("s-2", UserType::Seller);
        let err = manager
            .transition(&order.id, OrderStatus::Processing, &other_seller, None)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = manager.get(&order.id, &other_seller).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn terminal_states_reject_every_actor() {
        let (_storage, manager, _tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();
        manager
            .transition(&order.id, OrderStatus::Cancelled, &seller(), None)
            .unwrap();

        for requested in OrderStatus::ALL {
            let err = manager
                .transition(&order.id, requested, &admin(), None)
                .unwrap_err();
            assert!(matches!(err, AppError::IllegalTransition(_)));
        }
    }

    #[test]
    fn transition_retry_with_same_command_id_is_idempotent() {
        let (_storage, manager, tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        let first = manager
            .transition(&order.id, OrderStatus::Processing, &seller(), Some("cmd-7"))
            .unwrap();
        // Client retry after a lost response.
        let replay = manager
            .transition(&order.id, OrderStatus::Processing, &seller(), Some("cmd-7"))
            .unwrap();

        assert_eq!(first.status, replay.status);
        assert_eq!(tracker.unread_count(&buyer()).unwrap(), 1);

        // A fresh token is a fresh attempt - and now an illegal one.
        let err = manager
            .transition(&order.id, OrderStatus::Processing, &seller(), Some("cmd-8"))
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition(_)));
    }

    #[test]
    fn replayed_token_never_bypasses_authorization() {
        let (_storage, manager, _tracker) = setup();
        let own = manager.checkout("b-1", checkout_request()).unwrap();
        let mut foreign_request = checkout_request();
        foreign_request.seller_id = "s-2".to_string();
        let foreign = manager.checkout("b-2", foreign_request).unwrap();

        manager
            .transition(&own.id, OrderStatus::Processing, &seller(), Some("cmd-a"))
            .unwrap();

        // The seller's own processed token opens no window into another
        // seller's order: the scope check answers before the replay.
        let err = manager
            .transition(&foreign.id, OrderStatus::Processing, &seller(), Some("cmd-a"))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // A buyer replaying a leaked token is still refused outright.
        let err = manager
            .transition(&own.id, OrderStatus::Processing, &buyer(), Some("cmd-a"))
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[test]
    fn replayed_token_is_bound_to_its_order() {
        let (_storage, manager, _tracker) = setup();
        let first = manager.checkout("b-1", checkout_request()).unwrap();
        let second = manager.checkout("b-1", checkout_request()).unwrap();

        manager
            .transition(&first.id, OrderStatus::Processing, &seller(), Some("cmd-b"))
            .unwrap();

        // Presenting the token against a different order of the same
        // seller acknowledges nothing and mutates nothing.
        let err = manager
            .transition(&second.id, OrderStatus::Processing, &seller(), Some("cmd-b"))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let current = manager.get(&second.id, &seller()).unwrap();
        assert_eq!(current.status, OrderStatus::Pending);
    }

    #[test]
    fn racing_transitions_serialize_and_loser_is_rejected() {
        let (_storage, manager, _tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();
        manager
            .transition(&order.id, OrderStatus::Processing, &seller(), None)
            .unwrap();

        // Two writers fight over `processing`: shipping and cancelling
        // are each legal from it, but neither is legal after the other.
        let (m1, m2) = (manager.clone(), manager.clone());
        let (id1, id2) = (order.id.clone(), order.id.clone());
        let ship = std::thread::spawn(move || {
            m1.transition(&id1, OrderStatus::Shipped, &seller(), None)
        });
        let cancel = std::thread::spawn(move || {
            m2.transition(&id2, OrderStatus::Cancelled, &seller(), None)
        });
        let results = [ship.join().unwrap(), cancel.join().unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(AppError::IllegalTransition(_))))
        );

        // The committed status is exactly the winner's.
        let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
        let current = manager.get(&order.id, &admin()).unwrap();
        assert_eq!(current.status, winner.status);
    }

    #[test]
    fn list_is_role_scoped() {
        let (_storage, manager, _tracker) = setup();
        manager.checkout("b-1", checkout_request()).unwrap();
        let mut other = checkout_request();
        other.seller_id = "s-2".to_string();
        manager.checkout("b-2", other).unwrap();

        assert_eq!(manager.list(&buyer(), None, None).unwrap().len(), 1);
        assert_eq!(manager.list(&seller(), None, None).unwrap().len(), 1);
        assert_eq!(manager.list(&admin(), None, None).unwrap().len(), 2);
        assert_eq!(
            manager.list(&admin(), Some("b-2"), None).unwrap().len(),
            1
        );

        // A buyer asking for someone else's history is refused outright.
        let err = manager.list(&buyer(), Some("b-2"), None).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[test]
    fn full_lifecycle_reaches_delivered() {
        let (_storage, manager, tracker) = setup();
        let order = manager.checkout("b-1", checkout_request()).unwrap();

        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            manager
                .transition(&order.id, status, &seller(), None)
                .unwrap();
        }

        let final_order = manager.get(&order.id, &buyer()).unwrap();
        assert_eq!(final_order.status, OrderStatus::Delivered);
        // One notification per transition, none for creation.
        assert_eq!(tracker.unread_count(&buyer()).unwrap(), 3);
    }
}
