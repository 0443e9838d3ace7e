use crate::config::Settings;
use crate::error::DeskError;
use crate::model::{Order, OrderCreate, OrderId};
use crate::services::{Catalog, Notification, Notifier, UserDirectory};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Per-request state, built inside the sub-scope of a single order request.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: u32,
    pub request: Rc<OrderCreate>,
}

/// Places orders against the catalog and confirms them to customers.
pub struct OrderBook {
    settings: Rc<Settings>,
    catalog: Rc<Catalog>,
    users: Rc<UserDirectory>,
    notifier: Rc<Notifier>,
    orders: RefCell<Vec<Order>>,
    next_id: Cell<u32>,
}

impl OrderBook {
    pub fn new(
        settings: Rc<Settings>,
        catalog: Rc<Catalog>,
        users: Rc<UserDirectory>,
        notifier: Rc<Notifier>,
    ) -> Self {
        Self {
            settings,
            catalog,
            users,
            notifier,
            orders: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Validates the request, reserves stock, queues a confirmation and
    /// records the order. A failed confirmation puts the stock back.
    pub fn place(&self, ctx: &RequestContext) -> Result<OrderId, DeskError> {
        let request = &ctx.request;
        debug!(request_id = ctx.request_id, ?request, "Placing order");

        if request.quantity == 0 || request.quantity > self.settings.max_quantity {
            warn!(request_id = ctx.request_id, quantity = request.quantity, "Rejected quantity");
            return Err(DeskError::InvalidQuantity(request.quantity));
        }
        let user = self.users.get(request.user_id)?;
        let unit_price = self.catalog.reserve_stock(request.product_id, request.quantity)?;

        let order = Order {
            id: OrderId(self.next_id.get() + 1),
            user_id: user.id,
            product_id: request.product_id,
            quantity: request.quantity,
            total: unit_price * f64::from(request.quantity),
        };
        let id = order.id;
        let confirmation = Notification {
            order_id: id,
            email: user.email,
            message: format!(
                "{} confirms {} x {} for {:.2}",
                self.settings.store_name, order.quantity, order.product_id, order.total
            ),
        };
        if let Err(e) = self.notifier.notify(confirmation) {
            warn!(request_id = ctx.request_id, error = %e, "Confirmation failed, releasing stock");
            self.catalog
                .release_stock(request.product_id, request.quantity)?;
            return Err(e);
        }

        self.next_id.set(id.0);
        info!(request_id = ctx.request_id, order_id = %id, total = order.total, "Order placed");
        self.orders.borrow_mut().push(order);
        Ok(id)
    }

    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.borrow().iter().find(|o| o.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProductCreate, UserCreate};
    use crate::services::Outbox;
    use kinit::Close;

    fn book(max_quantity: u32) -> (OrderBook, Rc<Notifier>, Outbox) {
        let outbox = Outbox::new();
        let notifier = Rc::new(Notifier::start(4, outbox.clone()).unwrap());
        let settings = Settings {
            max_quantity,
            ..Settings::default()
        };
        let book = OrderBook::new(
            Rc::new(settings),
            Rc::new(Catalog::new()),
            Rc::new(UserDirectory::new()),
            Rc::clone(&notifier),
        );
        (book, notifier, outbox)
    }

    fn request(quantity: u32, book: &OrderBook) -> RequestContext {
        let user_id = book.users.register(UserCreate {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        });
        let product_id = book
            .catalog
            .add_product(ProductCreate::new("Widget", 2.5, 10));
        RequestContext {
            request_id: 1,
            request: Rc::new(OrderCreate {
                user_id,
                product_id,
                quantity,
            }),
        }
    }

    #[test]
    fn place_records_order_and_notifies() {
        let (book, notifier, outbox) = book(5);
        let ctx = request(4, &book);

        let id = book.place(&ctx).unwrap();
        notifier.close().unwrap();

        let order = book.get(id).unwrap();
        assert_eq!(order.total, 10.0);
        assert_eq!(book.catalog.check_stock(order.product_id), Ok(6));
        let delivered = outbox.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(
            delivered[0].message,
            "Order Desk confirms 4 x product_1 for 10.00"
        );
    }

    #[test]
    fn failed_confirmation_returns_the_stock() {
        let (book, notifier, outbox) = book(5);
        let ctx = request(4, &book);
        notifier.close().unwrap();

        assert!(matches!(book.place(&ctx), Err(DeskError::Notification(_))));
        assert!(book.is_empty());
        assert_eq!(book.catalog.check_stock(ctx.request.product_id), Ok(10));
        assert!(outbox.delivered().is_empty());
    }

    #[test]
    fn order_ids_are_only_used_by_placed_orders() {
        let (book, notifier, _) = book(5);
        let first = request(1, &book);
        let rejected = request(6, &book);

        assert_eq!(book.place(&first), Ok(OrderId(1)));
        assert!(book.place(&rejected).is_err());
        assert_eq!(book.place(&first), Ok(OrderId(2)));
        assert_eq!(book.len(), 2);
        notifier.close().unwrap();
    }

    #[test]
    fn quantity_limits_are_enforced() {
        let (book, notifier, _) = book(5);
        let ctx = request(6, &book);
        assert_eq!(book.place(&ctx), Err(DeskError::InvalidQuantity(6)));
        assert!(book.is_empty());
        notifier.close().unwrap();
    }
}
