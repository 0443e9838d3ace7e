//! # Wiring & Request Scopes
//!
//! This module is the only place that knows how the desk is assembled. The
//! services themselves take plain `Rc` dependencies; here they are registered
//! as constructors and processors so the container can build them on demand.
//!
//! ## Two Scopes
//!
//! A desk session is one [`Container::run`]. Long-lived services
//! ([`Settings`], [`Catalog`], [`UserDirectory`], [`Notifier`],
//! [`OrderBook`]) live in that run's arena.
//!
//! Every order is placed in a nested run started through the session's
//! [`Runtime`]:
//!
//! ```rust,ignore
//! runtime.run([
//!     injector(request),                       // the raw OrderCreate
//!     functor(|(ctx, book): (Rc<RequestContext>, Rc<OrderBook>)| ...),
//! ])
//! ```
//!
//! The nested arena reuses the session's `OrderBook` and builds a fresh
//! [`RequestContext`], which is torn down as soon as the request returns.
//!
//! ## Teardown Order
//!
//! `OrderBook` depends on `Notifier`, so it is destroyed first; the notifier
//! then drains its queue and stops its worker before `Settings` goes away.

use crate::config::Settings;
use crate::error::DeskError;
use crate::model::{OrderCreate, OrderId, ProductId, UserCreate};
use crate::services::{
    demo_products, Catalog, Notifier, OrderBook, Outbox, RequestContext, UserDirectory,
};
use kinit::{
    constructor, functor, injector, opener, processor, Container, Error, Functor, Inspector,
    Runtime, TypeKey,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, info_span, warn};

/// Registers every desk service on `container`.
pub fn wire(container: &Container, settings: Settings, outbox: Outbox) -> Result<(), Error> {
    container.provide(constructor(move |()| Ok(settings.clone())))?;
    container.attach(processor(|settings: &Settings, ()| {
        settings.validate().map_err(Error::from)
    }))?;

    container.provide(constructor(|()| Ok(Catalog::new())))?;
    container.attach(processor(
        |catalog: &Catalog, (settings,): (Rc<Settings>,)| {
            if settings.seed_catalog {
                for product in demo_products() {
                    catalog.add_product(product);
                }
            }
            Ok(())
        },
    ))?;

    container.provide(constructor(|()| Ok(UserDirectory::new())))?;

    container.provide(opener(move |(settings,): (Rc<Settings>,)| {
        Notifier::start(settings.notify_capacity, outbox.clone()).map_err(Error::from)
    }))?;

    container.provide(constructor(
        |(settings, catalog, users, notifier): (
            Rc<Settings>,
            Rc<Catalog>,
            Rc<UserDirectory>,
            Rc<Notifier>,
        )| Ok(OrderBook::new(settings, catalog, users, notifier)),
    ))?;

    let next_request = Arc::new(AtomicU32::new(1));
    container.provide(
        constructor(move |(request,): (Rc<OrderCreate>,)| {
            Ok(RequestContext {
                request_id: next_request.fetch_add(1, Ordering::Relaxed),
                request,
            })
        })
        .on_teardown(|ctx: &RequestContext| {
            info!(request_id = ctx.request_id, "Request closed");
            Ok(())
        }),
    )?;

    Ok(())
}

/// An inspector for a wired desk. Order requests are injected per request,
/// so they are ignored.
pub fn inspector() -> Result<Inspector, Error> {
    let mut inspector = Inspector::new();
    inspector
        .require(TypeKey::of::<OrderBook>())?
        .ignore(TypeKey::of::<OrderCreate>())?;
    Ok(inspector)
}

/// Places `request` in a sub-scope of `runtime`'s arena.
pub fn place_order(runtime: &Runtime, request: OrderCreate) -> Result<OrderId, Error> {
    let span = info_span!("place_order", user_id = %request.user_id, product_id = %request.product_id);
    let _entered = span.enter();

    let placed = Rc::new(Cell::new(None));
    let sink = Rc::clone(&placed);
    runtime.run([
        injector(request),
        functor(
            move |(ctx, book): (Rc<RequestContext>, Rc<OrderBook>)| {
                sink.set(Some(book.place(&ctx)?));
                Ok(())
            },
        ),
    ])?;
    placed
        .get()
        .ok_or_else(|| Error::Illegal("order request finished without an order".into()))
}

/// What one demo session did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub placed: Vec<OrderId>,
    pub rejected: Vec<String>,
}

/// The demo session: registers a customer and places two orders for each of
/// the first two catalog products. With the demo catalog the last one runs
/// out of stock.
pub fn demo_session(report: Rc<RefCell<SessionReport>>) -> Box<dyn Functor> {
    functor(
        move |(runtime, users, catalog, _book): (
            Rc<Runtime>,
            Rc<UserDirectory>,
            Rc<Catalog>,
            Rc<OrderBook>,
        )| {
            let user_id = users.register(UserCreate {
                name: "Alice".into(),
                email: "alice@example.com".into(),
            });
            let products: Vec<ProductId> =
                catalog.products().iter().take(2).map(|p| p.id).collect();
            if products.is_empty() {
                return Err(DeskError::Config("catalog is empty".into()).into());
            }

            for &product_id in products.iter().cycle().take(4) {
                let request = OrderCreate {
                    user_id,
                    product_id,
                    quantity: 2,
                };
                match place_order(&runtime, request) {
                    Ok(id) => report.borrow_mut().placed.push(id),
                    Err(e) if e.downcast_custom::<DeskError>().is_some() => {
                        warn!(error = %e, "Order rejected");
                        report.borrow_mut().rejected.push(e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        },
    )
}
