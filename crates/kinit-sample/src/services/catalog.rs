use crate::error::DeskError;
use crate::model::{Product, ProductCreate, ProductId};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The product catalog and its stock levels.
#[derive(Debug, Default)]
pub struct Catalog {
    products: RefCell<BTreeMap<ProductId, Product>>,
    next_id: Cell<u32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, params: ProductCreate) -> ProductId {
        let id = ProductId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        let product = Product::new(id, params);
        info!(product_id = %id, name = %product.name, stock = product.quantity, "Product added");
        self.products.borrow_mut().insert(id, product);
        id
    }

    pub fn get(&self, id: ProductId) -> Result<Product, DeskError> {
        self.products
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(DeskError::UnknownProduct(id))
    }

    pub fn check_stock(&self, id: ProductId) -> Result<u32, DeskError> {
        self.get(id).map(|product| product.quantity)
    }

    /// Takes `quantity` units out of stock and returns the unit price.
    pub fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<f64, DeskError> {
        let mut products = self.products.borrow_mut();
        let product = products
            .get_mut(&id)
            .ok_or(DeskError::UnknownProduct(id))?;
        if product.quantity < quantity {
            return Err(DeskError::InsufficientStock {
                requested: quantity,
                available: product.quantity,
            });
        }
        product.quantity -= quantity;
        debug!(product_id = %id, quantity, remaining = product.quantity, "Stock reserved");
        Ok(product.price)
    }

    /// Puts `quantity` units of a reservation back into stock.
    pub fn release_stock(&self, id: ProductId, quantity: u32) -> Result<(), DeskError> {
        let mut products = self.products.borrow_mut();
        let product = products
            .get_mut(&id)
            .ok_or(DeskError::UnknownProduct(id))?;
        product.quantity += quantity;
        debug!(product_id = %id, quantity, remaining = product.quantity, "Stock released");
        Ok(())
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.products.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.borrow().is_empty()
    }
}

/// Products every freshly seeded catalog starts with.
pub fn demo_products() -> Vec<ProductCreate> {
    vec![
        ProductCreate::new("Super Widget", 25.5, 100),
        ProductCreate::new("Gadget Pro", 99.0, 3),
    ]
}
