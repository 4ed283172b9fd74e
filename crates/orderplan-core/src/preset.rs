//! Context configuration and named presets.
//!
//! A [`ContextConfig`] is the external description of a starting state. The
//! presets reproduce the experiment contexts plans are usually replayed
//! against: a healthy default, scarce stock, abundant capacity and a demand
//! spike.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::{CatalogEntry, Context, OrderLine, PendingOrder, SupplierTerms};
use crate::error::{EngineError, Result};
use crate::types::Priority;

/// Names accepted by [`ContextConfig::preset`].
pub const PRESET_NAMES: [&str; 4] = ["default", "low_inventory", "high_capacity", "high_demand"];

/// Initial values for a [`Context`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    pub inventory: BTreeMap<String, u64>,
    pub warehouse_capacity: u64,
    pub shipping_capacity: u64,
    pub active_orders: u64,
    pub supplier_costs: BTreeMap<String, f64>,
    pub suppliers: BTreeMap<String, SupplierTerms>,
    pub orders: Vec<PendingOrder>,
}

impl ContextConfig {
    /// An empty configuration: no stock, no capacity, no suppliers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::standard()),
            "low_inventory" => Ok(Self::low_inventory()),
            "high_capacity" => Ok(Self::high_capacity()),
            "high_demand" => Ok(Self::high_demand()),
            _ => Err(EngineError::NotFound {
                resource_type: "context preset".to_string(),
                id: name.to_string(),
            }),
        }
    }

    /// Names accepted by [`ContextConfig::preset`].
    pub fn preset_names() -> &'static [&'static str] {
        &PRESET_NAMES
    }

    /// Validate and build the context.
    pub fn build(self) -> Result<Context> {
        Context::from_config(self)
    }

    pub fn with_item(mut self, item: impl Into<String>, quantity: u64) -> Self {
        self.inventory.insert(item.into(), quantity);
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.warehouse_capacity = capacity;
        self
    }

    pub fn with_shipping_capacity(mut self, capacity: u64) -> Self {
        self.shipping_capacity = capacity;
        self
    }

    pub fn with_active_orders(mut self, active: u64) -> Self {
        self.active_orders = active;
        self
    }

    pub fn with_supplier_cost(mut self, supplier: impl Into<String>, cost: f64) -> Self {
        self.supplier_costs.insert(supplier.into(), cost);
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>, terms: SupplierTerms) -> Self {
        self.suppliers.insert(supplier.into(), terms);
        self
    }

    pub fn with_order(mut self, order: PendingOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Stock levels, two suppliers and two open orders.
    pub fn standard() -> Self {
        Self::new()
            .with_item("SKU001", 100)
            .with_item("SKU002", 75)
            .with_item("SKU003", 50)
            .with_capacity(200)
            .with_shipping_capacity(150)
            .with_supplier_cost("SUP001", 10.0)
            .with_supplier_cost("SUP002", 16.0)
            .with_supplier(
                "SUP001",
                terms("Primary Supplier", 5, &[("SKU001", 10.0, 50), ("SKU002", 15.0, 30)]),
            )
            .with_supplier(
                "SUP002",
                terms("Secondary Supplier", 7, &[("SKU002", 16.0, 25), ("SKU003", 20.0, 40)]),
            )
            .with_order(order(
                "ORD001",
                "CUST001",
                &[("SKU001", 30), ("SKU002", 20)],
                Priority::Standard,
                Some("New York, NY"),
            ))
            .with_order(order(
                "ORD002",
                "CUST002",
                &[("SKU002", 50)],
                Priority::Express,
                Some("Los Angeles, CA"),
            ))
    }

    /// The standard context with a fraction of the stock.
    pub fn low_inventory() -> Self {
        Self::standard()
            .with_item("SKU001", 10)
            .with_item("SKU002", 5)
            .with_item("SKU003", 2)
    }

    /// The standard context with five times the processing capacity.
    pub fn high_capacity() -> Self {
        Self::standard()
            .with_capacity(1000)
            .with_shipping_capacity(800)
    }

    /// The standard context facing a single rush order larger than stock.
    pub fn high_demand() -> Self {
        let mut config = Self::standard();
        config.orders = vec![order(
            "ORD001",
            "CUST001",
            &[("SKU001", 300), ("SKU002", 200)],
            Priority::Rush,
            None,
        )];
        config
    }
}

fn terms(name: &str, lead_time_days: u32, items: &[(&str, f64, u64)]) -> SupplierTerms {
    SupplierTerms {
        name: name.to_string(),
        lead_time_days,
        catalog: items
            .iter()
            .map(|(item, cost, min_order)| {
                (
                    item.to_string(),
                    CatalogEntry {
                        min_order: *min_order,
                        unit_cost: Some(*cost),
                    },
                )
            })
            .collect(),
    }
}

fn order(
    order_id: &str,
    customer_id: &str,
    lines: &[(&str, u64)],
    priority: Priority,
    shipping_address: Option<&str>,
) -> PendingOrder {
    PendingOrder {
        order_id: order_id.to_string(),
        customer_id: customer_id.to_string(),
        items: lines
            .iter()
            .map(|(item, quantity)| OrderLine {
                item: item.to_string(),
                quantity: *quantity,
            })
            .collect(),
        priority,
        shipping_address: shipping_address.map(str::to_string),
    }
}
