//! Simulated business state a plan executes against.
//!
//! Fields are private. Reads go through accessors; writes go through the
//! mutation primitives below, each of which checks its business rule first
//! and leaves the context untouched when it refuses.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{BusinessRuleViolation, EngineError, Result};
use crate::preset::ContextConfig;
use crate::types::Priority;

type RuleResult<T> = std::result::Result<T, BusinessRuleViolation>;

/// An item a supplier can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Smallest quantity accepted on a purchase order.
    #[serde(default)]
    pub min_order: u64,

    /// Item-specific price; falls back to the supplier's base cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
}

/// Commercial terms of one supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierTerms {
    pub name: String,
    pub lead_time_days: u32,
    #[serde(default)]
    pub catalog: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u64,
}

/// A customer order waiting to be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub po_number: String,
    pub supplier: String,
    pub item: String,
    pub quantity: u64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub lead_time_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOrder {
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub customer_id: String,
    pub order_id: String,
    pub message: String,
}

/// Mutable business state for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    inventory: BTreeMap<String, u64>,
    warehouse_capacity: u64,
    shipping_capacity: u64,
    active_orders: u64,
    supplier_costs: BTreeMap<String, f64>,
    suppliers: BTreeMap<String, SupplierTerms>,
    orders: Vec<PendingOrder>,
    allocations: BTreeMap<String, BTreeMap<String, u64>>,
    purchase_orders: BTreeMap<String, PurchaseOrder>,
    scheduled: BTreeMap<String, ScheduledOrder>,
    notifications: Vec<Notification>,
}

impl Context {
    /// Build a context from a configuration, checking its invariants.
    pub fn from_config(config: ContextConfig) -> Result<Self> {
        let context = Self {
            inventory: config.inventory,
            warehouse_capacity: config.warehouse_capacity,
            shipping_capacity: config.shipping_capacity,
            active_orders: config.active_orders,
            supplier_costs: config.supplier_costs,
            suppliers: config.suppliers,
            orders: config.orders,
            allocations: BTreeMap::new(),
            purchase_orders: BTreeMap::new(),
            scheduled: BTreeMap::new(),
            notifications: Vec::new(),
        };

        context
            .check_invariants()
            .map_err(|message| EngineError::ContextInvalid { message })?;
        Ok(context)
    }

    /// Build a context from a named preset.
    pub fn preset(name: &str) -> Result<Self> {
        Self::from_config(ContextConfig::preset(name)?)
    }

    /// Independent read-only copy for inclusion in results.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot(self.clone())
    }

    /// Check every context invariant, describing the first one broken.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.active_orders > self.warehouse_capacity {
            return Err(format!(
                "active orders ({}) exceed warehouse capacity ({})",
                self.active_orders, self.warehouse_capacity
            ));
        }

        if self.scheduled.len() as u64 > self.active_orders {
            return Err(format!(
                "{} scheduled orders but only {} active",
                self.scheduled.len(),
                self.active_orders
            ));
        }

        for (supplier, cost) in &self.supplier_costs {
            if !cost.is_finite() || *cost < 0.0 {
                return Err(format!("supplier {supplier} has invalid cost {cost}"));
            }
        }

        for (supplier, terms) in &self.suppliers {
            if !self.supplier_costs.contains_key(supplier) {
                return Err(format!("supplier {supplier} has terms but no base cost"));
            }
            for (item, entry) in &terms.catalog {
                if let Some(cost) = entry.unit_cost {
                    if !cost.is_finite() || cost < 0.0 {
                        return Err(format!(
                            "supplier {supplier} has invalid cost {cost} for {item}"
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    // Reads

    pub fn inventory(&self) -> &BTreeMap<String, u64> {
        &self.inventory
    }

    /// Available quantity of an item; unknown items have none.
    pub fn quantity(&self, item: &str) -> u64 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    pub fn warehouse_capacity(&self) -> u64 {
        self.warehouse_capacity
    }

    /// Daily outbound shipping capacity. Reported, never consumed.
    pub fn shipping_capacity(&self) -> u64 {
        self.shipping_capacity
    }

    pub fn active_orders(&self) -> u64 {
        self.active_orders
    }

    pub fn available_capacity(&self) -> u64 {
        self.warehouse_capacity.saturating_sub(self.active_orders)
    }

    pub fn supplier_costs(&self) -> &BTreeMap<String, f64> {
        &self.supplier_costs
    }

    pub fn suppliers(&self) -> &BTreeMap<String, SupplierTerms> {
        &self.suppliers
    }

    pub fn supplier(&self, supplier: &str) -> Option<&SupplierTerms> {
        self.suppliers.get(supplier)
    }

    pub fn orders(&self) -> &[PendingOrder] {
        &self.orders
    }

    pub fn order(&self, order_id: &str) -> Option<&PendingOrder> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn allocations(&self) -> &BTreeMap<String, BTreeMap<String, u64>> {
        &self.allocations
    }

    pub fn purchase_orders(&self) -> &BTreeMap<String, PurchaseOrder> {
        &self.purchase_orders
    }

    pub fn scheduled(&self) -> &BTreeMap<String, ScheduledOrder> {
        &self.scheduled
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    // Mutation primitives

    /// Take `qty` units of `item` out of stock. Returns the remaining stock.
    pub fn reserve_inventory(&mut self, item: &str, qty: u64) -> RuleResult<u64> {
        if qty == 0 {
            return Err(BusinessRuleViolation::ZeroQuantity);
        }

        let available = self.quantity(item);
        let remaining = available.checked_sub(qty).ok_or_else(|| {
            BusinessRuleViolation::InsufficientInventory {
                item: item.to_string(),
                requested: qty,
                available,
            }
        })?;

        self.inventory.insert(item.to_string(), remaining);
        Ok(remaining)
    }

    /// Reserve stock and record it against an order. Returns the total
    /// quantity of `item` allocated to the order.
    pub fn allocate_inventory(&mut self, order_id: &str, item: &str, qty: u64) -> RuleResult<u64> {
        self.reserve_inventory(item, qty)?;

        let allocated = self
            .allocations
            .entry(order_id.to_string())
            .or_default()
            .entry(item.to_string())
            .or_insert(0);
        *allocated += qty;
        Ok(*allocated)
    }

    /// Occupy one unit of processing capacity for an order. Returns the
    /// capacity still available.
    pub fn occupy_capacity(&mut self, order_id: &str, priority: Priority) -> RuleResult<u64> {
        if self.scheduled.contains_key(order_id) {
            return Err(BusinessRuleViolation::AlreadyScheduled {
                order_id: order_id.to_string(),
            });
        }

        if self.active_orders >= self.warehouse_capacity {
            return Err(BusinessRuleViolation::CapacityExceeded {
                capacity: self.warehouse_capacity,
                active: self.active_orders,
            });
        }

        self.active_orders += 1;
        self.scheduled
            .insert(order_id.to_string(), ScheduledOrder { priority });
        Ok(self.available_capacity())
    }

    /// Free one unit of capacity.
    ///
    /// With an order id, that order must be scheduled. Without one, capacity
    /// held by orders outside this run is released first, then the
    /// scheduled order with the smallest id. Returns the released order id,
    /// if the slot belonged to a scheduled order.
    pub fn release_capacity(&mut self, order_id: Option<&str>) -> RuleResult<Option<String>> {
        if self.active_orders == 0 {
            return Err(BusinessRuleViolation::NoActiveOrders);
        }

        let released = match order_id {
            Some(id) => {
                if self.scheduled.remove(id).is_none() {
                    return Err(BusinessRuleViolation::NotScheduled {
                        order_id: id.to_string(),
                    });
                }
                Some(id.to_string())
            }
            None if self.active_orders > self.scheduled.len() as u64 => None,
            None => self.scheduled.pop_first().map(|(id, _)| id),
        };

        self.active_orders -= 1;
        Ok(released)
    }

    /// Per-unit cost of buying from `supplier`, optionally for one item.
    pub fn lookup_supplier_cost(&self, supplier: &str, item: Option<&str>) -> RuleResult<f64> {
        let base = self.supplier_costs.get(supplier).copied().ok_or_else(|| {
            BusinessRuleViolation::UnknownSupplier {
                supplier: supplier.to_string(),
            }
        })?;

        let (Some(item), Some(terms)) = (item, self.suppliers.get(supplier)) else {
            return Ok(base);
        };

        let entry = terms.catalog.get(item).ok_or_else(|| BusinessRuleViolation::ItemNotStocked {
            supplier: supplier.to_string(),
            item: item.to_string(),
        })?;
        Ok(entry.unit_cost.unwrap_or(base))
    }

    /// Place a purchase order. PO numbers are sequential within a context.
    pub fn create_purchase_order(
        &mut self,
        supplier: &str,
        item: &str,
        qty: u64,
    ) -> RuleResult<PurchaseOrder> {
        if qty == 0 {
            return Err(BusinessRuleViolation::ZeroQuantity);
        }

        let unit_cost = self.lookup_supplier_cost(supplier, Some(item))?;

        let mut lead_time_days = 0;
        if let Some(terms) = self.suppliers.get(supplier) {
            lead_time_days = terms.lead_time_days;
            let minimum = terms.catalog.get(item).map_or(0, |e| e.min_order);
            if qty < minimum {
                return Err(BusinessRuleViolation::BelowMinimumOrder {
                    supplier: supplier.to_string(),
                    item: item.to_string(),
                    minimum,
                    requested: qty,
                });
            }
        }

        let po_number = format!(
            "PO-{:04}-{}-{}",
            self.purchase_orders.len() + 1,
            supplier,
            item
        );
        let order = PurchaseOrder {
            po_number: po_number.clone(),
            supplier: supplier.to_string(),
            item: item.to_string(),
            quantity: qty,
            unit_cost,
            total_cost: unit_cost * qty as f64,
            lead_time_days,
        };
        self.purchase_orders.insert(po_number, order.clone());
        Ok(order)
    }

    /// Record a message sent to a customer. Returns the number of
    /// notifications sent so far.
    pub fn record_notification(
        &mut self,
        customer_id: &str,
        order_id: &str,
        message: &str,
    ) -> usize {
        self.notifications.push(Notification {
            customer_id: customer_id.to_string(),
            order_id: order_id.to_string(),
            message: message.to_string(),
        });
        self.notifications.len()
    }
}

/// Read-only copy of a [`Context`] captured at some point of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContextSnapshot(Context);

impl Deref for ContextSnapshot {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.0
    }
}

impl ContextSnapshot {
    /// A fresh, mutable context starting from this snapshot.
    pub fn to_context(&self) -> Context {
        self.0.clone()
    }
}
