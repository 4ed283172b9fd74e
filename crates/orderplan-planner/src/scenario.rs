//! Named planning goals.
//!
//! Experiments pair each scenario with each context preset, so a plan
//! generated for one goal is replayed under every starting state.

use tracing::debug;

/// Names accepted by [`scenario`], the fallback first.
pub const SCENARIO_NAMES: [&str; 3] = ["basic", "low_inventory", "supplier_optimization"];

/// Process every pending order end to end.
pub const BASIC_FULFILLMENT: &str = "\
We need to process our latest batch of incoming orders. Review all pending orders
and develop a fulfillment strategy. Start by assessing our current inventory and
identify any components we need to source from our suppliers. Look at our production
capacity and schedule manufacturing accordingly. For any items we're short on, place
orders with our suppliers right away. Once products are ready, coordinate shipping
to the customer, and make sure to keep customers informed throughout the
process. The key priority is to ship whatever we can immediately while setting up
the pipeline for any backordered items.
";

/// One order larger than the stock on hand.
pub const LOW_INVENTORY: &str = "\
Process an order for 200 units of SKU001 (more than current inventory).
The system should:
1. Check current inventory
2. Identify the shortage
3. Create appropriate purchase orders
4. Notify the customer about partial fulfillment or delay
";

/// Pick the cheaper of two suppliers for the same item.
pub const SUPPLIER_OPTIMIZATION: &str = "\
Need to order SKU002 from suppliers.
Compare offers from both suppliers:
- SUP001: $15.00 per unit, min order 30
- SUP002: $16.00 per unit, min order 25
Choose the most cost-effective option considering lead times and minimum orders.
";

/// Goal text for a known scenario name.
pub fn scenario_named(name: &str) -> Option<&'static str> {
    match name {
        "basic" => Some(BASIC_FULFILLMENT),
        "low_inventory" => Some(LOW_INVENTORY),
        "supplier_optimization" => Some(SUPPLIER_OPTIMIZATION),
        _ => None,
    }
}

/// Goal text for `name`; unknown names get the basic fulfillment goal.
pub fn scenario(name: &str) -> &'static str {
    scenario_named(name).unwrap_or_else(|| {
        debug!(name, "Unknown scenario, using basic");
        BASIC_FULFILLMENT
    })
}
