//! Built-in order fulfillment operations.
//!
//! Each operation reads its arguments through [`ArgReader`] and mutates the
//! context only through its primitives, so a failing call leaves the
//! context as it found it.

use orderplan_core::{ArgReader, Arguments, Context, EngineError, Priority, Result};
use serde_json::json;

use crate::registry::{FunctionRegistry, StepOutcome};
use crate::schema::{ParamSpec, ParameterSchema};

/// Time frames accepted by `checkProcessingCapacity`.
pub const TIME_FRAMES: [&str; 3] = ["today", "tomorrow", "next_week"];

const PRIORITIES: [&str; 3] = ["Standard", "Express", "Rush"];

/// Register every built-in operation.
pub fn register_builtins(registry: &mut FunctionRegistry) -> Result<()> {
    registry.register(
        "checkInventory",
        ParameterSchema::new("Check current inventory level for a product")
            .param(item_param()),
        check_inventory,
    )?;
    registry.register(
        "reserveInventory",
        ParameterSchema::new("Reserve stock of a product")
            .param(item_param())
            .param(qty_param("The quantity to reserve")),
        reserve_inventory,
    )?;
    registry.register(
        "allocateInventory",
        ParameterSchema::new("Allocate inventory for an order")
            .param(order_param())
            .param(item_param())
            .param(qty_param("The quantity to allocate")),
        allocate_inventory,
    )?;
    registry.register(
        "getPendingOrders",
        ParameterSchema::new("Get list of pending orders"),
        get_pending_orders,
    )?;
    registry.register(
        "listSuppliers",
        ParameterSchema::new("Get list of available suppliers"),
        list_suppliers,
    )?;
    registry.register(
        "lookupSupplierCost",
        ParameterSchema::new("Look up the unit cost of buying from a supplier")
            .param(supplier_param())
            .param(item_param().optional()),
        lookup_supplier_cost,
    )?;
    registry.register(
        "getSupplierCatalog",
        ParameterSchema::new("Get supplier's available items and pricing")
            .param(supplier_param()),
        get_supplier_catalog,
    )?;
    registry.register(
        "createPurchaseOrder",
        ParameterSchema::new("Create a purchase order for items")
            .param(supplier_param())
            .param(item_param())
            .param(qty_param("The quantity to order")),
        create_purchase_order,
    )?;
    registry.register(
        "checkProcessingCapacity",
        ParameterSchema::new("Check available order processing capacity").param(
            ParamSpec::string("timeFrame", "The time frame to check")
                .optional()
                .one_of(&TIME_FRAMES),
        ),
        check_processing_capacity,
    )?;
    registry.register(
        "scheduleProcessing",
        ParameterSchema::new("Schedule order processing")
            .param(order_param())
            .param(
                ParamSpec::string("priority", "The processing priority level").one_of(&PRIORITIES),
            ),
        schedule_processing,
    )?;
    registry.register(
        "releaseCapacity",
        ParameterSchema::new("Release processing capacity held by an order")
            .param(order_param().optional()),
        release_capacity,
    )?;
    registry.register(
        "notifyCustomer",
        ParameterSchema::new("Send notification to customer")
            .param(ParamSpec::string("customerId", "The customer identifier"))
            .param(order_param())
            .param(ParamSpec::string("message", "The message to send")),
        notify_customer,
    )?;
    registry.register(
        "instructionsComplete",
        ParameterSchema::new("Indicate that the instructions are complete"),
        instructions_complete,
    )?;
    Ok(())
}

fn item_param() -> ParamSpec {
    ParamSpec::string("item", "The stock keeping unit identifier")
}

fn order_param() -> ParamSpec {
    ParamSpec::string("orderId", "The order identifier")
}

fn supplier_param() -> ParamSpec {
    ParamSpec::string("supplier", "The supplier identifier")
}

fn qty_param(description: &str) -> ParamSpec {
    ParamSpec::integer("qty", description).minimum(1.0)
}

fn check_inventory(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let item = ArgReader::new("checkInventory", args).string("item")?;
    Ok(json!({ "item": item, "quantity": ctx.quantity(item) }))
}

fn reserve_inventory(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("reserveInventory", args);
    let item = args.string("item")?;
    let qty = args.count("qty")?;

    let remaining = ctx.reserve_inventory(item, qty)?;
    Ok(json!({ "item": item, "reserved": qty, "remaining": remaining }))
}

fn allocate_inventory(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("allocateInventory", args);
    let order_id = args.string("orderId")?;
    let item = args.string("item")?;
    let qty = args.count("qty")?;

    let total = ctx.allocate_inventory(order_id, item, qty)?;
    Ok(json!({
        "orderId": order_id,
        "item": item,
        "allocated": qty,
        "totalAllocated": total,
        "remaining": ctx.quantity(item),
    }))
}

fn get_pending_orders(ctx: &mut Context, _: &Arguments) -> StepOutcome {
    Ok(json!({ "orders": serde_json::to_value(ctx.orders())? }))
}

fn list_suppliers(ctx: &mut Context, _: &Arguments) -> StepOutcome {
    let suppliers: Vec<&String> = ctx.supplier_costs().keys().collect();
    Ok(json!({ "suppliers": suppliers }))
}

fn lookup_supplier_cost(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("lookupSupplierCost", args);
    let supplier = args.string("supplier")?;
    let item = args.opt_string("item")?;

    let unit_cost = ctx.lookup_supplier_cost(supplier, item)?;
    let mut output = json!({ "supplier": supplier, "unitCost": unit_cost });
    if let Some(item) = item {
        output["item"] = json!(item);
    }
    Ok(output)
}

fn get_supplier_catalog(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let supplier = ArgReader::new("getSupplierCatalog", args).string("supplier")?;
    let base_cost = ctx.lookup_supplier_cost(supplier, None)?;

    let mut output = match ctx.supplier(supplier) {
        Some(terms) => serde_json::to_value(terms)?,
        None => json!({ "catalog": {} }),
    };
    output["supplier"] = json!(supplier);
    output["unitCost"] = json!(base_cost);
    Ok(output)
}

fn create_purchase_order(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("createPurchaseOrder", args);
    let supplier = args.string("supplier")?;
    let item = args.string("item")?;
    let qty = args.count("qty")?;

    let order = ctx.create_purchase_order(supplier, item, qty)?;
    Ok(serde_json::to_value(order)?)
}

fn check_processing_capacity(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let time_frame = ArgReader::new("checkProcessingCapacity", args)
        .opt_string("timeFrame")?
        .unwrap_or("today");

    Ok(json!({
        "timeFrame": time_frame,
        "capacity": ctx.warehouse_capacity(),
        "active": ctx.active_orders(),
        "available": ctx.available_capacity(),
        "shipping": ctx.shipping_capacity(),
    }))
}

fn schedule_processing(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("scheduleProcessing", args);
    let order_id = args.string("orderId")?;
    let priority: Priority = args
        .string("priority")?
        .parse()
        .map_err(|message| EngineError::ArgumentValidation {
            operation: "scheduleProcessing".to_string(),
            parameter: "priority".to_string(),
            message,
        })?;

    let available = ctx.occupy_capacity(order_id, priority)?;
    Ok(json!({
        "orderId": order_id,
        "status": "Scheduled",
        "priority": priority,
        "availableCapacity": available,
    }))
}

fn release_capacity(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let order_id = ArgReader::new("releaseCapacity", args).opt_string("orderId")?;

    let released = ctx.release_capacity(order_id)?;
    Ok(json!({
        "releasedOrder": released,
        "availableCapacity": ctx.available_capacity(),
    }))
}

fn notify_customer(ctx: &mut Context, args: &Arguments) -> StepOutcome {
    let args = ArgReader::new("notifyCustomer", args);
    let customer_id = args.string("customerId")?;
    let order_id = args.string("orderId")?;
    let message = args.string("message")?;

    let sent = ctx.record_notification(customer_id, order_id, message);
    Ok(json!({
        "customerId": customer_id,
        "orderId": order_id,
        "notificationSent": true,
        "notificationsSent": sent,
    }))
}

fn instructions_complete(_: &mut Context, _: &Arguments) -> StepOutcome {
    Ok(json!({ "status": "complete" }))
}
