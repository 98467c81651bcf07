//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! vitrine orders list
//! vitrine orders show 1767225600000
//! vitrine orders advance 1767225600000 processing
//! vitrine orders ship 1767225600000 BR123456789BR
//! ```

use vitrine_core::{OrderId, OrderStatus};
use vitrine_storefront::orders::Order;
use vitrine_storefront::{AppError, Storefront};

/// List every order, newest first.
pub async fn list(storefront: &Storefront) {
    let ledger = storefront.ledger().lock().await;
    if ledger.list().is_empty() {
        tracing::info!("No orders yet");
        return;
    }
    for order in ledger.list() {
        tracing::info!(
            "#{}  {}  {:<11} {}  {} item(s)",
            order.id,
            order.created_at.format("%d/%m/%Y %H:%M"),
            order.status.label(),
            order.payment.total,
            order.item_count()
        );
    }
}

/// Show one order.
///
/// # Errors
///
/// Returns an error if no order has this ID.
pub async fn show(storefront: &Storefront, id: OrderId) -> Result<(), AppError> {
    let ledger = storefront.ledger().lock().await;
    let order = ledger
        .find(id)
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;
    log_order(order);
    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns an error if the order does not exist, the transition is not
/// allowed, or the ledger cannot be saved.
pub async fn advance(storefront: &Storefront, id: OrderId, status: OrderStatus) -> Result<(), AppError> {
    let order = storefront.ledger().lock().await.transition(id, status).await?;
    tracing::info!("Order #{} is now {}", order.id, order.status.label());
    Ok(())
}

/// Ship an order with a tracking code.
///
/// # Errors
///
/// Returns an error if the order does not exist, is not processing, or the
/// ledger cannot be saved.
pub async fn ship(storefront: &Storefront, id: OrderId, tracking: String) -> Result<(), AppError> {
    let tracking = tracking.trim().to_string();
    if tracking.is_empty() {
        return Err(AppError::BadRequest("Tracking code cannot be empty".to_string()));
    }
    let order = storefront.ledger().lock().await.ship(id, tracking).await?;
    tracing::info!(
        "Order #{} shipped, tracking {}",
        order.id,
        order.tracking.as_deref().unwrap_or_default()
    );
    Ok(())
}

pub(crate) fn log_order(order: &Order) {
    tracing::info!("Order #{} - {}", order.id, order.status.label());
    tracing::info!("Placed:   {}", order.created_at.format("%d/%m/%Y %H:%M"));
    tracing::info!(
        "Customer: {} <{}> {}",
        order.customer.name,
        order.customer.email,
        order.customer.phone
    );

    let address = &order.address;
    let complement = address
        .complement
        .as_deref()
        .map(|c| format!(", {c}"))
        .unwrap_or_default();
    tracing::info!(
        "Ship to:  {}, {}{} - {}, {}/{} - {}",
        address.street,
        address.number,
        complement,
        address.neighborhood,
        address.city,
        address.state,
        address.zip_code
    );

    for line in &order.items {
        tracing::info!("  {} x {} @ {}", line.quantity, line.name, line.unit_price);
    }
    tracing::info!("Total:    {} ({})", order.payment.total, order.payment.method);
    if let Some(tracking) = &order.tracking {
        tracing::info!("Tracking: {tracking}");
    }
    for change in &order.history {
        tracing::info!("  {}  {}", change.at.format("%d/%m/%Y %H:%M"), change.status.label());
    }
}
