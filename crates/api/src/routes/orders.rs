//! Order placement, board queries, and fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use common::{CustomerId, OrderId};
use domain::{Message, Money, Order, OrderItem, OrderStatus};
use fulfillment::AdvanceOutcome;
use serde::Deserialize;
use store::{ConversationStore, CounterOp, OrderStore, SummaryPatch};
use views::{OrderBoard, OrderPage};

use crate::error::ApiError;
use crate::routes::{AppState, operator_context};

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<usize>,
}

// -- Handlers --

/// POST /orders — place a new order.
///
/// This is the checkout side of the contract: the order lands in
/// `confirmation` state and an order card is dropped into the customer's
/// conversation with the new-order flag raised for the admin list.
#[tracing::instrument(skip(state, req))]
pub async fn create<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    if req.customer_id.is_empty() {
        return Err(ApiError::BadRequest("customerId is required".to_string()));
    }
    if req.items.is_empty() {
        return Err(ApiError::BadRequest(
            "an order needs at least one item".to_string(),
        ));
    }
    if req.items.iter().any(|item| item.quantity == 0) {
        return Err(ApiError::BadRequest(
            "item quantity must be positive".to_string(),
        ));
    }

    let items: Vec<OrderItem> = req
        .items
        .iter()
        .map(|item| {
            OrderItem::new(
                item.name.as_str(),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();
    let total: Money = items.iter().map(OrderItem::total_price).sum();

    let order_id = OrderId::new(uuid::Uuid::new_v4().simple().to_string());
    let customer_id = CustomerId::new(req.customer_id);

    let mut order = Order::place(order_id, customer_id.clone(), items, total);
    order.customer_email = req.customer_email;
    order.delivery_address = req.delivery_address;
    order.payment_method = req.payment_method;

    state.orders.insert(order.clone()).await?;

    // The order card in the chat and the summary flag ride behind the order
    // write, same as a customer message would.
    let card = Message::order_placed(&order);
    let timestamp = card.timestamp;
    state.conversations.append(&customer_id, card).await?;
    state
        .conversations
        .upsert_summary(
            &customer_id,
            SummaryPatch::tail("New Order Placed", timestamp)
                .customer_name(order.contact_name())
                .unread_by_admin(CounterOp::Increment)
                .new_order(order.id.clone()),
        )
        .await?;

    tracing::info!(order_id = %order.id, customer_id = %customer_id, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — the order board page, optionally filtered by status.
#[tracing::instrument(skip(state))]
pub async fn list<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderPage>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let filter = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<OrderStatus>().map_err(ApiError::BadRequest)?),
        None => None,
    };

    let board = OrderBoard::attach(&state.orders).await?;
    Ok(Json(board.page(filter, query.page.unwrap_or(1))))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let order = state.orders.get(&OrderId::new(id)).await?;
    Ok(Json(order))
}

/// POST /orders/{id}/advance — move the order one status forward and notify
/// the customer. A notification failure after the status has moved still
/// returns 200, with the `notificationFailed` outcome body.
#[tracing::instrument(skip(state, headers))]
pub async fn advance<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AdvanceOutcome>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let ctx = operator_context(&headers)?;
    let outcome = state
        .orchestrator
        .advance_and_notify(&OrderId::new(id), &ctx)
        .await?;
    Ok(Json(outcome))
}

/// POST /orders/{id}/cancel — cancel the order with a reason.
#[tracing::instrument(skip(state, headers, req))]
pub async fn cancel<O, C>(
    State(state): State<Arc<AppState<O, C>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CancelRequest>,
) -> Result<Json<AdvanceOutcome>, ApiError>
where
    O: OrderStore + Clone + 'static,
    C: ConversationStore + Clone + 'static,
{
    let ctx = operator_context(&headers)?;
    let outcome = state
        .orchestrator
        .cancel_and_notify(&OrderId::new(id), &req.reason, &ctx)
        .await?;
    Ok(Json(outcome))
}
