use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use parcel_core::repository::OrderSummary;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub status: String,
    pub estimated_price: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderSummary> for OrderSummaryResponse {
    fn from(summary: OrderSummary) -> Self {
        Self {
            order_id: summary.order_id,
            status: summary.status,
            estimated_price: summary.estimated_price,
            created_at: summary.created_at,
        }
    }
}

/// GET /v1/orders?user_id=...
/// Pass-through to the order store's per-user listing.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderSummaryResponse>>, AppError> {
    let orders = state
        .order_store
        .orders_for_user(&query.user_id)
        .await
        .map_err(|err| AppError::UpstreamError(err.to_string()))?;

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
