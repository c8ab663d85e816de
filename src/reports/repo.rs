use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::pcs::repo::Status;

/// Per-user aggregates for the dashboard. Everything is derived; nothing
/// here is a source of truth.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub inventory_value: i64,
    pub component_count: i64,
    pub builds_planning: i64,
    pub builds_for_sale: i64,
    pub builds_sold: i64,
    pub total_invested: i64,
    pub realized_sales: i64,
    pub profit_on_sold: i64,
}

pub async fn dashboard(db: &PgPool, user_id: Uuid) -> anyhow::Result<Dashboard> {
    let (inventory_value, component_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(price), 0)::BIGINT, COUNT(*)::BIGINT
        FROM components
        WHERE user_id = $1 AND pc_id IS NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let status_counts: Vec<(Status, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*)::BIGINT FROM pcs WHERE user_id = $1 GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    let count_for = |s: Status| {
        status_counts
            .iter()
            .find(|(status, _)| *status == s)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let total_invested: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(price), 0)::BIGINT FROM components WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let realized_sales: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(sale_price), 0)::BIGINT FROM pcs WHERE user_id = $1 AND status = $2",
    )
    .bind(user_id)
    .bind(Status::Sold)
    .fetch_one(db)
    .await?;

    let sold_components_cost: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(c.price), 0)::BIGINT
        FROM components c
        JOIN pcs p ON c.pc_id = p.id
        WHERE p.user_id = $1 AND p.status = $2
        "#,
    )
    .bind(user_id)
    .bind(Status::Sold)
    .fetch_one(db)
    .await?;

    Ok(Dashboard {
        inventory_value,
        component_count,
        builds_planning: count_for(Status::Planning),
        builds_for_sale: count_for(Status::ForSale),
        builds_sold: count_for(Status::Sold),
        total_invested,
        realized_sales,
        profit_on_sold: realized_sales - sold_components_cost,
    })
}

/// Flat export row, one per build, ready for a spreadsheet renderer.
#[derive(Debug, Serialize, FromRow)]
pub struct SalesRow {
    pub id: Uuid,
    pub name: String,
    pub status: Status,
    pub components_total: i64,
    pub list_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub vat_deductible: Option<i64>,
    pub vat_outgoing: Option<i64>,
    pub vat_stale: bool,
    pub listed_at: Option<OffsetDateTime>,
    pub sold_at: Option<OffsetDateTime>,
}

pub async fn sales_rows(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<SalesRow>> {
    let rows = sqlx::query_as::<_, SalesRow>(
        r#"
        SELECT p.id, p.name, p.status, COALESCE(SUM(c.price), 0)::BIGINT AS components_total,
               p.list_price, p.sale_price, p.vat_deductible, p.vat_outgoing, p.vat_stale,
               p.listed_at, p.sold_at
        FROM pcs p
        LEFT JOIN components c ON c.pc_id = p.id
        WHERE p.user_id = $1
        GROUP BY p.id
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
