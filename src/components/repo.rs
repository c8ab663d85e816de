use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Component categories, persisted by ordinal. A build holds at most one
/// component of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum ComponentKind {
    GPU = 0,
    CPU = 1,
    RAM = 2,
    SSD = 3,
    PSU = 4,
    Motherboard = 5,
    Case = 6,
    CPUCooler = 7,
    Other = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum Condition {
    New = 0,
    Used = 1,
}

/// A priced physical part. Lives either in the owner's inventory or inside
/// one PC build, never both.
#[derive(Debug, Clone, FromRow)]
pub struct Component {
    pub id: Uuid,
    pub user_id: Uuid,
    pub inventory_id: Option<Uuid>,
    pub pc_id: Option<Uuid>,
    pub name: String,
    pub price: i64,
    pub manufacturer: String,
    pub kind: ComponentKind,
    pub condition: Condition,
    pub store: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Mutable component fields, shared by create and update.
#[derive(Debug)]
pub struct ComponentFields<'a> {
    pub name: &'a str,
    pub price: i64,
    pub manufacturer: &'a str,
    pub kind: ComponentKind,
    pub condition: Condition,
    pub store: Option<&'a str>,
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    inventory_id: Uuid,
    fields: &ComponentFields<'_>,
) -> anyhow::Result<Component> {
    let component = sqlx::query_as::<_, Component>(
        r#"
        INSERT INTO components (user_id, inventory_id, name, price, manufacturer, kind, condition, store)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
                  store, created_at
        "#,
    )
    .bind(user_id)
    .bind(inventory_id)
    .bind(fields.name)
    .bind(fields.price)
    .bind(fields.manufacturer)
    .bind(fields.kind)
    .bind(fields.condition)
    .bind(fields.store)
    .fetch_one(db)
    .await?;
    Ok(component)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Component>> {
    let rows = sqlx::query_as::<_, Component>(
        r#"
        SELECT id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
               store, created_at
        FROM components
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_inventory(db: &PgPool, inventory_id: Uuid) -> anyhow::Result<Vec<Component>> {
    let rows = sqlx::query_as::<_, Component>(
        r#"
        SELECT id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
               store, created_at
        FROM components
        WHERE inventory_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(inventory_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_pc(db: &PgPool, pc_id: Uuid) -> anyhow::Result<Vec<Component>> {
    let rows = sqlx::query_as::<_, Component>(
        r#"
        SELECT id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
               store, created_at
        FROM components
        WHERE pc_id = $1
        ORDER BY kind
        "#,
    )
    .bind(pc_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Component>> {
    let component = sqlx::query_as::<_, Component>(
        r#"
        SELECT id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
               store, created_at
        FROM components
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(component)
}

/// Full update of the mutable fields, scoped to the owner. When the
/// component sits inside a build, the build's VAT snapshot goes stale.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    fields: &ComponentFields<'_>,
) -> anyhow::Result<Option<Component>> {
    let mut tx = db.begin().await?;

    let component = sqlx::query_as::<_, Component>(
        r#"
        UPDATE components
        SET name = $3, price = $4, manufacturer = $5, kind = $6, condition = $7, store = $8
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
                  store, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.price)
    .bind(fields.manufacturer)
    .bind(fields.kind)
    .bind(fields.condition)
    .bind(fields.store)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(c) = &component {
        if let Some(pc_id) = c.pc_id {
            sqlx::query("UPDATE pcs SET vat_stale = true WHERE id = $1")
                .bind(pc_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(component)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<u64> {
    let mut tx = db.begin().await?;

    let pc_id: Option<Option<Uuid>> =
        sqlx::query_scalar("SELECT pc_id FROM components WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    let res = sqlx::query("DELETE FROM components WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if let Some(Some(pc_id)) = pc_id {
        sqlx::query("UPDATE pcs SET vat_stale = true WHERE id = $1")
            .bind(pc_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(res.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ordinals_are_stable() {
        assert_eq!(ComponentKind::GPU as i16, 0);
        assert_eq!(ComponentKind::CPU as i16, 1);
        assert_eq!(ComponentKind::RAM as i16, 2);
        assert_eq!(ComponentKind::SSD as i16, 3);
        assert_eq!(ComponentKind::PSU as i16, 4);
        assert_eq!(ComponentKind::Motherboard as i16, 5);
        assert_eq!(ComponentKind::Case as i16, 6);
        assert_eq!(ComponentKind::CPUCooler as i16, 7);
        assert_eq!(ComponentKind::Other as i16, 8);
    }

    #[test]
    fn condition_ordinals_are_stable() {
        assert_eq!(Condition::New as i16, 0);
        assert_eq!(Condition::Used as i16, 1);
    }

    #[test]
    fn kind_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&ComponentKind::CPUCooler).unwrap(),
            "\"CPUCooler\""
        );
        let parsed: ComponentKind = serde_json::from_str("\"Motherboard\"").unwrap();
        assert_eq!(parsed, ComponentKind::Motherboard);
        assert!(serde_json::from_str::<ComponentKind>("\"Keyboard\"").is_err());
    }
}
