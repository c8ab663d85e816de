use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::components::repo::Component;
use crate::error::AppError;
use crate::inventory;

/// Sale lifecycle of a build, persisted by ordinal. Transitions are not
/// forced to be linear; validation lives in the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum Status {
    Planning = 0,
    ForSale = 1,
    Sold = 2,
}

/// A sellable assembly of components with VAT bookkeeping.
#[derive(Debug, Clone, FromRow)]
pub struct Pc {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub list_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub image_url: Option<String>,
    pub status: Status,
    pub listed_at: Option<OffsetDateTime>,
    pub sold_at: Option<OffsetDateTime>,
    pub vat_deductible: Option<i64>,
    pub vat_outgoing: Option<i64>,
    pub vat_calculated_at: Option<OffsetDateTime>,
    pub vat_stale: bool,
    pub created_at: OffsetDateTime,
}

/// Planned status transition, produced by the service layer.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: Status,
    pub listed_at: Option<OffsetDateTime>,
    pub sold_at: Option<OffsetDateTime>,
    pub sale_price: Option<i64>,
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    description: Option<&str>,
    list_price: Option<i64>,
) -> anyhow::Result<Pc> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        INSERT INTO pcs (user_id, name, description, list_price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, name, description, list_price, sale_price, image_url, status,
                  listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
                  created_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(list_price)
    .fetch_one(db)
    .await?;
    Ok(pc)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Pc>> {
    let rows = sqlx::query_as::<_, Pc>(
        r#"
        SELECT id, user_id, name, description, list_price, sale_price, image_url, status,
               listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
               created_at
        FROM pcs
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Pc>> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        SELECT id, user_id, name, description, list_price, sale_price, image_url, status,
               listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
               created_at
        FROM pcs
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(pc)
}

/// Update name/description/list price. A price change marks the VAT
/// snapshot stale; the comparison runs against the pre-update value.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    name: &str,
    description: Option<&str>,
    list_price: Option<i64>,
) -> anyhow::Result<Option<Pc>> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        UPDATE pcs
        SET name = $3,
            description = $4,
            vat_stale = vat_stale OR (list_price IS DISTINCT FROM $5),
            list_price = $5
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name, description, list_price, sale_price, image_url, status,
                  listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
                  created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(list_price)
    .fetch_optional(db)
    .await?;
    Ok(pc)
}

/// Delete a build, returning its components to the owner's inventory in the
/// same transaction.
pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    let owned: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM pcs WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let inv = inventory::repo::get_or_create_conn(&mut *tx, user_id).await?;
    sqlx::query("UPDATE components SET pc_id = NULL, inventory_id = $2 WHERE pc_id = $1")
        .bind(id)
        .bind(inv.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM pcs WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn apply_status(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    change: &StatusChange,
) -> anyhow::Result<Option<Pc>> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        UPDATE pcs
        SET status = $3,
            listed_at = $4,
            sold_at = $5,
            vat_stale = vat_stale OR (sale_price IS DISTINCT FROM $6),
            sale_price = $6
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name, description, list_price, sale_price, image_url, status,
                  listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
                  created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(change.status)
    .bind(change.listed_at)
    .bind(change.sold_at)
    .bind(change.sale_price)
    .fetch_optional(db)
    .await?;
    Ok(pc)
}

/// Move a component from the inventory into a build. Both sides commit
/// together or not at all; a second component of an already-present kind
/// is rejected and leaves both aggregates unchanged.
pub async fn attach_component(
    db: &PgPool,
    user_id: Uuid,
    pc_id: Uuid,
    component_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    let owned: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM pcs WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(pc_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let component = sqlx::query_as::<_, Component>(
        r#"
        SELECT id, user_id, inventory_id, pc_id, name, price, manufacturer, kind, condition,
               store, created_at
        FROM components
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(component_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;

    if component.pc_id.is_some() {
        return Err(AppError::Conflict {
            reason: "component_assigned",
            message: "Component is already part of a build",
        });
    }

    let duplicate: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM components WHERE pc_id = $1 AND kind = $2)",
    )
    .bind(pc_id)
    .bind(component.kind)
    .fetch_one(&mut *tx)
    .await?;
    if duplicate {
        return Err(AppError::Conflict {
            reason: "duplicate_component_kind",
            message: "Build already has a component of this kind",
        });
    }

    sqlx::query("UPDATE components SET inventory_id = NULL, pc_id = $2 WHERE id = $1")
        .bind(component_id)
        .bind(pc_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE pcs SET vat_stale = true WHERE id = $1")
        .bind(pc_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Move a component out of a build back into the owner's inventory, in one
/// transaction.
pub async fn detach_component(
    db: &PgPool,
    user_id: Uuid,
    pc_id: Uuid,
    component_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    let owned: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM pcs WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(pc_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let attached: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM components WHERE id = $1 AND user_id = $2 AND pc_id = $3 FOR UPDATE",
    )
    .bind(component_id)
    .bind(user_id)
    .bind(pc_id)
    .fetch_optional(&mut *tx)
    .await?;
    if attached.is_none() {
        return Err(AppError::NotFound);
    }

    let inv = inventory::repo::get_or_create_conn(&mut *tx, user_id).await?;
    sqlx::query("UPDATE components SET pc_id = NULL, inventory_id = $2 WHERE id = $1")
        .bind(component_id)
        .bind(inv.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE pcs SET vat_stale = true WHERE id = $1")
        .bind(pc_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn set_image_url(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    url: &str,
) -> anyhow::Result<Option<Pc>> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        UPDATE pcs
        SET image_url = $3
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name, description, list_price, sale_price, image_url, status,
                  listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
                  created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(url)
    .fetch_optional(db)
    .await?;
    Ok(pc)
}

/// Store a freshly computed VAT snapshot and clear the stale flag.
pub async fn set_vat(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    deductible: i64,
    outgoing: i64,
) -> anyhow::Result<Option<Pc>> {
    let pc = sqlx::query_as::<_, Pc>(
        r#"
        UPDATE pcs
        SET vat_deductible = $3, vat_outgoing = $4, vat_calculated_at = now(), vat_stale = false
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name, description, list_price, sale_price, image_url, status,
                  listed_at, sold_at, vat_deductible, vat_outgoing, vat_calculated_at, vat_stale,
                  created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(deductible)
    .bind(outgoing)
    .fetch_optional(db)
    .await?;
    Ok(pc)
}

pub async fn components_total(db: &PgPool, pc_id: Uuid) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(price), 0)::BIGINT FROM components WHERE pc_id = $1",
    )
    .bind(pc_id)
    .fetch_one(db)
    .await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordinals_are_stable() {
        assert_eq!(Status::Planning as i16, 0);
        assert_eq!(Status::ForSale as i16, 1);
        assert_eq!(Status::Sold as i16, 2);
    }

    #[test]
    fn status_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Status::ForSale).unwrap(), "\"ForSale\"");
        assert!(serde_json::from_str::<Status>("\"Scrapped\"").is_err());
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::auth::repo::User;
    use crate::components::repo::{self as components_repo, ComponentFields, ComponentKind,
                                  Condition};
    use crate::inventory;

    async fn seed_user(pool: &PgPool, username: &str, email: &str) -> User {
        User::create(pool, username, email, "irrelevant-hash")
            .await
            .expect("create user")
    }

    fn fields(name: &str, kind: ComponentKind) -> ComponentFields<'_> {
        ComponentFields {
            name,
            price: 25_000,
            manufacturer: "AMD",
            kind,
            condition: Condition::Used,
            store: None,
        }
    }

    #[sqlx::test]
    async fn builds_are_scoped_to_their_owner(pool: PgPool) {
        let alice = seed_user(&pool, "alice", "alice@x.com").await;
        let bob = seed_user(&pool, "bob", "bob@x.com").await;
        let bob_pc = create(&pool, bob.id, "Bob's build", None, None)
            .await
            .expect("create pc");

        assert!(get(&pool, alice.id, bob_pc.id).await.expect("get").is_none());
        assert!(update(&pool, alice.id, bob_pc.id, "Hijacked", None, None)
            .await
            .expect("update")
            .is_none());
        let err = delete(&pool, alice.id, bob_pc.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        // attaching alice's own component to bob's build is still NotFound
        let alice_inv = inventory::repo::get_or_create(&pool, alice.id)
            .await
            .expect("inventory");
        let component =
            components_repo::create(&pool, alice.id, alice_inv.id, &fields("CPU", ComponentKind::CPU))
                .await
                .expect("create component");
        let err = attach_component(&pool, alice.id, bob_pc.id, component.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        assert!(get(&pool, bob.id, bob_pc.id).await.expect("get").is_some());
    }

    #[sqlx::test]
    async fn attach_and_detach_round_trip_through_inventory(pool: PgPool) {
        let alice = seed_user(&pool, "alice", "alice@x.com").await;
        let inv = inventory::repo::get_or_create(&pool, alice.id)
            .await
            .expect("inventory");
        let component =
            components_repo::create(&pool, alice.id, inv.id, &fields("Ryzen 7", ComponentKind::CPU))
                .await
                .expect("create component");
        let pc = create(&pool, alice.id, "Build1", None, Some(150_000))
            .await
            .expect("create pc");

        attach_component(&pool, alice.id, pc.id, component.id)
            .await
            .expect("attach");
        let moved = components_repo::get(&pool, alice.id, component.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(moved.pc_id, Some(pc.id));
        assert_eq!(moved.inventory_id, None);
        assert!(components_repo::list_by_inventory(&pool, inv.id)
            .await
            .expect("list")
            .is_empty());
        let pc = get(&pool, alice.id, pc.id).await.expect("get").expect("pc");
        assert!(pc.vat_stale);

        detach_component(&pool, alice.id, pc.id, component.id)
            .await
            .expect("detach");
        let back = components_repo::get(&pool, alice.id, component.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(back.pc_id, None);
        assert_eq!(back.inventory_id, Some(inv.id));
        assert_eq!(back.name, "Ryzen 7");
        assert_eq!(back.price, 25_000);
        assert!(components_repo::list_by_pc(&pool, pc.id)
            .await
            .expect("list")
            .is_empty());
    }

    #[sqlx::test]
    async fn second_component_of_same_kind_is_rejected(pool: PgPool) {
        let alice = seed_user(&pool, "alice", "alice@x.com").await;
        let inv = inventory::repo::get_or_create(&pool, alice.id)
            .await
            .expect("inventory");
        let first =
            components_repo::create(&pool, alice.id, inv.id, &fields("Ryzen 7", ComponentKind::CPU))
                .await
                .expect("create component");
        let second =
            components_repo::create(&pool, alice.id, inv.id, &fields("Ryzen 9", ComponentKind::CPU))
                .await
                .expect("create component");
        let pc = create(&pool, alice.id, "Build1", None, None)
            .await
            .expect("create pc");

        attach_component(&pool, alice.id, pc.id, first.id)
            .await
            .expect("attach first");
        let err = attach_component(&pool, alice.id, pc.id, second.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict { reason: "duplicate_component_kind", .. }
        ));

        // the build still holds only the first CPU, the second stays put
        let in_build = components_repo::list_by_pc(&pool, pc.id).await.expect("list");
        assert_eq!(in_build.len(), 1);
        assert_eq!(in_build[0].id, first.id);
        let untouched = components_repo::get(&pool, alice.id, second.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(untouched.inventory_id, Some(inv.id));
    }
}
