use time::OffsetDateTime;

use crate::error::AppError;
use crate::pcs::dto::StatusChangeRequest;
use crate::pcs::repo::{Pc, Status, StatusChange};

/// Validate a requested lifecycle transition against the build's current
/// state and produce the fields to persist. Invariants: sold-at is on or
/// after listed-at, and neither date is in the future.
pub fn plan_transition(
    pc: &Pc,
    req: &StatusChangeRequest,
    now: OffsetDateTime,
) -> Result<StatusChange, AppError> {
    if let Some(price) = req.sale_price {
        if price < 0 {
            return Err(AppError::Validation {
                field: "sale_price",
                message: "Sale price must be non-negative",
            });
        }
    }

    match req.status {
        Status::Planning => Ok(StatusChange {
            status: Status::Planning,
            listed_at: None,
            sold_at: None,
            sale_price: None,
        }),
        Status::ForSale => {
            if pc.list_price.is_none() {
                return Err(AppError::Validation {
                    field: "list_price",
                    message: "Set a list price before listing the build",
                });
            }
            let listed_at = req.listed_at.unwrap_or(now);
            if listed_at > now {
                return Err(AppError::Validation {
                    field: "listed_at",
                    message: "Listed date must not be in the future",
                });
            }
            Ok(StatusChange {
                status: Status::ForSale,
                listed_at: Some(listed_at),
                sold_at: None,
                sale_price: None,
            })
        }
        Status::Sold => {
            let sale_price = req.sale_price.or(pc.sale_price).ok_or(AppError::Validation {
                field: "sale_price",
                message: "Sale price is required to mark a build sold",
            })?;
            let listed_at = req.listed_at.or(pc.listed_at).unwrap_or(now);
            let sold_at = req.sold_at.unwrap_or(now);
            if listed_at > now || sold_at > now {
                return Err(AppError::Validation {
                    field: "sold_at",
                    message: "Dates must not be in the future",
                });
            }
            if sold_at < listed_at {
                return Err(AppError::Validation {
                    field: "sold_at",
                    message: "Sold date must be on or after the listed date",
                });
            }
            Ok(StatusChange {
                status: Status::Sold,
                listed_at: Some(listed_at),
                sold_at: Some(sold_at),
                sale_price: Some(sale_price),
            })
        }
    }
}

/// A listed build must keep a list price; clearing it would leave the
/// listing priceless.
pub fn validate_price_change(status: Status, new_list_price: Option<i64>) -> Result<(), AppError> {
    if status == Status::ForSale && new_list_price.is_none() {
        return Err(AppError::Validation {
            field: "list_price",
            message: "A listed build must keep a list price",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use uuid::Uuid;

    fn fake_pc(list_price: Option<i64>) -> Pc {
        Pc {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Build1".into(),
            description: None,
            list_price,
            sale_price: None,
            image_url: None,
            status: Status::Planning,
            listed_at: None,
            sold_at: None,
            vat_deductible: None,
            vat_outgoing: None,
            vat_calculated_at: None,
            vat_stale: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn req(status: Status) -> StatusChangeRequest {
        StatusChangeRequest {
            status,
            listed_at: None,
            sold_at: None,
            sale_price: None,
        }
    }

    #[test]
    fn listing_requires_a_list_price() {
        let now = OffsetDateTime::now_utc();
        let err = plan_transition(&fake_pc(None), &req(Status::ForSale), now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "list_price", .. }));

        let change = plan_transition(&fake_pc(Some(100)), &req(Status::ForSale), now).unwrap();
        assert_eq!(change.status, Status::ForSale);
        assert_eq!(change.listed_at, Some(now));
        assert_eq!(change.sold_at, None);
    }

    #[test]
    fn selling_requires_a_sale_price() {
        let now = OffsetDateTime::now_utc();
        let err = plan_transition(&fake_pc(Some(100)), &req(Status::Sold), now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sale_price", .. }));

        let mut r = req(Status::Sold);
        r.sale_price = Some(150);
        let change = plan_transition(&fake_pc(Some(100)), &r, now).unwrap();
        assert_eq!(change.status, Status::Sold);
        assert_eq!(change.sale_price, Some(150));
        assert_eq!(change.sold_at, Some(now));
    }

    #[test]
    fn sold_before_listed_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let mut pc = fake_pc(Some(100));
        pc.listed_at = Some(now - Duration::days(1));
        let mut r = req(Status::Sold);
        r.sale_price = Some(150);
        r.sold_at = Some(now - Duration::days(2));
        let err = plan_transition(&pc, &r, now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sold_at", .. }));
    }

    #[test]
    fn future_dates_are_rejected() {
        let now = OffsetDateTime::now_utc();
        let mut r = req(Status::ForSale);
        r.listed_at = Some(now + Duration::hours(1));
        let err = plan_transition(&fake_pc(Some(100)), &r, now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "listed_at", .. }));

        let mut r = req(Status::Sold);
        r.sale_price = Some(150);
        r.sold_at = Some(now + Duration::hours(1));
        let err = plan_transition(&fake_pc(Some(100)), &r, now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sold_at", .. }));
    }

    #[test]
    fn back_to_planning_clears_sale_state() {
        let now = OffsetDateTime::now_utc();
        let mut pc = fake_pc(Some(100));
        pc.status = Status::Sold;
        pc.listed_at = Some(now - Duration::days(3));
        pc.sold_at = Some(now - Duration::days(1));
        pc.sale_price = Some(150);

        let change = plan_transition(&pc, &req(Status::Planning), now).unwrap();
        assert_eq!(change.status, Status::Planning);
        assert_eq!(change.listed_at, None);
        assert_eq!(change.sold_at, None);
        assert_eq!(change.sale_price, None);
    }

    #[test]
    fn listed_build_cannot_lose_its_list_price() {
        let err = validate_price_change(Status::ForSale, None).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "list_price", .. }));

        assert!(validate_price_change(Status::ForSale, Some(120_000)).is_ok());
        assert!(validate_price_change(Status::Planning, None).is_ok());
        assert!(validate_price_change(Status::Sold, None).is_ok());
    }

    #[test]
    fn negative_sale_price_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let mut r = req(Status::Sold);
        r.sale_price = Some(-1);
        let err = plan_transition(&fake_pc(Some(100)), &r, now).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sale_price", .. }));
    }
}
