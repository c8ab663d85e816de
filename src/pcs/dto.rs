use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::components::dto::ComponentResponse;
use crate::pcs::repo::{Pc, Status};

#[derive(Debug, Deserialize)]
pub struct PcRequest {
    pub name: String,
    pub description: Option<String>,
    pub list_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: Status,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub listed_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub sold_at: Option<OffsetDateTime>,
    pub sale_price: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct VatSnapshot {
    pub deductible: Option<i64>,
    pub outgoing: Option<i64>,
    pub calculated_at: Option<OffsetDateTime>,
    pub stale: bool,
}

#[derive(Debug, Serialize)]
pub struct PcResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub list_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub image_url: Option<String>,
    pub status: Status,
    pub listed_at: Option<OffsetDateTime>,
    pub sold_at: Option<OffsetDateTime>,
    pub vat: VatSnapshot,
    pub created_at: OffsetDateTime,
}

impl From<Pc> for PcResponse {
    fn from(pc: Pc) -> Self {
        Self {
            id: pc.id,
            name: pc.name,
            description: pc.description,
            list_price: pc.list_price,
            sale_price: pc.sale_price,
            image_url: pc.image_url,
            status: pc.status,
            listed_at: pc.listed_at,
            sold_at: pc.sold_at,
            vat: VatSnapshot {
                deductible: pc.vat_deductible,
                outgoing: pc.vat_outgoing,
                calculated_at: pc.vat_calculated_at,
                stale: pc.vat_stale,
            },
            created_at: pc.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PcDetails {
    #[serde(flatten)]
    pub pc: PcResponse,
    pub components: Vec<ComponentResponse>,
    pub components_total: i64,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image_url: String,
}
