use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::components::repo::{Component, ComponentKind, Condition};

#[derive(Debug, Deserialize)]
pub struct ComponentRequest {
    pub name: String,
    pub price: i64,
    pub manufacturer: String,
    pub kind: ComponentKind,
    pub condition: Condition,
    pub store: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComponentResponse {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub manufacturer: String,
    pub kind: ComponentKind,
    pub condition: Condition,
    pub store: Option<String>,
    pub pc_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl From<Component> for ComponentResponse {
    fn from(c: Component) -> Self {
        Self {
            id: c.id,
            name: c.name,
            price: c.price,
            manufacturer: c.manufacturer,
            kind: c.kind,
            condition: c.condition,
            store: c.store,
            pc_id: c.pc_id,
            created_at: c.created_at,
        }
    }
}
