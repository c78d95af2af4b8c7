//! Row types shared across the store modules.

use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;

/// Business entity a risk or queue item is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Store,
    Invoice,
    Inventory,
    Driver,
    Ambassador,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Store => "store",
            EntityType::Invoice => "invoice",
            EntityType::Inventory => "inventory",
            EntityType::Driver => "driver",
            EntityType::Ambassador => "ambassador",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(EntityType::Store),
            "invoice" => Ok(EntityType::Invoice),
            "inventory" => Ok(EntityType::Inventory),
            "driver" => Ok(EntityType::Driver),
            "ambassador" => Ok(EntityType::Ambassador),
            other => Err(format!("Unknown entity type: {}", other)),
        }
    }
}

/// A scored record representing a detected operational problem.
#[derive(Debug, Clone)]
pub struct RiskInsight {
    pub id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub risk_type: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: String,
    pub last_scored_at: String,
}

/// A pending (or resolved) follow-up in the communication queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub suggested_action: String,
    pub reason: String,
    pub urgency: u32,
    pub status: String,
    pub created_at: String,
}

/// One append-only audit row per cycle run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsLogEntry {
    pub id: String,
    pub cycle_type: String,
    pub results: serde_json::Value,
    pub success: bool,
    pub errors: Option<Vec<String>>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: String,
    pub store_id: Option<String>,
    pub amount: f64,
    pub due_date: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct InventoryItem {
    pub id: String,
    pub store_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub reorder_point: Option<i64>,
}

/// Completed-action counts for a single day, bucketed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionsTaken {
    pub follow_ups_sent: u32,
    pub collections_logged: u32,
    pub restocks_ordered: u32,
    pub total_completed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSnapshot {
    pub snapshot_date: String,
    pub revenue: Option<f64>,
    pub orders: Option<i64>,
    pub active_stores: Option<i64>,
}
