// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::leads::{LeadOrigin, LeadStatus, LeadView};

// 1. Os cards do topo + gráficos
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_leads: i64,
    pub new_leads: i64,
    pub in_progress: i64,
    pub converted: i64,
    // Ticket médio (média do valor do curso)
    #[schema(value_type = f64)]
    pub average_ticket: Decimal,
    // Soma do valor dos convertidos
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    pub latest_leads: Vec<LeadView>,
    pub by_status: Vec<StatusCount>,
    pub by_origin: Vec<OriginCount>,
    pub agent_ranking: Vec<AgentRankingEntry>,
}

// 2. Donut do funil
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: LeadStatus,
    #[sqlx(skip)]
    pub label: &'static str,
    pub count: i64,
}

// 3. Leads por origem
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OriginCount {
    pub origin: LeadOrigin,
    #[sqlx(skip)]
    pub label: &'static str,
    pub count: i64,
}

// 4. Ranking de atendentes por conversões
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentRankingEntry {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub converted: i64,
}
