// src/services/dashboard_service.rs

use crate::{
    common::error::AppError,
    db::{DashboardRepository, LeadRepository},
    models::{
        auth::Actor,
        dashboard::DashboardSummary,
        filters::{LeadFilter, LeadOrdering},
        leads::LeadView,
    },
    services::access_policy,
};

const LATEST_LEADS: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
    leads: LeadRepository,
    timezone: String,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository, leads: LeadRepository, timezone: String) -> Self {
        Self { repo, leads, timezone }
    }

    pub async fn get_summary(&self, actor: &Actor) -> Result<DashboardSummary, AppError> {
        let scope = access_policy::visible_leads(actor);

        // Iniciamos uma transação (Snapshot consistente dos dados)
        let mut tx = self.repo.pool().begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let totals = self.repo.totals(&mut *tx, scope).await?;
        let by_status = self.repo.count_by_status(&mut *tx, scope).await?;
        let by_origin = self.repo.count_by_origin(&mut *tx, scope).await?;
        let agent_ranking = self.repo.agent_ranking(&mut *tx, scope).await?;
        let latest = self
            .leads
            .search(
                &mut *tx,
                scope,
                &LeadFilter::default(),
                LeadOrdering::default(),
                &self.timezone,
                Some((LATEST_LEADS, 0)),
            )
            .await?;

        // Commit ou rollback tanto faz pra leitura
        tx.commit().await?;

        Ok(DashboardSummary {
            total_leads: totals.total,
            new_leads: totals.new_leads,
            in_progress: totals.in_progress,
            converted: totals.converted,
            average_ticket: totals.average_ticket,
            total_revenue: totals.total_revenue,
            latest_leads: latest
                .into_iter()
                .map(|lead| LeadView::project(lead, actor))
                .collect(),
            by_status,
            by_origin,
            agent_ranking,
        })
    }
}
