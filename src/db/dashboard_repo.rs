// src/db/dashboard_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    db::lead_repo::push_scope,
    models::{
        auth::AccessScope,
        dashboard::{AgentRankingEntry, OriginCount, StatusCount},
    },
};

/// Cards do topo, calculados numa única passada.
#[derive(Debug, FromRow)]
pub struct LeadTotals {
    pub total: i64,
    pub new_leads: i64,
    pub in_progress: i64,
    pub converted: i64,
    pub average_ticket: Decimal,
    pub total_revenue: Decimal,
}

// Todas as consultas recebem o escopo do ator: o painel nunca mostra
// números de leads que a pessoa não poderia abrir.
#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // 1. Resumo Geral
    pub async fn totals<'e, E>(&self, executor: E, scope: AccessScope) -> Result<LeadTotals, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE l.status = 'novo') AS new_leads,
                COUNT(*) FILTER (WHERE l.status = 'progresso') AS in_progress,
                COUNT(*) FILTER (WHERE l.status = 'convertido') AS converted,
                COALESCE(ROUND(AVG(l.course_value), 2), 0) AS average_ticket,
                COALESCE(SUM(l.course_value) FILTER (WHERE l.status = 'convertido'), 0) AS total_revenue
            FROM leads l
            "#,
        );
        push_scope(&mut qb, scope);

        let totals = qb.build_query_as::<LeadTotals>().fetch_one(executor).await?;
        Ok(totals)
    }

    // 2. Donut do funil (na ordem do funil)
    pub async fn count_by_status<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
    ) -> Result<Vec<StatusCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT l.status, COUNT(*) AS count FROM leads l");
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY l.status ORDER BY l.status");

        let mut rows = qb.build_query_as::<StatusCount>().fetch_all(executor).await?;
        for row in &mut rows {
            row.label = row.status.label();
        }
        Ok(rows)
    }

    // 3. Leads por origem (mais frequentes primeiro)
    pub async fn count_by_origin<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
    ) -> Result<Vec<OriginCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT l.origin, COUNT(*) AS count FROM leads l");
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY l.origin ORDER BY count DESC, l.origin");

        let mut rows = qb.build_query_as::<OriginCount>().fetch_all(executor).await?;
        for row in &mut rows {
            row.label = row.origin.label();
        }
        Ok(rows)
    }

    // 4. Top 5 atendentes por conversões
    pub async fn agent_ranking<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
    ) -> Result<Vec<AgentRankingEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                u.id AS agent_id,
                COALESCE(NULLIF(TRIM(u.full_name), ''), u.email) AS agent_name,
                COUNT(*) FILTER (WHERE l.status = 'convertido') AS converted
            FROM leads l
            JOIN users u ON u.id = l.assigned_agent_id
            "#,
        );
        push_scope(&mut qb, scope);
        qb.push(" GROUP BY u.id, u.full_name, u.email ORDER BY converted DESC, agent_name ASC LIMIT 5");

        let ranking = qb.build_query_as::<AgentRankingEntry>().fetch_all(executor).await?;
        Ok(ranking)
    }
}
