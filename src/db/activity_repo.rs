// src/db/activity_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        activity::{ActivityLog, NewActivity},
        auth::AccessScope,
        filters::{like_pattern, ActivityFilter},
    },
};

const ACTIVITY_COLUMNS: &str = r#"
    SELECT
        a.id, a.lead_id, a.lead_name, a.user_id,
        COALESCE(NULLIF(TRIM(u.full_name), ''), u.email) AS user_name,
        a.action, a.old_value, a.new_value, a.description, a.created_at
"#;

const USER_JOIN: &str = " LEFT JOIN users u ON u.id = a.user_id";

// Trilha de auditoria: só existe INSERT. Não há update nem delete aqui.
#[derive(Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Grava um registro. Deve rodar na mesma transação da mudança do lead.
    pub async fn append<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        lead_name: &str,
        user_id: Option<Uuid>,
        entry: &NewActivity,
    ) -> Result<ActivityLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH a AS (
                INSERT INTO activity_logs (
                    lead_id, lead_name, user_id, action, old_value, new_value, description
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            {ACTIVITY_COLUMNS} FROM a{USER_JOIN}
            "#
        );

        let log = sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(lead_id)
            .bind(lead_name)
            .bind(user_id)
            .bind(entry.action)
            .bind(entry.old_value.as_deref())
            .bind(entry.new_value.as_deref())
            .bind(entry.description.as_str())
            .fetch_one(executor)
            .await?;
        Ok(log)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<ActivityLog>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{ACTIVITY_COLUMNS} FROM activity_logs a{USER_JOIN} WHERE a.id = $1");
        let log = sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(log)
    }

    /// Histórico de um lead, mais recente primeiro.
    pub async fn list_for_lead<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
    ) -> Result<Vec<ActivityLog>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "{ACTIVITY_COLUMNS} FROM activity_logs a{USER_JOIN} \
             WHERE a.lead_id = $1 ORDER BY a.created_at DESC, a.id DESC"
        );
        let logs = sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(lead_id)
            .fetch_all(executor)
            .await?;
        Ok(logs)
    }

    pub async fn search<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
        filter: &ActivityFilter,
        timezone: &str,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<ActivityLog>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "{ACTIVITY_COLUMNS} FROM activity_logs a{USER_JOIN}"
        ));
        push_activity_predicates(&mut qb, scope, filter, timezone);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC");

        if let Some((limit, offset)) = window {
            qb.push(" LIMIT ").push_bind(limit);
            qb.push(" OFFSET ").push_bind(offset);
        }

        let logs = qb.build_query_as::<ActivityLog>().fetch_all(executor).await?;
        Ok(logs)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
        filter: &ActivityFilter,
        timezone: &str,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM activity_logs a{USER_JOIN}"
        ));
        push_activity_predicates(&mut qb, scope, filter, timezone);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }
}

/// O ATENDENTE vê os registros dos leads que estão com ele agora.
/// Registros de leads já excluídos ficam só para ADMIN/GESTOR.
pub(crate) fn push_activity_predicates(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: AccessScope,
    filter: &ActivityFilter,
    timezone: &str,
) {
    qb.push(" WHERE TRUE");

    if let AccessScope::AssignedTo(agent_id) = scope {
        qb.push(" AND a.lead_id IN (SELECT id FROM leads WHERE assigned_agent_id = ")
            .push_bind(agent_id)
            .push(")");
    }

    if let Some(lead_id) = filter.lead_id {
        qb.push(" AND a.lead_id = ").push_bind(lead_id);
    }
    if let Some(text) = &filter.lead_text {
        qb.push(" AND a.lead_name ILIKE ").push_bind(like_pattern(text));
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND a.user_id = ").push_bind(user_id);
    }
    if let Some(text) = &filter.user_text {
        let pattern = like_pattern(text);
        qb.push(" AND (u.full_name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR u.email ILIKE ").push_bind(pattern);
        qb.push(")");
    }
    if let Some(action) = filter.action {
        qb.push(" AND a.action = ").push_bind(action);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND (a.created_at AT TIME ZONE ")
            .push_bind(timezone.to_string())
            .push(")::date >= ")
            .push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND (a.created_at AT TIME ZONE ")
            .push_bind(timezone.to_string())
            .push(")::date <= ")
            .push_bind(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityAction;

    fn where_clause(scope: AccessScope, filter: &ActivityFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs a");
        push_activity_predicates(&mut qb, scope, filter, "America/Sao_Paulo");
        qb.sql().to_string()
    }

    #[test]
    fn agent_sees_logs_of_currently_assigned_leads() {
        let sql = where_clause(AccessScope::AssignedTo(Uuid::new_v4()), &ActivityFilter::default());
        assert!(sql.ends_with(
            "WHERE TRUE AND a.lead_id IN (SELECT id FROM leads WHERE assigned_agent_id = $1)"
        ));
    }

    #[test]
    fn filters_follow_the_scope() {
        let filter = ActivityFilter {
            action: Some(ActivityAction::StatusChanged),
            user_text: Some("ana".into()),
            ..Default::default()
        };
        let sql = where_clause(AccessScope::AssignedTo(Uuid::new_v4()), &filter);
        assert!(sql.contains("(u.full_name ILIKE $2 OR u.email ILIKE $3)"));
        assert!(sql.contains("a.action = $4"));
    }

    #[test]
    fn full_scope_adds_no_subquery() {
        let sql = where_clause(AccessScope::All, &ActivityFilter::default());
        assert!(!sql.contains("SELECT id FROM leads"));
    }
}
