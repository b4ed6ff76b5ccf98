// src/db/lead_repo.rs

use sqlx::{postgres::PgArguments, query::QueryAs, Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::AccessScope,
        filters::{like_pattern, LeadFilter, LeadOrdering},
        leads::{Lead, LeadDraft, LeadStatus},
    },
};

// Colunas do lead + nome do atendente. Sempre com alias `l` para a linha do
// lead e `u` para o usuário, inclusive quando `l` é uma CTE.
const LEAD_COLUMNS: &str = r#"
    SELECT
        l.id, l.name, l.phone, l.email, l.course_of_interest,
        l.status, l.origin, l.priority,
        l.closing_probability, l.course_value, l.next_contact_date,
        l.notes, l.internal_notes, l.assigned_agent_id,
        COALESCE(NULLIF(TRIM(u.full_name), ''), u.email) AS assigned_agent_name,
        l.created_at, l.updated_at
"#;

const AGENT_JOIN: &str = " LEFT JOIN users u ON u.id = l.assigned_agent_id";

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{LEAD_COLUMNS} FROM leads l{AGENT_JOIN} WHERE l.id = $1");
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(lead)
    }

    /// Igual a `find_by_id`, mas trava a linha do lead até o fim da transação.
    /// O "antes" de uma alteração precisa vir daqui.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // FOR UPDATE OF l: o lado nulo do LEFT JOIN não pode ser travado
        let sql = format!("{LEAD_COLUMNS} FROM leads l{AGENT_JOIN} WHERE l.id = $1 FOR UPDATE OF l");
        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(lead)
    }

    /// Busca filtrada e ordenada. `window` = (limit, offset); `None` traz tudo.
    pub async fn search<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
        filter: &LeadFilter,
        ordering: LeadOrdering,
        timezone: &str,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = search_query(scope, filter, ordering, timezone, window);
        let leads = qb.build_query_as::<Lead>().fetch_all(executor).await?;
        Ok(leads)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        scope: AccessScope,
        filter: &LeadFilter,
        timezone: &str,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads l");
        push_lead_predicates(&mut qb, scope, filter, timezone);
        let total = qb.build_query_scalar::<i64>().fetch_one(executor).await?;
        Ok(total)
    }

    // =========================================================================
    //  ESCRITA (sempre dentro da transação do serviço)
    // =========================================================================

    pub async fn insert<'e, E>(&self, executor: E, draft: &LeadDraft) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH l AS (
                INSERT INTO leads (
                    name, phone, email, course_of_interest,
                    status, origin, priority,
                    closing_probability, course_value, next_contact_date,
                    notes, internal_notes, assigned_agent_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING *
            )
            {LEAD_COLUMNS} FROM l{AGENT_JOIN}
            "#
        );

        let lead = bind_draft(sqlx::query_as::<_, Lead>(&sql), draft)
            .fetch_one(executor)
            .await?;
        Ok(lead)
    }

    /// Regrava todos os campos editáveis. `updated_at` é sempre renovado.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        draft: &LeadDraft,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH l AS (
                UPDATE leads SET
                    name = $1, phone = $2, email = $3, course_of_interest = $4,
                    status = $5, origin = $6, priority = $7,
                    closing_probability = $8, course_value = $9, next_contact_date = $10,
                    notes = $11, internal_notes = $12, assigned_agent_id = $13,
                    updated_at = NOW()
                WHERE id = $14
                RETURNING *
            )
            {LEAD_COLUMNS} FROM l{AGENT_JOIN}
            "#
        );

        let lead = bind_draft(sqlx::query_as::<_, Lead>(&sql), draft)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        Ok(lead)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: LeadStatus,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH l AS (
                UPDATE leads SET status = $1, updated_at = NOW()
                WHERE id = $2
                RETURNING *
            )
            {LEAD_COLUMNS} FROM l{AGENT_JOIN}
            "#
        );

        let lead = sqlx::query_as::<_, Lead>(&sql)
            .bind(status)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        Ok(lead)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::LeadNotFound(id));
        }
        Ok(())
    }
}

type LeadQuery<'q> = QueryAs<'q, Postgres, Lead, PgArguments>;

// $1..$13 na ordem das colunas do INSERT/UPDATE
fn bind_draft<'q>(query: LeadQuery<'q>, draft: &LeadDraft) -> LeadQuery<'q> {
    query
        .bind(draft.name.clone())
        .bind(draft.phone.clone())
        .bind(draft.email.clone())
        .bind(draft.course_of_interest.clone())
        .bind(draft.status)
        .bind(draft.origin)
        .bind(draft.priority)
        .bind(draft.closing_probability)
        .bind(draft.course_value)
        .bind(draft.next_contact_date)
        .bind(draft.notes.clone())
        .bind(draft.internal_notes.clone())
        .bind(draft.assigned_agent_id)
}

pub(crate) fn search_query<'a>(
    scope: AccessScope,
    filter: &LeadFilter,
    ordering: LeadOrdering,
    timezone: &str,
    window: Option<(i64, i64)>,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("{LEAD_COLUMNS} FROM leads l{AGENT_JOIN}"));
    push_lead_predicates(&mut qb, scope, filter, timezone);

    qb.push(" ORDER BY ");
    qb.push(ordering.sql());

    if let Some((limit, offset)) = window {
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);
    }
    qb
}

/// Abre o WHERE com o escopo de visibilidade. Tudo o que vem depois é `AND`.
pub(crate) fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: AccessScope) {
    qb.push(" WHERE TRUE");
    if let AccessScope::AssignedTo(agent_id) = scope {
        qb.push(" AND l.assigned_agent_id = ").push_bind(agent_id);
    }
}

/// Monta o WHERE da busca de leads. O escopo de visibilidade entra primeiro;
/// os filtros do usuário só estreitam o que o escopo já permite.
pub(crate) fn push_lead_predicates(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: AccessScope,
    filter: &LeadFilter,
    timezone: &str,
) {
    push_scope(qb, scope);

    if let Some(text) = &filter.text {
        let pattern = like_pattern(text);
        qb.push(" AND (l.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR l.email ILIKE ").push_bind(pattern.clone());
        qb.push(" OR l.course_of_interest ILIKE ").push_bind(pattern);
        qb.push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND l.status = ").push_bind(status);
    }
    if let Some(origin) = filter.origin {
        qb.push(" AND l.origin = ").push_bind(origin);
    }
    if let Some(agent_id) = filter.agent_id {
        qb.push(" AND l.assigned_agent_id = ").push_bind(agent_id);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND l.priority = ").push_bind(priority);
    }
    if let Some(min) = filter.probability_min {
        qb.push(" AND l.closing_probability >= ").push_bind(min);
    }
    if let Some(max) = filter.probability_max {
        qb.push(" AND l.closing_probability <= ").push_bind(max);
    }

    // Datas de criação comparadas no fuso da aplicação, limites inclusivos
    if let Some(from) = filter.created_from {
        qb.push(" AND (l.created_at AT TIME ZONE ")
            .push_bind(timezone.to_string())
            .push(")::date >= ")
            .push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND (l.created_at AT TIME ZONE ")
            .push_bind(timezone.to_string())
            .push(")::date <= ")
            .push_bind(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const TZ: &str = "America/Sao_Paulo";

    fn where_clause(scope: AccessScope, filter: &LeadFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads l");
        push_lead_predicates(&mut qb, scope, filter, TZ);
        qb.sql().to_string()
    }

    #[test]
    fn no_filters_and_full_scope_is_unrestricted() {
        let sql = where_clause(AccessScope::All, &LeadFilter::default());
        assert_eq!(sql, "SELECT COUNT(*) FROM leads l WHERE TRUE");
    }

    #[test]
    fn agent_scope_comes_before_user_filters() {
        let filter = LeadFilter {
            agent_id: Some(Uuid::new_v4()),
            status: Some(LeadStatus::Converted),
            ..Default::default()
        };
        let sql = where_clause(AccessScope::AssignedTo(Uuid::new_v4()), &filter);

        assert!(sql.starts_with("SELECT COUNT(*) FROM leads l WHERE TRUE AND l.assigned_agent_id = $1"));
        assert!(sql.contains("l.status = $2"));
        assert!(sql.contains("l.assigned_agent_id = $3"));
    }

    #[test]
    fn text_search_binds_the_pattern_for_each_column() {
        let filter = LeadFilter {
            text: Some("ana".into()),
            ..Default::default()
        };
        let sql = where_clause(AccessScope::All, &filter);
        assert!(sql.contains(
            "(l.name ILIKE $1 OR l.email ILIKE $2 OR l.course_of_interest ILIKE $3)"
        ));
    }

    #[test]
    fn date_range_uses_application_timezone() {
        let filter = LeadFilter {
            created_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            created_to: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..Default::default()
        };
        let sql = where_clause(AccessScope::All, &filter);
        assert!(sql.contains("(l.created_at AT TIME ZONE $1)::date >= $2"));
        assert!(sql.contains("(l.created_at AT TIME ZONE $3)::date <= $4"));
    }

    #[test]
    fn search_orders_then_paginates() {
        let qb = search_query(
            AccessScope::All,
            &LeadFilter::default(),
            LeadOrdering::default(),
            TZ,
            Some((20, 40)),
        );
        assert!(
            qb.sql()
                .ends_with("WHERE TRUE ORDER BY l.created_at DESC, l.id DESC LIMIT $1 OFFSET $2")
        );
    }

    #[test]
    fn export_search_has_no_limit() {
        let qb = search_query(
            AccessScope::All,
            &LeadFilter::default(),
            LeadOrdering::default(),
            TZ,
            None,
        );
        assert!(!qb.sql().contains("LIMIT"));
    }
}
