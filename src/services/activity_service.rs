// src/services/activity_service.rs

use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    db::{ActivityRepository, LeadRepository},
    models::{
        activity::ActivityLog,
        auth::{AccessScope, Actor},
        filters::ActivityFilter,
    },
    services::access_policy,
};

// Leitura da trilha de auditoria. A escrita fica no LeadService, dentro da
// mesma transação da mudança.
#[derive(Clone)]
pub struct ActivityService {
    activities: ActivityRepository,
    leads: LeadRepository,
    timezone: String,
}

impl ActivityService {
    pub fn new(activities: ActivityRepository, leads: LeadRepository, timezone: String) -> Self {
        Self { activities, leads, timezone }
    }

    pub async fn search(
        &self,
        actor: &Actor,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> Result<Paginated<ActivityLog>, AppError> {
        let scope = access_policy::visible_leads(actor);
        let pool = self.activities.pool();

        let total_items = self.activities.count(pool, scope, filter, &self.timezone).await?;

        let window = page.resolve(total_items);
        let items = self
            .activities
            .search(pool, scope, filter, &self.timezone, window.limit_offset)
            .await?;

        Ok(Paginated::new(items, window, total_items))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<ActivityLog, AppError> {
        let log = self
            .activities
            .find_by_id(self.activities.pool(), id)
            .await?
            .ok_or(AppError::ActivityLogNotFound(id))?;

        if let AccessScope::AssignedTo(_) = access_policy::visible_leads(actor) {
            let lead = self
                .leads
                .find_by_id(self.leads.pool(), log.lead_id)
                .await?
                .ok_or_else(|| {
                    AppError::PermissionDenied(format!("o registro {id} não pertence aos seus leads"))
                })?;
            access_policy::ensure_can_view(actor, &lead)?;
        }
        Ok(log)
    }

    /// Histórico de um lead. Depois da exclusão, só ADMIN/GESTOR ainda o consultam.
    pub async fn for_lead(&self, actor: &Actor, lead_id: Uuid) -> Result<Vec<ActivityLog>, AppError> {
        match self.leads.find_by_id(self.leads.pool(), lead_id).await? {
            Some(lead) => access_policy::ensure_can_view(actor, &lead)?,
            None if actor.role.is_elevated() => {}
            None => return Err(AppError::LeadNotFound(lead_id)),
        }

        self.activities
            .list_for_lead(self.activities.pool(), lead_id)
            .await
    }
}
