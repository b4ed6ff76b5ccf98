// src/services/lead_service.rs
//
// Ciclo de vida do lead. Cada operação abre uma transação: a escrita do lead
// e os registros de atividade entram juntos ou não entram. Em qualquer `?`
// antes do commit a transação é descartada (rollback no drop).

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, LeadRepository, UserRepository},
    models::{
        activity::{ActivityAction, NewActivity},
        auth::Actor,
        leads::{CreateLeadPayload, Lead, LeadChanges, LeadDraft, LeadStatus},
    },
    services::access_policy,
};

#[derive(Clone)]
pub struct LeadService {
    pool: PgPool,
    leads: LeadRepository,
    activities: ActivityRepository,
    users: UserRepository,
}

impl LeadService {
    pub fn new(
        pool: PgPool,
        leads: LeadRepository,
        activities: ActivityRepository,
        users: UserRepository,
    ) -> Self {
        Self { pool, leads, activities, users }
    }

    pub async fn create(&self, actor: &Actor, payload: CreateLeadPayload) -> Result<Lead, AppError> {
        let draft = LeadDraft::from_payload(payload)?;
        let draft = access_policy::restrict_draft(actor, None, draft)?;
        draft.check_invariants()?;

        let mut tx = self.pool.begin().await?;
        self.ensure_agent_exists(&mut tx, draft.assigned_agent_id).await?;

        let lead = self.leads.insert(&mut *tx, &draft).await?;
        let entry = NewActivity::new(
            ActivityAction::Created,
            format!("Lead criado por {}", actor.display_name),
        );
        self.activities
            .append(&mut *tx, lead.id, &lead.name, Some(actor.id), &entry)
            .await?;

        tx.commit().await?;

        tracing::info!(lead_id = %lead.id, actor_id = %actor.id, "lead criado");
        Ok(lead)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Lead, AppError> {
        let lead = self
            .leads
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        access_policy::ensure_can_view(actor, &lead)?;
        Ok(lead)
    }

    /// Alteração parcial. Sem nenhuma diferença, não grava nada nem registra atividade.
    pub async fn update(&self, actor: &Actor, id: Uuid, changes: LeadChanges) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        let prior = self
            .leads
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        access_policy::ensure_can_mutate(actor, &prior)?;

        let prior_draft = LeadDraft::from_lead(&prior);
        let next = prior_draft.clone().apply(changes)?;
        let next = access_policy::restrict_draft(actor, Some(&prior_draft), next)?;
        next.check_invariants()?;

        if next == prior_draft {
            return Ok(prior);
        }
        if next.assigned_agent_id != prior.assigned_agent_id {
            self.ensure_agent_exists(&mut tx, next.assigned_agent_id).await?;
        }

        let updated = self.leads.update(&mut *tx, id, &next).await?;
        for entry in diff_activities(&prior, &updated, actor) {
            self.activities
                .append(&mut *tx, updated.id, &updated.name, Some(actor.id), &entry)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(lead_id = %id, actor_id = %actor.id, "lead atualizado");
        Ok(updated)
    }

    /// Mudança rápida de status (kanban). Devolve o lead e se houve mudança.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: Uuid,
        raw_status: &str,
    ) -> Result<(Lead, bool), AppError> {
        let mut tx = self.pool.begin().await?;

        let prior = self
            .leads
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        access_policy::ensure_can_mutate(actor, &prior)?;

        let status = raw_status.trim().parse::<LeadStatus>()?;
        if status == prior.status {
            return Ok((prior, false));
        }

        let updated = self.leads.update_status(&mut *tx, id, status).await?;
        let entry = NewActivity::new(
            ActivityAction::StatusChanged,
            format!(
                "Status alterado via pipeline de \"{}\" para \"{}\"",
                prior.status.label(),
                updated.status.label()
            ),
        )
        .with_values(
            Some(prior.status.code().to_string()),
            Some(updated.status.code().to_string()),
        );
        self.activities
            .append(&mut *tx, updated.id, &updated.name, Some(actor.id), &entry)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lead_id = %id,
            actor_id = %actor.id,
            from = prior.status.code(),
            to = updated.status.code(),
            "status alterado via pipeline"
        );
        Ok((updated, true))
    }

    /// O registro `deleted` é gravado antes da remoção e sobrevive a ela.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let prior = self
            .leads
            .find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::LeadNotFound(id))?;
        access_policy::ensure_can_mutate(actor, &prior)?;

        let entry = NewActivity::new(
            ActivityAction::Deleted,
            format!("Lead deletado por {}", actor.display_name),
        )
        .with_values(Some(prior.name.clone()), None);
        self.activities
            .append(&mut *tx, prior.id, &prior.name, Some(actor.id), &entry)
            .await?;
        self.leads.delete(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(lead_id = %id, actor_id = %actor.id, "lead removido");
        Ok(())
    }

    // Atendente inexistente é erro de formulário, não falha do banco (FK)
    async fn ensure_agent_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        agent_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let Some(agent_id) = agent_id else {
            return Ok(());
        };
        if self.users.exists(&mut **tx, agent_id).await? {
            Ok(())
        } else {
            Err(AppError::field("assignedAgentId", "invalid_choice"))
        }
    }
}

/// Compara o antes e o depois de uma alteração e produz os registros de
/// atividade. Status e atendente geram registros independentes; `updated`
/// só aparece quando nenhum dos dois mudou.
pub fn diff_activities(prior: &Lead, next: &Lead, actor: &Actor) -> Vec<NewActivity> {
    let mut entries = Vec::new();

    let status_changed = prior.status != next.status;
    let agent_changed = prior.assigned_agent_id != next.assigned_agent_id;

    if status_changed {
        entries.push(
            NewActivity::new(
                ActivityAction::StatusChanged,
                format!(
                    "Status alterado de \"{}\" para \"{}\"",
                    prior.status.label(),
                    next.status.label()
                ),
            )
            .with_values(
                Some(prior.status.code().to_string()),
                Some(next.status.code().to_string()),
            ),
        );
    }

    if agent_changed {
        let new_name = next.assigned_agent_name.as_deref().unwrap_or("Nenhum");
        entries.push(
            NewActivity::new(
                ActivityAction::Assigned,
                format!("Atendente alterado para {new_name}"),
            )
            .with_values(
                prior.assigned_agent_name.clone(),
                next.assigned_agent_name.clone(),
            ),
        );
    }

    if !status_changed && !agent_changed && LeadDraft::from_lead(prior) != LeadDraft::from_lead(next) {
        entries.push(NewActivity::new(
            ActivityAction::Updated,
            format!("Lead atualizado por {}", actor.display_name),
        ));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::Role, leads::fixtures};

    fn manager() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            display_name: "Gestora Carla".into(),
            role: Role::Manager,
        }
    }

    #[test]
    fn status_and_agent_change_yield_two_entries() {
        let u3 = Uuid::new_v4();
        let u4 = Uuid::new_v4();
        let mut prior = fixtures::lead("Ana Silva", LeadStatus::New, Some(u3));
        prior.assigned_agent_name = Some("Bruno".into());

        let mut next = prior.clone();
        next.status = LeadStatus::Converted;
        next.assigned_agent_id = Some(u4);
        next.assigned_agent_name = Some("Diana".into());

        let entries = diff_activities(&prior, &next, &manager());
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].action, ActivityAction::StatusChanged);
        assert_eq!(entries[0].old_value.as_deref(), Some("novo"));
        assert_eq!(entries[0].new_value.as_deref(), Some("convertido"));
        assert_eq!(entries[0].description, "Status alterado de \"Novo\" para \"Convertido\"");

        assert_eq!(entries[1].action, ActivityAction::Assigned);
        assert_eq!(entries[1].old_value.as_deref(), Some("Bruno"));
        assert_eq!(entries[1].new_value.as_deref(), Some("Diana"));
        assert_eq!(entries[1].description, "Atendente alterado para Diana");
    }

    #[test]
    fn unassigning_mentions_nobody() {
        let prior = fixtures::lead("Ana Silva", LeadStatus::New, Some(Uuid::new_v4()));
        let mut next = prior.clone();
        next.assigned_agent_id = None;
        next.assigned_agent_name = None;

        let entries = diff_activities(&prior, &next, &manager());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Atendente alterado para Nenhum");
        assert_eq!(entries[0].new_value, None);
    }

    #[test]
    fn other_fields_only_yield_updated() {
        let prior = fixtures::lead("Ana Silva", LeadStatus::Contacted, None);
        let mut next = prior.clone();
        next.phone = "11988887777".into();

        let entries = diff_activities(&prior, &next, &manager());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::Updated);
        assert_eq!(entries[0].description, "Lead atualizado por Gestora Carla");
    }

    #[test]
    fn status_change_does_not_also_log_updated() {
        let prior = fixtures::lead("Ana Silva", LeadStatus::Contacted, None);
        let mut next = prior.clone();
        next.status = LeadStatus::InProgress;
        next.notes = "ligar de manhã".into();

        let actions: Vec<_> = diff_activities(&prior, &next, &manager())
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec![ActivityAction::StatusChanged]);
    }

    #[test]
    fn identical_snapshots_yield_nothing() {
        let prior = fixtures::lead("Ana Silva", LeadStatus::New, None);
        let mut next = prior.clone();
        // Só os carimbos de tempo mudaram
        next.updated_at = chrono::Utc::now();
        assert!(diff_activities(&prior, &next, &manager()).is_empty());
    }
}
