// src/services/access_policy.rs
//
// Regras de acesso por papel. Funções puras: quem consulta o banco aplica
// o `AccessScope` como primeiro predicado de qualquer busca.

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{AccessScope, Actor, Role},
        leads::{Lead, LeadDraft, LeadView},
    },
};

pub fn visible_leads(actor: &Actor) -> AccessScope {
    match actor.role {
        Role::Admin | Role::Manager => AccessScope::All,
        Role::Agent => AccessScope::AssignedTo(actor.id),
    }
}

pub fn can_mutate(actor: &Actor, lead: &Lead) -> bool {
    visible_leads(actor).admits(lead)
}

pub fn can_see_internal_notes(actor: &Actor) -> bool {
    actor.role.is_elevated()
}

pub fn ensure_can_view(actor: &Actor, lead: &Lead) -> Result<(), AppError> {
    if visible_leads(actor).admits(lead) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "o lead {} não está atribuído a você",
            lead.id
        )))
    }
}

pub fn ensure_can_mutate(actor: &Actor, lead: &Lead) -> Result<(), AppError> {
    if can_mutate(actor, lead) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "apenas o atendente responsável pode alterar o lead {}",
            lead.id
        )))
    }
}

impl LeadView {
    /// Representação montada por requisição, só com os campos que o ator pode ver.
    pub fn project(lead: Lead, actor: &Actor) -> Self {
        LeadView::new(lead, can_see_internal_notes(actor))
    }
}

/// `None` = qualquer usuário pode ser atribuído.
/// `Some(id)` = a única escolha possível é o próprio ator.
pub fn assignable_agent_restriction(actor: &Actor) -> Option<Uuid> {
    match actor.role {
        Role::Admin | Role::Manager => None,
        Role::Agent => Some(actor.id),
    }
}

/// Projeção de escrita por papel: o que um ATENDENTE envia é recortado
/// antes de chegar ao banco.
///
/// - `internal_notes` do ATENDENTE é ignorado (mantém o valor anterior).
/// - o atendente escolhido precisa estar no conjunto permitido.
/// - `prior` é `None` na criação; nesse caso o ATENDENTE sem atendente
///   escolhido fica com o lead para si.
pub fn restrict_draft(
    actor: &Actor,
    prior: Option<&LeadDraft>,
    mut draft: LeadDraft,
) -> Result<LeadDraft, AppError> {
    let Some(only_choice) = assignable_agent_restriction(actor) else {
        return Ok(draft);
    };

    draft.internal_notes = prior.and_then(|p| p.internal_notes.clone());

    match (prior, draft.assigned_agent_id) {
        (None, None) => draft.assigned_agent_id = Some(only_choice),
        (_, Some(agent)) if agent != only_choice => {
            // Mesmo erro que o formulário dá para uma opção fora da lista
            return Err(AppError::field("assignedAgentId", "invalid_choice"));
        }
        _ => {}
    }

    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leads::{fixtures, LeadStatus};

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            display_name: "Fulano".into(),
            role,
        }
    }

    #[test]
    fn elevated_roles_see_and_mutate_everything() {
        for role in [Role::Admin, Role::Manager] {
            let actor = actor(role);
            let someone_elses = fixtures::lead("Ana", LeadStatus::New, Some(Uuid::new_v4()));
            let unassigned = fixtures::lead("Bia", LeadStatus::New, None);

            assert_eq!(visible_leads(&actor), AccessScope::All);
            assert!(can_mutate(&actor, &someone_elses));
            assert!(can_mutate(&actor, &unassigned));
            assert!(can_see_internal_notes(&actor));
            assert_eq!(assignable_agent_restriction(&actor), None);
        }
    }

    #[test]
    fn agent_is_scoped_to_own_leads() {
        let agent = actor(Role::Agent);
        let own = fixtures::lead("Ana", LeadStatus::New, Some(agent.id));
        let other = fixtures::lead("Bia", LeadStatus::New, Some(Uuid::new_v4()));
        let unassigned = fixtures::lead("Caio", LeadStatus::New, None);

        assert_eq!(visible_leads(&agent), AccessScope::AssignedTo(agent.id));
        assert!(can_mutate(&agent, &own));
        assert!(!can_mutate(&agent, &other));
        assert!(!can_mutate(&agent, &unassigned));
        assert!(!can_see_internal_notes(&agent));
        assert!(matches!(
            ensure_can_mutate(&agent, &other),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn agent_projection_has_no_internal_notes() -> Result<(), serde_json::Error> {
        let agent = actor(Role::Agent);
        let lead = fixtures::lead("Ana", LeadStatus::New, Some(agent.id));

        let as_agent = serde_json::to_value(LeadView::project(lead.clone(), &agent))?;
        assert!(as_agent.get("internalNotes").is_none());

        let as_admin = serde_json::to_value(LeadView::project(lead, &actor(Role::Admin)))?;
        assert_eq!(as_admin["internalNotes"], "cliente sensível a preço");
        Ok(())
    }

    #[test]
    fn agent_cannot_write_internal_notes() -> Result<(), AppError> {
        let agent = actor(Role::Agent);
        let lead = fixtures::lead("Ana", LeadStatus::New, Some(agent.id));
        let prior = LeadDraft::from_lead(&lead);

        let mut attempt = prior.clone();
        attempt.internal_notes = Some("vazou".into());

        let restricted = restrict_draft(&agent, Some(&prior), attempt)?;
        assert_eq!(restricted.internal_notes, prior.internal_notes);
        Ok(())
    }

    #[test]
    fn agent_can_only_assign_to_self() -> Result<(), AppError> {
        let agent = actor(Role::Agent);
        let lead = fixtures::lead("Ana", LeadStatus::New, Some(agent.id));
        let prior = LeadDraft::from_lead(&lead);

        let mut handoff = prior.clone();
        handoff.assigned_agent_id = Some(Uuid::new_v4());
        assert!(matches!(
            restrict_draft(&agent, Some(&prior), handoff),
            Err(AppError::ValidationError(_))
        ));

        let mut creation = prior.clone();
        creation.assigned_agent_id = None;
        let created = restrict_draft(&agent, None, creation)?;
        assert_eq!(created.assigned_agent_id, Some(agent.id));
        assert_eq!(created.internal_notes, None);
        Ok(())
    }

    #[test]
    fn manager_draft_passes_through_untouched() -> Result<(), AppError> {
        let manager = actor(Role::Manager);
        let lead = fixtures::lead("Ana", LeadStatus::New, None);
        let mut draft = LeadDraft::from_lead(&lead);
        draft.assigned_agent_id = Some(Uuid::new_v4());

        let restricted = restrict_draft(&manager, None, draft.clone())?;
        assert_eq!(restricted, draft);
        Ok(())
    }
}
