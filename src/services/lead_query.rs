// src/services/lead_query.rs
//
// Consultas de leads. Somente leitura: nada aqui grava ou registra atividade.

use crate::{
    common::{
        error::AppError,
        pagination::{PageRequest, Paginated},
    },
    db::LeadRepository,
    models::{
        auth::Actor,
        filters::{LeadFilter, LeadOrdering},
        leads::{Lead, LeadStatus, LeadView, PipelineColumn},
    },
    services::access_policy,
};

#[derive(Clone)]
pub struct LeadQueryService {
    leads: LeadRepository,
    // Fuso usado para comparar datas de criação (APP_TIMEZONE)
    timezone: String,
}

impl LeadQueryService {
    pub fn new(leads: LeadRepository, timezone: String) -> Self {
        Self { leads, timezone }
    }

    /// Busca no conjunto visível do ator. O escopo é sempre o primeiro
    /// predicado; nenhum filtro consegue ampliá-lo.
    pub async fn search(
        &self,
        actor: &Actor,
        filter: &LeadFilter,
        ordering: LeadOrdering,
        page: PageRequest,
    ) -> Result<Paginated<Lead>, AppError> {
        let scope = access_policy::visible_leads(actor);
        let pool = self.leads.pool();

        let total_items = self.leads.count(pool, scope, filter, &self.timezone).await?;

        let window = page.resolve(total_items);
        let items = self
            .leads
            .search(pool, scope, filter, ordering, &self.timezone, window.limit_offset)
            .await?;

        Ok(Paginated::new(items, window, total_items))
    }

    /// O conjunto filtrado inteiro, para exportações.
    pub async fn export(
        &self,
        actor: &Actor,
        filter: &LeadFilter,
        ordering: LeadOrdering,
    ) -> Result<Vec<Lead>, AppError> {
        let page = self.search(actor, filter, ordering, PageRequest::All).await?;
        Ok(page.items)
    }

    /// Kanban: uma coluna por status, na ordem do funil, mais novos primeiro.
    pub async fn pipeline(&self, actor: &Actor) -> Result<Vec<PipelineColumn>, AppError> {
        let leads = self
            .export(actor, &LeadFilter::default(), LeadOrdering::default())
            .await?;
        let views = leads.into_iter().map(|lead| LeadView::project(lead, actor));
        Ok(group_by_status(views))
    }
}

// Preserva a ordem de chegada dentro de cada coluna.
fn group_by_status(views: impl IntoIterator<Item = LeadView>) -> Vec<PipelineColumn> {
    let mut columns: Vec<PipelineColumn> = LeadStatus::ALL
        .into_iter()
        .map(|status| PipelineColumn {
            status,
            label: status.label(),
            leads: Vec::new(),
        })
        .collect();

    for view in views {
        if let Some(column) = columns.iter_mut().find(|c| c.status == view.status) {
            column.leads.push(view);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leads::fixtures;

    #[test]
    fn every_status_gets_a_column_even_when_empty() {
        let views = [
            fixtures::lead("Ana", LeadStatus::Converted, None),
            fixtures::lead("Bia", LeadStatus::New, None),
            fixtures::lead("Caio", LeadStatus::Converted, None),
        ]
        .into_iter()
        .map(|lead| LeadView::new(lead, true));

        let columns = group_by_status(views);

        let statuses: Vec<_> = columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, LeadStatus::ALL.to_vec());

        let converted: Vec<_> = columns[3].leads.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(converted, vec!["Ana", "Caio"]);
        assert_eq!(columns[0].leads.len(), 1);
        assert!(columns[1].leads.is_empty());
        assert_eq!(columns[1].label, "Em Contato");
    }
}
