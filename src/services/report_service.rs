// src/services/report_service.rs

use genpdf::{elements, style, Alignment, Element, Size};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{auth::Actor, filters::LeadFilter, leads::Lead},
    services::access_policy,
};

const FONT_FAMILY: &str = "Roboto";

// Cabeçalho e pesos das colunas (A4 paisagem)
const COLUMNS: [(&str, usize); 11] = [
    ("Nome", 14),
    ("Telefone", 9),
    ("Email", 14),
    ("Curso", 12),
    ("Origem", 8),
    ("Prioridade", 8),
    ("Prob.", 6),
    ("Valor", 9),
    ("Atendente", 12),
    ("Status", 8),
    ("Data", 8),
];

// Planilha: sem truncar, com data/hora e observação interna
const SHEET_COLUMNS: [(&str, u16); 12] = [
    ("Nome", 25),
    ("Telefone", 15),
    ("Email", 25),
    ("Curso", 20),
    ("Origem", 12),
    ("Prioridade", 12),
    ("Probabilidade", 12),
    ("Valor Curso", 15),
    ("Atendente", 20),
    ("Status", 12),
    ("Data Criação", 18),
    ("Observação Interna", 30),
];

#[derive(Debug, Clone, PartialEq)]
enum SheetCell {
    Text(String),
    Money(f64),
    Blank,
}

#[derive(Clone)]
pub struct ReportService {
    users: UserRepository,
    fonts_dir: String,
}

impl ReportService {
    pub fn new(users: UserRepository, fonts_dir: String) -> Self {
        Self { users, fonts_dir }
    }

    /// Relatório em PDF do conjunto filtrado (já recortado pelo escopo do ator).
    pub async fn leads_pdf(&self, leads: &[Lead], filter: &LeadFilter) -> Result<Vec<u8>, AppError> {
        // Nome do atendente filtrado, para a linha de filtros
        let agent_name = match filter.agent_id {
            Some(id) => self.users.find_by_id(id).await?.map(|u| u.display_name()),
            None => None,
        };

        let summary = filter_summary(filter, agent_name.as_deref());
        let rows: Vec<[String; 11]> = leads.iter().map(report_row).collect();
        let fonts_dir = self.fonts_dir.clone();

        // Montar o PDF é CPU puro; fora do runtime assíncrono
        tokio::task::spawn_blocking(move || render_pdf(&fonts_dir, summary, rows))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))?
    }

    /// Planilha xlsx do conjunto filtrado. A observação interna só sai para quem pode vê-la.
    pub async fn leads_xlsx(&self, leads: &[Lead], actor: &Actor) -> Result<Vec<u8>, AppError> {
        let show_internal = access_policy::can_see_internal_notes(actor);
        let rows: Vec<[SheetCell; 12]> = leads
            .iter()
            .map(|lead| sheet_row(lead, show_internal))
            .collect();

        tokio::task::spawn_blocking(move || render_xlsx(&rows))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de geração da planilha: {}", e))?
            .map_err(|e| AppError::ReportError(e.to_string()))
    }
}

fn render_xlsx(rows: &[[SheetCell; 12]]) -> Result<Vec<u8>, XlsxError> {
    let border = |format: Format| {
        format
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::Black)
    };
    let header_format = border(
        Format::new()
            .set_bold()
            .set_font_size(12)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x366092))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter),
    );
    let data_format = border(
        Format::new()
            .set_font_size(10)
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter),
    );
    let money_format = data_format.clone().set_num_format("#,##0.00");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Leads")?;

    for (col, (title, width)) in (0u16..).zip(SHEET_COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header_format)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, cells) in (1u32..).zip(rows) {
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                SheetCell::Text(text) => {
                    sheet.write_string_with_format(row, col, text, &data_format)?;
                }
                SheetCell::Money(value) => {
                    sheet.write_number_with_format(row, col, *value, &money_format)?;
                }
                SheetCell::Blank => {
                    sheet.write_blank(row, col, &data_format)?;
                }
            }
        }
    }

    // Congela o cabeçalho
    sheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

fn sheet_row(lead: &Lead, show_internal: bool) -> [SheetCell; 12] {
    let text = |value: &str| SheetCell::Text(value.to_string());
    let optional = |value: Option<&str>| match value {
        Some(value) if !value.is_empty() => SheetCell::Text(value.to_string()),
        _ => SheetCell::Blank,
    };

    let value = if lead.course_value.is_zero() {
        SheetCell::Blank
    } else {
        lead.course_value
            .to_f64()
            .map(SheetCell::Money)
            .unwrap_or(SheetCell::Blank)
    };
    let internal_notes = if show_internal {
        optional(lead.internal_notes.as_deref())
    } else {
        SheetCell::Blank
    };

    [
        text(&lead.name),
        text(&lead.phone),
        optional(lead.email.as_deref()),
        text(&lead.course_of_interest),
        text(lead.origin.label()),
        text(lead.priority.label()),
        SheetCell::Text(format!("{}%", lead.closing_probability)),
        value,
        optional(lead.assigned_agent_name.as_deref()),
        text(lead.status.label()),
        SheetCell::Text(lead.created_at.format("%d/%m/%Y %H:%M").to_string()),
        internal_notes,
    ]
}

fn render_pdf(
    fonts_dir: &str,
    summary: Option<String>,
    rows: Vec<[String; 11]>,
) -> Result<Vec<u8>, AppError> {
    // Carrega a fonte da pasta configurada
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None).map_err(|_| {
        AppError::FontNotFound(format!("Fonte {FONT_FAMILY} não encontrada em {fonts_dir}"))
    })?;

    let total = rows.len();

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Relatório de Leads");
    doc.set_paper_size(Size::new(297, 210));
    doc.set_font_size(8);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let mut title = elements::Paragraph::new("Relatório de Leads");
    title.set_alignment(Alignment::Center);
    doc.push(title.styled(style::Style::new().bold().with_font_size(16)));
    doc.push(elements::Break::new(1.5));

    if let Some(summary) = summary {
        doc.push(elements::Paragraph::new(summary).styled(style::Style::new().with_font_size(10)));
        doc.push(elements::Break::new(1));
    }

    let mut table = elements::TableLayout::new(COLUMNS.iter().map(|(_, weight)| *weight).collect());
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let header_style = style::Style::new().bold().with_font_size(9);
    let mut header = table.row();
    for (title, _) in COLUMNS {
        header.push_element(elements::Paragraph::new(title).styled(header_style));
    }
    header.push().map_err(|e| AppError::ReportError(e.to_string()))?;

    for cells in rows {
        let mut row = table.row();
        for cell in cells {
            row.push_element(elements::Paragraph::new(cell));
        }
        row.push().map_err(|e| AppError::ReportError(e.to_string()))?;
    }
    doc.push(table);

    doc.push(elements::Break::new(2));
    let mut footer = elements::Paragraph::new(format!("Total de leads: {total}"));
    footer.set_alignment(Alignment::Right);
    doc.push(footer.styled(style::Style::new().with_font_size(10)));

    // Renderiza para Buffer (Memória)
    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| AppError::ReportError(e.to_string()))?;
    Ok(buffer)
}

/// "Filtros aplicados: ..." ou `None` se nada foi filtrado.
fn filter_summary(filter: &LeadFilter, agent_name: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(text) = &filter.text {
        parts.push(format!("Busca: {text}"));
    }
    if let Some(status) = filter.status {
        parts.push(format!("Status: {}", status.label()));
    }
    if let Some(origin) = filter.origin {
        parts.push(format!("Origem: {}", origin.label()));
    }
    if let Some(agent_id) = filter.agent_id {
        match agent_name {
            Some(name) => parts.push(format!("Atendente: {name}")),
            None => parts.push(format!("Atendente ID: {agent_id}")),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("Filtros aplicados: {}", parts.join(", ")))
    }
}

fn report_row(lead: &Lead) -> [String; 11] {
    [
        truncate(&lead.name, 30),
        lead.phone.clone(),
        truncate(lead.email.as_deref().unwrap_or("-"), 25),
        truncate(&lead.course_of_interest, 25),
        lead.origin.label().to_string(),
        lead.priority.label().to_string(),
        format!("{}%", lead.closing_probability),
        format_value(lead.course_value),
        truncate(lead.assigned_agent_name.as_deref().unwrap_or("-"), 20),
        lead.status.label().to_string(),
        lead.created_at.format("%d/%m/%Y").to_string(),
    ]
}

// Corta em `max` caracteres e marca com "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn format_value(value: Decimal) -> String {
    if value.is_zero() {
        "-".to_string()
    } else {
        format!("R$ {:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leads::{fixtures, LeadOrigin, LeadStatus};
    use testresult::TestResult;
    use uuid::Uuid;

    #[test]
    fn long_cells_are_cut_with_ellipsis() {
        assert_eq!(truncate("Ana", 30), "Ana");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
        // Conta caracteres, não bytes
        assert_eq!(truncate("ção ção", 3), "ção...");
    }

    #[test]
    fn row_uses_labels_and_placeholders() {
        let mut lead = fixtures::lead("Ana Silva", LeadStatus::InProgress, None);
        lead.email = None;
        lead.closing_probability = 40;
        lead.course_value = Decimal::new(150_050, 2);

        let row = report_row(&lead);
        assert_eq!(row[0], "Ana Silva");
        assert_eq!(row[2], "-");
        assert_eq!(row[4], "Orgânico");
        assert_eq!(row[6], "40%");
        assert_eq!(row[7], "R$ 1500.50");
        assert_eq!(row[8], "-");
        assert_eq!(row[9], "Em Progresso");
    }

    #[test]
    fn zero_value_is_a_dash() {
        assert_eq!(format_value(Decimal::ZERO), "-");
    }

    #[test]
    fn sheet_row_keeps_full_text_and_numeric_value() {
        let mut lead = fixtures::lead("Ana Maria da Silva Albuquerque Figueiredo", LeadStatus::Converted, None);
        lead.assigned_agent_name = Some("Bruno".into());
        lead.course_value = Decimal::new(150_050, 2);
        lead.closing_probability = 90;
        lead.internal_notes = Some("pagou à vista".into());

        let row = sheet_row(&lead, true);
        assert_eq!(row[0], SheetCell::Text("Ana Maria da Silva Albuquerque Figueiredo".into()));
        assert_eq!(row[6], SheetCell::Text("90%".into()));
        assert_eq!(row[7], SheetCell::Money(1500.5));
        assert_eq!(row[8], SheetCell::Text("Bruno".into()));
        assert_eq!(row[9], SheetCell::Text("Convertido".into()));
        assert_eq!(row[11], SheetCell::Text("pagou à vista".into()));

        // Atendente não leva a observação interna
        assert_eq!(sheet_row(&lead, false)[11], SheetCell::Blank);
    }

    #[test]
    fn sheet_row_leaves_missing_values_blank() {
        let mut lead = fixtures::lead("Ana Silva", LeadStatus::New, None);
        lead.email = None;
        lead.course_value = Decimal::ZERO;

        let row = sheet_row(&lead, true);
        assert_eq!(row[2], SheetCell::Blank);
        assert_eq!(row[7], SheetCell::Blank);
        assert_eq!(row[8], SheetCell::Blank);
    }

    #[test]
    fn workbook_is_a_zip_container() -> TestResult {
        let lead = fixtures::lead("Ana Silva", LeadStatus::New, None);
        let bytes = render_xlsx(&[sheet_row(&lead, true)])?;
        assert!(bytes.starts_with(b"PK"));
        Ok(())
    }

    #[test]
    fn summary_lists_only_applied_filters() {
        assert_eq!(filter_summary(&LeadFilter::default(), None), None);

        let agent = Uuid::new_v4();
        let filter = LeadFilter {
            text: Some("ana".into()),
            status: Some(LeadStatus::Converted),
            origin: Some(LeadOrigin::Instagram),
            agent_id: Some(agent),
            ..Default::default()
        };
        assert_eq!(
            filter_summary(&filter, Some("Bruno")).as_deref(),
            Some("Filtros aplicados: Busca: ana, Status: Convertido, Origem: Instagram, Atendente: Bruno")
        );
        assert_eq!(
            filter_summary(&LeadFilter { agent_id: Some(agent), ..Default::default() }, None),
            Some(format!("Filtros aplicados: Atendente ID: {agent}"))
        );
    }
}
