// src/common/pagination.rs

use serde::Serialize;
use utoipa::ToSchema;

// Tamanhos fixos por superfície
pub const API_LEAD_PAGE_SIZE: i64 = 20;
pub const ACTIVITY_LOG_PAGE_SIZE: i64 = 20;

/// Como o resultado deve ser recortado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Página 1-based, ainda não validada (vem crua da query string).
    Page { raw: Option<String>, size: i64 },
    /// Exportações: o conjunto filtrado inteiro.
    All,
}

impl PageRequest {
    pub fn page(raw: Option<String>, size: i64) -> Self {
        PageRequest::Page { raw, size }
    }

    /// Traduz o pedido em página efetiva + LIMIT/OFFSET, já sabendo o total.
    pub fn resolve(&self, total_items: i64) -> PageWindow {
        match self {
            PageRequest::Page { raw, size } => {
                let page = resolve_page(raw.as_deref(), total_items, *size);
                PageWindow {
                    page,
                    page_size: *size,
                    limit_offset: Some((*size, (page - 1) * size)),
                }
            }
            PageRequest::All => PageWindow {
                page: 1,
                page_size: total_items,
                limit_offset: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub page_size: i64,
    pub limit_offset: Option<(i64, i64)>,
}

/// Resolve a página pedida para a página válida mais próxima.
/// Não numérica ou < 1 vira 1; acima da última vira a última.
pub fn resolve_page(raw: Option<&str>, total_items: i64, page_size: i64) -> i64 {
    let last = total_pages(total_items, page_size);
    let Some(value) = raw.map(str::trim) else {
        return 1;
    };
    match value.parse::<i64>() {
        Ok(requested) => requested.clamp(1, last),
        // Só dígitos mas não cabe em i64: bem além da última
        Err(_) if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) => last,
        Err(_) => 1,
    }
}

/// Sempre pelo menos 1 página, mesmo com zero itens.
pub fn total_pages(total_items: i64, page_size: i64) -> i64 {
    if total_items <= 0 || page_size <= 0 {
        1
    } else {
        (total_items + page_size - 1) / page_size
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_items: i64) -> Self {
        Self {
            items,
            page: window.page,
            page_size: window.page_size,
            total_items,
            total_pages: total_pages(total_items, window.page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_garbage_page_is_first_page() {
        assert_eq!(resolve_page(None, 50, 20), 1);
        assert_eq!(resolve_page(Some("abc"), 50, 20), 1);
        assert_eq!(resolve_page(Some("-3"), 50, 20), 1);
        assert_eq!(resolve_page(Some("0"), 50, 20), 1);
        assert_eq!(resolve_page(Some("-99999999999999999999"), 50, 20), 1);
    }

    #[test]
    fn page_past_the_end_is_last_page() {
        assert_eq!(resolve_page(Some("99"), 50, 20), 3);
        assert_eq!(resolve_page(Some(" 2 "), 50, 20), 2);
        assert_eq!(resolve_page(Some("99999999999999999999"), 50, 20), 3);
        assert_eq!(resolve_page(Some("99999999999999999999"), 0, 20), 1);
    }

    #[test]
    fn empty_result_still_has_one_page() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(resolve_page(Some("5"), 0, 20), 1);
    }

    #[test]
    fn window_skips_previous_pages() {
        let window = PageRequest::page(Some("3".into()), 20).resolve(45);
        assert_eq!(window.page, 3);
        assert_eq!(window.limit_offset, Some((20, 40)));
    }

    #[test]
    fn export_window_is_unbounded() {
        let window = PageRequest::All.resolve(45);
        assert_eq!(window.limit_offset, None);
        assert_eq!(Paginated::new(vec![0u8; 45], window, 45).total_pages, 1);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(41, 20), 3);
    }
}
