// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// Catálogo de mensagens de erro por idioma.
// As chaves são os códigos que o AppError expõe em `message_key()`.
const PT: &[(&str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos."),
    ("email_already_exists", "Este e-mail já está em uso."),
    ("invalid_credentials", "E-mail ou senha inválidos."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("user_not_found", "Usuário não encontrado."),
    ("lead_not_found", "Lead não encontrado."),
    ("activity_log_not_found", "Registro de atividade não encontrado."),
    ("permission_denied", "Você não tem permissão para realizar esta ação."),
    ("invalid_status", "Status inválido."),
    ("internal_error", "Ocorreu um erro inesperado."),
    ("report_error", "Não foi possível gerar o relatório."),
];

const EN: &[(&str, &str)] = &[
    ("validation_error", "One or more fields are invalid."),
    ("email_already_exists", "This e-mail is already in use."),
    ("invalid_credentials", "Invalid e-mail or password."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("user_not_found", "User not found."),
    ("lead_not_found", "Lead not found."),
    ("activity_log_not_found", "Activity log entry not found."),
    ("permission_denied", "You are not allowed to perform this action."),
    ("invalid_status", "Invalid status."),
    ("internal_error", "An unexpected error occurred."),
    ("report_error", "The report could not be generated."),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert("pt", PT.iter().copied().collect());
        catalogs.insert("en", EN.iter().copied().collect());
        Self { catalogs }
    }

    /// Traduz uma chave. Idioma desconhecido cai no português; chave
    /// desconhecida é devolvida como está.
    pub fn translate<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| {
                self.catalogs
                    .get(DEFAULT_LANG)
                    .and_then(|catalog| catalog.get(key))
            })
            .copied()
            .unwrap_or(key)
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_language() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "lead_not_found"), "Lead not found.");
        assert_eq!(store.translate("pt", "lead_not_found"), "Lead não encontrado.");
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.translate("de", "invalid_status"), "Status inválido.");
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "no_such_key"), "no_such_key");
    }
}
