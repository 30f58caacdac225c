//! Message localization for validation errors
//!
//! Error messages are templates carrying `%{param}` placeholders. A
//! [`Localizer`] may translate the template before parameters are applied;
//! without one, parameters are substituted literally.

use std::collections::HashMap;

/// Translates a message template into one of the desired locales.
pub trait Localizer: Send + Sync {
    /// Returns the translated message with `params` applied.
    ///
    /// `desired_locales` is in preference order.
    fn localized_message(
        &self,
        template: &str,
        desired_locales: &[&str],
        params: &[(&'static str, String)],
    ) -> String;
}

/// Substitutes `%{name}` placeholders with their parameter values.
///
/// Placeholders with no matching parameter are left in place.
pub fn render_template(template: &str, params: &[(&'static str, String)]) -> String {
    let mut output = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match params.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => output.push_str(value),
                    None => {
                        output.push_str("%{");
                        output.push_str(key);
                        output.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

/// In-memory translation table keyed by locale and source template.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    translations: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the translation of `template` for `locale`.
    pub fn insert(
        &mut self,
        locale: impl Into<String>,
        template: impl Into<String>,
        translated: impl Into<String>,
    ) {
        self.translations
            .entry(locale.into())
            .or_default()
            .insert(template.into(), translated.into());
    }

    /// Number of locales with at least one translation.
    pub fn locale_count(&self) -> usize {
        self.translations.len()
    }

    fn lookup(&self, template: &str, desired_locales: &[&str]) -> Option<&str> {
        desired_locales.iter().find_map(|locale| {
            self.translations
                .get(*locale)
                .and_then(|table| table.get(template))
                .map(String::as_str)
        })
    }
}

/// Builds a catalog from `locale -> template -> translation` tables.
impl From<HashMap<String, HashMap<String, String>>> for Catalog {
    fn from(translations: HashMap<String, HashMap<String, String>>) -> Self {
        Self { translations }
    }
}

impl Localizer for Catalog {
    fn localized_message(
        &self,
        template: &str,
        desired_locales: &[&str],
        params: &[(&'static str, String)],
    ) -> String {
        let chosen = self.lookup(template, desired_locales).unwrap_or(template);
        render_template(chosen, params)
    }
}
