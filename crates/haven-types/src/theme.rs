use serde::{Deserialize, Serialize};

/// Colour scheme preference, resolved once per render pass by the view
/// layer. Persisted under the `themePreference` storage key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn all() -> &'static [ThemePreference] {
        &[
            ThemePreference::Light,
            ThemePreference::Dark,
            ThemePreference::System,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            ThemePreference::Light => "Light",
            ThemePreference::Dark => "Dark",
            ThemePreference::System => "System",
        }
    }
}
