//! Which store an app talks to.
//!
//! An absent or placeholder project URL or anon key is never an error: the
//! app runs in preview mode against the sample catalog. Only a value that
//! looks real but does not parse is rejected.

use secrecy::SecretString;
use url::Url;

use crate::backend::Backend;
use crate::client::SupabaseClient;
use crate::error::Result;
use crate::memory::MemoryTableStore;

/// Whole template values shipped in example configs, compared case-insensitively.
const PLACEHOLDER_VALUES: &[&str] = &[
    "your_supabase_url",
    "your_supabase_anon_key",
    "your_anon_key_here",
    "changeme",
    "placeholder",
];

/// Prefixes of an unfilled template value, or of its host when it is a URL.
const PLACEHOLDER_PREFIXES: &[&str] = &["your_", "your-", "<", "{{"];

/// Live project, or preview.
#[derive(Clone)]
pub enum RemoteMode {
    Live { url: Url, anon_key: SecretString },
    Preview { reason: String },
}

impl std::fmt::Debug for RemoteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live { url, .. } => f
                .debug_struct("Live")
                .field("url", &url.as_str())
                .field("anon_key", &"[REDACTED]")
                .finish(),
            Self::Preview { reason } => f.debug_struct("Preview").field("reason", reason).finish(),
        }
    }
}

/// Remote store settings.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub mode: RemoteMode,
    /// Direct Postgres connection for the change feed.
    pub database_url: Option<SecretString>,
}

impl RemoteConfig {
    /// Decide the mode from raw settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-placeholder project URL does not parse.
    pub fn resolve(
        project_url: Option<&str>,
        anon_key: Option<&str>,
        database_url: Option<SecretString>,
    ) -> std::result::Result<Self, url::ParseError> {
        let mode = match (non_placeholder(project_url), non_placeholder(anon_key)) {
            (Some(url), Some(key)) => RemoteMode::Live {
                url: Url::parse(url)?,
                anon_key: SecretString::from(key.to_string()),
            },
            (None, _) => RemoteMode::Preview {
                reason: "SUPABASE_URL is missing or a placeholder".to_string(),
            },
            (_, None) => RemoteMode::Preview {
                reason: "SUPABASE_ANON_KEY is missing or a placeholder".to_string(),
            },
        };
        Ok(Self { mode, database_url })
    }

    /// Preview mode with no database.
    #[must_use]
    pub fn preview(reason: &str) -> Self {
        Self {
            mode: RemoteMode::Preview {
                reason: reason.to_string(),
            },
            database_url: None,
        }
    }

    /// Whether the app runs against sample data.
    #[must_use]
    pub const fn is_preview(&self) -> bool {
        matches!(self.mode, RemoteMode::Preview { .. })
    }

    /// Build the backend for this mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the live client cannot be created.
    pub fn backend(&self) -> Result<Backend> {
        match &self.mode {
            RemoteMode::Live { url, anon_key } => {
                let client = SupabaseClient::new(url, anon_key, self.database_url.clone())?;
                Ok(Backend::Supabase(client))
            }
            RemoteMode::Preview { reason } => {
                tracing::warn!(reason = %reason, "Preview mode: serving sample data");
                Ok(Backend::Memory(MemoryTableStore::with_sample_catalog()))
            }
        }
    }
}

/// Whether a value is an unfilled template.
///
/// Only whole template values and template prefixes count. Real project
/// refs and keys are random, so a fragment inside them means nothing.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    if PLACEHOLDER_VALUES.contains(&lower.as_str()) {
        return true;
    }
    let host = lower
        .split_once("://")
        .map_or(lower.as_str(), |(_, rest)| rest);
    PLACEHOLDER_PREFIXES
        .iter()
        .any(|p| lower.starts_with(p) || host.starts_with(p))
}

fn non_placeholder(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !is_placeholder(v))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_mean_preview() {
        let config = RemoteConfig::resolve(None, Some("key"), None).unwrap();
        assert!(config.is_preview());
        let config =
            RemoteConfig::resolve(Some("https://abc.supabase.co"), Some("  "), None).unwrap();
        assert!(config.is_preview());
    }

    #[test]
    fn test_template_values_mean_preview() {
        let config =
            RemoteConfig::resolve(Some("YOUR_SUPABASE_URL"), Some("YOUR_ANON_KEY_HERE"), None)
                .unwrap();
        assert!(config.is_preview());
        assert!(is_placeholder("https://your-project.supabase.co"));
    }

    #[test]
    fn test_real_values_mean_live() {
        let config = RemoteConfig::resolve(
            Some("https://abc.supabase.co"),
            Some("eyJhbGciOiJIUzI1NiJ9.anon"),
            None,
        )
        .unwrap();
        assert!(!config.is_preview());
        assert!(matches!(config.backend().unwrap(), Backend::Supabase(_)));
    }

    #[test]
    fn test_random_fragments_in_real_credentials_stay_live() {
        let key = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
                   eyJyb2xlIjoiYW5vbiJ9.ToDoxxxQinsertReplaceK3y";
        for url in [
            "https://qwrtyxxxplmnbvcdsazq.supabase.co",
            "https://insertqwplmnbvcdsazqk.supabase.co",
            "https://abctodoreplacezxcvbnm.supabase.co",
        ] {
            let config = RemoteConfig::resolve(Some(url), Some(key), None).unwrap();
            assert!(!config.is_preview(), "{url} went to preview");
        }
    }

    #[test]
    fn test_template_prefixes_mean_preview() {
        assert!(is_placeholder("YOUR_SUPABASE_ANON_KEY"));
        assert!(is_placeholder("<anon key>"));
        assert!(is_placeholder("your-anon-key"));
        assert!(is_placeholder("https://your_project.supabase.co"));
        assert!(!is_placeholder("https://qwrtyxxxplmnbvcdsazq.supabase.co"));
    }

    #[test]
    fn test_malformed_url_is_an_error() {
        assert!(RemoteConfig::resolve(Some("not a url"), Some("key"), None).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config =
            RemoteConfig::resolve(Some("https://abc.supabase.co"), Some("sekrit-anon"), None)
                .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sekrit-anon"));
    }

    #[tokio::test]
    async fn test_preview_backend_serves_sample_catalog() {
        let backend = RemoteConfig::preview("test").backend().unwrap();
        let Backend::Memory(store) = backend else {
            panic!("expected memory backend");
        };
        assert_eq!(store.rows(aquarium_core::PRODUCTS_TABLE).len(), 5);
    }
}
