//! Pre-flight checks before operations that call external services.

use crate::config::Settings;
use crate::error::{Result, VidqaError};
use crate::orchestrator::Credentials;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs every configured credential.
    Ask,
    /// Index management needs the vector store credential only.
    Index,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let credentials = Credentials::resolve(settings);

    if matches!(operation, Operation::Ask) && credentials.google_api_key.is_none() {
        return Err(VidqaError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            settings.google.api_key_env, settings.google.api_key_env
        )));
    }

    if credentials.pinecone_required && credentials.pinecone_api_key.is_none() {
        return Err(VidqaError::Config(format!(
            "{} not set. Set it with: export {}='...' (or use vector_store.provider = \"sqlite\")",
            settings.vector_store.api_key_env, settings.vector_store.api_key_env
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorStoreProvider;

    fn unset_settings() -> Settings {
        let mut settings = Settings::default();
        settings.google.api_key_env = "VIDQA_TEST_UNSET_GOOGLE".to_string();
        settings.vector_store.api_key_env = "VIDQA_TEST_UNSET_PINECONE".to_string();
        settings
    }

    #[test]
    fn test_ask_requires_google_key() {
        let err = check(Operation::Ask, &unset_settings()).unwrap_err();
        assert!(err.to_string().contains("VIDQA_TEST_UNSET_GOOGLE"));
    }

    #[test]
    fn test_local_index_needs_no_keys() {
        let mut settings = unset_settings();
        settings.vector_store.provider = VectorStoreProvider::Sqlite;
        assert!(check(Operation::Index, &settings).is_ok());
        assert!(check(Operation::Index, &unset_settings()).is_err());
    }
}
