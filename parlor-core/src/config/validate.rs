//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.ollama.base_url.trim().is_empty() {
        errors.push("ollama.base_url must not be empty".to_string());
    } else if !config.ollama.base_url.starts_with("http://")
        && !config.ollama.base_url.starts_with("https://")
    {
        errors.push("ollama.base_url must start with http:// or https://".to_string());
    }
    if config.ollama.status_poll_secs == 0 {
        errors.push("ollama.status_poll_secs must be > 0".to_string());
    }

    if config.chat.max_context_messages == 0 {
        errors.push("chat.max_context_messages must be > 0".to_string());
    }

    if config.storage.history_path.trim().is_empty() {
        errors.push("storage.history_path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = Config::default();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.ollama.base_url = "localhost:11434".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ollama.base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_context_window() {
        let mut config = Config::default();
        config.chat.max_context_messages = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chat.max_context_messages"));
    }
}
