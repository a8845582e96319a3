//! Provider credentials from the environment.
//!
//! A `.env` file in the working directory is loaded first (values already
//! set in the environment win). Only the credentials the configured
//! providers need are required:
//!
//! | Variable | Required when | Format |
//! |----------|---------------|--------|
//! | `OPENAI_API_KEY` | `embedding.provider` or `llm.provider` is `openai` | starts with `sk-` |
//! | `HUGGINGFACEHUB_API_TOKEN` | `llm.provider` is `huggingface` | starts with `hf_` |

use unibot_core::{Error, Result};

use crate::config::Config;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const HUGGINGFACE_TOKEN: &str = "HUGGINGFACEHUB_API_TOKEN";

#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub huggingface_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<set>");
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("huggingface_token", &mask(&self.huggingface_token))
            .finish()
    }
}

impl Credentials {
    /// Load `.env`, then read and validate the credentials `config` needs.
    pub fn from_env(config: &Config) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Validate credentials obtained through `lookup`.
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut creds = Credentials::default();

        if config.embedding.provider == "openai" || config.llm.provider == "openai" {
            creds.openai_api_key = Some(required(&lookup, OPENAI_API_KEY, "sk-")?);
        }
        if config.llm.provider == "huggingface" {
            creds.huggingface_token = Some(required(&lookup, HUGGINGFACE_TOKEN, "hf_")?);
        }

        Ok(creds)
    }

    pub fn openai_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration(format!("{} is not set", OPENAI_API_KEY)))
    }

    pub fn huggingface_token(&self) -> Result<&str> {
        self.huggingface_token
            .as_deref()
            .ok_or_else(|| Error::Configuration(format!("{} is not set", HUGGINGFACE_TOKEN)))
    }
}

fn required<F>(lookup: &F, name: &str, prefix: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "{} is not set; add it to the environment or a .env file",
                name
            ))
        })?;
    if !value.starts_with(prefix) {
        return Err(Error::Configuration(format!(
            "{} looks malformed: expected a value starting with '{}'",
            name, prefix
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_huggingface_token_required_by_default() {
        let config = parse_config("").unwrap();
        let err = Credentials::from_lookup(&config, env(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains(HUGGINGFACE_TOKEN));

        let creds = Credentials::from_lookup(&config, env(&[(HUGGINGFACE_TOKEN, "hf_abc")])).unwrap();
        assert_eq!(creds.huggingface_token().unwrap(), "hf_abc");
        assert!(creds.openai_api_key().is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let config = parse_config("").unwrap();
        let err =
            Credentials::from_lookup(&config, env(&[(HUGGINGFACE_TOKEN, "abc")])).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_openai_key_needed_for_openai_embeddings() {
        let config = parse_config(
            "[embedding]\nprovider = \"openai\"\n[llm]\nprovider = \"ollama\"\n",
        )
        .unwrap();
        assert!(Credentials::from_lookup(&config, env(&[(OPENAI_API_KEY, "")])).is_err());
        assert!(Credentials::from_lookup(&config, env(&[(OPENAI_API_KEY, "pk-1")])).is_err());
        let creds = Credentials::from_lookup(&config, env(&[(OPENAI_API_KEY, "sk-1")])).unwrap();
        assert_eq!(creds.openai_api_key().unwrap(), "sk-1");
    }

    #[test]
    fn test_local_only_needs_nothing() {
        let config =
            parse_config("[embedding]\nprovider = \"local\"\n[llm]\nprovider = \"ollama\"\n")
                .unwrap();
        assert!(Credentials::from_lookup(&config, env(&[])).is_ok());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials {
            openai_api_key: Some("sk-secret".to_string()),
            huggingface_token: None,
        };
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("sk-secret"));
    }
}
