use std::env;
use serde::{Deserialize, Serialize};

// Identifiable defines common traits that can be shared by persistent objects.
// The identifier is assigned by the store on first save and never changes after that.
pub trait Identifiable: Sync + Send {
    fn id(&self) -> Option<i64>;
    fn assign_id(&mut self, id: i64);
}

// UniquelyKeyed exposes the field that must not be duplicated across live entities of a type.
pub trait UniquelyKeyed {
    fn unique_key(&self) -> &str;
}

// Configuration abstracts config options for library system
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Configuration {
    pub branch_id: String,
    pub cache_enabled: bool,
    pub cache_ttl_secs: Option<u64>,
    // evict the cached "all" collection on add, update and delete
    pub evict_collection_on_write: bool,
}

impl Configuration {
    pub fn new(branch_id: &str) -> Self {
        Configuration {
            branch_id: branch_id.to_string(),
            cache_enabled: true,
            cache_ttl_secs: None,
            evict_collection_on_write: true,
        }
    }

    /// Builds a configuration from `LMS_*` environment variables, falling back to the
    /// defaults of [`Configuration::new`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Configuration::new(
            env::var("LMS_BRANCH").unwrap_or_else(|_| "main".to_string()).as_str());
        if let Some(enabled) = env_bool("LMS_CACHE_ENABLED") {
            config.cache_enabled = enabled;
        }
        if let Ok(ttl) = env::var("LMS_CACHE_TTL_SECS") {
            config.cache_ttl_secs = ttl.trim().parse::<u64>().ok();
        }
        if let Some(evict) = env_bool("LMS_EVICT_COLLECTION_ON_WRITE") {
            config.evict_collection_on_write = evict;
        }
        config
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_bool(v.as_str()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use crate::core::domain::{Configuration, parse_bool};

    #[tokio::test]
    async fn test_should_build_config() {
        let config = Configuration::new("test");
        assert_eq!("test", config.branch_id.as_str());
        assert!(config.cache_enabled);
        assert_eq!(None, config.cache_ttl_secs);
        assert!(config.evict_collection_on_write);
    }

    #[tokio::test]
    async fn test_should_parse_bool() {
        assert_eq!(Some(true), parse_bool("TRUE"));
        assert_eq!(Some(true), parse_bool(" 1 "));
        assert_eq!(Some(false), parse_bool("off"));
        assert_eq!(None, parse_bool("maybe"));
    }

    #[tokio::test]
    async fn test_should_build_config_from_env() {
        env::set_var("LMS_BRANCH", "downtown");
        env::set_var("LMS_CACHE_TTL_SECS", "30");
        env::set_var("LMS_EVICT_COLLECTION_ON_WRITE", "false");
        let config = Configuration::from_env();
        env::remove_var("LMS_BRANCH");
        env::remove_var("LMS_CACHE_TTL_SECS");
        env::remove_var("LMS_EVICT_COLLECTION_ON_WRITE");

        assert_eq!("downtown", config.branch_id.as_str());
        assert!(config.cache_enabled);
        assert_eq!(Some(30), config.cache_ttl_secs);
        assert!(!config.evict_collection_on_write);
    }
}
