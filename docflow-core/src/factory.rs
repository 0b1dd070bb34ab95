use std::{collections::HashMap, sync::Arc};

use secrecy::SecretString;

use crate::config::Config;
use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::provider::{ConversationProvider, NullProvider};
use crate::providers::chatflow::DifyChatflow;
use crate::providers::workflow::DifyWorkflow;

/// Registry of concrete app instances by name ("workflow", "chatflow",
/// "null"). Apps whose API key is missing from the environment are not
/// registered.
pub struct AppRegistry {
    apps: HashMap<String, Arc<dyn ConversationProvider>>,
}

impl AppRegistry {
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        let mut apps: HashMap<String, Arc<dyn ConversationProvider>> = HashMap::new();

        // Always provide a fallback null app
        apps.insert("null".into(), Arc::new(NullProvider));

        let http = HttpClient::from_cfg(&cfg.http)?;
        let base = cfg.upstream.base_url.clone();

        if let Some(app_cfg) = &cfg.apps.workflow
            && let Ok(key) = std::env::var(&app_cfg.api_key_env)
        {
            let wf = DifyWorkflow::new(http.clone(), SecretString::new(key.into()), base.clone());
            apps.insert("workflow".into(), Arc::new(wf));
        }

        if let Some(app_cfg) = &cfg.apps.chatflow
            && let Ok(key) = std::env::var(&app_cfg.api_key_env)
        {
            let cf = DifyChatflow::new(http.clone(), SecretString::new(key.into()), base.clone());
            apps.insert("chatflow".into(), Arc::new(cf));
        }

        Ok(Self { apps })
    }

    /// Get an app by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ConversationProvider>> {
        self.apps.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.apps.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppCfg, Apps};

    #[test]
    fn builds_registry_with_null() {
        let reg = AppRegistry::from_config(&Config::default()).unwrap();
        assert!(reg.get("null").is_some());
        assert!(reg.get("workflow").is_none());
        assert!(reg.get("chatflow").is_none());
    }

    #[test]
    fn missing_app_returns_none() {
        let reg = AppRegistry::from_config(&Config::default()).unwrap();
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn configured_app_without_env_key_is_absent() {
        let cfg = Config {
            apps: Apps {
                workflow: Some(AppCfg {
                    api_key_env: "DOCFLOW_TEST_KEY_THAT_IS_NEVER_SET".into(),
                }),
                chatflow: None,
            },
            ..Config::default()
        };
        let reg = AppRegistry::from_config(&cfg).unwrap();
        assert!(reg.get("workflow").is_none());
    }

    #[test]
    fn configured_app_with_env_key_is_registered() {
        // Var name unique to this test to avoid cross-test interference.
        unsafe { std::env::set_var("DOCFLOW_TEST_CHATFLOW_KEY_REGISTERED", "app-key") };
        let cfg = Config {
            apps: Apps {
                workflow: None,
                chatflow: Some(AppCfg {
                    api_key_env: "DOCFLOW_TEST_CHATFLOW_KEY_REGISTERED".into(),
                }),
            },
            ..Config::default()
        };
        let reg = AppRegistry::from_config(&cfg).unwrap();
        let app = reg.get("chatflow").expect("chatflow registered");
        assert_eq!(app.name(), "chatflow");
    }
}
