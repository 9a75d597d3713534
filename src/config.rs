use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub store_path: PathBuf,
    pub apns: ApnsConfig,
    pub delivery_timeout: Duration,
    pub prune_invalid_tokens: bool,
    pub sender_agents: Vec<String>,
    pub registration_agent: String,
    pub log_json: bool,
}

#[derive(Clone)]
pub struct ApnsConfig {
    pub team_id: Option<String>,
    pub key_id: Option<String>,
    pub private_key: Option<String>,
    pub topic: String,
    pub sandbox: bool,
    pub sandbox_fallback: bool,
}

impl std::fmt::Debug for ApnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApnsConfig")
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("topic", &self.topic)
            .field("sandbox", &self.sandbox)
            .field("sandbox_fallback", &self.sandbox_fallback)
            .finish()
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            store_path: "relay-store.json".into(),
            apns: ApnsConfig {
                team_id: None,
                key_id: None,
                private_key: None,
                topic: "com.ruddarr".to_string(),
                sandbox: false,
                sandbox_fallback: true,
            },
            delivery_timeout: Duration::from_secs(10),
            prune_invalid_tokens: false,
            sender_agents: vec!["Radarr".to_string(), "Sonarr".to_string()],
            registration_agent: "Ruddarr".to_string(),
            log_json: false,
        }
    }
}
