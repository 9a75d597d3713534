use serde::Deserialize;

/// Event posted by a media server. Every field is optional so that a partial
/// payload still maps to an alert with placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookPayload {
    pub event_type: Option<String>,
    pub instance_name: Option<String>,
    pub movie: Option<Media>,
    pub series: Option<Media>,
    pub episodes: Option<Vec<Episode>>,
    pub release: Option<Release>,
    pub is_upgrade: bool,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub health_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub year: Option<u32>,
    pub tmdb_id: Option<u64>,
    pub tvdb_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub episode_number: Option<u32>,
    pub season_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Release {
    pub release_title: Option<String>,
    pub indexer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub account: String,
    pub token: String,
}
