use crate::types::push::{Alert, Aps, Notification};
use crate::types::webhook::WebhookPayload;

const SOUND: &str = "ping.aiff";
const FALLBACK_INSTANCE: &str = "Radarr";
const PROWLARR_SUFFIX: &str = " (Prowlarr)";

/// Maps a webhook event to the notification sent to every device.
///
/// Unknown event types yield `None`; the event is acknowledged but nothing is
/// delivered.
pub fn alert_for_payload(payload: &WebhookPayload) -> Option<Notification> {
    let event = Event::new(payload);
    match payload.event_type.as_deref()? {
        "RuddarrTest" => Some(test_notification()),
        "ApplicationUpdate" => Some(event.application_update()),
        "Health" => Some(event.health("NOTIFICATION_HEALTH", 0.8)),
        "HealthRestored" => Some(event.health("NOTIFICATION_HEALTH_RESTORED", 1.0)),
        "MovieAdded" => Some(event.movie_added()),
        "SeriesAdd" => Some(event.series_added()),
        "Grab" if event.is_series => Some(event.series_grab()),
        "Grab" => Some(event.movie_grab()),
        "Download" if event.is_series => Some(event.series_download()),
        "Download" => Some(event.movie_download()),
        _ => None,
    }
}

fn test_notification() -> Notification {
    notification(
        Alert {
            title_loc_key: Some("NOTIFICATION_TEST".to_string()),
            loc_key: Some("NOTIFICATION_TEST_BODY".to_string()),
            ..Alert::default()
        },
        None,
        0.2,
    )
}

fn notification(alert: Alert, thread_id: Option<String>, relevance_score: f64) -> Notification {
    Notification {
        aps: Aps {
            alert,
            sound: SOUND.to_string(),
            thread_id,
            relevance_score,
        },
        deeplink: None,
        hide_in_foreground: false,
    }
}

/// Display values pulled out of a payload, with placeholders for gaps.
struct Event<'a> {
    payload: &'a WebhookPayload,
    instance: String,
    is_series: bool,
    title: String,
    year: String,
    episodes: usize,
    season: String,
    episode: String,
}

impl<'a> Event<'a> {
    fn new(payload: &'a WebhookPayload) -> Self {
        let instance = payload
            .instance_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_INSTANCE)
            .to_string();
        let media = payload.series.as_ref().or(payload.movie.as_ref());
        let title = media
            .and_then(|media| media.title.clone())
            .unwrap_or_else(|| "{Title}".to_string());
        let year = media
            .and_then(|media| media.year)
            .map_or_else(|| "{Year}".to_string(), |year| year.to_string());
        let episodes = payload.episodes.as_deref().unwrap_or_default();
        let first = episodes.first();
        let season = first
            .and_then(|episode| episode.season_number)
            .map_or_else(|| "{Season}".to_string(), |season| season.to_string());
        let episode = first
            .and_then(|episode| episode.episode_number)
            .map_or_else(|| "{Episode}".to_string(), |number| number.to_string());

        Self {
            payload,
            instance,
            is_series: payload.series.is_some(),
            title,
            year,
            episodes: episodes.len(),
            season,
            episode,
        }
    }

    fn movie_thread(&self) -> Option<String> {
        let tmdb_id = self.payload.movie.as_ref()?.tmdb_id?;
        Some(format!("movie:{tmdb_id}"))
    }

    fn series_thread(&self) -> Option<String> {
        let tvdb_id = self.payload.series.as_ref()?.tvdb_id?;
        Some(format!("series:{tvdb_id}"))
    }

    fn movie_deeplink(&self) -> Option<String> {
        let id = self.payload.movie.as_ref()?.id?;
        Some(format!("ruddarr://movies/open/{id}"))
    }

    fn title_args(&self) -> Vec<String> {
        vec![self.instance.clone()]
    }

    fn cleaned_message(&self) -> Option<String> {
        self.payload
            .message
            .as_deref()
            .map(|message| message.replace(PROWLARR_SUFFIX, ""))
    }

    fn release(&self) -> (String, String) {
        let release = self.payload.release.as_ref();
        let title = release
            .and_then(|release| release.release_title.as_deref())
            .map_or_else(|| "{Release}".to_string(), |title| title.replace('.', " "));
        let indexer = release
            .and_then(|release| release.indexer.as_deref())
            .map_or_else(
                || "{Indexer}".to_string(),
                |indexer| indexer.replace(PROWLARR_SUFFIX, ""),
            );
        (title, indexer)
    }

    fn subtype(&self) -> &'static str {
        if self.payload.is_upgrade {
            "UPGRADE"
        } else {
            "DOWNLOAD"
        }
    }

    fn application_update(&self) -> Notification {
        notification(
            Alert {
                title_loc_key: Some("NOTIFICATION_APPLICATION_UPDATE".to_string()),
                title_loc_args: self.title_args(),
                body: self.payload.message.clone(),
                ..Alert::default()
            },
            None,
            1.0,
        )
    }

    fn health(&self, title_key: &str, relevance_score: f64) -> Notification {
        let thread_id = self
            .payload
            .health_type
            .as_deref()
            .map(|kind| format!("health:{kind}"));
        notification(
            Alert {
                title_loc_key: Some(title_key.to_string()),
                title_loc_args: self.title_args(),
                body: self.cleaned_message(),
                ..Alert::default()
            },
            thread_id,
            relevance_score,
        )
    }

    fn movie_added(&self) -> Notification {
        let mut notification = notification(
            Alert {
                title_loc_key: Some("NOTIFICATION_MOVIE_ADDED".to_string()),
                title_loc_args: self.title_args(),
                loc_key: Some("NOTIFICATION_MOVIE_ADDED_BODY".to_string()),
                loc_args: vec![self.title.clone(), self.year.clone()],
                ..Alert::default()
            },
            self.movie_thread(),
            0.6,
        );
        notification.deeplink = self.movie_deeplink();
        notification.hide_in_foreground = true;
        notification
    }

    fn series_added(&self) -> Notification {
        let mut notification = notification(
            Alert {
                title_loc_key: Some("NOTIFICATION_SERIES_ADDED".to_string()),
                title_loc_args: self.title_args(),
                loc_key: Some("NOTIFICATION_SERIES_ADDED_BODY".to_string()),
                loc_args: vec![self.title.clone(), self.year.clone()],
                ..Alert::default()
            },
            self.series_thread(),
            0.6,
        );
        notification.hide_in_foreground = true;
        notification
    }

    fn movie_grab(&self) -> Notification {
        let (release_title, indexer) = self.release();
        let mut notification = notification(
            Alert {
                title_loc_key: Some("NOTIFICATION_MOVIE_GRAB".to_string()),
                title_loc_args: self.title_args(),
                subtitle_loc_key: Some("NOTIFICATION_MOVIE_GRAB_SUBTITLE".to_string()),
                subtitle_loc_args: vec![self.title.clone(), self.year.clone()],
                loc_key: Some("NOTIFICATION_MOVIE_GRAB_BODY".to_string()),
                loc_args: vec![release_title, indexer],
                ..Alert::default()
            },
            self.movie_thread(),
            0.8,
        );
        notification.deeplink = self.movie_deeplink();
        notification.hide_in_foreground = true;
        notification
    }

    fn series_grab(&self) -> Notification {
        let (release_title, indexer) = self.release();
        let title_key = if self.episodes > 1 {
            "NOTIFICATION_EPISODES_GRAB"
        } else {
            "NOTIFICATION_EPISODE_GRAB"
        };
        let mut notification = notification(
            Alert {
                title_loc_key: Some(title_key.to_string()),
                title_loc_args: vec![self.instance.clone(), self.episodes.to_string()],
                subtitle_loc_key: Some("NOTIFICATION_EPISODES_GRAB_SUBTITLE".to_string()),
                subtitle_loc_args: vec![self.title.clone(), self.season.clone()],
                loc_key: Some("NOTIFICATION_EPISODES_GRAB_BODY".to_string()),
                loc_args: vec![release_title, indexer],
                ..Alert::default()
            },
            self.series_thread(),
            0.8,
        );
        notification.hide_in_foreground = true;
        notification
    }

    fn movie_download(&self) -> Notification {
        let mut notification = notification(
            Alert {
                title_loc_key: Some(format!("NOTIFICATION_MOVIE_{}", self.subtype())),
                title_loc_args: self.title_args(),
                loc_key: Some("NOTIFICATION_MOVIE_DOWNLOAD_BODY".to_string()),
                loc_args: vec![self.title.clone(), self.year.clone()],
                ..Alert::default()
            },
            self.movie_thread(),
            1.0,
        );
        notification.deeplink = self.movie_deeplink();
        notification
    }

    fn series_download(&self) -> Notification {
        let alert = if self.episodes == 1 {
            Alert {
                title_loc_key: Some(format!("NOTIFICATION_EPISODE_{}", self.subtype())),
                title_loc_args: self.title_args(),
                loc_key: Some("NOTIFICATION_EPISODE_DOWNLOAD_BODY".to_string()),
                loc_args: vec![self.title.clone(), self.season.clone(), self.episode.clone()],
                ..Alert::default()
            }
        } else {
            Alert {
                title_loc_key: Some(format!("NOTIFICATION_EPISODES_{}", self.subtype())),
                title_loc_args: vec![self.instance.clone(), self.episodes.to_string()],
                loc_key: Some("NOTIFICATION_EPISODES_DOWNLOAD_BODY".to_string()),
                loc_args: vec![self.title.clone(), self.season.clone()],
                ..Alert::default()
            }
        };
        notification(alert, self.series_thread(), 1.0)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, json};

    fn payload(value: JsonValue) -> WebhookPayload {
        serde_json::from_value(value).expect("payload")
    }

    fn mapped(value: JsonValue) -> JsonValue {
        let notification = alert_for_payload(&payload(value)).expect("notification");
        serde_json::to_value(notification).expect("serialize")
    }

    #[test]
    fn alert_for_payload__should_ignore_other_fields_for_app_test() {
        // Given
        let bare = mapped(json!({ "eventType": "RuddarrTest" }));
        let noisy = mapped(json!({
            "eventType": "RuddarrTest",
            "instanceName": "Movies",
            "movie": { "title": "Heat", "year": 1995 },
        }));

        // Then
        assert_eq!(bare, noisy);
        assert_eq!(
            bare,
            json!({
                "aps": {
                    "alert": {
                        "title-loc-key": "NOTIFICATION_TEST",
                        "loc-key": "NOTIFICATION_TEST_BODY",
                    },
                    "sound": "ping.aiff",
                    "relevance-score": 0.2,
                }
            })
        );
    }

    #[test]
    fn alert_for_payload__should_fall_back_to_default_instance_name() {
        // Given
        let missing = mapped(json!({ "eventType": "MovieAdded", "movie": { "title": "Heat" } }));
        let blank = mapped(json!({ "eventType": "MovieAdded", "instanceName": "  " }));

        // Then
        assert_eq!(missing["aps"]["alert"]["title-loc-args"], json!(["Radarr"]));
        assert_eq!(blank["aps"]["alert"]["title-loc-args"], json!(["Radarr"]));
    }

    #[test]
    fn alert_for_payload__should_return_none_for_unknown_events() {
        assert!(alert_for_payload(&payload(json!({ "eventType": "Bogus" }))).is_none());
        assert!(alert_for_payload(&payload(json!({ "eventType": "Test" }))).is_none());
        assert!(alert_for_payload(&payload(json!({}))).is_none());
    }

    #[test]
    fn alert_for_payload__should_map_movie_added() {
        // When
        let value = mapped(json!({
            "eventType": "MovieAdded",
            "instanceName": "4K",
            "movie": { "id": 42, "title": "Heat", "year": 1995, "tmdbId": 949 },
        }));

        // Then
        assert_eq!(
            value,
            json!({
                "aps": {
                    "alert": {
                        "title-loc-key": "NOTIFICATION_MOVIE_ADDED",
                        "title-loc-args": ["4K"],
                        "loc-key": "NOTIFICATION_MOVIE_ADDED_BODY",
                        "loc-args": ["Heat", "1995"],
                    },
                    "sound": "ping.aiff",
                    "thread-id": "movie:949",
                    "relevance-score": 0.6,
                },
                "deeplink": "ruddarr://movies/open/42",
                "hideInForeground": true,
            })
        );
    }

    #[test]
    fn alert_for_payload__should_pass_health_message_through() {
        // When
        let value = mapped(json!({
            "eventType": "Health",
            "instanceName": "Movies",
            "type": "IndexerStatusCheck",
            "message": "Indexers unavailable: NZBgeek (Prowlarr)",
        }));

        // Then
        assert_eq!(value["aps"]["alert"]["title-loc-key"], "NOTIFICATION_HEALTH");
        assert_eq!(value["aps"]["alert"]["body"], "Indexers unavailable: NZBgeek");
        assert_eq!(value["aps"]["thread-id"], "health:IndexerStatusCheck");
        assert!(value["aps"]["alert"].get("loc-key").is_none());
    }

    #[test]
    fn alert_for_payload__should_map_movie_grab_release() {
        // When
        let value = mapped(json!({
            "eventType": "Grab",
            "instanceName": "Movies",
            "movie": { "id": 7, "title": "Heat", "year": 1995, "tmdbId": 949 },
            "release": { "releaseTitle": "Heat.1995.1080p", "indexer": "NZBgeek (Prowlarr)" },
        }));

        // Then
        let alert = &value["aps"]["alert"];
        assert_eq!(alert["title-loc-key"], "NOTIFICATION_MOVIE_GRAB");
        assert_eq!(alert["subtitle-loc-args"], json!(["Heat", "1995"]));
        assert_eq!(alert["loc-args"], json!(["Heat 1995 1080p", "NZBgeek"]));
        assert_eq!(value["hideInForeground"], true);
    }

    #[test]
    fn alert_for_payload__should_count_grabbed_episodes() {
        // When
        let value = mapped(json!({
            "eventType": "Grab",
            "instanceName": "Shows",
            "series": { "title": "Severance", "year": 2022, "tvdbId": 371980 },
            "episodes": [
                { "episodeNumber": 1, "seasonNumber": 2 },
                { "episodeNumber": 2, "seasonNumber": 2 },
            ],
            "release": { "releaseTitle": "Severance.S02", "indexer": "Tracker" },
        }));

        // Then
        let alert = &value["aps"]["alert"];
        assert_eq!(alert["title-loc-key"], "NOTIFICATION_EPISODES_GRAB");
        assert_eq!(alert["title-loc-args"], json!(["Shows", "2"]));
        assert_eq!(alert["subtitle-loc-args"], json!(["Severance", "2"]));
        assert_eq!(value["aps"]["thread-id"], "series:371980");
        assert!(value.get("deeplink").is_none());
    }

    #[test]
    fn alert_for_payload__should_distinguish_download_variants() {
        // Given
        let upgrade = mapped(json!({
            "eventType": "Download",
            "instanceName": "Movies",
            "isUpgrade": true,
            "movie": { "id": 1, "title": "Heat", "year": 1995 },
        }));
        let single = mapped(json!({
            "eventType": "Download",
            "instanceName": "Shows",
            "series": { "title": "Severance" },
            "episodes": [{ "episodeNumber": 3, "seasonNumber": 1 }],
        }));
        let season = mapped(json!({
            "eventType": "Download",
            "instanceName": "Shows",
            "series": { "title": "Severance" },
            "episodes": [
                { "episodeNumber": 1, "seasonNumber": 1 },
                { "episodeNumber": 2, "seasonNumber": 1 },
            ],
        }));

        // Then
        assert_eq!(upgrade["aps"]["alert"]["title-loc-key"], "NOTIFICATION_MOVIE_UPGRADE");
        assert!(upgrade.get("hideInForeground").is_none());
        assert_eq!(single["aps"]["alert"]["title-loc-key"], "NOTIFICATION_EPISODE_DOWNLOAD");
        assert_eq!(single["aps"]["alert"]["loc-args"], json!(["Severance", "1", "3"]));
        assert_eq!(season["aps"]["alert"]["title-loc-key"], "NOTIFICATION_EPISODES_DOWNLOAD");
        assert_eq!(season["aps"]["alert"]["title-loc-args"], json!(["Shows", "2"]));
        assert_eq!(season["aps"]["alert"]["loc-args"], json!(["Severance", "1"]));
    }

    #[test]
    fn alert_for_payload__should_use_placeholders_for_missing_media() {
        // When
        let value = mapped(json!({ "eventType": "MovieAdded", "instanceName": "Movies" }));

        // Then
        assert_eq!(value["aps"]["alert"]["loc-args"], json!(["{Title}", "{Year}"]));
        assert!(value["aps"].get("thread-id").is_none());
    }
}
