use crate::config::ApnsConfig;
use crate::types::push::ApnsCredentials;

#[derive(Debug, Clone)]
pub(crate) enum ApnsConfigStatus {
    Missing,
    Incomplete,
    Ready(ApnsCredentials),
}

pub(crate) fn load_apns_credentials(config: &ApnsConfig) -> ApnsConfigStatus {
    let team_id = non_empty(config.team_id.as_deref());
    let key_id = non_empty(config.key_id.as_deref());
    let private_key = non_empty(config.private_key.as_deref());
    let has_any = team_id.is_some() || key_id.is_some() || private_key.is_some();

    match (team_id, key_id, private_key) {
        (Some(team_id), Some(key_id), Some(private_key)) => {
            ApnsConfigStatus::Ready(ApnsCredentials {
                team_id: team_id.to_string(),
                key_id: key_id.to_string(),
                private_key: private_key.to_string(),
            })
        }
        _ if has_any => ApnsConfigStatus::Incomplete,
        _ => ApnsConfigStatus::Missing,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
