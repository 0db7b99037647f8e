use log::info;

use super::rest::{Credentials, RestClient};
use crate::settings::Settings;

pub const DEFAULT_VERSION: f64 = 7.9;

const URL_VERSION: &str = "/api/server/version";

/// Probes a server's version. Any failure, transport or otherwise, falls
/// back to a safe modern default and is never raised to the caller.
pub async fn resolve_version(settings: &Settings, instance_url: &str) -> f64 {
    let url = format!("{instance_url}{URL_VERSION}");
    let rest = match RestClient::new(Credentials::default(), settings.request_read_timeout_ms) {
        Ok(rest) => rest,
        Err(e) => {
            info!("could not build version probe client: {e}");
            return DEFAULT_VERSION;
        }
    };
    match rest.get(&url).await {
        Ok(body) => parse_version(&body).unwrap_or(DEFAULT_VERSION),
        Err(e) => {
            info!("could not fetch server version from {url}: {e}");
            DEFAULT_VERSION
        }
    }
}

/// A dotted build string like `8.3.1` collapses to its first three
/// characters, a bare `major.minor` parses whole.
fn parse_version(body: &str) -> Option<f64> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if body.matches('.').count() > 1 {
        body.get(..3)?.parse().ok()
    } else {
        body.parse().ok()
    }
}
