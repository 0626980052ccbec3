//! Client for the HVW league-results endpoint.
//!
//! Issues one GET per query and hands back raw records. No retries, no
//! backoff, no caching -- callers own that policy.

pub mod errors;
pub mod models;

pub use errors::HvwApiError;
pub use models::{RawClass, RawGame, RawScore, RawWeekSelection};

use models::RawEnvelope;
use tracing::trace;

/// Default public endpoint; overridable through `HVW_BASE_URL`.
pub const DEFAULT_BASE_URL: &str = "https://spo.handball4all.de/service/if_g_json.php";

pub struct HvwApi {
    client: reqwest::Client,
    base_url: String,
    /// Organization selector (`og` query parameter) identifying the HVW
    /// district whose data this deployment mirrors.
    organization: String,
}

impl HvwApi {
    pub fn new(base_url: String, organization: String) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url,
            organization,
        })
    }

    /// Fetch the week selector: all season week dates plus the currently
    /// selected one.
    pub async fn get_week_selection(&self) -> Result<RawWeekSelection, HvwApiError> {
        let envelope = self.fetch_envelope(&[("cmd", "ps")]).await?;
        envelope
            .menu
            .and_then(|menu| menu.dt)
            .ok_or_else(|| self.parse_failed("response envelope carries no week selector"))
    }

    /// Fetch the league classes published for a given week.
    pub async fn get_classes(&self, week: &str) -> Result<Vec<RawClass>, HvwApiError> {
        let envelope = self.fetch_envelope(&[("cmd", "ps"), ("do", week)]).await?;
        Ok(envelope.content.classes)
    }

    /// Fetch all games scheduled in a given week.
    pub async fn get_games(&self, week: &str) -> Result<Vec<RawGame>, HvwApiError> {
        let envelope = self.fetch_envelope(&[("cmd", "ps"), ("do", week)]).await?;
        Ok(envelope
            .content
            .future_games
            .map(|list| list.games)
            .unwrap_or_default())
    }

    /// Fetch the standings table rows for a class, addressed by its
    /// externally assigned id.
    pub async fn get_scores(&self, class_external_id: i64) -> Result<Vec<RawScore>, HvwApiError> {
        let cl = class_external_id.to_string();
        let envelope = self
            .fetch_envelope(&[("cmd", "ps"), ("cl", cl.as_str())])
            .await?;
        Ok(envelope.content.score)
    }

    /// Issue one GET and unwrap the single-element envelope array.
    async fn fetch_envelope(&self, params: &[(&str, &str)]) -> Result<RawEnvelope, HvwApiError> {
        let mut query: Vec<(&str, &str)> = vec![("ca", "0"), ("og", self.organization.as_str())];
        query.extend_from_slice(params);

        let request = self.client.get(&self.base_url).query(&query);
        let response = request.send().await.map_err(|e| {
            HvwApiError::SourceUnavailable {
                url: self.base_url.clone(),
                source: e.into(),
            }
        })?;

        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(HvwApiError::SourceUnavailable {
                url,
                source: anyhow::anyhow!("endpoint returned status {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| HvwApiError::SourceUnavailable {
                url: url.clone(),
                source: e.into(),
            })?;

        trace!(url = %url, bytes = body.len(), "fetched HVW payload");
        parse_envelope(&body).map_err(|e| HvwApiError::ParseFailed {
            status: status.as_u16(),
            url,
            source: e,
        })
    }

    fn parse_failed(&self, msg: &'static str) -> HvwApiError {
        HvwApiError::ParseFailed {
            status: 200,
            url: self.base_url.clone(),
            source: anyhow::anyhow!(msg),
        }
    }
}

/// The endpoint wraps every response in a one-element array.
fn parse_envelope(body: &str) -> Result<RawEnvelope, anyhow::Error> {
    let mut envelopes: Vec<RawEnvelope> = serde_json::from_str(body)?;
    if envelopes.is_empty() {
        anyhow::bail!("response array is empty");
    }
    Ok(envelopes.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[{
        "head": {"name": "Bezirk Enz-Murr"},
        "content": {
            "classes": [
                {"gClassID": 110, "gClassSname": "M-BK", "gClassLname": "Männer Bezirksklasse"}
            ],
            "futureGames": {"games": [
                {
                    "gID": 70231, "gClassID": 110, "gDate": "21.09.25", "gTime": "17:00",
                    "gHomeTeam": "SG Schozach", "gGuestTeam": "TV Flein",
                    "gHomeGoals": "27", "gGuestGoals": "24",
                    "gGymnasiumTown": "Flein", "gGymnasiumName": "Sporthalle", "gGymnasiumNo": "4021"
                }
            ]},
            "score": [
                {"tabPos": 1, "tabTeamname": "TV Flein", "numWonGames": 5, "numEqualGames": 1,
                 "numLostGames": 0, "numPlayedGames": 6, "numGoalsShot": 182, "numGoalsGot": 150,
                 "pointsPlus": 11}
            ]
        },
        "menu": {"dt": {"list": {"2025-09-21": "21.09.2025", "2025-09-28": "28.09.2025"}, "selected": "2025-09-21"}}
    }]"#;

    #[test]
    fn parses_full_envelope() {
        let envelope = parse_envelope(SAMPLE).unwrap();

        let dt = envelope.menu.unwrap().dt.unwrap();
        assert_eq!(dt.list.len(), 2);
        assert_eq!(dt.selected.as_deref(), Some("2025-09-21"));

        assert_eq!(envelope.content.classes.len(), 1);
        assert_eq!(envelope.content.classes[0].g_class_id, 110);

        let games = envelope.content.future_games.unwrap().games;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].g_home_goals.as_deref(), Some("27"));

        assert_eq!(envelope.content.score[0].points_plus, 11);
    }

    #[test]
    fn rejects_empty_response_array() {
        assert!(parse_envelope("[]").is_err());
    }

    #[test]
    fn tolerates_sparse_envelope() {
        // A week query without games still deserializes.
        let envelope = parse_envelope(r#"[{"content": {}}]"#).unwrap();
        assert!(envelope.content.classes.is_empty());
        assert!(envelope.content.future_games.is_none());
        assert!(envelope.menu.is_none());
    }
}
