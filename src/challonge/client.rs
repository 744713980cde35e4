use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::{
    Challonge, RemoteAck, RemoteOp,
    error::{ChallongeError, ChallongeResult},
    models::{ParticipantEnvelope, RemoteTournament, TournamentEnvelope},
};

/// [`Challonge`] implementation talking to the public REST API with an account API key.
#[derive(Clone)]
pub struct HttpChallonge {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
}

impl HttpChallonge {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> ChallongeResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("tourney-desk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ChallongeError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            api_key: Arc::from(api_key.into()),
        })
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> ChallongeResult<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method.clone(), url)
            .query(&[("api_key", self.api_key.as_ref())]);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        debug!(%method, path, "calling Challonge");
        let response = builder
            .send()
            .await
            .map_err(|source| ChallongeError::Transport {
                path: path.to_owned(),
                source,
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ChallongeError::Transport {
                path: path.to_owned(),
                source,
            })?;

        match status {
            StatusCode::NOT_FOUND => Err(ChallongeError::NotFound {
                path: path.to_owned(),
            }),
            status if status.is_success() => {
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_json::from_str(&text).map_err(|source| ChallongeError::Decode {
                    path: path.to_owned(),
                    source,
                })
            }
            status => Err(ChallongeError::Rejected {
                path: path.to_owned(),
                status: status.as_u16(),
                message: rejection_message(&text),
            }),
        }
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ChallongeResult<T> {
        let value = self.call(method, path, body).await?;
        serde_json::from_value(value).map_err(|source| ChallongeError::Decode {
            path: path.to_owned(),
            source,
        })
    }

    async fn fetch(&self, url: &str) -> ChallongeResult<RemoteTournament> {
        let path = format!("tournaments/{url}.json?include_participants=1&include_matches=1");
        let envelope: TournamentEnvelope = self.call_as(Method::GET, &path, None).await?;
        Ok(envelope.tournament)
    }

    async fn forward(&self, tournament_id: u64, op: RemoteOp) -> ChallongeResult<RemoteAck> {
        let base = format!("tournaments/{tournament_id}");
        let (method, path, body) = match op {
            RemoteOp::UpdateTournament(body) => (
                Method::PUT,
                format!("{base}.json"),
                Some(json!({ "tournament": body })),
            ),
            RemoteOp::Start => (Method::POST, format!("{base}/start.json"), None),
            RemoteOp::Reset => (Method::POST, format!("{base}/reset.json"), None),
            RemoteOp::Finalize => (Method::POST, format!("{base}/finalize.json"), None),
            RemoteOp::Delete => (Method::DELETE, format!("{base}.json"), None),
            RemoteOp::AddParticipant(body) => {
                let path = format!("{base}/participants.json");
                let created: ParticipantEnvelope = self
                    .call_as(Method::POST, &path, Some(json!({ "participant": body })))
                    .await?;
                return Ok(RemoteAck {
                    id: Some(created.participant.id),
                });
            }
            RemoteOp::UpdateParticipant {
                participant_id,
                body,
            } => (
                Method::PUT,
                format!("{base}/participants/{participant_id}.json"),
                Some(json!({ "participant": body })),
            ),
            RemoteOp::RemoveParticipant { participant_id } => (
                Method::DELETE,
                format!("{base}/participants/{participant_id}.json"),
                None,
            ),
            RemoteOp::UpdateMatch {
                match_id,
                scores_csv,
                winner_id,
            } => {
                let mut fields = json!({ "scores_csv": scores_csv });
                if let Some(winner_id) = winner_id {
                    fields["winner_id"] = json!(winner_id);
                }
                (
                    Method::PUT,
                    format!("{base}/matches/{match_id}.json"),
                    Some(json!({ "match": fields })),
                )
            }
            RemoteOp::ReopenMatch { match_id } => (
                Method::POST,
                format!("{base}/matches/{match_id}/reopen.json"),
                None,
            ),
            RemoteOp::MarkUnderway { match_id } => (
                Method::POST,
                format!("{base}/matches/{match_id}/mark_as_underway.json"),
                None,
            ),
            RemoteOp::UnmarkUnderway { match_id } => (
                Method::POST,
                format!("{base}/matches/{match_id}/unmark_as_underway.json"),
                None,
            ),
        };

        self.call(method, &path, body).await?;
        Ok(RemoteAck::default())
    }
}

/// Challonge reports validation failures as `{"errors": ["..."]}`.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value.get("errors").and_then(Value::as_array).map(|errors| {
                errors
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl Challonge for HttpChallonge {
    fn fetch_tournament(
        &self,
        url: String,
    ) -> BoxFuture<'static, ChallongeResult<RemoteTournament>> {
        let client = self.clone();
        Box::pin(async move { client.fetch(&url).await })
    }

    fn push(
        &self,
        tournament_id: u64,
        op: RemoteOp,
    ) -> BoxFuture<'static, ChallongeResult<RemoteAck>> {
        let client = self.clone();
        Box::pin(async move { client.forward(tournament_id, op).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_joins_error_list() {
        assert_eq!(
            rejection_message(r#"{"errors":["Name can't be blank","URL is taken"]}"#),
            "Name can't be blank; URL is taken"
        );
        assert_eq!(rejection_message("Bad Gateway"), "Bad Gateway");
    }
}
