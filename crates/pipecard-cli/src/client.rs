//! Async HTTP client wrapping the card API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pipecard_core::card::Card;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use serde_json::value::RawValue;

/// Addressing for one step, in the server's path terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRef {
  pub namespace: String,
  pub name:      String,
  pub build:     i64,
  pub stage:     isize,
  pub step:      isize,
}

impl StepRef {
  /// Path segments below `/api`, unencoded.
  fn segments(&self) -> [String; 9] {
    [
      "repos".into(),
      self.namespace.clone(),
      self.name.clone(),
      "builds".into(),
      self.build.to_string(),
      "stages".into(),
      self.stage.to_string(),
      "steps".into(),
      self.step.to_string(),
    ]
  }
}

#[derive(Serialize)]
struct CardBody<'a> {
  schema: &'a str,
  data:   &'a RawValue,
}

/// Async HTTP client for the card API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url =
      Url::parse(base_url).with_context(|| format!("invalid server URL {base_url:?}"))?;
    if base_url.cannot_be_a_base() {
      return Err(anyhow!("server URL {base_url} cannot carry a path"));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  /// The cards URL for `at`. Each segment is percent-encoded, so a `?`, `#`,
  /// `%` or `/` in a repository name stays inside its segment.
  fn cards_url(&self, at: &StepRef) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().push("api").extend(at.segments()).push("cards");
    }
    url.set_query(None);
    url.set_fragment(None);
    url
  }

  /// `POST .../steps/:step/cards`
  pub async fn create_card(&self, at: &StepRef, schema: &str, data: &RawValue) -> Result<Card> {
    let resp = self
      .client
      .post(self.cards_url(at))
      .json(&CardBody { schema, data })
      .send()
      .await
      .context("POST card failed")?;

    decode(resp, "POST card").await
  }

  /// `GET .../steps/:step/cards`
  pub async fn get_card(&self, at: &StepRef) -> Result<Card> {
    let resp = self
      .client
      .get(self.cards_url(at))
      .send()
      .await
      .context("GET card failed")?;

    decode(resp, "GET card").await
  }
}

/// Deserialise a card, or surface the server's `{"error": ...}` message.
async fn decode(resp: Response, what: &str) -> Result<Card> {
  let status = resp.status();
  if !status.is_success() {
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v["error"].as_str().map(str::to_owned))
      .unwrap_or_default();
    return Err(anyhow!("{what} → {status}: {message}"));
  }
  resp.json().await.context("deserialising card")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn step(namespace: &str, name: &str) -> StepRef {
    StepRef { namespace: namespace.into(), name: name.into(), build: 42, stage: 2, step: 3 }
  }

  #[test]
  fn cards_url_nests_under_api() {
    let client = ApiClient::new("http://localhost:8080/").unwrap();
    assert_eq!(
      client.cards_url(&step("acme", "widgets")).as_str(),
      "http://localhost:8080/api/repos/acme/widgets/builds/42/stages/2/steps/3/cards"
    );
  }

  #[test]
  fn cards_url_keeps_base_path_prefix() {
    let client = ApiClient::new("https://ci.example.com/pipecard").unwrap();
    assert_eq!(
      client.cards_url(&step("acme", "widgets")).path(),
      "/pipecard/api/repos/acme/widgets/builds/42/stages/2/steps/3/cards"
    );
  }

  #[test]
  fn cards_url_encodes_reserved_characters() {
    let client = ApiClient::new("http://localhost:8080").unwrap();
    let url = client.cards_url(&step("a?b", "c#d%e"));

    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
    assert_eq!(
      url.path(),
      "/api/repos/a%3Fb/c%23d%25e/builds/42/stages/2/steps/3/cards"
    );
  }

  #[test]
  fn base_url_must_parse() {
    assert!(ApiClient::new("localhost:8080").is_err());
    assert!(ApiClient::new("not a url").is_err());
  }
}
