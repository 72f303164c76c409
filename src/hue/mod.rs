//! A client for the Hue Clip v2 HTTPS+JSON API, including the SSE event
//! stream.

pub mod model;

use crate::error::DiscoError;
use futures_util::StreamExt;
use model::{is_valid_id, Event, Light, LightPutRequest, LightResponse, PutResponse};
use reqwest::Client as HttpClient;
use reqwest_eventsource::{Event as SseEvent, EventSource};
use serde::Deserialize;

/// Bridge host and application key.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub host: String,
    pub key: String,
}

/// A Hue bridge client. The bridge's certificate is self-signed, so TLS
/// verification is disabled here -- the same tradeoff the teacher's
/// bridge client makes.
pub struct Client {
    config: Config,
    http: HttpClient,
}

impl Client {
    pub fn new(config: Config) -> Result<Client, DiscoError> {
        let http = HttpClient::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| DiscoError::Transport(format!("hue client: {e}")))?;
        Ok(Client { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}/clip/v2/{}", self.config.host, path)
    }

    /// Lists every light resource on the bridge.
    pub async fn lights(&self) -> Result<Vec<Light>, DiscoError> {
        let rsp = self
            .http
            .get(self.url("resource/light"))
            .header("hue-application-key", &self.config.key)
            .send()
            .await?;
        let lr: LightResponse = rsp.json().await?;
        check_errors(&lr.errors)?;
        Ok(lr.lights)
    }

    /// Fetches a single light resource by id.
    pub async fn light(&self, id: &str) -> Result<Light, DiscoError> {
        if !is_valid_id(id) {
            return Err(DiscoError::Parse(format!("invalid resource id {id:?}")));
        }
        let rsp = self
            .http
            .get(self.url(&format!("resource/light/{id}")))
            .header("hue-application-key", &self.config.key)
            .send()
            .await?;
        let lr: LightResponse = rsp.json().await?;
        match lr.lights.into_iter().next() {
            Some(light) => {
                check_errors(&lr.errors)?;
                Ok(light)
            }
            None => {
                check_errors(&lr.errors)?;
                Err(DiscoError::NotFound(format!("light {id} not found")))
            }
        }
    }

    /// Applies a partial update to a light resource.
    pub async fn light_put(&self, id: &str, req: &LightPutRequest) -> Result<(), DiscoError> {
        if !is_valid_id(id) {
            return Err(DiscoError::Parse(format!("invalid resource id {id:?}")));
        }
        let rsp = self
            .http
            .put(self.url(&format!("resource/light/{id}")))
            .header("hue-application-key", &self.config.key)
            .json(req)
            .send()
            .await?;
        let pr: PutResponse = rsp.json().await?;
        check_errors(&pr.errors)
    }

    /// Opens the bridge's SSE event stream and returns a channel of
    /// decoded events, one per resource sub-update.
    pub async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Event>, DiscoError> {
        let url = format!("https://{}/eventstream/clip/v2", self.config.host);
        let req = self
            .http
            .get(&url)
            .header("hue-application-key", &self.config.key)
            .header("Accept", "text/event-stream");

        let mut source = EventSource::new(req)
            .map_err(|e| DiscoError::Transport(format!("hue watch: {e}")))?;

        let (tx, rx) = tokio::sync::mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(event) = source.next().await {
                match event {
                    Ok(SseEvent::Message(msg)) => {
                        match serde_json::from_str::<Vec<Event>>(&msg.data) {
                            Ok(events) => {
                                for e in events {
                                    if tx.send(e).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => log::error!("hue decoding events: {e}"),
                        }
                    }
                    Ok(SseEvent::Open) => {}
                    Err(e) => {
                        log::error!("hue event stream: {e}");
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }
}

fn check_errors(errors: &[model::ApiError]) -> Result<(), DiscoError> {
    let mut acc: Option<DiscoError> = None;
    for e in errors {
        acc = Some(DiscoError::join(acc, DiscoError::Transport(e.to_string())));
    }
    match acc {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
