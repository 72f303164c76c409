//! A file-backed simulator: reads and writes target state to a JSON
//! file instead of talking to real hardware. Useful for development and
//! demos without Hue or LIFX devices on hand.

use crate::color::Color;
use crate::error::DiscoError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Where the simulator persists its state.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub file: PathBuf,
}

/// In-memory target state: switch, dim level, and color per target name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Data {
    #[serde(rename = "Ss", default)]
    pub switches: HashMap<String, bool>,
    #[serde(rename = "Ds", default)]
    pub dims: HashMap<String, f64>,
    #[serde(rename = "Cs", default)]
    pub colors: HashMap<String, u32>,
}

impl Data {
    pub fn color(&self, target: &str) -> Option<Color> {
        self.colors.get(target).copied().map(Color)
    }

    pub fn set_color(&mut self, target: &str, c: Color) {
        self.colors.insert(target.to_string(), c.0);
    }
}

/// A simulator client: loads its state file fresh on each command batch
/// and saves it back afterward, matching the original's "no cached
/// state" design (simplicity over performance, since faux is a dev
/// tool).
pub struct Client {
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Client {
        Client { config }
    }

    pub async fn load(&self) -> Result<Data, DiscoError> {
        match tokio::fs::read(&self.config.file).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Data::default()),
            Err(e) => Err(DiscoError::Transport(format!("load: {e}"))),
        }
    }

    pub async fn save(&self, data: &Data) -> Result<(), DiscoError> {
        let bytes = serde_json::to_vec(data)?;
        tokio::fs::write(&self.config.file, bytes)
            .await
            .map_err(|e| DiscoError::Transport(format!("save: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty_data() {
        let client = Client::new(Config {
            file: std::env::temp_dir().join("disco-faux-test-missing.json"),
        });
        let _ = tokio::fs::remove_file(&client.config.file).await;
        let d = client.load().await.unwrap();
        assert!(d.switches.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let file = std::env::temp_dir().join("disco-faux-test-roundtrip.json");
        let client = Client::new(Config { file: file.clone() });
        let mut d = Data::default();
        d.switches.insert("a".to_string(), true);
        client.save(&d).await.unwrap();
        let loaded = client.load().await.unwrap();
        assert_eq!(loaded.switches.get("a"), Some(&true));
        let _ = tokio::fs::remove_file(&file).await;
    }
}
