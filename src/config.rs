//! Loads the YAML configuration file: provider credentials, the command
//! pipeline's map/link/cue tables, and chase/sheet definitions. Mirrors
//! the original's `disco.Config` plus `system.Config`, flattened into one
//! file since this crate has no separate `system` package.

use crate::chaser::{Chase, Sheet};
use crate::error::DiscoError;
use crate::pipeline::Cue;
use crate::{faux, hue, lifx};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The full on-disk configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hue: Option<hue::Config>,
    #[serde(default)]
    pub lifx: Option<lifx::Config>,
    #[serde(default)]
    pub faux: Option<faux::Config>,
    #[serde(default)]
    pub map: HashMap<String, String>,
    #[serde(default)]
    pub link: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub cue: HashMap<String, Cue>,
    #[serde(default)]
    pub chase: HashMap<String, Chase>,
    #[serde(default)]
    pub sheet: Vec<Sheet>,
}

impl Config {
    /// Reads and parses a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, DiscoError> {
        let bytes = std::fs::read(path)?;
        let cfg: Config = serde_yaml::from_slice(&bytes)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
faux:
  file: /tmp/disco-faux.json
map:
  a: hue/light-1
link:
  group1: [a, b]
cue:
  party:
    text: party mode
    cmds:
      - "switch group1 on"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.hue.is_none());
        assert!(cfg.faux.is_some());
        assert_eq!(cfg.map.get("a"), Some(&"hue/light-1".to_string()));
        assert_eq!(cfg.link.get("group1").unwrap().len(), 2);
        let party = cfg.cue.get("party").unwrap();
        assert_eq!(party.cmds.len(), 1);
        assert_eq!(party.cmds[0].action, "switch");
        assert_eq!(party.cmds[0].target, "group1");
        assert_eq!(party.cmds[0].args, vec!["on".to_string()]);
    }

    #[test]
    fn missing_sections_default_empty() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert!(cfg.map.is_empty());
        assert!(cfg.chase.is_empty());
        assert!(cfg.sheet.is_empty());
    }
}
