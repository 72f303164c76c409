use crate::cmd::{Cmd, Cmdr};
use crate::error::DiscoError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Renames targets through a fixed bijection `M: alias -> canonical`.
/// Forward (incoming, before reaching the wrapped commander): replace
/// `target` with `M⁻¹[target]` if present. Reverse (outgoing command
/// states and watched events): replace `target` with `M[target]` if
/// present. Non-matches pass through untouched.
pub struct Mapper {
    inner: Box<dyn Cmdr>,
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl Mapper {
    /// `aliases` maps `alias -> canonical target`, matching the config
    /// file's `Map` section. The inverse is precomputed once here.
    pub fn new(inner: Box<dyn Cmdr>, aliases: HashMap<String, String>) -> Mapper {
        let reverse = aliases
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect();
        Mapper {
            inner,
            forward: aliases,
            reverse,
        }
    }
}

#[async_trait]
impl Cmdr for Mapper {
    async fn cmd(&self, mut cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        for cmd in &mut cmds {
            if let Some(mapped) = self.reverse.get(&cmd.target) {
                cmd.target = mapped.clone();
            }
        }
        let mut cout = self.inner.cmd(cmds).await?;
        for c in &mut cout {
            if let Some(mapped) = self.forward.get(&c.target) {
                c.target = mapped.clone();
            }
        }
        Ok(cout)
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let mut inner_rx = self.inner.watch().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let forward = self.forward.clone();
        tokio::spawn(async move {
            while let Some(mut cmd) = inner_rx.recv().await {
                if let Some(mapped) = forward.get(&cmd.target) {
                    cmd.target = mapped.clone();
                }
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::parse_cmd_string;
    use std::sync::{Arc, Mutex};

    struct Echo;

    #[async_trait]
    impl Cmdr for Echo {
        async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
            Ok(cmds)
        }
        async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }
    }

    /// Records the targets it actually received, so tests can assert on
    /// what the wrapped commander saw rather than only the round trip.
    struct Spy(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Cmdr for Spy {
        async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
            self.0.lock().unwrap().extend(cmds.iter().map(|c| c.target.clone()));
            Ok(cmds)
        }
        async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn canonical_target_round_trips_through_an_echoing_inner() {
        let aliases = HashMap::from([("lamp".to_string(), "00:11:22".to_string())]);
        let m = Mapper::new(Box::new(Echo), aliases);
        let out = m.cmd(vec![parse_cmd_string("switch 00:11:22 on")]).await.unwrap();
        assert_eq!(out[0].target, "00:11:22");
    }

    #[tokio::test]
    async fn non_matching_target_passes_through_untouched() {
        let aliases = HashMap::from([("lamp".to_string(), "00:11:22".to_string())]);
        let m = Mapper::new(Box::new(Echo), aliases);
        let out = m.cmd(vec![parse_cmd_string("switch other on")]).await.unwrap();
        assert_eq!(out[0].target, "other");
    }

    #[tokio::test]
    async fn forward_pass_sends_inverse_mapped_target_to_inner() {
        let aliases = HashMap::from([("a".to_string(), "hue/light-1".to_string())]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let m = Mapper::new(Box::new(Spy(seen.clone())), aliases);

        let out = m
            .cmd(vec![parse_cmd_string("color hue/light-1 ff0000")])
            .await
            .unwrap();

        // the wrapped commander must see the inverse-mapped (alias) target,
        // not the canonical one the caller used
        assert_eq!(seen.lock().unwrap().as_slice(), ["a"]);
        // and the result round-trips back to canonical for the caller
        assert_eq!(out[0].target, "hue/light-1");
    }
}
