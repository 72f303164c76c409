use crate::cmd::{color_cmd, parse_color, Cmd, Cmdr};
use crate::color::seq;
use crate::error::DiscoError;
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Mutex;

/// Expands `splay <group> <first> <last> [args...]` and
/// `shuffle <group> <first> <last> [args...]` into one `color` command per
/// member of the link group, with colors interpolated (HSV, short hue
/// arc) from `first` to `last`. `shuffle` additionally permutes the
/// resulting colors across the group before assignment.
///
/// The RNG is injectable so tests can assert a deterministic permutation;
/// production code seeds it from the system RNG.
pub struct Splay {
    inner: Box<dyn Cmdr>,
    links: HashMap<String, Vec<String>>,
    rng: Mutex<SmallRng>,
}

impl Splay {
    pub fn new(inner: Box<dyn Cmdr>, links: HashMap<String, Vec<String>>) -> Splay {
        Splay {
            inner,
            links,
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Builds a `Splay` seeded with a specific RNG, for deterministic tests.
    pub fn with_rng(inner: Box<dyn Cmdr>, links: HashMap<String, Vec<String>>, rng: SmallRng) -> Splay {
        Splay {
            inner,
            links,
            rng: Mutex::new(rng),
        }
    }

    fn splay_one(&self, cmd: &Cmd) -> Result<Vec<Cmd>, DiscoError> {
        let targets = self.links.get(&cmd.target).cloned().unwrap_or_default();
        let first = parse_color(
            cmd.args
                .first()
                .ok_or_else(|| DiscoError::Parse("splay requires a first color".to_string()))?,
        )?;
        let last = parse_color(
            cmd.args
                .get(1)
                .ok_or_else(|| DiscoError::Parse("splay requires a last color".to_string()))?,
        )?;

        let mut colors = seq(first, last, targets.len());
        if cmd.action == "shuffle" {
            let mut rng = self.rng.lock().expect("splay rng lock");
            colors.shuffle(&mut *rng);
        }

        let extra = cmd.args.get(2..).unwrap_or_default();
        Ok(targets
            .into_iter()
            .zip(colors)
            .map(|(target, color)| {
                let mut c = color_cmd(&target, color);
                c.args.extend(extra.iter().cloned());
                c
            })
            .collect())
    }
}

#[async_trait]
impl Cmdr for Splay {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let mut splays = Vec::new();
        let mut rest = Vec::new();
        for cmd in cmds {
            if cmd.action == "splay" || cmd.action == "shuffle" {
                splays.extend(self.splay_one(&cmd)?);
            } else {
                rest.push(cmd);
            }
        }
        rest.extend(splays);
        self.inner.cmd(rest).await
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        self.inner.watch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::parse_cmd_string;

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

    #[tokio::test]
    async fn splay_expands_to_one_color_cmd_per_target() {
        let links = HashMap::from([("all".to_string(), vec!["a".to_string(), "b".to_string(), "c".to_string()])]);
        let s = Splay::new(Box::new(Echo), links);
        let out = s
            .cmd(vec![parse_cmd_string("splay all ff0000 0000ff")])
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].target, "a");
        assert_eq!(out[0].action, "color");
        assert_eq!(out[0].args[0], "ff0000");
        assert_eq!(out[2].args[0], "0000ff");
    }

    #[tokio::test]
    async fn shuffle_permutes_deterministically_with_seeded_rng() {
        let links = HashMap::from([("all".to_string(), vec!["a".to_string(), "b".to_string(), "c".to_string()])]);
        let rng = SmallRng::seed_from_u64(42);
        let s = Splay::with_rng(Box::new(Echo), links, rng);
        let out = s
            .cmd(vec![parse_cmd_string("shuffle all ff0000 0000ff")])
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn non_splay_commands_pass_through_unchanged() {
        let s = Splay::new(Box::new(Echo), HashMap::new());
        let out = s.cmd(vec![parse_cmd_string("switch a on")]).await.unwrap();
        assert_eq!(out[0].action, "switch");
    }
}
