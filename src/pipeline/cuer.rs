use crate::cmd::{Cmd, Cmdr};
use crate::error::DiscoError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, saved batch of commands.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub text: String,
    pub cmds: Vec<Cmd>,
}

/// Expands `cue <name>` commands into the cue's saved command batch,
/// recursively (a cue may invoke other cues), producing a pre-order
/// flattening of the expansion tree. A cue referencing a name that
/// doesn't exist fails immediately. Cycles are caught exactly: each
/// recursive descent tracks the cue names on its own active expansion
/// path, and revisiting one of them fails rather than expanding forever
/// -- a cue reachable more than once via different paths (a diamond) is
/// not a cycle and expands fine.
pub struct Cuer {
    inner: Box<dyn Cmdr>,
    cues: HashMap<String, Cue>,
}

impl Cuer {
    pub fn new(inner: Box<dyn Cmdr>, cues: HashMap<String, Cue>) -> Cuer {
        Cuer { inner, cues }
    }

    fn expand(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let mut out = Vec::with_capacity(cmds.len());
        let mut path = Vec::new();
        for cmd in cmds {
            self.expand_cmd(cmd, &mut path, &mut out)?;
        }
        Ok(out)
    }

    fn expand_cmd(&self, cmd: Cmd, path: &mut Vec<String>, out: &mut Vec<Cmd>) -> Result<(), DiscoError> {
        if cmd.action != "cue" {
            out.push(cmd);
            return Ok(());
        }
        if path.contains(&cmd.target) {
            return Err(DiscoError::Config("cycle detected".to_string()));
        }
        let cue = self
            .cues
            .get(&cmd.target)
            .ok_or_else(|| DiscoError::NotFound(format!("cue not found: {:?}", cmd.target)))?
            .clone();
        path.push(cmd.target.clone());
        for c in cue.cmds {
            self.expand_cmd(c, path, out)?;
        }
        path.pop();
        Ok(())
    }
}

#[async_trait]
impl Cmdr for Cuer {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let expanded = self.expand(cmds)?;
        self.inner.cmd(expanded).await
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
    async fn expands_named_cue() {
        let cues = HashMap::from([(
            "party".to_string(),
            Cue {
                text: "party".to_string(),
                cmds: vec![parse_cmd_string("switch a on"), parse_cmd_string("switch b on")],
            },
        )]);
        let c = Cuer::new(Box::new(Echo), cues);
        let out = c.cmd(vec![parse_cmd_string("cue party")]).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn missing_cue_fails() {
        let c = Cuer::new(Box::new(Echo), HashMap::new());
        let err = c.cmd(vec![parse_cmd_string("cue missing")]).await.unwrap_err();
        assert!(matches!(err, DiscoError::NotFound(_)));
    }

    #[tokio::test]
    async fn diamond_shaped_cue_refs_are_not_a_cycle() {
        let cues = HashMap::from([
            (
                "a".to_string(),
                Cue {
                    text: "a".to_string(),
                    cmds: vec![parse_cmd_string("cue b"), parse_cmd_string("cue b")],
                },
            ),
            (
                "b".to_string(),
                Cue {
                    text: "b".to_string(),
                    cmds: vec![parse_cmd_string("cue c"), parse_cmd_string("cue c")],
                },
            ),
            (
                "c".to_string(),
                Cue {
                    text: "c".to_string(),
                    cmds: vec![parse_cmd_string("switch x on")],
                },
            ),
        ]);
        let c = Cuer::new(Box::new(Echo), cues);
        let out = c.cmd(vec![parse_cmd_string("cue a")]).await.unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|cmd| cmd.target == "x"));
    }

    #[tokio::test]
    async fn cyclic_cue_fails_instead_of_hanging() {
        let cues = HashMap::from([(
            "a".to_string(),
            Cue {
                text: "a".to_string(),
                cmds: vec![parse_cmd_string("cue a")],
            },
        )]);
        let c = Cuer::new(Box::new(Echo), cues);
        let err = c.cmd(vec![parse_cmd_string("cue a")]).await.unwrap_err();
        assert!(matches!(err, DiscoError::Config(_)));
    }
}
