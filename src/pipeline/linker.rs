use crate::cmd::{Cmd, Cmdr};
use crate::error::DiscoError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Expands a target naming a link group into one command per member,
/// repeating until no target in the batch names a group (groups may
/// reference other groups). Expansion is bounded to
/// `reachable_targets + 1` rounds; exceeding that bound means the link
/// table contains a cycle.
pub struct Linker {
    inner: Box<dyn Cmdr>,
    links: HashMap<String, Vec<String>>,
}

impl Linker {
    pub fn new(inner: Box<dyn Cmdr>, links: HashMap<String, Vec<String>>) -> Linker {
        Linker { inner, links }
    }

    fn reachable_bound(&self) -> usize {
        let mut seen: std::collections::HashSet<&str> = self.links.keys().map(|s| s.as_str()).collect();
        for targets in self.links.values() {
            seen.extend(targets.iter().map(|s| s.as_str()));
        }
        seen.len() + 1
    }

    fn expand(&self, mut cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let bound = self.reachable_bound();
        for _ in 0..=bound {
            let mut again = false;
            let mut links = Vec::with_capacity(cmds.len());
            for cmd in cmds {
                if let Some(targets) = self.links.get(&cmd.target) {
                    again = true;
                    for target in targets {
                        let mut c = cmd.clone();
                        c.target = target.clone();
                        links.push(c);
                    }
                } else {
                    links.push(cmd);
                }
            }
            cmds = links;
            if !again {
                return Ok(cmds);
            }
        }
        Err(DiscoError::Config("cycle detected".to_string()))
    }
}

#[async_trait]
impl Cmdr for Linker {
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
    async fn expands_group_to_members() {
        let links = HashMap::from([("all".to_string(), vec!["a".to_string(), "b".to_string()])]);
        let l = Linker::new(Box::new(Echo), links);
        let out = l.cmd(vec![parse_cmd_string("switch all on")]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].target, "a");
        assert_eq!(out[1].target, "b");
    }

    #[tokio::test]
    async fn nested_groups_expand_to_fixed_point() {
        let links = HashMap::from([
            ("all".to_string(), vec!["room".to_string()]),
            ("room".to_string(), vec!["a".to_string(), "b".to_string()]),
        ]);
        let l = Linker::new(Box::new(Echo), links);
        let out = l.cmd(vec![parse_cmd_string("switch all on")]).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn cyclic_links_fail_instead_of_hanging() {
        let links = HashMap::from([
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["a".to_string()]),
        ]);
        let l = Linker::new(Box::new(Echo), links);
        let err = l.cmd(vec![parse_cmd_string("switch a on")]).await.unwrap_err();
        assert!(matches!(err, DiscoError::Config(_)));
    }
}
