use crate::cmd::{Cmd, Cmdr};
use crate::error::DiscoError;
use async_trait::async_trait;

/// Routes commands whose target begins with `prefix` to the wrapped
/// commander, stripping the prefix on the way in and restoring it on the
/// way out (both for returned command states and watched events).
pub struct Prefixer {
    inner: Box<dyn Cmdr>,
    prefix: String,
}

impl Prefixer {
    pub fn new(inner: Box<dyn Cmdr>, prefix: impl Into<String>) -> Prefixer {
        Prefixer {
            inner,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Cmdr for Prefixer {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let mut cuts = Vec::new();
        for mut cmd in cmds {
            match cmd.target.strip_prefix(self.prefix.as_str()) {
                Some(stripped) => {
                    cmd.target = stripped.to_string();
                    cuts.push(cmd);
                }
                None if cmd.target.is_empty() => cuts.push(cmd),
                None => {}
            }
        }
        let mut cout = self.inner.cmd(cuts).await?;
        for c in &mut cout {
            c.target = format!("{}{}", self.prefix, c.target);
        }
        Ok(cout)
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let mut inner_rx = self.inner.watch().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let prefix = self.prefix.clone();
        tokio::spawn(async move {
            while let Some(mut cmd) = inner_rx.recv().await {
                cmd.target = format!("{prefix}{}", cmd.target);
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
    async fn strips_and_restores_prefix() {
        let p = Prefixer::new(Box::new(Echo), "living/");
        let out = p
            .cmd(vec![parse_cmd_string("switch living/lamp on")])
            .await
            .unwrap();
        assert_eq!(out[0].target, "living/lamp");
    }

    #[tokio::test]
    async fn drops_commands_outside_prefix() {
        let p = Prefixer::new(Box::new(Echo), "living/");
        let out = p.cmd(vec![parse_cmd_string("switch kitchen/lamp on")]).await.unwrap();
        assert!(out.is_empty());
    }
}
