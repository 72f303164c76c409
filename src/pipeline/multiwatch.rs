use crate::cmd::{Cmd, Cmdr};
use crate::error::DiscoError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

type Upstream = Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>;

/// Wraps a commander so that many independent `watch()` callers share a
/// single upstream watch stream. The first caller to subscribe starts the
/// upstream watch. Each subscriber is supervised by its own task watching
/// its sender for closure (the caller dropping or closing its receiver);
/// when that happens the subscriber is detached, and once the last one
/// detaches the upstream watch is cancelled.
pub struct MultiWatcher {
    inner: Arc<dyn Cmdr>,
    subs: Arc<Mutex<HashMap<u64, mpsc::Sender<Cmd>>>>,
    next_id: AtomicU64,
    upstream: Upstream,
}

impl MultiWatcher {
    pub fn new(inner: Arc<dyn Cmdr>) -> MultiWatcher {
        MultiWatcher {
            inner,
            subs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            upstream: Arc::new(Mutex::new(None)),
        }
    }

    async fn ensure_upstream(&self) -> Result<(), DiscoError> {
        let mut upstream = self.upstream.lock().await;
        if upstream.is_some() {
            return Ok(());
        }
        let mut rx = self.inner.watch().await?;
        let subs = self.subs.clone();
        *upstream = Some(tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let subs = subs.lock().await;
                for tx in subs.values() {
                    let _ = tx.send(cmd.clone()).await;
                }
            }
        }));
        Ok(())
    }
}

#[async_trait]
impl Cmdr for MultiWatcher {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        self.inner.cmd(cmds).await
    }

    async fn watch(&self) -> Result<mpsc::Receiver<Cmd>, DiscoError> {
        self.ensure_upstream().await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(64);
        self.subs.lock().await.insert(id, tx.clone());

        let subs = self.subs.clone();
        let upstream = self.upstream.clone();
        tokio::spawn(async move {
            tx.closed().await;
            let mut subs = subs.lock().await;
            subs.remove(&id);
            if subs.is_empty() {
                if let Some(handle) = upstream.lock().await.take() {
                    handle.abort();
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

    struct OneShotWatch(Arc<Mutex<Option<mpsc::Sender<Cmd>>>>);

    #[async_trait]
    impl Cmdr for OneShotWatch {
        async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
            Ok(cmds)
        }
        async fn watch(&self) -> Result<mpsc::Receiver<Cmd>, DiscoError> {
            let (tx, rx) = mpsc::channel(8);
            *self.0.lock().await = Some(tx);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn fans_out_to_multiple_subscribers() {
        let sender_slot = Arc::new(Mutex::new(None));
        let inner: Arc<dyn Cmdr> = Arc::new(OneShotWatch(sender_slot.clone()));
        let m = MultiWatcher::new(inner);

        let mut r1 = m.watch().await.unwrap();
        let mut r2 = m.watch().await.unwrap();

        let tx = sender_slot.lock().await.clone().unwrap();
        tx.send(parse_cmd_string("switch a on")).await.unwrap();

        assert_eq!(r1.recv().await.unwrap().target, "a");
        assert_eq!(r2.recv().await.unwrap().target, "a");
    }

    #[tokio::test]
    async fn dropped_subscriber_is_detached_and_upstream_stops_when_last_leaves() {
        let sender_slot = Arc::new(Mutex::new(None));
        let inner: Arc<dyn Cmdr> = Arc::new(OneShotWatch(sender_slot.clone()));
        let m = MultiWatcher::new(inner);

        let r1 = m.watch().await.unwrap();
        drop(r1);

        // give the per-subscriber supervisor task a chance to run
        for _ in 0..100 {
            if m.subs.lock().await.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(m.subs.lock().await.is_empty());
        assert!(m.upstream.lock().await.is_none());
    }
}
