//! Wires configured providers into one composed commander and the
//! chaser. Replaces the original's global `onShutdown` hook list with an
//! explicit `System` value the caller owns and shuts down itself.

use crate::adaptors::{FauxAdaptor, HueAdaptor, LifxAdaptor};
use crate::chaser::Chaser;
use crate::cmd::{Cmdr, Cmdrs};
use crate::config::Config;
use crate::error::DiscoError;
use crate::pipeline::Prefixer;
use crate::{faux, hue, lifx};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Every configured backend composed into one pipeline, plus the chase
/// runner. Built once at startup and held for the life of the process.
pub struct System {
    pub cmdr: Arc<dyn Cmdr>,
    pub chaser: Arc<Chaser>,
    pub chaser_errs: mpsc::Receiver<String>,
}

impl System {
    /// Builds a `System` from a loaded [`Config`]: constructs each
    /// configured provider, wraps it with a `<name>/` prefix, fans them
    /// out through [`Cmdrs`], and layers the map/link/splay/cue pipeline
    /// on top before handing the composed commander to a [`Chaser`].
    pub async fn new(cfg: &Config) -> Result<System, DiscoError> {
        let mut backends: Vec<Box<dyn Cmdr>> = Vec::new();

        if let Some(hue_cfg) = &cfg.hue {
            let client = hue::Client::new(hue_cfg.clone())?;
            backends.push(Box::new(Prefixer::new(Box::new(HueAdaptor(client)), "hue/")));
        }
        if let Some(lifx_cfg) = &cfg.lifx {
            let client = lifx::Client::new(*lifx_cfg).await?;
            backends.push(Box::new(Prefixer::new(Box::new(LifxAdaptor(client)), "lifx/")));
        }
        if let Some(faux_cfg) = &cfg.faux {
            let client = faux::Client::new(faux_cfg.clone());
            backends.push(Box::new(Prefixer::new(Box::new(FauxAdaptor(client)), "faux/")));
        }

        let fanned: Box<dyn Cmdr> = Box::new(Cmdrs(backends));
        let cmdr: Arc<dyn Cmdr> = Arc::from(crate::pipeline::new(fanned, cfg));

        let (chaser, chaser_errs) = Chaser::new(cmdr.clone(), cfg.chase.clone());

        Ok(System {
            cmdr,
            chaser: Arc::new(chaser),
            chaser_errs,
        })
    }

    /// Stops every running chase. The provider clients' background tasks
    /// (LIFX discovery, Hue SSE) are owned by `Arc`s cloned into those
    /// tasks themselves and simply end with the process -- there's no
    /// vendor socket to close explicitly the way the original's
    /// `onShutdown` hooks did.
    pub async fn shutdown(&self) {
        self.chaser.stop_all().await;
    }
}
