//! Composable command-pipeline transformers. Each wraps an inner
//! [`crate::cmd::Cmdr`] and rewrites the command batch passing through it.

pub mod cuer;
pub mod linker;
pub mod mapper;
pub mod multiwatch;
pub mod prefix;
pub mod splay;

pub use cuer::{Cue, Cuer};
pub use linker::Linker;
pub use mapper::Mapper;
pub use multiwatch::MultiWatcher;
pub use prefix::Prefixer;
pub use splay::Splay;

use crate::cmd::Cmdr;
use crate::config::Config;

/// Wraps `inner` with the recommended stack, innermost first:
/// `Map` -> `Link` -> `Splay` -> `Cue`. Mirrors the original's
/// `disco.New`, which composes `WithCue(WithSplay(WithLink(WithMap(c,
/// cfg.Map), cfg.Link), cfg.Link), cfg.Cue)` -- note `Splay` and `Linker`
/// share the same link table, since splay targets a link group too.
pub fn new(inner: Box<dyn Cmdr>, cfg: &Config) -> Box<dyn Cmdr> {
    let mapped = Mapper::new(inner, cfg.map.clone());
    let linked = Linker::new(Box::new(mapped), cfg.link.clone());
    let splayed = Splay::new(Box::new(linked), cfg.link.clone());
    let cued = Cuer::new(Box::new(splayed), cfg.cue.clone());
    Box::new(cued)
}
