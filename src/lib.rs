//! disco is a home-lighting control plane: a composable command
//! pipeline sitting in front of Philips Hue (HTTPS/SSE), LIFX (LAN UDP),
//! and a file-backed simulator, driven by a CLI and an HTTP dashboard.
//!
//! Every backend implements [`cmd::Cmdr`]: apply a batch of `switch`/
//! `dim`/`color` commands and report what changed, or watch for changes
//! originating outside the pipeline (a Hue app, a LIFX mobile client).
//! [`pipeline`] composes cross-cutting rewrites -- aliasing, group
//! expansion, color splaying, named cues -- around any `Cmdr`, and
//! [`chaser`] runs saved step sequences as independent background loops.
//!
//! ```no_run
//! use disco::config::Config;
//! use disco::system::System;
//! use disco::cmd::Cmdr;
//!
//! # async fn run() -> Result<(), disco::error::DiscoError> {
//! let cfg = Config::load("disco.yml")?;
//! let system = System::new(&cfg).await?;
//! let cmd = disco::cmd::parse_cmd_string("switch all on");
//! let _ = system.cmdr.cmd(vec![cmd]).await?;
//! # Ok(())
//! # }
//! ```

pub mod adaptors;
pub mod chaser;
pub mod cmd;
pub mod color;
pub mod config;
pub mod error;
pub mod faux;
pub mod hue;
pub mod lifx;
pub mod pipeline;
pub mod system;

pub mod prelude {
    pub use crate::adaptors::{FauxAdaptor, HueAdaptor, LifxAdaptor};
    pub use crate::chaser::{Chase, Chaser, Sheet};
    pub use crate::cmd::{Cmd, Cmdr, Cmdrs};
    pub use crate::color::Color;
    pub use crate::config::Config;
    pub use crate::error::DiscoError;
    pub use crate::system::System;
}
