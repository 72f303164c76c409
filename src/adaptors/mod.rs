//! `Cmdr` adaptors wrapping each backend client: Hue, LIFX, and the faux
//! file-backed simulator.

pub mod faux;
pub mod hue;
pub mod lifx;

pub use faux::FauxAdaptor;
pub use hue::HueAdaptor;
pub use lifx::LifxAdaptor;
