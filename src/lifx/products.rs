//! The LIFX product registry, embedded at build time.
//!
//! The real registry (published at `github.com/LIFX/products`) is a large
//! external JSON asset; this crate embeds a small representative subset
//! covering the product families exercised elsewhere in the crate
//! (color bulbs, multizone, white-only, relay-only), the same `vid: 1`
//! shape as upstream.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
struct Registry {
    vid: u32,
    products: Vec<Product>,
}

/// A single LIFX product model.
#[derive(Clone, Debug, Deserialize)]
pub struct Product {
    pub pid: u32,
    pub name: String,
    pub features: Features,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Features {
    pub color: bool,
    pub multizone: bool,
    pub chain: bool,
    pub infrared: bool,
    pub matrix: bool,
    pub relays: bool,
    pub buttons: bool,
    pub temperature_range: Vec<u16>,
}

static PRODUCTS_JSON: &str = include_str!("products.json");

fn registry() -> &'static HashMap<u32, Product> {
    static REGISTRY: OnceLock<HashMap<u32, Product>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registries: Vec<Registry> =
            serde_json::from_str(PRODUCTS_JSON).expect("embedded lifx products.json must parse");
        let vid1 = registries
            .into_iter()
            .find(|r| r.vid == 1)
            .expect("embedded lifx products.json must contain vid 1");
        vid1.products.into_iter().map(|p| (p.pid, p)).collect()
    })
}

/// Looks up a product by its protocol id.
pub fn lookup(pid: u32) -> Option<&'static Product> {
    registry().get(&pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_product() {
        let p = lookup(27).expect("LIFX A19 must be in the embedded registry");
        assert_eq!(p.name, "LIFX A19");
        assert!(p.features.color);
    }

    #[test]
    fn unknown_pid_is_none() {
        assert!(lookup(u32::MAX).is_none());
    }
}
