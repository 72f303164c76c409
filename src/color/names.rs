//! Name dictionaries layered under [`super::Color::parse`].
//!
//! The full color-name dictionary is treated as an external collaborator
//! (spec.md's Non-goals) -- callers with a larger table (e.g. the XKCD
//! color survey) can extend it with [`register`]. This module ships a
//! small built-in seed so the crate works standalone, plus the named
//! color-temperature table, which mirrors
//! `original_source/color/k.go` verbatim.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

fn seed() -> HashMap<&'static str, u32> {
    HashMap::from([
        ("black", 0x000000),
        ("white", 0xffffff),
        ("red", 0xff0000),
        ("green", 0x00ff00),
        ("blue", 0x0000ff),
        ("yellow", 0xffff00),
        ("cyan", 0x00ffff),
        ("magenta", 0xff00ff),
        ("orange", 0xffa500),
        ("purple", 0x800080),
        ("pink", 0xffc0cb),
        ("gray", 0x808080),
        ("grey", 0x808080),
        ("brown", 0xa52a2a),
        ("gold", 0xffd700),
        ("lavender", 0xe6e6fa),
        ("turquoise", 0x40e0d0),
        ("coral", 0xff7f50),
        ("indigo", 0x4b0082),
        ("violet", 0xee82ee),
    ])
}

fn registry() -> &'static RwLock<HashMap<String, u32>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, u32>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        RwLock::new(seed().into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    })
}

/// Registers (or overrides) a name in the color dictionary used by
/// [`super::Color::parse`] and [`lookup`].
pub fn register(name: impl Into<String>, packed_rgb: u32) {
    registry().write().expect("color registry lock").insert(name.into(), packed_rgb);
}

/// Looks up a name in the color dictionary. Returns a packed `0x00RRGGBB`
/// value.
pub fn lookup(name: &str) -> Option<u32> {
    registry().read().expect("color registry lock").get(name).copied()
}

/// Named color temperatures, packed as `0x(K<<24)|0xffffff`, ported
/// verbatim from `original_source/color/k.go`.
pub fn temperature(name: &str) -> Option<u32> {
    let table: &[(&str, u32)] = &[
        ("frigid", 0x01ffffff),
        ("nippy", 0x1affffff),
        ("chilly", 0x33ffffff),
        ("brisk", 0x4cffffff),
        ("cool", 0x65ffffff),
        ("mild", 0x7effffff),
        ("comfortable", 0x97ffffff),
        ("warm", 0xb0ffffff),
        ("toasty", 0xc9ffffff),
        ("hot", 0xe2ffffff),
        ("roasting", 0xffffffff),
    ];
    table.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_lookup_works() {
        assert_eq!(lookup("red"), Some(0xff0000));
        assert_eq!(lookup("not-a-color"), None);
    }

    #[test]
    fn register_overrides() {
        register("red", 0x010203);
        assert_eq!(lookup("red"), Some(0x010203));
        register("red", 0xff0000);
    }

    #[test]
    fn temperature_roasting_has_k() {
        assert_eq!(temperature("roasting"), Some(0xffffffff));
        assert_eq!(temperature("unknown"), None);
    }
}
