//! End-to-end exercise of the composed pipeline (map, link, cue) sitting
//! in front of the faux file-backed backend -- no network required.

use disco::cmd::{parse_cmd_string, Cmdr};
use disco::config::Config;
use disco::pipeline::Cue;
use disco::system::System;
use std::collections::HashMap;

fn temp_faux_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("disco-pipeline-test-{name}.json"))
}

fn test_config(file: std::path::PathBuf) -> Config {
    let mut map = HashMap::new();
    map.insert("a".to_string(), "faux/1".to_string());

    let mut link = HashMap::new();
    link.insert("group".to_string(), vec!["faux/1".to_string(), "faux/2".to_string()]);

    let mut cue = HashMap::new();
    cue.insert(
        "party".to_string(),
        Cue {
            text: "Party mode".to_string(),
            cmds: vec![parse_cmd_string("switch group on")],
        },
    );

    Config {
        hue: None,
        lifx: None,
        faux: Some(disco::faux::Config { file }),
        map,
        link,
        cue,
        chase: HashMap::new(),
        sheet: Vec::new(),
    }
}

#[tokio::test]
async fn cue_expands_through_link_and_prefix_to_the_faux_backend() {
    let file = temp_faux_file("cue");
    let _ = tokio::fs::remove_file(&file).await;
    let cfg = test_config(file.clone());

    let system = System::new(&cfg).await.unwrap();
    system.cmdr.cmd(vec![parse_cmd_string("cue party")]).await.unwrap();

    let client = disco::faux::Client::new(disco::faux::Config { file: file.clone() });
    let data = client.load().await.unwrap();
    assert_eq!(data.switches.get("1"), Some(&true));
    assert_eq!(data.switches.get("2"), Some(&true));

    let _ = tokio::fs::remove_file(&file).await;
}

#[tokio::test]
async fn mapped_canonical_target_is_renamed_before_reaching_the_backend() {
    // map: { a: faux/1 } -- Mapper sits innermost, wrapping the raw prefixed
    // backend directly, exactly as in the original's `system.Init`. So a
    // command addressed by the *canonical* target gets rewritten to its
    // alias on the way into the backend (`M⁻¹`), and the faux backend's
    // `faux/` prefixer no longer recognizes it and drops it -- the same
    // behavior the original's `Mapper.Cmd` produces for an aliased target.
    let file = temp_faux_file("alias-canonical");
    let _ = tokio::fs::remove_file(&file).await;
    let cfg = test_config(file.clone());

    let system = System::new(&cfg).await.unwrap();
    let out = system
        .cmdr
        .cmd(vec![parse_cmd_string("switch faux/1 off")])
        .await
        .unwrap();
    assert!(out.is_empty());

    let client = disco::faux::Client::new(disco::faux::Config { file: file.clone() });
    let data = client.load().await.unwrap();
    assert_eq!(data.switches.get("1"), None);

    let _ = tokio::fs::remove_file(&file).await;
}

#[tokio::test]
async fn unmapped_canonical_target_is_unaffected_by_the_map_table() {
    let file = temp_faux_file("alias-unmapped");
    let _ = tokio::fs::remove_file(&file).await;
    let cfg = test_config(file.clone());

    let system = System::new(&cfg).await.unwrap();
    system
        .cmdr
        .cmd(vec![parse_cmd_string("switch faux/2 off")])
        .await
        .unwrap();

    let client = disco::faux::Client::new(disco::faux::Config { file: file.clone() });
    let data = client.load().await.unwrap();
    assert_eq!(data.switches.get("2"), Some(&false));

    let _ = tokio::fs::remove_file(&file).await;
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let file = temp_faux_file("notfound");
    let _ = tokio::fs::remove_file(&file).await;
    let cfg = test_config(file.clone());

    let system = System::new(&cfg).await.unwrap();
    let err = system
        .cmdr
        .cmd(vec![parse_cmd_string("switch faux/nope")])
        .await
        .unwrap_err();
    assert!(matches!(err, disco::error::DiscoError::NotFound(_)));

    let _ = tokio::fs::remove_file(&file).await;
}
