//! `disco` is the command-line client: run a single command against the
//! configured providers, or watch for externally originated changes.

use clap::Parser;
use disco::cmd::{parse_cmd, parse_color, Cmdr};
use disco::config::Config;
use disco::system::System;
use std::io::IsTerminal;

/// A command-line client for the disco lighting control plane.
#[derive(Parser)]
#[command(name = "disco", about = "A command-line client for the disco lighting control plane")]
struct Cli {
    /// Path to config file.
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Watch for changes instead of running a command.
    #[arg(short = 'w', long = "watch")]
    watch: bool,

    /// action target [args...]
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn default_config_path() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => format!("{home}/.config/disco.yml"),
        _ => "disco.yml".to_string(),
    }
}

fn color_stdout(cmd: &disco::cmd::Cmd) -> String {
    if cmd.action != "color" {
        return String::new();
    }
    let Some(arg) = cmd.args.first() else {
        return String::new();
    };
    let Ok(c) = parse_color(arg) else {
        return String::new();
    };
    format!(" {}", c.term_bg("  "))
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let cfg = match Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let system = match System::new(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if cli.watch {
        let mut rx = match system.cmdr.watch().await {
            Ok(rx) => rx,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };
        while let Some(cmd) = rx.recv().await {
            println!("{cmd}");
        }
        return;
    }

    let cmd = parse_cmd(&cli.args);
    let mut cmds = match system.cmdr.cmd(vec![cmd]).await {
        Ok(cmds) => cmds,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    cmds.sort_by(|a, b| a.to_line().cmp(&b.to_line()));

    if !std::io::stdout().is_terminal() {
        for cmd in &cmds {
            println!("{cmd}");
        }
        return;
    }

    for cmd in &cmds {
        println!("{}{}", cmd.to_tabbed(), color_stdout(cmd));
    }
}
