//! The `Cmd` value type and the `Cmdr` trait every backend and pipeline
//! stage implements.

use crate::color::Color;
use crate::error::DiscoError;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// A single command: an action name, a target, and any trailing
/// arguments. `color a ff0000 500ms` parses to
/// `Cmd { action: "color", target: "a", args: ["ff0000", "500ms"] }`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Cmd {
    pub action: String,
    pub target: String,
    pub args: Vec<String>,
}

/// Deserializes from the command-string form (`"switch all on"`), the
/// same form `cmds`/`steps` entries take in `disco.yml`, matching the
/// original's `Cmd.UnmarshalJSON`/`ParseCmdString`.
impl<'de> Deserialize<'de> for Cmd {
    fn deserialize<D>(deserializer: D) -> Result<Cmd, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(parse_cmd_string(&s))
    }
}

impl Cmd {
    pub fn new(action: impl Into<String>, target: impl Into<String>, args: Vec<String>) -> Cmd {
        Cmd {
            action: action.into(),
            target: target.into(),
            args,
        }
    }

    /// Joins action, target and args with a single space, matching `Cmd`'s
    /// line-protocol representation.
    pub fn to_line(&self) -> String {
        self.joined(" ")
    }

    /// Joins action, target and args with tabs, for tabular logging.
    pub fn to_tabbed(&self) -> String {
        self.joined("\t")
    }

    fn joined(&self, sep: &str) -> String {
        let mut parts = vec![self.action.clone(), self.target.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(sep)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// Parses a pre-tokenized arg list into a `Cmd`: `args[0]` is the action,
/// `args[1]` the target, the rest become `args`.
pub fn parse_cmd(args: &[String]) -> Cmd {
    Cmd {
        action: args.first().cloned().unwrap_or_default(),
        target: args.get(1).cloned().unwrap_or_default(),
        args: args.get(2..).map(|s| s.to_vec()).unwrap_or_default(),
    }
}

/// Parses a whitespace-separated line into a `Cmd`.
pub fn parse_cmd_string(s: &str) -> Cmd {
    let fields: Vec<String> = s.split_whitespace().map(str::to_string).collect();
    parse_cmd(&fields)
}

/// Parses a slash-separated path into a `Cmd`, e.g. `/switch/a/on`.
pub fn parse_cmd_path(s: &str) -> Cmd {
    let fields: Vec<String> = s
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    parse_cmd(&fields)
}

/// Builds a `switch` command.
pub fn switch_cmd(target: &str, on: bool) -> Cmd {
    Cmd::new("switch", target, vec![if on { "on" } else { "off" }.to_string()])
}

/// Parses a switch argument (`"on"`/`"off"`).
pub fn parse_switch(s: &str) -> Result<bool, DiscoError> {
    match s {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(DiscoError::Parse(format!("{s} is not a switch value"))),
    }
}

/// Builds a `dim` command, formatting `v` with no decimal places.
pub fn dim_cmd(target: &str, v: f64) -> Cmd {
    Cmd::new("dim", target, vec![format!("{:.0}", v)])
}

/// Parses a dim argument, `0.0..=100.0`.
pub fn parse_dim(s: &str) -> Result<f64, DiscoError> {
    let v: f64 = s.parse()?;
    if !(0.0..=100.0).contains(&v) {
        return Err(DiscoError::Parse(
            "dimming values range from 0 to 100".to_string(),
        ));
    }
    Ok(v)
}

/// Parses the optional wait duration out of `args[1]` -- note this is the
/// *second* positional argument, not `args[0]`, matching the original's
/// `ParseDuration(args []string)` which reads past the color value at
/// `args[0]`. Defaults to 3 seconds when absent.
pub fn parse_duration(args: &[String]) -> Result<Duration, DiscoError> {
    match args.get(1) {
        None => Ok(Duration::from_secs(3)),
        Some(s) => parse_duration_str(s),
    }
}

/// A minimal parser for Go-style duration strings (`500ms`, `1.5s`, `2m`,
/// `1h30m`), since the wire format these come from (config files, CLI
/// args) follows Go's `time.ParseDuration` convention. Exposed directly
/// for callers (e.g. the chaser's `wait` step) that parse a single
/// duration string rather than an args slice.
pub fn parse_duration_str(s: &str) -> Result<Duration, DiscoError> {
    let mut total = 0.0f64;
    let mut rest = s;
    if rest.is_empty() {
        return Err(DiscoError::Parse("empty duration".to_string()));
    }
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| DiscoError::Parse(format!("invalid duration {s}")))?;
        let (num, tail) = rest.split_at(split);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, remainder) = tail.split_at(unit_len);
        let n: f64 = num
            .parse()
            .map_err(|_| DiscoError::Parse(format!("invalid duration {s}")))?;
        let secs = match unit {
            "ns" => n / 1e9,
            "us" | "\u{b5}s" => n / 1e6,
            "ms" => n / 1e3,
            "s" => n,
            "m" => n * 60.0,
            "h" => n * 3600.0,
            _ => return Err(DiscoError::Parse(format!("unknown duration unit {unit} in {s}"))),
        };
        total += secs;
        rest = remainder;
    }
    Ok(Duration::from_secs_f64(total))
}

/// Builds a `color` command. Its color argument is always 6 hex digits:
/// `switch`/`dim`/`color` commands never carry a temperature byte.
pub fn color_cmd(target: &str, c: Color) -> Cmd {
    Cmd::new("color", target, vec![format!("{:06x}", c.0 & 0x00ff_ffff)])
}

/// Parses a `color` command argument, delegating to [`Color::parse`].
pub fn parse_color(s: &str) -> Result<Color, DiscoError> {
    Color::parse(s)
}

/// The behavior every backend and pipeline stage implements: apply a
/// batch of commands and return the commands that were actually carried
/// out (reporting the resulting state), and watch for externally
/// originated state changes.
#[async_trait]
pub trait Cmdr: Send + Sync {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError>;

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError>;
}

/// Fans a batch out to every commander, joining their outputs and errors.
pub struct Cmdrs(pub Vec<Box<dyn Cmdr>>);

#[async_trait]
impl Cmdr for Cmdrs {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let mut couts = Vec::new();
        let mut errs: Option<DiscoError> = None;
        for c in &self.0 {
            match c.cmd(cmds.clone()).await {
                Ok(mut out) => couts.append(&mut out),
                Err(e) => errs = Some(DiscoError::join(errs, e)),
            }
        }
        match errs {
            Some(e) => Err(e),
            None => Ok(couts),
        }
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let mut watchers = Vec::with_capacity(self.0.len());
        for c in &self.0 {
            watchers.push(c.watch().await?);
        }
        for mut w in watchers {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(cmd) = w.recv().await {
                    if tx.send(cmd).await.is_err() {
                        break;
                    }
                }
            });
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cmd_string_splits_on_whitespace() {
        let c = parse_cmd_string("color a ff0000 500ms");
        assert_eq!(c.action, "color");
        assert_eq!(c.target, "a");
        assert_eq!(c.args, vec!["ff0000".to_string(), "500ms".to_string()]);
    }

    #[test]
    fn parse_cmd_path_strips_slashes() {
        let c = parse_cmd_path("/switch/a/on");
        assert_eq!(c.action, "switch");
        assert_eq!(c.target, "a");
        assert_eq!(c.args, vec!["on".to_string()]);
    }

    #[test]
    fn duration_reads_second_arg_and_defaults() {
        let d = parse_duration(&["ff0000".to_string(), "500ms".to_string()]).unwrap();
        assert_eq!(d, Duration::from_millis(500));

        let d = parse_duration(&["ff0000".to_string()]).unwrap();
        assert_eq!(d, Duration::from_secs(3));
    }

    #[test]
    fn dim_range_enforced() {
        assert!(parse_dim("50").is_ok());
        assert!(parse_dim("150").is_err());
        assert!(parse_dim("-1").is_err());
    }

    #[test]
    fn switch_roundtrip() {
        assert_eq!(switch_cmd("a", true).args, vec!["on".to_string()]);
        assert_eq!(parse_switch("on").unwrap(), true);
        assert_eq!(parse_switch("off").unwrap(), false);
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn color_cmd_is_always_six_digits() {
        let c = color_cmd("a", Color(0x01ff0000));
        assert_eq!(c.args, vec!["ff0000".to_string()]);
    }
}
