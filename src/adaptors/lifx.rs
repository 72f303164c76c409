use crate::cmd::{color_cmd, dim_cmd, parse_color, parse_dim, parse_duration, parse_switch, switch_cmd, Cmd, Cmdr};
use crate::color::Color as DiscoColor;
use crate::error::DiscoError;
use crate::lifx::{self, SetColor, SetPower, State};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Adapts a LIFX LAN client to the [`Cmdr`] pipeline interface.
pub struct LifxAdaptor(pub lifx::Client);

#[async_trait]
impl Cmdr for LifxAdaptor {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let (states, err) = self.states(&cmds).await;
        if states.is_empty() {
            return match err {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }
        let mut errs = err;

        let mut cout = Vec::new();
        let mut preqs: HashMap<String, SetPower> = HashMap::new();
        let mut creqs: HashMap<String, SetColor> = HashMap::new();

        for cmd in &cmds {
            let result = match cmd.action.as_str() {
                "switch" => cmd_switch(cmd, &states, &mut preqs),
                "dim" => cmd_dim(cmd, &states, &mut creqs),
                "color" => cmd_color(cmd, &states, &mut creqs),
                _ => Ok(Vec::new()),
            };
            match result {
                Ok(cs) => cout.extend(cs),
                Err(e) => errs = Some(DiscoError::join(errs, e)),
            }
        }

        let mut handles = Vec::new();
        for (t, r) in preqs {
            let Some(s) = states.get(&t) else { continue };
            let target = s.target;
            let client = self.0.clone();
            handles.push(tokio::spawn(async move {
                if client.set_power(target, r).await.is_err() {
                    log::warn!("lifx did not ack target {t}");
                }
            }));
        }
        for h in handles {
            let _ = h.await;
        }

        let mut handles = Vec::new();
        for (t, r) in creqs {
            let Some(s) = states.get(&t) else { continue };
            let target = s.target;
            let client = self.0.clone();
            handles.push(tokio::spawn(async move {
                if client.set_color(target, r).await.is_err() {
                    log::warn!("lifx did not ack target {t}");
                }
            }));
        }
        for h in handles {
            let _ = h.await;
        }

        match errs {
            Some(e) => Err(e),
            None => Ok(cout),
        }
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let mut states = self.0.watch();
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        tokio::spawn(async move {
            let mut last: HashMap<u64, State> = HashMap::new();
            while let Some(n) = states.recv().await {
                let prev = last.insert(n.target, n.clone());
                let Some(p) = prev else { continue };
                let target = format!("{:x}", n.target);

                if n.power != p.power && tx.send(switch_cmd(&target, n.power != 0)).await.is_err() {
                    return;
                }
                if n.color.b != p.color.b {
                    let v = 100.0 * n.color.b as f64 / u16::MAX as f64;
                    if tx.send(dim_cmd(&target, v)).await.is_err() {
                        return;
                    }
                }
                if n.color.h != p.color.h || n.color.s != p.color.s {
                    let c = hs_to_disco_color(n.color.h, n.color.s);
                    if tx.send(color_cmd(&target, c)).await.is_err() {
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }
}

impl LifxAdaptor {
    /// Resolves the targets named by `cmds` to their current state, or
    /// every known light if any command carries an empty target.
    async fn states(&self, cmds: &[Cmd]) -> (HashMap<String, State>, Option<DiscoError>) {
        let mut targets: Option<Vec<u64>> = None;
        let mut errs: Option<DiscoError> = None;

        for cmd in cmds {
            if cmd.target.is_empty() {
                targets = Some(Vec::new());
                break;
            }
            match parse_target(&cmd.target) {
                Ok(t) => targets.get_or_insert_with(Vec::new).push(t),
                Err(e) => errs = Some(DiscoError::join(errs, DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))),
            }
        }
        let Some(targets) = targets else {
            return (HashMap::new(), errs);
        };

        match self.0.state(&targets).await {
            Ok(ss) => {
                let map = ss.into_iter().map(|s| (format!("{:x}", s.target), s)).collect();
                (map, errs)
            }
            Err(e) => (HashMap::new(), Some(DiscoError::join(errs, DiscoError::Transport(format!("lifx: {e}"))))),
        }
    }
}

fn parse_target(s: &str) -> Result<u64, DiscoError> {
    u64::from_str_radix(s, 16).map_err(|e| DiscoError::Parse(format!("{e}")))
}

fn hs_to_disco_color(h: u16, s: u16) -> DiscoColor {
    DiscoColor::from_hsvf(h as f64 / u16::MAX as f64, s as f64 / u16::MAX as f64, 1.0)
}

fn clamp_duration_ms(d: Duration) -> u32 {
    d.as_millis().min(u32::MAX as u128) as u32
}

fn cmd_switch(cmd: &Cmd, states: &HashMap<String, State>, preqs: &mut HashMap<String, SetPower>) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(states.iter().map(|(t, s)| switch_cmd(t, s.power != 0)).collect());
    }
    let s = states
        .get(&cmd.target)
        .ok_or_else(|| DiscoError::NotFound(format!("lifx: has no target {}", cmd.target)))?;
    if cmd.args.is_empty() {
        return Ok(vec![switch_cmd(&cmd.target, s.power != 0)]);
    }
    let on = parse_switch(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))?;
    preqs.insert(
        cmd.target.clone(),
        SetPower {
            level: if on { u16::MAX } else { 0 },
        },
    );
    Ok(Vec::new())
}

fn cmd_dim(cmd: &Cmd, states: &HashMap<String, State>, creqs: &mut HashMap<String, SetColor>) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(states
            .iter()
            .map(|(t, s)| dim_cmd(t, 100.0 * s.color.b as f64 / u16::MAX as f64))
            .collect());
    }
    let s = states
        .get(&cmd.target)
        .ok_or_else(|| DiscoError::NotFound(format!("lifx: has no target {}", cmd.target)))?;
    if cmd.args.is_empty() {
        return Ok(vec![dim_cmd(&cmd.target, 100.0 * s.color.b as f64 / u16::MAX as f64)]);
    }

    let v = parse_dim(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))?;
    let d = parse_duration(&cmd.args).map_err(|e| DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))?;
    let dms = clamp_duration_ms(d);

    let mut req = match creqs.get(&cmd.target) {
        Some(existing) => {
            if clamp_duration_ms(existing.duration) != dms {
                return Err(DiscoError::Conflict(format!(
                    "lifx: {}: commands have conflicting durations",
                    cmd.target
                )));
            }
            *existing
        }
        None => SetColor {
            color: s.color,
            duration: d,
        },
    };
    req.duration = d;
    req.color.b = (v / 100.0 * u16::MAX as f64) as u16;
    creqs.insert(cmd.target.clone(), req);
    Ok(Vec::new())
}

fn cmd_color(cmd: &Cmd, states: &HashMap<String, State>, creqs: &mut HashMap<String, SetColor>) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(states
            .iter()
            .map(|(t, s)| color_cmd(t, hs_to_disco_color(s.color.h, s.color.s)))
            .collect());
    }
    let s = states
        .get(&cmd.target)
        .ok_or_else(|| DiscoError::NotFound(format!("lifx: has no target {}", cmd.target)))?;
    if cmd.args.is_empty() {
        return Ok(vec![color_cmd(&cmd.target, hs_to_disco_color(s.color.h, s.color.s))]);
    }

    let clr = parse_color(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))?;
    let d = parse_duration(&cmd.args).map_err(|e| DiscoError::Parse(format!("lifx: {}: {e}", cmd.target)))?;
    let dms = clamp_duration_ms(d);

    let mut req = match creqs.get(&cmd.target) {
        Some(existing) => {
            if clamp_duration_ms(existing.duration) != dms {
                return Err(DiscoError::Conflict(format!(
                    "lifx: {}: commands have conflicting durations",
                    cmd.target
                )));
            }
            *existing
        }
        None => SetColor {
            color: s.color,
            duration: d,
        },
    };
    req.duration = d;
    let (h, sat, _) = clr.hsvf();
    req.color.h = (h * u16::MAX as f64) as u16;
    req.color.s = (sat * u16::MAX as f64) as u16;
    creqs.insert(cmd.target.clone(), req);
    Ok(Vec::new())
}
