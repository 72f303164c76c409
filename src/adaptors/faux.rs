use crate::cmd::{color_cmd, dim_cmd, parse_color, parse_dim, parse_switch, switch_cmd, Cmd, Cmdr};
use crate::error::DiscoError;
use crate::faux::{Client, Data};
use async_trait::async_trait;

/// Adapts the file-backed simulator to the [`Cmdr`] pipeline interface.
pub struct FauxAdaptor(pub Client);

#[async_trait]
impl Cmdr for FauxAdaptor {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let mut data = self
            .0
            .load()
            .await
            .map_err(|e| DiscoError::Transport(format!("faux: {e}")))?;

        let mut cout = Vec::new();
        for cmd in &cmds {
            let cs = match cmd.action.as_str() {
                "switch" => cmd_switch(cmd, &mut data)?,
                "dim" => cmd_dim(cmd, &mut data)?,
                "color" => cmd_color(cmd, &mut data)?,
                _ => continue,
            };
            cout.extend(cs);
        }

        self.0
            .save(&data)
            .await
            .map_err(|e| DiscoError::Transport(format!("faux: {e}")))?;
        Ok(cout)
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let (_tx, rx) = tokio::sync::mpsc::channel(1);
        Ok(rx)
    }
}

fn cmd_switch(cmd: &Cmd, data: &mut Data) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(data
            .switches
            .iter()
            .map(|(t, &on)| switch_cmd(t, on))
            .collect());
    }
    let existing = data.switches.get(&cmd.target).copied();
    if cmd.args.is_empty() {
        return match existing {
            Some(on) => Ok(vec![switch_cmd(&cmd.target, on)]),
            None => Err(DiscoError::NotFound(format!("faux: has no target {}", cmd.target))),
        };
    }
    let on = parse_switch(&cmd.args[0])
        .map_err(|e| DiscoError::Parse(format!("faux: {}: {e}", cmd.target)))?;
    data.switches.insert(cmd.target.clone(), on);
    Ok(Vec::new())
}

fn cmd_dim(cmd: &Cmd, data: &mut Data) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(data.dims.iter().map(|(t, &v)| dim_cmd(t, v)).collect());
    }
    let existing = data.dims.get(&cmd.target).copied();
    if cmd.args.is_empty() {
        return match existing {
            Some(v) => Ok(vec![dim_cmd(&cmd.target, v)]),
            None => Err(DiscoError::NotFound(format!("faux: has no target {}", cmd.target))),
        };
    }
    let v = parse_dim(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("faux: {}: {e}", cmd.target)))?;
    data.dims.insert(cmd.target.clone(), v);
    Ok(Vec::new())
}

fn cmd_color(cmd: &Cmd, data: &mut Data) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(data
            .colors
            .iter()
            .map(|(t, &c)| color_cmd(t, crate::color::Color(c)))
            .collect());
    }
    let existing = data.color(&cmd.target);
    if cmd.args.is_empty() {
        return match existing {
            Some(c) => Ok(vec![color_cmd(&cmd.target, c)]),
            None => Err(DiscoError::NotFound(format!("faux: has no target {}", cmd.target))),
        };
    }
    let c = parse_color(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("faux: {}: {e}", cmd.target)))?;
    let (h, s, _) = c.hsvf();
    data.set_color(&cmd.target, crate::color::Color::from_hsvf(h, s, 1.0));
    Ok(Vec::new())
}
