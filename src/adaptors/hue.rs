use crate::cmd::{color_cmd, dim_cmd, parse_color, parse_dim, parse_duration, parse_switch, switch_cmd, Cmd, Cmdr};
use crate::color::Color as DiscoColor;
use crate::error::DiscoError;
use crate::hue::model::{Light, LightPutColor, LightPutDimming, LightPutDynamics, LightPutGradient, LightPutOn, LightPutRequest, Point};
use async_trait::async_trait;
use std::collections::HashMap;

/// Adapts a Hue bridge client to the [`Cmdr`] pipeline interface.
pub struct HueAdaptor(pub crate::hue::Client);

#[async_trait]
impl Cmdr for HueAdaptor {
    async fn cmd(&self, cmds: Vec<Cmd>) -> Result<Vec<Cmd>, DiscoError> {
        let lights = self
            .0
            .lights()
            .await
            .map_err(|e| DiscoError::Transport(format!("hue: {e}")))?;
        let by_id: HashMap<String, Light> = lights.into_iter().map(|l| (l.id.clone(), l)).collect();

        let mut cout = Vec::new();
        let mut errs: Option<DiscoError> = None;
        let mut switch_reqs: HashMap<String, LightPutRequest> = HashMap::new();
        let mut color_reqs: HashMap<String, LightPutRequest> = HashMap::new();

        for cmd in &cmds {
            let result = match cmd.action.as_str() {
                "switch" => cmd_switch(cmd, &by_id, &mut switch_reqs),
                "dim" => cmd_dim(cmd, &by_id, &mut color_reqs),
                "color" => cmd_color(cmd, &by_id, &mut color_reqs),
                _ => Ok(Vec::new()),
            };
            match result {
                Ok(cs) => cout.extend(cs),
                Err(e) => errs = Some(DiscoError::join(errs, e)),
            }
        }

        for (id, req) in switch_reqs {
            if let Err(e) = self.0.light_put(&id, &req).await {
                return Err(DiscoError::join(errs, e));
            }
        }
        for (id, req) in color_reqs {
            if let Err(e) = self.0.light_put(&id, &req).await {
                return Err(DiscoError::join(errs, e));
            }
        }

        match errs {
            Some(e) => Err(e),
            None => Ok(cout),
        }
    }

    async fn watch(&self) -> Result<tokio::sync::mpsc::Receiver<Cmd>, DiscoError> {
        let mut events = self.0.watch().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(256);
        tokio::spawn(async move {
            while let Some(e) = events.recv().await {
                if e.event_type != "update" {
                    continue;
                }
                for d in e.data {
                    if d.event_type != "light" {
                        continue;
                    }
                    if let Some(on) = d.on {
                        if tx.send(switch_cmd(&d.id, on.on)).await.is_err() {
                            return;
                        }
                    }
                    if let Some(dimming) = d.dimming {
                        if tx.send(dim_cmd(&d.id, dimming.brightness)).await.is_err() {
                            return;
                        }
                    }
                    if let Some(color) = d.color {
                        let c = xy_to_disco_color(color.xy.x, color.xy.y);
                        if tx.send(color_cmd(&d.id, c)).await.is_err() {
                            return;
                        }
                    }
                    if let Some(gradient) = d.gradient {
                        for (i, p) in gradient.points.iter().enumerate() {
                            let c = xy_to_disco_color(p.color.xy.x, p.color.xy.y);
                            let id = format!("{}/{}", d.id, i);
                            if tx.send(color_cmd(&id, c)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });
        Ok(rx)
    }
}

fn xy_to_disco_color(x: f64, y: f64) -> DiscoColor {
    DiscoColor::from_xyb(x, y, 1.0)
}

fn cmd_switch(
    cmd: &Cmd,
    lights: &HashMap<String, Light>,
    reqs: &mut HashMap<String, LightPutRequest>,
) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(lights.values().map(|l| switch_cmd(&l.id, l.on.on)).collect());
    }
    let light = lights
        .get(&cmd.target)
        .ok_or_else(|| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
    if cmd.args.is_empty() {
        return Ok(vec![switch_cmd(&light.id, light.on.on)]);
    }
    let on = parse_switch(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("hue: {}: {e}", cmd.target)))?;
    reqs.entry(cmd.target.clone()).or_default().on = Some(LightPutOn { on });
    Ok(Vec::new())
}

fn cmd_dim(
    cmd: &Cmd,
    lights: &HashMap<String, Light>,
    reqs: &mut HashMap<String, LightPutRequest>,
) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(lights
            .values()
            .filter_map(|l| l.dimming.map(|d| dim_cmd(&l.id, d.brightness)))
            .collect());
    }
    let light = lights
        .get(&cmd.target)
        .ok_or_else(|| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
    let dimming = light
        .dimming
        .ok_or_else(|| DiscoError::NotFound(format!("hue: has no dimming {}", cmd.target)))?;
    if cmd.args.is_empty() {
        return Ok(vec![dim_cmd(&light.id, dimming.brightness)]);
    }

    let v = parse_dim(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("hue: {}: {e}", cmd.target)))?;
    let d = parse_duration(&cmd.args).map_err(|e| DiscoError::Parse(format!("hue: {}: {e}", cmd.target)))?;
    let duration_ms = d.as_millis() as i64;

    let req = reqs.entry(cmd.target.clone()).or_default();
    check_duration(req, duration_ms, &cmd.target)?;
    req.dimming = Some(LightPutDimming { brightness: v });
    Ok(Vec::new())
}

fn cmd_color(
    cmd: &Cmd,
    lights: &HashMap<String, Light>,
    reqs: &mut HashMap<String, LightPutRequest>,
) -> Result<Vec<Cmd>, DiscoError> {
    if cmd.target.is_empty() {
        return Ok(lights.values().flat_map(cmd_color_get).collect());
    }

    let (id, index) = match cmd.target.split_once('/') {
        Some((id, idx)) => (id, Some(idx)),
        None => (cmd.target.as_str(), None),
    };
    let light = lights
        .get(id)
        .ok_or_else(|| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
    if light.color.is_none() {
        return Err(DiscoError::NotFound(format!("hue: has no color {}", cmd.target)));
    }

    if cmd.args.is_empty() {
        let cout = cmd_color_get(light);
        let Some(index) = index else { return Ok(cout) };
        let i: usize = index
            .parse()
            .map_err(|_| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
        return cout
            .get(i)
            .cloned()
            .map(|c| vec![c])
            .ok_or_else(|| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)));
    }

    let clr = parse_color(&cmd.args[0]).map_err(|e| DiscoError::Parse(format!("hue: {}: {e}", cmd.target)))?;
    let gamut = light.color.as_ref().and_then(|c| c.gamut).unwrap_or_default();
    let (x0, y0, _) = clr.xyb();
    let (x, y) = crate::color::bound_to_gamut_xy(
        x0, y0,
        gamut.red.x, gamut.red.y,
        gamut.green.x, gamut.green.y,
        gamut.blue.x, gamut.blue.y,
    );

    let d = parse_duration(&cmd.args).map_err(|e| DiscoError::Parse(format!("hue: {}: {e}", cmd.target)))?;
    let duration_ms = d.as_millis() as i64;

    let req = reqs.entry(id.to_string()).or_default();
    check_duration(req, duration_ms, &cmd.target)?;

    let Some(index) = index else {
        req.color = Some(LightPutColor::new(x, y));
        return Ok(Vec::new());
    };

    let gradient = light
        .gradient
        .as_ref()
        .ok_or_else(|| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
    let light_xy = light.color.as_ref().map(|c| c.xy).unwrap_or_default();
    let mut points = gradient.points.clone();
    while (points.len() as i64) < gradient.points_capable {
        points.push(Point::new(light_xy.x, light_xy.y));
    }
    let i: usize = index
        .parse()
        .map_err(|_| DiscoError::NotFound(format!("hue: has no target {}", cmd.target)))?;
    if i as i64 >= gradient.points_capable {
        return Err(DiscoError::NotFound(format!("hue: has no target {}", cmd.target)));
    }
    points[i] = Point::new(x, y);
    req.gradient = Some(LightPutGradient { points });
    Ok(Vec::new())
}

fn check_duration(req: &mut LightPutRequest, duration_ms: i64, target: &str) -> Result<(), DiscoError> {
    match &req.dynamics {
        Some(dyn_) if dyn_.duration != duration_ms => Err(DiscoError::Conflict(format!(
            "hue: {target}: commands have conflicting durations"
        ))),
        _ => {
            req.dynamics = Some(LightPutDynamics { duration: duration_ms });
            Ok(())
        }
    }
}

fn cmd_color_get(light: &Light) -> Vec<Cmd> {
    let Some(color) = &light.color else { return Vec::new() };

    let mut current = xy_to_disco_color(color.xy.x, color.xy.y);

    let Some(gradient) = &light.gradient else {
        return vec![color_cmd(&light.id, current)];
    };

    let mut cout = Vec::new();
    for i in 0..gradient.points_capable {
        let id = format!("{}/{}", light.id, i);
        if (i as usize) >= gradient.points.len() {
            cout.push(color_cmd(&id, current));
            continue;
        }
        let p = &gradient.points[i as usize];
        current = xy_to_disco_color(p.color.xy.x, p.color.xy.y);
        cout.push(color_cmd(&id, current));
    }
    cout
}
