//! Wire types for the Hue Clip v2 HTTPS API.

use serde::{Deserialize, Serialize};

/// A CIE xy chromaticity pair.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Color {
    pub xy: Xy,
}

/// One point of a gradient light's color run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    pub color: Color,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point {
            color: Color { xy: Xy { x, y } },
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LightPutOn {
    pub on: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LightPutDimming {
    pub brightness: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LightPutColor {
    pub xy: Xy,
}

impl LightPutColor {
    pub fn new(x: f64, y: f64) -> LightPutColor {
        LightPutColor { xy: Xy { x, y } }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightPutGradient {
    pub points: Vec<Point>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LightPutDynamics {
    pub duration: i64,
}

/// A partial light update. Only the fields that are `Some` are included
/// in the request body, matching the API's semantics of "unset fields
/// are left unchanged".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LightPutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<LightPutOn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<LightPutDimming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<LightPutColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<LightPutGradient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamics: Option<LightPutDynamics>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Gamut {
    pub red: Xy,
    pub green: Xy,
    pub blue: Xy,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightColor {
    pub gamut: Option<Gamut>,
    pub gamut_type: String,
    pub xy: Xy,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct MirekSchema {
    pub mirek_maximum: i64,
    pub mirek_minimum: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightColorTemperature {
    pub mirek: Option<i64>,
    pub mirek_schema: MirekSchema,
    pub mirek_valid: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct LightDimming {
    pub brightness: f64,
    pub min_dim_level: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightGradient {
    pub mode: String,
    pub points: Vec<Point>,
    pub points_capable: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightMetadata {
    pub archetype: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct OnState {
    pub on: bool,
}

/// A light resource as returned by `GET /resource/light[/id]`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Light {
    pub id: String,
    #[serde(default)]
    pub id_v1: String,
    #[serde(default)]
    pub color: Option<LightColor>,
    #[serde(default)]
    pub color_temperature: Option<LightColorTemperature>,
    #[serde(default)]
    pub dimming: Option<LightDimming>,
    #[serde(default)]
    pub gradient: Option<LightGradient>,
    #[serde(default)]
    pub metadata: LightMetadata,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub on: OnState,
    #[serde(rename = "type", default)]
    pub resource_type: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourceRef {
    pub rid: String,
    pub rtype: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiError {
    pub description: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LightResponse {
    #[serde(default, rename = "data")]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PutResponse {
    #[serde(default)]
    pub data: Vec<ResourceRef>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// An SSE event frame. `data` holds the event's sub-updates, one per
/// affected resource.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Event {
    pub creationtime: String,
    #[serde(default)]
    pub data: Vec<EventData>,
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventDimming {
    pub brightness: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventGradient {
    #[serde(default)]
    pub points: Vec<Point>,
    pub points_capable: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub dimming: Option<EventDimming>,
    #[serde(default)]
    pub gradient: Option<EventGradient>,
    pub id: String,
    #[serde(default)]
    pub id_v1: String,
    #[serde(default)]
    pub on: Option<OnState>,
    #[serde(default)]
    pub owner: ResourceRef,
    #[serde(rename = "type", default)]
    pub event_type: String,
}

/// The bridge resource-id format: 8-4-4-4-12 lowercase hex.
pub fn is_valid_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split('-').collect();
    let lens = [8, 4, 4, 4, 12];
    parts.len() == 5
        && parts
            .iter()
            .zip(lens)
            .all(|(p, want_len)| p.len() == want_len && p.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_uuid_shape() {
        assert!(is_valid_id("01234567-89ab-cdef-0123-456789abcdef"));
        assert!(!is_valid_id("not-a-uuid"));
        assert!(!is_valid_id("01234567-89AB-cdef-0123-456789abcdef"));
    }
}
