//! Brush configuration and the three stroke styles.
//!
//! Brush dispatch is closed: every [`BrushKind`] maps to exactly one
//! constructor, so an unknown brush name is rejected when parsed, never at
//! paint time.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::raster::{fill_square, stamp_disc_max, stamp_disc_over};

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 50;
pub const DEFAULT_BRUSH_SIZE: u32 = 20;

/// Dots emitted per input point by the spray brush.
pub const SPRAY_DENSITY: u32 = 20;
/// Nominal spray dot width and its +/- variance, in px.
const SPRAY_DOT_WIDTH: u32 = 1;
const SPRAY_DOT_VARIANCE: u32 = 1;
/// The circle brush picks each dab diameter in `size ± CIRCLE_SIZE_JITTER`.
const CIRCLE_SIZE_JITTER: u32 = 20;
/// Upper bound on chords per pen curve segment.
const MAX_CURVE_CHORDS: usize = 512;

// ============================================================================
// COLORS
// ============================================================================

/// 8-bit sRGB brush color. Serialized as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BrushColor(pub [u8; 3]);

impl BrushColor {
    pub const WHITE: BrushColor = BrushColor([0xFF, 0xFF, 0xFF]);
    pub const BLACK: BrushColor = BrushColor([0x00, 0x00, 0x00]);

    pub fn rgb(&self) -> [u8; 3] {
        self.0
    }

    /// Parse `#RRGGBB` or `RRGGBB` (case-insensitive).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(BrushColor([r, g, b]))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl TryFrom<String> for BrushColor {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        BrushColor::from_hex(&s).ok_or_else(|| format!("invalid color '{}', expected #RRGGBB", s))
    }
}

impl From<BrushColor> for String {
    fn from(c: BrushColor) -> Self {
        c.to_hex()
    }
}

/// The eight swatches offered next to the custom picker.
pub const PRESET_COLORS: [BrushColor; 8] = [
    BrushColor([0xFF, 0xFF, 0xFF]), // White
    BrushColor([0x00, 0x00, 0x00]), // Black
    BrushColor([0xFF, 0x00, 0x00]), // Red
    BrushColor([0x00, 0xFF, 0x00]), // Green
    BrushColor([0x00, 0x00, 0xFF]), // Blue
    BrushColor([0xFF, 0xFF, 0x00]), // Yellow
    BrushColor([0xFF, 0x00, 0xFF]), // Magenta
    BrushColor([0x00, 0xFF, 0xFF]), // Cyan
];

// ============================================================================
// BRUSH KIND + CONFIG
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushKind {
    /// Free-hand pen line.
    #[default]
    Pen,
    Spray,
    /// Circular dabs of random size and opacity.
    Circle,
}

impl BrushKind {
    pub fn label(&self) -> &'static str {
        match self {
            BrushKind::Pen => "Pen",
            BrushKind::Spray => "Spray",
            BrushKind::Circle => "Circle",
        }
    }

    pub fn all() -> &'static [BrushKind] {
        &[BrushKind::Pen, BrushKind::Spray, BrushKind::Circle]
    }

    fn constructor(self) -> fn(&BrushConfig) -> Box<dyn StrokeBrush> {
        match self {
            BrushKind::Pen => PenBrush::boxed,
            BrushKind::Spray => SprayBrush::boxed,
            BrushKind::Circle => CircleBrush::boxed,
        }
    }
}

impl FromStr for BrushKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pen" | "pencil" => Ok(BrushKind::Pen),
            "spray" => Ok(BrushKind::Spray),
            "circle" => Ok(BrushKind::Circle),
            other => Err(format!("unknown brush kind '{}' (expected pen, spray or circle)", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushConfig {
    pub size: u32,
    pub color: BrushColor,
    pub kind: BrushKind,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BRUSH_SIZE,
            color: BrushColor::WHITE,
            kind: BrushKind::Pen,
        }
    }
}

impl BrushConfig {
    pub fn new(kind: BrushKind, size: u32, color: BrushColor) -> Self {
        Self {
            size: clamp_size(size),
            color,
            kind,
        }
    }

    /// Instantiate the stroke tool for this configuration.
    pub fn build(&self) -> Box<dyn StrokeBrush> {
        (self.kind.constructor())(self)
    }
}

pub fn clamp_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

// ============================================================================
// STROKE INPUT
// ============================================================================

/// A pointer position in canvas pixel coordinates. Serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 2]", into = "[f32; 2]")]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
}

impl StrokePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn midpoint(self, other: StrokePoint) -> StrokePoint {
        StrokePoint::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    fn distance(self, other: StrokePoint) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

impl TryFrom<[f32; 2]> for StrokePoint {
    type Error = String;

    fn try_from(p: [f32; 2]) -> Result<Self, Self::Error> {
        let point = StrokePoint::new(p[0], p[1]);
        if point.is_finite() {
            Ok(point)
        } else {
            Err(format!("stroke point [{}, {}] is not finite", p[0], p[1]))
        }
    }
}

impl From<StrokePoint> for [f32; 2] {
    fn from(p: StrokePoint) -> Self {
        [p.x, p.y]
    }
}

/// One active stroke tool. Implementations rasterise straight onto the
/// surface's stroke layer as input arrives.
pub trait StrokeBrush: Send {
    fn kind(&self) -> BrushKind;
    fn begin(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint);
    fn extend(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint);
    fn end(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng);
}

// ============================================================================
// PEN
// ============================================================================

/// Opaque round-capped line smoothed with quadratic curves through the
/// midpoints of consecutive input segments.
pub struct PenBrush {
    radius: f32,
    rgb: [u8; 3],
    /// Last raw input point (the next curve's control point).
    last: Option<StrokePoint>,
    /// Where the drawn path currently ends.
    path_end: StrokePoint,
}

impl PenBrush {
    fn boxed(config: &BrushConfig) -> Box<dyn StrokeBrush> {
        Box::new(Self::new(config))
    }

    pub fn new(config: &BrushConfig) -> Self {
        Self {
            radius: config.size as f32 / 2.0,
            rgb: config.color.rgb(),
            last: None,
            path_end: StrokePoint::new(0.0, 0.0),
        }
    }

    /// Stamp along `a`→`b`, clipped to the part that can touch the layer.
    fn stamp_segment(&self, layer: &mut RgbaImage, a: StrokePoint, b: StrokePoint) {
        let Some((a, b)) = clip_segment(layer, a, b, self.radius + 1.0) else {
            return;
        };
        let steps = a.distance(b).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            stamp_disc_max(layer, x, y, self.radius, self.rgb);
        }
    }

    /// Flatten the curve into chords and stamp each one. The chord count is
    /// capped, so far-away control points cost no more than a long chord.
    fn stamp_quad(&self, layer: &mut RgbaImage, a: StrokePoint, ctrl: StrokePoint, b: StrokePoint) {
        let reach = self.radius + 1.0;
        let (w, h) = layer.dimensions();
        // The curve stays inside the hull of its control points.
        let min_x = a.x.min(ctrl.x).min(b.x);
        let max_x = a.x.max(ctrl.x).max(b.x);
        let min_y = a.y.min(ctrl.y).min(b.y);
        let max_y = a.y.max(ctrl.y).max(b.y);
        if max_x < -reach || max_y < -reach || min_x > w as f32 + reach || min_y > h as f32 + reach {
            return;
        }

        let polygon = a.distance(ctrl) as f64 + ctrl.distance(b) as f64;
        let chords = polygon.ceil().clamp(1.0, MAX_CURVE_CHORDS as f64) as usize;
        // Evaluated in f64: the weighted sum stays within the hull, while the
        // f32 intermediates could overflow.
        let bezier = |p0: f32, p1: f32, p2: f32, t: f64| {
            let u = 1.0 - t;
            (u * u * p0 as f64 + 2.0 * u * t * p1 as f64 + t * t * p2 as f64) as f32
        };
        let mut from = a;
        for i in 1..=chords {
            let t = i as f64 / chords as f64;
            let to = StrokePoint::new(bezier(a.x, ctrl.x, b.x, t), bezier(a.y, ctrl.y, b.y, t));
            self.stamp_segment(layer, from, to);
            from = to;
        }
    }
}

/// Clip `a`→`b` to the layer grown by `margin` on every side (Liang-Barsky).
/// Works in f64 so that segments spanning most of the f32 range stay finite.
fn clip_segment(
    layer: &RgbaImage,
    a: StrokePoint,
    b: StrokePoint,
    margin: f32,
) -> Option<(StrokePoint, StrokePoint)> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let (w, h) = layer.dimensions();
    let margin = margin as f64;
    let (x0, y0) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - x0, b.y as f64 - y0);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let edges = [
        (-dx, x0 + margin),
        (dx, w as f64 + margin - x0),
        (-dy, y0 + margin),
        (dy, h as f64 + margin - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| StrokePoint::new((x0 + dx * t) as f32, (y0 + dy * t) as f32);
    Some((at(t0), at(t1)))
}

impl StrokeBrush for PenBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Pen
    }

    fn begin(&mut self, layer: &mut RgbaImage, _rng: &mut fastrand::Rng, p: StrokePoint) {
        self.last = Some(p);
        self.path_end = p;
        // A click without movement still leaves a round dot.
        stamp_disc_max(layer, p.x, p.y, self.radius, self.rgb);
    }

    fn extend(&mut self, layer: &mut RgbaImage, _rng: &mut fastrand::Rng, p: StrokePoint) {
        let Some(prev) = self.last else {
            return;
        };
        if prev.distance(p) < f32::EPSILON {
            return;
        }
        let mid = prev.midpoint(p);
        self.stamp_quad(layer, self.path_end, prev, mid);
        self.path_end = mid;
        self.last = Some(p);
    }

    fn end(&mut self, layer: &mut RgbaImage, _rng: &mut fastrand::Rng) {
        if let Some(last) = self.last.take() {
            self.stamp_segment(layer, self.path_end, last);
        }
    }
}

// ============================================================================
// SPRAY
// ============================================================================

/// Scatters small opaque square dots over the square `point ± size/2`.
pub struct SprayBrush {
    half: f32,
    rgb: [u8; 3],
    density: u32,
}

impl SprayBrush {
    fn boxed(config: &BrushConfig) -> Box<dyn StrokeBrush> {
        Box::new(Self::new(config))
    }

    pub fn new(config: &BrushConfig) -> Self {
        Self {
            half: config.size as f32 / 2.0,
            rgb: config.color.rgb(),
            density: SPRAY_DENSITY,
        }
    }

    fn spray_chunk(&self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        // Dots are at most two pixels wide, so a square wholly off the layer
        // draws nothing.
        let (w, h) = layer.dimensions();
        let reach = self.half + 2.0;
        if !p.is_finite()
            || p.x < -reach
            || p.y < -reach
            || p.x > w as f32 + reach
            || p.y > h as f32 + reach
        {
            return;
        }
        let min_x = (p.x - self.half).floor() as i32;
        let max_x = (p.x + self.half).floor() as i32;
        let min_y = (p.y - self.half).floor() as i32;
        let max_y = (p.y + self.half).floor() as i32;
        let min_w = SPRAY_DOT_WIDTH.saturating_sub(SPRAY_DOT_VARIANCE).max(1);
        let max_w = SPRAY_DOT_WIDTH + SPRAY_DOT_VARIANCE;

        for _ in 0..self.density {
            let x = rng.i32(min_x..=max_x);
            let y = rng.i32(min_y..=max_y);
            let dot = rng.u32(min_w..=max_w);
            fill_square(layer, x, y, dot, self.rgb);
        }
    }
}

impl StrokeBrush for SprayBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Spray
    }

    fn begin(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        self.spray_chunk(layer, rng, p);
    }

    fn extend(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        self.spray_chunk(layer, rng, p);
    }

    fn end(&mut self, _layer: &mut RgbaImage, _rng: &mut fastrand::Rng) {}
}

// ============================================================================
// CIRCLE
// ============================================================================

/// One translucent circle per input point.
pub struct CircleBrush {
    size: u32,
    rgb: [u8; 3],
}

impl CircleBrush {
    fn boxed(config: &BrushConfig) -> Box<dyn StrokeBrush> {
        Box::new(Self::new(config))
    }

    pub fn new(config: &BrushConfig) -> Self {
        Self {
            size: config.size,
            rgb: config.color.rgb(),
        }
    }

    fn dab(&self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        let min_d = self.size.saturating_sub(CIRCLE_SIZE_JITTER);
        let diameter = rng.u32(min_d..=self.size + CIRCLE_SIZE_JITTER);
        let opacity = rng.u32(0..=100) as f32 / 100.0;
        stamp_disc_over(layer, p.x, p.y, diameter as f32 / 2.0, self.rgb, opacity);
    }
}

impl StrokeBrush for CircleBrush {
    fn kind(&self) -> BrushKind {
        BrushKind::Circle
    }

    fn begin(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        self.dab(layer, rng, p);
    }

    fn extend(&mut self, layer: &mut RgbaImage, rng: &mut fastrand::Rng, p: StrokePoint) {
        self.dab(layer, rng, p);
    }

    fn end(&mut self, _layer: &mut RgbaImage, _rng: &mut fastrand::Rng) {}
}
