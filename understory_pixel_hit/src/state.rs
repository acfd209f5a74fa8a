// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing-context state: colours, line and text settings.
//!
//! [`DrawState`] holds every writable property of a 2D context that influences
//! rendering. It is snapshotted for each shape, copied onto the shadow surface
//! before a mirrored call, and edited through [`StateKey`] / [`StateValue`] pairs.

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Straight (unpremultiplied) RGBA8 colour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel; 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Opaque green, as the CSS keyword.
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    /// Opaque colour from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Colour from channels including alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, or one of a few CSS keywords.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidColor(text.to_owned());
        let trimmed = text.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            "red" => return Ok(Self::RED),
            "green" => return Ok(Self::GREEN),
            "blue" => return Ok(Self::BLUE),
            "transparent" => return Ok(Self::TRANSPARENT),
            _ => {}
        }
        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        let digit = |i: usize| {
            hex.get(i..i + 1)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(invalid)
        };
        let pair = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(invalid)
        };
        match hex.len() {
            3 => Ok(Self::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Ok(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Ok(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => Err(invalid()),
        }
    }
}

/// Shape drawn at the ends of stroked lines.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineCap {
    /// Flat end at the endpoint.
    #[default]
    Butt,
    /// Half-disc past the endpoint.
    Round,
    /// Half-square past the endpoint.
    Square,
}

/// Shape drawn where stroked segments meet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineJoin {
    /// Sharp corner, limited by the miter limit.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Cut-off corner.
    Bevel,
}

/// Horizontal anchoring of text relative to the drawing position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Start edge (left for left-to-right text).
    #[default]
    Start,
    /// End edge (right for left-to-right text).
    End,
    /// Left edge.
    Left,
    /// Right edge.
    Right,
    /// Horizontal centre.
    Center,
}

/// Vertical anchoring of text relative to the drawing position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    /// Alphabetic baseline.
    #[default]
    Alphabetic,
    /// Top of the em box.
    Top,
    /// Middle of the em box.
    Middle,
    /// Bottom of the em box.
    Bottom,
    /// Hanging baseline, treated as the top.
    Hanging,
    /// Ideographic baseline, treated as the bottom.
    Ideographic,
}

/// Snapshot of every writable, rendering-relevant context property.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    /// Colour used by fill operations.
    pub fill_style: Color,
    /// Colour used by stroke operations.
    pub stroke_style: Color,
    /// Opacity multiplier in `0.0..=1.0`.
    pub global_alpha: f32,
    /// Stroke width in pixels.
    pub line_width: f64,
    /// End caps for strokes.
    pub line_cap: LineCap,
    /// Joins for strokes.
    pub line_join: LineJoin,
    /// Miter length ratio beyond which joins are beveled.
    pub miter_limit: f64,
    /// CSS font shorthand, e.g. `16px sans-serif`.
    pub font: String,
    /// Horizontal text anchoring.
    pub text_align: TextAlign,
    /// Vertical text anchoring.
    pub text_baseline: TextBaseline,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill_style: Color::BLACK,
            stroke_style: Color::BLACK,
            global_alpha: 1.0,
            line_width: 1.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: 10.0,
            font: "10px sans-serif".to_owned(),
            text_align: TextAlign::default(),
            text_baseline: TextBaseline::default(),
        }
    }
}

impl DrawState {
    /// Read one property.
    pub fn get(&self, key: StateKey) -> StateValue {
        match key {
            StateKey::FillStyle => StateValue::FillStyle(self.fill_style),
            StateKey::StrokeStyle => StateValue::StrokeStyle(self.stroke_style),
            StateKey::GlobalAlpha => StateValue::GlobalAlpha(self.global_alpha),
            StateKey::LineWidth => StateValue::LineWidth(self.line_width),
            StateKey::LineCap => StateValue::LineCap(self.line_cap),
            StateKey::LineJoin => StateValue::LineJoin(self.line_join),
            StateKey::MiterLimit => StateValue::MiterLimit(self.miter_limit),
            StateKey::Font => StateValue::Font(self.font.clone()),
            StateKey::TextAlign => StateValue::TextAlign(self.text_align),
            StateKey::TextBaseline => StateValue::TextBaseline(self.text_baseline),
        }
    }

    /// Write one property.
    pub fn set(&mut self, value: StateValue) {
        match value {
            StateValue::FillStyle(c) => self.fill_style = c,
            StateValue::StrokeStyle(c) => self.stroke_style = c,
            StateValue::GlobalAlpha(a) => self.global_alpha = a.clamp(0.0, 1.0),
            StateValue::LineWidth(w) => self.line_width = w,
            StateValue::LineCap(c) => self.line_cap = c,
            StateValue::LineJoin(j) => self.line_join = j,
            StateValue::MiterLimit(m) => self.miter_limit = m,
            StateValue::Font(font) => self.font = font,
            StateValue::TextAlign(a) => self.text_align = a,
            StateValue::TextBaseline(b) => self.text_baseline = b,
        }
    }

    /// Pixel size of [`DrawState::font`]; 10 when no `px` size is present.
    pub fn font_px(&self) -> f64 {
        self.font
            .split_whitespace()
            .find_map(|token| token.strip_suffix("px")?.parse::<f64>().ok())
            .filter(|px| *px > 0.0)
            .unwrap_or(10.0)
    }
}

/// Names of the writable properties in [`DrawState`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// `fillStyle`
    FillStyle,
    /// `strokeStyle`
    StrokeStyle,
    /// `globalAlpha`
    GlobalAlpha,
    /// `lineWidth`
    LineWidth,
    /// `lineCap`
    LineCap,
    /// `lineJoin`
    LineJoin,
    /// `miterLimit`
    MiterLimit,
    /// `font`
    Font,
    /// `textAlign`
    TextAlign,
    /// `textBaseline`
    TextBaseline,
}

impl StateKey {
    /// Every writable key, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::FillStyle,
        Self::StrokeStyle,
        Self::GlobalAlpha,
        Self::LineWidth,
        Self::LineCap,
        Self::LineJoin,
        Self::MiterLimit,
        Self::Font,
        Self::TextAlign,
        Self::TextBaseline,
    ];

    /// Host property name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::FillStyle => "fillStyle",
            Self::StrokeStyle => "strokeStyle",
            Self::GlobalAlpha => "globalAlpha",
            Self::LineWidth => "lineWidth",
            Self::LineCap => "lineCap",
            Self::LineJoin => "lineJoin",
            Self::MiterLimit => "miterLimit",
            Self::Font => "font",
            Self::TextAlign => "textAlign",
            Self::TextBaseline => "textBaseline",
        }
    }
}

impl FromStr for StateKey {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == name)
            .ok_or_else(|| Error::UnknownStateKey(name.to_owned()))
    }
}

/// A typed value for one [`StateKey`].
#[derive(Clone, Debug, PartialEq)]
pub enum StateValue {
    /// `fillStyle`
    FillStyle(Color),
    /// `strokeStyle`
    StrokeStyle(Color),
    /// `globalAlpha`
    GlobalAlpha(f32),
    /// `lineWidth`
    LineWidth(f64),
    /// `lineCap`
    LineCap(LineCap),
    /// `lineJoin`
    LineJoin(LineJoin),
    /// `miterLimit`
    MiterLimit(f64),
    /// `font`
    Font(String),
    /// `textAlign`
    TextAlign(TextAlign),
    /// `textBaseline`
    TextBaseline(TextBaseline),
}

impl StateValue {
    /// The key this value belongs to.
    pub fn key(&self) -> StateKey {
        match self {
            Self::FillStyle(_) => StateKey::FillStyle,
            Self::StrokeStyle(_) => StateKey::StrokeStyle,
            Self::GlobalAlpha(_) => StateKey::GlobalAlpha,
            Self::LineWidth(_) => StateKey::LineWidth,
            Self::LineCap(_) => StateKey::LineCap,
            Self::LineJoin(_) => StateKey::LineJoin,
            Self::MiterLimit(_) => StateKey::MiterLimit,
            Self::Font(_) => StateKey::Font,
            Self::TextAlign(_) => StateKey::TextAlign,
            Self::TextBaseline(_) => StateKey::TextBaseline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colors() {
        assert_eq!("#ff0000".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("#0f0".parse::<Color>().unwrap(), Color::rgb(0, 255, 0));
        assert_eq!("green".parse::<Color>().unwrap(), Color::GREEN);
        assert_eq!(
            "#00000080".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 0, 128)
        );
        assert!(matches!(
            "#12345".parse::<Color>(),
            Err(Error::InvalidColor(_))
        ));
        assert!("rgb(1, 2, 3)".parse::<Color>().is_err());
    }

    #[test]
    fn get_set_round_trip_every_key() {
        let mut state = DrawState::default();
        state.set(StateValue::FillStyle(Color::GREEN));
        state.set(StateValue::LineWidth(4.0));
        state.set(StateValue::Font("bold 24px serif".into()));
        assert_eq!(state.get(StateKey::FillStyle), StateValue::FillStyle(Color::GREEN));
        assert_eq!(state.get(StateKey::LineWidth), StateValue::LineWidth(4.0));
        assert_eq!(state.font_px(), 24.0);
        for key in StateKey::ALL {
            assert_eq!(state.get(key).key(), key);
        }
    }

    #[test]
    fn global_alpha_is_clamped() {
        let mut state = DrawState::default();
        state.set(StateValue::GlobalAlpha(3.0));
        assert_eq!(state.global_alpha, 1.0);
    }

    #[test]
    fn state_keys_by_host_name() {
        assert_eq!("fillStyle".parse::<StateKey>().unwrap(), StateKey::FillStyle);
        assert_eq!(
            "fill".parse::<StateKey>(),
            Err(Error::UnknownStateKey("fill".into()))
        );
    }

    #[test]
    fn font_size_defaults_when_missing() {
        let state = DrawState {
            font: "serif".into(),
            ..DrawState::default()
        };
        assert_eq!(state.font_px(), 10.0);
    }
}
