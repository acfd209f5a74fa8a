// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw pixel blocks for `drawImage` and `putImageData`.

use alloc::vec;
use alloc::vec::Vec;

use crate::state::Color;

/// A block of straight RGBA8 pixels, row-major, four bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageData {
    /// A fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// An image filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let mut image = Self::new(width, height);
        for px in image.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        image
    }

    /// Wrap existing RGBA bytes; `None` when the length does not match the size.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Colour at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[i..i + 4];
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }

    /// Overwrite the colour at `(x, y)`; ignored outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Same footprint painted in one opaque colour.
    ///
    /// Every pixel with non-zero alpha becomes `color`; the rest stay transparent.
    pub fn silhouette(&self, color: Color) -> Self {
        let mut out = Self::new(self.width, self.height);
        for (src, dst) in self.data.chunks_exact(4).zip(out.data.chunks_exact_mut(4)) {
            if src[3] != 0 {
                dst.copy_from_slice(&[color.r, color.g, color.b, 255]);
            }
        }
        out
    }
}
