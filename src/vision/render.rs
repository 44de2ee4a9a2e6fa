// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection overlay rendering

use ab_glyph::{FontRef, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::vision::detection::Detection;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: i32 = 2;

/// Per-class box colours, cycled by class id
const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

/// Box colour for a class
pub fn class_color(class_id: usize) -> [u8; 3] {
    PALETTE[class_id % PALETTE.len()]
}

/// Draws boxes and `"<label> <score>"` tags onto images
pub struct Renderer {
    font: FontRef<'static>,
    font_size: f32,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("font_size", &self.font_size)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let font =
            FontRef::try_from_slice(LABEL_FONT).context("Failed to load embedded label font")?;
        Ok(Self {
            font,
            font_size: LABEL_FONT_SIZE,
        })
    }

    /// Return a copy of `image` with every detection drawn on it
    pub fn render(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.clone();
        let line_width = line_width(canvas.width(), canvas.height());
        for det in detections {
            self.draw_detection(&mut canvas, det, line_width);
        }
        canvas
    }

    fn draw_detection(&self, image: &mut RgbImage, det: &Detection, line_width: u32) {
        let (w, h) = (image.width() as i32, image.height() as i32);

        let x_min = (det.x1.floor() as i32).clamp(0, w - 1);
        let y_min = (det.y1.floor() as i32).clamp(0, h - 1);
        let x_max = (det.x2.ceil() as i32).clamp(0, w - 1);
        let y_max = (det.y2.ceil() as i32).clamp(0, h - 1);

        if x_min >= x_max || y_min >= y_max {
            return;
        }

        let color = Rgb(class_color(det.class_id));

        for t in 0..line_width as i32 {
            let box_w = x_max - x_min + 1 - 2 * t;
            let box_h = y_max - y_min + 1 - 2 * t;
            if box_w <= 0 || box_h <= 0 {
                break;
            }
            let rect = Rect::at(x_min + t, y_min + t).of_size(box_w as u32, box_h as u32);
            draw_hollow_rect_mut(image, rect, color);
        }

        let label = format!("{} {:.2}", det.label, det.confidence);
        let scale = PxScale::from(self.font_size);
        let (text_w, text_h) = text_size(scale, &self.font, &label);

        let tag_w = (text_w as i32 + 2 * LABEL_PADDING).min(w - x_min);
        let tag_h = text_h as i32 + 2 * LABEL_PADDING;
        if tag_w <= 0 || tag_h <= 0 || tag_h > h {
            return;
        }

        // Above the box, or inside it when the box touches the top edge
        let tag_y = if y_min >= tag_h { y_min - tag_h } else { y_min };
        let tag = Rect::at(x_min, tag_y).of_size(tag_w as u32, tag_h as u32);
        draw_filled_rect_mut(image, tag, color);

        draw_text_mut(
            image,
            Rgb(text_color(color.0)),
            x_min + LABEL_PADDING,
            tag_y + LABEL_PADDING,
            scale,
            &self.font,
            &label,
        );
    }
}

/// Box outline width scaled to the canvas, never thinner than 2px
fn line_width(width: u32, height: u32) -> u32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as u32).max(2)
}

/// Black on light tags, white on dark ones
fn text_color(background: [u8; 3]) -> [u8; 3] {
    let luma = 0.299 * background[0] as f32
        + 0.587 * background[1] as f32
        + 0.114 * background[2] as f32;
    if luma > 150.0 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}
