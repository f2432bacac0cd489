//! Color space conversions used by lights and color switches.
//!
//! Hue and saturation use the ZCL 0..=254 scale, XY chromaticity the ZCL
//! 0..=65535 scale.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Integer HSV to RGB conversion (six 43-step hue regions).
pub fn hsv_to_rgb(hsv: Hsv) -> Rgb {
    if hsv.s == 0 {
        return Rgb::new(hsv.v, hsv.v, hsv.v);
    }

    let h = hsv.h as u32;
    let s = hsv.s as u32;
    let v = hsv.v as u32;

    let region = h / 43;
    let remainder = (h - region * 43) * 6;
    let p = ((v * (255 - s)) >> 8) as u8;
    let q = ((v * (255 - ((s * remainder) >> 8))) >> 8) as u8;
    let t = ((v * (255 - ((s * (255 - remainder)) >> 8))) >> 8) as u8;
    let v = v as u8;

    match region {
        0 => Rgb::new(v, t, p),
        1 => Rgb::new(q, v, p),
        2 => Rgb::new(p, v, t),
        3 => Rgb::new(p, q, v),
        4 => Rgb::new(t, p, v),
        _ => Rgb::new(v, p, q),
    }
}

pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let min = rgb.r.min(rgb.g).min(rgb.b) as i32;
    let max = rgb.r.max(rgb.g).max(rgb.b) as i32;

    if max == 0 {
        return Hsv::default();
    }
    let s = 255 * (max - min) / max;
    if s == 0 {
        return Hsv {
            h: 0,
            s: 0,
            v: max as u8,
        };
    }

    let (r, g, b) = (rgb.r as i32, rgb.g as i32, rgb.b as i32);
    let span = max - min;
    let h = if max == r {
        43 * (g - b) / span
    } else if max == g {
        85 + 43 * (b - r) / span
    } else {
        171 + 43 * (r - g) / span
    };

    Hsv {
        h: h.rem_euclid(256) as u8,
        s: s as u8,
        v: max as u8,
    }
}

fn gamma_encode(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn gamma_decode(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert ZCL xy chromaticity plus a 0..=254 level to sRGB.
///
/// Linear components above 1.0 are normalised by the largest one so hue is
/// preserved at full brightness.
pub fn xy_to_rgb(level: u8, x: u16, y: u16) -> Rgb {
    if y == 0 {
        return Rgb::default();
    }
    let x = x as f32 / 65535.0;
    let y = y as f32 / 65535.0;
    let z = 1.0 - x - y;

    let big_y = level as f32 / 254.0;
    let big_x = (big_y / y) * x;
    let big_z = (big_y / y) * z;

    let mut r = big_x * 3.2406 - big_y * 1.5372 - big_z * 0.4986;
    let mut g = -big_x * 0.9689 + big_y * 1.8758 + big_z * 0.0415;
    let mut b = big_x * 0.0557 - big_y * 0.2040 + big_z * 1.0570;

    let peak = r.max(g).max(b);
    if peak > 1.0 {
        r /= peak;
        g /= peak;
        b /= peak;
    }

    let to_u8 = |c: f32| (gamma_encode(c).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb::new(to_u8(r), to_u8(g), to_u8(b))
}

/// Convert sRGB to ZCL xy chromaticity (D65).
pub fn rgb_to_xy(rgb: Rgb) -> (u16, u16) {
    let r = gamma_decode(rgb.r as f32 / 255.0);
    let g = gamma_decode(rgb.g as f32 / 255.0);
    let b = gamma_decode(rgb.b as f32 / 255.0);

    let big_x = r * 0.412_456_4 + g * 0.357_576_1 + b * 0.180_437_5;
    let big_y = r * 0.212_672_9 + g * 0.715_152_2 + b * 0.072_175;
    let big_z = r * 0.019_333_9 + g * 0.119_192 + b * 0.950_304_1;

    let sum = big_x + big_y + big_z;
    if sum <= f32::EPSILON {
        return (0, 0);
    }
    let x = big_x / sum;
    let y = big_y / sum;
    ((x * 65535.0) as u16, (y * 65535.0) as u16)
}
