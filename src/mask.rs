use crate::error::{EspStackError, EspStackResult};
use crate::raster::Raster;

/// Per-pixel selection strength in [0,1], derived from (and dimensioned
/// like) a specific raster. 0 = excluded, 1 = fully selected.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl SelectionMask {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn strength(&self, x: u32, y: u32) -> f32 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Sum of all strengths. Monotone under growing fuzz or dilation radius,
    /// which is what the coverage properties check.
    pub fn coverage(&self) -> f64 {
        self.data.iter().map(|&s| f64::from(s)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&s| s == 0.0)
    }
}

/// Select pixels by distance from pure white.
///
/// Deviation is the maximum per-channel distance from (255,255,255).
/// Strength is 1 within `fuzz`, falls off linearly to 0 across
/// (`fuzz`, `2*fuzz`], and is 0 beyond. `fuzz = 0` selects exact white only.
/// Fully transparent pixels are never selected. An all-zero mask is a valid
/// result, not an error.
pub fn select_white(raster: &Raster, fuzz: u8) -> EspStackResult<SelectionMask> {
    if fuzz > 100 {
        return Err(EspStackError::validation(
            "white fuzz must be in 0..=100",
        ));
    }

    let mut mask = SelectionMask::zeroed(raster.width(), raster.height());
    let fuzz = f32::from(fuzz);

    for (px, s) in raster.data().chunks_exact(4).zip(mask.data.iter_mut()) {
        if px[3] == 0 {
            continue;
        }
        let dev = px[..3]
            .iter()
            .map(|&c| 255 - u16::from(c))
            .max()
            .unwrap_or(0) as f32;

        *s = if dev <= fuzz {
            1.0
        } else if fuzz > 0.0 && dev <= 2.0 * fuzz {
            (2.0 * fuzz - dev) / fuzz
        } else {
            0.0
        };
    }
    Ok(mask)
}

/// Grow a mask by `radius` pixels under the Chebyshev (square) metric.
///
/// Each output strength is the maximum over the (2r+1)x(2r+1) window. The
/// square window max is separable, so this runs as a horizontal pass
/// followed by a vertical pass. Radius 0 is the identity.
pub fn dilate(mask: &SelectionMask, radius: u32) -> SelectionMask {
    if radius == 0 {
        return mask.clone();
    }

    let w = mask.width as usize;
    let h = mask.height as usize;
    let r = radius as usize;

    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &mask.data[y * w..(y + 1) * w];
        for x in 0..w {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(w - 1);
            let mut m = 0.0f32;
            for &s in &row[lo..=hi] {
                m = m.max(s);
            }
            tmp[y * w + x] = m;
        }
    }

    let mut out = SelectionMask::zeroed(mask.width, mask.height);
    for y in 0..h {
        let lo = y.saturating_sub(r);
        let hi = (y + r).min(h - 1);
        for x in 0..w {
            let mut m = 0.0f32;
            for yy in lo..=hi {
                m = m.max(tmp[yy * w + x]);
            }
            out.data[y * w + x] = m;
        }
    }
    out
}

/// Permanently commit a selection into a raster's alpha channel.
///
/// Output alpha = input alpha * (1 - strength). RGB stays untouched even
/// where alpha drops to 0, so color under transparency survives a later
/// re-key. The suppression itself is irreversible.
pub fn bake_alpha(raster: &Raster, mask: &SelectionMask) -> EspStackResult<Raster> {
    if mask.width != raster.width() || mask.height != raster.height() {
        return Err(EspStackError::dimension_mismatch(
            (raster.width(), raster.height()),
            (mask.width, mask.height),
        ));
    }

    let mut data = raster.data().to_vec();
    for (px, &s) in data.chunks_exact_mut(4).zip(mask.data.iter()) {
        let keep = (1.0 - s.clamp(0.0, 1.0)) * f32::from(px[3]);
        px[3] = keep.round() as u8;
    }
    Raster::from_raw(raster.width(), raster.height(), data)
}
