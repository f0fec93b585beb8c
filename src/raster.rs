use crate::error::{EspStackError, EspStackResult};

/// Owned RGBA8 raster, straight alpha, row-major.
///
/// Dimensions are fixed at construction; [`Raster::reconcile`] is the only
/// dimension-changing operation and it returns a new raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Fully transparent raster of the given size.
    pub fn new(width: u32, height: u32) -> EspStackResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    /// Wrap an existing rgba8 buffer. `data.len()` must equal `w*h*4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> EspStackResult<Self> {
        let len = checked_len(width, height)?;
        if data.len() != len {
            return Err(EspStackError::validation(format!(
                "raster buffer length {} does not match {}x{}x4",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Uniform fill, mostly useful for tests and synthetic bases.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> EspStackResult<Self> {
        let mut r = Self::new(width, height)?;
        for px in r.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Ok(r)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    /// Align this raster to a target canvas size, content anchored top-left.
    ///
    /// Growing pads with fully transparent pixels; shrinking crops. No
    /// scaling ever occurs. The anchor must stay top-left to match the
    /// snapshot tool that produced the base images.
    pub fn reconcile(&self, target_width: u32, target_height: u32) -> EspStackResult<Raster> {
        if target_width == self.width && target_height == self.height {
            return Ok(self.clone());
        }

        let mut out = Raster::new(target_width, target_height)?;
        let copy_w = self.width.min(target_width) as usize;
        let copy_h = self.height.min(target_height) as usize;

        for y in 0..copy_h {
            let src_start = y * (self.width as usize) * 4;
            let dst_start = y * (target_width as usize) * 4;
            out.data[dst_start..dst_start + copy_w * 4]
                .copy_from_slice(&self.data[src_start..src_start + copy_w * 4]);
        }
        Ok(out)
    }
}

fn checked_len(width: u32, height: u32) -> EspStackResult<usize> {
    if width == 0 || height == 0 {
        return Err(EspStackError::validation(
            "raster width/height must be > 0",
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| EspStackError::validation("raster buffer size overflow"))
}
