use std::path::Path;

use crate::error::{EspStackError, EspStackResult};
use crate::raster::Raster;

/// Boundary between the compositing core and on-disk images.
///
/// The batch orchestrator only ever talks to this trait, which keeps the
/// core testable against in-memory stores and keeps decode/encode concerns
/// out of the pixel code.
pub trait RasterStore: Send + Sync {
    /// Load a raster, converting whatever the source format is to RGBA8.
    fn load(&self, path: &Path) -> EspStackResult<Raster>;

    /// Write a raster losslessly; the alpha channel must round-trip exactly.
    fn save(&self, raster: &Raster, path: &Path) -> EspStackResult<()>;
}

/// Filesystem store backed by the `image` crate. Reads any format `image`
/// decodes (the batch inputs are BMP) and writes RGBA8 PNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsRasterStore;

impl RasterStore for FsRasterStore {
    fn load(&self, path: &Path) -> EspStackResult<Raster> {
        let dyn_img = image::open(path)
            .map_err(|e| EspStackError::load(format!("{}: {e}", path.display())))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Raster::from_raw(width, height, rgba.into_raw())
    }

    fn save(&self, raster: &Raster, path: &Path) -> EspStackResult<()> {
        image::save_buffer_with_format(
            path,
            raster.data(),
            raster.width(),
            raster.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| EspStackError::save(format!("{}: {e}", path.display())))
    }
}
