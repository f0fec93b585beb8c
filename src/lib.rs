#![forbid(unsafe_code)]

pub mod batch;
pub mod composite;
pub mod discover;
pub mod error;
pub mod io;
pub mod mask;
pub mod model;
pub mod raster;

pub use batch::{BatchThreading, run_batch, run_batch_with_threading};
pub use composite::{BlendMode, Layer, composite};
pub use discover::discover_work_items;
pub use error::{EspStackError, EspStackResult};
pub use io::{FsRasterStore, RasterStore};
pub use mask::{SelectionMask, bake_alpha, dilate, select_white};
pub use model::{Outcome, OverlayPolicy, RunEntry, RunReport, WorkItem};
pub use raster::Raster;
