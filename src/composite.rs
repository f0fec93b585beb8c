use crate::error::{EspStackError, EspStackResult};
use crate::raster::Raster;

/// How a layer combines with the accumulated result beneath it.
///
/// `Multiply` is the mechanism that makes a white overlay background
/// visually disappear without touching alpha: a (255,255,255) source pixel
/// is an exact no-op against any destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    Normal,
    Multiply,
}

/// One overlay in a composite stack. Ephemeral: built per work item,
/// consumed by [`composite`], discarded after flattening.
#[derive(Clone, Debug)]
pub struct Layer {
    pub raster: Raster,
    pub blend: BlendMode,
}

pub type Rgba8 = [u8; 4];

/// Source-over for straight-stored RGBA8 with the accumulation convention
/// used here: `outC = srcC*srcA + dstC*(1-srcA)`, `outA = srcA + dstA*(1-srcA)`.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(src[3], mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), sa);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Multiply-then-over: the source color is first multiplied against the
/// destination color, then composited with [`over`] under the source alpha.
pub fn multiply_over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let blended = [
        mul_div255(u16::from(src[0]), u16::from(dst[0])),
        mul_div255(u16::from(src[1]), u16::from(dst[1])),
        mul_div255(u16::from(src[2]), u16::from(dst[2])),
        src[3],
    ];
    over(dst, blended)
}

/// Flatten an ordered layer stack over a base raster.
///
/// All layers must match the base dimensions exactly; mismatches are an
/// upstream reconciliation defect and surface as `DimensionMismatch`.
/// Inputs are untouched. The canvas beneath the base is treated as fully
/// transparent black, so an empty stack returns the base unchanged.
pub fn composite(base: &Raster, layers: &[Layer]) -> EspStackResult<Raster> {
    for layer in layers {
        if layer.raster.width() != base.width() || layer.raster.height() != base.height() {
            return Err(EspStackError::dimension_mismatch(
                (base.width(), base.height()),
                (layer.raster.width(), layer.raster.height()),
            ));
        }
    }

    let mut acc = base.data().to_vec();
    for layer in layers {
        for (d, s) in acc.chunks_exact_mut(4).zip(layer.raster.data().chunks_exact(4)) {
            let dst = [d[0], d[1], d[2], d[3]];
            let src = [s[0], s[1], s[2], s[3]];
            let out = match layer.blend {
                BlendMode::Normal => over(dst, src),
                BlendMode::Multiply => multiply_over(dst, src),
            };
            d.copy_from_slice(&out);
        }
    }
    Raster::from_raw(base.width(), base.height(), acc)
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn over_dst_transparent_returns_src() {
        let dst = [0, 0, 0, 0];
        let src = [100, 110, 120, 255];
        assert_eq!(over(dst, src), src);
    }

    #[test]
    fn multiply_opaque_white_is_exact_noop_on_opaque_dst() {
        for dst in [[13, 77, 201, 255], [0, 0, 0, 255], [255, 128, 1, 255]] {
            assert_eq!(multiply_over(dst, [255, 255, 255, 255]), dst);
        }
    }

    #[test]
    fn multiply_opaque_white_keeps_rgb_and_fills_alpha_on_partial_dst() {
        // an opaque source always drives out alpha to 255; only RGB is the no-op
        let out = multiply_over([255, 128, 1, 200], [255, 255, 255, 255]);
        assert_eq!(out, [255, 128, 1, 255]);
    }

    #[test]
    fn multiply_opaque_black_yields_black_at_full_alpha() {
        let out = multiply_over([90, 150, 210, 255], [0, 0, 0, 255]);
        assert_eq!(out, [0, 0, 0, 255]);
    }

    #[test]
    fn multiply_disjoint_channels_go_dark() {
        // pure red under pure blue shares no channel
        let out = multiply_over([255, 0, 0, 255], [0, 0, 255, 255]);
        assert_eq!(out, [0, 0, 0, 255]);
    }

    #[test]
    fn composite_empty_stack_is_base() {
        let base = Raster::filled(4, 3, [12, 34, 56, 180]).unwrap();
        let out = composite(&base, &[]).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn composite_does_not_mutate_inputs() {
        let base = Raster::filled(2, 2, [200, 0, 0, 255]).unwrap();
        let overlay = Raster::filled(2, 2, [0, 0, 200, 255]).unwrap();
        let before = overlay.clone();

        let _ = composite(
            &base,
            &[Layer {
                raster: overlay.clone(),
                blend: BlendMode::Normal,
            }],
        )
        .unwrap();
        assert_eq!(overlay, before);
        assert_eq!(base.pixel(0, 0), [200, 0, 0, 255]);
    }

    #[test]
    fn composite_applies_layers_in_order() {
        let base = Raster::filled(1, 1, [0, 0, 0, 255]).unwrap();
        let red = Raster::filled(1, 1, [255, 0, 0, 255]).unwrap();
        let green = Raster::filled(1, 1, [0, 255, 0, 255]).unwrap();

        let out = composite(
            &base,
            &[
                Layer {
                    raster: red,
                    blend: BlendMode::Normal,
                },
                Layer {
                    raster: green,
                    blend: BlendMode::Normal,
                },
            ],
        )
        .unwrap();
        assert_eq!(out.pixel(0, 0), [0, 255, 0, 255]);
    }

    #[test]
    fn composite_rejects_mismatched_layer() {
        let base = Raster::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let overlay = Raster::filled(3, 4, [0, 0, 0, 255]).unwrap();
        let err = composite(
            &base,
            &[Layer {
                raster: overlay,
                blend: BlendMode::Normal,
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[test]
    fn transparent_overlay_pixels_leave_base_visible() {
        let base = Raster::filled(1, 1, [200, 10, 10, 255]).unwrap();
        let overlay = Raster::filled(1, 1, [255, 255, 255, 0]).unwrap();
        for blend in [BlendMode::Normal, BlendMode::Multiply] {
            let out = composite(
                &base,
                &[Layer {
                    raster: overlay.clone(),
                    blend,
                }],
            )
            .unwrap();
            assert_eq!(out.pixel(0, 0), [200, 10, 10, 255]);
        }
    }
}
