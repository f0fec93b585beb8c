use std::fmt;
use std::path::PathBuf;

use crate::composite::BlendMode;
use crate::error::{EspStackError, EspStackResult};
use crate::mask::{bake_alpha, dilate, select_white};
use crate::raster::Raster;

/// How overlay rasters are treated before and during compositing.
///
/// One policy instance governs the bone overlay and the legend overlay
/// identically. That uniformity is a contract, not a convenience: the two
/// overlays must never diverge in handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OverlayPolicy {
    /// Blend overlays with Multiply so white backgrounds vanish visually.
    pub use_multiply_blend: bool,
    /// Permanently zero alpha where the white key selects.
    pub true_delete_white: bool,
    /// White-key tolerance, 0..=100. Keep small to avoid eating colored
    /// bar/text edges in the legend.
    pub white_fuzz: u8,
    /// Selection dilation radius in pixels. 0..=2 is the useful range;
    /// raise it if a thin white rim survives.
    pub expand_px: u32,
}

impl Default for OverlayPolicy {
    fn default() -> Self {
        Self {
            use_multiply_blend: true,
            true_delete_white: false,
            white_fuzz: 10,
            expand_px: 1,
        }
    }
}

impl OverlayPolicy {
    pub fn validate(&self) -> EspStackResult<()> {
        if self.white_fuzz > 100 {
            return Err(EspStackError::validation(
                "overlay policy white_fuzz must be in 0..=100",
            ));
        }
        Ok(())
    }

    /// Blend mode assigned to every overlay layer under this policy.
    pub fn overlay_blend(&self) -> BlendMode {
        if self.use_multiply_blend {
            BlendMode::Multiply
        } else {
            BlendMode::Normal
        }
    }

    /// Apply the pre-composite half of the policy to one overlay raster:
    /// key white, dilate, bake to alpha. A no-op unless `true_delete_white`
    /// is set.
    pub fn apply(&self, overlay: &Raster) -> EspStackResult<Raster> {
        if !self.true_delete_white {
            return Ok(overlay.clone());
        }
        let mask = dilate(&select_white(overlay, self.white_fuzz)?, self.expand_px);
        bake_alpha(overlay, &mask)
    }
}

/// One index's full set of file associations for a batch run.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WorkItem {
    pub index: u32,
    pub base_path: PathBuf,
    pub overlay_path: PathBuf,
    pub legend_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Ok { output: PathBuf },
    Failed { message: String },
}

/// Per-index result record. `index` is explicit so the mapping survives any
/// processing order.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunEntry {
    pub index: u32,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl RunEntry {
    pub fn ok(index: u32, output: PathBuf) -> Self {
        Self {
            index,
            outcome: Outcome::Ok { output },
        }
    }

    pub fn failed(index: u32, message: impl Into<String>) -> Self {
        Self {
            index,
            outcome: Outcome::Failed {
                message: message.into(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok { .. })
    }
}

impl fmt::Display for RunEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Ok { output } => {
                write!(f, "OK   i={} -> {}", self.index, output.display())
            }
            Outcome::Failed { message } => {
                write!(f, "FAIL i={} : {}", self.index, message)
            }
        }
    }
}

/// Append-only record of one batch run: one entry per index plus the active
/// configuration, rendered as a trailer.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunReport {
    pub entries: Vec<RunEntry>,
    pub policy: OverlayPolicy,
}

impl RunReport {
    pub fn ok_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ok()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.entries.len() - self.ok_count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f)?;
        writeln!(f, "overlay handling (bone & legend):")?;
        write!(
            f,
            "- multiply={}, true_delete_white={}, fuzz={}, expand_px={}",
            self.policy.use_multiply_blend,
            self.policy.true_delete_white,
            self.policy.white_fuzz,
            self.policy.expand_px
        )
    }
}
