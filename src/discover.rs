use std::path::Path;

use anyhow::Context as _;

use crate::error::{EspStackError, EspStackResult};
use crate::model::WorkItem;

pub const BASE_PREFIX: &str = "vtx";
pub const OVERLAY_PREFIX: &str = "bone";
pub const LEGEND_FILE: &str = "minmax.bmp";
pub const INPUT_EXT: &str = ".bmp";
pub const OUTPUT_PREFIX: &str = "ESP";

/// Scan `in_dir` for `bone{i}.bmp` files with a matching `vtx{i}.bmp` and
/// build one [`WorkItem`] per index, ascending. Outputs go to
/// `out_dir/ESP{i}.png`.
///
/// The shared legend (`minmax.bmp`) is a precondition for the whole batch:
/// its absence is `MissingRequiredAsset` here, before any item exists.
/// Callers with a different naming scheme can skip this and build
/// `WorkItem`s directly.
pub fn discover_work_items(in_dir: &Path, out_dir: &Path) -> EspStackResult<Vec<WorkItem>> {
    let legend_path = in_dir.join(LEGEND_FILE);
    if !legend_path.is_file() {
        return Err(EspStackError::missing_required_asset(format!(
            "{} not found in {}",
            LEGEND_FILE,
            in_dir.display()
        )));
    }

    let mut indices = Vec::new();
    let entries = std::fs::read_dir(in_dir)
        .with_context(|| format!("read input dir '{}'", in_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read input dir '{}'", in_dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(index) = parse_index(name, OVERLAY_PREFIX) else {
            continue;
        };
        if in_dir
            .join(format!("{BASE_PREFIX}{index}{INPUT_EXT}"))
            .is_file()
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    indices.dedup();

    Ok(indices
        .into_iter()
        .map(|index| WorkItem {
            index,
            base_path: in_dir.join(format!("{BASE_PREFIX}{index}{INPUT_EXT}")),
            overlay_path: in_dir.join(format!("{OVERLAY_PREFIX}{index}{INPUT_EXT}")),
            legend_path: legend_path.clone(),
            output_path: out_dir.join(format!("{OUTPUT_PREFIX}{index}.png")),
        })
        .collect())
}

/// Parse `"{prefix}{digits}.bmp"` (ASCII case-insensitive) into the index.
fn parse_index(name: &str, prefix: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let digits = lower.strip_prefix(prefix)?.strip_suffix(INPUT_EXT)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
