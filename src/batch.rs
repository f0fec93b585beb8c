use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::composite::{Layer, composite};
use crate::error::{EspStackError, EspStackResult};
use crate::io::RasterStore;
use crate::model::{OverlayPolicy, RunEntry, RunReport, WorkItem};
use crate::raster::Raster;

/// Cross-item threading configuration. Items are fully independent, so the
/// batch may fan out across a rayon pool; the steps within one item stay
/// sequential either way. Defaults to the reference behavior: one item at a
/// time, in input order.
#[derive(Clone, Debug, Default)]
pub struct BatchThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

/// Run the full batch sequentially. See [`run_batch_with_threading`].
pub fn run_batch(
    items: &[WorkItem],
    policy: &OverlayPolicy,
    store: &dyn RasterStore,
) -> EspStackResult<RunReport> {
    run_batch_with_threading(items, policy, store, &BatchThreading::default())
}

/// Composite every work item and collect a run report.
///
/// Fatal conditions are checked before any item runs: an empty item set,
/// an invalid policy, and unloadable legend assets (the legend is shared
/// across the batch, so it is loaded once here and reused). Everything
/// after that is per-item: a failing item is absorbed into a `FAIL` entry
/// and the batch moves on.
#[tracing::instrument(skip(items, store), fields(items = items.len()))]
pub fn run_batch_with_threading(
    items: &[WorkItem],
    policy: &OverlayPolicy,
    store: &dyn RasterStore,
    threading: &BatchThreading,
) -> EspStackResult<RunReport> {
    if items.is_empty() {
        return Err(EspStackError::empty_index_set(
            "no base/overlay pairs to process",
        ));
    }
    policy.validate()?;

    let legends = preload_legends(items, store)?;

    let entries: Vec<RunEntry> = if threading.parallel {
        let pool = build_thread_pool(threading.threads)?;
        pool.install(|| {
            items
                .par_iter()
                .map(|item| run_item(item, policy, &legends, store))
                .collect()
        })
    } else {
        items
            .iter()
            .map(|item| run_item(item, policy, &legends, store))
            .collect()
    };

    Ok(RunReport {
        entries,
        policy: *policy,
    })
}

/// Load each distinct legend path exactly once, before the first item. A
/// failure here is a missing precondition for the whole batch, not a
/// per-item outcome.
fn preload_legends(
    items: &[WorkItem],
    store: &dyn RasterStore,
) -> EspStackResult<BTreeMap<PathBuf, Raster>> {
    let mut legends = BTreeMap::new();
    for item in items {
        if legends.contains_key(&item.legend_path) {
            continue;
        }
        let legend = store.load(&item.legend_path).map_err(|e| {
            EspStackError::missing_required_asset(format!(
                "legend '{}': {e}",
                item.legend_path.display()
            ))
        })?;
        legends.insert(item.legend_path.clone(), legend);
    }
    Ok(legends)
}

fn run_item(
    item: &WorkItem,
    policy: &OverlayPolicy,
    legends: &BTreeMap<PathBuf, Raster>,
    store: &dyn RasterStore,
) -> RunEntry {
    match process_item(item, policy, legends, store) {
        Ok(()) => {
            info!(index = item.index, output = %item.output_path.display(), "composited");
            RunEntry::ok(item.index, item.output_path.clone())
        }
        Err(e) => {
            warn!(index = item.index, error = %e, "item failed");
            RunEntry::failed(item.index, e.to_string())
        }
    }
}

/// One item's pipeline: load base and bone, reconcile and policy the bone,
/// take the preloaded legend and do the same, stack bone then legend under
/// the policy's blend mode, flatten, save. The base raster is only ever
/// read.
fn process_item(
    item: &WorkItem,
    policy: &OverlayPolicy,
    legends: &BTreeMap<PathBuf, Raster>,
    store: &dyn RasterStore,
) -> EspStackResult<()> {
    let base = store.load(&item.base_path)?;

    let bone = store.load(&item.overlay_path)?;
    let bone = bone.reconcile(base.width(), base.height())?;
    let bone = policy.apply(&bone)?;

    let legend = legends.get(&item.legend_path).ok_or_else(|| {
        EspStackError::missing_required_asset(format!(
            "legend '{}' not preloaded",
            item.legend_path.display()
        ))
    })?;
    let legend = legend.reconcile(base.width(), base.height())?;
    let legend = policy.apply(&legend)?;

    let blend = policy.overlay_blend();
    let flattened = composite(
        &base,
        &[
            Layer {
                raster: bone,
                blend,
            },
            Layer {
                raster: legend,
                blend,
            },
        ],
    )?;

    store.save(&flattened, &item.output_path)
}

fn build_thread_pool(threads: Option<usize>) -> EspStackResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(EspStackError::validation(
            "batch threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        EspStackError::validation(format!("failed to build rayon thread pool: {e}"))
    })
}
