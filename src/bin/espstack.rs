use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use espstack::{BatchThreading, OverlayPolicy, discover_work_items, run_batch_with_threading};

/// Composite vtx{i}.bmp + bone{i}.bmp + minmax.bmp into ESP{i}.png.
#[derive(Parser, Debug)]
#[command(name = "espstack", version)]
struct Cli {
    /// Input directory containing vtx*.bmp, bone*.bmp and minmax.bmp.
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Output directory for ESP*.png (defaults to the input directory).
    #[arg(long = "out")]
    out_dir: Option<PathBuf>,

    /// Blend overlays with Normal instead of Multiply.
    #[arg(long)]
    no_multiply: bool,

    /// Permanently delete white overlay backgrounds instead of relying on
    /// the blend mode.
    #[arg(long)]
    delete_white: bool,

    /// White-key tolerance (0..=100). Keep small to avoid touching colored
    /// bar/text edges.
    #[arg(long, default_value_t = 10)]
    fuzz: u8,

    /// Grow the white selection by this many pixels. Increase if a thin
    /// white rim remains.
    #[arg(long, default_value_t = 1)]
    expand: u32,

    /// Process items in parallel.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count when --parallel is set (default: rayon's choice).
    #[arg(long)]
    threads: Option<usize>,

    /// Also write the run report as JSON records to this path.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let out_dir = cli.out_dir.clone().unwrap_or_else(|| cli.in_dir.clone());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir '{}'", out_dir.display()))?;

    let policy = OverlayPolicy {
        use_multiply_blend: !cli.no_multiply,
        true_delete_white: cli.delete_white,
        white_fuzz: cli.fuzz,
        expand_px: cli.expand,
    };
    let threading = BatchThreading {
        parallel: cli.parallel,
        threads: cli.threads,
    };

    let items = discover_work_items(&cli.in_dir, &out_dir)?;
    let report = run_batch_with_threading(&items, &policy, &espstack::FsRasterStore, &threading)?;

    println!("{report}");

    if let Some(path) = &cli.report_json {
        let f = std::fs::File::create(path)
            .with_context(|| format!("create report '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, &report).with_context(|| "write report JSON")?;
        eprintln!("wrote {}", path.display());
    }

    if report.fail_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
