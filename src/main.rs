use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use tracing::info;

use divide::config::Params;
use divide::divide::{Mode, Step};
use divide::{ContinentMap, Summary, render};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Run {
    Up,
    Down,
    /// Classify both ways and check they agree.
    Both,
}

#[derive(Parser, Debug)]
#[command(version, about = "Generate terrain and classify its continental divide")]
struct Cli {
    /// Random seed; omit for a fresh map each run.
    #[arg(long)]
    seed: Option<u64>,
    /// Side length is 2^detail + 1.
    #[arg(long, default_value_t = 6)]
    detail: u32,
    /// Use the fixed 5x5 illustrative map instead of generating one.
    #[arg(long)]
    illustrative: bool,
    #[arg(long, value_enum, default_value_t = Run::Both)]
    mode: Run,
    /// Stop after this many single steps instead of running to completion.
    #[arg(long)]
    steps: Option<usize>,
    /// Pixels per cell in the written images.
    #[arg(long, default_value_t = 4)]
    scale: usize,
    #[arg(long, default_value = "artifacts")]
    out: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out)
        .wrap_err_with(|| format!("failed to create {}", cli.out.display()))?;

    if let (Run::Both, None, false) = (cli.mode, cli.steps, cli.illustrative) {
        return run_both(&cli);
    }

    let mut map = if cli.illustrative {
        ContinentMap::illustrative()
    } else {
        ContinentMap::new(Params {
            seed: cli.seed,
            detail: cli.detail,
            ..Params::default()
        })?
    };
    info!(seed = map.seed(), size = map.size(), "map ready");

    let modes: &[Mode] = match cli.mode {
        Run::Up => &[Mode::Uphill],
        Run::Down => &[Mode::Downhill],
        Run::Both => &[Mode::Uphill, Mode::Downhill],
    };
    for &mode in modes {
        match cli.steps {
            Some(n) => {
                map.reset_flow();
                for _ in 0..n {
                    if map.run(mode, true)? == Step::Finished {
                        break;
                    }
                }
            }
            None => {
                map.run(mode, false)?;
            }
        }
        print_summary(mode, &map.summary());
    }

    save_layers(&map, &cli.out, cli.scale)
}

fn run_both(cli: &Cli) -> Result<()> {
    let params = Params {
        seed: cli.seed,
        detail: cli.detail,
        ..Params::default()
    };
    let (analysis, timings) = divide::analyze(&params)?;

    eprintln!(
        "Map {0}x{0}, seed={1}",
        analysis.map.size(),
        analysis.map.seed()
    );
    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }
    print_summary(Mode::Uphill, &analysis.uphill);
    print_summary(Mode::Downhill, &analysis.downhill);

    save_layers(&analysis.map, &cli.out, cli.scale)?;
    if analysis.mismatches > 0 {
        bail!("uphill and downhill disagree on {} cells", analysis.mismatches);
    }
    Ok(())
}

fn print_summary(mode: Mode, s: &Summary) {
    eprintln!(
        "{:?}: nw={} se={} divide={} basin={} unvisited={}",
        mode, s.north_west, s.south_east, s.divide, s.basin, s.unvisited
    );
}

fn save_layers(map: &ContinentMap, out: &Path, scale: usize) -> Result<()> {
    let side = map.size() * scale.max(1);
    let layers = [
        ("heightmap.png", render::render_heightmap(map.grid(), scale)),
        ("divide.png", render::render_divide(map.grid(), scale)),
    ];
    for (name, rgba) in layers {
        let path = out.join(name);
        image::save_buffer(&path, &rgba, side as u32, side as u32, image::ColorType::Rgba8)
            .wrap_err_with(|| format!("failed to save {}", path.display()))?;
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}
