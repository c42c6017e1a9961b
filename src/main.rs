use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use scrollpages::host::{Stage, Surface};
use scrollpages::pdf::{DocumentHandle, MupdfEngine, Phase, Viewer};
use scrollpages::settings::{ViewerConfig, load_config};

/// Render every page of a PDF onto raster surfaces
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path or URL of the document
    locator: String,

    /// Id of the container pages are rendered into
    #[arg(long)]
    container: Option<String>,

    #[arg(long)]
    scale: Option<f32>,

    /// Extra rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<i32>,

    /// Device pixel ratio of the simulated display
    #[arg(long, default_value_t = 1.0)]
    density: f32,

    /// Class name applied to every surface
    #[arg(long = "class")]
    class_name: Option<String>,

    #[arg(long)]
    no_default_style: bool,

    /// Send URL credentials with remote requests
    #[arg(long)]
    with_credentials: bool,

    #[arg(long)]
    cmap_url: Option<String>,

    #[arg(long)]
    cmap_packed: bool,

    /// Worker endpoint; `{version}` expands to the engine version
    #[arg(long)]
    worker_src: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write page-NNN.png files into
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seconds to wait for rendering to finish
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    #[arg(long, default_value = "scrollpages.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

impl Args {
    /// Layer command-line overrides on top of the loaded configuration
    fn apply_to(&self, config: &mut ViewerConfig) {
        config.source = self.locator.clone();
        if let Some(container) = &self.container {
            config.container_id = container.clone();
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(rotate) = self.rotate {
            config.rotation = rotate;
        }
        if let Some(class_name) = &self.class_name {
            config.class_name = class_name.clone();
        }
        if self.no_default_style {
            config.use_default_style = false;
        }
        if self.with_credentials {
            config.with_credentials = true;
        }
        if let Some(cmap_url) = &self.cmap_url {
            config.cmap_url = Some(cmap_url.clone());
        }
        if self.cmap_packed {
            config.cmap_packed = true;
        }
        if let Some(worker_src) = &self.worker_src {
            config.worker_src = worker_src.clone();
        }
    }
}

#[derive(Debug, Default)]
struct Outcome {
    loaded: Option<(String, usize)>,
    failed: bool,
    invalid_location: bool,
}

fn main() -> Result<()> {
    better_panic::install();
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {:?}", args.log_file))?,
    )?;

    info!("Starting scrollpages");

    let mut config = load_config(args.config.as_deref())?;
    args.apply_to(&mut config);

    let mut stage = Stage::new(args.density);
    stage.add_container(&config.container_id);
    let container_id = config.container_id.clone();

    let outcome = Rc::new(RefCell::new(Outcome::default()));
    let mut viewer = Viewer::new(config, stage, MupdfEngine::new());

    let state = Rc::clone(&outcome);
    viewer.on_document_load_success(move |doc: &DocumentHandle| {
        state.borrow_mut().loaded = Some((doc.locator.clone(), doc.page_count));
    });
    let state = Rc::clone(&outcome);
    viewer.on_document_load_fail(move || state.borrow_mut().failed = true);
    let state = Rc::clone(&outcome);
    viewer.on_invalid_location(move || state.borrow_mut().invalid_location = true);

    if !viewer.wait_idle(Duration::from_secs(args.timeout)) {
        error!("Rendering did not finish within {}s", args.timeout);
        bail!("Rendering did not finish within {}s", args.timeout);
    }

    let outcome = outcome.borrow();
    if let Some((locator, page_count)) = &outcome.loaded {
        println!("document loaded: {locator} ({page_count} pages)");
    }
    if outcome.failed {
        println!("document load failed");
    }
    if outcome.invalid_location {
        println!("container `{container_id}` not found");
    }

    let surfaces = viewer.host().surfaces(&container_id);
    let drawn = surfaces.iter().filter(|s| s.drawn).count();
    println!(
        "rendered {drawn}/{} pages ({:?})",
        surfaces.len(),
        viewer.phase()
    );

    if let Some(out) = &args.out {
        write_surfaces(out, surfaces)?;
    }

    info!("Shutting down scrollpages");
    if matches!(viewer.phase(), Phase::Failed(_)) {
        std::process::exit(1);
    }
    Ok(())
}

fn write_surfaces(out: &Path, surfaces: &[Surface]) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {out:?}"))?;

    for (index, surface) in surfaces.iter().enumerate() {
        if !surface.drawn {
            continue;
        }
        let path = out.join(format!("page-{:03}.png", index + 1));
        image::save_buffer(
            &path,
            &surface.pixels,
            surface.width,
            surface.height,
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("Failed to write {path:?}"))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
