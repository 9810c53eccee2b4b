//! Command-line front end: annotates every image given as an argument.
//!
//! Usage: `poseview <image>...`

use std::{
    env::{self, VarError},
    path::PathBuf,
};

use poseview::{status, Device, Engine, ModelMode, Pipeline};

fn main() -> anyhow::Result<()> {
    poseview::init_logger!();

    let mode = model_mode();
    let device = Device::Cpu;
    log::info!("pose engine mode: {mode}, device: {device}");

    // Without a model, nothing else can work. Bail out before looking at any input.
    let engine = Engine::initialize(mode, device)?;
    let mut pipeline = Pipeline::new(engine);
    println!("{}", status::READY);

    let paths = env::args_os().skip(1).map(PathBuf::from).collect::<Vec<_>>();
    if paths.is_empty() {
        log::warn!("no images given; usage: poseview <image>...");
    }

    let mut failures = 0;
    for path in &paths {
        println!("{}", status::loaded(path));
        println!("{}", status::PROCESSING);
        match pipeline.load_and_process(path) {
            Ok(processed) => {
                println!(
                    "original: {:?}, annotated: {:?}",
                    processed.original, processed.annotated
                );
                println!("{}", status::DONE);
            }
            Err(e) => {
                println!("{}", e.status_message());
                log::error!("{}: {:#}", path.display(), anyhow::Error::from(e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} images could not be processed", paths.len());
    }
    Ok(())
}

fn model_mode() -> ModelMode {
    match env::var("POSEVIEW_MODE") {
        Ok(s) => s.parse().unwrap_or_else(|e| {
            log::warn!("{e}; using {}", ModelMode::default());
            ModelMode::default()
        }),
        Err(VarError::NotPresent) => ModelMode::default(),
        Err(VarError::NotUnicode(s)) => {
            log::warn!(
                "invalid value set for `POSEVIEW_MODE` variable: {}; using {}",
                s.to_string_lossy(),
                ModelMode::default()
            );
            ModelMode::default()
        }
    }
}
