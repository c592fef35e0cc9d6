use std::{thread, time::Duration};

use clap::Parser;
use drm_fourcc::DrmFourcc;
use kms_pipeline::{
    backend::{drm::GraphOptions, egl::NativeEgl},
    pipeline::{Negotiation, NegotiationConfig},
};
use tracing::{error, info};

/// Negotiate EGL device support and light up the first connected output
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Make the kernel probe connectors again
    #[arg(long)]
    force_probe: bool,
    /// Keep the crtc the connector is currently driven by, if possible
    #[arg(long)]
    prefer_current_crtc: bool,
    /// Skip the test-only commit before the real one
    #[arg(long)]
    no_test_commit: bool,
    /// Format of the initial framebuffer
    #[arg(short, long, default_value = "Xrgb8888", value_parser = fourcc_from_string)]
    fourcc: DrmFourcc,
    /// Color the framebuffer is cleared to, as `r,g,b`
    #[arg(short, long, value_parser = color_from_string)]
    color: Option<[u8; 4]>,
    /// Seconds to keep the output up before exiting
    #[arg(short, long, default_value_t = 5)]
    seconds: u64,
}

fn main() {
    let args = Cli::parse();

    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().init();
    }

    let egl = match NativeEgl::load() {
        Ok(egl) => egl,
        Err(err) => {
            error!("Failed to load libEGL: {}", err);
            std::process::exit(1);
        }
    };

    let config = NegotiationConfig {
        framebuffer_format: args.fourcc,
        graph: GraphOptions {
            force_probe: args.force_probe,
            prefer_current_crtc: args.prefer_current_crtc,
        },
        test_commit: !args.no_test_commit,
        clear_color: Some(args.color.unwrap_or([0, 0, 0, 0xff])),
    };

    let pipeline = match Negotiation::new(&egl, config).establish_drm() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("Bring-up failed: {}", err);
            std::process::exit(1);
        }
    };

    let output = pipeline.output();
    info!(
        "Output live on {}: connector {:?}, crtc {:?}, plane {:?}, {}x{}@{}",
        pipeline.drm_path().display(),
        output.connector,
        output.crtc,
        output.plane,
        output.mode.hdisplay,
        output.mode.vdisplay,
        output.mode.vrefresh,
    );

    if !pipeline.kms().is_privileged() {
        info!("Running without drm master");
    }

    thread::sleep(Duration::from_secs(args.seconds));
}

fn fourcc_from_string(name: &str) -> Result<DrmFourcc, &'static str> {
    Ok(match name {
        "Xrgb8888" => DrmFourcc::Xrgb8888,
        "Xbgr8888" => DrmFourcc::Xbgr8888,
        "Argb8888" => DrmFourcc::Argb8888,
        "Abgr8888" => DrmFourcc::Abgr8888,
        "Rgb565" => DrmFourcc::Rgb565,
        _ => return Err("Unsupported framebuffer format"),
    })
}

fn color_from_string(value: &str) -> Result<[u8; 4], String> {
    let channels = value
        .split(',')
        .map(|c| c.trim().parse::<u8>().map_err(|err| format!("{}: {}", c, err)))
        .collect::<Result<Vec<_>, _>>()?;
    match channels[..] {
        [r, g, b] => Ok([r, g, b, 0xff]),
        [r, g, b, a] => Ok([r, g, b, a]),
        _ => Err(String::from("expected `r,g,b` or `r,g,b,a`")),
    }
}
