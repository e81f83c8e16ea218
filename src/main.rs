use eframe::NativeOptions;
use std::env;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use multiview::config::Config;
use multiview::error::RuntimeError;
use multiview::{cli, runtime, FfmpegBackend, MainWindow};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = cli::parse(env::args_os().skip(1).collect())?;
    if args.help {
        print!("{}", cli::USAGE);
        return Ok(());
    }

    let config = Config::load_or_default(args.config.as_deref())?;
    let runtime_dir = args.runtime_dir.clone().or_else(|| config.runtime_dir.clone());
    let runtime = match runtime::init(runtime_dir) {
        Ok(runtime) => runtime,
        Err(e) => {
            report_fatal(&e);
            return Err(e.into());
        }
    };

    let presets = config.pane_presets(&args.locators)?;

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(runtime.window_title("multiview"))
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([960.0, 360.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "multiview",
        options,
        Box::new(move |cc| Ok(Box::new(MainWindow::<FfmpegBackend>::create(cc, presets)))),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}

fn report_fatal(e: &RuntimeError) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("multiview")
        .set_description(format!("The media runtime could not start.\n\n{e}"))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
