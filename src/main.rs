use camxuc::camera::NokhwaCameraProvider;
use camxuc::client::EmotionClient;
use camxuc::config::{AppConfig, LoggingConfig};
use camxuc::controller::{CaptureController, ControllerSettings};
use camxuc::error::{CamXucError, Result};
use camxuc::ui::EmotionApp;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "camxuc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ./camxuc.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Classification server base URL, e.g. http://127.0.0.1:8000
    #[arg(long, short = 's')]
    server: Option<String>,

    /// Camera index to open instead of probing 0 then 1
    #[arg(long)]
    camera_index: Option<u32>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, short = 'l')]
    log_level: Option<String>,

    /// Classify one image file and print the result instead of opening the window
    #[arg(long, short = 'i')]
    image: Option<PathBuf>,

    /// List cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

/// Initializes the logging system (file only, no console output)
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let log_file = std::fs::File::create(&config.file).map_err(CamXucError::Io)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }
    if let Some(index) = args.camera_index {
        config.capture.camera_index = Some(index);
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Sends one file through the controller and prints the bars
fn classify_file(
    runtime: &tokio::runtime::Runtime,
    mut controller: CaptureController,
    path: &Path,
) -> Result<()> {
    controller.handle_files(&[path])?;
    runtime.block_on(controller.wait_for_completion());

    let display = controller.display();
    if let Some(message) = &display.error {
        eprintln!("{message}");
        return Err(CamXucError::Classification(message.clone()));
    }
    if let Some(dominant) = &display.dominant {
        println!("{}", camxuc::display::translate_emotion(dominant));
    }
    for bar in &display.bars {
        println!("{bar}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config.logging)?;

    if args.list_cameras {
        for device in NokhwaCameraProvider::list_devices()? {
            println!("{device}");
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let client = Arc::new(EmotionClient::new(
        &config.server.base_url,
        config.request_timeout(),
    )?);
    let mut controller = CaptureController::new(
        Box::new(NokhwaCameraProvider::new(&config.capture)),
        client,
        runtime.handle().clone(),
        ControllerSettings::from(&config.capture),
    );

    if let Some(path) = &args.image {
        let result = classify_file(&runtime, controller, path);
        runtime.shutdown_timeout(Duration::from_secs(1));
        return result;
    }

    controller.init();
    info!("Starting UI against {}", config.server.base_url);

    let result = eframe::run_native(
        "Nhận diện cảm xúc",
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1280.0, 800.0])
                .with_title("Nhận diện cảm xúc")
                .with_drag_and_drop(true),
            ..Default::default()
        },
        Box::new(move |_cc| Ok(Box::new(EmotionApp::new(controller)))),
    );

    if let Err(e) = result {
        error!("Application error: {}", e);
    }

    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
