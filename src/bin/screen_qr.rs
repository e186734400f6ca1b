use clap::{Parser, Subcommand};
use screen_qr::{
    ChannelSink, Config, DetectionResult, Frame, ImageFileCapture, MonitorSession, NotifyingSink,
    Pipeline, Region, ScanOutcome, Scanner, ScreenCapture,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "screen_qr", version, about = "Decode QR codes from screen captures")]
struct Cli {
    /// Config file; defaults to the per-user config location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the detection pipeline on a single image
    Detect {
        #[arg(long)]
        image: PathBuf,
        /// Print every attempt the pipeline made
        #[arg(long)]
        trace: bool,
    },
    /// Scan an image file as if it were the screen, optionally one region of it
    Scan {
        #[arg(long)]
        image: PathBuf,
        /// Region as x,y,width,height; padded and widened like a hotkey scan
        #[arg(long, value_parser = parse_region)]
        region: Option<Region>,
    },
    /// List decoding engines and their availability
    Engines,
    /// Monitor an image file as if it were a window
    Watch {
        #[arg(long)]
        image: PathBuf,
        /// Window title matcher; defaults to the configured target
        #[arg(long)]
        title: Option<String>,
        /// Stop after this many polling ticks
        #[arg(long, default_value_t = 3)]
        ticks: u64,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    match cli.command {
        Command::Detect { image, trace } => detect_cmd(&config, &image, trace),
        Command::Scan { image, region } => scan_cmd(&config, &image, region),
        Command::Engines => engines_cmd(&config),
        Command::Watch {
            image,
            title,
            ticks,
        } => watch_cmd(&config, &image, title, ticks),
        Command::Config => config_cmd(&config),
    }
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(path) => Config::load_from_path(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(2);
        }),
        None => Config::load(),
    }
}

fn open_capture(image: &Path) -> ImageFileCapture {
    ImageFileCapture::open(image).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    })
}

fn detect_cmd(config: &Config, image: &Path, show_trace: bool) {
    let capture = open_capture(image);
    let frame: Frame = match capture.capture_window(ImageFileCapture::WINDOW) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let pipeline = Pipeline::from_config(config);

    let start = Instant::now();
    let (hit, trace) = match pipeline.detect_traced(&frame) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    println!("Image: {} ({}x{})", image.display(), frame.width(), frame.height());
    if show_trace {
        for (i, attempt) in trace.attempts().iter().enumerate() {
            println!("  {:>4}  {}", i + 1, attempt);
        }
    }
    match hit {
        Some(result) => {
            println!("Found: {}", result.text());
            println!("Via: {} ({} attempts, {:.2?})", result.attempt_id(), trace.len(), elapsed);
        }
        None => {
            println!("No QR code found ({} attempts, {:.2?})", trace.len(), elapsed);
            process::exit(3);
        }
    }
}

fn scan_cmd(config: &Config, image: &Path, region: Option<Region>) {
    let scanner = Scanner::new(
        Arc::new(open_capture(image)),
        Arc::new(Pipeline::from_config(config)),
        config.scan.clone(),
    );
    let outcome = match region {
        Some(region) => scanner.scan_region(region),
        None => scanner.scan_screen(),
    };
    match outcome {
        Ok(ScanOutcome::Found(result)) => println!("Found: {}", result),
        Ok(other) => {
            println!("No QR code found ({:?})", other);
            process::exit(3);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn parse_region(value: &str) -> Result<Region, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected x,y,width,height, got {:?}", value));
    };
    let number = |s: &str| s.parse::<i64>().map_err(|e| format!("{}: {}", s, e));
    let (x, y, w, h) = (number(x)?, number(y)?, number(w)?, number(h)?);
    Region::new(
        i32::try_from(x).map_err(|e| e.to_string())?,
        i32::try_from(y).map_err(|e| e.to_string())?,
        u32::try_from(w).map_err(|e| e.to_string())?,
        u32::try_from(h).map_err(|e| e.to_string())?,
    )
    .ok_or_else(|| "region must have a non-zero width and height".to_string())
}

fn engines_cmd(config: &Config) {
    let pipeline = Pipeline::from_config(config);
    for descriptor in pipeline.engines().capability_status() {
        println!("{}", descriptor);
    }
}

fn watch_cmd(config: &Config, image: &Path, title: Option<String>, ticks: u64) {
    let capture = Arc::new(open_capture(image));
    let matcher = title.unwrap_or_else(|| config.monitor.target.clone());
    let (tx, rx) = mpsc::channel::<DetectionResult>();
    let sink = NotifyingSink::new(ChannelSink::new(tx)).with_notifier(
        config.monitor.notifications,
        |result: &DetectionResult| eprintln!("New code: {}", result.text()),
    );

    let session = MonitorSession::new(
        capture,
        Arc::new(Pipeline::from_config(config)),
        Arc::new(sink),
    )
    .with_detect_timeout(config.monitor.detect_timeout());

    if let Err(e) = session.start(&matcher, config.monitor.poll_interval()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if !session.wait_for_ticks(ticks, config.monitor.ticks_budget(ticks)) {
        eprintln!("Warning: monitor did not finish {} ticks in time", ticks);
    }
    session.stop();
    session.join();

    let emitted: Vec<DetectionResult> = rx.try_iter().collect();
    println!("Watched {:?} for {} ticks, {} emitted", matcher, session.ticks(), emitted.len());
    for result in emitted {
        println!("  {}", result);
    }
}

fn config_cmd(config: &Config) {
    match config.to_toml() {
        Ok(text) => {
            println!("# {}", Config::default_config_path().display());
            print!("{}", text);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
