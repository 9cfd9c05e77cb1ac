use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use handsoff_hw::Camera;

#[zbus::proxy(
    interface = "dev.handsoff.Handsoff1",
    default_service = "dev.handsoff.Handsoff1",
    default_path = "/dev/handsoff/Handsoff1"
)]
trait Handsoff {
    fn train(&self, label: &str, samples: u32) -> zbus::Result<u32>;
    fn watch(&self) -> zbus::Result<()>;
    fn stop(&self) -> zbus::Result<bool>;
    fn status(&self) -> zbus::Result<String>;
}

#[derive(Parser)]
#[command(name = "handsoff", about = "handsoff face-touch alert CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the "not touching" class (keep your hands away from your face)
    TrainIdle {
        /// Number of samples to capture (0 = daemon default)
        #[arg(short, long, default_value_t = 0)]
        samples: u32,
    },
    /// Train the "touched" class (hold a hand against your face)
    TrainTouch {
        /// Number of samples to capture (0 = daemon default)
        #[arg(short, long, default_value_t = 0)]
        samples: u32,
    },
    /// Start watching for face touches
    Watch,
    /// Stop an active watch loop
    Stop,
    /// Show daemon status
    Status,
    /// Run camera diagnostics (bypasses the daemon)
    Test,
}

async fn proxy() -> Result<HandsoffProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("failed to connect to the session bus")?;
    HandsoffProxy::new(&conn)
        .await
        .context("is handsoffd running?")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::TrainIdle { samples } => {
            println!("Training \"not touching\" — keep your hands away from your face...");
            let added = proxy().await?.train("not_touch", samples).await?;
            println!("Stored {added} samples.");
        }
        Commands::TrainTouch { samples } => {
            println!("Training \"touched\" — hold a hand against your face...");
            let added = proxy().await?.train("touched", samples).await?;
            println!("Stored {added} samples.");
        }
        Commands::Watch => {
            proxy().await?.watch().await?;
            println!("Watching. You'll hear a sound when you touch your face.");
        }
        Commands::Stop => {
            if proxy().await?.stop().await? {
                println!("Stopped.");
            } else {
                println!("Nothing was running.");
            }
        }
        Commands::Status => {
            let status = proxy().await?.status().await?;
            println!("{status}");
        }
        Commands::Test => {
            run_camera_test()?;
        }
    }

    Ok(())
}

/// Direct camera diagnostics: list devices, open the configured one,
/// capture a frame, and report its properties.
fn run_camera_test() -> Result<()> {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found.");
        return Ok(());
    }

    println!("Available devices:");
    for dev in &devices {
        println!("  {} — {} ({})", dev.path, dev.name, dev.driver);
    }

    let device_path =
        std::env::var("HANDSOFF_CAMERA_DEVICE").unwrap_or_else(|_| devices[0].path.clone());

    println!("Opening {device_path}...");
    let camera = Camera::open(&device_path).context("failed to open camera")?;
    println!(
        "Negotiated {}x{} ({:?})",
        camera.width, camera.height, camera.fourcc
    );

    let frame = camera.capture_frame().context("failed to capture frame")?;
    println!(
        "Captured frame #{}: {} bytes, avg brightness {:.1}",
        frame.sequence,
        frame.data.len(),
        frame.avg_brightness()
    );

    Ok(())
}
