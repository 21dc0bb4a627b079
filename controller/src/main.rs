use blob_servo_camera::frame_slot;
use blob_servo_common::config::Config;
use blob_servo_controller::clock::SystemClock;
use blob_servo_controller::debug::DebugSink;
use blob_servo_controller::detect::BlobLocator;
use blob_servo_controller::policy::{MotionPolicy, PolicyParams};
use blob_servo_controller::{run, sink, with_source_error, Controller, ControllerError};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long to wait for background publishers to flush on exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        camera = config.camera.url,
        mode = config.camera.mode,
        width = config.camera.width,
        height = config.camera.height,
        sink = config.sink.mode,
        close_magnitude = config.policy.close_magnitude,
        evade_secs = config.policy.evade_secs,
        debug = config.debug.enabled,
        "starting blob-servo controller"
    );

    let params = match PolicyParams::from_config(&config.policy) {
        Ok(p) => p,
        Err(e) => exit_with(ControllerError::from(e)),
    };

    let (frame_tx, frame_rx) = frame_slot();
    let camera_config = config.camera.clone();
    let source = tokio::spawn(async move {
        let result = blob_servo_camera::run_source(&camera_config, frame_tx).await;
        if let Err(e) = &result {
            error!(error = %e, "camera source failed");
        }
        result
    });

    let (command_sink, sink_handle) = sink::build(&config.sink);
    let mut controller = Controller::new(
        BlobLocator::from_config(&config.detector, &config.camera),
        MotionPolicy::new(params),
        SystemClock,
        command_sink,
    );

    let mut debug_handle = None;
    if config.debug.enabled {
        let (debug, handle) = DebugSink::spawn(&config.debug);
        controller = controller.with_debug(debug);
        debug_handle = Some(handle);
    }

    let result = run(&mut controller, frame_rx).await;
    info!(
        ticks = controller.ticks(),
        evasions = controller.policy().evasions_completed(),
        state = %controller.policy().state(),
        "control loop finished"
    );

    // Dropping the controller closes the sink and debug channels so their
    // tasks can post the final command and exit.
    drop(controller);
    drain("command sink", sink_handle).await;
    drain("debug writer", debug_handle).await;

    match with_source_error(result, source).await {
        Ok(()) => info!("shutdown complete"),
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: ControllerError) -> ! {
    error!(error = %e, "controller failed, robot stopped");
    std::process::exit(1);
}

async fn drain(name: &str, handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else {
        return;
    };
    match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(task = name, error = %e, "background task panicked"),
        Err(_) => warn!(task = name, "background task did not finish in time"),
    }
}
