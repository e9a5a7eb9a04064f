//! Connect to a server, scan for devices, and briefly run every device
//! that supports vibration.
//!
//! Usage: `cargo run --example scan_and_vibrate -- ws://127.0.0.1:12345`

use std::time::Duration;

use haptic_sdk::{Client, ClientError, ConnectOptions, COMMAND_SINGLE_MOTOR_VIBRATE};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:12345".to_string());

    let client = Client::connect(&addr, ConnectOptions::default()).await?;

    client.start_scanning().await?;
    match client.wait_on_scanning(Duration::from_secs(10)).await {
        Ok(()) => {}
        Err(ClientError::Timeout) => client.stop_scanning().await?,
        Err(e) => return Err(e.into()),
    }

    for device in client.devices() {
        println!("found {device}");
        if device.supports(COMMAND_SINGLE_MOTOR_VIBRATE) {
            device.vibrate(0.5).await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            device.vibrate(0.0).await?;
        }
    }

    client.stop_all_devices().await?;
    client.close().await;
    Ok(())
}
