//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p sim_server -- [--addr 127.0.0.1:40000] [--tick-hz 60] [--replicate-hz 1]
//!
//! The server listens for client connections, runs a fixed timestep
//! simulation of the pickupable objects, and broadcasts authoritative
//! snapshots to connected clients.
//!
//! Console commands:
//!   spawn [x y z]  - Place a pickupable object
//!   status         - Show server status
//!   cvarlist       - List cvars (sv_replicate_hz, sv_throw_force, ...)
//!   quit           - Shutdown server

use std::env;
use std::io::{BufRead, Write};

use anyhow::Context;
use sim_server::server::GameServer;
use sim_shared::config::SimConfig;
use sim_shared::math::{Transform, Vec3};
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> SimConfig {
    let mut cfg = SimConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(60);
                i += 2;
            }
            "--replicate-hz" if i + 1 < args.len() => {
                cfg.replicate_hz = args[i + 1].parse().unwrap_or(1.0);
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    info!(addr = %cfg.server_addr, tick_hz = cfg.tick_hz, replicate_hz = cfg.replicate_hz, "Starting server");

    let mut server = GameServer::new(cfg.clone()).await.context("create server")?;
    let local = server.local_addr()?;
    info!(%local, "Server listening");

    // Seed the world with a few pickupables.
    for (i, x) in [150.0f32, 300.0, 450.0].into_iter().enumerate() {
        let pos = Vec3::new(x, 100.0 * i as f32, 50.0);
        server.spawn_object(Transform::from_position(pos)).await?;
    }

    // Set up console input channel.
    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    server.set_console_input(console_rx);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Server ready. Type 'spawn' to add an object, 'status' for info, 'quit' to exit.");
    println!();

    // Main server loop.
    let tick_interval = std::time::Duration::from_secs_f32(1.0 / cfg.tick_hz as f32);
    let mut next_tick = tokio::time::Instant::now();

    loop {
        // Accept new clients (non-blocking).
        if let Ok(Some(cid)) = server.try_accept(std::time::Duration::from_millis(1)).await {
            info!(client_id = ?cid, "New client accepted");
        }

        server.step(tick_interval.as_secs_f32()).await?;

        // Wait for next tick.
        next_tick += tick_interval;
        tokio::time::sleep_until(next_tick).await;
    }
}
