//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p sim_client -- [--addr 127.0.0.1:40000] [--smoothing]
//!
//! The client connects to the server, mirrors the replicated objects,
//! and drives a character from console input.
//!
//! Console commands:
//!   status              - Show client status
//!   look <x> <y>        - Turn the camera
//!   move <x> <y>        - Step the character
//!   interact            - Pick up the focused object
//!   throw               - Throw the selected item
//!   camera              - Switch first/third person
//!   say <message>       - Send chat message
//!   cvarlist / set ...  - Cvar access (cl_interp_factor, cl_smoothing, ...)
//!   quit                - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use sim_client::client::{ClientState, GameClient};
use sim_client::input::InputState;
use sim_shared::config::SimConfig;
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
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            "--smoothing" => {
                cfg.smoothing = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cfg
}

/// Turns interactive console lines into one frame's input, falling back
/// to the client console for everything else.
fn input_from_line(line: &str) -> Option<InputState> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut input = InputState::default();
    match tokens.first().copied() {
        Some("move") if tokens.len() >= 3 => {
            input.move_x = tokens[1].parse().ok()?;
            input.move_y = tokens[2].parse().ok()?;
        }
        Some("look") if tokens.len() >= 3 => {
            input.look_x = tokens[1].parse().ok()?;
            input.look_y = tokens[2].parse().ok()?;
        }
        Some("interact") => input.interact = true,
        Some("throw") => input.throw = true,
        Some("camera") => input.switch_camera = true,
        Some("jump") => input.jump = true,
        _ => return None,
    }
    Some(input)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args();
    info!(server = %cfg.server_addr, name = %cfg.player_name, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

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

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let frame_interval = Duration::from_secs_f32(1.0 / cfg.tick_hz as f32);
    let mut frame: u64 = 0;

    loop {
        // Console lines either become this frame's input or go to the
        // command console.
        let mut input = InputState::default();
        while let Ok(line) = console_rx.try_recv() {
            match input_from_line(&line) {
                Some(parsed) => input = parsed,
                None => match client.exec_console(&line).await {
                    Ok(output) => {
                        for line in output {
                            println!("{}", line);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
            }
        }

        client.frame(frame_interval.as_secs_f32(), &input).await?;

        if client.state == ClientState::Disconnected {
            println!("Disconnected from server.");
            break;
        }

        frame += 1;
        if frame % 300 == 0 {
            info!(
                objects = client.objects.len(),
                held = client.character.inventory.len(),
                focused = ?client.character.focused(),
                "frame"
            );
        }

        tokio::time::sleep(frame_interval).await;
    }

    Ok(())
}
