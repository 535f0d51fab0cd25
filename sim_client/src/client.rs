//! Client implementation.
//!
//! The client maintains:
//! - A reliable control stream (handshake + replication + multicasts)
//! - A remote copy of every replicated object, reconciled against
//!   authoritative snapshots
//! - The local character (camera, focus raycast, inventory)
//! - Console cvars for the interpolation knobs

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use sim_shared::config::SimConfig;
use sim_shared::console::{Console, CvarFlags, CvarValue};
use sim_shared::interp::InterpParams;
use sim_shared::net::{ClientId, NetMsg, ReliableConn, PROTOCOL_VERSION};
use sim_shared::object::{NetRole, ObjectConfig, ObjectId, PickupObject};
use sim_shared::world::SphereWorld;

use crate::character::{Character, CharacterAction, CharacterConfig};
use crate::input::InputState;

/// Radius used for interaction raycasts against replicated objects.
const OBJECT_COLLIDER_RADIUS: f32 = 50.0;

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Not connected to any server.
    Disconnected,
    /// Connecting to server (handshake in progress).
    Connecting,
    /// Connected and mirroring world state.
    Connected,
}

/// High-level game client.
pub struct GameClient {
    pub client_id: ClientId,
    pub state: ClientState,
    pub console: Console,

    reliable: ReliableConn,

    /// Remote copies of every replicated object, by id.
    pub objects: HashMap<ObjectId, PickupObject>,
    pub character: Character,
    object_cfg: ObjectConfig,

    /// Server messages to display.
    pub server_messages: Vec<String>,
}

impl GameClient {
    /// Connects to a server and performs the handshake.
    pub async fn connect(cfg: &SimConfig) -> anyhow::Result<Self> {
        let server_addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;

        info!(server = %server_addr, "Connecting to server");

        let stream = TcpStream::connect(server_addr)
            .await
            .context("tcp connect")?;
        let mut reliable = ReliableConn::new(stream);

        reliable
            .send(&NetMsg::Hello {
                protocol: PROTOCOL_VERSION,
            })
            .await?;

        let welcome = reliable.recv().await?;
        let client_id = match welcome {
            NetMsg::Welcome { client_id } => client_id,
            other => anyhow::bail!("expected Welcome, got {other:?}"),
        };

        info!(client_id = ?client_id, "Connected to server");

        let mut console = Console::new();
        Self::register_cvars(&mut console, cfg);

        let object_cfg = ObjectConfig {
            replicate_hz: cfg.replicate_hz,
            smoothing: cfg.smoothing,
            interp: InterpParams {
                factor: cfg.interp_factor,
                precision: cfg.precision,
                ..Default::default()
            },
        };

        let character = Character::new(
            CharacterConfig::from_sim_config(cfg),
            cfg.inventory_capacity,
        );

        Ok(Self {
            client_id,
            state: ClientState::Connected,
            console,
            reliable,
            objects: HashMap::new(),
            character,
            object_cfg,
            server_messages: Vec::new(),
        })
    }

    fn register_cvars(console: &mut Console, cfg: &SimConfig) {
        console.register_cvar(
            "cl_interp_factor",
            CvarValue::Float(cfg.interp_factor as f64),
            "Blend weight toward the authoritative state per step",
            CvarFlags::NONE,
        );
        console.register_cvar(
            "cl_interp_precision",
            CvarValue::Float(cfg.precision as f64),
            "Per-axis magnitude threshold for vector equality",
            CvarFlags::NONE,
        );
        console.register_cvar(
            "cl_smoothing",
            CvarValue::Bool(cfg.smoothing),
            "Smooth remote objects between snapshots instead of snapping",
            CvarFlags::NONE,
        );
    }

    /// Polls the reliable connection for messages.
    pub async fn poll_reliable(&mut self) -> anyhow::Result<()> {
        // Short timeout to avoid blocking the frame.
        match self
            .reliable
            .recv_timeout(std::time::Duration::from_millis(10))
            .await
        {
            Ok(Some(msg)) => self.handle_message(msg),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Reliable connection error");
                self.state = ClientState::Disconnected;
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, msg: NetMsg) {
        match msg {
            NetMsg::ObjectSpawn {
                id,
                transform,
                velocity,
            } => {
                debug!(?id, "Object spawn received");
                let mut obj = PickupObject::new(id, NetRole::Remote, transform, self.object_cfg);
                obj.body.set_linear_velocity(velocity);
                self.objects.insert(id, obj);
            }
            NetMsg::ReplicateTransform {
                id,
                transform,
                velocity,
            } => match self.objects.get_mut(&id) {
                Some(obj) => obj.apply_replication(transform, velocity),
                None => warn!(?id, "snapshot for unknown object"),
            },
            NetMsg::Pickup { id, client_id } => match self.objects.get_mut(&id) {
                Some(obj) => {
                    obj.on_pickup();
                    if client_id == self.client_id {
                        self.character.confirm_pickup(id);
                    }
                }
                None => warn!(?id, "pickup for unknown object"),
            },
            NetMsg::Throw {
                id,
                position,
                direction,
                force,
            } => match self.objects.get_mut(&id) {
                Some(obj) => {
                    obj.on_throw(position, direction, force);
                    self.character.confirm_throw(id);
                }
                None => warn!(?id, "throw for unknown object"),
            },
            NetMsg::ServerPrint { message } => {
                info!(message = %message, "Server message");
                self.server_messages.push(message);
            }
            NetMsg::Disconnect { reason } => {
                info!(reason = %reason, "Disconnected from server");
                self.state = ClientState::Disconnected;
            }
            other => {
                debug!(?other, "Unhandled message");
            }
        }
    }

    /// Advances one client frame: drain intents into the character, send
    /// resulting interaction requests, refresh the focus raycast, tick
    /// remote objects, and poll the connection.
    pub async fn frame(&mut self, dt: f32, input: &InputState) -> anyhow::Result<()> {
        for intent in input.intents() {
            if let Some(action) = self.character.apply_intent(intent, dt) {
                self.send_action(action).await?;
            }
        }

        let world = self.collision_world();
        self.character.check_for_interaction(&world);

        for obj in self.objects.values_mut() {
            obj.tick(dt);
        }

        self.poll_reliable().await
    }

    async fn send_action(&mut self, action: CharacterAction) -> anyhow::Result<()> {
        let msg = match action {
            CharacterAction::RequestPickup(id) => NetMsg::PickupRequest {
                client_id: self.client_id,
                id,
            },
            CharacterAction::RequestThrow {
                id,
                position,
                direction,
                force,
            } => NetMsg::ThrowRequest {
                client_id: self.client_id,
                id,
                position,
                direction,
                force,
            },
        };
        self.reliable.send(&msg).await
    }

    /// Builds the interaction raycast world from collision-enabled
    /// replicated objects.
    pub fn collision_world(&self) -> SphereWorld {
        let mut world = SphereWorld::default();
        for obj in self.objects.values() {
            if obj.collision_enabled() {
                world.add(obj.id, obj.body.transform.position, OBJECT_COLLIDER_RADIUS);
            }
        }
        world
    }

    /// Executes a console command.
    pub async fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let out = match tokens[0] {
            "status" => {
                let mut out = Vec::new();
                out.push(format!("State: {:?}", self.state));
                out.push(format!("Client ID: {:?}", self.client_id));
                out.push(format!("Objects: {}", self.objects.len()));
                out.push(format!(
                    "Inventory: {}/{} (selected {})",
                    self.character.inventory.len(),
                    self.character.inventory.capacity(),
                    self.character.inventory.selected()
                ));
                Ok(out)
            }
            "say" => {
                let msg = tokens[1..].join(" ");
                self.reliable
                    .send(&NetMsg::ClientCommand {
                        command: format!("say {}", msg),
                    })
                    .await?;
                Ok(vec![])
            }
            "disconnect" => {
                self.state = ClientState::Disconnected;
                Ok(vec!["Disconnected".to_string()])
            }
            "quit" | "exit" => {
                std::process::exit(0);
            }
            _ => self.console.exec(line),
        };

        self.apply_tuning();
        out
    }

    /// Pushes the current cl_* cvar values into every remote object.
    fn apply_tuning(&mut self) {
        let factor = self
            .console
            .get_cvar("cl_interp_factor")
            .and_then(|v| v.as_float());
        let precision = self
            .console
            .get_cvar("cl_interp_precision")
            .and_then(|v| v.as_float());
        let smoothing = self.console.get_cvar("cl_smoothing").map(|v| v.as_bool());

        if let Some(f) = factor {
            self.object_cfg.interp.factor = f as f32;
        }
        if let Some(p) = precision {
            self.object_cfg.interp.precision = p as f32;
        }
        if let Some(s) = smoothing {
            self.object_cfg.smoothing = s;
        }

        for obj in self.objects.values_mut() {
            obj.set_config(self.object_cfg);
        }
    }

    /// Returns the underlying reliable connection peer.
    pub fn server_peer(&self) -> anyhow::Result<SocketAddr> {
        self.reliable.peer_addr()
    }
}
