//! Server implementation.
//!
//! The authoritative side of the interaction sim. Each replicated object
//! lives here with the Authority role: the server simulates it, samples
//! it on the per-object replication cadence, and broadcasts snapshots to
//! every client. Pickup and throw decisions are made exactly once, here,
//! then multicast so every copy applies the identical transition.
//!
//! Determinism notes:
//! - Keep simulation in a fixed timestep.
//! - Avoid wall-clock-dependent branching in gameplay code.
//! - Use stable ordering when iterating collections.

use anyhow::Context;
use sim_shared::{
    config::SimConfig,
    console::{Console, CvarFlags, CvarValue},
    interp::InterpParams,
    math::{Transform, Vec3},
    net::{ClientId, NetMsg, ReliableConn, ReliableListener, PROTOCOL_VERSION},
    object::{NetRole, ObjectConfig, ObjectId, PickupObject},
    physics::{BallisticPhysics, PhysicsBackend},
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

/// Connected client state.
struct ClientConn {
    id: ClientId,
    reliable: ReliableConn,
    peer: SocketAddr,
}

/// Game server.
pub struct GameServer {
    pub cfg: SimConfig,
    pub console: Console,

    objects: HashMap<ObjectId, PickupObject>,
    /// Which client holds each hidden object.
    holders: HashMap<ObjectId, ClientId>,
    clients: HashMap<ClientId, ClientConn>,

    tcp: ReliableListener,
    physics: BallisticPhysics,

    tick: u32,
    next_object_id: u64,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
}

impl GameServer {
    /// Creates a new server with the given config.
    pub async fn new(cfg: SimConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        let tcp = ReliableListener::bind(addr).await?;

        let mut console = Console::new();
        Self::register_cvars(&mut console, &cfg);

        Ok(Self {
            cfg,
            console,
            objects: HashMap::new(),
            holders: HashMap::new(),
            clients: HashMap::new(),
            tcp,
            physics: BallisticPhysics::default(),
            tick: 0,
            next_object_id: 1,
            console_rx: None,
        })
    }

    fn register_cvars(console: &mut Console, cfg: &SimConfig) {
        console.register_cvar(
            "sv_replicate_hz",
            CvarValue::Float(cfg.replicate_hz as f64),
            "Snapshot broadcast frequency per object",
            CvarFlags::REPLICATED,
        );
        console.register_cvar(
            "sv_throw_force",
            CvarValue::Float(cfg.throw_force as f64),
            "Default throw force",
            CvarFlags::SERVER_ONLY,
        );
        console.register_cvar(
            "sv_item_limit",
            CvarValue::Int(cfg.inventory_capacity as i64),
            "Inventory capacity per character",
            CvarFlags::REPLICATED,
        );
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    /// Returns the local address (after binding).
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, id: ObjectId) -> Option<&PickupObject> {
        self.objects.get(&id)
    }

    fn object_config(&self) -> ObjectConfig {
        ObjectConfig {
            replicate_hz: self.cfg.replicate_hz,
            smoothing: false, // authority never smooths
            interp: InterpParams {
                factor: self.cfg.interp_factor,
                precision: self.cfg.precision,
                ..Default::default()
            },
        }
    }

    /// Places a new pickupable object in the world (Authority role) and
    /// announces it to connected clients.
    pub async fn spawn_object(&mut self, spawn: Transform) -> anyhow::Result<ObjectId> {
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;

        let obj = PickupObject::new(id, NetRole::Authority, spawn, self.object_config());
        let announce = NetMsg::ObjectSpawn {
            id,
            transform: obj.body.transform,
            velocity: obj.body.velocity,
        };
        self.objects.insert(id, obj);

        info!(?id, "Object spawned");
        self.broadcast(&announce).await;
        Ok(id)
    }

    /// Accepts exactly one client (handshake + world state).
    pub async fn accept_one(&mut self) -> anyhow::Result<ClientId> {
        let (conn, peer) = self.tcp.accept().await?;
        self.handle_new_connection(conn, peer).await
    }

    /// Accepts a client with timeout (non-blocking).
    pub async fn try_accept(&mut self, timeout: Duration) -> anyhow::Result<Option<ClientId>> {
        match tokio::time::timeout(timeout, self.tcp.accept()).await {
            Ok(Ok((conn, peer))) => self.handle_new_connection(conn, peer).await.map(Some),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None), // Timeout
        }
    }

    async fn handle_new_connection(
        &mut self,
        mut conn: ReliableConn,
        peer: SocketAddr,
    ) -> anyhow::Result<ClientId> {
        let msg = conn.recv().await?;
        match msg {
            NetMsg::Hello { protocol } if protocol == PROTOCOL_VERSION => {
                let id = ClientId::new_unique();
                conn.send(&NetMsg::Welcome { client_id: id }).await?;

                // Stream the current world state. Held objects are
                // announced too; their held flag follows via Pickup.
                let mut held = Vec::new();
                for (oid, obj) in &self.objects {
                    conn.send(&NetMsg::ObjectSpawn {
                        id: *oid,
                        transform: obj.body.transform,
                        velocity: obj.body.velocity,
                    })
                    .await?;
                    if let Some(holder) = self.holders.get(oid) {
                        held.push((*oid, *holder));
                    }
                }
                for (oid, holder) in held {
                    conn.send(&NetMsg::Pickup {
                        id: oid,
                        client_id: holder,
                    })
                    .await?;
                }

                self.clients.insert(
                    id,
                    ClientConn {
                        id,
                        reliable: conn,
                        peer,
                    },
                );

                info!(client_id = ?id, %peer, "Client connected");
                Ok(id)
            }
            other => anyhow::bail!("unexpected handshake msg: {other:?}"),
        }
    }

    /// Runs the server for a number of ticks.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(1.0 / self.cfg.tick_hz as f32);
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.step(dt.as_secs_f32()).await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one fixed simulation step.
    pub async fn step(&mut self, dt_sec: f32) -> anyhow::Result<()> {
        self.process_console_commands().await?;
        self.recv_requests().await;
        self.simulate(dt_sec);
        self.replicate(dt_sec).await;
        self.tick += 1;
        Ok(())
    }

    async fn process_console_commands(&mut self) -> anyhow::Result<()> {
        // Collect lines first to avoid borrow conflict
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            let out = self.exec_console(&line).await?;
            for l in out {
                println!("{}", l);
            }
        }
        Ok(())
    }

    /// Executes a console command.
    pub async fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let out = match tokens[0] {
            "spawn" => {
                let pos = if tokens.len() >= 4 {
                    Vec3::new(
                        tokens[1].parse().unwrap_or(0.0),
                        tokens[2].parse().unwrap_or(0.0),
                        tokens[3].parse().unwrap_or(0.0),
                    )
                } else {
                    Vec3::ZERO
                };
                let id = self.spawn_object(Transform::from_position(pos)).await?;
                Ok(vec![format!("Spawned object {:?} at {:?}", id, pos)])
            }
            "status" => {
                let mut out = Vec::new();
                out.push(format!("Tick: {}", self.tick));
                out.push(format!("Clients: {}", self.clients.len()));
                for c in self.clients.values() {
                    out.push(format!("  {:?}: peer={}", c.id, c.peer));
                }
                out.push(format!("Objects: {}", self.objects.len()));
                let mut ids: Vec<&ObjectId> = self.objects.keys().collect();
                ids.sort_by_key(|i| i.0);
                for id in ids {
                    let o = &self.objects[id];
                    out.push(format!(
                        "  {:?}: pos={:?} hidden={}",
                        id, o.body.transform.position, o.is_hidden()
                    ));
                }
                Ok(out)
            }
            "quit" | "exit" => {
                info!("Server shutting down");
                std::process::exit(0);
            }
            _ => self.console.exec(line),
        };

        self.apply_tuning();
        out
    }

    /// Pushes sv_* cvar values into config and live objects.
    fn apply_tuning(&mut self) {
        if let Some(hz) = self
            .console
            .get_cvar("sv_replicate_hz")
            .and_then(|v| v.as_float())
        {
            self.cfg.replicate_hz = hz as f32;
        }
        if let Some(force) = self
            .console
            .get_cvar("sv_throw_force")
            .and_then(|v| v.as_float())
        {
            self.cfg.throw_force = force as f32;
        }
        if let Some(limit) = self
            .console
            .get_cvar("sv_item_limit")
            .and_then(|v| v.as_int())
        {
            self.cfg.inventory_capacity = limit.max(0) as usize;
        }

        let object_cfg = self.object_config();
        for obj in self.objects.values_mut() {
            obj.set_config(object_cfg);
        }
    }

    /// Drains pending client requests, then handles them.
    async fn recv_requests(&mut self) {
        let ids: Vec<ClientId> = self.clients.keys().copied().collect();
        let mut inbox = Vec::new();
        let mut dropped = Vec::new();

        for id in ids {
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            match client
                .reliable
                .recv_timeout(Duration::from_millis(1))
                .await
            {
                Ok(Some(msg)) => inbox.push((id, msg)),
                Ok(None) => {}
                Err(e) => {
                    warn!(client_id = ?id, error = %e, "Client connection lost");
                    dropped.push(id);
                }
            }
        }

        for id in dropped {
            self.clients.remove(&id);
        }
        for (id, msg) in inbox {
            self.handle_request(id, msg).await;
        }
    }

    async fn handle_request(&mut self, from: ClientId, msg: NetMsg) {
        match msg {
            NetMsg::PickupRequest { client_id, id } => {
                debug!(?client_id, ?id, "pickup requested");
                match self.objects.get_mut(&id) {
                    Some(obj) if !obj.is_hidden() => {
                        obj.on_pickup();
                        // Attribute to the connection, not the message.
                        self.holders.insert(id, from);
                        self.broadcast(&NetMsg::Pickup {
                            id,
                            client_id: from,
                        })
                        .await;
                    }
                    Some(_) => warn!(?id, "pickup rejected: already held"),
                    None => warn!(?id, "pickup rejected: unknown object"),
                }
            }
            NetMsg::ThrowRequest {
                client_id,
                id,
                position,
                direction,
                force,
            } => {
                debug!(?client_id, ?id, "throw requested");
                match self.objects.get_mut(&id) {
                    Some(obj) if obj.is_hidden() && self.holders.get(&id) == Some(&from) => {
                        obj.on_throw(position, direction, force);
                        self.holders.remove(&id);
                        self.broadcast(&NetMsg::Throw {
                            id,
                            position,
                            direction,
                            force,
                        })
                        .await;
                    }
                    Some(obj) if obj.is_hidden() => {
                        warn!(?id, ?from, "throw rejected: held by another client")
                    }
                    Some(_) => warn!(?id, "throw rejected: not held"),
                    None => warn!(?id, "throw rejected: unknown object"),
                }
            }
            NetMsg::ClientCommand { command } => {
                debug!(?from, command = %command, "Client command received");
                if let Some(text) = command.strip_prefix("say ") {
                    let print = NetMsg::ServerPrint {
                        message: format!("[{}] {}", from.0, text),
                    };
                    self.broadcast(&print).await;
                }
            }
            NetMsg::Disconnect { reason } => {
                info!(client_id = ?from, reason = %reason, "Client disconnected");
                self.clients.remove(&from);
            }
            other => {
                debug!(?other, "Unexpected client message");
            }
        }
    }

    /// Advances simulated bodies. Held objects neither move nor collide.
    fn simulate(&mut self, dt_sec: f32) {
        for obj in self.objects.values_mut() {
            if obj.tick_enabled() {
                self.physics.step(&mut obj.body, dt_sec);
            }
        }
    }

    /// Ticks every object's cadence and broadcasts due snapshots.
    async fn replicate(&mut self, dt_sec: f32) {
        let mut due: Vec<(ObjectId, NetMsg)> = self
            .objects
            .iter_mut()
            .filter_map(|(id, obj)| {
                obj.tick(dt_sec).map(|snap| {
                    (
                        *id,
                        NetMsg::ReplicateTransform {
                            id: *id,
                            transform: snap.transform,
                            velocity: snap.velocity,
                        },
                    )
                })
            })
            .collect();
        due.sort_by_key(|(id, _)| id.0);

        for (_, msg) in due {
            self.broadcast(&msg).await;
        }
    }

    /// Sends a message to every connected client; failures are logged
    /// and the client is dropped.
    async fn broadcast(&mut self, msg: &NetMsg) {
        let mut dropped = Vec::new();
        for (id, client) in self.clients.iter_mut() {
            if let Err(e) = client.reliable.send(msg).await {
                warn!(client_id = ?id, error = %e, "Broadcast failed, dropping client");
                dropped.push(*id);
            }
        }
        for id in dropped {
            self.clients.remove(&id);
        }
    }
}

/// Helper for tests: bind to an ephemeral port.
pub async fn bind_ephemeral(tick_hz: u32) -> anyhow::Result<(GameServer, SimConfig)> {
    let cfg = SimConfig {
        server_addr: format!("{}:{}", IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        tick_hz,
        ..Default::default()
    };

    let mut server = GameServer::new(cfg).await?;
    let addr = server.local_addr()?;
    server.cfg.server_addr = addr.to_string();

    let cfg = server.cfg.clone();
    Ok((server, cfg))
}
