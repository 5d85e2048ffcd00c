use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use planetoid::net::ControlMessage;
use planetoid::{
    FixedTimestep, GameEvent, Message, NetworkStats, ServerSocket, ServerState, ShipWorld,
    SocketEvent, TerrainWorld, Transport, UserRegistry,
};

use crate::config::ServerConfig;

pub struct GameServer {
    socket: ServerSocket,
    state: ServerState<TerrainWorld>,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    running: Arc<AtomicBool>,
}

impl GameServer {
    pub fn new(config: &ServerConfig) -> io::Result<Self> {
        let socket = ServerSocket::bind(
            config.bind_addr(),
            config.max_clients,
            config.connection_timeout(),
        )?;

        let mut state = ServerState::new(
            UserRegistry::new(config.registry()),
            ShipWorld::new(config.ship),
            TerrainWorld::with_planet(config.planet_radius),
        );
        for i in 1..=config.npc_count {
            if let Err(e) = state.spawn_npc(&format!("drone-{i}")) {
                warn!("could not spawn drone-{i}: {e}");
            }
        }

        Ok(Self {
            running: socket.running(),
            socket,
            state,
            timestep: FixedTimestep::new(config.tick_rate),
            last_tick_time: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.socket.stats()
    }

    pub fn run(&mut self, run_for: Option<Duration>) {
        let started = Instant::now();
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            if run_for.is_some_and(|limit| started.elapsed() >= limit) {
                self.running.store(false, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown_connections();
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;

        self.process_network();

        self.timestep.accumulate(delta.as_secs_f32());
        while self.timestep.consume_tick() {
            self.state.tick(self.timestep.dt());
            if self.timestep.tick() % (self.timestep.tick_rate() as u64 * 10) == 0 {
                self.log_stats();
            }
        }

        self.state.flush(&mut self.socket);
        self.log_events();
    }

    pub fn shutdown_connections(&mut self) {
        let connections = self.state.join().recipients(None);
        for connection in connections {
            if let Err(e) =
                self.socket
                    .send_message(connection, &Message::Control(ControlMessage::Disconnect))
            {
                warn!("failed to say goodbye to {connection}: {e}");
            }
            self.state.connection_lost(connection);
            self.socket.close(connection);
        }
        self.log_events();
    }

    fn process_network(&mut self) {
        let events = match self.socket.poll() {
            Ok(events) => events,
            Err(e) => {
                warn!("network error: {e}");
                return;
            }
        };

        for event in events {
            match event {
                SocketEvent::Connected(connection) => debug!("{connection} connected"),
                SocketEvent::Frame { from, frame } => {
                    if let Err(e) = self.state.handle_message(from, &frame) {
                        debug!("bad frame from {from}: {e}");
                    }
                }
                SocketEvent::TimedOut(connection) => {
                    info!("{connection} timed out");
                    self.state.connection_lost(connection);
                }
            }
        }

        for connection in self.state.take_closed() {
            self.socket.close(connection);
        }
    }

    fn log_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::UserJoined { guid, username } => {
                    info!("{username} is now flying as {guid}")
                }
                GameEvent::UserLeft { guid } => info!("{guid} is gone"),
                GameEvent::ActionTriggered { guid, triggers } => {
                    debug!("{guid} triggered {triggers:?}")
                }
                other => debug!("{other:?}"),
            }
        }
    }

    fn log_stats(&self) {
        let stats = self.socket.stats();
        info!(
            "tick {}: {} users, {} ships, {} projectiles, {} sent / {} received",
            self.timestep.tick(),
            self.state.join().registry().len(),
            self.state.world().len(),
            self.state.world().projectiles().len(),
            stats.packets_sent,
            stats.packets_received,
        );
    }
}
