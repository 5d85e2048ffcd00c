use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use log::{debug, info, warn};

use planetoid::session::describe_failure;
use planetoid::{
    ClientSocket, ClientState, FixedTimestep, GameEvent, InputSource, ScriptedInput, ShipWorld,
    TerrainWorld,
};

use crate::config::ClientConfig;

/// Headless pilot: joins, flies a scripted patrol and reports what it sees.
pub struct Bot {
    socket: ClientSocket,
    state: ClientState<TerrainWorld>,
    input: ScriptedInput,
    timestep: FixedTimestep,
    last_tick_time: Instant,
}

impl Bot {
    pub fn connect(config: &ClientConfig, server: SocketAddr, username: &str) -> Result<Self> {
        let mut socket = ClientSocket::connect("0.0.0.0:0", server)?;
        socket.set_timeout(config.connection_timeout());
        info!("bound {} for {server}", socket.local_addr());

        let mut state = ClientState::new(
            username,
            ShipWorld::new(config.ship),
            TerrainWorld::with_planet(config.planet_radius),
        );
        debug!("asking to join as {username}");
        state.request_join();

        Ok(Self {
            socket,
            state,
            input: ScriptedInput::patrol(),
            timestep: FixedTimestep::new(config.tick_rate),
            last_tick_time: Instant::now(),
        })
    }

    pub fn run(&mut self, run_for: Option<Duration>) -> Result<()> {
        let started = Instant::now();
        loop {
            self.tick_once()?;

            if self.state.is_closed() {
                info!("server went away");
                return Ok(());
            }
            if self.socket.is_timed_out() {
                bail!("no word from {} in too long", self.socket.server_addr());
            }
            if run_for.is_some_and(|limit| started.elapsed() >= limit) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        self.state.leave();
        self.state.flush(&mut self.socket);
        Ok(())
    }

    pub fn tick_once(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;

        for frame in self.socket.poll()? {
            if let Err(e) = self.state.handle_message(&frame) {
                debug!("bad frame from server: {e}");
            }
        }

        self.timestep.accumulate(delta.as_secs_f32());
        while self.timestep.consume_tick() {
            let bits = if self.state.is_registered() {
                self.input.poll()
            } else {
                0
            };
            self.state.tick(self.timestep.dt(), bits);

            if self.timestep.tick() % (self.timestep.tick_rate() as u64 * 5) == 0 {
                self.report();
            }
        }

        self.state.flush(&mut self.socket);
        self.handle_events()
    }

    fn handle_events(&mut self) -> Result<()> {
        for event in self.state.drain_events() {
            match event {
                GameEvent::RegisterFailed { reason } => {
                    bail!("server refused us: {}", describe_failure(reason));
                }
                GameEvent::RegisterSucceeded { guid } => info!("flying as {guid}"),
                GameEvent::UserJoined { username, .. } => info!("{username} joined"),
                GameEvent::UserLeft { guid } => info!("{guid} left"),
                GameEvent::RosterReset { users } => info!("{users} users online"),
                GameEvent::ActionTriggered { guid, triggers } => {
                    debug!("{guid} triggered {triggers:?}")
                }
            }
        }
        Ok(())
    }

    fn report(&self) {
        let Some(ship) = self.state.local_ship() else {
            warn!("still waiting for the server to let us in");
            return;
        };
        let up = ship.body.up();
        info!(
            "tick {}: up ({:.2}, {:.2}, {:.2}), facing {:.0}, {} ships in view, {} shots in flight",
            self.timestep.tick(),
            up.x,
            up.y,
            up.z,
            ship.controller.facing_deg(),
            self.state.world().len(),
            self.state.world().projectiles().len(),
        );
    }
}
