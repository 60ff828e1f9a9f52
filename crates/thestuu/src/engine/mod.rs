//! The mutation engine - single owner of the project model.
//!
//! One task runs [`Engine::run`]; everything that changes the project
//! flows through it as an [`EngineRequest`], so mutations are serialized
//! without locks. Each command follows the same shape: validate inputs,
//! mutate a working copy, normalize, validate invariants, swap the copy
//! in, broadcast `state`. A command that fails anywhere along that path
//! leaves the model untouched.

use std::time::{Duration, Instant};

use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use stuuconf::StuuConfig;
use stuumodel::{normalize, validate, Project};
use stuuproto::{event as native_event, now_ms, round6, NativeEvent, NativePeer, PeerState,
    TransportSnapshot};

use crate::clock::TransportClock;
use crate::events;
use crate::persistence::ProjectStore;

pub mod commands;
pub mod error;

mod clips;
mod mixer;
mod patterns;
mod plugins;
mod project_io;
mod sync;
mod tracks;
mod transport;

pub use commands::Command;
pub use error::EngineError;
pub use sync::SyncReport;

/// Broadcast cadence for transport and meter events.
pub const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Work items for the engine task.
pub enum EngineRequest {
    /// A client command; the reply is the ack payload.
    Command {
        cmd: String,
        payload: Value,
        reply: oneshot::Sender<Value>,
    },
    /// A client connected; the reply is the ordered ready/state/transport
    /// frame sequence to send it.
    Hello { reply: oneshot::Sender<Vec<String>> },
}

pub struct Engine {
    project: Project,
    clock: TransportClock,
    peer: Option<NativePeer>,
    store: ProjectStore,
    config: StuuConfig,
    project_file: String,
    events: broadcast::Sender<String>,
}

impl Engine {
    pub fn new(
        mut project: Project,
        config: StuuConfig,
        store: ProjectStore,
        peer: Option<NativePeer>,
        events: broadcast::Sender<String>,
        project_file: impl Into<String>,
    ) -> Self {
        normalize(&mut project);
        let clock = TransportClock::new(project.bpm);
        Self {
            project,
            clock,
            peer,
            store,
            config,
            project_file: project_file.into(),
            events,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn clock(&self) -> &TransportClock {
        &self.clock
    }

    pub fn project_file(&self) -> &str {
        &self.project_file
    }

    /// The peer, but only while it is actually connected.
    fn native(&self) -> Option<NativePeer> {
        self.peer.as_ref().filter(|p| p.is_connected()).cloned()
    }

    /// Run the engine loop until the request channel closes.
    pub async fn run(mut self, mut requests: mpsc::Receiver<EngineRequest>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut native_events = self.peer.as_ref().map(|p| p.subscribe_events());
        let mut peer_states = self.peer.as_ref().map(|p| p.subscribe_state());

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => {
                        info!("engine request channel closed, shutting down");
                        return;
                    }
                },
                event = next_broadcast(&mut native_events) => {
                    self.handle_native_event(event);
                }
                state = next_broadcast(&mut peer_states) => {
                    self.handle_peer_state(state).await;
                }
                _ = ticker.tick() => self.broadcast_tick(),
            }
        }
    }

    async fn handle_request(&mut self, request: EngineRequest) {
        match request {
            EngineRequest::Command { cmd, payload, reply } => {
                let ack = self.execute_wire(&cmd, payload).await;
                let _ = reply.send(ack);
            }
            EngineRequest::Hello { reply } => {
                let _ = reply.send(self.hello_frames());
            }
        }
    }

    /// Execute a wire-level command and produce its ack payload.
    pub async fn execute_wire(&mut self, cmd: &str, payload: Value) -> Value {
        let result = match Command::from_wire(cmd, payload) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(extra) => {
                let mut ack = serde_json::Map::new();
                ack.insert("ok".to_string(), Value::Bool(true));
                if let Value::Object(fields) = extra {
                    ack.extend(fields);
                }
                Value::Object(ack)
            }
            Err(e) => {
                debug!(cmd, "command failed: {e}");
                json!({"ok": false, "error": e.to_string()})
            }
        }
    }

    /// Execute a typed command. The `Ok` value holds extra ack fields.
    pub async fn execute(&mut self, command: Command) -> Result<Value, EngineError> {
        use Command::*;
        match command {
            Play => transport::play(self).await,
            Pause => transport::pause(self).await,
            Stop => transport::stop(self).await,
            GetTransport => transport::get_state(self).await,
            SetBpm(p) => transport::set_bpm(self, p).await,
            Seek(p) => transport::seek(self, p).await,

            CreateTrack => tracks::create(self).await,
            InsertTrack(p) => tracks::insert(self, p).await,
            ReorderTrack(p) => tracks::reorder(self, p).await,
            DeleteTrack(p) => tracks::delete(self, p).await,
            BulkDeleteTracks(p) => tracks::bulk_delete(self, p).await,
            DuplicateTrack(p) => tracks::duplicate(self, p).await,
            SetTrackName(p) => tracks::set_name(self, p),
            SetChainCollapsed(p) => tracks::set_chain_collapsed(self, p),
            SetChainEnabled(p) => tracks::set_chain_enabled(self, p),

            SetVolume(p) => mixer::set_volume(self, p),
            SetPan(p) => mixer::set_pan(self, p),
            SetMute(p) => mixer::set_mute(self, p),
            SetSolo(p) => mixer::set_solo(self, p),
            SetRecordArm(p) => mixer::set_record_arm(self, p),

            CreatePattern(p) => patterns::create(self, p),
            UpdatePattern(p) => patterns::update(self, p),
            UpdateStep(p) => patterns::update_step(self, p),
            DeletePattern(p) => patterns::delete(self, p),
            MoveMidiNote(p) => patterns::move_midi_note(self, p),

            CreateClip(p) => clips::create(self, p),
            ImportFile(p) => clips::import_file(self, p).await,
            MoveClip(p) => clips::move_clip(self, p),
            ResizeClip(p) => clips::resize(self, p),
            DeleteClip(p) => clips::delete(self, p),

            ScanPlugins => plugins::scan(self).await,
            AddPlugin(p) => plugins::add(self, p).await,
            RemovePlugin(p) => plugins::remove(self, p).await,
            ReorderPlugins(p) => plugins::reorder(self, p).await,
            SetBypass(p) => plugins::set_bypass(self, p),
            SetParameter(p) => plugins::set_parameter(self, p).await,

            NewProject(p) => project_io::new(self, p),
            LoadProject(p) => project_io::load(self, p),
            SaveProject(p) => project_io::save(self, p),
            ListProjects => project_io::list(self),
            UpdateView(p) => project_io::update_view(self, p),
        }
    }

    /// Normalize and validate a mutated working copy, then swap it in and
    /// broadcast the new state. On error the current model is untouched.
    fn commit(&mut self, mut draft: Project) -> Result<(), EngineError> {
        normalize(&mut draft);
        let errors = validate(&draft);
        if !errors.is_empty() {
            return Err(EngineError::validation(errors.join("; ")));
        }
        self.project = draft;
        self.broadcast_state();
        Ok(())
    }

    fn broadcast(&self, frame: String) {
        // no connected clients is fine
        let _ = self.events.send(frame);
    }

    fn broadcast_state(&self) {
        self.broadcast(events::frame(events::STATE, self.state_payload()));
    }

    fn broadcast_transport(&self) {
        let snapshot = self.clock.snapshot(Instant::now());
        self.broadcast(events::frame(
            events::TRANSPORT,
            serde_json::to_value(&snapshot).expect("snapshot serializes"),
        ));
    }

    fn broadcast_tick(&self) {
        self.broadcast_transport();
        self.broadcast(events::frame(events::METER, self.meter_payload()));
    }

    fn state_payload(&self) -> Value {
        json!({
            "project": &self.project,
            "nativeTransport": self.clock.native_authoritative(),
        })
    }

    fn ready_payload(&self) -> Value {
        let mut payload = json!({
            "enginePort": self.config.bind.engine_port,
            "projectFile": self.project_file,
            "nativeTransport": self.clock.native_authoritative(),
        });
        if self.config.native.enabled {
            payload["nativeSocketPath"] =
                Value::String(self.config.native.socket_path.display().to_string());
        }
        payload
    }

    /// The ordered frame sequence a freshly connected client receives.
    pub fn hello_frames(&self) -> Vec<String> {
        let snapshot = self.clock.snapshot(Instant::now());
        vec![
            events::frame(events::READY, self.ready_payload()),
            events::frame(events::STATE, self.state_payload()),
            events::frame(
                events::TRANSPORT,
                serde_json::to_value(&snapshot).expect("snapshot serializes"),
            ),
        ]
    }

    fn meter_payload(&self) -> Value {
        let playing = self.clock.playing();
        let simulated = playing && !self.clock.native_authoritative();
        let mut rng = rand::rng();
        let meters: Vec<Value> = self
            .project
            .playlist
            .iter()
            .map(|track| {
                if simulated {
                    let peak: f64 = rng.random_range(0.05..0.35);
                    let rms = peak * rng.random_range(0.5..0.8);
                    json!({"trackId": track.track_id, "peak": round6(peak), "rms": round6(rms)})
                } else {
                    json!({"trackId": track.track_id, "peak": 0.0, "rms": 0.0})
                }
            })
            .collect();
        json!({"playing": playing, "timestamp": now_ms(), "meters": meters})
    }

    /// Adopt a backend transport snapshot: clock first, then the bpm
    /// write-through into the project model.
    fn adopt_snapshot(&mut self, snapshot: &TransportSnapshot) {
        self.clock.adopt(snapshot);
        self.project.bpm = self.clock.bpm();
    }

    fn handle_native_event(&mut self, event: NativeEvent) {
        match event.event.as_str() {
            native_event::TRANSPORT_TICK | native_event::TRANSPORT_STATE => {
                match serde_json::from_value::<TransportSnapshot>(event.payload) {
                    Ok(snapshot) => {
                        self.adopt_snapshot(&snapshot);
                        self.broadcast_transport();
                    }
                    Err(e) => warn!("undecodable transport snapshot from backend: {e}"),
                }
            }
            other => debug!(event = other, "ignoring backend event"),
        }
    }

    async fn handle_peer_state(&mut self, state: PeerState) {
        match state {
            PeerState::Connected => {
                info!("native backend connected, refreshing transport and re-syncing");
                if let Some(peer) = self.native() {
                    match peer
                        .request(stuuproto::cmd::TRANSPORT_GET_STATE, json!({}))
                        .await
                    {
                        Ok(payload) => {
                            if let Some(snapshot) = transport::snapshot_from_payload(&payload) {
                                self.adopt_snapshot(&snapshot);
                            }
                        }
                        Err(e) => warn!("transport refresh after reconnect failed: {e}"),
                    }
                }
                let report = sync::resync(self).await;
                if let Some(report) = report {
                    if report.failed > 0 {
                        warn!(
                            restored = report.restored,
                            failed = report.failed,
                            "re-sync finished with failures: {:?}",
                            report.errors
                        );
                    } else {
                        info!(restored = report.restored, "re-sync complete");
                    }
                }
                self.broadcast_state();
                self.broadcast_transport();
            }
            PeerState::Disconnected => {
                info!("native backend disconnected, transport clock falls back to local time");
                self.clock.to_fallback(Instant::now());
                self.broadcast_transport();
            }
        }
    }
}

/// Await the next value of an optional broadcast subscription; pends
/// forever when there is no subscription (no backend configured).
async fn next_broadcast<T: Clone>(rx: &mut Option<broadcast::Receiver<T>>) -> T {
    loop {
        match rx {
            Some(receiver) => match receiver.recv().await {
                Ok(value) => return value,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine lagged behind a broadcast channel");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    *rx = None;
                }
            },
            None => std::future::pending().await,
        }
    }
}
