//! Data process
//!
//! Owns the pad model, the engines and the session on a dedicated thread.
//! Each loop waits briefly for a command, handles everything queued, then
//! pumps sensor samples in and one LED packet out.

use super::command::{Command, Message};
use super::dispatch::dispatch;
use crate::core::config::Config;
use crate::core::events::{Response, ResponseId, ResponseSender, ResponseValue};
use crate::engine::{LedAnimator, LedEncoder, SensorEngine};
use crate::hid::device::{DeviceRegistry, HidBackend};
use crate::hid::protocol::SensorSample;
use crate::hid::session::PadSession;
use crate::pad::model::PadState;
use crate::pad::profile::{ProfileController, ProfileStorage};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Inbound command queue depth
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Everything the handlers operate on, owned by the data process
pub struct PadContext {
    pub pad: PadState,
    pub sensors: SensorEngine,
    pub leds: LedEncoder,
    pub animator: LedAnimator,
    pub session: PadSession,
    pub profiles: ProfileController,
}

impl PadContext {
    pub fn new(
        config: &Config,
        backend: Arc<dyn HidBackend>,
        storage: Box<dyn ProfileStorage>,
    ) -> Self {
        let registry = DeviceRegistry::new(backend, config.signature());
        let session = PadSession::new(registry, config.worker_timing());
        // Serial list is read back by GUI_init
        if let Err(e) = session.enumerate() {
            warn!("Initial pad enumeration failed: {}", e);
        }

        Self {
            pad: PadState::new(config.sensor_limits()),
            sensors: SensorEngine::new(),
            leds: LedEncoder::new(),
            animator: LedAnimator::new(),
            session,
            profiles: ProfileController::new(storage),
        }
    }

    /// Validate and dispatch one raw message
    ///
    /// Unknown ids are ignored; malformed payloads are logged and dropped.
    pub fn handle(&mut self, message: &Message) -> Vec<Response> {
        match Command::parse(message) {
            Ok(Some(command)) => {
                debug!("Handling {}", message.id);
                dispatch(self, &command)
            }
            Ok(None) => {
                debug!("Ignoring unknown command {}", message.id);
                Vec::new()
            }
            Err(e) => {
                warn!("Rejected command: {}", e);
                Vec::new()
            }
        }
    }

    /// Exchange one round of data with the connected pad
    pub fn pump(&mut self, now: Instant) -> Vec<Response> {
        let mut responses = Vec::new();

        for packet in self.session.drain_samples() {
            let sample = SensorSample::from_bytes(&packet);
            for transition in self.sensors.process(&mut self.pad, &sample) {
                responses.push(Response::new(
                    ResponseId::PanelEvent,
                    ResponseValue::Panel(transition),
                ));
            }
        }

        if self.session.is_connected() {
            self.animator.update(&mut self.pad, now);
            if self.session.has_write_capacity() {
                let packet = self.leds.tick(&self.pad);
                self.session.push_frame(packet.into_bytes());
            }
        }

        if self.session.check_workers().is_some() {
            responses.push(Response::new(
                ResponseId::PadConnected,
                ResponseValue::Connected(false),
            ));
        }
        responses
    }
}

/// The data process loop
pub struct DataProcess {
    ctx: PadContext,
    commands: Receiver<Message>,
    responses: ResponseSender,
    poll: Duration,
}

impl DataProcess {
    pub fn new(
        ctx: PadContext,
        commands: Receiver<Message>,
        responses: ResponseSender,
        poll: Duration,
    ) -> Self {
        Self {
            ctx,
            commands,
            responses,
            poll,
        }
    }

    fn emit(&self, responses: Vec<Response>) {
        for response in responses {
            self.responses.send(response);
        }
    }

    /// Run until every command sender is dropped, then disconnect
    pub fn run(mut self) -> PadContext {
        info!("Data process started");
        loop {
            match self.commands.recv_timeout(self.poll) {
                Ok(message) => {
                    let responses = self.ctx.handle(&message);
                    self.emit(responses);
                    while let Ok(message) = self.commands.try_recv() {
                        let responses = self.ctx.handle(&message);
                        self.emit(responses);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let responses = self.ctx.pump(Instant::now());
            self.emit(responses);
        }
        self.ctx.session.disconnect();
        info!("Data process stopped");
        self.ctx
    }
}

/// Command side of a data process running on its own thread
pub struct DataProcessHandle {
    commands: SyncSender<Message>,
    join: JoinHandle<PadContext>,
}

impl DataProcessHandle {
    pub fn spawn(
        ctx: PadContext,
        responses: ResponseSender,
        poll: Duration,
    ) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::sync_channel(COMMAND_QUEUE_CAPACITY);
        let process = DataProcess::new(ctx, rx, responses, poll);
        let join = thread::Builder::new()
            .name("data-process".to_string())
            .spawn(move || process.run())?;
        Ok(Self { commands, join })
    }

    /// Queue a raw message; returns whether it was accepted
    pub fn send_message(&self, message: Message) -> bool {
        match self.commands.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!("Command queue full, dropping {}", message.id);
                false
            }
            Err(TrySendError::Disconnected(message)) => {
                debug!("Data process gone, dropping {}", message.id);
                false
            }
        }
    }

    pub fn send(&self, command: &Command) -> bool {
        self.send_message(command.to_message())
    }

    /// Close the command channel and wait for the loop to finish
    pub fn shutdown(self) -> Option<PadContext> {
        drop(self.commands);
        match self.join.join() {
            Ok(ctx) => Some(ctx),
            Err(_) => {
                warn!("Data process panicked");
                None
            }
        }
    }
}
