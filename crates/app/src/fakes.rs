//! In-memory port implementations shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use greenhouse_domain::command::{Command, Destination};
use greenhouse_domain::error::{SendError, SourceError, TransportError};
use greenhouse_domain::event::Event;
use greenhouse_domain::id::DeviceId;

use crate::ports::{CommandSink, Delivery, EventSource};

// ── Scripted event source ──────────────────────────────────────

/// What the source did, readable after it has been moved into a loop.
#[derive(Debug, Default)]
pub(crate) struct SourceLog {
    pub receives: usize,
    pub acked: Vec<u64>,
    pub rejected: Vec<(u64, String)>,
    pub closed: bool,
}

/// Replays a fixed script, then either ends the stream or blocks forever.
pub(crate) struct ScriptedSource {
    script: VecDeque<Result<Event, SourceError>>,
    next_token: u64,
    hold_open: bool,
    settle_fails: bool,
    log: Arc<Mutex<SourceLog>>,
}

impl ScriptedSource {
    /// Deliver `script`, then report end-of-stream.
    pub fn new(script: Vec<Result<Event, SourceError>>) -> Self {
        Self {
            script: script.into(),
            next_token: 0,
            hold_open: false,
            settle_fails: false,
            log: Arc::default(),
        }
    }

    /// Deliver `events`, then wait forever.
    pub fn open(events: Vec<Event>) -> Self {
        let mut source = Self::new(events.into_iter().map(Ok).collect());
        source.hold_open = true;
        source
    }

    /// Make every ack and reject fail with a closed connection.
    pub fn failing_settle(mut self) -> Self {
        self.settle_fails = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }
}

impl EventSource for ScriptedSource {
    type Token = u64;

    async fn receive(&mut self) -> Result<Delivery<u64>, SourceError> {
        self.log.lock().unwrap().receives += 1;
        match self.script.pop_front() {
            Some(Ok(event)) => {
                self.next_token += 1;
                Ok(Delivery {
                    event,
                    token: self.next_token,
                })
            }
            Some(Err(err)) => Err(err),
            None if self.hold_open => std::future::pending().await,
            None => Err(TransportError::EndOfStream.into()),
        }
    }

    async fn ack(&mut self, token: u64) -> Result<(), TransportError> {
        if self.settle_fails {
            return Err(TransportError::ConnectionClosed);
        }
        self.log.lock().unwrap().acked.push(token);
        Ok(())
    }

    async fn reject(&mut self, token: u64, reason: &str) -> Result<(), TransportError> {
        if self.settle_fails {
            return Err(TransportError::ConnectionClosed);
        }
        self.log
            .lock()
            .unwrap()
            .rejected
            .push((token, reason.to_string()));
        Ok(())
    }

    async fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}

// ── Recording command sink ─────────────────────────────────────

/// Scripted result of one send.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    Deliver,
    Reject,
    Fatal,
}

#[derive(Debug, Default)]
struct SinkState {
    sent: Vec<(Destination, Command)>,
    outcomes: HashMap<DeviceId, VecDeque<Outcome>>,
    closed: bool,
}

/// Records every delivered command; clones share the same record.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    /// Script the next sends to `device` in order; unscripted sends succeed.
    pub fn script(&self, device: &str, outcomes: &[Outcome]) {
        self.state
            .lock()
            .unwrap()
            .outcomes
            .entry(DeviceId::new(device))
            .or_default()
            .extend(outcomes.iter().copied());
    }

    pub fn sent(&self) -> Vec<(Destination, Command)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Number of commands delivered to `device`.
    pub fn sent_to(&self, device: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(dest, _)| dest.device_id.as_str() == device)
            .count()
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl CommandSink for RecordingSink {
    async fn send(&self, destination: &Destination, command: &Command) -> Result<(), SendError> {
        let mut state = self.state.lock().unwrap();
        let outcome = state
            .outcomes
            .get_mut(&destination.device_id)
            .and_then(VecDeque::pop_front);
        match outcome {
            None | Some(Outcome::Deliver) => {
                state.sent.push((destination.clone(), command.clone()));
                Ok(())
            }
            Some(Outcome::Reject) => Err(SendError::Rejected("device unavailable".into())),
            Some(Outcome::Fatal) => Err(TransportError::ConnectionClosed.into()),
        }
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
