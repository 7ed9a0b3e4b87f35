//! Bridges blocking backend calls and the single-threaded UI loop.
//!
//! Each submitted request runs on its own worker thread; the result comes
//! back over a `std::sync::mpsc` channel tagged with the request's ticket.
//! The UI loop drains the channel once per tick. Nothing is ever cancelled:
//! a superseded request still completes, and the owner decides by ticket
//! whether the result is still wanted.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use super::{Backend, Completion, Request, Ticket, Transport, execute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One worker thread per request
    Threaded,
    /// Run on the caller's thread and queue the completion. Deterministic,
    /// used by the CLI and in tests.
    Inline,
}

pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    mode: DispatchMode,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_ticket: Ticket,
    in_flight: usize,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>, mode: DispatchMode) -> Self {
        let (tx, rx) = mpsc::channel();
        Dispatcher {
            backend,
            mode,
            tx,
            rx,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    pub fn threaded(backend: Arc<dyn Backend>) -> Self {
        Self::new(backend, DispatchMode::Threaded)
    }

    pub fn inline(backend: Arc<dyn Backend>) -> Self {
        Self::new(backend, DispatchMode::Inline)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Requests submitted whose completion has not been received yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Non-blocking poll for one completion
    pub fn try_recv(&mut self) -> Option<Completion> {
        let completion = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }

    /// Wait up to `timeout` for one completion
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Completion> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Transport for Dispatcher {
    fn submit(&mut self, request: Request) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight += 1;
        tracing::debug!(ticket, endpoint = request.endpoint(), "submitting request");

        match self.mode {
            DispatchMode::Inline => {
                let result = execute(self.backend.as_ref(), &request);
                // The receiver lives in self, so this cannot fail
                let _ = self.tx.send(Completion { ticket, result });
            }
            DispatchMode::Threaded => {
                let backend = Arc::clone(&self.backend);
                let tx = self.tx.clone();
                thread::spawn(move || {
                    let result = execute(backend.as_ref(), &request);
                    if let Err(e) = &result {
                        tracing::debug!(ticket, "request failed: {}", e);
                    }
                    // The UI may already be gone; nothing to do then
                    let _ = tx.send(Completion { ticket, result });
                });
            }
        }
        ticket
    }
}
