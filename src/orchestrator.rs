//! Generation controller.
//!
//! Every input change goes through [`Controller::on_inputs_changed`], which
//! resolves the effective payload, normalizes the size and issues a new
//! request tagged with the next sequence number. A result is applied only if
//! its sequence number is still the latest one issued; superseded work runs to
//! completion but is dropped, so the view never goes back to older inputs.
//!
//! Matrix requests come back as a [`Ticket`] to be awaited (possibly after
//! more input changes). Linear requests are generated in place.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use image::RgbaImage;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::{Config, SizeBounds};
use crate::error::GenerateError;
use crate::generator::{LinearGenerator, MatrixGenerator};
use crate::projector::{filter_non_empty, flatten};
use crate::qrcode::QrCodeEcc;
use crate::records::Record;
use crate::resolver::{resolve, LabelOptions, Mode, Resolution};

/// Raw size as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeInput {
    Pixels(f64),
    /// Anything that did not parse as a number.
    NotANumber,
}

impl SizeInput {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => SizeInput::Pixels(v),
            _ => SizeInput::NotANumber,
        }
    }
}

impl From<u32> for SizeInput {
    fn from(px: u32) -> Self {
        SizeInput::Pixels(f64::from(px))
    }
}

/// Clamps a requested size into the configured range. Non-numeric and zero
/// sizes fall back to the default.
pub fn normalize_size(input: SizeInput, bounds: &SizeBounds) -> u32 {
    match input {
        SizeInput::Pixels(v) if v.is_finite() && v != 0.0 => {
            v.round().clamp(f64::from(bounds.min), f64::from(bounds.max)) as u32
        }
        _ => bounds.default,
    }
}

/// Everything the user can change that affects the generated code.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub records: Vec<Record>,
    pub mode: Mode,
    pub size: SizeInput,
    pub card_mode: bool,
    pub label: LabelOptions,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            records: vec![Record::default()],
            mode: Mode::Matrix,
            size: SizeInput::NotANumber,
            card_mode: false,
            label: LabelOptions::hidden(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Fulfilled,
    Failed,
}

/// A published code image.
pub struct GeneratedCode {
    pub seq: u64,
    pub mode: Mode,
    /// The string that was encoded.
    pub payload: String,
    /// Label drawn under a barcode, if any.
    pub label: Option<String>,
    /// Error correction level the QR symbol was built with.
    pub ecc: Option<QrCodeEcc>,
    pub image: RgbaImage,
}

impl fmt::Debug for GeneratedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCode")
            .field("seq", &self.seq)
            .field("mode", &self.mode)
            .field("payload", &self.payload)
            .field("label", &self.label)
            .field("ecc", &self.ecc)
            .field("dimensions", &self.image.dimensions())
            .finish()
    }
}

/// What the view shows for the active mode.
#[derive(Debug, Clone)]
pub struct GenerationView {
    pub phase: Phase,
    pub mode: Mode,
    pub size: u32,
    pub image: Option<Arc<GeneratedCode>>,
    pub error: Option<String>,
}

/// Immutable snapshot of one generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub seq: u64,
    pub size: u32,
    pub card_mode: bool,
    pub resolution: Resolution,
}

/// Result of one attempt, tagged with the request that produced it.
#[derive(Debug)]
pub struct Completion {
    pub seq: u64,
    pub mode: Mode,
    pub payload: String,
    pub label: Option<String>,
    pub ecc: Option<QrCodeEcc>,
    pub result: Result<RgbaImage, GenerateError>,
}

/// An in-flight matrix request.
pub struct Ticket {
    request: GenerationRequest,
    future: BoxFuture<'static, Result<RgbaImage, GenerateError>>,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.request.seq
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Drives the generator to completion. A panicking generator is reported
    /// as a failed completion.
    pub async fn run(self) -> Completion {
        let Ticket { request, future } = self;
        let result = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Task("matrix generator panicked".to_string())),
        };
        Completion {
            seq: request.seq,
            mode: Mode::Matrix,
            payload: request.resolution.payload().to_string(),
            label: None,
            ecc: request.resolution.ecc(),
            result,
        }
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket").field("request", &self.request).finish()
    }
}

/// Outcome of an input change.
#[derive(Debug)]
pub enum Dispatch {
    /// Inputs resolve to the same request as last time.
    Unchanged,
    /// Empty payload; nothing to show.
    Idle,
    /// Generated (or failed) synchronously; the view is already updated.
    Settled,
    /// Matrix generation started; await the ticket and pass the completion
    /// to [`Controller::complete`].
    Pending(Ticket),
}

pub struct Controller {
    config: Config,
    matrix: Arc<dyn MatrixGenerator>,
    linear: Arc<dyn LinearGenerator>,
    last_applied: Option<Resolution>,
    latest_seq: u64,
    phase: Phase,
    mode: Mode,
    size: u32,
    matrix_result: Option<Arc<GeneratedCode>>,
    linear_result: Option<Arc<GeneratedCode>>,
    error: Option<String>,
}

impl Controller {
    pub fn new(config: Config, matrix: Arc<dyn MatrixGenerator>, linear: Arc<dyn LinearGenerator>) -> Self {
        let size = config.size.default;
        Self {
            config,
            matrix,
            linear,
            last_applied: None,
            latest_seq: 0,
            phase: Phase::Idle,
            mode: Mode::Matrix,
            size,
            matrix_result: None,
            linear_result: None,
            error: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The normalized size, written back after every input change.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn view(&self) -> GenerationView {
        GenerationView {
            phase: self.phase,
            mode: self.mode,
            size: self.size,
            image: self.slot(self.mode).clone(),
            error: self.error.clone(),
        }
    }

    /// Re-evaluates the inputs and issues a new request when they resolve to
    /// something different from the last applied request.
    pub fn on_inputs_changed(&mut self, snapshot: InputSnapshot) -> Dispatch {
        self.size = normalize_size(snapshot.size, &self.config.size);

        if snapshot.mode != self.mode {
            debug!(from = ?self.mode, to = ?snapshot.mode, "mode switched");
            *self.slot_mut(self.mode) = None;
            self.mode = snapshot.mode;
        }

        let text = flatten(&snapshot.records, self.config.max_input_chars);
        let filtered = filter_non_empty(&snapshot.records);
        let resolution = resolve(
            &self.config,
            snapshot.mode,
            snapshot.card_mode,
            &text,
            &filtered,
            self.size,
            &snapshot.label,
        );

        if self.last_applied.as_ref() == Some(&resolution) {
            return Dispatch::Unchanged;
        }
        self.last_applied = Some(resolution.clone());

        // Any new state supersedes work in flight, including going idle.
        self.latest_seq += 1;
        let seq = self.latest_seq;

        if resolution.payload().trim().is_empty() {
            self.phase = Phase::Idle;
            self.matrix_result = None;
            self.linear_result = None;
            self.error = None;
            return Dispatch::Idle;
        }

        self.phase = Phase::Pending;
        self.error = None;
        let request = GenerationRequest {
            seq,
            size: self.size,
            card_mode: snapshot.card_mode,
            resolution,
        };

        let (payload, options, token_len) = match &request.resolution {
            Resolution::Linear { payload, options } => {
                let linear = Arc::clone(&self.linear);
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| linear.generate(payload, options)))
                    .unwrap_or_else(|_| Err(GenerateError::Task("barcode generator panicked".to_string())));
                self.complete(Completion {
                    seq,
                    mode: Mode::Linear,
                    payload: payload.clone(),
                    label: options.label.clone(),
                    ecc: None,
                    result,
                });
                return Dispatch::Settled;
            }
            Resolution::Matrix { payload, options, token } => {
                (payload.clone(), options.clone(), token.as_ref().map(String::len))
            }
        };

        let max = self.config.max_token_chars;
        if let Some(len) = token_len.filter(|&len| len > max) {
            self.complete(Completion {
                seq,
                mode: Mode::Matrix,
                payload,
                label: None,
                ecc: Some(options.ecc),
                result: Err(GenerateError::TokenTooLong { len, max }),
            });
            return Dispatch::Settled;
        }

        let future = self.matrix.generate(payload, options);
        debug!(seq, "matrix request issued");
        Dispatch::Pending(Ticket { request, future })
    }

    /// Applies a completion if it belongs to the latest request. Returns
    /// whether the view changed.
    pub fn complete(&mut self, completion: Completion) -> bool {
        if completion.seq != self.latest_seq {
            debug!(seq = completion.seq, latest = self.latest_seq, "discarding superseded result");
            return false;
        }
        let mode = completion.mode;
        match completion.result {
            Ok(image) => {
                info!(seq = completion.seq, ?mode, dimensions = ?image.dimensions(), "code generated");
                *self.slot_mut(mode) = Some(Arc::new(GeneratedCode {
                    seq: completion.seq,
                    mode,
                    payload: completion.payload,
                    label: completion.label,
                    ecc: completion.ecc,
                    image,
                }));
                // Only one mode's output is ever on screen.
                let other = match mode {
                    Mode::Matrix => Mode::Linear,
                    Mode::Linear => Mode::Matrix,
                };
                *self.slot_mut(other) = None;
                self.phase = Phase::Fulfilled;
                self.error = None;
            }
            Err(e) => {
                warn!(seq = completion.seq, ?mode, error = %e, "code generation failed");
                *self.slot_mut(mode) = None;
                self.phase = Phase::Failed;
                self.error = Some(error_message(mode, &e));
            }
        }
        true
    }

    /// Applies the inputs and waits for the result. Convenience for callers
    /// without their own event loop.
    pub async fn update(&mut self, snapshot: InputSnapshot) -> GenerationView {
        if let Dispatch::Pending(ticket) = self.on_inputs_changed(snapshot) {
            let completion = ticket.run().await;
            self.complete(completion);
        }
        self.view()
    }

    fn slot(&self, mode: Mode) -> &Option<Arc<GeneratedCode>> {
        match mode {
            Mode::Matrix => &self.matrix_result,
            Mode::Linear => &self.linear_result,
        }
    }

    fn slot_mut(&mut self, mode: Mode) -> &mut Option<Arc<GeneratedCode>> {
        match mode {
            Mode::Matrix => &mut self.matrix_result,
            Mode::Linear => &mut self.linear_result,
        }
    }
}

/// User-facing message for a generator fault.
pub fn error_message(mode: Mode, error: &GenerateError) -> String {
    match mode {
        Mode::Matrix => format!("QR generation failed: {error}"),
        Mode::Linear => format!("Barcode generation failed: {error}"),
    }
}

/// Sender side of a running [`Driver`].
pub struct DriverHandle {
    pub inputs: mpsc::Sender<InputSnapshot>,
    pub views: watch::Receiver<GenerationView>,
}

/// Event loop owning a controller: snapshots in, views out. Matrix tickets
/// run concurrently; their completions go through the supersession check.
pub struct Driver {
    controller: Controller,
    inputs: mpsc::Receiver<InputSnapshot>,
    views: watch::Sender<GenerationView>,
}

impl Driver {
    /// Spawns the loop on the current tokio runtime. The task ends once every
    /// input sender is dropped and in-flight work has settled.
    pub fn spawn(controller: Controller) -> (DriverHandle, JoinHandle<()>) {
        let (input_tx, input_rx) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(controller.view());
        let driver = Driver {
            controller,
            inputs: input_rx,
            views: view_tx,
        };
        let task = tokio::spawn(driver.run());
        (
            DriverHandle {
                inputs: input_tx,
                views: view_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        let mut in_flight: JoinSet<Completion> = JoinSet::new();
        loop {
            tokio::select! {
                snapshot = self.inputs.recv() => {
                    let Some(snapshot) = snapshot else { break };
                    if let Dispatch::Pending(ticket) = self.controller.on_inputs_changed(snapshot) {
                        in_flight.spawn(ticket.run());
                    }
                    self.publish();
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.settle(joined);
                }
            }
        }
        while let Some(joined) = in_flight.join_next().await {
            self.settle(joined);
        }
    }

    fn settle(&mut self, joined: Result<Completion, tokio::task::JoinError>) {
        match joined {
            Ok(completion) => {
                if self.controller.complete(completion) {
                    self.publish();
                }
            }
            Err(e) => warn!(error = %e, "generation task ended abnormally"),
        }
    }

    fn publish(&self) {
        // No receivers left is fine; the loop still drains its inputs.
        let _ = self.views.send(self.controller.view());
    }
}
