//! Response assembly for streamed renders.
//!
//! The assembler starts the renderer, waits for the client's readiness
//! gate, and hands back status, headers and a streaming body. A single
//! driver task owns all mutable render state, so status changes and
//! resolution are strictly ordered.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, AbortHandle, Abortable};
use futures::StreamExt;
use http::header::{CONTENT_SECURITY_POLICY, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use storefront_core::{ClientClassification, LifecyclePhase, RequestId, ShopDomains};
use storefront_security::{ContentSecurityPolicy, SecurityContext};
use tokio::sync::oneshot;
use tokio::time::{Instant, Sleep};

use crate::body::{self, BodyClosed, BodyWriter, ResponseBody, DEFAULT_BODY_CAPACITY};
use crate::pending::PendingResponse;
use crate::render::{
    LifecycleSignal, MarkupRenderer, RenderError, RenderEvent, RenderOptions, RenderStream,
};

/// Hard ceiling on a single render, measured from `build_response`.
pub const ABORT_DELAY: Duration = Duration::from_millis(5_000);

/// HTML content type set on every assembled response.
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Errors that prevent a response from being assembled.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("shell render failed: {0}")]
    Shell(RenderError),

    #[error("render ended before the response was ready")]
    Incomplete,

    #[error("invalid response header: {0}")]
    Header(String),

    #[error("render driver stopped unexpectedly")]
    Dropped,
}

/// Which lifecycle signal releases the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessGate {
    /// Resolve as soon as the shell is ready.
    ShellReady,
    /// Resolve only once all content is ready.
    AllReady,
}

impl ReadinessGate {
    /// Crawlers get fully rendered markup; everyone else gets the shell first.
    pub fn for_client(classification: ClientClassification) -> Self {
        if classification.is_bot() {
            Self::AllReady
        } else {
            Self::ShellReady
        }
    }

    /// Check whether the gate is open given the signals seen so far.
    pub fn is_open(self, shell_ready: bool, all_ready: bool) -> bool {
        match self {
            Self::ShellReady => shell_ready || all_ready,
            Self::AllReady => all_ready,
        }
    }
}

/// Inputs for one response.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Request identifier used in logs.
    pub request_id: RequestId,
    /// Requested URL (path and query).
    pub url: String,
    /// Who is asking.
    pub classification: ClientClassification,
    /// Status chosen by routing (e.g. 404 for a missing product).
    pub status: StatusCode,
    /// Headers chosen by routing.
    pub headers: HeaderMap,
}

impl RenderRequest {
    /// A 200 request with no extra headers.
    pub fn new(classification: ClientClassification) -> Self {
        Self {
            request_id: RequestId::generate(),
            url: "/".to_string(),
            classification,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Set the request identifier.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Set the requested URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the initial status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set the initial headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// How a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The renderer finished.
    Completed,
    /// The render was cut off by the abort ceiling or a departed client.
    Aborted,
    /// The renderer reported an error.
    Failed,
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

/// Summary of a settled render.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub request_id: RequestId,
    pub classification: ClientClassification,
    pub status: StatusCode,
    pub outcome: RenderOutcome,
    /// Error messages reported by the renderer, in order.
    pub errors: Vec<String>,
    /// Time from `build_response` to resolution.
    pub time_to_resolve: Option<Duration>,
    /// Time from `build_response` to settlement.
    pub elapsed: Duration,
    /// Body bytes delivered to the transport.
    pub bytes: usize,
    /// Non-empty body chunks delivered to the transport.
    pub chunks: usize,
}

/// Resolves to the render report once the body has finished.
#[derive(Debug)]
pub struct Settled(oneshot::Receiver<RenderReport>);

impl Settled {
    /// Wait for the render to settle.
    pub async fn report(self) -> Option<RenderReport> {
        self.0.await.ok()
    }
}

/// A resolved response: status and headers are final, the body streams.
#[derive(Debug)]
pub struct AssembledResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub settled: Settled,
}

/// Builds streamed HTML responses from a markup renderer.
///
/// # Example
///
/// ```rust,ignore
/// let assembler = ResponseAssembler::new(DocumentRenderer, env.shop_domains());
/// let request = RenderRequest::new(ctx.classification).with_status(StatusCode::NOT_FOUND);
/// let response = assembler.build_response(request, document).await?;
/// ```
pub struct ResponseAssembler<R> {
    renderer: R,
    shop: ShopDomains,
    development: bool,
    body_capacity: usize,
}

impl<R: MarkupRenderer> ResponseAssembler<R> {
    /// Create an assembler around a renderer.
    pub fn new(renderer: R, shop: ShopDomains) -> Self {
        Self {
            renderer,
            shop,
            development: false,
            body_capacity: DEFAULT_BODY_CAPACITY,
        }
    }

    /// Allow local development servers in the policy.
    pub fn with_development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    /// Chunks buffered between the driver and the transport.
    pub fn with_body_capacity(mut self, capacity: usize) -> Self {
        self.body_capacity = capacity;
        self
    }

    /// The wrapped renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Security context for a client.
    ///
    /// Crawlers get the shop-aware policy; other clients get the defaults.
    pub fn security_context(&self, classification: ClientClassification) -> SecurityContext {
        let policy = match ReadinessGate::for_client(classification) {
            ReadinessGate::AllReady => ContentSecurityPolicy::new().with_shop(&self.shop),
            ReadinessGate::ShellReady => ContentSecurityPolicy::new(),
        };
        policy.with_development(self.development).build()
    }

    /// Render a tree and resolve once the client's readiness gate opens.
    ///
    /// The abort ceiling is armed immediately. Rendering continues in the
    /// background after resolution; await `settled` for the final report.
    pub async fn build_response(
        &self,
        request: RenderRequest,
        tree: R::Tree,
    ) -> Result<AssembledResponse, AssembleError> {
        let deadline = Box::pin(tokio::time::sleep(ABORT_DELAY));
        let started = Instant::now();

        let security = self.security_context(request.classification);
        let policy = HeaderValue::from_str(&security.header)
            .map_err(|e| AssembleError::Header(e.to_string()))?;

        let options = RenderOptions {
            nonce: security.nonce.clone(),
        };
        let events = self.renderer.render(security.scope.wrap(tree), options);
        let (events, abort_handle) = stream::abortable(events);

        let (pending, response) = PendingResponse::new();
        let (writer, body) = body::channel(self.body_capacity);
        let (report_tx, report_rx) = oneshot::channel();

        tracing::debug!(
            request_id = %request.request_id,
            url = %request.url,
            client = request.classification.name(),
            "render started"
        );

        let driver = Driver {
            gate: ReadinessGate::for_client(request.classification),
            request_id: request.request_id,
            classification: request.classification,
            status: request.status,
            headers: request.headers,
            policy,
            events,
            abort_handle,
            abort_reason: None,
            deadline,
            phase: LifecyclePhase::Rendering,
            pending,
            writer: Some(writer),
            body: Some(body),
            settled: Some(Settled(report_rx)),
            report_tx: Some(report_tx),
            buffer: Vec::new(),
            shell_ready: false,
            all_ready: false,
            errors: Vec::new(),
            started,
            resolved_at: None,
        };
        tokio::spawn(driver.run());

        response.await.unwrap_or(Err(AssembleError::Dropped))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortReason {
    Deadline,
    Disconnected,
    ShellFailed,
}

enum Step {
    Deadline,
    Event(Option<RenderEvent>),
}

enum Flow {
    Continue,
    Stop,
}

struct Driver {
    request_id: RequestId,
    classification: ClientClassification,
    gate: ReadinessGate,
    status: StatusCode,
    headers: HeaderMap,
    policy: HeaderValue,
    events: Abortable<RenderStream>,
    abort_handle: AbortHandle,
    abort_reason: Option<AbortReason>,
    deadline: Pin<Box<Sleep>>,
    phase: LifecyclePhase,
    pending: PendingResponse<AssembledResponse, AssembleError>,
    writer: Option<BodyWriter>,
    body: Option<ResponseBody>,
    settled: Option<Settled>,
    report_tx: Option<oneshot::Sender<RenderReport>>,
    /// Chunks produced before resolution.
    buffer: Vec<Bytes>,
    shell_ready: bool,
    all_ready: bool,
    errors: Vec<String>,
    started: Instant,
    resolved_at: Option<Instant>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                biased;
                _ = &mut self.deadline, if self.abort_reason.is_none() => Step::Deadline,
                event = self.events.next() => Step::Event(event),
            };

            let flow = match step {
                Step::Deadline => {
                    self.abort(AbortReason::Deadline);
                    Flow::Continue
                }
                Step::Event(Some(event)) => self.handle(event).await,
                Step::Event(None) => Flow::Stop,
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        self.settle().await;
    }

    fn is_resolved(&self) -> bool {
        self.phase == LifecyclePhase::Resolved
    }

    async fn handle(&mut self, event: RenderEvent) -> Flow {
        match event {
            RenderEvent::Chunk(chunk) if self.is_resolved() => self.forward(chunk).await,
            RenderEvent::Chunk(chunk) => {
                self.buffer.push(chunk);
                Flow::Continue
            }
            RenderEvent::Signal(signal) => self.on_signal(signal).await,
        }
    }

    async fn on_signal(&mut self, signal: LifecycleSignal) -> Flow {
        match signal {
            LifecycleSignal::ShellReady => {
                self.shell_ready = true;
                self.try_resolve().await
            }
            LifecycleSignal::AllReady => {
                self.all_ready = true;
                self.try_resolve().await
            }
            LifecycleSignal::ShellError(error) => {
                self.errors.push(error.to_string());
                if self.is_resolved() {
                    tracing::error!(
                        request_id = %self.request_id,
                        error = %error,
                        "shell error after response was sent"
                    );
                    return Flow::Continue;
                }

                tracing::error!(request_id = %self.request_id, error = %error, "shell render failed");
                self.phase = LifecyclePhase::Failed(error.to_string());
                self.abort(AbortReason::ShellFailed);
                self.pending.reject(AssembleError::Shell(error));
                Flow::Stop
            }
            LifecycleSignal::StreamError(error) => {
                tracing::error!(
                    request_id = %self.request_id,
                    error = %error,
                    resolved = self.is_resolved(),
                    "stream error"
                );
                self.errors.push(error.to_string());
                if !self.is_resolved() {
                    self.status = StatusCode::INTERNAL_SERVER_ERROR;
                }
                Flow::Continue
            }
        }
    }

    async fn try_resolve(&mut self) -> Flow {
        if self.is_resolved() || !self.gate.is_open(self.shell_ready, self.all_ready) {
            return Flow::Continue;
        }
        self.resolve().await
    }

    /// Hand status, headers and body to the waiter, then flush buffered markup.
    async fn resolve(&mut self) -> Flow {
        let (Some(body), Some(settled)) = (self.body.take(), self.settled.take()) else {
            return Flow::Stop;
        };

        let mut headers = std::mem::take(&mut self.headers);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
        headers.insert(CONTENT_SECURITY_POLICY, self.policy.clone());

        let response = AssembledResponse {
            status: self.status,
            headers,
            body,
            settled,
        };

        self.phase = LifecyclePhase::Resolved;
        self.resolved_at = Some(Instant::now());
        tracing::debug!(
            request_id = %self.request_id,
            status = self.status.as_u16(),
            buffered = self.buffer.len(),
            "response resolved"
        );

        if !self.pending.resolve(response) {
            self.abort(AbortReason::Disconnected);
            return Flow::Stop;
        }

        for chunk in std::mem::take(&mut self.buffer) {
            if let Flow::Stop = self.forward(chunk).await {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Send a chunk to the transport, racing the abort ceiling.
    ///
    /// A chunk already taken from the renderer is always delivered, even
    /// when the ceiling fires while the transport is applying backpressure.
    async fn forward(&mut self, chunk: Bytes) -> Flow {
        let Some(writer) = self.writer.as_mut() else {
            return Flow::Stop;
        };

        let sent = tokio::select! {
            biased;
            _ = &mut self.deadline, if self.abort_reason.is_none() => None,
            result = writer.write(chunk.clone()) => Some(result),
        };

        let sent = match sent {
            Some(result) => result,
            None => {
                self.abort(AbortReason::Deadline);
                match self.writer.as_mut() {
                    Some(writer) => writer.write(chunk).await,
                    None => return Flow::Stop,
                }
            }
        };

        match sent {
            Ok(()) => Flow::Continue,
            Err(BodyClosed) => {
                self.abort(AbortReason::Disconnected);
                Flow::Stop
            }
        }
    }

    /// Cancel the renderer. Only the first call has any effect.
    fn abort(&mut self, reason: AbortReason) {
        if self.abort_reason.is_some() {
            return;
        }
        self.abort_reason = Some(reason);
        self.abort_handle.abort();

        match reason {
            AbortReason::Deadline => tracing::warn!(
                request_id = %self.request_id,
                resolved = self.is_resolved(),
                limit_ms = ABORT_DELAY.as_millis() as u64,
                "render exceeded abort ceiling"
            ),
            AbortReason::Disconnected => tracing::debug!(
                request_id = %self.request_id,
                "response consumer went away"
            ),
            AbortReason::ShellFailed => {}
        }
    }

    async fn settle(mut self) {
        if !self.pending.is_settled() {
            // A shell without AllReady still counts as a finished render;
            // an aborted render resolves with whatever it produced.
            if self.shell_ready || self.abort_reason == Some(AbortReason::Deadline) {
                self.resolve().await;
            } else {
                tracing::error!(request_id = %self.request_id, "render ended without a shell");
                self.phase = LifecyclePhase::Failed(RenderError::Incomplete.to_string());
                self.pending.reject(AssembleError::Incomplete);
            }
        }

        let (bytes, chunks) = self
            .writer
            .take()
            .map(|w| (w.bytes_written(), w.chunks_written()))
            .unwrap_or_default();
        let outcome = match self.abort_reason {
            Some(AbortReason::ShellFailed) => RenderOutcome::Failed,
            Some(AbortReason::Deadline) | Some(AbortReason::Disconnected) => RenderOutcome::Aborted,
            None if !self.errors.is_empty() => RenderOutcome::Failed,
            None => RenderOutcome::Completed,
        };
        if self.is_resolved() {
            self.phase = LifecyclePhase::Settled;
        }

        let report = RenderReport {
            request_id: self.request_id.clone(),
            classification: self.classification,
            status: self.status,
            outcome,
            errors: std::mem::take(&mut self.errors),
            time_to_resolve: self.resolved_at.map(|t| t.duration_since(self.started)),
            elapsed: self.started.elapsed(),
            bytes,
            chunks,
        };

        tracing::info!(
            request_id = %report.request_id,
            client = report.classification.name(),
            status = report.status.as_u16(),
            outcome = report.outcome.as_str(),
            phase = ?self.phase,
            bytes = report.bytes,
            chunks = report.chunks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "render settled"
        );

        if let Some(tx) = self.report_tx.take() {
            let _ = tx.send(report);
        }
    }
}
