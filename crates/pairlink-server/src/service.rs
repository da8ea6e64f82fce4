//! `SessionService` — the single process-wide pairing session.
//!
//! One `parking_lot::Mutex` guards the session record and the message log
//! together. Every operation, including the token refresh hidden in a
//! disconnected status read, runs under that lock, so no caller can observe
//! a half-applied transition.
//!
//! `dispatch` is fire-and-forget: it spawns one Tokio task per call and keeps
//! no handle. Tasks are unbounded and cannot be cancelled or awaited. A
//! task's outcome is visible only through `last_error` (failures) and the
//! internal message log.

use std::sync::Arc;

use base64::Engine;
use parking_lot::Mutex;
use pairlink_core::{
    normalize_recipient, Message, MessageLog, SessionError, SessionState, StatusSnapshot,
};
use tracing::{error, info, warn};

use crate::dispatch::{draw_outcome, DispatchConfig};
use crate::render::{QrPngRenderer, TokenRenderer};

/// Status snapshot plus the rendered pairing code, if any.
#[derive(Clone, Debug)]
pub struct StatusView {
    pub status: StatusSnapshot,
    /// Base64-encoded PNG of the pairing token. `None` when connected or
    /// when rendering failed.
    pub qr_code_image: Option<String>,
}

/// Acknowledgment returned by [`SessionService::dispatch`]. Says nothing
/// about whether the message will actually be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchAck {
    pub accepted: bool,
}

/// Dispatch counters derived from the message log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub accepted: u64,
    pub sent: u64,
    pub failed: u64,
}

impl DispatchStats {
    pub fn in_flight(&self) -> u64 {
        self.accepted.saturating_sub(self.sent + self.failed)
    }
}

struct Shared {
    state: SessionState,
    log: MessageLog,
    accepted: u64,
}

#[derive(Clone)]
pub struct SessionService {
    shared: Arc<Mutex<Shared>>,
    renderer: Arc<dyn TokenRenderer>,
    dispatch: DispatchConfig,
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new(Arc::new(QrPngRenderer::default()), DispatchConfig::default())
    }
}

impl SessionService {
    pub fn new(renderer: Arc<dyn TokenRenderer>, dispatch: DispatchConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: SessionState::new(),
                log: MessageLog::new(),
                accepted: 0,
            })),
            renderer,
            dispatch,
        }
    }

    /// Current status. While disconnected this issues a new pairing token,
    /// so consecutive calls never return the same one.
    pub fn get_status(&self) -> StatusView {
        let status = self.shared.lock().state.current_status();

        let qr_code_image = status.pairing_token.as_deref().and_then(|token| {
            match self.renderer.render(token) {
                Ok(png) => Some(base64::engine::general_purpose::STANDARD.encode(png)),
                Err(e) => {
                    warn!(error = %e, "failed to render pairing code");
                    None
                }
            }
        });

        StatusView {
            status,
            qr_code_image,
        }
    }

    /// Treat the current token as scanned by `identity`.
    pub fn simulate_pair(&self, identity: &str) {
        self.shared.lock().state.pair(identity);
    }

    pub fn disconnect(&self) {
        self.shared.lock().state.unpair();
    }

    /// Accept a message for asynchronous sending.
    ///
    /// Fails without scheduling anything when no device is paired, when the
    /// recipient normalizes to nothing, or when there is no Tokio runtime to
    /// run the send on. Otherwise returns at once; the send runs on a
    /// detached task.
    pub fn dispatch(&self, recipient: &str, body: &str) -> Result<DispatchAck, SessionError> {
        let recipient = normalize_recipient(recipient);
        let runtime = {
            let mut shared = self.shared.lock();
            if !shared.state.is_connected() {
                return Err(SessionError::NotConnected);
            }
            if recipient.is_empty() {
                return Err(SessionError::EmptyRecipient);
            }
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|_| SessionError::RuntimeUnavailable)?;
            shared.accepted += 1;
            runtime
        };

        info!(recipient = %recipient, "message accepted for dispatch");
        runtime.spawn(run_dispatch_task(
            Arc::clone(&self.shared),
            self.dispatch.clone(),
            recipient.to_owned(),
            body.to_owned(),
        ));

        Ok(DispatchAck { accepted: true })
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().state.is_connected()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().state.last_error().map(str::to_owned)
    }

    pub fn stats(&self) -> DispatchStats {
        let shared = self.shared.lock();
        let sent = shared.log.sent_count() as u64;
        DispatchStats {
            accepted: shared.accepted,
            sent,
            failed: shared.log.len() as u64 - sent,
        }
    }

    /// Copy of the message log. Internal; not exposed over HTTP.
    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().log.snapshot()
    }
}

async fn run_dispatch_task(
    shared: Arc<Mutex<Shared>>,
    config: DispatchConfig,
    recipient: String,
    body: String,
) {
    let latency = config.sample_latency(&mut rand::thread_rng());
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    let outcome = draw_outcome(&mut rand::thread_rng(), config.failure_rate);
    let preview: String = body.chars().take(30).collect();

    match outcome {
        Ok(()) => {
            let message = Message::sent(recipient, body);
            info!(
                message_id = %message.id,
                recipient = %message.recipient,
                preview = %preview,
                "message sent"
            );
            shared.lock().log.push(message);
        }
        Err(reason) => {
            error!(recipient = %recipient, reason = reason.kind(), "message dispatch failed");
            let mut shared = shared.lock();
            shared.state.record_error(reason.to_string());
            shared.log.push(Message::failed(recipient, body, reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlink_core::{DispatchFailure, MessageOutcome, RenderError};
    use std::time::{Duration, Instant};

    struct FailingRenderer;

    impl TokenRenderer for FailingRenderer {
        fn render(&self, _token: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Image("disk on fire".into()))
        }
    }

    fn service_with(failure_rate: f64) -> SessionService {
        SessionService::new(
            Arc::new(QrPngRenderer::new(2)),
            DispatchConfig {
                failure_rate,
                ..DispatchConfig::immediate()
            },
        )
    }

    async fn wait_for_settled(service: &SessionService) -> DispatchStats {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let stats = service.stats();
            if stats.in_flight() == 0 || Instant::now() > deadline {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn status_reads_rotate_token_while_disconnected() {
        let service = service_with(0.0);
        let t1 = service.get_status().status.pairing_token.unwrap();
        let t2 = service.get_status().status.pairing_token.unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn status_includes_image_while_disconnected() {
        let view = service_with(0.0).get_status();
        let image = view.qr_code_image.unwrap();
        let png = base64::engine::general_purpose::STANDARD
            .decode(image)
            .unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn render_failure_keeps_raw_token() {
        let service = SessionService::new(Arc::new(FailingRenderer), DispatchConfig::immediate());
        let view = service.get_status();
        assert!(view.status.pairing_token.is_some());
        assert!(view.qr_code_image.is_none());
    }

    #[test]
    fn connected_status_has_no_token_or_image() {
        let service = service_with(0.0);
        service.simulate_pair("15551234");
        let view = service.get_status();
        assert!(view.status.connected);
        assert!(view.status.pairing_token.is_none());
        assert!(view.qr_code_image.is_none());
        assert_eq!(view.status.identity.as_deref(), Some("15551234"));
    }

    #[test]
    fn dispatch_while_disconnected_is_rejected() {
        let service = service_with(0.0);
        assert_eq!(
            service.dispatch("15551234", "hi"),
            Err(SessionError::NotConnected)
        );
        assert_eq!(service.stats(), DispatchStats::default());
        assert!(service.messages().is_empty());
    }

    #[test]
    fn dispatch_without_runtime_is_an_error() {
        let service = service_with(0.0);
        service.simulate_pair("15550000");
        assert_eq!(
            service.dispatch("15551234", "hi"),
            Err(SessionError::RuntimeUnavailable)
        );
        assert_eq!(service.stats(), DispatchStats::default());
        assert!(service.is_connected());
    }

    #[tokio::test]
    async fn bare_plus_recipient_is_rejected() {
        let service = service_with(0.0);
        service.simulate_pair("15550000");
        for recipient in ["+", ""] {
            assert_eq!(
                service.dispatch(recipient, "hi"),
                Err(SessionError::EmptyRecipient)
            );
        }
        assert_eq!(service.stats(), DispatchStats::default());
    }

    #[tokio::test]
    async fn dispatch_strips_leading_plus() {
        let service = service_with(0.0);
        service.simulate_pair("15550000");
        service.dispatch("+15551234", "hello").unwrap();

        let stats = wait_for_settled(&service).await;
        assert_eq!(stats.sent, 1);
        let messages = service.messages();
        assert_eq!(messages[0].recipient, "15551234");
        assert_eq!(messages[0].body, "hello");
        assert_eq!(messages[0].outcome, MessageOutcome::Sent);
    }

    #[tokio::test]
    async fn dispatch_returns_before_slow_task_finishes() {
        let service = SessionService::new(
            Arc::new(QrPngRenderer::new(2)),
            DispatchConfig {
                failure_rate: 0.0,
                min_latency: Duration::from_millis(300),
                max_latency: Duration::from_millis(300),
            },
        );
        service.simulate_pair("15550000");

        let started = Instant::now();
        let ack = service.dispatch("15551234", "hello").unwrap();
        assert!(ack.accepted);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(service.stats().in_flight(), 1);

        let stats = wait_for_settled(&service).await;
        assert_eq!(stats.sent, 1);
    }

    #[tokio::test]
    async fn failed_dispatch_sets_last_error_only() {
        let service = service_with(1.0);
        service.simulate_pair("15550000");
        service.dispatch("15551234", "hello").unwrap();

        let stats = wait_for_settled(&service).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 0);
        assert!(service.is_connected());

        let last_error = service.last_error().unwrap();
        let known: Vec<String> = DispatchFailure::ALL.iter().map(|f| f.to_string()).collect();
        assert!(known.contains(&last_error), "unexpected: {last_error}");
    }

    #[tokio::test]
    async fn pairing_clears_dispatch_error() {
        let service = service_with(1.0);
        service.simulate_pair("15550000");
        service.dispatch("15551234", "hello").unwrap();
        wait_for_settled(&service).await;
        assert!(service.last_error().is_some());

        service.simulate_pair("15550000");
        assert!(service.last_error().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn observed_failure_rate_is_about_ten_percent() {
        let service = service_with(0.10);
        service.simulate_pair("15550000");

        let trials = 2_000;
        for i in 0..trials {
            service.dispatch(&format!("+1555{i:04}"), "load").unwrap();
        }

        let stats = wait_for_settled(&service).await;
        assert_eq!(stats.accepted, trials);
        assert_eq!(stats.sent + stats.failed, trials);
        let rate = stats.failed as f64 / trials as f64;
        assert!((0.06..=0.14).contains(&rate), "rate = {rate}");

        for m in service.messages() {
            if let MessageOutcome::Failed { reason } = m.outcome {
                let json = serde_json::to_value(reason).unwrap();
                assert!(
                    ["network", "invalid_recipient", "timeout"].contains(&json.as_str().unwrap()),
                    "{json}"
                );
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pair_and_status_keep_invariant() {
        let service = service_with(0.0);
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..200 {
                    match (i + j) % 3 {
                        0 => service.simulate_pair("15551234"),
                        1 => service.disconnect(),
                        _ => {
                            let s = service.get_status().status;
                            assert_eq!(s.connected, s.pairing_token.is_none(), "{s:?}");
                            assert_eq!(s.connected, s.identity.is_some(), "{s:?}");
                            assert_eq!(s.connected, s.connected_at.is_some(), "{s:?}");
                        }
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[test]
    fn pair_unpair_scenario() {
        let service = service_with(0.0);

        let t1 = service.get_status().status.pairing_token.unwrap();
        let t2 = service.get_status().status.pairing_token.unwrap();
        assert_ne!(t1, t2);

        service.simulate_pair("15551234");
        let s = service.get_status().status;
        assert!(s.connected);
        assert!(s.pairing_token.is_none());
        assert_eq!(s.identity.as_deref(), Some("15551234"));

        service.disconnect();
        let s = service.get_status().status;
        assert!(!s.connected);
        let t3 = s.pairing_token.unwrap();
        assert_ne!(t3, t1);
        assert_ne!(t3, t2);
    }
}
