//! Capture/upload session.
//!
//! Only the most recent user action may change what is presented. Every
//! `begin` or `reset` supersedes whatever request is still outstanding; a
//! response that arrives for a superseded request is dropped without
//! touching presented state or history.

use anyhow::Result;
use serde_json::Value;

use crate::detect::{normalize_response, DetectionResult};
use crate::storage::{HistoryPersistence, HistoryStore};
use crate::transport::{DetectionService, ImagePayload};

/// Handle for one in-flight detection request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    image: ImagePayload,
}

impl RequestTicket {
    pub fn image(&self) -> &ImagePayload {
        &self.image
    }
}

/// Outcome of delivering a response to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    /// The response was current: it is now presented and saved.
    Presented {
        result: DetectionResult,
        history_id: String,
    },
    /// A newer action superseded the request; nothing changed.
    Stale,
}

/// User-visible failure message for the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureNotice {
    pub message: String,
}

pub struct AnalysisSession<P: HistoryPersistence> {
    history: HistoryStore<P>,
    generation: u64,
    loading: bool,
    presented: Option<DetectionResult>,
    presented_image: Option<ImagePayload>,
}

impl<P: HistoryPersistence> AnalysisSession<P> {
    pub fn new(history: HistoryStore<P>) -> Self {
        Self {
            history,
            generation: 0,
            loading: false,
            presented: None,
            presented_image: None,
        }
    }

    /// Start a new request for `image`, superseding any outstanding one.
    pub fn begin(&mut self, image: ImagePayload) -> RequestTicket {
        self.generation += 1;
        self.loading = true;
        self.presented = None;
        self.presented_image = Some(image.clone());
        log::debug!("request {} started for {}", self.generation, image.filename);
        RequestTicket {
            generation: self.generation,
            image,
        }
    }

    /// Deliver a raw response for `ticket`.
    pub fn complete(&mut self, ticket: RequestTicket, raw: &Value) -> Completion {
        if !self.is_current(&ticket) {
            log::debug!(
                "dropping response for superseded request {} (current {})",
                ticket.generation,
                self.generation
            );
            return Completion::Stale;
        }
        let result = normalize_response(raw);
        self.loading = false;
        self.presented = Some(result.clone());
        let history_id = self
            .history
            .append(result.clone(), ticket.image.data_url, ticket.image.filename)
            .id
            .clone();
        Completion::Presented { result, history_id }
    }

    /// Report a transport failure for `ticket`.
    ///
    /// Clears loading state for the current request; anything already
    /// presented stays as it is. Failures of superseded requests are ignored.
    pub fn fail(&mut self, ticket: RequestTicket, error: &anyhow::Error) -> Option<FailureNotice> {
        if !self.is_current(&ticket) {
            return None;
        }
        self.loading = false;
        log::warn!("detection request failed: {:#}", error);
        Some(FailureNotice {
            message: format!("Detection failed: {}", error),
        })
    }

    /// Drop presented state and supersede any outstanding request.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.presented = None;
        self.presented_image = None;
    }

    /// Run one request to completion against `service`.
    pub fn run<S: DetectionService + ?Sized>(
        &mut self,
        service: &mut S,
        image: ImagePayload,
    ) -> Result<DetectionResult, FailureNotice> {
        let ticket = self.begin(image);
        match service.detect(ticket.image()) {
            Ok(raw) => match self.complete(ticket, &raw) {
                Completion::Presented { result, .. } => Ok(result),
                Completion::Stale => Err(FailureNotice {
                    message: "request was superseded".to_string(),
                }),
            },
            Err(e) => {
                let notice = self.fail(ticket, &e).unwrap_or_else(|| FailureNotice {
                    message: "request was superseded".to_string(),
                });
                Err(notice)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn presented(&self) -> Option<&DetectionResult> {
        self.presented.as_ref()
    }

    pub fn presented_image(&self) -> Option<&ImagePayload> {
        self.presented_image.as_ref()
    }

    pub fn history(&self) -> &HistoryStore<P> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore<P> {
        &mut self.history
    }

    fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryHistoryPersistence;
    use crate::transport::CannedDetectionService;
    use anyhow::anyhow;
    use serde_json::json;

    fn session() -> AnalysisSession<InMemoryHistoryPersistence> {
        AnalysisSession::new(HistoryStore::open(InMemoryHistoryPersistence::new()))
    }

    fn image(name: &str) -> ImagePayload {
        ImagePayload::from_bytes(name.as_bytes(), "image/png", name)
    }

    #[test]
    fn current_response_is_presented_and_saved() {
        let mut s = session();
        let ticket = s.begin(image("a.png"));
        assert!(s.is_loading());
        let completion = s.complete(ticket, &json!({ "count": 2, "detections": [] }));
        let Completion::Presented { result, history_id } = completion else {
            panic!("expected presented result");
        };
        assert_eq!(result.count, 2);
        assert!(!s.is_loading());
        assert_eq!(s.presented().map(|r| r.count), Some(2));
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history().items()[0].id, history_id);
        assert_eq!(s.history().items()[0].filename, "a.png");
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut s = session();
        let first = s.begin(image("first.png"));
        let second = s.begin(image("second.png"));

        assert_eq!(s.complete(first, &json!({ "count": 9 })), Completion::Stale);
        assert!(s.presented().is_none());
        assert!(s.history().is_empty());
        assert!(s.is_loading());

        assert!(matches!(
            s.complete(second, &json!({ "count": 1 })),
            Completion::Presented { .. }
        ));
        assert_eq!(s.presented().map(|r| r.count), Some(1));
        assert_eq!(s.history().items()[0].filename, "second.png");
    }

    #[test]
    fn reset_supersedes_in_flight_request() {
        let mut s = session();
        let ticket = s.begin(image("a.png"));
        s.reset();
        assert_eq!(s.complete(ticket, &json!({ "count": 1 })), Completion::Stale);
        assert!(s.presented().is_none());
        assert!(s.presented_image().is_none());
        assert!(s.history().is_empty());
    }

    #[test]
    fn failure_clears_loading_and_keeps_history() {
        let mut s = session();
        let ticket = s.begin(image("a.png"));
        s.complete(ticket, &json!({ "count": 4 }));

        let ticket = s.begin(image("b.png"));
        assert!(s.presented().is_none());
        let notice = s.fail(ticket, &anyhow!("connection refused")).expect("notice");
        assert!(notice.message.contains("connection refused"));
        assert!(!s.is_loading());
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn stale_failure_is_silent() {
        let mut s = session();
        let old = s.begin(image("a.png"));
        let _new = s.begin(image("b.png"));
        assert!(s.fail(old, &anyhow!("timeout")).is_none());
        assert!(s.is_loading());
    }

    #[test]
    fn run_uses_service_response() {
        let mut s = session();
        let mut service = CannedDetectionService::new(json!({
            "count": 1,
            "detections": [{
                "confidence": 0.8,
                "bbox": [0.1, 0.1, 0.2, 0.2],
                "label": "microplastic"
            }]
        }));
        let result = s.run(&mut service, image("c.png")).expect("result");
        assert_eq!(result.detections.len(), 1);
        assert_eq!(s.history().len(), 1);
    }

    struct FailingService;

    impl DetectionService for FailingService {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(&mut self, _image: &ImagePayload) -> Result<Value> {
            Err(anyhow!("503 service unavailable"))
        }
    }

    #[test]
    fn run_reports_transport_failure() {
        let mut s = session();
        let notice = s.run(&mut FailingService, image("d.png")).unwrap_err();
        assert!(notice.message.contains("503"));
        assert!(s.history().is_empty());
        assert!(!s.is_loading());
    }
}
