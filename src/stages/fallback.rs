//! Sequential first-success invocation across reasoning backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{LangbaseResult, ReasoningError};
use crate::langbase::Message;

/// One reasoning request as handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation, system message first.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output cap; `None` lets the backend apply its configured default.
    pub max_tokens: Option<u32>,
}

/// A text-completion backend the invoker can fall back across.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Stable name used in logs and failure records.
    fn name(&self) -> &str;

    /// Run the request once and return the completion text.
    async fn complete(&self, request: &CompletionRequest) -> LangbaseResult<String>;
}

/// A backend attempt that failed before a later one succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFailure {
    /// Backend name.
    pub backend: String,
    /// Failure message.
    pub error: String,
}

/// Successful completion plus the failures that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Backend that produced the text.
    pub backend: String,
    /// Completion text, verbatim.
    pub text: String,
    /// Earlier backends that failed, in order.
    pub failures: Vec<BackendFailure>,
}

/// Tries each backend in order and returns the first success.
///
/// Backends are attempted strictly one at a time, each at most once per call.
#[derive(Clone)]
pub struct ReasoningInvoker {
    backends: Vec<Arc<dyn ReasoningBackend>>,
    max_tokens: Option<u32>,
}

impl ReasoningInvoker {
    /// Create an invoker over backends in priority order.
    pub fn new(backends: Vec<Arc<dyn ReasoningBackend>>) -> Self {
        Self {
            backends,
            max_tokens: None,
        }
    }

    /// Cap the output size of every request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Backend names in attempt order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Invoke the backends in order until one succeeds.
    pub async fn invoke(
        &self,
        messages: Vec<Message>,
        temperature: f64,
    ) -> Result<Completion, ReasoningError> {
        let request = CompletionRequest {
            messages,
            temperature,
            max_tokens: self.max_tokens,
        };
        let mut failures = Vec::new();

        for backend in &self.backends {
            let start = Instant::now();
            debug!(backend = backend.name(), temperature, "Invoking reasoning backend");

            match backend.complete(&request).await {
                Ok(text) => {
                    info!(
                        backend = backend.name(),
                        latency_ms = start.elapsed().as_millis(),
                        fallbacks = failures.len(),
                        "Reasoning backend succeeded"
                    );
                    return Ok(Completion {
                        backend: backend.name().to_string(),
                        text,
                        failures,
                    });
                }
                Err(e) => {
                    warn!(
                        backend = backend.name(),
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        "Reasoning backend failed, trying next"
                    );
                    failures.push(BackendFailure {
                        backend: backend.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let last_error = failures
            .last()
            .map(|f| f.error.clone())
            .unwrap_or_else(|| "no reasoning backends configured".to_string());

        Err(ReasoningError::AllBackendsExhausted {
            attempts: failures.len(),
            last_error,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LangbaseError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays scripted outcomes and counts calls.
    pub(crate) struct ScriptedBackend {
        name: String,
        outcomes: Mutex<VecDeque<Result<String, String>>>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(name: &str, outcomes: Vec<Result<&str, &str>>) -> Self {
            Self {
                name: name.to_string(),
                outcomes: Mutex::new(
                    outcomes
                        .into_iter()
                        .map(|o| o.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn ok(name: &str, text: &str) -> Self {
            Self::new(name, vec![Ok(text)])
        }

        pub(crate) fn failing(name: &str) -> Self {
            Self::new(name, vec![Err("quota exceeded")])
        }
    }

    #[async_trait]
    impl ReasoningBackend for ScriptedBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, request: &CompletionRequest) -> LangbaseResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            match self.outcomes.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(LangbaseError::Api {
                    status: 429,
                    message,
                }),
                None => Err(LangbaseError::InvalidResponse {
                    message: "script exhausted".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_after_three_failures() {
        let a = Arc::new(ScriptedBackend::failing("a"));
        let b = Arc::new(ScriptedBackend::failing("b"));
        let c = Arc::new(ScriptedBackend::failing("c"));
        let d = Arc::new(ScriptedBackend::ok("d", "verdict text"));
        let invoker = ReasoningInvoker::new(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

        let completion = invoker
            .invoke(vec![Message::user("claim")], 0.2)
            .await
            .unwrap();

        assert_eq!(completion.text, "verdict text");
        assert_eq!(completion.backend, "d");
        assert_eq!(completion.failures.len(), 3);
        assert_eq!(completion.failures[0].backend, "a");
        assert_eq!(completion.failures[2].backend, "c");
        for backend in [&a, &b, &c, &d] {
            assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let a = Arc::new(ScriptedBackend::ok("a", "first"));
        let b = Arc::new(ScriptedBackend::ok("b", "second"));
        let invoker = ReasoningInvoker::new(vec![a.clone(), b.clone()]);

        let completion = invoker.invoke(vec![], 0.0).await.unwrap();
        assert_eq!(completion.text, "first");
        assert!(completion.failures.is_empty());
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_backends_exhausted() {
        let invoker = ReasoningInvoker::new(vec![
            Arc::new(ScriptedBackend::failing("a")),
            Arc::new(ScriptedBackend::failing("b")),
        ]);

        let err = invoker.invoke(vec![], 0.0).await.unwrap_err();
        let ReasoningError::AllBackendsExhausted {
            attempts,
            last_error,
        } = err;
        assert_eq!(attempts, 2);
        assert!(last_error.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_backend_list_is_exhausted() {
        let err = ReasoningInvoker::new(vec![])
            .invoke(vec![], 0.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("All 0 reasoning backends failed"));
    }

    #[tokio::test]
    async fn test_request_carries_temperature_and_cap() {
        let a = Arc::new(ScriptedBackend::ok("a", "x"));
        let invoker = ReasoningInvoker::new(vec![a.clone()]).with_max_tokens(256);

        invoker
            .invoke(vec![Message::system("s"), Message::user("u")], 0.2)
            .await
            .unwrap();

        let requests = a.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.2);
        assert_eq!(requests[0].max_tokens, Some(256));
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[test]
    fn test_backend_names_in_order() {
        let invoker = ReasoningInvoker::new(vec![
            Arc::new(ScriptedBackend::ok("primary", "")),
            Arc::new(ScriptedBackend::ok("secondary", "")),
        ]);
        assert_eq!(invoker.backend_names(), vec!["primary", "secondary"]);
    }
}
