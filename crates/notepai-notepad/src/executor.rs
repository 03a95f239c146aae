use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use notepai_ai::api::{
    AutocompleteRequest, AutocompleteResponse, ComposerRequest, ComposerResponse,
    QuickEditRequest, QuickEditResponse,
};
use notepai_ai::{AiError, Backend};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::debug;

/// Identifies a request so its reply can be matched (or discarded).
pub type RequestId = u64;

/// Command sent from the UI thread to the executor thread.
#[derive(Debug)]
pub enum AiRequest {
    Autocomplete {
        id: RequestId,
        req: AutocompleteRequest,
    },
    QuickEdit {
        id: RequestId,
        req: QuickEditRequest,
    },
    Compose {
        id: RequestId,
        req: ComposerRequest,
    },
}

impl AiRequest {
    pub fn id(&self) -> RequestId {
        match self {
            AiRequest::Autocomplete { id, .. }
            | AiRequest::QuickEdit { id, .. }
            | AiRequest::Compose { id, .. } => *id,
        }
    }
}

/// Result received from the executor thread, tagged with the request id.
#[derive(Debug)]
pub enum AiReply {
    Autocomplete {
        id: RequestId,
        result: Result<AutocompleteResponse, AiError>,
    },
    QuickEdit {
        id: RequestId,
        result: Result<QuickEditResponse, AiError>,
    },
    Compose {
        id: RequestId,
        result: Result<ComposerResponse, AiError>,
    },
}

/// Sender/Receiver pair for communicating with the executor.
///
/// Requests are spawned as independent tasks, so replies may come back in
/// any order.
pub struct AiExecutor {
    sender: tokio_mpsc::UnboundedSender<AiRequest>,
    receiver: mpsc::Receiver<AiReply>,
}

impl AiExecutor {
    /// Spawn the background executor thread with a tokio runtime.
    pub fn spawn(backend: Arc<dyn Backend>) -> anyhow::Result<Self> {
        let (cmd_tx, mut cmd_rx) = tokio_mpsc::unbounded_channel::<AiRequest>();
        let (result_tx, result_rx) = mpsc::channel::<AiReply>();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        thread::Builder::new()
            .name("notepai-ai".to_string())
            .spawn(move || {
                rt.block_on(async move {
                    while let Some(request) = cmd_rx.recv().await {
                        let backend = Arc::clone(&backend);
                        let result_tx = result_tx.clone();
                        tokio::spawn(async move {
                            let reply = execute(backend.as_ref(), request).await;
                            // Main thread dropped the receiver
                            let _ = result_tx.send(reply);
                        });
                    }
                });
            })
            .context("Failed to spawn executor thread")?;

        Ok(Self {
            sender: cmd_tx,
            receiver: result_rx,
        })
    }

    /// An executor with no thread behind it. The returned ends let the
    /// caller observe requests and inject replies.
    pub fn loopback() -> (
        Self,
        tokio_mpsc::UnboundedReceiver<AiRequest>,
        mpsc::Sender<AiReply>,
    ) {
        let (cmd_tx, cmd_rx) = tokio_mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::channel();
        (
            Self {
                sender: cmd_tx,
                receiver: result_rx,
            },
            cmd_rx,
            result_tx,
        )
    }

    /// Send a request (non-blocking). Returns false if the executor is gone.
    pub fn send(&self, request: AiRequest) -> bool {
        debug!(id = request.id(), "dispatching request");
        self.sender.send(request).is_ok()
    }

    /// Try to receive a reply (non-blocking).
    pub fn try_recv(&self) -> Option<AiReply> {
        self.receiver.try_recv().ok()
    }
}

async fn execute(backend: &dyn Backend, request: AiRequest) -> AiReply {
    match request {
        AiRequest::Autocomplete { id, req } => AiReply::Autocomplete {
            id,
            result: backend.autocomplete(req).await,
        },
        AiRequest::QuickEdit { id, req } => AiReply::QuickEdit {
            id,
            result: backend.quick_edit(req).await,
        },
        AiRequest::Compose { id, req } => AiReply::Compose {
            id,
            result: backend.compose(req).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notepai_ai::Result as AiResult;
    use std::time::{Duration, Instant};

    /// Backend answering every call with the request text.
    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        async fn autocomplete(&self, req: AutocompleteRequest) -> AiResult<AutocompleteResponse> {
            Ok(AutocompleteResponse {
                completion: req.text,
            })
        }

        async fn quick_edit(&self, req: QuickEditRequest) -> AiResult<QuickEditResponse> {
            Ok(QuickEditResponse {
                result: req.instruction,
            })
        }

        async fn compose(&self, req: ComposerRequest) -> AiResult<ComposerResponse> {
            Ok(ComposerResponse {
                response: req.message,
                new_content: None,
            })
        }
    }

    #[test]
    fn test_loopback_carries_requests_and_replies() {
        let (executor, mut requests, replies) = AiExecutor::loopback();
        assert!(executor.send(AiRequest::Autocomplete {
            id: 7,
            req: AutocompleteRequest {
                text: "hello world".into(),
            },
        }));
        assert_eq!(requests.try_recv().unwrap().id(), 7);

        replies
            .send(AiReply::Autocomplete {
                id: 7,
                result: Ok(AutocompleteResponse::default()),
            })
            .unwrap();
        assert!(matches!(
            executor.try_recv(),
            Some(AiReply::Autocomplete { id: 7, .. })
        ));
        assert!(executor.try_recv().is_none());
    }

    #[test]
    fn test_spawned_executor_round_trip() {
        let executor = AiExecutor::spawn(Arc::new(EchoBackend)).unwrap();
        executor.send(AiRequest::QuickEdit {
            id: 1,
            req: QuickEditRequest {
                instruction: "shout".into(),
                ..Default::default()
            },
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let reply = loop {
            if let Some(reply) = executor.try_recv() {
                break reply;
            }
            assert!(Instant::now() < deadline, "no reply from executor");
            thread::sleep(Duration::from_millis(5));
        };
        match reply {
            AiReply::QuickEdit { id, result } => {
                assert_eq!(id, 1);
                assert_eq!(result.unwrap().result, "shout");
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
