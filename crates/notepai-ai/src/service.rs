//! Endpoint semantics on top of an [`LlmProvider`].

use async_trait::async_trait;
use tracing::debug;

use crate::api::{
    AutocompleteRequest, AutocompleteResponse, ComposerRequest, ComposerResponse,
    QuickEditRequest, QuickEditResponse,
};
use crate::backend::Backend;
use crate::cleanup::{clean_completion, clean_composer, clean_quick_edit};
use crate::context::{AUTOCOMPLETE_CONTEXT_CHARS, last_chars, worth_completing};
use crate::error::{AiError, Result};
use crate::prompt;
use crate::provider::LlmProvider;

/// The three endpoints, independent of transport. Used directly by the
/// server and in-process by the terminal client.
pub struct AiService<P> {
    provider: P,
}

impl<P: LlmProvider> AiService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Predict the continuation of `req.text`. Short input yields an empty
    /// completion without calling the model.
    pub async fn autocomplete(&self, req: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        if !worth_completing(&req.text) {
            return Ok(AutocompleteResponse::default());
        }
        let context = last_chars(&req.text, AUTOCOMPLETE_CONTEXT_CHARS);
        let raw = self.provider.generate(prompt::autocomplete(context)).await?;
        let completion = clean_completion(&raw, context);
        debug!(len = completion.len(), "autocomplete done");
        Ok(AutocompleteResponse { completion })
    }

    /// Rewrite the selection, or generate text at the cursor when nothing is
    /// selected.
    pub async fn quick_edit(&self, req: &QuickEditRequest) -> Result<QuickEditResponse> {
        if req.instruction.trim().is_empty() {
            return Err(AiError::InvalidRequest("Instruction is required".to_string()));
        }
        let raw = self.provider.generate(prompt::quick_edit(req)).await?;
        let result = clean_quick_edit(&raw);
        debug!(generating = req.is_generating(), len = result.len(), "quick edit done");
        Ok(QuickEditResponse { result })
    }

    /// One composer turn. A replacement note is only returned in agent mode.
    pub async fn compose(&self, req: &ComposerRequest) -> Result<ComposerResponse> {
        if req.message.trim().is_empty() {
            return Err(AiError::InvalidRequest("Message is required".to_string()));
        }
        let raw = self.provider.generate(prompt::composer(req)).await?;
        let (response, new_content) = clean_composer(&raw, req.mode);
        debug!(
            mode = req.mode.label(),
            proposes_change = new_content.is_some(),
            "composer done"
        );
        Ok(ComposerResponse {
            response,
            new_content,
        })
    }
}

#[async_trait]
impl<P: LlmProvider> Backend for AiService<P> {
    async fn autocomplete(&self, req: AutocompleteRequest) -> Result<AutocompleteResponse> {
        AiService::autocomplete(self, &req).await
    }

    async fn quick_edit(&self, req: QuickEditRequest) -> Result<QuickEditResponse> {
        AiService::quick_edit(self, &req).await
    }

    async fn compose(&self, req: ComposerRequest) -> Result<ComposerResponse> {
        AiService::compose(self, &req).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::ComposerMode;
    use crate::prompt::Prompt;
    use std::sync::Mutex;

    /// Provider returning a canned reply and recording prompts.
    pub struct StubProvider {
        reply: std::result::Result<String, ()>,
        pub prompts: Mutex<Vec<Prompt>>,
    }

    impl StubProvider {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn generate(&self, prompt: Prompt) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt);
            self.reply.clone().map_err(|_| AiError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_autocomplete_skips_short_text() {
        let service = AiService::new(StubProvider::replying("never"));
        let resp = service
            .autocomplete(&AutocompleteRequest { text: " abc ".into() })
            .await
            .unwrap();
        assert_eq!(resp.completion, "");
        assert_eq!(service.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_autocomplete_cleans_reply() {
        let service = AiService::new(StubProvider::replying("\"ps over the lazy dog.\""));
        let resp = service
            .autocomplete(&AutocompleteRequest {
                text: "The quick brown fox jum".into(),
            })
            .await
            .unwrap();
        assert_eq!(resp.completion, "ps over the lazy dog.");
        let prompts = service.provider().prompts.lock().unwrap();
        assert!(prompts[0].user.ends_with("The quick brown fox jum"));
    }

    #[tokio::test]
    async fn test_quick_edit_requires_instruction() {
        let service = AiService::new(StubProvider::replying("x"));
        let err = service
            .quick_edit(&QuickEditRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(service.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_quick_edit_fix_spelling() {
        let service = AiService::new(StubProvider::replying("'the'"));
        let resp = service
            .quick_edit(&QuickEditRequest {
                instruction: "fix spelling".into(),
                selected_text: "teh".into(),
                before_context: "I went to ".into(),
                after_context: " store".into(),
            })
            .await
            .unwrap();
        assert_eq!(resp.result, "the");
    }

    #[tokio::test]
    async fn test_compose_chat_mode_never_proposes() {
        let service =
            AiService::new(StubProvider::replying("Done <new_content>changed</new_content>"));
        let mut req = ComposerRequest {
            message: "rewrite".into(),
            mode: ComposerMode::Chat,
            ..Default::default()
        };
        let resp = service.compose(&req).await.unwrap();
        assert_eq!(resp.new_content, None);

        req.mode = ComposerMode::Agent;
        let resp = service.compose(&req).await.unwrap();
        assert_eq!(resp.response, "Done");
        assert_eq!(resp.new_content.as_deref(), Some("changed"));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let service = AiService::new(StubProvider::failing());
        let req = ComposerRequest {
            message: "hi".into(),
            ..Default::default()
        };
        assert!(service.compose(&req).await.is_err());
    }
}
