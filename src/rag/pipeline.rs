//! Chat orchestration: retrieve, assemble, inject, generate

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::llm::ChatMessage;
use crate::llm::LlmClient;
use crate::llm::StreamingResponse;
use crate::rag::CaseMatch;
use crate::rag::ContextAssembler;
use crate::rag::KnowledgeSource;

/// Persona line for the injected system instruction
const SYSTEM_PERSONA: &str = "你是智能客服助手。";

/// Instruction appended after the rendered context
const CONTEXT_INSTRUCTION: &str = "\n请基于历史案例和你的知识回答用户问题。";

/// Retrieval-augmented chat service.
///
/// Works against any [`KnowledgeSource`], so the lexical and semantic
/// backends are interchangeable here.
pub struct RagService {
    source: Arc<dyn KnowledgeSource>,
    assembler: ContextAssembler,
    llm: LlmClient,
    search_limit: usize,
}

impl RagService {
    pub fn new(source: Arc<dyn KnowledgeSource>, llm: LlmClient, config: &AppConfig) -> Self {
        Self {
            source,
            assembler: ContextAssembler::new(),
            llm,
            search_limit: config.search_limit(),
        }
    }

    /// Generate an answer for the conversation, augmented with relevant
    /// historical cases.
    pub async fn chat(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        let enhanced = self.build_messages(messages).await?;
        self.llm.generate(&enhanced, model).await
    }

    /// Streaming variant of [`RagService::chat`]
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<StreamingResponse> {
        let enhanced = self.build_messages(messages).await?;
        self.llm.generate_stream(&enhanced, model).await
    }

    /// Retrieve matches without generation
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<CaseMatch>> {
        self.source.search_relevant(query, limit).await
    }

    /// Prepend exactly one system message to the conversation: persona
    /// plus rendered context when retrieval found anything, persona alone
    /// otherwise. User and assistant turns are never altered.
    pub(crate) async fn build_messages(&self, messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        let query = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let matches = self.source.search_relevant(query, self.search_limit).await?;
        debug!("Retrieved {} cases for context", matches.len());

        let context = self.assembler.format_as_context(&matches);

        let system = if context.is_empty() {
            ChatMessage::system(SYSTEM_PERSONA)
        } else {
            info!("Injecting context with {} cases", matches.len());
            ChatMessage::system(format!("{SYSTEM_PERSONA}{context}{CONTEXT_INSTRUCTION}"))
        };

        let mut enhanced = Vec::with_capacity(messages.len() + 1);
        enhanced.push(system);
        enhanced.extend_from_slice(messages);
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::llm::ChatRole;
    use crate::models::Ticket;
    use crate::models::TicketWithReplies;

    struct StubSource {
        matches: Vec<CaseMatch>,
    }

    #[async_trait]
    impl KnowledgeSource for StubSource {
        async fn search_relevant(&self, _query: &str, limit: usize) -> Result<Vec<CaseMatch>> {
            Ok(self.matches.iter().take(limit).cloned().collect())
        }
    }

    fn service_with(matches: Vec<CaseMatch>) -> RagService {
        let config = AppConfig::default();
        RagService::new(
            Arc::new(StubSource { matches }),
            LlmClient::new(&config).unwrap(),
            &config,
        )
    }

    fn one_match() -> CaseMatch {
        CaseMatch::Ticket(TicketWithReplies {
            ticket: Ticket {
                id: Uuid::new_v4(),
                original_id: 1,
                title: "发货延迟问题".to_string(),
                description: None,
                category: Some("物流".to_string()),
                created_at: Utc::now(),
            },
            replies: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_injects_single_system_message_with_context() {
        let service = service_with(vec![one_match()]);
        let conversation = vec![
            ChatMessage::user("之前的问题"),
            ChatMessage::assistant("好的"),
            ChatMessage::user("我的订单没发货"),
        ];

        let enhanced = service.build_messages(&conversation).await.unwrap();

        assert_eq!(enhanced.len(), 4);
        assert_eq!(enhanced[0].role, ChatRole::System);
        assert!(enhanced[0].content.starts_with(SYSTEM_PERSONA));
        assert!(enhanced[0].content.contains("【案例1】"));
        assert!(enhanced[0].content.contains("发货延迟问题"));

        // The live conversation passes through untouched
        assert_eq!(enhanced[1].content, "之前的问题");
        assert_eq!(enhanced[2].content, "好的");
        assert_eq!(enhanced[3].content, "我的订单没发货");
        assert_eq!(
            enhanced.iter().filter(|m| m.role == ChatRole::System).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_no_matches_injects_persona_only() {
        let service = service_with(Vec::new());
        let conversation = vec![ChatMessage::user("在吗")];

        let enhanced = service.build_messages(&conversation).await.unwrap();

        assert_eq!(enhanced.len(), 2);
        assert_eq!(enhanced[0].content, SYSTEM_PERSONA);
    }

    #[tokio::test]
    async fn test_empty_conversation_still_builds() {
        let service = service_with(Vec::new());
        let enhanced = service.build_messages(&[]).await.unwrap();
        assert_eq!(enhanced.len(), 1);
        assert_eq!(enhanced[0].role, ChatRole::System);
    }
}
