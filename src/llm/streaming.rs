//! Streaming response handling
//!
//! A streamed completion is an ordered channel of text fragments: the
//! client task pushes fragments as they arrive from the upstream model,
//! the consumer drains them in arrival order, and closing the channel is
//! the terminal "done" marker. Dropping the response cancels the stream
//! without error.

use tokio::sync::mpsc;

use crate::errors::Result;

/// Ordered channel of text fragments from a streamed LLM completion
pub struct StreamingResponse {
    rx: mpsc::Receiver<Result<String>>,
}

impl StreamingResponse {
    pub(crate) fn new(rx: mpsc::Receiver<Result<String>>) -> Self {
        Self { rx }
    }

    /// Next fragment in arrival order; `None` once the stream is done
    pub async fn next_chunk(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    /// Collect all fragments into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(chunk) = self.next_chunk().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_all_preserves_order() {
        let (tx, rx) = mpsc::channel(4);
        let response = StreamingResponse::new(rx);

        tokio::spawn(async move {
            for chunk in ["你好", "，", "世界"] {
                tx.send(Ok(chunk.to_string())).await.unwrap();
            }
        });

        assert_eq!(response.collect_all().await.unwrap(), "你好，世界");
    }

    #[tokio::test]
    async fn test_closed_channel_terminates_stream() {
        let (tx, rx) = mpsc::channel::<Result<String>>(1);
        drop(tx);

        let mut response = StreamingResponse::new(rx);
        assert!(response.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn test_error_chunk_propagates() {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            tx.send(Err(crate::SupportRagError::Llm("upstream closed".to_string())))
                .await
                .unwrap();
        });

        let response = StreamingResponse::new(rx);
        assert!(response.collect_all().await.is_err());
    }
}
