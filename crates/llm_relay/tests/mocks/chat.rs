use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use llm_relay::{ChatModel, ChatRequest};

/// Hands out scripted replies in order and records every request.
#[derive(Clone)]
pub struct MockChatModel {
    pub replies: Arc<Mutex<VecDeque<String>>>,
    pub calls: Arc<Mutex<Vec<ChatRequest>>>,
    pub fail_with: Option<String>,
}

impl MockChatModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(&[])
        }
    }

    fn next_reply(&self, request: ChatRequest) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(request);
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

impl ChatModel for MockChatModel {
    type Error = anyhow::Error;

    async fn complete(&self, request: ChatRequest) -> Result<String, Self::Error> {
        self.next_reply(request)
    }

    async fn complete_streaming<F>(
        &self,
        request: ChatRequest,
        mut on_delta: F,
    ) -> Result<String, Self::Error>
    where
        F: FnMut(&str) + Send,
    {
        let reply = self.next_reply(request)?;
        // deliver in two fragments like a real stream would
        let mid = reply
            .char_indices()
            .map(|(i, _)| i)
            .nth(reply.chars().count() / 2)
            .unwrap_or(reply.len());
        on_delta(&reply[..mid]);
        on_delta(&reply[mid..]);
        Ok(reply)
    }
}
