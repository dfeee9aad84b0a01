use std::{fmt::Display, future::Future};

use crate::prompt::ChatRequest;

pub trait ChatModel {
    type Error: Display;

    /// Returns the full assistant reply.
    fn complete(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Streams reply fragments to `on_delta` as they arrive and returns the
    /// concatenated reply.
    fn complete_streaming<F>(
        &self,
        request: ChatRequest,
        on_delta: F,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send
    where
        F: FnMut(&str) + Send;
}

impl<T: ChatModel + Sync> ChatModel for &T {
    type Error = T::Error;

    async fn complete(&self, request: ChatRequest) -> Result<String, Self::Error> {
        (**self).complete(request).await
    }

    async fn complete_streaming<F>(
        &self,
        request: ChatRequest,
        on_delta: F,
    ) -> Result<String, Self::Error>
    where
        F: FnMut(&str) + Send,
    {
        (**self).complete_streaming(request, on_delta).await
    }
}
