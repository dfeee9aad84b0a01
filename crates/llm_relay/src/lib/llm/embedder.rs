use std::{fmt::Display, future::Future};

pub trait Embedder {
    type Error: Display;

    fn embed(&self, input: &str) -> impl Future<Output = Result<Vec<f32>, Self::Error>> + Send;
}

impl<T: Embedder + Sync> Embedder for &T {
    type Error = T::Error;

    async fn embed(&self, input: &str) -> Result<Vec<f32>, Self::Error> {
        (**self).embed(input).await
    }
}
