use relay_datastore::UrlLedger;
use tokio_util::sync::CancellationToken;

use crate::{
    feed::{ArticleFetcher, FeedSource},
    tools::digest::{DigestOptions, NewsDigest, Speaker},
    ChatModel,
};

pub struct NewsDigestBuilder<C = (), F = (), A = (), L = ()> {
    chat: C,
    feed: F,
    fetcher: A,
    ledger: L,
    options: DigestOptions,
    shutdown: CancellationToken,
    speaker: Option<Speaker>,
}

impl NewsDigestBuilder {
    pub fn new() -> Self {
        Self {
            chat: (),
            feed: (),
            fetcher: (),
            ledger: (),
            options: DigestOptions::default(),
            shutdown: CancellationToken::new(),
            speaker: None,
        }
    }
}

impl Default for NewsDigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, F, A, L> NewsDigestBuilder<C, F, A, L> {
    pub fn chat<C2: ChatModel + Send + Sync>(self, chat: C2) -> NewsDigestBuilder<C2, F, A, L> {
        NewsDigestBuilder {
            chat,
            feed: self.feed,
            fetcher: self.fetcher,
            ledger: self.ledger,
            options: self.options,
            shutdown: self.shutdown,
            speaker: self.speaker,
        }
    }

    pub fn feed<F2: FeedSource + Send + Sync>(self, feed: F2) -> NewsDigestBuilder<C, F2, A, L> {
        NewsDigestBuilder {
            chat: self.chat,
            feed,
            fetcher: self.fetcher,
            ledger: self.ledger,
            options: self.options,
            shutdown: self.shutdown,
            speaker: self.speaker,
        }
    }

    pub fn fetcher<A2: ArticleFetcher + Send + Sync>(
        self,
        fetcher: A2,
    ) -> NewsDigestBuilder<C, F, A2, L> {
        NewsDigestBuilder {
            chat: self.chat,
            feed: self.feed,
            fetcher,
            ledger: self.ledger,
            options: self.options,
            shutdown: self.shutdown,
            speaker: self.speaker,
        }
    }

    pub fn ledger<L2: UrlLedger + Send + Sync>(self, ledger: L2) -> NewsDigestBuilder<C, F, A, L2> {
        NewsDigestBuilder {
            chat: self.chat,
            feed: self.feed,
            fetcher: self.fetcher,
            ledger,
            options: self.options,
            shutdown: self.shutdown,
            speaker: self.speaker,
        }
    }

    pub fn options(mut self, options: DigestOptions) -> Self {
        self.options = options;
        self
    }

    /// Cancelling the token stops the loop once the current article is done.
    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn speaker(mut self, speaker: Option<Speaker>) -> Self {
        self.speaker = speaker;
        self
    }
}

impl<C, F, A, L> NewsDigestBuilder<C, F, A, L>
where
    C: ChatModel + Send + Sync,
    F: FeedSource + Send + Sync,
    A: ArticleFetcher + Send + Sync,
    L: UrlLedger + Send + Sync,
{
    pub fn build(self) -> NewsDigest<C, F, A, L> {
        NewsDigest {
            chat: self.chat,
            feed: self.feed,
            fetcher: self.fetcher,
            ledger: self.ledger,
            options: self.options,
            shutdown: self.shutdown,
            speaker: self.speaker,
        }
    }
}
