//! Request interception: classify, then dispatch to one strategy.

use std::sync::Arc;

use crate::classify::{MediaClassifier, RequestClass};
use crate::response::{Request, Response};
use crate::strategy::{MediaStrategy, RetrievalStrategy, ShellStrategy};

pub struct Interceptor {
    classifier: MediaClassifier,
    shell: Arc<ShellStrategy>,
    media: Arc<MediaStrategy>,
}

impl Interceptor {
    pub fn new(classifier: MediaClassifier, shell: Arc<ShellStrategy>, media: Arc<MediaStrategy>) -> Self {
        Self { classifier, shell, media }
    }

    fn strategy_for(&self, class: RequestClass) -> &dyn RetrievalStrategy {
        match class {
            RequestClass::Media => &*self.media,
            RequestClass::Generic => &*self.shell,
        }
    }

    /// Produce exactly one response for the request.
    pub async fn handle(&self, request: &Request) -> Response {
        let class = self.classifier.classify(&request.id, request.destination);
        tracing::debug!(url = %request.id, ?class, destination = ?request.destination, "intercepted request");
        self.strategy_for(class).respond(request).await
    }

    /// Wait for background captures started by generic fetches.
    pub async fn flush(&self) {
        self.shell.flush().await;
    }
}
