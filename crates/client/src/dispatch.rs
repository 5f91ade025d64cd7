//! Strategy dispatcher.
//!
//! Classifies each intercepted request and hands it to the one strategy
//! registered for its class. Unclassified requests go to the network
//! untouched and are never written to any partition.

use std::sync::Arc;

use waypoint_core::{Classifier, Error, ResourceClass};

use crate::fetch::{ResourceRequest, ResourceResponse};
use crate::strategy::{
    SharedContext, Strategy, StrategyContext, cache_first, network_first, size_gated, stale_while_revalidate,
};

pub struct Dispatcher {
    classifier: Classifier,
    ctx: SharedContext,
}

impl Dispatcher {
    pub fn new(classifier: Classifier, ctx: StrategyContext) -> Self {
        Self { classifier, ctx: Arc::new(ctx) }
    }

    pub fn classify(&self, request: &ResourceRequest) -> ResourceClass {
        self.classifier.classify(request.method.as_str(), &request.url)
    }

    pub fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    /// Serve one request.
    ///
    /// Only stale-while-revalidate misses and pass-through requests can
    /// return an error; every other strategy always produces a response.
    pub async fn dispatch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        let class = self.classify(request);
        let Some(strategy) = Strategy::for_class(class) else {
            tracing::trace!("pass-through {} {}", request.method, request.url);
            return self.ctx.fetch(request).await;
        };

        tracing::debug!("{} {} -> {:?}", class, request.url, strategy);

        match strategy {
            Strategy::NetworkFirst => Ok(network_first(&self.ctx, request).await),
            Strategy::CacheFirstWithTimeout => Ok(cache_first(&self.ctx, request).await),
            Strategy::StaleWhileRevalidate => stale_while_revalidate(&self.ctx, request).await,
            Strategy::SizeGatedCacheFirst => Ok(size_gated(&self.ctx, request).await),
        }
    }
}
