//! Cache-first with a size gate on writes, used for images.

use reqwest::StatusCode;
use waypoint_core::PartitionRole;

use super::StrategyContext;
use crate::fetch::{ResourceRequest, ResourceResponse};

/// Serve an image from the static partition, fetching it on a miss.
///
/// Cached images are never refreshed. A fetched `200` is stored only when
/// its declared `Content-Length` is absent or below the image ceiling; the
/// fetched response is returned whether or not it was stored. Any network
/// failure becomes an empty `204`.
pub async fn size_gated(ctx: &StrategyContext, request: &ResourceRequest) -> ResourceResponse {
    if let Some(cached) = ctx.lookup(PartitionRole::Static, request).await {
        return cached;
    }

    match ctx.fetch_within(request, ctx.timeouts.image).await {
        Ok(response) => {
            if response.status == StatusCode::OK {
                let declared = response.content_length();
                if ctx.retention.admits_image(declared) {
                    ctx.store(PartitionRole::Static, request, &response).await;
                } else {
                    tracing::debug!(
                        "not caching {}: {} bytes exceeds {}",
                        request.url,
                        declared.unwrap_or_default(),
                        ctx.retention.image_size_ceiling
                    );
                }
            }
            response
        }
        Err(e) => {
            tracing::debug!("image fetch failed for {}: {}", request.url, e);
            ResourceResponse::synthesized(StatusCode::NO_CONTENT, "")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionQuality;
    use crate::fetch::{FetchConfig, HttpNetwork, ResponseSource};
    use crate::testing::{
        FlakyStore, Reply, StubNetwork, app_url, context, flaky_context, gzip_image_response, partitions, seed,
        serve_once, stored_body,
    };
    use std::sync::Arc;
    use waypoint_core::{CacheDb, CacheStore, RetentionPolicy};

    const STATIC: &str = "waypoint-v1-static";

    #[tokio::test]
    async fn test_large_image_not_stored() {
        let network = StubNetwork::new();
        network.script("/img/hero.jpg", vec![Reply::with_length("big", 600_000)]);
        let (ctx, db) = context(network).await;

        let response = size_gated(&ctx, &ResourceRequest::get(app_url("/img/hero.jpg"))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"big");
        assert!(stored_body(&db, STATIC, "/img/hero.jpg").await.is_none());
    }

    #[tokio::test]
    async fn test_small_image_stored() {
        let network = StubNetwork::new();
        network.script("/img/thumb.jpg", vec![Reply::with_length("small", 100_000)]);
        let (ctx, db) = context(network).await;

        size_gated(&ctx, &ResourceRequest::get(app_url("/img/thumb.jpg"))).await;
        assert_eq!(stored_body(&db, STATIC, "/img/thumb.jpg").await.unwrap(), b"small");
    }

    #[tokio::test]
    async fn test_missing_length_stored() {
        let network = StubNetwork::new();
        network.script("/img/logo.svg", vec![Reply::ok("<svg/>")]);
        let (ctx, db) = context(network).await;

        size_gated(&ctx, &ResourceRequest::get(app_url("/img/logo.svg"))).await;
        assert!(stored_body(&db, STATIC, "/img/logo.svg").await.is_some());
    }

    #[tokio::test]
    async fn test_encoded_image_over_ceiling_not_stored() {
        let base = serve_once(gzip_image_response(223)).await;
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let ctx = StrategyContext::new(
            Arc::new(db.clone()),
            Arc::new(network),
            partitions(),
            ConnectionQuality::default(),
        )
        .with_retention(RetentionPolicy { image_size_ceiling: 100, ..Default::default() });

        let response = size_gated(&ctx, &ResourceRequest::get(base.join("/img/logo.svg").unwrap())).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.len(), 223);
        assert!(db.list_entries(STATIC).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hit_skips_network() {
        let network = StubNetwork::new();
        let (ctx, db) = context(network.clone()).await;
        seed(&db, STATIC, "/img/logo.png", "png").await;

        let response = size_gated(&ctx, &ResourceRequest::get(app_url("/img/logo.png"))).await;
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(network.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_200_not_stored() {
        let network = StubNetwork::new();
        network.script("/img/gone.png", vec![Reply::status(404, "")]);
        let (ctx, db) = context(network).await;

        let response = size_gated(&ctx, &ResourceRequest::get(app_url("/img/gone.png"))).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(stored_body(&db, STATIC, "/img/gone.png").await.is_none());
    }

    #[tokio::test]
    async fn test_failure_is_empty_204() {
        let network = StubNetwork::new();
        network.script("/img/hero.jpg", vec![Reply::Hang]);
        let (ctx, _db) = context(network).await;

        let response = size_gated(&ctx, &ResourceRequest::get(app_url("/img/hero.jpg"))).await;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.body.is_empty());
        assert_eq!(response.source, ResponseSource::Synthesized);
    }

    #[tokio::test]
    async fn test_unreadable_cache_falls_through_to_network() {
        let network = StubNetwork::new();
        network.script("/img/thumb.jpg", vec![Reply::ok("small")]);
        let store = FlakyStore::new(CacheDb::open_in_memory().await.unwrap()).with_broken(STATIC);
        let ctx = flaky_context(network, store);

        let response = size_gated(&ctx, &ResourceRequest::get(app_url("/img/thumb.jpg"))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"small");
    }
}
