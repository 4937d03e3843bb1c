//! End-to-end sync pipeline behaviour against a real file store, a local
//! image tree and an HTTP upstream.

mod common;

use std::time::Duration;

use common::{
    Harness, HarnessOptions, MapProvider, PNG_BYTES, SCRIPTED, StaticRegistry,
    spawn_image_upstream,
};
use token_logo_service::{
    models::{ImageExtension, SyncPhase, SyncResult, SyncState, TokenOutcome, TokenSyncDetail},
    providers::names,
    storage::ImageStore,
    sync::SyncAdmission,
};

const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const LINK: &str = "0x514910771af9ca656af840dff83e8264ecf986ca";
const UNI: &str = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";

const SVG_BYTES: &[u8] = b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>";

fn detail<'a>(result: &'a SyncResult, address: &str) -> &'a TokenSyncDetail {
    result
        .details
        .iter()
        .find(|d| d.address == address)
        .unwrap_or_else(|| panic!("no detail for {address}"))
}

fn assert_counts_add_up(result: &SyncResult) {
    assert_eq!(
        result.existing_images
            + result.migrated_from_local
            + result.downloaded_images
            + result.failed_downloads,
        result.total_tokens
    );
    assert_eq!(result.details.len(), result.total_tokens);
}

#[tokio::test]
async fn test_chain_without_tokens_completes_empty() {
    let harness = Harness::new(StaticRegistry::new(), MapProvider::new()).await;

    assert!(matches!(
        harness.service.start_sync(999).await,
        SyncAdmission::Started(_)
    ));
    let status = harness.wait_for_terminal(999).await;

    assert_eq!(status.state, SyncState::Completed);
    let result = status.result.unwrap();
    assert_eq!(result.total_tokens, 0);
    assert!(result.details.is_empty());
    assert_eq!(harness.provider.calls(), 0);
}

#[tokio::test]
async fn test_full_pipeline_classifies_every_token() {
    let upstream = spawn_image_upstream().await;
    let registry = StaticRegistry::new().with_chain(1, &[DAI, USDC, WETH, LINK, UNI]);
    let provider = MapProvider::new()
        // Served as PNG despite the URL suffix
        .with_url(WETH, format!("{upstream}/logos/weth.webp"))
        .with_buffer(LINK, SVG_BYTES, ImageExtension::Svg);
    let harness = Harness::new(registry, provider).await;

    harness.seed(1, DAI).await;
    harness.write_local(1, USDC, ImageExtension::Png, PNG_BYTES);

    harness.service.start_sync(1).await;
    let status = harness.wait_for_terminal(1).await;

    assert_eq!(status.state, SyncState::Completed);
    assert!(status.error.is_none());
    assert!(status.end_time.unwrap() >= status.start_time);
    assert_eq!(status.progress.phase, SyncPhase::Completed);

    let result = status.result.unwrap();
    assert_eq!(result.total_tokens, 5);
    assert_eq!(result.existing_images, 1);
    assert_eq!(result.migrated_from_local, 1);
    assert_eq!(result.downloaded_images, 2);
    assert_eq!(result.failed_downloads, 1);
    assert_counts_add_up(&result);

    assert_eq!(detail(&result, DAI).outcome, TokenOutcome::Exists);
    assert_eq!(
        detail(&result, USDC).provider.as_deref(),
        Some(names::LOCAL_MIGRATION)
    );
    assert_eq!(detail(&result, WETH).provider.as_deref(), Some(SCRIPTED));
    assert_eq!(detail(&result, UNI).outcome, TokenOutcome::Failed);
    assert!(detail(&result, UNI).provider.is_none());

    let migrated = harness.store.get(1, USDC).await.unwrap().unwrap();
    assert_eq!(migrated.metadata.provider, names::LOCAL_MIGRATION);
    assert_eq!(migrated.metadata.extension, ImageExtension::Png);
    assert!(migrated.metadata.original_url.unwrap().ends_with("image.png"));

    let downloaded = harness.store.get(1, WETH).await.unwrap().unwrap();
    assert_eq!(downloaded.bytes.as_ref(), PNG_BYTES);
    assert_eq!(downloaded.metadata.extension, ImageExtension::Png);
    assert_eq!(
        downloaded.metadata.original_url.as_deref(),
        Some(format!("{upstream}/logos/weth.webp").as_str())
    );

    let buffered = harness.store.get(1, LINK).await.unwrap().unwrap();
    assert_eq!(buffered.metadata.extension, ImageExtension::Svg);
    assert_eq!(buffered.content_type(), "image/svg+xml");

    assert!(!harness.store.exists(1, UNI).await.unwrap());
}

#[tokio::test]
async fn test_addresses_differing_only_in_case_are_one_token() {
    let registry = StaticRegistry::new().with_chain(
        10,
        &[DAI, "0x6B175474E89094C44DA98B954EEDEAC495271D0F"],
    );
    let provider = MapProvider::new().with_buffer(DAI, SVG_BYTES, ImageExtension::Svg);
    let harness = Harness::new(registry, provider).await;

    harness.service.start_sync(10).await;
    let result = harness.wait_for_terminal(10).await.result.unwrap();

    assert_eq!(result.total_tokens, 1);
    assert_eq!(result.downloaded_images, 1);
    assert_eq!(harness.provider.calls(), 1);
    assert!(
        harness
            .store
            .exists(10, "0x6B175474E89094C44DA98B954EEDEAC495271D0F")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_second_sync_finds_everything_stored() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI, LINK]);
    let provider = MapProvider::new()
        .with_buffer(DAI, SVG_BYTES, ImageExtension::Svg)
        .with_buffer(LINK, PNG_BYTES, ImageExtension::Png);
    let options = HarnessOptions::default().cooldown(Duration::from_millis(50));
    let harness = Harness::build(registry, provider, options).await;

    harness.service.start_sync(1).await;
    let first = harness.wait_for_terminal(1).await.result.unwrap();
    assert_eq!(first.downloaded_images, 2);
    let calls_after_first = harness.provider.calls();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(matches!(
        harness.service.start_sync(1).await,
        SyncAdmission::Started(_)
    ));
    let second = harness.wait_for_terminal(1).await.result.unwrap();

    assert_eq!(second.total_tokens, 2);
    assert_eq!(second.existing_images, 2);
    assert_eq!(second.downloaded_images, 0);
    assert_eq!(second.failed_downloads, 0);
    assert_eq!(harness.provider.calls(), calls_after_first);
}

#[tokio::test]
async fn test_storage_rejections_fail_only_their_tokens() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI, USDC, WETH, LINK]);
    let provider = MapProvider::new()
        .with_buffer(WETH, PNG_BYTES, ImageExtension::Png)
        .with_buffer(LINK, SVG_BYTES, ImageExtension::Svg);
    let options = HarnessOptions::default().reject_writes(&[USDC, LINK]);
    let harness = Harness::build(registry, provider, options).await;
    harness.write_local(1, DAI, ImageExtension::Png, PNG_BYTES);
    harness.write_local(1, USDC, ImageExtension::Png, PNG_BYTES);

    harness.service.start_sync(1).await;
    let status = harness.wait_for_terminal(1).await;

    assert_eq!(status.state, SyncState::Completed);
    let result = status.result.unwrap();
    assert_eq!(result.migrated_from_local, 1);
    assert_eq!(result.downloaded_images, 1);
    assert_eq!(result.failed_downloads, 2);
    assert_counts_add_up(&result);

    for address in [USDC, LINK] {
        let failed = detail(&result, address);
        assert_eq!(failed.outcome, TokenOutcome::Failed);
        assert!(failed.provider.is_none());
        assert!(failed.error.as_deref().unwrap().contains("disk full"));
    }
    assert_eq!(harness.store.puts(), 4);
}

#[tokio::test]
async fn test_upstream_error_fails_download_without_credit() {
    let upstream = spawn_image_upstream().await;
    let registry = StaticRegistry::new().with_chain(1, &[WETH]);
    let provider = MapProvider::new().with_url(WETH, format!("{upstream}/gone.png"));
    let harness = Harness::new(registry, provider).await;

    harness.service.start_sync(1).await;
    let result = harness.wait_for_terminal(1).await.result.unwrap();

    assert_eq!(result.failed_downloads, 1);
    let failed = detail(&result, WETH);
    assert!(failed.provider.is_none());
    assert!(failed.error.is_some());
    assert!(!harness.store.exists(1, WETH).await.unwrap());
}

#[tokio::test]
async fn test_retrigger_inside_cooldown_is_rate_limited() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI]);
    let harness = Harness::new(registry, MapProvider::new()).await;

    harness.service.start_sync(1).await;
    let finished = harness.wait_for_terminal(1).await;

    match harness.service.start_sync(1).await {
        SyncAdmission::RateLimited { remaining } => {
            assert!(remaining > Duration::ZERO);
            assert!(remaining <= Duration::from_secs(60));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    // The terminal record is left untouched by the rejected trigger.
    let view = harness.service.sync_status(1).await.unwrap();
    assert_eq!(view.status, finished);
    assert!(view.remaining_time_ms > 0);
}

#[tokio::test]
async fn test_chains_sync_independently() {
    let registry = StaticRegistry::new()
        .with_chain(1, &[DAI])
        .with_chain(137, &[USDC]);
    let provider = MapProvider::new()
        .with_buffer(DAI, PNG_BYTES, ImageExtension::Png)
        .with_buffer(USDC, PNG_BYTES, ImageExtension::Png);
    let harness = Harness::new(registry, provider).await;

    harness.service.start_sync(1).await;
    assert!(matches!(
        harness.service.start_sync(137).await,
        SyncAdmission::Started(_)
    ));
    harness.wait_for_terminal(1).await;
    harness.wait_for_terminal(137).await;

    let statuses = harness.service.all_statuses().await;
    assert_eq!(
        statuses.iter().map(|v| v.status.chain_id).collect::<Vec<_>>(),
        vec![1, 137]
    );
    for view in statuses {
        assert_eq!(view.status.state, SyncState::Completed);
        assert!(view.status.error.is_none());
        assert_eq!(view.status.result.unwrap().downloaded_images, 1);
    }
}

#[tokio::test]
async fn test_migration_pauses_between_batches() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI, USDC, WETH, LINK, UNI]);
    let mut options = HarnessOptions::default();
    options.sync.migration_batch_pause = Duration::from_millis(60);
    let harness = Harness::build(registry, MapProvider::new(), options).await;
    for address in [DAI, USDC, WETH, LINK, UNI] {
        harness.write_local(1, address, ImageExtension::Png, PNG_BYTES);
    }

    harness.service.start_sync(1).await;
    let result = harness.wait_for_terminal(1).await.result.unwrap();

    assert_eq!(result.migrated_from_local, 5);
    // Batches of two: three batches, two pauses.
    assert!(result.duration_ms >= 120, "took {}ms", result.duration_ms);
    assert_eq!(harness.provider.calls(), 0);
}

#[tokio::test]
async fn test_resolutions_are_spaced_by_download_delay() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI, USDC, WETH, LINK]);
    let provider = MapProvider::new()
        .with_buffer(DAI, PNG_BYTES, ImageExtension::Png)
        .with_buffer(USDC, PNG_BYTES, ImageExtension::Png)
        .with_buffer(WETH, PNG_BYTES, ImageExtension::Png)
        .with_buffer(LINK, PNG_BYTES, ImageExtension::Png);
    let delay = Duration::from_millis(40);
    let mut options = HarnessOptions::default();
    options.sync.download_delay = delay;
    let harness = Harness::build(registry, provider, options).await;

    harness.service.start_sync(1).await;
    let result = harness.wait_for_terminal(1).await.result.unwrap();

    assert_eq!(result.downloaded_images, 4);
    // Two batches of two, each resolution waiting for its own slot.
    assert!(result.duration_ms >= 160, "took {}ms", result.duration_ms);

    let mut starts = harness.provider.call_times();
    starts.sort();
    assert_eq!(starts.len(), 4);
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= delay / 2, "resolutions only {gap:?} apart");
    }
}

#[tokio::test]
async fn test_oversized_download_fails_without_credit() {
    let upstream = spawn_image_upstream().await;
    let registry = StaticRegistry::new().with_chain(1, &[WETH, LINK]);
    let provider = MapProvider::new()
        .with_url(WETH, format!("{upstream}/logos/weth.png"))
        .with_buffer(LINK, SVG_BYTES, ImageExtension::Svg);
    let mut options = HarnessOptions::default();
    options.sync.max_image_bytes = PNG_BYTES.len() - 1;
    let harness = Harness::build(registry, provider, options).await;

    harness.service.start_sync(1).await;
    let status = harness.wait_for_terminal(1).await;

    assert_eq!(status.state, SyncState::Completed);
    let result = status.result.unwrap();
    assert_eq!(result.downloaded_images, 1);
    assert_eq!(result.failed_downloads, 1);

    let oversized = detail(&result, WETH);
    assert_eq!(oversized.outcome, TokenOutcome::Failed);
    assert!(oversized.provider.is_none());
    let limit = (PNG_BYTES.len() - 1).to_string();
    assert!(oversized.error.as_deref().unwrap().contains(&limit));
    assert!(!harness.store.exists(1, WETH).await.unwrap());
}

#[tokio::test]
async fn test_failed_storage_check_does_not_fail_the_chain() {
    let registry = StaticRegistry::new().with_chain(1, &[DAI, USDC]);
    let provider = MapProvider::new()
        .with_buffer(DAI, PNG_BYTES, ImageExtension::Png)
        .with_buffer(USDC, SVG_BYTES, ImageExtension::Svg);
    let options = HarnessOptions::default().fail_checks(&[DAI]);
    let harness = Harness::build(registry, provider, options).await;
    harness.seed(1, USDC).await;

    harness.service.start_sync(1).await;
    let status = harness.wait_for_terminal(1).await;

    assert_eq!(status.state, SyncState::Completed);
    assert!(status.error.is_none());
    let result = status.result.unwrap();
    assert_eq!(result.existing_images, 1);
    assert_eq!(result.downloaded_images, 1);
    assert_counts_add_up(&result);

    // The unreadable token is treated as missing and goes on to download.
    assert_eq!(detail(&result, DAI).outcome, TokenOutcome::Downloaded);
    assert_eq!(detail(&result, USDC).outcome, TokenOutcome::Exists);
    assert_eq!(harness.provider.calls(), 1);
}
