// tests/restore.rs

//! Integration tests for restoring declared packages

mod common;

use common::{v, write_packages_config, FakeFeed};
use nupack::project::PackagesConfigReader;
use nupack::reference::InstalledReferenceMap;
use nupack::{
    Acquirer, CallbackProgress, Error, PackageFeed, PackageReference, ProgressEvent, Scope,
    ScopeMode, SourceTierSet,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn one_tier(feed: &Arc<FakeFeed>) -> SourceTierSet {
    let primary: Vec<Arc<dyn PackageFeed>> = vec![feed.clone()];
    SourceTierSet::new(primary, Vec::new())
}

fn declared(packages: &[(&str, &str)]) -> InstalledReferenceMap {
    let references = packages
        .iter()
        .map(|(id, version)| PackageReference::exact(*id, v(version)))
        .collect();
    InstalledReferenceMap::aggregate([("App", references)])
}

#[tokio::test]
async fn test_mixed_case_prerelease_restores_once() {
    let temp = TempDir::new().unwrap();
    let feed = Arc::new(FakeFeed::new("feed").publish("Foo", "1.0.0-Beta"));
    let map = declared(&[("Foo", "1.0.0-Beta")]);

    let acquirer = Acquirer::new(one_tier(&feed), temp.path());
    let first = acquirer.restore_declared(&map).await;
    assert!(first.is_success(), "{:?}", first.fatal_error);
    assert!(temp.path().join("Foo.1.0.0-Beta").is_dir());

    let second = acquirer.restore_declared(&map).await;
    assert!(second.is_success());
    assert_eq!(second.installed_count, 0);
    assert_eq!(feed.fetch_count(), 1);
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let packages = temp.path().join("packages");
    let feed = Arc::new(FakeFeed::new("feed").publish("Foo", "1.0.0").publish("Bar", "2.0.0"));
    let map = declared(&[("Foo", "1.0.0"), ("Bar", "2.0.0")]);

    let acquirer = Acquirer::new(one_tier(&feed), &packages);
    let first = acquirer.restore_declared(&map).await;
    assert!(first.is_success(), "{:?}", first.fatal_error);
    assert_eq!(first.installed_count, 2);
    assert!(first.restore_notice);
    assert!(packages.join("Foo.1.0.0/Foo.1.0.0.nupkg").is_file());
    assert!(packages.join("Bar.2.0.0/lib/Bar.dll").is_file());
    assert_eq!(feed.fetch_count(), 2);

    let second = acquirer.restore_declared(&map).await;
    assert!(second.is_success());
    assert_eq!(second.installed_count, 0);
    assert!(!second.restore_notice);
    assert_eq!(feed.fetch_count(), 2);
}

#[tokio::test]
async fn test_pinned_versions_skip_the_listing() {
    let temp = TempDir::new().unwrap();
    let feed = Arc::new(FakeFeed::new("feed").publish("Foo", "1.0.0"));

    let acquirer = Acquirer::new(one_tier(&feed), temp.path());
    let result = acquirer.restore_declared(&declared(&[("Foo", "1.0.0")])).await;
    assert!(result.is_success());
    assert_eq!(feed.listing_count(), 0);
}

#[tokio::test]
async fn test_identity_shared_by_scopes_is_fetched_once() {
    let temp = TempDir::new().unwrap();
    let web = temp.path().join("Web/packages.config");
    let api = temp.path().join("Api/packages.config");
    write_packages_config(&web, &[("Foo", "1.0.0"), ("Bar", "1.0.0")]);
    write_packages_config(&api, &[("foo", "1.0"), ("Baz", "3.0.0")]);

    let feed = Arc::new(
        FakeFeed::new("feed")
            .with_delay(Duration::from_millis(20))
            .publish("Foo", "1.0.0")
            .publish("Bar", "1.0.0")
            .publish("Baz", "3.0.0"),
    );
    let scopes = vec![Scope::new("Web", web), Scope::new("Api", api)];

    let acquirer = Acquirer::new(one_tier(&feed), temp.path().join("packages"));
    let result = acquirer
        .restore(&scopes, &PackagesConfigReader, ScopeMode::Aggregate)
        .await;

    assert!(result.is_success(), "{:?}", result.fatal_error);
    assert_eq!(result.installed_count, 3);
    assert_eq!(feed.fetch_count(), 3);
}

#[tokio::test]
async fn test_secondary_tier_only_when_primary_lacks_package() {
    let temp = TempDir::new().unwrap();
    let primary = Arc::new(FakeFeed::new("primary").publish("Foo", "1.0.0"));
    let secondary = Arc::new(
        FakeFeed::new("secondary")
            .publish("Foo", "1.0.0")
            .publish("Bar", "1.5.0"),
    );
    let primary_feeds: Vec<Arc<dyn PackageFeed>> = vec![primary.clone()];
    let secondary_feeds: Vec<Arc<dyn PackageFeed>> = vec![secondary.clone()];

    let acquirer = Acquirer::new(
        SourceTierSet::new(primary_feeds, secondary_feeds),
        temp.path(),
    );
    let mut map = InstalledReferenceMap::new();
    map.insert("App", PackageReference::latest("Foo"));
    map.insert("App", PackageReference::latest("Bar"));

    let result = acquirer.restore_declared(&map).await;
    assert!(result.is_success(), "{:?}", result.fatal_error);
    assert!(temp.path().join("Foo.1.0.0").is_dir());
    assert!(temp.path().join("Bar.1.5.0").is_dir());

    // Only Bar's resolution reached the secondary tier
    assert_eq!(primary.listing_count(), 2);
    assert_eq!(secondary.listing_count(), 1);
    assert_eq!(secondary.fetch_count(), 1);
}

#[tokio::test]
async fn test_broken_feed_is_a_warning_when_another_serves() {
    let temp = TempDir::new().unwrap();
    let broken = Arc::new(FakeFeed::broken("mirror"));
    let good = Arc::new(FakeFeed::new("origin").publish("Foo", "2.0.0"));
    let primary: Vec<Arc<dyn PackageFeed>> = vec![broken.clone(), good.clone()];

    let acquirer = Acquirer::new(SourceTierSet::new(primary, Vec::new()), temp.path());
    let mut map = InstalledReferenceMap::new();
    map.insert("App", PackageReference::latest("Foo"));

    let result = acquirer.restore_declared(&map).await;
    assert!(result.is_success(), "{:?}", result.fatal_error);
    assert!(temp.path().join("Foo.2.0.0").is_dir());
    assert!(result.warnings.iter().any(|w| w.contains("mirror")));
}

#[tokio::test]
async fn test_failure_keeps_completed_installs() {
    let temp = TempDir::new().unwrap();
    let feed = Arc::new(FakeFeed::new("feed").publish("Foo", "1.0.0"));
    let map = declared(&[("Foo", "1.0.0"), ("Missing", "1.0.0")]);

    let acquirer = Acquirer::new(one_tier(&feed), temp.path()).with_max_concurrent(1);
    let result = acquirer.restore_declared(&map).await;

    match &result.fatal_error {
        Some(Error::Acquisition { failures }) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].package.starts_with("Missing"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!result.is_cancelled());
    assert_eq!(result.installed_count, 1);
    assert!(temp.path().join("Foo.1.0.0").is_dir());
    assert!(!temp.path().join("Missing.1.0.0").exists());
}

#[tokio::test]
async fn test_cancellation_is_reported_and_leaves_nothing_partial() {
    let temp = TempDir::new().unwrap();
    let feed = Arc::new(
        FakeFeed::new("slow")
            .with_delay(Duration::from_secs(30))
            .publish("Foo", "1.0.0"),
    );
    let token = CancellationToken::new();

    let acquirer = Acquirer::new(one_tier(&feed), temp.path()).with_cancellation(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        acquirer.restore_declared(&declared(&[("Foo", "1.0.0")])),
    )
    .await
    .expect("cancellation should end the run promptly");
    canceller.await.unwrap();

    assert!(result.is_cancelled());
    assert_eq!(result.installed_count, 0);
    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_unreadable_scope_is_skipped_in_aggregate_mode() {
    let temp = TempDir::new().unwrap();
    let good = temp.path().join("Good/packages.config");
    let bad = temp.path().join("Bad/packages.config");
    write_packages_config(&good, &[("Foo", "1.0.0")]);
    std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
    std::fs::write(&bad, r#"<packages><package version="1.0"/></packages>"#).unwrap();
    let absent = temp.path().join("Absent/packages.config");

    let feed = Arc::new(FakeFeed::new("feed").publish("Foo", "1.0.0"));
    let acquirer = Acquirer::new(one_tier(&feed), temp.path().join("packages"));
    let scopes = vec![
        Scope::new("Good", good),
        Scope::new("Bad", &bad),
        Scope::new("Absent", absent),
    ];

    let result = acquirer
        .restore(&scopes, &PackagesConfigReader, ScopeMode::Aggregate)
        .await;
    assert!(result.is_success(), "{:?}", result.fatal_error);
    assert_eq!(result.installed_count, 1);
    // The malformed scope warns, the absent one is silent
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Bad"));

    let single = acquirer
        .restore(&[Scope::new("Bad", bad)], &PackagesConfigReader, ScopeMode::Single)
        .await;
    assert!(matches!(single.fatal_error, Some(Error::ScopeRead { .. })));
}

#[tokio::test]
async fn test_nothing_missing_makes_no_calls() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("Foo.1.0.0")).unwrap();
    let feed = Arc::new(FakeFeed::new("feed"));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let acquirer = Acquirer::new(one_tier(&feed), temp.path()).with_progress(Arc::new(
        CallbackProgress::new(move |event| sink.lock().unwrap().push(event)),
    ));

    let result = acquirer.restore_declared(&declared(&[("Foo", "1.0.0")])).await;
    assert!(result.is_success());
    assert_eq!(result.installed_count, 0);
    assert!(!result.restore_notice);
    assert_eq!(feed.listing_count() + feed.fetch_count(), 0);
    assert_eq!(
        *events.lock().unwrap(),
        vec![ProgressEvent::Message(
            "All packages listed are already installed.".to_string()
        )]
    );
}
