// tests/solution.rs

//! End-to-end restore of a solution on disk: discovery, settings, local
//! feeds and the packages folder chosen from nupack.toml

mod common;

use common::{archive, write_packages_config};
use nupack::config::{FileSettings, SettingsProvider};
use nupack::project::{discover_solution, select_solution_parser, solution_scopes, PackagesConfigReader};
use nupack::{Acquirer, InstallPathResolver, ScopeMode, SourceTierSet, TargetMode};
use std::path::Path;
use tempfile::TempDir;

const SLN: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Web", "src\Web\Web.csproj", "{11111111-1111-1111-1111-111111111111}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Docs", "Docs", "{22222222-2222-2222-2222-222222222222}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Core", "src\Core\Core.csproj", "{33333333-3333-3333-3333-333333333333}"
EndProject
"#;

fn publish(feed: &Path, id: &str, version: &str) {
    std::fs::create_dir_all(feed).unwrap();
    std::fs::write(feed.join(format!("{}.{}.nupkg", id, version)), archive(id, version)).unwrap();
}

/// Solution with two projects, a solution-level packages.config and a
/// nupack.toml naming a local feed and a custom packages folder
fn solution(root: &Path) {
    std::fs::write(root.join("Shop.sln"), SLN).unwrap();
    write_packages_config(&root.join(".nuget/packages.config"), &[("Tools", "1.0.0")]);
    write_packages_config(
        &root.join("src/Web/packages.config"),
        &[("Json", "13.0.1"), ("Logging", "2.0.0")],
    );
    // Project-specific file wins over packages.config
    write_packages_config(&root.join("src/Core/packages.Core.config"), &[("Json", "13.0.1")]);
    write_packages_config(&root.join("src/Core/packages.config"), &[("Ignored", "9.9.9")]);

    std::fs::write(
        root.join("nupack.toml"),
        r#"
[config]
repository_path = "deps"
save_mode = "nupkg;files"

[[sources]]
name = "local"
url = "feed"
"#,
    )
    .unwrap();

    let feed = root.join("feed");
    publish(&feed, "Tools", "1.0.0");
    publish(&feed, "Json", "13.0.1");
    publish(&feed, "Logging", "2.0.0");
}

#[tokio::test]
async fn test_restore_solution_from_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    solution(root);

    let sln = discover_solution(root).unwrap();
    let descriptor = select_solution_parser(&sln).parse(&sln).unwrap();
    let scopes = solution_scopes(&descriptor);
    let names: Vec<_> = scopes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Shop.sln", "Web", "Core"]);

    let settings_provider = FileSettings::new().with_user_dir(None);
    let install_dir = InstallPathResolver::new(&settings_provider, root)
        .resolve(
            None,
            &TargetMode::Solution {
                solution_dir: descriptor.directory().to_path_buf(),
            },
        )
        .unwrap();
    assert_eq!(install_dir, root.join("deps"));

    let settings = settings_provider.load(root).unwrap();
    let sources = SourceTierSet::from_settings(&settings, &[], root).unwrap();
    let acquirer = Acquirer::new(sources, &install_dir);

    let result = acquirer
        .restore(&scopes, &PackagesConfigReader, ScopeMode::Aggregate)
        .await;
    assert!(result.is_success(), "{:?}", result.fatal_error);
    assert_eq!(result.installed_count, 3);
    assert!(result.restore_notice);
    for dir in ["Tools.1.0.0", "Json.13.0.1", "Logging.2.0.0"] {
        assert!(install_dir.join(dir).is_dir(), "{} missing", dir);
    }
    assert!(!install_dir.join("Ignored.9.9.9").exists());

    let again = acquirer
        .restore(&scopes, &PackagesConfigReader, ScopeMode::Aggregate)
        .await;
    assert!(again.is_success());
    assert_eq!(again.installed_count, 0);
}

#[tokio::test]
async fn test_missing_feed_fails_the_run() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    solution(root);
    std::fs::remove_dir_all(root.join("feed")).unwrap();

    let settings = FileSettings::new().with_user_dir(None).load(root).unwrap();
    let sources = SourceTierSet::from_settings(&settings, &[], root).unwrap();
    let acquirer = Acquirer::new(sources, root.join("deps"));

    let sln = discover_solution(root).unwrap();
    let scopes = solution_scopes(&select_solution_parser(&sln).parse(&sln).unwrap());
    let result = acquirer
        .restore(&scopes, &PackagesConfigReader, ScopeMode::Aggregate)
        .await;

    assert!(!result.is_success());
    assert!(!result.is_cancelled());
    assert_eq!(result.installed_count, 0);
}
