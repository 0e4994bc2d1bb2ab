use crate::error::{MirrorError, Result};
use crate::traits::PackageBackend;
use crate::types::{Mirror, OutdatedPackage, PackageInfo};
use std::path::Path;
use tracing::{info, warn};

/// Packages `locate` reports on when none are named
pub const DEFAULT_LOCATE_PACKAGES: &[&str] = &["numpy", "pandas", "matplotlib", "scikit-learn", "requests"];

/// What `locate` found for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Installed(PackageInfo),
    NotInstalled,
    /// `pip show` could not be run for this package
    Failed(String),
}

pub async fn install(
    backend: &dyn PackageBackend,
    packages: &[String],
    mirror: &Mirror,
    upgrade: bool,
) -> Result<()> {
    if packages.is_empty() {
        return Err(MirrorError::Config("no packages given".to_string()));
    }

    println!("Installing with {}...", mirror.name);
    let outcome = backend.install(mirror, packages, upgrade).await?;
    if !outcome.success() {
        return Err(MirrorError::InstallFailed {
            code: outcome.code,
            stderr: outcome.stderr.trim().to_string(),
        });
    }

    info!(mirror = %mirror.name, count = packages.len(), "install finished");
    println!("Success! Packages installed from {}.", mirror.name);
    Ok(())
}

/// Upgrade everything pip reports as outdated.
/// Returns the packages that were upgraded (empty when already up to date).
pub async fn update_all(backend: &dyn PackageBackend, mirror: &Mirror) -> Result<Vec<OutdatedPackage>> {
    println!("Checking for outdated packages...");
    let outdated = backend.list_outdated(mirror).await?;

    if outdated.is_empty() {
        println!("All packages are up to date.");
        return Ok(outdated);
    }

    println!("Found {} outdated package(s):", outdated.len());
    for pkg in &outdated {
        println!(
            "  - {} ({} -> {})",
            pkg.name,
            pkg.version.as_deref().unwrap_or("?"),
            pkg.latest_version.as_deref().unwrap_or("?")
        );
    }

    let names: Vec<String> = outdated.iter().map(|p| p.name.clone()).collect();
    install(backend, &names, mirror, true).await?;
    Ok(outdated)
}

pub async fn list_all(backend: &dyn PackageBackend) -> Result<()> {
    let outcome = backend.list_installed().await?;
    if !outcome.success() {
        return Err(MirrorError::QueryFailed(format!(
            "`pip list` exited with {:?}",
            outcome.code
        )));
    }
    Ok(())
}

/// Interpreter layout plus where each package lives on disk.
/// Missing packages and per-package `pip show` failures get their own row;
/// only the interpreter query can fail the whole report.
pub async fn locate(backend: &dyn PackageBackend, packages: &[String]) -> Result<Vec<(String, Located)>> {
    let interp = backend.interpreter_info().await?;

    println!("{}", "=".repeat(70));
    println!("Python executable: {}", interp.executable);
    println!("Python version: {}", interp.version.lines().next().unwrap_or_default());
    println!("site-packages:");
    for path in &interp.site_packages {
        println!("  - {}", path);
    }
    if let Some(user_site) = &interp.user_site {
        println!("user site-packages: {}", user_site);
    }
    println!("{}", "=".repeat(70));

    println!("{:<20} {:<15} Location", "Package", "Version");
    println!("{}", "-".repeat(70));

    let mut report = Vec::with_capacity(packages.len());
    for package in packages {
        let located = match backend.show(package).await {
            Ok(Some(info)) => Located::Installed(info),
            Ok(None) => Located::NotInstalled,
            Err(e) => {
                warn!(package = %package, "pip show failed: {}", e);
                Located::Failed(e.to_string())
            }
        };
        match &located {
            Located::Installed(info) => {
                let location = info.location.as_deref().unwrap_or("unknown");
                println!(
                    "{:<20} {:<15} {}",
                    info.name,
                    info.version.as_deref().unwrap_or("unknown"),
                    location
                );
                if let Some(dir) = code_dir(info) {
                    println!("{:<36} code: {}", "", dir);
                }
            }
            Located::NotInstalled => println!("{:<20} {:<15} N/A", package, "not installed"),
            Located::Failed(msg) => println!("{:<20} {:<15} {}", package, "error", msg),
        }
        report.push((package.clone(), located));
    }
    println!("{}", "-".repeat(70));

    Ok(report)
}

/// `<location>/<name>` when that directory exists
fn code_dir(info: &PackageInfo) -> Option<String> {
    let location = info.location.as_deref()?;
    let dir = Path::new(location).join(&info.name);
    dir.is_dir().then(|| dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::FakeBackend;

    fn mirror() -> Mirror {
        Mirror::new("C", "https://c.example/simple")
    }

    fn outdated(name: &str) -> OutdatedPackage {
        OutdatedPackage {
            name: name.to_string(),
            version: Some("1.0".to_string()),
            latest_version: Some("2.0".to_string()),
        }
    }

    #[tokio::test]
    async fn install_runs_one_command_against_mirror() -> Result<()> {
        let backend = FakeBackend::default();
        install(&backend, &["pip".to_string()], &mirror(), false).await?;

        let calls = backend.install_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("https://c.example/simple".to_string(), vec!["pip".to_string()], false));
        Ok(())
    }

    #[tokio::test]
    async fn install_failure_carries_exit_code() {
        let backend = FakeBackend {
            install_code: 1,
            ..Default::default()
        };
        let err = install(&backend, &["nope".to_string()], &mirror(), false)
            .await
            .unwrap_err();
        match err {
            MirrorError::InstallFailed { code, stderr } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn update_all_noop_when_nothing_outdated() -> Result<()> {
        let backend = FakeBackend {
            outdated: Some(Vec::new()),
            ..Default::default()
        };
        assert!(update_all(&backend, &mirror()).await?.is_empty());
        assert!(backend.install_calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn outdated_query_goes_to_chosen_mirror() -> Result<()> {
        let backend = FakeBackend {
            outdated: Some(vec![outdated("pip")]),
            ..Default::default()
        };
        update_all(&backend, &mirror()).await?;
        assert_eq!(backend.outdated_query_urls(), ["https://c.example/simple"]);
        Ok(())
    }

    #[tokio::test]
    async fn update_all_upgrades_exactly_the_outdated_set() -> Result<()> {
        let backend = FakeBackend {
            outdated: Some(vec![outdated("numpy"), outdated("requests")]),
            ..Default::default()
        };
        let upgraded = update_all(&backend, &mirror()).await?;
        assert_eq!(upgraded.len(), 2);

        let calls = backend.install_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, ["numpy", "requests"]);
        assert!(calls[0].2);
        Ok(())
    }

    #[tokio::test]
    async fn update_all_propagates_query_failure() {
        let backend = FakeBackend {
            outdated: None,
            ..Default::default()
        };
        assert!(matches!(
            update_all(&backend, &mirror()).await,
            Err(MirrorError::QueryFailed(_))
        ));
        assert!(backend.install_calls().is_empty());
    }

    #[tokio::test]
    async fn locate_reports_missing_packages() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("requests"))?;
        let location = dir.path().display().to_string();

        let mut backend = FakeBackend::default();
        backend.installed.insert(
            "requests".to_string(),
            PackageInfo {
                name: "requests".to_string(),
                version: Some("2.32.3".to_string()),
                location: Some(location.clone()),
            },
        );

        let report = locate(&backend, &["requests".to_string(), "ghost".to_string()]).await?;
        assert_eq!(report.len(), 2);
        let Located::Installed(found) = &report[0].1 else {
            panic!("requests should be installed: {:?}", report[0].1);
        };
        assert_eq!(code_dir(found), Some(dir.path().join("requests").display().to_string()));
        assert_eq!(report[1].1, Located::NotInstalled);
        Ok(())
    }

    #[tokio::test]
    async fn locate_keeps_going_after_show_error() -> Result<()> {
        let mut backend = FakeBackend::default();
        backend.show_errors.insert("numpy".to_string());

        let packages = ["numpy".to_string(), "pandas".to_string()];
        let report = locate(&backend, &packages).await?;
        assert_eq!(report.len(), 2);
        assert!(matches!(&report[0].1, Located::Failed(msg) if msg.contains("cannot run pip")));
        assert_eq!(report[1], ("pandas".to_string(), Located::NotInstalled));
        Ok(())
    }

    #[tokio::test]
    async fn list_all_reports_pip_exit_code() -> Result<()> {
        list_all(&FakeBackend::default()).await?;

        let backend = FakeBackend {
            list_code: 3,
            ..Default::default()
        };
        match list_all(&backend).await {
            Err(MirrorError::QueryFailed(msg)) => assert!(msg.contains("Some(3)")),
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }
}
