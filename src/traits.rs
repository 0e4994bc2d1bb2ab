use crate::error::Result;
use crate::types::{CommandOutcome, InterpreterInfo, Mirror, OutdatedPackage, PackageInfo};
use async_trait::async_trait;
use std::path::Path;

/// PackageBackend: 对外部包管理器 (pip) 的所有调用都经过这个接口
///
/// Implementations only run commands and decode their output. Deciding what
/// a non-zero exit means is left to the caller.
#[async_trait]
pub trait PackageBackend: Sync + Send {
    /// Download `package` from `mirror` into `dest` without dependencies.
    /// `Err` means the command could not be spawned at all.
    async fn download(&self, mirror: &Mirror, package: &str, dest: &Path) -> Result<CommandOutcome>;

    /// Install (or upgrade) `packages` from `mirror`. Output streams to the terminal.
    async fn install(&self, mirror: &Mirror, packages: &[String], upgrade: bool) -> Result<CommandOutcome>;

    /// Packages whose installed version is older than the latest one `mirror` serves
    async fn list_outdated(&self, mirror: &Mirror) -> Result<Vec<OutdatedPackage>>;

    /// Print every installed package to the terminal
    async fn list_installed(&self) -> Result<CommandOutcome>;

    /// `Ok(None)` when the package is not installed
    async fn show(&self, package: &str) -> Result<Option<PackageInfo>>;

    async fn interpreter_info(&self) -> Result<InterpreterInfo>;
}
