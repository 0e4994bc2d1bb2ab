use crate::error::{MirrorError, Result};
use crate::traits::PackageBackend;
use crate::types::{CommandOutcome, InterpreterInfo, Mirror, OutdatedPackage, PackageInfo};
use crate::utils;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::debug;

const INTERPRETER_SCRIPT: &str = r#"import json, site, sys
print(json.dumps({
    "executable": sys.executable,
    "version": sys.version,
    "site_packages": site.getsitepackages() if hasattr(site, "getsitepackages") else [],
    "user_site": site.USER_SITE,
}))"#;

/// Runs `<python> -m pip ...` as a child process
pub struct PipBackend {
    python: String,
}

impl PipBackend {
    pub fn new(python: &str) -> Self {
        Self {
            python: python.to_string(),
        }
    }

    fn pip(&self, args: &[String]) -> Command {
        debug!(python = %self.python, "pip {}", args.join(" "));
        let mut cmd = Command::new(&self.python);
        cmd.arg("-m").arg("pip").args(args).kill_on_drop(true);
        cmd
    }
}

/// `--index-url <url> --trusted-host <host>`
pub fn index_args(mirror: &Mirror) -> Result<Vec<String>> {
    Ok(vec![
        "--index-url".to_string(),
        mirror.url.clone(),
        "--trusted-host".to_string(),
        utils::trusted_host(&mirror.url)?,
    ])
}

pub fn install_args(mirror: &Mirror, packages: &[String], upgrade: bool) -> Result<Vec<String>> {
    let mut args = vec!["install".to_string()];
    if upgrade {
        args.push("--upgrade".to_string());
    }
    args.extend(index_args(mirror)?);
    args.extend(packages.iter().cloned());
    Ok(args)
}

/// `list --outdated` asks the mirror, not the default index, for the latest versions
pub fn outdated_args(mirror: &Mirror) -> Result<Vec<String>> {
    let mut args = ["list", "--outdated", "--format=json"].map(String::from).to_vec();
    args.extend(index_args(mirror)?);
    Ok(args)
}

fn outcome(output: &Output) -> CommandOutcome {
    CommandOutcome {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Decode `pip list --outdated --format=json`
pub fn parse_outdated(stdout: &str) -> Result<Vec<OutdatedPackage>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed)
        .map_err(|e| MirrorError::QueryFailed(format!("unexpected `pip list` output: {}", e)))
}

static SHOW_FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn show_field_re() -> &'static Regex {
    SHOW_FIELD_RE.get_or_init(|| {
        Regex::new(r"(?m)^([A-Za-z][A-Za-z-]*):[ \t]*(.*?)[ \t\r]*$").expect("pip show field pattern is valid")
    })
}

/// Decode the `Key: value` block printed by `pip show`
pub fn parse_show(package: &str, stdout: &str) -> PackageInfo {
    let fields: HashMap<&str, &str> = show_field_re()
        .captures_iter(stdout)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    let non_empty = |key: &str| fields.get(key).filter(|v| !v.is_empty()).map(|v| v.to_string());

    PackageInfo {
        name: non_empty("Name").unwrap_or_else(|| package.to_string()),
        version: non_empty("Version"),
        location: non_empty("Location"),
    }
}

#[async_trait]
impl PackageBackend for PipBackend {
    async fn download(&self, mirror: &Mirror, package: &str, dest: &Path) -> Result<CommandOutcome> {
        let mut args = vec![
            "download".to_string(),
            "--no-deps".to_string(),
            "-d".to_string(),
            dest.to_string_lossy().into_owned(),
        ];
        args.extend(index_args(mirror)?);
        args.push("--quiet".to_string());
        args.push(package.to_string());

        let output = self
            .pip(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(outcome(&output))
    }

    async fn install(&self, mirror: &Mirror, packages: &[String], upgrade: bool) -> Result<CommandOutcome> {
        let args = install_args(mirror, packages, upgrade)?;
        println!("Running: {} -m pip {}", self.python, args.join(" "));

        // stdout streams live; stderr is kept so a failure can carry it
        let output = self
            .pip(&args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let result = outcome(&output);
        if result.success() && !result.stderr.trim().is_empty() {
            eprint!("{}", result.stderr);
        }
        Ok(result)
    }

    async fn list_outdated(&self, mirror: &Mirror) -> Result<Vec<OutdatedPackage>> {
        let args = outdated_args(mirror)?;
        let output = self
            .pip(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MirrorError::QueryFailed(format!("cannot run {}: {}", self.python, e)))?;

        if !output.status.success() {
            return Err(MirrorError::QueryFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        parse_outdated(&String::from_utf8_lossy(&output.stdout))
    }

    async fn list_installed(&self) -> Result<CommandOutcome> {
        let args = ["list", "--format=columns"].map(String::from);
        let status = self.pip(&args).status().await?;
        Ok(CommandOutcome {
            code: status.code(),
            stderr: String::new(),
        })
    }

    async fn show(&self, package: &str) -> Result<Option<PackageInfo>> {
        let args = ["show".to_string(), package.to_string()];
        let output = self.pip(&args).stdin(Stdio::null()).output().await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(parse_show(package, &String::from_utf8_lossy(&output.stdout))))
    }

    async fn interpreter_info(&self) -> Result<InterpreterInfo> {
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(INTERPRETER_SCRIPT)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MirrorError::QueryFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
