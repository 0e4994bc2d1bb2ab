use crate::config::PROBE_PACKAGE;
use crate::error::{MirrorError, Result};
use crate::traits::PackageBackend;
use crate::types::{Mirror, ProbeResult};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::debug;

static HOST_RE: OnceLock<Regex> = OnceLock::new();

fn host_re() -> &'static Regex {
    HOST_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://(?:[^@/?#]*@)?([^/?#]+)").expect("URL authority pattern is valid")
    })
}

/// Host part of an index URL, used for pip's `--trusted-host`.
///
/// `https://user@mirrors.aliyun.com:8443/pypi/simple/` -> `mirrors.aliyun.com:8443`
pub fn trusted_host(url: &str) -> Result<String> {
    host_re()
        .captures(url.trim())
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| MirrorError::Config(format!("cannot extract host from URL '{}'", url)))
}

/// 并发测试所有镜像源
///
/// 逻辑:
/// 1. 为每个镜像源生成一个异步任务, 同时运行的任务数 = 镜像源数量
/// 2. 每个任务用 pip download 从该源下载一个小包到独立的临时目录
/// 3. 等待所有任务完成
/// 4. 按耗时从小到大排序, 失败的 (INFINITY) 在最后
pub async fn probe_all(
    backend: &dyn PackageBackend,
    mirrors: &[Mirror],
    timeout: Duration,
) -> Vec<ProbeResult> {
    let workers = mirrors.len().max(1);

    let pb = ProgressBar::new(mirrors.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {percent}% {msg}") {
        pb.set_style(style.progress_chars("|| "));
    }
    pb.set_message("Testing...");

    let tasks = mirrors.iter().cloned().map(|m| {
        let pb = pb.clone();
        async move {
            let res = probe_one(backend, m, timeout).await;
            pb.inc(1);
            res
        }
    });

    // The stream lives only for this call; it is drained before returning.
    let mut results: Vec<ProbeResult> = stream::iter(tasks).buffer_unordered(workers).collect().await;

    pb.finish_and_clear();

    results.sort_by(|a, b| a.latency_secs.total_cmp(&b.latency_secs));
    results
}

/// 单个源测速逻辑
///
/// Spawn errors, non-zero exits and timeouts all collapse into a failed result.
async fn probe_one(backend: &dyn PackageBackend, mirror: Mirror, timeout: Duration) -> ProbeResult {
    // Removed when dropped, whichever way this function returns
    let dir = match tempfile::Builder::new().prefix("pymirror-probe-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            debug!(mirror = %mirror.name, "cannot create temp dir: {}", e);
            return ProbeResult::failed(mirror);
        }
    };

    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, backend.download(&mirror, PROBE_PACKAGE, dir.path())).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(Ok(out)) if out.success() => {
            debug!(mirror = %mirror.name, secs = elapsed.as_secs_f64(), "probe ok");
            ProbeResult::succeeded(mirror, elapsed)
        }
        Ok(Ok(out)) => {
            debug!(mirror = %mirror.name, code = ?out.code, "probe failed: {}", out.stderr.trim());
            ProbeResult::failed(mirror)
        }
        Ok(Err(e)) => {
            debug!(mirror = %mirror.name, "probe failed: {}", e);
            ProbeResult::failed(mirror)
        }
        Err(_) => {
            debug!(mirror = %mirror.name, ?timeout, "probe timed out");
            ProbeResult::failed(mirror)
        }
    }
}
