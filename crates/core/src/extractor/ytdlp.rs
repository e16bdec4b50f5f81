//! yt-dlp backed extractor implementation.

use async_trait::async_trait;
use chrono::Utc;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::binding::ExtractorBinding;
use super::config::ExtractorConfig;
use super::error::ExtractError;
use super::traits::Extractor;
use super::types::{Artifact, Job, JobState};

/// Format selection: prefer a pre-muxed mp4, fall back to a mergeable
/// best-quality video+audio pair, then to whatever is best.
pub const FORMAT_SELECTION: &str =
    "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best";

/// Trailing stderr lines retained for failure diagnostics.
const STDERR_TAIL_LINES: usize = 50;

/// Per-domain header overrides for sources that reject the default client.
struct SiteProfile {
    domain: &'static str,
    user_agent: &'static str,
    referer: Option<&'static str>,
}

const SITE_PROFILES: &[SiteProfile] = &[
    SiteProfile {
        domain: "instagram.com",
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        referer: Some("https://www.instagram.com/"),
    },
    SiteProfile {
        domain: "tiktok.com",
        user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36",
        referer: Some("https://www.tiktok.com/"),
    },
    SiteProfile {
        domain: "twitter.com",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        referer: Some("https://twitter.com/"),
    },
    SiteProfile {
        domain: "x.com",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        referer: Some("https://x.com/"),
    },
];

/// yt-dlp backed extractor.
pub struct YtDlpExtractor {
    binding: ExtractorBinding,
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    /// Creates a new extractor from a probed binding.
    pub fn new(binding: ExtractorBinding, config: ExtractorConfig) -> Self {
        Self { binding, config }
    }

    /// Builds the argument vector for one job. The URL is always a single
    /// argv element, never part of a shell string.
    fn build_args(&self, job: &Job) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
            "-f".to_string(),
            FORMAT_SELECTION.to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            job.output_path.to_string_lossy().to_string(),
        ];

        if let Some(ref cookies) = self.config.cookies_file {
            args.extend([
                "--cookies".to_string(),
                cookies.to_string_lossy().to_string(),
            ]);
        }

        if let Some(profile) = site_profile(&job.source_url) {
            args.extend(["--user-agent".to_string(), profile.user_agent.to_string()]);
            if let Some(referer) = profile.referer {
                args.extend(["--add-headers".to_string(), format!("Referer:{}", referer)]);
            }
        }

        args.extend(self.config.extra_args.iter().cloned());

        args.push(job.source_url.to_string());

        args
    }

    /// Remove the output file and any in-progress fragment next to it.
    async fn remove_partial(path: &Path) {
        for candidate in [path.to_path_buf(), partial_path(path)] {
            match tokio::fs::remove_file(&candidate).await {
                Ok(()) => debug!(path = %candidate.display(), "removed partial output"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %candidate.display(), "failed to remove partial output: {}", e),
            }
        }
    }
}

/// Find a header profile whose domain matches the URL host.
fn site_profile(url: &url::Url) -> Option<&'static SiteProfile> {
    let host = url.host_str()?.to_ascii_lowercase();
    SITE_PROFILES
        .iter()
        .find(|p| host == p.domain || host.ends_with(&format!(".{}", p.domain)))
}

/// The tool's in-progress file next to the final output path.
fn partial_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".part");
    PathBuf::from(s)
}

/// Whether a diagnostic line carries the tool's fatal error marker.
///
/// yt-dlp runs with `--ignore-errors` and may exit 0 while still reporting a
/// fatal condition on stderr, so the marker overrides the exit status.
fn is_fatal_marker(line: &str) -> bool {
    static PATTERN: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"^ERROR[: ]").unwrap());
    PATTERN.is_match(line.trim_start())
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn run(&self, job: &mut Job) -> Result<Artifact, ExtractError> {
        let now = Utc::now();
        job.state = JobState::Running;
        job.started_at = Some(now);
        job.deadline = Some(now + chrono::Duration::seconds(self.config.timeout_secs as i64));

        if let Some(parent) = job.output_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                job.state = JobState::Failed;
                return Err(ExtractError::Io(e));
            }
        }

        let args = self.build_args(job);
        debug!(job_id = %job.id, bin = %self.binding.bin().display(), "spawning extractor");

        let spawned = Command::new(self.binding.bin())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                job.state = JobState::Failed;
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::BinaryNotFound {
                        path: self.binding.bin().to_path_buf(),
                    }
                } else {
                    ExtractError::Io(e)
                });
            }
        };

        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut reader = BufReader::new(stderr);

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut tail: VecDeque<String> = VecDeque::new();
            let mut fatal = false;

            // Read raw bytes and decode lossily: the tool's progress output
            // is not guaranteed to be UTF-8, and the pipe must stay drained
            // to the end or the child blocks once the buffer fills.
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                debug!(job_id = %job.id, "extractor stderr: {}", line);
                if is_fatal_marker(&line) {
                    fatal = true;
                }
                tail.push_back(line);
                if tail.len() > STDERR_TAIL_LINES {
                    tail.pop_front();
                }
            }

            let status = child.wait().await?;
            let tail_text = tail.make_contiguous().join("\n");
            Ok::<(std::process::ExitStatus, bool, String), std::io::Error>((status, fatal, tail_text))
        })
        .await;

        let (status, fatal, stderr_tail) = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                job.state = JobState::Failed;
                Self::remove_partial(&job.output_path).await;
                return Err(ExtractError::Io(e));
            }
            Err(_) => {
                // Deadline expired: kill unconditionally and discard partials.
                let _ = child.kill().await;
                Self::remove_partial(&job.output_path).await;
                job.state = JobState::TimedOut;
                return Err(ExtractError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let tail_opt = if stderr_tail.is_empty() {
            None
        } else {
            Some(stderr_tail)
        };

        if !status.success() {
            job.state = JobState::Failed;
            Self::remove_partial(&job.output_path).await;
            return Err(ExtractError::extraction_failed(
                format!("extractor exited with code: {:?}", status.code()),
                tail_opt,
            ));
        }

        if fatal {
            job.state = JobState::Failed;
            Self::remove_partial(&job.output_path).await;
            return Err(ExtractError::extraction_failed(
                "extractor reported a fatal error despite exit 0",
                tail_opt,
            ));
        }

        // Exit 0 alone is not success: there must be a readable non-empty file.
        let meta = match tokio::fs::metadata(&job.output_path).await {
            Ok(m) if m.len() > 0 => m,
            _ => {
                job.state = JobState::Failed;
                Self::remove_partial(&job.output_path).await;
                return Err(ExtractError::extraction_failed(
                    "extractor exited 0 but produced no output file",
                    tail_opt,
                ));
            }
        };

        job.state = JobState::Succeeded;
        Ok(Artifact {
            path: job.output_path.clone(),
            size_bytes: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn extractor_with(config: ExtractorConfig) -> YtDlpExtractor {
        let binding = ExtractorBinding::new_unchecked(config.bin.clone(), "test");
        YtDlpExtractor::new(binding, config)
    }

    fn job_for(url: &str) -> Job {
        Job::new(Url::parse(url).unwrap(), Path::new("/tmp/vidl-test"))
    }

    #[test]
    fn test_build_args_basics() {
        let extractor = extractor_with(ExtractorConfig::default());
        let job = job_for("https://www.youtube.com/watch?v=abc");
        let args = extractor.build_args(&job);

        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(args.contains(&"--ignore-errors".to_string()));
        assert!(args.contains(&FORMAT_SELECTION.to_string()));
        assert!(args.contains(&"--merge-output-format".to_string()));

        // Output path follows -o, URL is the final element
        let o_pos = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o_pos + 1], job.output_path.to_string_lossy());
        assert_eq!(args.last().unwrap(), job.source_url.as_str());
    }

    #[test]
    fn test_build_args_no_cookies_by_default() {
        let extractor = extractor_with(ExtractorConfig::default());
        let args = extractor.build_args(&job_for("https://youtu.be/x"));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_build_args_with_cookies() {
        let config =
            ExtractorConfig::default().with_cookies_file(PathBuf::from("/data/cookies.txt"));
        let extractor = extractor_with(config);
        let args = extractor.build_args(&job_for("https://youtu.be/x"));

        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "/data/cookies.txt");
    }

    #[test]
    fn test_build_args_site_headers() {
        let extractor = extractor_with(ExtractorConfig::default());
        let args = extractor.build_args(&job_for("https://www.instagram.com/reel/xyz"));

        assert!(args.contains(&"--user-agent".to_string()));
        assert!(args
            .iter()
            .any(|a| a == "--add-headers"));
        assert!(args.iter().any(|a| a.starts_with("Referer:")));
    }

    #[test]
    fn test_build_args_no_site_headers_for_plain_domain() {
        let extractor = extractor_with(ExtractorConfig::default());
        let args = extractor.build_args(&job_for("https://www.youtube.com/watch?v=x"));
        assert!(!args.contains(&"--user-agent".to_string()));
    }

    #[test]
    fn test_build_args_extra_args_before_url() {
        let config = ExtractorConfig {
            extra_args: vec!["--proxy".to_string(), "socks5://127.0.0.1:9050".to_string()],
            ..Default::default()
        };
        let extractor = extractor_with(config);
        let job = job_for("https://youtu.be/x");
        let args = extractor.build_args(&job);

        let proxy_pos = args.iter().position(|a| a == "--proxy").unwrap();
        assert!(proxy_pos < args.len() - 1);
        assert_eq!(args.last().unwrap(), job.source_url.as_str());
    }

    #[test]
    fn test_fatal_marker_detection() {
        assert!(is_fatal_marker("ERROR: unable to download video data"));
        assert!(is_fatal_marker("  ERROR: fragment not found"));
        assert!(!is_fatal_marker("[download] 42.0% of 10MiB"));
        assert!(!is_fatal_marker("WARNING: unable to extract thumbnail"));
        assert!(!is_fatal_marker("non-fatal ERROR mentioned mid-line"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/dl_abc.mp4")),
            PathBuf::from("/tmp/dl_abc.mp4.part")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_zero_without_file_is_failure() {
        // /bin/true swallows the yt-dlp flags and exits 0 without writing
        // anything, which must classify as a failure, not success.
        let config = ExtractorConfig::with_bin(PathBuf::from("/bin/true"));
        let extractor = extractor_with(config);
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new(
            Url::parse("https://youtu.be/x").unwrap(),
            dir.path(),
        );

        let err = extractor.run(&mut job).await.unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
        assert_eq!(job.state, JobState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let config = ExtractorConfig::with_bin(PathBuf::from("/bin/false"));
        let extractor = extractor_with(config);
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new(Url::parse("https://youtu.be/x").unwrap(), dir.path());

        let err = extractor.run(&mut job).await.unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed { .. }));
        assert_eq!(job.state, JobState::Failed);
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let config = ExtractorConfig::with_bin(PathBuf::from("/nonexistent/yt-dlp"));
        let extractor = extractor_with(config);
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::new(Url::parse("https://youtu.be/x").unwrap(), dir.path());

        let err = extractor.run(&mut job).await.unwrap_err();
        assert!(matches!(err, ExtractError::BinaryNotFound { .. }));
        // The job must not be left mid-flight when the spawn itself fails.
        assert_eq!(job.state, JobState::Failed);
        assert!(job.state.is_terminal());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_stderr_is_drained() {
        use std::os::unix::fs::PermissionsExt;

        // Emits a non-UTF-8 byte sequence plus enough stderr to overflow the
        // pipe buffer, then writes the output file and exits 0. The run must
        // classify this as success, not stall until the deadline.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("noisy-tool");
        std::fs::write(
            &script,
            concat!(
                "#!/bin/sh\n",
                "out=\"\"\n",
                "while [ $# -gt 1 ]; do\n",
                "  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n",
                "  shift\n",
                "done\n",
                "printf '\\377\\376 not utf-8\\n' >&2\n",
                "i=0\n",
                "while [ $i -lt 4000 ]; do\n",
                "  echo 'downloading fragment, please hold' >&2\n",
                "  i=$((i+1))\n",
                "done\n",
                "echo media > \"$out\"\n",
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ExtractorConfig::with_bin(script).with_timeout(5);
        let extractor = extractor_with(config);
        let mut job = Job::new(Url::parse("https://youtu.be/x").unwrap(), dir.path());

        let artifact = extractor.run(&mut job).await.unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert!(artifact.size_bytes > 0);
    }
}
