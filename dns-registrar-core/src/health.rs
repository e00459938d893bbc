//! HTTP health probing of registered names.
//!
//! Every unit's root name is probed over HTTPS with manual redirect
//! handling, a shared minimum-interval gate between outbound requests, and
//! a small attempt/hop state machine. A probe never escapes as an error;
//! every outcome is folded into a [`HealthCheckResult`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, warn};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::GlobalConfig;
use crate::error::{CoreError, CoreResult};
use crate::registry::{DomainRegistry, RegisteredUnit};

const PROBE_TIMEOUT_SECS: u64 = 5;
const MAX_ATTEMPTS: u32 = 3;
/// Requests allowed within one attempt, counting the first.
const HOP_BUDGET: u32 = 3;
const FIRST_BACKOFF: Duration = Duration::from_millis(500);
const USER_AGENT: &str = "dns-registrar-healthcheck/0.1";

/// Minimum-interval gate shared by all probe tasks.
///
/// Each caller is assigned the next free slot and sleeps until it; the lock
/// only covers slot assignment, so a slow request never blocks the gate.
pub struct RateGate {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RateGate {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Wait until this caller's slot comes up.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Outcome of probing (or skipping) one registered name.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub fqdn: String,
    pub owner: String,
    pub accessible: bool,
    /// Where the probe ended up, when that differs from the probed name:
    /// the landing URL after redirects on success, or the offending target
    /// when a redirect left the domain.
    pub final_url: Option<String>,
    pub error: Option<String>,
    /// True when no request was issued at all.
    pub skipped: bool,
}

enum AttemptOutcome {
    Success { final_url: Option<String> },
    /// Transient or local failure; the next attempt may do better.
    Failed,
    /// Redirect left the registered domain. A configuration fact, not a
    /// fault: no further attempts. Carries where it went.
    OutOfScope { target: String },
}

/// Whether a redirect target stays within the registered domain.
fn in_scope(target: &Url, domain: &str) -> bool {
    match target.host_str() {
        Some(host) => {
            let host = host.trim_end_matches('.');
            host == domain || host.ends_with(&format!(".{domain}"))
        }
        None => false,
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    FIRST_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Render all attempts' traces into one diagnostic line.
fn format_attempts(attempts: &[Vec<String>]) -> String {
    if attempts.len() == 1 {
        return attempts[0].join("; ");
    }
    attempts
        .iter()
        .enumerate()
        .map(|(i, steps)| format!("attempt {}: {}", i + 1, steps.join("; ")))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Skip rules, applied before any request is issued.
fn skip_result(unit: &RegisteredUnit) -> Option<HealthCheckResult> {
    let base = HealthCheckResult {
        fqdn: unit.fqdn(),
        owner: unit.config.owner.github.clone(),
        accessible: false,
        final_url: None,
        error: None,
        skipped: true,
    };
    if unit.config.nocheck {
        // opted out; reported accessible so it never raises an alert
        return Some(HealthCheckResult {
            accessible: true,
            ..base
        });
    }
    if !unit.config.has_routable_root() {
        return Some(HealthCheckResult {
            error: Some("no A/AAAA/CNAME/NS record at '@'; nothing to probe".to_string()),
            ..base
        });
    }
    None
}

/// Concurrent HTTPS prober over a registry.
pub struct HealthProber {
    client: reqwest::Client,
    gate: Arc<RateGate>,
}

impl HealthProber {
    /// # Errors
    ///
    /// Fails only when the HTTP client cannot be constructed.
    pub fn new(cfg: &GlobalConfig) -> CoreResult<Self> {
        Self::with_gate(Arc::new(RateGate::new(Duration::from_millis(
            cfg.probe_interval_ms,
        ))))
    }

    /// Build a prober around an externally owned gate, for callers that
    /// share one gate across several probers.
    ///
    /// # Errors
    ///
    /// Fails only when the HTTP client cannot be constructed.
    pub fn with_gate(gate: Arc<RateGate>) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::HttpClient(e.to_string()))?;
        Ok(Self { client, gate })
    }

    /// Probe every unit in the registry. Results come back in unit order;
    /// individual failures (including panics inside a probe task) never
    /// abort the run.
    pub async fn check_all(&self, registry: &DomainRegistry) -> Vec<HealthCheckResult> {
        let mut results: Vec<Option<HealthCheckResult>> = Vec::new();
        let mut tasks = Vec::new();

        for unit in registry.units() {
            if let Some(skipped) = skip_result(unit) {
                debug!("skipping probe of {}", skipped.fqdn);
                results.push(Some(skipped));
                continue;
            }
            let client = self.client.clone();
            let gate = Arc::clone(&self.gate);
            let fqdn = unit.fqdn();
            let owner = unit.config.owner.github.clone();
            let domain = unit.domain.clone();
            let handle = tokio::spawn({
                let fqdn = fqdn.clone();
                async move { probe_name(&client, &gate, fqdn, owner, &domain).await }
            });
            tasks.push((results.len(), fqdn, handle));
            results.push(None);
        }

        let (meta, handles): (Vec<_>, Vec<_>) = tasks
            .into_iter()
            .map(|(slot, fqdn, handle)| ((slot, fqdn), handle))
            .unzip();
        for ((slot, fqdn), outcome) in meta.into_iter().zip(join_all(handles).await) {
            results[slot] = Some(match outcome {
                Ok(result) => result,
                Err(e) => {
                    // a panic here is a defect in the prober itself
                    error!("probe task for {fqdn} failed: {e}");
                    HealthCheckResult {
                        fqdn,
                        owner: String::new(),
                        accessible: false,
                        final_url: None,
                        error: Some(format!("internal probe failure: {e}")),
                        skipped: false,
                    }
                }
            });
        }

        results.into_iter().flatten().collect()
    }
}

/// Everything one probe run produced, before packaging into a result.
struct ProbeOutcome {
    accessible: bool,
    final_url: Option<String>,
    attempts: Vec<Vec<String>>,
}

async fn probe_name(
    client: &reqwest::Client,
    gate: &RateGate,
    fqdn: String,
    owner: String,
    domain: &str,
) -> HealthCheckResult {
    let outcome = probe_url(client, gate, &format!("https://{fqdn}/"), domain).await;
    if outcome.accessible {
        HealthCheckResult {
            fqdn,
            owner,
            accessible: true,
            final_url: outcome.final_url,
            error: None,
            skipped: false,
        }
    } else {
        warn!("{fqdn} is not accessible");
        HealthCheckResult {
            fqdn,
            owner,
            accessible: false,
            final_url: outcome.final_url,
            error: Some(format_attempts(&outcome.attempts)),
            skipped: false,
        }
    }
}

async fn probe_url(
    client: &reqwest::Client,
    gate: &RateGate,
    start_url: &str,
    domain: &str,
) -> ProbeOutcome {
    let mut attempts: Vec<Vec<String>> = Vec::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let mut trace = Vec::new();
        let outcome = run_attempt(client, gate, start_url, domain, &mut trace).await;
        attempts.push(trace);

        match outcome {
            AttemptOutcome::Success { final_url } => {
                return ProbeOutcome {
                    accessible: true,
                    final_url,
                    attempts,
                };
            }
            AttemptOutcome::OutOfScope { target } => {
                return ProbeOutcome {
                    accessible: false,
                    final_url: Some(target),
                    attempts,
                };
            }
            AttemptOutcome::Failed => {
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    ProbeOutcome {
        accessible: false,
        final_url: None,
        attempts,
    }
}

async fn run_attempt(
    client: &reqwest::Client,
    gate: &RateGate,
    start_url: &str,
    domain: &str,
    trace: &mut Vec<String>,
) -> AttemptOutcome {
    let mut url = start_url.to_string();

    for hop in 1..=HOP_BUDGET {
        gate.acquire().await;

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                trace.push(format!("GET {url} failed: {e}"));
                return AttemptOutcome::Failed;
            }
        };
        let status = response.status();

        if status.as_u16() == 200 {
            trace.push(format!("GET {url} -> 200"));
            return AttemptOutcome::Success {
                final_url: (hop > 1).then(|| url.clone()),
            };
        }

        if status.is_redirection() {
            let Some(location) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                trace.push(format!("GET {url} -> {status} without a Location header"));
                return AttemptOutcome::Failed;
            };
            let Ok(target) = Url::parse(&url).and_then(|base| base.join(location)) else {
                trace.push(format!("GET {url} -> {status} with unparsable Location '{location}'"));
                return AttemptOutcome::Failed;
            };
            if !in_scope(&target, domain) {
                trace.push(format!(
                    "GET {url} -> {status} redirects out of {domain} to {target}"
                ));
                return AttemptOutcome::OutOfScope {
                    target: target.to_string(),
                };
            }
            trace.push(format!("GET {url} -> {status} to {target}"));
            if hop == HOP_BUDGET {
                trace.push("too many redirects".to_string());
                return AttemptOutcome::Failed;
            }
            url = target.to_string();
            continue;
        }

        trace.push(format!("GET {url} -> {status}"));
        return AttemptOutcome::Failed;
    }

    AttemptOutcome::Failed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rate_gate_spaces_acquisitions() {
        let gate = RateGate::new(Duration::from_millis(200));
        let start = Instant::now();
        gate.acquire().await;
        gate.acquire().await;
        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(start.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_gate_orders_concurrent_callers() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(100)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.acquire().await;
                    start.elapsed()
                })
            })
            .collect();
        let mut times: Vec<Duration> = join_all(tasks)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        times.sort_unstable();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[test]
    fn scope_check_matches_domain_and_subdomains() {
        let cases = [
            ("https://ciao.su/", true),
            ("https://blog.ciao.su/path", true),
            ("https://deep.blog.ciao.su/", true),
            ("https://notciao.su/", false),
            ("https://example.com/", false),
            ("https://ciao.su.evil.com/", false),
        ];
        for (target, expected) in cases {
            let url = Url::parse(target).unwrap();
            assert_eq!(in_scope(&url, "ciao.su"), expected, "{target}");
        }
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
    }

    #[test]
    fn trace_formatting_single_and_multi_attempt() {
        let single = vec![vec!["GET https://a/ -> 503".to_string()]];
        assert_eq!(format_attempts(&single), "GET https://a/ -> 503");

        let multi = vec![
            vec!["GET https://a/ -> 503".to_string()],
            vec![
                "GET https://a/ -> 301 to https://b/".to_string(),
                "GET https://b/ -> 500".to_string(),
            ],
        ];
        assert_eq!(
            format_attempts(&multi),
            "attempt 1: GET https://a/ -> 503 | attempt 2: GET https://a/ -> 301 to https://b/; GET https://b/ -> 500"
        );
    }

    fn unit(nocheck: bool, records: serde_json::Value) -> RegisteredUnit {
        let raw = json!({
            "description": "test",
            "owner": {
                "github": "octocat",
                "name": "Octo Cat",
                "email": "octo@example.com"
            },
            "nocheck": nocheck,
            "records": records
        });
        DomainRegistry::load_unit("ciao.su", "myblog", &raw, &GlobalConfig::default()).unwrap()
    }

    #[test]
    fn nocheck_units_skip_as_accessible() {
        let unit = unit(true, json!([{"type": "A", "name": "@", "content": "192.0.2.1"}]));
        let result = skip_result(&unit).expect("should skip");
        assert!(result.skipped);
        assert!(result.accessible);
        assert!(result.error.is_none());
    }

    #[test]
    fn unroutable_roots_skip_as_inaccessible() {
        let unit = unit(false, json!([{"type": "TXT", "name": "@", "content": "hi"}]));
        let result = skip_result(&unit).expect("should skip");
        assert!(result.skipped);
        assert!(!result.accessible);
        assert!(result.error.unwrap().contains("nothing to probe"));
    }

    #[test]
    fn routable_roots_are_probed() {
        let unit = unit(false, json!([{"type": "A", "name": "@", "content": "192.0.2.1"}]));
        assert!(skip_result(&unit).is_none());
    }

    // ============ probe state machine against a local listener ============

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 responder: routes by path, one response per
    /// connection.
    async fn spawn_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or("/")
                        .to_string();
                    let response = match path.as_str() {
                        "/ok" => {
                            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
                                .to_string()
                        }
                        "/redir" => {
                            "HTTP/1.1 302 Found\r\nlocation: /ok\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                                .to_string()
                        }
                        "/away" => {
                            "HTTP/1.1 302 Found\r\nlocation: https://elsewhere.example/\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                                .to_string()
                        }
                        "/loop" => {
                            "HTTP/1.1 302 Found\r\nlocation: /loop\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                                .to_string()
                        }
                        _ => {
                            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                                .to_string()
                        }
                    };
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        port
    }

    fn probe_client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_scope_redirect_to_200_succeeds_on_first_attempt() {
        let port = spawn_server().await;
        let client = probe_client();
        let gate = RateGate::new(Duration::from_millis(1));

        let outcome = probe_url(
            &client,
            &gate,
            &format!("http://127.0.0.1:{port}/redir"),
            "127.0.0.1",
        )
        .await;
        assert!(outcome.accessible);
        assert_eq!(
            outcome.final_url.as_deref(),
            Some(format!("http://127.0.0.1:{port}/ok").as_str())
        );
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn direct_200_reports_no_final_url() {
        let port = spawn_server().await;
        let client = probe_client();
        let gate = RateGate::new(Duration::from_millis(1));

        let outcome = probe_url(
            &client,
            &gate,
            &format!("http://127.0.0.1:{port}/ok"),
            "127.0.0.1",
        )
        .await;
        assert!(outcome.accessible);
        assert!(outcome.final_url.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn out_of_scope_redirect_ends_probe_after_one_attempt() {
        let port = spawn_server().await;
        let client = probe_client();
        let gate = RateGate::new(Duration::from_millis(1));

        let outcome = probe_url(
            &client,
            &gate,
            &format!("http://127.0.0.1:{port}/away"),
            "127.0.0.1",
        )
        .await;
        assert!(!outcome.accessible);
        assert_eq!(outcome.attempts.len(), 1, "definitive failure, no retries");
        assert_eq!(
            outcome.final_url.as_deref(),
            Some("https://elsewhere.example/"),
            "the offending target is reported"
        );
        assert!(format_attempts(&outcome.attempts).contains("redirects out of 127.0.0.1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn redirect_loop_exhausts_hop_budget() {
        let port = spawn_server().await;
        let client = probe_client();
        let gate = RateGate::new(Duration::from_millis(1));

        let mut trace = Vec::new();
        let outcome = run_attempt(
            &client,
            &gate,
            &format!("http://127.0.0.1:{port}/loop"),
            "127.0.0.1",
            &mut trace,
        )
        .await;
        assert!(matches!(outcome, AttemptOutcome::Failed));
        assert_eq!(trace.last().map(String::as_str), Some("too many redirects"));
        // the budget allows exactly HOP_BUDGET requests
        let hops = trace.iter().filter(|s| s.starts_with("GET ")).count();
        assert_eq!(hops, HOP_BUDGET as usize);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_error_fails_the_attempt() {
        let port = spawn_server().await;
        let client = probe_client();
        let gate = RateGate::new(Duration::from_millis(1));

        let mut trace = Vec::new();
        let outcome = run_attempt(
            &client,
            &gate,
            &format!("http://127.0.0.1:{port}/fail"),
            "127.0.0.1",
            &mut trace,
        )
        .await;
        assert!(matches!(outcome, AttemptOutcome::Failed));
        assert!(trace[0].contains("500"));
    }
}
