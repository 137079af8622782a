pub mod limiter;
pub mod probe;
pub mod protection;

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use url::Url;

use crate::model::validation::{ValidationCache, ValidationResult};
use limiter::ConcurrencyLimiter;
use probe::{HttpProber, Method, Probe, ProbeError};

/// Settings for one validator instance.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Worker threads per batch.
    pub workers: usize,
    pub timeout: Duration,
    /// Sleep before every network attempt.
    pub pacing: Duration,
    pub max_redirects: u32,
    /// Retry challenge-page failures once with a browser-style GET.
    pub retry_protected: bool,
    pub user_agent: String,
    pub use_env_proxy: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout: Duration::from_secs(10),
            pacing: Duration::from_millis(100),
            max_redirects: 10,
            retry_protected: false,
            user_agent: format!("fedcheck/{} (privacy statement checker)", env!("CARGO_PKG_VERSION")),
            use_env_proxy: true,
        }
    }
}

/// Batch URL checking, as seen by the aggregation pass.
pub trait LinkChecker {
    /// One result per distinct input URL, keyed by the URL as given.
    fn check_batch(
        &self,
        urls: &[String],
        cache: Option<&mut ValidationCache>,
        limiter: &ConcurrencyLimiter,
    ) -> HashMap<String, ValidationResult>;
}

pub struct UrlValidator {
    config: ValidatorConfig,
    prober: HttpProber,
}

impl UrlValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        let prober = HttpProber::new(
            config.timeout,
            config.max_redirects,
            &config.user_agent,
            config.use_env_proxy,
        );
        Self { config, prober }
    }

    /// Check one trimmed, non-empty URL against the network. Never fails;
    /// problems are reported in the result.
    pub fn check_url(&self, url: &str, limiter: &ConcurrencyLimiter) -> ValidationResult {
        let parsed = match Url::parse(url) {
            Ok(u) if u.has_host() => u,
            _ => return ValidationResult::failed(url, "Invalid URL format"),
        };

        let _ticket = limiter.acquire();

        let mut outcome = self.fetch(&parsed, Method::Head);
        let mut retry: Option<Method> = None;

        // Some servers refuse HEAD outright.
        if matches!(&outcome, Ok(p) if matches!(p.status, 405 | 501)) {
            retry = Some(Method::Get);
            outcome = self.fetch(&parsed, Method::Get);
        }

        let mut result = to_result(url, &outcome);
        if let Some(method) = retry {
            result.retry_method = Some(method.retry_label().to_string());
            result.retry_succeeded = Some(result.accessible);
        }
        if result.accessible {
            return result;
        }

        let Ok(failed) = &outcome else {
            return result;
        };
        let vendor = protection::detect(&failed.headers, failed.body.as_deref());
        if let Some(vendor) = vendor {
            tracing::info!(url, vendor, status = failed.status, "bot protection detected");
            result.protection_detected = Some(vendor.to_string());
        }

        if !self.config.retry_protected
            || (vendor.is_none() && !protection::is_challenge_status(failed.status))
        {
            return result;
        }

        let retried = self.fetch(&parsed, Method::BrowserGet);
        let mut retry_result = to_result(url, &retried);
        if let Ok(p) = &retried {
            if result.protection_detected.is_none() {
                result.protection_detected =
                    protection::detect(&p.headers, p.body.as_deref()).map(str::to_string);
            }
        }

        if retry_result.accessible {
            retry_result.protection_detected = result.protection_detected.take();
            retry_result.retry_method = Some(Method::BrowserGet.retry_label().to_string());
            retry_result.retry_succeeded = Some(true);
            return retry_result;
        }

        result.retry_method = Some(Method::BrowserGet.retry_label().to_string());
        result.retry_succeeded = Some(false);
        result
    }

    fn fetch(&self, url: &Url, method: Method) -> Result<Probe, ProbeError> {
        if !self.config.pacing.is_zero() {
            thread::sleep(self.config.pacing);
        }
        let outcome = self.prober.fetch(url, method);
        match &outcome {
            Ok(p) => tracing::debug!(url = %url, ?method, status = p.status, redirects = p.redirects, "probe finished"),
            Err(e) => tracing::debug!(url = %url, ?method, error = %e, "probe failed"),
        }
        outcome
    }
}

fn to_result(url: &str, outcome: &Result<Probe, ProbeError>) -> ValidationResult {
    match outcome {
        Ok(p) => ValidationResult::from_status(p.status, p.final_url.clone(), p.redirects),
        Err(e) => ValidationResult::failed(url, &e.to_string()),
    }
}

impl LinkChecker for UrlValidator {
    fn check_batch(
        &self,
        urls: &[String],
        mut cache: Option<&mut ValidationCache>,
        limiter: &ConcurrencyLimiter,
    ) -> HashMap<String, ValidationResult> {
        let mut results = HashMap::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<(String, String)> = Vec::new();

        for url in urls {
            if !seen.insert(url.as_str()) {
                continue;
            }
            let normalized = url.trim();
            if normalized.is_empty() {
                results.insert(url.clone(), ValidationResult::failed("", "Empty URL"));
                continue;
            }
            if let Some(hit) = cache.as_deref().and_then(|c| c.get(normalized)) {
                results.insert(url.clone(), hit);
                continue;
            }
            pending.push((url.clone(), normalized.to_string()));
        }

        let cached = results.len();
        if pending.is_empty() {
            tracing::debug!(distinct = cached, "validation batch served without network");
            return results;
        }

        let workers = self.config.workers.max(1).min(pending.len());
        tracing::info!(
            urls = pending.len(),
            cached,
            workers,
            max_in_flight = limiter.capacity(),
            "validating URLs"
        );

        let inputs: Vec<String> = pending.iter().map(|(input, _)| input.clone()).collect();
        let (job_tx, job_rx) = mpsc::channel::<(String, String)>();
        for job in pending {
            // The receiver lives until the end of this function.
            let _ = job_tx.send(job);
        }
        drop(job_tx);
        let job_rx = Mutex::new(job_rx);

        thread::scope(|s| {
            let (done_tx, done_rx) = mpsc::channel::<(String, String, ValidationResult)>();

            for _ in 0..workers {
                let done_tx = done_tx.clone();
                let job_rx = &job_rx;
                s.spawn(move || loop {
                    let job = match job_rx.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => break,
                    };
                    let Ok((input, normalized)) = job else {
                        break;
                    };
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.check_url(&normalized, limiter)
                    }))
                    .unwrap_or_else(|_| {
                        tracing::warn!(url = %normalized, "URL check panicked");
                        ValidationResult::failed(&normalized, "Error: internal failure")
                    });
                    if done_tx.send((input, normalized, result)).is_err() {
                        break;
                    }
                });
            }
            drop(done_tx);

            for (input, normalized, result) in done_rx {
                if let Some(cache) = cache.as_deref_mut() {
                    cache.insert(normalized, result.clone());
                }
                results.insert(input, result);
            }
        });

        for input in inputs {
            results.entry(input).or_insert_with_key(|url| {
                ValidationResult::failed(url.trim(), "Error: validation did not complete")
            });
        }

        let broken = results.values().filter(|r| !r.accessible).count();
        tracing::info!(total = results.len(), broken, "validation batch complete");
        results
    }
}
