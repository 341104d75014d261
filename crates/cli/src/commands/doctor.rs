use std::time::Duration;

use relay_core::config::{AppConfig, LoadOptions, RagTransportKind};
use serde::Serialize;

use crate::commands::CommandResult;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_rag_backend(&config));
            checks.push(check_language_model(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["rag_backend", "language_model"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // A skipped check is not a failure.
    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_rag_backend(config: &AppConfig) -> DoctorCheck {
    let name = "rag_backend";
    match (config.rag.transport, config.rag_endpoint()) {
        (RagTransportKind::InProcess, _) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: "pipeline runs in-process".to_string(),
        },
        (kind, Some(base_url)) => probe(name, &format!("{base_url}/health"), kind.as_str()),
        (kind, None) => DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("rag.base_url is required for the `{}` transport", kind.as_str()),
        },
    }
}

fn check_language_model(config: &AppConfig) -> DoctorCheck {
    let name = "language_model";
    match &config.llm.base_url {
        Some(base_url) => {
            let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
            probe(name, &url, "ollama")
        }
        None => DoctorCheck {
            name,
            status: CheckStatus::Skipped,
            details: "llm.base_url is unset; generation is stubbed".to_string(),
        },
    }
}

fn probe(name: &'static str, url: &str, label: &str) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name,
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|error| format!("failed to build http client: {error}"))?;
        let response =
            client.get(url).send().await.map_err(|error| format!("unreachable: {error}"))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("returned {status}"))
        }
    });

    match result {
        Ok(()) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("{label} backend answered at `{url}`"),
        },
        Err(error) => DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("{label} backend at `{url}`: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
