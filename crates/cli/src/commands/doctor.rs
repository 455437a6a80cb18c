use salesbook_core::config::{AppConfig, LoadOptions};
use salesbook_db::{connect_with_settings, migrations::MIGRATOR};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_DATABASE, EXIT_MIGRATION, EXIT_RUNTIME};

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
    #[serde(skip)]
    exit_code: u8,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into(), exit_code: 0 }
    }

    fn fail(name: &'static str, details: impl Into<String>, exit_code: u8) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into(), exit_code }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because an earlier check failed".to_string(),
            exit_code: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn from_checks(checks: Vec<DoctorCheck>) -> Self {
        let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
        let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
        let summary = if all_pass {
            "doctor: all readiness checks passed".to_string()
        } else {
            "doctor: one or more readiness checks failed".to_string()
        };
        Self { overall_status, summary, checks }
    }

    /// Exit code of the first failing check, 0 when everything passed.
    fn exit_code(&self) -> u8 {
        self.checks
            .iter()
            .find(|check| check.status == CheckStatus::Fail)
            .map(|check| check.exit_code)
            .unwrap_or(0)
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = report.exit_code();

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
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return DoctorReport::from_checks(vec![
                DoctorCheck::fail("config_validation", error.to_string(), EXIT_CONFIG),
                DoctorCheck::skipped("login_readiness"),
                DoctorCheck::skipped("database_connectivity"),
                DoctorCheck::skipped("schema_migrations"),
            ]);
        }
    };

    let mut checks = vec![
        DoctorCheck::pass("config_validation", "configuration loaded and validated"),
        check_login(&config),
    ];
    checks.extend(check_database(&config));
    DoctorReport::from_checks(checks)
}

fn check_login(config: &AppConfig) -> DoctorCheck {
    if config.auth.password.is_some() {
        DoctorCheck::pass("login_readiness", format!("login enabled for `{}`", config.auth.username))
    } else {
        DoctorCheck::fail(
            "login_readiness",
            "auth.password is not set (SALESBOOK_AUTH_PASSWORD); every login will be rejected",
            EXIT_CONFIG,
        )
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                    EXIT_RUNTIME,
                ),
                DoctorCheck::skipped("schema_migrations"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                        EXIT_DATABASE,
                    ),
                    DoctorCheck::skipped("schema_migrations"),
                ];
            }
        };

        let connectivity = DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        );
        let expected =
            MIGRATOR.iter().filter(|migration| migration.migration_type.is_up_migration()).count();
        let applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&pool)
        .await;
        pool.close().await;

        let migrations_check = match applied {
            Ok(applied) if applied as usize >= expected => DoctorCheck::pass(
                "schema_migrations",
                format!("{applied} of {expected} migration(s) applied"),
            ),
            Ok(applied) => DoctorCheck::fail(
                "schema_migrations",
                format!("{applied} of {expected} migration(s) applied; run `salesbook migrate`"),
                EXIT_MIGRATION,
            ),
            Err(_) => DoctorCheck::fail(
                "schema_migrations",
                "schema not initialised; run `salesbook migrate`",
                EXIT_MIGRATION,
            ),
        };

        vec![connectivity, migrations_check]
    })
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

#[cfg(test)]
mod tests {
    use super::{render_human, DoctorCheck, DoctorReport};

    #[test]
    fn first_failure_decides_the_exit_code() {
        let report = DoctorReport::from_checks(vec![
            DoctorCheck::pass("config_validation", "ok"),
            DoctorCheck::fail("database_connectivity", "refused", 4),
            DoctorCheck::fail("schema_migrations", "missing", 5),
        ]);

        assert_eq!(report.exit_code(), 4);
        assert_eq!(report.summary, "doctor: one or more readiness checks failed");
    }

    #[test]
    fn human_output_marks_each_check() {
        let report = DoctorReport::from_checks(vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            DoctorCheck::skipped("schema_migrations"),
        ]);

        let text = render_human(&report);
        assert!(text.starts_with("doctor: one or more readiness checks failed"));
        assert!(text.contains("- [ok] config_validation: configuration loaded and validated"));
        assert!(text.contains("- [skip] schema_migrations"));
        assert_eq!(report.exit_code(), 0);
    }
}
