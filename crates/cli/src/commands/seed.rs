use salesbook_db::{migrations, BottleCatalogSeed, SeedResult, VerificationResult};

use crate::commands::{connect, load_config, runtime, CommandResult, StepFailure, EXIT_MIGRATION};

const COMMAND: &str = "seed-bottles";

pub fn run() -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let outcome = async {
            let seeded = BottleCatalogSeed::load(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;
            let verification = BottleCatalogSeed::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), EXIT_MIGRATION))?;
            check_verification(&verification)?;
            Ok::<SeedResult, StepFailure>(seeded)
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success(COMMAND, summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}

fn check_verification(verification: &VerificationResult) -> Result<(), StepFailure> {
    if verification.all_present {
        return Ok(());
    }

    let missing: Vec<&str> = verification
        .checks
        .iter()
        .filter_map(|(label, present)| (!present).then_some(label.as_str()))
        .collect();
    let message = if missing.is_empty() {
        "bottle catalog verification failed".to_string()
    } else {
        format!("bottle catalog verification failed for: {}", missing.join(", "))
    };
    Err(("seed_verification", message, EXIT_MIGRATION))
}

fn summary(seeded: &SeedResult) -> String {
    let mut message =
        format!("bottle catalog seeded: {} created, {} updated", seeded.created.len(), seeded.updated.len());
    if !seeded.created.is_empty() {
        message.push_str(&format!(" (new: {})", seeded.created.join(", ")));
    }
    message
}

#[cfg(test)]
mod tests {
    use salesbook_db::{SeedResult, VerificationResult};

    use super::{check_verification, summary};

    #[test]
    fn verification_failure_names_missing_labels() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![("1 ltr".to_string(), true), ("5 ltr".to_string(), false)],
        };

        let (error_class, message, exit_code) =
            check_verification(&verification).expect_err("missing label");
        assert_eq!(error_class, "seed_verification");
        assert_eq!(message, "bottle catalog verification failed for: 5 ltr");
        assert_eq!(exit_code, 5);
    }

    #[test]
    fn summary_lists_new_labels_only_when_something_was_created() {
        let first = SeedResult {
            created: vec!["1 ltr".to_string(), "0.5 ltr".to_string()],
            updated: vec!["5 ltr".to_string()],
        };
        assert_eq!(
            summary(&first),
            "bottle catalog seeded: 2 created, 1 updated (new: 1 ltr, 0.5 ltr)"
        );

        let rerun = SeedResult { created: Vec::new(), updated: vec!["1 ltr".to_string()] };
        assert_eq!(summary(&rerun), "bottle catalog seeded: 0 created, 1 updated");
    }
}
