//! The `examlens init` command.

use anyhow::Result;

use examlens_client::config::CONFIG_FILE_NAME;

pub fn execute() -> Result<()> {
    if std::path::Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, SAMPLE_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE_NAME} with your backend URL and token");
    println!("  2. Run: examlens sync");
    println!("  3. Run: examlens results --attempt-id <id>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examlens configuration

base_url = "https://exams.example.com"
api_token = "${EXAMLENS_TOKEN}"
timeout_secs = 30

# Locally started attempts are kept this long while the backend catches up.
trust_window_secs = 300

# cache_path = "/home/me/.cache/examlens/attempts.json"
# language = "en"

[endpoints]
attempt_detail = "/api/attempts/{attempt_id}"
analysis = "/api/attempts/{attempt_id}/analysis"
solutions = "/api/attempts/{attempt_id}/solutions"
user_attempts = "/api/user/attempts"
user_attempts_fallback = "/api/attempts/user"
reattempt = "/api/exam-sets/{exam_set_id}/reattempt"
"#;
