//! skill-issue - gamified learning tracker
//!
//! Tracks scored challenges, XP and streaks, and a per-concept mastery model
//! for each knowledge domain.

use skill_issue::cli;

fn main() -> anyhow::Result<()> {
    // WARN by default, RUST_LOG=skill_issue=debug for detail
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    cli::run()
}
