use crate::api;
use crate::api::state::AppConfig;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use std::time::Duration;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            rate_limit_quota,
            rate_limit_window_seconds,
            production,
        } => {
            let config = AppConfig::new()
                .with_secure_cookies(production)
                .with_hash_cost(globals.hash_cost)
                .with_rate_limit(
                    i64::from(rate_limit_quota),
                    Duration::from_secs(rate_limit_window_seconds),
                );

            api::new(port, dsn, globals, config).await?;
        }
    }

    Ok(())
}
