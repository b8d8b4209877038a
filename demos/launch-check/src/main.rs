use std::process::ExitCode;
use std::sync::Arc;

use waypost::launch::{LaunchFields, sign_fields};
use waypost::prelude::*;

const USAGE: &str = "usage:
  launch-check verify <launch-string>
  launch-check mint <user-id> <first-name>
  launch-check events <lat> <lon> <radius-km>
  launch-check health

environment:
  WAYPOST_BOT_TOKEN        secret the launch string is signed with
  WAYPOST_BASE_URL         backend base URL
  WAYPOST_MAX_AGE_MINUTES  freshness window for auth_date
  RUST_LOG                 log filter";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn verify(config: &AppConfig, raw: &str) -> bool {
    let verifier = Verifier::with_config(Arc::new(SystemClock), config.verifier.clone());
    let result = verifier.verify_default(raw, config.secret());

    println!("valid: {}", result.is_valid);
    match result.is_fresh {
        Some(fresh) => println!("fresh: {fresh}"),
        None => println!("fresh: unknown"),
    }
    if let Some(message) = result.error_message() {
        println!("error: {message}");
    }
    if let Some(fields) = &result.fields {
        let json = serde_json::to_string_pretty(fields).unwrap_or_default();
        println!("fields: {json}");
    }
    result.is_valid
}

/// Signs a fresh launch string for `user`, the way the host would.
fn mint(config: &AppConfig, user_id: i64, first_name: &str) -> Result<String, WaypostError> {
    if config.secret().is_empty() {
        return Err(LaunchError::SecretMissing.into());
    }
    let user = serde_json::json!({ "id": user_id, "first_name": first_name });
    let mut fields = LaunchFields::from_pairs([
        ("auth_date", (SystemClock.now_ms() / 1000).to_string()),
        ("query_id", format!("local-{user_id}")),
        ("user", user.to_string()),
    ]);
    let hash = sign_fields(&fields, config.secret())?;
    fields.push("hash", hash);
    Ok(fields.to_query())
}

async fn events(config: AppConfig, query: EventQuery) -> Result<(), WaypostError> {
    let links = config.deeplink.clone();
    let app = App::builder().config(config).build_http()?;
    app.feed()
        .fetch_public(&query, true, &CancelToken::new())
        .await?;

    for activity in app.feed().state().activities(&links) {
        let json = serde_json::to_string(&activity).unwrap_or_default();
        println!("{json}");
    }
    Ok(())
}

async fn health(config: AppConfig) -> Result<bool, WaypostError> {
    let app = App::builder().config(config).build_http()?;
    let healthy = app.health().await;
    println!("{}", if healthy { "healthy" } else { "unreachable" });
    Ok(healthy)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn parse<T: std::str::FromStr>(arg: Option<&String>, name: &str) -> Result<T, String> {
    arg.ok_or_else(|| format!("missing <{name}>"))?
        .parse()
        .map_err(|_| format!("invalid <{name}>"))
}

async fn run(args: &[String]) -> Result<bool, String> {
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    let command = args.first().map(String::as_str);
    let fail = |e: WaypostError| e.to_string();

    match command {
        Some("verify") => {
            let raw = args.get(1).ok_or("missing <launch-string>")?;
            Ok(verify(&config, raw))
        }
        Some("mint") => {
            let user_id = parse(args.get(1), "user-id")?;
            let name = args.get(2).map_or("User", String::as_str);
            println!("{}", mint(&config, user_id, name).map_err(fail)?);
            Ok(true)
        }
        Some("events") => {
            let query = EventQuery::around(
                parse(args.get(1), "lat")?,
                parse(args.get(2), "lon")?,
                parse(args.get(3), "radius-km")?,
            );
            events(config, query).await.map_err(fail)?;
            Ok(true)
        }
        Some("health") => health(config).await.map_err(fail),
        _ => Err(USAGE.to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    waypost::init_logging("warn,waypost=info");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            tracing::error!(%message, "launch-check failed");
            eprintln!("{message}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: &str) -> AppConfig {
        AppConfig {
            bot_token: Some(token.into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_mint_then_verify_is_valid() {
        let config = config("12:secret");
        let raw = mint(&config, 42, "Ann").unwrap();
        assert!(verify(&config, &raw));
    }

    #[test]
    fn test_verify_with_other_secret_is_invalid() {
        let raw = mint(&config("12:secret"), 42, "Ann").unwrap();
        assert!(!verify(&config("12:other"), &raw));
    }

    #[test]
    fn test_mint_without_secret_fails() {
        let err = mint(&AppConfig::default(), 1, "Ann").unwrap_err();
        assert_eq!(err, WaypostError::Launch(LaunchError::SecretMissing));
    }

    #[tokio::test]
    async fn test_unknown_command_prints_usage() {
        let err = run(&["frobnicate".to_string()]).await.unwrap_err();
        assert!(err.starts_with("usage:"));
    }
}
