#![deny(clippy::all, clippy::pedantic)]

use clap::Parser;
use httpmock::MockServer;

use crate::args::{CacheCmd, Cli, Commands};
use crate::client::{CliError, Ctx, Listener, build_ctx_from_cli};
use crate::handlers;

fn ctx(server: &MockServer) -> Ctx {
    let base = server.base_url();
    Ctx::new(Some(&base), Some(&base)).expect("ctx")
}

#[test]
fn url_segments_are_encoded() -> Result<(), CliError> {
    let ctx = Ctx::new(Some("http://127.0.0.1:8080/reporter/"), None)?;
    let url = ctx.url(Listener::Public, &["pathway", "single", "a b/c"])?;
    assert_eq!(
        url.as_str(),
        "http://127.0.0.1:8080/reporter/pathway/single/a%20b%2Fc"
    );
    Ok(())
}

#[test]
fn admin_url_is_required_for_admin_calls() {
    let cli = Cli::parse_from([
        "reporter-cli",
        "--public-url",
        "http://127.0.0.1:8080",
        "cache",
        "stats",
    ]);
    let ctx = build_ctx_from_cli(&cli).expect("ctx");
    let err = ctx
        .url(Listener::Admin, &["cache", "stats"])
        .expect_err("missing admin url");
    assert!(matches!(err, CliError::MissingAdmin));
}

#[test]
fn logs_amount_defaults_to_ten() {
    let cli = Cli::parse_from(["reporter-cli", "logs", "Klein"]);
    match cli.command {
        Commands::Logs { player, amount } => {
            assert_eq!(player, "Klein");
            assert_eq!(amount, "10");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn command_collects_trailing_args() {
    let cli = Cli::parse_from(["reporter-cli", "command", "clear", "Klein"]);
    match cli.command {
        Commands::Command { args } => assert_eq!(args, vec!["clear", "Klein"]),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[tokio::test]
async fn pathway_hits_public_endpoint() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/pathway/single/Klein");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"player":"Klein","beyonder":true,"pathway":"seer","sequence":"7","acting":"0.5"}"#);
    });

    handlers::handle(
        &ctx(&server),
        Commands::Pathway {
            player: "Klein".into(),
        },
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn clear_player_posts_to_admin() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/cache/clear/Klein");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"lines":["Cache cleared for player: Klein"]}"#);
    });

    handlers::handle_cache(
        &ctx(&server),
        CacheCmd::Clear {
            player: Some("Klein".into()),
        },
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn free_form_command_sends_args() -> Result<(), CliError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/command")
            .json_body(serde_json::json!({"args": ["stats"]}));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"lines":["=== Cache Statistics ==="]}"#);
    });

    handlers::handle(
        &ctx(&server),
        Commands::Command {
            args: vec!["stats".into()],
        },
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/pathway/everyone");
        then.status(503).body(r#"{"error":"Source unavailable"}"#);
    });

    let err = handlers::handle(&ctx(&server), Commands::Everyone)
        .await
        .expect_err("503 fails");
    match err {
        CliError::Server(message) => assert!(message.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }
}
