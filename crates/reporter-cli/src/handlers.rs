#![deny(clippy::all, clippy::pedantic)]

use reporter_api_types::{
    ArtifactResponse, BeyonderDataResponse, BeyonderLogsResponse, CacheStatsResponse,
    CommandRequest, CommandResponse, PathwayRecord, SnapshotRecord,
};
use reqwest::Method;

use crate::args::{CacheCmd, Commands};
use crate::client::{CliError, Ctx, Listener};
use crate::print::{print_json, print_lines};

const NO_BODY: Option<&()> = None;

pub async fn handle(ctx: &Ctx, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Pathway { player } => {
            let record: PathwayRecord = ctx
                .request(
                    Method::GET,
                    Listener::Public,
                    &["pathway", "single", &player],
                    NO_BODY,
                )
                .await?;
            print_json(&record)
        }
        Commands::Everyone => {
            let snapshot: SnapshotRecord = ctx
                .request(
                    Method::GET,
                    Listener::Public,
                    &["pathway", "everyone"],
                    NO_BODY,
                )
                .await?;
            print_json(&snapshot)
        }
        Commands::Beyonder { player } => {
            let data: BeyonderDataResponse = ctx
                .request(Method::GET, Listener::Public, &["beyonder", &player], NO_BODY)
                .await?;
            print_json(&data)
        }
        Commands::Logs { player, amount } => {
            let logs: BeyonderLogsResponse = ctx
                .request(
                    Method::GET,
                    Listener::Public,
                    &["beyonder", "logs", &player, &amount],
                    NO_BODY,
                )
                .await?;
            print_json(&logs)
        }
        Commands::Artifact { id } => {
            let artifact: ArtifactResponse = ctx
                .request(Method::GET, Listener::Public, &["artifact", &id], NO_BODY)
                .await?;
            print_json(&artifact)
        }
        Commands::Cache(args) => handle_cache(ctx, args.action).await,
        Commands::Command { args } => {
            let response: CommandResponse = ctx
                .request(
                    Method::POST,
                    Listener::Admin,
                    &["command"],
                    Some(&CommandRequest { args }),
                )
                .await?;
            print_lines(&response.lines);
            Ok(())
        }
        Commands::Health => {
            ctx.request_no_body(Method::GET, Listener::Admin, &["health"])
                .await?;
            println!("ok");
            Ok(())
        }
    }
}

pub async fn handle_cache(ctx: &Ctx, action: CacheCmd) -> Result<(), CliError> {
    let response: CommandResponse = match action {
        CacheCmd::Stats => {
            let stats: CacheStatsResponse = ctx
                .request(Method::GET, Listener::Admin, &["cache", "stats"], NO_BODY)
                .await?;
            return print_json(&stats);
        }
        CacheCmd::Refresh => {
            ctx.request(Method::POST, Listener::Admin, &["cache", "refresh"], NO_BODY)
                .await?
        }
        CacheCmd::Clear { player: None } => {
            ctx.request(Method::POST, Listener::Admin, &["cache", "clear"], NO_BODY)
                .await?
        }
        CacheCmd::Clear {
            player: Some(player),
        } => {
            ctx.request(
                Method::POST,
                Listener::Admin,
                &["cache", "clear", &player],
                NO_BODY,
            )
            .await?
        }
        CacheCmd::Reload => {
            ctx.request(Method::POST, Listener::Admin, &["cache", "reload"], NO_BODY)
                .await?
        }
    };
    print_lines(&response.lines);
    Ok(())
}
