//! Terminal reaction game. Press Enter to play, `q` then Enter to quit.
//!
//! Sessions go to `REACTION_RESULT_URL` when set; otherwise they are kept in
//! an in-memory result store whose leaderboard is printed on exit.

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use reflex_board::{
    config::AppConfig,
    dao::memory::MemoryBlobStore,
    reaction::{
        game::{GameOptions, GameView, ReactionGame},
        state_machine::ReactionPhase,
        submit::{HttpSubmitter, LocalSubmitter, ResultSubmitter},
        variant::GameVariant,
    },
    services::{ranking::Location, result_service},
    state::{AppState, SharedState},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long quitting waits for a session that is still being submitted.
const SUBMIT_GRACE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let test_type = env::args()
        .nth(1)
        .unwrap_or_else(|| config.default_test_type.clone());
    let variant = GameVariant::preset(&test_type)
        .unwrap_or_else(|| GameVariant::new(&test_type, &test_type));

    let mut local: Option<SharedState> = None;
    let submitter: Arc<dyn ResultSubmitter> = match env::var("REACTION_RESULT_URL") {
        Ok(url) if !url.trim().is_empty() => {
            println!("Submitting sessions to {url}");
            let submitter = HttpSubmitter::new(url);
            match env::var("REACTION_USER_ID") {
                Ok(user_id) => Arc::new(submitter.with_user_id(user_id)),
                Err(_) => Arc::new(submitter),
            }
        }
        _ => {
            let state = AppState::new(config, Arc::new(MemoryBlobStore::new()), "memory");
            local = Some(state.clone());
            Arc::new(LocalSubmitter::new(state, Location::unknown()))
        }
    };

    let game = ReactionGame::spawn(GameOptions::new(variant).with_submitter(submitter));
    let mut views = game.subscribe();
    let printer = tokio::spawn(async move {
        print_view(&views.borrow_and_update());
        while views.changed().await.is_ok() {
            print_view(&views.borrow_and_update());
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        game.respond();
    }

    game.close(SUBMIT_GRACE).await;
    printer.abort();

    if let Some(state) = local {
        print_leaderboard(&state, &test_type).await?;
    }

    Ok(())
}

fn print_view(view: &GameView) {
    match view.phase {
        ReactionPhase::Measured | ReactionPhase::Completed => {
            println!("[{}] {}", view.progress, view.label)
        }
        _ => println!("{}", view.label),
    }
}

async fn print_leaderboard(state: &SharedState, test_type: &str) -> anyhow::Result<()> {
    let board = result_service::leaderboard(state, test_type, Location::unknown())
        .await
        .context("reading local leaderboard")?;
    let global = board.rankings.global;
    if global.data.is_empty() {
        return Ok(());
    }

    println!("{} leaderboard ({test_type}):", global.name);
    for (position, entry) in global.data.iter().enumerate() {
        println!("{:>3}. {} ms", position + 1, entry.reaction_time);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
