//! `colloquy run`: connect, send one prompt or control token, stream turns.

use anyhow::{Result, bail};
use console::style;
use serde_json::Value;
use tokio::sync::watch;
use tracing::Instrument;

use colloquy_core::SessionCoordinator;
use colloquy_core::transport::Transport;
use colloquy_infra::NetworkTransport;
use colloquy_observe::attrs;
use colloquy_types::message::PromptPayload;
use colloquy_types::snapshot::SessionSnapshot;

use super::RunArgs;
use super::config::{apply_overrides, load};
use super::render::TranscriptRenderer;

pub async fn run(args: RunArgs, json: bool, quiet: bool) -> Result<()> {
    let (file_config, _) = load(args.config.clone()).await?;
    let config = apply_overrides(file_config, &args);

    if config.channels.is_empty() {
        bail!("no endpoints: pass --endpoint URL or add [[channels]] to the config file");
    }
    let auto_start = config.channels.iter().any(|c| c.auto_start);
    if args.prompt.is_none() && args.control.is_none() && !auto_start {
        bail!("nothing to send: pass --prompt, --control or --auto-start");
    }

    let endpoints = config
        .channels
        .iter()
        .map(|c| c.endpoint.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let span = tracing::info_span!(attrs::SPAN_SESSION, endpoints = %endpoints);

    let mut session = SessionCoordinator::new(config, NetworkTransport::new())?;
    let show = !json && !quiet;
    let snapshot = drive(&mut session, &args, show).instrument(span).await;
    session.close();
    let snapshot = snapshot?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    if snapshot.disconnected {
        bail!("session ended disconnected");
    }
    if snapshot.interrupted {
        bail!("a backend connection dropped before the reply finished");
    }
    Ok(())
}

async fn drive<T: Transport>(
    session: &mut SessionCoordinator<T>,
    args: &RunArgs,
    show: bool,
) -> Result<SessionSnapshot> {
    let mut snapshots = session.subscribe();
    session.open();

    let connected = tokio::select! {
        connected = session.wait_until_connected() => Some(connected),
        _ = tokio::signal::ctrl_c() => None,
    };
    match connected {
        Some(true) => tracing::info!("all channels connected"),
        Some(false) => bail!("could not connect to every backend"),
        None => bail!("interrupted while connecting"),
    }

    if let Some(token) = args.control {
        session.advance(token)?;
    } else if let Some(prompt) = &args.prompt {
        session.submit(build_prompt(prompt, &args.fields))?;
    }

    let mut renderer = TranscriptRenderer::new(session.channels().len());
    let completed = stream_turns(session, &mut snapshots, &mut renderer, show)
        .instrument(tracing::info_span!(attrs::SPAN_EXCHANGE))
        .await;

    let snapshot = session.snapshot();
    if show {
        renderer.print_footer(&snapshot);
    }
    if !completed {
        eprintln!("  {} Interrupted", style("·").dim());
    }
    Ok(snapshot)
}

/// Process events until no channel is loading. Returns `false` when
/// interrupted with Ctrl-C.
async fn stream_turns<T: Transport>(
    session: &mut SessionCoordinator<T>,
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    renderer: &mut TranscriptRenderer,
    show: bool,
) -> bool {
    loop {
        if !session.loading() || session.disconnected() {
            return true;
        }
        let interrupted = tokio::select! {
            _ = session.step() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if show && snapshots.has_changed().unwrap_or(false) {
            let snapshot = snapshots.borrow_and_update().clone();
            renderer.render(&snapshot);
        }
        if interrupted {
            return false;
        }
    }
}

/// Prompt payload with `--field` values; values that parse as JSON keep
/// their type (`answer_length=3` is a number), everything else is a string.
fn build_prompt(prompt: &str, fields: &[(String, String)]) -> PromptPayload {
    fields
        .iter()
        .fold(PromptPayload::new(prompt), |payload, (key, raw)| {
            let value =
                serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            payload.with_field(key.clone(), value)
        })
}
