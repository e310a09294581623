//! Change request command handlers

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;
use uuid::Uuid;

use scripto_core::{
    spawn_subscriber, ApiClient, Config, LiveConfig, LiveEvent, NewChangeRequest, RequestBoard,
};

use super::catalog::match_prefix;
use crate::editor::confirm;
use crate::output::Output;

/// Submit a new change request
pub async fn create(
    api: &ApiClient,
    title: String,
    description: String,
    language: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let request = NewChangeRequest {
        title,
        description,
        language,
        tags: if tags.is_empty() {
            None
        } else {
            Some(tags.join(","))
        },
    };

    match api.request_script(&request).await {
        Ok(created) => {
            output.success(&format!("Requested {} ({})", created.title, created.id));
            Ok(())
        }
        Err(e) => {
            output.api_failure(&e);
            bail!("Request was not submitted")
        }
    }
}

/// List change requests
pub async fn list(api: &ApiClient, output: &Output) -> Result<()> {
    let mut board = RequestBoard::new();
    board.load(api).await;
    output.print_requests(board.state());
    Ok(())
}

/// Fulfill a request, by uploading a script for it or by marking it done
pub async fn fulfill(
    api: &ApiClient,
    id: String,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut board = RequestBoard::new();
    board.load(api).await;
    let request_id = resolve_request_id(&board, &id)?;

    if let Some(file) = file {
        // The server fulfills the request as part of the upload
        return match api.upload_script(&file, Some(&request_id)).await {
            Ok(item) => {
                output.success(&format!("Uploaded {} and fulfilled request", item.title));
                Ok(())
            }
            Err(e) => {
                output.api_failure(&e);
                bail!("Upload failed")
            }
        };
    }

    if output.should_prompt() && !confirm("Mark the request fulfilled without uploading a script?")? {
        output.message("Cancelled.");
        return Ok(());
    }

    match board.fulfill(api, &request_id).await {
        Ok(receipt) => {
            output.success(&receipt.message);
            Ok(())
        }
        Err(e) => {
            output.api_failure(&e);
            bail!("Request was not fulfilled")
        }
    }
}

/// Show the request list and keep it fresh from the notification stream
pub async fn watch(api: &ApiClient, config: &Config, output: &Output) -> Result<()> {
    let mut board = RequestBoard::new();
    board.load(api).await;
    output.print_requests(board.state());

    let mut handle = spawn_subscriber(LiveConfig::from_config(config));
    output.message("Watching for new requests. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            event = handle.event_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                let banner_before = board.stream_error().map(str::to_string);
                let refetched = board.handle_event(&event, api).await;

                if refetched {
                    output.print_requests(board.state());
                }
                match board.stream_error() {
                    Some(message) if banner_before.as_deref() != Some(message) => output.banner(message),
                    None if banner_before.is_some() => output.message("Notification stream reconnected."),
                    _ => {}
                }
                if event == (LiveEvent::Closed { clean: true }) && !config.reconnect {
                    output.message("Notification stream closed.");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing notification stream");
                handle.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}

/// Resolve a request ID (full UUID or unique prefix) against the loaded list
fn resolve_request_id(board: &RequestBoard, id: &str) -> Result<String> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid.to_string());
    }

    if let Some(message) = board.state().error() {
        bail!("Failed to look up request IDs: {}", message);
    }

    let candidates: Vec<(&str, &str)> = board
        .state()
        .items()
        .iter()
        .map(|r| (r.id.as_str(), r.title.as_str()))
        .collect();
    match_prefix(id, &candidates, "request")
}
