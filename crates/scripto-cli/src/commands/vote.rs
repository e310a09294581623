//! Vote command handlers

use anyhow::{bail, Result};

use scripto_core::{ApiClient, VoteAction, VoteBoard, VoteError, VoteOutcome, VoteStatus};

use super::catalog::resolve_script_id;
use crate::output::Output;

/// Like or dislike a script
///
/// With `undo`, the viewer's earlier vote on that side is assumed and the
/// click toggles it off.
pub async fn vote(
    api: &ApiClient,
    board: &VoteBoard,
    id: String,
    action: VoteAction,
    undo: bool,
    output: &Output,
) -> Result<()> {
    let script_id = resolve_script_id(api, &id).await?;

    let mut state = board.load(api, &script_id).await?;
    if undo {
        state.status = match action {
            VoteAction::Like => VoteStatus::Liked,
            VoteAction::Dislike => VoteStatus::Disliked,
        };
        board.seed(&script_id, state);
    }

    match board.vote(api, &script_id, action).await {
        Ok(VoteOutcome::Updated(state)) => {
            output.success(describe(action, undo));
            output.print_votes(&script_id, &state);
            Ok(())
        }
        Ok(VoteOutcome::Removed(message)) => {
            output.success(&message);
            Ok(())
        }
        Err(VoteError::Busy) => {
            output.failure("A vote on this script is already in progress");
            bail!("Vote not sent")
        }
        Err(VoteError::Api(e)) => {
            output.api_failure(&e);
            bail!("Vote not sent")
        }
    }
}

/// Show a script's vote counters
pub async fn show(api: &ApiClient, board: &VoteBoard, id: String, output: &Output) -> Result<()> {
    let script_id = resolve_script_id(api, &id).await?;
    let state = board.load(api, &script_id).await?;
    output.print_votes(&script_id, &state);
    Ok(())
}

fn describe(action: VoteAction, undo: bool) -> &'static str {
    match (action, undo) {
        (VoteAction::Like, false) => "Liked",
        (VoteAction::Like, true) => "Like removed",
        (VoteAction::Dislike, false) => "Disliked",
        (VoteAction::Dislike, true) => "Dislike removed",
    }
}
