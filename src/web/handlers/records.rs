//! Record submission handler.

use axum::{body::Bytes, extract::State};

use crate::store::{AppendOutcome, Submission};
use crate::web::error::WebError;
use crate::web::state::AppState;

/// Validate and persist one record.
///
/// Answers "Saved" for every accepted submission, including ones whose
/// `data_type` is not a known kind.
pub async fn save_record(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<&'static str, WebError> {
    let submission = Submission::from_slice(&body).inspect_err(|e| {
        tracing::debug!(error = %e, "Rejected submission");
    })?;

    let store = state.store().clone();
    let participant = submission.participant_id().to_string();
    let outcome = tokio::task::spawn_blocking(move || store.append(&submission)).await??;

    match outcome {
        AppendOutcome::Appended { file, created } => {
            tracing::info!(participant = %participant, file = %file, created, "Appended record");
        }
        AppendOutcome::Logged { file } => {
            tracing::info!(participant = %participant, file = %file, "Logged completion");
        }
        AppendOutcome::Ignored { data_type } => {
            tracing::warn!(
                participant = %participant,
                data_type = %data_type,
                "Unknown data_type, nothing stored"
            );
        }
    }

    Ok("Saved")
}
