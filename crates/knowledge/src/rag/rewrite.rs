//! Standalone-query rewriting against conversation history.

use super::{render_history, LanguageModel};
use crate::types::ConversationTurn;
use docscout_prompt::QUERY_REWRITE;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rewrite `input` so it reads without `history`.
///
/// With no history the input is already standalone and no model call is made.
/// A failed call or an empty reply yields `input` unchanged.
pub async fn rewrite_query(lm: &LanguageModel, input: &str, history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return input.to_string();
    }

    let mut variables = HashMap::new();
    variables.insert("history".to_string(), render_history(history));
    variables.insert("question".to_string(), input.to_string());

    match lm.complete(QUERY_REWRITE, variables).await {
        Ok(rewritten) if !rewritten.trim().is_empty() => {
            let rewritten = rewritten.trim().to_string();
            debug!("Rewrote query {:?} -> {:?}", input, rewritten);
            rewritten
        }
        Ok(_) => input.to_string(),
        Err(e) => {
            warn!("Query rewrite failed, using raw input: {}", e);
            input.to_string()
        }
    }
}
