//! Context-window management for provider calls.
//!
//! Before an adapter builds its backend-specific message list it estimates
//! the token cost of the full history plus its fixed instruction. When the
//! estimate exceeds the input budget (the window minus the output
//! reservation and headroom), the history is pruned by keeping
//! the first message (the original goal, for continuity) and the most recent
//! messages that fit the remaining budget, dropping from the middle. Content
//! within a kept message is never truncated. Pruning operates on the
//! adapter-local copy only - the canonical state is untouched.

use crate::state::Message;
use tracing::{debug, warn};

/// Rough chars-per-token ratio for budget estimation.
///
/// A heuristic in the same spirit as the cl100k average; exact counts are not
/// required because the budget already reserves headroom.
const CHARS_PER_TOKEN: usize = 4;

/// Fraction of the window reserved as safety headroom.
const HEADROOM_DENOMINATOR: usize = 10;

/// Estimate the token cost of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

fn message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content)
}

/// Prune a message history to fit a backend's context window.
///
/// The input budget is the window minus `max_output_tokens` (reserved for
/// the response) minus 10% headroom; pruning triggers as soon as the
/// estimate exceeds that budget, so a history can never eat into the output
/// reservation. Returns the input unchanged when it fits the budget.
pub fn prune_history(
    messages: Vec<Message>,
    instruction: &str,
    context_window: usize,
    max_output_tokens: usize,
) -> Vec<Message> {
    if messages.is_empty() {
        return messages;
    }

    let instruction_tokens = estimate_tokens(instruction);
    let total: usize =
        instruction_tokens + messages.iter().map(message_tokens).sum::<usize>();

    let budget = context_window
        .saturating_sub(max_output_tokens)
        .saturating_sub(context_window / HEADROOM_DENOMINATOR);

    if total <= budget {
        return messages;
    }

    warn!(
        total_tokens = total,
        budget, context_window, "message history exceeds input budget, pruning"
    );

    let first = messages[0].clone();
    let mut used = instruction_tokens + message_tokens(&first);

    // Walk backwards collecting the most recent messages that still fit.
    let mut recent: Vec<Message> = Vec::new();
    for message in messages.into_iter().skip(1).rev() {
        let cost = message_tokens(&message);
        if used + cost > budget {
            break;
        }
        used += cost;
        recent.push(message);
    }
    recent.reverse();

    let mut pruned = Vec::with_capacity(recent.len() + 1);
    pruned.push(first);
    pruned.extend(recent);

    debug!(
        kept = pruned.len(),
        approx_tokens = used,
        "pruning complete"
    );
    pruned
}
