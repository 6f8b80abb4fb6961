//! Splitting text to fit a synthesizer's request limit.

use super::QueueMode;

/// Split `text` into pieces of at most `limit` characters. A piece ends after
/// the last whitespace in its second half when there is one, so words are
/// rarely cut. Concatenating the pieces gives back `text` exactly.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((hard_end, _)) = rest.char_indices().nth(limit) else {
            chunks.push(rest.to_string());
            break;
        };
        let window = &rest[..hard_end];
        let half = window
            .char_indices()
            .nth(limit / 2)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let cut = window[half..]
            .char_indices()
            .filter(|(_, ch)| ch.is_whitespace())
            .last()
            .map(|(idx, ch)| half + idx + ch.len_utf8())
            .unwrap_or(hard_end);
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    chunks
}

/// Utterances for speaking `text` aloud: a single flushing utterance when the
/// text fits, otherwise pieces of `max_len - safety_margin` characters where
/// only the first flushes the queue.
pub fn plan_utterances(text: &str, max_len: usize, safety_margin: usize) -> Vec<(String, QueueMode)> {
    if text.chars().count() <= max_len {
        return vec![(text.to_string(), QueueMode::Flush)];
    }
    let piece = max_len.saturating_sub(safety_margin).max(1);
    split_chunks(text, piece)
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let mode = if idx == 0 {
                QueueMode::Flush
            } else {
                QueueMode::Add
            };
            (chunk, mode)
        })
        .collect()
}
