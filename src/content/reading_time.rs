//! Reading-time estimation

use super::ContentBlock;

/// Average reading rate used for the estimate
pub const WORDS_PER_MINUTE: usize = 200;

/// Count the words of every block: its heading plus the text of each body node
pub fn word_count(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            count_words(&block.heading)
                + block
                    .body
                    .iter()
                    .map(|node| count_words(&node.text))
                    .sum::<usize>()
        })
        .sum()
}

/// Minutes needed to read `content` at the default rate
pub fn reading_time(content: &[ContentBlock]) -> usize {
    reading_time_at(content, WORDS_PER_MINUTE)
}

/// Minutes needed to read `content` at `words_per_minute`, rounded up
///
/// A zero rate falls back to [`WORDS_PER_MINUTE`].
pub fn reading_time_at(content: &[ContentBlock], words_per_minute: usize) -> usize {
    let rate = if words_per_minute == 0 {
        WORDS_PER_MINUTE
    } else {
        words_per_minute
    };
    word_count(content).div_ceil(rate)
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
