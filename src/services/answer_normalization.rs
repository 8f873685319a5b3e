//! The positional letter convention: `a`..`d` select `options[0..=3]`.
//! Everything that turns a letter into option text goes through here.

/// Maps an answer letter (any case, surrounding whitespace ignored) to its
/// option text. `None` for anything that is not a single in-range letter.
pub fn option_for_letter(options: &[String], letter: &str) -> Option<String> {
    let mut chars = letter.trim().chars();
    let first = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !('a'..='d').contains(&first) {
        return None;
    }
    options.get((first as u8 - b'a') as usize).cloned()
}

/// Maps a submitted answer onto option text before comparison with the stored
/// answer. Anything that is not a resolvable letter is taken verbatim, so a
/// letter pointing past the last option never matches.
pub fn normalize_answer(submitted: &str, options: &[String]) -> String {
    option_for_letter(options, submitted).unwrap_or_else(|| submitted.to_string())
}

pub fn is_correct(submitted: &str, options: &[String], answer_text: Option<&str>) -> bool {
    match answer_text {
        Some(answer) => normalize_answer(submitted, options) == answer,
        None => false,
    }
}
