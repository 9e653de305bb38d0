/// Normalizes free text for grouping: trims, collapses whitespace runs and
/// title-cases each token. Idempotent.
pub fn canonicalize(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());

    for token in raw.split_whitespace() {
        if !output.is_empty() {
            output.push(' ');
        }
        title_case_into(token, &mut output);
    }

    output
}

pub fn canonicalize_opt(raw: Option<&str>) -> String {
    raw.map(canonicalize).unwrap_or_default()
}

// Uppercasing can expand one char into several (e.g. 'ß' -> "SS"); only the
// first produced char stays upper so a second pass leaves the token alone.
fn title_case_into(token: &str, output: &mut String) {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return;
    };

    let mut upper = first.to_uppercase();
    if let Some(head) = upper.next() {
        output.push(head);
    }
    let tail: String = upper.chain(chars).collect();
    output.push_str(&tail.to_lowercase());
}
