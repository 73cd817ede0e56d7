// Profile chunking module
// Splits raw profile text into paragraph chunks and synthesizes identity
// chunks so that name/"who are you" questions retrieve correctly.

#[cfg(test)]
mod tests;

/// Split profile text into paragraph chunks.
///
/// Paragraphs are separated by blank lines. Each chunk is trimmed and
/// empty chunks are dropped; original order is preserved. An empty input
/// yields an empty sequence, which callers must treat as a valid outcome.
#[inline]
pub fn chunk_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Detect whether a profile warrants a synthesized identity chunk.
///
/// Two-branch rule, applied once at bulk-ingestion time:
/// 1. If the first chunk starts with the "ABOUT" marker (case-insensitive)
///    and contains a `name:` line, the identity chunk quotes that line.
/// 2. Otherwise, if the very first line of the original text starts with
///    "name" (case-insensitive), the identity chunk quotes that line.
///
/// The ABOUT branch is exhaustive: an ABOUT section without a `name:` line
/// produces no identity chunk even if the first line would match branch 2.
#[inline]
pub fn detect_identity_chunk(full_text: &str, first_chunk: &str) -> Option<String> {
    if first_chunk.trim().to_uppercase().starts_with("ABOUT") {
        return first_chunk
            .lines()
            .map(str::trim)
            .find(|line| line.to_lowercase().starts_with("name:"))
            .map(|name_line| format!("Who is this person: {}", name_line));
    }

    let first_line = full_text.trim().lines().next().unwrap_or("").trim();
    first_line
        .to_lowercase()
        .starts_with("name")
        .then(|| format!("Profile owner's identity: {}", first_line))
}

/// Chunk a whole profile for bulk ingestion, with identity augmentation.
///
/// Nearest-neighbor retrieval over paragraph chunks does not reliably
/// surface a name buried inside a longer paragraph, so a purpose-built
/// identity sentence is prepended when the profile provides one.
#[inline]
pub fn chunk_profile(text: &str) -> Vec<String> {
    let mut chunks = chunk_paragraphs(text);

    let identity = chunks
        .first()
        .and_then(|first| detect_identity_chunk(text, first));
    if let Some(identity) = identity {
        chunks.insert(0, identity);
    }

    chunks
}
