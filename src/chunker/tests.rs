use super::*;

#[test]
fn paragraph_split_trims_and_drops_empties() {
    let text = "First paragraph.\n\n\n  Second paragraph,\nstill second.  \n\n\n\nThird.\n\n   \n";
    let chunks = chunk_paragraphs(text);

    assert_eq!(
        chunks,
        vec![
            "First paragraph.".to_string(),
            "Second paragraph,\nstill second.".to_string(),
            "Third.".to_string(),
        ]
    );

    for chunk in &chunks {
        assert_eq!(chunk, chunk.trim());
        assert!(!chunk.is_empty());
    }
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(chunk_paragraphs("").is_empty());
    assert!(chunk_paragraphs("\n\n\n\n").is_empty());
    assert!(chunk_profile("   \n\n \n").is_empty());
}

#[test]
fn about_section_synthesizes_who_chunk() {
    let text = "ABOUT\nName: Jane Doe. Engineer.\n\nSecond paragraph.";
    let chunks = chunk_profile(text);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], "Who is this person: Name: Jane Doe. Engineer.");
    assert_eq!(chunks[1], "ABOUT\nName: Jane Doe. Engineer.");
    assert_eq!(chunks[2], "Second paragraph.");
}

#[test]
fn about_marker_is_case_insensitive() {
    let text = "about me\nname: Sam Smith\n\nMore text.";
    let chunks = chunk_profile(text);

    assert_eq!(chunks[0], "Who is this person: name: Sam Smith");
}

#[test]
fn about_section_without_name_line_adds_nothing() {
    // The ABOUT branch is exhaustive: no fallback to the first-line rule.
    let text = "ABOUT\nAn engineer from Berlin.\n\nSecond paragraph.";
    let chunks = chunk_profile(text);

    assert_eq!(
        chunks,
        vec![
            "ABOUT\nAn engineer from Berlin.".to_string(),
            "Second paragraph.".to_string(),
        ]
    );
}

#[test]
fn name_first_line_synthesizes_identity_chunk() {
    let text = "Name: Ada Lovelace\nMathematician.\n\nWorked on the Analytical Engine.";
    let chunks = chunk_profile(text);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], "Profile owner's identity: Name: Ada Lovelace");
}

#[test]
fn plain_profile_gets_no_synthetic_chunk() {
    let text = "A profile that starts elsewhere.\n\nSecond paragraph.";
    let chunks = chunk_profile(text);

    assert_eq!(
        chunks,
        vec![
            "A profile that starts elsewhere.".to_string(),
            "Second paragraph.".to_string(),
        ]
    );
}

#[test]
fn detect_identity_chunk_rule_table() {
    assert_eq!(
        detect_identity_chunk("ABOUT\nName: X", "ABOUT\nName: X"),
        Some("Who is this person: Name: X".to_string())
    );
    assert_eq!(detect_identity_chunk("ABOUT\nno name here", "ABOUT\nno name here"), None);
    assert_eq!(
        detect_identity_chunk("name is Pat\nrest", "name is Pat\nrest"),
        Some("Profile owner's identity: name is Pat".to_string())
    );
    assert_eq!(detect_identity_chunk("Bio first.\n\nname: later", "Bio first."), None);
    assert_eq!(detect_identity_chunk("", ""), None);
}
