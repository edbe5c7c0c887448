use crate::grammar::{
    ArtifactError, LanguageData, LexRule, LexState, NodeKind, ParseAction, ParseState,
    LANGUAGE_VERSION,
};

fn sample_data() -> LanguageData {
    LanguageData {
        name: "sample".to_string(),
        abi_version: LANGUAGE_VERSION,
        node_kinds: vec![
            NodeKind {
                name: "end".to_string(),
                named: false,
                visible: false,
            },
            NodeKind {
                name: "b".to_string(),
                named: true,
                visible: true,
            },
            NodeKind {
                name: "a".to_string(),
                named: true,
                visible: true,
            },
            NodeKind {
                name: "ERROR".to_string(),
                named: true,
                visible: true,
            },
        ],
        field_names: vec!["item".to_string()],
        extras: vec![],
        supertypes: vec![],
        externals: vec![],
        error_symbol: 3,
        lex_states: vec![LexState {
            rules: vec![LexRule::literal(1, "b")],
        }],
        parse_states: vec![ParseState {
            actions: vec![(1, ParseAction::Shift(0)), (0, ParseAction::Accept)],
            gotos: vec![(2, 0)],
            lex_state: 0,
        }],
    }
}

#[test]
fn artifact_round_trip() {
    let data = sample_data();
    let bytes = data.to_artifact();
    let decoded = LanguageData::from_artifact(&bytes).unwrap();

    assert_eq!(decoded.name, "sample");
    assert_eq!(decoded.node_kinds, data.node_kinds);
    assert_eq!(decoded.field_names, data.field_names);
    assert_eq!(decoded.parse_states, data.parse_states);
    assert_eq!(decoded.error_symbol, 3);
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = sample_data().to_artifact();
    bytes[0] = b'X';
    assert!(matches!(
        LanguageData::from_artifact(&bytes),
        Err(ArtifactError::BadMagic)
    ));
}

#[test]
fn rejects_truncated_input() {
    assert!(matches!(
        LanguageData::from_artifact(b"SLX"),
        Err(ArtifactError::Truncated(3))
    ));
}

#[test]
fn rejects_future_version() {
    let mut bytes = sample_data().to_artifact();
    let future = (LANGUAGE_VERSION + 1).to_le_bytes();
    bytes[4] = future[0];
    bytes[5] = future[1];
    assert!(matches!(
        LanguageData::from_artifact(&bytes),
        Err(ArtifactError::IncompatibleVersion { .. })
    ));
}

#[test]
fn rejects_corrupted_payload() {
    let mut bytes = sample_data().to_artifact();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    assert!(matches!(
        LanguageData::from_artifact(&bytes),
        Err(ArtifactError::ChecksumMismatch)
    ));
}
