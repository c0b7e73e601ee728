//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::sample::Index;

use docreg_core::{
    Container, Description, DescriptionValue, Document, DocumentId, DocumentSpec, Leaf,
    SectionNode,
};

/// Leaf text, including characters that need escaping.
pub fn leaf_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.;&<>\"']{0,24}".prop_map(String::from)
}

/// A `sec` or `w` leaf.
pub fn leaf() -> impl Strategy<Value = SectionNode> {
    (prop_oneof![Just("sec"), Just("w")], leaf_text())
        .prop_map(|(tag, text)| SectionNode::Leaf(Leaf::new(tag, text).expect("section tag")))
}

/// A section subtree at most `depth` containers deep.
pub fn section_tree(depth: u32) -> impl Strategy<Value = SectionNode> {
    leaf().prop_recursive(depth, 48, 4, |inner| {
        prop::collection::vec(inner, 1..4).prop_map(|children| {
            SectionNode::Container(Container::section(children).expect("children are non-empty"))
        })
    })
}

/// A document of one to four top-level subtrees.
pub fn document() -> impl Strategy<Value = Document> {
    prop::collection::vec(section_tree(4), 1..5).prop_map(|sections| {
        Document::new(sections)
            .expect("generated trees are shallow and non-empty")
            .with_id(DocumentId::derive("generated"))
    })
}

/// Raw choices for a path into a document. Resolve with [`resolve_path`].
pub fn path_choices() -> impl Strategy<Value = Vec<Index>> {
    prop::collection::vec(any::<Index>(), 1..6)
}

/// Turn raw choices into a valid section path of `document`.
///
/// The walk stops early at a leaf or placeholder, so every returned path
/// addresses an existing node.
pub fn resolve_path(document: &Document, choices: &[Index]) -> Vec<usize> {
    let mut path = Vec::new();
    let mut nodes = document.sections();
    for choice in choices {
        if nodes.is_empty() {
            break;
        }
        let i = choice.index(nodes.len());
        path.push(i);
        nodes = nodes[i].children();
    }
    path
}

fn description_value() -> impl Strategy<Value = DescriptionValue> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(DescriptionValue::Text),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(DescriptionValue::Bytes),
    ]
}

/// Any description shape.
pub fn description() -> impl Strategy<Value = Description> {
    prop_oneof![
        ".{0,32}".prop_map(Description::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Description::Bytes),
        prop::collection::btree_map("[a-z]{1,8}", description_value(), 1..4)
            .prop_map(|record: BTreeMap<String, DescriptionValue>| Description::Record(record)),
    ]
}

/// Any valid spec.
pub fn document_spec() -> impl Strategy<Value = DocumentSpec> {
    (proptest::option::of(description()), 0i64..=i64::MAX, any::<bool>()).prop_map(
        |(description, expire_at, updatable)| {
            let mut builder = DocumentSpec::builder()
                .expire_at(expire_at)
                .option_updatable(updatable);
            if let Some(description) = description {
                builder = builder.description(description);
            }
            builder.build().expect("non-negative expiry is valid")
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_redaction_preserves_digest(doc in document(), choices in path_choices()) {
            let before = doc.digest().unwrap();
            let path = resolve_path(&doc, &choices);

            let mut redacted = doc.clone();
            let placeholder = redacted.redact(&path).unwrap();

            prop_assert_eq!(placeholder, doc.section(&path).unwrap().digest());
            prop_assert_eq!(redacted.digest().unwrap(), before);
        }

        #[test]
        fn test_repeated_redaction_preserves_digest(
            doc in document(),
            picks in prop::collection::vec(path_choices(), 1..6),
        ) {
            let before = doc.digest().unwrap();
            let mut redacted = doc.clone();
            for choices in &picks {
                let path = resolve_path(&redacted, choices);
                redacted.redact(&path).unwrap();
            }
            prop_assert!(redacted.redacted_count() >= 1);
            prop_assert_eq!(redacted.digest().unwrap(), before);
        }

        #[test]
        fn test_redacted_markup_reparses_to_same_digest(doc in document(), choices in path_choices()) {
            let mut redacted = doc.clone();
            redacted.redact(&resolve_path(&doc, &choices)).unwrap();

            let reparsed = Document::from_markup(&redacted.to_markup()).unwrap();
            prop_assert_eq!(reparsed.digest().unwrap(), doc.digest().unwrap());
        }

        #[test]
        fn test_text_edit_changes_digest(doc in document(), choices in path_choices(), suffix in "[a-z]{1,4}") {
            let path = resolve_path(&doc, &choices);
            let Some(text) = doc.section(&path).and_then(SectionNode::text) else {
                return Ok(());
            };
            let mut edited = doc.clone();
            edited.set_text(&path, format!("{text}{suffix}")).unwrap();
            prop_assert_ne!(edited.digest().unwrap(), doc.digest().unwrap());
        }

        #[test]
        fn test_spec_packing(spec in document_spec(), prefix in prop::collection::vec(any::<u8>(), 0..16), trailer in prop::collection::vec(any::<u8>(), 0..16)) {
            let encoded = spec.serialize();
            let mut buf = prefix.clone();
            buf.extend_from_slice(&encoded);
            buf.extend_from_slice(&trailer);

            let (end, decoded) = DocumentSpec::from_serialized_data(prefix.len(), &buf).unwrap();
            prop_assert_eq!(end, prefix.len() + encoded.len());
            prop_assert_eq!(decoded, spec);
        }

        #[test]
        fn test_spec_record_round_trip(spec in document_spec()) {
            prop_assert_eq!(DocumentSpec::from_record(&spec.to_record()).unwrap(), spec);
        }
    }
}
