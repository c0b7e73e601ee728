//! Golden test vectors for deterministic verification.
//!
//! Every expected value here was computed independently of this code base.
//! Any change to leaf serialization, digest composition, the signed envelope,
//! spec encoding or label derivation shows up as a vector mismatch.

use serde::Serialize;

use docreg_core::{Document, DocumentSpec, Keypair};
use docreg_ledger::TransactionLabel;

/// Markup in, identity digest out.
#[derive(Debug, Clone, Serialize)]
pub struct DigestVector {
    pub name: &'static str,
    pub markup: &'static str,
    /// Expected identity digest (hex).
    pub expected_digest: &'static str,
}

/// Spec fields in, canonical encoding out.
#[derive(Debug, Clone, Serialize)]
pub struct SpecVector {
    pub name: &'static str,
    pub description: Option<&'static [u8]>,
    /// Whether `description` is text (UTF-8) rather than bytes.
    pub description_is_text: bool,
    pub expire_at: i64,
    pub option_updatable: bool,
    /// Expected `DocumentSpec::serialize` output (hex).
    pub expected_encoding: &'static str,
}

/// A document signed with a fixed seed.
#[derive(Debug, Clone, Serialize)]
pub struct SignedVector {
    pub name: &'static str,
    pub markup: &'static str,
    pub seed: [u8; 32],
    pub expected_public_key: &'static str,
    pub expected_signature: &'static str,
    pub expected_digest: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelVector {
    pub name: &'static str,
    pub label_name: &'static str,
    pub salt: &'static [u8],
    pub expected_label_id: &'static str,
}

pub const SAMPLE_MARKUP: &str = "<doc><sec>Today,</sec><sec>I am</sec><sec>what I am.</sec></doc>";
pub const SAMPLE_DIGEST: &str = "77564b51a95528dc78392f25ef7bcdf997dfd459a60394c6c19702c8e5a9d3a3";

pub fn digest_vectors() -> Vec<DigestVector> {
    vec![
        DigestVector {
            name: "flat",
            markup: SAMPLE_MARKUP,
            expected_digest: SAMPLE_DIGEST,
        },
        DigestVector {
            name: "flat_indented",
            markup: "<?xml version=\"1.0\"?>\n<doc>\n  <sec>Today,</sec>\n  <sec>I am</sec>\n  <sec>what I am.</sec>\n</doc>\n",
            expected_digest: SAMPLE_DIGEST,
        },
        DigestVector {
            name: "flat_middle_redacted",
            markup: "<doc><sec>Today,</sec><digest>6423062068a5fed14445079b6205174c41093f05d6af2b847e8ecf151a2e7a97</digest><sec>what I am.</sec></doc>",
            expected_digest: SAMPLE_DIGEST,
        },
        DigestVector {
            name: "nested",
            markup: "<doc><sec>Today,</sec><sec container=\"true\"><sec>I am</sec><sec>what I am.</sec></sec></doc>",
            expected_digest: "dc450751626c0069f2ccfe0d642602a46b5f0f09f4527c230d47292778037469",
        },
        DigestVector {
            name: "nested_container_redacted",
            markup: "<doc><sec>Today,</sec><digest>9bf1c4597e1c827ab95e36516e4ccc70a2736d332bdc62e959ba5b99676d5e14</digest></doc>",
            expected_digest: "dc450751626c0069f2ccfe0d642602a46b5f0f09f4527c230d47292778037469",
        },
        DigestVector {
            name: "escaped_text",
            markup: "<doc><sec>a &lt; b &amp; c</sec></doc>",
            expected_digest: "2791b34c63287c40a0fe8af27b1d450f5174eb33773d4b0b514b119f10e2d2d5",
        },
        DigestVector {
            name: "empty_leaf",
            markup: "<doc><sec></sec></doc>",
            expected_digest: "d1b7351d107bd6aa7e40c1c4c83df6aabdd0ad3374678db0d6ff03f4a1393761",
        },
        DigestVector {
            name: "word_leaf",
            markup: "<doc><w>word</w></doc>",
            expected_digest: "7475c18adb5b5744e1db4cea1abe8b216063a04a93ec491275233d36a5aa0021",
        },
        DigestVector {
            name: "leaf_attribute",
            markup: "<doc><sec lang='en'>hi</sec></doc>",
            expected_digest: "49b65f467d20377b96591844704c1b38e7b77aa6736c811c29d95aaa2cb1b4b0",
        },
        DigestVector {
            name: "mixed_leaves",
            markup: "<doc><sec>Today,</sec><sec/><w>word</w></doc>",
            expected_digest: "8557c0db1c4fa1dc3f3787ac3d0b219838b860e5113bef8059b8ba693fd72289",
        },
    ]
}

pub fn spec_vectors() -> Vec<SpecVector> {
    vec![
        SpecVector {
            name: "default",
            description: None,
            description_is_text: false,
            expire_at: 0,
            option_updatable: true,
            expected_encoding: "a300f6010002f5",
        },
        SpecVector {
            name: "text_description_frozen",
            description: Some(&b"hi"[..]),
            description_is_text: true,
            expire_at: 1_700_000_000,
            option_updatable: false,
            expected_encoding: "a300626869011a6553f10002f4",
        },
        SpecVector {
            name: "bytes_description",
            description: Some(&[0x01u8, 0x02][..]),
            description_is_text: false,
            expire_at: 1_552_640_400,
            option_updatable: true,
            expected_encoding: "a300420102011a5c8b699002f5",
        },
    ]
}

pub fn signed_vectors() -> Vec<SignedVector> {
    vec![SignedVector {
        name: "flat_signed_ed25519",
        markup: SAMPLE_MARKUP,
        seed: [0x07; 32],
        expected_public_key: "ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c",
        expected_signature: "931e3a12753e9b9ba4710ef9b048527fddba3197ded70c350d7e3d81658881ea41658af3af707c83c89e086f5a68e64a660e2f92a1b7f141b332816c8f13580b",
        expected_digest: "674fd24a743c7c0a5a7db956bd53389857ef70e674c5db8ece524684484de2d3",
    }]
}

pub fn label_vectors() -> Vec<LabelVector> {
    vec![LabelVector {
        name: "deed_salted",
        label_name: "deed",
        salt: b"salt",
        expected_label_id: "5983e4f80c9a7aa32144efc4414d75575b9469fd431211e5cd7b07637c0f3ae7",
    }]
}

/// Build the spec a vector describes.
pub fn spec_from_vector(vector: &SpecVector) -> DocumentSpec {
    let mut builder = DocumentSpec::builder()
        .expire_at(vector.expire_at)
        .option_updatable(vector.option_updatable);
    if let Some(description) = vector.description {
        builder = if vector.description_is_text {
            builder.description(String::from_utf8_lossy(description).into_owned())
        } else {
            builder.description(description.to_vec())
        };
    }
    builder.build().expect("spec vectors hold valid fields")
}

/// Parse and sign the document a signed vector describes.
pub fn signed_document_from_vector(vector: &SignedVector) -> Document {
    let mut document = Document::from_markup(vector.markup).expect("vector markup parses");
    document.sign(&Keypair::from_seed(&vector.seed));
    document
}

/// Check every vector, returning `(name, matches, actual)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results = Vec::new();

    for v in digest_vectors() {
        let actual = Document::from_markup(v.markup)
            .and_then(|d| d.digest())
            .map(|d| d.to_hex())
            .unwrap_or_else(|e| format!("error: {e}"));
        results.push((v.name.to_string(), actual == v.expected_digest, actual));
    }
    for v in spec_vectors() {
        let actual = hex::encode(spec_from_vector(&v).serialize());
        results.push((v.name.to_string(), actual == v.expected_encoding, actual));
    }
    for v in signed_vectors() {
        let actual = signed_document_from_vector(&v)
            .digest()
            .map(|d| d.to_hex())
            .unwrap_or_else(|e| format!("error: {e}"));
        results.push((v.name.to_string(), actual == v.expected_digest, actual));
    }
    for v in label_vectors() {
        let actual = TransactionLabel::create_label_id(v.label_name, v.salt).to_hex();
        results.push((v.name.to_string(), actual == v.expected_label_id, actual));
    }

    results
}

/// All vectors as pretty-printed JSON, for other implementations to check
/// against.
pub fn vectors_json() -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct VectorFile {
        version: &'static str,
        digests: Vec<DigestVector>,
        specs: Vec<SpecVector>,
        signed: Vec<SignedVector>,
        labels: Vec<LabelVector>,
    }

    serde_json::to_string_pretty(&VectorFile {
        version: env!("CARGO_PKG_VERSION"),
        digests: digest_vectors(),
        specs: spec_vectors(),
        signed: signed_vectors(),
        labels: label_vectors(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docreg_core::{Ed25519PublicKey, SectionNode};

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, actual) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {actual}");
        }
    }

    #[test]
    fn test_leaf_digests() {
        let expected = [
            ("Today,", "193e38f0863908ac01f9b4e890a6b61f1d0862c92349a2f2e4280bd9247acad6"),
            ("I am", "6423062068a5fed14445079b6205174c41093f05d6af2b847e8ecf151a2e7a97"),
            ("what I am.", "4a528c7179d170e2224621312e6a940702a8859f709bd0757791c8d558cd526a"),
        ];
        for (text, digest) in expected {
            assert_eq!(SectionNode::leaf(text).digest().to_hex(), digest);
        }
    }

    #[test]
    fn test_signed_vector_parts() {
        for v in signed_vectors() {
            let document = signed_document_from_vector(&v);
            assert_eq!(document.attribute("pubkey"), Some(v.expected_public_key));
            assert_eq!(document.attribute("sig"), Some(v.expected_signature));
            assert_eq!(document.attribute("algo"), Some("ed25519"));
            assert_eq!(Keypair::from_seed(&v.seed).public_key().to_hex(), v.expected_public_key);

            // Signing changes the identity digest but not the content digest.
            let unsigned = Document::from_markup(v.markup).unwrap();
            assert_eq!(document.content_digest(), unsigned.content_digest());
            assert_ne!(document.digest().unwrap(), unsigned.digest().unwrap());

            let key_bytes = hex::decode(v.expected_public_key).unwrap();
            assert!(Ed25519PublicKey::from_slice(&key_bytes).is_ok());
        }
    }

    #[test]
    fn test_vectors_json() {
        let json = vectors_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["digests"].as_array().map(Vec::len), Some(digest_vectors().len()));
        assert_eq!(value["specs"][0]["expected_encoding"], "a300f6010002f5");
    }
}
