//! # docreg testkit
//!
//! Testing utilities for the document registry.
//!
//! ## Overview
//!
//! - **Golden vectors**: Digests, spec encodings, signatures and label ids
//!   with known expected outputs
//! - **Generators**: Proptest strategies for section trees, paths and specs
//! - **Fixtures**: A shared in-memory ledger and directory with enrolled users
//!
//! ## Golden Vectors
//!
//! ```rust
//! use docreg_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, actual) in verify_all_vectors() {
//!     assert!(matches, "{name}: {actual}");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use docreg_testkit::fixtures::{sample_document, RegistryFixture};
//!
//! let fixture = RegistryFixture::new();
//! let alice = fixture.user("alice");
//! let registry = fixture.registry();
//! let document = sample_document("deed-1");
//! # let _ = (alice, registry, document);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    frozen_spec, nested_document, sample_document, MemoryRegistry, RegistryFixture, TestUser,
    SAMPLE_TEXTS,
};
pub use generators::{document, document_spec, path_choices, resolve_path, section_tree};
pub use vectors::{verify_all_vectors, vectors_json, SAMPLE_DIGEST, SAMPLE_MARKUP};
