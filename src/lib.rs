//! # ChainKit - Synthetic X.509 Chains for Path-Validation Fixtures
//!
//! ChainKit builds small certificate chains whose extensions are written as
//! plain strings, signs them with pure-Rust keys, and writes them as a
//! diffable text artifact. It exists to produce inputs for testing the
//! certificate-policy processing of a path validator (policy mapping,
//! `anyPolicy` inhibition, explicit-policy requirements); it does not
//! validate chains itself.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any modulus size, 2048 bits by default
//! - **ECDSA**: P-256, P-384, and P-521 curves
//! - **Ed25519**
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chainkit::{chain::Chain, config::ChainConfig, key::KeyAlgorithm};
//!
//! # fn main() -> Result<(), chainkit::error::ChainKitError> {
//! let config = ChainConfig::builder()
//!     .key_algorithm(KeyAlgorithm::EcdsaP256)
//!     .key_cache_dir("keys")
//!     .build();
//! let mut chain = Chain::new(config);
//!
//! let root = chain.create_self_signed_root("Root")?;
//! chain
//!     .extensions_mut(root)?
//!     .set_property("inhibitAnyPolicy", "critical,1")?;
//!
//! let intermediate = chain.create_intermediate("Intermediate", root)?;
//! let extensions = chain.extensions_mut(intermediate)?;
//! extensions.set_property("policyConstraints", "critical,requireExplicitPolicy:0")?;
//! extensions.set_property("certificatePolicies", "critical,anyPolicy")?;
//!
//! let target = chain.create_end_entity("Target", intermediate)?;
//! chain
//!     .extensions_mut(target)?
//!     .set_property("certificatePolicies", "critical,1.2.3.5")?;
//!
//! chain.write_chain(
//!     "Root inhibits anyPolicy after one certificate.",
//!     &[target, intermediate, root],
//!     "chain.pem",
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use chainkit::{chain::Chain, config::ChainConfig, key::KeyAlgorithm, error::ChainKitError};
//!
//! let mut chain = Chain::new(ChainConfig::builder().key_algorithm(KeyAlgorithm::Ed25519).build());
//! let root = chain.create_self_signed_root("Root").unwrap();
//! let leaf = chain.create_end_entity("Leaf", root).unwrap();
//!
//! match chain.finalize(leaf) {
//!     Err(ChainKitError::DependencyError { subject, issuer }) => {
//!         println!("{subject} needs {issuer} signed first")
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`chain`]: The certificate registry and its factories
//! - [`cert`]: Certificates, extension sets and the extension grammar
//! - [`serializer`]: Writing and reading chain artifacts
//! - [`key`]: Key generation, import/export, and the key provider
//! - [`config`]: Chain-wide settings
//! - [`issuer`]: Signing of to-be-signed certificates
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`error`]: Error types

pub mod cert;
pub mod chain;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod serializer;
pub mod tbs_certificate;
