//! Regenerates the `policies-inhibit-anypolicy-by-root-ok` fixture.
//!
//! ```text
//! cargo run --example policies_inhibit_anypolicy_by_root_ok [OUTPUT_DIR]
//! ```
//!
//! Keys are cached in `OUTPUT_DIR/keys`, so running it again reproduces the
//! same `chain.pem`.

use std::path::PathBuf;

use chainkit::chain::Chain;
use chainkit::config::ChainConfig;
use chainkit::error::ChainKitError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

const DESCRIPTION: &str = "\
Certificate chain where the root certificate sets inhibitAnyPolicy=1, and the
intermediate asserts anyPolicy with requireExplicitPolicy=0. The leaf asserts
policy 1.2.3.5. anyPolicy is still allowed in the intermediate, since the
inhibit count only applies to the certificates that follow it.";

fn main() -> Result<(), ChainKitError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("policies-inhibit-anypolicy-by-root-ok"));
    std::fs::create_dir_all(&out_dir).map_err(|source| ChainKitError::IoError {
        path: out_dir.clone(),
        source,
    })?;

    let config = ChainConfig::builder()
        .key_cache_dir(out_dir.join("keys"))
        .created_by("policies_inhibit_anypolicy_by_root_ok")
        .build();
    let mut chain = Chain::new(config);

    // Self-signed root certificate.
    let root = chain.create_self_signed_root("Root")?;
    chain
        .extensions_mut(root)?
        .set_property("inhibitAnyPolicy", "critical,1")?;

    // Intermediate certificate.
    let intermediate = chain.create_intermediate("Intermediate", root)?;
    let extensions = chain.extensions_mut(intermediate)?;
    extensions.set_property("policyConstraints", "critical,requireExplicitPolicy:0")?;
    extensions.set_property("certificatePolicies", "critical,anyPolicy")?;

    // Target certificate.
    let target = chain.create_end_entity("Target", intermediate)?;
    chain
        .extensions_mut(target)?
        .set_property("certificatePolicies", "critical,1.2.3.5")?;

    chain.write_chain(
        DESCRIPTION,
        &[target, intermediate, root],
        out_dir.join("chain.pem"),
    )
}
