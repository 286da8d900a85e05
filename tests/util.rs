#![allow(dead_code)]

use std::path::Path;

use chainkit::cert::CertId;
use chainkit::chain::Chain;
use chainkit::config::ChainConfig;
use chainkit::key::KeyAlgorithm;

/// Handles of the three certificates of the sample policy chain.
pub struct SampleChain {
    pub chain: Chain,
    pub root: CertId,
    pub intermediate: CertId,
    pub target: CertId,
}

impl SampleChain {
    /// Leaf-first order, as written to disk.
    pub fn order(&self) -> [CertId; 3] {
        [self.target, self.intermediate, self.root]
    }
}

pub const SAMPLE_DESCRIPTION: &str = "Certificate chain where the root certificate sets \
inhibitAnyPolicy=1, and the intermediate asserts anyPolicy with \
requireExplicitPolicy=0. The leaf asserts policy 1.2.3.5.";

pub fn test_config() -> ChainConfig {
    ChainConfig::builder()
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .created_by("chainkit tests")
        .build()
}

pub fn cached_config(key_dir: &Path) -> ChainConfig {
    ChainConfig::builder()
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .key_cache_dir(key_dir)
        .build()
}

/// Root with inhibitAnyPolicy, intermediate asserting anyPolicy under
/// requireExplicitPolicy, leaf asserting 1.2.3.5. Nothing is finalized.
pub fn sample_chain(config: ChainConfig) -> SampleChain {
    let mut chain = Chain::new(config);

    let root = chain.create_self_signed_root("Root").unwrap();
    chain
        .extensions_mut(root)
        .unwrap()
        .set_property("inhibitAnyPolicy", "critical,1")
        .unwrap();

    let intermediate = chain.create_intermediate("Intermediate", root).unwrap();
    let extensions = chain.extensions_mut(intermediate).unwrap();
    extensions
        .set_property("policyConstraints", "critical,requireExplicitPolicy:0")
        .unwrap();
    extensions
        .set_property("certificatePolicies", "critical,anyPolicy")
        .unwrap();

    let target = chain.create_end_entity("Target", intermediate).unwrap();
    chain
        .extensions_mut(target)
        .unwrap()
        .set_property("certificatePolicies", "critical,1.2.3.5")
        .unwrap();

    SampleChain {
        chain,
        root,
        intermediate,
        target,
    }
}
