use botan::Certificate as BotanCertificate;

use chainkit::chain::Chain;
use chainkit::config::ChainConfig;
use chainkit::key::KeyAlgorithm;

fn policy_chain(algorithm: KeyAlgorithm) -> Vec<Vec<u8>> {
    let mut chain = Chain::new(ChainConfig::builder().key_algorithm(algorithm).build());
    let root = chain.create_self_signed_root("Root").unwrap();
    chain
        .extensions_mut(root)
        .unwrap()
        .set_property("inhibitAnyPolicy", "critical,1")
        .unwrap();
    let intermediate = chain.create_intermediate("Intermediate", root).unwrap();
    chain
        .extensions_mut(intermediate)
        .unwrap()
        .set_property("policyMappings", "1.2.3.4:1.2.3.5")
        .unwrap();
    let target = chain.create_end_entity("Target", intermediate).unwrap();
    chain.finalize_all().unwrap();

    chain
        .path_to_root(target)
        .unwrap()
        .into_iter()
        .map(|id| chain.get(id).unwrap().to_der().unwrap().to_vec())
        .collect()
}

fn check_chain(ders: &[Vec<u8>]) {
    // Use botan crate to parse the DER and assert it succeeds
    for der in ders {
        BotanCertificate::load(der).expect("Botan failed to parse certificate");
    }
}

#[test]
#[ignore]
fn test_botan_ecdsa_p256() {
    check_chain(&policy_chain(KeyAlgorithm::EcdsaP256));
}

#[test]
#[ignore]
fn test_botan_ed25519() {
    check_chain(&policy_chain(KeyAlgorithm::Ed25519));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p384() {
    check_chain(&policy_chain(KeyAlgorithm::EcdsaP384));
}

#[test]
#[ignore]
fn test_botan_ecdsa_p521() {
    check_chain(&policy_chain(KeyAlgorithm::EcdsaP521));
}

#[test]
#[ignore]
fn test_botan_rsa() {
    check_chain(&policy_chain(KeyAlgorithm::Rsa(2048)));
}
