//! Key pairs for certificate subjects and issuers.
//!
//! Keys can be generated fresh or imported from PKCS#8, and expose the
//! `SubjectPublicKeyInfo` embedded in certificates as well as a signing
//! primitive used when a certificate acts as an issuer.

pub mod provider;

use std::fmt;

use const_oid::ObjectIdentifier;
use der::Decode;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, PrivateKeyInfo};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{ChainKitError, Result};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Algorithm (and size) of generated key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA with the given modulus size in bits.
    Rsa(usize),
    EcdsaP256,
    EcdsaP384,
    EcdsaP521,
    Ed25519,
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Rsa(2048)
    }
}

/// Supported key types for certificate operations.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
    },
    EcdsaP521 {
        secret_key: p521::SecretKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a key pair of the requested algorithm.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Rsa(bits) => Self::generate_rsa(bits),
            KeyAlgorithm::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeyAlgorithm::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
            KeyAlgorithm::EcdsaP521 => Ok(Self::generate_ecdsa_p521()),
            KeyAlgorithm::Ed25519 => Ok(Self::generate_ed25519()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| ChainKitError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        KeyPair::EcdsaP256 {
            signing_key: P256SigningKey::random(&mut rng),
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        KeyPair::EcdsaP384 {
            signing_key: P384SigningKey::random(&mut rng),
        }
    }

    /// Generate an ECDSA P-521 key pair.
    pub fn generate_ecdsa_p521() -> Self {
        let mut rng = rand_core::OsRng;
        KeyPair::EcdsaP521 {
            secret_key: p521::SecretKey::random(&mut rng),
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        KeyPair::Ed25519 {
            signing_key: Ed25519SigningKey::generate(&mut rng),
        }
    }

    /// The algorithm this key pair belongs to.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { public, .. } => {
                use rsa::traits::PublicKeyParts;
                KeyAlgorithm::Rsa(public.size() * 8)
            }
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::EcdsaP521 { .. } => KeyAlgorithm::EcdsaP521,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// The DER-encoded `SubjectPublicKeyInfo` of this key pair.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            KeyPair::Rsa { public, .. } => public.to_public_key_der()?,
            KeyPair::EcdsaP256 { signing_key } => signing_key.verifying_key().to_public_key_der()?,
            KeyPair::EcdsaP384 { signing_key } => signing_key.verifying_key().to_public_key_der()?,
            KeyPair::EcdsaP521 { secret_key } => secret_key.public_key().to_public_key_der()?,
            KeyPair::Ed25519 { signing_key } => signing_key.verifying_key().to_public_key_der()?,
        };
        Ok(document.as_bytes().to_vec())
    }

    /// The `SubjectPublicKeyInfo` embedded in certificates for this key.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let der = self.public_key_der()?;
        SubjectPublicKeyInfoOwned::from_der(&der)
            .map_err(|e| ChainKitError::EncodingError(e.to_string()))
    }

    /// Signs `data` with this key.
    ///
    /// RSA keys use PKCS#1 v1.5 with SHA-256, ECDSA keys use the curve's
    /// default digest and produce DER-encoded `Ecdsa-Sig-Value`s, Ed25519 signs
    /// the message directly.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature = signing_key.try_sign(data)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key } => {
                let signature: p256::ecdsa::Signature = signing_key.try_sign(data)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key } => {
                let signature: p384::ecdsa::Signature = signing_key.try_sign(data)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP521 { secret_key } => {
                let signing_key = p521::ecdsa::SigningKey::from_bytes(&secret_key.to_bytes())?;
                let signature: p521::ecdsa::Signature = signing_key.try_sign(data)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(data)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Exports the private key as PKCS#8 DER.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let document = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der()?,
            KeyPair::EcdsaP256 { signing_key } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP384 { signing_key } => signing_key.to_pkcs8_der()?,
            KeyPair::EcdsaP521 { secret_key } => secret_key.to_pkcs8_der()?,
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_der()?,
        };
        Ok(document.as_bytes().to_vec())
    }

    /// Exports the private key as a PKCS#8 `PRIVATE KEY` PEM block.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = pem::Pem::new("PRIVATE KEY", self.to_pkcs8_der()?);
        Ok(pem::encode_config(
            &pem,
            pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
        ))
    }

    /// Imports a private key from PKCS#8 DER, detecting its algorithm.
    pub fn import_from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        match info.algorithm.oid {
            RSA_ENCRYPTION => {
                let private = RsaPrivateKey::from_pkcs8_der(der)?;
                let public = RsaPublicKey::from(&private);
                Ok(KeyPair::Rsa {
                    private: Box::new(private),
                    public,
                })
            }
            ID_EC_PUBLIC_KEY => match info.algorithm.parameters_oid()? {
                SECP256R1 => Ok(KeyPair::EcdsaP256 {
                    signing_key: P256SigningKey::from_pkcs8_der(der)?,
                }),
                SECP384R1 => Ok(KeyPair::EcdsaP384 {
                    signing_key: P384SigningKey::from_pkcs8_der(der)?,
                }),
                SECP521R1 => Ok(KeyPair::EcdsaP521 {
                    secret_key: p521::SecretKey::from_pkcs8_der(der)?,
                }),
                curve => Err(ChainKitError::DecodingError(format!(
                    "Unsupported elliptic curve: {curve}"
                ))),
            },
            ID_ED25519 => Ok(KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::from_pkcs8_der(der)?,
            }),
            other => Err(ChainKitError::DecodingError(format!(
                "Unsupported private key algorithm: {other}"
            ))),
        }
    }

    /// Imports a private key from a PKCS#8 `PRIVATE KEY` PEM block.
    pub fn import_from_pkcs8_pem(pem_str: &str) -> Result<Self> {
        let pem = pem::parse(pem_str)?;
        if pem.tag() != "PRIVATE KEY" {
            return Err(ChainKitError::InvalidInput(format!(
                "Expected a PRIVATE KEY block, found {}",
                pem.tag()
            )));
        }
        Self::import_from_pkcs8_der(pem.contents())
    }
}
