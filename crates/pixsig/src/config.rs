#![forbid(unsafe_code)]

//! Signer configuration from command-line arguments.

use clap::{Args, ValueEnum};
use pixsig_core::Error;
use pixsig_dsig::{GenericProfile, Iso20022Profile, SignatureProfile, XmlSigner};
use pixsig_keys::{loader, SigningIdentity, TrustStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Default alias prefix for trusted certificates.
pub const DEFAULT_ALIAS_PREFIX: &str = "trusted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProfileKind {
    /// Enveloped signature over the whole document
    #[default]
    Generic,
    /// Signature in AppHdr/Sgntr covering AppHdr and Document
    Iso20022,
}

impl ProfileKind {
    pub fn profile(self) -> Arc<dyn SignatureProfile> {
        match self {
            ProfileKind::Generic => Arc::new(GenericProfile::new()),
            ProfileKind::Iso20022 => Arc::new(Iso20022Profile::new()),
        }
    }
}

/// Key material and trust anchors shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct SignerArgs {
    /// Signature profile
    #[arg(long, value_enum, default_value_t = ProfileKind::Generic)]
    pub profile: ProfileKind,

    /// Signer private key (PKCS#8 or PKCS#1, PEM or DER)
    #[arg(short = 'k', long)]
    pub key: PathBuf,

    /// Signer certificate (PEM or DER)
    #[arg(long)]
    pub cert: PathBuf,

    /// Trusted certificates for verification (PEM bundle or DER, repeatable)
    #[arg(long)]
    pub trusted: Vec<PathBuf>,

    /// Alias prefix for trusted certificates
    #[arg(long = "trusted-alias-prefix", default_value = DEFAULT_ALIAS_PREFIX)]
    pub trusted_alias_prefix: String,
}

/// Everything needed to build an [`XmlSigner`].
#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub profile: ProfileKind,
    pub identity: SigningIdentity,
    pub trust_store: TrustStore,
}

impl SignerConfig {
    /// Load keys and certificates named by the arguments.
    ///
    /// Without `--trusted` the signer's own certificate is the only trust
    /// anchor.
    pub fn from_args(args: &SignerArgs) -> Result<Self, Error> {
        let key = loader::load_key_file(&args.key)?;
        let certificate = loader::load_certificate_file(&args.cert)?;
        let identity = SigningIdentity::from_rsa_key(key, certificate.clone())?;

        let mut trust_store = TrustStore::new();
        if args.trusted.is_empty() {
            trust_store.extend_with_prefix(&args.trusted_alias_prefix, [certificate]);
        }
        for path in &args.trusted {
            let certs = loader::load_certificates_file(path)?;
            trust_store.extend_with_prefix(&args.trusted_alias_prefix, certs);
        }
        info!(
            profile = ?args.profile,
            signer = identity.certificate().subject_name(),
            trusted = trust_store.len(),
            "loaded signer configuration"
        );

        Ok(Self {
            profile: args.profile,
            identity,
            trust_store,
        })
    }

    pub fn into_signer(self) -> XmlSigner {
        XmlSigner::new(
            self.identity,
            Arc::new(self.trust_store),
            self.profile.profile(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn data(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../test-data")
            .join(name)
    }

    fn args(trusted: Vec<PathBuf>) -> SignerArgs {
        SignerArgs {
            profile: ProfileKind::Iso20022,
            key: data("signer.key"),
            cert: data("signer.pem"),
            trusted,
            trusted_alias_prefix: "pix".into(),
        }
    }

    #[test]
    fn test_self_trust_by_default() {
        let config = SignerConfig::from_args(&args(Vec::new())).unwrap();
        assert_eq!(config.trust_store.len(), 1);
        assert!(config.trust_store.get("pix-0").is_some());
        assert_eq!(config.into_signer().profile().name(), "iso20022");
    }

    #[test]
    fn test_trusted_files_numbered_in_order() {
        let config = SignerConfig::from_args(&args(vec![
            data("counterparty.pem"),
            data("signer.pem"),
        ]))
        .unwrap();
        let aliases: Vec<&str> = config
            .trust_store
            .entries()
            .iter()
            .map(|e| e.alias.as_str())
            .collect();
        assert_eq!(aliases, ["pix-0", "pix-1"]);
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let mut a = args(Vec::new());
        a.key = data("counterparty.key");
        assert!(matches!(SignerConfig::from_args(&a), Err(Error::Key(_))));
    }
}
