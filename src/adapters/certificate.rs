//! Client certificate resolution.
//!
//! Two branches, kept deliberately distinct:
//! * incompletely specified options (any field empty, or a store/location
//!   string that does not parse) resolve to "no certificate" with no warning;
//! * fully specified options that match nothing in the opened store are a
//!   hard configuration error.
//!
//! Also provides [`PemDirectoryStore`], a filesystem-backed store adapter
//! with the `<root>/<location>/<store>/*.pem` layout.
use std::{
    fs,
    path::{Path, PathBuf},
};

use sha1::{Digest, Sha1};

use crate::{
    core::route::ClientCertificateOptions,
    ports::{
        certificate_store::{
            CertificateStoreHandle, CertificateStoreProvider, StoreLocation, StoreName,
            StoredCertificate,
        },
        outbound::{OutboundError, OutboundResult},
    },
};

/// Look up the client identity certificate named by `options`.
///
/// Returns `Ok(None)` for the silent cases, `Ok(Some(..))` on an exact
/// (case-sensitive) thumbprint match, and `Err(CertificateNotFound)` when the
/// options are complete but nothing matches. Blocking store I/O; call once
/// per client construction. The store handle is confined to this scope, so it
/// is released whichever branch is taken.
pub fn resolve_client_certificate(
    provider: &dyn CertificateStoreProvider,
    options: &ClientCertificateOptions,
) -> OutboundResult<Option<StoredCertificate>> {
    if !options.is_fully_specified() {
        return Ok(None);
    }

    let (Ok(name), Ok(location)) = (
        options.store.parse::<StoreName>(),
        options.location.parse::<StoreLocation>(),
    ) else {
        // Unrecognized enum values are configuration noise, not errors
        return Ok(None);
    };

    let handle = provider.open(name, location)?;

    let found = handle
        .certificates()
        .iter()
        .find(|certificate| certificate.thumbprint == options.thumbprint)
        .cloned();

    match found {
        Some(certificate) => Ok(Some(certificate)),
        None => Err(OutboundError::CertificateNotFound {
            store: options.store.clone(),
            location: options.location.clone(),
            thumbprint: options.thumbprint.clone(),
        }),
    }
}

/// Filesystem-backed certificate store.
///
/// Certificates live under `<root>/<location>/<store>/` as PEM files carrying
/// the certificate and its private key. Thumbprints are computed on open as
/// uppercase hex SHA-1 over the leaf certificate DER.
pub struct PemDirectoryStore {
    root: PathBuf,
}

impl PemDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load_certificate(path: &Path) -> Option<StoredCertificate> {
        let pem = fs::read(path).ok()?;
        let der = rustls_pemfile::certs(&mut pem.as_slice()).next()?.ok()?;
        Some(StoredCertificate {
            thumbprint: thumbprint(der.as_ref()),
            pem,
        })
    }
}

/// Uppercase hex SHA-1 digest of a certificate DER.
pub fn thumbprint(der: &[u8]) -> String {
    let digest = Sha1::digest(der);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

struct DirectoryStoreHandle {
    certificates: Vec<StoredCertificate>,
}

impl CertificateStoreHandle for DirectoryStoreHandle {
    fn certificates(&self) -> &[StoredCertificate] {
        &self.certificates
    }
}

impl CertificateStoreProvider for PemDirectoryStore {
    fn open(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> OutboundResult<Box<dyn CertificateStoreHandle>> {
        let dir = self.root.join(location.dir_name()).join(name.dir_name());

        let entries = fs::read_dir(&dir).map_err(|e| {
            OutboundError::StoreUnavailable(format!("cannot open {}: {e}", dir.display()))
        })?;

        let mut certificates = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("pem") {
                continue;
            }
            match Self::load_certificate(&path) {
                Some(certificate) => certificates.push(certificate),
                None => {
                    tracing::warn!(path = %path.display(), "skipping unreadable certificate file")
                }
            }
        }

        // Deterministic scan order regardless of directory enumeration
        certificates.sort_by(|a, b| a.thumbprint.cmp(&b.thumbprint));

        Ok(Box::new(DirectoryStoreHandle { certificates }))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rcgen::generate_simple_self_signed;
    use tempfile::TempDir;

    use super::*;

    /// Writes one self-signed certificate + key into
    /// `<root>/local-machine/my/` and returns its thumbprint.
    fn seeded_store() -> (TempDir, String) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("local-machine").join("my");
        fs::create_dir_all(&dir).unwrap();

        let certified = generate_simple_self_signed(["localhost".to_string()]).unwrap();
        let pem = format!(
            "{}{}",
            certified.cert.pem(),
            certified.signing_key.serialize_pem()
        );
        fs::write(dir.join("identity.pem"), &pem).unwrap();

        let print = thumbprint(certified.cert.der().as_ref());
        (root, print)
    }

    fn options(store: &str, location: &str, print: &str) -> ClientCertificateOptions {
        ClientCertificateOptions {
            store: store.to_string(),
            location: location.to_string(),
            thumbprint: print.to_string(),
        }
    }

    #[test]
    fn empty_options_resolve_to_no_certificate() {
        let (root, _) = seeded_store();
        let store = PemDirectoryStore::new(root.path());

        let resolved = resolve_client_certificate(&store, &options("", "", "")).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn partially_specified_options_resolve_to_no_certificate() {
        let (root, print) = seeded_store();
        let store = PemDirectoryStore::new(root.path());

        let resolved = resolve_client_certificate(&store, &options("My", "", &print)).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn unparseable_enum_values_resolve_to_no_certificate() {
        let (root, print) = seeded_store();
        let store = PemDirectoryStore::new(root.path());

        let resolved =
            resolve_client_certificate(&store, &options("NotAStore", "LocalMachine", &print))
                .unwrap();
        assert!(resolved.is_none());

        // Case matters: "my" is not "My"
        let resolved =
            resolve_client_certificate(&store, &options("my", "LocalMachine", &print)).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn matching_thumbprint_resolves_the_certificate() {
        let (root, print) = seeded_store();
        let store = PemDirectoryStore::new(root.path());

        let resolved = resolve_client_certificate(&store, &options("My", "LocalMachine", &print))
            .unwrap()
            .expect("certificate should resolve");
        assert_eq!(resolved.thumbprint, print);
        assert!(!resolved.pem.is_empty());
    }

    #[test]
    fn unmatched_thumbprint_is_a_hard_error() {
        let (root, _) = seeded_store();
        let store = PemDirectoryStore::new(root.path());

        let result = resolve_client_certificate(
            &store,
            &options("My", "LocalMachine", "0000000000000000000000000000000000000000"),
        );

        match result {
            Err(OutboundError::CertificateNotFound { thumbprint, .. }) => {
                assert_eq!(thumbprint, "0000000000000000000000000000000000000000");
            }
            other => panic!("expected CertificateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_store_directory_is_store_unavailable() {
        let root = TempDir::new().unwrap();
        let store = PemDirectoryStore::new(root.path());

        let result = resolve_client_certificate(&store, &options("My", "LocalMachine", "AA"));
        assert!(matches!(result, Err(OutboundError::StoreUnavailable(_))));
    }
}
