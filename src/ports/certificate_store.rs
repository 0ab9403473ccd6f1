use std::str::FromStr;

use crate::ports::outbound::OutboundResult;

/// Recognized certificate store names.
///
/// Parsing is case-sensitive and parse failure is not an error: an
/// unrecognized name is treated exactly like an absent one by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreName {
    My,
    Root,
    CertificateAuthority,
    TrustedPeople,
}

impl StoreName {
    /// Directory name used by filesystem-backed store adapters.
    pub fn dir_name(&self) -> &'static str {
        match self {
            StoreName::My => "my",
            StoreName::Root => "root",
            StoreName::CertificateAuthority => "certificate-authority",
            StoreName::TrustedPeople => "trusted-people",
        }
    }
}

impl FromStr for StoreName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "My" => Ok(StoreName::My),
            "Root" => Ok(StoreName::Root),
            "CertificateAuthority" => Ok(StoreName::CertificateAuthority),
            "TrustedPeople" => Ok(StoreName::TrustedPeople),
            _ => Err(()),
        }
    }
}

/// Recognized certificate store locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLocation {
    CurrentUser,
    LocalMachine,
}

impl StoreLocation {
    pub fn dir_name(&self) -> &'static str {
        match self {
            StoreLocation::CurrentUser => "current-user",
            StoreLocation::LocalMachine => "local-machine",
        }
    }
}

impl FromStr for StoreLocation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CurrentUser" => Ok(StoreLocation::CurrentUser),
            "LocalMachine" => Ok(StoreLocation::LocalMachine),
            _ => Err(()),
        }
    }
}

/// A certificate as stored: its thumbprint plus the PEM bytes (certificate
/// and private key) needed to build a client identity.
#[derive(Debug, Clone)]
pub struct StoredCertificate {
    /// Uppercase hex SHA-1 of the leaf certificate DER
    pub thumbprint: String,
    pub pem: Vec<u8>,
}

/// An opened, read-only view of one store. Dropping the handle releases the
/// underlying resource; the resolver keeps it scoped so release happens on
/// every exit path.
pub trait CertificateStoreHandle {
    fn certificates(&self) -> &[StoredCertificate];
}

/// Platform certificate-store accessor port.
pub trait CertificateStoreProvider: Send + Sync {
    /// Open the named store read-only. Store access is blocking I/O; callers
    /// invoke it once per client construction, never per request.
    fn open(
        &self,
        name: StoreName,
        location: StoreLocation,
    ) -> OutboundResult<Box<dyn CertificateStoreHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_name_parsing_is_case_sensitive() {
        assert_eq!("My".parse::<StoreName>(), Ok(StoreName::My));
        assert!("my".parse::<StoreName>().is_err());
        assert!("LocalMachine".parse::<StoreName>().is_err());
    }

    #[test]
    fn store_location_parsing() {
        assert_eq!(
            "LocalMachine".parse::<StoreLocation>(),
            Ok(StoreLocation::LocalMachine)
        );
        assert_eq!(
            "CurrentUser".parse::<StoreLocation>(),
            Ok(StoreLocation::CurrentUser)
        );
        assert!("Elsewhere".parse::<StoreLocation>().is_err());
    }
}
