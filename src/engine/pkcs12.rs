//! PKCS#12 signing engine backed by OpenSSL.

use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::{X509NameRef, X509};
use std::fs;
use std::path::Path;

use super::{EngineError, Signer, SigningEngine};

#[derive(Debug, Default, Clone, Copy)]
pub struct Pkcs12Engine;

impl SigningEngine for Pkcs12Engine {
    fn create_signer(&self, cert: &Path, password: &str) -> Result<Box<dyn Signer>, EngineError> {
        let signer = Pkcs12Signer::from_file(cert, password)?;
        tracing::debug!("loaded signing certificate for '{}'", signer.common_name());
        Ok(Box::new(signer))
    }
}

/// Private key, certificate and CA chain from one PKCS#12 bundle.
pub struct Pkcs12Signer {
    key: PKey<Private>,
    cert: X509,
    chain: Stack<X509>,
}

impl Pkcs12Signer {
    pub fn from_file(path: &Path, password: &str) -> Result<Self, EngineError> {
        let der = fs::read(path)?;
        Self::from_der(&der, password)
    }

    pub fn from_der(der: &[u8], password: &str) -> Result<Self, EngineError> {
        let parsed = Pkcs12::from_der(der)?.parse2(password)?;
        let key = parsed
            .pkey
            .ok_or_else(|| EngineError::Document("certificate bundle has no private key".into()))?;
        let cert = parsed
            .cert
            .ok_or_else(|| EngineError::Document("certificate bundle has no certificate".into()))?;

        let mut chain = Stack::new()?;
        if let Some(ca) = parsed.ca {
            for ca_cert in ca {
                chain.push(ca_cert)?;
            }
        }
        Ok(Self { key, cert, chain })
    }
}

fn format_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry.data().as_utf8().map(|s| s.to_string()).unwrap_or_default();
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Signer for Pkcs12Signer {
    fn common_name(&self) -> String {
        self.cert
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|name| name.to_string())
            .unwrap_or_else(|| format_name(self.cert.subject_name()))
    }

    fn distinguished_name(&self) -> String {
        format_name(self.cert.subject_name())
    }

    fn sign_detached(&self, data: &[u8]) -> Result<Vec<u8>, EngineError> {
        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY;
        let pkcs7 = Pkcs7::sign(&self.cert, &self.key, &self.chain, data, flags)?;
        Ok(pkcs7.to_der()?)
    }
}
