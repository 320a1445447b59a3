//! In-memory certificate store and certificate fixtures

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use unicert_fingerprint::fingerprint;
use unicert_unifi::{CertificateRecord, CertificateStore, UnifiError};
use unicert_updater::{CertificateBundle, LoggingTransformer};

/// Calls made against the store, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(String),
    Activate(String),
    Delete(String),
}

/// How the store reacts to `activate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// Target becomes the only active certificate
    Exclusive,
    /// Target becomes active, previous ones stay active
    Additive,
    /// Request succeeds, nothing changes
    Ignored,
}

#[derive(Debug)]
pub struct MemoryStore {
    pub records: Vec<CertificateRecord>,
    pub calls: Vec<Call>,
    pub activation: ActivationMode,
    pub failing_deletes: HashSet<String>,
    pub fail_create: bool,
    pub fail_list: bool,
    next_id: u32,
}

impl MemoryStore {
    pub fn new(records: Vec<CertificateRecord>) -> Self {
        LoggingTransformer::init_test();
        Self {
            records,
            calls: Vec::new(),
            activation: ActivationMode::Exclusive,
            failing_deletes: HashSet::new(),
            fail_create: false,
            fail_list: false,
            next_id: 100,
        }
    }

    pub fn failing_delete(mut self, id: &str) -> Self {
        self.failing_deletes.insert(id.to_string());
        self
    }

    pub fn with_activation(mut self, activation: ActivationMode) -> Self {
        self.activation = activation;
        self
    }

    pub fn creates(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Create(_)))
            .count()
    }

    pub fn activations(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Activate(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|call| **call != Call::List)
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|record| record.id.clone()).collect()
    }

    pub fn active(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.active)
            .map(|record| record.id.clone())
            .collect()
    }
}

fn server_error() -> UnifiError {
    UnifiError::Status {
        status: 500,
        body: r#"{"error":"internal server error"}"#.to_string(),
    }
}

fn not_found() -> UnifiError {
    UnifiError::Status {
        status: 404,
        body: "Not Found".to_string(),
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn list(&mut self) -> unicert_unifi::Result<Vec<CertificateRecord>> {
        self.calls.push(Call::List);
        if self.fail_list {
            return Err(server_error());
        }
        Ok(self.records.clone())
    }

    async fn create(
        &mut self,
        name: &str,
        certificate_pem: &str,
        _key_pem: &str,
    ) -> unicert_unifi::Result<CertificateRecord> {
        self.calls.push(Call::Create(name.to_string()));
        if self.fail_create {
            return Err(server_error());
        }

        self.next_id += 1;
        let record = CertificateRecord {
            id: self.next_id.to_string(),
            name: name.to_string(),
            fingerprint: fingerprint(certificate_pem).unwrap(),
            valid_from: Some(Utc::now()),
            ..CertificateRecord::default()
        };
        self.records.push(record.clone());
        Ok(record)
    }

    async fn activate(&mut self, id: &str) -> unicert_unifi::Result<()> {
        self.calls.push(Call::Activate(id.to_string()));
        if !self.records.iter().any(|record| record.id == id) {
            return Err(not_found());
        }

        for record in &mut self.records {
            match self.activation {
                ActivationMode::Exclusive => record.active = record.id == id,
                ActivationMode::Additive => record.active |= record.id == id,
                ActivationMode::Ignored => {}
            }
        }
        Ok(())
    }

    async fn delete(&mut self, id: &str) -> unicert_unifi::Result<()> {
        self.calls.push(Call::Delete(id.to_string()));
        assert!(
            !self.records.iter().any(|record| record.id == id && record.active),
            "active certificate {id} must never be deleted"
        );
        if self.failing_deletes.contains(id) {
            return Err(server_error());
        }

        let before = self.records.len();
        self.records.retain(|record| record.id != id);
        if self.records.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}

/// Midnight on 1 January of `year`
pub fn year(year: i32) -> Option<DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap())
}

pub fn record(id: &str, fingerprint: &str, valid_from: Option<DateTime<Utc>>, active: bool) -> CertificateRecord {
    CertificateRecord {
        id: id.to_string(),
        name: fingerprint.to_string(),
        fingerprint: fingerprint.to_string(),
        valid_from,
        active,
        ..CertificateRecord::default()
    }
}

/// Freshly generated certificate and key for `common_name`
pub fn bundle(common_name: &str) -> CertificateBundle {
    let mut params = CertificateParams::new(vec![common_name.to_string()])
        .expect("Failed to create certificate parameters");
    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name = distinguished_name;

    let key_pair = KeyPair::generate().expect("Failed to generate key pair");
    let cert = params
        .self_signed(&key_pair)
        .expect("Failed to create self-signed certificate");
    CertificateBundle::new(cert.pem(), key_pair.serialize_pem())
}
