use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VendorLookupError;
use crate::models::domain::MacAddr;

pub const NOT_FOUND: &str = "Not Found";
pub const DEFAULT_LOOKUP_URL: &str = "https://api.maclookup.app/v2/macs/";

const FLAG_URL_BASE: &str = "https://flagcdn.com/36x27";
const FLAG_PLACEHOLDER_URL: &str = "https://via.placeholder.com/36x27?text=No+Flag";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorRecord {
    pub vendor: String,
    pub country: String,
}

impl VendorRecord {
    pub fn not_found() -> Self {
        Self {
            vendor: NOT_FOUND.to_string(),
            country: NOT_FOUND.to_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.vendor != NOT_FOUND
    }

    /// Flag image for the country; anything that is not a two letter ISO code gets the placeholder.
    pub fn flag_url(&self) -> String {
        let code = self.country.as_str();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            format!("{}/{}.png", FLAG_URL_BASE, code.to_ascii_lowercase())
        } else {
            FLAG_PLACEHOLDER_URL.to_string()
        }
    }
}

/// Body of a lookup service answer. Both fields may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    pub company: Option<String>,
    pub country: Option<String>,
}

impl From<LookupResponse> for VendorRecord {
    fn from(response: LookupResponse) -> Self {
        let or_not_found = |field: Option<String>| {
            field
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NOT_FOUND.to_string())
        };
        VendorRecord {
            vendor: or_not_found(response.company),
            country: or_not_found(response.country),
        }
    }
}

/// Transport for vendor lookups.
pub trait VendorLookup: Send + Sync {
    fn lookup(&self, mac: &MacAddr) -> Result<LookupResponse, VendorLookupError>;
}

/// `GET <base_url><mac>` against a maclookup style JSON service.
pub struct HttpLookup {
    client: Client,
    base_url: String,
}

impl HttpLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, VendorLookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }
}

impl VendorLookup for HttpLookup {
    fn lookup(&self, mac: &MacAddr) -> Result<LookupResponse, VendorLookupError> {
        let response = self.client.get(format!("{}{}", self.base_url, mac)).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(VendorLookupError::Status(status.as_u16()));
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Used with `--offline`: every address resolves to the sentinel.
pub struct OfflineLookup;

impl VendorLookup for OfflineLookup {
    fn lookup(&self, _mac: &MacAddr) -> Result<LookupResponse, VendorLookupError> {
        Err(VendorLookupError::Disabled)
    }
}

/// Memoizing resolver: at most one lookup per distinct address for its lifetime.
/// Lookup failures never escape; they become [`VendorRecord::not_found`].
///
/// Each address gets one cell in the cache. Concurrent callers for the same
/// address block on that cell while the first of them performs the lookup.
pub struct VendorResolver {
    lookup: Box<dyn VendorLookup>,
    retries: u8,
    cache: Mutex<HashMap<MacAddr, Arc<OnceLock<VendorRecord>>>>,
    lookups: AtomicUsize,
}

impl VendorResolver {
    pub fn new(lookup: Box<dyn VendorLookup>) -> Self {
        Self {
            lookup,
            retries: 0,
            cache: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Retry a failed transport at most this many times (capped at one).
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries.min(1);
        self
    }

    pub fn resolve(&self, mac: &MacAddr) -> VendorRecord {
        let cell = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(*mac).or_default())
        };
        cell.get_or_init(|| self.fetch(mac)).clone()
    }

    /// Resolves every distinct address, fanning the lookups out over `workers` threads.
    pub fn resolve_all(
        &self,
        macs: impl IntoIterator<Item = MacAddr>,
        workers: usize,
    ) -> BTreeMap<MacAddr, VendorRecord> {
        let pending: BTreeSet<MacAddr> = macs.into_iter().collect();
        let workers = workers.clamp(1, pending.len().max(1));

        let (tx, rx) = crossbeam_channel::unbounded();
        for mac in &pending {
            tx.send(*mac).unwrap_or_else(|e| warn!("lookup queue closed: {}", e));
        }
        drop(tx);

        thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                scope.spawn(move || {
                    for mac in rx.iter() {
                        self.resolve(&mac);
                    }
                });
            }
        });

        pending.into_iter().map(|mac| (mac, self.resolve(&mac))).collect()
    }

    /// Number of distinct addresses that went to the lookup transport.
    pub fn lookups_performed(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn fetch(&self, mac: &MacAddr) -> VendorRecord {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let mut attempt = 0;
        loop {
            match self.lookup.lookup(mac) {
                Ok(response) => {
                    let record = VendorRecord::from(response);
                    debug!(%mac, vendor = %record.vendor, country = %record.country, "vendor resolved");
                    return record;
                }
                Err(VendorLookupError::Disabled) => return VendorRecord::not_found(),
                Err(VendorLookupError::Transport(e)) if attempt < self.retries => {
                    debug!(%mac, "vendor lookup failed, retrying: {}", e);
                    attempt += 1;
                }
                Err(e) => {
                    warn!(%mac, "vendor lookup failed: {}", e);
                    return VendorRecord::not_found();
                }
            }
        }
    }
}
