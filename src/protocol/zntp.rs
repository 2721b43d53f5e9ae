//! `zntp://` registered-site redirector.
//!
//! Users register local development sites as `name.domain -> port`. A
//! request to `zntp://<fqdn>/path?query` is redirected to
//! `http://localhost:<port>/path?query`; the port in the zntp URL itself is
//! ignored. Unregistered hosts are refused.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use super::NetError;

pub const ZNTP_SCHEME: &str = "zntp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub domain: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    /// `name.domain`, the host matched against zntp URLs
    pub fqdn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiteError {
    #[error("All fields are required.")]
    MissingFields,

    #[error("This site name and domain combination is already registered.")]
    DuplicateSite(String),

    #[error("Port {0} is already in use by another site.")]
    PortInUse(u16),

    #[error("Site not found.")]
    NotFound(String),
}

/// Site form as submitted by the UI. The port may arrive as a number or a
/// numeric string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddSiteRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, deserialize_with = "deserialize_optional_port")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteRequest {
    pub original_fqdn: String,
    #[serde(default)]
    pub new_name: String,
    #[serde(default)]
    pub new_domain: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u64),
    Text(String),
}

fn port_from_repr<E: serde::de::Error>(repr: PortRepr) -> Result<u16, E> {
    let raw = match repr {
        PortRepr::Number(n) => n,
        PortRepr::Text(text) => text.trim().parse().map_err(E::custom)?,
    };
    u16::try_from(raw).map_err(|_| E::custom(format!("port {raw} out of range")))
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    port_from_repr(PortRepr::deserialize(deserializer)?)
}

fn deserialize_optional_port<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u16>, D::Error> {
    match Option::<PortRepr>::deserialize(deserializer)? {
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(repr) => port_from_repr(repr).map(|port| (port != 0).then_some(port)),
        None => Ok(None),
    }
}

/// Registered zntp sites, persisted as a JSON array.
pub struct SiteRegistry {
    path: Option<PathBuf>,
    sites: Mutex<Vec<Site>>,
}

impl SiteRegistry {
    pub fn open() -> Self {
        Self::open_at(zenium_config::paths::sites_path())
    }

    /// Load the registry at `path`. A missing or corrupt file starts empty.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sites = match load_sites(&path) {
            Ok(sites) => sites,
            Err(e) => {
                log::error!("Failed to load zntp sites: {:#}", e);
                Vec::new()
            }
        };
        Self {
            path: Some(path),
            sites: Mutex::new(sites),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            sites: Mutex::new(Vec::new()),
        }
    }

    pub fn list(&self) -> Vec<Site> {
        self.sites.lock().clone()
    }

    pub fn find(&self, fqdn: &str) -> Option<Site> {
        self.sites.lock().iter().find(|site| site.fqdn == fqdn).cloned()
    }

    pub fn add(&self, request: AddSiteRequest) -> Result<Vec<Site>, SiteError> {
        let (name, domain) = (request.name.trim(), request.domain.trim());
        let Some(port) = request.port else {
            return Err(SiteError::MissingFields);
        };
        if name.is_empty() || domain.is_empty() {
            return Err(SiteError::MissingFields);
        }

        let fqdn = format!("{name}.{domain}");
        let mut sites = self.sites.lock();
        if sites.iter().any(|site| site.fqdn == fqdn) {
            return Err(SiteError::DuplicateSite(fqdn));
        }
        if sites.iter().any(|site| site.port == port) {
            return Err(SiteError::PortInUse(port));
        }

        log::info!("Registered zntp site {} -> localhost:{}", fqdn, port);
        sites.push(Site {
            name: name.to_string(),
            domain: domain.to_string(),
            port,
            fqdn,
        });
        self.persist(&sites);
        Ok(sites.clone())
    }

    /// Rename a site. The port is kept.
    pub fn update(&self, request: UpdateSiteRequest) -> Result<Vec<Site>, SiteError> {
        let (name, domain) = (request.new_name.trim(), request.new_domain.trim());
        if name.is_empty() || domain.is_empty() {
            return Err(SiteError::MissingFields);
        }

        let new_fqdn = format!("{name}.{domain}");
        let mut sites = self.sites.lock();
        if new_fqdn != request.original_fqdn && sites.iter().any(|site| site.fqdn == new_fqdn) {
            return Err(SiteError::DuplicateSite(new_fqdn));
        }
        let Some(site) = sites
            .iter_mut()
            .find(|site| site.fqdn == request.original_fqdn)
        else {
            return Err(SiteError::NotFound(request.original_fqdn));
        };

        log::info!("Renamed zntp site {} -> {}", site.fqdn, new_fqdn);
        site.name = name.to_string();
        site.domain = domain.to_string();
        site.fqdn = new_fqdn;
        self.persist(&sites);
        Ok(sites.clone())
    }

    pub fn remove(&self, fqdn: &str) -> Result<Vec<Site>, SiteError> {
        let mut sites = self.sites.lock();
        let before = sites.len();
        sites.retain(|site| site.fqdn != fqdn);
        if sites.len() == before {
            return Err(SiteError::NotFound(fqdn.to_string()));
        }

        log::info!("Removed zntp site {}", fqdn);
        self.persist(&sites);
        Ok(sites.clone())
    }

    /// Write-through; a failed write is logged and the in-memory change kept.
    fn persist(&self, sites: &[Site]) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = save_sites(path, sites) {
            log::error!("Failed to save zntp sites: {:#}", e);
        }
    }
}

fn load_sites(path: &Path) -> Result<Vec<Site>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read zntp sites from {:?}", path))?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse zntp sites from {:?}", path))
}

fn save_sites(path: &Path, sites: &[Site]) -> Result<()> {
    let json = serde_json::to_string_pretty(sites).context("Failed to serialize zntp sites")?;
    zenium_config::paths::write_atomic(path, &json)
        .with_context(|| format!("Failed to write zntp sites to {:?}", path))
}

/// Map a `zntp://` request to its localhost redirect target.
pub fn resolve_zntp(url: &str, registry: &SiteRegistry) -> Result<String, NetError> {
    let parsed = Url::parse(url).map_err(|e| {
        log::warn!("Unparsable zntp URL {:?}: {}", url, e);
        NetError::Aborted
    })?;
    if parsed.scheme() != ZNTP_SCHEME {
        return Err(NetError::Aborted);
    }
    let Some(host) = parsed.host_str() else {
        log::warn!("zntp URL without a host: {:?}", url);
        return Err(NetError::Aborted);
    };

    let Some(site) = registry.find(host) else {
        log::error!("Security violation: zntp request for unregistered site {:?}", host);
        return Err(NetError::FileNotFound);
    };

    let path = match parsed.path() {
        "" => "/",
        path => path,
    };
    let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();
    let target = format!("http://localhost:{}{}{}", site.port, path, query);
    debug_log!("PROTOCOL", "{} -> {}", url, target);
    Ok(target)
}
