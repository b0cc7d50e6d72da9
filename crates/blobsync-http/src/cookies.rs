//! Session cookie jar with optional JSON persistence.
//!
//! The jar belongs to a single channel, so it is scoped to one host and
//! ignores `Domain`/`Path` attributes. Expiry is tracked from `Max-Age`
//! (which wins) or `Expires`; a cookie whose expiry has passed is deleted.
//! Persistence failures are logged and never fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One stored cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    /// `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// A parsed `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SetCookie {
    name: String,
    cookie: StoredCookie,
}

/// Cookie jar shared by every request of a channel.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
    dirty: AtomicBool,
    store: Option<PathBuf>,
    /// Held across snapshot, write and rename so saves never interleave.
    write_lock: Mutex<()>,
}

impl CookieJar {
    /// An empty, in-memory jar.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the jar from `store` (once, at session start).
    ///
    /// A missing file yields an empty jar; an unreadable or corrupt file is
    /// logged and also yields an empty jar. Expired cookies are dropped.
    pub fn load(store: Option<PathBuf>) -> Self {
        let now = Utc::now();
        let mut cookies = store.as_deref().map(read_store).unwrap_or_default();
        cookies.retain(|_, cookie| !cookie.is_expired(now));
        Self {
            cookies: Mutex::new(cookies),
            dirty: AtomicBool::new(false),
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `Set-Cookie` header values.
    pub fn update_from_headers(&self, set_cookies: &[String]) {
        self.update_at(set_cookies, Utc::now());
    }

    fn update_at(&self, set_cookies: &[String], now: DateTime<Utc>) {
        if set_cookies.is_empty() {
            return;
        }
        let mut cookies = self.lock();
        for header in set_cookies {
            let Some(SetCookie { name, cookie }) = parse_set_cookie(header, now) else {
                debug!(header = %header, "Ignoring malformed Set-Cookie header");
                continue;
            };
            let changed = if cookie.is_expired(now) {
                cookies.remove(&name).is_some()
            } else {
                cookies.insert(name, cookie.clone()).as_ref() != Some(&cookie)
            };
            if changed {
                self.dirty.store(true, Ordering::Release);
            }
        }
    }

    /// Value for the `Cookie` request header, `None` when no live cookie
    /// remains.
    pub fn header_value(&self) -> Option<String> {
        self.header_value_at(Utc::now())
    }

    fn header_value_at(&self, now: DateTime<Utc>) -> Option<String> {
        let mut cookies = self.lock();
        let before = cookies.len();
        cookies.retain(|_, cookie| !cookie.is_expired(now));
        if cookies.len() != before {
            self.dirty.store(true, Ordering::Release);
        }
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, cookie)| format!("{name}={}", cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|cookie| cookie.value.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether there are changes a [`persist`](Self::persist) would write.
    pub fn needs_persist(&self) -> bool {
        self.store.is_some() && self.dirty.load(Ordering::Acquire)
    }

    /// Write the jar to its store if it changed since the last write.
    ///
    /// Blocking. Concurrent calls are serialized, so the file always ends
    /// up holding the latest snapshot. Failures are logged; the jar stays
    /// dirty so a later call retries.
    pub fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _write = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }
        let snapshot = self.lock().clone();
        if let Err(e) = write_store(store, &snapshot) {
            warn!(path = %store.display(), error = %e, "Failed to save cookies");
            self.dirty.store(true, Ordering::Release);
        }
    }
}

/// Parse a `Set-Cookie` value received at `now`.
fn parse_set_cookie(header: &str, now: DateTime<Utc>) -> Option<SetCookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut max_age = None;
    let mut expires = None;
    for attribute in parts {
        let Some((key, raw)) = attribute.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("max-age") {
            max_age = raw.trim().parse::<i64>().ok();
        } else if key.eq_ignore_ascii_case("expires") {
            expires = parse_cookie_date(raw.trim());
        }
    }

    let expires = match max_age {
        Some(seconds) if seconds <= 0 => Some(DateTime::<Utc>::MIN_UTC),
        Some(seconds) => Some(
            TimeDelta::try_seconds(seconds)
                .and_then(|delta| now.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
        None => expires,
    };

    Some(SetCookie {
        name: name.to_string(),
        cookie: StoredCookie {
            value: value.trim().to_string(),
            expires,
        },
    })
}

/// `Expires` dates: RFC 1123 (`Thu, 01 Jan 1970 00:00:00 GMT`) or the
/// older RFC 850 form (`Thursday, 01-Jan-70 00:00:00 GMT`).
fn parse_cookie_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|date| date.and_utc())
}

fn read_store(path: &Path) -> BTreeMap<String, StoredCookie> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cookies, continuing without");
            return BTreeMap::new();
        }
    };
    match serde_json::from_slice(&data) {
        Ok(cookies) => {
            debug!(path = %path.display(), "Loaded cookies");
            cookies
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt cookie file, continuing without");
            BTreeMap::new()
        }
    }
}

fn write_store(path: &Path, cookies: &BTreeMap<String, StoredCookie>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(cookies)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}
