use chrono::{DateTime, Utc};
use homestead_types::{AppError, SessionRegistryView, SessionView, UserProfile};
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::jwt::{self, hash_token};
use crate::repo;

/// How long a burst of identical auth events is collapsed before the
/// single surviving event is broadcast.
const EVENT_DEBOUNCE_MS: u64 = 300;

/// Auth lifecycle event, broadcast to subscribers after debouncing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    SessionInvalid,
}

#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub user_id: i64,
}

/// One stored session on a device. Holds everything needed to mint a new
/// access token without a database round trip.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub tier: String,
    pub refresh_token_hash: String,
    pub added_at: DateTime<Utc>,
}

/// Sessions registered on one device, with at most one active at a time.
#[derive(Debug, Default)]
struct DeviceRegistry {
    sessions: HashMap<i64, SessionEntry>,
    active_user_id: Option<i64>,
}

/// Multi-account session manager.
///
/// Each device (browser or phone, identified by the device cookie) keeps a
/// registry of signed-in accounts and switches between them without
/// re-entering credentials. Profiles are cached per user with single-flight
/// deduplication so concurrent fetches for the same user hit the database
/// exactly once.
pub struct SessionManager {
    pool: Pool<Postgres>,
    devices: Mutex<HashMap<String, DeviceRegistry>>,
    profile_cache: Mutex<HashMap<i64, UserProfile>>,
    /// In-flight profile fetches keyed by user. Followers subscribe to the
    /// leader's channel instead of issuing their own query.
    inflight: Mutex<HashMap<i64, broadcast::Sender<Result<UserProfile, AppError>>>>,
    /// Pending debounce timers keyed by (event, user).
    pending_events: Mutex<HashMap<(AuthEventKind, i64), JoinHandle<()>>>,
    events_tx: broadcast::Sender<AuthEvent>,
    /// Set while an explicit sign-in request is running. The sign-in flow
    /// registers the session itself, so SignedIn events fired during that
    /// window are dropped rather than processed twice.
    sign_in_in_progress: AtomicBool,
    /// Count of profile queries actually issued (not served from cache or
    /// deduplicated). Exposed for observability.
    profile_queries: AtomicU64,
}

impl SessionManager {
    pub fn new(pool: Pool<Postgres>) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            pool,
            devices: Mutex::new(HashMap::new()),
            profile_cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            pending_events: Mutex::new(HashMap::new()),
            events_tx,
            sign_in_in_progress: AtomicBool::new(false),
            profile_queries: AtomicU64::new(0),
        }
    }

    /// Subscribe to debounced auth events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events_tx.subscribe()
    }

    /// Number of profile queries issued against the database so far.
    pub fn profile_query_count(&self) -> u64 {
        self.profile_queries.load(Ordering::SeqCst)
    }

    /// Mark the start of an explicit sign-in. Returns a guard that clears
    /// the flag when dropped, so early returns can't leave it stuck.
    pub fn begin_sign_in(self: &Arc<Self>) -> SignInGuard {
        self.sign_in_in_progress.store(true, Ordering::SeqCst);
        SignInGuard {
            manager: Arc::clone(self),
        }
    }

    pub fn sign_in_in_progress(&self) -> bool {
        self.sign_in_in_progress.load(Ordering::SeqCst)
    }

    /// Register a session on a device. Idempotent: re-adding an existing
    /// user updates the stored refresh token hash and leaves the registry
    /// otherwise untouched. The first session added becomes active.
    pub async fn add_session(
        &self,
        device_id: &str,
        refresh_token: &str,
    ) -> Result<SessionEntry, AppError> {
        let claims = jwt::validate_refresh_token(refresh_token)
            .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

        let entry = SessionEntry {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role.clone(),
            tier: claims.tier.clone(),
            refresh_token_hash: hash_token(refresh_token),
            added_at: Utc::now(),
        };

        let mut devices = self.devices.lock().unwrap();
        let registry = devices.entry(device_id.to_string()).or_default();

        if let Some(existing) = registry.sessions.get_mut(&claims.sub) {
            // Same account re-added: refresh the token hash, keep added_at.
            existing.refresh_token_hash = entry.refresh_token_hash.clone();
            existing.email = entry.email.clone();
            existing.role = entry.role.clone();
            existing.tier = entry.tier.clone();
            let existing = existing.clone();
            return Ok(existing);
        }

        registry.sessions.insert(claims.sub, entry.clone());
        if registry.active_user_id.is_none() {
            registry.active_user_id = Some(claims.sub);
        }
        drop(devices);

        self.schedule_event(AuthEventKind::SignedIn, claims.sub);
        Ok(entry)
    }

    /// Switch the active session on a device, validating the stored refresh
    /// token against the database first. On a critical auth failure the
    /// target session is evicted from the registry.
    pub async fn switch_to_session(
        &self,
        device_id: &str,
        user_id: i64,
    ) -> Result<SessionEntry, AppError> {
        let entry = self.get_entry(device_id, user_id)?;

        match self.validate_stored_token(&entry).await {
            Ok(()) => {
                self.set_active(device_id, user_id);
                Ok(entry)
            }
            Err(e) => {
                if e.is_critical_auth_failure() {
                    self.evict(device_id, user_id);
                    self.schedule_event(AuthEventKind::SessionInvalid, user_id);
                }
                Err(e)
            }
        }
    }

    /// Switch the active session optimistically, validating the stored
    /// refresh token in the background. On validation failure the previous
    /// active session is restored and the bad session evicted.
    pub fn switch_to_session_safe(
        self: &Arc<Self>,
        device_id: &str,
        user_id: i64,
    ) -> Result<SessionEntry, AppError> {
        let entry = self.get_entry(device_id, user_id)?;
        let previous = {
            let mut devices = self.devices.lock().unwrap();
            let registry = devices
                .get_mut(device_id)
                .ok_or_else(|| AppError::not_found("No sessions on this device"))?;
            let previous = registry.active_user_id;
            registry.active_user_id = Some(user_id);
            previous
        };

        let manager = Arc::clone(self);
        let device = device_id.to_string();
        let check_entry = entry.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.validate_stored_token(&check_entry).await {
                if e.is_critical_auth_failure() {
                    tracing::warn!(user_id, %e, "Background session validation failed, rolling back");
                    manager.evict(&device, user_id);
                    let mut devices = manager.devices.lock().unwrap();
                    if let Some(registry) = devices.get_mut(&device) {
                        if registry.active_user_id == Some(user_id) {
                            registry.active_user_id =
                                previous.filter(|p| registry.sessions.contains_key(p));
                        }
                    }
                    drop(devices);
                    manager.schedule_event(AuthEventKind::SessionInvalid, user_id);
                }
            }
        });

        Ok(entry)
    }

    /// Remove a session from a device, revoking its refresh token. Clears
    /// the cached profile so a later re-add fetches fresh data. If the
    /// removed session was active, the most recently added remaining
    /// session becomes active.
    ///
    /// Revocation failures are logged but never keep the local entry alive:
    /// local state is cleared regardless (forced cleanup).
    pub async fn remove_session(&self, device_id: &str, user_id: i64) {
        self.profile_cache.lock().unwrap().remove(&user_id);
        let removed = {
            let mut devices = self.devices.lock().unwrap();
            let mut removed = None;
            if let Some(registry) = devices.get_mut(device_id) {
                removed = registry.sessions.remove(&user_id);
                if registry.active_user_id == Some(user_id) {
                    registry.active_user_id = registry
                        .sessions
                        .values()
                        .max_by_key(|e| e.added_at)
                        .map(|e| e.user_id);
                }
                if registry.sessions.is_empty() {
                    devices.remove(device_id);
                }
            }
            removed
        };

        if let Some(entry) = removed {
            self.revoke_entry_token(&entry).await;
        }
        self.schedule_event(AuthEventKind::SignedOut, user_id);
    }

    /// Remove every session on a device, revoking each refresh token and
    /// dropping the cached profiles. Local state is cleared even when a
    /// revocation fails.
    pub async fn clear_all(&self, device_id: &str) {
        let removed = {
            let mut devices = self.devices.lock().unwrap();
            devices.remove(device_id)
        };
        if let Some(registry) = removed {
            {
                let mut cache = self.profile_cache.lock().unwrap();
                for user_id in registry.sessions.keys() {
                    cache.remove(user_id);
                }
            }
            for entry in registry.sessions.values() {
                self.revoke_entry_token(entry).await;
            }
        }
    }

    /// Record a transparent refresh rotation: point the registry entry at
    /// the new token hash so a later switch validates against the live row.
    /// Without a device ID every device carrying the user is updated.
    pub fn note_token_rotation(&self, device_id: Option<&str>, user_id: i64, new_hash: &str) {
        {
            let mut devices = self.devices.lock().unwrap();
            match device_id {
                Some(device) => {
                    if let Some(entry) = devices
                        .get_mut(device)
                        .and_then(|r| r.sessions.get_mut(&user_id))
                    {
                        entry.refresh_token_hash = new_hash.to_string();
                    }
                }
                None => {
                    for registry in devices.values_mut() {
                        if let Some(entry) = registry.sessions.get_mut(&user_id) {
                            entry.refresh_token_hash = new_hash.to_string();
                        }
                    }
                }
            }
        }
        self.schedule_event(AuthEventKind::TokenRefreshed, user_id);
    }

    async fn revoke_entry_token(&self, entry: &SessionEntry) {
        if let Err(e) =
            repo::user::revoke_refresh_token(&self.pool, &entry.refresh_token_hash).await
        {
            tracing::warn!(user_id = entry.user_id, %e, "Failed to revoke refresh token on session removal");
        }
    }

    /// Snapshot of a device's registry for the sessions endpoint.
    pub fn registry_view(&self, device_id: &str) -> SessionRegistryView {
        let devices = self.devices.lock().unwrap();
        let Some(registry) = devices.get(device_id) else {
            return SessionRegistryView {
                device_id: device_id.to_string(),
                sessions: Vec::new(),
                active_user_id: None,
            };
        };

        let mut sessions: Vec<SessionView> = registry
            .sessions
            .values()
            .map(|e| SessionView {
                user_id: e.user_id,
                email: e.email.clone(),
                role: e.role.clone(),
                active: registry.active_user_id == Some(e.user_id),
                added_at: e.added_at,
            })
            .collect();
        sessions.sort_by_key(|s| s.added_at);

        SessionRegistryView {
            device_id: device_id.to_string(),
            sessions,
            active_user_id: registry.active_user_id,
        }
    }

    /// Fetch a user's profile, served from cache unless `force_refresh`.
    ///
    /// Concurrent fetches for the same user are deduplicated: one caller
    /// runs the query, the rest await its broadcast result. The cache is
    /// written before followers are woken so nobody observes a gap.
    pub async fn fetch_user_profile(
        &self,
        user_id: i64,
        force_refresh: bool,
    ) -> Result<UserProfile, AppError> {
        if !force_refresh {
            if let Some(profile) = self.profile_cache.lock().unwrap().get(&user_id) {
                return Ok(profile.clone());
            }
        }

        let mut rx = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.get(&user_id) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inflight.insert(user_id, tx);
                    None
                }
            }
        };

        if let Some(rx) = rx.as_mut() {
            // Follower: wait for the leader's result.
            return match rx.recv().await {
                Ok(result) => result,
                Err(_) => Err(AppError::internal("Profile fetch was interrupted")),
            };
        }

        // Leader: run the query and fan the result out.
        self.profile_queries.fetch_add(1, Ordering::SeqCst);
        let result = repo::profile::get_profile_by_user(&self.pool, user_id).await;

        if let Ok(profile) = &result {
            self.profile_cache
                .lock()
                .unwrap()
                .insert(user_id, profile.clone());
        } else if let Err(e) = &result {
            // Invalid credentials mean the cached identity is gone for good;
            // transient failures keep whatever was cached.
            if e.is_critical_auth_failure() {
                self.profile_cache.lock().unwrap().remove(&user_id);
            }
        }

        // Remove the in-flight entry before sending so late arrivals start
        // a fresh query instead of subscribing to a closed channel.
        let tx = self.inflight.lock().unwrap().remove(&user_id);
        if let Some(tx) = tx {
            let _ = tx.send(result.clone());
        }

        result
    }

    /// Drop a cached profile without touching the registry.
    pub fn invalidate_profile(&self, user_id: i64) {
        self.profile_cache.lock().unwrap().remove(&user_id);
    }

    /// Schedule a debounced auth event. A burst of identical events for
    /// the same user collapses into one broadcast after the debounce
    /// window; each new event restarts the timer.
    pub fn schedule_event(&self, kind: AuthEventKind, user_id: i64) {
        if kind == AuthEventKind::SignedIn && self.sign_in_in_progress() {
            // The explicit sign-in flow registers the session itself.
            return;
        }

        let key = (kind.clone(), user_id);
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(EVENT_DEBOUNCE_MS)).await;
            let _ = tx.send(AuthEvent { kind, user_id });
        });

        let mut pending = self.pending_events.lock().unwrap();
        if let Some(previous) = pending.insert(key, handle) {
            previous.abort();
        }
    }

    fn get_entry(&self, device_id: &str, user_id: i64) -> Result<SessionEntry, AppError> {
        let devices = self.devices.lock().unwrap();
        devices
            .get(device_id)
            .and_then(|r| r.sessions.get(&user_id))
            .cloned()
            .ok_or_else(|| AppError::not_found("Session not found on this device"))
    }

    fn set_active(&self, device_id: &str, user_id: i64) {
        let mut devices = self.devices.lock().unwrap();
        if let Some(registry) = devices.get_mut(device_id) {
            if registry.sessions.contains_key(&user_id) {
                registry.active_user_id = Some(user_id);
            }
        }
    }

    fn evict(&self, device_id: &str, user_id: i64) {
        self.profile_cache.lock().unwrap().remove(&user_id);
        let mut devices = self.devices.lock().unwrap();
        if let Some(registry) = devices.get_mut(device_id) {
            registry.sessions.remove(&user_id);
            if registry.active_user_id == Some(user_id) {
                registry.active_user_id = None;
            }
        }
    }

    /// Check the stored refresh token hash against the database: the row
    /// must exist, be unrevoked, and be unexpired.
    async fn validate_stored_token(&self, entry: &SessionEntry) -> Result<(), AppError> {
        let row: Option<(Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT revoked_at, expires_at FROM refresh_tokens WHERE token_hash = $1 AND user_id = $2",
        )
        .bind(&entry.refresh_token_hash)
        .bind(entry.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error_convert::sqlx_to_app_error)?;

        match row {
            None => Err(AppError::unauthorized("Invalid refresh token")),
            Some((Some(_revoked), _)) => Err(AppError::unauthorized("Invalid refresh token")),
            Some((None, expires_at)) if expires_at <= Utc::now() => {
                Err(AppError::unauthorized("Session expired"))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Clears the explicit-sign-in flag when dropped.
pub struct SignInGuard {
    manager: Arc<SessionManager>,
}

impl Drop for SignInGuard {
    fn drop(&mut self) {
        self.manager
            .sign_in_in_progress
            .store(false, Ordering::SeqCst);
    }
}
