//! In-memory directory service
//!
//! [`FakeDirectory`] behaves like IAM for the operations the sweep uses:
//! listings are paginated with opaque markers, a user without a login profile
//! yields `None`, and any call naming a missing user or key returns `NotFound`.
//! Failures can be scripted per operation.

use chrono::{DateTime, Utc};
use iam_janitor_common::{
    AccessKeyRecord, DirectoryError, DirectoryOperation, DirectoryService, KeyStatus,
    LoginProfileRecord, Page, PrincipalRecord,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Access key held by a [`FakeUser`]
#[derive(Debug, Clone)]
pub struct FakeKey {
    pub id: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl FakeKey {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: KeyStatus::Active,
            created_at,
            last_used_at: None,
        }
    }

    pub fn last_used(mut self, at: DateTime<Utc>) -> Self {
        self.last_used_at = Some(at);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.status = KeyStatus::Inactive;
        self
    }
}

/// User stored in a [`FakeDirectory`]
#[derive(Debug, Clone)]
pub struct FakeUser {
    pub name: String,
    pub password_last_used: Option<DateTime<Utc>>,
    pub login_profile_created: Option<DateTime<Utc>>,
    pub keys: Vec<FakeKey>,
}

impl FakeUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password_last_used: None,
            login_profile_created: None,
            keys: Vec::new(),
        }
    }

    pub fn login_profile(mut self, created_at: DateTime<Utc>) -> Self {
        self.login_profile_created = Some(created_at);
        self
    }

    pub fn password_last_used(mut self, at: DateTime<Utc>) -> Self {
        self.password_last_used = Some(at);
        self
    }

    pub fn key(mut self, key: FakeKey) -> Self {
        self.keys.push(key);
        self
    }

    pub fn arn(&self) -> String {
        format!("arn:aws:iam::123456789012:user/{}", self.name)
    }
}

#[derive(Default)]
struct State {
    users: BTreeMap<String, FakeUser>,
    /// Errors returned by the next calls of an operation, in order
    scripted: HashMap<DirectoryOperation, VecDeque<DirectoryError>>,
    /// Errors returned by every call of an operation for a specific target
    persistent: HashMap<(DirectoryOperation, String), DirectoryError>,
    calls: HashMap<DirectoryOperation, usize>,
}

impl State {
    fn enter(&mut self, op: DirectoryOperation, target: &str) -> Result<(), DirectoryError> {
        *self.calls.entry(op).or_default() += 1;
        if let Some(err) = self.persistent.get(&(op, target.to_string())) {
            return Err(err.clone());
        }
        if let Some(err) = self.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(())
    }
}

/// In-memory [`DirectoryService`]
pub struct FakeDirectory {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for FakeDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 100,
        }
    }

    /// Items per listing page (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_user(self, user: FakeUser) -> Self {
        self.insert_user(user);
        self
    }

    pub fn insert_user(&self, user: FakeUser) {
        self.lock().users.insert(user.name.clone(), user);
    }

    pub fn remove_user(&self, name: &str) {
        self.lock().users.remove(name);
    }

    /// Fail the next call of `op` with `error`. Calls queue up in order.
    pub fn fail_next(&self, op: DirectoryOperation, error: DirectoryError) {
        self.lock().scripted.entry(op).or_default().push_back(error);
    }

    /// Fail every call of `op` whose target (user name or key id) is `target`.
    pub fn fail_always(&self, op: DirectoryOperation, target: &str, error: DirectoryError) {
        self.lock()
            .persistent
            .insert((op, target.to_string()), error);
    }

    pub fn calls(&self, op: DirectoryOperation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn has_login_profile(&self, user: &str) -> bool {
        self.lock()
            .users
            .get(user)
            .is_some_and(|u| u.login_profile_created.is_some())
    }

    pub fn key_ids(&self, user: &str) -> Vec<String> {
        self.lock()
            .users
            .get(user)
            .map(|u| u.keys.iter().map(|k| k.id.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn paginate<T: Clone>(&self, items: &[T], marker: Option<String>) -> Page<T> {
        let start = marker.and_then(|m| m.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let next_marker = (end < items.len()).then(|| end.to_string());
        Page {
            items: items[start.min(end)..end].to_vec(),
            next_marker,
        }
    }
}

impl DirectoryService for FakeDirectory {
    async fn list_principals(
        &self,
        marker: Option<String>,
    ) -> Result<Page<PrincipalRecord>, DirectoryError> {
        let records: Vec<PrincipalRecord> = {
            let mut state = self.lock();
            state.enter(DirectoryOperation::ListPrincipals, "")?;
            state
                .users
                .values()
                .map(|u| PrincipalRecord {
                    name: u.name.clone(),
                    arn: u.arn(),
                    password_last_used: u.password_last_used,
                })
                .collect()
        };
        Ok(self.paginate(&records, marker))
    }

    async fn get_login_profile(
        &self,
        principal: &str,
    ) -> Result<Option<LoginProfileRecord>, DirectoryError> {
        let mut state = self.lock();
        state.enter(DirectoryOperation::GetLoginProfile, principal)?;
        match state.users.get(principal) {
            Some(user) => Ok(user
                .login_profile_created
                .map(|created_at| LoginProfileRecord { created_at })),
            None => Err(DirectoryError::NotFound(format!("user {principal}"))),
        }
    }

    async fn list_access_keys(
        &self,
        principal: &str,
        marker: Option<String>,
    ) -> Result<Page<AccessKeyRecord>, DirectoryError> {
        let records: Vec<AccessKeyRecord> = {
            let mut state = self.lock();
            state.enter(DirectoryOperation::ListAccessKeys, principal)?;
            let user = state
                .users
                .get(principal)
                .ok_or_else(|| DirectoryError::NotFound(format!("user {principal}")))?;
            user.keys
                .iter()
                .map(|k| AccessKeyRecord {
                    id: k.id.clone(),
                    status: k.status,
                    created_at: k.created_at,
                })
                .collect()
        };
        Ok(self.paginate(&records, marker))
    }

    async fn access_key_last_used(
        &self,
        key_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DirectoryError> {
        let mut state = self.lock();
        state.enter(DirectoryOperation::GetAccessKeyLastUsed, key_id)?;
        state
            .users
            .values()
            .flat_map(|u| u.keys.iter())
            .find(|k| k.id == key_id)
            .map(|k| k.last_used_at)
            .ok_or_else(|| DirectoryError::NotFound(format!("access key {key_id}")))
    }

    async fn delete_login_profile(&self, principal: &str) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        state.enter(DirectoryOperation::DeleteLoginProfile, principal)?;
        match state
            .users
            .get_mut(principal)
            .and_then(|u| u.login_profile_created.take())
        {
            Some(_) => Ok(()),
            None => Err(DirectoryError::NotFound(format!(
                "login profile for {principal}"
            ))),
        }
    }

    async fn delete_access_key(&self, principal: &str, key_id: &str) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        state.enter(DirectoryOperation::DeleteAccessKey, key_id)?;
        let user = state
            .users
            .get_mut(principal)
            .ok_or_else(|| DirectoryError::NotFound(format!("user {principal}")))?;
        let before = user.keys.len();
        user.keys.retain(|k| k.id != key_id);
        if user.keys.len() == before {
            return Err(DirectoryError::NotFound(format!("access key {key_id}")));
        }
        Ok(())
    }
}
