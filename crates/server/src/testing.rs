//! Test doubles for the policy engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shellcache_client::{FetchOptions, Fetcher};
use shellcache_core::{AppConfig, CacheDb, Error, Snapshot, Storage, Store};
use tokio::sync::Semaphore;
use url::Url;

use crate::policy::{CachePolicy, PolicySettings, ShellRefresher};
use crate::tasks::BackgroundTasks;

pub const ORIGIN: &str = "http://app.test";

/// Absolute URL for a target; origin-form targets resolve against [`ORIGIN`].
pub fn url(target: &str) -> Url {
    match Url::parse(target) {
        Ok(url) => url,
        Err(_) => Url::parse(ORIGIN).unwrap().join(target).unwrap(),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(Snapshot),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    replies: HashMap<String, Reply>,
    gates: HashMap<String, Arc<Semaphore>>,
    calls: HashMap<String, usize>,
    options: HashMap<String, FetchOptions>,
}

/// Scripted [`Fetcher`] keyed by absolute URL.
#[derive(Debug, Default)]
pub struct MockFetcher {
    state: Mutex<MockState>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, target: &str, status: u16, body: &'static str) {
        let url = url(target);
        self.respond_with(target, Snapshot::new(url.as_str(), status, body));
    }

    pub fn respond_with(&self, target: &str, snapshot: Snapshot) {
        let key = url(target).to_string();
        self.state.lock().unwrap().replies.insert(key, Reply::Respond(snapshot));
    }

    pub fn fail(&self, target: &str) {
        let key = url(target).to_string();
        let reply = Reply::Fail(format!("network error: {key}: connection refused"));
        self.state.lock().unwrap().replies.insert(key, reply);
    }

    /// Hold fetches of `target` until a permit is added to the returned semaphore.
    pub fn gate(&self, target: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(url(target).to_string(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, target: &str) -> usize {
        let key = url(target).to_string();
        self.state.lock().unwrap().calls.get(&key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn last_options(&self, target: &str) -> Option<FetchOptions> {
        let key = url(target).to_string();
        self.state.lock().unwrap().options.get(&key).copied()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url, options: FetchOptions) -> Result<Snapshot, Error> {
        let key = url.to_string();
        let gate = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(key.clone()).or_default() += 1;
            state.options.insert(key.clone(), options);
            state.gates.get(&key).cloned()
        };

        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.state.lock().unwrap().replies.get(&key).cloned();
        match reply {
            Some(Reply::Respond(snapshot)) => Ok(snapshot),
            Some(Reply::Fail(message)) => Err(Error::HttpError(message)),
            None => Err(Error::HttpError(format!("network error: {key}: no route"))),
        }
    }
}

/// [`Storage`] wrapper whose `delete` fails for chosen names.
#[derive(Debug)]
pub struct FlakyStorage {
    inner: CacheDb,
    fail_delete: HashSet<String>,
    fail_list: bool,
}

impl FlakyStorage {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, fail_delete: HashSet::new(), fail_list: false }
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete.insert(name.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Store>, Error> {
        self.inner.open(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.fail_delete.contains(name) {
            return Err(Error::InvalidInput(format!("store {name} is locked")));
        }
        self.inner.delete(name).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        if self.fail_list {
            return Err(Error::InvalidInput("store listing unavailable".to_string()));
        }
        self.inner.list_names().await
    }
}

/// A policy wired to an in-memory database and a [`MockFetcher`].
pub struct TestPolicy {
    pub policy: CachePolicy,
    pub shell: ShellRefresher,
    pub fetcher: Arc<MockFetcher>,
    pub db: CacheDb,
}

impl TestPolicy {
    pub async fn new(fetcher: Arc<MockFetcher>) -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        let settings = Arc::new(PolicySettings::from_config(&test_config()).unwrap());
        let dyn_fetcher: Arc<dyn Fetcher> = fetcher.clone();
        let shell = ShellRefresher::new(Arc::clone(&dyn_fetcher), settings.manifest.clone());
        let policy = CachePolicy::new(
            Arc::new(db.clone()),
            dyn_fetcher,
            shell.clone(),
            settings,
            BackgroundTasks::new(),
        );
        Self { policy, shell, fetcher, db }
    }

    /// The current store.
    pub async fn store(&self) -> Arc<dyn Store> {
        self.db.open(&self.policy.settings().store_name).await.unwrap()
    }
}
