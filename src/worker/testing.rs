//! In-memory port implementations for tests
//!
//! Each fake records what it was asked to do so tests can assert on calls
//! as well as results.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::http::{Request, Response};
use super::ports::{
    Clients, DurableQueue, NetworkFetcher, Notifier, Ports, ResponseCache, SyncManager,
    WindowClient,
};
use super::push::NotificationRequest;
use super::queue::{NewTask, QueueKind, QueuedTask, SyncTag};
use crate::error::{CacheError, Error, NetworkError, QueueError, Result};

/// Namespaces in creation order, each a key -> response map.
#[derive(Default)]
pub struct FakeCache {
    namespaces: Mutex<Vec<(String, BTreeMap<String, Response>)>>,
    failing: AtomicBool,
}

impl FakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call fails with a storage error.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn seed(&self, namespace: &str, key: &str, response: Response) {
        let mut namespaces = self.namespaces.lock().unwrap();
        Self::entries(&mut namespaces, namespace).insert(key.to_string(), response);
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<Response> {
        let namespaces = self.namespaces.lock().unwrap();
        namespaces
            .iter()
            .find(|(name, _)| name == namespace)
            .and_then(|(_, entries)| entries.get(key).cloned())
    }

    pub fn names(&self) -> Vec<String> {
        let namespaces = self.namespaces.lock().unwrap();
        namespaces.iter().map(|(name, _)| name.clone()).collect()
    }

    fn entries<'a>(
        namespaces: &'a mut Vec<(String, BTreeMap<String, Response>)>,
        namespace: &str,
    ) -> &'a mut BTreeMap<String, Response> {
        let index = match namespaces.iter().position(|(name, _)| name == namespace) {
            Some(index) => index,
            None => {
                namespaces.push((namespace.to_string(), BTreeMap::new()));
                namespaces.len() - 1
            }
        };
        &mut namespaces[index].1
    }

    fn check(&self) -> std::result::Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Io("fake cache failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResponseCache for FakeCache {
    async fn open(&self, namespace: &str) -> std::result::Result<(), CacheError> {
        self.check()?;
        let mut namespaces = self.namespaces.lock().unwrap();
        Self::entries(&mut namespaces, namespace);
        Ok(())
    }

    async fn match_in(
        &self,
        namespace: &str,
        key: &str,
    ) -> std::result::Result<Option<Response>, CacheError> {
        self.check()?;
        Ok(self.get(namespace, key))
    }

    async fn match_any(&self, key: &str) -> std::result::Result<Option<Response>, CacheError> {
        self.check()?;
        let namespaces = self.namespaces.lock().unwrap();
        Ok(namespaces
            .iter()
            .find_map(|(_, entries)| entries.get(key).cloned()))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        response: &Response,
    ) -> std::result::Result<(), CacheError> {
        self.check()?;
        self.seed(namespace, key, response.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str) -> std::result::Result<bool, CacheError> {
        self.check()?;
        let mut namespaces = self.namespaces.lock().unwrap();
        let before = namespaces.len();
        namespaces.retain(|(name, _)| name != namespace);
        Ok(namespaces.len() != before)
    }

    async fn keys(&self) -> std::result::Result<Vec<String>, CacheError> {
        self.check()?;
        Ok(self.names())
    }
}

/// Canned responses by URL; unknown URLs get a 404.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<BTreeMap<String, Response>>,
    requests: Mutex<Vec<Request>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkFetcher for FakeNetwork {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect("offline".to_string()));
        }
        let responses = self.responses.lock().unwrap();
        Ok(responses
            .get(&request.cache_key())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}

#[derive(Default)]
pub struct FakeQueue {
    tasks: Mutex<Vec<QueuedTask>>,
    next_id: AtomicI64,
    failing: bool,
    deletes_fail: AtomicBool,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Keep reads working but make every later delete fail.
    pub fn fail_deletes(&self) {
        self.deletes_fail.store(true, Ordering::SeqCst);
    }

    pub fn len(&self, kind: QueueKind) -> usize {
        let tasks = self.tasks.lock().unwrap();
        tasks.iter().filter(|t| t.kind == kind).count()
    }

    fn check(&self) -> std::result::Result<(), QueueError> {
        if self.failing {
            Err(QueueError::Io("fake queue failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableQueue for FakeQueue {
    async fn add(&self, task: &NewTask) -> std::result::Result<i64, QueueError> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.tasks.lock().unwrap().push(task.clone().into_queued(id));
        Ok(id)
    }

    async fn list(&self, kind: QueueKind) -> std::result::Result<Vec<QueuedTask>, QueueError> {
        self.check()?;
        let mut tasks: Vec<QueuedTask> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.kind == kind)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_at, t.id));
        Ok(tasks)
    }

    async fn delete(&self, kind: QueueKind, id: i64) -> std::result::Result<bool, QueueError> {
        self.check()?;
        if self.deletes_fail.load(Ordering::SeqCst) {
            return Err(QueueError::Io("fake delete failure".to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| !(t.kind == kind && t.id == id));
        Ok(tasks.len() != before)
    }
}

pub struct FakeSync {
    supported: bool,
    registered: Mutex<Vec<SyncTag>>,
}

impl FakeSync {
    pub fn supported() -> Self {
        Self {
            supported: true,
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::supported()
        }
    }

    pub fn registered(&self) -> Vec<SyncTag> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncManager for FakeSync {
    async fn register(&self, tag: SyncTag) -> Result<bool> {
        if self.supported {
            self.registered.lock().unwrap().push(tag);
        }
        Ok(self.supported)
    }
}

#[derive(Default)]
pub struct FakeClients {
    windows: Mutex<Vec<WindowClient>>,
    claims: AtomicUsize,
    focused: Mutex<Vec<String>>,
    navigations: Mutex<Vec<(String, String)>>,
    opened: Mutex<Vec<String>>,
}

impl FakeClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_windows(windows: Vec<WindowClient>) -> Self {
        Self {
            windows: Mutex::new(windows),
            ..Self::default()
        }
    }

    pub fn add_window(&self, window: WindowClient) {
        self.windows.lock().unwrap().push(window);
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<(String, String)> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clients for FakeClients {
    async fn claim(&self) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowClient>> {
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn navigate(&self, id: &str, url: &str) -> Result<()> {
        let mut windows = self.windows.lock().unwrap();
        let window = windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::Other(format!("no window {}", id)))?;
        window.url = url.to_string();
        self.navigations
            .lock()
            .unwrap()
            .push((id.to_string(), url.to_string()));
        Ok(())
    }

    async fn focus(&self, id: &str) -> Result<()> {
        self.focused.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<bool> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    shown: Mutex<Vec<NotificationRequest>>,
}

impl FakeNotifier {
    pub fn shown(&self) -> Vec<NotificationRequest> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn show(&self, notification: &NotificationRequest) -> Result<()> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// One of every fake, wired into [`Ports`].
pub struct FakePlatform {
    pub cache: Arc<FakeCache>,
    pub network: Arc<FakeNetwork>,
    pub queue: Arc<FakeQueue>,
    pub sync: Arc<FakeSync>,
    pub clients: Arc<FakeClients>,
    pub notifier: Arc<FakeNotifier>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(FakeCache::new()),
            network: Arc::new(FakeNetwork::new()),
            queue: Arc::new(FakeQueue::new()),
            sync: Arc::new(FakeSync::supported()),
            clients: Arc::new(FakeClients::new()),
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            cache: self.cache.clone(),
            network: self.network.clone(),
            queue: self.queue.clone(),
            sync: self.sync.clone(),
            clients: self.clients.clone(),
            notifier: self.notifier.clone(),
        }
    }
}
