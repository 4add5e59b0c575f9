//! In-memory doubles for the store, sibling caches and DNS.

use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    cache::{
        invalidation::{InvalidationHub, OwnerCacheInvalidator, OwnerIndexedCache, OwnerSnapshot},
        CacheStore,
    },
    dns::DnsRegistrar,
    error::AppError,
    icons::fallback::FallbackIcon,
    service::ProfileService,
    users::{
        repo::{ProfileStore, ProfileTx},
        repo_types::{NewUser, ThemeModel, UserModel},
    },
};

pub const FALLBACK: &[u8] = b"fallback-jpeg";

#[derive(Debug, Clone)]
struct IconRow {
    user_id: i64,
    image: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<UserModel>,
    themes: Vec<ThemeModel>,
    icons: Vec<IconRow>,
}

#[derive(Debug, Clone)]
enum Op {
    InsertUser(UserModel),
    InsertTheme(ThemeModel),
    DeleteIcons(i64),
    InsertIcon(IconRow),
}

impl Tables {
    fn apply(&mut self, op: &Op) {
        match op {
            Op::InsertUser(user) => self.users.push(user.clone()),
            Op::InsertTheme(theme) => self.themes.push(theme.clone()),
            Op::DeleteIcons(user_id) => self.icons.retain(|icon| icon.user_id != *user_id),
            Op::InsertIcon(icon) => self.icons.push(icon.clone()),
        }
    }
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    next_id: AtomicI64,
    begins: AtomicUsize,
    theme_reads: AtomicUsize,
    icon_reads: AtomicUsize,
    fail_commit: AtomicBool,
}

/// Read-committed store: each read sees the latest committed tables plus the
/// transaction's own pending writes. Writes apply on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    fn next_id(&self) -> i64 {
        self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.shared.tables.lock().expect("tables poisoned")
    }

    pub fn add_user(&self, name: &str) -> i64 {
        let id = self.next_id();
        let theme_id = self.next_id();
        let mut tables = self.tables();
        tables.users.push(UserModel {
            id,
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            password_hash: String::new(),
        });
        tables.themes.push(ThemeModel {
            id: theme_id,
            user_id: id,
            dark_mode: false,
        });
        id
    }

    pub fn user_id(&self, name: &str) -> i64 {
        self.tables()
            .users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.id)
            .expect("user exists")
    }

    pub fn has_user(&self, name: &str) -> bool {
        self.tables().users.iter().any(|u| u.name == name)
    }

    /// Committed write that bypasses the service and its invalidation.
    pub fn set_icon(&self, name: &str, image: &[u8]) {
        let user_id = self.user_id(name);
        let mut tables = self.tables();
        tables.apply(&Op::DeleteIcons(user_id));
        tables.apply(&Op::InsertIcon(IconRow {
            user_id,
            image: image.to_vec(),
        }));
    }

    pub fn drop_theme(&self, name: &str) {
        let user_id = self.user_id(name);
        self.tables().themes.retain(|t| t.user_id != user_id);
    }

    pub fn icon_image(&self, user_id: i64) -> Option<Vec<u8>> {
        self.tables()
            .icons
            .iter()
            .find(|i| i.user_id == user_id)
            .map(|i| i.image.clone())
    }

    pub fn icon_count(&self, user_id: i64) -> usize {
        self.tables().icons.iter().filter(|i| i.user_id == user_id).count()
    }

    pub fn peek_next_id(&self) -> i64 {
        self.shared.next_id.load(Ordering::SeqCst) + 1
    }

    pub fn fail_next_commit(&self) {
        self.shared.fail_commit.store(true, Ordering::SeqCst);
    }

    pub fn begins(&self) -> usize {
        self.shared.begins.load(Ordering::SeqCst)
    }

    pub fn theme_reads(&self) -> usize {
        self.shared.theme_reads.load(Ordering::SeqCst)
    }

    pub fn icon_reads(&self) -> usize {
        self.shared.icon_reads.load(Ordering::SeqCst)
    }
}

/// `alice` and `bob`, each with a theme and no icon.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    store.add_user("alice");
    store.add_user("bob");
    store
}

pub struct MemoryTx {
    store: MemoryStore,
    pending: Vec<Op>,
}

impl MemoryTx {
    fn visible(&self) -> Tables {
        let mut tables = self.store.tables().clone();
        for op in &self.pending {
            tables.apply(op);
        }
        tables
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, AppError> {
        self.shared.begins.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTx {
            store: self.clone(),
            pending: Vec::new(),
        })
    }
}

#[async_trait]
impl ProfileTx for MemoryTx {
    async fn find_user_by_id(&mut self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        Ok(self.visible().users.into_iter().find(|u| u.id == user_id))
    }

    async fn find_user_by_name(&mut self, name: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self.visible().users.into_iter().find(|u| u.name == name))
    }

    async fn find_theme(&mut self, user_id: i64) -> Result<Option<ThemeModel>, AppError> {
        self.store.shared.theme_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.visible().themes.into_iter().find(|t| t.user_id == user_id))
    }

    async fn find_icon_image(&mut self, user_id: i64) -> Result<Option<Vec<u8>>, AppError> {
        self.store.shared.icon_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .visible()
            .icons
            .into_iter()
            .find(|i| i.user_id == user_id)
            .map(|i| i.image))
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, AppError> {
        if self.visible().users.iter().any(|u| u.name == user.name) {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                user.name
            )));
        }
        let id = self.store.next_id();
        self.pending.push(Op::InsertUser(UserModel {
            id,
            name: user.name.clone(),
            display_name: user.display_name.clone(),
            description: user.description.clone(),
            password_hash: user.password_hash.clone(),
        }));
        Ok(id)
    }

    async fn insert_theme(&mut self, user_id: i64, dark_mode: bool) -> Result<i64, AppError> {
        let id = self.store.next_id();
        self.pending.push(Op::InsertTheme(ThemeModel {
            id,
            user_id,
            dark_mode,
        }));
        Ok(id)
    }

    async fn delete_icons(&mut self, user_id: i64) -> Result<(), AppError> {
        self.pending.push(Op::DeleteIcons(user_id));
        Ok(())
    }

    async fn insert_icon(&mut self, user_id: i64, image: &[u8]) -> Result<i64, AppError> {
        let id = self.store.next_id();
        self.pending.push(Op::InsertIcon(IconRow {
            user_id,
            image: image.to_vec(),
        }));
        Ok(id)
    }

    async fn commit(self) -> Result<(), AppError> {
        if self.store.shared.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::Store(sqlx::Error::Protocol("commit rejected".into())));
        }
        let mut tables = self.store.tables();
        for op in &self.pending {
            tables.apply(op);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<i64>>,
}

impl RecordingInvalidator {
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().expect("calls poisoned").clone()
    }
}

impl OwnerCacheInvalidator for RecordingInvalidator {
    fn label(&self) -> &'static str {
        "recording"
    }

    fn invalidate_by_owner_id(&self, owner_id: i64) {
        self.calls.lock().expect("calls poisoned").push(owner_id);
    }
}

#[derive(Default)]
pub struct RecordingDns {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingDns {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls poisoned").clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DnsRegistrar for RecordingDns {
    async fn register_subdomain(&self, name: &str) -> anyhow::Result<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            anyhow::bail!("powerdns unavailable");
        }
        self.calls.lock().expect("calls poisoned").push(name.to_string());
        Ok(())
    }
}

pub struct Fixture {
    pub service: ProfileService<MemoryStore>,
    pub store: MemoryStore,
    pub streams: Arc<RecordingInvalidator>,
    pub comments: Arc<RecordingInvalidator>,
    pub owner_cache: Arc<OwnerIndexedCache<OwnerSnapshot>>,
    pub dns: Arc<RecordingDns>,
}

pub fn fixture() -> Fixture {
    let store = seeded_store();
    let streams = Arc::new(RecordingInvalidator::default());
    let comments = Arc::new(RecordingInvalidator::default());
    let owner_cache: Arc<OwnerIndexedCache<OwnerSnapshot>> =
        Arc::new(OwnerIndexedCache::new("owners"));
    let dns = Arc::new(RecordingDns::default());
    let siblings = InvalidationHub::new()
        .register(streams.clone())
        .register(comments.clone())
        .register(owner_cache.clone());
    let service = ProfileService::new(
        store.clone(),
        Arc::new(CacheStore::new()),
        Arc::new(FallbackIcon::from_bytes(FALLBACK)),
        siblings,
        dns.clone(),
    );
    Fixture {
        service,
        store,
        streams,
        comments,
        owner_cache,
        dns,
    }
}
