use std::sync::{Arc, Weak};
use std::time::Duration;

use lectern_authz::{Gate, Resolver, Selector};
use lectern_config::rate_limit::LoginRateLimiter;
use lectern_config::{AuthzConfig, CorsConfig, JwtConfig, RateLimitConfig};
use lectern_core::{AliasConflict, PermissionCatalog};
use lectern_db::{
    CredentialStore, DirectoryStore, IdentityStore, PgStore, RoleStore, init_db_pool,
    run_migrations,
};
use tokio::task::JoinHandle;
use tracing::debug;

/// How often idle login buckets are evicted.
pub const LOGIN_LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Settings read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub authz: AuthzConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig::from_env(),
            cors: CorsConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            authz: AuthzConfig::from_env(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub role_store: Arc<dyn RoleStore>,
    pub directory_store: Arc<dyn DirectoryStore>,
    pub gate: Gate,
    pub selector: Selector,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wires every component to one store implementation.
    ///
    /// Fails when the permission alias table is inconsistent.
    pub fn new<S>(store: Arc<S>, config: AppConfig) -> Result<Self, AliasConflict>
    where
        S: IdentityStore + CredentialStore + RoleStore + DirectoryStore + 'static,
    {
        let catalog = Arc::new(PermissionCatalog::standard()?);
        let identity: Arc<dyn IdentityStore> = store.clone();
        let credentials: Arc<dyn CredentialStore> = store.clone();

        let resolver = Resolver::new(identity, &config.authz);
        let gate = Gate::new(catalog, resolver);
        let selector = Selector::new(credentials, config.jwt.clone(), &config.authz);

        Ok(Self {
            role_store: store.clone(),
            directory_store: store,
            gate,
            selector,
            login_limiter: Arc::new(config.rate_limit.login_limiter()),
            jwt_config: config.jwt,
            cors_config: config.cors,
            rate_limit_config: config.rate_limit,
        })
    }
}

/// Evicts login buckets that have fully refilled, once per `period`.
///
/// Every distinct submitted identifier gets a bucket, so without this the
/// limiter grows with each email ever tried. The task ends once the limiter
/// is dropped.
pub fn spawn_login_limiter_pruning(
    limiter: &Arc<LoginRateLimiter>,
    period: Duration,
) -> JoinHandle<()> {
    let limiter: Weak<LoginRateLimiter> = Arc::downgrade(limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(before, after = limiter.len(), "Pruned login rate limiter");
        }
    })
}

/// Connects to Postgres and builds the state from environment settings.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let pool = init_db_pool().await?;
    run_migrations(&pool).await?;
    let state = AppState::new(Arc::new(PgStore::new(pool)), AppConfig::from_env())?;
    spawn_login_limiter_pruning(&state.login_limiter, LOGIN_LIMITER_PRUNE_INTERVAL);
    Ok(state)
}
