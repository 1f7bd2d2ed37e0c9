/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::auth::password::Argon2Hasher;
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let hasher = Argon2Hasher::new(config.hashing.into())?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(hasher), config);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use taskboard_shared::auth::{password::CredentialHasher, service::AuthService};
use taskboard_shared::store::Store;
use taskboard_shared::tasks::service::TaskService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, also used for health checks
    pub store: Arc<dyn Store>,

    pub auth: AuthService,

    pub tasks: TaskService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires both services to the same store
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>, config: Config) -> Self {
        Self {
            auth: AuthService::new(store.clone(), hasher),
            tasks: TaskService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api
/// ├── GET   /health
/// ├── POST  /register
/// ├── POST  /login
/// ├── POST  /recovery
/// └── /tasks
///     ├── POST  /
///     ├── PATCH /:id
///     ├── GET   /createdByUser/:username
///     ├── GET   /assignedToUser/:username
///     ├── GET   /priority/:username
///     ├── PATCH /priority/:idTarea
///     ├── PATCH /note/:id
///     └── PATCH /status/:id
/// ```
///
/// Anything else, including a wrong method on a listed path, answers 404
/// with the standard envelope.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", endpoint(post(routes::auth::register)))
        .route("/login", endpoint(post(routes::auth::login)))
        .route("/recovery", endpoint(post(routes::auth::recovery)));

    // GET and PATCH on /priority/:x take a username and a task id respectively
    let task_routes = Router::new()
        .route("/", endpoint(post(routes::tasks::create_task)))
        .route("/:id", endpoint(patch(routes::tasks::update_task)))
        .route(
            "/createdByUser/:username",
            endpoint(get(routes::tasks::created_by_user)),
        )
        .route(
            "/assignedToUser/:username",
            endpoint(get(routes::tasks::assigned_to_user)),
        )
        .route(
            "/priority/:target",
            endpoint(get(routes::tasks::priority_tasks).patch(routes::tasks::toggle_priority)),
        )
        .route("/note/:id", endpoint(patch(routes::tasks::update_note)))
        .route("/status/:id", endpoint(patch(routes::tasks::update_status)));

    let api_routes = Router::new()
        .route("/health", endpoint(get(routes::health::health_check)))
        .merge(auth_routes)
        .nest("/tasks", task_routes);

    Router::new()
        .nest("/api", api_routes)
        .fallback(routes::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// An unsupported method on a known path answers like an unknown route
fn endpoint(method_router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    method_router.fallback(routes::not_found)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
