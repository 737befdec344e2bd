use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::State,
    extract::connect_info::ConnectInfo,
    http::Method,
    http::Request,
    http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
};
use clap::Parser;
use dotenvy::dotenv;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use nm_common::Profile;
use nm_common::ai::{CompatibilityScorer, DisabledScorer, LlmRuntimeConfig, scorer_from_config};
use nm_common::db::{PgProfileStore, create_pool_from_url_checked, run_migrations};
use nm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use nm_common::matching::{MatchOrchestrator, MatchingConfig};
use nm_common::service::MatchService;
use nm_common::store::{InMemoryProfileStore, ProfileStore};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod auth;
pub mod error;
pub mod handlers;

use auth::{AuthConfig, AuthMode, JwtAlgorithm, JwtKeyKind, USER_ID_HEADER};
use error::ApiError;
use handlers::{health, matches};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);
const METRICS_PORT_ENV: &str = "NM_METRICS_PORT";
const DEFAULT_METRICS_PORT: u16 = 9100;

#[derive(Debug, Clone, Parser)]
#[command(name = "nm-api", about = "HTTP API serving profile matches and match details")]
struct Cli {
    /// PostgreSQL connection string for the profile store
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JSON file of profiles served from memory when no database is configured
    #[arg(long, env = "NM_PROFILES_FILE")]
    profiles_file: Option<PathBuf>,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// API key for X-API-Key authentication
    #[arg(long, env = "NM_API_KEY")]
    api_key: Option<String>,

    /// Authentication mode: api_key | jwt
    #[arg(long, env = "AUTH_MODE", default_value = "api_key", value_enum)]
    auth_mode: AuthMode,

    /// JWT secret for AUTH_MODE=jwt
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Public key (PEM) for AUTH_MODE=jwt when using an asymmetric algorithm
    #[arg(long, env = "JWT_PUBLIC_KEY")]
    jwt_public_key: Option<String>,

    /// JWT algorithm
    #[arg(long, env = "JWT_ALGORITHM", default_value = "hs512", value_enum)]
    jwt_algorithm: JwtAlgorithm,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "NM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,
}

/// Where profiles come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    Postgres(String),
    JsonFile(PathBuf),
    Empty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile_source: ProfileSource,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
    ai: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub global_per_sec: u64,
    pub global_burst: u32,
    pub ai_per_sec: u64,
    pub ai_burst: u32,
}

impl RateLimitConfig {
    fn parse_env_u64(vars: &[&str]) -> Option<u64> {
        vars.iter()
            .find_map(|name| env::var(name).ok())
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
    }

    fn parse_env_u32(vars: &[&str]) -> Option<u32> {
        vars.iter()
            .find_map(|name| env::var(name).ok())
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    fn from_env() -> Self {
        Self {
            global_per_sec: Self::parse_env_u64(&["NM_RATE_LIMIT_GLOBAL_PER_SEC"]).unwrap_or(20),
            global_burst: Self::parse_env_u32(&["NM_RATE_LIMIT_GLOBAL_BURST"]).unwrap_or(40),
            ai_per_sec: Self::parse_env_u64(&["NM_RATE_LIMIT_AI_PER_SEC"]).unwrap_or(2),
            ai_burst: Self::parse_env_u32(&["NM_RATE_LIMIT_AI_BURST"]).unwrap_or(5),
        }
    }
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "NM_CORS_ORIGINS must list explicit origins when credentials are enabled".into(),
            ));
        }

        let auth = AuthConfig {
            mode: cli.auth_mode,
            api_key: cli.api_key,
            jwt_secret: cli.jwt_secret,
            jwt_public_key: cli.jwt_public_key,
            jwt_algorithm: cli.jwt_algorithm,
        };

        match auth.mode {
            AuthMode::ApiKey if auth.api_key.is_none() => {
                return Err(ApiError::BadRequest(
                    "NM_API_KEY is required when AUTH_MODE=api_key".into(),
                ));
            }
            AuthMode::Jwt => match auth.jwt_algorithm.key_kind() {
                JwtKeyKind::Secret if auth.jwt_secret.is_none() => {
                    return Err(ApiError::BadRequest(
                        "JWT_SECRET is required when AUTH_MODE=jwt with symmetric algorithms"
                            .into(),
                    ));
                }
                JwtKeyKind::Secret => {}
                _ if auth.jwt_public_key.is_none() => {
                    return Err(ApiError::BadRequest(
                        "JWT_PUBLIC_KEY is required when AUTH_MODE=jwt with asymmetric algorithms"
                            .into(),
                    ));
                }
                _ => {}
            },
            _ => {}
        }

        let profile_source = match (cli.database_url, cli.profiles_file) {
            (Some(url), _) => ProfileSource::Postgres(url),
            (None, Some(path)) => ProfileSource::JsonFile(path),
            (None, None) => ProfileSource::Empty,
        };

        Ok(Self {
            profile_source,
            port: cli.port,
            cors_origins,
            auth,
        })
    }

    pub fn for_tests(auth: AuthConfig) -> Self {
        Self {
            profile_source: ProfileSource::Empty,
            port: 3001,
            cors_origins: vec!["http://localhost:3000".into()],
            auth,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchService>,
    pub config: AppConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<std::sync::atomic::AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl axum::extract::FromRef<SharedState> for AuthConfig {
    fn from_ref(input: &SharedState) -> AuthConfig {
        input.config.auth.clone()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
}

fn build_ip_limiter(per_second: u64, burst_size: u32) -> Arc<IpRateLimiter> {
    let nanos_per_token = 1_000_000_000u64 / per_second.max(1);
    let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(Duration::from_nanos(nanos_per_token.max(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

pub fn default_rate_limits() -> RateLimits {
    let cfg = RateLimitConfig::from_env();
    RateLimits {
        global: build_ip_limiter(cfg.global_per_sec, cfg.global_burst),
        ai: build_ip_limiter(cfg.ai_per_sec, cfg.ai_burst),
    }
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn ai_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.ai, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route("/matches", get(matches::list_matches))
        .route(
            "/match-details/:target_id",
            get(matches::match_details).route_layer(middleware::from_fn_with_state(
                state.clone(),
                ai_rate_limit,
            )),
        );

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

fn api_key_auth(api_key: &str) -> AuthConfig {
    AuthConfig {
        mode: AuthMode::ApiKey,
        api_key: Some(api_key.to_string()),
        jwt_secret: None,
        jwt_public_key: None,
        jwt_algorithm: JwtAlgorithm::Hs256,
    }
}

/// State backed by an in-memory store and the given scorer, with API-key auth.
pub fn test_state_with(
    api_key: &str,
    profiles: Vec<Profile>,
    scorer: Arc<dyn CompatibilityScorer>,
) -> SharedState {
    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::from_profiles(profiles));
    let orchestrator = MatchOrchestrator::new(scorer, MatchingConfig::default());

    Arc::new(AppState {
        service: Arc::new(MatchService::new(store, orchestrator)),
        config: AppConfig::for_tests(api_key_auth(api_key)),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(std::sync::atomic::AtomicBool::new(true)),
    })
}

pub fn test_state(api_key: &str) -> SharedState {
    test_state_with(api_key, Vec::new(), Arc::new(DisabledScorer))
}

async fn build_store(source: &ProfileSource) -> Result<Arc<dyn ProfileStore>, ApiError> {
    match source {
        ProfileSource::Postgres(url) => {
            let pool = create_pool_from_url_checked(url)
                .await
                .map_err(|err| ApiError::Store(format!("failed to create pool: {err}")))?;
            run_migrations(&pool)
                .await
                .map_err(|err| ApiError::Store(format!("failed to run migrations: {err}")))?;
            info!("profile store: postgres");
            Ok(Arc::new(PgProfileStore::new(pool)))
        }
        ProfileSource::JsonFile(path) => {
            let store = InMemoryProfileStore::from_json_file(path)
                .await
                .map_err(|err| ApiError::Store(err.to_string()))?;
            info!(path = %path.display(), profiles = store.len().await, "profile store: json file");
            Ok(Arc::new(store))
        }
        ProfileSource::Empty => {
            tracing::warn!("no DATABASE_URL or NM_PROFILES_FILE; serving an empty profile store");
            Ok(Arc::new(InMemoryProfileStore::new()))
        }
    }
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));
    nm_metrics::init_metrics(METRICS_PORT_ENV, DEFAULT_METRICS_PORT);

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;

    let matching = MatchingConfig::from_env();
    matching
        .validate()
        .map_err(|err| ApiError::BadRequest(format!("invalid matching config: {err}")))?;

    let store = build_store(&config.profile_source).await?;
    let scorer = scorer_from_config(&LlmRuntimeConfig::from_env());
    let service = MatchService::new(store, MatchOrchestrator::new(scorer, matching));

    let state = Arc::new(AppState {
        service: Arc::new(service),
        config: config.clone(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(std::sync::atomic::AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(
        %addr,
        auth_mode = ?config.auth.mode,
        run_id = nm_common::run_id::get(),
        "nm-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state
        .readiness
        .store(false, std::sync::atomic::Ordering::SeqCst);

    // Load balancers need a moment to see /readyz fail before new connections stop.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{Request, StatusCode},
        routing::get,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn with_envs(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(var, value)| {
                let old = env::var(var).ok();
                match value {
                    Some(v) => unsafe { env::set_var(var, v) },
                    None => unsafe { env::remove_var(var) },
                }
                (*var, old)
            })
            .collect();

        f();

        for (var, previous_value) in previous {
            match previous_value {
                Some(v) => unsafe { env::set_var(var, v) },
                None => unsafe { env::remove_var(var) },
            }
        }
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["nm-api"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn sets_request_id_when_missing() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(SetRequestIdLayer::new(
                HeaderName::from_static("x-request-id"),
                MakeRequestUuid::default(),
            ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_envs(
            &[
                ("NM_RATE_LIMIT_GLOBAL_PER_SEC", Some("10")),
                ("NM_RATE_LIMIT_GLOBAL_BURST", Some("25")),
                ("NM_RATE_LIMIT_AI_PER_SEC", Some("1")),
                ("NM_RATE_LIMIT_AI_BURST", Some("0")),
            ],
            || {
                let cfg = RateLimitConfig::from_env();
                assert_eq!(
                    cfg,
                    RateLimitConfig {
                        global_per_sec: 10,
                        global_burst: 25,
                        ai_per_sec: 1,
                        ai_burst: 5,
                    }
                );
            },
        );
    }

    #[test]
    fn ai_limiter_rejects_after_burst() {
        let limiter = build_ip_limiter(1, 2);
        let ip = Some(IpAddr::from([10, 0, 0, 1]));

        assert!(enforce_rate_limit(&limiter, ip).is_ok());
        assert!(enforce_rate_limit(&limiter, ip).is_ok());
        assert!(matches!(
            enforce_rate_limit(&limiter, ip),
            Err(ApiError::TooManyRequests(_))
        ));
        assert!(enforce_rate_limit(&limiter, None).is_ok());
    }

    #[test]
    fn config_prefers_database_over_profiles_file() {
        let config = AppConfig::from_cli(cli(&[
            "--api-key",
            "k",
            "--database-url",
            "postgres://localhost/nm",
            "--profiles-file",
            "profiles.json",
        ]))
        .unwrap();
        assert_eq!(
            config.profile_source,
            ProfileSource::Postgres("postgres://localhost/nm".into())
        );

        let config =
            AppConfig::from_cli(cli(&["--api-key", "k", "--profiles-file", "profiles.json"]))
                .unwrap();
        assert_eq!(
            config.profile_source,
            ProfileSource::JsonFile(PathBuf::from("profiles.json"))
        );
    }

    #[test]
    fn config_rejects_missing_credentials_and_wildcard_cors() {
        with_envs(
            &[
                ("NM_API_KEY", None),
                ("JWT_SECRET", None),
                ("JWT_PUBLIC_KEY", None),
                ("NM_CORS_ORIGINS", None),
            ],
            || {
                assert!(AppConfig::from_cli(cli(&[])).is_err());
                assert!(AppConfig::from_cli(cli(&["--auth-mode", "jwt"])).is_err());
                assert!(
                    AppConfig::from_cli(cli(&[
                        "--auth-mode",
                        "jwt",
                        "--jwt-algorithm",
                        "rs256",
                        "--jwt-secret",
                        "s"
                    ]))
                    .is_err()
                );
                assert!(AppConfig::from_cli(cli(&["--api-key", "k", "--cors-origins", "*"])).is_err());
                assert!(
                    AppConfig::from_cli(cli(&["--auth-mode", "jwt", "--jwt-secret", "s"])).is_ok()
                );
            },
        );
    }
}
