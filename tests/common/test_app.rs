use booking::{AppState, Config, DbPool, build_router, database, load_config};
use reqwest::{Client, redirect::Policy};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

/// HTTP test application wrapper
///
/// Manages an Axum server running on a random port for HTTP testing.
/// Each test gets its own server instance to allow parallel test execution.
pub struct TestApp {
    /// Server base URL (e.g., "http://127.0.0.1:54321")
    pub address: String,
    /// HTTP client for making requests
    pub client: Client,
    /// Application config
    pub config: Config,
    /// Pool shared with the server
    pub pool: DbPool,
}

impl TestApp {
    /// Starts the full router over a lazy pool that never connects up front.
    ///
    /// Suitable for routes that do not reach the database (health, token rejection).
    pub async fn new() -> Self {
        let config = load_config().expect("Failed to load config");
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(1))
            .connect_lazy(config.database.connection_string().expose_secret())
            .expect("Failed to build lazy pool");

        Self::spawn(config, pool).await
    }

    /// Starts the router over a migrated database.
    ///
    /// Returns `None` when PostgreSQL is unreachable so database-backed
    /// tests can skip instead of failing on machines without a database.
    pub async fn with_database() -> Option<Self> {
        Self::with_database_config(|_| {}).await
    }

    /// Like [`TestApp::with_database`], adjusting the loaded config first
    pub async fn with_database_config(configure: impl FnOnce(&mut Config)) -> Option<Self> {
        let mut config = load_config().expect("Failed to load config");
        configure(&mut config);

        let pool = match database::connect(&config.database).await {
            Ok(pool) => pool,
            Err(e) => {
                eprintln!("skipping: database unavailable ({e})");
                return None;
            }
        };
        database::migrate(&pool).await.expect("Failed to run migrations");

        Some(Self::spawn(config, pool).await)
    }

    async fn spawn(config: Config, pool: DbPool) -> Self {
        let app = build_router(AppState::new(pool.clone(), config.clone()));

        // Bind to random port (port 0 tells OS to assign available port)
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{port}");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            address,
            client,
            config,
            pool,
        }
    }

    /// Get the full URL for an API endpoint
    ///
    /// # Example
    /// ```rust
    /// let url = app.url("/api/v1/health");
    /// // Returns: "http://127.0.0.1:54321/api/v1/health"
    /// ```
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
