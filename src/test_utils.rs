#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;

    use axum::Router;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use moka::future::Cache;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::auth::issue_session;
    use crate::config::AppConfig;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::subscribers::SubscriberRegistry;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Configuration used by the test app
    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            login_url: "/accounts/login/".to_string(),
            // Points at nothing on purpose; subscriber tests bring their own
            subscribers_file: "does-not-exist.yaml".into(),
        }
    }

    /// Create AppState for testing with a custom subscriber registry
    pub async fn setup_test_app_state_with(subscribers: SubscriberRegistry) -> AppState {
        let db = setup_test_db().await;

        AppState {
            db,
            config: test_config(),
            sessions: Cache::new(100),
            notices: Cache::new(100),
            subscribers: Arc::new(subscribers),
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        setup_test_app_state_with(SubscriberRegistry::default()).await
    }

    /// Insert a user record
    pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    /// Issue a session for a user, as a login flow would
    pub async fn login(state: &AppState, user: &user::Model) -> String {
        issue_session(&state.sessions, user.id).await
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment
    /// variable, defaulting to WARN if not set.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr) // Output to stderr, which is captured by tests
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing, returning the state alongside so
    /// tests can issue sessions and inspect stores directly
    pub async fn setup_test_app() -> (Router, AppState) {
        // Initialize tracing for tests
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        let router = create_router(state.clone());
        (router, state)
    }
}
