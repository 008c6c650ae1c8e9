use parcel_service::config::{Config, CorsConfig, DatabaseConfig, ServerConfig, StripeConfig};
use parcel_service::Application;
use secrecy::Secret;
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub db: mongodb::Database,
}

impl TestApp {
    pub async fn spawn() -> Self {
        // Unused unless a test actually reaches for the processor.
        Self::spawn_with_stripe("http://127.0.0.1:1").await
    }

    pub async fn spawn_with_stripe(stripe_base_url: &str) -> Self {
        let db_name = format!("parcel_test_{}", uuid::Uuid::new_v4());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name,
            },
            stripe: StripeConfig {
                secret_key: Secret::new("sk_test_secret".to_string()),
                api_base_url: stripe_base_url.to_string(),
                timeout_secs: 5,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            service_name: "parcel-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            client,
            db,
        }
    }

    /// Create a parcel for `email` and return its identifier.
    pub async fn create_parcel(&self, email: &str) -> String {
        let response = self
            .client
            .post(format!("{}/parcels", self.address))
            .json(&json!({
                "email": email,
                "parcelType": "document",
                "destination": "Dhaka",
                "weight": 1.5
            }))
            .send()
            .await
            .expect("Failed to create parcel");
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.expect("Invalid create response");
        body["insertedId"]
            .as_str()
            .expect("insertedId missing")
            .to_string()
    }

    pub async fn get_parcel(&self, id: &str) -> Value {
        let response = self
            .client
            .get(format!("{}/parcels/{}", self.address, id))
            .send()
            .await
            .expect("Failed to fetch parcel");
        assert_eq!(response.status(), 200);
        response.json().await.expect("Invalid parcel body")
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
