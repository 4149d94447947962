use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use crate::models::{AccessLogEntry, Booking, Employee, Establishment, Invoice, User};

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(uri = %uri, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB at {}: {}", uri, e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for backoffice-service");

        // Establishment-scoped collections get a leading establishment_id
        // index so injected filters stay cheap.
        for (name, keys) in [
            ("bookings", doc! { "establishment_id": 1, "status": 1 }),
            ("invoices", doc! { "establishment_id": 1, "status": 1 }),
            ("employees", doc! { "establishment_id": 1 }),
            ("users", doc! { "establishment_id": 1 }),
        ] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_establishment_lookup", name))
                        .build(),
                )
                .build();

            self.db
                .collection::<mongodb::bson::Document>(name)
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create establishment index on {}: {}", name, e);
                    AppError::from(e)
                })?;
        }

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("email_lookup".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.users()
            .create_index(email_index, None)
            .await
            .map_err(AppError::from)?;

        // Audit queries are time-windowed per user / per resource.
        for keys in [
            doc! { "user_id": 1, "timestamp": -1 },
            doc! { "resource_type": 1, "resource_id": 1, "timestamp": -1 },
            doc! { "allowed": 1, "timestamp": -1 },
        ] {
            let index = IndexModel::builder().keys(keys).build();
            self.access_logs()
                .create_index(index, None)
                .await
                .map_err(AppError::from)?;
        }

        tracing::info!("MongoDB indexes created");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn establishments(&self) -> Collection<Establishment> {
        self.db.collection("establishments")
    }

    pub fn bookings(&self) -> Collection<Booking> {
        self.db.collection("bookings")
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    pub fn employees(&self) -> Collection<Employee> {
        self.db.collection("employees")
    }

    pub fn access_logs(&self) -> Collection<AccessLogEntry> {
        self.db.collection("access_logs")
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
