use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::{InvoiceStore, ServiceError, Store, UserStore};
use crate::models::{Invoice, ListInvoicesFilter, User};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for invoice-service");

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();
        self.users()
            .create_index(email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on users collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on users.email");

        let invoices = self.invoices();

        let number_index = IndexModel::builder()
            .keys(doc! { "invoiceNumber": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("invoice_number_unique".to_string())
                    .build(),
            )
            .build();
        invoices.create_index(number_index, None).await.map_err(|e| {
            tracing::error!(
                "Failed to create invoiceNumber index on invoices collection: {}",
                e
            );
            AppError::from(e)
        })?;
        tracing::info!("Created unique index on invoices.invoiceNumber");

        // Owner listings sorted newest first
        let owner_index = IndexModel::builder()
            .keys(doc! { "user": 1, "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("owner_created_lookup".to_string())
                    .build(),
            )
            .build();
        invoices.create_index(owner_index, None).await.map_err(|e| {
            tracing::error!("Failed to create owner index on invoices collection: {}", e);
            AppError::from(e)
        })?;
        tracing::info!("Created index on invoices.(user, createdAt)");

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("status_lookup".to_string())
                    .build(),
            )
            .build();
        invoices.create_index(status_index, None).await.map_err(|e| {
            tracing::error!("Failed to create status index on invoices collection: {}", e);
            AppError::from(e)
        })?;
        tracing::info!("Created index on invoices.status");

        Ok(())
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Escape regex metacharacters so search text matches literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn invoice_query(filter: &ListInvoicesFilter) -> Document {
    let mut query = Document::new();
    if let Some(owner_id) = &filter.owner_id {
        query.insert("user", owner_id.as_str());
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = escape_regex(search);
        let clauses: Vec<Bson> = ["invoiceNumber", "clientName", "clientEmail"]
            .into_iter()
            .map(|field| {
                let mut clause = Document::new();
                clause.insert(field, doc! { "$regex": pattern.clone(), "$options": "i" });
                Bson::Document(clause)
            })
            .collect();
        query.insert("$or", clauses);
    }
    query
}

#[async_trait]
impl InvoiceStore for MongoDb {
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), ServiceError> {
        match self.invoices().insert_one(invoice, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(ServiceError::Conflict(format!(
                "Invoice number {} already exists",
                invoice.invoice_number
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_invoice(&self, id: &str) -> Result<Option<Invoice>, ServiceError> {
        Ok(self.invoices().find_one(doc! { "_id": id }, None).await?)
    }

    async fn replace_invoice(&self, invoice: &Invoice) -> Result<bool, ServiceError> {
        let result = self
            .invoices()
            .replace_one(doc! { "_id": invoice.id.as_str() }, invoice, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_invoice(&self, id: &str) -> Result<bool, ServiceError> {
        let result = self.invoices().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, ServiceError> {
        let cursor = self.invoices().find(invoice_query(filter), None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_invoices(&self, filter: &ListInvoicesFilter) -> Result<u64, ServiceError> {
        Ok(self
            .invoices()
            .count_documents(invoice_query(filter), None)
            .await?)
    }

    async fn delete_invoices_by_owner(&self, owner_id: &str) -> Result<u64, ServiceError> {
        let result = self
            .invoices()
            .delete_many(doc! { "user": owner_id }, None)
            .await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl UserStore for MongoDb {
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        match self.users().insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(ServiceError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn replace_user(&self, user: &User) -> Result<bool, ServiceError> {
        let result = self
            .users()
            .replace_one(doc! { "_id": user.id.as_str() }, user, None)
            .await;
        match result {
            Ok(r) => Ok(r.matched_count > 0),
            Err(e) if is_duplicate_key(&e) => {
                Err(ServiceError::Conflict("Email already in use".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<bool, ServiceError> {
        let result = self.users().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let cursor = self.users().find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_users(&self, ids: &[String]) -> Result<Vec<User>, ServiceError> {
        let cursor = self
            .users()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl Store for MongoDb {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                ServiceError::from(e)
            })?;
        Ok(())
    }
}
