use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use super::{
    stats::{self, SystemStats},
    InvoiceStore, ServiceError, Store, UserStore,
};
use crate::{
    dtos::admin::{
        invoice_with_owner, AdminInvoicesResponse, RoleSummary, ToggleAdminResponse,
        UserDetailResponse, UsersListResponse,
    },
    models::{InvoiceSort, ListInvoicesFilter, OwnerSummary, User},
};

/// Cross-user operations. Callers must already be verified as admins.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn find_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(ServiceError::user_not_found)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<UsersListResponse, ServiceError> {
        let mut users = self.store.list_users().await?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(UsersListResponse {
            total_users: users.len() as u64,
            users: users.into_iter().map(Into::into).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn user_detail(&self, user_id: &str) -> Result<UserDetailResponse, ServiceError> {
        let user = self.find_user(user_id).await?;
        let invoices = self
            .store
            .find_invoices(&ListInvoicesFilter::for_owner(user_id))
            .await?;

        Ok(UserDetailResponse {
            user: user.into(),
            invoice_count: invoices.len() as u64,
            total_revenue: stats::total_revenue(&invoices),
        })
    }

    /// Flip the admin flag; each call inverts the previous state.
    #[instrument(skip(self))]
    pub async fn toggle_admin(&self, user_id: &str) -> Result<ToggleAdminResponse, ServiceError> {
        let mut user = self.find_user(user_id).await?;
        user.is_admin = !user.is_admin;
        user.updated_at = Utc::now();

        if !self.store.replace_user(&user).await? {
            return Err(ServiceError::user_not_found());
        }
        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "Admin role toggled");

        let verb = if user.is_admin {
            "promoted to"
        } else {
            "demoted from"
        };
        Ok(ToggleAdminResponse {
            message: format!("User {} admin", verb),
            user: RoleSummary {
                id: user.id,
                name: user.name,
                email: user.email,
                is_admin: user.is_admin,
            },
        })
    }

    /// Delete the user's invoices, then the user.
    ///
    /// The two steps are not atomic: if the second fails the invoices are
    /// already gone and the error is reported as unexpected.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<(), ServiceError> {
        let user = self.find_user(user_id).await?;

        let removed = self.store.delete_invoices_by_owner(&user.id).await?;
        tracing::info!(user_id = %user.id, invoices = removed, "Deleted user invoices");

        match self.store.delete_user(&user.id).await {
            Ok(true) => {
                tracing::info!(user_id = %user.id, "User deleted");
                Ok(())
            }
            Ok(false) => Err(ServiceError::user_not_found()),
            Err(e) => {
                tracing::warn!(
                    user_id = %user.id,
                    invoices = removed,
                    error = %e,
                    "User invoices were deleted but deleting the user failed"
                );
                Err(ServiceError::Internal(anyhow::anyhow!(
                    "Failed to delete user after removing invoices: {}",
                    e
                )))
            }
        }
    }

    /// Every invoice in the system with its owner's summary attached.
    #[instrument(skip(self, filter))]
    pub async fn list_all_invoices(
        &self,
        filter: ListInvoicesFilter,
        sort: InvoiceSort,
    ) -> Result<AdminInvoicesResponse, ServiceError> {
        let mut invoices = self.store.find_invoices(&filter).await?;
        sort.apply(&mut invoices);

        let mut owner_ids: Vec<String> = invoices.iter().map(|i| i.owner_id.clone()).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: HashMap<String, OwnerSummary> = self
            .store
            .find_users(&owner_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), OwnerSummary::from(u)))
            .collect();

        let invoices = invoices
            .iter()
            .map(|i| invoice_with_owner(i, owners.get(&i.owner_id).cloned()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AdminInvoicesResponse {
            total_invoices: invoices.len() as u64,
            invoices,
        })
    }

    #[instrument(skip(self))]
    pub async fn system_stats(&self) -> Result<SystemStats, ServiceError> {
        let users = self.store.list_users().await?;
        let invoices = self
            .store
            .find_invoices(&ListInvoicesFilter::default())
            .await?;
        Ok(SystemStats::compute(&users, &invoices))
    }
}
