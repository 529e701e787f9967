//! PostgreSQL units of work
//!
//! A [`PgUnitOfWork`] wraps one `sqlx` transaction. Repositories borrow its
//! connection for every statement, so all reads and writes of a service
//! operation share the transaction and the row locks taken by
//! `SELECT ... FOR UPDATE`.
//!
//! Dropping an uncommitted unit of work rolls the transaction back.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::debug;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, OperationMetadata, PortError,
};
use domain_claims::ports::{TransactionManager, UnitOfWork};

use crate::error::port_error;
use crate::pool::DatabasePool;

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    metadata: OperationMetadata,
}

impl PgUnitOfWork {
    /// Connection bound to the open transaction
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    async fn commit(self) -> Result<(), PortError> {
        debug!(correlation_id = ?self.metadata.correlation_id, "committing transaction");
        self.tx.commit().await.map_err(port_error)
    }

    async fn rollback(self) -> Result<(), PortError> {
        debug!(correlation_id = ?self.metadata.correlation_id, "rolling back transaction");
        self.tx.rollback().await.map_err(port_error)
    }
}

/// Opens PostgreSQL transactions from a shared pool
#[derive(Debug, Clone)]
pub struct PgTransactionManager {
    pool: DatabasePool,
}

impl PgTransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

impl DomainPort for PgTransactionManager {}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    type Tx = PgUnitOfWork;

    async fn begin(&self, metadata: OperationMetadata) -> Result<PgUnitOfWork, PortError> {
        let tx = self.pool.begin().await.map_err(port_error)?;
        debug!(correlation_id = ?metadata.correlation_id, "transaction opened");
        Ok(PgUnitOfWork { tx, metadata })
    }
}

#[async_trait]
impl HealthCheckable for PgTransactionManager {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let outcome = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let (status, message) = match outcome {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(error) => (AdapterHealth::Unhealthy, Some(error.to_string())),
        };

        HealthCheckResult {
            adapter_id: "postgres".to_string(),
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}
