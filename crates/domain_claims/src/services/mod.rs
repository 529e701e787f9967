//! Claim services
//!
//! Four collaborating services, leaves first:
//!
//! - [`ClaimHistoryRecorder`] appends audit entries
//! - [`ClaimAttachmentManager`] classifies and stores evidence
//! - [`ClaimItemManager`] owns line items and the aggregate cost
//! - [`ClaimWorkflowEngine`] owns the claim and its status machine
//!
//! None of them opens a transaction; each operation takes the caller's unit
//! of work.

mod attachment_manager;
mod history_recorder;
mod item_manager;
pub mod workflow;

use std::sync::Arc;

pub use attachment_manager::ClaimAttachmentManager;
pub use history_recorder::ClaimHistoryRecorder;
pub use item_manager::ClaimItemManager;
pub use workflow::{review_outcome, ClaimWorkflowEngine, CreateClaim};

use crate::config::ClaimPolicy;
use crate::ports::{ClaimRepositories, ObjectStore, UnitOfWork};

/// All claim services wired over one set of repositories
pub struct ClaimServices<Tx: UnitOfWork> {
    pub workflow: ClaimWorkflowEngine<Tx>,
    pub items: ClaimItemManager<Tx>,
    pub attachments: ClaimAttachmentManager<Tx>,
    pub history: ClaimHistoryRecorder<Tx>,
}

impl<Tx: UnitOfWork> Clone for ClaimServices<Tx> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            items: self.items.clone(),
            attachments: self.attachments.clone(),
            history: self.history.clone(),
        }
    }
}

impl<Tx: UnitOfWork> ClaimServices<Tx> {
    pub fn new(repos: ClaimRepositories<Tx>, store: Arc<dyn ObjectStore>, policy: ClaimPolicy) -> Self {
        let history = ClaimHistoryRecorder::new(Arc::clone(&repos.history));
        let items = ClaimItemManager::new(Arc::clone(&repos.claims), Arc::clone(&repos.items));
        let attachments = ClaimAttachmentManager::new(
            Arc::clone(&repos.claims),
            Arc::clone(&repos.attachments),
            store,
            policy.clone(),
        );
        let workflow = ClaimWorkflowEngine::new(repos, history.clone(), policy);

        Self {
            workflow,
            items,
            attachments,
            history,
        }
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use core_kernel::{CustomerId, OperationMetadata, PartCategoryId, PartId, UserId, VehicleId};
    use crate::claim::ClaimStatus;
    use crate::item::{CreateClaimItem, ItemType};
    use crate::mock::MemoryBackend;

    use super::*;

    #[derive(Debug, Clone)]
    enum Decision {
        Approve,
        Reject,
        Skip,
    }

    fn decision() -> impl Strategy<Value = Decision> {
        prop_oneof![Just(Decision::Approve), Just(Decision::Reject), Just(Decision::Skip)]
    }

    proptest! {
        #[test]
        fn total_equals_sum_of_approved(
            plan in prop::collection::vec((0i64..5_000_000, prop::collection::vec(decision(), 0..4)), 1..6)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let backend = MemoryBackend::new();
                let services = backend.services(ClaimPolicy::default());
                let mut tx = backend.begin(OperationMetadata::default()).await;
                let cmd = CreateClaim {
                    vehicle_id: VehicleId::new(),
                    customer_id: CustomerId::new(),
                    description: "Drive unit vibration".to_string(),
                };
                let claim = services.workflow.create(&mut tx, cmd, UserId::new()).await.unwrap();

                let mut items = Vec::new();
                for (cost, _) in &plan {
                    let cmd = CreateClaimItem {
                        part_category_id: PartCategoryId::new(),
                        faulty_part_id: PartId::new(),
                        replacement_part_id: None,
                        issue_description: "Part fault".to_string(),
                        item_type: ItemType::Repair,
                        cost: Decimal::from(*cost),
                    };
                    items.push(services.items.create(&mut tx, claim.id, cmd).await.unwrap());
                }
                if let Some(stored) = tx.state_mut().claims.get_mut(&claim.id) {
                    stored.status = ClaimStatus::Reviewing;
                }

                for (item, (_, decisions)) in items.iter().zip(&plan) {
                    for decision in decisions {
                        match decision {
                            Decision::Approve => {
                                services.items.approve(&mut tx, claim.id, item.id).await.unwrap();
                            }
                            Decision::Reject => {
                                services.items.reject(&mut tx, claim.id, item.id).await.unwrap();
                            }
                            Decision::Skip => {}
                        }

                        let state = tx.state();
                        let expected: Decimal = state
                            .items
                            .values()
                            .filter(|i| i.claim_id == claim.id && i.is_approved())
                            .map(|i| i.cost.amount())
                            .sum();
                        assert_eq!(state.claims[&claim.id].total_cost.amount(), expected);
                    }
                }
            });
        }
    }
}
