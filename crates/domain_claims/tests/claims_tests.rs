//! Tests for the warranty claims domain model

use rust_decimal_macros::dec;

use core_kernel::{ClaimId, Currency, CustomerId, PartCategoryId, PartId, VehicleId};

use domain_claims::attachment::{sniff, AttachmentType};
use domain_claims::claim::{Claim, ClaimStatus};
use domain_claims::error::{ClaimError, ErrorKind};
use domain_claims::item::{ClaimItem, CreateClaimItem, ItemStatus, ItemType};
use domain_claims::query::ClaimFilter;
use domain_claims::services::review_outcome;

fn item_with(status: ItemStatus) -> ClaimItem {
    let cmd = CreateClaimItem {
        part_category_id: PartCategoryId::new(),
        faulty_part_id: PartId::new(),
        replacement_part_id: None,
        issue_description: "Coolant leak at battery tray".to_string(),
        item_type: ItemType::Repair,
        cost: dec!(250000),
    };
    let mut item = ClaimItem::new(ClaimId::new(), cmd, Currency::VND).unwrap();
    item.decide(status);
    item
}

// ============================================================================
// Status Machine Tests
// ============================================================================

mod status_tests {
    use super::*;

    const TABLE: &[(ClaimStatus, ClaimStatus)] = &[
        (ClaimStatus::Draft, ClaimStatus::Submitted),
        (ClaimStatus::Submitted, ClaimStatus::Reviewing),
        (ClaimStatus::Submitted, ClaimStatus::Cancelled),
        (ClaimStatus::Reviewing, ClaimStatus::Approved),
        (ClaimStatus::Reviewing, ClaimStatus::PartiallyApproved),
        (ClaimStatus::Reviewing, ClaimStatus::Rejected),
        (ClaimStatus::Reviewing, ClaimStatus::RequestInfo),
        (ClaimStatus::RequestInfo, ClaimStatus::Submitted),
        (ClaimStatus::Approved, ClaimStatus::Completed),
        (ClaimStatus::PartiallyApproved, ClaimStatus::Completed),
    ];

    #[test]
    fn test_every_pair_matches_table() {
        for from in ClaimStatus::ALL {
            for to in ClaimStatus::ALL {
                let expected = TABLE.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {} should be {}",
                    from,
                    to,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_editable_statuses() {
        let editable: Vec<_> = ClaimStatus::ALL.into_iter().filter(ClaimStatus::is_editable).collect();
        assert_eq!(editable, vec![ClaimStatus::Draft, ClaimStatus::RequestInfo]);
    }

    #[test]
    fn test_happy_path() {
        let mut claim = Claim::draft(VehicleId::new(), CustomerId::new(), "BMS fault", Currency::VND);

        for status in [
            ClaimStatus::Submitted,
            ClaimStatus::Reviewing,
            ClaimStatus::Approved,
            ClaimStatus::Completed,
        ] {
            claim.transition_to(status).unwrap();
        }
        assert_eq!(claim.status, ClaimStatus::Completed);
        assert!(claim.status.is_terminal());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&ClaimStatus::PartiallyApproved).unwrap();
        assert_eq!(json, "\"PARTIALLY_APPROVED\"");
        let parsed: ClaimStatus = serde_json::from_str("\"REQUEST_INFO\"").unwrap();
        assert_eq!(parsed, ClaimStatus::RequestInfo);
    }
}

// ============================================================================
// Review Outcome Tests
// ============================================================================

mod outcome_tests {
    use super::*;

    #[test]
    fn test_all_approved() {
        let items = vec![item_with(ItemStatus::Approved), item_with(ItemStatus::Approved)];
        assert_eq!(review_outcome(&items).unwrap(), ClaimStatus::Approved);
    }

    #[test]
    fn test_mixed_is_partial() {
        let items = vec![item_with(ItemStatus::Approved), item_with(ItemStatus::Rejected)];
        assert_eq!(review_outcome(&items).unwrap(), ClaimStatus::PartiallyApproved);
    }

    #[test]
    fn test_all_rejected() {
        let items = vec![item_with(ItemStatus::Rejected)];
        assert_eq!(review_outcome(&items).unwrap(), ClaimStatus::Rejected);
    }

    #[test]
    fn test_pending_or_empty_is_invalid() {
        let items = vec![item_with(ItemStatus::Approved), item_with(ItemStatus::Pending)];
        assert!(matches!(review_outcome(&items), Err(ClaimError::InvalidClaimAction(_))));
        assert!(matches!(review_outcome(&[]), Err(ClaimError::InvalidClaimAction(_))));
    }
}

// ============================================================================
// Attachment Sniffing Tests
// ============================================================================

mod sniff_tests {
    use super::*;

    #[test]
    fn test_gif_and_bmp_are_images() {
        assert_eq!(sniff(b"GIF89a\x01\x00\x01\x00").unwrap().kind, AttachmentType::Image);
        assert_eq!(sniff(b"BM\x36\x00\x0c\x00").unwrap().mime, "image/bmp");
    }

    #[test]
    fn test_matroska_is_video() {
        let detected = sniff(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x86, 0x81]).unwrap();
        assert_eq!(detected.kind, AttachmentType::Video);
    }

    #[test]
    fn test_truncated_ftyp_is_rejected() {
        assert!(sniff(b"\x00\x00\x00\x18ftyp").is_none());
    }
}

// ============================================================================
// Error and Filter Tests
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_missing_information_kind() {
        let error = ClaimError::MissingInformation {
            items: 0,
            required_items: 1,
            attachments: 1,
            required_attachments: 3,
        };
        assert_eq!(error.kind(), ErrorKind::MissingInformation);
        assert_eq!(error.code(), "CLAIM_MISSING_INFORMATION");
        assert!(error.to_string().contains("1 of 3"));
    }

    #[test]
    fn test_not_found_codes() {
        assert_eq!(ClaimError::claim_not_found(ClaimId::new()).code(), "CLAIM_NOT_FOUND");
        assert_eq!(ClaimError::InvalidAttachmentType.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_filter_matches() {
        let claim = Claim::draft(VehicleId::new(), CustomerId::new(), "Heat pump", Currency::VND);

        assert!(ClaimFilter::default().matches(&claim));
        assert!(ClaimFilter::by_customer(claim.customer_id).matches(&claim));
        assert!(!ClaimFilter::by_customer(CustomerId::new()).matches(&claim));
        assert!(!ClaimFilter::by_status(ClaimStatus::Submitted).matches(&claim));

        let window = ClaimFilter {
            created_from: Some(claim.created_at - chrono::Duration::hours(1)),
            created_to: Some(claim.created_at),
            ..Default::default()
        };
        assert!(window.matches(&claim));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = ClaimStatus> {
        prop::sample::select(ClaimStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn transition_succeeds_iff_allowed(from in any_status(), to in any_status()) {
            let mut claim = Claim::draft(VehicleId::new(), CustomerId::new(), "Any fault", Currency::VND);
            claim.status = from;

            let result = claim.transition_to(to);
            if from.can_transition_to(to) {
                prop_assert!(result.is_ok());
                prop_assert_eq!(claim.status, to);
            } else {
                prop_assert!(
                    matches!(result, Err(ClaimError::InvalidClaimAction(_))),
                    "unexpected result for {} -> {}",
                    from,
                    to
                );
                prop_assert_eq!(claim.status, from);
            }
        }

        #[test]
        fn outcome_is_approved_iff_no_rejections(decisions in prop::collection::vec(any::<bool>(), 1..10)) {
            let items: Vec<_> = decisions
                .iter()
                .map(|approved| item_with(if *approved { ItemStatus::Approved } else { ItemStatus::Rejected }))
                .collect();
            let outcome = review_outcome(&items).unwrap();

            let approved = decisions.iter().filter(|d| **d).count();
            let expected = if approved == decisions.len() {
                ClaimStatus::Approved
            } else if approved == 0 {
                ClaimStatus::Rejected
            } else {
                ClaimStatus::PartiallyApproved
            };
            prop_assert_eq!(outcome, expected);
        }
    }
}
