// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::access::{authorize, Actor, Operation};
use crate::types::id::ActorId;
use crate::types::Role;

fn actor(role: Role) -> Actor {
    Actor::session(ActorId::generate(), "tester", role)
}

#[test]
fn test_reads_open_to_every_role() {
    for role in Role::ALL {
        for op in [
            Operation::ListAssets,
            Operation::ReadAsset,
            Operation::ListEvents,
            Operation::ViewDashboard,
        ] {
            assert!(authorize(&actor(role), op).is_ok(), "{:?} {:?}", role, op);
        }
    }
}

#[test]
fn test_purchase_excludes_commander() {
    assert!(authorize(&actor(Role::Admin), Operation::RecordPurchase).is_ok());
    assert!(authorize(&actor(Role::LogisticsOfficer), Operation::RecordPurchase).is_ok());

    let err = authorize(&actor(Role::BaseCommander), Operation::RecordPurchase).unwrap_err();
    assert_eq!(err.role, Role::BaseCommander);
    assert_eq!(err.operation, Operation::RecordPurchase);
}

#[test]
fn test_field_operations_open_to_all_roles() {
    for role in Role::ALL {
        for op in [
            Operation::RecordTransfer,
            Operation::RecordAssignment,
            Operation::RecordExpenditure,
        ] {
            assert!(authorize(&actor(role), op).is_ok());
        }
    }
}

#[test]
fn test_admin_only_operations() {
    for op in [Operation::RetireAsset, Operation::ReplaceEvents, Operation::AuditLog] {
        assert!(authorize(&actor(Role::Admin), op).is_ok());
        assert!(authorize(&actor(Role::LogisticsOfficer), op).is_err());
        assert!(authorize(&actor(Role::BaseCommander), op).is_err());
    }
}

#[test]
fn test_tool_grant_limited_to_replace() {
    let tool = Actor::admin_tool();
    assert!(tool.id.is_none());
    assert!(authorize(&tool, Operation::ReplaceEvents).is_ok());
    assert!(authorize(&tool, Operation::RecordPurchase).is_err());
    assert!(authorize(&tool, Operation::ListAssets).is_err());
}
