mod support;

use proptest::prelude::*;

use pds_registry::{
    ErrorKind, LabelUpdate, NewData, NewLabel, RegistryError, RegistryEvent, GROUP_REVOKED,
};

use support::{Harness, DAY};

#[test_log::test]
fn test_add_label_records_owner_and_defaults() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");

    let label = h.registry.get_label("label_1").unwrap().unwrap();
    assert_eq!(label.owner, alice.did);
    assert_eq!(label.producer, alice.did);
    assert_eq!(label.producer_expire_at, label.expire_at);
    assert_eq!(label.created, h.height);
    assert_eq!(label.last_updated, h.height);
    assert!(label.is_live());
    assert_eq!(h.registry.get_label_count().unwrap(), 1);

    assert_eq!(
        h.events.last(),
        Some(RegistryEvent::LabelAdded {
            label_id: "label_1".into(),
            owner: alice.did.clone(),
            producer: alice.did.clone(),
        })
    );
}

#[test_log::test]
fn test_add_label_with_initial_data_pins_content() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let req = NewLabel {
        data: Some("bafy_initial".into()),
        size: 512,
        ..h.label_request("label_1")
    };
    let ctx = h.ctx();
    h.registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_1"))
        .unwrap();

    let page = h.registry.get_data_list("label_1", 0, 0).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].data_id, "bafy_initial");
    assert_eq!(page.items[0].name, req.name);

    let pin = h.pins.get_pin("bafy_initial").unwrap();
    assert_eq!(pin.group, "label_1");
    assert_eq!(pin.expire_at, req.expire_at);
    assert_eq!(pin.size, 512);
}

#[test_log::test]
fn test_add_label_rejections_leave_no_trace() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");
    let events_before = h.events.len();

    // duplicate id
    let req = h.label_request("label_1");
    let ctx = h.ctx();
    let err = h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_1"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { kind: "label", .. }));

    // empty id
    let req = h.label_request("");
    let ctx = h.ctx();
    let err = h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label(""))
        .unwrap_err();
    assert!(matches!(err, RegistryError::EmptyId("label_id")));

    // expiry not in the future
    let req = NewLabel {
        expire_at: h.now,
        ..h.label_request("label_2")
    };
    let ctx = h.ctx();
    let err = h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_2"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Temporal);

    // producer window outlives the label
    let base = h.label_request("label_2");
    let req = NewLabel {
        producer_expire_at: base.expire_at + 1,
        ..base
    };
    let ctx = h.ctx();
    assert!(h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_2"))
        .is_err());

    // malformed producer
    let req = NewLabel {
        producer: Some("did:icon:03:zz".into()),
        ..h.label_request("label_2")
    };
    let ctx = h.ctx();
    let err = h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_2"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // envelope signed for another label
    let req = h.label_request("label_2");
    let ctx = h.ctx();
    let err = h
        .registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_3"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert_eq!(h.registry.get_label_count().unwrap(), 1);
    assert!(h.registry.get_label("label_2").unwrap().is_none());
    assert_eq!(h.events.len(), events_before);
}

#[test_log::test]
fn test_add_data_requires_producer_signature() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let bob = h.actor(2);
    let req = NewLabel {
        producer: Some(bob.did.clone()),
        ..h.label_request("label_1")
    };
    let ctx = h.ctx();
    h.registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_1"))
        .unwrap();

    let data = NewData {
        label_id: "label_1".into(),
        data_id: "bafy_1".into(),
        name: "report.pdf".into(),
        size: 1024,
    };

    let ctx = h.ctx();
    let err = h
        .registry
        .add_data(&ctx, &data, &alice.sign_add_data("label_1", "bafy_1"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::PermissionDenied(_)));

    let ctx = h.ctx();
    h.registry
        .add_data(&ctx, &data, &bob.sign_add_data("label_1", "bafy_1"))
        .unwrap();
    assert_eq!(h.registry.get_data("label_1", "bafy_1").unwrap().unwrap().size, 1024);
    assert_eq!(h.pins.get_pin("bafy_1").unwrap().name, "report.pdf");

    let ctx = h.ctx();
    let err = h
        .registry
        .add_data(&ctx, &data, &bob.sign_add_data("label_1", "bafy_1"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { kind: "data", .. }));

    // zero-sized content is refused before anything is pinned
    let empty = NewData {
        data_id: "bafy_2".into(),
        size: 0,
        ..data.clone()
    };
    let ctx = h.ctx();
    assert!(h
        .registry
        .add_data(&ctx, &empty, &bob.sign_add_data("label_1", "bafy_2"))
        .is_err());
    assert_eq!(h.pins.pin_count(), 1);
}

#[test_log::test]
fn test_add_data_after_producer_window_closes() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let base = h.label_request("label_1");
    let req = NewLabel {
        producer_expire_at: h.now + DAY,
        ..base
    };
    let ctx = h.ctx();
    h.registry
        .add_label(&ctx, &req, &alice.sign_add_label("label_1"))
        .unwrap();

    h.advance_time(2 * DAY);
    let data = NewData {
        label_id: "label_1".into(),
        data_id: "bafy_late".into(),
        name: "late".into(),
        size: 10,
    };
    let ctx = h.ctx();
    let err = h
        .registry
        .add_data(&ctx, &data, &alice.sign_add_data("label_1", "bafy_late"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Temporal);
}

#[test_log::test]
fn test_update_label_rejects_replayed_envelope() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");

    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let update = LabelUpdate {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let ctx = h.ctx();
    h.registry.update_label(&ctx, "label_1", &update, &token).unwrap();
    assert_eq!(h.registry.get_label("label_1").unwrap().unwrap().name, "renamed");
    assert_eq!(h.last_updated("label_1"), ctx.height);

    let ctx = h.ctx();
    let err = h
        .registry
        .update_label(&ctx, "label_1", &update, &token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test_log::test]
fn test_update_label_rejects_base_height_at_current_block() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");

    let ctx = h.ctx();
    let token = alice.sign_update_label("label_1", ctx.height);
    let err = h
        .registry
        .update_label(&ctx, "label_1", &LabelUpdate::default(), &token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test_log::test]
fn test_update_label_by_non_owner_is_denied() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let mallory = h.actor(9);
    h.add_label(&alice, "label_1");

    let token = mallory.sign_update_label("label_1", h.last_updated("label_1"));
    let ctx = h.ctx();
    let err = h
        .registry
        .update_label(&ctx, "label_1", &LabelUpdate::default(), &token)
        .unwrap_err();
    assert!(matches!(err, RegistryError::PermissionDenied(_)));
}

#[test_log::test]
fn test_shortening_label_clamps_policies_and_pins() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let carol = h.actor(3);
    h.add_label(&alice, "label_1");
    h.add_policy(&alice, "label_1", "policy_1", &carol);

    let new_expiry = h.now + 5 * DAY;
    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let update = LabelUpdate {
        expire_at: new_expiry,
        ..Default::default()
    };
    let ctx = h.ctx();
    h.registry.update_label(&ctx, "label_1", &update, &token).unwrap();

    let label = h.registry.get_label("label_1").unwrap().unwrap();
    assert_eq!(label.expire_at, new_expiry);
    assert_eq!(label.producer_expire_at, new_expiry);
    let policy = h.registry.get_policy("policy_1").unwrap().unwrap();
    assert_eq!(policy.expire_at, new_expiry);
    assert_eq!(h.pins.get_group("label_1"), new_expiry);
}

#[test_log::test]
fn test_update_label_after_expiry_is_rejected() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");
    h.advance_time(31 * DAY);

    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let update = LabelUpdate {
        name: Some("too late".into()),
        ..Default::default()
    };
    let ctx = h.ctx();
    let err = h
        .registry
        .update_label(&ctx, "label_1", &update, &token)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Expired(_)));
    assert_eq!(h.registry.get_label("label_1").unwrap().unwrap().name, "label_1 name");
}

#[test_log::test]
fn test_remove_label_rejects_stale_or_foreign_envelope() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let mallory = h.actor(9);
    h.add_label(&alice, "label_1");

    // signed against a height the label has since moved past
    let stale = alice.sign_remove_label("label_1", h.last_updated("label_1"));
    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let update = LabelUpdate {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let ctx = h.ctx();
    h.registry.update_label(&ctx, "label_1", &update, &token).unwrap();

    let ctx = h.ctx();
    let err = h.registry.remove_label(&ctx, "label_1", &stale).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let token = mallory.sign_remove_label("label_1", h.last_updated("label_1"));
    let ctx = h.ctx();
    let err = h.registry.remove_label(&ctx, "label_1", &token).unwrap_err();
    assert!(matches!(err, RegistryError::PermissionDenied(_)));

    let label = h.registry.get_label("label_1").unwrap().unwrap();
    assert!(label.is_live());
    assert_eq!(h.registry.get_label_count().unwrap(), 1);
}

#[test_log::test]
fn test_producer_handoff() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let bob = h.actor(2);
    h.add_label(&alice, "label_1");
    let label = h.registry.get_label("label_1").unwrap().unwrap();

    let rejected = [
        LabelUpdate {
            producer: Some(bob.did.clone()),
            producer_expire_at: label.expire_at + 1,
            ..Default::default()
        },
        LabelUpdate {
            producer: Some(bob.did.clone()),
            producer_expire_at: h.now,
            ..Default::default()
        },
    ];
    for update in rejected {
        let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
        let ctx = h.ctx();
        let err = h
            .registry
            .update_label(&ctx, "label_1", &update, &token)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Temporal, "{:?}", update);
    }
    assert_eq!(h.registry.get_label("label_1").unwrap().unwrap(), label);

    let window = h.now + 2 * DAY;
    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let update = LabelUpdate {
        producer: Some(bob.did.clone()),
        producer_expire_at: window,
        ..Default::default()
    };
    let ctx = h.ctx();
    h.registry.update_label(&ctx, "label_1", &update, &token).unwrap();
    let label = h.registry.get_label("label_1").unwrap().unwrap();
    assert_eq!(label.producer, bob.did);
    assert_eq!(label.producer_expire_at, window);

    let data = |data_id: &str| NewData {
        label_id: "label_1".into(),
        data_id: data_id.into(),
        name: data_id.into(),
        size: 8,
    };

    let ctx = h.ctx();
    let err = h
        .registry
        .add_data(&ctx, &data("bafy_1"), &alice.sign_add_data("label_1", "bafy_1"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::PermissionDenied(_)));

    let ctx = h.ctx();
    h.registry
        .add_data(&ctx, &data("bafy_1"), &bob.sign_add_data("label_1", "bafy_1"))
        .unwrap();

    h.advance_time(3 * DAY);
    let ctx = h.ctx();
    let err = h
        .registry
        .add_data(&ctx, &data("bafy_2"), &bob.sign_add_data("label_1", "bafy_2"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Temporal);
    assert_eq!(h.registry.get_data_list("label_1", 0, 0).unwrap().total, 1);
}

#[test_log::test]
fn test_remove_label_cascades() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    let carol = h.actor(3);
    let dave = h.actor(4);
    h.add_label(&alice, "label_1");
    h.add_label(&alice, "label_2");
    for data_id in ["bafy_a", "bafy_b"] {
        let data = NewData {
            label_id: "label_1".into(),
            data_id: data_id.into(),
            name: data_id.into(),
            size: 64,
        };
        let ctx = h.ctx();
        h.registry
            .add_data(&ctx, &data, &alice.sign_add_data("label_1", data_id))
            .unwrap();
    }
    h.add_policy(&alice, "label_1", "policy_1", &carol);
    h.add_policy(&alice, "label_1", "policy_2", &dave);
    h.add_policy(&alice, "label_2", "policy_3", &carol);
    assert_eq!(h.registry.get_policy_count().unwrap(), 3);

    let token = alice.sign_remove_label("label_1", h.last_updated("label_1"));
    let ctx = h.ctx();
    h.registry.remove_label(&ctx, "label_1", &token).unwrap();

    assert_eq!(h.registry.get_label_count().unwrap(), 1);
    assert_eq!(h.registry.get_policy_count().unwrap(), 1);
    assert!(h.registry.get_policy("policy_1").unwrap().is_none());
    assert!(h.registry.get_policy("policy_2").unwrap().is_none());
    assert!(h.registry.get_policy("policy_3").unwrap().is_some());
    assert!(h.registry.get_data("label_1", "bafy_a").unwrap().is_none());

    let revoked = h.registry.get_label("label_1").unwrap().unwrap();
    assert_eq!(revoked.revoked, ctx.height);
    assert_eq!(h.pins.get_group("label_1"), GROUP_REVOKED);
    assert_eq!(h.pins.get_pin("bafy_a").unwrap().expire_at, GROUP_REVOKED);

    let err = h.registry.get_data_list("label_1", 0, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(h.registry.get_policy_list("label_1", 0, 0).is_err());

    // revoked ids stay taken
    let req = h.label_request("label_1");
    let ctx = h.ctx();
    assert!(matches!(
        h.registry.add_label(&ctx, &req, &alice.sign_add_label("label_1")),
        Err(RegistryError::AlreadyExists { .. })
    ));

    let token = alice.sign_update_label("label_1", h.last_updated("label_1"));
    let ctx = h.ctx();
    let err = h
        .registry
        .update_label(&ctx, "label_1", &LabelUpdate::default(), &token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test_log::test]
fn test_data_list_pagination() {
    let mut h = Harness::new();
    let alice = h.actor(1);
    h.add_label(&alice, "label_1");
    for i in 0..31 {
        let data_id = format!("bafy_{:02}", i);
        let data = NewData {
            label_id: "label_1".into(),
            data_id: data_id.clone(),
            name: data_id.clone(),
            size: 1,
        };
        let ctx = h.ctx();
        h.registry
            .add_data(&ctx, &data, &alice.sign_add_data("label_1", &data_id))
            .unwrap();
    }

    let first = h.registry.get_data_list("label_1", 0, 0).unwrap();
    assert_eq!((first.offset, first.size, first.total), (0, 25, 31));
    assert_eq!(first.items.len(), 25);
    assert_eq!(first.items[0].data_id, "bafy_00");

    let tail = h.registry.get_data_list("label_1", -11, 20).unwrap();
    assert_eq!((tail.offset, tail.size, tail.total), (20, 11, 31));
    assert_eq!(tail.items.last().unwrap().data_id, "bafy_30");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_label_count_tracks_live_labels(ops in proptest::collection::vec((0u8..6, any::<bool>()), 1..12)) {
        let mut h = Harness::new();
        let alice = h.actor(1);
        let mut live = std::collections::BTreeSet::new();
        let mut used = std::collections::BTreeSet::new();

        for (slot, add) in ops {
            let label_id = format!("label_{}", slot);
            if add {
                let req = h.label_request(&label_id);
                let ctx = h.ctx();
                let result = h.registry.add_label(&ctx, &req, &alice.sign_add_label(&label_id));
                prop_assert_eq!(result.is_ok(), used.insert(label_id.clone()));
                if result.is_ok() {
                    live.insert(label_id);
                }
            } else if live.contains(&label_id) {
                let token = alice.sign_remove_label(&label_id, h.last_updated(&label_id));
                let ctx = h.ctx();
                h.registry.remove_label(&ctx, &label_id, &token).unwrap();
                live.remove(&label_id);
            }
            prop_assert_eq!(h.registry.get_label_count().unwrap(), live.len() as u64);
        }
    }
}
