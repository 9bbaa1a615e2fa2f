//! Rule sync planning tests: idempotent second passes must not write, equal
//! trees must never fork, and writes onto published versions must fork.

use papi_client::{MockPapiClient, NewProperty, PapiClientTrait};
use serde_json::json;

use super::rules::{plan_rules_update, RulesPlan};

async fn property_with_rules(client: &MockPapiClient, rules: &serde_json::Value) -> String {
    let id = client
        .create_property(&NewProperty {
            property_name: "www.example.com".into(),
            product_id: "prd_Fresca".into(),
            contract_id: "ctr_1".into(),
            group_id: "grp_1".into(),
        })
        .await
        .unwrap();
    let tree = client.get_rule_tree(&id, 1, "ctr_1", "grp_1").await.unwrap();
    client
        .update_rule_tree(&id, 1, "ctr_1", "grp_1", rules, &tree.etag)
        .await
        .unwrap();
    id
}

fn sample_rules() -> serde_json::Value {
    json!({
        "name": "default",
        "behaviors": [{"name": "origin", "options": {"hostname": "o.example.com"}}],
    })
}

#[tokio::test]
async fn second_pass_with_same_rules_is_a_no_op() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let desired = sample_rules();
    let id = property_with_rules(&client, &desired).await;
    client.reset_calls();

    // The stored tree now carries server decorations; the plan must still
    // see it as equal.
    let plan = plan_rules_update(&client, &id, "ctr_1", "grp_1", 1, &desired)
        .await
        .unwrap();

    assert_eq!(plan, RulesPlan::UpToDate);
    assert_eq!(client.calls_named("update_rule_tree"), 0);
    assert_eq!(client.calls_named("create_property_version"), 0);
}

#[tokio::test]
async fn equal_trees_never_fork_even_when_published() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let desired = sample_rules();
    let id = property_with_rules(&client, &desired).await;
    client.publish(&id, "STAGING", 1);
    client.reset_calls();

    let plan = plan_rules_update(&client, &id, "ctr_1", "grp_1", 1, &desired)
        .await
        .unwrap();

    assert_eq!(plan, RulesPlan::UpToDate);
    assert_eq!(client.calls_named("create_property_version"), 0);
}

#[tokio::test]
async fn changed_rules_on_unpublished_version_update_in_place() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = property_with_rules(&client, &sample_rules()).await;
    client.reset_calls();

    let changed = json!({
        "name": "default",
        "behaviors": [{"name": "origin", "options": {"hostname": "o2.example.com"}}],
    });
    let plan = plan_rules_update(&client, &id, "ctr_1", "grp_1", 1, &changed)
        .await
        .unwrap();

    match plan {
        RulesPlan::Update {
            target_version,
            forked,
            ..
        } => {
            assert_eq!(target_version, 1);
            assert!(!forked);
        }
        other => panic!("expected update plan, got {other:?}"),
    }
    assert_eq!(client.calls_named("create_property_version"), 0);
}

#[tokio::test]
async fn changed_rules_on_published_version_fork_first() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = property_with_rules(&client, &sample_rules()).await;
    client.publish(&id, "STAGING", 1);
    client.reset_calls();

    let changed = json!({
        "name": "default",
        "behaviors": [{"name": "origin", "options": {"hostname": "o2.example.com"}}],
    });
    let plan = plan_rules_update(&client, &id, "ctr_1", "grp_1", 1, &changed)
        .await
        .unwrap();

    match plan {
        RulesPlan::Update {
            target_version,
            forked,
            etag,
        } => {
            assert_eq!(target_version, 2);
            assert!(forked);
            // The write targets a strictly newer version than the published
            // one, with the etag read before the fork (the fork copies it).
            assert!(!etag.is_empty());
            let forked_tree = client.get_rule_tree(&id, 2, "ctr_1", "grp_1").await.unwrap();
            assert_eq!(forked_tree.etag, etag);
        }
        other => panic!("expected update plan, got {other:?}"),
    }
    assert_eq!(client.calls_named("create_property_version"), 1);
}

#[tokio::test]
async fn applying_a_plan_twice_writes_once() {
    // Two reconcile passes for the same desired tree produce exactly one
    // remote write.
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = property_with_rules(&client, &json!({"name": "default"})).await;
    client.reset_calls();

    let desired = sample_rules();
    for _ in 0..2 {
        let plan = plan_rules_update(&client, &id, "ctr_1", "grp_1", 1, &desired)
            .await
            .unwrap();
        if let RulesPlan::Update {
            target_version,
            etag,
            ..
        } = plan
        {
            client
                .update_rule_tree(&id, target_version, "ctr_1", "grp_1", &desired, &etag)
                .await
                .unwrap();
        }
    }

    assert_eq!(client.calls_named("update_rule_tree"), 1);
}
