//! Integration tests for the PAPI client
//!
//! The mock-backed tests exercise the client contract the reconciler depends
//! on: version forking copies state, rule writes are etag-guarded, and
//! activation polls step toward ACTIVE and publish the version.
//!
//! The live tests at the bottom require real EdgeGrid credentials in the
//! environment and stay ignored.

use papi_client::{
    activation_status, EdgeGridCredentials, EdgeHostname, EdgeHostnameTemplate, Hostname,
    MockPapiClient, NewActivation, NewProperty, PapiClient, PapiClientTrait, Property,
};

fn new_property() -> NewProperty {
    NewProperty {
        property_name: "www.example.com".into(),
        product_id: "prd_Fresca".into(),
        contract_id: "ctr_1".into(),
        group_id: "grp_1".into(),
    }
}

#[tokio::test]
async fn create_and_get_property() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");

    let id = client.create_property(&new_property()).await.unwrap();
    let property = client.get_property(&id).await.unwrap();

    assert_eq!(property.property_id, id);
    assert_eq!(property.property_name, "www.example.com");
    assert_eq!(property.latest_version, 1);
    assert_eq!(property.staging_version, 0);
    assert_eq!(property.production_version, 0);
}

#[tokio::test]
async fn version_fork_copies_rules_and_hostnames() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    let desired = serde_json::json!({
        "name": "default",
        "behaviors": [{"name": "origin", "options": {"hostname": "origin.example.com"}}],
    });
    let tree = client.get_rule_tree(&id, 1, "ctr_1", "grp_1").await.unwrap();
    client
        .update_rule_tree(&id, 1, "ctr_1", "grp_1", &desired, &tree.etag)
        .await
        .unwrap();
    client
        .set_hostnames(
            &id,
            "ctr_1",
            "grp_1",
            1,
            &[Hostname {
                cname_from: "www.example.com".into(),
                cname_to: "www.example.com.edgekey.net".into(),
                cert_provisioning_type: "CPS_MANAGED".into(),
            }],
        )
        .await
        .unwrap();

    let forked = client
        .create_property_version(&id, "ctr_1", "grp_1", 1)
        .await
        .unwrap();
    assert_eq!(forked, 2);

    let forked_tree = client.get_rule_tree(&id, 2, "ctr_1", "grp_1").await.unwrap();
    assert_eq!(
        forked_tree.rules["behaviors"][0]["options"]["hostname"],
        "origin.example.com"
    );
    let forked_hostnames = client.get_hostnames(&id, "ctr_1", "grp_1", 2).await.unwrap();
    assert_eq!(forked_hostnames.len(), 1);

    let property = client.get_property(&id).await.unwrap();
    assert_eq!(property.latest_version, 2);
}

#[tokio::test]
async fn rule_update_rejects_stale_etag() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    let desired = serde_json::json!({"name": "default"});
    let err = client
        .update_rule_tree(&id, 1, "ctr_1", "grp_1", &desired, "stale-etag")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn stored_rule_trees_carry_server_decorations() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    let desired = serde_json::json!({
        "name": "default",
        "behaviors": [{"name": "caching", "options": {"behavior": "NO_STORE"}}],
    });
    let tree = client.get_rule_tree(&id, 1, "ctr_1", "grp_1").await.unwrap();
    let written = client
        .update_rule_tree(&id, 1, "ctr_1", "grp_1", &desired, &tree.etag)
        .await
        .unwrap();

    assert!(written.rules["uuid"].is_string());
    assert_eq!(written.rules["criteriaMustSatisfy"], "all");
    assert!(written.rules["behaviors"][0]["uuid"].is_string());
}

#[tokio::test]
async fn version_published_on_reports_networks() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    assert_eq!(client.version_published_on(&id, 1).await.unwrap(), None);

    client.publish(&id, "STAGING", 1);
    assert_eq!(
        client.version_published_on(&id, 1).await.unwrap(),
        Some("STAGING".to_string())
    );
}

#[tokio::test]
async fn activation_polls_step_to_active_and_publish() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    let activation_id = client
        .create_activation(
            &id,
            1,
            &NewActivation {
                network: "STAGING".into(),
                note: "deploy 1".into(),
                notify_emails: vec!["noc@example.com".into()],
                ..Default::default()
            },
            "ctr_1",
            "grp_1",
        )
        .await
        .unwrap();

    let first = client.get_activation(&id, &activation_id).await.unwrap();
    assert_eq!(first.status, activation_status::ACTIVATING);

    let second = client.get_activation(&id, &activation_id).await.unwrap();
    assert_eq!(second.status, activation_status::ACTIVE);
    assert_eq!(second.property_version, 1);

    let property = client.get_property(&id).await.unwrap();
    assert_eq!(property.staging_version, 1);
}

#[tokio::test]
async fn pending_activation_is_found_per_network() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    client.hold_activations();
    let id = client.create_property(&new_property()).await.unwrap();

    let activation_id = client
        .create_activation(
            &id,
            1,
            &NewActivation {
                network: "STAGING".into(),
                note: "deploy".into(),
                notify_emails: vec!["noc@example.com".into()],
                ..Default::default()
            },
            "ctr_1",
            "grp_1",
        )
        .await
        .unwrap();

    let pending = client.pending_activation(&id, "STAGING").await.unwrap();
    assert_eq!(pending.unwrap().activation_id, activation_id);
    assert!(client
        .pending_activation(&id, "PRODUCTION")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn ensure_edge_hostnames_reuses_existing_and_creates_missing() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    client.add_edge_hostname(EdgeHostname {
        edge_hostname_id: "ehn_1".into(),
        domain_prefix: "www.example.com".into(),
        domain_suffix: "edgekey.net".into(),
        edge_hostname_domain: "www.example.com.edgekey.net".into(),
        secure: true,
        ip_version_behavior: "IPV4".into(),
    });

    let hostnames = vec![
        Hostname {
            cname_from: "www.example.com".into(),
            cname_to: "www.example.com.edgekey.net".into(),
            cert_provisioning_type: String::new(),
        },
        Hostname {
            cname_from: "api.example.com".into(),
            cname_to: "api.example.com.edgekey.net".into(),
            cert_provisioning_type: String::new(),
        },
    ];
    let template = EdgeHostnameTemplate {
        domain_prefix: "www.example.com".into(),
        domain_suffix: "edgekey.net".into(),
        secure_network: Some("ENHANCED_TLS".into()),
        ip_version_behavior: None,
    };

    client
        .ensure_edge_hostnames(&hostnames, &template, "prd_Fresca", "ctr_1", "grp_1")
        .await
        .unwrap();

    assert_eq!(client.calls_named("create_edge_hostname"), 1);
    let all = client.list_edge_hostnames("ctr_1", "grp_1").await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all
        .iter()
        .any(|eh| eh.domain() == "api.example.com.edgekey.net"));
}

#[tokio::test]
async fn remove_property_then_get_is_not_found() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    let id = client.create_property(&new_property()).await.unwrap();

    client.remove_property(&id).await.unwrap();
    assert!(client.get_property(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn get_property_includes_latest_version_hostnames() {
    let client = MockPapiClient::new("https://mock.akamaiapis.net");
    client.add_property(Property {
        property_id: "prp_9".into(),
        property_name: "www.example.com".into(),
        contract_id: "ctr_1".into(),
        group_id: "grp_1".into(),
        latest_version: 1,
        ..Default::default()
    });
    client
        .set_hostnames(
            "prp_9",
            "ctr_1",
            "grp_1",
            1,
            &[Hostname {
                cname_from: "www.example.com".into(),
                cname_to: "www.example.com.edgekey.net".into(),
                cert_provisioning_type: String::new(),
            }],
        )
        .await
        .unwrap();

    let property = client.get_property("prp_9").await.unwrap();
    assert_eq!(property.hostnames.len(), 1);
}

#[tokio::test]
#[ignore] // Requires real EdgeGrid credentials in the environment
async fn live_client_lists_edge_hostnames() {
    let credentials = EdgeGridCredentials::from_env().expect("EdgeGrid credentials must be set");
    let client = PapiClient::new(credentials).expect("failed to create client");

    let contract = std::env::var("AKAMAI_CONTRACT_ID").expect("AKAMAI_CONTRACT_ID must be set");
    let group = std::env::var("AKAMAI_GROUP_ID").expect("AKAMAI_GROUP_ID must be set");

    let edge_hostnames = client
        .list_edge_hostnames(&contract, &group)
        .await
        .expect("failed to list edge hostnames");
    println!("found {} edge hostnames", edge_hostnames.len());
}
