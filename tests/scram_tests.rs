//! SCRAM credential administration against the in-memory broker.

mod common;

use std::time::Duration;

use common::harness;
use kafkaesque_admin::prelude::*;

const POLL: Option<Duration> = Some(Duration::from_secs(5));

async fn alter(
    client: &AdminClient,
    alterations: Vec<UserScramCredentialAlteration>,
) -> AdminResult<UserScramCredentialAlterationResult> {
    client
        .alter_user_scram_credentials(alterations, &AdminOptions::new(), None)
        .expect("submit alter");
    let event = client.queue().poll(POLL).await.expect("alter event");
    assert_eq!(event.op(), AdminOp::AlterUserScramCredentials);
    event
        .result
        .into_alter_user_scram_credentials()
        .expect("alter result")
}

async fn describe(
    client: &AdminClient,
    users: Vec<String>,
) -> AdminResult<UserScramCredentialsDescription> {
    client
        .describe_user_scram_credentials(users, &AdminOptions::new(), None)
        .expect("submit describe");
    let event = client.queue().poll(POLL).await.expect("describe event");
    event
        .result
        .into_describe_user_scram_credentials()
        .expect("describe result")
}

#[tokio::test]
async fn test_upsert_then_describe_all() {
    let h = harness(AdminClientConfig::default());

    let upsert = UserScramCredentialAlteration::upsertion(
        "broker",
        ScramMechanism::Sha512,
        10_000,
        b"broker-secret",
        None,
    )
    .unwrap();
    let result = alter(&h.client, vec![upsert]).await;
    assert!(result.is_ok());
    assert_eq!(result.len(), 1);
    assert_eq!(result.items()[0].user, "broker");
    assert!(result.items()[0].error.is_none());

    let described = describe(&h.client, vec![]).await;
    assert!(described.is_ok());
    assert_eq!(described.len(), 1);
    let user = &described.items()[0];
    assert_eq!(user.user, "broker");
    assert!(user.error.is_none());
    assert_eq!(
        user.credential_infos,
        vec![ScramCredentialInfo {
            mechanism: ScramMechanism::Sha512,
            iterations: 10_000,
        }]
    );

    // ApiVersions once, then one request per call
    assert_eq!(h.broker.sent(ApiKey::ApiVersions), 1);
    assert_eq!(h.broker.sent(ApiKey::AlterUserScramCredentials), 1);
    assert_eq!(h.broker.sent(ApiKey::DescribeUserScramCredentials), 1);
}

#[tokio::test]
async fn test_delete_unregistered_mechanism_is_item_error() {
    let h = harness(AdminClientConfig::default());

    let upsert =
        UserScramCredentialAlteration::upsertion("alice", ScramMechanism::Sha256, 4096, b"pw", None)
            .unwrap();
    assert!(alter(&h.client, vec![upsert]).await.is_ok());

    let delete = UserScramCredentialAlteration::deletion("alice", ScramMechanism::Sha512).unwrap();
    let result = alter(&h.client, vec![delete]).await;

    assert!(result.error().is_none(), "no request-level error");
    assert_eq!(result.len(), 1);
    let item = &result.items()[0];
    assert_eq!(item.user, "alice");
    assert_eq!(
        item.error.as_ref().map(|e| e.code),
        Some(KafkaCode::ResourceNotFound)
    );
}

#[tokio::test]
async fn test_alter_results_follow_submission_order() {
    let h = harness(AdminClientConfig::default());

    let alterations = vec![
        UserScramCredentialAlteration::upsertion("zed", ScramMechanism::Sha256, 4096, b"a", None)
            .unwrap(),
        UserScramCredentialAlteration::deletion("ghost", ScramMechanism::Sha256).unwrap(),
        UserScramCredentialAlteration::upsertion("amy", ScramMechanism::Sha512, 8192, b"b", None)
            .unwrap(),
        UserScramCredentialAlteration::deletion("zed", ScramMechanism::Sha512).unwrap(),
    ];
    let result = alter(&h.client, alterations).await;

    let users: Vec<&str> = result.items().iter().map(|r| r.user.as_str()).collect();
    assert_eq!(users, vec!["zed", "ghost", "amy", "zed"]);
    assert!(result.items()[1].error.is_some());
    assert!(result.items()[2].error.is_none());
}

#[tokio::test]
async fn test_describe_unknown_user_has_item_error() {
    let h = harness(AdminClientConfig::default());

    let described = describe(&h.client, vec!["nobody".to_string()]).await;
    assert!(described.is_ok());
    assert_eq!(described.len(), 1);
    let item = &described.items()[0];
    assert_eq!(
        item.error.as_ref().map(|e| e.code),
        Some(KafkaCode::ResourceNotFound)
    );
    assert!(item.credential_infos.is_empty());
}

#[tokio::test]
async fn test_invalid_alterations_fail_before_sending() {
    let h = harness(AdminClientConfig::default());

    assert!(matches!(
        UserScramCredentialAlteration::upsertion("u", ScramMechanism::Sha256, 0, b"pw", None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        UserScramCredentialAlteration::upsertion("u", ScramMechanism::Unknown, 4096, b"pw", None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        h.client
            .alter_user_scram_credentials(vec![], &AdminOptions::new(), None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        h.client.describe_user_scram_credentials(
            vec!["".to_string()],
            &AdminOptions::new(),
            None
        ),
        Err(Error::InvalidArgument(_))
    ));

    assert!(h.broker.requests.lock().unwrap().is_empty());
    assert!(h.client.queue().is_empty());
}

#[tokio::test]
async fn test_opaque_and_custom_queue() {
    let h = harness(AdminClientConfig::default());
    let queue = ResultQueue::new();

    let mut options = AdminOptions::for_op(AdminOp::DescribeUserScramCredentials);
    options.set_opaque(42);
    h.client
        .describe_user_scram_credentials(vec![], &options, Some(&queue))
        .unwrap();

    let event = queue.poll(POLL).await.expect("event on custom queue");
    assert_eq!(event.opaque, Some(42));
    assert!(h.client.queue().is_empty());

    // options built for another operation are rejected
    assert!(matches!(
        h.client
            .alter_user_scram_credentials(vec![], &options, None),
        Err(Error::InvalidArgument(_))
    ));
}
