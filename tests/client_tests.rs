//! AdminClient behavior against the in-memory broker: retries, deadlines,
//! leader fan-out, cancellation and queue delivery.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::harness;
use kafkaesque_admin::prelude::*;

const POLL: Option<Duration> = Some(Duration::from_secs(60));

fn retry_config(max_retries: usize) -> AdminClientConfig {
    AdminClientConfig {
        max_retries,
        retry_backoff_min: Duration::from_millis(50),
        retry_backoff_max: Duration::from_millis(100),
        ..Default::default()
    }
}

fn topic(name: &str) -> NewTopic {
    NewTopic::new(name, 3, 1).unwrap()
}

// ============================================================================
// Retries and deadlines
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_not_controller_is_refreshed_and_retried() {
    let h = harness(retry_config(5));
    h.broker.not_controller_replies.store(2, Ordering::SeqCst);

    h.client
        .create_topics(vec![topic("orders")], &AdminOptions::new(), None)
        .unwrap();
    let event = h.client.queue().poll(POLL).await.expect("event");
    let result = event.result.into_create_topics().unwrap();

    assert!(result.is_ok());
    assert_eq!(result.items()[0].name, "orders");
    assert!(result.items()[0].error.is_none());
    assert!(h.broker.has_topic("orders"));
    assert_eq!(h.broker.sent(ApiKey::CreateTopics), 3);
    assert_eq!(h.refresher.refreshes.load(Ordering::SeqCst), 2);
    // initial resolution plus one per refresh
    assert_eq!(h.resolver.resolutions.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_only_errors_end_in_timeout() {
    let h = harness(retry_config(10_000));
    h.broker
        .not_controller_replies
        .store(usize::MAX, Ordering::SeqCst);

    let mut options = AdminOptions::new();
    options.set_request_timeout(Duration::from_secs(2)).unwrap();
    h.client
        .create_topics(vec![topic("never")], &options, None)
        .unwrap();

    let event = h.client.queue().poll(POLL).await.expect("event");
    assert_eq!(
        event.error(),
        Some(&Error::Timeout {
            last: Some(KafkaCode::NotController)
        })
    );
    let result = event.result.into_create_topics().unwrap();
    assert!(result.is_empty());
    assert!(!h.broker.has_topic("never"));
    assert!(h.broker.sent(ApiKey::CreateTopics) > 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_delivers_item_errors() {
    let h = harness(retry_config(2));
    h.broker
        .not_controller_replies
        .store(usize::MAX, Ordering::SeqCst);

    h.client
        .create_topics(vec![topic("a"), topic("b")], &AdminOptions::new(), None)
        .unwrap();
    let event = h.client.queue().poll(POLL).await.expect("event");
    let result = event.result.into_create_topics().unwrap();

    assert!(result.error().is_none());
    assert_eq!(result.len(), 2);
    for item in result.items() {
        assert_eq!(
            item.error.as_ref().map(|e| e.code),
            Some(KafkaCode::NotController)
        );
    }
    assert_eq!(h.broker.sent(ApiKey::CreateTopics), 3);
}

#[tokio::test]
async fn test_permanent_item_error_is_not_retried() {
    let h = harness(AdminClientConfig::default());

    for _ in 0..2 {
        h.client
            .create_topics(vec![topic("dup")], &AdminOptions::new(), None)
            .unwrap();
    }
    let first = h.client.queue().poll(POLL).await.unwrap();
    let second = h.client.queue().poll(POLL).await.unwrap();

    let codes: Vec<Option<KafkaCode>> = [first, second]
        .into_iter()
        .map(|e| {
            e.result.into_create_topics().unwrap().items()[0]
                .error
                .as_ref()
                .map(|e| e.code)
        })
        .collect();
    assert!(codes.contains(&None));
    assert!(codes.contains(&Some(KafkaCode::TopicAlreadyExists)));
    assert_eq!(h.broker.sent(ApiKey::CreateTopics), 2);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_duplicate_topics_rejected_synchronously() {
    let h = harness(AdminClientConfig::default());

    let err = h
        .client
        .create_topics(vec![topic("x"), topic("x")], &AdminOptions::new(), None)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(matches!(
        h.client.delete_topics(vec![], &AdminOptions::new(), None),
        Err(Error::InvalidArgument(_))
    ));
    assert!(h.broker.requests.lock().unwrap().is_empty());
}

// ============================================================================
// ListOffsets fan-out
// ============================================================================

#[tokio::test]
async fn test_list_offsets_fans_out_per_leader() {
    let h = harness(AdminClientConfig::default());

    let partitions = vec![
        ListOffsetsRequestInfo::new("t", 0, OffsetSpec::Latest).unwrap(),
        ListOffsetsRequestInfo::new("t", 1, OffsetSpec::Earliest).unwrap(),
        ListOffsetsRequestInfo::new("u", 2, OffsetSpec::Timestamp(1_700_000_000_000)).unwrap(),
        ListOffsetsRequestInfo::new("u", 3, OffsetSpec::Latest).unwrap(),
    ];
    let mut options = AdminOptions::for_op(AdminOp::ListOffsets);
    options
        .set_isolation_level(IsolationLevel::ReadCommitted)
        .unwrap();
    h.client.list_offsets(partitions, &options, None).unwrap();

    let event = h.client.queue().poll(POLL).await.expect("event");
    let result = event.result.into_list_offsets().unwrap();
    assert!(result.is_ok());

    let got: Vec<(&str, i32, i64)> = result
        .items()
        .iter()
        .map(|r| (r.topic.as_str(), r.partition, r.offset))
        .collect();
    // even partitions live on broker 1, odd ones on broker 2
    assert_eq!(
        got,
        vec![("t", 0, 1000), ("t", 1, 2001), ("u", 2, 1002), ("u", 3, 2003)]
    );
    assert!(result.items().iter().all(|r| r.error.is_none()));

    let mut brokers = h.broker.brokers_for(ApiKey::ListOffsets);
    brokers.sort_by_key(|b| b.value());
    assert_eq!(brokers, vec![BrokerId::new(1), BrokerId::new(2)]);
}

#[tokio::test]
async fn test_list_offsets_regroups_after_leader_moves() {
    let h = harness(retry_config(3));
    // the first lookups still point every partition at broker 1
    h.resolver.stale_leader_lookups.store(4, Ordering::SeqCst);

    let partitions = (0..4)
        .map(|p| ListOffsetsRequestInfo::new("t", p, OffsetSpec::Latest).unwrap())
        .collect();
    h.client
        .list_offsets(partitions, &AdminOptions::new(), None)
        .unwrap();

    let event = h.client.queue().poll(POLL).await.expect("event");
    let result = event.result.into_list_offsets().unwrap();
    let got: Vec<(i32, i64)> = result
        .items()
        .iter()
        .map(|r| (r.partition, r.offset))
        .collect();
    assert_eq!(got, vec![(0, 1000), (1, 2001), (2, 1002), (3, 2003)]);
    assert!(result.items().iter().all(|r| r.error.is_none()));

    assert_eq!(
        h.broker.brokers_for(ApiKey::ListOffsets),
        vec![BrokerId::new(1), BrokerId::new(2)]
    );
    assert!(h.refresher.refreshes.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_list_offsets_stops_regrouping_without_retries() {
    let h = harness(retry_config(0));
    h.resolver.stale_leader_lookups.store(2, Ordering::SeqCst);

    let partitions = vec![
        ListOffsetsRequestInfo::new("t", 0, OffsetSpec::Latest).unwrap(),
        ListOffsetsRequestInfo::new("t", 1, OffsetSpec::Latest).unwrap(),
    ];
    h.client
        .list_offsets(partitions, &AdminOptions::new(), None)
        .unwrap();

    let event = h.client.queue().poll(POLL).await.expect("event");
    let result = event.result.into_list_offsets().unwrap();
    assert!(result.items()[0].error.is_none());
    assert_eq!(
        result.items()[1].error.as_ref().map(|e| e.code),
        Some(KafkaCode::NotLeaderForPartition)
    );
    assert_eq!(h.broker.brokers_for(ApiKey::ListOffsets), vec![BrokerId::new(1)]);
}

// ============================================================================
// Close and queue
// ============================================================================

#[tokio::test]
async fn test_close_cancels_outstanding_calls() {
    let h = harness(AdminClientConfig::default());
    // learn versions first so the hanging request is the real one
    h.client
        .describe_user_scram_credentials(vec![], &AdminOptions::new(), None)
        .unwrap();
    h.client.queue().poll(POLL).await.expect("first event");

    h.broker.hang.store(true, Ordering::SeqCst);
    h.client
        .describe_user_scram_credentials(vec![], &AdminOptions::new(), None)
        .unwrap();
    while h.client.in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    h.client.close().await;
    assert!(h.client.is_closed());

    let event = h.client.queue().try_poll().expect("cancelled event");
    assert_eq!(event.error(), Some(&Error::Cancelled));
    assert_eq!(h.client.in_flight(), 0);

    assert!(matches!(
        h.client
            .describe_user_scram_credentials(vec![], &AdminOptions::new(), None),
        Err(Error::Cancelled)
    ));
}

#[tokio::test]
async fn test_dropped_client_still_posts_cancelled_events() {
    let h = harness(AdminClientConfig::default());
    let queue = ResultQueue::new();
    h.broker.hang.store(true, Ordering::SeqCst);

    h.client
        .delete_topics(vec!["orders".to_string()], &AdminOptions::new(), Some(&queue))
        .unwrap();
    while h.client.in_flight() == 0 {
        tokio::task::yield_now().await;
    }
    drop(h);

    let event = queue
        .poll(Some(Duration::from_secs(5)))
        .await
        .expect("cancelled event");
    assert_eq!(event.op(), AdminOp::DeleteTopics);
    assert_eq!(event.error(), Some(&Error::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_waits_for_calls_submitted_concurrently() {
    let h = harness(AdminClientConfig::default());
    h.broker.hang.store(true, Ordering::SeqCst);

    let client = h.client.clone();
    let submitter = tokio::spawn(async move {
        let mut accepted = 0usize;
        loop {
            match client.describe_user_scram_credentials(vec![], &AdminOptions::new(), None) {
                Ok(()) => accepted += 1,
                Err(Error::Cancelled) => return accepted,
                Err(e) => panic!("unexpected error {:?}", e),
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    h.client.close().await;
    let posted = h.client.queue().len();

    let accepted = submitter.await.unwrap();
    assert!(accepted > 0);
    assert_eq!(posted, accepted);
}

#[tokio::test]
async fn test_yield_wakes_blocked_poller() {
    let h = harness(AdminClientConfig::default());
    let queue = h.client.queue().clone();

    let waiter = tokio::spawn(async move { queue.poll(None).await });
    tokio::task::yield_now().await;
    h.client.queue().yield_waiter();

    let woken = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter woke")
        .unwrap();
    assert!(woken.is_none());
}

#[tokio::test]
async fn test_events_arrive_in_completion_order() {
    let h = harness(AdminClientConfig::default());

    h.client
        .create_topics(vec![topic("first")], &AdminOptions::new(), None)
        .unwrap();
    let first = h.client.queue().poll(POLL).await.unwrap();
    h.client
        .describe_user_scram_credentials(vec![], &AdminOptions::new(), None)
        .unwrap();
    let second = h.client.queue().poll(POLL).await.unwrap();

    assert_eq!(first.op(), AdminOp::CreateTopics);
    assert_eq!(second.op(), AdminOp::DescribeUserScramCredentials);
    assert!(h.client.queue().is_empty());
}
