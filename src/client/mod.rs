//! Admin client runtime.
//!
//! [`AdminClient`] validates each call synchronously, then spawns a task that
//! drives the [`Dispatcher`] and posts exactly one
//! [`AdminEvent`](crate::admin::AdminEvent) to the call's [`ResultQueue`].
//! Nothing is sent for a call that fails validation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kafkaesque_admin::prelude::*;
//!
//! # async fn run(
//! #     transport: Arc<dyn BrokerTransport>,
//! #     resolver: Arc<dyn BrokerResolver>,
//! #     refresher: Arc<dyn MetadataRefresher>,
//! # ) -> kafkaesque_admin::error::Result<()> {
//! let client = AdminClient::new(AdminClientConfig::from_env()?, transport, resolver, refresher)?;
//!
//! client.describe_user_scram_credentials(vec![], &AdminOptions::new(), None)?;
//! if let Some(event) = client.queue().poll(None).await {
//!     println!("{:?}", event.result);
//! }
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod inflight;
pub mod retry;
pub mod traits;

pub use config::AdminClientConfig;
pub use dispatcher::{Dispatched, Dispatcher};
pub use inflight::InFlightRequests;
pub use retry::{admin_backoff, admin_policy};
pub use traits::{
    BrokerResolver, BrokerTransport, MetadataRefresher, OutboundRequest, RequestTarget,
    ResponseSink,
};

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::admin::{
    AclBinding, AclBindingFilter, AdminEvent, AdminOp, AdminOptions, AdminResult,
    AdminResultKind, ConfigResource, DeleteConsumerGroupOffsets, GroupResult, ItemError,
    ListOffsetsRequestInfo, ListOffsetsResultInfo, NewPartitions, NewTopic, ResourceType,
    UserScramCredentialAlteration, UserScramCredentialAlterationResult,
    check_duplicate_partitions, check_duplicate_resources, check_duplicate_topics,
};
use crate::error::{Error, KafkaCode, Result};
use crate::protocol::request::{
    AlterConfigsRequest, AlterUserScramCredentialsRequest, CreateAclsRequest,
    CreatePartitionsRequest, CreateTopicsRequest, DeleteAclsRequest, DeleteGroupsRequest,
    DeleteTopicsRequest, DescribeAclsRequest, DescribeConfigsRequest,
    DescribeUserScramCredentialsRequest, ListOffsetsRequest, OffsetDeleteRequest,
};
use crate::protocol::actions::classify;
use crate::protocol::{ApiKey, ProtocolResponse};
use crate::protocol::versions::BrokerApiVersions;
use crate::queue::ResultQueue;
use crate::types::BrokerId;

struct ClientInner {
    dispatcher: Arc<Dispatcher>,
    queue: ResultQueue,
    closed: AtomicBool,
    tasks: Mutex<JoinSet<()>>,
}

impl Drop for ClientInner {
    /// Dropping the last handle without `close()` still ends every pending
    /// call with a `Cancelled` event.
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self.dispatcher.shutdown();
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        let pending = tasks.len();
        tasks.detach_all();
        debug!(cancelled, pending, "Admin client dropped without close");
    }
}

/// Handle to an admin client. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("dispatcher", &self.inner.dispatcher)
            .field("queue", &self.inner.queue)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl AdminClient {
    pub fn new(
        config: AdminClientConfig,
        transport: Arc<dyn BrokerTransport>,
        resolver: Arc<dyn BrokerResolver>,
        refresher: Arc<dyn MetadataRefresher>,
    ) -> Result<Self> {
        config.validate()?;
        debug!(client_id = %config.client_id, "Creating admin client");
        Ok(Self {
            inner: Arc::new(ClientInner {
                dispatcher: Arc::new(Dispatcher::new(config, transport, resolver, refresher)),
                queue: ResultQueue::new(),
                closed: AtomicBool::new(false),
                tasks: Mutex::new(JoinSet::new()),
            }),
        })
    }

    /// The client's default result queue.
    pub fn queue(&self) -> &ResultQueue {
        &self.inner.queue
    }

    pub fn config(&self) -> &AdminClientConfig {
        self.inner.dispatcher.config()
    }

    /// Number of requests waiting for a broker response.
    pub fn in_flight(&self) -> usize {
        self.inner.dispatcher.inflight().len()
    }

    /// Provide a broker's ApiVersions up front instead of fetching them.
    pub fn set_api_versions(&self, broker: BrokerId, versions: BrokerApiVersions) {
        self.inner.dispatcher.set_api_versions(broker, versions);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Refuse new calls, cancel outstanding requests and wait for every
    /// spawned call to post its event.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self.inner.dispatcher.shutdown();
        let mut tasks = std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let pending = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Admin task ended abnormally");
            }
        }
        info!(cancelled, pending, "Admin client closed");
    }

    /// Spawn `work` and post its result as one event.
    fn submit<F, Fut>(
        &self,
        op: AdminOp,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
        work: F,
    ) -> Result<()>
    where
        F: FnOnce(Arc<Dispatcher>, Duration) -> Fut,
        Fut: Future<Output = AdminResultKind> + Send + 'static,
    {
        if self.is_closed() {
            return Err(Error::Cancelled);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::Config("admin calls must be made from within a Tokio runtime".to_string())
        })?;

        let dispatcher = Arc::clone(&self.inner.dispatcher);
        let timeout = options
            .request_timeout()
            .unwrap_or(dispatcher.config().request_timeout);
        let queue = queue.cloned().unwrap_or_else(|| self.inner.queue.clone());
        let opaque = options.opaque();
        let fut = work(dispatcher, timeout);

        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // close() raises the flag before taking the set
        if self.is_closed() {
            return Err(Error::Cancelled);
        }
        // reap finished calls so the set only tracks live ones
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(
            async move {
                let result = fut.await;
                debug!(%op, error = ?result.error(), "Admin call finished");
                queue.push(AdminEvent::new(opaque, result));
            },
            &handle,
        );
        debug!(%op, ?timeout, "Admin call submitted");
        Ok(())
    }

    /// Target for calls that may go to any broker, honoring the override.
    fn any_broker(options: &AdminOptions) -> RequestTarget {
        options
            .broker()
            .map(RequestTarget::Broker)
            .unwrap_or(RequestTarget::AnyBroker)
    }

    fn controller(options: &AdminOptions) -> RequestTarget {
        options
            .broker()
            .map(RequestTarget::Broker)
            .unwrap_or(RequestTarget::Controller)
    }

    pub fn create_topics(
        &self,
        topics: Vec<NewTopic>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::CreateTopics)?;
        require_items(&topics, "topics")?;
        check_duplicate_topics(topics.iter().map(|t| t.name.as_str()))?;

        let names = topics.iter().map(|t| t.name.clone()).collect();
        let request = CreateTopicsRequest {
            topics,
            timeout_ms: options.operation_timeout_ms(self.config().operation_timeout_ms),
            validate_only: options.validate_only(),
        };
        let target = Self::controller(options);
        self.submit(AdminOp::CreateTopics, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, names, timeout).await;
            AdminResultKind::CreateTopics(dispatched.into_admin_result(|r| r.into_topic_results()))
        })
    }

    pub fn delete_topics(
        &self,
        topics: Vec<String>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DeleteTopics)?;
        require_items(&topics, "topics")?;
        require_names(&topics, "topic")?;
        check_duplicate_topics(topics.iter().map(String::as_str))?;

        let request = DeleteTopicsRequest {
            topics: topics.clone(),
            timeout_ms: options.operation_timeout_ms(self.config().operation_timeout_ms),
        };
        let target = Self::controller(options);
        self.submit(AdminOp::DeleteTopics, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, topics, timeout).await;
            AdminResultKind::DeleteTopics(dispatched.into_admin_result(|r| r.into_topic_results()))
        })
    }

    pub fn create_partitions(
        &self,
        partitions: Vec<NewPartitions>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::CreatePartitions)?;
        require_items(&partitions, "partitions")?;
        check_duplicate_topics(partitions.iter().map(|p| p.topic.as_str()))?;

        let names = partitions.iter().map(|p| p.topic.clone()).collect();
        let request = CreatePartitionsRequest {
            partitions,
            timeout_ms: options.operation_timeout_ms(self.config().operation_timeout_ms),
            validate_only: options.validate_only(),
        };
        let target = Self::controller(options);
        self.submit(AdminOp::CreatePartitions, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, names, timeout).await;
            AdminResultKind::CreatePartitions(
                dispatched.into_admin_result(|r| r.into_topic_results()),
            )
        })
    }

    pub fn describe_configs(
        &self,
        resources: Vec<ConfigResource>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DescribeConfigs)?;
        require_items(&resources, "config resources")?;
        check_duplicate_resources(&resources)?;

        let target = config_target(&resources, options)?;
        let request = DescribeConfigsRequest {
            resources,
            include_synonyms: true,
        };
        self.submit(AdminOp::DescribeConfigs, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, vec![], timeout).await;
            AdminResultKind::DescribeConfigs(dispatched.into_admin_result(|r| r.into_resources()))
        })
    }

    pub fn alter_configs(
        &self,
        resources: Vec<ConfigResource>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::AlterConfigs)?;
        require_items(&resources, "config resources")?;
        check_duplicate_resources(&resources)?;

        let target = config_target(&resources, options)?;
        let request = AlterConfigsRequest {
            resources,
            validate_only: options.validate_only(),
        };
        self.submit(AdminOp::AlterConfigs, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, vec![], timeout).await;
            AdminResultKind::AlterConfigs(dispatched.into_admin_result(|r| r.into_resources()))
        })
    }

    pub fn create_acls(
        &self,
        bindings: Vec<AclBinding>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::CreateAcls)?;
        require_items(&bindings, "ACL bindings")?;

        let expected = bindings.len();
        let request = CreateAclsRequest { bindings };
        let target = Self::any_broker(options);
        self.submit(AdminOp::CreateAcls, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, vec![], timeout).await;
            let result = dispatched.into_admin_result(|r| r.into_acl_results());
            AdminResultKind::CreateAcls(expect_positional(result, expected))
        })
    }

    pub fn describe_acls(
        &self,
        filter: AclBindingFilter,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DescribeAcls)?;

        let request = DescribeAclsRequest { filter };
        let target = Self::any_broker(options);
        self.submit(AdminOp::DescribeAcls, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, vec![], timeout).await;
            AdminResultKind::DescribeAcls(dispatched.into_admin_result(|r| r.into_bindings()))
        })
    }

    pub fn delete_acls(
        &self,
        filters: Vec<AclBindingFilter>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DeleteAcls)?;
        require_items(&filters, "ACL binding filters")?;

        let expected = filters.len();
        let request = DeleteAclsRequest { filters };
        let target = Self::any_broker(options);
        self.submit(AdminOp::DeleteAcls, options, queue, |d, timeout| async move {
            let dispatched = d.call(request, target, vec![], timeout).await;
            let result = dispatched.into_admin_result(|r| r.into_delete_results());
            AdminResultKind::DeleteAcls(expect_positional(result, expected))
        })
    }

    /// Delete consumer groups. Each group goes to its own coordinator; the
    /// result lists the groups in submission order.
    pub fn delete_groups(
        &self,
        groups: Vec<String>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DeleteGroups)?;
        require_items(&groups, "groups")?;
        require_names(&groups, "group")?;
        let mut seen = HashSet::new();
        if let Some(dup) = groups.iter().find(|g| !seen.insert(g.as_str())) {
            return Err(Error::InvalidArgument(format!(
                "duplicate groups not allowed: {}",
                dup
            )));
        }

        self.submit(AdminOp::DeleteGroups, options, queue, |d, timeout| {
            delete_groups(d, groups, timeout)
        })
    }

    pub fn delete_consumer_group_offsets(
        &self,
        offsets: DeleteConsumerGroupOffsets,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DeleteConsumerGroupOffsets)?;
        require_items(&offsets.partitions, "partitions")?;
        check_duplicate_partitions(&offsets.partitions)?;

        let DeleteConsumerGroupOffsets { group, partitions } = offsets;
        let topics = unique_topics(partitions.iter().map(|p| p.topic.as_str()));
        let target = RequestTarget::Coordinator(group.clone());
        let request = OffsetDeleteRequest {
            group: group.clone(),
            partitions,
        };
        self.submit(
            AdminOp::DeleteConsumerGroupOffsets,
            options,
            queue,
            |d, timeout| async move {
                let dispatched = d.call(request, target, topics, timeout).await;
                let result = dispatched.into_admin_result(|r| {
                    let error = r
                        .request_error()
                        .map(|(code, message)| ItemError::new(code, message));
                    vec![GroupResult {
                        group,
                        error,
                        partitions: r.into_partitions(),
                    }]
                });
                AdminResultKind::DeleteConsumerGroupOffsets(result)
            },
        )
    }

    /// Look up offsets. Partitions are grouped by leader and each leader gets
    /// one request; results come back in submission order.
    ///
    /// Partitions answered with a stale-leadership error are resolved again
    /// and regrouped on the next round, up to `max_retries` rounds.
    pub fn list_offsets(
        &self,
        partitions: Vec<ListOffsetsRequestInfo>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::ListOffsets)?;
        require_items(&partitions, "partitions")?;
        let mut seen = HashSet::new();
        if let Some(dup) = partitions
            .iter()
            .find(|p| !seen.insert((p.topic.as_str(), p.partition)))
        {
            return Err(Error::InvalidArgument(format!(
                "duplicate partitions not allowed: {} [{}]",
                dup.topic, dup.partition
            )));
        }

        let isolation_level = options.isolation_level();
        self.submit(AdminOp::ListOffsets, options, queue, move |d, timeout| {
            list_offsets(d, partitions, isolation_level, timeout)
        })
    }

    /// Describe SCRAM credentials for `users`, or for every user when empty.
    pub fn describe_user_scram_credentials(
        &self,
        users: Vec<String>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::DescribeUserScramCredentials)?;
        require_names(&users, "user")?;
        let mut seen = HashSet::new();
        if let Some(dup) = users.iter().find(|u| !seen.insert(u.as_str())) {
            return Err(Error::InvalidArgument(format!(
                "duplicate users not allowed: {}",
                dup
            )));
        }

        let request = DescribeUserScramCredentialsRequest { users };
        let target = Self::any_broker(options);
        self.submit(
            AdminOp::DescribeUserScramCredentials,
            options,
            queue,
            |d, timeout| async move {
                let dispatched = d.call(request, target, vec![], timeout).await;
                AdminResultKind::DescribeUserScramCredentials(
                    dispatched.into_admin_result(|r| r.into_descriptions()),
                )
            },
        )
    }

    /// Apply SCRAM credential changes. The result has one item per
    /// alteration, in submission order.
    pub fn alter_user_scram_credentials(
        &self,
        alterations: Vec<UserScramCredentialAlteration>,
        options: &AdminOptions,
        queue: Option<&ResultQueue>,
    ) -> Result<()> {
        options.validate_for(AdminOp::AlterUserScramCredentials)?;
        require_items(&alterations, "alterations")?;

        let users: Vec<String> = alterations.iter().map(|a| a.user().to_string()).collect();
        let request = AlterUserScramCredentialsRequest { alterations };
        let target = Self::controller(options);
        self.submit(
            AdminOp::AlterUserScramCredentials,
            options,
            queue,
            |d, timeout| async move {
                let dispatched = d.call(request, target, vec![], timeout).await;
                let result = dispatched.into_admin_result(|r| {
                    match_alteration_results(&users, r.into_alteration_results())
                });
                AdminResultKind::AlterUserScramCredentials(result)
            },
        )
    }
}

fn require_items<T>(items: &[T], what: &str) -> Result<()> {
    if items.is_empty() {
        return Err(Error::InvalidArgument(format!("no {} specified", what)));
    }
    Ok(())
}

fn require_names(names: &[String], what: &str) -> Result<()> {
    if names.iter().any(String::is_empty) {
        return Err(Error::InvalidArgument(format!(
            "{} name must not be empty",
            what
        )));
    }
    Ok(())
}

fn unique_topics<'a>(topics: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    topics
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

fn item_error(error: &Error) -> ItemError {
    ItemError::new(error.code(), Some(error.to_string()))
}

/// Broker config resources must be sent to that broker, so at most one may
/// appear in a request.
fn config_target(resources: &[ConfigResource], options: &AdminOptions) -> Result<RequestTarget> {
    let mut brokers = resources
        .iter()
        .filter(|r| r.resource_type == ResourceType::Broker && !r.name.is_empty());
    let Some(first) = brokers.next() else {
        return Ok(AdminClient::any_broker(options));
    };
    if brokers.next().is_some() {
        return Err(Error::InvalidArgument(
            "only one broker resource may be specified per request".to_string(),
        ));
    }
    let id: i32 = first.name.parse().map_err(|_| {
        Error::InvalidArgument(format!("invalid broker id \"{}\"", first.name))
    })?;
    if let Some(broker) = options.broker()
        && broker.value() != id
    {
        return Err(Error::InvalidArgument(format!(
            "broker resource {} conflicts with broker option {}",
            id, broker
        )));
    }
    Ok(RequestTarget::Broker(BrokerId::new(id)))
}

/// Positional results must match the submitted count exactly.
fn expect_positional<T>(result: AdminResult<T>, expected: usize) -> AdminResult<T> {
    if result.error().is_some() || result.len() == expected {
        return result;
    }
    AdminResult::failed(Error::MalformedField(format!(
        "expected {} results, broker returned {}",
        expected,
        result.len()
    )))
}

/// One result per submitted alteration, looked up by user.
fn match_alteration_results(
    users: &[String],
    results: Vec<UserScramCredentialAlterationResult>,
) -> Vec<UserScramCredentialAlterationResult> {
    let by_user: HashMap<&str, &UserScramCredentialAlterationResult> =
        results.iter().map(|r| (r.user.as_str(), r)).collect();
    users
        .iter()
        .map(|user| match by_user.get(user.as_str()) {
            Some(result) => UserScramCredentialAlterationResult {
                user: user.clone(),
                error: result.error.clone(),
            },
            None => UserScramCredentialAlterationResult {
                user: user.clone(),
                error: Some(ItemError::new(
                    KafkaCode::BadMsg,
                    Some(format!("Broker returned no result for user {}", user)),
                )),
            },
        })
        .collect()
}

async fn delete_groups(
    dispatcher: Arc<Dispatcher>,
    groups: Vec<String>,
    timeout: Duration,
) -> AdminResultKind {
    let mut calls = JoinSet::new();
    for group in &groups {
        let d = Arc::clone(&dispatcher);
        let group = group.clone();
        calls.spawn(async move {
            let request = DeleteGroupsRequest {
                groups: vec![group.clone()],
            };
            let target = RequestTarget::Coordinator(group.clone());
            let dispatched = d.call(request, target, vec![], timeout).await;
            (group, dispatched)
        });
    }

    let mut found: HashMap<String, GroupResult> = HashMap::new();
    while let Some(joined) = calls.join_next().await {
        let (group, dispatched) = match joined {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "DeleteGroups task ended abnormally");
                continue;
            }
        };
        let result = dispatched.into_admin_result(|r| r.into_group_results());
        let error = result.error().map(item_error);
        let mut items = result.into_items();
        let entry = match items.iter().position(|r| r.group == group) {
            Some(i) => {
                let mut r = items.swap_remove(i);
                if r.error.is_none() {
                    r.error = error;
                }
                r
            }
            None => GroupResult {
                group: group.clone(),
                error: Some(error.unwrap_or_else(|| {
                    ItemError::new(
                        KafkaCode::BadMsg,
                        Some(format!("Broker returned no result for group {}", group)),
                    )
                })),
                partitions: Vec::new(),
            },
        };
        found.insert(group, entry);
    }

    let items = groups
        .into_iter()
        .map(|group| {
            found.remove(&group).unwrap_or_else(|| GroupResult {
                error: Some(ItemError::new(KafkaCode::Destroy, None)),
                group,
                partitions: Vec::new(),
            })
        })
        .collect();
    AdminResultKind::DeleteGroups(AdminResult::ok(items))
}

async fn list_offsets(
    dispatcher: Arc<Dispatcher>,
    partitions: Vec<ListOffsetsRequestInfo>,
    isolation_level: crate::admin::IsolationLevel,
    timeout: Duration,
) -> AdminResultKind {
    let deadline = Instant::now() + timeout;
    let keys: Vec<(String, i32)> = partitions
        .iter()
        .map(|p| (p.topic.clone(), p.partition))
        .collect();

    let mut failed: HashMap<(String, i32), ItemError> = HashMap::new();
    let mut found: HashMap<(String, i32), ListOffsetsResultInfo> = HashMap::new();
    let mut pending = partitions;
    let mut round = 0;

    while !pending.is_empty() {
        let by_leader = group_by_leader(&dispatcher, pending, deadline, &mut failed).await;
        let mut calls = JoinSet::new();
        for (leader, infos) in by_leader {
            let d = Arc::clone(&dispatcher);
            calls.spawn(async move {
                let topics = unique_topics(infos.iter().map(|p| p.topic.as_str()));
                debug!(%leader, partitions = infos.len(), "Listing offsets");
                let request = ListOffsetsRequest {
                    isolation_level,
                    partitions: infos.clone(),
                };
                let remaining = deadline.saturating_duration_since(Instant::now());
                let dispatched = d
                    .call(request, RequestTarget::Broker(leader), topics, remaining)
                    .await;
                (infos, dispatched)
            });
        }

        round += 1;
        let may_regroup =
            round <= dispatcher.config().max_retries && Instant::now() < deadline;
        let mut moved = Vec::new();
        while let Some(joined) = calls.join_next().await {
            let (infos, dispatched) = match joined {
                Ok(out) => out,
                Err(e) => {
                    warn!(error = %e, "ListOffsets task ended abnormally");
                    continue;
                }
            };
            let result = dispatched.into_admin_result(|r| r.into_results());
            if let Some(e) = result.error() {
                let error = item_error(e);
                for info in &infos {
                    failed.insert((info.topic.clone(), info.partition), error.clone());
                }
            }
            for result in result.into_items() {
                let key = (result.topic.clone(), result.partition);
                let stale = result
                    .error
                    .as_ref()
                    .filter(|e| classify(ApiKey::ListOffsets, e.code).needs_refresh());
                let requeue = stale.filter(|_| may_regroup).and_then(|e| {
                    infos
                        .iter()
                        .find(|i| i.topic == key.0 && i.partition == key.1)
                        .map(|info| (info.clone(), e.clone()))
                });
                match requeue {
                    // keep the last error in case the next round never answers
                    Some((info, error)) => {
                        failed.insert(key, error);
                        moved.push(info);
                    }
                    None => {
                        found.insert(key, result);
                    }
                }
            }
        }

        if !moved.is_empty() {
            debug!(partitions = moved.len(), round, "Leadership moved, regrouping");
        }
        pending = moved;
    }

    let items = keys
        .into_iter()
        .map(|(topic, partition)| {
            let key = (topic, partition);
            if let Some(info) = found.remove(&key) {
                return info;
            }
            let error = failed.remove(&key).unwrap_or_else(|| {
                ItemError::new(
                    KafkaCode::BadMsg,
                    Some(format!(
                        "Broker returned no result for {} [{}]",
                        key.0, key.1
                    )),
                )
            });
            ListOffsetsResultInfo {
                topic: key.0,
                partition: key.1,
                offset: -1,
                timestamp: -1,
                error: Some(error),
            }
        })
        .collect();
    AdminResultKind::ListOffsets(AdminResult::ok(items))
}

/// Resolve each partition's leader and batch partitions per leader.
/// Partitions without a leader are recorded in `failed`.
async fn group_by_leader(
    dispatcher: &Dispatcher,
    partitions: Vec<ListOffsetsRequestInfo>,
    deadline: Instant,
    failed: &mut HashMap<(String, i32), ItemError>,
) -> Vec<(BrokerId, Vec<ListOffsetsRequestInfo>)> {
    let mut by_leader: Vec<(BrokerId, Vec<ListOffsetsRequestInfo>)> = Vec::new();
    for info in partitions {
        let target = RequestTarget::Leader {
            topic: info.topic.clone(),
            partition: info.partition,
        };
        match dispatcher.resolve(&target, deadline).await {
            Ok(leader) => match by_leader.iter_mut().find(|(b, _)| *b == leader) {
                Some((_, infos)) => infos.push(info),
                None => by_leader.push((leader, vec![info])),
            },
            Err(e) => {
                debug!(%target, error = %e, "No leader for partition");
                failed.insert((info.topic, info.partition), item_error(&e));
            }
        }
    }
    by_leader
}
