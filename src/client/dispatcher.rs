//! Request pipeline shared by every admin operation.
//!
//! One call through [`Dispatcher::call`] runs the whole lifecycle of a single
//! protocol request:
//!
//! 1. Resolve the target broker.
//! 2. Look up (or fetch and cache) the broker's ApiVersions.
//! 3. Negotiate a version and serialize the request once.
//! 4. Send, wait for the matching response, parse it.
//! 5. Classify the outcome and either finish, or refresh metadata and/or
//!    resend the same bytes under a fresh correlation id after a backoff.
//!
//! Everything happens under one absolute deadline. When it passes, the call
//! ends with [`Error::Timeout`] carrying the last error seen.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use super::config::AdminClientConfig;
use super::inflight::InFlightRequests;
use super::retry::admin_backoff;
use super::traits::{
    BrokerResolver, BrokerTransport, MetadataRefresher, OutboundRequest, RequestTarget,
    ResponseSink,
};
use crate::admin::AdminResult;
use crate::error::{Error, KafkaCode, Result};
use crate::metrics::{self, InFlightGuard};
use crate::parser::decode;
use crate::protocol::actions::{ErrorAction, classify, classify_error};
use crate::protocol::request::ApiVersionsRequest;
use crate::protocol::versions::{
    BrokerApiVersions, uses_flexible_encoding, uses_flexible_response_header,
};
use crate::protocol::{
    ApiKey, FramedRequest, ProtocolRequest, ProtocolResponse, RequestHeader, encode_request,
    parse_response_header,
};
use crate::types::BrokerId;

/// Terminal outcome of one dispatched request.
///
/// `response` is kept whenever the broker answered, even if `error` is set:
/// a request-level rejection may still list per-item results.
#[derive(Debug)]
pub struct Dispatched<T> {
    pub error: Option<Error>,
    pub response: Option<T>,
}

impl<T> Dispatched<T> {
    fn ok(response: T) -> Self {
        Self {
            error: None,
            response: Some(response),
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            error: Some(error),
            response: None,
        }
    }

    /// Turn into an [`AdminResult`], converting the response into items.
    pub fn into_admin_result<I, F>(self, items: F) -> AdminResult<I>
    where
        F: FnOnce(T) -> Vec<I>,
    {
        AdminResult::with_error(self.error, self.response.map(items).unwrap_or_default())
    }

    fn outcome(&self) -> &'static str {
        match &self.error {
            None => "success",
            Some(Error::Timeout { .. }) => "timeout",
            Some(Error::Broker { .. }) => "broker_error",
            Some(_) => "error",
        }
    }
}

/// What to do after one attempt.
enum Step<T> {
    Done(Dispatched<T>, ErrorAction),
    Retry {
        error: Error,
        action: ErrorAction,
        response: Option<T>,
        /// The request itself succeeded; only some items want a retry.
        item_level: bool,
    },
}

/// Per-call state threaded through the attempts.
struct Call {
    api: ApiKey,
    target: RequestTarget,
    refresh_topics: Vec<String>,
    deadline: Instant,
    last: Option<KafkaCode>,
    broker: Option<BrokerId>,
    framed: Option<FramedRequest>,
}

pub struct Dispatcher {
    config: AdminClientConfig,
    transport: Arc<dyn BrokerTransport>,
    resolver: Arc<dyn BrokerResolver>,
    refresher: Arc<dyn MetadataRefresher>,
    inflight: Arc<InFlightRequests>,
    api_versions: DashMap<BrokerId, Arc<BrokerApiVersions>>,
    shutdown: watch::Sender<bool>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("client_id", &self.config.client_id)
            .field("in_flight", &self.inflight.len())
            .field("known_brokers", &self.api_versions.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        config: AdminClientConfig,
        transport: Arc<dyn BrokerTransport>,
        resolver: Arc<dyn BrokerResolver>,
        refresher: Arc<dyn MetadataRefresher>,
    ) -> Self {
        Self {
            config,
            transport,
            resolver,
            refresher,
            inflight: Arc::new(InFlightRequests::new()),
            api_versions: DashMap::new(),
            shutdown: watch::Sender::new(false),
        }
    }

    pub fn config(&self) -> &AdminClientConfig {
        &self.config
    }

    pub fn inflight(&self) -> &Arc<InFlightRequests> {
        &self.inflight
    }

    /// Seed the ApiVersions cache, e.g. from a bootstrap handshake.
    pub fn set_api_versions(&self, broker: BrokerId, versions: BrokerApiVersions) {
        self.api_versions.insert(broker, Arc::new(versions));
    }

    /// Forget what `broker` advertised; the next request re-fetches it.
    pub fn forget_api_versions(&self, broker: BrokerId) {
        self.api_versions.remove(&broker);
    }

    /// Stop accepting work and fail every outstanding request with
    /// [`Error::Cancelled`]. Returns how many requests were in flight.
    pub fn shutdown(&self) -> usize {
        self.shutdown.send_replace(true);
        self.inflight.drain(Error::Cancelled)
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run `request` against `target` until it succeeds, fails permanently,
    /// runs out of retries or hits `timeout`.
    ///
    /// `refresh_topics` is passed to the metadata refresher when the broker
    /// reports stale routing.
    pub async fn call<R: ProtocolRequest>(
        &self,
        request: R,
        target: RequestTarget,
        refresh_topics: Vec<String>,
        timeout: Duration,
    ) -> Dispatched<R::Response> {
        let started = Instant::now();
        let mut call = Call {
            api: R::API_KEY,
            target,
            refresh_topics,
            deadline: started + timeout,
            last: None,
            broker: None,
            framed: None,
        };

        let dispatched = self.run(&mut call, request).await;
        metrics::record_request(
            call.api.as_str(),
            dispatched.outcome(),
            started.elapsed().as_secs_f64(),
        );
        dispatched
    }

    async fn run<R: ProtocolRequest>(
        &self,
        call: &mut Call,
        request: R,
    ) -> Dispatched<R::Response> {
        let mut request = Some(request);
        let mut backoff = admin_backoff(&self.config);

        loop {
            let step = self.attempt(call, &mut request).await;
            let (error, action, response, item_level) = match step {
                Step::Done(dispatched, action) => {
                    if action.needs_refresh() {
                        match &dispatched.error {
                            Some(e) => self.refresh(call, e),
                            None => self.refresh(call, "stale partition leadership"),
                        }
                    }
                    return self.finish(call, dispatched);
                }
                Step::Retry {
                    error,
                    action,
                    response,
                    item_level,
                } => (error, action, response, item_level),
            };

            call.last = Some(error.code());
            metrics::record_retry(call.api.as_str(), &error.code().to_string());

            if action.needs_refresh() {
                self.refresh(call, &error);
                call.broker = None;
            }

            let Some(delay) = backoff.next() else {
                warn!(
                    api = %call.api,
                    target = %call.target,
                    error = %error,
                    "Retries exhausted"
                );
                let dispatched = if item_level {
                    Dispatched {
                        error: None,
                        response,
                    }
                } else {
                    Dispatched {
                        error: Some(error),
                        response,
                    }
                };
                return self.finish(call, dispatched);
            };

            if Instant::now() + delay >= call.deadline {
                debug!(api = %call.api, ?delay, "Backoff would pass the deadline");
                return self.finish(call, Dispatched::failed(Error::Timeout { last: None }));
            }

            debug!(
                api = %call.api,
                target = %call.target,
                error = %error,
                action = %action,
                ?delay,
                "Retrying request"
            );
            let mut shutdown = self.shutdown.subscribe();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait_for(|closed| *closed) => {
                    return self.finish(call, Dispatched::failed(Error::Cancelled));
                }
            }

            if let Some(framed) = call.framed.as_mut()
                && let Err(e) = framed.restamp(self.inflight.next_correlation_id())
            {
                return self.finish(call, Dispatched::failed(e));
            }
        }
    }

    /// Fill in the last observed error on timeouts.
    fn finish<T>(&self, call: &Call, mut dispatched: Dispatched<T>) -> Dispatched<T> {
        if let Some(Error::Timeout { last }) = &mut dispatched.error
            && last.is_none()
        {
            *last = call.last;
        }
        dispatched
    }

    fn refresh(&self, call: &Call, cause: impl std::fmt::Display) {
        let reason = format!("{} to {} failed: {}", call.api, call.target, cause);
        debug!(api = %call.api, reason = %reason, "Requesting metadata refresh");
        metrics::record_metadata_refresh(call.api.as_str());
        self.refresher.refresh(&call.refresh_topics, true, &reason);
    }

    async fn attempt<R: ProtocolRequest>(
        &self,
        call: &mut Call,
        request: &mut Option<R>,
    ) -> Step<R::Response> {
        let broker = match call.broker {
            Some(broker) => broker,
            None => match self.resolve(&call.target, call.deadline).await {
                Ok(broker) => {
                    call.broker = Some(broker);
                    broker
                }
                Err(e) => return on_error(call.api, e),
            },
        };

        let versions = match self.broker_versions(broker, call.deadline).await {
            Ok(versions) => versions,
            Err(e) => return on_error(call.api, e),
        };

        if call.framed.is_none() {
            let Some(request) = request.take() else {
                return Step::Done(
                    Dispatched::failed(Error::MalformedField(format!(
                        "{} has no request to send",
                        call.api
                    ))),
                    ErrorAction::PERMANENT,
                );
            };
            let framed = versions
                .negotiate(call.api)
                .and_then(|version| {
                    debug!(api = %call.api, %broker, version, "Negotiated version");
                    self.frame(&request, version)
                });
            match framed {
                Ok(framed) => call.framed = Some(framed),
                Err(e) => return Step::Done(Dispatched::failed(e), ErrorAction::PERMANENT),
            }
        }
        let Some(framed) = call.framed.as_ref() else {
            return Step::Done(
                Dispatched::failed(Error::MalformedField("request was not framed".to_string())),
                ErrorAction::PERMANENT,
            );
        };

        // the payload is already serialized; a new broker must accept it as is
        let version = framed.api_version();
        if !versions
            .range(call.api)
            .is_some_and(|range| range.contains(version))
        {
            return Step::Done(
                Dispatched::failed(Error::Unsupported(format!(
                    "{} v{} is not supported by broker {}",
                    call.api, version, broker
                ))),
                ErrorAction::PERMANENT,
            );
        }

        match self.exchange::<R>(broker, framed, call.deadline).await {
            Ok(response) => inspect(call.api, response),
            Err(e) => on_error(call.api, e),
        }
    }

    /// Ask the resolver for `target`'s broker, giving up at `deadline`.
    pub async fn resolve(&self, target: &RequestTarget, deadline: Instant) -> Result<BrokerId> {
        match timeout_at(deadline, self.resolver.resolve(target)).await {
            Ok(result) => {
                let broker = result?;
                debug!(%target, %broker, "Resolved broker");
                Ok(broker)
            }
            Err(_) => Err(Error::Timeout { last: None }),
        }
    }

    /// Cached ApiVersions for `broker`, fetching them on first use.
    ///
    /// Asks at the highest version the client knows and falls back to v0
    /// when the broker rejects it.
    async fn broker_versions(
        &self,
        broker: BrokerId,
        deadline: Instant,
    ) -> Result<Arc<BrokerApiVersions>> {
        if let Some(versions) = self.api_versions.get(&broker) {
            return Ok(Arc::clone(versions.value()));
        }

        let mut version = crate::protocol::versions::find_version(ApiKey::ApiVersions)
            .map(|v| v.max_version)
            .unwrap_or(0);
        loop {
            let framed = self.frame(&ApiVersionsRequest, version)?;
            let response = self
                .exchange::<ApiVersionsRequest>(broker, &framed, deadline)
                .await?;
            match response.error_code {
                KafkaCode::None => {
                    let versions = Arc::new(BrokerApiVersions::from_response(&response));
                    debug!(%broker, apis = response.api_keys.len(), "Cached broker ApiVersions");
                    self.api_versions.insert(broker, Arc::clone(&versions));
                    return Ok(versions);
                }
                KafkaCode::UnsupportedVersion if version > 0 => {
                    debug!(%broker, version, "ApiVersions rejected, falling back to v0");
                    version = 0;
                }
                code => return Err(Error::broker(code, None)),
            }
        }
    }

    fn frame<R: ProtocolRequest>(&self, request: &R, version: i16) -> Result<FramedRequest> {
        let header = RequestHeader {
            api_key: R::API_KEY,
            api_version: version,
            correlation_id: self.inflight.next_correlation_id(),
            client_id: Some(&self.config.client_id),
        };
        encode_request(
            &header,
            uses_flexible_encoding(R::API_KEY, version),
            self.config.max_string_size,
            |buf| request.encode_body(buf, version),
        )
    }

    async fn exchange<R: ProtocolRequest>(
        &self,
        broker: BrokerId,
        framed: &FramedRequest,
        deadline: Instant,
    ) -> Result<R::Response> {
        let bytes = self.send_and_wait(broker, framed, deadline).await?;
        self.parse_response::<R>(framed, bytes)
    }

    async fn send_and_wait(
        &self,
        broker: BrokerId,
        framed: &FramedRequest,
        deadline: Instant,
    ) -> Result<Bytes> {
        let correlation_id = framed.correlation_id();
        let rx = self.inflight.register(correlation_id);
        let request = OutboundRequest {
            correlation_id,
            api_key: framed.api_key(),
            api_version: framed.api_version(),
            payload: framed.payload(),
        };
        debug!(
            api = %framed.api_key(),
            version = framed.api_version(),
            %broker,
            %correlation_id,
            size = framed.len(),
            "Sending request"
        );

        // registered before the check, so a concurrent shutdown drains it
        if self.is_shut_down() {
            self.inflight.cancel(correlation_id);
            return Err(Error::Cancelled);
        }

        let sink: Arc<dyn ResponseSink> = self.inflight.clone();
        if let Err(e) = self.transport.send(broker, request, sink) {
            self.inflight.cancel(correlation_id);
            return Err(e);
        }

        let _guard = InFlightGuard::track();
        match timeout_at(deadline, rx).await {
            Ok(Ok(result)) => result,
            // waiter dropped without an answer
            Ok(Err(_)) => Err(Error::Cancelled),
            Err(_) => {
                self.inflight.cancel(correlation_id);
                Err(Error::Timeout { last: None })
            }
        }
    }

    fn parse_response<R: ProtocolRequest>(
        &self,
        framed: &FramedRequest,
        bytes: Bytes,
    ) -> Result<R::Response> {
        if bytes.len() > self.config.max_response_size {
            return Err(Error::MalformedField(format!(
                "{} response of {} bytes exceeds the {} byte limit",
                framed.api_key(),
                bytes.len(),
                self.config.max_response_size
            )));
        }

        let version = framed.api_version();
        let flexible = uses_flexible_response_header(framed.api_key(), version);
        let (correlation_id, response) = decode(bytes, |s| {
            let (s, correlation_id) = parse_response_header(s, flexible)?;
            let (s, response) = R::parse_response(s, version)?;
            Ok((s, (correlation_id, response)))
        })?;

        if correlation_id != framed.correlation_id() {
            return Err(Error::MalformedField(format!(
                "response correlation id {} does not match request {}",
                correlation_id,
                framed.correlation_id()
            )));
        }
        Ok(response)
    }
}

fn on_error<T>(api: ApiKey, error: Error) -> Step<T> {
    let action = classify_error(api, &error);
    if action.is_retriable() {
        Step::Retry {
            error,
            action,
            response: None,
            item_level: false,
        }
    } else {
        Step::Done(Dispatched::failed(error), action)
    }
}

/// Decide what a parsed response means for the call.
fn inspect<T: ProtocolResponse>(api: ApiKey, response: T) -> Step<T> {
    let throttle_ms = response.throttle_time_ms();
    if throttle_ms > 0 {
        debug!(%api, throttle_ms, "Broker throttled request");
        metrics::record_throttle(api.as_str());
    }

    if let Some((code, message)) = response.request_error() {
        let action = classify(api, code);
        let error = Error::broker(code, message);
        return if action.is_retriable() {
            Step::Retry {
                error,
                action,
                response: Some(response),
                item_level: false,
            }
        } else {
            Step::Done(
                Dispatched {
                    error: Some(error),
                    response: Some(response),
                },
                action,
            )
        };
    }

    let mut action = ErrorAction::NONE;
    let mut retry_code = None;
    for code in response.item_codes() {
        let item_action = classify(api, code);
        if item_action.is_retriable() && retry_code.is_none() {
            retry_code = Some(code);
        }
        action |= item_action;
    }

    match retry_code {
        Some(code) => Step::Retry {
            error: Error::broker(code, None),
            action,
            response: Some(response),
            item_level: true,
        },
        None => Step::Done(Dispatched::ok(response), action & ErrorAction::REFRESH),
    }
}
