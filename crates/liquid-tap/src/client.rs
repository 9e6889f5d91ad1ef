//! Tap client: subscription API and lifecycle coordination

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use liquid_auth::{Credentials, RequestDescriptor};
use liquid_types::{
    AccountUpdate, Execution, LiquidError, LiquidResult, OrderBookLevel, ProductUpdate, Side,
    UserUpdate,
};

use crate::auth::{
    AuthManager, AuthOutcome, AuthRequest, AuthState, AUTH_FAILURE_EVENT, AUTH_SUCCESS_EVENT,
    REALTIME_PATH,
};
use crate::channel::ChannelName;
use crate::subscription::{ChannelSubscription, Dispatcher, SubscriptionHandle, SubscriptionManager};
use crate::transport::{Transport, TransportState};

/// Default Tap endpoint host
pub const TAP_ENDPOINT: &str = "tap.liquid.com";

/// Default time to wait for the auth success/failure event
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Private events buffered while authentication is pending, at most
const MAX_QUEUED_EVENTS: usize = 1024;

/// Sink for errors that occur on the dispatch path
pub type ErrorSink = Arc<dyn Fn(&LiquidError) + Send + Sync>;

/// Connection options for a [`TapClient`]
///
/// Immutable after client construction.
#[derive(Debug)]
pub struct ConnectionOptions {
    /// Endpoint host
    pub endpoint: String,
    /// Pusher application key
    pub app_key: String,
    /// Default user id for private channels
    pub user_id: Option<String>,
    /// Credentials for the authentication handshake
    pub credentials: Option<Credentials>,
    /// Time to wait for the auth success/failure event
    pub response_timeout: Duration,
}

impl ConnectionOptions {
    /// Create options for an application key with default values
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            endpoint: TAP_ENDPOINT.to_string(),
            app_key: app_key.into(),
            user_id: None,
            credentials: None,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Set the endpoint host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the default user id for private channels
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the credentials used by the authentication handshake
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the auth response timeout
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
struct QueuedEvent {
    channel: String,
    event: String,
    payload: String,
}

/// Client for the Liquid Tap realtime endpoint
///
/// Owns the subscription registry and the authentication state; consumes
/// the pub/sub transport through the [`Transport`] trait. The transport
/// driver feeds inbound traffic through [`handle_connection_state`],
/// [`handle_channel_event`], and [`handle_global_event`], all invoked
/// synchronously from the delivery thread.
///
/// [`handle_connection_state`]: TapClient::handle_connection_state
/// [`handle_channel_event`]: TapClient::handle_channel_event
/// [`handle_global_event`]: TapClient::handle_global_event
pub struct TapClient {
    options: ConnectionOptions,
    transport: Arc<dyn Transport>,
    subscriptions: SubscriptionManager,
    auth: AuthManager,
    connected: AtomicBool,
    shutdown: AtomicBool,
    queued: Arc<Mutex<Vec<QueuedEvent>>>,
    on_error: ErrorSink,
}

impl TapClient {
    /// Create a client over the given transport
    pub fn new(options: ConnectionOptions, transport: Arc<dyn Transport>) -> Self {
        let auth = AuthManager::new(options.response_timeout);
        Self {
            options,
            transport,
            subscriptions: SubscriptionManager::new(),
            auth,
            connected: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            queued: Arc::new(Mutex::new(Vec::new())),
            on_error: Arc::new(|err| warn!(error = %err, "tap client error")),
        }
    }

    /// Replace the default error sink (which logs at warn level)
    ///
    /// Decode and authentication errors on the dispatch path are reported
    /// here instead of being returned; keep the sink fast, it runs on the
    /// transport delivery thread.
    pub fn on_error(mut self, sink: impl Fn(&LiquidError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(sink);
        self
    }

    /// Open the transport connection
    pub fn connect(&self) {
        self.transport.connect();
    }

    /// Current authentication state
    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    /// Whether the transport has reported a connection
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of registered subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // === Subscription API ===

    /// Subscribe to one side of a symbol's price ladder
    ///
    /// The callback receives the decoded ladder plus the side and symbol
    /// it was registered with.
    pub fn subscribe_order_book_side<F>(
        &self,
        symbol: &str,
        side: Side,
        on_data: F,
    ) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(Vec<OrderBookLevel>, Side, &str) + Send + Sync + 'static,
    {
        let name = ChannelName::order_book_side(symbol, side);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let symbol = symbol.to_string();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let levels: Vec<OrderBookLevel> = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(levels, side, &symbol);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Subscribe to all executions for a symbol
    pub fn subscribe_executions<F>(&self, symbol: &str, on_data: F) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(Execution, &str) + Send + Sync + 'static,
    {
        let name = ChannelName::all_executions(symbol);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let symbol = symbol.to_string();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let execution: Execution = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(execution, &symbol);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Subscribe to executions of a user (private)
    ///
    /// `user_id` defaults to the one configured in [`ConnectionOptions`].
    pub fn subscribe_user_executions<F>(
        &self,
        symbol: &str,
        user_id: Option<&str>,
        on_data: F,
    ) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(Execution, &str) + Send + Sync + 'static,
    {
        let user_id = self.resolve_user_id(user_id)?;
        let name = ChannelName::user_executions(&user_id, symbol);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let symbol = symbol.to_string();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let execution: Execution = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(execution, &symbol);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Subscribe to account updates for a currency (private)
    pub fn subscribe_user_currency<F>(
        &self,
        currency: &str,
        user_id: Option<&str>,
        on_data: F,
    ) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(AccountUpdate, &str) + Send + Sync + 'static,
    {
        let user_id = self.resolve_user_id(user_id)?;
        let name = ChannelName::user_currency(&user_id, currency);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let currency = currency.to_string();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let update: AccountUpdate = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(update, &currency);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Subscribe to user model updates (private)
    pub fn subscribe_user_info<F>(
        &self,
        user_id: Option<&str>,
        on_data: F,
    ) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(UserUpdate) + Send + Sync + 'static,
    {
        let user_id = self.resolve_user_id(user_id)?;
        let name = ChannelName::user_info(&user_id);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let update: UserUpdate = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(update);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Subscribe to product ticker updates for a pair
    pub fn subscribe_market_info<F>(
        &self,
        pair: &str,
        pair_id: u64,
        on_data: F,
    ) -> LiquidResult<SubscriptionHandle>
    where
        F: Fn(ProductUpdate, &str) + Send + Sync + 'static,
    {
        let name = ChannelName::market_info(pair, pair_id);
        let channel = name.as_str().to_string();
        let event = name.kind().event_name();
        let pair = pair.to_string();
        let dispatcher: Dispatcher = Arc::new(move |raw: &str| {
            let update: ProductUpdate = serde_json::from_str(raw)
                .map_err(|e| LiquidError::decode(channel.clone(), event, e))?;
            on_data(update, &pair);
            Ok(())
        });
        self.register(name, dispatcher)
    }

    /// Remove a subscription
    ///
    /// Safe to call concurrently with an in-flight dispatch for the same
    /// channel; dispatch for a removed entry is a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> LiquidResult<()> {
        if self.subscriptions.remove(handle.channel()) {
            debug!(channel = handle.channel(), "unsubscribed");
            self.transport
                .unsubscribe(handle.channel())
                .map_err(|e| LiquidError::Transport(e.to_string()))?;
        }
        Ok(())
    }

    // === Authentication ===

    /// Start the authentication handshake
    ///
    /// Called automatically on every transport connect when credentials
    /// are configured. A no-op while a handshake is already pending.
    /// Fails synchronously, sending nothing, when no credentials are
    /// configured.
    pub fn authenticate(&self) -> LiquidResult<()> {
        let credentials = self.options.credentials.as_ref().ok_or_else(|| {
            LiquidError::Configuration(
                "credentials are required to authenticate to private streams".into(),
            )
        })?;

        let Some(generation) = self.auth.begin() else {
            debug!("authentication already pending, not re-sending");
            return Ok(());
        };

        if let Err(err) = self.send_auth_request(credentials) {
            // The request never reached the wire: roll the attempt back so
            // a retry can start a fresh handshake, and keep public channels
            // usable on this connection.
            self.auth.abort(generation);
            self.replay_public();
            return Err(err);
        }

        self.spawn_auth_timer(generation);
        Ok(())
    }

    fn send_auth_request(&self, credentials: &Credentials) -> LiquidResult<()> {
        let headers = credentials
            .sign_request(&RequestDescriptor::get(REALTIME_PATH))
            .map_err(|e| LiquidError::authentication(e.to_string()))?;
        let payload = serde_json::to_string(&AuthRequest::new(headers))
            .map_err(|e| LiquidError::authentication(e.to_string()))?;

        debug!("sending auth request");
        self.transport
            .send_raw(&payload)
            .map_err(|e| LiquidError::Transport(e.to_string()))
    }

    /// Arm the response timeout for a handshake attempt
    ///
    /// Runs only when a tokio runtime is present; the deadline is also
    /// enforced on the event path, so the timer is not load-bearing.
    fn spawn_auth_timer(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let auth = self.auth.clone();
        let subscriptions = self.subscriptions.clone();
        let transport = Arc::clone(&self.transport);
        let sink = Arc::clone(&self.on_error);
        let queued = Arc::clone(&self.queued);
        let timeout = auth.timeout();
        runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if auth.expire(generation) {
                queued.lock().clear();
                sink(&LiquidError::AuthTimeout { timeout });
                // Public channels stay usable on this connection
                Self::replay_channels(&subscriptions, &transport, &sink, false);
            }
        });
    }

    fn on_auth_success(&self) {
        match self.auth.succeed() {
            AuthOutcome::Transitioned => {
                info!("authenticated to private streams");
                self.replay_all();
                self.flush_queued();
            }
            AuthOutcome::TimedOut => self.report_auth_timeout(),
            AuthOutcome::Ignored => debug!("ignoring late auth success event"),
        }
    }

    fn on_auth_failure(&self) {
        match self.auth.fail() {
            AuthOutcome::Transitioned => {
                self.queued.lock().clear();
                (self.on_error)(&LiquidError::authentication(
                    "exchange rejected the auth request",
                ));
                // Public channels stay usable on this connection
                self.replay_public();
            }
            AuthOutcome::TimedOut => self.report_auth_timeout(),
            AuthOutcome::Ignored => debug!("ignoring late auth failure event"),
        }
    }

    fn report_auth_timeout(&self) {
        self.queued.lock().clear();
        (self.on_error)(&LiquidError::AuthTimeout {
            timeout: self.auth.timeout(),
        });
        self.replay_public();
    }

    // === Lifecycle ===

    /// React to a transport connection-state transition
    ///
    /// Invoked by the transport driver. Reconnection timing belongs to
    /// the transport; this only reacts to its state events.
    pub fn handle_connection_state(&self, state: TransportState) {
        debug!(?state, "transport state changed");
        match state {
            TransportState::Connected => {
                self.connected.store(true, Ordering::Release);
                self.auth.reset();
                // Transport-level handles did not survive; replay re-issues them
                self.subscriptions.mark_all_inactive();
                if self.options.credentials.is_some() {
                    if let Err(err) = self.authenticate() {
                        (self.on_error)(&err);
                    }
                } else {
                    self.replay_all();
                }
            }
            TransportState::Disconnected => {
                self.connected.store(false, Ordering::Release);
                self.auth.reset();
                self.subscriptions.mark_all_inactive();
                self.queued.lock().clear();
            }
            TransportState::Connecting | TransportState::Reconnecting => {}
        }
    }

    /// Convenience for the transport's dedicated connected event
    pub fn handle_connected(&self) {
        self.handle_connection_state(TransportState::Connected);
    }

    /// Handle a control-plane event not tied to a channel
    pub fn handle_global_event(&self, event: &str, _payload: &str) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }
        match event {
            AUTH_SUCCESS_EVENT => self.on_auth_success(),
            AUTH_FAILURE_EVENT => self.on_auth_failure(),
            other => trace!(event = other, "ignoring unhandled global event"),
        }
    }

    /// Handle an event delivered on a named channel
    ///
    /// Decoding and callback invocation happen inline on the delivery
    /// path, at most once per event and in delivery order.
    pub fn handle_channel_event(&self, channel: &str, event: &str, payload: &str) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }
        if self.auth.poll_timeout() {
            self.report_auth_timeout();
        }

        let Some((dispatcher, private)) = self.subscriptions.lookup(channel, event) else {
            trace!(channel, event, "event without matching subscription, ignoring");
            return;
        };

        if private && !self.auth.is_authenticated() {
            if self.auth.is_pending() {
                let mut queued = self.queued.lock();
                if queued.len() < MAX_QUEUED_EVENTS {
                    queued.push(QueuedEvent {
                        channel: channel.to_string(),
                        event: event.to_string(),
                        payload: payload.to_string(),
                    });
                } else {
                    warn!(channel, "private event queue full, dropping event");
                }
            } else {
                warn!(channel, "dropping private event outside an authenticated session");
            }
            return;
        }

        if let Err(err) = dispatcher(payload) {
            (self.on_error)(&err);
        }
    }

    /// Shut the client down
    ///
    /// Clears the registry, unbinds everything from the transport, and
    /// releases the connection. No callback fires after this returns.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.queued.lock().clear();
        for channel in self.subscriptions.clear() {
            if let Err(err) = self.transport.unsubscribe(&channel) {
                debug!(channel = %channel, error = %err, "unsubscribe during shutdown failed");
            }
        }
        self.auth.reset();
        self.transport.disconnect();
    }

    // === Internals ===

    fn resolve_user_id(&self, user_id: Option<&str>) -> LiquidResult<String> {
        user_id
            .map(str::to_string)
            .or_else(|| self.options.user_id.clone())
            .ok_or_else(|| {
                LiquidError::Configuration(
                    "a user id is required for this channel; pass one or configure a default"
                        .into(),
                )
            })
    }

    fn register(&self, name: ChannelName, dispatcher: Dispatcher) -> LiquidResult<SubscriptionHandle> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(LiquidError::ShuttingDown);
        }
        let private = name.kind().is_private();
        if private && self.options.credentials.is_none() {
            return Err(LiquidError::Configuration(format!(
                "credentials are required to subscribe to private channel {name}"
            )));
        }

        let channel = name.as_str().to_string();
        self.subscriptions
            .insert(ChannelSubscription::new(&name, dispatcher));

        let may_issue = self.connected.load(Ordering::Acquire)
            && (!private || self.auth.is_authenticated())
            && !self.subscriptions.is_active(&channel);
        if may_issue {
            match self.transport.subscribe(&channel) {
                Ok(()) => self.subscriptions.mark_active(&channel),
                Err(e) => return Err(LiquidError::Transport(e.to_string())),
            }
        } else if private && !self.auth.is_authenticated() {
            debug!(channel = %channel, "private subscription held until authentication completes");
        }

        Ok(SubscriptionHandle::new(channel))
    }

    /// Replay every registry entry that the transport does not yet carry
    fn replay_all(&self) {
        let private_allowed =
            self.options.credentials.is_none() || self.auth.is_authenticated();
        Self::replay_channels(
            &self.subscriptions,
            &self.transport,
            &self.on_error,
            private_allowed,
        );
    }

    fn replay_public(&self) {
        Self::replay_channels(&self.subscriptions, &self.transport, &self.on_error, false);
    }

    fn replay_channels(
        subscriptions: &SubscriptionManager,
        transport: &Arc<dyn Transport>,
        sink: &ErrorSink,
        private_allowed: bool,
    ) {
        let channels = subscriptions.pending_activation(private_allowed);
        if channels.is_empty() {
            return;
        }
        let count = channels.len();
        for channel in channels {
            match transport.subscribe(&channel) {
                Ok(()) => subscriptions.mark_active(&channel),
                Err(e) => sink(&LiquidError::Transport(e.to_string())),
            }
        }
        info!(count, "subscriptions re-established");
    }

    /// Dispatch private events buffered while the handshake was pending
    fn flush_queued(&self) {
        let events: Vec<QueuedEvent> = std::mem::take(&mut *self.queued.lock());
        for queued in events {
            self.handle_channel_event(&queued.channel, &queued.event, &queued.payload);
        }
    }
}

impl std::fmt::Debug for TapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapClient")
            .field("endpoint", &self.options.endpoint)
            .field("connected", &self.is_connected())
            .field("auth_state", &self.auth_state())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
