/// Process-wide shared node database with reference-counted sessions
///
/// Opening the node catalog is expensive, so every MCP session shares one
/// instance instead of opening its own. Sessions `acquire` at start and
/// `release` at end; releasing never closes anything. Only `force_close`,
/// called once during process shutdown, tears the resource down.
///
/// Initialization is single-flight: the first caller starts it and stores a
/// shared pending future, every concurrent caller awaits that same future and
/// observes the same state or the same failure. The bookkeeping mutex is never
/// held across an await, and since the pending future lives in the manager any
/// waiter can drive it to completion.

use crate::database::connector::{NodeServices, ResourceConnector, SqliteNodeConnector};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::{fmt, ops::Deref, sync::Arc, time::Duration};
use thiserror::Error;

/// Shared node database used by the server
pub type SharedDatabase = SharedResource<SqliteNodeConnector>;

/// State handed to each session holding the shared node database
pub type SharedDatabaseState = SharedState<NodeServices>;

/// Hard failures surfaced by `acquire`
#[derive(Debug, Clone, Error)]
pub enum SharedDatabaseError {
    /// A different location is already live; this is a startup/config bug
    #[error("Shared database already initialized with different path: {existing} (requested: {requested})")]
    PathConflict { existing: String, requested: String },

    /// The backing resource could not be built; every waiter sees the same error
    #[error("Shared database initialization failed: {0:#}")]
    Initialization(Arc<anyhow::Error>),

    /// A concurrent `force_close` superseded the initialization this caller waited on
    #[error("Shared database was closed before initialization completed")]
    Closed,
}

/// One lifecycle's worth of shared resource
///
/// Identity is per lifecycle: after `force_close` a new acquisition yields a
/// state with a different `id`.
#[derive(Debug)]
pub struct SharedState<R> {
    id: u64,
    location: String,
    resource: R,
}

impl<R> SharedState<R> {
    /// Lifecycle identity
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location key the resource was built from
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }
}

impl<R> Deref for SharedState<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

type InitResult<R> = Result<Arc<SharedState<R>>, SharedDatabaseError>;
type PendingInit<R> = Shared<BoxFuture<'static, InitResult<R>>>;

struct Ready<R> {
    state: Arc<SharedState<R>>,
    ref_count: usize,
}

struct Lifecycle<R> {
    ready: Option<Ready<R>>,
    in_flight: Option<PendingInit<R>>,
    /// Bumped by every force_close; initializations from an older epoch never publish
    epoch: u64,
    next_id: u64,
    /// Initialization whose starting caller went away before it resolved
    abandoned_init: Option<u64>,
}

/// The starting caller's claim on the reference its initialization publishes
///
/// Dropping it unsettled (the caller was cancelled) gives the reference back.
struct InitClaim<R> {
    lifecycle: Arc<Mutex<Lifecycle<R>>>,
    id: u64,
    armed: bool,
}

impl<R> InitClaim<R> {
    fn settle(mut self) {
        self.armed = false;
    }
}

impl<R> Drop for InitClaim<R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut lifecycle = self.lifecycle.lock();
        let published = matches!(&lifecycle.ready, Some(ready) if ready.state.id == self.id);
        if !published {
            lifecycle.abandoned_init = Some(self.id);
        } else if let Some(ready) = lifecycle.ready.as_mut() {
            ready.ref_count = ready.ref_count.saturating_sub(1);
        }
    }
}

/// Reference-counted owner of one expensive shared resource
pub struct SharedResource<C: ResourceConnector> {
    connector: Arc<C>,
    lifecycle: Arc<Mutex<Lifecycle<C::Resource>>>,
    init_timeout: Option<Duration>,
}

impl<C: ResourceConnector> SharedResource<C> {
    /// Create an empty manager; nothing is built until the first `acquire`
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                ready: None,
                in_flight: None,
                epoch: 0,
                next_id: 1,
                abandoned_init: None,
            })),
            init_timeout: None,
        }
    }

    /// Bound resource construction; expiry is reported as an initialization failure
    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Get the shared resource for `location`, building it if nothing is live
    ///
    /// Increments the reference count on success. Fails with `PathConflict` when
    /// another location is live, and with the shared initialization error when
    /// construction fails.
    pub async fn acquire(&self, location: &str) -> InitResult<C::Resource> {
        let (pending, claim) = {
            let mut lifecycle = self.lifecycle.lock();

            if let Some(ready) = lifecycle.ready.as_mut() {
                if ready.state.location == location {
                    ready.ref_count += 1;
                    tracing::debug!(
                        ref_count = ready.ref_count,
                        db_path = location,
                        "Reusing shared database connection"
                    );
                    return Ok(Arc::clone(&ready.state));
                }

                tracing::error!(
                    existing_path = %ready.state.location,
                    requested_path = location,
                    "Attempted to initialize shared database with different path"
                );
                return Err(SharedDatabaseError::PathConflict {
                    existing: ready.state.location.clone(),
                    requested: location.to_string(),
                });
            }

            if let Some(pending) = lifecycle.in_flight.clone() {
                tracing::debug!(db_path = location, "Waiting for in-flight shared database initialization");
                (pending, None)
            } else {
                let (pending, id) = self.begin_initialization(&mut lifecycle, location);
                let claim = InitClaim {
                    lifecycle: Arc::clone(&self.lifecycle),
                    id,
                    armed: true,
                };
                (pending, Some(claim))
            }
        };

        let result = pending.await;
        // The starting caller's reference was counted at publication
        let initiated = claim.map(InitClaim::settle).is_some();
        let state = result?;

        let mut lifecycle = self.lifecycle.lock();
        let ready = match lifecycle.ready.as_mut() {
            Some(ready) if Arc::ptr_eq(&ready.state, &state) => ready,
            _ => {
                tracing::warn!(db_path = location, "Shared database closed before this acquisition completed");
                return Err(SharedDatabaseError::Closed);
            }
        };

        if state.location != location {
            tracing::error!(
                existing_path = %state.location,
                requested_path = location,
                "Attempted to initialize shared database with different path"
            );
            return Err(SharedDatabaseError::PathConflict {
                existing: state.location.clone(),
                requested: location.to_string(),
            });
        }

        if !initiated {
            ready.ref_count += 1;
        }
        tracing::debug!(
            ref_count = ready.ref_count,
            db_path = location,
            "Acquired shared database reference"
        );

        Ok(state)
    }

    /// Start the single construction and register it as the in-flight marker
    ///
    /// The returned future publishes the state (already counting the starting
    /// caller) or clears the marker itself, so whoever polls it to completion
    /// leaves the manager consistent. Also returns the new lifecycle id.
    fn begin_initialization(
        &self,
        lifecycle: &mut Lifecycle<C::Resource>,
        location: &str,
    ) -> (PendingInit<C::Resource>, u64) {
        let epoch = lifecycle.epoch;
        let id = lifecycle.next_id;
        lifecycle.next_id += 1;

        let connector = Arc::clone(&self.connector);
        let shared = Arc::clone(&self.lifecycle);
        let init_timeout = self.init_timeout;
        let location = location.to_string();

        let pending = async move {
            tracing::info!(db_path = %location, "Initializing shared database connection");

            let connected = match init_timeout {
                Some(limit) => match tokio::time::timeout(limit, connector.connect(&location)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!(
                        "Timed out after {:?} opening shared database at {}",
                        limit,
                        location
                    )),
                },
                None => connector.connect(&location).await,
            };

            let resource = match connected {
                Ok(resource) => resource,
                Err(error) => {
                    tracing::error!(db_path = %location, "Shared database initialization failed: {:#}", error);
                    let mut lifecycle = shared.lock();
                    if lifecycle.epoch == epoch {
                        lifecycle.in_flight = None;
                    }
                    return Err(SharedDatabaseError::Initialization(Arc::new(error)));
                }
            };

            let state = Arc::new(SharedState {
                id,
                location,
                resource,
            });

            let published = {
                let mut lifecycle = shared.lock();
                if lifecycle.epoch == epoch {
                    let abandoned = lifecycle.abandoned_init.take() == Some(id);
                    lifecycle.in_flight = None;
                    lifecycle.ready = Some(Ready {
                        state: Arc::clone(&state),
                        ref_count: if abandoned { 0 } else { 1 },
                    });
                    true
                } else {
                    false
                }
            };

            if !published {
                tracing::warn!(
                    db_path = %state.location,
                    "Shared database closed during initialization, discarding new connection"
                );
                if let Err(error) = connector.disconnect(&state.resource).await {
                    tracing::warn!("Error closing discarded shared database: {:#}", error);
                }
                return Err(SharedDatabaseError::Closed);
            }

            tracing::info!(db_path = %state.location, id, "Shared database initialized successfully");
            Ok(state)
        }
        .boxed()
        .shared();

        lifecycle.in_flight = Some(pending.clone());
        (pending, id)
    }

    /// Drop one reference to the shared resource
    ///
    /// Never closes the resource, even at zero. `None`, a handle from an older
    /// lifecycle, or a count already at zero are logged and ignored.
    pub fn release(&self, state: Option<&Arc<SharedState<C::Resource>>>) {
        let Some(state) = state else {
            tracing::debug!("Ignoring release of an empty shared database handle");
            return;
        };

        let mut lifecycle = self.lifecycle.lock();
        let Some(ready) = lifecycle.ready.as_mut() else {
            tracing::debug!(id = state.id, "Ignoring release, shared database is not initialized");
            return;
        };

        if !Arc::ptr_eq(&ready.state, state) {
            tracing::debug!(
                id = state.id,
                current_id = ready.state.id,
                "Ignoring release of a stale shared database handle"
            );
            return;
        }

        if ready.ref_count == 0 {
            tracing::warn!(
                ref_count = ready.ref_count,
                "Attempted to release shared database with refCount already at 0"
            );
            return;
        }

        ready.ref_count -= 1;
        tracing::debug!(ref_count = ready.ref_count, "Released shared database reference");
    }

    /// Tear the shared resource down (process shutdown only)
    ///
    /// Waits for any in-flight initialization to resolve first. Teardown errors
    /// are logged and swallowed; the manager always ends up uninitialized and a
    /// later `acquire` starts a new lifecycle. Calling it with nothing live is a no-op.
    pub async fn force_close(&self) {
        let pending = self.lifecycle.lock().in_flight.clone();
        if let Some(pending) = pending {
            tracing::info!("Waiting for in-flight shared database initialization before closing");
            let _ = pending.await;
        }

        let ready = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.epoch += 1;
            lifecycle.in_flight = None;
            lifecycle.ready.take()
        };

        let Some(ready) = ready else {
            return;
        };

        tracing::info!(
            ref_count = ready.ref_count,
            db_path = %ready.state.location,
            "Closing shared database connection"
        );

        if let Err(error) = self.connector.disconnect(&ready.state.resource).await {
            tracing::warn!("Error closing shared database: {:#}", error);
        }
    }

    /// Whether a built resource is currently live
    pub fn is_initialized(&self) -> bool {
        self.lifecycle.lock().ready.is_some()
    }

    /// Outstanding references (0 when nothing is live)
    pub fn ref_count(&self) -> usize {
        self.lifecycle
            .lock()
            .ready
            .as_ref()
            .map_or(0, |ready| ready.ref_count)
    }

    /// Location of the live resource, if any
    pub fn location(&self) -> Option<String> {
        self.lifecycle
            .lock()
            .ready
            .as_ref()
            .map(|ready| ready.state.location.clone())
    }
}

impl<C: ResourceConnector> fmt::Debug for SharedResource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("SharedResource")
            .field("location", &lifecycle.ready.as_ref().map(|r| r.state.location.as_str()))
            .field("ref_count", &lifecycle.ready.as_ref().map_or(0, |r| r.ref_count))
            .field("initializing", &lifecycle.in_flight.is_some())
            .field("init_timeout", &self.init_timeout)
            .finish()
    }
}
