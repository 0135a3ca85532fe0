//! Application state shared by every service and view.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::events::{EventSender, UiEvent};
use crate::models::{AccessToken, CartItemId, CartLineItem, ProductId, User};
use crate::services::checkout::totals::{CheckoutTotals, PricingPolicy};
use crate::storage::{TokenStore, ACCESS_TOKEN_KEY};

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl SessionStatus {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::SignedOut => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }
}

/// Cart as last reported by the backend, with totals derived from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartSnapshot {
    /// Ticket of the reload that produced this snapshot
    pub revision: u64,
    pub items: Vec<CartLineItem>,
    pub totals: CheckoutTotals,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines (the header badge).
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn item(&self, id: CartItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Issued before a cart fetch is sent; newer tickets supersede older ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReloadTicket(u64);

impl ReloadTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Resource a cart mutation is serialised on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Item(CartItemId),
    Product(ProductId),
    Cart,
}

pub struct AppState {
    token_store: Arc<dyn TokenStore>,
    pricing: PricingPolicy,
    session: watch::Sender<SessionStatus>,
    cart: watch::Sender<Arc<CartSnapshot>>,
    reload_seq: AtomicU64,
    locks: DashMap<ResourceKey, Arc<Mutex<()>>>,
    events: EventSender,
}

impl AppState {
    pub fn new(token_store: Arc<dyn TokenStore>, pricing: PricingPolicy) -> Self {
        let (session, _) = watch::channel(SessionStatus::SignedOut);
        let (cart, _) = watch::channel(Arc::new(CartSnapshot {
            totals: CheckoutTotals::compute(&[], &pricing),
            ..Default::default()
        }));

        Self {
            token_store,
            pricing,
            session,
            cart,
            reload_seq: AtomicU64::new(0),
            locks: DashMap::new(),
            events: EventSender::new(),
        }
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    // --- token ---------------------------------------------------------------

    pub fn token(&self) -> Result<Option<AccessToken>, ClientError> {
        Ok(self
            .token_store
            .get(ACCESS_TOKEN_KEY)?
            .filter(|token| !token.is_empty())
            .map(AccessToken::new))
    }

    /// Token or `Unauthenticated` carrying the notice to show.
    ///
    /// A failing store reads as signed out.
    pub fn require_token(&self, message: &str) -> Result<AccessToken, ClientError> {
        match self.token() {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(ClientError::Unauthenticated(message.to_string())),
            Err(e) => {
                warn!(error = %e, "token store unreadable");
                Err(ClientError::Unauthenticated(message.to_string()))
            }
        }
    }

    pub fn has_token(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }

    pub fn store_token(&self, token: &AccessToken) -> Result<(), ClientError> {
        self.token_store.set(ACCESS_TOKEN_KEY, token.as_str())
    }

    pub fn discard_token(&self) -> Result<(), ClientError> {
        self.token_store.remove(ACCESS_TOKEN_KEY)
    }

    // --- session -------------------------------------------------------------

    pub fn session(&self) -> SessionStatus {
        self.session.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.borrow().user().cloned()
    }

    pub fn set_session(&self, status: SessionStatus) {
        self.session.send_replace(status);
        self.events.send(UiEvent::SessionChanged);
    }

    pub fn watch_session(&self) -> watch::Receiver<SessionStatus> {
        self.session.subscribe()
    }

    // --- cart ----------------------------------------------------------------

    pub fn cart(&self) -> Arc<CartSnapshot> {
        self.cart.borrow().clone()
    }

    pub fn watch_cart(&self) -> watch::Receiver<Arc<CartSnapshot>> {
        self.cart.subscribe()
    }

    /// Takes the next reload ticket. Must be called before the fetch is sent.
    pub fn begin_reload(&self) -> ReloadTicket {
        ReloadTicket(self.reload_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The only way the cart snapshot changes.
    ///
    /// Replaces the snapshot wholesale and recomputes totals, unless a reload
    /// issued later has already been applied. Returns whether it was applied.
    pub fn reconcile_cart(&self, ticket: ReloadTicket, items: Vec<CartLineItem>) -> bool {
        let applied = self.cart.send_if_modified(|snapshot| {
            if ticket.0 <= snapshot.revision {
                return false;
            }
            let totals = CheckoutTotals::compute(&items, &self.pricing);
            *snapshot = Arc::new(CartSnapshot {
                revision: ticket.0,
                items,
                totals,
            });
            true
        });

        if applied {
            self.events.send(UiEvent::CartChanged {
                revision: ticket.0,
            });
        } else {
            debug!(ticket = ticket.0, "discarding stale cart reload");
        }
        applied
    }

    /// Empties the local snapshot; in-flight reloads become stale.
    pub fn clear_cart(&self) {
        let ticket = self.begin_reload();
        self.reconcile_cart(ticket, Vec::new());
    }

    /// Drops token, session and cart.
    pub fn clear(&self) -> Result<(), ClientError> {
        let discarded = self.discard_token();
        self.set_session(SessionStatus::SignedOut);
        self.clear_cart();
        discarded
    }

    /// Signs out when the backend refused the stored token.
    ///
    /// Returns whether the session was torn down.
    pub fn sign_out_if_rejected(&self, err: &ClientError) -> bool {
        if !err.is_auth_rejection() {
            return false;
        }
        warn!(error = %err, "Backend rejected the access token; signing out");
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to discard rejected token");
        }
        true
    }

    /// Serialises mutations on one resource.
    pub async fn lock_resource(&self, key: ResourceKey) -> ResourceGuard<'_> {
        let lock = self.locks.entry(key).or_default().clone();
        ResourceGuard {
            locks: &self.locks,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Held for the duration of one mutation. The lock entry is dropped from the
/// table once nobody else holds or waits on it.
pub struct ResourceGuard<'a> {
    locks: &'a DashMap<ResourceKey, Arc<Mutex<()>>>,
    key: ResourceKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
