use crate::balance::BalanceFetcher;
use crate::errors::{classify, FetchError};
use crate::models::BalanceRecord;
use crate::settings::{Network, Settings};
use crate::validator::{validate, AccountIdentifier, ValidationResult};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Idle | RequestStatus::Running)
    }
}

/// Snapshot handed to the presentation layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub account_id: Option<String>,
    pub validation_error: Option<String>,
    pub loading: bool,
    pub balance: Option<BalanceRecord>,
    pub error: Option<String>,
    pub status: RequestStatus,
    request_id: u64,
}

impl ViewState {
    /// Id of the request this snapshot belongs to; 0 before the first submit.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

/// The one live request. Owned by the controller; the task only gets clones of its parts.
#[derive(Debug)]
pub struct FetchRequest {
    id: u64,
    account: AccountIdentifier,
    cancel: CancellationToken,
    deadline: Instant,
}

impl FetchRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn account(&self) -> &AccountIdentifier {
        &self.account
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Awaitable end of one submitted request.
pub struct FetchHandle {
    id: u64,
    join: JoinHandle<RequestStatus>,
}

impl FetchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Terminal status of this request, whether or not it was the one displayed.
    pub async fn wait(self) -> RequestStatus {
        match self.join.await {
            Ok(status) => status,
            Err(e) => {
                error!("balance request {} task failed: {}", self.id, e);
                RequestStatus::Failed
            }
        }
    }
}

/// Owns the current-request slot: supersedes stale requests, races each fetch against
/// its deadline and publishes only the outcome of the request still current.
pub struct BalanceController {
    fetcher: Arc<BalanceFetcher>,
    timeout: Duration,
    state: Arc<watch::Sender<ViewState>>,
    live: Option<FetchRequest>,
    next_id: u64,
}

impl BalanceController {
    pub fn new(fetcher: Arc<BalanceFetcher>, timeout: Duration) -> BalanceController {
        let (state, _) = watch::channel(ViewState::default());
        BalanceController {
            fetcher,
            timeout,
            state: Arc::new(state),
            live: None,
            next_id: 0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<BalanceController, FetchError> {
        let fetcher = BalanceFetcher::from_settings(settings)?;
        Ok(BalanceController::new(Arc::new(fetcher), settings.timeout))
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// The request still in flight, if any. A request stops being live once its outcome is published.
    pub fn live_request(&self) -> Option<&FetchRequest> {
        let request = self.live.as_ref()?;
        let state = self.state.borrow();
        let running = state.request_id == request.id && !state.status.is_terminal();
        running.then_some(request)
    }

    /// Live form validation; touches nothing but the validation message.
    pub fn on_input(&self, raw: &str) -> ValidationResult {
        let result = validate(raw);
        let message = match &result {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(message) => Some(message.clone()),
        };
        self.state.send_if_modified(|s| {
            if s.validation_error == message {
                return false;
            }
            s.validation_error = message;
            true
        });
        result
    }

    /// Starts a lookup for `raw`, cancelling whatever request is still running.
    ///
    /// Invalid input is rejected before any network call and leaves a running request alone.
    pub fn submit(&mut self, raw: &str) -> Result<FetchHandle, String> {
        let account = match validate(raw) {
            ValidationResult::Valid(account) => account,
            ValidationResult::Invalid(message) => {
                self.state.send_modify(|s| s.validation_error = Some(message.clone()));
                return Err(message);
            }
        };

        self.next_id += 1;
        let request = FetchRequest {
            id: self.next_id,
            account,
            cancel: CancellationToken::new(),
            deadline: Instant::now() + self.timeout,
        };
        let id = request.id;
        let account_id = request.account.to_string();
        let task = RequestTask {
            id,
            account: request.account.clone(),
            cancel: request.cancel.clone(),
            deadline: request.deadline,
            fetcher: self.fetcher.clone(),
            network: self.fetcher.network(),
            state: self.state.clone(),
        };

        let previous = self.live.replace(request);
        // publishers check id and token under this same lock, so the old request is dead before the new one shows
        self.state.send_modify(|s| {
            if let Some(prev) = &previous {
                prev.cancel.cancel();
            }
            *s = ViewState {
                account_id: Some(account_id.clone()),
                loading: true,
                status: RequestStatus::Running,
                request_id: id,
                ..Default::default()
            };
        });
        if let Some(prev) = previous {
            debug!("balance request {} for {} superseded by {}", prev.id, prev.account, id);
        }
        info!("balance request {} started for {}", id, account_id);

        let join = tokio::spawn(task.run());
        Ok(FetchHandle { id, join })
    }

    /// Consumer went away: cancel the running request and release its timer.
    pub fn teardown(&mut self) {
        if let Some(request) = self.live.take() {
            self.state.send_modify(|s| {
                request.cancel.cancel();
                if s.request_id == request.id && s.status == RequestStatus::Running {
                    s.loading = false;
                    s.status = RequestStatus::Cancelled;
                }
            });
            debug!("balance request {} torn down", request.id);
        }
    }
}

impl Drop for BalanceController {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct RequestTask {
    id: u64,
    account: AccountIdentifier,
    cancel: CancellationToken,
    deadline: Instant,
    fetcher: Arc<BalanceFetcher>,
    network: Network,
    state: Arc<watch::Sender<ViewState>>,
}

impl RequestTask {
    async fn run(self) -> RequestStatus {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(FetchError::Timeout),
            res = self.fetcher.fetch_balance(&self.account, &self.cancel) => res,
        };

        let status = match &outcome {
            Ok(_) => RequestStatus::Succeeded,
            Err(FetchError::Cancelled) => RequestStatus::Cancelled,
            Err(FetchError::Timeout) => RequestStatus::TimedOut,
            Err(_) => RequestStatus::Failed,
        };
        if status == RequestStatus::Cancelled {
            debug!("balance request {} for {} cancelled", self.id, self.account);
            return status;
        }

        let message = match &outcome {
            Ok(_) => None,
            Err(e) => {
                error!("balance request {} for {} failed: {}", self.id, self.account, e);
                classify(e, self.network)
            }
        };

        let id = self.id;
        let cancel = &self.cancel;
        let published = self.state.send_if_modified(|s| {
            if s.request_id != id || cancel.is_cancelled() {
                return false;
            }
            s.loading = false;
            s.status = status;
            match outcome {
                Ok(record) => s.balance = Some(record),
                Err(_) => s.error = message,
            }
            true
        });

        if published {
            status
        } else {
            debug!("balance request {} finished after being superseded, result dropped", id);
            RequestStatus::Cancelled
        }
    }
}
