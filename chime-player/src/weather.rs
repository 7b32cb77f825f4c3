//! Weather poller: periodically fetches the weather category for the
//! configured location and debounces it to real changes.
//!
//! Failure policy: a fetch failure before any value was ever observed
//! synthesizes the default category once; failures after that never retract
//! the last-known value and never re-fire the change signal.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Poll cadence for the weather endpoint.
pub const POLL_INTERVAL: Duration = Duration::from_secs(600);

/// Category assumed when the endpoint fails before a first observation.
pub const DEFAULT_WEATHER: &str = "Clear";

/// Weather endpoint the stock fetcher talks to.
pub const DEFAULT_ENDPOINT: &str = "https://acmusicext.com/api/weather-v1";

/// Fetches the weather category string for a location.
pub trait WeatherFetch: Send + 'static {
    fn fetch(
        &self,
        country: &str,
        zip: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: String,
}

/// Stock fetcher against the HTTP weather endpoint.
pub struct HttpWeatherFetch {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWeatherFetch {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chime/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::WeatherFetch(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl WeatherFetch for HttpWeatherFetch {
    async fn fetch(&self, country: &str, zip: &str) -> Result<String> {
        let url = format!("{}/{}/{}", self.base_url, country, zip);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::WeatherFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::WeatherFetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|e| Error::WeatherFetch(e.to_string()))?;
        Ok(body.weather)
    }
}

enum Command {
    /// New primary location key; takes effect on the next poll.
    SetPostal(String),
    /// New secondary location key; cancels the pending timer and polls now.
    SetRegion(String),
}

/// Control handle for a spawned poller.
#[derive(Clone)]
pub struct WeatherHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    value: Arc<RwLock<Option<String>>>,
}

impl WeatherHandle {
    /// Updates the postal code; only the next request's parameters change.
    pub fn set_postal(&self, zip: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::SetPostal(zip.into()));
    }

    /// Updates the country code and restarts the poll cycle immediately.
    pub fn set_region(&self, country: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::SetRegion(country.into()));
    }

    /// Last known weather category, `None` until first observation.
    pub async fn current(&self) -> Option<String> {
        self.value.read().await.clone()
    }
}

/// Spawns the poll loop. Every stored change is signalled with a unit on
/// `changed_tx`; the receiver re-reads via [`WeatherHandle::current`].
pub fn spawn<F: WeatherFetch>(
    fetcher: F,
    zip: String,
    country: String,
    changed_tx: mpsc::UnboundedSender<()>,
) -> (WeatherHandle, JoinHandle<()>) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    let value = Arc::new(RwLock::new(None::<String>));
    let handle = WeatherHandle {
        cmd_tx,
        value: Arc::clone(&value),
    };

    let task = tokio::spawn(async move {
        let mut zip = zip;
        let mut country = country;

        'poll: loop {
            match fetcher.fetch(&country, &zip).await {
                Ok(category) => {
                    let mut guard = value.write().await;
                    if guard.as_deref() != Some(category.as_str()) {
                        debug!(weather = %category, "weather changed");
                        *guard = Some(category);
                        drop(guard);
                        if changed_tx.send(()).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("weather fetch failed: {}", e);
                    let mut guard = value.write().await;
                    if guard.is_none() {
                        // Never observed anything: assume the default once
                        *guard = Some(DEFAULT_WEATHER.to_string());
                        drop(guard);
                        if changed_tx.send(()).is_err() {
                            return;
                        }
                    }
                }
            }

            let sleep = tokio::time::sleep(POLL_INTERVAL);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => continue 'poll,
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::SetPostal(new_zip)) => zip = new_zip,
                        Some(Command::SetRegion(new_country)) => {
                            country = new_country;
                            continue 'poll;
                        }
                        None => return,
                    },
                }
            }
        }
    });

    (handle, task)
}

#[cfg(test)]
impl WeatherHandle {
    /// Handle with no backing poller; tests mutate the value directly.
    pub(crate) fn detached() -> (Self, Arc<RwLock<Option<String>>>) {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let value = Arc::new(RwLock::new(None));
        (
            Self {
                cmd_tx,
                value: Arc::clone(&value),
            },
            value,
        )
    }
}
