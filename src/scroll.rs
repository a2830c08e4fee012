//! Scroll-triggered "load more" scheduling.
//!
//! Each scroll event is reduced to a [`ScrollMetrics`] sample. When the
//! bottom of the viewport comes within [`DEFAULT_LOAD_MARGIN`] of the end of
//! the document, the scheduler asks the retrieval service for the next page.
//! The check is cheap enough to run on every event; throttling, if wanted,
//! belongs to whoever produces the events.
//!
//! A scheduler listens only through an explicit [`ScrollSubscription`].
//! Dropping the subscription stops the listener, so several list views can
//! each own one without stepping on each other.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::service::ListingsService;

/// Distance from the bottom of the document at which more listings load.
pub const DEFAULT_LOAD_MARGIN: f64 = 100.0;

/// One scroll position sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Vertical scroll offset of the viewport
    pub scroll_offset: f64,
    /// Height of the viewport
    pub viewport_height: f64,
    /// Several measurements of the document height; rendering engines
    /// disagree, so the largest is used
    pub document_heights: Vec<f64>,
}

impl ScrollMetrics {
    pub fn new(scroll_offset: f64, viewport_height: f64, document_heights: Vec<f64>) -> Self {
        Self {
            scroll_offset,
            viewport_height,
            document_heights,
        }
    }

    /// Position of the bottom edge of the viewport.
    pub fn current_position(&self) -> f64 {
        self.scroll_offset + self.viewport_height
    }

    /// Largest finite document height measurement, if there is one.
    pub fn measured_height(&self) -> Option<f64> {
        self.document_heights
            .iter()
            .copied()
            .filter(|h| h.is_finite())
            .reduce(f64::max)
    }

    /// Largest finite document height measurement, or zero.
    pub fn document_height(&self) -> f64 {
        self.measured_height().unwrap_or(0.0)
    }

    /// True when the viewport bottom is within `margin` of the document end.
    ///
    /// A sample without any usable height measurement is never near the bottom.
    pub fn near_bottom(&self, margin: f64) -> bool {
        match self.measured_height() {
            Some(height) => self.current_position() >= height - margin,
            None => false,
        }
    }
}

/// Decides when scrolling should pull the next page.
pub struct ScrollScheduler<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    service: ListingsService<F, T>,
    load_margin: f64,
}

impl<F, T> ScrollScheduler<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(service: ListingsService<F, T>) -> Self {
        Self::with_margin(service, DEFAULT_LOAD_MARGIN)
    }

    /// Create a scheduler using the configured load margin.
    pub fn from_config(service: ListingsService<F, T>, config: &Config) -> Self {
        Self::with_margin(service, config.listings.load_margin)
    }

    pub fn with_margin(service: ListingsService<F, T>, load_margin: f64) -> Self {
        Self {
            service,
            load_margin,
        }
    }

    /// True when this sample should trigger a "get more".
    pub fn should_load_more(&self, metrics: &ScrollMetrics) -> bool {
        self.service.has_previous()
            && metrics.near_bottom(self.load_margin)
            && self.service.can_get_more()
    }

    /// Handle one scroll event, spawning a "get more" when warranted.
    ///
    /// Returns true if a fetch was started.
    pub fn on_scroll(&self, metrics: &ScrollMetrics) -> bool {
        if !self.should_load_more(metrics) {
            return false;
        }

        match self.service.begin_get_more() {
            Some(fetch) => {
                tracing::debug!(
                    position = metrics.current_position(),
                    document_height = metrics.document_height(),
                    "scrolled near bottom, loading more listings"
                );
                tokio::spawn(fetch);
                true
            }
            None => false,
        }
    }

    /// Start listening for scroll events.
    pub fn subscribe(self) -> ScrollSubscription {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ScrollMetrics>();
        let task = tokio::spawn(async move {
            while let Some(metrics) = receiver.recv().await {
                self.on_scroll(&metrics);
            }
        });

        ScrollSubscription { sender, task }
    }
}

/// Live scroll listener. Dropping it stops the listener.
pub struct ScrollSubscription {
    sender: mpsc::UnboundedSender<ScrollMetrics>,
    task: JoinHandle<()>,
}

impl ScrollSubscription {
    /// Deliver a scroll event. Returns false once the listener has stopped.
    pub fn notify(&self, metrics: ScrollMetrics) -> bool {
        !self.task.is_finished() && self.sender.send(metrics).is_ok()
    }

    /// Stop listening.
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
