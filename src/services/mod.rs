//! Service layer: extraction, classification and notification.

mod classifier;
mod extractor;
mod notifier;

pub use classifier::Classifier;
pub use extractor::Extractor;
pub use notifier::{DeliveryOutcome, NotificationPayload, Notifier, local_report};
