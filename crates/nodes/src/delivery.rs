use std::time::Duration;

use pipeline::{Deliverer, DeliveryError, PlatformArtifact, PublishReceipt};

/// Publishes `artifact`, turning an elapsed `timeout` into a [`DeliveryError`].
pub(crate) async fn publish_with_timeout(
    deliverer: &dyn Deliverer,
    artifact: &PlatformArtifact,
    timeout: Duration,
) -> Result<PublishReceipt, DeliveryError> {
    match tokio::time::timeout(timeout, deliverer.publish(artifact)).await {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::new(
            artifact.platform.clone(),
            format!("timed out after {timeout:?}"),
        )),
    }
}
