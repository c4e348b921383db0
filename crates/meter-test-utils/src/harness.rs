//! Meter construction helpers for integration tests.

use crate::notifier::RecordingNotifier;
use std::collections::HashMap;
use std::sync::Arc;
use storage_meter::{Meter, MeterConfig, MeterError};

/// Build a meter from key/value configuration with a recording notifier.
///
/// # Example
/// ```rust,ignore
/// let (meter, notifier) = recording_meter(&[("METER_RESELLER_PREFIX", "CUSTOM_")]).await?;
/// let svc = meter.layer().layer(FakeApp::new());
/// ```
pub async fn recording_meter(
    vars: &[(&str, &str)],
) -> Result<(Meter, Arc<RecordingNotifier>), MeterError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = MeterConfig::from_vars(&vars)?;
    let notifier = Arc::new(RecordingNotifier::new());
    let meter = Meter::new(config, Arc::clone(&notifier) as Arc<dyn storage_meter::Notifier>).await?;
    Ok((meter, notifier))
}
