pub mod test_metrics;

use osgauges::clock::ManualClock;
use osgauges::provider::fake::FakeProvider;
use osgauges::EnvironmentGaugeSet;
use std::sync::Arc;
use std::time::Duration;

/// A gauge set over a scripted provider and a manual clock at t=0, with a
/// one second cache window.
pub fn fake_gauge_set() -> (EnvironmentGaugeSet, Arc<FakeProvider>, Arc<ManualClock>) {
    let provider = Arc::new(FakeProvider::new());
    let clock = Arc::new(ManualClock::default());
    let set =
        EnvironmentGaugeSet::with_parts(provider.clone(), clock.clone(), Duration::from_secs(1));
    (set, provider, clock)
}
