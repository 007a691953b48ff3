use biometrics::{Collector, Counter};

pub(crate) static RELAY_REQUESTS: Counter = Counter::new("qbchat.relay.requests");
pub(crate) static RELAY_REJECTED: Counter = Counter::new("qbchat.relay.rejected");
pub(crate) static RELAY_UNCONFIGURED: Counter = Counter::new("qbchat.relay.unconfigured");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("qbchat.stream.fragments");
pub(crate) static STREAM_FAILURES: Counter = Counter::new("qbchat.stream.failures");

pub(crate) static SUGGEST_REQUESTS: Counter = Counter::new("qbchat.suggest.requests");
pub(crate) static SUGGEST_EMPTY: Counter = Counter::new("qbchat.suggest.empty");

pub(crate) static UPSTREAM_CALLS: Counter = Counter::new("qbchat.upstream.calls");
pub(crate) static UPSTREAM_ERRORS: Counter = Counter::new("qbchat.upstream.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&RELAY_REQUESTS);
    collector.register_counter(&RELAY_REJECTED);
    collector.register_counter(&RELAY_UNCONFIGURED);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_FAILURES);

    collector.register_counter(&SUGGEST_REQUESTS);
    collector.register_counter(&SUGGEST_EMPTY);

    collector.register_counter(&UPSTREAM_CALLS);
    collector.register_counter(&UPSTREAM_ERRORS);
}
