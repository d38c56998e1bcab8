//! Transition metric observers.

mod transition_observers;

pub use transition_observers::{
    InMemoryTransitionCounter, NoopTransitionObserver, TracingTransitionObserver,
    TRANSITION_METRIC,
};
