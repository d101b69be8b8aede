//! Use-Cases ohne Session-Zustand: reine Algorithmen auf Domänenobjekten.

pub mod signal_layout;
