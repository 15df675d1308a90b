//! Runtime module — agent lifecycle: boot, cycle loop, shutdown.

pub mod boot;
pub mod cycle;
pub mod stop;
