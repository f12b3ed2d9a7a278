//! End-to-end tests for the control core.
//!
//! These run on the host against the in-memory adapters and verify the
//! full pipeline: probe values → sensor task → control evaluator → relay
//! levels, with the alarm and input tasks in the loop.

mod rig;

mod control_cycle;
mod pretrip_cycle;
mod setpoint_edit;
