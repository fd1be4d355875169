//! The Investigation Control Plane: a stateless HTTP + WebSocket server
//! that accepts investigations, materializes each as an orchestrator job,
//! tracks its lifecycle, and streams worker events to clients.

pub mod api;
pub mod cli;
pub mod runtime;
pub mod state;
