//! Layout engine for shareholding graphs: who holds shares of which company,
//! and how large the stake is.

pub mod config;
pub mod data;
pub mod export;
pub mod layout;
pub mod oracle;
pub mod session;
pub mod util;

pub use config::{EgoConfig, LabelMetrics, LayoutConfig, SessionConfig, VisibilityPolicy};
pub use data::{Edge, EdgeSummary, GraphData, Node, NodeId, NodeKind};
pub use layout::{GraphView, LayoutOutcome, Positions, Simulation, StepStatus, TypeFilter, Viewport};
pub use session::{EgoPresentation, GraphLayoutSession, PassTicket, SessionEvent, ViewMode};
