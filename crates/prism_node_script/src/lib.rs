// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph scripting runtime for Prism.
//!
//! Scripts drive animated layer properties: a typed dataflow graph whose
//! exit node produces one value (a color, a number, a boolean, ...) every
//! rendered frame.
//!
//! ## Architecture
//!
//! - [`ScriptGraph`] is an arena of nodes and connections; pins are
//!   addressed by [`PinHandle`]s. It is kept acyclic at connect time and
//!   caches its evaluation order.
//! - [`NodeScript`] wraps a graph behind one mutex and adds lifecycle,
//!   persistence and configuration.
//! - Node types are looked up by name in a [`NodeRegistry`]; the built-in
//!   set comes from [`nodes::builtin_registry`].
//! - Failing nodes are marked broken and keep their last outputs; the rest
//!   of the pass continues.

pub mod collection;
pub mod config;
pub mod connection;
pub mod easing;
pub mod entity;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod numeric;
pub mod pin;
pub mod registry;
pub mod script;
pub mod value;

pub use collection::{CollectionId, PinCollection};
pub use config::ScriptConfig;
pub use connection::{Connection, ConnectionId};
pub use easing::Easing;
pub use entity::{ConnectionEntity, NodeEntity, NodeScriptEntity, PinCollectionEntity};
pub use error::{ConfigError, LoadError, NodeError, StructureError, StructureResult};
pub use evaluation::{Clock, EvaluationContext, EvaluationReport, ManualClock, NodeIo, SystemClock};
pub use events::{PinEvent, ScriptEvent};
pub use graph::{EvaluationPlan, ScriptGraph};
pub use node::{Node, NodeBehavior, NodeEditor, NodeId, NodeStatus, ScriptEnvironment};
pub use numeric::{Numeric, NumericKind};
pub use pin::{Pin, PinDirection, PinHandle, PinId, PinType};
pub use registry::{NodeCategory, NodeDescriptor, NodeRegistry};
pub use script::NodeScript;
pub use value::PinValue;
