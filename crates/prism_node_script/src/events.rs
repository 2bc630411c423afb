// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural notifications.
//!
//! Pin events are queued while a mutation runs and drained once at its end:
//! each is handed to the owning node's
//! [`on_pin_event`](crate::node::NodeBehavior::on_pin_event) and appended to
//! the script's event log for the host.

use crate::collection::CollectionId;
use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::pin::{PinHandle, PinType};

/// Something happened to a pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinEvent {
    /// The pin gained a connection
    Connected {
        /// Pin that was connected
        pin: PinHandle,
        /// Pin at the other end
        peer: PinHandle,
        /// Type of the pin at the other end
        peer_type: PinType,
        /// The new connection
        connection: ConnectionId,
    },
    /// The pin lost a connection
    Disconnected {
        /// Pin that was disconnected
        pin: PinHandle,
        /// Pin that was at the other end
        peer: PinHandle,
        /// The removed connection
        connection: ConnectionId,
    },
    /// A pin was created
    Added {
        /// The new pin
        pin: PinHandle,
        /// Collection it joined, if any
        collection: Option<CollectionId>,
    },
    /// A pin was removed
    Removed {
        /// The removed pin
        pin: PinHandle,
        /// Collection it left, if any
        collection: Option<CollectionId>,
    },
}

impl PinEvent {
    /// The pin the event is about
    pub fn pin(&self) -> PinHandle {
        match self {
            Self::Connected { pin, .. }
            | Self::Disconnected { pin, .. }
            | Self::Added { pin, .. }
            | Self::Removed { pin, .. } => *pin,
        }
    }

    /// The node owning the pin
    pub fn node(&self) -> NodeId {
        self.pin().node
    }
}

/// Notification for the script's host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEvent {
    /// A node was added
    NodeAdded(NodeId),
    /// A node was removed
    NodeRemoved(NodeId),
    /// A pin event was processed
    Pin(PinEvent),
    /// A node failed and was marked broken
    NodeBroken {
        /// The node
        node: NodeId,
        /// Why it broke
        reason: String,
    },
    /// A broken node evaluated successfully again
    NodeRecovered(NodeId),
}
