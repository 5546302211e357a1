//! Notifications marshalled onto the thread that owns the layout.
//!
//! Background work never touches the tree. It sends a [`WorkspaceEvent`]
//! through an [`EventSender`] and the owner applies it from
//! `DockWorkspace::pump_events`.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// Show and focus a tool, inserting it if needed.
    ActivateTool(String),
    /// Close the dockable with this id.
    CloseDockable(String),
    /// A tool was shown or hidden by a visibility toggle.
    ToolVisibility { id: String, visible: bool },
}

/// Cloneable handle for posting events from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<WorkspaceEvent>,
}

impl EventSender {
    /// Queue `event`; returns false once the workspace is gone.
    pub fn send(&self, event: WorkspaceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

#[derive(Debug)]
pub(crate) struct EventQueue {
    tx: Sender<WorkspaceEvent>,
    rx: Receiver<WorkspaceEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything queued so far, oldest first.
    pub(crate) fn drain(&self) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
