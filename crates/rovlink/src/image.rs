//! Latest camera frame per robot.
//!
//! Frames arrive from an image-receive collaborator outside the control
//! link and are kept as opaque bytes for a display to pick up. Nothing here
//! decodes them.

use std::collections::HashMap;

use bytes::Bytes;

use rovlink_core::types::RobotId;

/// Most recent raw frame for each robot.
#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    frames: HashMap<RobotId, Bytes>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `robot`'s frame, returning the one it displaced.
    pub fn store(&mut self, robot: RobotId, frame: Bytes) -> Option<Bytes> {
        self.frames.insert(robot, frame)
    }

    /// The latest frame for `robot`, if any has arrived.
    pub fn latest(&self, robot: RobotId) -> Option<&Bytes> {
        self.frames.get(&robot)
    }
}
