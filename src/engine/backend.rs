//! Audio backend handle
//!
//! Owns the lifecycle of the output context and its sample clock. The
//! engine only schedules sound while the backend is running; a suspended
//! backend keeps its clock frozen until the next user interaction resumes
//! it.

use thiserror::Error;

/// Lifecycle state of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Suspended,
    Running,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("audio backend is closed")]
    Closed,
}

/// Sample-clock handle for the output context
#[derive(Debug, Clone)]
pub struct AudioBackend {
    state: BackendState,
    sample_rate: f64,
    frames: u64,
}

impl AudioBackend {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: BackendState::Uninitialized,
            sample_rate,
            frames: 0,
        }
    }

    /// A backend that is already running, for offline rendering
    pub fn running(sample_rate: f64) -> Self {
        Self {
            state: BackendState::Running,
            sample_rate,
            frames: 0,
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BackendState::Running
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Create the context; it starts suspended
    pub fn init(&mut self) -> Result<(), BackendError> {
        match self.state {
            BackendState::Closed => Err(BackendError::Closed),
            BackendState::Uninitialized => {
                self.state = BackendState::Suspended;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn suspend(&mut self) -> Result<(), BackendError> {
        match self.state {
            BackendState::Closed => Err(BackendError::Closed),
            BackendState::Running => {
                self.state = BackendState::Suspended;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Start (or restart) the clock, initializing first if needed
    pub fn resume(&mut self) -> Result<(), BackendError> {
        self.init()?;
        self.state = BackendState::Running;
        Ok(())
    }

    pub fn close(&mut self) {
        self.state = BackendState::Closed;
    }

    /// Current clock time in seconds
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Move the clock forward; a clock that is not running stays put
    pub fn advance(&mut self, frames: u64) {
        if self.is_running() {
            self.frames += frames;
        }
    }
}
