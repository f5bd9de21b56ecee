//! The process-wide safe/real switch.
//!
//! There is one writer (`ModeSwitch`, owned by the session) and any number of
//! readers handed to components that only need to look at it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug)]
pub struct ModeSwitch {
    safe: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct ModeReader {
    safe: Arc<AtomicBool>,
}

impl ModeSwitch {
    pub fn new(safe_mode: bool) -> Self {
        Self {
            safe: Arc::new(AtomicBool::new(safe_mode)),
        }
    }

    pub fn reader(&self) -> ModeReader {
        ModeReader {
            safe: Arc::clone(&self.safe),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe.load(Ordering::SeqCst)
    }

    pub fn set_safe(&mut self, safe_mode: bool) {
        self.safe.store(safe_mode, Ordering::SeqCst);
    }
}

impl ModeReader {
    pub fn is_safe(&self) -> bool {
        self.safe.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_follow_the_switch() {
        let mut switch = ModeSwitch::new(true);
        let reader = switch.reader();
        assert!(reader.is_safe());
        switch.set_safe(false);
        assert!(!reader.is_safe());
        assert!(!switch.reader().is_safe());
    }
}
