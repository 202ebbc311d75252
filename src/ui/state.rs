use std::sync::atomic::{AtomicBool, Ordering};

/// Which axes the model spins about, read once per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotationFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for RotationFlags {
    fn default() -> Self {
        Self {
            x: false,
            y: false,
            z: true,
        }
    }
}

/// Rotation toggles shared between the UI and the frame producer.
///
/// The three axes are independent, so one atomic per axis is enough; there
/// is no invariant spanning them that would need a lock.
pub struct RotationToggles {
    x: AtomicBool,
    y: AtomicBool,
    z: AtomicBool,
}

impl Default for RotationToggles {
    fn default() -> Self {
        Self::new(RotationFlags::default())
    }
}

impl RotationToggles {
    pub fn new(initial: RotationFlags) -> Self {
        Self {
            x: AtomicBool::new(initial.x),
            y: AtomicBool::new(initial.y),
            z: AtomicBool::new(initial.z),
        }
    }

    pub fn toggle_x(&self) {
        self.x.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn toggle_y(&self) {
        self.y.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn toggle_z(&self) {
        self.z.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RotationFlags {
        RotationFlags {
            x: self.x.load(Ordering::Relaxed),
            y: self.y.load(Ordering::Relaxed),
            z: self.z.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_defaults_spin_about_z_only() {
        let toggles = RotationToggles::default();
        assert_eq!(
            toggles.snapshot(),
            RotationFlags {
                x: false,
                y: false,
                z: true
            }
        );
    }

    #[test]
    fn test_toggles_are_independent() {
        let toggles = RotationToggles::default();
        toggles.toggle_x();
        toggles.toggle_z();
        assert_eq!(
            toggles.snapshot(),
            RotationFlags {
                x: true,
                y: false,
                z: false
            }
        );

        toggles.toggle_x();
        toggles.toggle_y();
        assert_eq!(
            toggles.snapshot(),
            RotationFlags {
                x: false,
                y: true,
                z: false
            }
        );
    }

    #[test]
    fn test_toggle_from_another_thread() {
        let toggles = Arc::new(RotationToggles::default());
        let ui = Arc::clone(&toggles);

        std::thread::spawn(move || {
            for _ in 0..3 {
                ui.toggle_y();
            }
        })
        .join()
        .unwrap();

        assert!(toggles.snapshot().y);
    }
}
