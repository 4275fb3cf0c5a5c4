//! evdev-based activation source
//!
//! Uses the Linux evdev interface to read the activation key at the kernel
//! level. Besides keyboards this covers assistive switches and switch
//! interfaces that present themselves as a mouse button or joystick button.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{ActivationEvent, ActivationSource};
use crate::config::ActivationConfig;
use crate::error::ActivationError;
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// evdev-based activation source
pub struct EvdevSource {
    /// The key or button that activates
    target_key: Key,
    /// Devices that can emit the key
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevSource {
    /// Create a source for the configured key
    pub fn new(config: &ActivationConfig) -> Result<Self, ActivationError> {
        let target_key = parse_key_name(&config.key)?;
        let device_paths = find_devices(target_key)?;

        if device_paths.is_empty() {
            return Err(ActivationError::NoDevice);
        }

        tracing::debug!(
            "Found {} device(s) with {:?}: {:?}",
            device_paths.len(),
            target_key,
            device_paths
        );

        Ok(Self {
            target_key,
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl ActivationSource for EvdevSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<ActivationEvent>, ActivationError> {
        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let target_key = self.target_key;
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            listener_loop(device_paths, target_key, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), ActivationError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Main listener loop running in a blocking task
fn listener_loop(
    device_paths: Vec<PathBuf>,
    target_key: Key,
    tx: mpsc::Sender<ActivationEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // Non-blocking so fetch_events returns when idle
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No activation devices could be opened");
        return;
    }

    tracing::info!("Listening for {:?}", target_key);

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Activation listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            if let Ok(events) = device.fetch_events() {
                for event in events {
                    // Press only; releases (0) and autorepeat (2) are ignored
                    let is_target =
                        matches!(event.kind(), InputEventKind::Key(k) if k == target_key);
                    if is_target && event.value() == 1 {
                        tracing::debug!("Activation key pressed");
                        if tx.blocking_send(ActivationEvent::new("evdev")).is_err() {
                            return; // Channel closed
                        }
                    }
                }
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find every input device that can emit `key`
fn find_devices(key: Key) -> Result<Vec<PathBuf>, ActivationError> {
    let mut found = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| ActivationError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| ActivationError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let has_key = device
                    .supported_keys()
                    .map(|keys| keys.contains(key))
                    .unwrap_or(false);

                if has_key {
                    tracing::debug!(
                        "Found device: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    found.push(path);
                }
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(ActivationError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(found)
}

/// Parse a key name string to an evdev key or button
fn parse_key_name(name: &str) -> Result<Key, ActivationError> {
    // Normalize: uppercase and replace - or space with _
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    // Buttons keep their BTN_ prefix, everything else gets KEY_
    let key_name = if normalized.starts_with("KEY_") || normalized.starts_with("BTN_") {
        normalized
    } else {
        format!("KEY_{}", normalized)
    };

    let key = match key_name.as_str() {
        // Keys switch interfaces commonly emit
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ENTER" | "KEY_RETURN" => Key::KEY_ENTER,
        "KEY_TAB" => Key::KEY_TAB,
        "KEY_1" => Key::KEY_1,
        "KEY_2" => Key::KEY_2,
        "KEY_ESC" | "KEY_ESCAPE" => Key::KEY_ESC,

        // Lock and spare keys
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_CAPSLOCK" => Key::KEY_CAPSLOCK,
        "KEY_NUMLOCK" => Key::KEY_NUMLOCK,
        "KEY_INSERT" => Key::KEY_INSERT,

        // Function keys
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        "KEY_F13" => Key::KEY_F13,
        "KEY_F14" => Key::KEY_F14,
        "KEY_F15" => Key::KEY_F15,
        "KEY_F16" => Key::KEY_F16,
        "KEY_F17" => Key::KEY_F17,
        "KEY_F18" => Key::KEY_F18,
        "KEY_F19" => Key::KEY_F19,
        "KEY_F20" => Key::KEY_F20,
        "KEY_F21" => Key::KEY_F21,
        "KEY_F22" => Key::KEY_F22,
        "KEY_F23" => Key::KEY_F23,
        "KEY_F24" => Key::KEY_F24,

        // Navigation and media keys
        "KEY_PAGEUP" => Key::KEY_PAGEUP,
        "KEY_PAGEDOWN" => Key::KEY_PAGEDOWN,
        "KEY_PLAYPAUSE" => Key::KEY_PLAYPAUSE,

        // Mouse and joystick buttons (switch adapters)
        "BTN_LEFT" => Key::BTN_LEFT,
        "BTN_RIGHT" => Key::BTN_RIGHT,
        "BTN_MIDDLE" => Key::BTN_MIDDLE,
        "BTN_0" => Key::BTN_0,
        "BTN_1" => Key::BTN_1,
        "BTN_TRIGGER" => Key::BTN_TRIGGER,
        "BTN_SOUTH" | "BTN_A" => Key::BTN_SOUTH,

        _ => {
            return Err(ActivationError::UnknownKey(format!(
                "{}. Try: SPACE, ENTER, F13-F24, BTN_LEFT, BTN_0",
                name
            )));
        }
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("SPACE").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("space").unwrap(), Key::KEY_SPACE);
        assert_eq!(parse_key_name("KEY_ENTER").unwrap(), Key::KEY_ENTER);
        assert_eq!(parse_key_name("return").unwrap(), Key::KEY_ENTER);
        assert_eq!(parse_key_name("F13").unwrap(), Key::KEY_F13);
        assert!(parse_key_name(" scroll-lock ").is_err());
        assert_eq!(parse_key_name("ScrollLock").unwrap(), Key::KEY_SCROLLLOCK);
    }

    #[test]
    fn test_parse_button_names() {
        assert_eq!(parse_key_name("BTN_LEFT").unwrap(), Key::BTN_LEFT);
        assert_eq!(parse_key_name("btn-0").unwrap(), Key::BTN_0);
        assert_eq!(parse_key_name("BTN_A").unwrap(), Key::BTN_SOUTH);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(matches!(
            parse_key_name("INVALID_KEY_NAME"),
            Err(ActivationError::UnknownKey(_))
        ));
    }
}
