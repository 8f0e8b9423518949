// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Camera port enumeration

use super::camera::CameraBackend;

/// Outcome of walking camera ports until enough of them failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortReport {
    /// opened and delivered a frame
    pub working: Vec<usize>,
    /// opened but no frame could be read
    pub present: Vec<usize>,
    /// failed to open
    pub missing: Vec<usize>,
}

/// `"Camera <port>"`
pub fn camera_label(port: usize) -> String {
    format!("Camera {}", port)
}

/// Port of a selector label: the last whitespace separated token.
pub fn port_from_label(label: &str) -> Option<usize> {
    label.split_whitespace().last()?.parse().ok()
}

/// Ports in `0..n` that open.
pub fn scan_fixed(backend: &dyn CameraBackend, n: usize) -> Vec<usize> {
    (0..n)
        .filter(|&port| match backend.probe(port) {
            Ok(source) => {
                log::info!("{}", camera_label(port));
                drop(source);
                true
            }
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        })
        .collect()
}

/// Walk ports from 0 until `miss_limit` of them failed to open.
pub fn scan_until_misses(backend: &dyn CameraBackend, miss_limit: usize) -> PortReport {
    let mut report = PortReport::default();
    let mut port = 0;
    while report.missing.len() < miss_limit {
        match backend.probe(port) {
            Ok(mut source) => match source.read() {
                Ok(frame) => {
                    let (w, h) = frame.dimensions();
                    log::info!("Port {} is working and reads images ({} x {})", port, w, h);
                    report.working.push(port);
                }
                Err(e) => {
                    log::info!("Port {} for camera is present but does not read: {}", port, e);
                    report.present.push(port);
                }
            },
            Err(e) => {
                log::debug!("Port {} is not working: {}", port, e);
                report.missing.push(port);
            }
        }
        port += 1;
    }
    report
}
